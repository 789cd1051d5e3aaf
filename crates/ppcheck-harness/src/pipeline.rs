//! Orchestration: collect ranks, test each parameter, classify the rest.

use std::collections::BTreeMap;
use std::fmt;

use ppcheck_error::PpError;
use ppcheck_stats::{UniformityTest, test_uniformity};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregator::{Collection, RankEnsemble, collect_parallel};
use crate::sample_store::SampleStore;
use crate::trial::Trial;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Collecting,
    Testing,
    Done,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collecting => f.write_str("collecting"),
            Self::Testing => f.write_str("testing"),
            Self::Done => f.write_str("done"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// `1` collects on the calling thread.
    pub workers: usize,
    /// Parameters tested on fewer ranks than this get a warning.
    pub min_ranks_warning: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            min_ranks_warning: 10,
        }
    }
}

/// Uniformity test outcome of one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterConsistency {
    pub test: UniformityTest,
    /// Fewer than two ranks: the p-value carries no information.
    pub degenerate: bool,
}

impl ParameterConsistency {
    #[must_use]
    pub fn p_value(&self) -> f64 {
        self.test.p_value
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.test.count()
    }
}

/// Per-parameter test outcomes, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsistencyResult {
    entries: BTreeMap<String, ParameterConsistency>,
}

impl ConsistencyResult {
    #[must_use]
    pub fn get(&self, parameter: &str) -> Option<&ParameterConsistency> {
        self.entries.get(parameter)
    }

    /// `parameter -> p-value`.
    #[must_use]
    pub fn p_values(&self) -> BTreeMap<String, f64> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.p_value()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterConsistency)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A requested parameter that never reached the uniformity test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UntestedParameter {
    pub parameter: String,
    /// [`PpError::kind`] of the reason.
    pub reason: String,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PpAnalysis {
    pub phase: PipelinePhase,
    pub parameters: Vec<String>,
    pub collection: Collection,
    pub consistency: ConsistencyResult,
    pub untested: Vec<UntestedParameter>,
}

impl PpAnalysis {
    #[must_use]
    pub fn ensemble(&self) -> &RankEnsemble {
        &self.collection.ensemble
    }

    /// Tested parameters whose p-value falls below `significance`.
    #[must_use]
    pub fn miscalibrated(&self, significance: f64) -> Vec<&str> {
        self.consistency
            .iter()
            .filter(|(_, entry)| !entry.test.is_calibrated(significance))
            .map(|(name, _)| name)
            .collect()
    }
}

fn enter(phase: PipelinePhase) -> PipelinePhase {
    info!(phase = %phase, "p-p analysis phase");
    phase
}

/// Test every requested parameter of a finished ensemble.
pub fn test_ensemble(
    ensemble: &RankEnsemble,
    parameters: &[String],
    min_ranks_warning: usize,
) -> (ConsistencyResult, Vec<UntestedParameter>) {
    let mut consistency = ConsistencyResult::default();
    let mut untested = Vec::new();

    for parameter in parameters {
        let Some(test) = ensemble.get(parameter).and_then(test_uniformity) else {
            let error = PpError::EmptySampleSet {
                parameter: parameter.clone(),
            };
            warn!(parameter = %parameter, reason = %error, "parameter untested");
            untested.push(UntestedParameter {
                parameter: parameter.clone(),
                reason: error.kind().to_owned(),
            });
            continue;
        };

        let degenerate = test.is_degenerate();
        if degenerate {
            let error = PpError::DegenerateTest {
                parameter: parameter.clone(),
                count: test.count(),
            };
            warn!(parameter = %parameter, reason = %error, "degenerate uniformity test");
        } else if test.count() < min_ranks_warning {
            warn!(
                parameter = %parameter,
                count = test.count(),
                threshold = min_ranks_warning,
                "few ranks; KS p-value has little power"
            );
        }
        info!(
            parameter = %parameter,
            count = test.count(),
            statistic = test.statistic.d,
            p_value = test.p_value,
            method = %test.method,
            "uniformity test"
        );
        consistency
            .entries
            .insert(parameter.clone(), ParameterConsistency { test, degenerate });
    }
    (consistency, untested)
}

/// Run collection and testing over `trials`.
pub fn run_pp_analysis<S: SampleStore + ?Sized>(
    trials: &[Trial],
    store: &S,
    parameters: &[String],
    options: &AnalysisOptions,
) -> PpAnalysis {
    enter(PipelinePhase::Collecting);
    let collection = collect_parallel(trials, store, parameters, options.workers);
    info!(
        trials_total = collection.trials_total,
        trials_read = collection.trials_read,
        skips = collection.skips.len(),
        "collection finished"
    );

    enter(PipelinePhase::Testing);
    let (consistency, untested) =
        test_ensemble(&collection.ensemble, parameters, options.min_ranks_warning);

    let phase = enter(PipelinePhase::Done);
    PpAnalysis {
        phase,
        parameters: parameters.to_vec(),
        collection,
        consistency,
        untested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ensemble(entries: &[(&str, &[f64])]) -> RankEnsemble {
        let mut ensemble = RankEnsemble::default();
        for (name, ranks) in entries {
            for &rank in *ranks {
                ensemble.push(name, rank);
            }
        }
        ensemble
    }

    #[test]
    fn three_ranks_match_exact_distribution() {
        let ensemble = ensemble(&[("mc", &[0.25, 0.75, 0.5][..])]);
        let (result, untested) = test_ensemble(&ensemble, &["mc".to_owned()], 10);
        assert!(untested.is_empty());
        let p = result.p_values()["mc"];
        assert!((p - 0.972_222_222_222_222_2).abs() < 1e-12, "p = {p}");
        assert!(!result.get("mc").unwrap().degenerate);
    }

    #[test]
    fn empty_and_degenerate_parameters() {
        let ensemble = ensemble(&[("ra", &[0.3][..])]);
        let parameters = vec!["ra".to_owned(), "dec".to_owned()];
        let (result, untested) = test_ensemble(&ensemble, &parameters, 10);

        let ra = result.get("ra").unwrap();
        assert!(ra.degenerate);
        assert_eq!(ra.count(), 1);
        // n = 1: P(D >= d) = 2(1 - d) with d = max(x, 1 - x)
        assert!((ra.p_value() - 0.6).abs() < 1e-12);

        assert_eq!(
            untested,
            vec![UntestedParameter {
                parameter: "dec".to_owned(),
                reason: "empty_sample_set".to_owned(),
            }]
        );
    }

    #[test]
    fn phase_names() {
        assert_eq!(PipelinePhase::Collecting.to_string(), "collecting");
        assert_eq!(PipelinePhase::Done.to_string(), "done");
    }
}
