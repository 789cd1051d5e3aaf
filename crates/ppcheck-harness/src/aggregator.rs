//! Pooling of fractional ranks across trials.
//!
//! Every trial contributes at most one rank per requested parameter. Trials
//! that cannot be read and (trial, parameter) pairs that lack a side are
//! recorded as [`SkipEvent`]s and logged; collection never aborts.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use parking_lot::Mutex;
use ppcheck_error::{MissingSide, PpError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::sample_store::{ParameterSampleSet, PosteriorSamples, SampleStore};
use crate::trial::Trial;

/// Fractional ranks per parameter. Order within a parameter is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankEnsemble {
    ranks: BTreeMap<String, Vec<f64>>,
}

impl RankEnsemble {
    pub fn push(&mut self, parameter: &str, rank: f64) {
        self.ranks.entry(parameter.to_owned()).or_default().push(rank);
    }

    #[must_use]
    pub fn get(&self, parameter: &str) -> Option<&[f64]> {
        self.ranks.get(parameter).map(Vec::as_slice)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.ranks.keys().map(String::as_str)
    }

    /// Number of parameters with at least one rank.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

/// A trial or (trial, parameter) pair left out of the ensemble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipEvent {
    pub trial: usize,
    pub path: PathBuf,
    /// [`PpError::kind`] of the failure.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<MissingSide>,
    pub reason: String,
}

impl SkipEvent {
    fn from_error(trial: &Trial, error: &PpError) -> Self {
        let (parameter, side) = match error {
            PpError::ParameterMissing {
                parameter, side, ..
            } => (Some(parameter.clone()), Some(*side)),
            _ => (None, None),
        };
        Self {
            trial: trial.index,
            path: trial.sample_path.clone(),
            kind: error.kind().to_owned(),
            parameter,
            side,
            reason: error.to_string(),
        }
    }

    /// `true` when the whole trial was dropped.
    #[must_use]
    pub fn is_trial_skip(&self) -> bool {
        self.parameter.is_none()
    }
}

/// Output of the collection phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    pub ensemble: RankEnsemble,
    pub trials_total: usize,
    /// Trials whose posterior and ground truth loaded.
    pub trials_read: usize,
    /// Ordered by trial index.
    pub skips: Vec<SkipEvent>,
}

impl Collection {
    fn absorb(&mut self, contribution: TrialContribution) {
        if contribution.read {
            self.trials_read += 1;
        }
        for (parameter, rank) in contribution.ranks {
            self.ensemble.push(parameter, rank);
        }
        self.skips.extend(contribution.skips);
    }
}

/// Everything one trial adds to a [`Collection`].
#[derive(Debug, Default)]
struct TrialContribution<'p> {
    read: bool,
    ranks: Vec<(&'p str, f64)>,
    skips: Vec<SkipEvent>,
}

fn read_trial<S: SampleStore + ?Sized>(store: &S, trial: &Trial) -> Result<PosteriorSamples> {
    let unreadable = |reason: String| PpError::TrialRead {
        index: trial.index,
        path: trial.sample_path.clone(),
        reason,
    };
    if trial.ground_truth.is_none() {
        return Err(unreadable("no injection record at this index".to_owned()));
    }
    store.load(trial).map_err(|error| match error {
        PpError::TrialRead { .. } => error,
        other => unreadable(other.to_string()),
    })
}

fn contribute<'p, S: SampleStore + ?Sized>(
    store: &S,
    trial: &Trial,
    parameters: &'p [String],
) -> TrialContribution<'p> {
    let mut contribution = TrialContribution::default();
    let posterior = match read_trial(store, trial) {
        Ok(posterior) => posterior,
        Err(error) => {
            warn!(
                trial = trial.index,
                path = %trial.sample_path.display(),
                kind = error.kind(),
                reason = %error,
                "skipping unreadable trial"
            );
            contribution.skips.push(SkipEvent::from_error(trial, &error));
            return contribution;
        }
    };
    contribution.read = true;

    for parameter in parameters {
        let rank = ParameterSampleSet::from_trial(trial, &posterior, parameter).and_then(|set| {
            set.rank()
                .ok_or_else(|| PpError::internal(format!("no rank for `{parameter}`")))
        });
        match rank {
            Ok(rank) => contribution.ranks.push((parameter.as_str(), rank)),
            Err(error) => {
                warn!(
                    trial = trial.index,
                    parameter = %parameter,
                    kind = error.kind(),
                    reason = %error,
                    "skipping parameter for trial"
                );
                contribution.skips.push(SkipEvent::from_error(trial, &error));
            }
        }
    }
    debug!(
        trial = trial.index,
        ranks = contribution.ranks.len(),
        samples = posterior.len(),
        "trial collected"
    );
    contribution
}

/// Incremental, single-threaded collector.
pub struct TrialAggregator<'a, S: ?Sized> {
    store: &'a S,
    parameters: &'a [String],
    collection: Collection,
}

impl<'a, S: SampleStore + ?Sized> TrialAggregator<'a, S> {
    pub fn new(store: &'a S, parameters: &'a [String]) -> Self {
        Self {
            store,
            parameters,
            collection: Collection::default(),
        }
    }

    pub fn consume(&mut self, trial: &Trial) {
        self.collection.trials_total += 1;
        let contribution = contribute(self.store, trial, self.parameters);
        self.collection.absorb(contribution);
    }

    #[must_use]
    pub fn finish(self) -> Collection {
        self.collection
    }
}

/// Collect ranks from `trials` in order on the calling thread.
pub fn collect<S: SampleStore + ?Sized>(
    trials: &[Trial],
    store: &S,
    parameters: &[String],
) -> Collection {
    let mut aggregator = TrialAggregator::new(store, parameters);
    for trial in trials {
        aggregator.consume(trial);
    }
    aggregator.finish()
}

/// Collect ranks with up to `workers` scoped threads.
///
/// Each trial's contribution is merged under one lock, so the ensemble equals
/// the sequential one as a multiset per parameter. `workers <= 1` falls back
/// to [`collect`].
pub fn collect_parallel<S: SampleStore + ?Sized>(
    trials: &[Trial],
    store: &S,
    parameters: &[String],
    workers: usize,
) -> Collection {
    let workers = workers.min(trials.len());
    if workers <= 1 {
        return collect(trials, store, parameters);
    }

    let next = AtomicUsize::new(0);
    let shared = Mutex::new(Collection {
        trials_total: trials.len(),
        ..Collection::default()
    });
    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                while let Some(trial) = trials.get(next.fetch_add(1, Ordering::Relaxed)) {
                    let contribution = contribute(store, trial, parameters);
                    shared.lock().absorb(contribution);
                }
            });
        }
    });

    let mut collection = shared.into_inner();
    collection.skips.sort_by_key(|skip| skip.trial);
    collection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injection::InjectionRecord;
    use std::collections::HashMap;

    /// Posteriors keyed by trial index; absent indices fail to load.
    struct MapStore(HashMap<usize, PosteriorSamples>);

    impl SampleStore for MapStore {
        fn load(&self, trial: &Trial) -> Result<PosteriorSamples> {
            self.0
                .get(&trial.index)
                .cloned()
                .ok_or_else(|| PpError::internal("no such posterior"))
        }
    }

    fn posterior(columns: &[(&str, Vec<f64>)]) -> PosteriorSamples {
        PosteriorSamples::from_columns(
            columns
                .iter()
                .map(|(name, values)| ((*name).to_owned(), values.clone()))
                .collect(),
        )
    }

    fn trial(index: usize, truth: &[(&str, f64)]) -> Trial {
        Trial {
            index,
            sample_path: PathBuf::from(format!("trial{index}.dat")),
            ground_truth: Some(InjectionRecord::from_columns(truth.iter().copied())),
        }
    }

    fn params(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    #[test]
    fn unreadable_trial_is_skipped_whole() {
        let samples = vec![0.0, 1.0, 2.0, 3.0];
        let store = MapStore(
            [0, 2]
                .into_iter()
                .map(|i| (i, posterior(&[("ra", samples.clone())])))
                .collect(),
        );
        let trials: Vec<Trial> = (0..3).map(|i| trial(i, &[("ra", 2.5)])).collect();
        let parameters = params(&["ra"]);

        let collection = collect(&trials, &store, &parameters);
        assert_eq!(collection.trials_total, 3);
        assert_eq!(collection.trials_read, 2);
        assert_eq!(collection.ensemble.get("ra"), Some(&[0.75, 0.75][..]));
        assert_eq!(collection.skips.len(), 1);
        assert_eq!(collection.skips[0].trial, 1);
        assert_eq!(collection.skips[0].kind, "trial_read_failure");
        assert!(collection.skips[0].is_trial_skip());
    }

    #[test]
    fn missing_ground_truth_row_fails_the_trial() {
        let store = MapStore(HashMap::from([(0, posterior(&[("ra", vec![1.0])]))]));
        let mut lonely = trial(0, &[]);
        lonely.ground_truth = None;
        let collection = collect(&[lonely], &store, &params(&["ra"]));
        assert_eq!(collection.trials_read, 0);
        assert!(collection.ensemble.is_empty());
        assert_eq!(collection.skips[0].kind, "trial_read_failure");
    }

    #[test]
    fn missing_parameter_only_skips_that_pair() {
        let store = MapStore(HashMap::from([(
            0,
            posterior(&[("ra", vec![1.0, 2.0]), ("dec", vec![1.0, 2.0])]),
        )]));
        let trials = [trial(0, &[("ra", 1.5)])];
        let collection = collect(&trials, &store, &params(&["ra", "dec", "psi"]));
        assert_eq!(collection.trials_read, 1);
        assert_eq!(collection.ensemble.get("ra"), Some(&[0.5][..]));
        assert!(collection.ensemble.get("dec").is_none());

        let sides: Vec<_> = collection
            .skips
            .iter()
            .map(|skip| (skip.parameter.as_deref(), skip.side))
            .collect();
        assert_eq!(
            sides,
            vec![
                (Some("dec"), Some(MissingSide::GroundTruth)),
                (Some("psi"), Some(MissingSide::Samples)),
            ]
        );
    }

    #[test]
    fn parallel_matches_sequential() {
        let trials: Vec<Trial> = (0..40)
            .map(|i| trial(i, &[("ra", (i % 7) as f64), ("dec", (i % 3) as f64)]))
            .collect();
        let store = MapStore(
            (0..40)
                .filter(|i| i % 11 != 5)
                .map(|i| {
                    let column: Vec<f64> = (0..10).map(|k| (k + i % 4) as f64 * 0.7).collect();
                    (i, posterior(&[("ra", column.clone()), ("dec", column)]))
                })
                .collect(),
        );
        let parameters = params(&["ra", "dec", "psi"]);

        let sequential = collect(&trials, &store, &parameters);
        let parallel = collect_parallel(&trials, &store, &parameters, 4);

        assert_eq!(parallel.trials_total, sequential.trials_total);
        assert_eq!(parallel.trials_read, sequential.trials_read);
        assert_eq!(parallel.skips.len(), sequential.skips.len());
        let trial_skips = |c: &Collection| {
            c.skips
                .iter()
                .filter(|skip| skip.is_trial_skip())
                .map(|skip| skip.trial)
                .collect::<Vec<_>>()
        };
        assert_eq!(trial_skips(&parallel), trial_skips(&sequential));
        for parameter in ["ra", "dec"] {
            let mut a = sequential.ensemble.get(parameter).unwrap().to_vec();
            let mut b = parallel.ensemble.get(parameter).unwrap().to_vec();
            a.sort_by(f64::total_cmp);
            b.sort_by(f64::total_cmp);
            assert_eq!(a, b);
        }
    }
}
