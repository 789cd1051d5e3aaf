//! JSON report and per-parameter rank files.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use ppcheck_error::Result;
use ppcheck_stats::{PValueMethod, PpCurve, synthetic_reference_curves};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregator::SkipEvent;
use crate::config::PpConfig;
use crate::params::latex_label;
use crate::pipeline::{PpAnalysis, UntestedParameter};

pub const REPORT_SCHEMA_VERSION: u32 = 1;
pub const REPORT_FILE_NAME: &str = "report.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterReport {
    pub label: String,
    pub p_value: f64,
    /// KS distance `D`.
    pub statistic: f64,
    pub count: usize,
    pub method: PValueMethod,
    pub degenerate: bool,
    pub calibrated: bool,
    /// Rank file name, relative to the output directory.
    pub ranks_file: String,
    pub pp_curve: PpCurve,
    /// Curves of uniform draws of the same size, for visual comparison.
    pub reference_curves: Vec<PpCurve>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PpReport {
    pub schema_version: u32,
    pub generated_by: String,
    pub trials_total: usize,
    pub trials_read: usize,
    pub significance_level: f64,
    pub parameters: BTreeMap<String, ParameterReport>,
    pub untested: Vec<UntestedParameter>,
    pub skips: Vec<SkipEvent>,
}

impl PpReport {
    /// Tested parameters that reject uniformity.
    #[must_use]
    pub fn miscalibrated(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|(_, entry)| !entry.calibrated)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[must_use]
pub fn rank_file_name(parameter: &str) -> String {
    format!("{parameter}-ps.dat")
}

#[must_use]
pub fn build_report(analysis: &PpAnalysis, config: &PpConfig) -> PpReport {
    let parameters = analysis
        .consistency
        .iter()
        .enumerate()
        .map(|(position, (name, entry))| {
            let ranks = analysis.ensemble().get(name).unwrap_or_default();
            let seed = config.seed.wrapping_add(position as u64);
            let report = ParameterReport {
                label: latex_label(name).to_owned(),
                p_value: entry.p_value(),
                statistic: entry.test.statistic.d,
                count: entry.count(),
                method: entry.test.method,
                degenerate: entry.degenerate,
                calibrated: entry.test.is_calibrated(config.significance_level),
                ranks_file: rank_file_name(name),
                pp_curve: PpCurve::from_ranks(ranks),
                reference_curves: synthetic_reference_curves(
                    ranks.len(),
                    config.synthetic_curves,
                    seed,
                ),
            };
            (name.to_owned(), report)
        })
        .collect();

    PpReport {
        schema_version: REPORT_SCHEMA_VERSION,
        generated_by: format!("ppcheck-harness {}", env!("CARGO_PKG_VERSION")),
        trials_total: analysis.collection.trials_total,
        trials_read: analysis.collection.trials_read,
        significance_level: config.significance_level,
        parameters,
        untested: analysis.untested.clone(),
        skips: analysis.collection.skips.clone(),
    }
}

/// Format like C's `%.18e`: `2.500000000000000000e-01`.
#[must_use]
pub fn format_rank(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string().to_ascii_lowercase();
    }
    let formatted = format!("{value:.18e}");
    let Some((mantissa, exponent)) = formatted.split_once('e') else {
        return formatted;
    };
    let (sign, digits) = exponent
        .strip_prefix('-')
        .map_or(("+", exponent), |digits| ("-", digits));
    format!("{mantissa}e{sign}{digits:0>2}")
}

/// One rank per line.
pub fn write_rank_file(path: &Path, ranks: &[f64]) -> Result<()> {
    let mut text = String::with_capacity(ranks.len() * 26);
    for &rank in ranks {
        let _ = writeln!(text, "{}", format_rank(rank));
    }
    fs::write(path, text)?;
    Ok(())
}

/// Create `outdir` and write the rank files and `report.json` into it.
/// Returns the report path.
pub fn write_outputs(outdir: &Path, analysis: &PpAnalysis, report: &PpReport) -> Result<PathBuf> {
    fs::create_dir_all(outdir)?;
    for (name, entry) in &report.parameters {
        let ranks = analysis.ensemble().get(name).unwrap_or_default();
        write_rank_file(&outdir.join(&entry.ranks_file), ranks)?;
    }

    let report_path = outdir.join(REPORT_FILE_NAME);
    let payload = serde_json::to_string_pretty(report)?;
    fs::write(&report_path, payload)?;
    info!(
        path = %report_path.display(),
        parameters = report.parameters.len(),
        untested = report.untested.len(),
        "wrote p-p report"
    );
    Ok(report_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_formatting_matches_printf() {
        assert_eq!(format_rank(0.25), "2.500000000000000000e-01");
        assert_eq!(format_rank(1.0), "1.000000000000000000e+00");
        assert_eq!(format_rank(0.0), "0.000000000000000000e+00");
        assert_eq!(format_rank(1.5e-120), "1.500000000000000000e-120");
    }

    #[test]
    fn rank_file_has_one_line_per_rank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(rank_file_name("mc"));
        write_rank_file(&path, &[0.25, 0.75]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "2.500000000000000000e-01\n7.500000000000000000e-01\n"
        );
        assert!(path.ends_with("mc-ps.dat"));
    }
}
