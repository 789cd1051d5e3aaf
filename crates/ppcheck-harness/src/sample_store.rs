//! Posterior sample access.
//!
//! [`SampleStore`] hides where a trial's posterior comes from. The file-backed
//! [`CommonFormatStore`] reads the whitespace-delimited "common" format: the
//! first non-comment line names the columns, every following line holds one
//! sample with one number per column.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ppcheck_error::{MissingSide, PpError, Result};
use ppcheck_stats::fractional_rank;

use crate::params::{canonical_name, extend_mass_parameters};
use crate::trial::Trial;

/// Column-oriented posterior samples of one trial.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PosteriorSamples {
    columns: BTreeMap<String, Vec<f64>>,
}

impl PosteriorSamples {
    /// Wrap columns (already normalized names) and add derived mass columns.
    #[must_use]
    pub fn from_columns(mut columns: BTreeMap<String, Vec<f64>>) -> Self {
        extend_mass_parameters(&mut columns);
        Self { columns }
    }

    #[must_use]
    pub fn column(&self, parameter: &str) -> Option<&[f64]> {
        self.columns.get(parameter).map(Vec::as_slice)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Number of samples (rows).
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.values().next().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Samples of one parameter paired with its true value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSampleSet<'a> {
    pub parameter: &'a str,
    pub samples: &'a [f64],
    pub true_value: f64,
}

impl<'a> ParameterSampleSet<'a> {
    /// Pair `parameter`'s samples with the trial's true value.
    pub fn from_trial(
        trial: &'a Trial,
        posterior: &'a PosteriorSamples,
        parameter: &'a str,
    ) -> Result<Self> {
        let missing = |side| PpError::ParameterMissing {
            index: trial.index,
            parameter: parameter.to_owned(),
            side,
        };
        let samples = posterior
            .column(parameter)
            .filter(|column| !column.is_empty())
            .ok_or_else(|| missing(MissingSide::Samples))?;
        let true_value = trial
            .ground_truth
            .as_ref()
            .and_then(|record| record.value(parameter))
            .filter(|value| !value.is_nan())
            .ok_or_else(|| missing(MissingSide::GroundTruth))?;
        Ok(Self {
            parameter,
            samples,
            true_value,
        })
    }

    #[must_use]
    pub fn rank(&self) -> Option<f64> {
        fractional_rank(self.true_value, self.samples)
    }
}

/// Source of posterior samples for a trial.
pub trait SampleStore: Send + Sync {
    fn load(&self, trial: &Trial) -> Result<PosteriorSamples>;
}

/// Reads `trial.sample_path` in the common sample format.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonFormatStore;

impl SampleStore for CommonFormatStore {
    fn load(&self, trial: &Trial) -> Result<PosteriorSamples> {
        let text = fs::read_to_string(&trial.sample_path)?;
        parse_common_samples(&text, &trial.sample_path)
    }
}

/// Parse common-format text. `path` is only used in errors.
pub fn parse_common_samples(text: &str, path: &Path) -> Result<PosteriorSamples> {
    let parse_error = |line: usize, detail: String| PpError::Parse {
        path: path.to_path_buf(),
        line,
        detail,
    };

    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

    let (header_line, header) = lines
        .next()
        .ok_or_else(|| parse_error(0, "no header line".to_owned()))?;
    let names: Vec<String> = header.split_whitespace().map(canonical_name).collect();
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(parse_error(header_line, format!("duplicate column `{name}`")));
        }
    }

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
    for (line_no, line) in lines {
        let mut width = 0;
        for (field, column) in line.split_whitespace().zip(columns.iter_mut()) {
            let value = field.parse::<f64>().map_err(|_| {
                parse_error(line_no, format!("`{field}` is not a number"))
            })?;
            column.push(value);
            width += 1;
        }
        let fields = line.split_whitespace().count();
        if width != names.len() || fields != names.len() {
            return Err(parse_error(
                line_no,
                format!("expected {} values, found {fields}", names.len()),
            ));
        }
    }

    Ok(PosteriorSamples::from_columns(
        names.into_iter().zip(columns).collect(),
    ))
}
