//! Positional pairing of posterior sample files with injection records.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::injection::{InjectionRecord, InjectionTable};

/// One simulated injection and the posterior inferred for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub index: usize,
    pub sample_path: PathBuf,
    /// `None` when the injection table has no row at `index`; such a trial
    /// fails to read.
    pub ground_truth: Option<InjectionRecord>,
}

/// Resolve a positional sample argument: directories name the run directory
/// and hold the sample file `samples_name`.
#[must_use]
pub fn resolve_sample_path(path: &Path, samples_name: &str) -> PathBuf {
    if path.is_dir() {
        path.join(samples_name)
    } else {
        path.to_path_buf()
    }
}

/// Pair the `i`-th sample path with the `i`-th injection record.
pub fn pair_trials<I>(sample_paths: I, injections: &InjectionTable) -> Vec<Trial>
where
    I: IntoIterator<Item = PathBuf>,
{
    let trials: Vec<Trial> = sample_paths
        .into_iter()
        .enumerate()
        .map(|(index, sample_path)| Trial {
            index,
            sample_path,
            ground_truth: injections.get(index).cloned(),
        })
        .collect();

    if trials.len() != injections.len() {
        warn!(
            sample_files = trials.len(),
            injections = injections.len(),
            "sample file count differs from injection count; pairing positionally"
        );
    }
    trials
}
