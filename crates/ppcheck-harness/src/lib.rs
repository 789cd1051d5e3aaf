//! p-p coverage analysis of posterior samples against known injections.
//!
//! A run pairs posterior sample files with injection records ([`trial`]),
//! reads each posterior through a [`sample_store::SampleStore`], pools the
//! fractional rank of every true value per parameter ([`aggregator`]) and
//! tests each pool for uniformity ([`pipeline`]). [`report`] writes the
//! JSON report and the per-parameter rank files.

pub mod aggregator;
pub mod config;
pub mod injection;
pub mod params;
pub mod pipeline;
pub mod report;
pub mod sample_store;
pub mod trial;

pub use aggregator::{Collection, RankEnsemble, SkipEvent, TrialAggregator, collect, collect_parallel};
pub use config::{CliOverrides, ConfigLoadResult, PpConfig, load_config, load_config_from_str};
pub use injection::{InjectionRecord, InjectionTable};
pub use pipeline::{
    AnalysisOptions, ConsistencyResult, ParameterConsistency, PipelinePhase, PpAnalysis,
    UntestedParameter, run_pp_analysis,
};
pub use report::{
    ParameterReport, PpReport, build_report, format_rank, write_outputs, write_rank_file,
};
pub use sample_store::{
    CommonFormatStore, ParameterSampleSet, PosteriorSamples, SampleStore, parse_common_samples,
};
pub use trial::{Trial, pair_trials};
