//! Run configuration with layered sources: CLI > env > file > defaults.
//!
//! The file is TOML with the same keys as [`PpConfig`]; environment
//! overrides use `PPCHECK_*` keys and are read from an injected map so tests
//! never touch the process environment.

use std::collections::HashMap;
use std::fs;
use std::hash::BuildHasher;
use std::path::{Path, PathBuf};

use ppcheck_error::{PpError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::params::{canonical_name, default_parameters};
use crate::pipeline::AnalysisOptions;

/// Environment key naming a config file when `--config` is absent.
pub const CONFIG_PATH_ENV: &str = "PPCHECK_CONFIG";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Cli,
    Env,
    File,
    Defaults,
}

pub const PRECEDENCE: [ConfigSource; 4] = [
    ConfigSource::Cli,
    ConfigSource::Env,
    ConfigSource::File,
    ConfigSource::Defaults,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PpConfig {
    /// Parameters to test, in report order.
    pub parameters: Vec<String>,
    /// JSON injection table; required to run.
    pub injection_path: Option<PathBuf>,
    pub outdir: PathBuf,
    /// Sample file looked up inside directory arguments.
    pub posterior_samples_name: String,
    /// p-values below this mark a parameter as miscalibrated.
    pub significance_level: f64,
    pub min_ranks_warning: usize,
    pub workers: usize,
    /// Synthetic uniform p-p curves stored per parameter.
    pub synthetic_curves: usize,
    pub seed: u64,
}

impl Default for PpConfig {
    fn default() -> Self {
        Self {
            parameters: default_parameters(),
            injection_path: None,
            outdir: PathBuf::from("pp-output"),
            posterior_samples_name: "posterior_samples.dat".to_owned(),
            significance_level: 0.01,
            min_ranks_warning: 10,
            workers: 1,
            synthetic_curves: 10,
            seed: 0,
        }
    }
}

impl PpConfig {
    pub fn require_injection_path(&self) -> Result<&Path> {
        self.injection_path.as_deref().ok_or_else(|| {
            PpError::invalid_config("injection_path", "<unset>", "an injection table is required")
        })
    }

    #[must_use]
    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            workers: self.workers,
            min_ranks_warning: self.min_ranks_warning,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
struct PpConfigPatch {
    parameters: Option<Vec<String>>,
    injection_path: Option<PathBuf>,
    outdir: Option<PathBuf>,
    posterior_samples_name: Option<String>,
    significance_level: Option<f64>,
    min_ranks_warning: Option<usize>,
    workers: Option<usize>,
    synthetic_curves: Option<usize>,
    seed: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub parameters: Option<Vec<String>>,
    pub injection_path: Option<PathBuf>,
    pub outdir: Option<PathBuf>,
    pub posterior_samples_name: Option<String>,
    pub significance_level: Option<f64>,
    pub workers: Option<usize>,
    pub synthetic_curves: Option<usize>,
    pub seed: Option<u64>,
    pub config_path: Option<PathBuf>,
}

impl CliOverrides {
    #[must_use]
    pub fn used_flags(&self) -> Vec<String> {
        let flags = [
            (self.parameters.is_some(), "--par"),
            (self.injection_path.is_some(), "--injections"),
            (self.outdir.is_some(), "--outdir"),
            (self.posterior_samples_name.is_some(), "--postsamples"),
            (self.significance_level.is_some(), "--significance"),
            (self.workers.is_some(), "--workers"),
            (self.synthetic_curves.is_some(), "--synthetic-curves"),
            (self.seed.is_some(), "--seed"),
            (self.config_path.is_some(), "--config"),
        ];
        flags
            .into_iter()
            .filter(|(used, _)| *used)
            .map(|(_, flag)| flag.to_owned())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLoadResult {
    pub config: PpConfig,
    pub config_file_used: Option<PathBuf>,
    pub cli_flags_used: Vec<String>,
    pub env_keys_used: Vec<String>,
}

/// Load the configuration, reading the TOML file named by `--config` or
/// `PPCHECK_CONFIG` when present.
pub fn load_config<S>(env: &HashMap<String, String, S>, cli: &CliOverrides) -> Result<ConfigLoadResult>
where
    S: BuildHasher,
{
    let config_file = cli
        .config_path
        .clone()
        .or_else(|| env.get(CONFIG_PATH_ENV).map(PathBuf::from));
    let toml_contents = match &config_file {
        Some(path) => Some(fs::read_to_string(path).map_err(|error| {
            PpError::invalid_config("config_file", path.display(), error.to_string())
        })?),
        None => None,
    };
    load_config_from_str(toml_contents.as_deref(), config_file.as_deref(), env, cli)
}

/// Layer raw TOML, environment and CLI overrides over the defaults.
pub fn load_config_from_str<S>(
    config_toml: Option<&str>,
    config_file_path: Option<&Path>,
    env: &HashMap<String, String, S>,
    cli: &CliOverrides,
) -> Result<ConfigLoadResult>
where
    S: BuildHasher,
{
    let mut config = PpConfig::default();

    if let Some(config_toml) = config_toml {
        let patch: PpConfigPatch =
            toml::from_str(config_toml).map_err(|error| PpError::InvalidConfig {
                field: "config_file".into(),
                value: config_file_path
                    .map_or_else(|| "<toml>".to_owned(), |path| path.display().to_string()),
                reason: error.to_string(),
            })?;
        apply_patch(&mut config, patch);
    }

    let env_keys_used = apply_env_overrides(&mut config, env)?;
    apply_cli_overrides(&mut config, cli);
    config.parameters = config
        .parameters
        .iter()
        .map(|name| canonical_name(name))
        .collect();
    validate_config(&config)?;

    Ok(ConfigLoadResult {
        config,
        config_file_used: config_file_path.map(Path::to_path_buf),
        cli_flags_used: cli.used_flags(),
        env_keys_used,
    })
}

pub fn emit_config_loaded(result: &ConfigLoadResult) {
    info!(
        precedence = ?PRECEDENCE,
        config_file_used = ?result.config_file_used,
        cli_flags_used = ?result.cli_flags_used,
        env_keys_used = ?result.env_keys_used,
        parameters = result.config.parameters.len(),
        workers = result.config.workers,
        significance_level = result.config.significance_level,
        "ppcheck configuration loaded"
    );
}

fn apply_patch(config: &mut PpConfig, patch: PpConfigPatch) {
    if let Some(parameters) = patch.parameters {
        config.parameters = parameters;
    }
    if let Some(path) = patch.injection_path {
        config.injection_path = Some(path);
    }
    if let Some(outdir) = patch.outdir {
        config.outdir = outdir;
    }
    if let Some(name) = patch.posterior_samples_name {
        config.posterior_samples_name = name;
    }
    if let Some(level) = patch.significance_level {
        config.significance_level = level;
    }
    if let Some(count) = patch.min_ranks_warning {
        config.min_ranks_warning = count;
    }
    if let Some(workers) = patch.workers {
        config.workers = workers;
    }
    if let Some(count) = patch.synthetic_curves {
        config.synthetic_curves = count;
    }
    if let Some(seed) = patch.seed {
        config.seed = seed;
    }
}

fn apply_env_overrides(
    config: &mut PpConfig,
    env: &HashMap<String, String, impl BuildHasher>,
) -> Result<Vec<String>> {
    let mut keys_used = Vec::new();

    if let Some(value) = env.get("PPCHECK_PARAMETERS") {
        config.parameters = parse_csv(value, "parameters")?;
        keys_used.push("PPCHECK_PARAMETERS".into());
    }
    if let Some(value) = env.get("PPCHECK_INJECTIONS") {
        config.injection_path = Some(PathBuf::from(value));
        keys_used.push("PPCHECK_INJECTIONS".into());
    }
    if let Some(value) = env.get("PPCHECK_OUTDIR") {
        config.outdir = PathBuf::from(value);
        keys_used.push("PPCHECK_OUTDIR".into());
    }
    if let Some(value) = env.get("PPCHECK_POSTERIOR_SAMPLES_NAME") {
        config.posterior_samples_name.clone_from(value);
        keys_used.push("PPCHECK_POSTERIOR_SAMPLES_NAME".into());
    }
    if let Some(value) = env.get("PPCHECK_SIGNIFICANCE_LEVEL") {
        config.significance_level = parse_f64(value, "significance_level")?;
        keys_used.push("PPCHECK_SIGNIFICANCE_LEVEL".into());
    }
    if let Some(value) = env.get("PPCHECK_MIN_RANKS_WARNING") {
        config.min_ranks_warning = parse_usize(value, "min_ranks_warning")?;
        keys_used.push("PPCHECK_MIN_RANKS_WARNING".into());
    }
    if let Some(value) = env.get("PPCHECK_WORKERS") {
        config.workers = parse_usize(value, "workers")?;
        keys_used.push("PPCHECK_WORKERS".into());
    }
    if let Some(value) = env.get("PPCHECK_SYNTHETIC_CURVES") {
        config.synthetic_curves = parse_usize(value, "synthetic_curves")?;
        keys_used.push("PPCHECK_SYNTHETIC_CURVES".into());
    }
    if let Some(value) = env.get("PPCHECK_SEED") {
        config.seed = value
            .parse::<u64>()
            .map_err(|_| PpError::invalid_config("seed", value, "expected unsigned integer"))?;
        keys_used.push("PPCHECK_SEED".into());
    }

    Ok(keys_used)
}

fn apply_cli_overrides(config: &mut PpConfig, cli: &CliOverrides) {
    if let Some(parameters) = &cli.parameters {
        config.parameters.clone_from(parameters);
    }
    if let Some(path) = &cli.injection_path {
        config.injection_path = Some(path.clone());
    }
    if let Some(outdir) = &cli.outdir {
        config.outdir.clone_from(outdir);
    }
    if let Some(name) = &cli.posterior_samples_name {
        config.posterior_samples_name.clone_from(name);
    }
    if let Some(level) = cli.significance_level {
        config.significance_level = level;
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(count) = cli.synthetic_curves {
        config.synthetic_curves = count;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
}

fn validate_config(config: &PpConfig) -> Result<()> {
    if config.parameters.is_empty() {
        return Err(PpError::invalid_config(
            "parameters",
            "[]",
            "at least one parameter is required",
        ));
    }
    for (i, name) in config.parameters.iter().enumerate() {
        if config.parameters[..i].contains(name) {
            return Err(PpError::invalid_config(
                "parameters",
                name,
                "parameter listed twice",
            ));
        }
    }
    if !(config.significance_level > 0.0 && config.significance_level < 1.0) {
        return Err(PpError::invalid_config(
            "significance_level",
            config.significance_level,
            "must be in (0, 1)",
        ));
    }
    if !(1_usize..=1024_usize).contains(&config.workers) {
        return Err(PpError::invalid_config(
            "workers",
            config.workers,
            "must be between 1 and 1024",
        ));
    }
    if config.posterior_samples_name.trim().is_empty() {
        return Err(PpError::invalid_config(
            "posterior_samples_name",
            "\"\"",
            "must not be empty",
        ));
    }
    Ok(())
}

fn parse_csv(value: &str, field: &str) -> Result<Vec<String>> {
    let parts: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();

    if parts.is_empty() {
        return Err(PpError::invalid_config(
            field,
            value,
            "expected at least one comma-separated value",
        ));
    }
    Ok(parts)
}

fn parse_usize(value: &str, field: &str) -> Result<usize> {
    value
        .parse::<usize>()
        .map_err(|_| PpError::invalid_config(field, value, "expected unsigned integer"))
}

fn parse_f64(value: &str, field: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|_| PpError::invalid_config(field, value, "expected a number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn defaults_apply_without_sources() {
        let loaded =
            load_config_from_str(None, None, &HashMap::new(), &CliOverrides::default()).unwrap();
        assert_eq!(loaded.config, PpConfig::default());
        assert_eq!(loaded.config.parameters.len(), 18);
        assert!(loaded.env_keys_used.is_empty());
        assert!(loaded.config.require_injection_path().is_err());
    }

    #[test]
    fn precedence_cli_over_env_over_file() {
        let toml = "workers = 2\nsignificance_level = 0.05\nseed = 7\noutdir = \"from-file\"\n";
        let env = env(&[("PPCHECK_WORKERS", "3"), ("PPCHECK_OUTDIR", "from-env")]);
        let cli = CliOverrides {
            workers: Some(4),
            ..CliOverrides::default()
        };
        let loaded = load_config_from_str(Some(toml), None, &env, &cli).unwrap();
        assert_eq!(loaded.config.workers, 4);
        assert_eq!(loaded.config.outdir, PathBuf::from("from-env"));
        assert_eq!(loaded.config.significance_level, 0.05);
        assert_eq!(loaded.config.seed, 7);
        assert_eq!(loaded.cli_flags_used, vec!["--workers".to_owned()]);
        assert_eq!(
            loaded.env_keys_used,
            vec!["PPCHECK_OUTDIR".to_owned(), "PPCHECK_WORKERS".to_owned()]
        );
    }

    #[test]
    fn parameter_names_are_canonicalized() {
        let env = env(&[("PPCHECK_PARAMETERS", "mchirp, Distance,ra")]);
        let loaded = load_config_from_str(None, None, &env, &CliOverrides::default()).unwrap();
        assert_eq!(loaded.config.parameters, vec!["mc", "dist", "ra"]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad_level = env(&[("PPCHECK_SIGNIFICANCE_LEVEL", "1.5")]);
        let err = load_config_from_str(None, None, &bad_level, &CliOverrides::default())
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_config");

        let bad_workers = CliOverrides {
            workers: Some(0),
            ..CliOverrides::default()
        };
        assert!(load_config_from_str(None, None, &HashMap::new(), &bad_workers).is_err());

        let duplicate = CliOverrides {
            parameters: Some(vec!["mc".to_owned(), "mchirp".to_owned()]),
            ..CliOverrides::default()
        };
        assert!(load_config_from_str(None, None, &HashMap::new(), &duplicate).is_err());
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let err = load_config_from_str(
            Some("wokers = 2\n"),
            Some(Path::new("pp.toml")),
            &HashMap::new(),
            &CliOverrides::default(),
        )
        .unwrap_err();
        match err {
            PpError::InvalidConfig { field, value, .. } => {
                assert_eq!(field, "config_file");
                assert_eq!(value, "pp.toml");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn config_file_is_read_from_env_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pp.toml");
        fs::write(&path, "synthetic_curves = 3\n").unwrap();
        let env = env(&[(CONFIG_PATH_ENV, path.to_str().unwrap())]);
        let loaded = load_config(&env, &CliOverrides::default()).unwrap();
        assert_eq!(loaded.config.synthetic_curves, 3);
        assert_eq!(loaded.config_file_used, Some(path));
    }
}
