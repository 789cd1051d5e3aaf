use std::collections::HashMap;
use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use ppcheck_harness::config::emit_config_loaded;
use ppcheck_harness::trial::resolve_sample_path;
use ppcheck_harness::{
    CliOverrides, CommonFormatStore, InjectionTable, build_report, load_config, pair_trials,
    run_pp_analysis, write_outputs,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct CliArgs {
    overrides: CliOverrides,
    sample_paths: Vec<PathBuf>,
    fail_below: Option<f64>,
    log_json: bool,
}

fn print_help() {
    let help = "\
pp-analysis - p-p coverage check of posterior samples against injections

USAGE:
    pp-analysis [OPTIONS] <SAMPLES>...

    Each <SAMPLES> is a posterior sample file, or a run directory holding one
    (see --postsamples). Files pair with injection rows by position.

OPTIONS:
    --injections <PATH>        JSON injection table (required unless set in config/env)
    --outdir <DIR>             Output directory for report.json and <par>-ps.dat (default pp-output)
    --postsamples <NAME>       Sample file name inside run directories (default posterior_samples.dat)
    --par <NAME>               Parameter to test; repeatable (default: standard 18)
    --significance <f64>       Level below which a p-value counts as miscalibrated (default 0.01)
    --workers <N>              Threads reading sample files (default 1)
    --synthetic-curves <N>     Uniform reference curves per parameter (default 10)
    --seed <u64>               Seed for reference curves (default 0)
    --config <PATH>            TOML config file (also PPCHECK_CONFIG)
    --fail-below <f64>         Exit 1 when a tested parameter's p-value falls below this
    --log-json                 Emit logs as JSON lines on stderr
    -h, --help                 Show this help

Logging honours RUST_LOG (default info).
";
    println!("{help}");
}

fn take_value<'a>(args: &'a [String], index: &mut usize, flag: &str) -> Result<&'a str, String> {
    *index += 1;
    args.get(*index)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("invalid {flag} value: {value}"))
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();
    let mut parameters: Vec<String> = Vec::new();

    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--injections" => {
                let value = take_value(args, &mut index, "--injections")?;
                cli.overrides.injection_path = Some(PathBuf::from(value));
            }
            "--outdir" => {
                let value = take_value(args, &mut index, "--outdir")?;
                cli.overrides.outdir = Some(PathBuf::from(value));
            }
            "--postsamples" => {
                let value = take_value(args, &mut index, "--postsamples")?;
                cli.overrides.posterior_samples_name = Some(value.to_owned());
            }
            "--par" => {
                parameters.push(take_value(args, &mut index, "--par")?.to_owned());
            }
            "--significance" => {
                let value = take_value(args, &mut index, "--significance")?;
                cli.overrides.significance_level = Some(parse_number(value, "--significance")?);
            }
            "--workers" => {
                let value = take_value(args, &mut index, "--workers")?;
                cli.overrides.workers = Some(parse_number(value, "--workers")?);
            }
            "--synthetic-curves" => {
                let value = take_value(args, &mut index, "--synthetic-curves")?;
                cli.overrides.synthetic_curves = Some(parse_number(value, "--synthetic-curves")?);
            }
            "--seed" => {
                let value = take_value(args, &mut index, "--seed")?;
                cli.overrides.seed = Some(parse_number(value, "--seed")?);
            }
            "--config" => {
                let value = take_value(args, &mut index, "--config")?;
                cli.overrides.config_path = Some(PathBuf::from(value));
            }
            "--fail-below" => {
                let value = take_value(args, &mut index, "--fail-below")?;
                cli.fail_below = Some(parse_number(value, "--fail-below")?);
            }
            "--log-json" => cli.log_json = true,
            "-h" | "--help" => {
                print_help();
                return Err(String::new());
            }
            unknown if unknown.starts_with("--") => {
                return Err(format!("unknown option: {unknown}"));
            }
            path => cli.sample_paths.push(PathBuf::from(path)),
        }
        index += 1;
    }

    if !parameters.is_empty() {
        cli.overrides.parameters = Some(parameters);
    }
    if cli.sample_paths.is_empty() {
        return Err("at least one posterior sample path is required".to_owned());
    }
    Ok(cli)
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Returns the parameters that fell below `--fail-below`.
fn run(cli: &CliArgs) -> Result<Vec<String>, String> {
    let env: HashMap<String, String> = env::vars().collect();
    let loaded = load_config(&env, &cli.overrides).map_err(|error| error.to_string())?;
    emit_config_loaded(&loaded);
    let config = loaded.config;

    let injection_path = config
        .require_injection_path()
        .map_err(|error| error.to_string())?;
    let injections = InjectionTable::load(injection_path).map_err(|error| {
        format!(
            "injection_read_failed path={} error={error}",
            injection_path.display()
        )
    })?;

    let sample_paths = cli
        .sample_paths
        .iter()
        .map(|path| resolve_sample_path(path, &config.posterior_samples_name));
    let trials = pair_trials(sample_paths, &injections);
    info!(trials = trials.len(), injections = injections.len(), "trials paired");

    let analysis = run_pp_analysis(
        &trials,
        &CommonFormatStore,
        &config.parameters,
        &config.analysis_options(),
    );
    let report = build_report(&analysis, &config);
    write_outputs(&config.outdir, &analysis, &report).map_err(|error| {
        format!(
            "report_write_failed outdir={} error={error}",
            config.outdir.display()
        )
    })?;

    println!("parameter\tp_value\tcount");
    for (name, entry) in &report.parameters {
        println!("{name}\t{:.6}\t{}", entry.p_value, entry.count);
    }
    println!("trials_read={} of {}", report.trials_read, report.trials_total);

    let failing = cli.fail_below.map_or_else(Vec::new, |threshold| {
        report
            .parameters
            .iter()
            .filter(|(_, entry)| !entry.degenerate && entry.p_value < threshold)
            .map(|(name, _)| name.clone())
            .collect()
    });
    Ok(failing)
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(error) if error.is_empty() => return ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("ERROR pp-analysis: {error}");
            return ExitCode::from(2);
        }
    };
    init_tracing(cli.log_json);

    match run(&cli) {
        Ok(failing) if failing.is_empty() => ExitCode::SUCCESS,
        Ok(failing) => {
            eprintln!(
                "ERROR pp-analysis: parameters below --fail-below: {}",
                failing.join(", ")
            );
            ExitCode::from(1)
        }
        Err(error) => {
            eprintln!("ERROR pp-analysis failed: {error}");
            ExitCode::from(2)
        }
    }
}
