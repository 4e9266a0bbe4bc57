use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use radebound::{
    Config, PreparedDataset, RadeBoundError, ReportFormat, ThresholdRange,
    constants::{DEFAULT_SWEEP_MAX_THRESHOLD, DEFAULT_SWEEP_MIN_OFFSET},
    sweep,
};
use std::{io::Write, path::PathBuf};

#[derive(Parser)]
#[command(author, version, about = "Sweep item-length thresholds and keep the tightest bound", long_about = None)]
struct Args {
    /// Dataset file: one sequence per line, -1 closes an itemset, -2 the sequence
    dataset: PathBuf,

    /// Confidence parameter, strictly between 0 and 1
    delta: f64,

    /// Offset added to the rounded-up average transaction length for the first threshold
    #[arg(long = "min-offset", default_value_t = DEFAULT_SWEEP_MIN_OFFSET)]
    min_offset: usize,

    /// Largest threshold to try (capped by the longest transaction)
    #[arg(long = "max-threshold", default_value_t = DEFAULT_SWEEP_MAX_THRESHOLD)]
    max_threshold: usize,

    /// Report format: text, json or csv
    #[arg(long = "report", default_value = "text")]
    report: String,

    /// Directory for json/csv reports
    #[arg(short = 'o', long = "output-dir", default_value = "reports")]
    output_dir: PathBuf,

    /// Estimator/solver settings (TOML)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Replication factor of the sample (overrides the config file)
    #[arg(short = 'r', long = "replication-factor")]
    replication_factor: Option<u32>,
}

fn main() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("Error: {e:#}");
        let code = e
            .chain()
            .find_map(|cause| cause.downcast_ref::<RadeBoundError>())
            .map(RadeBoundError::exit_code)
            .unwrap_or(1);
        let _ = std::io::stderr().flush();
        std::process::exit(code);
    }
}

fn run(args: &Args) -> Result<()> {
    let format: ReportFormat = args.report.parse()?;
    let config = Config::load_or_default(args.config.as_deref())?
        .with_overrides(args.replication_factor)?;

    let prepared = PreparedDataset::load(&args.dataset)?;
    let profile = prepared
        .dataset()
        .length_profile()
        .ok_or(RadeBoundError::EmptyDataset)?;
    info!(
        "Transaction length: average {:.3}, max {}",
        profile.average, profile.max
    );

    let range = ThresholdRange::from_profile(&profile, args.min_offset, args.max_threshold)
        .context("No threshold to sweep")?;
    info!("Sweeping thresholds {}..={}", range.min, range.max);

    let name = args.dataset.display().to_string();
    let report = sweep(
        &prepared,
        &name,
        range,
        args.delta,
        &config,
        &config.minimizer(),
    )?;
    if report.best.is_none() {
        warn!("No threshold produced a bound");
    }

    match format {
        ReportFormat::Text => {
            let mut stdout = std::io::stdout().lock();
            write!(stdout, "{}", report.render_text())?;
            stdout.flush()?;
        }
        ReportFormat::Json => {
            let path = report.save_json(&args.output_dir)?;
            info!("Sweep report saved to: {}", path.display());
        }
        ReportFormat::Csv => {
            let path = report.save_csv(&args.output_dir)?;
            info!("Sweep report saved to: {}", path.display());
        }
    }
    Ok(())
}
