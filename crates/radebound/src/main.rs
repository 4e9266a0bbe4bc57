use anyhow::Result;
use clap::Parser;
use log::{debug, error, info};
use radebound::{Config, RadeBoundError, estimate_bound};
use std::{io::Write, path::PathBuf};

#[derive(Parser)]
#[command(author, version, about = "Upper bound on the maximum frequency deviation of sequential patterns", long_about = None)]
struct Args {
    /// Dataset file: one sequence per line, -1 closes an itemset, -2 the sequence
    dataset: PathBuf,

    /// Confidence parameter, strictly between 0 and 1
    delta: f64,

    /// Item-length threshold
    item_length_threshold: usize,

    /// Estimator/solver settings (TOML)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Replication factor of the sample (overrides the config file)
    #[arg(short = 'r', long = "replication-factor")]
    replication_factor: Option<u32>,
}

fn main() {
    // Initialize logger - defaults to RUST_LOG if set, otherwise INFO
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        exit_with_error(e);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = Config::load_or_default(args.config.as_deref())?
        .with_overrides(args.replication_factor)?;
    debug!("Configuration: {config:?}");

    let estimate = estimate_bound(
        &args.dataset,
        args.delta,
        args.item_length_threshold,
        &config,
    )?;
    info!(
        "Rademacher bound {} at s* = {}, concentration term {}",
        estimate.rademacher, estimate.scale, estimate.concentration
    );

    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{} {}", args.dataset.display(), estimate.bound)?;
    stdout.flush()?;
    Ok(())
}

fn exit_with_error(e: anyhow::Error) -> ! {
    let code = match e.downcast_ref::<RadeBoundError>() {
        Some(failure @ RadeBoundError::OptimizationFailed { .. }) => {
            println!("{failure}");
            1
        }
        Some(err) => {
            error!("Error: {err}");
            if let Some(source) = std::error::Error::source(err) {
                error!("Caused by: {source}");
            }
            err.exit_code()
        }
        None => {
            error!("Error: {e}");
            e.chain()
                .find_map(|cause| cause.downcast_ref::<std::io::Error>())
                .and_then(std::io::Error::raw_os_error)
                .unwrap_or(1)
        }
    };
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();
    std::process::exit(code);
}
