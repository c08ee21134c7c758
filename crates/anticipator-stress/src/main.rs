use std::path::PathBuf;
use std::time::Duration;

use anticipator::config::Config;
use anticipator::{Anticipator, logging, metrics};
use anyhow::{Context, Result};
use clap::Parser;

use crate::stresstest::perform_stresstest;
use crate::workloads::WorkloadsConfig;

mod stresstest;
mod workloads;

/// Measures retrieval latencies of anticipated and inline-computed results.
#[derive(Parser)]
struct Cli {
    /// Path to your configuration file.
    #[arg(long, short, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to the workload definition file.
    #[arg(long, short, value_name = "FILE")]
    workloads: PathBuf,

    /// How long the worker may precompute before retrieval starts.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "100ms")]
    warmup: Duration,

    /// Duration of the stresstest.
    #[arg(long, short, value_parser = humantime::parse_duration)]
    duration: Duration,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // parse configs
    let workloads_file =
        std::fs::File::open(&cli.workloads).context("failed to open workloads file")?;
    let workloads: WorkloadsConfig =
        serde_yaml::from_reader(workloads_file).context("failed to parse workloads YAML")?;

    let config = Config::get(cli.config.as_deref()).context("failed loading config")?;

    // SAFETY: no thread has been started yet. The sentry transport starts with `sentry::init`
    // below, the anticipation worker with the first anticipation.
    unsafe { logging::init_logging(&config) };

    let _sentry = sentry::init(sentry::ClientOptions {
        dsn: config.sentry_dsn.clone(),
        release: sentry::release_name!(),
        ..Default::default()
    });

    if let Some(ref statsd) = config.metrics.statsd {
        if let Err(error) = metrics::configure_statsd(
            &config.metrics.prefix,
            statsd.as_str(),
            config.metrics.custom_tags.clone(),
        ) {
            logging::ensure_log_error(&error);
        }
    }

    let anticipator = Anticipator::from_config(&config.scheduler);
    let result = perform_stresstest(
        anticipator,
        &config.warmup,
        workloads,
        cli.warmup,
        cli.duration,
    );
    if let Err(ref error) = result {
        logging::ensure_log_error(error);
    }

    result
}
