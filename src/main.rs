//! Strokewatch: stroke-risk inference from the command line.
//!
//! Usage:
//!
//! ```bash
//! strokewatch health
//! strokewatch predict [FILE|-]     # NDJSON records in, NDJSON responses out
//! strokewatch manifest [DIR]       # write manifest.json for an artifact directory
//! ```
//!
//! Results go to stdout. Logs go to stderr or a file, never stdout.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use strokewatch::adapters::sanitize::SanitizingMakeWriter;
use strokewatch::adapters::{ArtifactStore, LogisticModel};
use strokewatch::application::{BatchProgress, BatchWorker};
use strokewatch::config::{LogMode, ServiceConfig};
use strokewatch::{PredictionService, RawPatientRecord, StrokeError};

const USAGE: &str = "usage: strokewatch <health | predict [FILE|-] | manifest [DIR]>";

fn init_logging(mode: &LogMode) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let (writer, guard) = match mode {
        LogMode::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory {}", parent.display())
                })?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    Ok(guard)
}

fn build_service(config: &Result<ServiceConfig, StrokeError>) -> PredictionService<LogisticModel> {
    match config {
        Ok(config) => PredictionService::initialize(config),
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            PredictionService::unavailable(e.to_string())
        }
    }
}

fn write_json<W: Write, T: serde::Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    out.write_all(b"\n")?;
    Ok(())
}

fn run_health(config: &Result<ServiceConfig, StrokeError>) -> Result<ExitCode> {
    let service = build_service(config);
    let health = service.health();

    let mut out = io::stdout().lock();
    write_json(&mut out, &health)?;

    Ok(if health.is_healthy() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn open_input(path: Option<&str>) -> Result<Box<dyn BufRead>> {
    match path {
        None | Some("-") => Ok(Box::new(BufReader::new(io::stdin()))),
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open {path}"))?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

fn run_predict(
    config: &Result<ServiceConfig, StrokeError>,
    input: Option<&str>,
) -> Result<ExitCode> {
    let workers = config.as_ref().map_or(1, |c| c.workers);
    let service = Arc::new(build_service(config));

    // One slot per non-blank input line; unparseable lines are answered directly.
    let mut outputs: Vec<Option<serde_json::Value>> = Vec::new();
    let mut records = Vec::new();
    let mut slots = Vec::new();

    for line in open_input(input)?.lines() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RawPatientRecord>(&line) {
            Ok(record) => {
                slots.push(outputs.len());
                records.push(record);
                outputs.push(None);
            }
            Err(e) => {
                tracing::info!("Skipping malformed input line {}", outputs.len() + 1);
                let error = StrokeError::from(e).to_response();
                outputs.push(Some(serde_json::to_value(&error)?));
            }
        }
    }

    let handle = BatchWorker::spawn(Arc::clone(&service), records, workers);
    let mut all_ok = outputs.iter().all(Option::is_none);
    for progress in handle.iter() {
        match progress {
            BatchProgress::Scored { index, outcome } => {
                let value = match outcome {
                    Ok(response) => serde_json::to_value(&response)?,
                    Err(error) => serde_json::to_value(&error)?,
                };
                if let Some(output) = slots.get(index).and_then(|&slot| outputs.get_mut(slot)) {
                    *output = Some(value);
                }
            }
            BatchProgress::Finished(summary) => {
                all_ok &= summary.rejected == 0;
                tracing::info!(
                    "Scored {} of {} records (high={}, medium={}, low={})",
                    summary.scored,
                    summary.total,
                    summary.high,
                    summary.medium,
                    summary.low
                );
            }
        }
    }

    let mut out = BufWriter::new(io::stdout().lock());
    for output in outputs {
        match output {
            Some(value) => write_json(&mut out, &value)?,
            None => bail!("Batch worker stopped before scoring every record"),
        }
    }
    out.flush()?;

    Ok(if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_manifest(
    config: &Result<ServiceConfig, StrokeError>,
    dir: Option<&str>,
) -> Result<ExitCode> {
    let dir = match (dir, config) {
        (Some(dir), _) => std::path::PathBuf::from(dir),
        (None, Ok(config)) => config.artifact_dir.clone(),
        (None, Err(e)) => bail!("Invalid configuration: {e}"),
    };

    let manifest = ArtifactStore::new(&dir, false)
        .write_manifest()
        .with_context(|| format!("Failed to write manifest for {}", dir.display()))?;

    let mut out = io::stdout().lock();
    write_json(&mut out, &manifest)?;
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let config = ServiceConfig::from_env();
    let log_mode = config
        .as_ref()
        .map_or(LogMode::Stderr, |c| c.log_mode.clone());
    let _guard = init_logging(&log_mode)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str);
    let operand = args.get(1).map(String::as_str);

    tracing::info!("Starting Strokewatch...");

    let code = match command {
        Some("health") => run_health(&config)?,
        Some("predict") => run_predict(&config, operand)?,
        Some("manifest") => run_manifest(&config, operand)?,
        _ => {
            eprintln!("{USAGE}");
            ExitCode::from(2)
        }
    };

    tracing::info!("Strokewatch shutdown complete.");
    Ok(code)
}
