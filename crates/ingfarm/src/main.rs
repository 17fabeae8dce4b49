mod bootstrap;
mod commands;

use std::sync::Arc;

use anyhow::{Context, Result};
use farm_core::settings::{Command, Settings};
use farm_core::time_utils::resolve_timezone;
use farm_data::reader::resolve_data_dir;
use farm_data::{FarmStore, MeasurementSimulator};
use farm_runtime::CaptureOrchestrator;

use crate::commands::{exit_code, FarmApp};

#[tokio::main]
async fn main() {
    let settings = match Settings::load_with_last_used() {
        Ok(settings) => settings,
        Err(e) => e.exit(),
    };

    if let Err(err) = run(settings).await {
        tracing::error!("{:#}", err);
        eprintln!("error: {:#}", err);
        std::process::exit(exit_code(&err));
    }
}

async fn run(settings: Settings) -> Result<()> {
    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("IngFarm v{} starting", env!("CARGO_PKG_VERSION"));

    let tz = resolve_timezone(&settings.timezone)?;
    let data_dir = resolve_data_dir(settings.data_dir.as_deref());
    tracing::info!("Data directory: {}, timezone: {}", data_dir.display(), tz.name());

    let store = Arc::new(
        FarmStore::open(&data_dir)
            .with_context(|| format!("opening data directory {}", data_dir.display()))?,
    );

    match settings.command {
        Command::Capture {
            interval_secs,
            ticks,
        } => run_capture(store, interval_secs, ticks).await,
        ref command => {
            let value = FarmApp::new(store, tz).execute(command)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
    }
}

/// Capture simulated readings until `ticks` rounds are done or Ctrl+C.
///
/// Each round is printed as one JSON line.
async fn run_capture(store: Arc<FarmStore>, interval_secs: u64, ticks: Option<u64>) -> Result<()> {
    let simulator = MeasurementSimulator::from_store(&store);
    let mut orchestrator = CaptureOrchestrator::new(interval_secs, store, simulator);
    if let Some(ticks) = ticks {
        orchestrator = orchestrator.with_max_ticks(ticks);
    }

    tracing::info!("Starting capture every {}s...", interval_secs);
    let (mut rx, handle) = orchestrator.start();

    loop {
        tokio::select! {
            snapshot = rx.recv() => match snapshot {
                Some(snapshot) => println!("{}", serde_json::to_string(&snapshot)?),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received; stopping capture");
                handle.abort();
                break;
            }
        }
    }

    Ok(())
}
