//! Periodic measurement capture.
//!
//! Runs a [`MeasurementSimulator`] against a [`FarmStore`] in a tokio task:
//! each tick pulls the next reading of every registered cow, stores it, and
//! sends a [`CaptureSnapshot`] through an `mpsc` channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use farm_core::models::MeasurementOutput;
use farm_data::{FarmStore, MeasurementSimulator};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time;

// ── Public types ──────────────────────────────────────────────────────────────

/// Outcome of one capture tick.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureSnapshot {
    /// 1-based tick number.
    pub tick: u64,
    pub captured_at: DateTime<Utc>,
    /// Measurements stored during this tick.
    pub captured: Vec<MeasurementOutput>,
    /// Cows without replayable readings, or whose measurement failed to store.
    pub skipped: usize,
}

// ── CaptureOrchestrator ───────────────────────────────────────────────────────

/// Background capture coordinator.
///
/// Call [`CaptureOrchestrator::start`] to spin up the capture loop in a
/// dedicated tokio task and receive a channel endpoint for snapshots.
pub struct CaptureOrchestrator {
    capture_interval: Duration,
    store: Arc<FarmStore>,
    simulator: MeasurementSimulator,
    /// Stop after this many ticks; `None` runs until cancelled.
    max_ticks: Option<u64>,
}

impl CaptureOrchestrator {
    /// Create an orchestrator capturing every `interval_secs` seconds.
    pub fn new(interval_secs: u64, store: Arc<FarmStore>, simulator: MeasurementSimulator) -> Self {
        Self {
            capture_interval: Duration::from_secs(interval_secs),
            store,
            simulator,
            max_ticks: None,
        }
    }

    /// Stop the loop after `ticks` captures.
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    /// Start the capture loop.
    ///
    /// The first capture happens immediately. The channel closes when the
    /// loop finishes.
    pub fn start(self) -> (mpsc::Receiver<CaptureSnapshot>, CaptureHandle) {
        let (tx, rx) = mpsc::channel(16);

        let handle = tokio::spawn(async move {
            self.capture_loop(tx).await;
        });

        (rx, CaptureHandle { handle })
    }

    // ── Private implementation ────────────────────────────────────────────

    async fn capture_loop(mut self, tx: mpsc::Sender<CaptureSnapshot>) {
        tracing::info!(
            interval_secs = self.capture_interval.as_secs(),
            max_ticks = ?self.max_ticks,
            "capture loop started"
        );

        let mut interval = time::interval(self.capture_interval);
        let mut tick = 0u64;

        loop {
            interval.tick().await;

            if tx.is_closed() {
                tracing::debug!("capture channel closed; exiting loop");
                break;
            }

            tick += 1;
            let snapshot = self.capture_once(tick, Utc::now());
            if let Err(e) = tx.send(snapshot).await {
                tracing::warn!(error = %e, "failed to send capture snapshot; receiver dropped");
                break;
            }

            if self.max_ticks.is_some_and(|max| tick >= max) {
                tracing::info!(ticks = tick, "capture loop finished");
                break;
            }
        }
    }

    /// Capture one measurement for every registered cow.
    fn capture_once(&mut self, tick: u64, now: DateTime<Utc>) -> CaptureSnapshot {
        let mut captured = Vec::new();
        let mut skipped = 0usize;

        for cow in self.store.list_cows() {
            if self.simulator.reading_count(&cow.id) == 0 {
                skipped += 1;
                continue;
            }

            let stored = self
                .simulator
                .next_measurement(&cow.id, now)
                .and_then(|m| self.store.append_measurement(m));
            match stored {
                Ok(m) => captured.push(m.into()),
                Err(e) => {
                    tracing::warn!(cow = %cow.id, error = %e, "capture failed");
                    skipped += 1;
                }
            }
        }

        tracing::debug!(tick, captured = captured.len(), skipped, "capture tick");
        CaptureSnapshot {
            tick,
            captured_at: now,
            captured,
            skipped,
        }
    }
}

// ── CaptureHandle ─────────────────────────────────────────────────────────────

/// A handle to the background capture task.
pub struct CaptureHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl CaptureHandle {
    /// Immediately abort the capture loop.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
