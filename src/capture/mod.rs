//! Capture client: pace frames from a source through the inference server,
//! annotate the answers, and keep a snapshot of every frame with a violation.

mod source;

pub use source::CaptureSource;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::annotate::annotate;
use crate::client::InferenceClient;
use crate::compliance::{has_violation, FrameComplianceReport};
use crate::image_io::{encode_jpeg, JPEG_QUALITY};
use crate::snapshot::SnapshotStore;

/// What one capture tick produced.
#[derive(Debug)]
pub struct TickOutcome {
    pub report: FrameComplianceReport,
    /// Set when the frame had a violation and was persisted.
    pub snapshot: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct CaptureStats {
    pub frames_sent: u64,
    pub failures: u64,
    pub snapshots: u64,
}

pub struct CaptureSession {
    source: CaptureSource,
    client: InferenceClient,
    store: SnapshotStore,
    interval: Duration,
    stats: CaptureStats,
}

impl CaptureSession {
    pub fn new(
        source: CaptureSource,
        client: InferenceClient,
        store: SnapshotStore,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            client,
            store,
            interval,
            stats: CaptureStats::default(),
        }
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    /// Capture one frame, wait for its report, and persist it on violation.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let mut frame = self.source.next_frame()?;
        let jpeg = encode_jpeg(&frame, JPEG_QUALITY)?;
        self.stats.frames_sent += 1;
        let report = self.client.request(&jpeg)?;

        let snapshot = if has_violation(&report) {
            annotate(&mut frame, &report)?;
            let path = self.store.save(&frame)?;
            self.stats.snapshots += 1;
            log::info!("violation snapshot saved: {}", path.display());
            Some(path)
        } else {
            None
        };
        Ok(TickOutcome { report, snapshot })
    }

    /// Tick once per interval until `shutdown` is set. A failed tick is
    /// logged and the loop moves on to the next one.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        self.run_ticks(None, shutdown);
    }

    /// Like `run`, but stops after `frames` ticks.
    pub fn run_for(&mut self, frames: u64, shutdown: &AtomicBool) {
        self.run_ticks(Some(frames), shutdown);
    }

    fn run_ticks(&mut self, budget: Option<u64>, shutdown: &AtomicBool) {
        let mut ticks = 0u64;
        while !shutdown.load(Ordering::SeqCst) && budget.map_or(true, |max| ticks < max) {
            let started = Instant::now();
            match self.tick() {
                Ok(outcome) => log::debug!(
                    "frame judged: {} people, violation={}",
                    outcome.report.len(),
                    outcome.snapshot.is_some()
                ),
                Err(err) => {
                    self.stats.failures += 1;
                    log::warn!("capture tick failed: {:#}", err);
                }
            }
            ticks += 1;
            if budget.map_or(true, |max| ticks < max) {
                self.sleep_until(started + self.interval, shutdown);
            }
        }
        log::info!(
            "capture stopped after {} frames ({} failed, {} snapshots)",
            self.stats.frames_sent,
            self.stats.failures,
            self.stats.snapshots
        );
    }

    fn sleep_until(&self, deadline: Instant, shutdown: &AtomicBool) {
        const STEP: Duration = Duration::from_millis(50);
        loop {
            if shutdown.load(Ordering::SeqCst) {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            std::thread::sleep(STEP.min(deadline - now));
        }
    }
}
