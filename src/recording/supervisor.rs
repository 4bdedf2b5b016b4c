//! The self-healing recording loop.
//!
//! One supervisor task per camera runs an unbounded sequence of independent
//! cycles: probe reachability, derive the segment path from the clock, let
//! the capture backend produce a file, validate it, back off as the outcome
//! dictates, repeat. No cycle outcome escapes the loop as an error; the only
//! state carried across cycles is what sits on disk.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use tokio::sync::watch;

use crate::configuration::Config;
use crate::recording::capture::CaptureBackend;
use crate::recording::naming::{self, Clock};
use crate::recording::probe::ReachabilityProbe;
use crate::recording::types::{AttemptOutcome, CameraEndpoint, CycleOutcome, SegmentOutcome};
use crate::recording::validator::{SegmentValidator, MIN_SEGMENT_BYTES};
use crate::storage::ArchiveStorage;

/// Timing knobs of the supervisor loop.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Target duration of one segment.
    pub segment_duration: Duration,
    /// Bound on the reachability pre-check.
    pub probe_timeout: Duration,
    /// Delay after an unreachable probe.
    pub probe_backoff: Duration,
    /// Delay after a backend launch/runtime failure. Exists to avoid a tight
    /// retry loop hammering a misconfigured or crashing backend.
    pub error_backoff: Duration,
    /// Pause between successful cycles.
    pub cycle_pause: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            segment_duration: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(5),
            probe_backoff: Duration::from_secs(5),
            error_backoff: Duration::from_secs(3),
            cycle_pause: Duration::from_millis(500),
        }
    }
}

impl SupervisorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            segment_duration: config.segment_duration(),
            probe_timeout: config.probe_timeout(),
            probe_backoff: config.probe_backoff(),
            error_backoff: config.error_backoff(),
            cycle_pause: config.cycle_pause(),
        }
    }
}

pub struct RecordingSupervisor<B: CaptureBackend, C: Clock> {
    endpoint: CameraEndpoint,
    storage: Arc<ArchiveStorage>,
    backend: B,
    clock: C,
    probe: ReachabilityProbe,
    validator: SegmentValidator,
    settings: SupervisorSettings,
}

impl<B: CaptureBackend, C: Clock> RecordingSupervisor<B, C> {
    pub fn new(
        endpoint: CameraEndpoint,
        storage: Arc<ArchiveStorage>,
        backend: B,
        clock: C,
        settings: SupervisorSettings,
    ) -> Self {
        let probe = ReachabilityProbe::new(settings.probe_timeout);
        Self {
            endpoint,
            storage,
            backend,
            clock,
            probe,
            validator: SegmentValidator::default(),
            settings,
        }
    }

    /// Runs cycles until `shutdown` flips to true (or its sender is dropped).
    ///
    /// Every wait in here is cancellable: a shutdown during a backoff skips
    /// the rest of the delay, and a shutdown mid-capture drops the capture
    /// future, which terminates the underlying process.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        // Clear partial segments a previous crash may have left so the
        // "file exists implies validated" invariant holds from cycle one.
        if let Err(e) = self.storage.sweep_undersized(MIN_SEGMENT_BYTES) {
            warn!("Startup sweep failed: {}", e);
        }

        info!(
            "Recording supervisor started for {} ({}s segments)",
            self.endpoint.url(),
            self.settings.segment_duration.as_secs()
        );

        loop {
            let outcome = tokio::select! {
                outcome = self.cycle() => outcome,
                _ = shutdown.changed() => break,
            };
            self.log_outcome(&outcome);

            let pause = match &outcome {
                CycleOutcome::Unreachable => self.settings.probe_backoff,
                CycleOutcome::BackendFailed { .. } => self.settings.error_backoff,
                _ => self.settings.cycle_pause,
            };
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("Recording supervisor stopped for {}", self.endpoint.url());
    }

    /// One full cycle. Infallible by construction: every failure branch maps
    /// to a [`CycleOutcome`] and control returns to the caller.
    async fn cycle(&self) -> CycleOutcome {
        if !self.probe.probe(&self.endpoint).await {
            return CycleOutcome::Unreachable;
        }

        let now = self.clock.now_utc();
        let day = naming::folder_name(now);
        if let Err(e) = self.storage.ensure_day_dir(&day) {
            return CycleOutcome::BackendFailed {
                detail: e.to_string(),
            };
        }
        let file = format!("{}.mp4", naming::file_name(now));
        let path = self.storage.segment_path(&day, &file);
        debug!("Recording to {}", path.display());

        let started = Instant::now();
        let attempt = self
            .backend
            .capture_segment(&self.endpoint, &path, self.settings.segment_duration)
            .await;
        let elapsed = started.elapsed();

        match attempt {
            attempt @ (AttemptOutcome::LaunchFailed(_) | AttemptOutcome::RuntimeError(_)) => {
                // A failed launch may still have left a stub file behind.
                let _ = self.validator.validate(&path);
                CycleOutcome::BackendFailed {
                    detail: attempt.to_string(),
                }
            }
            AttemptOutcome::Completed | AttemptOutcome::TimedOut => {
                match self.validator.validate(&path) {
                    SegmentOutcome::Kept { bytes } => CycleOutcome::SegmentKept {
                        path,
                        bytes,
                        elapsed,
                    },
                    SegmentOutcome::Discarded { .. } | SegmentOutcome::Missing => {
                        CycleOutcome::SegmentDiscarded { path }
                    }
                }
            }
        }
    }

    fn log_outcome(&self, outcome: &CycleOutcome) {
        match outcome {
            CycleOutcome::Unreachable => warn!(
                "Camera {} unreachable, retrying in {:?}",
                self.endpoint.url(),
                self.settings.probe_backoff
            ),
            CycleOutcome::SegmentKept {
                path,
                bytes,
                elapsed,
            } => info!(
                "Segment kept: {} ({} bytes, {:.1}s)",
                path.display(),
                bytes,
                elapsed.as_secs_f64()
            ),
            CycleOutcome::SegmentDiscarded { path } => {
                warn!("Segment discarded: {}", path.display())
            }
            CycleOutcome::BackendFailed { detail } => error!(
                "Capture backend failed ({}), retrying in {:?}",
                detail, self.settings.error_backoff
            ),
        }
    }
}
