//! Capture backends: how one bounded segment actually gets recorded.
//!
//! The supervisor only depends on the [`CaptureBackend`] trait, so the
//! external-tool implementation can be swapped for an in-process one without
//! touching the control loop. The shipped implementation, [`FfmpegBackend`],
//! spawns `ffmpeg` against the RTSP endpoint and supervises it:
//!
//! - video is stream-copied, audio re-encoded to AAC
//! - timestamps are normalized (no negative timestamps, wall-clock PTS)
//! - output size is capped as a safety net, fast-start indexing enabled
//! - an intrinsic `-t` duration bound is passed, and an external deadline of
//!   `max_duration + grace` backs it up with a forced kill

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use log::{debug, error, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::recording::types::{AttemptOutcome, CameraEndpoint};

/// How long to wait for a killed capture process to be reaped before handing
/// the reap off to a background task.
const REAP_WAIT: Duration = Duration::from_millis(500);

pub trait CaptureBackend: Send + Sync {
    /// Records one segment of at most `max_duration` to `output_path`.
    ///
    /// Must create the destination folder if absent, must not run materially
    /// past `max_duration` plus a small grace window, and must never panic
    /// out of a failed attempt - every failure maps to an outcome variant.
    fn capture_segment(
        &self,
        endpoint: &CameraEndpoint,
        output_path: &Path,
        max_duration: Duration,
    ) -> impl std::future::Future<Output = AttemptOutcome> + Send;
}

/// Records segments by spawning an external `ffmpeg` process.
pub struct FfmpegBackend {
    binary: String,
    size_cap: String,
    grace: Duration,
}

impl FfmpegBackend {
    pub fn new(size_cap: impl Into<String>, grace: Duration) -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            size_cap: size_cap.into(),
            grace,
        }
    }

    /// Overrides the spawned binary. Used by tests to simulate backends that
    /// crash, hang or are missing entirely.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    fn build_args(
        &self,
        endpoint: &CameraEndpoint,
        output_path: &Path,
        max_duration: Duration,
    ) -> Vec<String> {
        vec![
            "-rtsp_transport".into(),
            "tcp".into(),
            "-i".into(),
            endpoint.url().to_string(),
            "-use_wallclock_as_timestamps".into(),
            "1".into(),
            "-c:v".into(),
            "copy".into(),
            "-c:a".into(),
            "aac".into(),
            "-avoid_negative_ts".into(),
            "make_zero".into(),
            "-fflags".into(),
            "+genpts".into(),
            "-fs".into(),
            self.size_cap.clone(),
            "-movflags".into(),
            "+faststart".into(),
            "-t".into(),
            max_duration.as_secs().to_string(),
            "-y".into(),
            "-f".into(),
            "mp4".into(),
            output_path.to_string_lossy().into_owned(),
        ]
    }
}

impl CaptureBackend for FfmpegBackend {
    async fn capture_segment(
        &self,
        endpoint: &CameraEndpoint,
        output_path: &Path,
        max_duration: Duration,
    ) -> AttemptOutcome {
        if let Some(parent) = output_path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                error!("Failed to create segment folder {}: {}", parent.display(), e);
                return AttemptOutcome::LaunchFailed(format!(
                    "cannot create {}: {}",
                    parent.display(),
                    e
                ));
            }
        }

        let tag = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "segment".to_string());

        let mut cmd = Command::new(&self.binary);
        cmd.args(self.build_args(endpoint, output_path, max_duration))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the capture future (shutdown mid-capture) must also
            // terminate the process.
            .kill_on_drop(true);

        debug!("Spawning {} for segment {}", self.binary, output_path.display());
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to spawn {}: {}", self.binary, e);
                return AttemptOutcome::LaunchFailed(e.to_string());
            }
        };

        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout).lines();
            let tag = tag.clone();
            tokio::spawn(async move {
                while let Ok(Some(line)) = reader.next_line().await {
                    debug!("[ffmpeg:{}][stdout] {}", tag, line);
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            let mut reader = BufReader::new(stderr).lines();
            let tag = tag.clone();
            tokio::spawn(async move {
                while let Ok(Some(line)) = reader.next_line().await {
                    debug!("[ffmpeg:{}][stderr] {}", tag, line);
                }
            });
        }

        let deadline = max_duration + self.grace;
        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = tokio::time::sleep(deadline) => None,
        };

        match waited {
            Some(Ok(status)) if status.success() => AttemptOutcome::Completed,
            Some(Ok(status)) => {
                AttemptOutcome::RuntimeError(format!("{} exited with {}", self.binary, status))
            }
            Some(Err(e)) => {
                AttemptOutcome::RuntimeError(format!("wait on {} failed: {}", self.binary, e))
            }
            None => {
                // The duration bound did not take effect in time; stop the
                // process ourselves. This is the expected path for backends
                // without an intrinsic bound, not an error.
                warn!(
                    "[ffmpeg:{}] still running {:?} past the bound, killing",
                    tag, self.grace
                );
                if let Err(e) = child.start_kill() {
                    warn!("[ffmpeg:{}] kill failed: {}", tag, e);
                }
                // Reap without letting a stuck process block the next cycle.
                if tokio::time::timeout(REAP_WAIT, child.wait()).await.is_err() {
                    tokio::spawn(async move {
                        let _ = child.wait().await;
                    });
                }
                AttemptOutcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn endpoint() -> CameraEndpoint {
        CameraEndpoint::new("rtsp://127.0.0.1:554/live")
    }

    #[test]
    fn test_build_args_reproduce_capture_parameters() {
        let backend = FfmpegBackend::new("18M", Duration::from_secs(1));
        let args = backend.build_args(
            &endpoint(),
            Path::new("/var/rec/2024-03-09/18-04-56.mp4"),
            Duration::from_secs(60),
        );

        let find = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .map(|i| args[i + 1].clone())
        };
        assert_eq!(find("-rtsp_transport").as_deref(), Some("tcp"));
        assert_eq!(find("-i").as_deref(), Some("rtsp://127.0.0.1:554/live"));
        assert_eq!(find("-c:v").as_deref(), Some("copy"));
        assert_eq!(find("-c:a").as_deref(), Some("aac"));
        assert_eq!(find("-avoid_negative_ts").as_deref(), Some("make_zero"));
        assert_eq!(find("-fs").as_deref(), Some("18M"));
        assert_eq!(find("-movflags").as_deref(), Some("+faststart"));
        assert_eq!(find("-t").as_deref(), Some("60"));
        assert!(args.contains(&"-y".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/var/rec/2024-03-09/18-04-56.mp4"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_failure() {
        let dir = TempDir::new().unwrap();
        let backend = FfmpegBackend::new("18M", Duration::from_millis(100))
            .with_binary("camrec-no-such-binary");
        let out = backend
            .capture_segment(
                &endpoint(),
                &dir.path().join("day").join("a.mp4"),
                Duration::from_millis(100),
            )
            .await;
        assert!(matches!(out, AttemptOutcome::LaunchFailed(_)));
        // The destination folder is still created before the spawn attempt.
        assert!(dir.path().join("day").is_dir());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_runtime_error() {
        let dir = TempDir::new().unwrap();
        let backend = FfmpegBackend::new("18M", Duration::from_secs(1)).with_binary("false");
        let out = backend
            .capture_segment(
                &endpoint(),
                &dir.path().join("a.mp4"),
                Duration::from_secs(1),
            )
            .await;
        assert!(matches!(out, AttemptOutcome::RuntimeError(_)));
    }

    #[tokio::test]
    async fn test_overrunning_process_is_killed_and_reported_timed_out() {
        let dir = TempDir::new().unwrap();
        // `yes` ignores its arguments and runs forever, standing in for a
        // backend without an intrinsic duration bound.
        let backend = FfmpegBackend::new("18M", Duration::from_millis(200)).with_binary("yes");
        let started = std::time::Instant::now();
        let out = backend
            .capture_segment(
                &endpoint(),
                &dir.path().join("a.mp4"),
                Duration::from_millis(200),
            )
            .await;
        assert_eq!(out, AttemptOutcome::TimedOut);
        // Bounded by max_duration + grace plus the reap allowance.
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
