//! Continuous capture of a single RTSP camera into bounded segment files.
//!
//! Components:
//! - `types`: endpoint, attempt and cycle outcome types shared by the subsystem.
//! - `naming`: wall-clock derived folder/file names at a fixed UTC offset.
//! - `probe`: transport-level reachability pre-check of the camera endpoint.
//! - `capture`: the capture backend trait and its ffmpeg implementation.
//! - `validator`: size-threshold acceptance of produced segment files.
//! - `supervisor`: the self-healing loop composing the above, forever.

pub mod capture;
pub mod naming;
pub mod probe;
pub mod supervisor;
pub mod types;
pub mod validator;

pub use capture::{CaptureBackend, FfmpegBackend};
pub use naming::{Clock, SystemClock};
pub use probe::ReachabilityProbe;
pub use supervisor::RecordingSupervisor;
pub use types::{AttemptOutcome, CameraEndpoint, CycleOutcome, SegmentOutcome};
pub use validator::SegmentValidator;
