use crate::error_handling::types::ConfigError;
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_segment_secs() -> u64 {
    60
}
fn default_capture_grace_secs() -> u64 {
    2
}
fn default_probe_timeout_secs() -> u64 {
    5
}
fn default_probe_backoff_secs() -> u64 {
    5
}
fn default_error_backoff_secs() -> u64 {
    3
}
fn default_cycle_pause_millis() -> u64 {
    500
}
fn default_size_cap() -> String {
    String::from("18M")
}
fn default_web_port() -> u16 {
    8080
}
fn default_quota_bytes() -> u64 {
    20 * 1024 * 1024 * 1024
}

/// Runtime configuration for the recorder daemon.
///
/// Parsed either from command-line flags (`clap`) or from a TOML file,
/// whichever the operator provides at startup. The camera URL and the storage
/// base path are the only mandatory values; everything else has defaults that
/// match a single fixed camera recording 60-second segments.
#[derive(Parser, Debug, Clone, Deserialize)]
#[command(name = "camrec")]
#[command(about = "Continuous RTSP camera recorder")]
pub struct Config {
    /// RTSP URL of the camera stream, e.g. rtsp://192.168.0.104:5543/live/channel0
    ///
    /// # Command Line
    /// Use `--camera-url <URL>` to set this value from the CLI
    #[arg(long)]
    pub camera_url: String,

    /// Base directory the day folders and segment files are written under.
    ///
    /// Created on startup if absent.
    ///
    /// # Command Line
    /// Use `--storage-path <PATH>` to set this value from the CLI
    #[arg(long)]
    pub storage_path: PathBuf,

    /// Target duration of one recorded segment, in seconds.
    #[arg(long, default_value_t = default_segment_secs())]
    #[serde(default = "default_segment_secs")]
    pub segment_secs: u64,

    /// Extra time granted past the segment duration before the capture
    /// process is forcibly terminated, in seconds.
    #[arg(long, default_value_t = default_capture_grace_secs())]
    #[serde(default = "default_capture_grace_secs")]
    pub capture_grace_secs: u64,

    /// Upper bound on the reachability pre-check, in seconds.
    #[arg(long, default_value_t = default_probe_timeout_secs())]
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Delay before retrying after the camera was found unreachable, in seconds.
    #[arg(long, default_value_t = default_probe_backoff_secs())]
    #[serde(default = "default_probe_backoff_secs")]
    pub probe_backoff_secs: u64,

    /// Delay before retrying after the capture backend failed to start or
    /// exited abnormally, in seconds.
    #[arg(long, default_value_t = default_error_backoff_secs())]
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,

    /// Pause between successful cycles, in milliseconds.
    #[arg(long, default_value_t = default_cycle_pause_millis())]
    #[serde(default = "default_cycle_pause_millis")]
    pub cycle_pause_millis: u64,

    /// Output size cap handed to the capture backend (ffmpeg `-fs` syntax).
    #[arg(long, default_value_t = default_size_cap())]
    #[serde(default = "default_size_cap")]
    pub size_cap: String,

    /// Enable the HTTP API over the recorded archive.
    ///
    /// # Command Line
    /// Use the `--web-enabled` flag to enable it. This is a boolean flag that
    /// doesn't take a value - its presence enables the feature
    #[arg(long, action = clap::ArgAction::SetTrue)]
    #[serde(default)]
    pub web_enabled: bool,

    /// Port the HTTP API listens on when `web_enabled` is set.
    #[arg(long, default_value_t = default_web_port())]
    #[serde(default = "default_web_port")]
    pub web_port: u16,

    /// Total storage quota reported by the `/resource` endpoint, in bytes.
    #[arg(long, default_value_t = default_quota_bytes())]
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,
}

impl Config {
    /// Parses the configuration from command-line arguments.
    ///
    /// # Panics
    /// Exits the process with a usage message when required arguments are
    /// missing or invalid, which is the standard `clap` behavior.
    pub fn from_args() -> Self {
        Config::parse()
    }

    /// Loads the configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the rest of the system relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.camera_url.starts_with("rtsp://") {
            return Err(ConfigError::BadCameraUrl(format!(
                "expected an rtsp:// URL, got {:?}",
                self.camera_url
            )));
        }
        if self.segment_secs == 0 || self.segment_secs > 3600 {
            return Err(ConfigError::NotInRange(format!(
                "segment_secs must be within 1..=3600, got {}",
                self.segment_secs
            )));
        }
        if self.probe_timeout_secs == 0 {
            return Err(ConfigError::NotInRange(
                "probe_timeout_secs must be at least 1".to_string(),
            ));
        }
        if let Some(parent) = self.storage_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(ConfigError::DirectoryDoesNotExist(format!(
                    "parent of storage path does not exist: {}",
                    parent.display()
                )));
            }
        }
        Ok(())
    }

    pub fn segment_duration(&self) -> Duration {
        Duration::from_secs(self.segment_secs)
    }

    pub fn capture_grace(&self) -> Duration {
        Duration::from_secs(self.capture_grace_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn probe_backoff(&self) -> Duration {
        Duration::from_secs(self.probe_backoff_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn cycle_pause(&self) -> Duration {
        Duration::from_millis(self.cycle_pause_millis)
    }
}
