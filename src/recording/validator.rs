//! Size-threshold acceptance of produced segment files.
//!
//! A capture that connected and immediately lost the stream still leaves a
//! container header on disk; anything under the threshold is treated as
//! evidence of a failed capture and removed. This is a stat-based heuristic,
//! the file is never opened or demuxed.

use std::path::Path;

use log::{debug, warn};

use crate::recording::types::SegmentOutcome;

/// Minimum viable segment size. Files below this are always removed, so a
/// file that exists in the archive has passed validation.
pub const MIN_SEGMENT_BYTES: u64 = 1024;

pub struct SegmentValidator {
    min_bytes: u64,
}

impl Default for SegmentValidator {
    fn default() -> Self {
        Self {
            min_bytes: MIN_SEGMENT_BYTES,
        }
    }
}

impl SegmentValidator {
    /// Stats `path` and decides whether the artifact stays.
    pub fn validate(&self, path: &Path) -> SegmentOutcome {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(_) => {
                debug!("No artifact at {}, nothing to discard", path.display());
                return SegmentOutcome::Missing;
            }
        };

        let bytes = metadata.len();
        if bytes < self.min_bytes {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(
                    "Failed to remove undersized segment {} ({} bytes): {}",
                    path.display(),
                    bytes,
                    e
                );
            } else {
                debug!(
                    "Discarded undersized segment {} ({} < {} bytes)",
                    path.display(),
                    bytes,
                    self.min_bytes
                );
            }
            return SegmentOutcome::Discarded { bytes };
        }

        SegmentOutcome::Kept { bytes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_reports_missing() {
        let dir = TempDir::new().unwrap();
        let validator = SegmentValidator::default();
        assert_eq!(
            validator.validate(&dir.path().join("absent.mp4")),
            SegmentOutcome::Missing
        );
    }

    #[test]
    fn test_undersized_file_is_deleted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiny.mp4");
        std::fs::write(&path, vec![0u8; 200]).unwrap();

        let validator = SegmentValidator::default();
        assert_eq!(
            validator.validate(&path),
            SegmentOutcome::Discarded { bytes: 200 }
        );
        assert!(!path.exists());
    }

    #[test]
    fn test_viable_file_is_kept_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ok.mp4");
        std::fs::write(&path, vec![0u8; MIN_SEGMENT_BYTES as usize]).unwrap();

        let validator = SegmentValidator::default();
        assert_eq!(
            validator.validate(&path),
            SegmentOutcome::Kept {
                bytes: MIN_SEGMENT_BYTES
            }
        );
        assert!(path.exists());
    }
}
