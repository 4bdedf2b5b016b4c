use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, error, info, warn};

use crate::error_handling::types::StorageError;

/// The recorded archive on local disk.
///
/// One subdirectory per calendar day, one MP4 per segment. The recorder is
/// the only writer; readers and the deletion endpoint operate best-effort
/// against files that may still be growing - there is deliberately no
/// coordination between them.
pub struct ArchiveStorage {
    base_path: PathBuf,
}

impl ArchiveStorage {
    /// Opens the archive at `base_path`, creating the directory if absent.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path).map_err(|e| {
            error!("Failed to create archive dir {}: {}", base_path.display(), e);
            StorageError::CreateFailed(e)
        })?;
        info!("Archive initialized at {}", base_path.display());
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// True when `name` has the `YYYY-MM-DD` shape the recorder produces.
    /// Everything reachable through the HTTP surface goes through this check
    /// so a crafted day parameter can never escape the base path.
    pub fn is_day_name(name: &str) -> bool {
        NaiveDate::parse_from_str(name, "%Y-%m-%d").is_ok()
    }

    pub fn day_dir(&self, day: &str) -> PathBuf {
        self.base_path.join(day)
    }

    pub fn segment_path(&self, day: &str, file: &str) -> PathBuf {
        self.day_dir(day).join(file)
    }

    /// Creates the day folder if it does not exist yet.
    pub fn ensure_day_dir(&self, day: &str) -> Result<PathBuf, StorageError> {
        let dir = self.day_dir(day);
        if !dir.is_dir() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                error!("Failed to create day dir {}: {}", dir.display(), e);
                StorageError::CreateFailed(e)
            })?;
            debug!("Created day dir {}", dir.display());
        }
        Ok(dir)
    }

    /// Lists day folder names, sorted ascending.
    pub fn list_days(&self) -> Result<Vec<String>, StorageError> {
        let mut days = Vec::new();
        for entry in std::fs::read_dir(&self.base_path).map_err(|e| {
            error!("Failed to read archive dir {}: {}", self.base_path.display(), e);
            StorageError::ReadFailed(e)
        })? {
            let entry = entry.map_err(StorageError::ReadFailed)?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    days.push(name.to_string());
                }
            }
        }
        days.sort();
        debug!("Listed {} day folder(s)", days.len());
        Ok(days)
    }

    /// Lists segment file names within one day folder, sorted ascending.
    pub fn list_segments(&self, day: &str) -> Result<Vec<String>, StorageError> {
        if !Self::is_day_name(day) {
            return Err(StorageError::InvalidDayName(day.to_string()));
        }
        let dir = self.day_dir(day);
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|e| {
            error!("Failed to read day dir {}: {}", dir.display(), e);
            StorageError::ReadFailed(e)
        })? {
            let entry = entry.map_err(StorageError::ReadFailed)?;
            if entry.path().is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    files.push(name.to_string());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Total size in bytes of everything under the base path, recursively.
    pub fn total_size(&self) -> Result<u64, StorageError> {
        fn dir_size(path: &Path) -> Result<u64, StorageError> {
            let mut total = 0u64;
            for entry in std::fs::read_dir(path).map_err(StorageError::ReadFailed)? {
                let entry = entry.map_err(StorageError::ReadFailed)?;
                let metadata = entry.metadata().map_err(StorageError::ReadFailed)?;
                if metadata.is_dir() {
                    total += dir_size(&entry.path())?;
                } else {
                    total += metadata.len();
                }
            }
            Ok(total)
        }
        dir_size(&self.base_path)
    }

    /// Recursively deletes one day folder. Segments being written in that
    /// folder at the time of the call are lost; this is the accepted race.
    pub fn delete_day(&self, day: &str) -> Result<(), StorageError> {
        if !Self::is_day_name(day) {
            warn!("Refusing to delete non-day path {:?}", day);
            return Err(StorageError::InvalidDayName(day.to_string()));
        }
        let dir = self.day_dir(day);
        std::fs::remove_dir_all(&dir).map_err(|e| {
            error!("Failed to delete day dir {}: {}", dir.display(), e);
            StorageError::RemoveFailed(e)
        })?;
        info!("Deleted day folder {}", dir.display());
        Ok(())
    }

    /// Removes files smaller than `min_bytes` across all day folders and
    /// returns how many were removed. Run once at startup to clear partial
    /// segments left behind by an abrupt crash.
    pub fn sweep_undersized(&self, min_bytes: u64) -> Result<usize, StorageError> {
        let mut removed = 0usize;
        for day in self.list_days()? {
            if !Self::is_day_name(&day) {
                continue;
            }
            for file in self.list_segments(&day)? {
                let path = self.segment_path(&day, &file);
                let Ok(metadata) = std::fs::metadata(&path) else {
                    continue;
                };
                if metadata.len() < min_bytes {
                    match std::fs::remove_file(&path) {
                        Ok(()) => {
                            debug!(
                                "Swept partial segment {} ({} bytes)",
                                path.display(),
                                metadata.len()
                            );
                            removed += 1;
                        }
                        Err(e) => warn!("Failed to sweep {}: {}", path.display(), e),
                    }
                }
            }
        }
        if removed > 0 {
            info!("Startup sweep removed {} partial segment(s)", removed);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn archive() -> (TempDir, ArchiveStorage) {
        let dir = TempDir::new().unwrap();
        let storage = ArchiveStorage::new(dir.path().join("rec")).unwrap();
        (dir, storage)
    }

    #[test]
    fn test_new_creates_base_dir() {
        let (_dir, storage) = archive();
        assert!(storage.base_path().is_dir());
    }

    #[test]
    fn test_list_days_and_segments_sorted() {
        let (_dir, storage) = archive();
        storage.ensure_day_dir("2024-03-10").unwrap();
        storage.ensure_day_dir("2024-03-09").unwrap();
        std::fs::write(storage.segment_path("2024-03-09", "10-00-00.mp4"), b"x").unwrap();
        std::fs::write(storage.segment_path("2024-03-09", "09-00-00.mp4"), b"x").unwrap();

        assert_eq!(storage.list_days().unwrap(), vec!["2024-03-09", "2024-03-10"]);
        assert_eq!(
            storage.list_segments("2024-03-09").unwrap(),
            vec!["09-00-00.mp4", "10-00-00.mp4"]
        );
    }

    #[test]
    fn test_total_size_recurses_into_day_folders() {
        let (_dir, storage) = archive();
        storage.ensure_day_dir("2024-03-09").unwrap();
        std::fs::write(storage.segment_path("2024-03-09", "a.mp4"), vec![0u8; 100]).unwrap();
        std::fs::write(storage.segment_path("2024-03-09", "b.mp4"), vec![0u8; 50]).unwrap();
        assert_eq!(storage.total_size().unwrap(), 150);
    }

    #[test]
    fn test_delete_day_rejects_traversal() {
        let (_dir, storage) = archive();
        assert!(matches!(
            storage.delete_day("../rec"),
            Err(StorageError::InvalidDayName(_))
        ));
        assert!(matches!(
            storage.delete_day("not-a-date"),
            Err(StorageError::InvalidDayName(_))
        ));
    }

    #[test]
    fn test_delete_day_removes_folder() {
        let (_dir, storage) = archive();
        storage.ensure_day_dir("2024-03-09").unwrap();
        std::fs::write(storage.segment_path("2024-03-09", "a.mp4"), b"x").unwrap();
        storage.delete_day("2024-03-09").unwrap();
        assert!(!storage.day_dir("2024-03-09").exists());
    }

    #[test]
    fn test_sweep_removes_only_undersized_files() {
        let (_dir, storage) = archive();
        storage.ensure_day_dir("2024-03-09").unwrap();
        let small = storage.segment_path("2024-03-09", "small.mp4");
        let big = storage.segment_path("2024-03-09", "big.mp4");
        std::fs::write(&small, vec![0u8; 10]).unwrap();
        std::fs::write(&big, vec![0u8; 2048]).unwrap();

        let removed = storage.sweep_undersized(1024).unwrap();
        assert_eq!(removed, 1);
        assert!(!small.exists());
        assert!(big.exists());
    }
}
