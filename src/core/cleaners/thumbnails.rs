use super::{folder_children, Cleaner};
use crate::core::paths::LOG_FILE_NAME;
use crate::log_debug;
use std::{fs, path::PathBuf, time::SystemTime};
use walkdir::WalkDir;

/// Represents a cleaner that empties the Thumbnails folder completely (Hard Clean).
pub struct ThumbnailsCleaner {
    folder: PathBuf,
}

impl ThumbnailsCleaner {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        ThumbnailsCleaner { folder: folder.into() }
    }
}

impl Cleaner for ThumbnailsCleaner {
    fn name(&self) -> &str {
        "Thumbnails"
    }

    fn find_paths(&self) -> Vec<PathBuf> {
        folder_children(&self.folder)
    }
}

/// Represents a cleaner that trims the Thumbnails folder down to a size limit (Auto Clean).
///
/// The oldest files (by modification time) go first, until the folder fits.
/// Directories left empty are removed afterwards.
pub struct ThumbnailTrimmer {
    folder: PathBuf,
    max_bytes: u64,
}

impl ThumbnailTrimmer {
    /// `max_mb` is the size the folder is trimmed to, in megabytes.
    pub fn new(folder: impl Into<PathBuf>, max_mb: u64) -> Self {
        ThumbnailTrimmer {
            folder: folder.into(),
            max_bytes: max_mb.saturating_mul(1024 * 1024),
        }
    }
}

impl Cleaner for ThumbnailTrimmer {
    fn name(&self) -> &str {
        "Thumbnails (trim)"
    }

    fn find_paths(&self) -> Vec<PathBuf> {
        if !self.folder.exists() {
            return Vec::new();
        }

        // Every regular file with its modification time and size.
        let mut files: Vec<(SystemTime, u64, PathBuf)> = WalkDir::new(&self.folder)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name() != LOG_FILE_NAME)
            .filter_map(|e| {
                let metadata = e.metadata().ok()?;
                let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                Some((modified, metadata.len(), e.into_path()))
            })
            .collect();

        let mut current: u64 = files.iter().map(|(_, size, _)| size).sum();
        if current <= self.max_bytes {
            log_debug!("Thumbnails already within limit ({} bytes)", current);
            return Vec::new();
        }

        // Oldest first; the path breaks ties so the order is stable.
        files.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.2.cmp(&b.2)));

        let mut doomed = Vec::new();
        for (_, size, path) in files {
            if current <= self.max_bytes {
                break;
            }
            current = current.saturating_sub(size);
            doomed.push(path);
        }
        doomed
    }

    fn finish(&self, dry_run: bool) {
        if dry_run {
            return;
        }
        // `contents_first` visits children before their parent, so nested empty
        // directories collapse in one pass. `remove_dir` refuses non-empty ones.
        for entry in WalkDir::new(&self.folder)
            .min_depth(1)
            .contents_first(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
        {
            if fs::remove_dir(entry.path()).is_ok() {
                log_debug!("Removed empty directory {}", entry.path().display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::tempdir;

    const MB: usize = 1024 * 1024;

    fn file_with_age(path: &std::path::Path, size: usize, age_secs: u64) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![0u8; size]).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        File::options().write(true).open(path).unwrap().set_modified(mtime).unwrap();
    }

    #[test]
    fn trims_oldest_first_and_stops_at_limit() {
        let dir = tempdir().unwrap();
        let oldest = dir.path().join("0/old.jpg");
        let middle = dir.path().join("1/mid.jpg");
        let newest = dir.path().join("2/new.jpg");
        file_with_age(&oldest, MB, 300);
        file_with_age(&middle, MB, 200);
        file_with_age(&newest, MB, 100);

        // 3 MB on disk, limit 2 MB: only the oldest file has to go.
        let trimmer = ThumbnailTrimmer::new(dir.path(), 2);
        assert_eq!(trimmer.find_paths(), vec![oldest.clone()]);

        // Limit 1 MB: the two oldest.
        let trimmer = ThumbnailTrimmer::new(dir.path(), 1);
        assert_eq!(trimmer.find_paths(), vec![oldest, middle]);
    }

    #[test]
    fn within_limit_is_untouched() {
        let dir = tempdir().unwrap();
        file_with_age(&dir.path().join("a.jpg"), 1024, 10);
        assert!(ThumbnailTrimmer::new(dir.path(), 1).find_paths().is_empty());
    }

    #[test]
    fn finish_removes_empty_directories_only() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("empty/nested")).unwrap();
        file_with_age(&dir.path().join("full/a.jpg"), 10, 10);

        let trimmer = ThumbnailTrimmer::new(dir.path(), 1);
        trimmer.finish(true);
        assert!(dir.path().join("empty/nested").exists());

        trimmer.finish(false);
        assert!(!dir.path().join("empty").exists());
        assert!(dir.path().join("full/a.jpg").exists());
        assert!(dir.path().exists());
    }
}
