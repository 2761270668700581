use crate::core::paths::LOG_FILE_NAME;
use crate::utils::filesystem::{bytes_to_human, calculate_dir_size};
use crate::{log_debug, log_warn};
use colored::Colorize;
use std::{
    fs, // File system operations (e.g., read_dir).
    path::{Path, PathBuf}, // Represents file system paths.
};
use tabled::Tabled; // Trait for generating formatted tables.

/// Represents an entry in the successful cleanup summary table.
/// This struct is derived with `Tabled` to automatically generate table rows.
#[derive(Tabled, Clone, Debug)]
pub struct CleanupEntry {
    // The name of the cleaner that performed the cleanup.
    #[tabled(rename = "Type")]
    pub cleaner_name: String,
    // The file system path that was cleaned.
    #[tabled(rename = "Path")]
    pub path: String,
    // The size of the cleaned path, formatted as a human-readable string (e.g., "1.2 MB").
    #[tabled(rename = "Size")]
    pub size: String,
}

/// Represents an entry for paths that failed to be cleaned.
/// Usually a file Kodi still holds open.
#[derive(Tabled, Clone, Debug)]
pub struct FailedEntry {
    #[tabled(rename = "Path")]
    pub path: String,
    #[tabled(rename = "Error")]
    pub error: String,
}

/// Represents an entry for paths that were skipped before any cleaning happened.
#[derive(Tabled, Clone, Debug)]
pub struct SkippedEntry {
    #[tabled(rename = "Path")]
    pub path: String,
    #[tabled(rename = "Reason")]
    pub reason: String,
}

/// A path found by a cleaner, sized and ready to be removed by the orchestrator.
#[derive(Debug)]
pub struct PathToCheck {
    pub path: PathBuf, // The actual file system path.
    pub initial_size: u64, // The size of the path in bytes.
    pub formatted_size: String, // The human-readable formatted size.
    pub cleaner_name: String, // The name of the cleaner that identified this path.
}

/// Defines a common interface for every cleaning task (temp folder, packages,
/// thumbnails, texture database).
///
/// A cleaner only *finds* paths; deleting them is the orchestrator's job, so
/// dry runs and summaries behave the same for every cleaner.
pub trait Cleaner {
    /// Returns the user-friendly name of the cleaner (e.g., "Packages").
    fn name(&self) -> &str;

    /// Discovers the file system paths this cleaner wants removed.
    fn find_paths(&self) -> Vec<PathBuf>;

    /// Runs after the orchestrator has removed the paths. Default: nothing.
    fn finish(&self, _dry_run: bool) {}

    /// Finds, filters and sizes the paths for this cleaner.
    ///
    /// # Arguments
    /// * `skipped_entries` - Receives the paths whose size could not be determined.
    /// * `ignore` - Substrings; any path containing one of them is left alone.
    fn clean(&self, skipped_entries: &mut Vec<SkippedEntry>, ignore: &[String]) -> Vec<PathToCheck> {
        log_debug!("🚀 Starting {} cleanup...", self.name());

        let mut paths = self.find_paths();

        // Apply the ignore filter to the paths found by this cleaner.
        let initial_count = paths.len();
        paths.retain(|p| {
            let path_str = p.to_string_lossy();
            !ignore.iter().any(|i| path_str.contains(i.trim()))
        });
        if paths.len() < initial_count {
            log_debug!("Filtered {} paths from {} due to ignore list.", initial_count - paths.len(), self.name());
        }

        let mut to_process = Vec::with_capacity(paths.len());
        for path in paths {
            match calculate_dir_size(&path) {
                Ok(size) => to_process.push(PathToCheck {
                    formatted_size: bytes_to_human(size),
                    initial_size: size,
                    cleaner_name: self.name().to_string(),
                    path,
                }),
                Err(e) => {
                    log_warn!("⚠️ Could not determine size for path: {}", path.display().to_string().bright_yellow());
                    skipped_entries.push(SkippedEntry {
                        path: path.display().to_string(),
                        reason: format!("Could not determine size or access path: {}", e),
                    });
                }
            }
        }

        log_debug!("✅ Finished {} cleanup.", self.name());
        to_process
    }
}

/// Lists the direct children of `folder`, leaving out `kodi.log`.
///
/// Kodi keeps its log in `temp` on Linux; it is managed by the log commands instead.
pub fn folder_children(folder: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(folder) else {
        log_debug!("Nothing to clean in {}", folder.display());
        return Vec::new();
    };
    entries
        .flatten()
        .filter(|entry| entry.file_name() != LOG_FILE_NAME)
        .map(|entry| entry.path())
        .collect()
}

// Individual cleaner implementations, re-exported so callers can use
// `crate::core::cleaners::TempCleaner` and friends directly.
pub mod temp;
pub use self::temp::TempCleaner;
pub mod packages;
pub use self::packages::PackagesCleaner;
pub mod thumbnails;
pub use self::thumbnails::{ThumbnailTrimmer, ThumbnailsCleaner};
pub mod texture_db;
pub use self::texture_db::TextureDbCleaner;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct FixedCleaner(Vec<PathBuf>);

    impl Cleaner for FixedCleaner {
        fn name(&self) -> &str {
            "Fixed"
        }

        fn find_paths(&self) -> Vec<PathBuf> {
            self.0.clone()
        }
    }

    #[test]
    fn folder_children_skips_kodi_log() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("kodi.log"), "log").unwrap();
        fs::write(dir.path().join("cache.tmp"), "x").unwrap();

        let children = folder_children(dir.path());
        assert_eq!(children, vec![dir.path().join("cache.tmp")]);
        assert!(folder_children(&dir.path().join("missing")).is_empty());
    }

    #[test]
    fn clean_sizes_paths_and_honours_ignore_list() {
        let dir = tempdir().unwrap();
        let keep = dir.path().join("keep-me");
        let drop = dir.path().join("drop-me");
        fs::write(&keep, "1234").unwrap();
        fs::write(&drop, "123456").unwrap();
        let ghost = dir.path().join("ghost");

        let cleaner = FixedCleaner(vec![keep, drop.clone(), ghost.clone()]);
        let mut skipped = Vec::new();
        let found = cleaner.clean(&mut skipped, &["keep-me".to_string()]);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, drop);
        assert_eq!(found[0].initial_size, 6);
        assert_eq!(found[0].cleaner_name, "Fixed");
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].path, ghost.display().to_string());
    }
}
