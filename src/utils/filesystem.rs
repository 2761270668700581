use crate::log_debug;
// Imports the `log_debug` macro for logging debug-level messages.
use std::fs;
// File system operations: deleting, renaming, copying, reading metadata.
use std::io;
// `io::Result` and `io::Error`.
use std::path::{Path, PathBuf};
// Borrowed and owned file system paths.
use walkdir::WalkDir;
// Recursive directory traversal used by the copy fallback of `move_path`.

/// Recursively deletes a file or directory at the given path.
///
/// If the path does not exist, this function returns `Ok(())` immediately, as
/// there's nothing to delete.
///
/// # Arguments
/// * `path` - The file or directory to be removed.
/// * `dry_run` - If `true`, nothing is deleted and `Ok(())` is returned.
///
/// # Errors
///
/// Returns an `io::Error` if the removal fails (permission denied, file locked by
/// a running Kodi, disk error) during an actual run.
pub fn remove_path(path: &Path, dry_run: bool) -> io::Result<()> {
    log_debug!("Attempting to remove path: {}", path.display());

    // In dry run we only report, never touch the disk.
    if dry_run {
        return Ok(());
    }

    // `symlink_metadata` so a dangling symlink is still seen (and removed) instead of
    // being reported as missing.
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log_debug!("Path does not exist: {}", path.display());
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    if metadata.is_dir() {
        // Directories are removed recursively with everything inside.
        log_debug!("Path is a directory. Recursively removing: {}", path.display());
        fs::remove_dir_all(path)
    } else {
        // Regular files, symlinks and other special files.
        fs::remove_file(path)
    }
}

/// Outcome of [`safe_wipe_folder`].
#[derive(Debug, Default)]
pub struct WipeOutcome {
    /// Items that were (or in dry run would be) removed, with their size in bytes.
    pub removed: Vec<(PathBuf, u64)>,
    /// Items that could not be removed, with the error message.
    pub failed: Vec<(PathBuf, String)>,
}

impl WipeOutcome {
    /// Total bytes of all removed items.
    pub fn freed(&self) -> u64 {
        self.removed.iter().map(|(_, size)| size).sum()
    }
}

/// Deletes the direct children of `folder` one by one.
///
/// A locked item (Kodi keeps some files open) is recorded in
/// [`WipeOutcome::failed`] and the wipe carries on with the next item. The folder
/// itself is kept. Children whose file name is in `exclude` are left alone.
///
/// A missing folder is an empty, successful wipe.
pub fn safe_wipe_folder(folder: &Path, exclude: &[&str], dry_run: bool) -> WipeOutcome {
    let mut outcome = WipeOutcome::default();

    let entries = match fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                outcome.failed.push((folder.to_path_buf(), e.to_string()));
            }
            return outcome;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                outcome.failed.push((folder.to_path_buf(), e.to_string()));
                continue;
            }
        };
        let name = entry.file_name();
        if exclude.iter().any(|ex| name.to_string_lossy() == *ex) {
            log_debug!("Keeping excluded item: {}", entry.path().display());
            continue;
        }

        let path = entry.path();
        // Size first: once the item is gone there is nothing left to measure.
        let size = calculate_dir_size(&path).unwrap_or(0);
        match remove_path(&path, dry_run) {
            Ok(()) => outcome.removed.push((path, size)),
            Err(e) => {
                // Most likely locked by the OS; skip it.
                log_debug!("Skipped locked item {}: {}", path.display(), e);
                outcome.failed.push((path, e.to_string()));
            }
        }
    }
    outcome
}

/// Moves `src` to `dst`, replacing whatever is at `dst`.
///
/// Any existing `dst` is removed first so a directory is never moved *into* an
/// existing one. `fs::rename` is tried first; when that fails (for example
/// across file systems) the tree is copied and the source removed.
pub fn move_path(src: &Path, dst: &Path) -> io::Result<()> {
    remove_path(dst, false)?;
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) => {
            log_debug!("Rename {} -> {} failed ({}), copying instead", src.display(), dst.display(), e);
            copy_tree(src, dst)?;
            remove_path(src, false)
        }
    }
}

/// Copies a file, or a directory tree, from `src` to `dst`.
fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_file() {
        fs::copy(src, dst)?;
        return Ok(());
    }

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::other)?;
        // `strip_prefix` cannot fail: every entry lives below `src`.
        let relative = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Recursively calculates the total size of a directory or the size of a file.
///
/// Symbolic links are measured themselves rather than followed, which avoids
/// loops and double counting.
///
/// # Returns
/// * `Ok(size)`: The total size in bytes.
/// * `Err(error)`: Any I/O error while reading metadata or directory entries.
pub fn calculate_dir_size(path: &Path) -> io::Result<u64> {
    let metadata = fs::symlink_metadata(path)?;
    if !metadata.is_dir() {
        return Ok(metadata.len());
    }

    let mut size = 0;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let metadata = fs::symlink_metadata(entry.path())?;
        if metadata.is_dir() {
            size += calculate_dir_size(&entry.path())?; // Recurse for subdirectories.
        } else if metadata.is_file() {
            size += metadata.len();
        }
        // Symlinks, fifos, sockets and devices don't count towards the size.
    }
    Ok(size)
}

/// Converts a number of bytes into a human-readable string, e.g. "10.50 MB".
pub fn bytes_to_human(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;

    if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.2} KB", b / KB)
    } else {
        format!("{} bytes", bytes)
    }
}
