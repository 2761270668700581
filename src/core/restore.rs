//! Restoring a backup archive over the live Kodi directories.
//!
//! Restore runs in two halves. Everything that can fail on a bad archive
//! (opening, structure check, CRC check, extraction to a staging directory)
//! happens before the live directories are touched. Only then are
//! `addons`, `userdata` and `media` wiped and the staged content moved in.

use crate::core::backup::{BackupInfo, ARCHIVE_ROOTS};
use crate::core::error::{MaintenanceError, Result};
use crate::core::paths::KodiPaths;
use crate::utils::filesystem::{move_path, remove_path, safe_wipe_folder};
use crate::utils::prompt::{percent, Progress};
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Directory below `temp` the archive is extracted into before it is applied.
pub const STAGING_DIR_NAME: &str = "restore_staging";

/// Result of a restore.
#[derive(Debug, Default)]
pub struct RestoreReport {
    /// Number of archive entries extracted.
    pub entries: usize,
    /// Uncompressed bytes extracted.
    pub bytes: u64,
    /// Items that could not be removed or moved into place. A non-empty list
    /// means the live directories are only partially restored.
    pub problems: Vec<String>,
    /// Metadata from the archive comment, when the archive was made by this tool.
    pub info: Option<BackupInfo>,
}

/// Reads the [`BackupInfo`] from an archive comment, if there is one.
pub fn read_backup_info<R: io::Read + io::Seek>(archive: &ZipArchive<R>) -> Option<BackupInfo> {
    serde_json::from_slice(archive.comment()).ok()
}

/// Checks that every required top-level root has at least one entry.
///
/// # Errors
/// `InvalidBackup` naming the missing roots.
pub fn validate_structure<R: io::Read + io::Seek>(archive: &ZipArchive<R>) -> Result<()> {
    let missing: Vec<String> = ARCHIVE_ROOTS
        .iter()
        .filter(|root| {
            let prefix = format!("{}/", root);
            !archive.file_names().any(|name| name.starts_with(&prefix))
        })
        .map(|root| format!("{}/", root))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MaintenanceError::InvalidBackup(format!(
            "missing top-level entries: {}",
            missing.join(", ")
        )))
    }
}

/// Reads every entry to the end, which makes the zip reader verify its CRC.
/// Also rejects entries whose names would escape the extraction directory.
fn verify_entries<R: io::Read + io::Seek>(archive: &mut ZipArchive<R>) -> Result<()> {
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if entry.enclosed_name().is_none() {
            return Err(MaintenanceError::InvalidBackup(format!(
                "unsafe entry path: {}",
                name
            )));
        }
        if entry.is_dir() {
            continue;
        }
        io::copy(&mut entry, &mut io::sink())
            .map_err(|e| MaintenanceError::CorruptArchive(format!("{}: {}", name, e)))?;
    }
    Ok(())
}

/// Opens and fully validates `archive_path` without touching anything else.
///
/// Returns the open archive ready for extraction.
pub fn open_backup(archive_path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(archive_path).map_err(|e| MaintenanceError::io(archive_path, e))?;
    let mut archive = ZipArchive::new(file)?;
    validate_structure(&archive)?;
    verify_entries(&mut archive)?;
    Ok(archive)
}

/// Extracts all entries into `staging`. Returns `(entries, bytes)`.
fn extract_to_staging(
    archive: &mut ZipArchive<File>,
    staging: &Path,
    progress: &mut dyn Progress,
) -> Result<(usize, u64)> {
    let total = archive.len();
    let mut bytes = 0u64;

    for i in 0..total {
        let mut entry = archive.by_index(i)?;
        // Checked by `verify_entries`; still refuse rather than trust it.
        let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            return Err(MaintenanceError::InvalidBackup(format!(
                "unsafe entry path: {}",
                entry.name()
            )));
        };
        let target = staging.join(&relative);

        // Extraction covers 10-70% of the bar.
        let pct = 10 + (u64::from(percent(i as u64, total as u64)) * 60 / 100) as u8;
        progress.update(pct, &format!("Extracting: {}", entry.name()));

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| MaintenanceError::write_failed(&target, e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| MaintenanceError::write_failed(parent, e))?;
        }
        let mut out = File::create(&target).map_err(|e| MaintenanceError::write_failed(&target, e))?;
        bytes += io::copy(&mut entry, &mut out).map_err(|e| MaintenanceError::write_failed(&target, e))?;

        if let Some(mode) = entry.unix_mode() {
            set_permissions(&target, mode);
        }
    }
    Ok((total, bytes))
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    // Only the permission bits; the file type bits are meaningless here.
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777));
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) {}

/// Where a top-level staged item belongs in the live installation.
fn live_root<'a>(paths: &'a KodiPaths, name: &str) -> Option<&'a Path> {
    paths
        .backup_roots()
        .into_iter()
        .find(|(root, _)| *root == name)
        .map(|(_, path)| path)
}

/// Moves staged content into the live directories, collecting failures.
fn apply_staging(paths: &KodiPaths, staging: &Path, problems: &mut Vec<String>) -> Result<()> {
    let items = fs::read_dir(staging).map_err(|e| MaintenanceError::io(staging, e))?;

    for item in items {
        let item = item.map_err(|e| MaintenanceError::io(staging, e))?;
        let name = item.file_name().to_string_lossy().into_owned();
        let src = item.path();

        let Some(target_root) = live_root(paths, &name) else {
            // Unknown top-level items go directly under home, unless that would
            // replace the directory the staging area itself lives in.
            let dst = paths.home.join(&name);
            if staging.starts_with(&dst) {
                log_warn!("⚠️ Not restoring {}: it would replace the staging area", name);
                problems.push(format!("{}: skipped, would replace the staging area", name));
                continue;
            }
            if let Err(e) = move_path(&src, &dst) {
                log_warn!("❌ Move failed {} -> {}: {}", src.display(), dst.display(), e);
                problems.push(format!("{}: {}", name, e));
            }
            continue;
        };

        if !src.is_dir() {
            problems.push(format!("{}: expected a directory in the backup", name));
            continue;
        }

        fs::create_dir_all(target_root).map_err(|e| MaintenanceError::write_failed(target_root, e))?;
        let children = fs::read_dir(&src).map_err(|e| MaintenanceError::io(&src, e))?;
        for child in children {
            let child = child.map_err(|e| MaintenanceError::io(&src, e))?;
            let dst = target_root.join(child.file_name());
            if let Err(e) = move_path(&child.path(), &dst) {
                log_warn!("❌ Move failed {} -> {}: {}", child.path().display(), dst.display(), e);
                problems.push(format!("{}/{}: {}", name, child.file_name().to_string_lossy(), e));
            }
        }
    }
    Ok(())
}

/// Restores `archive_path` over the live add-ons, userdata and media directories.
///
/// The archive is validated and extracted to `<temp>/restore_staging` first;
/// if any of that fails nothing in the live directories has changed. After
/// that the three roots are wiped and replaced by the archive contents.
/// Failures at this stage are collected in [`RestoreReport::problems`] rather
/// than aborting, since stopping half way would leave even less in place.
///
/// Kodi must be restarted afterwards for the restored data to take effect.
///
/// # Errors
/// * `Io` if the archive cannot be opened.
/// * `CorruptArchive` if it is not a readable zip or an entry fails its CRC check.
/// * `InvalidBackup` if a required root is missing or an entry path is unsafe.
/// * `Unwritable` / `InsufficientSpace` if extraction to the staging area fails.
pub fn restore_backup(
    paths: &KodiPaths,
    archive_path: &Path,
    progress: &mut dyn Progress,
) -> Result<RestoreReport> {
    progress.update(0, "Verifying backup integrity...");
    let mut archive = open_backup(archive_path)?;
    let mut report = RestoreReport {
        info: read_backup_info(&archive),
        ..RestoreReport::default()
    };
    if let Some(info) = &report.info {
        log_info!(
            "📦 Backup from {} ({} files)",
            info.created_at.to_rfc3339().bright_white(),
            info.files
        );
    }

    let staging = staging_dir(paths);
    remove_path(&staging, false).map_err(|e| MaintenanceError::write_failed(&staging, e))?;
    fs::create_dir_all(&staging).map_err(|e| MaintenanceError::write_failed(&staging, e))?;

    let result = extract_to_staging(&mut archive, &staging, progress).and_then(|(entries, bytes)| {
        report.entries = entries;
        report.bytes = bytes;

        // Past this point the live directories change.
        progress.update(75, "Applying restore (do NOT interrupt)...");
        for (i, (name, root)) in paths.backup_roots().into_iter().enumerate() {
            progress.update(75 + (i as u8) * 5, &format!("Wiping: {}", name));
            let outcome = safe_wipe_folder(root, &[], false);
            for (path, err) in outcome.failed {
                log_debug!("Could not wipe {}: {}", path.display(), err);
                report.problems.push(format!("{}: {}", path.display(), err));
            }
        }

        progress.update(90, "Moving restored files into place...");
        apply_staging(paths, &staging, &mut report.problems)
    });

    // The staging area is removed whatever happened.
    if let Err(e) = remove_path(&staging, false) {
        log_debug!("Could not remove staging directory {}: {}", staging.display(), e);
    }
    progress.finish();

    result?;
    Ok(report)
}

/// Path of the staging directory for `paths`.
pub fn staging_dir(paths: &KodiPaths) -> PathBuf {
    paths.temp.join(STAGING_DIR_NAME)
}
