//! Creating backup archives.
//!
//! A backup is a zip with one top-level directory per backup root:
//!
//! ```text
//! addons/...
//! userdata/...
//! userdata/Thumbnails/      (always present, always empty)
//! media/...
//! ```
//!
//! The archive comment carries a [`BackupInfo`] JSON document describing when
//! and from where the backup was taken.

use crate::core::error::{MaintenanceError, Result};
use crate::core::paths::KodiPaths;
use crate::utils::filesystem::bytes_to_human;
use crate::utils::prompt::{percent, Progress};
use crate::{log_debug, log_info, log_warn};
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Top-level entries every backup must contain, in archive order.
pub const ARCHIVE_ROOTS: [&str; 3] = ["addons", "userdata", "media"];

/// Directories never copied into a backup, as `(root, directory)` pairs.
/// They only hold caches and downloads Kodi rebuilds on its own.
const EXCLUDED_ROOT_DIRS: [(&str, &str); 3] = [
    ("userdata", "Thumbnails"),
    ("addons", "packages"),
    ("addons", "temp"),
];

/// Directory names skipped at any depth.
const EXCLUDED_ANY_DIRS: [&str; 2] = [".git", "__pycache__"];

/// Texture cache databases (`Textures13.db` and other versions) in userdata.
const TEXTURE_DB_PATTERN: &str = "textures*.db";

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Metadata stored as JSON in the archive comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub created_at: DateTime<Utc>,
    /// Source directory for each top-level entry.
    pub sources: BTreeMap<String, PathBuf>,
    /// Uncompressed size of all backed-up files.
    pub total_bytes: u64,
    pub files: u64,
}

/// Where and how to write a backup.
#[derive(Debug, Clone)]
pub struct BackupOptions {
    /// Directory the archive is written to.
    pub dest_dir: PathBuf,
    /// Archive name; a timestamped name is generated when `None`.
    pub name: Option<String>,
    /// Replace an existing archive of the same name.
    pub overwrite: bool,
}

impl BackupOptions {
    /// Full path of the archive that will be written.
    pub fn archive_path(&self, now: DateTime<Local>) -> PathBuf {
        self.dest_dir.join(archive_name(self.name.as_deref(), now))
    }

    /// Fixes the archive name at `now` and returns the full path.
    ///
    /// Later calls to [`BackupOptions::archive_path`] return the same path,
    /// whatever the time, so a timestamped default can't roll over.
    pub fn pin_name(&mut self, now: DateTime<Local>) -> PathBuf {
        let name = archive_name(self.name.as_deref(), now);
        let path = self.dest_dir.join(&name);
        self.name = Some(name);
        path
    }
}

/// Result of a successful backup.
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub archive: PathBuf,
    pub files: u64,
    /// Bytes of source data read.
    pub source_bytes: u64,
    /// Size of the finished archive.
    pub archive_bytes: u64,
    /// Backup roots that did not exist; they are present in the archive as empty entries.
    pub skipped_roots: Vec<PathBuf>,
    /// Files that could not be read, with the reason.
    pub skipped_files: Vec<(PathBuf, String)>,
}

/// Archive file name: `name` with `.zip` appended if needed, or
/// `kodi_backup_<YYYY-MM-DD_HH-MM-SS>.zip`.
pub fn archive_name(name: Option<&str>, now: DateTime<Local>) -> String {
    let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => format!("kodi_backup_{}", now.format("%Y-%m-%d_%H-%M-%S")),
    };
    if name.ends_with(".zip") {
        name
    } else {
        format!("{}.zip", name)
    }
}

/// One file or directory scheduled for the archive.
struct PlannedEntry {
    source: PathBuf,
    /// Name inside the archive, `/`-separated; directories end with `/`.
    name: String,
    size: u64,
    is_dir: bool,
}

/// Everything that goes into the archive, in write order.
struct BackupPlan {
    entries: Vec<PlannedEntry>,
    total_bytes: u64,
    file_count: u64,
    skipped_roots: Vec<PathBuf>,
    /// Paths found while planning that cannot go into the archive.
    skipped_files: Vec<(PathBuf, String)>,
}

/// Decides which paths are left out of a backup.
struct Exclusions {
    texture_db: Pattern,
}

impl Exclusions {
    fn new() -> Self {
        Exclusions {
            // The pattern is a constant; a parse failure is a programming error caught by tests.
            texture_db: Pattern::new(TEXTURE_DB_PATTERN).unwrap_or_default(),
        }
    }

    /// `relative` is the path below the backup root `root`.
    fn skip_dir(&self, root: &str, relative: &Path) -> bool {
        let Some(name) = relative.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if EXCLUDED_ANY_DIRS.contains(&name) {
            return true;
        }
        // Root-level exclusions only apply directly below the root.
        relative.components().count() == 1
            && EXCLUDED_ROOT_DIRS
                .iter()
                .any(|(r, dir)| *r == root && *dir == name)
    }

    fn skip_file(&self, root: &str, file_name: &str) -> bool {
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };
        root == "userdata" && self.texture_db.matches_with(file_name, options)
    }
}

/// Archive entry name for `relative` below `root`, always with `/` separators.
///
/// `None` when a component is not valid UTF-8: zip names are UTF-8, and a
/// lossy name would be restored under a different file name.
fn entry_name(root: &str, relative: &Path) -> Option<String> {
    let mut name = String::from(root);
    for component in relative.components() {
        name.push('/');
        name.push_str(component.as_os_str().to_str()?);
    }
    Some(name)
}

fn plan_backup(paths: &KodiPaths) -> BackupPlan {
    let exclusions = Exclusions::new();
    let mut plan = BackupPlan {
        entries: Vec::new(),
        total_bytes: 0,
        file_count: 0,
        skipped_roots: Vec::new(),
        skipped_files: Vec::new(),
    };

    for (root_name, root) in paths.backup_roots() {
        // Every root gets a directory entry, even when empty or missing, so
        // restore can always find all three.
        plan.entries.push(PlannedEntry {
            source: root.to_path_buf(),
            name: format!("{}/", root_name),
            size: 0,
            is_dir: true,
        });

        if !root.is_dir() {
            log_warn!(
                "⚠️ {}",
                MaintenanceError::MissingSource(root.to_path_buf())
                    .to_string()
                    .bright_yellow()
            );
            plan.skipped_roots.push(root.to_path_buf());
        } else {
            plan_root(&mut plan, &exclusions, root_name, root);
        }

        if root_name == "userdata" {
            // Keeps the (excluded) thumbnail cache folder in place after a restore.
            plan.entries.push(PlannedEntry {
                source: paths.thumbnails.clone(),
                name: "userdata/Thumbnails/".to_string(),
                size: 0,
                is_dir: true,
            });
        }
    }
    plan
}

/// Adds everything below `root` to `plan`.
///
/// Symlinks are not followed into directories, but a symlink to a file is
/// archived with the target's contents. Anything that cannot be archived
/// faithfully ends up in `plan.skipped_files`.
fn plan_root(plan: &mut BackupPlan, exclusions: &Exclusions, root_name: &str, root: &Path) {
    let mut walker = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let relative = e.path().strip_prefix(root).unwrap_or(e.path());
            !(e.file_type().is_dir() && exclusions.skip_dir(root_name, relative))
        });

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log_warn!("⚠️ Skipping unreadable entry: {}", e);
                if let Some(path) = e.path() {
                    plan.skipped_files.push((path.to_path_buf(), e.to_string()));
                }
                continue;
            }
        };
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let file_type = entry.file_type();

        let Some(name) = entry_name(root_name, relative) else {
            log_warn!("⚠️ Skipping {}: name is not valid UTF-8", entry.path().display());
            plan.skipped_files
                .push((entry.path().to_path_buf(), "name is not valid UTF-8".to_string()));
            if file_type.is_dir() {
                walker.skip_current_dir();
            }
            continue;
        };

        if file_type.is_dir() {
            plan.entries.push(PlannedEntry {
                source: entry.path().to_path_buf(),
                name: format!("{}/", name),
                size: 0,
                is_dir: true,
            });
            continue;
        }

        // `fs::metadata` follows a symlink to whatever it points at.
        let metadata = if file_type.is_symlink() {
            match fs::metadata(entry.path()) {
                Ok(m) if m.is_file() => m,
                Ok(_) => {
                    log_warn!("⚠️ Skipping symlink to a directory: {}", entry.path().display());
                    plan.skipped_files.push((
                        entry.path().to_path_buf(),
                        "symlink to a directory".to_string(),
                    ));
                    continue;
                }
                Err(e) => {
                    log_warn!("⚠️ Skipping broken symlink {}: {}", entry.path().display(), e);
                    plan.skipped_files
                        .push((entry.path().to_path_buf(), format!("broken symlink: {}", e)));
                    continue;
                }
            }
        } else if file_type.is_file() {
            match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    log_warn!("⚠️ Skipping {}: {}", entry.path().display(), e);
                    plan.skipped_files.push((entry.path().to_path_buf(), e.to_string()));
                    continue;
                }
            }
        } else {
            // Fifos, sockets and devices have no contents worth keeping.
            log_debug!("Skipping special file {}", entry.path().display());
            continue;
        };

        let file_name = entry.file_name().to_string_lossy();
        if exclusions.skip_file(root_name, &file_name) {
            log_debug!("Excluding {}", entry.path().display());
            continue;
        }
        let size = metadata.len();
        plan.total_bytes += size;
        plan.file_count += 1;
        plan.entries.push(PlannedEntry {
            source: entry.path().to_path_buf(),
            name,
            size,
            is_dir: false,
        });
    }
}

/// Fails with `InsufficientSpace` when `dest_dir` clearly cannot hold `needed` bytes.
///
/// `needed` is the uncompressed size, so this errs on the side of refusing.
fn check_free_space(dest_dir: &Path, needed: u64) -> Result<()> {
    match fs2::available_space(dest_dir) {
        Ok(available) if available < needed => Err(MaintenanceError::InsufficientSpace {
            path: dest_dir.to_path_buf(),
            needed,
            available,
        }),
        Ok(_) => Ok(()),
        Err(e) => {
            log_debug!("Could not query free space on {}: {}", dest_dir.display(), e);
            Ok(())
        }
    }
}

#[cfg(unix)]
fn unix_mode(path: &Path) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).ok().map(|m| m.permissions().mode())
}

#[cfg(not(unix))]
fn unix_mode(_path: &Path) -> Option<u32> {
    None
}

fn zip_write_error(path: &Path, err: zip::result::ZipError) -> MaintenanceError {
    match err {
        zip::result::ZipError::Io(e) => MaintenanceError::write_failed(path, e),
        other => MaintenanceError::Unwritable {
            path: path.to_path_buf(),
            source: std::io::Error::other(other.to_string()),
        },
    }
}

/// Why streaming a file into the archive stopped.
enum CopyError {
    /// The source could not be read; the file can be skipped.
    Read(std::io::Error),
    /// The archive could not be written; the backup has to stop.
    Write(MaintenanceError),
}

/// Streams one source file into the current archive entry.
///
/// Read errors and write errors are kept apart so a vanished source file is
/// not reported as an unwritable destination.
fn copy_into_entry<W: Write>(file: &mut File, out: &mut W, archive: &Path) -> std::result::Result<u64, CopyError> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut written = 0u64;
    loop {
        let n = file.read(&mut buffer).map_err(CopyError::Read)?;
        if n == 0 {
            return Ok(written);
        }
        out.write_all(&buffer[..n])
            .map_err(|e| CopyError::Write(MaintenanceError::write_failed(archive, e)))?;
        written += n as u64;
    }
}

/// What [`write_archive`] actually put into the archive.
#[derive(Debug, Default, PartialEq, Eq)]
struct Written {
    files: u64,
    bytes: u64,
}

fn write_archive(
    plan: &BackupPlan,
    paths: &KodiPaths,
    partial: &Path,
    progress: &mut dyn Progress,
    skipped_files: &mut Vec<(PathBuf, String)>,
) -> Result<Written> {
    let file = File::create(partial).map_err(|e| MaintenanceError::write_failed(partial, e))?;
    let mut zip = ZipWriter::new(file);

    let dir_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .unix_permissions(0o755);

    let mut attempted = 0u64;
    let mut written = Written::default();

    for entry in &plan.entries {
        if entry.is_dir {
            zip.add_directory(entry.name.clone(), dir_options.clone())
                .map_err(|e| zip_write_error(partial, e))?;
            continue;
        }

        attempted += 1;
        progress.update(
            percent(attempted, plan.file_count.max(1)).min(99),
            &format!("Backing up: {}", entry.name),
        );

        // Opened before the entry is started so an unopenable file leaves no trace.
        let mut source = match File::open(&entry.source) {
            Ok(f) => f,
            Err(e) => {
                log_warn!("⚠️ Skipping unreadable file {}: {}", entry.source.display(), e);
                skipped_files.push((entry.source.clone(), e.to_string()));
                continue;
            }
        };

        let mut options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(entry.size >= u32::MAX as u64);
        if let Some(mode) = unix_mode(&entry.source) {
            options = options.unix_permissions(mode);
        }

        zip.start_file(entry.name.clone(), options)
            .map_err(|e| zip_write_error(partial, e))?;
        match copy_into_entry(&mut source, &mut zip, partial) {
            Ok(bytes) => {
                written.files += 1;
                written.bytes += bytes;
            }
            Err(CopyError::Read(e)) => {
                // Drop the half-written entry rather than archive a truncated file.
                zip.abort_file().map_err(|e| zip_write_error(partial, e))?;
                log_warn!("⚠️ Skipping unreadable file {}: {}", entry.source.display(), e);
                skipped_files.push((entry.source.clone(), e.to_string()));
            }
            Err(CopyError::Write(e)) => return Err(e),
        }
    }

    let info = BackupInfo {
        created_at: Utc::now(),
        sources: paths
            .backup_roots()
            .iter()
            .map(|(name, path)| (name.to_string(), path.to_path_buf()))
            .collect(),
        total_bytes: written.bytes,
        files: written.files,
    };
    // Serializing a struct of strings, paths and integers cannot fail.
    let comment = serde_json::to_string(&info).unwrap_or_default();
    zip.set_comment(comment);

    let mut file = zip.finish().map_err(|e| zip_write_error(partial, e))?;
    file.flush().map_err(|e| MaintenanceError::write_failed(partial, e))?;
    file.sync_all()
        .map_err(|e| MaintenanceError::write_failed(partial, e))?;
    Ok(written)
}

/// Backs up the add-ons, userdata and media directories into a zip archive.
///
/// The archive is first written as `<name>.partial` next to its final location
/// and renamed once complete, so a failed or interrupted backup never leaves a
/// truncated archive under the real name.
///
/// # Errors
/// * `AlreadyExists` if the archive exists and `options.overwrite` is false.
/// * `Unwritable` if the destination cannot be created or written.
/// * `InsufficientSpace` if the destination is too small or fills up.
pub fn create_backup(
    paths: &KodiPaths,
    options: &BackupOptions,
    progress: &mut dyn Progress,
) -> Result<BackupReport> {
    let archive = options.archive_path(Local::now());
    if archive.exists() && !options.overwrite {
        return Err(MaintenanceError::AlreadyExists(archive));
    }

    fs::create_dir_all(&options.dest_dir).map_err(|source| MaintenanceError::Unwritable {
        path: options.dest_dir.clone(),
        source,
    })?;

    progress.update(0, "Calculating files...");
    let mut plan = plan_backup(paths);
    log_info!(
        "📦 {} files ({}) to back up",
        plan.file_count.to_string().bright_white(),
        bytes_to_human(plan.total_bytes).bright_white()
    );
    check_free_space(&options.dest_dir, plan.total_bytes)?;

    let mut partial_name = archive.as_os_str().to_owned();
    partial_name.push(".partial");
    let partial = PathBuf::from(partial_name);

    let mut skipped_files = std::mem::take(&mut plan.skipped_files);
    let written = write_archive(&plan, paths, &partial, progress, &mut skipped_files)
        .and_then(|written| {
            fs::rename(&partial, &archive)
                .map_err(|e| MaintenanceError::write_failed(&archive, e))?;
            Ok(written)
        });
    progress.finish();

    let written = match written {
        Ok(written) => written,
        Err(e) => {
            // Never leave a half-written archive behind.
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
    };

    let archive_bytes = fs::metadata(&archive).map(|m| m.len()).unwrap_or(0);
    Ok(BackupReport {
        files: written.files,
        archive,
        source_bytes: written.bytes,
        archive_bytes,
        skipped_roots: plan.skipped_roots,
        skipped_files,
    })
}
