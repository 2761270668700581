//! Error types for maintenance operations.

use std::path::PathBuf;

/// Result type for maintenance operations.
pub type Result<T> = std::result::Result<T, MaintenanceError>;

/// Everything that can abort a maintenance action.
///
/// None of these are fatal to the program: the CLI reports them and returns to
/// the menu (or exits with status 1).
#[derive(Debug, thiserror::Error)]
pub enum MaintenanceError {
    #[error("Source directory missing: {0}")]
    MissingSource(PathBuf),

    #[error("Destination is not writable: {path}: {source}")]
    Unwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Insufficient disk space at {path}: need {needed} bytes, {available} available")]
    InsufficientSpace {
        path: PathBuf,
        needed: u64,
        available: u64,
    },

    #[error("Invalid backup: {0}")]
    InvalidBackup(String),

    #[error("Backup archive is corrupt or unreadable: {0}")]
    CorruptArchive(String),

    #[error("{0} already exists")]
    AlreadyExists(PathBuf),

    #[error("No log file found at {0}")]
    LogNotFound(PathBuf),

    #[error("Log upload failed: {0}")]
    Upload(String),

    #[error("Host command failed: {0}")]
    Host(String),

    #[error("Invalid settings file {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MaintenanceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classifies a failed write to `path`: a full disk becomes
    /// `InsufficientSpace`, everything else `Unwritable`.
    pub fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::StorageFull {
            Self::InsufficientSpace {
                path,
                needed: 0,
                available: 0,
            }
        } else {
            Self::Unwritable { path, source }
        }
    }
}

impl From<zip::result::ZipError> for MaintenanceError {
    fn from(err: zip::result::ZipError) -> Self {
        // Read-side I/O failures land here too: either way the archive could not be read.
        Self::CorruptArchive(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn storage_full_maps_to_insufficient_space() {
        let err = MaintenanceError::write_failed(
            "/backups/a.zip",
            io::Error::new(io::ErrorKind::StorageFull, "disk full"),
        );
        assert!(matches!(err, MaintenanceError::InsufficientSpace { .. }));
    }

    #[test]
    fn permission_denied_maps_to_unwritable() {
        let err = MaintenanceError::write_failed(
            "/backups/a.zip",
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(err, MaintenanceError::Unwritable { .. }));
        assert!(err.to_string().contains("/backups/a.zip"));
    }

    #[test]
    fn invalid_backup_message_is_explicit() {
        let err = MaintenanceError::InvalidBackup("missing addons/".into());
        assert_eq!(err.to_string(), "Invalid backup: missing addons/");
    }
}
