use super::{folder_children, Cleaner};
use std::path::PathBuf;

/// Represents a cleaner for Kodi's temp/cache folder (`special://temp/`).
pub struct TempCleaner {
    folder: PathBuf,
}

impl TempCleaner {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        TempCleaner { folder: folder.into() }
    }
}

impl Cleaner for TempCleaner {
    fn name(&self) -> &str {
        "Temp"
    }

    fn find_paths(&self) -> Vec<PathBuf> {
        // Everything in temp except kodi.log.
        folder_children(&self.folder)
    }
}
