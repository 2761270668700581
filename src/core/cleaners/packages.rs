use super::{folder_children, Cleaner};
use std::path::PathBuf;

/// Represents a cleaner for downloaded add-on zip packages (`addons/packages`).
///
/// Kodi keeps every downloaded add-on archive here after installing it.
pub struct PackagesCleaner {
    folder: PathBuf,
}

impl PackagesCleaner {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        PackagesCleaner { folder: folder.into() }
    }
}

impl Cleaner for PackagesCleaner {
    fn name(&self) -> &str {
        "Packages"
    }

    fn find_paths(&self) -> Vec<PathBuf> {
        folder_children(&self.folder)
    }
}
