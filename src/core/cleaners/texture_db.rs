use super::Cleaner;
use crate::log_debug;
use std::path::PathBuf;

/// Represents a cleaner for the texture cache database (`userdata/Database/Textures13.db`).
///
/// The database indexes the Thumbnails folder, so it goes whenever the
/// thumbnails are wiped. Kodi rebuilds it on the next start.
pub struct TextureDbCleaner {
    db_path: PathBuf,
}

impl TextureDbCleaner {
    /// `database` is the Database folder, `file_name` the configured texture db name.
    pub fn new(database: impl Into<PathBuf>, file_name: &str) -> Self {
        TextureDbCleaner {
            db_path: database.into().join(file_name),
        }
    }
}

impl Cleaner for TextureDbCleaner {
    fn name(&self) -> &str {
        "Texture Database"
    }

    fn find_paths(&self) -> Vec<PathBuf> {
        if self.db_path.is_file() {
            vec![self.db_path.clone()]
        } else {
            log_debug!("No texture database at {}", self.db_path.display());
            Vec::new()
        }
    }
}
