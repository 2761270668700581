use std::env;
use std::path::{Path, PathBuf};

/// Name of the Kodi log file inside [`KodiPaths::log_dir`].
pub const LOG_FILE_NAME: &str = "kodi.log";

/// Environment variable that overrides the detected Kodi home directory.
pub const HOME_ENV: &str = "LAZYMAINT_KODI_HOME";

/// Resolved locations inside a Kodi installation.
///
/// Mirrors Kodi's `special://` roots: `special://home/`, `special://userdata/`,
/// `special://temp/`, `special://thumbnails/`, `special://logpath/` and friends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KodiPaths {
    pub home: PathBuf,
    pub addons: PathBuf,
    pub userdata: PathBuf,
    pub media: PathBuf,
    pub temp: PathBuf,
    pub thumbnails: PathBuf,
    pub packages: PathBuf,
    pub database: PathBuf,
    pub log_dir: PathBuf,
}

impl KodiPaths {
    /// Builds the standard layout below `home`.
    ///
    /// The log directory is `<home>/temp`, which is where Linux builds of Kodi
    /// keep `kodi.log`. Use [`KodiPaths::with_log_dir`] to point it elsewhere.
    pub fn from_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let addons = home.join("addons");
        let userdata = home.join("userdata");
        let temp = home.join("temp");
        KodiPaths {
            media: home.join("media"),
            thumbnails: userdata.join("Thumbnails"),
            packages: addons.join("packages"),
            database: userdata.join("Database"),
            log_dir: temp.clone(),
            home,
            addons,
            userdata,
            temp,
        }
    }

    /// Replaces the log directory.
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    /// Resolves the paths for this machine.
    ///
    /// Precedence for the home directory: `home_override` (the `--home` flag),
    /// then `LAZYMAINT_KODI_HOME`, then the platform default. The log directory
    /// follows `log_dir_override` or the platform default.
    pub fn detect(home_override: Option<&Path>, log_dir_override: Option<&Path>) -> Self {
        let home = home_override
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(HOME_ENV).map(PathBuf::from))
            .unwrap_or_else(default_home);

        let log_dir = log_dir_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_log_dir(&home));

        KodiPaths::from_home(home).with_log_dir(log_dir)
    }

    /// Full path of `kodi.log`.
    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE_NAME)
    }

    /// The three backup roots, paired with their top-level archive entry names.
    pub fn backup_roots(&self) -> [(&'static str, &Path); 3] {
        [
            ("addons", self.addons.as_path()),
            ("userdata", self.userdata.as_path()),
            ("media", self.media.as_path()),
        ]
    }
}

fn user_home() -> PathBuf {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_default()
}

fn default_home() -> PathBuf {
    if cfg!(target_os = "windows") {
        env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(user_home)
            .join("Kodi")
    } else if cfg!(target_os = "macos") {
        user_home().join("Library/Application Support/Kodi")
    } else {
        user_home().join(".kodi")
    }
}

fn default_log_dir(home: &Path) -> PathBuf {
    if cfg!(target_os = "windows") {
        home.to_path_buf()
    } else if cfg!(target_os = "macos") {
        user_home().join("Library/Logs")
    } else {
        home.join("temp")
    }
}
