use crate::core::paths::KodiPaths;
use crate::core::settings::Settings;
use crate::log_debug;
use crate::utils::filesystem::{safe_wipe_folder, WipeOutcome};

/// What a fresh start removed from each folder.
#[derive(Debug, Default)]
pub struct FreshStartReport {
    pub userdata: WipeOutcome,
    pub addons: WipeOutcome,
}

impl FreshStartReport {
    pub fn freed(&self) -> u64 {
        self.userdata.freed() + self.addons.freed()
    }

    pub fn failures(&self) -> impl Iterator<Item = &(std::path::PathBuf, String)> {
        self.userdata.failed.iter().chain(self.addons.failed.iter())
    }
}

/// Resets Kodi to a fresh install: all of userdata goes, and all add-ons except
/// those listed in `settings.keep_addons` (this tool, by default).
///
/// Locked files are skipped and show up in the report's failures. Kodi must be
/// force closed afterwards, otherwise it writes its settings straight back.
pub fn fresh_start(paths: &KodiPaths, settings: &Settings, dry_run: bool) -> FreshStartReport {
    log_debug!("Wiping {} (dry_run: {})", paths.userdata.display(), dry_run);
    let userdata = safe_wipe_folder(&paths.userdata, &[], dry_run);

    let keep: Vec<&str> = settings.keep_addons.iter().map(String::as_str).collect();
    log_debug!("Wiping {} except {:?}", paths.addons.display(), keep);
    let addons = safe_wipe_folder(&paths.addons, &keep, dry_run);

    FreshStartReport { userdata, addons }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::ADDON_ID;
    use std::fs;
    use tempfile::tempdir;

    fn installed_home() -> (tempfile::TempDir, KodiPaths) {
        let home = tempdir().unwrap();
        let paths = KodiPaths::from_home(home.path());
        fs::create_dir_all(paths.addons.join(ADDON_ID)).unwrap();
        fs::write(paths.addons.join(ADDON_ID).join("addon.xml"), "<addon/>").unwrap();
        fs::create_dir_all(paths.addons.join("skin.custom")).unwrap();
        fs::write(paths.addons.join("skin.custom/addon.xml"), "<skin/>").unwrap();
        fs::create_dir_all(&paths.database).unwrap();
        fs::write(paths.userdata.join("guisettings.xml"), "<settings/>").unwrap();
        fs::create_dir_all(&paths.media).unwrap();
        fs::write(paths.media.join("splash.png"), "png").unwrap();
        (home, paths)
    }

    #[test]
    fn wipes_everything_but_this_addon_and_media() {
        let (_home, paths) = installed_home();
        let report = fresh_start(&paths, &Settings::default(), false);

        assert_eq!(report.failures().count(), 0);
        assert!(paths.addons.join(ADDON_ID).join("addon.xml").exists());
        assert!(!paths.addons.join("skin.custom").exists());
        assert!(paths.userdata.exists());
        assert!(fs::read_dir(&paths.userdata).unwrap().next().is_none());
        assert!(paths.media.join("splash.png").exists());
    }

    #[test]
    fn dry_run_changes_nothing() {
        let (_home, paths) = installed_home();
        let report = fresh_start(&paths, &Settings::default(), true);

        assert_eq!(report.userdata.removed.len(), 2);
        assert_eq!(report.addons.removed.len(), 1);
        assert!(report.freed() > 0);
        assert!(paths.addons.join("skin.custom").exists());
        assert!(paths.userdata.join("guisettings.xml").exists());
    }
}
