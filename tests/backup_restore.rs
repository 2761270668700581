use lazymaint::core::backup::{create_backup, BackupOptions};
use lazymaint::core::error::MaintenanceError;
use lazymaint::core::paths::KodiPaths;
use lazymaint::core::restore::{restore_backup, staging_dir};
use lazymaint::utils::prompt::NoProgress;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::{tempdir, TempDir};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A small but realistic Kodi home.
fn populated_home() -> (TempDir, KodiPaths) {
    let home = tempdir().unwrap();
    let paths = KodiPaths::from_home(home.path());
    write(&paths.addons.join("plugin.video.demo/addon.xml"), "<addon id=\"plugin.video.demo\"/>");
    write(&paths.addons.join("plugin.video.demo/resources/lib/main.py"), "print('hi')");
    write(&paths.addons.join("packages/plugin.video.demo-1.0.zip"), "old package");
    write(&paths.addons.join("plugin.video.demo/.git/HEAD"), "ref: refs/heads/main");
    write(&paths.userdata.join("guisettings.xml"), "<settings/>");
    write(&paths.userdata.join("sources.xml"), "A");
    write(&paths.userdata.join("Database/MyVideos131.db"), "videos");
    write(&paths.userdata.join("Database/Textures13.db"), "textures");
    write(&paths.userdata.join("Thumbnails/0/0a1b2c3d.jpg"), "jpeg");
    write(&paths.media.join("splash.png"), "png");
    fs::create_dir_all(paths.userdata.join("addon_data/empty.addon")).unwrap();
    (home, paths)
}

/// Relative paths of everything below the three backup roots; directories end with `/`.
fn tree(paths: &KodiPaths) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for (name, root) in paths.backup_roots() {
        for entry in WalkDir::new(root).min_depth(1) {
            let entry = entry.unwrap();
            let rel = entry.path().strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
            let suffix = if entry.file_type().is_dir() { "/" } else { "" };
            out.insert(format!("{}/{}{}", name, rel, suffix));
        }
    }
    out
}

fn backup_to(paths: &KodiPaths, dest: &Path) -> std::path::PathBuf {
    let options = BackupOptions {
        dest_dir: dest.to_path_buf(),
        name: Some("roundtrip".into()),
        overwrite: false,
    };
    create_backup(paths, &options, &mut NoProgress).unwrap().archive
}

#[test]
fn backup_then_restore_reproduces_the_installation() {
    let (_home, paths) = populated_home();
    let out = tempdir().unwrap();
    let archive = backup_to(&paths, out.path());

    // Drop the excluded content up front so the trees can be compared directly.
    fs::remove_dir_all(paths.addons.join("packages")).unwrap();
    fs::remove_dir_all(paths.addons.join("plugin.video.demo/.git")).unwrap();
    fs::remove_file(paths.userdata.join("Database/Textures13.db")).unwrap();
    fs::remove_dir_all(paths.userdata.join("Thumbnails")).unwrap();
    fs::create_dir_all(&paths.thumbnails).unwrap();
    let expected = tree(&paths);

    // Change things after the backup.
    write(&paths.addons.join("plugin.video.new/addon.xml"), "<addon/>");
    fs::remove_file(paths.media.join("splash.png")).unwrap();

    let report = restore_backup(&paths, &archive, &mut NoProgress).unwrap();
    assert!(report.problems.is_empty(), "{:?}", report.problems);
    assert_eq!(report.info.map(|i| i.files), Some(6));
    assert_eq!(tree(&paths), expected);
    assert!(!staging_dir(&paths).exists());
}

#[test]
fn restore_undoes_later_edits() {
    let (_home, paths) = populated_home();
    let out = tempdir().unwrap();
    let archive = backup_to(&paths, out.path());

    fs::write(paths.userdata.join("sources.xml"), "B").unwrap();
    restore_backup(&paths, &archive, &mut NoProgress).unwrap();

    assert_eq!(fs::read_to_string(paths.userdata.join("sources.xml")).unwrap(), "A");
}

#[test]
fn empty_source_directories_survive() {
    let (_home, paths) = populated_home();
    let out = tempdir().unwrap();
    let archive = backup_to(&paths, out.path());

    fs::remove_dir_all(paths.userdata.join("addon_data")).unwrap();
    restore_backup(&paths, &archive, &mut NoProgress).unwrap();

    assert!(paths.userdata.join("addon_data/empty.addon").is_dir());
    assert!(paths.thumbnails.is_dir());
}

#[test]
fn missing_media_still_backs_up() {
    let (_home, paths) = populated_home();
    fs::remove_dir_all(&paths.media).unwrap();
    let out = tempdir().unwrap();

    let options = BackupOptions {
        dest_dir: out.path().to_path_buf(),
        name: None,
        overwrite: false,
    };
    let report = create_backup(&paths, &options, &mut NoProgress).unwrap();
    assert_eq!(report.skipped_roots, vec![paths.media.clone()]);

    let names: Vec<String> = zip::ZipArchive::new(File::open(&report.archive).unwrap())
        .unwrap()
        .file_names()
        .map(String::from)
        .collect();
    assert!(names.iter().any(|n| n == "media/"));
    assert!(report
        .archive
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("kodi_backup_"));
}

#[test]
fn existing_archive_is_not_overwritten() {
    let (_home, paths) = populated_home();
    let out = tempdir().unwrap();
    let archive = backup_to(&paths, out.path());
    let before = fs::read(&archive).unwrap();

    let options = BackupOptions {
        dest_dir: out.path().to_path_buf(),
        name: Some("roundtrip.zip".into()),
        overwrite: false,
    };
    let err = create_backup(&paths, &options, &mut NoProgress).unwrap_err();
    assert!(matches!(err, MaintenanceError::AlreadyExists(_)));
    assert_eq!(fs::read(&archive).unwrap(), before);
}

#[test]
fn foreign_zip_is_rejected_without_touching_anything() {
    let (_home, paths) = populated_home();
    let before = tree(&paths);

    let out = tempdir().unwrap();
    let archive = out.path().join("notes.zip");
    let mut zip = ZipWriter::new(File::create(&archive).unwrap());
    zip.start_file("notes.txt", SimpleFileOptions::default()).unwrap();
    zip.write_all(b"not a backup").unwrap();
    zip.finish().unwrap();

    let err = restore_backup(&paths, &archive, &mut NoProgress).unwrap_err();
    assert!(err.to_string().starts_with("Invalid backup"), "{}", err);
    assert_eq!(tree(&paths), before);
}

#[test]
fn backup_missing_a_root_is_rejected() {
    let (_home, paths) = populated_home();
    let before = tree(&paths);

    let out = tempdir().unwrap();
    let archive = out.path().join("partial.zip");
    let mut zip = ZipWriter::new(File::create(&archive).unwrap());
    zip.add_directory("addons/", SimpleFileOptions::default()).unwrap();
    zip.start_file("userdata/sources.xml", SimpleFileOptions::default()).unwrap();
    zip.write_all(b"Z").unwrap();
    zip.finish().unwrap();

    let err = restore_backup(&paths, &archive, &mut NoProgress).unwrap_err();
    assert!(matches!(err, MaintenanceError::InvalidBackup(ref msg) if msg.contains("media/")));
    assert_eq!(tree(&paths), before);
    assert_eq!(fs::read_to_string(paths.userdata.join("sources.xml")).unwrap(), "A");
}

#[test]
fn damaged_entry_fails_the_integrity_check_without_touching_anything() {
    let (_home, paths) = populated_home();
    let before = tree(&paths);

    let out = tempdir().unwrap();
    let archive = out.path().join("damaged.zip");
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let mut zip = ZipWriter::new(File::create(&archive).unwrap());
    for root in ["addons/", "userdata/", "media/"] {
        zip.add_directory(root, stored.clone()).unwrap();
    }
    zip.start_file("userdata/sources.xml", stored.clone()).unwrap();
    zip.write_all(b"<sources>restored</sources>").unwrap();
    zip.finish().unwrap();

    // Flip one byte of the stored file data so only its CRC gives it away.
    let offset = {
        let mut reader = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let entry = reader.by_name("userdata/sources.xml").unwrap();
        entry.data_start() as usize
    };
    let mut bytes = fs::read(&archive).unwrap();
    bytes[offset] ^= 0xff;
    fs::write(&archive, bytes).unwrap();

    let err = restore_backup(&paths, &archive, &mut NoProgress).unwrap_err();
    assert!(matches!(err, MaintenanceError::CorruptArchive(_)), "{}", err);
    assert_eq!(tree(&paths), before);
    assert_eq!(fs::read_to_string(paths.userdata.join("sources.xml")).unwrap(), "A");
    assert!(!staging_dir(&paths).exists());
}

#[cfg(unix)]
#[test]
fn symlinked_settings_come_back_as_files() {
    let (_home, paths) = populated_home();
    let outside = tempdir().unwrap();
    let target = outside.path().join("advancedsettings.xml");
    fs::write(&target, "<advancedsettings/>").unwrap();
    let link = paths.userdata.join("advancedsettings.xml");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let out = tempdir().unwrap();
    let archive = backup_to(&paths, out.path());
    restore_backup(&paths, &archive, &mut NoProgress).unwrap();

    assert!(!fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_to_string(&link).unwrap(), "<advancedsettings/>");
    assert_eq!(fs::read_to_string(&target).unwrap(), "<advancedsettings/>");
}

#[cfg(target_os = "linux")]
#[test]
fn non_utf8_name_is_reported_instead_of_renamed() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let (_home, paths) = populated_home();
    let odd = paths.media.join(OsStr::from_bytes(b"caf\xe9.nfo"));
    fs::write(&odd, "nfo").unwrap();

    let out = tempdir().unwrap();
    let options = BackupOptions {
        dest_dir: out.path().to_path_buf(),
        name: Some("odd".into()),
        overwrite: false,
    };
    let report = create_backup(&paths, &options, &mut NoProgress).unwrap();
    assert_eq!(report.skipped_files.len(), 1);
    assert_eq!(report.skipped_files[0].0, odd);

    restore_backup(&paths, &report.archive, &mut NoProgress).unwrap();
    let media: Vec<String> = fs::read_dir(&paths.media)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(media, ["splash.png"]);
}
