//! Managing `kodi.log`: read, export, upload to a paste service, clear.

use crate::core::error::{MaintenanceError, Result};
use crate::core::paths::{KodiPaths, LOG_FILE_NAME};
use crate::core::settings::Settings;
use crate::log_debug;
use serde::Deserialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Response of a hastebin-style paste service (`POST /documents`).
#[derive(Debug, Deserialize)]
pub struct PasteResponse {
    pub key: Option<String>,
}

/// `User-Agent` sent with log uploads.
pub fn user_agent() -> String {
    format!("Kodi-LazyMaintenance/{}", env!("CARGO_PKG_VERSION"))
}

fn existing_log(paths: &KodiPaths) -> Result<PathBuf> {
    let log_file = paths.log_file();
    if log_file.is_file() {
        Ok(log_file)
    } else {
        Err(MaintenanceError::LogNotFound(log_file))
    }
}

/// Returns the whole log. Invalid UTF-8 is replaced rather than rejected.
pub fn read_log(paths: &KodiPaths) -> Result<String> {
    let log_file = existing_log(paths)?;
    let bytes = fs::read(&log_file).map_err(|e| MaintenanceError::io(&log_file, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Copies the log to `dest`: into it as `kodi.log` when `dest` is a directory,
/// otherwise to `dest` itself. Returns the written path.
pub fn export_log(paths: &KodiPaths, dest: &Path) -> Result<PathBuf> {
    let log_file = existing_log(paths)?;
    let target = if dest.is_dir() {
        dest.join(LOG_FILE_NAME)
    } else {
        dest.to_path_buf()
    };
    fs::copy(&log_file, &target).map_err(|e| MaintenanceError::write_failed(&target, e))?;
    Ok(target)
}

/// Turns a paste-service response into the public URL of the paste.
pub fn paste_url(base: &str, response: &PasteResponse) -> Result<String> {
    match &response.key {
        Some(key) if !key.is_empty() => Ok(format!("{}/{}", base.trim_end_matches('/'), key)),
        _ => Err(MaintenanceError::Upload("could not parse response".to_string())),
    }
}

/// Uploads the log to `settings.paste_url` and returns the paste's URL.
pub fn upload_log(paths: &KodiPaths, settings: &Settings) -> Result<String> {
    let log_file = existing_log(paths)?;
    let data = fs::read(&log_file).map_err(|e| MaintenanceError::io(&log_file, e))?;

    let endpoint = format!("{}/documents", settings.paste_url.trim_end_matches('/'));
    log_debug!("Uploading {} bytes to {}", data.len(), endpoint);

    let response: PasteResponse = ureq::post(&endpoint)
        .set("User-Agent", &user_agent())
        .send_bytes(&data)
        .map_err(|e| MaintenanceError::Upload(e.to_string()))?
        .into_json()
        .map_err(|e| MaintenanceError::Upload(e.to_string()))?;

    paste_url(&settings.paste_url, &response)
}

/// Truncates the log to zero bytes. Returns `false` if there was no log.
pub fn clear_log(paths: &KodiPaths) -> Result<bool> {
    let log_file = paths.log_file();
    if !log_file.is_file() {
        return Ok(false);
    }
    File::create(&log_file).map_err(|e| MaintenanceError::write_failed(&log_file, e))?;
    Ok(true)
}
