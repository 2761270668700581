//! The running Kodi instance, as far as maintenance needs it.

use crate::core::error::{MaintenanceError, Result};
use crate::{log_debug, log_info};
use std::process::Command;

/// Actions delegated to the media center itself.
pub trait Host {
    /// Asks Kodi to check all add-on repositories for updates.
    fn update_addon_repos(&self) -> Result<()>;

    /// Reloads the active skin.
    fn reload_skin(&self) -> Result<()>;

    /// Kills Kodi without letting it save its in-memory settings.
    ///
    /// A clean shutdown would write `guisettings.xml` and the texture database
    /// back over the files just restored or deleted.
    fn force_close(&self) -> Result<()>;
}

/// Talks to Kodi through the `kodi-send` EventServer client and kills it with
/// the platform's process tools.
pub struct KodiSendHost {
    program: String,
}

impl KodiSendHost {
    /// `program` is the `kodi-send` executable (name or path).
    pub fn new(program: impl Into<String>) -> Self {
        KodiSendHost { program: program.into() }
    }

    fn builtin(&self, action: &str) -> Result<()> {
        log_debug!("{} --action={}", self.program, action);
        let status = Command::new(&self.program)
            .arg(format!("--action={}", action))
            .status()
            .map_err(|e| MaintenanceError::Host(format!("{}: {}", self.program, e)))?;
        if status.success() {
            Ok(())
        } else {
            Err(MaintenanceError::Host(format!("{} --action={} exited with {}", self.program, action, status)))
        }
    }
}

type KillCommand = (&'static str, &'static [&'static str]);

const WINDOWS_KILL: &[KillCommand] = &[("taskkill", &["/F", "/IM", "kodi.exe", "/T"])];

// `kodi.bin` is the real process on Linux; `kodi` is the wrapper or the macOS binary.
const UNIX_KILL: &[KillCommand] = &[
    ("pkill", &["-KILL", "-x", "kodi.bin"]),
    ("pkill", &["-KILL", "-x", "kodi"]),
];

/// Kill commands tried in order until one succeeds.
fn kill_commands() -> &'static [KillCommand] {
    if cfg!(target_os = "windows") {
        WINDOWS_KILL
    } else {
        UNIX_KILL
    }
}

impl Host for KodiSendHost {
    fn update_addon_repos(&self) -> Result<()> {
        self.builtin("UpdateAddonRepos")
    }

    fn reload_skin(&self) -> Result<()> {
        self.builtin("ReloadSkin()")
    }

    fn force_close(&self) -> Result<()> {
        log_info!("Initiating force close of Kodi...");
        let mut last_error = String::from("no kill command available");
        for (program, args) in kill_commands() {
            match Command::new(program).args(*args).status() {
                Ok(status) if status.success() => return Ok(()),
                Ok(status) => last_error = format!("{} exited with {}", program, status),
                Err(e) => last_error = format!("{}: {}", program, e),
            }
            log_debug!("Force close attempt failed: {}", last_error);
        }
        Err(MaintenanceError::Host(last_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_kodi_send_is_a_host_error() {
        let host = KodiSendHost::new("definitely-not-kodi-send-on-this-machine");
        let err = host.reload_skin().unwrap_err();
        assert!(matches!(err, MaintenanceError::Host(_)));
        assert!(err.to_string().contains("definitely-not-kodi-send"));
    }

    #[test]
    fn there_is_always_a_kill_command() {
        assert!(!kill_commands().is_empty());
    }
}
