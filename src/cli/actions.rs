//! One function per user-facing action.
//!
//! Each action asks for confirmation before anything destructive, calls into
//! [`crate::core`], and reports the outcome. Errors are returned to the caller,
//! which prints them and moves on.

use crate::cli::commands::{Cli, Commands, LogAction, RefreshTarget};
use crate::core::backup::{create_backup, BackupOptions};
use crate::core::cleaner_orchestrator::{self, print_summary};
use crate::core::error::{MaintenanceError, Result};
use crate::core::fresh_start::fresh_start as wipe_for_fresh_start;
use crate::core::host::{Host, KodiSendHost};
use crate::core::logs;
use crate::core::paths::KodiPaths;
use crate::core::restore::restore_backup;
use crate::core::settings::Settings;
use crate::logger;
use crate::utils::filesystem::bytes_to_human;
use crate::utils::prompt::{Prompter, TerminalProgress};
use crate::{log_info, log_warn};
use chrono::Local;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tabled::{settings::Style, Table, Tabled};

/// How many skipped or failed paths are listed before the rest are summarised.
const MAX_LISTED_PROBLEMS: usize = 8;

/// Everything an action needs: where Kodi lives, how it is configured, and how
/// to talk to the user and to Kodi.
pub struct Context {
    pub paths: KodiPaths,
    pub settings: Settings,
    pub settings_path: PathBuf,
    pub prompter: Prompter,
    pub host: Box<dyn Host>,
    pub dry_run: bool,
    /// Force close Kodi after destructive actions.
    pub restart: bool,
}

impl Context {
    /// Resolves paths and settings from the command line, environment and settings file.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let paths = KodiPaths::detect(cli.home.as_deref(), cli.log_dir.as_deref());
        let settings_path = Settings::resolve_path(cli.config.as_deref(), &paths);
        let settings = Settings::load(&settings_path)?;
        Ok(Context {
            host: Box::new(KodiSendHost::new(settings.kodi_send.clone())),
            restart: settings.force_close && !cli.no_restart,
            prompter: Prompter::new(cli.yes),
            dry_run: cli.dry_run,
            paths,
            settings,
            settings_path,
        })
    }

    fn confirm(&self, title: &str, message: &str) -> Result<bool> {
        self.prompter
            .confirm(title, message)
            .map_err(|e| MaintenanceError::io("<stdin>", e))
    }

    /// Force closes Kodi after a destructive action, unless disabled or a dry run.
    fn force_close(&self) {
        if self.dry_run {
            return;
        }
        if !self.restart {
            log_info!("{}", "Restart Kodi for the changes to take effect.".bright_yellow());
            return;
        }
        if let Err(e) = self.host.force_close() {
            log_warn!("⚠️ {} Close Kodi manually before using it again.", e);
        }
    }
}

/// Runs one subcommand.
pub fn run(ctx: &Context, command: &Commands) -> Result<()> {
    match command {
        Commands::AutoClean { silent, delay_secs, ignore } => auto_clean(ctx, *silent, *delay_secs, ignore),
        Commands::HardClean { ignore } => hard_clean(ctx, ignore),
        Commands::Backup { name, dest, overwrite } => backup(ctx, name.clone(), dest, *overwrite),
        Commands::Restore { archive } => restore(ctx, archive),
        Commands::FreshStart => fresh_start(ctx),
        Commands::Log { action } => match action {
            LogAction::Read => read_log(ctx),
            LogAction::Export { dest } => export_log(ctx, dest),
            LogAction::Upload => upload_log(ctx),
            LogAction::Clear => clear_log(ctx),
        },
        Commands::Refresh { target } => match target {
            RefreshTarget::Repos => refresh_repos(ctx),
            RefreshTarget::Ui => refresh_ui(ctx, false),
        },
        Commands::Settings => show_settings(ctx),
    }
}

pub fn auto_clean(ctx: &Context, silent: bool, delay_secs: u64, ignore: &[String]) -> Result<()> {
    logger::set_quiet(silent);
    if delay_secs > 0 {
        log_info!("Waiting {}s for Kodi to start...", delay_secs);
        thread::sleep(Duration::from_secs(delay_secs));
    }

    log_info!("🧹 Auto cleaning {}...", ctx.paths.home.display().to_string().bright_white());
    let summary = cleaner_orchestrator::auto_clean(&ctx.paths, &ctx.settings, ctx.dry_run, ignore);
    if silent {
        if !summary.failures.is_empty() {
            log_warn!("{} item(s) could not be removed", summary.failures.len());
        }
    } else {
        print_summary(&summary);
    }
    log_info!("Cleaning completed.");
    logger::set_quiet(false);
    Ok(())
}

pub fn hard_clean(ctx: &Context, ignore: &[String]) -> Result<()> {
    let message = format!(
        "{}\n\nIt will completely clear Temp, Thumbnails, Packages\nand delete {}.\nKodi will be force closed afterwards.",
        "This is a destructive action!".bright_red().bold(),
        ctx.settings.texture_db
    );
    if !ctx.dry_run && !ctx.confirm("Hard Clean", &message)? {
        log_info!("Hard clean cancelled.");
        return Ok(());
    }

    let summary = cleaner_orchestrator::hard_clean(&ctx.paths, &ctx.settings, ctx.dry_run, ignore);
    print_summary(&summary);
    log_info!("{}", "Hard Clean completed.".bright_white());
    ctx.force_close();
    Ok(())
}

pub fn backup(ctx: &Context, name: Option<String>, dest: &Path, overwrite: bool) -> Result<()> {
    let mut options = BackupOptions {
        dest_dir: dest.to_path_buf(),
        name,
        overwrite,
    };

    // The prompt, the dry-run message and the backup all use this one path.
    let archive = options.pin_name(Local::now());
    if archive.exists() && !overwrite {
        let message = format!("{} already exists.\n\nDo you want to overwrite it?", archive.display());
        if !ctx.confirm("File Exists", &message)? {
            log_info!("Backup cancelled.");
            return Ok(());
        }
        options.overwrite = true;
    }

    if ctx.dry_run {
        log_info!("🧠 Would write backup to {}", archive.display().to_string().bright_green());
        return Ok(());
    }

    let mut progress = TerminalProgress::new("Backup");
    let report = create_backup(&ctx.paths, &options, &mut progress)?;

    log_info!(
        "✔ Backup created: {} ({} files, {} read, {} written)",
        report.archive.display().to_string().bright_green(),
        report.files,
        bytes_to_human(report.source_bytes),
        bytes_to_human(report.archive_bytes).bright_white().bold()
    );
    for root in &report.skipped_roots {
        log_warn!("⚠️ Not found, saved as empty: {}", root.display());
    }
    if !report.skipped_files.is_empty() {
        log_warn!("⚠️ {} file(s) were left out of the backup:", report.skipped_files.len());
        for (path, reason) in report.skipped_files.iter().take(MAX_LISTED_PROBLEMS) {
            log_warn!("  {}: {}", path.display(), reason);
        }
        if report.skipped_files.len() > MAX_LISTED_PROBLEMS {
            log_warn!("  ...and {} more", report.skipped_files.len() - MAX_LISTED_PROBLEMS);
        }
    }
    Ok(())
}

pub fn restore(ctx: &Context, archive: &Path) -> Result<()> {
    let message = format!(
        "{}\n\nYour current addons, settings and data will be deleted\nand replaced with the contents of {}.",
        "DANGER: This will overwrite everything!".bright_red().bold(),
        archive.display()
    );
    if ctx.dry_run {
        // Validation only: nothing is extracted.
        crate::core::restore::open_backup(archive)?;
        log_info!("🧠 {} is a valid backup; restore would replace add-ons, userdata and media.", archive.display());
        return Ok(());
    }
    if !ctx.confirm("Confirm Restore", &message)? {
        log_info!("Restore cancelled.");
        return Ok(());
    }

    let mut progress = TerminalProgress::new("Restore");
    let report = restore_backup(&ctx.paths, archive, &mut progress)?;

    if report.problems.is_empty() {
        log_info!(
            "✔ Restore completed: {} entries, {}",
            report.entries,
            bytes_to_human(report.bytes).bright_white().bold()
        );
    } else {
        log_warn!("{}", "Restore partially failed. Some files could not be moved:".bright_yellow());
        for problem in report.problems.iter().take(MAX_LISTED_PROBLEMS) {
            log_warn!("  {}", problem);
        }
        if report.problems.len() > MAX_LISTED_PROBLEMS {
            log_warn!("  ...and {} more", report.problems.len() - MAX_LISTED_PROBLEMS);
        }
    }
    ctx.force_close();
    Ok(())
}

pub fn fresh_start(ctx: &Context) -> Result<()> {
    let message = format!(
        "{}\n\nThis will delete all userdata and remove all addons\n(except {}).\nKodi will be reset to a fresh state.",
        "Are you absolutely sure?".bright_red().bold(),
        ctx.settings.keep_addons.join(", ")
    );
    if !ctx.dry_run && !ctx.confirm("Confirm Fresh Start", &message)? {
        log_info!("Fresh start cancelled.");
        return Ok(());
    }

    let report = wipe_for_fresh_start(&ctx.paths, &ctx.settings, ctx.dry_run);
    let verb = if ctx.dry_run { "Would free" } else { "Freed" };
    log_info!("{} {}", verb, bytes_to_human(report.freed()).bright_green().bold());
    for (path, err) in report.failures() {
        log_warn!("⚠️ Could not remove {}: {}", path.display(), err);
    }
    if !ctx.dry_run {
        log_info!("Fresh Start done – everything has been deleted.");
    }
    ctx.force_close();
    Ok(())
}

pub fn read_log(ctx: &Context) -> Result<()> {
    let contents = logs::read_log(&ctx.paths)?;
    print!("{}", contents);
    Ok(())
}

pub fn export_log(ctx: &Context, dest: &Path) -> Result<()> {
    let written = logs::export_log(&ctx.paths, dest)?;
    log_info!("✔ Log exported to {}", written.display().to_string().bright_green());
    Ok(())
}

pub fn upload_log(ctx: &Context) -> Result<()> {
    // Checked up front so the user isn't asked about a log that isn't there.
    let log_file = ctx.paths.log_file();
    if !log_file.is_file() {
        return Err(MaintenanceError::LogNotFound(log_file));
    }
    let message = format!("Upload kodi.log to public paste service {}?", ctx.settings.paste_url);
    if !ctx.confirm("Upload Log", &message)? {
        return Ok(());
    }

    let url = logs::upload_log(&ctx.paths, &ctx.settings)?;
    log_info!("✔ Log uploaded");
    println!("URL: {}", url.bright_green().bold());
    Ok(())
}

pub fn clear_log(ctx: &Context) -> Result<()> {
    if logs::clear_log(&ctx.paths)? {
        log_info!("✔ Log cleared.");
        refresh_ui(ctx, true)?;
    }
    Ok(())
}

/// Reloads the skin. In `silent` mode a failure is only a warning.
pub fn refresh_ui(ctx: &Context, silent: bool) -> Result<()> {
    match ctx.host.reload_skin() {
        Ok(()) => {
            if !silent {
                log_info!("UI Refreshed");
            }
            Ok(())
        }
        Err(e) if silent => {
            log_warn!("⚠️ {}", e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

pub fn refresh_repos(ctx: &Context) -> Result<()> {
    log_info!("Scanning repositories...");
    ctx.host.update_addon_repos()?;
    // Give Kodi time to fetch the repository indexes before the skin reload.
    thread::sleep(Duration::from_secs(3));
    refresh_ui(ctx, true)?;
    log_info!("Repository scan complete.");
    Ok(())
}

#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Setting")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

pub fn show_settings(ctx: &Context) -> Result<()> {
    let p = &ctx.paths;
    let s = &ctx.settings;
    let rows = vec![
        SettingRow { name: "Kodi home", value: p.home.display().to_string() },
        SettingRow { name: "Add-ons", value: p.addons.display().to_string() },
        SettingRow { name: "Userdata", value: p.userdata.display().to_string() },
        SettingRow { name: "Media", value: p.media.display().to_string() },
        SettingRow { name: "Temp", value: p.temp.display().to_string() },
        SettingRow { name: "Log file", value: p.log_file().display().to_string() },
        SettingRow { name: "Settings file", value: ctx.settings_path.display().to_string() },
        SettingRow { name: "Auto clean size", value: format!("{} MB", s.auto_clean_size_mb) },
        SettingRow { name: "Texture database", value: s.texture_db.clone() },
        SettingRow { name: "Paste service", value: s.paste_url.clone() },
        SettingRow { name: "Kept on fresh start", value: s.keep_addons.join(", ") },
        SettingRow { name: "Force close", value: ctx.restart.to_string() },
        SettingRow { name: "kodi-send", value: s.kodi_send.clone() },
    ];
    println!("{}", Table::new(rows).with(Style::modern()));
    Ok(())
}
