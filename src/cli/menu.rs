//! Interactive numbered menu, shown when no subcommand is given.

use crate::cli::actions::{self, Context};
use crate::core::error::{MaintenanceError, Result};
use crate::{log_error, log_info};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    AutoClean,
    HardClean,
    BackupMenu,
    LogMenu,
    RefreshMenu,
    FreshStart,
    Settings,
    Backup,
    Restore,
    ReadLog,
    ExportLog,
    UploadLog,
    ClearLog,
    RefreshRepos,
    RefreshUi,
}

const MAIN_MENU: &[(&str, Entry)] = &[
    ("Auto Clean", Entry::AutoClean),
    ("Hard Clean", Entry::HardClean),
    ("Backup / Restore", Entry::BackupMenu),
    ("Log Options", Entry::LogMenu),
    ("Refresh Options", Entry::RefreshMenu),
    ("Fresh Start", Entry::FreshStart),
    ("Settings", Entry::Settings),
];

const BACKUP_MENU: &[(&str, Entry)] = &[("Backup", Entry::Backup), ("Restore", Entry::Restore)];

const LOG_MENU: &[(&str, Entry)] = &[
    ("Read Log", Entry::ReadLog),
    ("Export Log", Entry::ExportLog),
    ("Upload Log", Entry::UploadLog),
    ("Clear Log", Entry::ClearLog),
];

const REFRESH_MENU: &[(&str, Entry)] = &[("Refresh Repos", Entry::RefreshRepos), ("Refresh UI", Entry::RefreshUi)];

/// Turns the user's answer into an index into a menu of `len` items.
///
/// `None` means "go back": an empty answer, `0`, `q` or `b`. Out-of-range and
/// unparsable answers are `Err` so the menu can be shown again.
fn parse_choice(answer: Option<&str>, len: usize) -> std::result::Result<Option<usize>, ()> {
    let answer = match answer.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(a) => a.to_ascii_lowercase(),
    };
    if matches!(answer.as_str(), "0" | "q" | "b") {
        return Ok(None);
    }
    match answer.parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Ok(Some(n - 1)),
        _ => Err(()),
    }
}

fn show(title: &str, items: &[(&str, Entry)], back_label: &str) {
    println!("\n{}", title.bright_white().bold().underline());
    for (i, (label, _)) in items.iter().enumerate() {
        println!("  {}) {}", (i + 1).to_string().bright_cyan(), label);
    }
    println!("  {}) {}", "0".bright_cyan(), back_label);
}

/// Shows `items` until the user goes back, running whatever they pick.
fn run_menu(ctx: &Context, title: &str, items: &[(&str, Entry)], back_label: &str) -> Result<()> {
    loop {
        show(title, items, back_label);
        let answer = ask(ctx, "Choice:")?;
        match parse_choice(answer.as_deref(), items.len()) {
            Ok(None) => return Ok(()),
            Ok(Some(index)) => {
                // Failed actions return to the menu, like a cancelled dialog.
                if let Err(e) = select(ctx, items[index].1) {
                    log_error!("{}", e.to_string().bright_red());
                }
            }
            Err(()) => log_info!("Pick a number between 0 and {}.", items.len()),
        }
    }
}

fn ask(ctx: &Context, question: &str) -> Result<Option<String>> {
    ctx.prompter
        .ask(question)
        .map_err(|e| MaintenanceError::io("<stdin>", e))
}

fn select(ctx: &Context, entry: Entry) -> Result<()> {
    match entry {
        Entry::AutoClean => actions::auto_clean(ctx, false, 0, &[]),
        Entry::HardClean => actions::hard_clean(ctx, &[]),
        Entry::BackupMenu => run_menu(ctx, "Backup / Restore", BACKUP_MENU, "Back"),
        Entry::LogMenu => run_menu(ctx, "Log Options", LOG_MENU, "Back"),
        Entry::RefreshMenu => run_menu(ctx, "Refresh Options", REFRESH_MENU, "Back"),
        Entry::FreshStart => actions::fresh_start(ctx),
        Entry::Settings => actions::show_settings(ctx),
        Entry::Backup => {
            let Some(dest) = ask(ctx, "Backup destination folder:")? else {
                return Ok(());
            };
            let name = ask(ctx, "Backup name (blank for a timestamped name):")?;
            actions::backup(ctx, name, &PathBuf::from(dest), false)
        }
        Entry::Restore => match ask(ctx, "Backup zip to restore:")? {
            Some(archive) => actions::restore(ctx, &PathBuf::from(archive)),
            None => Ok(()),
        },
        Entry::ReadLog => actions::read_log(ctx),
        Entry::ExportLog => match ask(ctx, "Export to folder:")? {
            Some(dest) => actions::export_log(ctx, &PathBuf::from(dest)),
            None => Ok(()),
        },
        Entry::UploadLog => actions::upload_log(ctx),
        Entry::ClearLog => actions::clear_log(ctx),
        Entry::RefreshRepos => actions::refresh_repos(ctx),
        Entry::RefreshUi => actions::refresh_ui(ctx, false),
    }
}

/// Runs the top-level menu until the user exits.
pub fn run(ctx: &Context) -> Result<()> {
    run_menu(ctx, "Lazy Maintenance", MAIN_MENU, "Exit")
}
