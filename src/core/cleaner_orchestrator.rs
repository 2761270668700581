use crate::core::paths::KodiPaths;
use crate::core::settings::Settings;
use crate::logger::is_debug_enabled;
use crate::utils::filesystem::{bytes_to_human, remove_path};
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use std::env;
use tabled::{settings::Style, Table};

// Import the Cleaner trait and all specific cleaner implementations
use super::cleaners::{
    Cleaner,
    CleanupEntry,
    FailedEntry,
    PackagesCleaner,
    SkippedEntry,
    TempCleaner,
    TextureDbCleaner,
    ThumbnailTrimmer,
    ThumbnailsCleaner,
};

/// Set this environment variable to list skipped paths even without `--debug`.
pub const SHOW_SKIPPED_ENV: &str = "LAZYMAINT_SHOW_SKIPPED";

/// Everything a cleaning run did (or, in a dry run, would do).
#[derive(Debug, Default)]
pub struct CleanSummary {
    pub dry_run: bool,
    pub entries: Vec<CleanupEntry>,
    pub failures: Vec<FailedEntry>,
    pub skipped: Vec<SkippedEntry>,
    /// Bytes freed (or that would be freed).
    pub freed: u64,
}

/// Runs `cleaners` one after another and collects the results.
///
/// Every cleaner first reports its paths, then each path is removed. A path
/// that cannot be removed (a file Kodi holds open, usually) becomes a
/// [`FailedEntry`] and the run carries on.
///
/// # Arguments
/// * `dry_run` - If `true`, nothing is deleted; the summary shows what would be.
/// * `ignore` - Substrings; any path containing one of them is left alone.
pub fn run_cleaners(cleaners: &[Box<dyn Cleaner>], dry_run: bool, ignore: &[String]) -> CleanSummary {
    let mut summary = CleanSummary {
        dry_run,
        ..CleanSummary::default()
    };

    for cleaner in cleaners {
        let paths = cleaner.clean(&mut summary.skipped, ignore);

        for p in paths {
            let path_display = p.path.display().to_string();
            match remove_path(&p.path, dry_run) {
                Ok(()) => {
                    log_debug!("🧹 {}: {} ({})", cleaner.name(), path_display, p.formatted_size);
                    summary.freed += p.initial_size;
                    summary.entries.push(CleanupEntry {
                        cleaner_name: p.cleaner_name,
                        path: path_display,
                        size: p.formatted_size,
                    });
                }
                Err(e) => {
                    // Likely locked; skip it and keep going.
                    log_debug!("Skipped locked path {}: {}", path_display, e);
                    summary.failures.push(FailedEntry {
                        path: path_display,
                        error: e.to_string(),
                    });
                }
            }
        }

        cleaner.finish(dry_run);
    }
    summary
}

/// The cleaners behind Auto Clean: temp and packages are emptied, thumbnails are
/// trimmed to `settings.auto_clean_size_mb` (skipped when that is `0`).
pub fn auto_clean_cleaners(paths: &KodiPaths, settings: &Settings) -> Vec<Box<dyn Cleaner>> {
    let mut cleaners: Vec<Box<dyn Cleaner>> = vec![
        Box::new(TempCleaner::new(&paths.temp)),
        Box::new(PackagesCleaner::new(&paths.packages)),
    ];
    if settings.auto_clean_size_mb > 0 {
        cleaners.push(Box::new(ThumbnailTrimmer::new(
            &paths.thumbnails,
            settings.auto_clean_size_mb,
        )));
    }
    cleaners
}

/// The cleaners behind Hard Clean: temp, packages and thumbnails are emptied and
/// the texture database is deleted.
pub fn hard_clean_cleaners(paths: &KodiPaths, settings: &Settings) -> Vec<Box<dyn Cleaner>> {
    vec![
        Box::new(TempCleaner::new(&paths.temp)),
        Box::new(PackagesCleaner::new(&paths.packages)),
        Box::new(ThumbnailsCleaner::new(&paths.thumbnails)),
        Box::new(TextureDbCleaner::new(&paths.database, &settings.texture_db)),
    ]
}

/// Auto Clean: the light clean that is safe to run on every Kodi start.
pub fn auto_clean(paths: &KodiPaths, settings: &Settings, dry_run: bool, ignore: &[String]) -> CleanSummary {
    log_debug!("Starting auto clean (dry_run: {})", dry_run);
    run_cleaners(&auto_clean_cleaners(paths, settings), dry_run, ignore)
}

/// Hard Clean: wipes every cache. Kodi should be force closed afterwards so it
/// rebuilds the texture database instead of writing its in-memory copy back.
pub fn hard_clean(paths: &KodiPaths, settings: &Settings, dry_run: bool, ignore: &[String]) -> CleanSummary {
    log_debug!("Starting hard clean (dry_run: {})", dry_run);
    run_cleaners(&hard_clean_cleaners(paths, settings), dry_run, ignore)
}

/// Prints the summary tables and the total.
pub fn print_summary(summary: &CleanSummary) {
    let total_fmt = bytes_to_human(summary.freed);

    let mut rows = summary.entries.clone();
    rows.push(CleanupEntry {
        cleaner_name: "".to_string(),
        path: "Total".to_string(),
        size: total_fmt.clone(),
    });

    let table = Table::new(&rows).with(Style::modern()).to_string();
    if summary.dry_run {
        println!("\n{}", "📊🧠 Estimated Cleanup Summary (Dry Run)".bold().underline().purple());
    } else {
        println!("\n{}", "🧾 Cleanup Summary (Successful)".bold().underline().green());
    }
    println!("{}", table);

    if !summary.failures.is_empty() {
        let table = Table::new(&summary.failures).with(Style::modern()).to_string();
        println!("\n{}", "⚠️ Cleanup Failures (files in use are skipped)".bold().underline().yellow());
        println!("{}", table);
    }

    if (env::var(SHOW_SKIPPED_ENV).is_ok() || is_debug_enabled()) && !summary.skipped.is_empty() {
        let table = Table::new(&summary.skipped).with(Style::modern()).to_string();
        println!("\n{}", "⚪ Skipped Paths (During Size Check)".bold().underline().magenta());
        println!("{}", table);
    }

    if summary.dry_run {
        log_info!("🧠 Estimated space to free: {}", total_fmt.bright_green().bold());
    } else {
        log_info!("✔ Total space freed: {}", total_fmt.bright_green().bold());
    }
    if !summary.failures.is_empty() {
        log_warn!("{} item(s) could not be removed", summary.failures.len());
    }
}
