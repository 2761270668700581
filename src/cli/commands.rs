use clap::{Parser, Subcommand}; // `Parser` and `Subcommand` derive macros from the `clap` crate.
use std::path::PathBuf;

/// Command-line interface for the `lazymaint` utility.
///
/// Running without a subcommand opens the interactive menu.
#[derive(Parser, Debug)]
#[command(
    name = "lazymaint", // Sets the name of the executable shown in help messages.
    about = "🧹 Kodi maintenance: clean caches, back up and restore, manage logs",
    version, // Version string taken from Cargo.toml.
    disable_help_subcommand = true // `--help` is enough.
)]
pub struct Cli {
    /// Show what would be deleted without deleting
    #[arg(long = "dry-run", global = true)]
    pub dry_run: bool,

    /// Print debug-level log lines
    #[arg(long, global = true)]
    pub debug: bool,

    /// Answer "yes" to every confirmation
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Do not force close Kodi after hard clean, restore or fresh start
    #[arg(long = "no-restart", global = true)]
    pub no_restart: bool,

    /// Kodi home directory (default: platform location, or $LAZYMAINT_KODI_HOME)
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Directory containing kodi.log
    #[arg(long = "log-dir", global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Settings file (default: <userdata>/addon_data/plugin.program.lazymaintenance/lazymaint.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// The action to run; omit for the interactive menu.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Maintenance actions.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clear temp and packages, trim thumbnails to the configured size
    AutoClean {
        /// Only print warnings and errors (for running at startup)
        #[arg(long)]
        silent: bool,

        /// Wait this many seconds before cleaning, to let Kodi finish starting
        #[arg(long, value_name = "SECS", default_value_t = 0)]
        delay_secs: u64,

        /// Paths containing any of these substrings are left alone
        #[arg(long, short, value_delimiter = ',')]
        ignore: Vec<String>,
    },

    /// Wipe temp, packages, thumbnails and the texture database, then force close Kodi
    HardClean {
        /// Paths containing any of these substrings are left alone
        #[arg(long, short, value_delimiter = ',')]
        ignore: Vec<String>,
    },

    /// Back up add-ons, userdata and media into a zip archive
    Backup {
        /// Archive name; `.zip` is appended if missing (default: kodi_backup_<timestamp>.zip)
        #[arg(long, short)]
        name: Option<String>,

        /// Directory the archive is written to
        #[arg(long, short = 'o', value_name = "DIR", default_value = ".")]
        dest: PathBuf,

        /// Replace an existing archive without asking
        #[arg(long)]
        overwrite: bool,
    },

    /// Replace add-ons, userdata and media with the contents of a backup archive
    Restore {
        /// The backup zip to restore
        archive: PathBuf,
    },

    /// Delete all userdata and add-ons (except this tool), then force close Kodi
    FreshStart,

    /// Read, export, upload or clear kodi.log
    Log {
        #[command(subcommand)]
        action: LogAction,
    },

    /// Refresh add-on repositories or reload the skin
    Refresh {
        #[command(subcommand)]
        target: RefreshTarget,
    },

    /// Show resolved paths and settings
    Settings,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum LogAction {
    /// Print the current log
    Read,
    /// Copy the log to a directory or file
    Export {
        /// Destination directory (writes kodi.log into it) or file
        dest: PathBuf,
    },
    /// Upload the log to the paste service and print its URL
    Upload,
    /// Empty the log
    Clear,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTarget {
    /// Check all repositories for add-on updates
    Repos,
    /// Reload the skin
    Ui,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_menu() {
        let cli = Cli::try_parse_from(["lazymaint"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["lazymaint", "hard-clean", "--dry-run", "-i", "a,b"]).unwrap();
        assert!(cli.dry_run);
        match cli.command {
            Some(Commands::HardClean { ignore }) => assert_eq!(ignore, ["a", "b"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn backup_defaults() {
        let cli = Cli::try_parse_from(["lazymaint", "backup"]).unwrap();
        match cli.command {
            Some(Commands::Backup { name, dest, overwrite }) => {
                assert!(name.is_none());
                assert_eq!(dest, PathBuf::from("."));
                assert!(!overwrite);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn nested_log_commands() {
        let cli = Cli::try_parse_from(["lazymaint", "log", "export", "/tmp/out"]).unwrap();
        match cli.command {
            Some(Commands::Log { action }) => {
                assert_eq!(action, LogAction::Export { dest: PathBuf::from("/tmp/out") })
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
