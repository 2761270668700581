use colored::Colorize; // ANSI colours for the error line.
use lazymaint::cli::{self, actions::Context, commands::Commands, menu};
use lazymaint::{log_debug, log_error, logger};
use std::process;

/// The main entry point of the `lazymaint` application.
///
/// 1. Parses command-line arguments.
/// 2. Initializes the logger (silent auto-clean hides info lines).
/// 3. Resolves Kodi paths and settings.
/// 4. Runs the subcommand, or the interactive menu when there is none.
fn main() {
    let cli = cli::parse();

    logger::init(cli.debug);
    if let Some(Commands::AutoClean { silent: true, .. }) = &cli.command {
        logger::set_quiet(true);
    }
    log_debug!("Starting with dry_run = {}", cli.dry_run.to_string().bright_blue());

    let result = Context::from_cli(&cli).and_then(|ctx| {
        log_debug!("Kodi home: {}", ctx.paths.home.display());
        match &cli.command {
            Some(command) => cli::actions::run(&ctx, command),
            None => menu::run(&ctx),
        }
    });

    if let Err(e) = result {
        log_error!("{}", e.to_string().bright_red());
        process::exit(1);
    }
    log_debug!("Finished execution.");
}
