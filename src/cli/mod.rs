pub mod actions;
pub mod commands;
pub mod menu;

use clap::Parser;

pub fn parse() -> commands::Cli {
    commands::Cli::parse()
}
