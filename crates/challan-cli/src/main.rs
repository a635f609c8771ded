//! Challan - traffic violation detection from roadside photographs
//!
//! A CLI tool that reads plates and flags rule violations in traffic images.

mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::Cli;
use env_logger::{Builder, Env};

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    Builder::from_env(Env::default().default_filter_or(default_level)).init();

    if let Err(e) = commands::execute(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
