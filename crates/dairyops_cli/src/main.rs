//! `dairyops` command-line front end.
//!
//! # Responsibility
//! - Parse arguments and run one command against the local plan database.
//! - Map any failure to a single stderr line and exit code 1.

mod cli;
mod commands;
mod render;

use clap::Parser;

fn main() {
    let cli = cli::Cli::parse();
    let stdout = std::io::stdout();
    let stdin = std::io::stdin();
    if let Err(error) = commands::run(cli, &mut stdout.lock(), &mut stdin.lock()) {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}
