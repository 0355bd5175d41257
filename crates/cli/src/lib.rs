pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "remedy",
    about = "Remedy operator CLI",
    long_about = "Operate the Remedy pharmacy assistant: fixture seeding, config inspection, and smoke validation.",
    after_help = "Examples:\n  remedy seed\n  remedy config\n  remedy smoke"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Load the deterministic demo pharmacy and verify it answers queries")]
    Seed,
    #[command(about = "Run an end-to-end scripted order conversation with per-check timing")]
    Smoke,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Seed => commands::seed::run(),
        Command::Smoke => commands::smoke::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
