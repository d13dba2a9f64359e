//! postbook: mirror a subreddit's newest posts into an `.xlsx` ledger.
//!
//! # Usage
//!
//! ```text
//! postbook run  [--data-dir DIR] [--interval-secs N] [--limit N]
//! postbook once [--dry-run] [--data-dir DIR] [--limit N]
//! postbook status [--source NAME] [--data-dir DIR] [--json]
//! postbook tail [--lines N] [--source NAME] [--data-dir DIR]
//! ```
//!
//! Credentials come from the environment (or a `.env` file): `SUBREDDIT`,
//! `RCLIENTID`, `RSECRET`, `RUSER`, `RPASS`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{once::OnceArgs, run::RunArgs, status::StatusArgs, tail::TailArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "postbook",
    version,
    about = "Mirror a subreddit's new posts into an .xlsx ledger",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync now, then keep syncing on a fixed interval until ctrl-c.
    Run(RunArgs),

    /// Run a single sync tick and print what happened.
    Once(OnceArgs),

    /// Show what the ledger file currently holds.
    Status(StatusArgs),

    /// Print the most recent ledger rows.
    Tail(TailArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Once(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Tail(args) => args.run(),
    }
}
