//! `postbook once`: a single sync tick.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use postbook_sync::{pipeline, FlushStatus, TickOutcome, TickReport};

use super::ConfigArgs;

/// Arguments for `postbook once`.
#[derive(Args, Debug)]
pub struct OnceArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Fetch and append in memory without writing the ledger.
    #[arg(long)]
    pub dry_run: bool,
}

impl OnceArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.load()?;
        postbook_daemon::init_tracing();

        let path = config.ledger_path();
        let mut engine = pipeline::open(&config, pipeline::options(&config, self.dry_run))
            .with_context(|| format!("failed to load ledger at {}", path.display()))?;
        let report = engine.sync_once();

        print_report(&config.source.0, &path, &report, self.dry_run);
        if let TickOutcome::Synced {
            flush: FlushStatus::Failed { reason },
            ..
        } = &report.outcome
        {
            bail!("failed to write ledger at {}: {reason}", path.display());
        }
        Ok(())
    }
}

fn print_report(source: &str, path: &Path, report: &TickReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    match &report.outcome {
        TickOutcome::FetchFailed { reason, retryable } => {
            let hint = if *retryable {
                "will succeed on a later run if the problem is transient"
            } else {
                "check credentials and subreddit name"
            };
            println!(
                "{prefix}{} r/{source}: fetch failed: {reason} ({hint})",
                "✗".red().bold()
            );
        }
        TickOutcome::Synced {
            fetched,
            appended,
            flush,
        } => {
            println!(
                "{prefix}{} r/{source}: {fetched} fetched, {appended} new, {} rows",
                "✓".green().bold(),
                report.ledger_len
            );
            match flush {
                FlushStatus::Written => println!("  ✎  {}", path.display()),
                FlushStatus::WouldWrite => println!("  ~  {}", path.display()),
                FlushStatus::Unchanged => println!("  ·  {}", path.display()),
                FlushStatus::Failed { reason } => {
                    println!("  {}  {}: {reason}", "✗".red(), path.display())
                }
            }
        }
    }
    if let Some(marker) = &report.marker {
        println!("  marker: {marker}");
    }
}
