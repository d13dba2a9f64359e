//! Subcommands and the flags they share.

pub mod once;
pub mod run;
pub mod status;
pub mod tail;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::Args;

use postbook_core::config::{
    ENV_DATA_DIR, ENV_FETCH_LIMIT, ENV_INTERVAL_SECS, ENV_SOURCE, MAX_FETCH_LIMIT,
};
use postbook_core::{Config, EnvOverrides, LedgerLocation};

/// Flags that override the environment for commands that sync.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Directory holding the ledger workbook [env: POSTBOOK_DATA_DIR] [default: data]
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Seconds between sync ticks [env: POSTBOOK_INTERVAL_SECS] [default: 300]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: Option<u64>,

    /// Posts requested when the ledger has no marker [env: POSTBOOK_FETCH_LIMIT] [default: 100]
    #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_FETCH_LIMIT as u64))]
    pub limit: Option<usize>,
}

impl ConfigArgs {
    pub fn overrides(&self) -> EnvOverrides {
        EnvOverrides::new()
            .set(ENV_DATA_DIR, self.data_dir.as_ref().map(|p| p.display()))
            .set(ENV_INTERVAL_SECS, self.interval_secs)
            .set(ENV_FETCH_LIMIT, self.limit)
    }

    pub fn load(&self) -> Result<Config> {
        Config::from_env(&self.overrides()).context("invalid configuration")
    }
}

/// Flags locating an existing ledger for read-only commands.
#[derive(Args, Debug, Default)]
pub struct LocationArgs {
    /// Subreddit whose ledger to read [env: SUBREDDIT]
    #[arg(long)]
    pub source: Option<String>,

    /// Directory holding the ledger workbook [env: POSTBOOK_DATA_DIR] [default: data]
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

impl LocationArgs {
    pub fn overrides(&self) -> EnvOverrides {
        EnvOverrides::new()
            .set(ENV_SOURCE, self.source.as_deref())
            .set(ENV_DATA_DIR, self.data_dir.as_ref().map(|p| p.display()))
    }

    pub fn load(&self) -> Result<LedgerLocation> {
        LedgerLocation::from_env(&self.overrides()).context("cannot locate the ledger")
    }
}

/// Shorten `text` to at most `max` characters, marking the cut with `…`.
pub(crate) fn ellipsize(text: &str, max: usize) -> String {
    let flat = text.replace(['\n', '\r'], " ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut short: String = flat.chars().take(max.saturating_sub(1)).collect();
    short.push('…');
    short
}
