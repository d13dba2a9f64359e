//! `postbook run`: the long-running sync daemon.

use anyhow::{Context, Result};
use clap::Args;

use super::ConfigArgs;

/// Arguments for `postbook run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.load()?;
        postbook_daemon::start_blocking(config).context("daemon exited with error")
    }
}
