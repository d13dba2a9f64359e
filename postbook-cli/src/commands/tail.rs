//! `postbook tail`: the most recent ledger rows.

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use postbook_core::Record;
use postbook_store::{LedgerStore, XlsxStore};

use super::{ellipsize, LocationArgs};

const TITLE_WIDTH: usize = 60;

/// Arguments for `postbook tail`.
#[derive(Args, Debug)]
pub struct TailArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// Number of trailing rows to show.
    #[arg(long, short = 'n', default_value_t = 10)]
    pub lines: usize,
}

#[derive(Tabled)]
struct TailRow {
    #[tabled(rename = "created (UTC)")]
    created: String,
    #[tabled(rename = "fullname")]
    fullname: String,
    #[tabled(rename = "author")]
    author: String,
    #[tabled(rename = "title")]
    title: String,
}

impl From<&Record> for TailRow {
    fn from(record: &Record) -> Self {
        Self {
            created: record.created_at.format("%Y-%m-%d %H:%M").to_string(),
            fullname: record
                .fullname
                .as_ref()
                .map(|f| f.0.clone())
                .unwrap_or_else(|| format!("({})", record.id)),
            author: record.author.clone(),
            title: ellipsize(&record.title, TITLE_WIDTH),
        }
    }
}

impl TailArgs {
    pub fn run(self) -> Result<()> {
        let location = self.location.load()?;
        let path = location.ledger_path();
        let store = XlsxStore::new(&path, &location.source);
        let Some(loaded) = store
            .load()
            .with_context(|| format!("failed to read ledger at {}", path.display()))?
        else {
            println!("No ledger at {} yet.", path.display());
            return Ok(());
        };

        let skip = loaded.records.len().saturating_sub(self.lines);
        let rows: Vec<TailRow> = loaded.records[skip..].iter().map(TailRow::from).collect();
        if rows.is_empty() {
            println!("Ledger at {} is empty.", path.display());
            return Ok(());
        }

        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
