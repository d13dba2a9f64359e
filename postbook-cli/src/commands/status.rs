//! `postbook status`: what the ledger file currently holds.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use postbook_core::{Ledger, SourceId};
use postbook_store::{LedgerStore, XlsxStore};

use super::LocationArgs;

/// Arguments for `postbook status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub location: LocationArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let location = self.location.load()?;
        let report = build_report(&location.source, &location.ledger_path())?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_table(&report);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    source: String,
    path: PathBuf,
    exists: bool,
    schema: Option<String>,
    rows: usize,
    legacy_rows: usize,
    marker: Option<String>,
    newest_at: Option<DateTime<Utc>>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "field")]
    field: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

fn build_report(source: &SourceId, path: &Path) -> Result<StatusReport> {
    let store = XlsxStore::new(path, source);
    let loaded = store
        .load()
        .with_context(|| format!("failed to read ledger at {}", path.display()))?;

    let Some(loaded) = loaded else {
        return Ok(StatusReport {
            source: source.0.clone(),
            path: path.to_path_buf(),
            exists: false,
            schema: None,
            rows: 0,
            legacy_rows: 0,
            marker: None,
            newest_at: None,
        });
    };

    let schema = loaded.schema.to_string();
    let ledger = Ledger::from_records(loaded.records);
    Ok(StatusReport {
        source: source.0.clone(),
        path: path.to_path_buf(),
        exists: true,
        schema: Some(schema),
        rows: ledger.len(),
        legacy_rows: ledger
            .records()
            .iter()
            .filter(|r| r.fullname.is_none())
            .count(),
        marker: ledger.marker().map(|m| m.0.clone()),
        newest_at: ledger.records().iter().map(|r| r.created_at).max(),
    })
}

fn print_table(report: &StatusReport) {
    println!(
        "postbook v{} | r/{} | {} posts",
        env!("CARGO_PKG_VERSION"),
        report.source.bold(),
        report.rows,
    );

    if !report.exists {
        println!(
            "No ledger at {} yet. Run 'postbook once' to create it.",
            report.path.display()
        );
        return;
    }

    let marker = match &report.marker {
        Some(marker) => marker.green().to_string(),
        None => "none (next sync refetches the newest page)".yellow().to_string(),
    };
    let rows = vec![
        StatusTableRow {
            field: "path",
            value: report.path.display().to_string(),
        },
        StatusTableRow {
            field: "schema",
            value: report.schema.clone().unwrap_or_default(),
        },
        StatusTableRow {
            field: "rows",
            value: report.rows.to_string(),
        },
        StatusTableRow {
            field: "legacy rows",
            value: report.legacy_rows.to_string(),
        },
        StatusTableRow {
            field: "marker",
            value: marker,
        },
        StatusTableRow {
            field: "newest post",
            value: report
                .newest_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "-".to_string()),
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
