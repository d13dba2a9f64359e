//! `.xlsx` ledger storage.
//!
//! Reads go through `calamine`, writes through `rust_xlsxwriter`. The first
//! worksheet holds the ledger: one header row, then one row per record,
//! oldest first.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rust_xlsxwriter::{DocProperties, Format, Workbook};

use postbook_core::{Fullname, PostId, Record, SourceId};

use crate::atomic;
use crate::error::{corrupt, StoreError};
use crate::schema::{
    SchemaVersion, COL_AUTHOR, COL_BODY, COL_CREATED_AT, COL_FULLNAME, COL_ID, COL_TITLE, HEADERS,
};
use crate::store::{LedgerStore, LoadedLedger};

/// Longest text an xlsx cell can hold.
pub const MAX_CELL_CHARS: usize = 32_767;
/// Longest worksheet name Excel accepts.
pub const MAX_SHEET_NAME_CHARS: usize = 31;
/// Rows per worksheet, header included.
pub const MAX_ROWS: usize = 1_048_576;

const COLUMN_WIDTHS: [f64; 6] = [10.0, 48.0, 80.0, 20.0, 22.0, 12.0];

/// Ledger stored as a single-sheet `.xlsx` workbook at `path`.
#[derive(Debug, Clone)]
pub struct XlsxStore {
    path: PathBuf,
    sheet_name: String,
}

impl XlsxStore {
    pub fn new(path: impl Into<PathBuf>, source: &SourceId) -> Self {
        Self {
            path: path.into(),
            sheet_name: sheet_name_for(source),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render `records` into an in-memory workbook (always the current schema).
    pub fn render(&self, records: &[Record]) -> Result<Vec<u8>, StoreError> {
        if records.len() >= MAX_ROWS {
            return Err(StoreError::TooManyRows {
                count: records.len(),
            });
        }
        let render_err = |source| StoreError::Render {
            path: self.path.clone(),
            source,
        };

        let mut workbook = Workbook::new();
        let properties = DocProperties::new()
            .set_author("postbook")
            .set_title(&self.sheet_name);
        workbook.set_properties(&properties);

        let header_format = Format::new().set_bold();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.sheet_name).map_err(render_err)?;

        for (col, (header, width)) in HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
            let col = col as u16;
            worksheet
                .write_string_with_format(0, col, *header, &header_format)
                .map_err(render_err)?;
            worksheet.set_column_width(col, width).map_err(render_err)?;
        }
        worksheet.set_freeze_panes(1, 0).map_err(render_err)?;

        for (index, record) in records.iter().enumerate() {
            // Bounded by MAX_ROWS above.
            let row = (index + 1) as u32;
            let created_at = record
                .created_at
                .to_rfc3339_opts(SecondsFormat::Secs, true);
            let fullname = record
                .fullname
                .as_ref()
                .map(|f| f.as_str())
                .unwrap_or_default();

            let cells: [(usize, &str); 6] = [
                (COL_ID, &record.id.0),
                (COL_TITLE, &record.title),
                (COL_BODY, &record.body),
                (COL_AUTHOR, &record.author),
                (COL_CREATED_AT, &created_at),
                (COL_FULLNAME, fullname),
            ];
            for (col, text) in cells {
                if text.is_empty() {
                    continue;
                }
                worksheet
                    .write_string(row, col as u16, truncate_cell(text))
                    .map_err(render_err)?;
            }
        }

        workbook.save_to_buffer().map_err(render_err)
    }

    fn read(&self) -> Result<LoadedLedger, StoreError> {
        let read_err = |source| StoreError::Read {
            path: self.path.clone(),
            source,
        };

        let mut workbook: Xlsx<BufReader<File>> = open_workbook(&self.path).map_err(read_err)?;
        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range.map_err(read_err)?,
            None => {
                return Err(StoreError::NoWorksheet {
                    path: self.path.clone(),
                })
            }
        };

        let header_row = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            return Ok(LoadedLedger {
                schema: SchemaVersion::CURRENT,
                records: Vec::new(),
            });
        };

        let header: Vec<String> = header.iter().map(cell_text).collect();
        let schema = SchemaVersion::detect(header.as_slice()).ok_or_else(|| {
            corrupt(
                &self.path,
                header_row,
                format!("unrecognised header [{}]", header.join(", ")),
            )
        })?;

        let mut records = Vec::new();
        for (offset, cells) in rows.enumerate() {
            let row = header_row + 1 + offset;
            if cells.iter().all(|cell| cell_text(cell).trim().is_empty()) {
                continue;
            }
            records.push(self.parse_row(schema, row, cells)?);
        }

        Ok(LoadedLedger { schema, records })
    }

    fn parse_row(
        &self,
        schema: SchemaVersion,
        row: usize,
        cells: &[Data],
    ) -> Result<Record, StoreError> {
        let text = |col: usize| cells.get(col).map(cell_text).unwrap_or_default();

        let id = text(COL_ID).trim().to_string();
        if id.is_empty() {
            return Err(corrupt(&self.path, row, "missing id"));
        }

        let created_at = cells
            .get(COL_CREATED_AT)
            .and_then(parse_timestamp)
            .ok_or_else(|| {
                corrupt(
                    &self.path,
                    row,
                    format!("unreadable creation time '{}'", text(COL_CREATED_AT)),
                )
            })?;

        let fullname = if schema.has_fullname() {
            Some(text(COL_FULLNAME).trim().to_string())
                .filter(|name| !name.is_empty())
                .map(Fullname::from)
        } else {
            None
        };

        Ok(Record {
            id: PostId::from(id),
            title: text(COL_TITLE),
            body: text(COL_BODY),
            author: text(COL_AUTHOR),
            created_at,
            fullname,
        })
    }
}

impl LedgerStore for XlsxStore {
    fn load(&self) -> Result<Option<LoadedLedger>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let loaded = self.read()?;
        tracing::debug!(
            path = %self.path.display(),
            schema = %loaded.schema,
            rows = loaded.records.len(),
            "loaded ledger workbook",
        );
        Ok(Some(loaded))
    }

    fn flush(&self, records: &[Record]) -> Result<(), StoreError> {
        let bytes = self.render(records)?;
        atomic::replace_file(&self.path, &bytes)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Worksheet name for `source`: invalid characters replaced, at most 31 chars.
pub fn sheet_name_for(source: &SourceId) -> String {
    let name: String = source
        .0
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .take(MAX_SHEET_NAME_CHARS)
        .collect();
    let name = name.trim_matches('\'').trim();
    if name.is_empty() {
        "ledger".to_string()
    } else {
        name.to_string()
    }
}

fn truncate_cell(text: &str) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_timestamp(cell: &Data) -> Option<DateTime<Utc>> {
    match cell {
        Data::DateTime(excel) => excel.as_datetime().map(|naive| naive.and_utc()),
        Data::String(text) | Data::DateTimeIso(text) => parse_timestamp_text(text),
        _ => None,
    }
}

fn parse_timestamp_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}
