//! Error types for postbook-store.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading or flushing a ledger workbook.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The workbook exists but the xlsx reader rejected it.
    #[error("failed to read workbook at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: calamine::XlsxError,
    },

    /// The xlsx writer failed while rendering the workbook.
    #[error("failed to render workbook for {path}: {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    /// The workbook has no worksheet to read rows from.
    #[error("workbook at {path} contains no worksheet")]
    NoWorksheet { path: PathBuf },

    /// A row could not be mapped onto the ledger schema.
    #[error("corrupt ledger at {path}, row {row}: {reason}")]
    Corrupt {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    /// The ledger no longer fits in a single worksheet.
    #[error("ledger has {count} records, more than a worksheet can hold")]
    TooManyRows { count: usize },
}

impl StoreError {
    /// Whether this error means the stored ledger cannot be trusted.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            StoreError::Read { .. } | StoreError::NoWorksheet { .. } | StoreError::Corrupt { .. }
        )
    }
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn corrupt(path: impl Into<PathBuf>, row: usize, reason: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        path: path.into(),
        row,
        reason: reason.into(),
    }
}
