//! # postbook-store
//!
//! Spreadsheet persistence for the postbook ledger.
//!
//! [`XlsxStore`] implements [`LedgerStore`]: it loads an existing workbook
//! (any supported [`SchemaVersion`]) and flushes the full ledger with an
//! atomic temp-file + rename replace.

pub mod atomic;
pub mod error;
pub mod schema;
pub mod store;
pub mod xlsx;

pub use error::StoreError;
pub use schema::SchemaVersion;
pub use store::{LedgerStore, LoadedLedger};
pub use xlsx::XlsxStore;
