//! The persistence port consumed by the sync engine.

use postbook_core::Record;

use crate::error::StoreError;
use crate::schema::SchemaVersion;

/// A ledger read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedLedger {
    pub schema: SchemaVersion,
    /// Rows in sheet order, oldest first.
    pub records: Vec<Record>,
}

/// Storage for the full ledger.
///
/// `load` returns `Ok(None)` when nothing has been stored yet; every other
/// failure is an error. `flush` replaces the stored ledger in full.
pub trait LedgerStore: Send + Sync {
    fn load(&self) -> Result<Option<LoadedLedger>, StoreError>;

    fn flush(&self, records: &[Record]) -> Result<(), StoreError>;

    /// Human-readable location, used in log lines.
    fn location(&self) -> String;
}

impl<T: LedgerStore + ?Sized> LedgerStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<LoadedLedger>, StoreError> {
        (**self).load()
    }

    fn flush(&self, records: &[Record]) -> Result<(), StoreError> {
        (**self).flush(records)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}
