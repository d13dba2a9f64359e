//! Error types for postbook-sync.

use thiserror::Error;

use postbook_store::StoreError;

/// Errors that stop the engine from starting.
///
/// Nothing inside a tick is fatal, so this only surfaces from
/// [`SyncEngine::initialize`](crate::SyncEngine::initialize).
#[derive(Debug, Error)]
pub enum SyncError {
    /// The stored ledger exists but could not be loaded.
    #[error("cannot load ledger: {0}")]
    Store(#[from] StoreError),
}
