//! # postbook-sync
//!
//! Incremental sync of a subreddit's new posts into the ledger.
//!
//! [`SyncEngine`] owns the in-memory ledger and runs one tick per
//! [`SyncEngine::sync_once`] call. [`pipeline::open`] wires it to the Reddit
//! API and the `.xlsx` store for the CLI and the daemon.

pub mod engine;
pub mod error;
pub mod pipeline;

pub use engine::{EngineOptions, FlushStatus, SyncEngine, TickOutcome, TickReport};
pub use error::SyncError;
pub use pipeline::RedditEngine;
