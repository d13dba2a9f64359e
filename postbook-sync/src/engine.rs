//! The incremental sync engine.
//!
//! ## `sync_once`: one tick
//!
//! 1. Derive the marker from the ledger tail.
//! 2. Fetch posts strictly newer than the marker (or an initial batch).
//! 3. Reverse the newest-first batch into oldest-first order.
//! 4. Append every post the ledger does not already hold.
//! 5. Flush the full ledger if it changed or a previous flush failed.
//!
//! Feed and flush failures are logged and reported in the [`TickReport`];
//! they never escape the tick and never leave a partial append behind.

use std::time::{Duration, Instant};

use postbook_core::{Fullname, Ledger, Record, SourceId};
use postbook_feed::{FeedError, FeedSource};
use postbook_store::{LedgerStore, SchemaVersion};

use crate::error::SyncError;

/// Tunables for a [`SyncEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Posts requested when the ledger has no marker.
    pub initial_batch: usize,
    /// Append in memory but never write the ledger back.
    pub dry_run: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            initial_batch: postbook_core::config::DEFAULT_FETCH_LIMIT,
            dry_run: false,
        }
    }
}

/// What happened to the stored ledger at the end of a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushStatus {
    /// Nothing to write.
    Unchanged,
    /// The full ledger was written.
    Written,
    /// Dry run: the ledger *would* have been written.
    WouldWrite,
    /// The write failed; the in-memory ledger stays authoritative and the
    /// next tick retries.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The feed could not be read; the ledger is untouched.
    FetchFailed { reason: String, retryable: bool },
    /// The feed was read and new posts (if any) appended.
    Synced {
        fetched: usize,
        appended: usize,
        flush: FlushStatus,
    },
}

/// Summary of one [`SyncEngine::sync_once`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub outcome: TickOutcome,
    /// Marker after the tick.
    pub marker: Option<Fullname>,
    pub ledger_len: usize,
    pub duration: Duration,
}

impl TickReport {
    pub fn appended(&self) -> usize {
        match &self.outcome {
            TickOutcome::Synced { appended, .. } => *appended,
            TickOutcome::FetchFailed { .. } => 0,
        }
    }
}

/// Owns the ledger for one source and keeps it in step with the feed.
pub struct SyncEngine<F, S> {
    source: SourceId,
    feed: F,
    store: S,
    ledger: Ledger,
    schema: Option<SchemaVersion>,
    pending_flush: bool,
    options: EngineOptions,
}

impl<F, S> SyncEngine<F, S>
where
    F: FeedSource,
    S: LedgerStore,
{
    /// Load the stored ledger. A missing ledger starts empty; anything else
    /// that prevents loading is fatal.
    pub fn initialize(
        source: SourceId,
        feed: F,
        store: S,
        options: EngineOptions,
    ) -> Result<Self, SyncError> {
        let (ledger, schema) = match store.load()? {
            Some(loaded) => {
                let rows = loaded.records.len();
                let ledger = Ledger::from_records(loaded.records);
                if ledger.len() < rows {
                    tracing::warn!(
                        location = %store.location(),
                        dropped = rows - ledger.len(),
                        "stored ledger contained duplicate posts; keeping first occurrences",
                    );
                }
                tracing::info!(
                    location = %store.location(),
                    schema = %loaded.schema,
                    records = ledger.len(),
                    marker = ?ledger.marker().map(Fullname::as_str),
                    "loaded ledger",
                );
                if !loaded.schema.has_fullname() {
                    tracing::info!(
                        "ledger uses the legacy schema without fullnames; next fetch is a full refetch",
                    );
                }
                (ledger, Some(loaded.schema))
            }
            None => {
                tracing::info!(
                    "no ledger file found, a new one will be created at {}",
                    store.location(),
                );
                (Ledger::new(), None)
            }
        };

        Ok(Self {
            source,
            feed,
            store,
            ledger,
            schema,
            pending_flush: false,
            options,
        })
    }

    pub fn source(&self) -> &SourceId {
        &self.source
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn marker(&self) -> Option<&Fullname> {
        self.ledger.marker()
    }

    /// Schema of the ledger as loaded at startup; `None` if no file existed.
    pub fn loaded_schema(&self) -> Option<SchemaVersion> {
        self.schema
    }

    /// Whether the stored ledger is known to lag the in-memory one.
    pub fn has_pending_flush(&self) -> bool {
        self.pending_flush
    }

    /// Run one tick.
    pub fn sync_once(&mut self) -> TickReport {
        let started = Instant::now();
        let marker = self.ledger.marker().cloned();

        tracing::info!(
            source = %self.source,
            marker = ?marker.as_ref().map(Fullname::as_str),
            "fetching new posts",
        );
        let batch = match self.fetch_batch(marker.as_ref()) {
            Ok(batch) => batch,
            Err(err) => {
                let retryable = err.is_retryable();
                tracing::warn!(
                    source = %self.source,
                    error = %err,
                    retryable,
                    "fetch failed; will retry on the next tick",
                );
                return self.report(
                    TickOutcome::FetchFailed {
                        reason: err.to_string(),
                        retryable,
                    },
                    started,
                );
            }
        };

        let fetched = batch.len();
        tracing::info!(source = %self.source, fetched, "fetched {fetched} posts");

        let appended = self.append_batch(batch);
        if appended > 0 {
            self.pending_flush = true;
        }

        let flush = if !self.pending_flush {
            FlushStatus::Unchanged
        } else if self.options.dry_run {
            self.pending_flush = false;
            tracing::info!(appended, "[dry-run] would write ledger");
            FlushStatus::WouldWrite
        } else {
            self.flush()
        };

        self.report(
            TickOutcome::Synced {
                fetched,
                appended,
                flush,
            },
            started,
        )
    }

    /// Posts newer than `marker`, newest first.
    ///
    /// A marker whose post was removed upstream answers every `before=`
    /// request with an empty page. An empty answer is therefore checked
    /// against the unanchored newest page, keeping only posts created after
    /// the ledger tail.
    fn fetch_batch(&self, marker: Option<&Fullname>) -> Result<Vec<Record>, FeedError> {
        let limit = self.options.initial_batch;
        let batch = self.feed.fetch_new(&self.source, marker, limit)?;
        let Some(marker) = marker else {
            return Ok(batch);
        };
        if !batch.is_empty() {
            return Ok(batch);
        }

        let Some(tail_at) = self.ledger.last().map(|r| r.created_at) else {
            return Ok(batch);
        };
        let newer: Vec<Record> = self
            .feed
            .fetch_new(&self.source, None, limit)?
            .into_iter()
            .filter(|r| r.created_at > tail_at)
            .collect();
        if !newer.is_empty() {
            tracing::warn!(
                source = %self.source,
                marker = %marker,
                newer = newer.len(),
                "marker returned no posts but newer ones exist; marker post is likely removed",
            );
        }
        Ok(newer)
    }

    /// Append `batch` (newest first) in chronological order, skipping posts
    /// already in the ledger. Returns the number appended.
    fn append_batch(&mut self, batch: Vec<Record>) -> usize {
        let mut appended = 0;
        for record in batch.into_iter().rev() {
            if self.ledger.append(record) {
                appended += 1;
            }
        }
        appended
    }

    fn flush(&mut self) -> FlushStatus {
        let location = self.store.location();
        tracing::info!(location = %location, records = self.ledger.len(), "writing ledger");
        match self.store.flush(self.ledger.records()) {
            Ok(()) => {
                self.pending_flush = false;
                self.schema = Some(SchemaVersion::CURRENT);
                tracing::info!(location = %location, "ledger written");
                FlushStatus::Written
            }
            Err(err) => {
                tracing::error!(
                    location = %location,
                    error = %err,
                    "failed to write ledger; keeping it in memory and retrying next tick",
                );
                FlushStatus::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn report(&self, outcome: TickOutcome, started: Instant) -> TickReport {
        TickReport {
            outcome,
            marker: self.ledger.marker().cloned(),
            ledger_len: self.ledger.len(),
            duration: started.elapsed(),
        }
    }
}
