//! Domain types for the postbook ledger.
//!
//! Identifiers are newtypes over `String`; the remote feed treats them as
//! opaque, and so do we.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Name of the community feed being mirrored (e.g. a subreddit name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub String);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Stable per-post identifier as shown in the sheet's `Id` column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostId(pub String);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PostId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Globally-unique post identifier used as the sync marker.
///
/// Distinct from [`PostId`]: the feed accepts a fullname as its
/// "strictly newer than" cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fullname(pub String);

impl Fullname {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fullname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Fullname {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Fullname {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One post, as fetched from the feed or read back from the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: PostId,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    /// `None` only for rows written by the five-column legacy schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fullname: Option<Fullname>,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Ordered, de-duplicated collection of synced records, oldest first.
///
/// Fullnames are unique. Legacy rows without a fullname are keyed by id so a
/// full refetch after a legacy tail does not duplicate them.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: Vec<Record>,
    fullnames: HashSet<Fullname>,
    legacy_ids: HashSet<PostId>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from rows already in chronological order.
    ///
    /// Rows repeating an earlier fullname are dropped.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut ledger = Self::new();
        for record in records {
            ledger.append(record);
        }
        ledger
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }

    /// Fullname of the tail record, if the tail has one.
    pub fn marker(&self) -> Option<&Fullname> {
        self.records.last().and_then(|r| r.fullname.as_ref())
    }

    /// Whether `record` is already present in the ledger.
    pub fn contains(&self, record: &Record) -> bool {
        if let Some(fullname) = &record.fullname {
            if self.fullnames.contains(fullname) {
                return true;
            }
        }
        self.legacy_ids.contains(&record.id)
    }

    /// Append `record` at the tail. Returns `false` (and leaves the ledger
    /// untouched) when the record is already present.
    pub fn append(&mut self, record: Record) -> bool {
        if self.contains(&record) {
            return false;
        }
        match &record.fullname {
            Some(fullname) => {
                self.fullnames.insert(fullname.clone());
            }
            None => {
                self.legacy_ids.insert(record.id.clone());
            }
        }
        self.records.push(record);
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
