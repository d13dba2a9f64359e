//! Listing payloads returned by `/r/<sub>/new`, and their mapping to
//! [`Record`]s.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use postbook_core::{Fullname, PostId, Record};

/// Kind tag the API uses for link/self posts.
pub const POST_KIND: &str = "t3";

#[derive(Debug, Clone, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub children: Vec<Thing>,
    /// Cursor for the page of newer items.
    #[serde(default)]
    pub before: Option<String>,
    /// Cursor for the page of older items.
    #[serde(default)]
    pub after: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thing {
    pub kind: String,
    pub data: PostData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: String,
    pub created_utc: f64,
}

impl PostData {
    pub fn into_record(self) -> Option<Record> {
        let created_at = DateTime::<Utc>::from_timestamp(self.created_utc.trunc() as i64, 0)?;
        Some(Record {
            id: PostId::from(self.id),
            title: self.title,
            body: self.selftext,
            author: self.author,
            created_at,
            fullname: Some(Fullname::from(self.name)),
        })
    }
}

/// One decoded page: posts newest first, plus the cursor toward newer posts.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<Record>,
    pub before: Option<Fullname>,
}

impl Listing {
    /// Keep only posts, in the order the API returned them.
    ///
    /// Children with an out-of-range timestamp are dropped with a warning.
    pub fn into_page(self) -> Page {
        let before = self.data.before.map(Fullname::from);
        let records = self
            .data
            .children
            .into_iter()
            .filter(|thing| thing.kind == POST_KIND)
            .filter_map(|thing| {
                let name = thing.data.name.clone();
                let record = thing.data.into_record();
                if record.is_none() {
                    tracing::warn!(fullname = %name, "dropping post with invalid created_utc");
                }
                record
            })
            .collect();
        Page { records, before }
    }
}
