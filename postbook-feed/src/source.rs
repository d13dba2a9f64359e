//! The feed port consumed by the sync engine.

use postbook_core::{Fullname, Record, SourceId};

use crate::error::FeedError;

/// A remote feed of posts.
pub trait FeedSource: Send + Sync {
    /// Fetch posts from `source`, newest first.
    ///
    /// With `after = Some(marker)` the result holds every post strictly newer
    /// than `marker` (paginating as needed). With `None` it holds at most
    /// `limit` of the most recent posts.
    fn fetch_new(
        &self,
        source: &SourceId,
        after: Option<&Fullname>,
        limit: usize,
    ) -> Result<Vec<Record>, FeedError>;
}

impl<T: FeedSource + ?Sized> FeedSource for std::sync::Arc<T> {
    fn fetch_new(
        &self,
        source: &SourceId,
        after: Option<&Fullname>,
        limit: usize,
    ) -> Result<Vec<Record>, FeedError> {
        (**self).fetch_new(source, after, limit)
    }
}
