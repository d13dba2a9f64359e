//! # postbook-feed
//!
//! Feed client adapter. [`FeedSource`] is the port the sync engine calls;
//! [`RedditClient`] implements it against the Reddit OAuth API.

pub mod error;
pub mod listing;
pub mod reddit;
pub mod source;

pub use error::FeedError;
pub use reddit::{RedditClient, RedditConfig};
pub use source::FeedSource;
