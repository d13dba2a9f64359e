//! postbook core library: domain types, process configuration, errors.
//!
//! - [`types`]: newtypes, [`Record`] and the in-memory [`Ledger`]
//! - [`config`]: environment-backed [`Config`]
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, Credentials, EnvOverrides, LedgerLocation};
pub use error::ConfigError;
pub use types::{Fullname, Ledger, PostId, Record, SourceId};
