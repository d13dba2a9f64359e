//! Shared engine entrypoint used by CLI and daemon.

use postbook_core::Config;
use postbook_feed::{RedditClient, RedditConfig};
use postbook_store::XlsxStore;

use crate::{EngineOptions, SyncEngine, SyncError};

/// The engine wired to the live API and the `.xlsx` ledger.
pub type RedditEngine = SyncEngine<RedditClient, XlsxStore>;

/// Engine options derived from `config`.
pub fn options(config: &Config, dry_run: bool) -> EngineOptions {
    EngineOptions {
        initial_batch: config.fetch_limit,
        dry_run,
    }
}

/// Build the store and client described by `config` and load the ledger.
///
/// This is the canonical way both `postbook once` and the daemon obtain an
/// engine.
pub fn open(config: &Config, options: EngineOptions) -> Result<RedditEngine, SyncError> {
    let store = XlsxStore::new(config.ledger_path(), &config.source);
    let client = RedditClient::new(RedditConfig::new(config.credentials.clone()));
    SyncEngine::initialize(config.source.clone(), client, store, options)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use postbook_core::{Credentials, SourceId};
    use tempfile::TempDir;

    use super::*;

    fn config(data_dir: &std::path::Path) -> Config {
        Config {
            source: SourceId::from("rust"),
            credentials: Credentials {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
                username: "bot".to_string(),
                password: "pw".to_string(),
            },
            data_dir: data_dir.to_path_buf(),
            interval: Duration::from_secs(300),
            fetch_limit: 25,
        }
    }

    #[test]
    fn open_without_ledger_starts_empty() {
        let dir = TempDir::new().expect("tempdir");
        let engine = open(&config(dir.path()), EngineOptions::default()).expect("open");
        assert!(engine.ledger().is_empty());
        assert!(engine.marker().is_none());
        assert!(engine.loaded_schema().is_none());
    }

    #[test]
    fn options_follow_config() {
        let dir = TempDir::new().expect("tempdir");
        let opts = options(&config(dir.path()), true);
        assert_eq!(opts.initial_batch, 25);
        assert!(opts.dry_run);
    }

    #[test]
    fn open_surfaces_unreadable_ledger() {
        let dir = TempDir::new().expect("tempdir");
        let cfg = config(dir.path());
        std::fs::write(cfg.ledger_path(), b"not a workbook").expect("write");
        let err = open(&cfg, EngineOptions::default()).err().expect("must fail");
        assert!(matches!(err, SyncError::Store(_)));
    }
}
