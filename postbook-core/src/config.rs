//! Process configuration read from the environment.
//!
//! # Required variables (checked in this order)
//!
//! ```text
//! SUBREDDIT   community to mirror
//! RCLIENTID   API client id
//! RSECRET     API client secret
//! RUSER       account username
//! RPASS       account password
//! ```
//!
//! Optional: `POSTBOOK_DATA_DIR`, `POSTBOOK_INTERVAL_SECS`,
//! `POSTBOOK_FETCH_LIMIT`.
//!
//! [`Config::from_env`] layers [`EnvOverrides`] (command-line flags) over
//! `.env` and the process environment. [`Config::from_lookup`] takes the
//! lookup as a closure so tests never touch the real process environment.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::SourceId;

pub const ENV_SOURCE: &str = "SUBREDDIT";
pub const ENV_CLIENT_ID: &str = "RCLIENTID";
pub const ENV_CLIENT_SECRET: &str = "RSECRET";
pub const ENV_USERNAME: &str = "RUSER";
pub const ENV_PASSWORD: &str = "RPASS";

pub const ENV_DATA_DIR: &str = "POSTBOOK_DATA_DIR";
pub const ENV_INTERVAL_SECS: &str = "POSTBOOK_INTERVAL_SECS";
pub const ENV_FETCH_LIMIT: &str = "POSTBOOK_FETCH_LIMIT";

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_FETCH_LIMIT: usize = 100;
/// Largest page the feed API serves in one listing request.
pub const MAX_FETCH_LIMIT: usize = 100;

/// API credentials. `Debug` never prints the secret or the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Fully validated process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source: SourceId,
    pub credentials: Credentials,
    pub data_dir: PathBuf,
    pub interval: Duration,
    pub fetch_limit: usize,
}

/// Values that take precedence over the environment, usually from flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides(Vec<(&'static str, String)>);

impl EnvOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override `var` when `value` is set; `None` leaves the environment
    /// in charge.
    pub fn set(mut self, var: &'static str, value: Option<impl ToString>) -> Self {
        if let Some(value) = value {
            self.0.retain(|(existing, _)| *existing != var);
            self.0.push((var, value.to_string()));
        }
        self
    }

    /// `lookup`, with overridden variables answered first.
    pub fn layered<'a, F>(&'a self, lookup: F) -> impl Fn(&str) -> Option<String> + 'a
    where
        F: Fn(&str) -> Option<String> + 'a,
    {
        move |key: &str| {
            self.0
                .iter()
                .find(|(var, _)| *var == key)
                .map(|(_, value)| value.clone())
                .or_else(|| lookup(key))
        }
    }

    /// Load `.env` (if present) and layer over the process environment.
    fn process_env(&self) -> impl Fn(&str) -> Option<String> + '_ {
        let _ = dotenvy::dotenv();
        self.layered(|key| std::env::var(key).ok())
    }
}

impl Config {
    /// Read `.env` and the process environment under `overrides`.
    pub fn from_env(overrides: &EnvOverrides) -> Result<Self, ConfigError> {
        Self::from_lookup(overrides.process_env())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = parse_source(ENV_SOURCE, &require(&lookup, ENV_SOURCE)?)?;
        let client_id = require(&lookup, ENV_CLIENT_ID)?;
        let client_secret = require(&lookup, ENV_CLIENT_SECRET)?;
        let username = require(&lookup, ENV_USERNAME)?;
        let password = require(&lookup, ENV_PASSWORD)?;

        let data_dir = data_dir(&lookup);

        let interval = match optional(&lookup, ENV_INTERVAL_SECS) {
            Some(raw) => parse_interval(ENV_INTERVAL_SECS, &raw)?,
            None => DEFAULT_INTERVAL,
        };

        let fetch_limit = match optional(&lookup, ENV_FETCH_LIMIT) {
            Some(raw) => parse_fetch_limit(ENV_FETCH_LIMIT, &raw)?,
            None => DEFAULT_FETCH_LIMIT,
        };

        Ok(Self {
            source,
            credentials: Credentials {
                client_id,
                client_secret,
                username,
                password,
            },
            data_dir,
            interval,
            fetch_limit,
        })
    }

    /// `<data_dir>/<source>.xlsx`
    pub fn ledger_path(&self) -> PathBuf {
        ledger_path(&self.data_dir, &self.source)
    }
}

/// Where a ledger lives. Needs no credentials, so read-only commands can
/// use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerLocation {
    pub source: SourceId,
    pub data_dir: PathBuf,
}

impl LedgerLocation {
    /// Read `SUBREDDIT` and `POSTBOOK_DATA_DIR` from `.env` and the process
    /// environment under `overrides`.
    pub fn from_env(overrides: &EnvOverrides) -> Result<Self, ConfigError> {
        Self::from_lookup(overrides.process_env())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            source: parse_source(ENV_SOURCE, &require(&lookup, ENV_SOURCE)?)?,
            data_dir: data_dir(&lookup),
        })
    }

    pub fn ledger_path(&self) -> PathBuf {
        ledger_path(&self.data_dir, &self.source)
    }
}

/// `<data_dir>/<source>.xlsx`. Pure, no I/O.
pub fn ledger_path(data_dir: &Path, source: &SourceId) -> PathBuf {
    data_dir.join(format!("{}.xlsx", source.0))
}

/// Parse a source name. It becomes a file name under the data directory, so
/// path separators and dot segments are rejected.
pub fn parse_source(var: &'static str, raw: &str) -> Result<SourceId, ConfigError> {
    let name = raw.trim();
    if name.contains(['/', '\\']) || name.contains("..") || name == "." {
        return Err(ConfigError::Invalid {
            var,
            reason: format!("'{name}' is not a plain community name"),
        });
    }
    Ok(SourceId::from(name))
}

/// Parse a tick interval in whole seconds; zero is rejected.
pub fn parse_interval(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        reason: format!("'{raw}' is not a whole number of seconds"),
    })?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            var,
            reason: "interval must be at least one second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Parse a per-request item limit in `1..=MAX_FETCH_LIMIT`.
pub fn parse_fetch_limit(var: &'static str, raw: &str) -> Result<usize, ConfigError> {
    let limit: usize = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        reason: format!("'{raw}' is not a positive integer"),
    })?;
    if !(1..=MAX_FETCH_LIMIT).contains(&limit) {
        return Err(ConfigError::Invalid {
            var,
            reason: format!("limit must be between 1 and {MAX_FETCH_LIMIT}, got {limit}"),
        });
    }
    Ok(limit)
}

fn data_dir<F>(lookup: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, ENV_DATA_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

fn require<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, var).ok_or(ConfigError::Missing { var })
}

fn optional<F>(lookup: &F, var: &'static str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var).filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use rstest::rstest;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_env() -> HashMap<String, String> {
        env(&[
            (ENV_SOURCE, "rust"),
            (ENV_CLIENT_ID, "client"),
            (ENV_CLIENT_SECRET, "secret"),
            (ENV_USERNAME, "bot"),
            (ENV_PASSWORD, "hunter2"),
        ])
    }

    fn load(vars: &HashMap<String, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn full_env_uses_defaults_for_optional_settings() {
        let config = load(&full_env()).expect("config");
        assert_eq!(config.source, SourceId::from("rust"));
        assert_eq!(config.credentials.username, "bot");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.interval, DEFAULT_INTERVAL);
        assert_eq!(config.fetch_limit, 100);
        assert_eq!(config.ledger_path(), PathBuf::from("data").join("rust.xlsx"));
    }

    #[test]
    fn missing_variables_are_reported_in_order() {
        let order = [
            ENV_SOURCE,
            ENV_CLIENT_ID,
            ENV_CLIENT_SECRET,
            ENV_USERNAME,
            ENV_PASSWORD,
        ];
        let mut vars = HashMap::new();
        for (i, var) in order.iter().copied().enumerate() {
            let err = load(&vars).expect_err("config should be incomplete");
            assert_eq!(err, ConfigError::Missing { var }, "step {i}");
            vars.insert(var.to_string(), "value".to_string());
        }
        assert!(load(&vars).is_ok());
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut vars = full_env();
        vars.insert(ENV_USERNAME.to_string(), "  ".to_string());
        let err = load(&vars).unwrap_err();
        assert_eq!(err, ConfigError::Missing { var: ENV_USERNAME });
        assert_eq!(
            err.to_string(),
            "No RUSER env variable. Perhaps you forgot to add it?"
        );
    }

    #[test]
    fn optional_settings_override_defaults() {
        let mut vars = full_env();
        vars.insert(ENV_DATA_DIR.to_string(), "/var/lib/postbook".to_string());
        vars.insert(ENV_INTERVAL_SECS.to_string(), "60".to_string());
        vars.insert(ENV_FETCH_LIMIT.to_string(), "25".to_string());
        let config = load(&vars).expect("config");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/postbook"));
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.fetch_limit, 25);
    }

    #[test]
    fn zero_interval_is_invalid() {
        let mut vars = full_env();
        vars.insert(ENV_INTERVAL_SECS.to_string(), "0".to_string());
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { var: ENV_INTERVAL_SECS, .. })
        ));
    }

    #[test]
    fn fetch_limit_above_page_size_is_invalid() {
        let mut vars = full_env();
        vars.insert(ENV_FETCH_LIMIT.to_string(), "500".to_string());
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { var: ENV_FETCH_LIMIT, .. })
        ));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = load(&full_env()).expect("config");
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("\"secret\""));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn ledger_location_needs_no_credentials() {
        let vars = env(&[(ENV_SOURCE, "rust"), (ENV_DATA_DIR, "ledgers")]);
        let location = LedgerLocation::from_lookup(|key| vars.get(key).cloned()).expect("location");
        assert_eq!(location.ledger_path(), PathBuf::from("ledgers").join("rust.xlsx"));

        let err = LedgerLocation::from_lookup(|_| None).unwrap_err();
        assert_eq!(err, ConfigError::Missing { var: ENV_SOURCE });
    }

    #[rstest]
    #[case("../x")]
    #[case("..")]
    #[case(".")]
    #[case("a/b")]
    #[case("/etc/passwd")]
    #[case("a\\b")]
    fn source_escaping_the_data_dir_is_invalid(#[case] source: &str) {
        let mut vars = full_env();
        vars.insert(ENV_SOURCE.to_string(), source.to_string());
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { var: ENV_SOURCE, .. })
        ));

        let vars = env(&[(ENV_SOURCE, source)]);
        assert!(matches!(
            LedgerLocation::from_lookup(|key| vars.get(key).cloned()),
            Err(ConfigError::Invalid { var: ENV_SOURCE, .. })
        ));
    }

    #[test]
    fn source_is_trimmed() {
        let mut vars = full_env();
        vars.insert(ENV_SOURCE.to_string(), " rust_beginners ".to_string());
        let config = load(&vars).expect("config");
        assert_eq!(
            config.ledger_path(),
            PathBuf::from("data").join("rust_beginners.xlsx")
        );
    }

    #[test]
    fn overrides_win_over_the_base_lookup() {
        let vars = full_env();
        let overrides = EnvOverrides::new()
            .set(ENV_SOURCE, Some("golang"))
            .set(ENV_DATA_DIR, Some("/srv/ledgers"))
            .set(ENV_FETCH_LIMIT, None::<usize>);
        let config =
            Config::from_lookup(overrides.layered(|key| vars.get(key).cloned())).expect("config");
        assert_eq!(config.source, SourceId::from("golang"));
        assert_eq!(config.data_dir, PathBuf::from("/srv/ledgers"));
        assert_eq!(config.fetch_limit, DEFAULT_FETCH_LIMIT);
        assert_eq!(config.credentials.username, "bot");
    }

    #[test]
    fn later_override_replaces_earlier_one() {
        let overrides = EnvOverrides::new()
            .set(ENV_INTERVAL_SECS, Some(30))
            .set(ENV_INTERVAL_SECS, Some(60));
        let lookup = overrides.layered(|_| None);
        assert_eq!(lookup(ENV_INTERVAL_SECS).as_deref(), Some("60"));
        assert_eq!(lookup(ENV_SOURCE), None);
    }
}
