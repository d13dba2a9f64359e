//! Blocking Reddit API client.
//!
//! Authenticates with the password grant, caches the bearer token until
//! shortly before it expires, and reads `/r/<sub>/new` listings.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde::Deserialize;

use postbook_core::{Credentials, Fullname, Record, SourceId};

use crate::error::FeedError;
use crate::listing::{Listing, Page};
use crate::source::FeedSource;

pub const DEFAULT_AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub const DEFAULT_API_BASE: &str = "https://oauth.reddit.com";
/// Largest `limit` a listing request honours.
pub const PAGE_SIZE: usize = 100;
pub const DEFAULT_MAX_PAGES: usize = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Refresh the token this long before the server says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Connection settings for [`RedditClient`].
#[derive(Debug, Clone)]
pub struct RedditConfig {
    pub credentials: Credentials,
    pub user_agent: String,
    pub auth_url: String,
    pub api_base: String,
    /// Upper bound on listing pages fetched per "after marker" request.
    pub max_pages: usize,
    pub timeout: Duration,
}

impl RedditConfig {
    pub fn new(credentials: Credentials) -> Self {
        let user_agent = format!(
            "postbook/{} (by u/{})",
            env!("CARGO_PKG_VERSION"),
            credentials.username
        );
        Self {
            credentials,
            user_agent,
            auth_url: DEFAULT_AUTH_URL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

pub struct RedditClient {
    config: RedditConfig,
    agent: ureq::Agent,
    token: Mutex<Option<AccessToken>>,
}

impl RedditClient {
    pub fn new(config: RedditConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();
        Self {
            config,
            agent,
            token: Mutex::new(None),
        }
    }

    fn bearer_token(&self) -> Result<String, FeedError> {
        let mut cached = self.token.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }
        let fresh = self.request_token()?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    fn forget_token(&self) {
        let mut cached = self.token.lock().unwrap_or_else(|e| e.into_inner());
        *cached = None;
    }

    fn request_token(&self) -> Result<AccessToken, FeedError> {
        let url = &self.config.auth_url;
        let creds = &self.config.credentials;
        let basic = BASE64_STANDARD.encode(format!("{}:{}", creds.client_id, creds.client_secret));

        tracing::debug!(url = %url, "requesting access token");
        let response = self
            .agent
            .post(url)
            .set("Authorization", &format!("Basic {basic}"))
            .send_form(&[
                ("grant_type", "password"),
                ("username", creds.username.as_str()),
                ("password", creds.password.as_str()),
            ])
            .map_err(|err| map_ureq_error(url, err))?;

        let body: TokenResponse = response.into_json().map_err(|err| FeedError::Decode {
            url: url.clone(),
            reason: err.to_string(),
        })?;

        if let Some(error) = body.error {
            return Err(FeedError::Auth(error));
        }
        let value = body
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| FeedError::Auth("token response carried no access_token".to_string()))?;
        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(3600));

        Ok(AccessToken {
            value,
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
        })
    }

    fn fetch_page(
        &self,
        source: &SourceId,
        before: Option<&Fullname>,
        limit: usize,
    ) -> Result<Page, FeedError> {
        let url = format!("{}/r/{}/new", self.config.api_base.trim_end_matches('/'), source);
        let token = self.bearer_token()?;

        let mut request = self
            .agent
            .get(&url)
            .set("Authorization", &format!("bearer {token}"))
            .query("limit", &limit.to_string())
            .query("show", "all")
            .query("raw_json", "1");
        if let Some(marker) = before {
            request = request.query("before", marker.as_str());
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(401, _)) => {
                self.forget_token();
                return Err(FeedError::Auth(format!("{url} rejected the access token")));
            }
            Err(err) => return Err(map_ureq_error(&url, err)),
        };

        let listing: Listing = response.into_json().map_err(|err| FeedError::Decode {
            url: url.clone(),
            reason: err.to_string(),
        })?;
        Ok(listing.into_page())
    }
}

impl FeedSource for RedditClient {
    fn fetch_new(
        &self,
        source: &SourceId,
        after: Option<&Fullname>,
        limit: usize,
    ) -> Result<Vec<Record>, FeedError> {
        let limit = limit.clamp(1, PAGE_SIZE);
        match after {
            None => Ok(self.fetch_page(source, None, limit)?.records),
            Some(marker) => collect_newer(marker, self.config.max_pages, PAGE_SIZE, |cursor| {
                self.fetch_page(source, Some(cursor), PAGE_SIZE)
            }),
        }
    }
}

/// Walk `before` cursors from `marker` toward the newest post.
///
/// Each page is newest first and every page is newer than the previous one,
/// so the pages are stitched back together in reverse. Stops at an empty or
/// short page, or after `max_pages`; whatever is left is picked up by the
/// next request, which starts from the newest post returned here.
pub fn collect_newer<F>(
    marker: &Fullname,
    max_pages: usize,
    page_size: usize,
    mut fetch_page: F,
) -> Result<Vec<Record>, FeedError>
where
    F: FnMut(&Fullname) -> Result<Page, FeedError>,
{
    let mut pages: Vec<Vec<Record>> = Vec::new();
    let mut cursor = marker.clone();

    for _ in 0..max_pages.max(1) {
        let page = fetch_page(&cursor)?;
        let count = page.records.len();
        if count == 0 {
            break;
        }
        let next = page
            .before
            .clone()
            .or_else(|| page.records.first().and_then(|r| r.fullname.clone()));
        pages.push(page.records);
        match next {
            Some(next) if count >= page_size => cursor = next,
            _ => break,
        }
        if pages.len() == max_pages {
            tracing::warn!(
                max_pages,
                "page limit reached; remaining posts will be fetched on the next tick",
            );
        }
    }

    Ok(pages.into_iter().rev().flatten().collect())
}

fn map_ureq_error(url: &str, err: ureq::Error) -> FeedError {
    match err {
        ureq::Error::Status(code, response) => FeedError::Status {
            url: url.to_string(),
            code,
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => FeedError::Transport {
            url: url.to_string(),
            reason: transport.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use postbook_core::PostId;

    fn post(n: u32) -> Record {
        Record {
            id: PostId::from(format!("p{n}")),
            title: format!("post {n}"),
            body: String::new(),
            author: "someone".to_string(),
            created_at: Utc.timestamp_opt(1_700_000_000 + i64::from(n) * 60, 0).unwrap(),
            fullname: Some(Fullname::from(format!("t3_p{n}"))),
        }
    }

    /// Serve posts `1..=newest` the way a `before=` listing does: the
    /// `page_size` posts immediately newer than the cursor, newest first.
    fn serve(newest: u32, page_size: usize) -> impl FnMut(&Fullname) -> Result<Page, FeedError> {
        move |cursor: &Fullname| {
            let from: u32 = cursor.as_str().trim_start_matches("t3_p").parse().unwrap();
            let mut records: Vec<Record> = (from + 1..=newest).take(page_size).map(post).collect();
            records.reverse();
            let before = records.first().and_then(|r| r.fullname.clone());
            Ok(Page { records, before })
        }
    }

    fn numbers(records: &[Record]) -> Vec<u32> {
        records
            .iter()
            .map(|r| r.id.0.trim_start_matches('p').parse().unwrap())
            .collect()
    }

    #[test]
    fn nothing_newer_returns_empty() {
        let result = collect_newer(&Fullname::from("t3_p5"), 10, 3, serve(5, 3)).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn single_short_page() {
        let result = collect_newer(&Fullname::from("t3_p5"), 10, 3, serve(7, 3)).unwrap();
        assert_eq!(numbers(&result), [7, 6]);
    }

    #[test]
    fn pages_are_stitched_newest_first() {
        let result = collect_newer(&Fullname::from("t3_p0"), 10, 3, serve(8, 3)).unwrap();
        assert_eq!(numbers(&result), [8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn page_cap_keeps_the_oldest_contiguous_run() {
        let result = collect_newer(&Fullname::from("t3_p0"), 2, 3, serve(10, 3)).unwrap();
        assert_eq!(numbers(&result), [6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn page_error_aborts_the_whole_fetch() {
        let mut calls = 0;
        let result = collect_newer(&Fullname::from("t3_p0"), 10, 3, |cursor| {
            calls += 1;
            if calls == 2 {
                return Err(FeedError::Transport {
                    url: "u".to_string(),
                    reason: "reset".to_string(),
                });
            }
            serve(10, 3)(cursor)
        });
        assert!(result.is_err(), "partial pages must not be returned");
    }

    #[test]
    fn user_agent_names_the_account() {
        let config = RedditConfig::new(Credentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            username: "postbot".to_string(),
            password: "pw".to_string(),
        });
        assert!(config.user_agent.starts_with("postbook/"));
        assert!(config.user_agent.ends_with("(by u/postbot)"));
    }
}
