//! HTTP fetching with caching and per-domain rate limiting
//!
//! Per URL: cache lookup → rate-limit check → network fetch → text
//! extraction → cache write.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::WebContextConfig;

use super::cache::FileCache;
use super::extractor::{extract_plain_text, truncate_chars};
use super::rate_limiter::{domain_of, DomainRateLimiter};
use super::types::{ContextError, FetchedText};

/// Web fetcher combining the cache, the rate limiter and an HTTP client
pub struct WebFetcher {
    client: Client,
    cache: Arc<FileCache>,
    rate_limiter: Arc<DomainRateLimiter>,
    backoff: Duration,
}

impl WebFetcher {
    /// Create a fetcher sharing the given cache and rate limiter
    pub fn new(
        config: &WebContextConfig,
        cache: Arc<FileCache>,
        rate_limiter: Arc<DomainRateLimiter>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("web-context/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            cache,
            rate_limiter,
            backoff: Duration::from_secs(config.rate_limit_backoff_secs),
        })
    }

    /// Fetch the plain text of a URL
    ///
    /// A live cache hit is returned immediately without touching the rate
    /// limiter or the network. Otherwise the fetch must pass the per-domain
    /// admit check (one bounded backoff retry), the page is fetched,
    /// extracted, truncated to `max_chars` and written back to the cache.
    ///
    /// `length` on the returned value is the pre-truncation character count.
    pub async fn fetch(
        &self,
        url: &str,
        max_chars: usize,
        force: bool,
    ) -> Result<FetchedText, ContextError> {
        validate_url(url)?;

        if !force {
            if let Some(cached) = self.cache.get(url) {
                let length = cached.chars().count();
                info!("[cache] {} -> {} chars", url, length);
                return Ok(FetchedText {
                    url: url.to_string(),
                    text: truncate_chars(&cached, max_chars),
                    length,
                });
            }
        }

        if !self.rate_limiter.admit(url) {
            warn!("[rate_limit] {} - backing off", url);
            tokio::time::sleep(self.backoff).await;
            if !self.rate_limiter.admit(url) {
                return Err(ContextError::RateLimited {
                    domain: domain_of(url).unwrap_or_else(|| url.to_string()),
                });
            }
        }

        debug!("Fetching content from: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContextError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| map_request_error(url, e))?;

        self.rate_limiter.record(url);

        let text = extract_plain_text(&html);
        let length = text.chars().count();
        let truncated = truncate_chars(&text, max_chars);

        // A cache write failure degrades to an uncached fetch, never a
        // failed one.
        if let Err(e) = self.cache.put(url, &truncated) {
            warn!("Cache write failed for {}: {}", url, e);
        }

        info!("[fetch] {} -> {} chars", url, length);

        Ok(FetchedText {
            url: url.to_string(),
            text: truncated,
            length,
        })
    }
}

/// Reject URLs that are unparsable or not http/https
fn validate_url(url: &str) -> Result<(), ContextError> {
    let parsed = Url::parse(url).map_err(|_| ContextError::InvalidUrl {
        url: url.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ContextError::InvalidUrl {
            url: url.to_string(),
        });
    }
    Ok(())
}

fn map_request_error(url: &str, e: reqwest::Error) -> ContextError {
    if e.is_timeout() {
        ContextError::Timeout {
            url: url.to_string(),
        }
    } else {
        ContextError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}
