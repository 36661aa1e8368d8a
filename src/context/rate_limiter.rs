// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-domain sliding-window rate limiting for web fetches

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::debug;
use url::Url;

/// Sliding-window rate limiter keyed by URL domain
///
/// Keeps a list of request timestamps per domain and prunes entries older
/// than the window on every check. State is in-memory only and resets on
/// process restart.
pub struct DomainRateLimiter {
    requests: RwLock<HashMap<String, Vec<Instant>>>,
    max_per_window: usize,
    window: Duration,
}

impl DomainRateLimiter {
    /// Create a rate limiter
    ///
    /// # Arguments
    /// * `max_per_window` - Maximum requests per domain within the window
    /// * `window_secs` - Window width in seconds
    pub fn new(max_per_window: usize, window_secs: u64) -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            max_per_window,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Create a rate limiter with a custom window duration (for testing)
    pub fn with_window(max_per_window: usize, window: Duration) -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            max_per_window,
            window,
        }
    }

    /// Check whether another request to the URL's domain is allowed
    ///
    /// Does NOT record the request. A URL without a parsable domain is
    /// admitted; the fetch itself will surface the real error.
    pub fn admit(&self, url: &str) -> bool {
        let Some(domain) = domain_of(url) else {
            return true;
        };
        let now = Instant::now();
        let requests = match self.requests.read() {
            Ok(r) => r,
            Err(_) => return true,
        };
        let recent = match requests.get(&domain) {
            None => 0,
            Some(timestamps) => timestamps
                .iter()
                .filter(|&&t| now.duration_since(t) < self.window)
                .count(),
        };
        if recent >= self.max_per_window {
            debug!("Rate limit reached for domain {}", domain);
            return false;
        }
        true
    }

    /// Record a request against the URL's domain
    pub fn record(&self, url: &str) {
        let Some(domain) = domain_of(url) else {
            return;
        };
        let mut requests = match self.requests.write() {
            Ok(r) => r,
            Err(_) => return,
        };
        let timestamps = requests.entry(domain).or_default();
        let now = Instant::now();
        // Prune expired entries while we hold the lock
        timestamps.retain(|&t| now.duration_since(t) < self.window);
        timestamps.push(now);
    }

    /// Maximum requests allowed per window
    pub fn max_per_window(&self) -> usize {
        self.max_per_window
    }
}

/// Extract the rate-limit key from a URL: host plus explicit port
pub(crate) fn domain_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
