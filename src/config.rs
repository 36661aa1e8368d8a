// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the web-context engine

use std::env;
use std::path::PathBuf;

/// Configuration for web-context fetching and caching
#[derive(Debug, Clone)]
pub struct WebContextConfig {
    /// Directory holding the on-disk page cache
    pub cache_dir: PathBuf,
    /// JSON file defining the named context sets
    pub sets_file: PathBuf,
    /// Cache TTL in seconds (default: 14 days)
    pub cache_ttl_secs: u64,
    /// Maximum characters kept per fetched URL (default: 10000)
    pub max_chars_per_url: usize,
    /// HTTP request timeout in seconds (default: 10)
    pub request_timeout_secs: u64,
    /// Maximum requests per domain within the rate window (default: 10)
    pub rate_limit_requests: usize,
    /// Rate window width in seconds (default: 60)
    pub rate_limit_window_secs: u64,
    /// Wait before the single rate-limit re-check, in seconds (default: 5)
    pub rate_limit_backoff_secs: u64,
}

const DEFAULT_CACHE_TTL_SECS: u64 = 14 * 24 * 3600;

impl WebContextConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            cache_dir: env::var("WEB_CONTEXT_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("cache")),
            sets_file: env::var("WEB_CONTEXT_SETS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config/context_sets.json")),
            cache_ttl_secs: env::var("WEB_CONTEXT_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CACHE_TTL_SECS),
            max_chars_per_url: env::var("WEB_CONTEXT_MAX_CHARS_PER_URL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            request_timeout_secs: env::var("WEB_CONTEXT_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            rate_limit_requests: env::var("WEB_CONTEXT_RATE_LIMIT_REQUESTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            rate_limit_window_secs: env::var("WEB_CONTEXT_RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            rate_limit_backoff_secs: env::var("WEB_CONTEXT_RATE_LIMIT_BACKOFF_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_ttl_secs == 0 {
            return Err("cache_ttl_secs must be greater than 0".to_string());
        }
        if self.max_chars_per_url < 100 {
            return Err("max_chars_per_url must be at least 100".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be at least 1".to_string());
        }
        if self.rate_limit_requests == 0 {
            return Err("rate_limit_requests must be greater than 0".to_string());
        }
        if self.rate_limit_window_secs == 0 {
            return Err("rate_limit_window_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for WebContextConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            sets_file: PathBuf::from("config/context_sets.json"),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            max_chars_per_url: 10_000,
            request_timeout_secs: 10,
            rate_limit_requests: 10,
            rate_limit_window_secs: 60,
            rate_limit_backoff_secs: 5,
        }
    }
}
