// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Web-context service orchestration
//!
//! Ties the tag parser, set resolver and web fetcher into one
//! "resolve prompt to contexts" call, plus the administrative surface the
//! hosting service exposes (cache stats, purges, set listing, reload).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::WebContextConfig;

use super::cache::FileCache;
use super::fetcher::WebFetcher;
use super::parser::extract_set_references;
use super::rate_limiter::DomainRateLimiter;
use super::sets::ContextSets;
use super::types::{CacheStats, ContextError, FetchedText, SetSummary};

/// Main service that resolves `@tag` prompts to fetched web contexts
///
/// Holds the set registry, the on-disk cache and the rate-limited fetcher;
/// stateless between calls apart from those. Construct one per cache
/// directory; nothing here is a process-wide singleton.
pub struct WebContextService {
    sets: ContextSets,
    cache: Arc<FileCache>,
    fetcher: WebFetcher,
    config: WebContextConfig,
}

impl WebContextService {
    /// Create a service from configuration
    pub fn new(config: WebContextConfig) -> anyhow::Result<Self> {
        config.validate().map_err(anyhow::Error::msg)?;

        let sets = ContextSets::load(&config.sets_file);
        let cache = Arc::new(FileCache::new(&config.cache_dir, config.cache_ttl_secs)?);
        let rate_limiter = Arc::new(DomainRateLimiter::new(
            config.rate_limit_requests,
            config.rate_limit_window_secs,
        ));
        let fetcher = WebFetcher::new(&config, Arc::clone(&cache), rate_limiter)?;

        Ok(Self {
            sets,
            cache,
            fetcher,
            config,
        })
    }

    /// Fetch every context referenced by `@tags` in the prompt
    ///
    /// Returns a map of URL to extracted text containing only the URLs that
    /// were fetched successfully. Individual fetch failures are logged and
    /// skipped; this call never fails as a whole, and a prompt without tags
    /// returns an empty map with no network activity.
    pub async fn fetch_contexts_for_prompt(&self, prompt: &str) -> HashMap<String, String> {
        let set_names = extract_set_references(prompt, &self.sets);
        if set_names.is_empty() {
            debug!("No context sets found in prompt");
            return HashMap::new();
        }
        info!("Found context sets in prompt: {:?}", set_names);

        let mut all_urls = Vec::new();
        for name in &set_names {
            all_urls.extend(self.sets.resolve(name));
        }

        let unique_urls = dedup_preserving_order(all_urls);
        info!("Fetching {} unique URLs for context", unique_urls.len());

        let fetches = unique_urls
            .iter()
            .map(|url| self.fetcher.fetch(url, self.config.max_chars_per_url, false));

        let mut contexts = HashMap::new();
        for result in join_all(fetches).await {
            match result {
                Ok(fetched) => {
                    if !fetched.text.is_empty() {
                        contexts.insert(fetched.url, fetched.text);
                    }
                }
                Err(e) => {
                    warn!("Failed to fetch context: {}", e);
                }
            }
        }

        info!("Successfully fetched {} contexts", contexts.len());
        contexts
    }

    /// Fetch a single URL through the cache and rate limiter
    pub async fn fetch_url(&self, url: &str, force: bool) -> Result<FetchedText, ContextError> {
        self.fetcher
            .fetch(url, self.config.max_chars_per_url, force)
            .await
    }

    /// Statistics over the on-disk cache
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Delete every cache record, returning the number removed
    pub fn purge_cache(&self) -> usize {
        let count = self.cache.purge_all();
        info!("Cleared {} cache files", count);
        count
    }

    /// Delete the cache records belonging to one set, returning the number removed
    pub fn purge_set(&self, name: &str) -> usize {
        let urls = self.sets.resolve(name);
        let count = self.cache.purge_urls(&urls);
        info!("Purged {} cache files for set {}", count, name);
        count
    }

    /// All available sets with their resolved URL counts
    pub fn list_sets(&self) -> Vec<SetSummary> {
        self.sets
            .available_sets()
            .into_iter()
            .map(|name| {
                let url_count = self.sets.resolve(&name).len();
                SetSummary { name, url_count }
            })
            .collect()
    }

    /// The resolved URL list for one set
    pub fn set_urls(&self, name: &str) -> Vec<String> {
        self.sets.resolve(name)
    }

    /// Reload the set configuration from its file, returning the set count
    pub fn reload_sets(&self) -> usize {
        self.sets.reload()
    }

    /// The service configuration
    pub fn config(&self) -> &WebContextConfig {
        &self.config
    }
}

/// Deduplicate URLs keeping first-seen order
fn dedup_preserving_order(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for url in urls {
        if seen.insert(url.clone()) {
            unique.push(url);
        }
    }
    unique
}
