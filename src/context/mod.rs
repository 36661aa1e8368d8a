// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Web-context caching and retrieval engine
//!
//! Resolves `@name` references in prompt text to URL lists, fetches the
//! pages subject to a per-domain rate limit, and serves extracted text from
//! a TTL-bound on-disk cache.
//!
//! ## Architecture
//!
//! ```text
//! Prompt text → parser → set names → sets (recursive resolve) → URLs
//!                                                                 ↓
//!            URL → text map ← fetcher (rate limited) ← FileCache (14d TTL)
//! ```
//!
//! Key features:
//! - Recursive set-of-sets expansion with cycle protection
//! - Sliding-window rate limiting per domain
//! - Content-addressed file cache with mtime-based expiry
//! - Graceful degradation: one unreachable URL never fails the whole call

pub mod cache;
pub mod extractor;
pub mod fetcher;
pub mod parser;
pub mod rate_limiter;
pub mod sets;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use cache::FileCache;
pub use fetcher::WebFetcher;
pub use rate_limiter::DomainRateLimiter;
pub use service::WebContextService;
pub use sets::ContextSets;
pub use types::{CacheStats, ContextError, FetchedText, SetSummary};
