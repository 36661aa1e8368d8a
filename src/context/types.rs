// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for the web-context engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Text fetched (or served from cache) for a single URL
///
/// Only produced for successful fetches; a failed URL yields an error, never
/// an empty `FetchedText`.
#[derive(Debug, Clone)]
pub struct FetchedText {
    /// Source URL
    pub url: String,
    /// Extracted text, truncated to the caller's character budget
    pub text: String,
    /// Character count of the extracted text before truncation
    pub length: usize,
}

/// Statistics over the on-disk cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of cache records on disk
    pub file_count: usize,
    /// Total size of all records in bytes
    pub total_size_bytes: u64,
    /// Age of the oldest record in hours, if any records exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_file_age_hours: Option<f64>,
    /// Age of the newest record in hours, if any records exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_file_age_hours: Option<f64>,
}

/// A named context set with its resolved URL count
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSummary {
    /// Canonical set name (with the `@` marker)
    pub name: String,
    /// Number of URLs the set resolves to
    pub url_count: usize,
}

/// Errors that can occur while fetching web context
#[derive(Debug, Error)]
pub enum ContextError {
    /// URL could not be parsed or uses an unsupported scheme
    #[error("Invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL
        url: String,
    },

    /// Per-domain rate limit exhausted after the backoff re-check
    #[error("Rate limit exceeded for domain: {domain}")]
    RateLimited {
        /// Domain whose window is full
        domain: String,
    },

    /// Server answered with a non-success status
    #[error("HTTP {status} for: {url}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// The fetched URL
        url: String,
    },

    /// Request timed out
    #[error("Timeout fetching: {url}")]
    Timeout {
        /// The fetched URL
        url: String,
    },

    /// Transport-level failure (connect, TLS, body read)
    #[error("Transport error for {url}: {message}")]
    Transport {
        /// The fetched URL
        url: String,
        /// Underlying error description
        message: String,
    },

    /// Cache read/write failure
    #[error("Cache I/O error: {message}")]
    CacheIo {
        /// Underlying error description
        message: String,
    },
}
