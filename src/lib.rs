// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod config;
pub mod context;

pub use config::WebContextConfig;
pub use context::{
    CacheStats, ContextError, ContextSets, DomainRateLimiter, FetchedText, FileCache, SetSummary,
    WebContextService, WebFetcher,
};
