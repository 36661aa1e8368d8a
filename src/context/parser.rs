// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! `@tag` extraction from user prompts
//!
//! Scans free text for `@name` tokens referencing known context sets.

use tracing::debug;

use super::sets::{canonical_name, ContextSets};

/// Extract context-set references from prompt text
///
/// Tokenizes on whitespace, strips one trailing punctuation character, and
/// keeps `@`-prefixed tokens that name a known set. Unknown tags are skipped
/// (not an error). Names are returned in first-occurrence order, duplicates
/// included; deduplication happens later, at the URL level.
pub fn extract_set_references(prompt: &str, sets: &ContextSets) -> Vec<String> {
    let mut found = Vec::new();

    for word in prompt.split_whitespace() {
        let word = word
            .strip_suffix(['.', ',', '!', '?', ';', ':'])
            .unwrap_or(word);
        if !word.starts_with('@') || word.len() == 1 {
            continue;
        }
        if sets.contains(word) {
            found.push(canonical_name(word));
        } else {
            debug!("Unknown context set referenced: {}", word);
        }
    }

    found
}
