// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Named context sets and recursive set resolution
//!
//! Sets are loaded wholesale from a JSON configuration file mapping set
//! names to entries. An entry is either a literal URL or an `@name`
//! reference to another set; resolution follows references recursively with
//! ancestor-chain cycle protection.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Definition of a single context set
///
/// Accepts both configuration shapes: a bare array of entries, or a record
/// carrying the entries in a `urls` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SetDefinition {
    /// Bare array form: `["https://a", "@other"]`
    Entries(Vec<String>),
    /// Record form: `{"urls": ["https://a", "@other"], ...}`
    Record {
        /// The set's entries
        #[serde(default)]
        urls: Vec<String>,
    },
}

impl SetDefinition {
    fn entries(&self) -> &[String] {
        match self {
            SetDefinition::Entries(entries) => entries,
            SetDefinition::Record { urls } => urls,
        }
    }
}

/// Registry of named context sets backed by a JSON configuration file
///
/// The mapping is immutable between reloads; `reload` atomically replaces
/// the whole snapshot.
pub struct ContextSets {
    sets_file: PathBuf,
    sets: RwLock<HashMap<String, SetDefinition>>,
}

impl ContextSets {
    /// Load the registry from the given configuration file
    ///
    /// A missing or unparsable file degrades to an empty registry; it is
    /// logged, not fatal.
    pub fn load(sets_file: impl Into<PathBuf>) -> Self {
        let sets_file = sets_file.into();
        let sets = load_sets_file(&sets_file);
        Self {
            sets_file,
            sets: RwLock::new(sets),
        }
    }

    /// Re-read the configuration file, replacing the current snapshot
    ///
    /// Returns the number of sets loaded.
    pub fn reload(&self) -> usize {
        let loaded = load_sets_file(&self.sets_file);
        let count = loaded.len();
        if let Ok(mut sets) = self.sets.write() {
            *sets = loaded;
        }
        count
    }

    /// Whether a set with this name exists (with or without the `@` marker)
    pub fn contains(&self, name: &str) -> bool {
        let Ok(sets) = self.sets.read() else {
            return false;
        };
        let canonical = canonical_name(name);
        sets.contains_key(&canonical) || sets.contains_key(bare_name(&canonical))
    }

    /// Resolve a set to its flat URL list
    ///
    /// Follows `@name` references recursively. URLs are returned in the
    /// order encountered; a URL reachable along several paths appears once
    /// per path (deduplication is the orchestrator's job). A reference back
    /// into the current ancestor chain is a cycle and contributes nothing;
    /// the same sub-set reached from sibling branches is not a cycle.
    pub fn resolve(&self, name: &str) -> Vec<String> {
        let Ok(sets) = self.sets.read() else {
            return Vec::new();
        };
        resolve_inner(&sets, name, &HashSet::new())
    }

    /// All set names as stored in the configuration, sorted
    pub fn available_sets(&self) -> Vec<String> {
        let Ok(sets) = self.sets.read() else {
            return Vec::new();
        };
        let mut names: Vec<String> = sets.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of sets in the registry
    pub fn len(&self) -> usize {
        self.sets.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Whether the registry holds no sets
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Canonical form of a set name: always carrying the `@` marker
pub(crate) fn canonical_name(name: &str) -> String {
    if name.starts_with('@') {
        name.to_string()
    } else {
        format!("@{}", name)
    }
}

fn bare_name(canonical: &str) -> &str {
    canonical.trim_start_matches('@')
}

fn load_sets_file(path: &Path) -> HashMap<String, SetDefinition> {
    if !path.exists() {
        warn!("Context sets file not found: {}", path.display());
        return HashMap::new();
    }
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            error!("Failed to read context sets from {}: {}", path.display(), e);
            return HashMap::new();
        }
    };
    match serde_json::from_str::<HashMap<String, SetDefinition>>(&raw) {
        Ok(sets) => {
            info!("Loaded {} context sets from {}", sets.len(), path.display());
            sets
        }
        Err(e) => {
            error!("Failed to parse context sets {}: {}", path.display(), e);
            HashMap::new()
        }
    }
}

fn lookup<'a>(
    sets: &'a HashMap<String, SetDefinition>,
    canonical: &str,
) -> Option<&'a SetDefinition> {
    sets.get(canonical).or_else(|| sets.get(bare_name(canonical)))
}

fn resolve_inner(
    sets: &HashMap<String, SetDefinition>,
    name: &str,
    seen: &HashSet<String>,
) -> Vec<String> {
    let canonical = canonical_name(name);
    if seen.contains(&canonical) {
        warn!("Circular reference detected in context set: {}", canonical);
        return Vec::new();
    }

    let Some(definition) = lookup(sets, &canonical) else {
        warn!("Unknown context set: {}", canonical);
        return Vec::new();
    };

    // Each branch carries its own copy of the ancestor chain so sibling
    // branches can share sub-sets without tripping cycle detection.
    let mut seen = seen.clone();
    seen.insert(canonical.clone());

    let mut resolved = Vec::new();
    for entry in definition.entries() {
        if entry.is_empty() {
            warn!("Empty entry in context set {}", canonical);
            continue;
        }
        if entry.starts_with('@') {
            resolved.extend(resolve_inner(sets, entry, &seen));
        } else {
            resolved.push(entry.clone());
        }
    }
    resolved
}
