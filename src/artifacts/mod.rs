// src/artifacts/mod.rs

//! Built-package registry
//!
//! Tracks which source packages already have build artifacts for the target
//! platform, and which of those are verified by a smoke test. Artifacts live
//! one directory per source package under the artifact root; smoke-test
//! verification comes from the package's conversion rule.

use crate::error::Result;
use crate::rules::RuleStore;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Registry of already-built source packages
#[derive(Debug, Default)]
pub struct ArtifactRegistry {
    built: BTreeSet<String>,
    verified: BTreeSet<String>,
}

impl ArtifactRegistry {
    /// An empty registry (nothing built yet)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Scan an artifact root: every subdirectory is a built source package.
    /// A missing root is not an error, just an empty registry.
    pub fn scan<P: AsRef<Path>>(root: P, rules: &RuleStore) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            warn!(
                "Artifact directory {} not found, treating nothing as built",
                root.display()
            );
            return Ok(Self::empty());
        }

        let mut built = BTreeSet::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    built.insert(name.to_string());
                }
            }
        }

        debug!("Found {} built packages under {}", built.len(), root.display());
        Ok(Self::from_built(built, rules))
    }

    /// Build a registry from an explicit set of built package names,
    /// deriving the verified subset from the rule store.
    pub fn from_built(built: BTreeSet<String>, rules: &RuleStore) -> Self {
        let verified = built
            .iter()
            .filter(|name| rules.has_smoke_test(name))
            .cloned()
            .collect();
        Self { built, verified }
    }

    /// Whether a build artifact exists for this source package
    pub fn is_built(&self, name: &str) -> bool {
        self.built.contains(name)
    }

    /// Whether the built artifact is covered by a smoke test
    pub fn has_smoke_test(&self, name: &str) -> bool {
        self.verified.contains(name)
    }

    /// Number of built packages
    pub fn len(&self) -> usize {
        self.built.len()
    }

    pub fn is_empty(&self) -> bool {
        self.built.is_empty()
    }
}
