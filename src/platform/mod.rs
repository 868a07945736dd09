// src/platform/mod.rs

//! Static target-platform knowledge
//!
//! One TOML profile describes everything the target platform brings along
//! on its own: the sysroot (capabilities, files, and libraries that exist on
//! the platform and are never built), the map of packages sourced from
//! non-standard origins, and named glob categories of packages excluded from
//! every roadmap.
//!
//! ```toml
//! [sysroot]
//! capabilities = ["glibc-devel", "libgcc"]
//! files = ["/usr/bin/sh", "/usr/bin/awk"]
//! libraries = ["libc.so.6", "libm.so.6"]
//!
//! [nonfedora]
//! openjdk-legacy = "vendor SDK drop"
//!
//! [[roadmap_drop]]
//! name = "desktop"
//! patterns = ["gnome-*", "kde-*", "*-fonts"]
//! ```
//!
//! A missing profile is not an error: the resolver degrades to an empty
//! sysroot and no exclusions.

use crate::error::{Error, Result};
use glob::Pattern;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Raw on-disk shape of the profile
#[derive(Debug, Default, Deserialize)]
struct ProfileFile {
    #[serde(default)]
    sysroot: SysrootSection,
    #[serde(default)]
    nonfedora: BTreeMap<String, String>,
    #[serde(default, rename = "roadmap_drop")]
    roadmap_drops: Vec<DropSection>,
}

#[derive(Debug, Default, Deserialize)]
struct SysrootSection {
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(default)]
    files: Vec<String>,
    #[serde(default)]
    libraries: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DropSection {
    name: String,
    #[serde(default)]
    patterns: Vec<String>,
}

/// Loaded, validated platform profile
#[derive(Debug, Default)]
pub struct Platform {
    capabilities: BTreeSet<String>,
    files: BTreeSet<String>,
    libraries: BTreeSet<String>,
    nonfedora: BTreeMap<String, String>,
    roadmap_drops: Vec<(String, Vec<Pattern>)>,
}

impl Platform {
    /// An empty profile (nothing pre-satisfied, nothing excluded)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the profile from a TOML file; a missing file yields an empty
    /// profile, a malformed one is rejected.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            warn!(
                "Platform profile {} not found, using empty profile",
                path.display()
            );
            return Ok(Self::empty());
        }

        let text = fs::read_to_string(path)?;
        let file: ProfileFile = toml::from_str(&text).map_err(|source| Error::ProfileParse {
            path: path.display().to_string(),
            source,
        })?;

        let mut roadmap_drops = Vec::new();
        for section in file.roadmap_drops {
            let mut patterns = Vec::new();
            for text in &section.patterns {
                let pattern = Pattern::new(text).map_err(|source| Error::Pattern {
                    pattern: text.clone(),
                    source,
                })?;
                patterns.push(pattern);
            }
            roadmap_drops.push((section.name, patterns));
        }

        let platform = Self {
            capabilities: file.sysroot.capabilities.into_iter().collect(),
            files: file.sysroot.files.into_iter().collect(),
            libraries: file.sysroot.libraries.into_iter().collect(),
            nonfedora: file.nonfedora,
            roadmap_drops,
        };
        debug!(
            "Loaded platform profile: {} capabilities, {} files, {} libraries, {} exclusion categories",
            platform.capabilities.len(),
            platform.files.len(),
            platform.libraries.len(),
            platform.roadmap_drops.len()
        );
        Ok(platform)
    }

    /// Whether the sysroot satisfies a requirement token: exact capability,
    /// exact file path, or a library name optionally followed by a versioned
    /// or tagged suffix (`libc.so.6` also satisfies `libc.so.6(GLIBC_2.4)`).
    pub fn satisfies_sysroot(&self, token: &str) -> bool {
        if self.capabilities.contains(token) || self.files.contains(token) {
            return true;
        }
        self.libraries
            .iter()
            .any(|lib| token == lib || token.starts_with(&format!("{lib}(")))
    }

    /// Non-standard origin declared for a source package, if any
    pub fn nonfedora_source(&self, name: &str) -> Option<&str> {
        self.nonfedora.get(name).map(|s| s.as_str())
    }

    /// Name of the roadmap exclusion category matching a source package
    pub fn roadmap_drop_category(&self, name: &str) -> Option<&str> {
        self.roadmap_drops
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| p.matches(name)))
            .map(|(category, _)| category.as_str())
    }
}
