// src/rules/mod.rs

//! Conversion rule store
//!
//! Rules are authored TOML files layered in three levels:
//!
//! - `generic.toml` — drops applied to every package
//! - `classes/<name>.toml` — drops shared by a family of packages (a package
//!   opts in by listing the class in its own rule file)
//! - `packages/<name>.toml` — per-package rules: referenced classes, extra
//!   drops, and whether the package's build is verified by a smoke test
//!
//! A missing rule directory or missing file is not an error: the store
//! degrades to empty defaults and every unknown package classifies as
//! needing rules. Malformed TOML and invalid glob patterns are rejected at
//! load time so match sites never have to handle them.

use crate::error::{Error, Result};
use glob::Pattern;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// One drop entry: the authored text plus its compiled glob form.
///
/// Plain names compile to patterns that only match themselves, so a single
/// match path covers both exact entries and wildcard entries.
#[derive(Debug, Clone)]
pub struct DropRule {
    pub text: String,
    pattern: Pattern,
}

impl DropRule {
    pub fn new(text: &str) -> Result<Self> {
        let pattern = Pattern::new(text).map_err(|source| Error::Pattern {
            pattern: text.to_string(),
            source,
        })?;
        Ok(Self {
            text: text.to_string(),
            pattern,
        })
    }

    /// Exact or glob match against a requirement token or source name
    pub fn matches(&self, token: &str) -> bool {
        self.text == token || self.pattern.matches(token)
    }
}

/// Per-package rule record
#[derive(Debug, Clone, Default)]
pub struct PackageRules {
    /// Rule classes this package inherits drops from
    pub classes: Vec<String>,
    /// Package-specific drops
    pub drop_buildrequires: Vec<DropRule>,
    /// Whether the conversion declares a smoke test for the built artifact
    pub smoke_test: bool,
}

/// Raw on-disk shape of a rule file
#[derive(Debug, Default, Deserialize)]
struct RuleFile {
    #[serde(default)]
    classes: Vec<String>,
    #[serde(default)]
    drop_buildrequires: Vec<String>,
    #[serde(default)]
    smoke_test: bool,
}

/// Loaded, validated rule data for the whole project
#[derive(Debug, Default)]
pub struct RuleStore {
    generic_drops: Vec<DropRule>,
    class_drops: BTreeMap<String, Vec<DropRule>>,
    packages: BTreeMap<String, PackageRules>,
}

impl RuleStore {
    /// An empty store (used when no rule directory is configured)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load all rule files under `dir`. A missing directory yields an empty
    /// store; files that exist must parse.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            warn!("Rule directory {} not found, using empty rules", dir.display());
            return Ok(Self::empty());
        }

        let mut store = Self::empty();

        let generic = dir.join("generic.toml");
        if generic.is_file() {
            let file = parse_rule_file(&generic)?;
            store.generic_drops = compile_drops(&file.drop_buildrequires)?;
        }

        for (name, file) in load_rule_dir(&dir.join("classes"))? {
            store
                .class_drops
                .insert(name, compile_drops(&file.drop_buildrequires)?);
        }

        for (name, file) in load_rule_dir(&dir.join("packages"))? {
            store.packages.insert(
                name,
                PackageRules {
                    classes: file.classes,
                    drop_buildrequires: compile_drops(&file.drop_buildrequires)?,
                    smoke_test: file.smoke_test,
                },
            );
        }

        debug!(
            "Loaded rules: {} generic drops, {} classes, {} packages",
            store.generic_drops.len(),
            store.class_drops.len(),
            store.packages.len()
        );
        Ok(store)
    }

    /// Drops applied to every package
    pub fn generic_drops(&self) -> &[DropRule] {
        &self.generic_drops
    }

    /// Drops shared by a rule class, if the class exists
    pub fn class_drops(&self, class: &str) -> Option<&[DropRule]> {
        self.class_drops.get(class).map(|v| v.as_slice())
    }

    /// Per-package rule record, if one was authored
    pub fn package(&self, name: &str) -> Option<&PackageRules> {
        self.packages.get(name)
    }

    /// Whether any conversion rules exist for this package
    pub fn has_rules(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Whether the package's rule declares a smoke test
    pub fn has_smoke_test(&self, name: &str) -> bool {
        self.packages.get(name).is_some_and(|r| r.smoke_test)
    }

    /// Effective drop set for one package: generic drops, drops of every
    /// class the package references, and the package's own drops, deduplicated
    /// by authored text. Unknown class references are ignored.
    pub fn effective_drops(&self, name: &str) -> Vec<DropRule> {
        let mut seen = BTreeSet::new();
        let mut drops = Vec::new();

        let mut push_all = |rules: &[DropRule], drops: &mut Vec<DropRule>| {
            for rule in rules {
                if seen.insert(rule.text.clone()) {
                    drops.push(rule.clone());
                }
            }
        };

        push_all(&self.generic_drops, &mut drops);
        if let Some(pkg) = self.packages.get(name) {
            for class in &pkg.classes {
                if let Some(class_drops) = self.class_drops.get(class) {
                    push_all(class_drops, &mut drops);
                }
            }
            push_all(&pkg.drop_buildrequires, &mut drops);
        }

        drops
    }
}

fn parse_rule_file(path: &Path) -> Result<RuleFile> {
    let text = fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|source| Error::RuleParse {
        path: path.display().to_string(),
        source,
    })
}

/// Load every `*.toml` under a directory, keyed by file stem
fn load_rule_dir(dir: &Path) -> Result<Vec<(String, RuleFile)>> {
    let mut entries = Vec::new();
    if !dir.is_dir() {
        return Ok(entries);
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "toml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                entries.push((stem.to_string(), parse_rule_file(&path)?));
            }
        }
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

fn compile_drops(texts: &[String]) -> Result<Vec<DropRule>> {
    texts.iter().map(|t| DropRule::new(t)).collect()
}
