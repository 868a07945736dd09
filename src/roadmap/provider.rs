// src/roadmap/provider.rs

//! Provider resolution: one requirement token to one classification
//!
//! Precedence, first match wins:
//!
//! 1. rule-level drop (exact or glob match against the context package's
//!    effective drop set)
//! 2. built-in platform-incompatibility heuristics, independent of rules
//! 3. sysroot satisfaction
//! 4. index lookup by capability name (or file path), with drop and roadmap
//!    exclusion checks against the discovered source package, then
//!    classification of that package
//! 5. rich boolean-expression fallback: extract candidate simple tokens and
//!    retry the index resolution per candidate
//! 6. unresolvable
//!
//! All results are memoized per (context, token) on the resolver instance,
//! as are effective per-package drop sets, so batch validation across many
//! targets stays cheap. No process-wide state is involved.

use crate::artifacts::ArtifactRegistry;
use crate::error::Result;
use crate::index::Index;
use crate::platform::Platform;
use crate::roadmap::Classification;
use crate::rules::{DropRule, RuleStore};
use regex::Regex;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

/// Outcome of resolving one requirement token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Resolved providing source package, when one was determined
    pub source: Option<String>,
    pub classification: Classification,
    /// Human-readable explanation (matched rule, exclusion category, origin)
    pub detail: Option<String>,
}

impl Resolution {
    fn new(classification: Classification) -> Self {
        Self {
            source: None,
            classification,
            detail: None,
        }
    }

    fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Requirement families known to be meaningless on the target platform.
/// These fire regardless of rule content: the target has its own kernel,
/// no SELinux, no systemd, no audit framework, and no bpf tooling.
fn incompatible_family(token: &str) -> Option<&'static str> {
    const FAMILIES: &[(&str, &[&str])] = &[
        ("kernel", &["kernel", "kmod"]),
        (
            "security-module",
            &["libselinux", "libsepol", "selinux-policy", "checkpolicy"],
        ),
        ("init-system", &["systemd"]),
        ("audit", &["audit"]),
        (
            "hardware-tracing",
            &["libbpf", "bpftool", "systemtap", "lttng-ust", "babeltrace"],
        ),
    ];

    for (family, names) in FAMILIES {
        for name in *names {
            if token == *name || token.starts_with(&format!("{name}-")) {
                return Some(family);
            }
        }
    }
    None
}

/// Keywords of the rich boolean dependency syntax; never candidates
const EXPRESSION_KEYWORDS: &[&str] = &["with", "or", "if", "unless", "without", "and", "else"];

/// Classifies requirement tokens against project state.
///
/// Owns its memo caches; collaborators are injected and borrowed immutably,
/// so one resolution run never observes two different snapshots.
pub struct ProviderResolver<'a> {
    index: &'a Index,
    rules: &'a RuleStore,
    artifacts: &'a ArtifactRegistry,
    platform: &'a Platform,
    tiers: Vec<String>,
    /// (context package, requirement token) -> resolution
    memo: HashMap<(String, String), Resolution>,
    /// context package -> effective drop set
    drop_memo: HashMap<String, Rc<Vec<DropRule>>>,
    candidate_re: Regex,
}

impl<'a> ProviderResolver<'a> {
    pub fn new(
        index: &'a Index,
        rules: &'a RuleStore,
        artifacts: &'a ArtifactRegistry,
        platform: &'a Platform,
        tiers: Vec<String>,
    ) -> Self {
        // Candidate tokens inside a rich expression: function-call-style
        // capability names, absolute file paths, then bare identifiers.
        let candidate_re =
            Regex::new(r"[A-Za-z0-9_.+-]+\([^()]*\)|/[A-Za-z0-9_./+-]+|[A-Za-z0-9_.+-]+")
                .expect("candidate regex is valid");
        Self {
            index,
            rules,
            artifacts,
            platform,
            tiers,
            memo: HashMap::new(),
            drop_memo: HashMap::new(),
            candidate_re,
        }
    }

    /// Effective drop set for a context package, memoized: generic drops,
    /// drops of every referenced class, and package-specific drops.
    pub fn effective_drops(&mut self, context: &str) -> Rc<Vec<DropRule>> {
        if let Some(drops) = self.drop_memo.get(context) {
            return Rc::clone(drops);
        }
        let drops = Rc::new(self.rules.effective_drops(context));
        self.drop_memo.insert(context.to_string(), Rc::clone(&drops));
        drops
    }

    /// Resolve one requirement token in the context of the package that
    /// declared it. Stable for the lifetime of this resolver instance.
    pub fn resolve(&mut self, token: &str, context: &str) -> Result<Resolution> {
        let key = (context.to_string(), token.to_string());
        if let Some(resolution) = self.memo.get(&key) {
            return Ok(resolution.clone());
        }

        let resolution = self.resolve_uncached(token, context)?;
        trace!(
            "{} (for {}) -> {}",
            token,
            context,
            resolution.classification
        );
        self.memo.insert(key, resolution.clone());
        Ok(resolution)
    }

    fn resolve_uncached(&mut self, token: &str, context: &str) -> Result<Resolution> {
        // 1. Rule-level drop
        let drops = self.effective_drops(context);
        if let Some(rule) = drops.iter().find(|rule| rule.matches(token)) {
            return Ok(Resolution::new(Classification::Dropped)
                .with_detail(format!("dropped by rule '{}'", rule.text)));
        }

        // 2. Built-in platform-incompatibility heuristics
        if let Some(family) = incompatible_family(token) {
            return Ok(Resolution::new(Classification::Dropped)
                .with_detail(format!("platform-incompatible ({family} family)")));
        }

        // 3. Sysroot satisfaction
        if self.platform.satisfies_sysroot(token) {
            return Ok(Resolution::new(Classification::Sysroot));
        }

        // 4. Index lookup; a versioned token ("zlib-devel >= 1.2.11") is
        // retried by its capability name when the raw form has no provider
        if let Some(resolution) = self.resolve_via_index(token, &drops)? {
            return Ok(resolution);
        }
        if let Some(name) = versioned_name(token) {
            if let Some(resolution) = self.resolve_via_index(name, &drops)? {
                return Ok(resolution);
            }
        }

        // 5. Rich-expression fallback
        if looks_like_expression(token) {
            for candidate in self.extract_candidates(token) {
                if let Some(resolution) = self.resolve_via_index(&candidate, &drops)? {
                    return Ok(resolution);
                }
            }
            return Ok(Resolution::new(Classification::Unresolvable)
                .with_detail("no candidate of the rich expression resolved".to_string()));
        }

        // 6. Nothing matched
        Ok(Resolution::new(Classification::Unresolvable)
            .with_detail("no provider found".to_string()))
    }

    /// Steps 4a-4c: look the token up in the index, vet the discovered
    /// source package against drops and roadmap exclusions, classify it.
    fn resolve_via_index(&self, token: &str, drops: &[DropRule]) -> Result<Option<Resolution>> {
        let tiers: Vec<&str> = self.tiers.iter().map(|t| t.as_str()).collect();
        let providers = if token.starts_with('/') {
            self.index.provides_by_file(token, &tiers)?
        } else {
            self.index.provides_by_name(token, &tiers)?
        };

        let Some((source, _tier)) = providers.into_iter().next() else {
            return Ok(None);
        };

        // 4a. The providing source package itself matches a drop glob
        if let Some(rule) = drops.iter().find(|rule| rule.matches(&source)) {
            return Ok(Some(
                Resolution::new(Classification::Dropped)
                    .with_source(&source)
                    .with_detail(format!("provider {} dropped by rule '{}'", source, rule.text)),
            ));
        }

        // 4b. Roadmap exclusion category
        if let Some(category) = self.platform.roadmap_drop_category(&source) {
            return Ok(Some(
                Resolution::new(Classification::Dropped)
                    .with_source(&source)
                    .with_detail(format!(
                        "provider {source} excluded by roadmap category '{category}'"
                    )),
            ));
        }

        // 4c. Classify the found package
        let (classification, detail) = self.classify_package(&source);
        let mut resolution = Resolution::new(classification).with_source(&source);
        if let Some(detail) = detail {
            resolution = resolution.with_detail(detail);
        }
        Ok(Some(resolution))
    }

    /// Classify a known source package against project state
    pub fn classify_package(&self, name: &str) -> (Classification, Option<String>) {
        if self.artifacts.is_built(name) {
            if self.artifacts.has_smoke_test(name) {
                (Classification::AlreadyBuiltVerified, None)
            } else {
                (Classification::AlreadyBuiltUnverified, None)
            }
        } else if self.rules.has_rules(name) {
            (Classification::HasRules, None)
        } else if let Some(origin) = self.platform.nonfedora_source(name) {
            (
                Classification::NonFedora,
                Some(format!("sourced from: {origin}")),
            )
        } else {
            (Classification::NeedRules, None)
        }
    }

    /// Best-effort scan for simple sub-tokens of a rich boolean expression.
    ///
    /// This is deliberately not a boolean evaluator: it over-approximates
    /// which sub-tokens may be needed (an `unless` branch is scanned like an
    /// `and` branch), matching the roadmap outputs the project already
    /// depends on. Keywords and version literals are skipped.
    fn extract_candidates(&self, token: &str) -> Vec<String> {
        self.candidate_re
            .find_iter(token)
            .map(|m| m.as_str().to_string())
            .filter(|t| !EXPRESSION_KEYWORDS.contains(&t.as_str()))
            .filter(|t| !t.chars().next().is_some_and(|c| c.is_ascii_digit()))
            .collect()
    }
}

/// The capability name of a versioned requirement (`name >= version`),
/// or `None` when the token is not of that shape
fn versioned_name(token: &str) -> Option<&str> {
    let mut words = token.split_whitespace();
    let name = words.next()?;
    let op = words.next()?;
    matches!(op, "<" | "<=" | "=" | "==" | ">=" | ">").then_some(name)
}

/// Whether a token uses the rich boolean dependency syntax
fn looks_like_expression(token: &str) -> bool {
    if token.starts_with('(') {
        return true;
    }
    token
        .split_whitespace()
        .any(|word| EXPRESSION_KEYWORDS.contains(&word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn empty_state() -> (RuleStore, ArtifactRegistry, Platform) {
        (RuleStore::empty(), ArtifactRegistry::empty(), Platform::empty())
    }

    fn tiers() -> Vec<String> {
        vec!["updates".to_string(), "base".to_string()]
    }

    #[test]
    fn test_builtin_heuristic_fires_with_empty_rules() {
        let index = Index::open_in_memory().unwrap();
        let (rules, artifacts, platform) = empty_state();
        let mut resolver = ProviderResolver::new(&index, &rules, &artifacts, &platform, tiers());

        let resolution = resolver.resolve("kernel-headers", "zlib-ng").unwrap();
        assert_eq!(resolution.classification, Classification::Dropped);
        assert!(resolution.detail.unwrap().contains("kernel family"));

        let resolution = resolver.resolve("systemd-rpm-macros", "zlib-ng").unwrap();
        assert_eq!(resolution.classification, Classification::Dropped);

        // Prefix matching does not swallow unrelated names
        let resolution = resolver.resolve("kernelpanic-sim", "zlib-ng").unwrap();
        assert_ne!(resolution.classification, Classification::Dropped);
    }

    #[test]
    fn test_index_hit_classification_chain() {
        let index = Index::open_in_memory().unwrap();
        index.add_provides("zlib-devel", "zlib-ng", "base").unwrap();
        index.add_provides("glib2-devel", "glib2", "base").unwrap();
        index.add_provides("vendor-sdk", "openjdk-legacy", "base").unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("packages")).unwrap();
        std::fs::write(
            dir.path().join("packages/glib2.toml"),
            "smoke_test = true\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("packages/zlib-ng.toml"), "").unwrap();
        let rules = RuleStore::load(dir.path()).unwrap();

        let built: BTreeSet<String> = ["glib2".to_string()].into_iter().collect();
        let artifacts = ArtifactRegistry::from_built(built, &rules);

        let platform_path = dir.path().join("platform.toml");
        std::fs::write(&platform_path, "[nonfedora]\nopenjdk-legacy = \"vendor drop\"\n").unwrap();
        let platform = Platform::load(&platform_path).unwrap();

        let mut resolver = ProviderResolver::new(&index, &rules, &artifacts, &platform, tiers());

        // Built + smoke test
        let r = resolver.resolve("glib2-devel", "ctx").unwrap();
        assert_eq!(r.classification, Classification::AlreadyBuiltVerified);
        assert_eq!(r.source.as_deref(), Some("glib2"));

        // Rules but no artifact
        let r = resolver.resolve("zlib-devel", "ctx").unwrap();
        assert_eq!(r.classification, Classification::HasRules);

        // Non-standard origin
        let r = resolver.resolve("vendor-sdk", "ctx").unwrap();
        assert_eq!(r.classification, Classification::NonFedora);
        assert!(r.detail.unwrap().contains("vendor drop"));

        // Unknown capability
        let r = resolver.resolve("no-such-capability", "ctx").unwrap();
        assert_eq!(r.classification, Classification::Unresolvable);
    }

    #[test]
    fn test_drop_rule_precedes_sysroot_and_index() {
        let index = Index::open_in_memory().unwrap();
        index.add_provides("zlib-devel", "zlib-ng", "base").unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("generic.toml"),
            "drop_buildrequires = [\"zlib-*\"]\n",
        )
        .unwrap();
        let rules = RuleStore::load(dir.path()).unwrap();
        let artifacts = ArtifactRegistry::empty();
        let platform = Platform::empty();

        let mut resolver = ProviderResolver::new(&index, &rules, &artifacts, &platform, tiers());
        let r = resolver.resolve("zlib-devel", "ctx").unwrap();
        assert_eq!(r.classification, Classification::Dropped);
        assert!(r.detail.unwrap().contains("zlib-*"));
    }

    #[test]
    fn test_provider_dropped_by_source_glob() {
        let index = Index::open_in_memory().unwrap();
        index.add_provides("qt5-qtbase-devel", "qt5-qtbase", "base").unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("generic.toml"),
            "drop_buildrequires = [\"qt5*\"]\n",
        )
        .unwrap();
        let rules = RuleStore::load(dir.path()).unwrap();
        let artifacts = ArtifactRegistry::empty();
        let platform = Platform::empty();

        let mut resolver = ProviderResolver::new(&index, &rules, &artifacts, &platform, tiers());
        // Token itself matches the glob in step 1; try one that only the
        // source matches
        let r = resolver.resolve("pkgconfig(Qt5Core)", "ctx").unwrap();
        assert_eq!(r.classification, Classification::Unresolvable);

        index.add_provides("pkgconfig(Qt5Core)", "qt5-qtbase", "base").unwrap();
        let mut resolver = ProviderResolver::new(&index, &rules, &artifacts, &platform, tiers());
        let r = resolver.resolve("pkgconfig(Qt5Core)", "ctx").unwrap();
        assert_eq!(r.classification, Classification::Dropped);
        assert_eq!(r.source.as_deref(), Some("qt5-qtbase"));
    }

    #[test]
    fn test_versioned_token_resolves_by_capability_name() {
        let index = Index::open_in_memory().unwrap();
        index.add_provides("zlib-devel", "zlib-ng", "updates").unwrap();

        let (rules, artifacts, platform) = empty_state();
        let mut resolver = ProviderResolver::new(&index, &rules, &artifacts, &platform, tiers());

        let r = resolver.resolve("zlib-devel >= 1.2.11", "ctx").unwrap();
        assert_eq!(r.classification, Classification::NeedRules);
        assert_eq!(r.source.as_deref(), Some("zlib-ng"));

        // A comparison clause alone does not make a resolvable token
        let r = resolver.resolve("no-such >= 1.0", "ctx").unwrap();
        assert_eq!(r.classification, Classification::Unresolvable);
    }

    #[test]
    fn test_rich_expression_fallback() {
        let index = Index::open_in_memory().unwrap();
        index.add_provides("pkgconfig(libffi)", "libffi", "base").unwrap();

        let (rules, artifacts, platform) = empty_state();
        let mut resolver = ProviderResolver::new(&index, &rules, &artifacts, &platform, tiers());

        let r = resolver
            .resolve("(pkgconfig(libffi) >= 3.0 with pkgconfig(libffi) < 4.0)", "ctx")
            .unwrap();
        assert_eq!(r.classification, Classification::NeedRules);
        assert_eq!(r.source.as_deref(), Some("libffi"));

        // Expression where no candidate resolves
        let r = resolver.resolve("(foo if bar)", "ctx").unwrap();
        assert_eq!(r.classification, Classification::Unresolvable);
    }

    #[test]
    fn test_candidate_extraction() {
        let index = Index::open_in_memory().unwrap();
        let (rules, artifacts, platform) = empty_state();
        let resolver = ProviderResolver::new(&index, &rules, &artifacts, &platform, tiers());

        let candidates =
            resolver.extract_candidates("(pkgconfig(gl) >= 1.2 or /usr/bin/m4 unless cmake)");
        assert_eq!(
            candidates,
            vec![
                "pkgconfig(gl)".to_string(),
                "/usr/bin/m4".to_string(),
                "cmake".to_string()
            ]
        );
    }

    #[test]
    fn test_memoized_resolution_is_stable() {
        let index = Index::open_in_memory().unwrap();
        index.add_provides("m4", "m4", "base").unwrap();
        let (rules, artifacts, platform) = empty_state();
        let mut resolver = ProviderResolver::new(&index, &rules, &artifacts, &platform, tiers());

        let first = resolver.resolve("m4", "ctx").unwrap();
        let second = resolver.resolve("m4", "ctx").unwrap();
        assert_eq!(first, second);
    }
}
