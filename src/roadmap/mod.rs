// src/roadmap/mod.rs

//! Build-dependency roadmap resolution
//!
//! Given one target source package, walk the full transitive BuildRequires
//! graph, classify every discovered package against current project state,
//! detect and order circular dependencies, and produce a deterministic,
//! explainable build plan.
//!
//! The resolver itself builds nothing and mutates nothing: it is a pure
//! graph-resolution and classification engine over the requirement index,
//! the rule store, the artifact registry, and the platform profile.

pub mod builder;
pub mod complexity;
pub mod cycles;
pub mod provider;
pub mod report;

use crate::artifacts::ArtifactRegistry;
use crate::error::Result;
use crate::index::{Index, DEFAULT_TIERS};
use crate::platform::Platform;
use crate::rules::RuleStore;
use provider::ProviderResolver;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// How a requirement or a discovered package relates to project state
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    strum_macros::Display,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Classification {
    /// Dropped by a conversion rule, a built-in incompatibility heuristic,
    /// or a roadmap exclusion category; never expanded
    Dropped,
    /// Satisfied by the target platform's sysroot; never built
    Sysroot,
    /// Build artifact exists and its rule declares a smoke test
    AlreadyBuiltVerified,
    /// Build artifact exists but no smoke test covers it
    AlreadyBuiltUnverified,
    /// Conversion rules are authored but the package is not built yet
    HasRules,
    /// Declared as sourced from a non-standard origin
    NonFedora,
    /// No rules, no artifact: conversion work is still needed
    NeedRules,
    /// No provider could be determined for the requirement
    Unresolvable,
}

/// Heuristic effort tier for packages that still need conversion rules
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// Everything the roadmap knows about one discovered source package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageInfo {
    pub name: String,
    pub classification: Classification,
    /// Effort estimate, populated for NeedRules packages
    pub complexity: Option<Complexity>,
    /// Position in the final build order
    pub build_order: Option<usize>,
    /// Resolved build dependencies (source package names, sorted, deduplicated)
    pub buildrequires: Vec<String>,
    /// Packages whose build depends on this one
    pub needed_by: Vec<String>,
    /// Human-readable annotation (non-standard origin, etc.)
    pub note: Option<String>,
}

impl PackageInfo {
    pub fn new(name: String, classification: Classification) -> Self {
        Self {
            name,
            classification,
            complexity: None,
            build_order: None,
            buildrequires: Vec::new(),
            needed_by: Vec::new(),
            note: None,
        }
    }
}

/// The resolved, classified, ordered build plan for one target package.
/// Immutable once returned from [`Roadmap::resolve`].
#[derive(Debug, Clone, Serialize)]
pub struct RoadmapResult {
    pub target: String,
    /// Every discovered, buildable source package
    pub packages: BTreeMap<String, PackageInfo>,
    /// Permutation of the keys of `packages`, dependencies first
    pub build_order: Vec<String>,
    /// Every strongly connected component of size >= 2, members sorted
    pub cycles: Vec<Vec<String>>,
    /// Requirement token -> reason it was dropped
    pub dropped: BTreeMap<String, String>,
    /// Requirement token -> reason no provider was found
    pub unresolvable: BTreeMap<String, String>,
    /// Requirement tokens satisfied by the platform sysroot
    pub sysroot: std::collections::BTreeSet<String>,
}

impl RoadmapResult {
    /// Package counts per classification
    pub fn summary(&self) -> BTreeMap<Classification, usize> {
        let mut counts = BTreeMap::new();
        for info in self.packages.values() {
            *counts.entry(info.classification).or_insert(0) += 1;
        }
        counts
    }
}

/// Traversal options
#[derive(Debug, Clone)]
pub struct RoadmapOptions {
    /// Bound on BFS depth (target is depth 0); `None` walks the full graph
    pub max_depth: Option<usize>,
    /// Do not expand past packages that already have conversion rules,
    /// keeping effort bounded to the frontier of still-unbuilt work
    pub stop_at_rules: bool,
    /// Metadata tier preference for index lookups, newest first
    pub tiers: Vec<String>,
}

impl Default for RoadmapOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            stop_at_rules: false,
            tiers: DEFAULT_TIERS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Roadmap resolver owning its caches and borrowing its collaborators.
///
/// One instance can resolve several targets; provider resolutions and
/// effective drop sets are memoized across calls.
pub struct Roadmap<'a> {
    index: &'a Index,
    provider: ProviderResolver<'a>,
    options: RoadmapOptions,
}

impl<'a> Roadmap<'a> {
    pub fn new(
        index: &'a Index,
        rules: &'a RuleStore,
        artifacts: &'a ArtifactRegistry,
        platform: &'a Platform,
    ) -> Self {
        Self::with_options(index, rules, artifacts, platform, RoadmapOptions::default())
    }

    pub fn with_options(
        index: &'a Index,
        rules: &'a RuleStore,
        artifacts: &'a ArtifactRegistry,
        platform: &'a Platform,
        options: RoadmapOptions,
    ) -> Self {
        let provider = ProviderResolver::new(index, rules, artifacts, platform, options.tiers.clone());
        Self {
            index,
            provider,
            options,
        }
    }

    /// Resolve the full transitive build plan for one target package
    pub fn resolve(&mut self, target: &str) -> Result<RoadmapResult> {
        if !self.index.knows_package(target)? {
            return Err(crate::Error::UnknownTarget(target.to_string()));
        }
        info!("Resolving build roadmap for {}", target);

        let build = builder::build_graph(self.index, &mut self.provider, target, &self.options)?;
        let (order, cycle_list) =
            cycles::order_packages(build.packages.keys().cloned().collect(), &build.edges);

        let mut packages = build.packages;
        for (position, name) in order.iter().enumerate() {
            if let Some(info) = packages.get_mut(name) {
                info.build_order = Some(position);
            }
        }

        info!(
            "Roadmap for {}: {} packages, {} cycles, {} dropped, {} unresolvable",
            target,
            packages.len(),
            cycle_list.len(),
            build.dropped.len(),
            build.unresolvable.len()
        );

        Ok(RoadmapResult {
            target: target.to_string(),
            packages,
            build_order: order,
            cycles: cycle_list,
            dropped: build.dropped,
            unresolvable: build.unresolvable,
            sysroot: build.sysroot,
        })
    }
}
