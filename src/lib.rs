// src/lib.rs

//! Relic - Legacy Platform Porting Planner
//!
//! Relic plans the porting of a large corpus of Linux source packages to a
//! foreign, obsolete target platform. Its core is the build-dependency
//! roadmap resolver: given one target source package it walks the full
//! transitive BuildRequires graph, classifies every discovered package
//! against local project state, detects and orders circular dependencies,
//! and emits a deterministic, explainable build plan.
//!
//! # Architecture
//!
//! - `index`: read-only relational store of package metadata (which source
//!   package provides a capability, what a source package needs to build)
//! - `rules`: layered conversion-rule data (global, per-class, per-package
//!   drop lists and smoke-test declarations)
//! - `artifacts`: registry of already-built source packages
//! - `platform`: static target-platform knowledge (sysroot sets, non-Fedora
//!   origins, roadmap exclusion categories)
//! - `roadmap`: the resolver itself (provider classification, BFS graph
//!   construction, SCC/condensation/topological ordering, complexity
//!   estimation, reporting)

pub mod artifacts;
mod error;
pub mod index;
pub mod platform;
pub mod roadmap;
pub mod rules;

pub use artifacts::ArtifactRegistry;
pub use error::{Error, Result};
pub use index::{Index, DEFAULT_TIERS};
pub use platform::Platform;
pub use roadmap::{
    Classification, Complexity, PackageInfo, Roadmap, RoadmapOptions, RoadmapResult,
};
pub use rules::{DropRule, PackageRules, RuleStore};
