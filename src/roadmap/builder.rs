// src/roadmap/builder.rs

//! Breadth-first construction of the transitive BuildRequires graph
//!
//! Starting at the target (depth 0), each newly visited package has its
//! distinct, alphabetically ordered requirement list fetched from the index
//! and every token resolved through the provider resolver. Dropped, sysroot,
//! and unresolvable tokens are recorded and never expanded; everything else
//! becomes a node and an edge (dependency -> dependent) and is enqueued.

use crate::error::Result;
use crate::index::Index;
use crate::roadmap::complexity;
use crate::roadmap::provider::ProviderResolver;
use crate::roadmap::{Classification, PackageInfo, RoadmapOptions};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use tracing::debug;

/// Raw output of the BFS, before cycle analysis and ordering
#[derive(Debug, Default)]
pub struct GraphBuild {
    pub packages: BTreeMap<String, PackageInfo>,
    /// (dependency, dependent): the first must be built before the second
    pub edges: Vec<(String, String)>,
    pub dropped: BTreeMap<String, String>,
    pub unresolvable: BTreeMap<String, String>,
    pub sysroot: BTreeSet<String>,
}

/// Walk the transitive BuildRequires graph of `target`
pub fn build_graph(
    index: &Index,
    provider: &mut ProviderResolver<'_>,
    target: &str,
    options: &RoadmapOptions,
) -> Result<GraphBuild> {
    let mut build = GraphBuild::default();
    let mut edges: BTreeSet<(String, String)> = BTreeSet::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    // Source packages dropped in any context. Drop rules can be scoped to
    // one context package, so a provider dropped for A may still resolve
    // for B; such sources are pruned from the graph after the traversal.
    let mut dropped_sources: BTreeSet<String> = BTreeSet::new();

    let (classification, note) = provider.classify_package(target);
    let mut target_info = PackageInfo::new(target.to_string(), classification);
    target_info.note = note;
    build.packages.insert(target.to_string(), target_info);

    visited.insert(target.to_string());
    queue.push_back((target.to_string(), 0));

    while let Some((current, depth)) = queue.pop_front() {
        if options.max_depth.is_some_and(|max| depth >= max) && depth > 0 {
            continue;
        }

        // In the bounded mode, packages that already have conversion rules
        // are frontier nodes: they appear in the plan but their own
        // dependencies are not expanded. The target itself always expands.
        if options.stop_at_rules && depth > 0 {
            let classification = build
                .packages
                .get(&current)
                .map(|info| info.classification);
            if classification == Some(Classification::HasRules) {
                continue;
            }
        }

        let requirements = index.buildrequires_of(&current)?;
        debug!(
            "Expanding {} at depth {}: {} requirements",
            current,
            depth,
            requirements.len()
        );

        let mut resolved_deps: BTreeSet<String> = BTreeSet::new();
        for token in &requirements {
            let resolution = provider.resolve(token, &current)?;
            let reason = resolution
                .detail
                .clone()
                .unwrap_or_else(|| resolution.classification.to_string());

            match resolution.classification {
                Classification::Dropped => {
                    build.dropped.insert(token.clone(), reason);
                    if let Some(source) = resolution.source {
                        dropped_sources.insert(source);
                    }
                }
                Classification::Sysroot => {
                    build.sysroot.insert(token.clone());
                }
                Classification::Unresolvable => {
                    build.unresolvable.insert(token.clone(), reason);
                }
                classification => {
                    let Some(source) = resolution.source else {
                        // A non-terminal classification always names its
                        // source package; treat anything else as unresolved
                        build.unresolvable.insert(token.clone(), reason);
                        continue;
                    };
                    if source == current {
                        continue;
                    }

                    resolved_deps.insert(source.clone());
                    edges.insert((source.clone(), current.clone()));

                    if visited.insert(source.clone()) {
                        let mut info = PackageInfo::new(source.clone(), classification);
                        info.note = resolution.detail;
                        build.packages.insert(source.clone(), info);
                        queue.push_back((source, depth + 1));
                    }
                }
            }
        }

        if let Some(info) = build.packages.get_mut(&current) {
            info.buildrequires = resolved_deps.into_iter().collect();
        }
    }

    // Reconcile context-scoped provider drops: a source dropped for one
    // context may have been expanded through another. Dropped sources must
    // never be keys of the package map, so remove the node, its incident
    // edges, and every reference to it. The target itself is never pruned.
    dropped_sources.remove(target);
    if !dropped_sources.is_empty() {
        for name in &dropped_sources {
            build.packages.remove(name);
        }
        edges.retain(|(from, to)| {
            !dropped_sources.contains(from) && !dropped_sources.contains(to)
        });
        for info in build.packages.values_mut() {
            info.buildrequires
                .retain(|dep| !dropped_sources.contains(dep));
        }
    }

    build.edges = edges.into_iter().collect();

    // Reverse edges: who needs each package
    for (from, to) in &build.edges {
        if let Some(info) = build.packages.get_mut(from) {
            info.needed_by.push(to.clone());
        }
    }

    // Effort estimates for everything that still needs conversion rules
    let needs_rules: Vec<String> = build
        .packages
        .values()
        .filter(|info| info.classification == Classification::NeedRules)
        .map(|info| info.name.clone())
        .collect();
    for name in needs_rules {
        let tokens = index.buildrequires_of(&name)?;
        if let Some(info) = build.packages.get_mut(&name) {
            info.complexity = Some(complexity::estimate(&tokens));
        }
    }

    Ok(build)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactRegistry;
    use crate::platform::Platform;
    use crate::rules::RuleStore;

    fn resolve_graph(index: &Index, options: &RoadmapOptions, target: &str) -> GraphBuild {
        let rules = RuleStore::empty();
        let artifacts = ArtifactRegistry::empty();
        let platform = Platform::empty();
        let mut provider = ProviderResolver::new(
            index,
            &rules,
            &artifacts,
            &platform,
            options.tiers.clone(),
        );
        build_graph(index, &mut provider, target, options).unwrap()
    }

    #[test]
    fn test_requirement_resolves_to_source_package() {
        let index = Index::open_in_memory().unwrap();
        index.add_buildrequires("A", "zlib-devel").unwrap();
        index.add_provides("zlib-devel", "zlib-ng", "updates").unwrap();

        let build = resolve_graph(&index, &RoadmapOptions::default(), "A");

        assert_eq!(build.packages["A"].buildrequires, vec!["zlib-ng".to_string()]);
        assert!(build
            .edges
            .contains(&("zlib-ng".to_string(), "A".to_string())));
        assert_eq!(build.packages["zlib-ng"].needed_by, vec!["A".to_string()]);
    }

    #[test]
    fn test_routing_never_expands_dropped() {
        let index = Index::open_in_memory().unwrap();
        index.add_buildrequires("A", "kernel-headers").unwrap();
        index.add_buildrequires("A", "mystery-devel").unwrap();
        index.add_provides("kernel-headers", "kernel", "base").unwrap();
        index.add_buildrequires("kernel", "gcc").unwrap();

        let build = resolve_graph(&index, &RoadmapOptions::default(), "A");

        assert!(build.dropped.contains_key("kernel-headers"));
        assert!(build.unresolvable.contains_key("mystery-devel"));
        assert!(!build.packages.contains_key("kernel"));
        assert!(build.packages["A"].buildrequires.is_empty());
        assert!(build.edges.is_empty());
    }

    #[test]
    fn test_self_reference_filtered() {
        let index = Index::open_in_memory().unwrap();
        index.add_buildrequires("gcc", "gcc-devel").unwrap();
        index.add_provides("gcc-devel", "gcc", "base").unwrap();

        let build = resolve_graph(&index, &RoadmapOptions::default(), "gcc");
        assert!(build.packages["gcc"].buildrequires.is_empty());
        assert!(build.edges.is_empty());
    }

    #[test]
    fn test_max_depth_cutoff() {
        let index = Index::open_in_memory().unwrap();
        index.add_buildrequires("A", "b-devel").unwrap();
        index.add_provides("b-devel", "B", "base").unwrap();
        index.add_buildrequires("B", "c-devel").unwrap();
        index.add_provides("c-devel", "C", "base").unwrap();

        let options = RoadmapOptions {
            max_depth: Some(1),
            ..Default::default()
        };
        let build = resolve_graph(&index, &options, "A");

        // B is discovered but not expanded, so C never appears
        assert!(build.packages.contains_key("B"));
        assert!(!build.packages.contains_key("C"));
        assert!(build.packages["B"].buildrequires.is_empty());
    }

    #[test]
    fn test_stop_at_rules_halts_expansion() {
        let index = Index::open_in_memory().unwrap();
        index.add_buildrequires("A", "b-devel").unwrap();
        index.add_provides("b-devel", "B", "base").unwrap();
        index.add_buildrequires("B", "c-devel").unwrap();
        index.add_provides("c-devel", "C", "base").unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("packages")).unwrap();
        std::fs::write(dir.path().join("packages/B.toml"), "").unwrap();
        let rules = RuleStore::load(dir.path()).unwrap();
        let artifacts = ArtifactRegistry::empty();
        let platform = Platform::empty();

        let options = RoadmapOptions {
            stop_at_rules: true,
            ..Default::default()
        };
        let mut provider = ProviderResolver::new(
            &index,
            &rules,
            &artifacts,
            &platform,
            options.tiers.clone(),
        );
        let build = build_graph(&index, &mut provider, "A", &options).unwrap();

        assert_eq!(build.packages["B"].classification, Classification::HasRules);
        assert!(!build.packages.contains_key("C"));

        // Default mode sees the full picture
        let mut provider = ProviderResolver::new(
            &index,
            &rules,
            &artifacts,
            &platform,
            options.tiers.clone(),
        );
        let build = build_graph(&index, &mut provider, "A", &RoadmapOptions::default()).unwrap();
        assert!(build.packages.contains_key("C"));
    }

    #[test]
    fn test_context_scoped_provider_drop_prunes_expansion() {
        // A's rule drops the libfoo provider; B resolves the same token
        // without that drop. The source must end up in the dropped
        // bookkeeping only, never as a graph node.
        let index = Index::open_in_memory().unwrap();
        index.add_buildrequires("T", "a-devel").unwrap();
        index.add_buildrequires("T", "b-devel").unwrap();
        index.add_provides("a-devel", "A", "base").unwrap();
        index.add_provides("b-devel", "B", "base").unwrap();
        index.add_buildrequires("A", "libfoo-devel").unwrap();
        index.add_buildrequires("B", "libfoo-devel").unwrap();
        index.add_provides("libfoo-devel", "libfoo", "base").unwrap();
        index.add_buildrequires("libfoo", "m4").unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("packages")).unwrap();
        std::fs::write(
            dir.path().join("packages/A.toml"),
            "drop_buildrequires = [\"libfoo\"]\n",
        )
        .unwrap();
        let rules = RuleStore::load(dir.path()).unwrap();
        let artifacts = ArtifactRegistry::empty();
        let platform = Platform::empty();

        let options = RoadmapOptions::default();
        let mut provider = ProviderResolver::new(
            &index,
            &rules,
            &artifacts,
            &platform,
            options.tiers.clone(),
        );
        let build = build_graph(&index, &mut provider, "T", &options).unwrap();

        assert!(build.dropped.contains_key("libfoo-devel"));
        assert!(!build.packages.contains_key("libfoo"));
        assert!(!build.packages["B"].buildrequires.contains(&"libfoo".to_string()));
        assert!(build
            .edges
            .iter()
            .all(|(from, to)| from != "libfoo" && to != "libfoo"));
    }

    #[test]
    fn test_complexity_annotated_on_need_rules() {
        let index = Index::open_in_memory().unwrap();
        index.add_buildrequires("A", "b-devel").unwrap();
        index.add_provides("b-devel", "B", "base").unwrap();
        index.add_buildrequires("B", "gcc-c++").unwrap();
        index
            .add_buildrequires("B", "gobject-introspection-devel")
            .unwrap();

        let build = resolve_graph(&index, &RoadmapOptions::default(), "A");
        assert_eq!(build.packages["B"].classification, Classification::NeedRules);
        assert!(build.packages["B"].complexity.is_some());
    }
}
