// src/roadmap/report.rs

//! Human-readable roadmap rendering
//!
//! Groups the resolved packages by classification, with a next-step hint per
//! group, then prints the build order, cycles, and the dropped/unresolvable/
//! sysroot bookkeeping. Machine consumers should serialize
//! [`RoadmapResult`] as JSON instead.

use crate::roadmap::{Classification, RoadmapResult};
use std::fmt::Write;
use strum::IntoEnumIterator;

/// What a porter should do about packages in each classification
fn next_step(classification: Classification) -> &'static str {
    match classification {
        Classification::Dropped => "nothing to do, excluded from the roadmap",
        Classification::Sysroot => "nothing to do, satisfied by the target platform",
        Classification::AlreadyBuiltVerified => "nothing to do, built and smoke-tested",
        Classification::AlreadyBuiltUnverified => "add a smoke test to the conversion rules",
        Classification::HasRules => "ready to build, rules are authored",
        Classification::NonFedora => "fetch the source from its declared origin",
        Classification::NeedRules => "author conversion rules",
        Classification::Unresolvable => "investigate manually, no provider found",
    }
}

/// Render the full grouped report
pub fn render(result: &RoadmapResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Build roadmap for {}", result.target);
    let _ = writeln!(
        out,
        "{} packages, {} cycles, {} dropped, {} unresolvable, {} sysroot-satisfied",
        result.packages.len(),
        result.cycles.len(),
        result.dropped.len(),
        result.unresolvable.len(),
        result.sysroot.len()
    );

    let summary = result.summary();
    for classification in Classification::iter() {
        let Some(count) = summary.get(&classification) else {
            continue;
        };
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "== {} ({}) -- {}",
            classification,
            count,
            next_step(classification)
        );
        for info in result
            .packages
            .values()
            .filter(|info| info.classification == classification)
        {
            let mut line = format!("  {}", info.name);
            if let Some(complexity) = info.complexity {
                let _ = write!(line, " [{complexity}]");
            }
            if let Some(note) = &info.note {
                let _ = write!(line, " ({note})");
            }
            if !info.needed_by.is_empty() {
                let _ = write!(line, " <- needed by {}", info.needed_by.join(", "));
            }
            let _ = writeln!(out, "{line}");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "== Build order");
    for (position, name) in result.build_order.iter().enumerate() {
        let _ = writeln!(out, "  {:>4}. {}", position + 1, name);
    }

    if !result.cycles.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "== Dependency cycles (build in listed order, expect bootstrap work)");
        for cycle in &result.cycles {
            let _ = writeln!(out, "  {}", cycle.join(" <-> "));
        }
    }

    if !result.dropped.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "== Dropped requirements");
        for (token, reason) in &result.dropped {
            let _ = writeln!(out, "  {token}: {reason}");
        }
    }

    if !result.unresolvable.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "== Unresolvable requirements");
        for (token, reason) in &result.unresolvable {
            let _ = writeln!(out, "  {token}: {reason}");
        }
    }

    if !result.sysroot.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "== Satisfied by sysroot");
        for token in &result.sysroot {
            let _ = writeln!(out, "  {token}");
        }
    }

    out
}
