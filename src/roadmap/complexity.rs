// src/roadmap/complexity.rs

//! Conversion-effort estimation
//!
//! A pure heuristic over a package's raw requirement tokens, used to
//! annotate packages that still need conversion rules. The score is
//! additive: C++ involvement, modern meta-build systems, introspection
//! binding generation, and sheer requirement count all push a package up a
//! tier, while a plain autotools build keeps it down.

use crate::roadmap::Complexity;

const CXX_TOOLCHAINS: &[&str] = &["gcc-c++", "clang++"];
const META_BUILD_SYSTEMS: &[&str] = &["meson", "cmake"];
const AUTOTOOLS: &[&str] = &["autoconf", "automake", "libtool"];
const INTROSPECTION_PREFIX: &str = "gobject-introspection";

/// Estimate conversion effort from a package's requirement tokens
pub fn estimate(tokens: &[String]) -> Complexity {
    let has = |names: &[&str]| tokens.iter().any(|t| names.contains(&t.as_str()));

    let mut score = 0;
    if has(CXX_TOOLCHAINS) {
        score += 2;
    }
    if has(META_BUILD_SYSTEMS) {
        score += 1;
    }
    if tokens.iter().any(|t| t.starts_with(INTROSPECTION_PREFIX)) {
        score += 3;
    }
    if tokens.len() > 40 {
        score += 2;
    } else if tokens.len() > 20 {
        score += 1;
    }
    if !has(AUTOTOOLS) {
        score += 1;
    }

    match score {
        0..=1 => Complexity::Low,
        2..=3 => Complexity::Medium,
        _ => Complexity::High,
    }
}
