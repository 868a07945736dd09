// src/roadmap/cycles.rs

//! Cycle detection and deterministic build ordering
//!
//! Real roadmap graphs run to thousands of nodes, so the strongly connected
//! components are computed with an iterative Tarjan variant: the would-be
//! call frames (node plus neighbor cursor) live on an explicit stack instead
//! of the call stack. The SCCs are condensed into a DAG, topologically
//! sorted with Kahn's algorithm over a sorted ready queue, and multi-member
//! SCCs are expanded with a greedy least-blocked-first rule. Cycles are a
//! normal, reportable outcome, never an error: the sorter always terminates
//! with a complete ordering.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Produce the final build order and the list of cycles.
///
/// `edges` are (dependency, dependent) pairs: the first member must be built
/// before the second. The returned order is a permutation of `nodes`; every
/// SCC of size >= 2 appears once in the cycle list with sorted members.
pub fn order_packages(
    nodes: BTreeSet<String>,
    edges: &[(String, String)],
) -> (Vec<String>, Vec<Vec<String>>) {
    // Nodes with no incident edges are appended at the end as a safety net,
    // lexicographically; the SCC machinery runs over the connected rest.
    let mut incident: HashSet<&str> = HashSet::new();
    for (a, b) in edges {
        incident.insert(a.as_str());
        incident.insert(b.as_str());
    }
    let connected: Vec<&str> = nodes
        .iter()
        .map(|n| n.as_str())
        .filter(|n| incident.contains(n))
        .collect();
    let isolated: Vec<String> = nodes
        .iter()
        .filter(|n| !incident.contains(n.as_str()))
        .cloned()
        .collect();

    // Sorted, deduplicated adjacency; edges to unknown nodes are ignored
    let mut adjacency: BTreeMap<&str, Vec<&str>> =
        connected.iter().map(|n| (*n, Vec::new())).collect();
    for (a, b) in edges {
        if adjacency.contains_key(b.as_str()) {
            if let Some(neighbors) = adjacency.get_mut(a.as_str()) {
                neighbors.push(b.as_str());
            }
        }
    }
    for neighbors in adjacency.values_mut() {
        neighbors.sort_unstable();
        neighbors.dedup();
    }

    let sccs = tarjan_sccs(&connected, &adjacency);

    let cycles: Vec<Vec<String>> = sccs
        .iter()
        .filter(|scc| scc.len() >= 2)
        .map(|scc| scc.iter().map(|n| n.to_string()).collect())
        .collect();
    if !cycles.is_empty() {
        debug!("Detected {} dependency cycles", cycles.len());
    }

    let scc_order = condensation_order(&sccs, edges);

    let mut order: Vec<String> = Vec::with_capacity(nodes.len());
    for scc_id in scc_order {
        let members = &sccs[scc_id];
        if members.len() == 1 {
            order.push(members[0].to_string());
        } else {
            order.extend(expand_scc(members, edges));
        }
    }
    order.extend(isolated);

    (order, cycles)
}

/// Explicit-stack frame: a node and a cursor into its neighbor list
struct Frame<'a> {
    node: &'a str,
    neighbor: usize,
}

/// All strongly connected components, singletons included, via iterative
/// Tarjan. Nodes are visited in sorted order so component discovery is
/// deterministic. Each returned component is sorted.
fn tarjan_sccs<'a>(
    nodes: &[&'a str],
    adjacency: &BTreeMap<&'a str, Vec<&'a str>>,
) -> Vec<Vec<&'a str>> {
    let mut index_of: HashMap<&str, usize> = HashMap::new();
    let mut lowlink: HashMap<&str, usize> = HashMap::new();
    let mut on_stack: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&'a str> = Vec::new();
    let mut next_index = 0usize;
    let mut sccs: Vec<Vec<&'a str>> = Vec::new();

    const NO_NEIGHBORS: &[&str] = &[];

    for &start in nodes {
        if index_of.contains_key(start) {
            continue;
        }

        index_of.insert(start, next_index);
        lowlink.insert(start, next_index);
        next_index += 1;
        stack.push(start);
        on_stack.insert(start);
        let mut frames = vec![Frame { node: start, neighbor: 0 }];

        while let Some(frame) = frames.last_mut() {
            let node = frame.node;
            let neighbors = adjacency
                .get(node)
                .map(|v| v.as_slice())
                .unwrap_or(NO_NEIGHBORS);

            if frame.neighbor < neighbors.len() {
                let next = neighbors[frame.neighbor];
                frame.neighbor += 1;

                if let Some(&next_idx) = index_of.get(next) {
                    if on_stack.contains(next) {
                        let low = lowlink[node].min(next_idx);
                        lowlink.insert(node, low);
                    }
                } else {
                    index_of.insert(next, next_index);
                    lowlink.insert(next, next_index);
                    next_index += 1;
                    stack.push(next);
                    on_stack.insert(next);
                    frames.push(Frame { node: next, neighbor: 0 });
                }
            } else {
                frames.pop();
                if let Some(parent) = frames.last() {
                    let low = lowlink[parent.node].min(lowlink[node]);
                    lowlink.insert(parent.node, low);
                }
                if lowlink[node] == index_of[node] {
                    let mut component = Vec::new();
                    while let Some(member) = stack.pop() {
                        on_stack.remove(member);
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    component.sort_unstable();
                    sccs.push(component);
                }
            }
        }
    }

    sccs
}

/// Kahn's algorithm over the condensation DAG. The ready queue is keyed by
/// each component's lexicographically smallest member so the result does not
/// depend on hash iteration or arrival order. Any component the sort fails
/// to emit (impossible for a true condensation) is appended at the end.
fn condensation_order(sccs: &[Vec<&str>], edges: &[(String, String)]) -> Vec<usize> {
    let mut scc_of: HashMap<&str, usize> = HashMap::new();
    for (id, members) in sccs.iter().enumerate() {
        for member in members {
            scc_of.insert(member, id);
        }
    }

    let mut cond_adjacency: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); sccs.len()];
    let mut in_degree: Vec<usize> = vec![0; sccs.len()];
    for (a, b) in edges {
        let (Some(&sa), Some(&sb)) = (scc_of.get(a.as_str()), scc_of.get(b.as_str())) else {
            continue;
        };
        if sa != sb && cond_adjacency[sa].insert(sb) {
            in_degree[sb] += 1;
        }
    }

    // Ready queue keyed by representative member name
    let mut ready: BTreeSet<(&str, usize)> = (0..sccs.len())
        .filter(|&id| in_degree[id] == 0)
        .map(|id| (sccs[id][0], id))
        .collect();

    let mut emitted = vec![false; sccs.len()];
    let mut order = Vec::with_capacity(sccs.len());
    while let Some((_, id)) = ready.pop_first() {
        emitted[id] = true;
        order.push(id);
        for &next in &cond_adjacency[id] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.insert((sccs[next][0], next));
            }
        }
    }

    for id in 0..sccs.len() {
        if !emitted[id] {
            order.push(id);
        }
    }

    order
}

/// Order the members of one multi-member SCC: repeatedly emit the remaining
/// member with the fewest unresolved intra-SCC incoming edges, ties broken
/// lexicographically. Approximates building the least-blocked cycle member
/// first.
fn expand_scc(members: &[&str], edges: &[(String, String)]) -> Vec<String> {
    let member_set: BTreeSet<&str> = members.iter().copied().collect();
    let mut incoming: BTreeMap<&str, BTreeSet<&str>> =
        members.iter().map(|m| (*m, BTreeSet::new())).collect();
    for (a, b) in edges {
        if member_set.contains(a.as_str()) && member_set.contains(b.as_str()) && a != b {
            if let Some(sources) = incoming.get_mut(b.as_str()) {
                sources.insert(a.as_str());
            }
        }
    }

    let mut remaining = member_set;
    let mut ordered = Vec::with_capacity(members.len());
    while !remaining.is_empty() {
        let mut best: Option<(usize, &str)> = None;
        for &candidate in &remaining {
            let blocked = incoming[candidate]
                .iter()
                .filter(|source| remaining.contains(*source))
                .count();
            // Iteration is lexicographic, so strict less-than keeps the
            // smallest name among ties
            if best.is_none_or(|(count, _)| blocked < count) {
                best = Some((blocked, candidate));
            }
        }
        if let Some((_, chosen)) = best {
            remaining.remove(chosen);
            ordered.push(chosen.to_string());
        }
    }

    ordered
}
