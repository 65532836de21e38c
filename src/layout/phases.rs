//! Topological leveling of nodes into dependency phases
//!
//! A phase is a set of nodes with no dependency among them. Phase 0 holds
//! every node nothing writes into; each following phase holds the nodes
//! whose writers have all been placed already.

use super::key::LayoutKey;
use crate::signal::SignalMap;

/// Group `vertices` into dependency phases using the writer/reader edges of
/// `signals`.
///
/// Within a phase, vertices keep their order in `vertices`. Edges touching an
/// element outside `vertices` and self-edges are ignored. Vertices caught in
/// a cycle end up together in one trailing phase.
pub fn phases(vertices: &[LayoutKey], signals: &SignalMap) -> Vec<Vec<LayoutKey>> {
    let position = |key: &LayoutKey| vertices.iter().position(|v| v == key);

    let mut incoming = vec![0usize; vertices.len()];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); vertices.len()];
    for (writer, reader) in signals.dependencies() {
        let (Some(from), Some(to)) = (position(&writer), position(&reader)) else {
            continue;
        };
        if from == to || outgoing[from].contains(&to) {
            continue;
        }
        outgoing[from].push(to);
        incoming[to] += 1;
    }

    let mut placed = vec![false; vertices.len()];
    let mut result = Vec::new();
    let mut current: Vec<usize> = (0..vertices.len()).filter(|&i| incoming[i] == 0).collect();

    while !current.is_empty() {
        for &i in &current {
            placed[i] = true;
        }
        let mut next = Vec::new();
        for &i in &current {
            for &j in &outgoing[i] {
                incoming[j] -= 1;
                if incoming[j] == 0 {
                    next.push(j);
                }
            }
        }
        next.sort_unstable();
        result.push(current.iter().map(|&i| vertices[i].clone()).collect());
        current = next;
    }

    let remaining: Vec<LayoutKey> = (0..vertices.len())
        .filter(|&i| !placed[i])
        .map(|i| vertices[i].clone())
        .collect();
    if !remaining.is_empty() {
        tracing::warn!(
            nodes = ?remaining.iter().map(LayoutKey::as_str).collect::<Vec<_>>(),
            "signal graph contains a cycle; placing remaining nodes in a final phase"
        );
        result.push(remaining);
    }

    result
}
