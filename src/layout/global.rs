//! Constraints spanning the whole diagram
//!
//! Nodes are arranged left to right by dependency phase: every node of a
//! phase starts one "widest node plus gap" to the right of the previous
//! phase, and nodes inside a phase are stacked top to bottom.

use super::constraint::{localize, Constraint};
use super::error::LayoutError;
use super::key::LayoutKey;
use super::phases::phases;
use super::types::{Axis, LayoutElement};
use crate::signal::SignalMap;

/// Distances used when spacing phases apart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spacing {
    /// Horizontal clearance between the widest node of a phase and the next phase
    pub gap: f64,
    /// Vertical clearance between nodes stacked in one phase
    pub spread: f64,
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            gap: 75.0,
            spread: 15.0,
        }
    }
}

/// Symbolic constraints arranging `phases` left to right.
///
/// `size` returns the `(width, height)` of a key; unknown keys count as
/// zero-sized.
pub fn phase_constraints(
    phases: &[Vec<LayoutKey>],
    size: impl Fn(&LayoutKey) -> Option<(f64, f64)>,
    spacing: Spacing,
) -> Vec<Constraint<LayoutKey>> {
    let width = |key: &LayoutKey| size(key).map_or(0.0, |(w, _)| w);
    let height = |key: &LayoutKey| size(key).map_or(0.0, |(_, h)| h);
    let mut constraints = Vec::new();

    if let Some((first, rest)) = phases.first().and_then(|p| p.split_first()) {
        for other in rest {
            constraints.push(Constraint::exact(Axis::X, first.clone(), other.clone(), 0.0));
        }
    }

    for pair in phases.windows(2) {
        let (left, right) = (&pair[0], &pair[1]);
        let Some(widest) = widest(left, &width) else {
            continue;
        };
        let gap = width(widest) + spacing.gap;
        for node in right {
            constraints.push(Constraint::exact(Axis::X, widest.clone(), node.clone(), gap));
        }

        let Some(anchor) = right.first() else {
            continue;
        };
        let mut offset = 0.0;
        for window in right.windows(2) {
            offset += height(&window[0]) + spacing.spread;
            constraints.push(Constraint::exact(Axis::Y, anchor.clone(), window[1].clone(), offset));
        }
    }

    constraints
}

/// Widest key of a phase; the first one wins a tie
fn widest<'a>(phase: &'a [LayoutKey], width: impl Fn(&LayoutKey) -> f64) -> Option<&'a LayoutKey> {
    let mut best: Option<(&LayoutKey, f64)> = None;
    for key in phase {
        let w = width(key);
        match best {
            Some((_, max)) if w <= max => {}
            _ => best = Some((key, w)),
        }
    }
    best.map(|(key, _)| key)
}

/// Localized global constraints for the current node list.
///
/// Every non-terminal node in `nodes` takes part in phase ordering; edges
/// come from the writer and reader elements of each signal.
pub fn global_constraints(
    signals: &SignalMap,
    nodes: &[(LayoutKey, LayoutElement)],
    spacing: Spacing,
) -> Result<Vec<Constraint<usize>>, LayoutError> {
    let vertices: Vec<LayoutKey> = nodes
        .iter()
        .filter(|(_, element)| element.is_owner_node())
        .map(|(key, _)| key.clone())
        .collect();
    let levels = phases(&vertices, signals);
    tracing::debug!(phases = levels.len(), nodes = vertices.len(), "leveled nodes");

    let size = |key: &LayoutKey| {
        nodes
            .iter()
            .rev()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, element)| (element.width, element.height))
    };
    localize(nodes, &phase_constraints(&levels, size, spacing))
}
