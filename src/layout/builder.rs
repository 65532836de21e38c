//! Per-node constraints binding a node to its terminals
//!
//! Terminals are laid out relative to their owner: inlets hug the left edge,
//! outlets the right edge, and each terminal is stacked below the node's top
//! by its own `top` offset.

use serde::Serialize;

use super::constraint::{Constraint, Offset};
use super::key::LayoutKey;
use super::types::{Axis, NodeProps, TerminalDecl, TerminalRole};

/// Small positive offset keeping inlets and zero-top terminals off exact
/// coincidence with their owner
pub const EPSILON: f64 = 0.0001;

/// Resolved geometry of one terminal relative to its owner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminalLayout {
    pub name: String,
    pub role: TerminalRole,
    pub metadata: Option<String>,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl TerminalLayout {
    fn resolve(
        decl: &TerminalDecl,
        role: TerminalRole,
        index: usize,
        owner_width: f64,
        terminal_height: f64,
    ) -> Self {
        let left = match role {
            TerminalRole::Inlet => 0.0,
            TerminalRole::Outlet => owner_width * 0.5,
        };
        let style = &decl.style;
        Self {
            name: decl.name.clone(),
            role,
            metadata: decl.metadata.clone(),
            left: style.left.unwrap_or(left),
            top: style.top.unwrap_or(index as f64 * terminal_height),
            width: style.width.unwrap_or(owner_width * 0.5),
            height: style.height.unwrap_or(terminal_height),
        }
    }
}

/// Lay out a node's terminals: inlets first, then outlets, each in
/// declaration order
pub fn terminal_layouts(props: &NodeProps, terminal_height: f64) -> Vec<TerminalLayout> {
    let inlets = props.inlets.iter().enumerate().map(|(i, decl)| {
        TerminalLayout::resolve(decl, TerminalRole::Inlet, i, props.width, terminal_height)
    });
    let outlets = props.outlets.iter().enumerate().map(|(i, decl)| {
        TerminalLayout::resolve(decl, TerminalRole::Outlet, i, props.width, terminal_height)
    });
    inlets.chain(outlets).collect()
}

/// Constraints binding a node to its terminals.
///
/// Produces one x-axis alignment over the node and all terminals, then one
/// exact y-separation from the node to each terminal.
pub fn constraints_for(
    node: &LayoutKey,
    node_width: f64,
    terminals: &[TerminalLayout],
) -> Vec<Constraint<LayoutKey>> {
    let offsets = std::iter::once(Offset::new(node.clone(), 0.0))
        .chain(terminals.iter().map(|t| {
            let offset = match t.role {
                TerminalRole::Outlet => node_width - t.width + t.left,
                TerminalRole::Inlet => EPSILON + t.left,
            };
            Offset::new(node.child(&t.name), offset)
        }))
        .collect();

    let mut constraints = vec![Constraint::alignment(Axis::X, offsets)];
    constraints.extend(terminals.iter().map(|t| {
        let gap = if t.top != 0.0 && !t.top.is_nan() {
            t.top
        } else {
            EPSILON
        };
        Constraint::exact(Axis::Y, node.clone(), node.child(&t.name), gap)
    }));
    constraints
}
