//! Constraint solver integration for layout computation
//!
//! The layout engine only produces constraints; turning them into positions
//! is the job of a [`LayoutSolver`]. [`KasuariSolver`] is the reference
//! implementation on top of the kasuari Cassowary solver.

use std::collections::HashMap;

use kasuari::{Expression, Solver, Strength, Variable as KasuariVariable, WeightedRelation::*};
use serde::Serialize;
use thiserror::Error;

use super::constraint::Constraint;
use super::key::LayoutKey;
use super::types::{Axis, BoundingBox, LayoutSnapshot, Link};

/// A variable in the constraint system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutVariable {
    pub node: usize,
    pub axis: Axis,
}

impl LayoutVariable {
    pub fn x(node: usize) -> Self {
        Self { node, axis: Axis::X }
    }

    pub fn y(node: usize) -> Self {
        Self { node, axis: Axis::Y }
    }
}

/// Errors from the constraint solver
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("unsatisfiable constraints: {reason}")]
    Unsatisfiable { reason: String },

    #[error("internal solver error: {0}")]
    Internal(String),
}

/// Tunables handed to a solver before it runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    /// Preferred horizontal distance between the ends of a link
    pub link_length: f64,
    /// Prefer keeping every node inside the canvas
    pub keep_in_canvas: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            link_length: 75.0,
            keep_in_canvas: true,
        }
    }
}

/// Input of one solver run
#[derive(Debug, Clone, Copy)]
pub struct SolveRequest<'a> {
    pub snapshot: &'a LayoutSnapshot,
    pub width: f64,
    pub height: f64,
}

/// Solved geometry of one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolvedNode {
    pub key: LayoutKey,
    pub bounds: BoundingBox,
}

/// Solved extent of a group, the union of its leaves
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolvedGroup {
    pub key: LayoutKey,
    pub bounds: BoundingBox,
}

/// Result of a solver run, in snapshot node order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolvedLayout {
    pub nodes: Vec<SolvedNode>,
    pub links: Vec<Link>,
    pub groups: Vec<SolvedGroup>,
}

impl SolvedLayout {
    pub fn node(&self, key: &str) -> Option<&SolvedNode> {
        self.nodes.iter().rev().find(|n| n.key.as_str() == key)
    }

    /// Extent of every node, or `None` when there are none
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.nodes
            .iter()
            .map(|n| n.bounds)
            .reduce(|acc, b| acc.union(&b))
    }
}

/// A constraint-based engine that turns a [`LayoutSnapshot`] into positions
pub trait LayoutSolver {
    fn configure(&mut self, settings: &SolverSettings);

    fn solve(&mut self, request: &SolveRequest<'_>) -> Result<SolvedLayout, SolverError>;
}

/// Reference [`LayoutSolver`] backed by kasuari.
///
/// Snapshot constraints are required. Non-negativity and the link flow
/// preference are medium, canvas bounds and the stays at the origin are weak.
#[derive(Debug, Clone, Default)]
pub struct KasuariSolver {
    settings: SolverSettings,
}

impl KasuariSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }
}

impl LayoutSolver for KasuariSolver {
    fn configure(&mut self, settings: &SolverSettings) {
        self.settings = *settings;
    }

    fn solve(&mut self, request: &SolveRequest<'_>) -> Result<SolvedLayout, SolverError> {
        let snapshot = request.snapshot;
        let mut system = ConstraintSystem::new(snapshot.nodes.len());

        for (index, constraint) in snapshot.constraints.iter().enumerate() {
            system.add_layout_constraint(index, constraint)?;
        }

        for (node, spec) in snapshot.nodes.iter().enumerate() {
            let x = system.expr(LayoutVariable::x(node));
            let y = system.expr(LayoutVariable::y(node));
            system.add(x.clone() | GE(Strength::MEDIUM) | 0.0, "x >= 0")?;
            system.add(y.clone() | GE(Strength::MEDIUM) | 0.0, "y >= 0")?;
            if self.settings.keep_in_canvas {
                system.add(
                    x.clone() + spec.width | LE(Strength::WEAK) | request.width,
                    "x + width <= canvas",
                )?;
                system.add(
                    y.clone() + spec.height | LE(Strength::WEAK) | request.height,
                    "y + height <= canvas",
                )?;
            }
            system.add(x | EQ(Strength::WEAK) | 0.0, "x stay")?;
            system.add(y | EQ(Strength::WEAK) | 0.0, "y stay")?;
        }

        for link in &snapshot.links {
            system.check(link.source)?;
            system.check(link.target)?;
            let source = system.expr(LayoutVariable::x(link.source));
            let target = system.expr(LayoutVariable::x(link.target));
            system.add(
                target | GE(Strength::MEDIUM) | source + self.settings.link_length,
                "link flow",
            )?;
        }

        let values = system.values();
        let nodes: Vec<SolvedNode> = snapshot
            .nodes
            .iter()
            .enumerate()
            .map(|(i, spec)| SolvedNode {
                key: spec.key.clone(),
                bounds: BoundingBox::new(
                    values(LayoutVariable::x(i)),
                    values(LayoutVariable::y(i)),
                    spec.width,
                    spec.height,
                ),
            })
            .collect();

        let groups = snapshot
            .groups
            .iter()
            .filter_map(|group| {
                let bounds = group
                    .leaves
                    .iter()
                    .filter_map(|&i| nodes.get(i))
                    .map(|n| n.bounds)
                    .reduce(|acc, b| acc.union(&b))?;
                Some(SolvedGroup {
                    key: group.key.clone(),
                    bounds,
                })
            })
            .collect();

        tracing::debug!(nodes = nodes.len(), links = snapshot.links.len(), "solved layout");
        Ok(SolvedLayout {
            nodes,
            links: snapshot.links.clone(),
            groups,
        })
    }
}

/// Wrapper around a kasuari solver for one run
struct ConstraintSystem {
    solver: Solver,
    /// Maps our variables to kasuari variables
    variables: HashMap<LayoutVariable, KasuariVariable>,
    node_count: usize,
}

impl ConstraintSystem {
    fn new(node_count: usize) -> Self {
        Self {
            solver: Solver::new(),
            variables: HashMap::new(),
            node_count,
        }
    }

    /// Get or create the kasuari variable for a node coordinate
    fn var(&mut self, var: LayoutVariable) -> KasuariVariable {
        *self.variables.entry(var).or_insert_with(KasuariVariable::new)
    }

    fn expr(&mut self, var: LayoutVariable) -> Expression {
        self.var(var).into()
    }

    fn check(&self, node: usize) -> Result<(), SolverError> {
        if node < self.node_count {
            Ok(())
        } else {
            Err(SolverError::Internal(format!(
                "node index {} out of range for {} nodes",
                node, self.node_count
            )))
        }
    }

    fn add(&mut self, constraint: kasuari::Constraint, desc: &str) -> Result<(), SolverError> {
        self.solver
            .add_constraint(constraint)
            .map_err(|e| convert_kasuari_error(e, desc))
    }

    fn add_layout_constraint(&mut self, index: usize, constraint: &Constraint<usize>) -> Result<(), SolverError> {
        let axis = constraint.axis();
        let var = |node: usize| LayoutVariable { node, axis };
        match constraint {
            Constraint::Alignment { offsets, .. } => {
                let Some((first, rest)) = offsets.split_first() else {
                    return Ok(());
                };
                self.check(first.node)?;
                let anchor = self.expr(var(first.node));
                for member in rest {
                    self.check(member.node)?;
                    let node = self.expr(var(member.node));
                    let desc = format!(
                        "#{index} align {:?}: node {} - {} = node {} - {}",
                        axis, member.node, member.offset, first.node, first.offset
                    );
                    self.add(
                        node | EQ(Strength::REQUIRED) | anchor.clone() + (member.offset - first.offset),
                        &desc,
                    )?;
                }
            }
            Constraint::Separation {
                left,
                right,
                gap,
                equality,
                ..
            } => {
                self.check(*left)?;
                self.check(*right)?;
                let left_expr = self.expr(var(*left));
                let right_expr = self.expr(var(*right));
                let op = if *equality { "=" } else { ">=" };
                let desc = format!("#{index} {:?}: node {} {} node {} + {}", axis, right, op, left, gap);
                let relation = if *equality {
                    EQ(Strength::REQUIRED)
                } else {
                    GE(Strength::REQUIRED)
                };
                self.add(right_expr | relation | left_expr + *gap, &desc)?;
            }
        }
        Ok(())
    }

    /// Read back solved values; variables kasuari never reported are zero
    fn values(mut self) -> impl Fn(LayoutVariable) -> f64 {
        let changes: HashMap<KasuariVariable, f64> = self
            .solver
            .fetch_changes()
            .iter()
            .map(|(k, v)| (*k, *v))
            .collect();
        let variables = self.variables;
        move |var| {
            variables
                .get(&var)
                .and_then(|k| changes.get(k))
                .copied()
                .unwrap_or(0.0)
        }
    }
}

/// Convert a kasuari error to a SolverError with context
fn convert_kasuari_error(e: kasuari::AddConstraintError, desc: &str) -> SolverError {
    match e {
        kasuari::AddConstraintError::UnsatisfiableConstraint => SolverError::Unsatisfiable {
            reason: format!("cannot satisfy {}: conflicts with existing constraints", desc),
        },
        kasuari::AddConstraintError::DuplicateConstraint => {
            SolverError::Internal(format!("duplicate constraint: {}", desc))
        }
        kasuari::AddConstraintError::InternalSolverError(msg) => {
            SolverError::Internal(format!("internal solver error for {}: {}", desc, msg))
        }
    }
}
