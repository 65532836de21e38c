//! Geometric constraints handed to the solver
//!
//! Constraints are built against symbolic [`LayoutKey`]s and localized to
//! positions in the current node list right before solving, since the solver
//! only knows nodes by index.

use serde::{Deserialize, Serialize};

use super::error::LayoutError;
use super::key::{resolve, LayoutKey};
use super::types::Axis;

/// One member of an alignment constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offset<R> {
    pub node: R,
    pub offset: f64,
}

impl<R> Offset<R> {
    pub fn new(node: R, offset: f64) -> Self {
        Self { node, offset }
    }
}

/// A layout constraint over node references of type `R`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Constraint<R> {
    /// Every `node` coordinate minus its `offset` is equal along `axis`
    Alignment { axis: Axis, offsets: Vec<Offset<R>> },

    /// `right` sits at least (or exactly, with `equality`) `gap` past `left`
    Separation {
        axis: Axis,
        left: R,
        right: R,
        gap: f64,
        #[serde(default)]
        equality: bool,
    },
}

impl<R> Constraint<R> {
    pub fn alignment(axis: Axis, offsets: Vec<Offset<R>>) -> Self {
        Self::Alignment { axis, offsets }
    }

    /// `right = left + gap`
    pub fn exact(axis: Axis, left: R, right: R, gap: f64) -> Self {
        Self::Separation {
            axis,
            left,
            right,
            gap,
            equality: true,
        }
    }

    /// `right >= left + gap`
    pub fn minimum(axis: Axis, left: R, right: R, gap: f64) -> Self {
        Self::Separation {
            axis,
            left,
            right,
            gap,
            equality: false,
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            Constraint::Alignment { axis, .. } | Constraint::Separation { axis, .. } => *axis,
        }
    }

    /// Rewrite every node reference, stopping at the first failure
    pub fn try_map<S, E>(&self, mut f: impl FnMut(&R) -> Result<S, E>) -> Result<Constraint<S>, E> {
        Ok(match self {
            Constraint::Alignment { axis, offsets } => Constraint::Alignment {
                axis: *axis,
                offsets: offsets
                    .iter()
                    .map(|o| Ok(Offset::new(f(&o.node)?, o.offset)))
                    .collect::<Result<_, E>>()?,
            },
            Constraint::Separation {
                axis,
                left,
                right,
                gap,
                equality,
            } => Constraint::Separation {
                axis: *axis,
                left: f(left)?,
                right: f(right)?,
                gap: *gap,
                equality: *equality,
            },
        })
    }
}

impl Constraint<LayoutKey> {
    /// Resolve every key against `nodes`
    pub fn localize<E>(&self, nodes: &[(LayoutKey, E)]) -> Result<Constraint<usize>, LayoutError> {
        self.try_map(|key| resolve(nodes, key))
    }
}

/// Localize a list of constraints against the current node list
pub fn localize<E>(
    nodes: &[(LayoutKey, E)],
    constraints: &[Constraint<LayoutKey>],
) -> Result<Vec<Constraint<usize>>, LayoutError> {
    constraints.iter().map(|c| c.localize(nodes)).collect()
}
