//! Layout engine turning a registered diagram into solver input
//!
//! Per-node constraints bind terminals to their owner ([`builder`]); the
//! signal graph is leveled into phases ([`phases`]) that become diagram-wide
//! constraints ([`global`]), and every writer/reader pair becomes a link
//! ([`links`]). The resulting [`LayoutSnapshot`] is handed to a
//! [`LayoutSolver`].

pub mod builder;
pub mod config;
pub mod constraint;
pub mod error;
pub mod global;
pub mod key;
pub mod links;
pub mod phases;
pub mod solver;
pub mod types;

pub use builder::{constraints_for, terminal_layouts, TerminalLayout, EPSILON};
pub use config::LayoutConfig;
pub use constraint::{localize, Constraint, Offset};
pub use error::LayoutError;
pub use global::{global_constraints, phase_constraints, Spacing};
pub use key::{index_of, layout_key, resolve, LayoutKey};
pub use links::links_for;
pub use phases::phases;
pub use solver::{
    KasuariSolver, LayoutSolver, SolveRequest, SolvedGroup, SolvedLayout, SolvedNode, SolverError,
    SolverSettings,
};
pub use types::*;
