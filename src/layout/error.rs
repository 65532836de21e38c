//! Error types for the layout engine

use thiserror::Error;

use crate::error::ConfigError;

use super::key::LayoutKey;
use super::solver::SolverError;

/// Errors that abort a reconciliation pass
#[derive(Debug, Error)]
pub enum LayoutError {
    /// More than one writer is bound to a single signal
    #[error("multiple writers to signal '{signal}' are not supported: {}", writers.join(", "))]
    MultipleWriters { signal: String, writers: Vec<String> },

    /// A constraint or link refers to a key missing from the node list
    #[error("layout key '{key}' does not resolve to a registered node")]
    UnresolvedKey { key: LayoutKey },

    /// Invalid element declaration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Constraint solver error
    #[error("constraint solver error: {0}")]
    Solver(#[from] SolverError),

    /// The node list could not be serialized for change detection
    #[error("failed to serialize layout snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl LayoutError {
    /// Create an unresolved key error
    pub fn unresolved(key: impl Into<LayoutKey>) -> Self {
        Self::UnresolvedKey { key: key.into() }
    }

    /// Create a multiple writers error
    pub fn multiple_writers(signal: impl Into<String>, writers: Vec<String>) -> Self {
        Self::MultipleWriters {
            signal: signal.into(),
            writers,
        }
    }
}
