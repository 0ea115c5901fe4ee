//! Error types for graph construction and change propagation.

use thiserror::Error;

use crate::graph::{NodeIndex, ObjectId};

/// Errors reported by the dependency graph and the propagation manager.
#[derive(Debug, Error)]
pub enum PropagationError {
    /// No node is registered for the (object, property) pair.
    #[error("no node registered for property `{property}` on object {object}")]
    NodeNotFound { object: ObjectId, property: String },

    /// A dependent was due for an update but has no callback bound.
    #[error("node {index} (`{property}`) has no update method")]
    MissingCallback { index: NodeIndex, property: String },

    /// A node index that does not belong to the graph.
    #[error("node index {index} is out of range for a graph of {len} nodes")]
    InvalidIndex { index: NodeIndex, len: usize },

    /// A snapshot or configuration could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = PropagationError> = std::result::Result<T, E>;
