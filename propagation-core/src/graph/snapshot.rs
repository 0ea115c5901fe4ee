//! Serializable view of a graph's structure, for diagnostics and tooling.

use serde::Serialize;

use super::node::{NodeIndex, ObjectId};
use crate::error::Result;

/// One node as seen in a [`GraphSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSnapshot {
    pub index: NodeIndex,
    pub object: ObjectId,
    pub property_name: String,
    pub has_update_method: bool,
}

/// Point-in-time copy of the nodes and edges of a dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphSnapshot {
    /// Nodes in index order.
    pub nodes: Vec<NodeSnapshot>,

    /// Edges as `(notifier, dependent)`, ordered by notifier then dependent.
    pub dependencies: Vec<(NodeIndex, NodeIndex)>,
}

impl GraphSnapshot {
    /// Render the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
