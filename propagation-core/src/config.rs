//! Graph Configuration
//!
//! Sizing hints for the dependency graph. None of these are limits: storage
//! grows past them as nodes and edges are added.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Storage hints for a [`DependencyGraph`](crate::graph::DependencyGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Number of nodes to reserve room for up front.
    pub node_capacity: usize,

    /// Number of edges to reserve per node in each direction.
    pub edge_capacity: usize,
}

impl GraphConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            node_capacity: 16,
            edge_capacity: 4,
        }
    }
}
