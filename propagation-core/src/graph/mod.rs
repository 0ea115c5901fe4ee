//! Dependency Graph
//!
//! This module implements the graph that records which tracked properties
//! have to be refreshed when another tracked property changes.
//!
//! # Overview
//!
//! - Nodes are (object, property) pairs, each with an optional update callback
//! - Edges point from a notifier to a dependent: if B is derived from A, there
//!   is an edge from A to B
//!
//! The graph itself never runs callbacks; it only answers structural queries.
//! [`PropagationManager`](crate::propagation::PropagationManager) drives
//! notification on top of it.
//!
//! # Design Decisions
//!
//! 1. Objects are identified by the address of their shared allocation, not
//!    by hashing their value, so distinct objects can never be confused.
//!
//! 2. Nodes are addressed by dense indices assigned in insertion order. There
//!    is no node removal, so indices never shift.
//!
//! 3. We maintain both forward (dependents) and reverse (notifiers) edges to
//!    answer queries in both directions in O(degree).
//!
//! 4. Cycles and self-loops are not rejected. Propagation is one hop only, so
//!    a cycle cannot loop by itself.

mod dependency_graph;
mod node;
mod snapshot;

pub use dependency_graph::DependencyGraph;
pub use node::{AsNodeIndex, GraphNode, NodeIndex, NodeKey, ObjectId, UpdateMethod};
pub use snapshot::{GraphSnapshot, NodeSnapshot};
