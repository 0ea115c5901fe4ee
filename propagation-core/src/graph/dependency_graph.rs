//! Dependency Graph
//!
//! Owns every tracked node and the directed relation between them. An edge
//! `notifier -> dependent` means that when the notifier's property changes,
//! the dependent's update callback has to run.
//!
//! # Storage
//!
//! The relation is kept sparse: for each node we store the sorted set of its
//! dependents and, mirrored, the sorted set of its notifiers. Both sets live
//! in small inline vectors since most properties have only a handful of
//! edges. Keeping them sorted gives increasing-index (insertion order)
//! iteration for free and makes insertion idempotent via binary search.
//!
//! Lookups by (object, property) go through a key table that remembers the
//! first node registered under each key, so duplicate registrations never
//! shadow the first one.

use std::sync::Arc;

use indexmap::map::Entry;
use indexmap::IndexMap;
use smallvec::SmallVec;

use super::node::{AsNodeIndex, GraphNode, NodeIndex, NodeKey, NodeKeyRef, ObjectId, UpdateMethod};
use super::snapshot::{GraphSnapshot, NodeSnapshot};
use crate::config::GraphConfig;
use crate::error::{PropagationError, Result};

type EdgeSet = SmallVec<[NodeIndex; 4]>;

/// Directed dependency graph over tracked (object, property) pairs.
pub struct DependencyGraph<T: ?Sized> {
    /// All nodes, in insertion order. A node's index is its position here.
    nodes: Vec<GraphNode<T>>,

    /// `dependents[i]`: nodes notified when node `i` changes.
    dependents: Vec<EdgeSet>,

    /// `notifiers[j]`: nodes whose change notifies node `j`.
    notifiers: Vec<EdgeSet>,

    /// First node registered under each key.
    lookup: IndexMap<NodeKey, NodeIndex>,

    /// Total number of edges.
    edge_count: usize,

    config: GraphConfig,
}

impl<T: ?Sized> DependencyGraph<T> {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    /// Create a new empty graph sized according to `config`.
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            nodes: Vec::with_capacity(config.node_capacity),
            dependents: Vec::with_capacity(config.node_capacity),
            notifiers: Vec::with_capacity(config.node_capacity),
            lookup: IndexMap::with_capacity(config.node_capacity),
            edge_count: 0,
            config,
        }
    }

    /// Add a node for `property_name` on `obj`.
    ///
    /// The node's index is the current node count. Registering the same
    /// (object, property) twice creates a second, distinct node; lookups keep
    /// resolving to the first one.
    pub fn add_node(
        &mut self,
        obj: Arc<T>,
        property_name: impl Into<String>,
        update_method: Option<UpdateMethod>,
    ) -> NodeIndex {
        let index = NodeIndex::new(self.nodes.len());
        let property_name = property_name.into();
        let object = ObjectId::of(&obj);

        match self.lookup.entry(NodeKey::new(object, property_name.clone())) {
            Entry::Vacant(entry) => {
                entry.insert(index);
            }
            Entry::Occupied(entry) => {
                tracing::debug!(
                    property = %property_name,
                    %object,
                    first = %entry.get(),
                    duplicate = %index,
                    "property registered more than once"
                );
            }
        }

        tracing::debug!(property = %property_name, %object, %index, "node added");

        self.nodes
            .push(GraphNode::new(obj, property_name, index, update_method));
        self.dependents
            .push(EdgeSet::with_capacity(self.config.edge_capacity));
        self.notifiers
            .push(EdgeSet::with_capacity(self.config.edge_capacity));

        index
    }

    /// Add a node whose update callback is the given closure.
    pub fn add_node_with_update<F>(
        &mut self,
        obj: Arc<T>,
        property_name: impl Into<String>,
        update: F,
    ) -> NodeIndex
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.add_node(obj, property_name, Some(Arc::new(update)))
    }

    /// Get the first node registered for `property_name` on `obj`.
    ///
    /// Matching is by reference identity of the object and exact equality of
    /// the property name.
    pub fn get_node(&self, obj: &Arc<T>, property_name: &str) -> Result<&GraphNode<T>> {
        let object = ObjectId::of(obj);
        let key = NodeKeyRef {
            object,
            property: property_name,
        };

        self.lookup
            .get(&key)
            .map(|index| &self.nodes[index.raw()])
            .ok_or_else(|| PropagationError::NodeNotFound {
                object,
                property: property_name.to_string(),
            })
    }

    /// Get a node by index.
    pub fn node(&self, index: impl AsNodeIndex) -> Option<&GraphNode<T>> {
        self.nodes.get(index.node_index().raw())
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> &[GraphNode<T>] {
        &self.nodes
    }

    /// Distinct (object, property) keys in first-registration order.
    pub fn keys(&self) -> impl Iterator<Item = &NodeKey> + '_ {
        self.lookup.keys()
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of edges in the graph.
    pub fn dependency_count(&self) -> usize {
        self.edge_count
    }

    /// Bind, replace, or clear the update callback of a node.
    pub fn set_update_method(
        &mut self,
        node: impl AsNodeIndex,
        update_method: Option<UpdateMethod>,
    ) -> Result<()> {
        let index = self.check(node.node_index())?;
        self.nodes[index.raw()].set_update_method(update_method);
        Ok(())
    }

    /// Make `dependent` depend on `notifier`.
    ///
    /// Adding an existing edge is a no-op. Cycles and self-loops are
    /// accepted.
    pub fn add_dependency(
        &mut self,
        notifier: impl AsNodeIndex,
        dependent: impl AsNodeIndex,
    ) -> Result<()> {
        let notifier = self.check(notifier.node_index())?;
        let dependent = self.check(dependent.node_index())?;

        if insert_sorted(&mut self.dependents[notifier.raw()], dependent) {
            insert_sorted(&mut self.notifiers[dependent.raw()], notifier);
            self.edge_count += 1;
            tracing::trace!(%notifier, %dependent, "dependency added");
        }

        Ok(())
    }

    /// Remove the edge `notifier -> dependent`. Removing a missing edge is a
    /// no-op.
    pub fn remove_dependency(
        &mut self,
        notifier: impl AsNodeIndex,
        dependent: impl AsNodeIndex,
    ) -> Result<()> {
        let notifier = self.check(notifier.node_index())?;
        let dependent = self.check(dependent.node_index())?;

        if remove_sorted(&mut self.dependents[notifier.raw()], dependent) {
            remove_sorted(&mut self.notifiers[dependent.raw()], notifier);
            self.edge_count -= 1;
            tracing::trace!(%notifier, %dependent, "dependency removed");
        }

        Ok(())
    }

    /// Check whether `dependent` depends on `notifier`.
    ///
    /// Unknown indices have no edges.
    pub fn has_dependency(&self, notifier: impl AsNodeIndex, dependent: impl AsNodeIndex) -> bool {
        self.dependents
            .get(notifier.node_index().raw())
            .is_some_and(|set| set.binary_search(&dependent.node_index()).is_ok())
    }

    /// Nodes that depend directly on `notifier`, in increasing index order.
    pub fn get_dependents(&self, notifier: impl AsNodeIndex) -> Result<Vec<&GraphNode<T>>> {
        let notifier = self.check(notifier.node_index())?;
        Ok(self.resolve(&self.dependents[notifier.raw()]))
    }

    /// Nodes that `dependent` depends on directly, in increasing index order.
    pub fn get_notifiers(&self, dependent: impl AsNodeIndex) -> Result<Vec<&GraphNode<T>>> {
        let dependent = self.check(dependent.node_index())?;
        Ok(self.resolve(&self.notifiers[dependent.raw()]))
    }

    /// Indices of the direct dependents of `notifier`, in increasing order.
    pub fn dependent_indices(&self, notifier: impl AsNodeIndex) -> Result<&[NodeIndex]> {
        let notifier = self.check(notifier.node_index())?;
        Ok(&self.dependents[notifier.raw()])
    }

    /// Indices of the direct notifiers of `dependent`, in increasing order.
    pub fn notifier_indices(&self, dependent: impl AsNodeIndex) -> Result<&[NodeIndex]> {
        let dependent = self.check(dependent.node_index())?;
        Ok(&self.notifiers[dependent.raw()])
    }

    /// Every edge as `(notifier, dependent)`, ordered by notifier then
    /// dependent.
    pub fn dependencies(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex)> + '_ {
        self.dependents.iter().enumerate().flat_map(|(notifier, set)| {
            set.iter()
                .map(move |&dependent| (NodeIndex::new(notifier), dependent))
        })
    }

    /// Take a serializable copy of the graph's structure.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self
                .nodes
                .iter()
                .map(|node| NodeSnapshot {
                    index: node.index(),
                    object: node.object_id(),
                    property_name: node.property_name().to_string(),
                    has_update_method: node.has_update_method(),
                })
                .collect(),
            dependencies: self.dependencies().collect(),
        }
    }

    fn check(&self, index: NodeIndex) -> Result<NodeIndex> {
        if index.raw() < self.nodes.len() {
            Ok(index)
        } else {
            Err(PropagationError::InvalidIndex {
                index,
                len: self.nodes.len(),
            })
        }
    }

    fn resolve(&self, set: &[NodeIndex]) -> Vec<&GraphNode<T>> {
        set.iter().map(|index| &self.nodes[index.raw()]).collect()
    }
}

impl<T: ?Sized> Default for DependencyGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> std::fmt::Debug for DependencyGraph<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("node_count", &self.nodes.len())
            .field("dependency_count", &self.edge_count)
            .finish()
    }
}

/// Insert into a sorted set. Returns `false` if already present.
fn insert_sorted(set: &mut EdgeSet, index: NodeIndex) -> bool {
    match set.binary_search(&index) {
        Ok(_) => false,
        Err(pos) => {
            set.insert(pos, index);
            true
        }
    }
}

/// Remove from a sorted set. Returns `false` if absent.
fn remove_sorted(set: &mut EdgeSet, index: NodeIndex) -> bool {
    match set.binary_search(&index) {
        Ok(pos) => {
            set.remove(pos);
            true
        }
        Err(_) => false,
    }
}
