//! Propagation Manager
//!
//! The manager owns a dependency graph and turns "this property changed" into
//! calls to the update callbacks of the properties that depend on it.
//!
//! # How It Works
//!
//! 1. Client code registers nodes and dependency edges (build phase).
//!
//! 2. When a property changes, the client calls
//!    [`PropagationManager::notify_dependents`], which:
//!    a. Resolves the node for the (object, property) pair
//!    b. Collects the update callbacks of its direct dependents
//!    c. Releases the graph lock
//!    d. Runs each callback once, in the dependents' insertion order
//!
//! Only direct dependents run. A callback that changes another tracked
//! property has to report that change itself.
//!
//! # Thread Safety
//!
//! The graph sits behind a single `RwLock`. The lock is never held while
//! client callbacks run, so callbacks may register nodes, add edges, or
//! notify again without deadlocking.

use std::any::Any;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::config::GraphConfig;
use crate::error::Result;
use crate::graph::{AsNodeIndex, DependencyGraph, GraphSnapshot, NodeIndex, UpdateMethod};

/// Type-erased tracked object, as used by the process-wide manager.
pub type AnyObject = dyn Any + Send + Sync;

/// Drives change propagation over a shared dependency graph.
///
/// Build one per context that needs isolated propagation state, or use
/// [`PropagationManager::global`] for a process-wide instance.
pub struct PropagationManager<T: ?Sized = AnyObject> {
    graph: RwLock<DependencyGraph<T>>,
}

static GLOBAL: OnceLock<PropagationManager> = OnceLock::new();

impl PropagationManager {
    /// The process-wide manager over type-erased objects.
    ///
    /// Lives until process exit; there is no reset.
    pub fn global() -> &'static PropagationManager {
        GLOBAL.get_or_init(PropagationManager::new)
    }
}

impl<T: ?Sized> PropagationManager<T> {
    /// Create a manager with an empty graph.
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    /// Create a manager whose graph is sized according to `config`.
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            graph: RwLock::new(DependencyGraph::with_config(config)),
        }
    }

    /// Register `property_name` on `obj`. See [`DependencyGraph::add_node`].
    pub fn add_node(
        &self,
        obj: Arc<T>,
        property_name: impl Into<String>,
        update_method: Option<UpdateMethod>,
    ) -> NodeIndex {
        self.graph.write().add_node(obj, property_name, update_method)
    }

    /// Register `property_name` on `obj` with a closure as update callback.
    pub fn add_node_with_update<F>(
        &self,
        obj: Arc<T>,
        property_name: impl Into<String>,
        update: F,
    ) -> NodeIndex
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.add_node(obj, property_name, Some(Arc::new(update)))
    }

    /// Index of the first node registered for `property_name` on `obj`.
    pub fn find_node(&self, obj: &Arc<T>, property_name: &str) -> Result<NodeIndex> {
        self.graph
            .read()
            .get_node(obj, property_name)
            .map(|node| node.index())
    }

    /// Make `dependent` depend on `notifier`.
    pub fn add_dependency(&self, notifier: impl AsNodeIndex, dependent: impl AsNodeIndex) -> Result<()> {
        self.graph.write().add_dependency(notifier, dependent)
    }

    /// Remove the edge `notifier -> dependent`, if present.
    pub fn remove_dependency(
        &self,
        notifier: impl AsNodeIndex,
        dependent: impl AsNodeIndex,
    ) -> Result<()> {
        self.graph.write().remove_dependency(notifier, dependent)
    }

    pub fn has_dependency(&self, notifier: impl AsNodeIndex, dependent: impl AsNodeIndex) -> bool {
        self.graph.read().has_dependency(notifier, dependent)
    }

    /// Bind, replace, or clear a node's update callback.
    pub fn set_update_method(
        &self,
        node: impl AsNodeIndex,
        update_method: Option<UpdateMethod>,
    ) -> Result<()> {
        self.graph.write().set_update_method(node, update_method)
    }

    /// Direct dependents of `notifier`, in increasing index order.
    pub fn get_dependents(&self, notifier: impl AsNodeIndex) -> Result<Vec<NodeIndex>> {
        Ok(self.graph.read().dependent_indices(notifier)?.to_vec())
    }

    /// Direct notifiers of `dependent`, in increasing index order.
    pub fn get_notifiers(&self, dependent: impl AsNodeIndex) -> Result<Vec<NodeIndex>> {
        Ok(self.graph.read().notifier_indices(dependent)?.to_vec())
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.graph.read().len()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.graph.read().snapshot()
    }

    /// Run `f` with read access to the graph.
    ///
    /// The graph is locked for the duration of `f`; calling back into this
    /// manager from inside `f` to mutate it will deadlock.
    pub fn with_graph<R>(&self, f: impl FnOnce(&DependencyGraph<T>) -> R) -> R {
        f(&self.graph.read())
    }

    /// Report that `property_name` on `obj` changed and run the update
    /// callbacks of its direct dependents.
    ///
    /// Returns the number of callbacks run. Fails without running anything
    /// if the property is not registered or if any direct dependent has no
    /// update callback.
    pub fn notify_dependents(&self, obj: &Arc<T>, property_name: &str) -> Result<usize> {
        let (notifier, updates) = {
            let graph = self.graph.read();
            let notifier = graph.get_node(obj, property_name)?.index();

            let updates = graph
                .get_dependents(notifier)?
                .into_iter()
                .map(|dependent| match dependent.update_method() {
                    Some(update) => Ok((dependent.index(), Arc::clone(update))),
                    None => {
                        tracing::warn!(
                            property = property_name,
                            %notifier,
                            dependent = %dependent.index(),
                            dependent_property = dependent.property_name(),
                            "dependent has no update method, propagation refused"
                        );
                        Err(dependent.missing_callback())
                    }
                })
                .collect::<Result<Vec<_>>>()?;

            (notifier, updates)
        };

        tracing::debug!(
            property = property_name,
            %notifier,
            dependents = updates.len(),
            "notifying dependents"
        );

        for (dependent, update) in &updates {
            tracing::trace!(%notifier, %dependent, "running update method");
            update();
        }

        Ok(updates.len())
    }
}

impl<T: ?Sized> Default for PropagationManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> std::fmt::Debug for PropagationManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropagationManager")
            .field("graph", &*self.graph.read())
            .finish()
    }
}
