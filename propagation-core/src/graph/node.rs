//! Graph Nodes
//!
//! This module defines the node type that lives in the dependency graph,
//! together with the small identifier types used to address nodes and the
//! objects they track.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::Equivalent;
use serde::Serialize;

use crate::error::{PropagationError, Result};

/// Callback run when a node must refresh because a notifier changed.
pub type UpdateMethod = Arc<dyn Fn() + Send + Sync>;

/// Position of a node in its graph's node sequence.
///
/// Assigned at insertion time and stable for the lifetime of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Wrap a raw position.
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the raw position.
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl From<usize> for NodeIndex {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference identity of a tracked object.
///
/// Derived from the address of the shared allocation, so two distinct objects
/// never compare equal even when their values do. The node keeps its `Arc`
/// alive, which keeps the address from being reused while the node exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Identity of the object behind `obj`.
    pub fn of<T: ?Sized>(obj: &Arc<T>) -> Self {
        Self(Arc::as_ptr(obj).cast::<()>() as usize)
    }

    /// Get the raw address value.
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl From<usize> for ObjectId {
    fn from(raw: usize) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Logical key of a node: object identity plus property name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    object: ObjectId,
    property: String,
}

impl NodeKey {
    pub fn new(object: ObjectId, property: impl Into<String>) -> Self {
        Self {
            object,
            property: property.into(),
        }
    }

    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn property(&self) -> &str {
        &self.property
    }
}

/// Borrowed form of [`NodeKey`] used for lookups without allocating.
///
/// Hashes field-for-field like `NodeKey` (`str` and `String` hash alike).
#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeKeyRef<'a> {
    pub(crate) object: ObjectId,
    pub(crate) property: &'a str,
}

impl Hash for NodeKeyRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.object.hash(state);
        self.property.hash(state);
    }
}

impl Equivalent<NodeKey> for NodeKeyRef<'_> {
    fn equivalent(&self, key: &NodeKey) -> bool {
        self.object == key.object && self.property == key.property
    }
}

/// A tracked property on a tracked object.
pub struct GraphNode<T: ?Sized> {
    /// Object containing the tracked property.
    obj: Arc<T>,

    /// Name of the tracked property.
    property_name: String,

    /// Position in the graph's node sequence.
    index: NodeIndex,

    /// Refreshes the property when a notifier changes. May be bound late.
    update_method: Option<UpdateMethod>,
}

impl<T: ?Sized> GraphNode<T> {
    pub(crate) fn new(
        obj: Arc<T>,
        property_name: String,
        index: NodeIndex,
        update_method: Option<UpdateMethod>,
    ) -> Self {
        Self {
            obj,
            property_name,
            index,
            update_method,
        }
    }

    /// Get the tracked object.
    pub fn obj(&self) -> &Arc<T> {
        &self.obj
    }

    /// Get the identity of the tracked object.
    pub fn object_id(&self) -> ObjectId {
        ObjectId::of(&self.obj)
    }

    /// Get the tracked property's name.
    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    /// Get the node's position in the graph.
    pub fn index(&self) -> NodeIndex {
        self.index
    }

    /// Get the node's logical key.
    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.object_id(), self.property_name.clone())
    }

    /// Get the update callback, if one is bound.
    pub fn update_method(&self) -> Option<&UpdateMethod> {
        self.update_method.as_ref()
    }

    /// Check whether an update callback is bound.
    pub fn has_update_method(&self) -> bool {
        self.update_method.is_some()
    }

    pub(crate) fn set_update_method(&mut self, update_method: Option<UpdateMethod>) {
        self.update_method = update_method;
    }

    /// Run the update callback.
    ///
    /// Fails with [`PropagationError::MissingCallback`] when none is bound.
    pub fn update(&self) -> Result<()> {
        let update = self.update_method.as_ref().ok_or_else(|| self.missing_callback())?;
        update();
        Ok(())
    }

    pub(crate) fn missing_callback(&self) -> PropagationError {
        PropagationError::MissingCallback {
            index: self.index,
            property: self.property_name.clone(),
        }
    }
}

impl<T: ?Sized> Clone for GraphNode<T> {
    fn clone(&self) -> Self {
        Self {
            obj: Arc::clone(&self.obj),
            property_name: self.property_name.clone(),
            index: self.index,
            update_method: self.update_method.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for GraphNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("index", &self.index)
            .field("object", &self.object_id())
            .field("property_name", &self.property_name)
            .field("has_update_method", &self.has_update_method())
            .finish()
    }
}

/// Anything that can address a node: an index, a raw position, or a node.
pub trait AsNodeIndex {
    fn node_index(&self) -> NodeIndex;
}

impl AsNodeIndex for NodeIndex {
    fn node_index(&self) -> NodeIndex {
        *self
    }
}

impl AsNodeIndex for usize {
    fn node_index(&self) -> NodeIndex {
        NodeIndex(*self)
    }
}

impl<T: ?Sized> AsNodeIndex for &GraphNode<T> {
    fn node_index(&self) -> NodeIndex {
        self.index
    }
}

impl<T: ?Sized> AsNodeIndex for GraphNode<T> {
    fn node_index(&self) -> NodeIndex {
        self.index
    }
}
