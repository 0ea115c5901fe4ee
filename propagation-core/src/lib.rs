//! Propagation Core
//!
//! This crate provides change propagation between tracked properties: a
//! dependency graph over (object, property) pairs, and a manager that runs
//! the update callbacks of every property directly depending on one that
//! changed. It is the primitive behind computed and derived fields.
//!
//! The crate is designed to be used both as a native Rust library and, with
//! the `python` feature, as a Python extension module via PyO3.
//!
//! # Architecture
//!
//! - `graph`: tracked nodes and the notifier → dependent relation
//! - `propagation`: the manager that dispatches update callbacks
//! - `config`: sizing hints for the graph
//! - `error`: the crate's error type
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use propagation_core::propagation::PropagationManager;
//!
//! struct Order;
//!
//! let manager = PropagationManager::new();
//! let order = Arc::new(Order);
//! let recomputed = Arc::new(AtomicI32::new(0));
//!
//! // `total` is derived from `price`
//! let price = manager.add_node(order.clone(), "price", None);
//! let counter = recomputed.clone();
//! let total = manager.add_node_with_update(order.clone(), "total", move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//! manager.add_dependency(price, total).unwrap();
//!
//! // Report the change; `total`'s callback runs once
//! manager.notify_dependents(&order, "price").unwrap();
//! assert_eq!(recomputed.load(Ordering::SeqCst), 1);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod propagation;

pub use config::GraphConfig;
pub use error::{PropagationError, Result};
pub use graph::{DependencyGraph, GraphNode, NodeIndex, ObjectId};
pub use propagation::PropagationManager;

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module definition.
///
/// This function is called by Python when importing the module.
/// It registers all Python-exposed types.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<propagation::PyPropagationManager>()?;

    // Add version info
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
