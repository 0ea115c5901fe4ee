//! Change Propagation
//!
//! This module drives notification over the dependency graph: given a
//! property that changed, it runs the update callbacks of the properties that
//! directly depend on it.
//!
//! # Concepts
//!
//! ## Notifiers and Dependents
//!
//! A notifier is a tracked property whose changes matter to others. A
//! dependent is a tracked property that has to be recomputed when one of its
//! notifiers changes. Each dependent carries the callback that recomputes it.
//!
//! ## One Hop
//!
//! Propagation stops at direct dependents. When a dependent's callback changes
//! the dependent's own value and that value has dependents of its own, the
//! callback reports the change through the manager again. Nothing guards
//! against a callback chain that cycles back on itself.

mod manager;
#[cfg(feature = "python")]
mod python;

pub use manager::{AnyObject, PropagationManager};
#[cfg(feature = "python")]
pub use python::PyPropagationManager;
