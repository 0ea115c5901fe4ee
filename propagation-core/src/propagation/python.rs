//! Python Bindings
//!
//! Exposes a `PropagationManager` class to Python. Python objects are tracked
//! by identity (`id(obj)`); callbacks are arbitrary Python callables.
//!
//! # Callback Exceptions
//!
//! Update methods cannot fail from the graph's point of view, so an exception
//! raised by a Python callback is parked and re-raised by the
//! `notify_dependents` call whose pass ran the callback. Each pass owns a slot
//! on a thread-local stack: callbacks run synchronously on the notifying
//! thread, and a nested `notify_dependents` from inside a callback pushes its
//! own slot, so its exceptions never mix with the outer pass's.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use pyo3::exceptions::{PyIndexError, PyKeyError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use super::manager::PropagationManager;
use crate::error::PropagationError;
use crate::graph::{NodeIndex, ObjectId, UpdateMethod};

thread_local! {
    /// One slot per active notification pass on this thread, innermost last.
    static PASS_ERRORS: RefCell<Vec<Option<PyErr>>> = RefCell::new(Vec::new());
}

/// Slot for the exceptions of one notification pass.
///
/// Pops its slot when dropped, including on early return.
struct PassErrors;

impl PassErrors {
    fn enter() -> Self {
        PASS_ERRORS.with(|stack| stack.borrow_mut().push(None));
        Self
    }

    /// Take the first exception raised during this pass.
    fn finish(self) -> Option<PyErr> {
        PASS_ERRORS.with(|stack| stack.borrow_mut().last_mut().and_then(Option::take))
    }

    /// Park `err` in the innermost pass, unless that pass already failed.
    fn record(err: PyErr) {
        let rejected = PASS_ERRORS.with(|stack| match stack.borrow_mut().last_mut() {
            Some(slot) if slot.is_none() => {
                *slot = Some(err);
                None
            }
            _ => Some(err),
        });

        // Dropped outside the borrow: releasing the exception can run Python code.
        if let Some(err) = rejected {
            tracing::debug!(error = %err, "update method raised, exception not reported");
        }
    }
}

impl Drop for PassErrors {
    fn drop(&mut self) {
        let slot = PASS_ERRORS.with(|stack| stack.borrow_mut().pop());
        drop(slot);
    }
}

impl From<PropagationError> for PyErr {
    fn from(err: PropagationError) -> Self {
        match err {
            PropagationError::NodeNotFound { .. } => PyKeyError::new_err(err.to_string()),
            PropagationError::MissingCallback { .. } => PyRuntimeError::new_err(err.to_string()),
            PropagationError::InvalidIndex { .. } => PyIndexError::new_err(err.to_string()),
            PropagationError::Serialization(_) => PyValueError::new_err(err.to_string()),
        }
    }
}

/// Python-exposed propagation manager.
///
/// Keeps one shared handle per tracked Python object so that identity in the
/// graph matches `id(obj)` on the Python side.
#[pyclass(name = "PropagationManager")]
pub struct PyPropagationManager {
    inner: PropagationManager<Py<PyAny>>,

    /// Shared handles by `id(obj)`. Holding the handle keeps the id valid.
    objects: Mutex<HashMap<usize, Arc<Py<PyAny>>>>,
}

impl PyPropagationManager {
    fn intern(&self, obj: &Bound<'_, PyAny>) -> Arc<Py<PyAny>> {
        self.objects
            .lock()
            .entry(obj.as_ptr() as usize)
            .or_insert_with(|| Arc::new(obj.clone().unbind()))
            .clone()
    }

    fn lookup(&self, obj: &Bound<'_, PyAny>) -> Option<Arc<Py<PyAny>>> {
        self.objects.lock().get(&(obj.as_ptr() as usize)).cloned()
    }

    fn wrap(&self, callback: Py<PyAny>) -> UpdateMethod {
        Arc::new(move || {
            Python::with_gil(|py| {
                if let Err(err) = callback.call0(py) {
                    tracing::debug!(error = %err, "update method raised");
                    PassErrors::record(err);
                }
            });
        })
    }
}

#[pymethods]
impl PyPropagationManager {
    #[new]
    fn new() -> Self {
        Self {
            inner: PropagationManager::new(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Register a tracked property and return its node index.
    #[pyo3(signature = (obj, property_name, update_method=None))]
    fn add_node(
        &self,
        obj: &Bound<'_, PyAny>,
        property_name: &str,
        update_method: Option<Py<PyAny>>,
    ) -> usize {
        let handle = self.intern(obj);
        let update_method = update_method.map(|callback| self.wrap(callback));
        self.inner.add_node(handle, property_name, update_method).raw()
    }

    /// Index of the first node registered for the property.
    fn find_node(&self, obj: &Bound<'_, PyAny>, property_name: &str) -> PyResult<usize> {
        let handle = self
            .lookup(obj)
            .ok_or_else(|| not_found(obj, property_name))?;
        Ok(self.inner.find_node(&handle, property_name)?.raw())
    }

    fn add_dependency(&self, notifier: usize, dependent: usize) -> PyResult<()> {
        Ok(self.inner.add_dependency(notifier, dependent)?)
    }

    fn remove_dependency(&self, notifier: usize, dependent: usize) -> PyResult<()> {
        Ok(self.inner.remove_dependency(notifier, dependent)?)
    }

    fn has_dependency(&self, notifier: usize, dependent: usize) -> bool {
        self.inner.has_dependency(notifier, dependent)
    }

    #[pyo3(signature = (node, update_method=None))]
    fn set_update_method(&self, node: usize, update_method: Option<Py<PyAny>>) -> PyResult<()> {
        let update_method = update_method.map(|callback| self.wrap(callback));
        Ok(self.inner.set_update_method(node, update_method)?)
    }

    fn get_dependents(&self, node: usize) -> PyResult<Vec<usize>> {
        Ok(raw(self.inner.get_dependents(node)?))
    }

    fn get_notifiers(&self, node: usize) -> PyResult<Vec<usize>> {
        Ok(raw(self.inner.get_notifiers(node)?))
    }

    /// Run the update methods of the property's direct dependents.
    ///
    /// Re-raises the first exception raised by a callback once the pass ends.
    fn notify_dependents(&self, obj: &Bound<'_, PyAny>, property_name: &str) -> PyResult<usize> {
        let handle = self
            .lookup(obj)
            .ok_or_else(|| not_found(obj, property_name))?;
        let pass = PassErrors::enter();
        let count = self.inner.notify_dependents(&handle, property_name)?;

        match pass.finish() {
            Some(err) => Err(err),
            None => Ok(count),
        }
    }

    /// The graph's structure as JSON.
    fn snapshot_json(&self) -> PyResult<String> {
        Ok(self.inner.snapshot().to_json()?)
    }

    fn __len__(&self) -> usize {
        self.inner.node_count()
    }

    fn __repr__(&self) -> String {
        let (nodes, dependencies) = self
            .inner
            .with_graph(|graph| (graph.len(), graph.dependency_count()));
        format!("PropagationManager(nodes={nodes}, dependencies={dependencies})")
    }
}

fn not_found(obj: &Bound<'_, PyAny>, property_name: &str) -> PyErr {
    PropagationError::NodeNotFound {
        object: ObjectId::from(obj.as_ptr() as usize),
        property: property_name.to_string(),
    }
    .into()
}

fn raw(indices: Vec<NodeIndex>) -> Vec<usize> {
    indices.into_iter().map(|index| index.raw()).collect()
}
