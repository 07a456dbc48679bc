//! Python objects carried inside [`Value`](crate::Value) and held by
//! Python-backed bodies.

use std::fmt;
use std::sync::Arc;

use pyo3::prelude::*;

/// Shared reference to a Python object.
///
/// Argument lists are cloned on every bounce; cloning this is an atomic
/// increment and never needs the interpreter.
#[derive(Clone)]
pub struct PyObjectRef(Arc<Py<PyAny>>);

impl PyObjectRef {
    pub fn new(obj: Py<PyAny>) -> Self {
        PyObjectRef(Arc::new(obj))
    }

    pub fn bind<'py>(&self, py: Python<'py>) -> &Bound<'py, PyAny> {
        self.0.bind(py)
    }

    /// Python `is`.
    pub fn is(&self, other: &PyObjectRef) -> bool {
        self.0.as_ptr() == other.0.as_ptr()
    }
}

impl From<&Bound<'_, PyAny>> for PyObjectRef {
    fn from(obj: &Bound<'_, PyAny>) -> Self {
        PyObjectRef::new(obj.clone().unbind())
    }
}

impl fmt::Debug for PyObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PyObjectRef({:p})", self.0.as_ptr())
    }
}
