//! Python bindings for the dispatch loop.
//!
//! `C(func)(*auxiliaries)` mirrors [`make_continuation`](crate::make_continuation):
//! `func(self_k, *aux_k)` returns the Python body. Calling a continuation
//! from Python raises `TailCallSignal` (a `BaseException` carrying a
//! `TailCall`), so control always leaves the body; the wrapper around the
//! body catches it and the Rust loop claims or forwards it exactly like a
//! native signal.

use std::cell::Cell;
use std::sync::Arc;

use pyo3::create_exception;
use pyo3::exceptions::{PyBaseException, PyRuntimeError, PyTypeError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyInt, PyList, PyString, PyTuple};

use crate::builder::{assemble, EntryPoint};
use crate::continuation::Callback;
use crate::error::TcoError;
use crate::py_object::PyObjectRef;
use crate::signal::{Body, Bounce, Outcome, TailCall};
use crate::value::{Args, Value};

create_exception!(
    tco_vm,
    TailCallSignal,
    PyBaseException,
    "Raised by a continuation; carries the pending TailCall in args[0]."
);

thread_local! {
    /// Bridge loops currently running on this thread.
    static ACTIVE_LOOPS: Cell<usize> = const { Cell::new(0) };
}

impl From<TcoError> for PyErr {
    fn from(err: TcoError) -> Self {
        match err {
            // Python exceptions raised by bodies come back unchanged.
            TcoError::Body(inner) => match inner.downcast::<PyErr>() {
                Ok(py_err) => *py_err,
                Err(other) => PyRuntimeError::new_err(other.to_string()),
            },
            err @ (TcoError::Arity { .. } | TcoError::Type { .. }) => {
                PyTypeError::new_err(err.to_string())
            }
            err => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

impl Value {
    pub fn to_pyobject<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        match self {
            Value::Unit => Ok(py.None().into_bound(py)),
            Value::Bool(b) => Ok(PyBool::new(py, *b).to_owned().into_any()),
            Value::Int(i) => Ok(i.into_pyobject(py)?.into_any()),
            Value::Float(x) => Ok(PyFloat::new(py, *x).into_any()),
            Value::String(s) => Ok(PyString::new(py, s).into_any()),
            Value::List(items) => {
                let list = PyList::empty(py);
                for item in items {
                    list.append(item.to_pyobject(py)?)?;
                }
                Ok(list.into_any())
            }
            Value::Python(obj) => Ok(obj.bind(py).clone()),
        }
    }

    /// Only exact builtin `bool`/`int`/`float`/`str` become native variants.
    /// Subclasses (`IntEnum`, `str` subclasses), `__index__` types and ints
    /// that overflow `i64` stay Python objects so they come back unchanged.
    pub fn from_pyobject(obj: &Bound<'_, PyAny>) -> Self {
        if obj.is_none() {
            return Value::Unit;
        }
        if let Ok(b) = obj.cast_exact::<PyBool>() {
            return Value::Bool(b.is_true());
        }
        if let Ok(i) = obj.cast_exact::<PyInt>() {
            if let Ok(i) = i.extract::<i64>() {
                return Value::Int(i);
            }
        }
        if let Ok(x) = obj.cast_exact::<PyFloat>() {
            return Value::Float(x.value());
        }
        if let Ok(s) = obj.cast_exact::<PyString>() {
            if let Ok(s) = s.to_str() {
                return Value::String(s.to_string());
            }
        }
        Value::Python(PyObjectRef::from(obj))
    }
}

fn args_from_pytuple(args: &Bound<'_, PyTuple>) -> Args {
    args.iter().map(|arg| Value::from_pyobject(&arg)).collect()
}

fn args_to_pytuple<'py>(py: Python<'py>, args: &Args) -> PyResult<Bound<'py, PyTuple>> {
    let items = args
        .iter()
        .map(|value| value.to_pyobject(py))
        .collect::<PyResult<Vec<_>>>()?;
    PyTuple::new(py, items)
}

fn raise_signal(py: Python<'_>, signal: TailCall) -> PyErr {
    match Py::new(py, PyTailCall { signal }) {
        Ok(tail) => TailCallSignal::new_err((tail,)),
        Err(err) => err,
    }
}

/// The `TailCall` inside a `TailCallSignal`, or `None` for any other error.
fn signal_from_pyerr(py: Python<'_>, err: &PyErr) -> Option<TailCall> {
    if !err.is_instance_of::<TailCallSignal>(py) {
        return None;
    }
    let args = err.value(py).getattr("args").ok()?;
    let tail = args.get_item(0).ok()?;
    let tail = tail.cast::<PyTailCall>().ok()?;
    Some(tail.get().signal.clone())
}

/// Wrap a Python callable as a body; `kwargs` are passed on every call.
fn python_body(func: PyObjectRef, kwargs: Option<Py<PyDict>>) -> Arc<Body> {
    Arc::new(move |args: Args| -> Outcome {
        Python::attach(|py| -> Outcome {
            let py_args = args_to_pytuple(py, &args).map_err(TcoError::body)?;
            let kwargs = kwargs.as_ref().map(|k| k.bind(py));
            match func.bind(py).call(py_args, kwargs) {
                Ok(produced) => Ok(Bounce::Done(Value::from_pyobject(&produced))),
                Err(err) => match signal_from_pyerr(py, &err) {
                    Some(signal) => Ok(Bounce::Jump(signal)),
                    None => Err(TcoError::body(err)),
                },
            }
        })
    })
}

fn entry_point_of(obj: &Bound<'_, PyAny>) -> PyResult<EntryPoint> {
    let entry = obj.cast::<PyEntryPoint>().map_err(|_| {
        PyTypeError::new_err("auxiliary continuations must be built with C(...)")
    })?;
    Ok(entry.get().entry.clone())
}

fn continuation_object(py: Python<'_>, callback: Callback) -> PyResult<Bound<'_, PyAny>> {
    Ok(Bound::new(py, PyContinuation { callback })?.into_any())
}

/// Pending tail call carried by `TailCallSignal`.
#[pyclass(frozen, name = "TailCall")]
pub struct PyTailCall {
    signal: TailCall,
}

#[pymethods]
impl PyTailCall {
    #[getter]
    fn owner(&self) -> u64 {
        self.signal.owner.raw()
    }

    #[getter]
    fn follow(&self) -> u64 {
        self.signal.follow.raw()
    }

    fn __repr__(&self) -> String {
        format!(
            "TailCall(owner={}, follow={}, args={})",
            self.signal.owner.raw(),
            self.signal.follow.raw(),
            self.signal.args.len()
        )
    }
}

/// Continuation handed to a Python body.
#[pyclass(frozen, name = "Continuation")]
pub struct PyContinuation {
    callback: Callback,
}

#[pymethods]
impl PyContinuation {
    /// Never returns normally: raises `TailCallSignal`.
    #[pyo3(signature = (*args))]
    fn __call__(&self, py: Python<'_>, args: &Bound<'_, PyTuple>) -> PyResult<()> {
        match self.callback.call(args_from_pytuple(args))? {
            Bounce::Jump(signal) => Err(raise_signal(py, signal)),
            Bounce::Done(_) => Err(PyRuntimeError::new_err(
                "continuation produced a value instead of a tail call",
            )),
        }
    }

    #[getter]
    fn id(&self) -> u64 {
        self.callback.id().raw()
    }

    #[getter]
    fn owner(&self) -> u64 {
        self.callback.owner().raw()
    }
}

#[pyclass(frozen, name = "EntryPoint")]
pub struct PyEntryPoint {
    entry: EntryPoint,
}

#[pymethods]
impl PyEntryPoint {
    /// Run the loop. Inside another running loop an unclaimed signal is
    /// re-raised as `TailCallSignal` for the enclosing loop to claim; at the
    /// top level it raises `RuntimeError`.
    #[pyo3(signature = (*args))]
    fn __call__(&self, py: Python<'_>, args: &Bound<'_, PyTuple>) -> PyResult<Py<PyAny>> {
        let depth = ACTIVE_LOOPS.with(|active| {
            let depth = active.get();
            active.set(depth + 1);
            depth
        });
        let outcome = self.entry.invoke(args_from_pytuple(args));
        ACTIVE_LOOPS.with(|active| active.set(depth));

        match outcome? {
            Bounce::Done(value) => Ok(value.to_pyobject(py)?.unbind()),
            Bounce::Jump(signal) if depth > 0 => Err(raise_signal(py, signal)),
            Bounce::Jump(signal) => Err(TcoError::misrouted(signal.owner, signal.follow).into()),
        }
    }

    #[getter]
    fn id(&self) -> u64 {
        self.entry.id().raw()
    }
}

/// `C(func)`: wraps `func(self_k, *aux_k) -> body`.
#[pyclass(frozen, name = "C")]
pub struct PyC {
    func: PyObjectRef,
}

#[pymethods]
impl PyC {
    #[new]
    fn new(py: Python<'_>, func: Py<PyAny>) -> PyResult<Self> {
        if !func.bind(py).is_callable() {
            return Err(PyTypeError::new_err("C() expects a callable"));
        }
        Ok(PyC {
            func: PyObjectRef::new(func),
        })
    }

    #[pyo3(signature = (*auxiliaries))]
    fn __call__(&self, py: Python<'_>, auxiliaries: &Bound<'_, PyTuple>) -> PyResult<PyEntryPoint> {
        let auxiliaries = auxiliaries
            .iter()
            .map(|aux| entry_point_of(&aux))
            .collect::<PyResult<Vec<_>>>()?;
        let entry = assemble(&auxiliaries, |this, aux| -> PyResult<Arc<Body>> {
            let mut conts = Vec::with_capacity(aux.len() + 1);
            conts.push(continuation_object(py, this)?);
            for callback in aux {
                conts.push(continuation_object(py, callback)?);
            }
            let body = self.func.bind(py).call1(PyTuple::new(py, conts)?)?;
            if !body.is_callable() {
                return Err(PyTypeError::new_err(
                    "C(func): func must return the callable body",
                ));
            }
            Ok(python_body(PyObjectRef::from(&body), None))
        })?;
        Ok(PyEntryPoint { entry })
    }
}

/// Decorator produced by `with_continuations(**named)`.
#[pyclass(frozen, name = "ContinuationDecorator")]
pub struct PyContinuationDecorator {
    names: Vec<String>,
    entries: Vec<EntryPoint>,
}

#[pymethods]
impl PyContinuationDecorator {
    fn __call__(&self, py: Python<'_>, func: Py<PyAny>) -> PyResult<PyEntryPoint> {
        if !func.bind(py).is_callable() {
            return Err(PyTypeError::new_err("with_continuations decorates callables"));
        }
        let entry = assemble(&self.entries, |this, aux| -> PyResult<Arc<Body>> {
            let kwargs = PyDict::new(py);
            kwargs.set_item("self", continuation_object(py, this)?)?;
            for (name, callback) in self.names.iter().zip(aux) {
                kwargs.set_item(name, continuation_object(py, callback)?)?;
            }
            Ok(python_body(
                PyObjectRef::new(func.clone_ref(py)),
                Some(kwargs.unbind()),
            ))
        })?;
        Ok(PyEntryPoint { entry })
    }
}

/// `with_continuations(out=k, ...)`: the body receives `self` and each
/// named continuation as keyword arguments.
#[pyfunction]
#[pyo3(name = "with_continuations", signature = (**named))]
fn py_with_continuations(named: Option<&Bound<'_, PyDict>>) -> PyResult<PyContinuationDecorator> {
    let mut names = Vec::new();
    let mut entries = Vec::new();
    if let Some(named) = named {
        for (key, value) in named.iter() {
            names.push(key.extract::<String>()?);
            entries.push(entry_point_of(&value)?);
        }
    }
    Ok(PyContinuationDecorator { names, entries })
}

#[pymodule]
pub fn tco_vm(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyC>()?;
    m.add_class::<PyEntryPoint>()?;
    m.add_class::<PyContinuation>()?;
    m.add_class::<PyTailCall>()?;
    m.add_class::<PyContinuationDecorator>()?;
    m.add("TailCallSignal", m.py().get_type::<TailCallSignal>())?;
    m.add_function(wrap_pyfunction!(py_with_continuations, m)?)?;
    Ok(())
}
