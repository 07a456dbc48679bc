//! Values and argument lists that flow through continuations.
//!
//! Continuations of different arities are composed freely, so arguments are
//! dynamically typed and validated when a body reads them.

#[cfg(feature = "python_bridge")]
use crate::py_object::PyObjectRef;

use crate::error::TcoError;

/// A value that can be passed to, or returned from, a continuation body.
#[derive(Debug, Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    #[cfg(feature = "python_bridge")]
    Python(PyObjectRef),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            #[cfg(feature = "python_bridge")]
            Value::Python(_) => "python object",
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Floats, with ints widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            // Python objects compare by identity.
            #[cfg(feature = "python_bridge")]
            (Value::Python(a), Value::Python(b)) => a.is(b),
            _ => false,
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// Ordered arguments of one continuation call.
///
/// Accessors check arity and types lazily, so a mis-called continuation
/// fails only when its body reads its parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Args(values)
    }

    pub fn empty() -> Self {
        Args(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }

    /// Fail with an arity error unless exactly `expected` arguments were passed.
    pub fn expect_arity(&self, expected: usize) -> Result<(), TcoError> {
        if self.0.len() == expected {
            Ok(())
        } else {
            Err(TcoError::arity(expected, self.0.len()))
        }
    }

    pub fn get(&self, index: usize) -> Result<&Value, TcoError> {
        self.0
            .get(index)
            .ok_or_else(|| TcoError::arity(index + 1, self.0.len()))
    }

    pub fn int(&self, index: usize) -> Result<i64, TcoError> {
        let value = self.get(index)?;
        value
            .as_int()
            .ok_or_else(|| TcoError::type_error(index, "int", value.type_name()))
    }

    pub fn boolean(&self, index: usize) -> Result<bool, TcoError> {
        let value = self.get(index)?;
        value
            .as_bool()
            .ok_or_else(|| TcoError::type_error(index, "bool", value.type_name()))
    }

    pub fn float(&self, index: usize) -> Result<f64, TcoError> {
        let value = self.get(index)?;
        value
            .as_float()
            .ok_or_else(|| TcoError::type_error(index, "float", value.type_name()))
    }

    pub fn str(&self, index: usize) -> Result<&str, TcoError> {
        let value = self.get(index)?;
        value
            .as_str()
            .ok_or_else(|| TcoError::type_error(index, "string", value.type_name()))
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Args(values)
    }
}

impl FromIterator<Value> for Args {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Args(iter.into_iter().collect())
    }
}

impl IntoIterator for Args {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Build an [`Args`] list from anything convertible into [`Value`].
///
/// ```
/// use tco_vm::args;
/// let a = args![7, 1];
/// assert_eq!(a.len(), 2);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::Args::empty()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Args::new(vec![$($crate::Value::from($value)),+])
    };
}
