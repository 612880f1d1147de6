//! Fragment Values
//!
//! A closed tagged variant covering every shape a fragment entry or a
//! bound property can hold. Fragment data exchanged with the external
//! parser uses only the first six variants; `Instance` and `Dynamic`
//! exist on the object side of the mapping.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dynamic::DynamicSlot;
use crate::fragment::Fragment;
use crate::object::Bindable;

/// A fragment or property value
#[derive(Clone)]
pub enum Value {
    /// Explicit null
    Null,
    /// Boolean scalar
    Bool(bool),
    /// Numeric scalar
    Number(f64),
    /// Textual scalar
    Text(String),
    /// Ordered list (repeated elements, arrays, mixed content)
    List(Vec<Value>),
    /// Untyped nested fragment
    Map(Fragment),
    /// Typed nested instance (shared so object graphs can alias)
    Instance(Rc<RefCell<dyn Bindable>>),
    /// Lazily materialized dynamic sub-tree
    Dynamic(Rc<RefCell<DynamicSlot>>),
}

impl Value {
    /// Check for explicit null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check for a primitive scalar (bool, number, text)
    pub fn is_primitive(&self) -> bool {
        matches!(self, Value::Bool(_) | Value::Number(_) | Value::Text(_))
    }

    /// Get as text, or None
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as number, or None
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as boolean, or None
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as list, or None
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get as fragment, or None
    pub fn as_map(&self) -> Option<&Fragment> {
        match self {
            Value::Map(frag) => Some(frag),
            _ => None,
        }
    }

    /// Get as shared instance, or None
    pub fn as_instance(&self) -> Option<&Rc<RefCell<dyn Bindable>>> {
        match self {
            Value::Instance(inst) => Some(inst),
            _ => None,
        }
    }

    /// View a value as a slice: lists yield their items, everything else
    /// a one-element slice of itself (repeated vs. single child shape)
    pub fn as_slice(&self) -> &[Value] {
        match self {
            Value::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }

    /// Stringify a scalar the way the external serializer would
    ///
    /// Whole numbers print without a fractional part; null is empty.
    pub fn stringify(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Number(n) => {
                if *n == n.trunc() && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Value::Text(s) => s.clone(),
            Value::List(items) => items
                .iter()
                .map(Value::stringify)
                .collect::<Vec<_>>()
                .join(","),
            Value::Map(_) => String::new(),
            Value::Instance(inst) => inst.borrow().type_name().to_string(),
            Value::Dynamic(_) => String::new(),
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Text(s) => write!(f, "Text({s:?})"),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(frag) => f.debug_tuple("Map").field(frag).finish(),
            Value::Instance(inst) => {
                write!(f, "Instance({})", inst.borrow().type_name())
            }
            Value::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            // Shared values compare by identity
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Dynamic(a), Value::Dynamic(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Fragment> for Value {
    fn from(frag: Fragment) -> Self {
        Value::Map(frag)
    }
}

/// A scalar shape safe to store in process-wide metadata
///
/// Metadata is shared across threads, so default values cannot carry the
/// `Rc`-based `Value` variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Widen into a fragment value
    pub fn to_value(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Number(n) => Value::Number(*n),
            Scalar::Text(s) => Value::Text(s.clone()),
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}
