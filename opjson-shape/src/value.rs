use crate::Shape;

/// A concrete value, walked by a compiled program.
///
/// The variant a program expects is dictated by the shape it was compiled
/// for: a `Kind::Struct` shape expects [`Value::Struct`] with one entry per
/// declared field, a pointer expects [`Value::Ptr`] or [`Value::Null`], and
/// so on. Integers of every width are carried as `Int` / `Uint`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Nil pointer, nil slice, nil map or nil interface
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer of any width
    Int(i64),
    /// Unsigned integer of any width
    Uint(u64),
    /// Floating point number of any width
    Float(f64),
    /// UTF-8 text
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Non-nil pointer
    Ptr(Box<Value>),
    /// Array or slice elements
    Seq(Vec<Value>),
    /// Map entries, in the map's native iteration order
    Map(Vec<(Value, Value)>),
    /// Struct fields, one per declared field, in declaration order
    Struct(Vec<Value>),
    /// Non-nil interface holding a value of the given concrete shape
    Dyn(&'static Shape, Box<Value>),
}

impl Value {
    /// Wrap a value behind a non-nil pointer.
    pub fn ptr(value: impl Into<Value>) -> Self {
        Value::Ptr(Box::new(value.into()))
    }

    /// Wrap a value in a non-nil interface.
    pub fn dynamic(shape: &'static Shape, value: impl Into<Value>) -> Self {
        Value::Dyn(shape, Box::new(value.into()))
    }

    /// Build a struct value from its fields.
    pub fn structure<I>(fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Value::Struct(fields.into_iter().map(Into::into).collect())
    }

    /// Build a map value from its entries, keeping their order.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns true for [`Value::Null`].
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if the value is its type's zero/empty value.
    ///
    /// Structs are never empty; pointers and interfaces are empty only when
    /// nil.
    pub fn is_empty_value(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !*b,
            Value::Int(n) => *n == 0,
            Value::Uint(n) => *n == 0,
            Value::Float(n) => *n == 0.0,
            Value::String(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::Seq(items) => items.is_empty(),
            Value::Map(entries) => entries.is_empty(),
            Value::Ptr(_) | Value::Struct(_) | Value::Dyn(..) => false,
        }
    }

    /// Name of the variant, for mismatch messages.
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Ptr(_) => "pointer",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "map",
            Value::Struct(_) => "struct",
            Value::Dyn(..) => "interface",
        }
    }
}

macro_rules! from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v as i64)
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Uint(v as u64)
            }
        })*
    };
}

from_signed!(i8, i16, i32, i64, isize);
from_unsigned!(u8, u16, u32, u64, usize);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// `Some` becomes a non-nil pointer, `None` a nil one.
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => Value::ptr(v),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Seq(v.into_iter().map(Into::into).collect())
    }
}
