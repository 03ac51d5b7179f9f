use core::fmt;

use crate::{Field, Value};

/// Lazily resolved reference to another shape.
///
/// The layer of indirection allows for cyclic type definitions.
pub type ShapeRef = fn() -> &'static Shape;

/// Custom JSON hook: renders the whole value as raw JSON bytes.
///
/// The bytes are emitted verbatim; their validity is the hook owner's business.
pub type MarshalJsonFn = fn(&Value) -> Result<Vec<u8>, String>;

/// Custom text hook: renders the value as text, emitted as a JSON string.
pub type MarshalTextFn = fn(&Value) -> Result<String, String>;

/// Describes one type as far as the encoder is concerned.
///
/// Identity is the address of the shape: two distinct `static` shapes are
/// distinct types even if they carry the same `type_name`.
#[derive(Clone, Copy)]
pub struct Shape {
    /// Human-readable name, used in error messages and program listings
    pub type_name: &'static str,

    /// Structural kind of the type
    pub kind: Kind,

    /// Custom JSON serialization hook, if the type provides one
    pub marshal_json: Option<MarshalJsonFn>,

    /// Custom text serialization hook, if the type provides one
    pub marshal_text: Option<MarshalTextFn>,
}

impl Shape {
    /// Create a shape without custom hooks.
    pub const fn new(type_name: &'static str, kind: Kind) -> Self {
        Self {
            type_name,
            kind,
            marshal_json: None,
            marshal_text: None,
        }
    }

    /// Attach a custom JSON hook.
    pub const fn marshal_json(mut self, hook: MarshalJsonFn) -> Self {
        self.marshal_json = Some(hook);
        self
    }

    /// Attach a custom text hook.
    pub const fn marshal_text(mut self, hook: MarshalTextFn) -> Self {
        self.marshal_text = Some(hook);
        self
    }

    /// Stable numeric form of this shape's identity.
    #[inline]
    pub fn addr(&'static self) -> usize {
        self as *const Shape as usize
    }

    /// Returns true if the type serializes itself through a hook.
    #[inline]
    pub const fn has_hook(&self) -> bool {
        self.marshal_json.is_some() || self.marshal_text.is_some()
    }

    /// Fields of a struct shape, or an empty slice for any other kind.
    pub const fn fields(&self) -> &'static [Field] {
        match self.kind {
            Kind::Struct(fields) => fields,
            _ => &[],
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind.name())
            .field("marshal_json", &self.marshal_json.is_some())
            .field("marshal_text", &self.marshal_text.is_some())
            .finish()
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self, other)
    }
}

impl Eq for Shape {}

impl core::hash::Hash for Shape {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        (self as *const Shape as usize).hash(state);
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Structural kind of a [`Shape`].
#[derive(Clone, Copy)]
pub enum Kind {
    /// `true` / `false`
    Bool,
    /// Platform-sized signed integer
    Int,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// Platform-sized unsigned integer
    Uint,
    /// 8-bit unsigned integer
    Uint8,
    /// 16-bit unsigned integer
    Uint16,
    /// 32-bit unsigned integer
    Uint32,
    /// 64-bit unsigned integer
    Uint64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// UTF-8 text
    String,
    /// Byte slice, emitted as base64
    Bytes,
    /// Nullable pointer to the given shape
    Pointer(ShapeRef),
    /// Dynamically typed value; the concrete shape travels with the value
    Interface,
    /// Fixed-length array
    Array(ShapeRef, usize),
    /// Variable-length, nullable sequence
    Slice(ShapeRef),
    /// Key/value map (key shape, value shape)
    Map(ShapeRef, ShapeRef),
    /// Struct with fields in declaration order
    Struct(&'static [Field]),
    /// Function value, not serializable
    Func,
    /// Channel value, not serializable
    Chan,
    /// 64-bit complex number, not serializable
    Complex64,
    /// 128-bit complex number, not serializable
    Complex128,
}

impl Kind {
    /// Short name of the kind, for messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Int8 => "int8",
            Kind::Int16 => "int16",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint => "uint",
            Kind::Uint8 => "uint8",
            Kind::Uint16 => "uint16",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::String => "string",
            Kind::Bytes => "bytes",
            Kind::Pointer(_) => "pointer",
            Kind::Interface => "interface",
            Kind::Array(..) => "array",
            Kind::Slice(_) => "slice",
            Kind::Map(..) => "map",
            Kind::Struct(_) => "struct",
            Kind::Func => "func",
            Kind::Chan => "chan",
            Kind::Complex64 => "complex64",
            Kind::Complex128 => "complex128",
        }
    }

    /// Returns true for pointer kinds.
    pub const fn is_pointer(&self) -> bool {
        matches!(self, Kind::Pointer(_))
    }

    /// Returns true for signed and unsigned integer kinds.
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Kind::Int
                | Kind::Int8
                | Kind::Int16
                | Kind::Int32
                | Kind::Int64
                | Kind::Uint
                | Kind::Uint8
                | Kind::Uint16
                | Kind::Uint32
                | Kind::Uint64
        )
    }

    /// Returns true for kinds with no JSON representation.
    pub const fn is_unserializable(&self) -> bool {
        matches!(
            self,
            Kind::Func | Kind::Chan | Kind::Complex64 | Kind::Complex128
        )
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Pointer(target) => write!(f, "Pointer({})", target().type_name),
            Kind::Array(elem, len) => write!(f, "Array({}, {len})", elem().type_name),
            Kind::Slice(elem) => write!(f, "Slice({})", elem().type_name),
            Kind::Map(key, value) => {
                write!(f, "Map({}, {})", key().type_name, value().type_name)
            }
            Kind::Struct(fields) => {
                f.write_str("Struct")?;
                f.debug_list()
                    .entries(fields.iter().map(|field| field.name))
                    .finish()
            }
            other => f.write_str(other.name()),
        }
    }
}
