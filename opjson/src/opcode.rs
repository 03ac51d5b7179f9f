//! The instruction catalog.
//!
//! Every instruction a program can contain is a point of a closed lattice.
//! Struct-field instructions vary along several orthogonal axes (escaping,
//! pointer depth of the struct, embedding, tag option, the field's value
//! type, sole-field collapse), and each legal combination is a distinct
//! [`OpType`] with a distinct name. The compiler moves between lattice
//! points with the `head_to_*` / `field_to_*` transforms below; a transform
//! with no legal target returns its input unchanged, so callers compare the
//! result with the input before relying on the new behavior.

use core::fmt;
use std::collections::HashMap;
use std::sync::OnceLock;

use opjson_shape::Kind;

/// Operation family of an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CodeType {
    /// Standalone operation (values, pointers, interfaces, terminators)
    Op,
    /// Opens an array
    ArrayHead,
    /// Advances to the next array element
    ArrayElem,
    /// Opens a slice
    SliceHead,
    /// Advances to the next slice element
    SliceElem,
    /// Opens a map
    MapHead,
    /// Emits a map key
    MapKey,
    /// Closes a map value and advances to the next entry
    MapValue,
    /// Closes a map
    MapEnd,
    /// Calls or returns from a recursion sub-program
    StructFieldRecursive,
    /// Struct head or mid-struct field
    StructField,
    /// Struct terminator
    StructEnd,
}

/// Scalar value types with a dedicated instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scalar {
    /// `int`
    Int,
    /// `int8`
    Int8,
    /// `int16`
    Int16,
    /// `int32`
    Int32,
    /// `int64`
    Int64,
    /// `uint`
    Uint,
    /// `uint8`
    Uint8,
    /// `uint16`
    Uint16,
    /// `uint32`
    Uint32,
    /// `uint64`
    Uint64,
    /// `float32`
    Float32,
    /// `float64`
    Float64,
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `[]byte`
    Bytes,
}

impl Scalar {
    /// Every scalar, in catalog order.
    pub const ALL: [Scalar; 15] = [
        Scalar::Int,
        Scalar::Int8,
        Scalar::Int16,
        Scalar::Int32,
        Scalar::Int64,
        Scalar::Uint,
        Scalar::Uint8,
        Scalar::Uint16,
        Scalar::Uint32,
        Scalar::Uint64,
        Scalar::Float32,
        Scalar::Float64,
        Scalar::Bool,
        Scalar::String,
        Scalar::Bytes,
    ];

    /// The scalar a shape kind maps to, if any.
    pub const fn from_kind(kind: &Kind) -> Option<Scalar> {
        Some(match kind {
            Kind::Int => Scalar::Int,
            Kind::Int8 => Scalar::Int8,
            Kind::Int16 => Scalar::Int16,
            Kind::Int32 => Scalar::Int32,
            Kind::Int64 => Scalar::Int64,
            Kind::Uint => Scalar::Uint,
            Kind::Uint8 => Scalar::Uint8,
            Kind::Uint16 => Scalar::Uint16,
            Kind::Uint32 => Scalar::Uint32,
            Kind::Uint64 => Scalar::Uint64,
            Kind::Float32 => Scalar::Float32,
            Kind::Float64 => Scalar::Float64,
            Kind::Bool => Scalar::Bool,
            Kind::String => Scalar::String,
            Kind::Bytes => Scalar::Bytes,
            _ => return None,
        })
    }

    /// Whether the `string` tag option applies to this scalar.
    pub const fn is_quotable(self) -> bool {
        !matches!(self, Scalar::Bytes)
    }

    /// Whether the value is textual and subject to HTML escaping.
    pub const fn is_textual(self) -> bool {
        matches!(self, Scalar::String)
    }

    /// Inclusive bounds of an integer scalar; `None` for the others.
    pub const fn integer_range(self) -> Option<(i128, i128)> {
        Some(match self {
            Scalar::Int8 => (i8::MIN as i128, i8::MAX as i128),
            Scalar::Int16 => (i16::MIN as i128, i16::MAX as i128),
            Scalar::Int32 => (i32::MIN as i128, i32::MAX as i128),
            Scalar::Int | Scalar::Int64 => (i64::MIN as i128, i64::MAX as i128),
            Scalar::Uint8 => (0, u8::MAX as i128),
            Scalar::Uint16 => (0, u16::MAX as i128),
            Scalar::Uint32 => (0, u32::MAX as i128),
            Scalar::Uint | Scalar::Uint64 => (0, u64::MAX as i128),
            Scalar::Float32 | Scalar::Float64 | Scalar::Bool | Scalar::String | Scalar::Bytes => {
                return None;
            }
        })
    }

    const fn name(self) -> &'static str {
        match self {
            Scalar::Int => "Int",
            Scalar::Int8 => "Int8",
            Scalar::Int16 => "Int16",
            Scalar::Int32 => "Int32",
            Scalar::Int64 => "Int64",
            Scalar::Uint => "Uint",
            Scalar::Uint8 => "Uint8",
            Scalar::Uint16 => "Uint16",
            Scalar::Uint32 => "Uint32",
            Scalar::Uint64 => "Uint64",
            Scalar::Float32 => "Float32",
            Scalar::Float64 => "Float64",
            Scalar::Bool => "Bool",
            Scalar::String => "String",
            Scalar::Bytes => "Bytes",
        }
    }
}

/// Number of pointer indirections in front of a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PtrDepth {
    /// The value itself
    Value,
    /// One pointer, nil-checked before dereferencing
    Ptr,
    /// A chain of pointers, each nil-checked
    NPtr,
}

impl PtrDepth {
    const ALL: [PtrDepth; 3] = [PtrDepth::Value, PtrDepth::Ptr, PtrDepth::NPtr];

    /// Depth for a chain of `n` pointers.
    pub const fn from_count(n: usize) -> Self {
        match n {
            0 => PtrDepth::Value,
            1 => PtrDepth::Ptr,
            _ => PtrDepth::NPtr,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            PtrDepth::Value => "",
            PtrDepth::Ptr => "Ptr",
            PtrDepth::NPtr => "NPtr",
        }
    }
}

/// Struct-tag driven option baked into a field instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagOpt {
    /// No option
    None,
    /// Skip the field when its value is empty
    OmitEmpty,
    /// Quote the scalar's textual form
    StringTag,
}

impl TagOpt {
    const ALL: [TagOpt; 3] = [TagOpt::None, TagOpt::OmitEmpty, TagOpt::StringTag];

    const fn name(self) -> &'static str {
        match self {
            TagOpt::None => "",
            TagOpt::OmitEmpty => "OmitEmpty",
            TagOpt::StringTag => "StringTag",
        }
    }
}

/// Field values emitted by the instructions that follow the field's own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Nested {
    /// Fixed-length array
    Array,
    /// Slice
    Slice,
    /// Map
    Map,
    /// Struct by value
    Struct,
    /// Pointer to a non-scalar
    Ptr,
    /// Interface
    Interface,
    /// Type currently being compiled; emitted through a recursion call
    Recursive,
}

impl Nested {
    const ALL: [Nested; 7] = [
        Nested::Array,
        Nested::Slice,
        Nested::Map,
        Nested::Struct,
        Nested::Ptr,
        Nested::Interface,
        Nested::Recursive,
    ];

    const fn name(self) -> &'static str {
        match self {
            Nested::Array => "Array",
            Nested::Slice => "Slice",
            Nested::Map => "Map",
            Nested::Struct => "Struct",
            Nested::Ptr => "Pointer",
            Nested::Interface => "Interface",
            Nested::Recursive => "Recursive",
        }
    }
}

/// What a struct-field instruction emits as the field's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// No field at all: the head of a struct without visible fields
    Empty,
    /// Scalar emitted by the field instruction itself
    Scalar(Scalar, PtrDepth),
    /// Value rendered by the type's JSON hook
    MarshalJson,
    /// Value rendered by the type's text hook
    MarshalText,
    /// The key is written here, the value by the following instructions
    Nested(Nested),
    /// Embedded sub-structure; its promoted fields follow, no key written
    Embedded,
}

impl FieldType {
    fn all() -> impl Iterator<Item = FieldType> {
        let scalars = Scalar::ALL.into_iter().flat_map(|scalar| {
            PtrDepth::ALL
                .into_iter()
                .map(move |ptr| FieldType::Scalar(scalar, ptr))
        });
        [FieldType::Empty]
            .into_iter()
            .chain(scalars)
            .chain([FieldType::MarshalJson, FieldType::MarshalText])
            .chain(Nested::ALL.into_iter().map(FieldType::Nested))
            .chain([FieldType::Embedded])
    }

    /// Whether the instruction can close the struct right after the field.
    pub const fn is_self_contained(self) -> bool {
        matches!(self, FieldType::Scalar(..))
    }

    /// Whether the `string` tag option applies.
    pub const fn is_quotable(self) -> bool {
        match self {
            FieldType::Scalar(scalar, _) => scalar.is_quotable(),
            _ => false,
        }
    }

    fn write_name(self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Empty => f.write_str("Empty"),
            FieldType::Scalar(scalar, ptr) => {
                f.write_str(scalar.name())?;
                f.write_str(ptr.name())
            }
            FieldType::MarshalJson => f.write_str("MarshalJSON"),
            FieldType::MarshalText => f.write_str("MarshalText"),
            FieldType::Nested(nested) => f.write_str(nested.name()),
            FieldType::Embedded => f.write_str("Embedded"),
        }
    }
}

/// Value types of standalone value instructions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Scalar value
    Scalar(Scalar),
    /// Value rendered by the type's JSON hook
    MarshalJson,
    /// Value rendered by the type's text hook
    MarshalText,
}

/// Standalone value emission (array elements, map values, roots).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValueOp {
    /// What is emitted
    pub ty: ValueType,
    /// Pointer chain in front of a scalar
    pub ptr: PtrDepth,
    /// Text goes through HTML-safe escaping
    pub escaped: bool,
}

impl ValueOp {
    /// Plain, unescaped scalar emission.
    pub const fn scalar(scalar: Scalar, ptr: PtrDepth) -> Self {
        Self {
            ty: ValueType::Scalar(scalar),
            ptr,
            escaped: false,
        }
    }

    fn is_valid(&self) -> bool {
        let textual = match self.ty {
            ValueType::Scalar(scalar) => scalar.is_textual(),
            ValueType::MarshalText => true,
            ValueType::MarshalJson => false,
        };
        let hook = !matches!(self.ty, ValueType::Scalar(_));
        (!self.escaped || textual) && (!hook || self.ptr == PtrDepth::Value)
    }
}

/// The first instruction of a struct: opens it and emits its first field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HeadOp {
    /// Keys and text go through HTML-safe escaping
    pub escaped: bool,
    /// The struct is reached through pointers
    pub ptr: PtrDepth,
    /// The struct is embedded: no braces, the parent's separator state is shared
    pub anonymous: bool,
    /// Tag option of the first field
    pub opt: TagOpt,
    /// The first field's value type
    pub ty: FieldType,
    /// Sole field: the head also closes the struct
    pub only: bool,
}

impl HeadOp {
    /// Plain head for a first field of type `ty`.
    pub const fn new(ty: FieldType) -> Self {
        Self {
            escaped: false,
            ptr: PtrDepth::Value,
            anonymous: false,
            opt: TagOpt::None,
            ty,
            only: false,
        }
    }

    fn is_valid(&self) -> bool {
        let opt_ok = match (self.ty, self.opt) {
            (_, TagOpt::None) => true,
            (FieldType::Empty | FieldType::Embedded, _) => false,
            (ty, TagOpt::StringTag) => ty.is_quotable(),
            (_, TagOpt::OmitEmpty) => true,
        };
        opt_ok && (!self.only || self.ty.is_self_contained())
    }
}

/// A struct field after the first one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldOp {
    /// Keys and text go through HTML-safe escaping
    pub escaped: bool,
    /// Tag option of the field
    pub opt: TagOpt,
    /// The field's value type
    pub ty: FieldType,
}

impl FieldOp {
    /// Plain field of type `ty`.
    pub const fn new(ty: FieldType) -> Self {
        Self {
            escaped: false,
            opt: TagOpt::None,
            ty,
        }
    }

    fn is_valid(&self) -> bool {
        match (self.ty, self.opt) {
            (FieldType::Empty, _) => false,
            (_, TagOpt::None) => true,
            (FieldType::Embedded, _) => false,
            (ty, TagOpt::StringTag) => ty.is_quotable(),
            (_, TagOpt::OmitEmpty) => true,
        }
    }

    fn is_valid_end(&self) -> bool {
        self.is_valid() && self.ty.is_self_contained()
    }
}

/// One point of the instruction lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpType {
    /// End of a program (returns to the caller for dispatched programs)
    End,
    /// Dispatch on the concrete shape held by an interface value
    Interface,
    /// Nil-check and dereference a pointer chain in front of a non-scalar
    Ptr,
    /// Open a slice
    SliceHead,
    /// Advance to the next slice element
    SliceElem,
    /// Close a slice
    SliceEnd,
    /// Open an array
    ArrayHead,
    /// Advance to the next array element
    ArrayElem,
    /// Close an array
    ArrayEnd,
    /// Open a map; `sorted` loads and sorts its entries first
    MapHead {
        /// Entries are emitted in key order
        sorted: bool,
    },
    /// Emit a map key
    MapKey,
    /// Close an entry's value and advance to the next entry
    MapValue,
    /// Close a map
    MapEnd,
    /// Call a recursion sub-program
    Recursive,
    /// Return from a recursion sub-program
    RecursiveEnd,
    /// Close a struct whose last field was emitted by nested instructions
    StructEnd,
    /// Close an embedded struct's promoted fields
    StructAnonymousEnd,
    /// Emit a standalone value
    Value(ValueOp),
    /// Open a struct and emit its first field
    StructHead(HeadOp),
    /// Emit a mid-struct field
    StructField(FieldOp),
    /// Emit a struct's last field and close the struct
    StructFieldEnd(FieldOp),
}

impl OpType {
    /// Operation family.
    pub const fn code(self) -> CodeType {
        match self {
            OpType::ArrayHead => CodeType::ArrayHead,
            OpType::ArrayElem => CodeType::ArrayElem,
            OpType::SliceHead => CodeType::SliceHead,
            OpType::SliceElem => CodeType::SliceElem,
            OpType::MapHead { .. } => CodeType::MapHead,
            OpType::MapKey => CodeType::MapKey,
            OpType::MapValue => CodeType::MapValue,
            OpType::MapEnd => CodeType::MapEnd,
            OpType::Recursive | OpType::RecursiveEnd => CodeType::StructFieldRecursive,
            OpType::StructHead(_) | OpType::StructField(_) => CodeType::StructField,
            OpType::StructFieldEnd(_) | OpType::StructEnd | OpType::StructAnonymousEnd => {
                CodeType::StructEnd
            }
            OpType::End
            | OpType::Interface
            | OpType::Ptr
            | OpType::SliceEnd
            | OpType::ArrayEnd
            | OpType::Value(_) => CodeType::Op,
        }
    }

    /// Whether this point exists in the catalog.
    pub fn is_valid(self) -> bool {
        match self {
            OpType::Value(op) => op.is_valid(),
            OpType::StructHead(op) => op.is_valid(),
            OpType::StructField(op) => op.is_valid(),
            OpType::StructFieldEnd(op) => op.is_valid_end(),
            _ => true,
        }
    }

    /// Returns true for struct heads.
    pub const fn is_head(self) -> bool {
        matches!(self, OpType::StructHead(_))
    }

    fn or_self(self, candidate: OpType) -> OpType {
        if candidate.is_valid() { candidate } else { self }
    }

    /// Textual value or key → its HTML-escaping counterpart.
    pub fn to_escaped(self) -> OpType {
        let candidate = match self {
            OpType::Value(op) => OpType::Value(ValueOp {
                escaped: true,
                ..op
            }),
            OpType::StructHead(op) => OpType::StructHead(HeadOp {
                escaped: true,
                ..op
            }),
            OpType::StructField(op) => OpType::StructField(FieldOp {
                escaped: true,
                ..op
            }),
            OpType::StructFieldEnd(op) => OpType::StructFieldEnd(FieldOp {
                escaped: true,
                ..op
            }),
            other => other,
        };
        self.or_self(candidate)
    }

    fn map_head(self, f: impl FnOnce(HeadOp) -> Option<HeadOp>) -> OpType {
        match self {
            OpType::StructHead(op) => match f(op) {
                Some(next) => self.or_self(OpType::StructHead(next)),
                None => self,
            },
            other => other,
        }
    }

    fn map_field(self, f: impl FnOnce(FieldOp) -> Option<FieldOp>) -> OpType {
        match self {
            OpType::StructField(op) => match f(op) {
                Some(next) => self.or_self(OpType::StructField(next)),
                None => self,
            },
            other => other,
        }
    }

    /// Head → head that first nil-checks and dereferences one pointer.
    pub fn head_to_ptr_head(self) -> OpType {
        self.map_head(|op| {
            (op.ptr == PtrDepth::Value).then_some(HeadOp {
                ptr: PtrDepth::Ptr,
                ..op
            })
        })
    }

    /// Head → head that nil-checks and dereferences a chain of pointers.
    pub fn head_to_nptr_head(self) -> OpType {
        self.map_head(|op| {
            (op.ptr == PtrDepth::Value).then_some(HeadOp {
                ptr: PtrDepth::NPtr,
                ..op
            })
        })
    }

    /// Head → embedded head that writes no braces.
    pub fn head_to_anonymous_head(self) -> OpType {
        self.map_head(|op| {
            (!op.anonymous).then_some(HeadOp {
                anonymous: true,
                ..op
            })
        })
    }

    /// Head → head that skips its field when the value is empty.
    pub fn head_to_omit_empty_head(self) -> OpType {
        self.map_head(|op| {
            (op.opt == TagOpt::None).then_some(HeadOp {
                opt: TagOpt::OmitEmpty,
                ..op
            })
        })
    }

    /// Head → head that quotes its scalar.
    pub fn head_to_string_tag_head(self) -> OpType {
        self.map_head(|op| {
            (op.opt == TagOpt::None).then_some(HeadOp {
                opt: TagOpt::StringTag,
                ..op
            })
        })
    }

    /// Head → sole-field head that also closes the struct.
    ///
    /// Refused for field types whose value is emitted by other instructions.
    pub fn head_to_only_head(self) -> OpType {
        self.map_head(|op| (!op.only).then_some(HeadOp { only: true, ..op }))
    }

    /// Inverse of [`OpType::head_to_ptr_head`] and [`OpType::head_to_nptr_head`].
    pub fn ptr_head_to_head(self) -> OpType {
        self.map_head(|op| {
            (op.ptr != PtrDepth::Value).then_some(HeadOp {
                ptr: PtrDepth::Value,
                ..op
            })
        })
    }

    /// Mid-struct field → terminator that also closes the struct.
    pub fn field_to_end(self) -> OpType {
        match self {
            OpType::StructField(op) => self.or_self(OpType::StructFieldEnd(op)),
            other => other,
        }
    }

    /// Field → field that is skipped when its value is empty.
    pub fn field_to_omit_empty_field(self) -> OpType {
        self.map_field(|op| {
            (op.opt == TagOpt::None).then_some(FieldOp {
                opt: TagOpt::OmitEmpty,
                ..op
            })
        })
    }

    /// Field → field that quotes its scalar.
    pub fn field_to_string_tag_field(self) -> OpType {
        self.map_field(|op| {
            (op.opt == TagOpt::None).then_some(FieldOp {
                opt: TagOpt::StringTag,
                ..op
            })
        })
    }

    /// Look an instruction up by its catalog name.
    pub fn from_name(name: &str) -> Option<OpType> {
        static BY_NAME: OnceLock<HashMap<String, OpType>> = OnceLock::new();
        BY_NAME
            .get_or_init(|| catalog().map(|op| (op.to_string(), op)).collect())
            .get(name)
            .copied()
    }
}

/// Every point of the lattice.
pub fn catalog() -> impl Iterator<Item = OpType> {
    let fixed = [
        OpType::End,
        OpType::Interface,
        OpType::Ptr,
        OpType::SliceHead,
        OpType::SliceElem,
        OpType::SliceEnd,
        OpType::ArrayHead,
        OpType::ArrayElem,
        OpType::ArrayEnd,
        OpType::MapHead { sorted: false },
        OpType::MapHead { sorted: true },
        OpType::MapKey,
        OpType::MapValue,
        OpType::MapEnd,
        OpType::Recursive,
        OpType::RecursiveEnd,
        OpType::StructEnd,
        OpType::StructAnonymousEnd,
    ];

    let value_types = Scalar::ALL
        .into_iter()
        .map(ValueType::Scalar)
        .chain([ValueType::MarshalJson, ValueType::MarshalText]);
    let values = value_types.flat_map(|ty| {
        PtrDepth::ALL.into_iter().flat_map(move |ptr| {
            [false, true]
                .into_iter()
                .map(move |escaped| OpType::Value(ValueOp { ty, ptr, escaped }))
        })
    });

    let heads = FieldType::all().flat_map(|ty| {
        [false, true].into_iter().flat_map(move |escaped| {
            PtrDepth::ALL.into_iter().flat_map(move |ptr| {
                [false, true].into_iter().flat_map(move |anonymous| {
                    TagOpt::ALL.into_iter().flat_map(move |opt| {
                        [false, true].into_iter().map(move |only| {
                            OpType::StructHead(HeadOp {
                                escaped,
                                ptr,
                                anonymous,
                                opt,
                                ty,
                                only,
                            })
                        })
                    })
                })
            })
        })
    });

    let fields = FieldType::all().flat_map(|ty| {
        [false, true].into_iter().flat_map(move |escaped| {
            TagOpt::ALL.into_iter().flat_map(move |opt| {
                let op = FieldOp { escaped, opt, ty };
                [OpType::StructField(op), OpType::StructFieldEnd(op)]
            })
        })
    });

    fixed
        .into_iter()
        .chain(values)
        .chain(heads)
        .chain(fields)
        .filter(|op| op.is_valid())
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let escaped = |on: bool| if on { "Escaped" } else { "" };
        match *self {
            OpType::End => f.write_str("End"),
            OpType::Interface => f.write_str("Interface"),
            OpType::Ptr => f.write_str("Ptr"),
            OpType::SliceHead => f.write_str("SliceHead"),
            OpType::SliceElem => f.write_str("SliceElem"),
            OpType::SliceEnd => f.write_str("SliceEnd"),
            OpType::ArrayHead => f.write_str("ArrayHead"),
            OpType::ArrayElem => f.write_str("ArrayElem"),
            OpType::ArrayEnd => f.write_str("ArrayEnd"),
            OpType::MapHead { sorted: false } => f.write_str("MapHead"),
            OpType::MapHead { sorted: true } => f.write_str("MapHeadLoad"),
            OpType::MapKey => f.write_str("MapKey"),
            OpType::MapValue => f.write_str("MapValue"),
            OpType::MapEnd => f.write_str("MapEnd"),
            OpType::Recursive => f.write_str("StructFieldRecursive"),
            OpType::RecursiveEnd => f.write_str("StructFieldRecursiveEnd"),
            OpType::StructEnd => f.write_str("StructEnd"),
            OpType::StructAnonymousEnd => f.write_str("StructAnonymousEnd"),
            OpType::Value(op) => {
                f.write_str(escaped(op.escaped))?;
                match op.ty {
                    ValueType::Scalar(scalar) => f.write_str(scalar.name())?,
                    ValueType::MarshalJson => f.write_str("MarshalJSON")?,
                    ValueType::MarshalText => f.write_str("MarshalText")?,
                }
                f.write_str(op.ptr.name())
            }
            OpType::StructHead(op) => {
                write!(
                    f,
                    "Struct{}Field{}{}Head{}",
                    escaped(op.escaped),
                    op.ptr.name(),
                    if op.anonymous { "Anonymous" } else { "" },
                    op.opt.name(),
                )?;
                op.ty.write_name(f)?;
                if op.only {
                    f.write_str("Only")?;
                }
                Ok(())
            }
            OpType::StructField(op) => {
                write!(f, "Struct{}Field{}", escaped(op.escaped), op.opt.name())?;
                op.ty.write_name(f)
            }
            OpType::StructFieldEnd(op) => {
                write!(f, "Struct{}End{}", escaped(op.escaped), op.opt.name())?;
                op.ty.write_name(f)
            }
        }
    }
}
