//! Shapes for the primitive kinds.
//!
//! These are `static`s so every use refers to the same type identity.

use crate::{Kind, Shape};

macro_rules! primitive_shapes {
    ($($(#[$meta:meta])* $name:ident => $type_name:literal, $kind:ident;)*) => {
        $(
            $(#[$meta])*
            pub static $name: Shape = Shape::new($type_name, Kind::$kind);
        )*
    };
}

primitive_shapes! {
    /// `bool`
    BOOL => "bool", Bool;
    /// `int`
    INT => "int", Int;
    /// `int8`
    INT8 => "int8", Int8;
    /// `int16`
    INT16 => "int16", Int16;
    /// `int32`
    INT32 => "int32", Int32;
    /// `int64`
    INT64 => "int64", Int64;
    /// `uint`
    UINT => "uint", Uint;
    /// `uint8`
    UINT8 => "uint8", Uint8;
    /// `uint16`
    UINT16 => "uint16", Uint16;
    /// `uint32`
    UINT32 => "uint32", Uint32;
    /// `uint64`
    UINT64 => "uint64", Uint64;
    /// `float32`
    FLOAT32 => "float32", Float32;
    /// `float64`
    FLOAT64 => "float64", Float64;
    /// `string`
    STRING => "string", String;
    /// `[]byte`
    BYTES => "[]byte", Bytes;
    /// `interface{}`
    INTERFACE => "interface {}", Interface;
    /// `func()`
    FUNC => "func()", Func;
    /// `chan`
    CHAN => "chan", Chan;
}
