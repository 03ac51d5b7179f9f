#![warn(missing_docs)]
#![forbid(unsafe_code)]
//! JSON encoder that compiles each type into a specialized instruction
//! program.
//!
//! The first time a type is encoded, its [`Shape`] is compiled into a
//! [`Program`]: a flat sequence of instructions drawn from a closed catalog
//! ([`opcode`]), where each struct field gets the one instruction that
//! matches its value type, pointer depth and tag options. Programs are
//! cached per type and replayed by an execution engine ([`vm`]) for every
//! value of that type.
//!
//! ```
//! use opjson::Encoder;
//! use opjson_shape::{Field, Kind, Shape, Value, shapes};
//!
//! static TAGS: Shape = Shape::new("[]string", Kind::Slice(|| &shapes::STRING));
//! static USER_FIELDS: [Field; 3] = [
//!     Field::new("ID", || &shapes::INT64),
//!     Field::new("Name", || &shapes::STRING).tag(",omitempty"),
//!     Field::new("Tags", || &TAGS),
//! ];
//! static USER: Shape = Shape::new("User", Kind::Struct(&USER_FIELDS));
//!
//! let user = Value::structure([
//!     Value::from(7i64),
//!     Value::from(""),
//!     Value::from(vec!["x", "y"]),
//! ]);
//! let json = Encoder::new().encode_to_string(&USER, &user).unwrap();
//! assert_eq!(json, r#"{"ID":7,"Tags":["x","y"]}"#);
//! ```

use std::sync::LazyLock;

/// Trace-level logging macro that forwards to `tracing::trace!` when the `tracing` feature is enabled.
#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {
        ::tracing::trace!($($arg)*)
    };
}

/// Trace-level logging macro (no-op when `tracing` feature is disabled).
#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// Debug-level logging macro that forwards to `tracing::debug!` when the `tracing` feature is enabled.
#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {
        ::tracing::debug!($($arg)*)
    };
}

/// Debug-level logging macro (no-op when `tracing` feature is disabled).
#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[allow(unused_imports)]
pub(crate) use debug;
#[allow(unused_imports)]
pub(crate) use trace;

pub mod cache;
pub mod compiler;
mod encoder;
mod error;
pub mod opcode;
mod path;
pub mod program;
pub mod vm;
mod write;

pub use cache::{ProgramCache, ProgramSource, TypeId, TypeInterner};
pub use compiler::{CompileOptions, compile};
pub use encoder::{EncodeOptions, Encoder};
pub use error::{CompileError, CompileErrorKind, EncodeError, EncodeErrorKind};
pub use opcode::{CodeType, OpType};
pub use path::{Path, PathStep};
pub use program::{Opcode, Program, Recursion};

pub use opjson_shape::{Shape, Value};

static DEFAULT_ENCODER: LazyLock<Encoder> = LazyLock::new(Encoder::new);

/// Encode `value`, of type `shape`, with default options.
///
/// Programs are cached in a process-wide encoder.
pub fn to_vec(shape: &'static Shape, value: &Value) -> Result<Vec<u8>, EncodeError> {
    DEFAULT_ENCODER.encode(shape, value)
}

/// Encode `value`, of type `shape`, to a `String` with default options.
pub fn to_string(shape: &'static Shape, value: &Value) -> Result<String, EncodeError> {
    DEFAULT_ENCODER.encode_to_string(shape, value)
}
