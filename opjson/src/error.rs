//! Error types for compilation and encoding.

use core::fmt::{self, Display};

use crate::path::Path;

/// A type could not be compiled into a program.
///
/// Compilation is deterministic, so the same error is raised again on every
/// later attempt to encode the type; nothing is cached for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// The specific kind of error
    pub kind: CompileErrorKind,
    /// Field path from the compilation root to the offending type
    pub path: Path,
}

impl CompileError {
    pub(crate) const fn new(kind: CompileErrorKind, path: Path) -> Self {
        Self { kind, path }
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.path)
    }
}

impl std::error::Error for CompileError {}

/// Specific compile error kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// The type has no JSON representation
    Unsupported {
        /// Name of the offending type
        type_name: &'static str,
    },
    /// Map keys must be strings, integers, or provide a text hook
    UnsupportedMapKey {
        /// Name of the key type
        type_name: &'static str,
    },
    /// A pointer type that points at itself
    PointerCycle {
        /// Name of the pointer type
        type_name: &'static str,
    },
}

impl Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileErrorKind::Unsupported { type_name } => {
                write!(f, "type not serializable: {type_name}")
            }
            CompileErrorKind::UnsupportedMapKey { type_name } => {
                write!(f, "unsupported map key type: {type_name}")
            }
            CompileErrorKind::PointerCycle { type_name } => {
                write!(f, "pointer type points at itself: {type_name}")
            }
        }
    }
}

/// An encode call failed. Any output written by the call must be discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeError {
    /// The specific kind of error
    pub kind: EncodeErrorKind,
    /// Name of the root value's type
    pub root: &'static str,
    /// Path from the root value to where encoding stopped
    pub path: Path,
}

impl EncodeError {
    pub(crate) const fn new(kind: EncodeErrorKind, root: &'static str, path: Path) -> Self {
        Self { kind, root, path }
    }
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (encoding {} at {})", self.kind, self.root, self.path)
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            EncodeErrorKind::Compile(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CompileError> for EncodeErrorKind {
    fn from(err: CompileError) -> Self {
        EncodeErrorKind::Compile(err)
    }
}

/// Specific encode error kinds
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeErrorKind {
    /// The root type could not be compiled
    Compile(CompileError),
    /// A custom marshal hook reported failure
    Marshal {
        /// Type whose hook failed
        type_name: &'static str,
        /// Message returned by the hook
        message: String,
    },
    /// Dynamic content with no JSON representation
    UnsupportedValue {
        /// Type of the offending value
        type_name: &'static str,
        /// Why it cannot be represented
        reason: String,
    },
    /// The value does not have the structure its shape describes
    ShapeMismatch {
        /// Type the program was compiled for
        type_name: &'static str,
        /// Value variant the program expected
        expected: &'static str,
        /// Value variant found instead
        found: &'static str,
    },
}

impl Display for EncodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeErrorKind::Compile(err) => write!(f, "{err}"),
            EncodeErrorKind::Marshal { type_name, message } => {
                write!(f, "marshal failed for type {type_name}: {message}")
            }
            EncodeErrorKind::UnsupportedValue { type_name, reason } => {
                write!(f, "unsupported value of type {type_name}: {reason}")
            }
            EncodeErrorKind::ShapeMismatch {
                type_name,
                expected,
                found,
            } => write!(
                f,
                "value does not match type {type_name}: expected {expected}, found {found}"
            ),
        }
    }
}
