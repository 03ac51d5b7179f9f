use std::sync::Arc;

use opjson_shape::{Shape, Value};

use crate::cache::ProgramCache;
use crate::compiler::CompileOptions;
use crate::error::{CompileError, EncodeError, EncodeErrorKind};
use crate::path::Path;
use crate::program::Program;
use crate::vm;

/// Options for JSON encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Escape `<`, `>` and `&` in strings and keys
    pub escape_html: bool,
    /// Emit map entries sorted by rendered key; otherwise in the value's order
    pub sort_map_keys: bool,
    /// Keep compiled programs; when off every encode compiles afresh
    pub use_cache: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            escape_html: true,
            sort_map_keys: true,
            use_cache: true,
        }
    }
}

impl EncodeOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable HTML-safe escaping.
    pub const fn escape_html(mut self, on: bool) -> Self {
        self.escape_html = on;
        self
    }

    /// Enable or disable sorting of map keys.
    pub const fn sort_map_keys(mut self, on: bool) -> Self {
        self.sort_map_keys = on;
        self
    }

    /// Enable or disable the program cache.
    pub const fn use_cache(mut self, on: bool) -> Self {
        self.use_cache = on;
        self
    }

    const fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            escape_html: self.escape_html,
            sort_map_keys: self.sort_map_keys,
        }
    }
}

/// Encodes values to JSON, compiling one program per type.
///
/// An encoder is `Send + Sync`; share one across threads to share its
/// programs.
pub struct Encoder {
    options: EncodeOptions,
    cache: ProgramCache,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// Encoder with default options.
    pub fn new() -> Self {
        Self::with_options(EncodeOptions::default())
    }

    /// Encoder with the given options.
    pub fn with_options(options: EncodeOptions) -> Self {
        let cache = if options.use_cache {
            ProgramCache::new(options.compile_options())
        } else {
            ProgramCache::disabled(options.compile_options())
        };
        Self { options, cache }
    }

    /// Options this encoder was built with.
    pub const fn options(&self) -> EncodeOptions {
        self.options
    }

    /// The encoder's program cache.
    pub const fn cache(&self) -> &ProgramCache {
        &self.cache
    }

    /// The program used for values of type `shape`.
    pub fn program(&self, shape: &'static Shape) -> Result<Arc<Program>, CompileError> {
        self.cache.get_or_compile(shape)
    }

    /// Encode `value`, of type `shape`, to a new buffer.
    pub fn encode(&self, shape: &'static Shape, value: &Value) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        self.encode_into(shape, value, &mut out)?;
        Ok(out)
    }

    /// Encode `value` to a `String`.
    pub fn encode_to_string(
        &self,
        shape: &'static Shape,
        value: &Value,
    ) -> Result<String, EncodeError> {
        let bytes = self.encode(shape, value)?;
        // only a JSON hook can produce invalid UTF-8
        String::from_utf8(bytes).map_err(|err| {
            EncodeError::new(
                EncodeErrorKind::Marshal {
                    type_name: shape.type_name,
                    message: err.to_string(),
                },
                shape.type_name,
                Path::new(),
            )
        })
    }

    /// Append the encoding of `value` to `out`.
    ///
    /// On failure `out` is truncated back to its previous length.
    pub fn encode_into(
        &self,
        shape: &'static Shape,
        value: &Value,
        out: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        let program = self
            .cache
            .get_or_compile(shape)
            .map_err(|err| EncodeError::new(err.into(), shape.type_name, Path::new()))?;
        let start = out.len();
        vm::run(&program, value, &self.cache, out).inspect_err(|_| out.truncate(start))
    }

    /// Encode a self-describing value: [`Value::Dyn`] carries its shape,
    /// [`Value::Null`] encodes as `null`.
    pub fn encode_dyn(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        match value {
            Value::Dyn(shape, inner) => self.encode(*shape, inner),
            Value::Null => Ok(b"null".to_vec()),
            other => Err(EncodeError::new(
                EncodeErrorKind::ShapeMismatch {
                    type_name: "interface {}",
                    expected: "interface",
                    found: other.variant_name(),
                },
                "interface {}",
                Path::new(),
            )),
        }
    }
}
