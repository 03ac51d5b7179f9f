//! Execution engine: replays a [`Program`] against a [`Value`].
//!
//! The engine keeps an explicit frame stack instead of recursing, so the
//! depth of the encoded value is bounded by memory, not by the native stack.
//! Output is append-only: every omission is decided before anything is
//! written for the field.

use std::sync::Arc;

use opjson_shape::{Kind, Shape, Value};

use crate::cache::ProgramSource;
use crate::error::{EncodeError, EncodeErrorKind};
use crate::opcode::{FieldType, OpType, Scalar, TagOpt, ValueType};
use crate::path::{Path, PathStep};
use crate::program::{Opcode, Program};
use crate::write;

enum Frame<'v> {
    /// Open object; `wrote` tracks whether a separator is due
    Struct {
        fields: &'v [Value],
        wrote: bool,
        field: &'static str,
    },
    Seq {
        items: &'v [Value],
        index: usize,
    },
    /// Entries with their rendered keys, in emission order
    Map {
        entries: Vec<(String, &'v Value)>,
        index: usize,
    },
    /// Return address of a recursion call
    Call { ret: usize },
    /// Caller of an interface dispatch
    Program { program: Arc<Program>, ret: usize },
}

/// Append the encoding of `value` to `out`.
///
/// Programs for the concrete types behind interface values are obtained
/// from `source`. On error, whatever was appended must be discarded by the
/// caller.
pub fn run(
    program: &Arc<Program>,
    value: &Value,
    source: &dyn ProgramSource,
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    trace!(
        "running {} ({} instructions)",
        program.shape.type_name,
        program.len()
    );
    let mut vm = Vm {
        source,
        out,
        frames: Vec::new(),
        root: program.shape.type_name,
    };
    vm.execute(Arc::clone(program), value)
}

struct Vm<'a, 'v> {
    source: &'a dyn ProgramSource,
    out: &'a mut Vec<u8>,
    frames: Vec<Frame<'v>>,
    root: &'static str,
}

/// Walk `count` pointers. `Ok(None)` is a nil pointer; `Err` carries the
/// value found where a pointer was expected.
fn deref(mut value: &Value, count: u8) -> Result<Option<&Value>, &Value> {
    for _ in 0..count {
        match value {
            Value::Ptr(inner) => value = &**inner,
            Value::Null => return Ok(None),
            other => return Err(other),
        }
    }
    Ok(Some(value))
}

impl<'v> Vm<'_, 'v> {
    fn execute(&mut self, mut program: Arc<Program>, value: &'v Value) -> Result<(), EncodeError> {
        let mut cur = value;
        let mut pc = 0usize;
        loop {
            let code = program.ops[pc];
            match code.op {
                OpType::End => match self.frames.pop() {
                    Some(Frame::Program {
                        program: caller,
                        ret,
                    }) => {
                        program = caller;
                        pc = ret;
                    }
                    _ => return Ok(()),
                },
                OpType::Interface => match cur {
                    Value::Null => {
                        self.out.extend_from_slice(b"null");
                        pc += 1;
                    }
                    Value::Dyn(shape, inner) => {
                        let shape: &'static Shape = *shape;
                        let callee = self.source.program_for(shape).map_err(|err| {
                            self.fail(EncodeErrorKind::UnsupportedValue {
                                type_name: shape.type_name,
                                reason: err.to_string(),
                            })
                        })?;
                        let caller = core::mem::replace(&mut program, callee);
                        self.frames.push(Frame::Program {
                            program: caller,
                            ret: pc + 1,
                        });
                        cur = &**inner;
                        pc = 0;
                    }
                    other => return Err(self.mismatch(code.shape, "interface", other)),
                },
                OpType::Ptr => match deref(cur, code.ptr_num) {
                    Ok(Some(target)) => {
                        cur = target;
                        pc += 1;
                    }
                    Ok(None) => {
                        self.out.extend_from_slice(b"null");
                        pc = code.next as usize;
                    }
                    Err(found) => return Err(self.mismatch(code.shape, "pointer", found)),
                },
                OpType::Value(op) => {
                    match op.ty {
                        ValueType::Scalar(scalar) => self.write_pointed_scalar(
                            code.shape,
                            scalar,
                            cur,
                            code.value_ptr_num,
                            false,
                            op.escaped,
                        )?,
                        ValueType::MarshalJson => self.write_marshal_json(code.shape, cur)?,
                        ValueType::MarshalText => {
                            self.write_marshal_text(code.shape, cur, op.escaped)?
                        }
                    }
                    pc += 1;
                }

                OpType::SliceHead | OpType::ArrayHead => {
                    let items = match cur {
                        Value::Null if code.op == OpType::SliceHead => {
                            self.out.extend_from_slice(b"null");
                            pc = code.next as usize;
                            continue;
                        }
                        Value::Seq(items) => items.as_slice(),
                        other => return Err(self.mismatch(code.shape, "sequence", other)),
                    };
                    if code.op == OpType::ArrayHead && items.len() != code.len as usize {
                        return Err(self.fail(EncodeErrorKind::UnsupportedValue {
                            type_name: code.shape.type_name,
                            reason: format!(
                                "array of length {} holds {} elements",
                                code.len,
                                items.len()
                            ),
                        }));
                    }
                    match items.first() {
                        None => {
                            self.out.extend_from_slice(b"[]");
                            pc = code.next as usize;
                        }
                        Some(first) => {
                            self.out.push(b'[');
                            self.frames.push(Frame::Seq { items, index: 0 });
                            cur = first;
                            pc += 1;
                        }
                    }
                }
                OpType::SliceElem | OpType::ArrayElem => {
                    let next = match self.frames.last_mut() {
                        Some(Frame::Seq { items, index }) => {
                            let items: &'v [Value] = *items;
                            *index += 1;
                            items.get(*index)
                        }
                        _ => return Err(self.corrupt(&code)),
                    };
                    match next {
                        Some(item) => {
                            self.out.push(b',');
                            cur = item;
                            pc = code.next as usize;
                        }
                        None => pc += 1,
                    }
                }
                OpType::SliceEnd | OpType::ArrayEnd => {
                    self.frames.pop();
                    self.out.push(b']');
                    pc += 1;
                }

                OpType::MapHead { sorted } => {
                    let entries = match cur {
                        Value::Null => {
                            self.out.extend_from_slice(b"null");
                            pc = code.next as usize;
                            continue;
                        }
                        Value::Map(entries) => entries,
                        other => return Err(self.mismatch(code.shape, "map", other)),
                    };
                    if entries.is_empty() {
                        self.out.extend_from_slice(b"{}");
                        pc = code.next as usize;
                        continue;
                    }
                    let key_shape = match code.shape.kind {
                        Kind::Map(key, _) => key(),
                        _ => code.shape,
                    };
                    let mut rendered = Vec::with_capacity(entries.len());
                    for (key, value) in entries {
                        rendered.push((self.render_key(key_shape, key)?, value));
                    }
                    if sorted {
                        rendered.sort_by(|a, b| a.0.cmp(&b.0));
                    }
                    self.out.push(b'{');
                    self.frames.push(Frame::Map {
                        entries: rendered,
                        index: 0,
                    });
                    pc += 1;
                }
                OpType::MapKey => {
                    match self.frames.last() {
                        Some(Frame::Map { entries, index }) => {
                            let (key, value) = &entries[*index];
                            write::write_json_string(self.out, key, program.escape_html);
                            self.out.push(b':');
                            cur = *value;
                        }
                        _ => return Err(self.corrupt(&code)),
                    }
                    pc += 1;
                }
                OpType::MapValue => {
                    let more = match self.frames.last_mut() {
                        Some(Frame::Map { entries, index }) => {
                            *index += 1;
                            *index < entries.len()
                        }
                        _ => return Err(self.corrupt(&code)),
                    };
                    if more {
                        self.out.push(b',');
                        pc = code.next as usize;
                    } else {
                        pc += 1;
                    }
                }
                OpType::MapEnd => {
                    self.frames.pop();
                    self.out.push(b'}');
                    pc += 1;
                }

                OpType::Recursive => {
                    self.frames.push(Frame::Call { ret: pc + 1 });
                    pc = program.recursions[code.recursion as usize].start as usize;
                }
                OpType::RecursiveEnd => match self.frames.pop() {
                    Some(Frame::Call { ret }) => pc = ret,
                    _ => return Err(self.corrupt(&code)),
                },

                OpType::StructHead(head) => {
                    let target = match deref(cur, code.ptr_num) {
                        Ok(Some(target)) => target,
                        Ok(None) => {
                            if !head.anonymous {
                                self.out.extend_from_slice(b"null");
                            }
                            pc = code.end as usize;
                            continue;
                        }
                        Err(found) => return Err(self.mismatch(code.shape, "pointer", found)),
                    };
                    let Value::Struct(fields) = target else {
                        return Err(self.mismatch(code.shape, "struct", target));
                    };
                    // embedded fields share the enclosing object's separator state
                    let wrote = head.anonymous && self.struct_wrote();
                    if !head.anonymous {
                        self.out.push(b'{');
                    }
                    self.frames.push(Frame::Struct {
                        fields: fields.as_slice(),
                        wrote,
                        field: "",
                    });
                    if head.ty == FieldType::Empty {
                        pc += 1;
                        continue;
                    }
                    match self.field(&program, &code, head.opt, head.ty, head.escaped)? {
                        Some(value) => {
                            cur = value;
                            pc += 1;
                        }
                        None => {
                            if head.only {
                                self.close_struct(head.anonymous);
                            }
                            pc = code.next as usize;
                        }
                    }
                }
                OpType::StructField(op) => {
                    match self.field(&program, &code, op.opt, op.ty, op.escaped)? {
                        Some(value) => {
                            cur = value;
                            pc += 1;
                        }
                        None => pc = code.next as usize,
                    }
                }
                OpType::StructFieldEnd(op) => {
                    self.field(&program, &code, op.opt, op.ty, op.escaped)?;
                    self.close_struct(false);
                    pc = code.next as usize;
                }
                OpType::StructEnd => {
                    self.close_struct(false);
                    pc += 1;
                }
                OpType::StructAnonymousEnd => {
                    self.close_struct(true);
                    pc += 1;
                }
            }
        }
    }

    /// Emit one struct field from the innermost struct frame.
    ///
    /// Returns the value the following instructions encode, or `None` when
    /// the field was written in full or omitted.
    fn field(
        &mut self,
        program: &Program,
        code: &Opcode,
        opt: TagOpt,
        ty: FieldType,
        escaped: bool,
    ) -> Result<Option<&'v Value>, EncodeError> {
        let (fields, wrote) = match self.frames.last_mut() {
            Some(Frame::Struct {
                fields,
                wrote,
                field,
            }) => {
                *field = code.name;
                (*fields, *wrote)
            }
            _ => return Err(self.corrupt(code)),
        };
        let Some(value) = fields.get(code.idx as usize) else {
            return Err(self.fail(EncodeErrorKind::ShapeMismatch {
                type_name: code.shape.type_name,
                expected: "one value per declared field",
                found: "too few values",
            }));
        };

        match ty {
            FieldType::Embedded => return Ok(Some(value)),
            FieldType::Empty => return Ok(None),
            _ => {}
        }
        if opt == TagOpt::OmitEmpty && value.is_empty_value() {
            return Ok(None);
        }

        if wrote {
            self.out.push(b',');
        }
        self.set_struct_wrote(true);
        self.out.extend_from_slice(program.key(code));

        let shape = code.field_shape();
        match ty {
            FieldType::Scalar(scalar, _) => self.write_pointed_scalar(
                shape,
                scalar,
                value,
                code.value_ptr_num,
                opt == TagOpt::StringTag,
                escaped,
            )?,
            FieldType::MarshalJson => self.write_marshal_json(shape, value)?,
            FieldType::MarshalText => self.write_marshal_text(shape, value, escaped)?,
            FieldType::Nested(_) => return Ok(Some(value)),
            FieldType::Empty | FieldType::Embedded => {}
        }
        Ok(None)
    }

    fn struct_wrote(&self) -> bool {
        matches!(self.frames.last(), Some(Frame::Struct { wrote: true, .. }))
    }

    fn set_struct_wrote(&mut self, on: bool) {
        if let Some(Frame::Struct { wrote, .. }) = self.frames.last_mut() {
            *wrote = on;
        }
    }

    /// Pop the innermost struct frame. Embedded structs write no brace and
    /// hand their separator state back to the enclosing object.
    fn close_struct(&mut self, anonymous: bool) {
        let wrote = matches!(self.frames.pop(), Some(Frame::Struct { wrote: true, .. }));
        if anonymous {
            self.set_struct_wrote(wrote);
        } else {
            self.out.push(b'}');
        }
    }

    fn write_pointed_scalar(
        &mut self,
        shape: &'static Shape,
        scalar: Scalar,
        value: &Value,
        ptr_num: u8,
        quoted: bool,
        escaped: bool,
    ) -> Result<(), EncodeError> {
        match deref(value, ptr_num) {
            Ok(Some(target)) => self.write_scalar(shape, scalar, target, quoted, escaped),
            Ok(None) => {
                self.out.extend_from_slice(b"null");
                Ok(())
            }
            Err(found) => Err(self.mismatch(shape, "pointer", found)),
        }
    }

    fn write_scalar(
        &mut self,
        shape: &'static Shape,
        scalar: Scalar,
        value: &Value,
        quoted: bool,
        escaped: bool,
    ) -> Result<(), EncodeError> {
        let quote = |out: &mut Vec<u8>| {
            if quoted {
                out.push(b'"');
            }
        };
        match (scalar, value) {
            (Scalar::Bool, Value::Bool(b)) => {
                quote(self.out);
                let text: &[u8] = if *b { b"true" } else { b"false" };
                self.out.extend_from_slice(text);
                quote(self.out);
            }
            (Scalar::Float32 | Scalar::Float64, Value::Float(n)) => {
                if !n.is_finite() {
                    return Err(self.fail(EncodeErrorKind::UnsupportedValue {
                        type_name: shape.type_name,
                        reason: format!("{n} has no JSON representation"),
                    }));
                }
                if scalar == Scalar::Float32 {
                    let narrowed = *n as f32;
                    if !narrowed.is_finite() {
                        return Err(self.overflow(shape, scalar, n));
                    }
                    quote(self.out);
                    write::write_f32(self.out, narrowed);
                } else {
                    quote(self.out);
                    write::write_f64(self.out, *n);
                }
                quote(self.out);
            }
            (Scalar::String, Value::String(s)) => {
                if quoted {
                    // the string's JSON text, itself encoded as a JSON string
                    let mut inner = Vec::with_capacity(s.len() + 2);
                    write::write_json_string(&mut inner, s, escaped);
                    self.out.push(b'"');
                    for byte in inner {
                        match byte {
                            b'"' => self.out.extend_from_slice(b"\\\""),
                            b'\\' => self.out.extend_from_slice(b"\\\\"),
                            _ => self.out.push(byte),
                        }
                    }
                    self.out.push(b'"');
                } else {
                    write::write_json_string(self.out, s, escaped);
                }
            }
            (Scalar::Bytes, Value::Bytes(bytes)) => write::write_base64(self.out, bytes),
            (Scalar::Bytes, Value::Null) => self.out.extend_from_slice(b"null"),
            (_, Value::Int(n)) if scalar.integer_range().is_some() => {
                self.check_range(shape, scalar, i128::from(*n))?;
                quote(self.out);
                write::write_i64(self.out, *n);
                quote(self.out);
            }
            (_, Value::Uint(n)) if scalar.integer_range().is_some() => {
                self.check_range(shape, scalar, i128::from(*n))?;
                quote(self.out);
                write::write_u64(self.out, *n);
                quote(self.out);
            }
            (_, other) => return Err(self.mismatch(shape, scalar_expectation(scalar), other)),
        }
        Ok(())
    }

    fn check_range(&self, shape: &'static Shape, scalar: Scalar, n: i128) -> Result<(), EncodeError> {
        match scalar.integer_range() {
            Some((min, max)) if n < min || n > max => Err(self.overflow(shape, scalar, n)),
            _ => Ok(()),
        }
    }

    fn overflow(&self, shape: &'static Shape, scalar: Scalar, n: impl std::fmt::Display) -> EncodeError {
        self.fail(EncodeErrorKind::UnsupportedValue {
            type_name: shape.type_name,
            reason: format!("{n} overflows {}", scalar_kind(scalar)),
        })
    }

    fn write_marshal_json(&mut self, shape: &'static Shape, value: &Value) -> Result<(), EncodeError> {
        let Some(hook) = shape.marshal_json else {
            return Err(self.mismatch(shape, "a JSON hook", value));
        };
        let bytes = hook(value).map_err(|message| {
            self.fail(EncodeErrorKind::Marshal {
                type_name: shape.type_name,
                message,
            })
        })?;
        self.out.extend_from_slice(&bytes);
        Ok(())
    }

    fn write_marshal_text(
        &mut self,
        shape: &'static Shape,
        value: &Value,
        escaped: bool,
    ) -> Result<(), EncodeError> {
        let Some(hook) = shape.marshal_text else {
            return Err(self.mismatch(shape, "a text hook", value));
        };
        let text = hook(value).map_err(|message| {
            self.fail(EncodeErrorKind::Marshal {
                type_name: shape.type_name,
                message,
            })
        })?;
        write::write_json_string(self.out, &text, escaped);
        Ok(())
    }

    /// Map keys: strings as-is, then text hooks, then integers in decimal.
    fn render_key(&self, shape: &'static Shape, key: &Value) -> Result<String, EncodeError> {
        match key {
            Value::String(s) if matches!(shape.kind, Kind::String) => return Ok(s.clone()),
            _ => {}
        }
        if let Some(hook) = shape.marshal_text {
            return hook(key).map_err(|message| {
                self.fail(EncodeErrorKind::Marshal {
                    type_name: shape.type_name,
                    message,
                })
            });
        }
        match key {
            Value::String(s) => Ok(s.clone()),
            Value::Int(n) => Ok(itoa::Buffer::new().format(*n).to_owned()),
            Value::Uint(n) => Ok(itoa::Buffer::new().format(*n).to_owned()),
            other => Err(self.mismatch(shape, "string or integer map key", other)),
        }
    }

    fn path(&self) -> Path {
        self.frames
            .iter()
            .filter_map(|frame| match frame {
                Frame::Struct { field, .. } if !field.is_empty() => Some(PathStep::Field(*field)),
                Frame::Seq { index, .. } => Some(PathStep::Index(*index)),
                Frame::Map { entries, index } => entries
                    .get(*index)
                    .map(|(key, _)| PathStep::Key(key.clone())),
                _ => None,
            })
            .collect()
    }

    fn fail(&self, kind: EncodeErrorKind) -> EncodeError {
        EncodeError::new(kind, self.root, self.path())
    }

    fn mismatch(&self, shape: &'static Shape, expected: &'static str, found: &Value) -> EncodeError {
        self.fail(EncodeErrorKind::ShapeMismatch {
            type_name: shape.type_name,
            expected,
            found: found.variant_name(),
        })
    }

    /// A frame the instruction relies on is missing.
    fn corrupt(&self, code: &Opcode) -> EncodeError {
        self.fail(EncodeErrorKind::ShapeMismatch {
            type_name: code.shape.type_name,
            expected: "an open container",
            found: "none",
        })
    }
}

const fn scalar_kind(scalar: Scalar) -> &'static str {
    match scalar {
        Scalar::Int => "int",
        Scalar::Int8 => "int8",
        Scalar::Int16 => "int16",
        Scalar::Int32 => "int32",
        Scalar::Int64 => "int64",
        Scalar::Uint => "uint",
        Scalar::Uint8 => "uint8",
        Scalar::Uint16 => "uint16",
        Scalar::Uint32 => "uint32",
        Scalar::Uint64 => "uint64",
        Scalar::Float32 => "float32",
        Scalar::Float64 => "float64",
        Scalar::Bool => "bool",
        Scalar::String => "string",
        Scalar::Bytes => "bytes",
    }
}

const fn scalar_expectation(scalar: Scalar) -> &'static str {
    match scalar {
        Scalar::Bool => "bool",
        Scalar::Float32 | Scalar::Float64 => "float",
        Scalar::String => "string",
        Scalar::Bytes => "bytes",
        _ => "integer",
    }
}
