//! Type compiler: turns a [`Shape`] into a [`Program`].
//!
//! The compiler walks the shape depth-first and picks, for every field, the
//! most specialized instruction the catalog offers. Composite types met
//! again while still being compiled become `Recursive` calls into
//! sub-programs that are compiled after the main program.

use std::collections::{HashMap, HashSet};

use opjson_shape::{Field, Kind, Shape};

use crate::error::{CompileError, CompileErrorKind};
use crate::opcode::{FieldOp, FieldType, HeadOp, Nested, OpType, PtrDepth, Scalar, ValueOp, ValueType};
use crate::path::{Path, PathStep};
use crate::program::{Opcode, Program, Recursion};

/// Options fixed into a program at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Use the HTML-safe escaping variants for keys and text
    pub escape_html: bool,
    /// Emit map entries sorted by rendered key
    pub sort_map_keys: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            escape_html: true,
            sort_map_keys: true,
        }
    }
}

/// Compile a program for `shape`.
pub fn compile(shape: &'static Shape, options: CompileOptions) -> Result<Program, CompileError> {
    let mut compiler = Compiler::new(options);
    compiler.compile_value(shape)?;
    compiler.push(OpType::End, shape);

    // recursion sub-programs, including any discovered while compiling them
    let mut slot = 0;
    while slot < compiler.recursions.len() {
        let target = compiler.recursions[slot].shape;
        compiler.recursions[slot].start = compiler.at();
        compiler.in_progress.clear();
        compiler.path = Path::new();
        compiler.compile_composite(target)?;
        compiler.push(OpType::RecursiveEnd, target);
        slot += 1;
    }

    debug!(
        "compiled {}: {} instructions, {} recursion slots",
        shape.type_name,
        compiler.ops.len(),
        compiler.recursions.len()
    );

    Ok(Program {
        shape,
        ops: compiler.ops,
        keys: compiler.keys,
        recursions: compiler.recursions,
        escape_html: options.escape_html,
    })
}

struct Compiler {
    options: CompileOptions,
    ops: Vec<Opcode>,
    keys: Vec<u8>,
    recursions: Vec<Recursion>,
    /// composite shapes on the current compile stack, by address
    in_progress: Vec<usize>,
    /// one per named struct being compiled, innermost last
    scopes: Vec<Scope>,
    path: Path,
}

/// Fields of a named struct that survive promotion, addressed by their
/// index path through embedded structs.
struct Scope {
    visible: HashSet<Vec<u32>>,
    /// index path of the embedded struct being compiled
    prefix: Vec<u32>,
}

/// A field reachable from a struct through zero or more embedded structs.
struct Promoted {
    key: &'static str,
    depth: usize,
    tagged: bool,
    path: Vec<u32>,
}

impl Compiler {
    fn new(options: CompileOptions) -> Self {
        Self {
            options,
            ops: Vec::new(),
            keys: Vec::new(),
            recursions: Vec::new(),
            in_progress: Vec::new(),
            scopes: Vec::new(),
            path: Path::new(),
        }
    }

    fn at(&self) -> u32 {
        self.ops.len() as u32
    }

    fn push(&mut self, op: OpType, shape: &'static Shape) -> usize {
        let op = if self.options.escape_html {
            op.to_escaped()
        } else {
            op
        };
        trace!("{:>4} {}", self.ops.len(), op);
        self.ops.push(Opcode::new(op, shape, self.at()));
        self.ops.len() - 1
    }

    fn error(&self, kind: CompileErrorKind) -> CompileError {
        CompileError::new(kind, self.path.clone())
    }

    fn is_in_progress(&self, shape: &'static Shape) -> bool {
        self.in_progress.contains(&shape.addr())
    }

    /// Emit the instructions for a standalone value of type `shape`.
    fn compile_value(&mut self, shape: &'static Shape) -> Result<(), CompileError> {
        if let Some(ty) = hook_type(shape) {
            self.push(
                OpType::Value(ValueOp {
                    ty,
                    ptr: PtrDepth::Value,
                    escaped: false,
                }),
                shape,
            );
            return Ok(());
        }
        if let Some(scalar) = Scalar::from_kind(&shape.kind) {
            self.push(OpType::Value(ValueOp::scalar(scalar, PtrDepth::Value)), shape);
            return Ok(());
        }
        match shape.kind {
            Kind::Pointer(_) => self.compile_pointer(shape),
            Kind::Interface => {
                self.push(OpType::Interface, shape);
                Ok(())
            }
            Kind::Array(..) | Kind::Slice(_) | Kind::Map(..) | Kind::Struct(_) => {
                if self.is_in_progress(shape) {
                    self.compile_recursive_call(shape);
                    Ok(())
                } else {
                    self.compile_composite(shape)
                }
            }
            _ => Err(self.error(CompileErrorKind::Unsupported {
                type_name: shape.type_name,
            })),
        }
    }

    fn compile_composite(&mut self, shape: &'static Shape) -> Result<(), CompileError> {
        match shape.kind {
            Kind::Struct(_) => self.compile_struct(shape, 0, false),
            Kind::Slice(elem) => {
                self.in_progress.push(shape.addr());
                self.compile_sequence(shape, elem(), None)?;
                self.in_progress.pop();
                Ok(())
            }
            Kind::Array(elem, len) => {
                self.in_progress.push(shape.addr());
                self.compile_sequence(shape, elem(), Some(len))?;
                self.in_progress.pop();
                Ok(())
            }
            Kind::Map(key, value) => {
                self.in_progress.push(shape.addr());
                self.compile_map(shape, key(), value())?;
                self.in_progress.pop();
                Ok(())
            }
            _ => self.compile_value(shape),
        }
    }

    fn compile_recursive_call(&mut self, shape: &'static Shape) {
        let slot = match self.recursions.iter().position(|r| core::ptr::eq(r.shape, shape)) {
            Some(slot) => slot,
            None => {
                self.recursions.push(Recursion { shape, start: 0 });
                self.recursions.len() - 1
            }
        };
        let at = self.push(OpType::Recursive, shape);
        self.ops[at].recursion = slot as u32;
    }

    /// Walk a pointer chain; returns the first non-pointer (or hooked) target
    /// and the number of indirections in front of it.
    fn pointer_target(&self, shape: &'static Shape) -> Result<(&'static Shape, usize), CompileError> {
        let mut seen = Vec::new();
        let mut target = shape;
        while let Kind::Pointer(next) = target.kind {
            if !seen.is_empty() && target.has_hook() {
                break;
            }
            if seen.contains(&target.addr()) {
                return Err(self.error(CompileErrorKind::PointerCycle {
                    type_name: shape.type_name,
                }));
            }
            seen.push(target.addr());
            target = next();
        }
        Ok((target, seen.len()))
    }

    fn compile_pointer(&mut self, shape: &'static Shape) -> Result<(), CompileError> {
        let (target, depth) = self.pointer_target(shape)?;
        if !target.has_hook() {
            if let Some(scalar) = Scalar::from_kind(&target.kind) {
                let at = self.push(
                    OpType::Value(ValueOp::scalar(scalar, PtrDepth::from_count(depth))),
                    target,
                );
                self.ops[at].value_ptr_num = depth as u8;
                return Ok(());
            }
            if matches!(target.kind, Kind::Struct(_)) && !self.is_in_progress(target) {
                return self.compile_struct(target, depth, false);
            }
        }
        let at = self.push(OpType::Ptr, shape);
        self.ops[at].ptr_num = depth as u8;
        self.compile_value(target)?;
        self.ops[at].next = self.at();
        Ok(())
    }

    fn compile_sequence(
        &mut self,
        shape: &'static Shape,
        elem: &'static Shape,
        len: Option<usize>,
    ) -> Result<(), CompileError> {
        let (head_op, elem_op, end_op) = match len {
            Some(_) => (OpType::ArrayHead, OpType::ArrayElem, OpType::ArrayEnd),
            None => (OpType::SliceHead, OpType::SliceElem, OpType::SliceEnd),
        };
        let head = self.push(head_op, shape);
        self.ops[head].len = len.unwrap_or(0) as u32;

        let first = self.at();
        self.path.push(PathStep::Elem);
        self.compile_value(elem)?;
        self.path.pop();

        let advance = self.push(elem_op, shape);
        self.ops[advance].next = first;
        self.push(end_op, shape);
        self.ops[head].next = self.at();
        Ok(())
    }

    fn compile_map(
        &mut self,
        shape: &'static Shape,
        key: &'static Shape,
        value: &'static Shape,
    ) -> Result<(), CompileError> {
        let key_ok = key.marshal_text.is_some()
            || matches!(key.kind, Kind::String)
            || key.kind.is_integer();
        if !key_ok {
            return Err(self.error(CompileErrorKind::UnsupportedMapKey {
                type_name: key.type_name,
            }));
        }

        let head = self.push(
            OpType::MapHead {
                sorted: self.options.sort_map_keys,
            },
            shape,
        );
        let key_at = self.push(OpType::MapKey, key);

        self.path.push(PathStep::Elem);
        self.compile_value(value)?;
        self.path.pop();

        let advance = self.push(OpType::MapValue, shape);
        self.ops[advance].next = key_at as u32;
        self.push(OpType::MapEnd, shape);
        self.ops[head].next = self.at();
        Ok(())
    }

    /// Emit a struct reached through `depth` pointers. Anonymous structs
    /// are embedded: their fields are promoted into the enclosing object.
    fn compile_struct(
        &mut self,
        shape: &'static Shape,
        depth: usize,
        anonymous: bool,
    ) -> Result<(), CompileError> {
        self.in_progress.push(shape.addr());
        if !anonymous {
            let visible = self.visible_fields(shape);
            self.scopes.push(Scope {
                visible,
                prefix: Vec::new(),
            });
        }

        let fields: Vec<(usize, &'static Field)> = shape
            .fields()
            .iter()
            .enumerate()
            .filter(|&(idx, field)| !field.should_skip_serializing() && self.is_visible(idx, field))
            .collect();

        let head_at = self.ops.len();
        let close = if anonymous {
            OpType::StructAnonymousEnd
        } else {
            OpType::StructEnd
        };

        if fields.is_empty() {
            let head = self.head_op(HeadOp::new(FieldType::Empty), depth, anonymous);
            let at = self.push(head, shape);
            self.ops[at].ptr_num = depth as u8;
            self.push(close, shape);
        } else {
            let mut closed = false;
            let count = fields.len();
            for (pos, &(idx, field)) in fields.iter().enumerate() {
                let field_shape = field.shape();
                let tag = field.options();
                self.path.push(PathStep::Field(field.name));
                let (ty, value_depth) = self.field_type(field, field_shape)?;

                let op = if pos == 0 {
                    let mut op = OpType::StructHead(HeadOp::new(ty));
                    op = if tag.omit_empty {
                        op.head_to_omit_empty_head()
                    } else if tag.string {
                        op.head_to_string_tag_head()
                    } else {
                        op
                    };
                    op = self.head_op_from(op, depth, anonymous);
                    if count == 1 {
                        let only = op.head_to_only_head();
                        closed = only != op;
                        op = only;
                    }
                    op
                } else {
                    let mut op = OpType::StructField(FieldOp::new(ty));
                    op = if tag.omit_empty {
                        op.field_to_omit_empty_field()
                    } else if tag.string {
                        op.field_to_string_tag_field()
                    } else {
                        op
                    };
                    if pos == count - 1 && !anonymous {
                        let end = op.field_to_end();
                        closed = end != op;
                        op = end;
                    }
                    op
                };

                // heads operate on the struct, fields on their own type
                let at = self.push(op, if pos == 0 { shape } else { field_shape });
                self.ops[at].name = field.name;
                self.ops[at].idx = idx as u32;
                self.ops[at].value_ptr_num = value_depth as u8;
                if pos == 0 {
                    self.ops[at].ptr_num = depth as u8;
                }
                if ty != FieldType::Embedded {
                    self.write_key(at, field.json_name());
                }

                match ty {
                    FieldType::Nested(_) => self.compile_value(field_shape)?,
                    FieldType::Embedded => {
                        let (target, embedded_depth) = self.pointer_target(field_shape)?;
                        self.enter_embedded(idx);
                        let compiled = self.compile_struct(target, embedded_depth, true);
                        self.leave_embedded();
                        compiled?;
                    }
                    _ => {}
                }
                self.path.pop();
                self.ops[at].next = self.at();
            }
            if !closed {
                self.push(close, shape);
            }
        }

        self.ops[head_at].end = self.at();
        if !anonymous {
            self.scopes.pop();
        }
        self.in_progress.pop();
        Ok(())
    }

    /// Resolve promoted key conflicts for the named struct `shape`: the
    /// shallowest field with a key wins; among several at that depth, a
    /// single tagged one wins, otherwise none is emitted.
    fn visible_fields(&self, shape: &'static Shape) -> HashSet<Vec<u32>> {
        let mut promoted = Vec::new();
        self.collect_promoted(shape, &mut Vec::new(), &mut Vec::new(), &mut promoted);

        let mut by_key: HashMap<&str, Vec<Promoted>> = HashMap::new();
        for field in promoted {
            by_key.entry(field.key).or_default().push(field);
        }

        let mut visible = HashSet::new();
        for mut fields in by_key.into_values() {
            let Some(shallowest) = fields.iter().map(|field| field.depth).min() else {
                continue;
            };
            fields.retain(|field| field.depth == shallowest);
            if fields.len() > 1 {
                fields.retain(|field| field.tagged);
            }
            if let [winner] = fields.as_mut_slice() {
                visible.insert(std::mem::take(&mut winner.path));
            }
        }
        visible
    }

    fn collect_promoted(
        &self,
        shape: &'static Shape,
        prefix: &mut Vec<u32>,
        chain: &mut Vec<usize>,
        out: &mut Vec<Promoted>,
    ) {
        chain.push(shape.addr());
        for (idx, field) in shape.fields().iter().enumerate() {
            if field.should_skip_serializing() {
                continue;
            }
            prefix.push(idx as u32);
            match self.embedded_target(field, chain) {
                Some(target) => self.collect_promoted(target, prefix, chain, out),
                None => out.push(Promoted {
                    key: field.json_name(),
                    depth: prefix.len(),
                    tagged: field.options().name.is_some(),
                    path: prefix.clone(),
                }),
            }
            prefix.pop();
        }
        chain.pop();
    }

    fn is_visible(&self, idx: usize, field: &Field) -> bool {
        if self.embedded_target(field, &[]).is_some() {
            return true;
        }
        let Some(scope) = self.scopes.last() else {
            return true;
        };
        let mut path = scope.prefix.clone();
        path.push(idx as u32);
        scope.visible.contains(&path)
    }

    fn enter_embedded(&mut self, idx: usize) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.prefix.push(idx as u32);
        }
    }

    fn leave_embedded(&mut self) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.prefix.pop();
        }
    }

    fn head_op(&self, head: HeadOp, depth: usize, anonymous: bool) -> OpType {
        self.head_op_from(OpType::StructHead(head), depth, anonymous)
    }

    fn head_op_from(&self, op: OpType, depth: usize, anonymous: bool) -> OpType {
        let op = match depth {
            0 => op,
            1 => op.head_to_ptr_head(),
            _ => op.head_to_nptr_head(),
        };
        if anonymous {
            op.head_to_anonymous_head()
        } else {
            op
        }
    }

    /// Classify a field's value; the second element is the number of
    /// pointers in front of a scalar.
    fn field_type(
        &self,
        field: &Field,
        shape: &'static Shape,
    ) -> Result<(FieldType, usize), CompileError> {
        if let Some(ty) = hook_type(shape) {
            let ty = match ty {
                ValueType::MarshalJson => FieldType::MarshalJson,
                _ => FieldType::MarshalText,
            };
            return Ok((ty, 0));
        }
        if let Some(scalar) = Scalar::from_kind(&shape.kind) {
            return Ok((FieldType::Scalar(scalar, PtrDepth::Value), 0));
        }
        let ty = match shape.kind {
            Kind::Pointer(_) => {
                let (target, depth) = self.pointer_target(shape)?;
                if !target.has_hook() {
                    if let Some(scalar) = Scalar::from_kind(&target.kind) {
                        return Ok((FieldType::Scalar(scalar, PtrDepth::from_count(depth)), depth));
                    }
                    if self.embedded_target(field, &[]).is_some() {
                        return Ok((FieldType::Embedded, 0));
                    }
                }
                Nested::Ptr
            }
            Kind::Struct(_) if self.embedded_target(field, &[]).is_some() => {
                return Ok((FieldType::Embedded, 0));
            }
            Kind::Struct(_) | Kind::Array(..) | Kind::Slice(_) | Kind::Map(..)
                if self.is_in_progress(shape) =>
            {
                Nested::Recursive
            }
            Kind::Struct(_) => Nested::Struct,
            Kind::Array(..) => Nested::Array,
            Kind::Slice(_) => Nested::Slice,
            Kind::Map(..) => Nested::Map,
            Kind::Interface => Nested::Interface,
            _ => {
                return Err(self.error(CompileErrorKind::Unsupported {
                    type_name: shape.type_name,
                }));
            }
        };
        Ok((FieldType::Nested(ty), 0))
    }

    /// The struct whose fields an embedded field promotes, if it does.
    ///
    /// Tagged embedded fields and embedded hooks are ordinary named fields.
    /// So is a struct already being compiled (including any in `chain`),
    /// since embedding it would recurse forever.
    fn embedded_target(&self, field: &Field, chain: &[usize]) -> Option<&'static Shape> {
        if !field.embedded || field.options().name.is_some() {
            return None;
        }
        let shape = field.shape();
        if shape.has_hook() {
            return None;
        }
        let (target, _) = self.pointer_target(shape).ok()?;
        let embeddable = matches!(target.kind, Kind::Struct(_))
            && !target.has_hook()
            && !self.is_in_progress(target)
            && !chain.contains(&target.addr());
        embeddable.then_some(target)
    }

    fn write_key(&mut self, at: usize, name: &str) {
        let offset = self.keys.len();
        crate::write::write_json_string(&mut self.keys, name, self.options.escape_html);
        self.keys.push(b':');
        self.ops[at].key_offset = offset as u32;
        self.ops[at].key_len = (self.keys.len() - offset) as u32;
    }
}

fn hook_type(shape: &Shape) -> Option<ValueType> {
    if shape.marshal_json.is_some() {
        Some(ValueType::MarshalJson)
    } else if shape.marshal_text.is_some() {
        Some(ValueType::MarshalText)
    } else {
        None
    }
}
