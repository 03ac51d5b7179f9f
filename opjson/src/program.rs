//! Compiled programs.

use core::fmt;

use opjson_shape::Shape;

use crate::opcode::{HeadOp, OpType, PtrDepth};

/// One instruction of a [`Program`].
///
/// Jump targets are absolute instruction indices into the owning program.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Opcode {
    /// Lattice point
    pub op: OpType,
    /// Shape the instruction operates on: the struct for heads, the field's
    /// type for other struct fields, the container for container ops, the
    /// value's type otherwise
    pub shape: &'static Shape,
    /// Declared field name, for error paths; empty outside structs
    pub name: &'static str,
    /// Offset of the pre-rendered `"key":` bytes in [`Program::keys`]
    pub key_offset: u32,
    /// Length of the pre-rendered key, zero when the instruction writes none
    pub key_len: u32,
    /// Declared field index within the struct value
    pub idx: u32,
    /// Skip target: past the field's nested instructions, past a
    /// container's terminator, or the loop-back target of an element op
    pub next: u32,
    /// Struct heads: past the struct's terminator, taken for nil pointers
    pub end: u32,
    /// Pointers dereferenced before a struct head or `Ptr` proceeds
    pub ptr_num: u8,
    /// Pointers dereferenced before a scalar is written
    pub value_ptr_num: u8,
    /// Array length
    pub len: u32,
    /// Recursion table slot of a `Recursive` call
    pub recursion: u32,
}

impl Opcode {
    pub(crate) fn new(op: OpType, shape: &'static Shape, at: u32) -> Self {
        Self {
            op,
            shape,
            name: "",
            key_offset: 0,
            key_len: 0,
            idx: 0,
            next: at + 1,
            end: at + 1,
            ptr_num: 0,
            value_ptr_num: 0,
            len: 0,
            recursion: 0,
        }
    }

    /// Type of the field a struct instruction emits.
    pub fn field_shape(&self) -> &'static Shape {
        match self.op {
            OpType::StructHead(_) => self
                .shape
                .fields()
                .get(self.idx as usize)
                .map_or(self.shape, |field| field.shape()),
            _ => self.shape,
        }
    }

    /// Whether the instruction writes a pre-rendered key.
    pub const fn has_key(&self) -> bool {
        self.key_len != 0
    }
}

/// Entry of a program's recursion table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Recursion {
    /// Type the sub-program encodes
    pub shape: &'static Shape,
    /// Index of the sub-program's first instruction
    pub start: u32,
}

/// An instruction sequence encoding values of one type.
///
/// Programs are immutable once built and shared between threads.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    /// Type the program was compiled for
    pub shape: &'static Shape,
    /// Main program up to and including `End`, followed by recursion
    /// sub-programs, each terminated by `RecursiveEnd`
    pub ops: Vec<Opcode>,
    /// Pre-rendered keys, referenced by offset and length
    pub keys: Vec<u8>,
    /// Recursion table
    pub recursions: Vec<Recursion>,
    /// Map keys are written with HTML-safe escaping
    pub escape_html: bool,
}

impl Program {
    /// Total number of instructions, sub-programs included.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The pre-rendered key of an instruction.
    pub fn key(&self, code: &Opcode) -> &[u8] {
        let start = code.key_offset as usize;
        &self.keys[start..start + code.key_len as usize]
    }

    /// Names of the instructions, in order.
    pub fn op_names(&self) -> Vec<String> {
        self.ops.iter().map(|code| code.op.to_string()).collect()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (at, code) in self.ops.iter().enumerate() {
            if let Some(slot) = self.recursions.iter().position(|r| r.start as usize == at) {
                writeln!(f, "-- recursion {slot}: {}", self.recursions[slot].shape)?;
            }
            write!(f, "{at:03} {}", code.op)?;
            if code.has_key() {
                write!(f, " {}", String::from_utf8_lossy(self.key(code)))?;
            }
            if code.next as usize != at + 1 {
                write!(f, " next={}", code.next)?;
            }
            if let OpType::StructHead(HeadOp { ptr, anonymous, .. }) = code.op {
                if ptr != PtrDepth::Value || anonymous {
                    write!(f, " end={}", code.end)?;
                }
            }
            if code.op == OpType::Recursive {
                write!(f, " call={}", code.recursion)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
