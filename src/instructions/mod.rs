//! WebAssembly [instruction set](https://webassembly.github.io/spec/core/binary/instructions.html).
//!
//! Instructions are a flat `(opcode, immediate)` pair; structured control
//! flow (`block`, `loop`, `if`, `try`, `let`) stays flat in the instruction
//! stream, with the reader tracking well-nestedness through an explicit
//! open-block stack rather than recursion. Representing blocks as nested
//! trees would be ideal semantically, but blows up the stack for even
//! moderately-sized modules.

// Copyright 2020 Google Inc. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod opcodes;
pub use opcodes::Opcode;
use opcodes::is_prefix_byte;

use crate::features::Features;
use crate::io::var::{read_var_s32, read_var_s64, read_var_u32};
use crate::io::{
    read_bytes, read_index, read_reserved_index, read_u32_labelled, read_u8, read_vector,
    write_vector, Decode, Encode, FloatConst, ReadCtx, Reader, Spanned,
};
use crate::types::{BlockType, HeapType, ValueType};
use custom_debug::Debug as CustomDebug;
use std::fmt::{self, Debug, Formatter};
use thiserror::Error;

/// Soft cap on nesting depth; pathological inputs hit this long before any
/// legitimate module does.
const MAX_OPEN_BLOCKS: usize = 1 << 16;

/// Immediate shapes, one variant per encoding.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImmKind {
    None,
    Block,
    End,
    Else,
    Catch,
    CatchAll,
    Delegate,
    Index,
    DataIndex,
    BrTable,
    CallIndirect,
    MemArg,
    MemLane,
    Memory,
    S32,
    S64,
    F32,
    F64,
    V128,
    Shuffle,
    SelectTypes,
    Lane,
    InitData,
    InitElem,
    CopyMemory,
    CopyTable,
    StructField,
    FuncBind,
    Let,
    HeapType,
    HeapType2,
}

/// 128-bit SIMD literal, kept as raw little-endian bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct V128(pub [u8; 16]);

impl Debug for V128 {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "v128:")?;
        for byte in &self.0 {
            write!(f, " {byte:02x}")?;
        }
        Ok(())
    }
}

/// `br_table` target list plus default.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct BrTableImmediate {
    pub targets: Vec<Spanned<u32>>,
    pub default_target: Spanned<u32>,
}

/// `call_indirect` type and table indices. Pre-reference-types the table
/// slot is a reserved zero byte, which decodes as index 0.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct CallIndirectImmediate {
    pub type_index: Spanned<u32>,
    pub table_index: Spanned<u32>,
}

/// Memory access immediate: alignment exponent, offset, and (under
/// multi-memory) an optional explicit memory index.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct MemArgImmediate {
    pub align_log2: Spanned<u32>,
    pub offset: Spanned<u32>,
    pub memory_index: Option<Spanned<u32>>,
}

const MEMARG_HAS_MEMORY_INDEX: u32 = 1 << 6;

/// `memory.init` / `table.init` segment and destination indices.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct InitImmediate {
    pub segment_index: Spanned<u32>,
    pub dst_index: Spanned<u32>,
}

/// `memory.copy` / `table.copy` destination and source indices.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct CopyImmediate {
    pub dst_index: Spanned<u32>,
    pub src_index: Spanned<u32>,
}

/// SIMD lane load/store: a memarg plus the lane byte.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct MemoryLaneImmediate {
    pub memarg: MemArgImmediate,
    pub lane: Spanned<u8>,
}

/// `struct.get`/`struct.set` struct type and field indices.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct StructFieldImmediate {
    pub struct_index: Spanned<u32>,
    pub field_index: Spanned<u32>,
}

/// `func.bind` target function type.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct FuncBindImmediate {
    pub type_index: Spanned<u32>,
}

/// `let` block type plus the locals it introduces.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct LetImmediate {
    pub block_type: Spanned<BlockType>,
    pub locals: Vec<Spanned<Locals>>,
}

/// `ref.test`/`ref.cast` parent and child heap types.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct HeapType2Immediate {
    pub parent: Spanned<HeapType>,
    pub child: Spanned<HeapType>,
}

/// Run-length encoded locals declaration of a code body or `let`.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Locals {
    pub count: Spanned<u32>,
    pub value_type: Spanned<ValueType>,
}

impl<'a> Decode<'a> for Locals {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "locals", |ctx| {
            let count = read_index(r, ctx, "count")?;

            ctx.local_count += u64::from(count.value);
            if ctx.local_count > u64::from(u32::MAX) {
                ctx.errors
                    .on_error(count.span, format!("Too many locals: {}", ctx.local_count));
                return None;
            }

            let value_type =
                ctx.guarded(r.rest_span(), "type", |ctx| ValueType::decode(r, ctx))?;
            Some(Spanned::new(r.span_from(start), Locals { count, value_type }))
        })
    }
}

impl Encode for Locals {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.count.encode(w)?;
        self.value_type.encode(w)
    }
}

/// The immediate argument of an instruction.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Immediate {
    None,
    BlockType(Spanned<BlockType>),
    HeapType(Spanned<HeapType>),
    Index(Spanned<u32>),
    BrTable(BrTableImmediate),
    CallIndirect(CallIndirectImmediate),
    MemArg(MemArgImmediate),
    MemoryLane(MemoryLaneImmediate),
    /// Memory index of `memory.size`/`memory.grow`/`memory.fill` (a reserved
    /// zero byte without multi-memory).
    Memory(Spanned<u32>),
    S32(Spanned<i32>),
    S64(Spanned<i64>),
    F32(Spanned<FloatConst<f32>>),
    F64(Spanned<FloatConst<f64>>),
    V128(Spanned<V128>),
    Shuffle(Spanned<[u8; 16]>),
    SelectTypes(Spanned<Vec<Spanned<ValueType>>>),
    Lane(Spanned<u8>),
    Init(InitImmediate),
    Copy(CopyImmediate),
    StructField(StructFieldImmediate),
    FuncBind(FuncBindImmediate),
    Let(LetImmediate),
    HeapType2(HeapType2Immediate),
}

impl Encode for Immediate {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        match self {
            Self::None => Ok(()),
            Self::BlockType(block_type) => block_type.encode(w),
            Self::HeapType(heap_type) => heap_type.encode(w),
            Self::Index(index) | Self::Memory(index) => index.encode(w),
            Self::BrTable(imm) => {
                write_vector(&imm.targets, w)?;
                imm.default_target.encode(w)
            }
            Self::CallIndirect(imm) => {
                imm.type_index.encode(w)?;
                imm.table_index.encode(w)
            }
            Self::MemArg(imm) => imm.encode(w),
            Self::MemoryLane(imm) => {
                imm.memarg.encode(w)?;
                imm.lane.encode(w)
            }
            Self::S32(value) => value.encode(w),
            Self::S64(value) => value.encode(w),
            Self::F32(value) => w.write_all(&value.value.0.to_le_bytes()),
            Self::F64(value) => w.write_all(&value.value.0.to_le_bytes()),
            Self::V128(value) => w.write_all(&value.value.0),
            Self::Shuffle(lanes) => w.write_all(&lanes.value),
            Self::SelectTypes(types) => write_vector(&types.value, w),
            Self::Lane(lane) => lane.encode(w),
            Self::Init(imm) => {
                imm.segment_index.encode(w)?;
                imm.dst_index.encode(w)
            }
            Self::Copy(imm) => {
                imm.dst_index.encode(w)?;
                imm.src_index.encode(w)
            }
            Self::StructField(imm) => {
                imm.struct_index.encode(w)?;
                imm.field_index.encode(w)
            }
            Self::FuncBind(imm) => imm.type_index.encode(w),
            Self::Let(imm) => {
                imm.block_type.encode(w)?;
                write_vector(&imm.locals, w)
            }
            Self::HeapType2(imm) => {
                imm.parent.encode(w)?;
                imm.child.encode(w)
            }
        }
    }
}

impl Encode for MemArgImmediate {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        if let Some(memory_index) = &self.memory_index {
            (self.align_log2.value | MEMARG_HAS_MEMORY_INDEX).encode(w)?;
            self.offset.encode(w)?;
            memory_index.encode(w)
        } else {
            self.align_log2.encode(w)?;
            self.offset.encode(w)
        }
    }
}

impl MemArgImmediate {
    fn read(r: &mut Reader<'_>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        let flags = read_u32_labelled(r, ctx, "align log2")?;
        let has_memory_index = ctx.features.multi_memory_enabled()
            && flags.value & MEMARG_HAS_MEMORY_INDEX != 0;
        let align_log2 = if has_memory_index {
            Spanned::new(flags.span, flags.value & !MEMARG_HAS_MEMORY_INDEX)
        } else {
            flags
        };
        let offset = read_u32_labelled(r, ctx, "offset")?;
        let memory_index = if has_memory_index {
            Some(read_index(r, ctx, "memory index")?)
        } else {
            None
        };
        Some(Spanned::new(
            r.span_from(start),
            MemArgImmediate {
                align_log2,
                offset,
                memory_index,
            },
        ))
    }
}

impl<'a> Decode<'a> for u32 {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        read_index(r, ctx, "index")
    }
}

/// A single decoded instruction. Equality ignores byte locations.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Instruction {
    pub opcode: Spanned<Opcode>,
    pub immediate: Immediate,
}

impl Instruction {
    pub fn new(opcode: Opcode, immediate: Immediate) -> Self {
        Self {
            opcode: opcode.into(),
            immediate,
        }
    }

    /// The plain index immediate, if this instruction carries one.
    pub fn index_immediate(&self) -> Option<Spanned<u32>> {
        match &self.immediate {
            Immediate::Index(index) => Some(*index),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.opcode.value.name())
    }
}

impl<'a> Decode<'a> for Opcode {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "opcode", |ctx| {
            let byte = read_u8(r, ctx)?;
            if is_prefix_byte(byte.value, &ctx.features) {
                let code = read_var_u32(r, ctx, "u32")?;
                match Opcode::from_encoding(Some(byte.value), code.value, &ctx.features) {
                    Some(opcode) => Some(Spanned::new(r.span_from(start), opcode)),
                    None => {
                        ctx.errors.on_error(
                            r.span_from(start),
                            format!("Unknown opcode: {} {}", byte.value, code.value),
                        );
                        None
                    }
                }
            } else {
                match Opcode::from_encoding(None, u32::from(byte.value), &ctx.features) {
                    Some(opcode) => Some(Spanned::new(byte.span, opcode)),
                    None => {
                        ctx.errors
                            .on_error(byte.span, format!("Unknown opcode: {}", byte.value));
                        None
                    }
                }
            }
        })
    }
}

fn require_data_count_section(ctx: &mut ReadCtx<'_>, opcode: Spanned<Opcode>) -> bool {
    if ctx.declared_data_count.is_none() {
        ctx.errors.on_error(
            opcode.span,
            format!(
                "{} instruction requires a data count section",
                opcode.value
            ),
        );
        return false;
    }
    true
}

fn push_open_block(ctx: &mut ReadCtx<'_>, opcode: Spanned<Opcode>) -> Option<()> {
    if ctx.open_blocks.len() >= MAX_OPEN_BLOCKS {
        ctx.errors.on_error(
            opcode.span,
            format!("Too many open blocks: {MAX_OPEN_BLOCKS}"),
        );
        return None;
    }
    ctx.open_blocks.push((opcode.span, opcode.value));
    Some(())
}

fn read_call_indirect(
    r: &mut Reader<'_>,
    ctx: &mut ReadCtx<'_>,
) -> Option<CallIndirectImmediate> {
    ctx.guarded(r.rest_span(), "call_indirect", |ctx| {
        let type_index = read_index(r, ctx, "type index")?;
        let table_index = if ctx.features.reference_types_enabled() {
            read_index(r, ctx, "table index")?
        } else {
            read_reserved_index(r, ctx)?
        };
        Some(CallIndirectImmediate {
            type_index,
            table_index,
        })
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BulkKind {
    Memory,
    Table,
}

fn read_init(r: &mut Reader<'_>, ctx: &mut ReadCtx<'_>, kind: BulkKind) -> Option<InitImmediate> {
    ctx.guarded(r.rest_span(), "init immediate", |ctx| {
        let segment_index = read_index(r, ctx, "segment index")?;
        let dst_index = match kind {
            BulkKind::Table if ctx.features.reference_types_enabled() => {
                read_index(r, ctx, "table index")?
            }
            BulkKind::Memory if ctx.features.multi_memory_enabled() => {
                read_index(r, ctx, "memory index")?
            }
            _ => read_reserved_index(r, ctx)?,
        };
        Some(InitImmediate {
            segment_index,
            dst_index,
        })
    })
}

fn read_copy(r: &mut Reader<'_>, ctx: &mut ReadCtx<'_>, kind: BulkKind) -> Option<CopyImmediate> {
    ctx.guarded(r.rest_span(), "copy immediate", |ctx| {
        let explicit = match kind {
            BulkKind::Table => ctx.features.reference_types_enabled(),
            BulkKind::Memory => ctx.features.multi_memory_enabled(),
        };
        let (dst_index, src_index) = if explicit {
            let dst = read_index(r, ctx, "dst index")?;
            let src = read_index(r, ctx, "src index")?;
            (dst, src)
        } else {
            let dst = read_reserved_index(r, ctx)?;
            let src = read_reserved_index(r, ctx)?;
            (dst, src)
        };
        Some(CopyImmediate {
            dst_index,
            src_index,
        })
    })
}

fn read_memory_index(r: &mut Reader<'_>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<u32>> {
    if ctx.features.multi_memory_enabled() {
        read_index(r, ctx, "memory index")
    } else {
        read_reserved_index(r, ctx)
    }
}

impl<'a> Decode<'a> for Instruction {
    #[allow(clippy::too_many_lines)]
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        let opcode = Opcode::decode(r, ctx)?;

        if ctx.seen_final_end {
            ctx.errors.on_error(
                opcode.span,
                format!("Unexpected {} instruction after 'end'", opcode.value),
            );
            return None;
        }

        let immediate = match opcode.value.immediate_kind() {
            ImmKind::None => Immediate::None,

            ImmKind::Block => {
                let block_type = BlockType::decode(r, ctx)?;
                push_open_block(ctx, opcode)?;
                Immediate::BlockType(block_type)
            }

            ImmKind::End => {
                match ctx.open_blocks.last() {
                    None => ctx.seen_final_end = true,
                    Some((_, Opcode::Try)) => {
                        ctx.errors.on_error(
                            opcode.span,
                            "Expected catch or delegate instruction in try block",
                        );
                        return None;
                    }
                    Some(_) => {
                        ctx.open_blocks.pop();
                    }
                }
                Immediate::None
            }

            ImmKind::Else => {
                match ctx.open_blocks.last_mut() {
                    Some(top) if top.1 == Opcode::If => top.1 = Opcode::Else,
                    _ => {
                        ctx.errors
                            .on_error(opcode.span, "Unexpected else instruction");
                        return None;
                    }
                }
                Immediate::None
            }

            ImmKind::Catch => {
                match ctx.open_blocks.last_mut() {
                    Some(top) if matches!(top.1, Opcode::Try | Opcode::Catch) => {
                        top.1 = Opcode::Catch;
                    }
                    _ => {
                        ctx.errors
                            .on_error(opcode.span, "Unexpected catch instruction");
                        return None;
                    }
                }
                Immediate::Index(read_index(r, ctx, "index")?)
            }

            ImmKind::CatchAll => {
                match ctx.open_blocks.last_mut() {
                    Some(top) if matches!(top.1, Opcode::Try | Opcode::Catch) => {
                        top.1 = Opcode::CatchAll;
                    }
                    _ => {
                        ctx.errors
                            .on_error(opcode.span, "Unexpected catch_all instruction");
                        return None;
                    }
                }
                Immediate::None
            }

            ImmKind::Delegate => {
                match ctx.open_blocks.last() {
                    Some((_, Opcode::Try)) => {
                        ctx.open_blocks.pop();
                    }
                    _ => {
                        ctx.errors
                            .on_error(opcode.span, "Unexpected delegate instruction");
                        return None;
                    }
                }
                Immediate::Index(read_index(r, ctx, "index")?)
            }

            ImmKind::Index => Immediate::Index(read_index(r, ctx, "index")?),

            ImmKind::DataIndex => {
                if !require_data_count_section(ctx, opcode) {
                    return None;
                }
                Immediate::Index(read_index(r, ctx, "index")?)
            }

            ImmKind::BrTable => ctx.guarded(r.rest_span(), "br_table", |ctx| {
                let targets = read_vector(r, ctx, "targets")?;
                let default_target = read_index(r, ctx, "default target")?;
                Some(Immediate::BrTable(BrTableImmediate {
                    targets: targets.value,
                    default_target,
                }))
            })?,

            ImmKind::CallIndirect => Immediate::CallIndirect(read_call_indirect(r, ctx)?),

            ImmKind::MemArg => Immediate::MemArg(MemArgImmediate::read(r, ctx)?.value),

            ImmKind::MemLane => ctx.guarded(r.rest_span(), "memory lane immediate", |ctx| {
                let memarg = ctx.guarded(r.rest_span(), "memory immediate", |ctx| {
                    MemArgImmediate::read(r, ctx)
                })?;
                let lane = ctx.guarded(r.rest_span(), "lane", |ctx| read_u8(r, ctx))?;
                Some(Immediate::MemoryLane(MemoryLaneImmediate {
                    memarg: memarg.value,
                    lane,
                }))
            })?,

            ImmKind::Memory => Immediate::Memory(read_memory_index(r, ctx)?),

            ImmKind::S32 => Immediate::S32(ctx.guarded(r.rest_span(), "i32 constant", |ctx| {
                read_var_s32(r, ctx, "s32")
            })?),

            ImmKind::S64 => Immediate::S64(ctx.guarded(r.rest_span(), "i64 constant", |ctx| {
                read_var_s64(r, ctx, "s64")
            })?),

            ImmKind::F32 => Immediate::F32(ctx.guarded(r.rest_span(), "f32 constant", |ctx| {
                let bytes = read_bytes(r, 4, ctx)?;
                let value = f32::from_le_bytes(bytes.value.try_into().unwrap());
                Some(Spanned::new(bytes.span, FloatConst(value)))
            })?),

            ImmKind::F64 => Immediate::F64(ctx.guarded(r.rest_span(), "f64 constant", |ctx| {
                let bytes = read_bytes(r, 8, ctx)?;
                let value = f64::from_le_bytes(bytes.value.try_into().unwrap());
                Some(Spanned::new(bytes.span, FloatConst(value)))
            })?),

            ImmKind::V128 => Immediate::V128(ctx.guarded(r.rest_span(), "v128 constant", |ctx| {
                let bytes = read_bytes(r, 16, ctx)?;
                Some(Spanned::new(bytes.span, V128(bytes.value.try_into().unwrap())))
            })?),

            ImmKind::Shuffle => ctx.guarded(r.rest_span(), "shuffle immediate", |ctx| {
                let bytes = read_bytes(r, 16, ctx)?;
                Some(Immediate::Shuffle(Spanned::new(
                    bytes.span,
                    bytes.value.try_into().unwrap(),
                )))
            })?,

            ImmKind::SelectTypes => {
                let types = read_vector(r, ctx, "types")?;
                Immediate::SelectTypes(types)
            }

            ImmKind::Lane => Immediate::Lane(read_u8(r, ctx)?),

            ImmKind::InitData => {
                let imm = read_init(r, ctx, BulkKind::Memory)?;
                if !require_data_count_section(ctx, opcode) {
                    return None;
                }
                Immediate::Init(imm)
            }

            ImmKind::InitElem => Immediate::Init(read_init(r, ctx, BulkKind::Table)?),

            ImmKind::CopyMemory => Immediate::Copy(read_copy(r, ctx, BulkKind::Memory)?),

            ImmKind::CopyTable => Immediate::Copy(read_copy(r, ctx, BulkKind::Table)?),

            ImmKind::StructField => {
                ctx.guarded(r.rest_span(), "struct field immediate", |ctx| {
                    let struct_index = read_index(r, ctx, "struct")?;
                    let field_index = read_index(r, ctx, "field")?;
                    Some(Immediate::StructField(StructFieldImmediate {
                        struct_index,
                        field_index,
                    }))
                })?
            }

            ImmKind::FuncBind => Immediate::FuncBind(FuncBindImmediate {
                type_index: read_index(r, ctx, "func index")?,
            }),

            ImmKind::Let => {
                let block_type =
                    ctx.guarded(r.rest_span(), "block type", |ctx| BlockType::decode(r, ctx))?;
                let locals = read_vector(r, ctx, "locals vector")?;
                push_open_block(ctx, opcode)?;
                Immediate::Let(LetImmediate {
                    block_type,
                    locals: locals.value,
                })
            }

            ImmKind::HeapType => Immediate::HeapType(HeapType::decode(r, ctx)?),

            ImmKind::HeapType2 => ctx.guarded(r.rest_span(), "heap type 2", |ctx| {
                let parent = HeapType::decode(r, ctx)?;
                let child = HeapType::decode(r, ctx)?;
                Some(Immediate::HeapType2(HeapType2Immediate { parent, child }))
            })?,
        };

        Some(Spanned::new(
            r.span_from(start),
            Instruction { opcode, immediate },
        ))
    }
}

impl Encode for Instruction {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        let (prefix, code) = self.opcode.value.encoding();
        match prefix {
            #[allow(clippy::cast_possible_truncation)]
            None => (code as u8).encode(w)?,
            Some(prefix) => {
                prefix.encode(w)?;
                code.encode(w)?;
            }
        }
        self.immediate.encode(w)
    }
}

/// A flat, decoded instruction stream. The final `end` that closes the
/// implicit outer block is not stored; the encoder re-emits it.
pub type InstructionList = Vec<Spanned<Instruction>>;

#[derive(Debug, Error)]
#[error("Mismatched block depth")]
struct DepthError;

impl From<DepthError> for std::io::Error {
    fn from(err: DepthError) -> Self {
        Self::new(std::io::ErrorKind::InvalidData, err)
    }
}

#[derive(Default)]
struct DepthTracker {
    depth: u32,
}

impl DepthTracker {
    fn inc(&mut self) {
        self.depth += 1;
    }

    fn try_dec(&mut self) -> Result<(), DepthError> {
        self.depth = self.depth.checked_sub(1).ok_or(DepthError)?;
        Ok(())
    }

    fn assert_end(self) -> Result<(), DepthError> {
        match self.depth {
            0 => Ok(()),
            _ => Err(DepthError),
        }
    }
}

impl Encode for [Spanned<Instruction>] {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        let mut depth_tracker = DepthTracker::default();
        for instr in self {
            match instr.value.opcode.value {
                Opcode::Block | Opcode::Loop | Opcode::If | Opcode::Try | Opcode::Let => {
                    depth_tracker.inc();
                }
                Opcode::End | Opcode::Delegate => {
                    depth_tracker.try_dec()?;
                }
                _ => {}
            }
            instr.encode(w)?;
        }
        depth_tracker.assert_end()?;
        let (_, end) = Opcode::End.encoding();
        #[allow(clippy::cast_possible_truncation)]
        (end as u8).encode(w)
    }
}

/// Reads instructions until the final `end` (the one that closes the
/// implicit containing block).
pub fn read_instruction_list<'a>(
    r: &mut Reader<'a>,
    ctx: &mut ReadCtx<'_>,
) -> Option<Spanned<InstructionList>> {
    let start = r.pos();
    ctx.seen_final_end = false;
    let mut instructions = Vec::new();
    loop {
        let instruction = Instruction::decode(r, ctx)?;
        if ctx.seen_final_end {
            break;
        }
        instructions.push(instruction);
    }
    Some(Spanned::new(r.span_from(start), instructions))
}

/// Post-hook after a code body: every opened block must be closed and the
/// final `end` must have been seen.
pub fn end_code(r: &Reader<'_>, ctx: &mut ReadCtx<'_>) -> bool {
    if !ctx.open_blocks.is_empty() {
        let open = ctx.open_blocks.clone();
        for (span, opcode) in open {
            ctx.errors
                .on_error(span, format!("Unclosed {opcode} instruction"));
        }
        return false;
    }
    if !ctx.seen_final_end {
        ctx.errors
            .on_error(r.rest_span(), "Expected final end instruction");
        return false;
    }
    true
}

/// An undecoded code body: the raw bytes after the locals vector, ending at
/// the matching final `end`.
#[derive(CustomDebug, PartialEq, Eq, Hash, Clone)]
pub struct Expression<'a> {
    #[debug(with = "crate::io::fmt_bytes")]
    pub data: Spanned<&'a [u8]>,
}

impl<'a> Expression<'a> {
    /// Decodes the body into a flat instruction list, enforcing the
    /// nesting invariants. Errors are reported through `ctx`.
    pub fn read_instructions(&self, ctx: &mut ReadCtx<'_>) -> Option<InstructionList> {
        let mut r = Reader::at(self.data.value, self.data.span.offset);
        ctx.seen_final_end = false;
        ctx.open_blocks.clear();

        let mut instructions = Vec::new();
        let mut failed = false;
        while !ctx.seen_final_end {
            if r.is_empty() {
                break;
            }
            match Instruction::decode(&mut r, ctx) {
                Some(instruction) => {
                    if !ctx.seen_final_end {
                        instructions.push(instruction);
                    }
                }
                None => {
                    failed = true;
                    break;
                }
            }
        }
        let end_ok = end_code(&r, ctx);
        (!failed && end_ok).then_some(instructions)
    }
}

impl Encode for Expression<'_> {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        w.write_all(self.data.value)
    }
}

/// A global/segment initializer: a decoded instruction list whose legality
/// subset is enforced by the validator.
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone)]
pub struct ConstantExpression {
    pub instructions: InstructionList,
}

impl ConstantExpression {
    pub fn single(instruction: Instruction) -> Self {
        Self {
            instructions: vec![instruction.into()],
        }
    }
}

impl<'a> Decode<'a> for ConstantExpression {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "constant expression", |ctx| {
            let instructions = read_instruction_list(r, ctx)?;
            Some(Spanned::new(
                instructions.span,
                ConstantExpression {
                    instructions: instructions.value,
                },
            ))
        })
    }
}

impl Encode for ConstantExpression {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.instructions.encode(w)
    }
}

/// An element-segment initializer expression. These were added by the bulk
/// memory proposal, and their instructions are the ones enabled by
/// reference types regardless of the surrounding feature set.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ElementExpression {
    pub instructions: InstructionList,
}

impl<'a> Decode<'a> for ElementExpression {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "element expression", |ctx| {
            let mut features = Features::new();
            features.enable_reference_types();
            let mut sub = ctx.with_features(features);
            let instructions = read_instruction_list(r, &mut sub)?;
            Some(Spanned::new(
                instructions.span,
                ElementExpression {
                    instructions: instructions.value,
                },
            ))
        })
    }
}

impl Encode for ElementExpression {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.instructions.encode(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Errors;

    fn read_list(bytes: &[u8], features: Features) -> Result<InstructionList, Vec<String>> {
        let mut errors = Errors::new();
        let mut ctx = ReadCtx::new(features, &mut errors);
        let mut r = Reader::new(bytes);
        let result = read_instruction_list(&mut r, &mut ctx).map(|v| v.value);
        result.ok_or_else(|| errors.iter().map(ToString::to_string).collect())
    }

    fn roundtrip(bytes: &[u8], features: Features) -> Vec<u8> {
        let list = read_list(bytes, features).unwrap();
        let mut out = Vec::new();
        list.as_slice().encode(&mut out).unwrap();
        out
    }

    #[test]
    fn simple_body() {
        let bytes = [0x20, 0x00, 0x0B]; // local.get 0; end
        let list = read_list(&bytes, Features::new()).unwrap();
        assert_eq!(
            list,
            [Instruction::new(Opcode::LocalGet, Immediate::Index(0.into())).into()]
        );
        assert_eq!(roundtrip(&bytes, Features::new()), bytes);
    }

    #[test]
    fn nested_blocks_roundtrip() {
        // block (void) { loop (void) { br 0 } } end
        let bytes = [0x02, 0x40, 0x03, 0x40, 0x0C, 0x00, 0x0B, 0x0B, 0x0B];
        assert_eq!(roundtrip(&bytes, Features::new()), bytes);
    }

    #[test]
    fn else_requires_if() {
        assert_eq!(
            read_list(&[0x05, 0x0B], Features::new()),
            Err(vec!["Unexpected else instruction".into()])
        );
        // if (void) else end end
        let bytes = [0x04, 0x40, 0x05, 0x0B, 0x0B];
        assert!(read_list(&bytes, Features::new()).is_ok());
    }

    #[test]
    fn unknown_opcode_messages() {
        assert_eq!(
            read_list(&[0xC0], Features::new()),
            Err(vec!["opcode: Unknown opcode: 192".into()])
        );
        let mut simd = Features::new();
        simd.enable_simd();
        assert_eq!(
            read_list(&[0xFD, 0x80, 0x02], simd),
            Err(vec!["opcode: Unknown opcode: 253 256".into()])
        );
    }

    #[test]
    fn instructions_after_final_end_are_rejected() {
        assert_eq!(
            read_list(&[0x0B, 0x01], Features::new()),
            Err(vec!["Unexpected nop instruction after 'end'".into()])
        );
    }

    #[test]
    fn data_count_section_is_required() {
        let mut features = Features::new();
        features.enable_bulk_memory();

        // memory.init 0 0
        let bytes = [0xFC, 0x08, 0x00, 0x00, 0x0B];
        let mut errors = Errors::new();
        let mut ctx = ReadCtx::new(features, &mut errors);
        let mut r = Reader::new(&bytes);
        assert!(read_instruction_list(&mut r, &mut ctx).is_none());
        assert_eq!(
            errors.iter().next().unwrap().to_string(),
            "memory.init instruction requires a data count section"
        );

        // With a declared count it decodes.
        let mut errors = Errors::new();
        let mut ctx = ReadCtx::new(features, &mut errors);
        ctx.declared_data_count = Some(1);
        let mut r = Reader::new(&bytes);
        assert!(read_instruction_list(&mut r, &mut ctx).is_some());
    }

    #[test]
    fn memarg_with_memory_index() {
        let mut features = Features::new();
        features.enable_multi_memory();

        // i32.load align=2 (flag 0x40) offset=8 memory=1
        let bytes = [0x28, 0x42, 0x08, 0x01, 0x0B];
        let list = read_list(&bytes, features).unwrap();
        assert_eq!(
            list,
            [Instruction::new(
                Opcode::I32Load,
                Immediate::MemArg(MemArgImmediate {
                    align_log2: 2.into(),
                    offset: 8.into(),
                    memory_index: Some(1.into()),
                })
            )
            .into()]
        );
        let mut out = Vec::new();
        list.as_slice().encode(&mut out).unwrap();
        assert_eq!(out, bytes);
    }

    #[test]
    fn select_with_types() {
        let mut features = Features::new();
        features.enable_reference_types();
        let bytes = [0x1C, 0x01, 0x7F, 0x0B];
        let list = read_list(&bytes, features).unwrap();
        assert_eq!(
            list,
            [Instruction::new(
                Opcode::SelectT,
                Immediate::SelectTypes(vec![ValueType::I32.into()].into())
            )
            .into()]
        );
    }

    #[test]
    fn try_needs_catch_or_delegate() {
        let mut features = Features::new();
        features.enable_exceptions();

        // try (void) end is invalid.
        assert_eq!(
            read_list(&[0x06, 0x40, 0x0B], features),
            Err(vec![
                "Expected catch or delegate instruction in try block".into()
            ])
        );
        // try (void) catch 0 end end is valid.
        assert!(read_list(&[0x06, 0x40, 0x07, 0x00, 0x0B, 0x0B], features).is_ok());
        // try (void) delegate 0 end is valid (delegate closes the try).
        assert!(read_list(&[0x06, 0x40, 0x18, 0x00, 0x0B], features).is_ok());
    }

    #[test]
    fn expression_end_checks() {
        let mut errors = Errors::new();
        let mut ctx = ReadCtx::new(Features::new(), &mut errors);

        // block (void) with no closing end at all.
        let body = [0x02u8, 0x40];
        let expr = Expression {
            data: Spanned::new(crate::io::Span::new(0, body.len()), &body[..]),
        };
        assert!(expr.read_instructions(&mut ctx).is_none());
        let recorded: Vec<_> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(recorded, ["Unclosed block instruction"]);

        // A body that never sees its final end.
        let mut errors = Errors::new();
        let mut ctx = ReadCtx::new(Features::new(), &mut errors);
        let body = [0x01u8]; // nop, no end
        let expr = Expression {
            data: Spanned::new(crate::io::Span::new(0, body.len()), &body[..]),
        };
        assert!(expr.read_instructions(&mut ctx).is_none());
        let recorded: Vec<_> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(recorded, ["Expected final end instruction"]);
    }

    #[test]
    fn br_table_targets() {
        let bytes = [0x0E, 0x02, 0x00, 0x01, 0x02, 0x0B];
        let list = read_list(&bytes, Features::new()).unwrap();
        assert_eq!(
            list,
            [Instruction::new(
                Opcode::BrTable,
                Immediate::BrTable(BrTableImmediate {
                    targets: vec![0.into(), 1.into()],
                    default_target: 2.into(),
                })
            )
            .into()]
        );
        assert_eq!(roundtrip(&bytes, Features::new()), bytes);
    }

    #[test]
    fn atomics_roundtrip() {
        let mut features = Features::new();
        features.enable_threads();

        // i32.atomic.load align=2 offset=0
        let bytes = [0xFE, 0x10, 0x02, 0x00, 0x0B];
        let list = read_list(&bytes, features).unwrap();
        assert_eq!(
            list,
            [Instruction::new(
                Opcode::I32AtomicLoad,
                Immediate::MemArg(MemArgImmediate {
                    align_log2: 2.into(),
                    offset: 0.into(),
                    memory_index: None,
                })
            )
            .into()]
        );
        assert_eq!(roundtrip(&bytes, features), bytes);
        // Without the feature the prefix byte itself is unknown.
        assert_eq!(
            read_list(&bytes, Features::new()),
            Err(vec!["opcode: Unknown opcode: 254".into()])
        );
    }

    #[test]
    fn gc_immediates() {
        let mut features = Features::new();
        features.enable_gc();

        // struct.get 1 2
        let bytes = [0xFB, 0x03, 0x01, 0x02, 0x0B];
        let list = read_list(&bytes, features).unwrap();
        assert_eq!(
            list,
            [Instruction::new(
                Opcode::StructGet,
                Immediate::StructField(StructFieldImmediate {
                    struct_index: 1.into(),
                    field_index: 2.into(),
                })
            )
            .into()]
        );
        assert_eq!(roundtrip(&bytes, features), bytes);

        // ref.test (func any)
        let bytes = [0xFB, 0x40, 0x70, 0x6E, 0x0B];
        let list = read_list(&bytes, features).unwrap();
        assert_eq!(
            list,
            [Instruction::new(
                Opcode::RefTest,
                Immediate::HeapType2(HeapType2Immediate {
                    parent: crate::types::HeapType::Kind(crate::types::HeapKind::Func).into(),
                    child: crate::types::HeapType::Kind(crate::types::HeapKind::Any).into(),
                })
            )
            .into()]
        );
        assert_eq!(roundtrip(&bytes, features), bytes);
    }

    #[test]
    fn let_scopes_and_locals() {
        let mut features = Features::new();
        features.enable_function_references();

        // let (void) with 2 i32 locals, then end end.
        let bytes = [0x17, 0x40, 0x01, 0x02, 0x7F, 0x0B, 0x0B];
        let list = read_list(&bytes, features).unwrap();
        assert_eq!(
            list,
            [
                Instruction::new(
                    Opcode::Let,
                    Immediate::Let(LetImmediate {
                        block_type: BlockType::Void.into(),
                        locals: vec![Locals {
                            count: 2.into(),
                            value_type: ValueType::I32.into(),
                        }
                        .into()],
                    })
                )
                .into(),
                Instruction::new(Opcode::End, Immediate::None).into(),
            ]
        );
        assert_eq!(roundtrip(&bytes, features), bytes);
    }

    #[test]
    fn v128_const_roundtrip() {
        let mut features = Features::new();
        features.enable_simd();

        let mut bytes = vec![0xFD, 0x0C];
        bytes.extend(0u8..16);
        bytes.push(0x0B);
        let list = read_list(&bytes, features).unwrap();
        let Immediate::V128(value) = &list[0].value.immediate else {
            panic!("expected a v128 immediate");
        };
        assert_eq!(value.value.0, std::array::from_fn::<u8, 16, _>(|i| i as u8));
        assert_eq!(roundtrip(&bytes, features), bytes);
    }

    #[test]
    fn tail_calls_are_gated() {
        assert_eq!(
            read_list(&[0x12, 0x00, 0x0B], Features::new()),
            Err(vec!["opcode: Unknown opcode: 18".into()])
        );
        let mut features = Features::new();
        features.enable_tail_call();
        let list = read_list(&[0x12, 0x00, 0x0B], features).unwrap();
        assert_eq!(
            list,
            [Instruction::new(Opcode::ReturnCall, Immediate::Index(0.into())).into()]
        );
    }

    #[test]
    fn constant_expression_decodes_single_producer() {
        let mut errors = Errors::new();
        let mut ctx = ReadCtx::new(Features::new(), &mut errors);
        let bytes = [0x41, 0x2A, 0x0B]; // i32.const 42; end
        let mut r = Reader::new(&bytes);
        let expr = ConstantExpression::decode(&mut r, &mut ctx).unwrap();
        assert_eq!(
            expr.value,
            ConstantExpression::single(Instruction::new(
                Opcode::I32Const,
                Immediate::S32(42.into())
            ))
        );
        let mut out = Vec::new();
        expr.encode(&mut out).unwrap();
        assert_eq!(out, bytes);
    }
}
