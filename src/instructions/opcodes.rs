//! The opcode table: every operation across the supported proposals, with
//! its encoding (optional prefix byte plus value), text name, gating feature
//! and immediate shape.

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

use super::ImmKind;
use crate::features::Features;

pub(crate) const PREFIX_GC: u8 = 0xFB;
pub(crate) const PREFIX_MISC: u8 = 0xFC;
pub(crate) const PREFIX_SIMD: u8 = 0xFD;
pub(crate) const PREFIX_THREADS: u8 = 0xFE;

/// Whether `byte` opens a prefixed opcode under the given feature set. A
/// disabled prefix byte is an ordinary unknown opcode.
pub(crate) fn is_prefix_byte(byte: u8, features: &Features) -> bool {
    match byte {
        PREFIX_MISC => {
            features.saturating_float_to_int_enabled()
                || features.bulk_memory_enabled()
                || features.reference_types_enabled()
        }
        PREFIX_SIMD => features.simd_enabled(),
        PREFIX_THREADS => features.threads_enabled(),
        PREFIX_GC => features.gc_enabled(),
        _ => false,
    }
}

macro_rules! group_prefix {
    (plain) => {
        None::<u8>
    };
    (misc) => {
        Some(PREFIX_MISC)
    };
    (simd) => {
        Some(PREFIX_SIMD)
    };
    (threads) => {
        Some(PREFIX_THREADS)
    };
    (gc) => {
        Some(PREFIX_GC)
    };
}

macro_rules! feature_gate {
    ($f:expr, mvp) => {
        true
    };
    ($f:expr, saturating_float_to_int) => {
        $f.saturating_float_to_int_enabled()
    };
    ($f:expr, sign_extension) => {
        $f.sign_extension_enabled()
    };
    ($f:expr, simd) => {
        $f.simd_enabled()
    };
    ($f:expr, threads) => {
        $f.threads_enabled()
    };
    ($f:expr, exceptions) => {
        $f.exceptions_enabled()
    };
    ($f:expr, tail_call) => {
        $f.tail_call_enabled()
    };
    ($f:expr, bulk_memory) => {
        $f.bulk_memory_enabled()
    };
    ($f:expr, reference_types) => {
        $f.reference_types_enabled()
    };
    ($f:expr, function_references) => {
        $f.function_references_enabled()
    };
    ($f:expr, gc) => {
        $f.gc_enabled()
    };
}

macro_rules! define_opcodes {
    ($(($name:ident, $group:ident, $value:literal, $text:literal, $feature:ident, $imm:ident),)*) => {
        /// Flat enumeration of every recognised operation.
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        pub enum Opcode {
            $($name,)*
        }

        impl Opcode {
            /// The text-format name, used by diagnostics.
            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$name => $text,)*
                }
            }

            /// The binary encoding: optional prefix byte and opcode value.
            pub fn encoding(self) -> (Option<u8>, u32) {
                match self {
                    $(Opcode::$name => (group_prefix!($group), $value),)*
                }
            }

            pub(crate) fn immediate_kind(self) -> ImmKind {
                match self {
                    $(Opcode::$name => ImmKind::$imm,)*
                }
            }

            /// Looks an opcode up by encoding; recognition is gated on the
            /// opcode's proposal being enabled.
            pub(crate) fn from_encoding(
                prefix: Option<u8>,
                code: u32,
                features: &Features,
            ) -> Option<Opcode> {
                $(
                    if prefix == group_prefix!($group)
                        && code == $value
                        && feature_gate!(features, $feature)
                    {
                        return Some(Opcode::$name);
                    }
                )*
                None
            }
        }
    };
}

define_opcodes! {
    // Control.
    (Unreachable, plain, 0x00, "unreachable", mvp, None),
    (Nop, plain, 0x01, "nop", mvp, None),
    (Block, plain, 0x02, "block", mvp, Block),
    (Loop, plain, 0x03, "loop", mvp, Block),
    (If, plain, 0x04, "if", mvp, Block),
    (Else, plain, 0x05, "else", mvp, Else),
    (Try, plain, 0x06, "try", exceptions, Block),
    (Catch, plain, 0x07, "catch", exceptions, Catch),
    (Throw, plain, 0x08, "throw", exceptions, Index),
    (Rethrow, plain, 0x09, "rethrow", exceptions, Index),
    (End, plain, 0x0B, "end", mvp, End),
    (Br, plain, 0x0C, "br", mvp, Index),
    (BrIf, plain, 0x0D, "br_if", mvp, Index),
    (BrTable, plain, 0x0E, "br_table", mvp, BrTable),
    (Return, plain, 0x0F, "return", mvp, None),
    (Call, plain, 0x10, "call", mvp, Index),
    (CallIndirect, plain, 0x11, "call_indirect", mvp, CallIndirect),
    (ReturnCall, plain, 0x12, "return_call", tail_call, Index),
    (ReturnCallIndirect, plain, 0x13, "return_call_indirect", tail_call, CallIndirect),
    (CallRef, plain, 0x14, "call_ref", function_references, None),
    (ReturnCallRef, plain, 0x15, "return_call_ref", function_references, None),
    (FuncBind, plain, 0x16, "func.bind", function_references, FuncBind),
    (Let, plain, 0x17, "let", function_references, Let),
    (Delegate, plain, 0x18, "delegate", exceptions, Delegate),
    (CatchAll, plain, 0x19, "catch_all", exceptions, CatchAll),

    // Parametric.
    (Drop, plain, 0x1A, "drop", mvp, None),
    (Select, plain, 0x1B, "select", mvp, None),
    (SelectT, plain, 0x1C, "select", reference_types, SelectTypes),

    // Variables.
    (LocalGet, plain, 0x20, "local.get", mvp, Index),
    (LocalSet, plain, 0x21, "local.set", mvp, Index),
    (LocalTee, plain, 0x22, "local.tee", mvp, Index),
    (GlobalGet, plain, 0x23, "global.get", mvp, Index),
    (GlobalSet, plain, 0x24, "global.set", mvp, Index),
    (TableGet, plain, 0x25, "table.get", reference_types, Index),
    (TableSet, plain, 0x26, "table.set", reference_types, Index),

    // Memory loads/stores.
    (I32Load, plain, 0x28, "i32.load", mvp, MemArg),
    (I64Load, plain, 0x29, "i64.load", mvp, MemArg),
    (F32Load, plain, 0x2A, "f32.load", mvp, MemArg),
    (F64Load, plain, 0x2B, "f64.load", mvp, MemArg),
    (I32Load8S, plain, 0x2C, "i32.load8_s", mvp, MemArg),
    (I32Load8U, plain, 0x2D, "i32.load8_u", mvp, MemArg),
    (I32Load16S, plain, 0x2E, "i32.load16_s", mvp, MemArg),
    (I32Load16U, plain, 0x2F, "i32.load16_u", mvp, MemArg),
    (I64Load8S, plain, 0x30, "i64.load8_s", mvp, MemArg),
    (I64Load8U, plain, 0x31, "i64.load8_u", mvp, MemArg),
    (I64Load16S, plain, 0x32, "i64.load16_s", mvp, MemArg),
    (I64Load16U, plain, 0x33, "i64.load16_u", mvp, MemArg),
    (I64Load32S, plain, 0x34, "i64.load32_s", mvp, MemArg),
    (I64Load32U, plain, 0x35, "i64.load32_u", mvp, MemArg),
    (I32Store, plain, 0x36, "i32.store", mvp, MemArg),
    (I64Store, plain, 0x37, "i64.store", mvp, MemArg),
    (F32Store, plain, 0x38, "f32.store", mvp, MemArg),
    (F64Store, plain, 0x39, "f64.store", mvp, MemArg),
    (I32Store8, plain, 0x3A, "i32.store8", mvp, MemArg),
    (I32Store16, plain, 0x3B, "i32.store16", mvp, MemArg),
    (I64Store8, plain, 0x3C, "i64.store8", mvp, MemArg),
    (I64Store16, plain, 0x3D, "i64.store16", mvp, MemArg),
    (I64Store32, plain, 0x3E, "i64.store32", mvp, MemArg),
    (MemorySize, plain, 0x3F, "memory.size", mvp, Memory),
    (MemoryGrow, plain, 0x40, "memory.grow", mvp, Memory),

    // Constants.
    (I32Const, plain, 0x41, "i32.const", mvp, S32),
    (I64Const, plain, 0x42, "i64.const", mvp, S64),
    (F32Const, plain, 0x43, "f32.const", mvp, F32),
    (F64Const, plain, 0x44, "f64.const", mvp, F64),

    // Comparisons.
    (I32Eqz, plain, 0x45, "i32.eqz", mvp, None),
    (I32Eq, plain, 0x46, "i32.eq", mvp, None),
    (I32Ne, plain, 0x47, "i32.ne", mvp, None),
    (I32LtS, plain, 0x48, "i32.lt_s", mvp, None),
    (I32LtU, plain, 0x49, "i32.lt_u", mvp, None),
    (I32GtS, plain, 0x4A, "i32.gt_s", mvp, None),
    (I32GtU, plain, 0x4B, "i32.gt_u", mvp, None),
    (I32LeS, plain, 0x4C, "i32.le_s", mvp, None),
    (I32LeU, plain, 0x4D, "i32.le_u", mvp, None),
    (I32GeS, plain, 0x4E, "i32.ge_s", mvp, None),
    (I32GeU, plain, 0x4F, "i32.ge_u", mvp, None),
    (I64Eqz, plain, 0x50, "i64.eqz", mvp, None),
    (I64Eq, plain, 0x51, "i64.eq", mvp, None),
    (I64Ne, plain, 0x52, "i64.ne", mvp, None),
    (I64LtS, plain, 0x53, "i64.lt_s", mvp, None),
    (I64LtU, plain, 0x54, "i64.lt_u", mvp, None),
    (I64GtS, plain, 0x55, "i64.gt_s", mvp, None),
    (I64GtU, plain, 0x56, "i64.gt_u", mvp, None),
    (I64LeS, plain, 0x57, "i64.le_s", mvp, None),
    (I64LeU, plain, 0x58, "i64.le_u", mvp, None),
    (I64GeS, plain, 0x59, "i64.ge_s", mvp, None),
    (I64GeU, plain, 0x5A, "i64.ge_u", mvp, None),
    (F32Eq, plain, 0x5B, "f32.eq", mvp, None),
    (F32Ne, plain, 0x5C, "f32.ne", mvp, None),
    (F32Lt, plain, 0x5D, "f32.lt", mvp, None),
    (F32Gt, plain, 0x5E, "f32.gt", mvp, None),
    (F32Le, plain, 0x5F, "f32.le", mvp, None),
    (F32Ge, plain, 0x60, "f32.ge", mvp, None),
    (F64Eq, plain, 0x61, "f64.eq", mvp, None),
    (F64Ne, plain, 0x62, "f64.ne", mvp, None),
    (F64Lt, plain, 0x63, "f64.lt", mvp, None),
    (F64Gt, plain, 0x64, "f64.gt", mvp, None),
    (F64Le, plain, 0x65, "f64.le", mvp, None),
    (F64Ge, plain, 0x66, "f64.ge", mvp, None),

    // Numeric.
    (I32Clz, plain, 0x67, "i32.clz", mvp, None),
    (I32Ctz, plain, 0x68, "i32.ctz", mvp, None),
    (I32Popcnt, plain, 0x69, "i32.popcnt", mvp, None),
    (I32Add, plain, 0x6A, "i32.add", mvp, None),
    (I32Sub, plain, 0x6B, "i32.sub", mvp, None),
    (I32Mul, plain, 0x6C, "i32.mul", mvp, None),
    (I32DivS, plain, 0x6D, "i32.div_s", mvp, None),
    (I32DivU, plain, 0x6E, "i32.div_u", mvp, None),
    (I32RemS, plain, 0x6F, "i32.rem_s", mvp, None),
    (I32RemU, plain, 0x70, "i32.rem_u", mvp, None),
    (I32And, plain, 0x71, "i32.and", mvp, None),
    (I32Or, plain, 0x72, "i32.or", mvp, None),
    (I32Xor, plain, 0x73, "i32.xor", mvp, None),
    (I32Shl, plain, 0x74, "i32.shl", mvp, None),
    (I32ShrS, plain, 0x75, "i32.shr_s", mvp, None),
    (I32ShrU, plain, 0x76, "i32.shr_u", mvp, None),
    (I32Rotl, plain, 0x77, "i32.rotl", mvp, None),
    (I32Rotr, plain, 0x78, "i32.rotr", mvp, None),
    (I64Clz, plain, 0x79, "i64.clz", mvp, None),
    (I64Ctz, plain, 0x7A, "i64.ctz", mvp, None),
    (I64Popcnt, plain, 0x7B, "i64.popcnt", mvp, None),
    (I64Add, plain, 0x7C, "i64.add", mvp, None),
    (I64Sub, plain, 0x7D, "i64.sub", mvp, None),
    (I64Mul, plain, 0x7E, "i64.mul", mvp, None),
    (I64DivS, plain, 0x7F, "i64.div_s", mvp, None),
    (I64DivU, plain, 0x80, "i64.div_u", mvp, None),
    (I64RemS, plain, 0x81, "i64.rem_s", mvp, None),
    (I64RemU, plain, 0x82, "i64.rem_u", mvp, None),
    (I64And, plain, 0x83, "i64.and", mvp, None),
    (I64Or, plain, 0x84, "i64.or", mvp, None),
    (I64Xor, plain, 0x85, "i64.xor", mvp, None),
    (I64Shl, plain, 0x86, "i64.shl", mvp, None),
    (I64ShrS, plain, 0x87, "i64.shr_s", mvp, None),
    (I64ShrU, plain, 0x88, "i64.shr_u", mvp, None),
    (I64Rotl, plain, 0x89, "i64.rotl", mvp, None),
    (I64Rotr, plain, 0x8A, "i64.rotr", mvp, None),
    (F32Abs, plain, 0x8B, "f32.abs", mvp, None),
    (F32Neg, plain, 0x8C, "f32.neg", mvp, None),
    (F32Ceil, plain, 0x8D, "f32.ceil", mvp, None),
    (F32Floor, plain, 0x8E, "f32.floor", mvp, None),
    (F32Trunc, plain, 0x8F, "f32.trunc", mvp, None),
    (F32Nearest, plain, 0x90, "f32.nearest", mvp, None),
    (F32Sqrt, plain, 0x91, "f32.sqrt", mvp, None),
    (F32Add, plain, 0x92, "f32.add", mvp, None),
    (F32Sub, plain, 0x93, "f32.sub", mvp, None),
    (F32Mul, plain, 0x94, "f32.mul", mvp, None),
    (F32Div, plain, 0x95, "f32.div", mvp, None),
    (F32Min, plain, 0x96, "f32.min", mvp, None),
    (F32Max, plain, 0x97, "f32.max", mvp, None),
    (F32Copysign, plain, 0x98, "f32.copysign", mvp, None),
    (F64Abs, plain, 0x99, "f64.abs", mvp, None),
    (F64Neg, plain, 0x9A, "f64.neg", mvp, None),
    (F64Ceil, plain, 0x9B, "f64.ceil", mvp, None),
    (F64Floor, plain, 0x9C, "f64.floor", mvp, None),
    (F64Trunc, plain, 0x9D, "f64.trunc", mvp, None),
    (F64Nearest, plain, 0x9E, "f64.nearest", mvp, None),
    (F64Sqrt, plain, 0x9F, "f64.sqrt", mvp, None),
    (F64Add, plain, 0xA0, "f64.add", mvp, None),
    (F64Sub, plain, 0xA1, "f64.sub", mvp, None),
    (F64Mul, plain, 0xA2, "f64.mul", mvp, None),
    (F64Div, plain, 0xA3, "f64.div", mvp, None),
    (F64Min, plain, 0xA4, "f64.min", mvp, None),
    (F64Max, plain, 0xA5, "f64.max", mvp, None),
    (F64Copysign, plain, 0xA6, "f64.copysign", mvp, None),

    // Conversions.
    (I32WrapI64, plain, 0xA7, "i32.wrap_i64", mvp, None),
    (I32TruncF32S, plain, 0xA8, "i32.trunc_f32_s", mvp, None),
    (I32TruncF32U, plain, 0xA9, "i32.trunc_f32_u", mvp, None),
    (I32TruncF64S, plain, 0xAA, "i32.trunc_f64_s", mvp, None),
    (I32TruncF64U, plain, 0xAB, "i32.trunc_f64_u", mvp, None),
    (I64ExtendI32S, plain, 0xAC, "i64.extend_i32_s", mvp, None),
    (I64ExtendI32U, plain, 0xAD, "i64.extend_i32_u", mvp, None),
    (I64TruncF32S, plain, 0xAE, "i64.trunc_f32_s", mvp, None),
    (I64TruncF32U, plain, 0xAF, "i64.trunc_f32_u", mvp, None),
    (I64TruncF64S, plain, 0xB0, "i64.trunc_f64_s", mvp, None),
    (I64TruncF64U, plain, 0xB1, "i64.trunc_f64_u", mvp, None),
    (F32ConvertI32S, plain, 0xB2, "f32.convert_i32_s", mvp, None),
    (F32ConvertI32U, plain, 0xB3, "f32.convert_i32_u", mvp, None),
    (F32ConvertI64S, plain, 0xB4, "f32.convert_i64_s", mvp, None),
    (F32ConvertI64U, plain, 0xB5, "f32.convert_i64_u", mvp, None),
    (F32DemoteF64, plain, 0xB6, "f32.demote_f64", mvp, None),
    (F64ConvertI32S, plain, 0xB7, "f64.convert_i32_s", mvp, None),
    (F64ConvertI32U, plain, 0xB8, "f64.convert_i32_u", mvp, None),
    (F64ConvertI64S, plain, 0xB9, "f64.convert_i64_s", mvp, None),
    (F64ConvertI64U, plain, 0xBA, "f64.convert_i64_u", mvp, None),
    (F64PromoteF32, plain, 0xBB, "f64.promote_f32", mvp, None),
    (I32ReinterpretF32, plain, 0xBC, "i32.reinterpret_f32", mvp, None),
    (I64ReinterpretF64, plain, 0xBD, "i64.reinterpret_f64", mvp, None),
    (F32ReinterpretI32, plain, 0xBE, "f32.reinterpret_i32", mvp, None),
    (F64ReinterpretI64, plain, 0xBF, "f64.reinterpret_i64", mvp, None),

    // Sign extension.
    (I32Extend8S, plain, 0xC0, "i32.extend8_s", sign_extension, None),
    (I32Extend16S, plain, 0xC1, "i32.extend16_s", sign_extension, None),
    (I64Extend8S, plain, 0xC2, "i64.extend8_s", sign_extension, None),
    (I64Extend16S, plain, 0xC3, "i64.extend16_s", sign_extension, None),
    (I64Extend32S, plain, 0xC4, "i64.extend32_s", sign_extension, None),

    // Reference instructions.
    (RefNull, plain, 0xD0, "ref.null", reference_types, HeapType),
    (RefIsNull, plain, 0xD1, "ref.is_null", reference_types, None),
    (RefFunc, plain, 0xD2, "ref.func", reference_types, Index),
    (RefAsNonNull, plain, 0xD3, "ref.as_non_null", function_references, None),
    (BrOnNull, plain, 0xD4, "br_on_null", function_references, Index),
    (RefEq, plain, 0xD5, "ref.eq", gc, None),
    (BrOnNonNull, plain, 0xD6, "br_on_non_null", function_references, Index),

    // Saturating float-to-int (0xFC prefix).
    (I32TruncSatF32S, misc, 0x00, "i32.trunc_sat_f32_s", saturating_float_to_int, None),
    (I32TruncSatF32U, misc, 0x01, "i32.trunc_sat_f32_u", saturating_float_to_int, None),
    (I32TruncSatF64S, misc, 0x02, "i32.trunc_sat_f64_s", saturating_float_to_int, None),
    (I32TruncSatF64U, misc, 0x03, "i32.trunc_sat_f64_u", saturating_float_to_int, None),
    (I64TruncSatF32S, misc, 0x04, "i64.trunc_sat_f32_s", saturating_float_to_int, None),
    (I64TruncSatF32U, misc, 0x05, "i64.trunc_sat_f32_u", saturating_float_to_int, None),
    (I64TruncSatF64S, misc, 0x06, "i64.trunc_sat_f64_s", saturating_float_to_int, None),
    (I64TruncSatF64U, misc, 0x07, "i64.trunc_sat_f64_u", saturating_float_to_int, None),

    // Bulk memory (0xFC prefix).
    (MemoryInit, misc, 0x08, "memory.init", bulk_memory, InitData),
    (DataDrop, misc, 0x09, "data.drop", bulk_memory, DataIndex),
    (MemoryCopy, misc, 0x0A, "memory.copy", bulk_memory, CopyMemory),
    (MemoryFill, misc, 0x0B, "memory.fill", bulk_memory, Memory),
    (TableInit, misc, 0x0C, "table.init", bulk_memory, InitElem),
    (ElemDrop, misc, 0x0D, "elem.drop", bulk_memory, Index),
    (TableCopy, misc, 0x0E, "table.copy", bulk_memory, CopyTable),

    // Reference types table operations (0xFC prefix).
    (TableGrow, misc, 0x0F, "table.grow", reference_types, Index),
    (TableSize, misc, 0x10, "table.size", reference_types, Index),
    (TableFill, misc, 0x11, "table.fill", reference_types, Index),

    // SIMD (0xFD prefix).
    (V128Load, simd, 0x00, "v128.load", simd, MemArg),
    (V128Load8X8S, simd, 0x01, "v128.load8x8_s", simd, MemArg),
    (V128Load8X8U, simd, 0x02, "v128.load8x8_u", simd, MemArg),
    (V128Load16X4S, simd, 0x03, "v128.load16x4_s", simd, MemArg),
    (V128Load16X4U, simd, 0x04, "v128.load16x4_u", simd, MemArg),
    (V128Load32X2S, simd, 0x05, "v128.load32x2_s", simd, MemArg),
    (V128Load32X2U, simd, 0x06, "v128.load32x2_u", simd, MemArg),
    (V128Load8Splat, simd, 0x07, "v128.load8_splat", simd, MemArg),
    (V128Load16Splat, simd, 0x08, "v128.load16_splat", simd, MemArg),
    (V128Load32Splat, simd, 0x09, "v128.load32_splat", simd, MemArg),
    (V128Load64Splat, simd, 0x0A, "v128.load64_splat", simd, MemArg),
    (V128Store, simd, 0x0B, "v128.store", simd, MemArg),
    (V128Const, simd, 0x0C, "v128.const", simd, V128),
    (I8X16Shuffle, simd, 0x0D, "i8x16.shuffle", simd, Shuffle),
    (I8X16Swizzle, simd, 0x0E, "i8x16.swizzle", simd, None),
    (I8X16Splat, simd, 0x0F, "i8x16.splat", simd, None),
    (I16X8Splat, simd, 0x10, "i16x8.splat", simd, None),
    (I32X4Splat, simd, 0x11, "i32x4.splat", simd, None),
    (I64X2Splat, simd, 0x12, "i64x2.splat", simd, None),
    (F32X4Splat, simd, 0x13, "f32x4.splat", simd, None),
    (F64X2Splat, simd, 0x14, "f64x2.splat", simd, None),
    (I8X16ExtractLaneS, simd, 0x15, "i8x16.extract_lane_s", simd, Lane),
    (I8X16ExtractLaneU, simd, 0x16, "i8x16.extract_lane_u", simd, Lane),
    (I8X16ReplaceLane, simd, 0x17, "i8x16.replace_lane", simd, Lane),
    (I16X8ExtractLaneS, simd, 0x18, "i16x8.extract_lane_s", simd, Lane),
    (I16X8ExtractLaneU, simd, 0x19, "i16x8.extract_lane_u", simd, Lane),
    (I16X8ReplaceLane, simd, 0x1A, "i16x8.replace_lane", simd, Lane),
    (I32X4ExtractLane, simd, 0x1B, "i32x4.extract_lane", simd, Lane),
    (I32X4ReplaceLane, simd, 0x1C, "i32x4.replace_lane", simd, Lane),
    (I64X2ExtractLane, simd, 0x1D, "i64x2.extract_lane", simd, Lane),
    (I64X2ReplaceLane, simd, 0x1E, "i64x2.replace_lane", simd, Lane),
    (F32X4ExtractLane, simd, 0x1F, "f32x4.extract_lane", simd, Lane),
    (F32X4ReplaceLane, simd, 0x20, "f32x4.replace_lane", simd, Lane),
    (F64X2ExtractLane, simd, 0x21, "f64x2.extract_lane", simd, Lane),
    (F64X2ReplaceLane, simd, 0x22, "f64x2.replace_lane", simd, Lane),
    (I8X16Eq, simd, 0x23, "i8x16.eq", simd, None),
    (I8X16Ne, simd, 0x24, "i8x16.ne", simd, None),
    (I8X16LtS, simd, 0x25, "i8x16.lt_s", simd, None),
    (I8X16LtU, simd, 0x26, "i8x16.lt_u", simd, None),
    (I8X16GtS, simd, 0x27, "i8x16.gt_s", simd, None),
    (I8X16GtU, simd, 0x28, "i8x16.gt_u", simd, None),
    (I8X16LeS, simd, 0x29, "i8x16.le_s", simd, None),
    (I8X16LeU, simd, 0x2A, "i8x16.le_u", simd, None),
    (I8X16GeS, simd, 0x2B, "i8x16.ge_s", simd, None),
    (I8X16GeU, simd, 0x2C, "i8x16.ge_u", simd, None),
    (I16X8Eq, simd, 0x2D, "i16x8.eq", simd, None),
    (I16X8Ne, simd, 0x2E, "i16x8.ne", simd, None),
    (I16X8LtS, simd, 0x2F, "i16x8.lt_s", simd, None),
    (I16X8LtU, simd, 0x30, "i16x8.lt_u", simd, None),
    (I16X8GtS, simd, 0x31, "i16x8.gt_s", simd, None),
    (I16X8GtU, simd, 0x32, "i16x8.gt_u", simd, None),
    (I16X8LeS, simd, 0x33, "i16x8.le_s", simd, None),
    (I16X8LeU, simd, 0x34, "i16x8.le_u", simd, None),
    (I16X8GeS, simd, 0x35, "i16x8.ge_s", simd, None),
    (I16X8GeU, simd, 0x36, "i16x8.ge_u", simd, None),
    (I32X4Eq, simd, 0x37, "i32x4.eq", simd, None),
    (I32X4Ne, simd, 0x38, "i32x4.ne", simd, None),
    (I32X4LtS, simd, 0x39, "i32x4.lt_s", simd, None),
    (I32X4LtU, simd, 0x3A, "i32x4.lt_u", simd, None),
    (I32X4GtS, simd, 0x3B, "i32x4.gt_s", simd, None),
    (I32X4GtU, simd, 0x3C, "i32x4.gt_u", simd, None),
    (I32X4LeS, simd, 0x3D, "i32x4.le_s", simd, None),
    (I32X4LeU, simd, 0x3E, "i32x4.le_u", simd, None),
    (I32X4GeS, simd, 0x3F, "i32x4.ge_s", simd, None),
    (I32X4GeU, simd, 0x40, "i32x4.ge_u", simd, None),
    (F32X4Eq, simd, 0x41, "f32x4.eq", simd, None),
    (F32X4Ne, simd, 0x42, "f32x4.ne", simd, None),
    (F32X4Lt, simd, 0x43, "f32x4.lt", simd, None),
    (F32X4Gt, simd, 0x44, "f32x4.gt", simd, None),
    (F32X4Le, simd, 0x45, "f32x4.le", simd, None),
    (F32X4Ge, simd, 0x46, "f32x4.ge", simd, None),
    (F64X2Eq, simd, 0x47, "f64x2.eq", simd, None),
    (F64X2Ne, simd, 0x48, "f64x2.ne", simd, None),
    (F64X2Lt, simd, 0x49, "f64x2.lt", simd, None),
    (F64X2Gt, simd, 0x4A, "f64x2.gt", simd, None),
    (F64X2Le, simd, 0x4B, "f64x2.le", simd, None),
    (F64X2Ge, simd, 0x4C, "f64x2.ge", simd, None),
    (V128Not, simd, 0x4D, "v128.not", simd, None),
    (V128And, simd, 0x4E, "v128.and", simd, None),
    (V128Andnot, simd, 0x4F, "v128.andnot", simd, None),
    (V128Or, simd, 0x50, "v128.or", simd, None),
    (V128Xor, simd, 0x51, "v128.xor", simd, None),
    (V128Bitselect, simd, 0x52, "v128.bitselect", simd, None),
    (V128AnyTrue, simd, 0x53, "v128.any_true", simd, None),
    (V128Load8Lane, simd, 0x54, "v128.load8_lane", simd, MemLane),
    (V128Load16Lane, simd, 0x55, "v128.load16_lane", simd, MemLane),
    (V128Load32Lane, simd, 0x56, "v128.load32_lane", simd, MemLane),
    (V128Load64Lane, simd, 0x57, "v128.load64_lane", simd, MemLane),
    (V128Store8Lane, simd, 0x58, "v128.store8_lane", simd, MemLane),
    (V128Store16Lane, simd, 0x59, "v128.store16_lane", simd, MemLane),
    (V128Store32Lane, simd, 0x5A, "v128.store32_lane", simd, MemLane),
    (V128Store64Lane, simd, 0x5B, "v128.store64_lane", simd, MemLane),
    (V128Load32Zero, simd, 0x5C, "v128.load32_zero", simd, MemArg),
    (V128Load64Zero, simd, 0x5D, "v128.load64_zero", simd, MemArg),
    (F32X4DemoteF64X2Zero, simd, 0x5E, "f32x4.demote_f64x2_zero", simd, None),
    (F64X2PromoteLowF32X4, simd, 0x5F, "f64x2.promote_low_f32x4", simd, None),
    (I8X16Abs, simd, 0x60, "i8x16.abs", simd, None),
    (I8X16Neg, simd, 0x61, "i8x16.neg", simd, None),
    (I8X16Popcnt, simd, 0x62, "i8x16.popcnt", simd, None),
    (I8X16AllTrue, simd, 0x63, "i8x16.all_true", simd, None),
    (I8X16Bitmask, simd, 0x64, "i8x16.bitmask", simd, None),
    (I8X16NarrowI16X8S, simd, 0x65, "i8x16.narrow_i16x8_s", simd, None),
    (I8X16NarrowI16X8U, simd, 0x66, "i8x16.narrow_i16x8_u", simd, None),
    (F32X4Ceil, simd, 0x67, "f32x4.ceil", simd, None),
    (F32X4Floor, simd, 0x68, "f32x4.floor", simd, None),
    (F32X4Trunc, simd, 0x69, "f32x4.trunc", simd, None),
    (F32X4Nearest, simd, 0x6A, "f32x4.nearest", simd, None),
    (I8X16Shl, simd, 0x6B, "i8x16.shl", simd, None),
    (I8X16ShrS, simd, 0x6C, "i8x16.shr_s", simd, None),
    (I8X16ShrU, simd, 0x6D, "i8x16.shr_u", simd, None),
    (I8X16Add, simd, 0x6E, "i8x16.add", simd, None),
    (I8X16AddSatS, simd, 0x6F, "i8x16.add_sat_s", simd, None),
    (I8X16AddSatU, simd, 0x70, "i8x16.add_sat_u", simd, None),
    (I8X16Sub, simd, 0x71, "i8x16.sub", simd, None),
    (I8X16SubSatS, simd, 0x72, "i8x16.sub_sat_s", simd, None),
    (I8X16SubSatU, simd, 0x73, "i8x16.sub_sat_u", simd, None),
    (F64X2Ceil, simd, 0x74, "f64x2.ceil", simd, None),
    (F64X2Floor, simd, 0x75, "f64x2.floor", simd, None),
    (I8X16MinS, simd, 0x76, "i8x16.min_s", simd, None),
    (I8X16MinU, simd, 0x77, "i8x16.min_u", simd, None),
    (I8X16MaxS, simd, 0x78, "i8x16.max_s", simd, None),
    (I8X16MaxU, simd, 0x79, "i8x16.max_u", simd, None),
    (F64X2Trunc, simd, 0x7A, "f64x2.trunc", simd, None),
    (I8X16AvgrU, simd, 0x7B, "i8x16.avgr_u", simd, None),
    (I16X8ExtaddPairwiseI8X16S, simd, 0x7C, "i16x8.extadd_pairwise_i8x16_s", simd, None),
    (I16X8ExtaddPairwiseI8X16U, simd, 0x7D, "i16x8.extadd_pairwise_i8x16_u", simd, None),
    (I32X4ExtaddPairwiseI16X8S, simd, 0x7E, "i32x4.extadd_pairwise_i16x8_s", simd, None),
    (I32X4ExtaddPairwiseI16X8U, simd, 0x7F, "i32x4.extadd_pairwise_i16x8_u", simd, None),
    (I16X8Abs, simd, 0x80, "i16x8.abs", simd, None),
    (I16X8Neg, simd, 0x81, "i16x8.neg", simd, None),
    (I16X8Q15mulrSatS, simd, 0x82, "i16x8.q15mulr_sat_s", simd, None),
    (I16X8AllTrue, simd, 0x83, "i16x8.all_true", simd, None),
    (I16X8Bitmask, simd, 0x84, "i16x8.bitmask", simd, None),
    (I16X8NarrowI32X4S, simd, 0x85, "i16x8.narrow_i32x4_s", simd, None),
    (I16X8NarrowI32X4U, simd, 0x86, "i16x8.narrow_i32x4_u", simd, None),
    (I16X8ExtendLowI8X16S, simd, 0x87, "i16x8.extend_low_i8x16_s", simd, None),
    (I16X8ExtendHighI8X16S, simd, 0x88, "i16x8.extend_high_i8x16_s", simd, None),
    (I16X8ExtendLowI8X16U, simd, 0x89, "i16x8.extend_low_i8x16_u", simd, None),
    (I16X8ExtendHighI8X16U, simd, 0x8A, "i16x8.extend_high_i8x16_u", simd, None),
    (I16X8Shl, simd, 0x8B, "i16x8.shl", simd, None),
    (I16X8ShrS, simd, 0x8C, "i16x8.shr_s", simd, None),
    (I16X8ShrU, simd, 0x8D, "i16x8.shr_u", simd, None),
    (I16X8Add, simd, 0x8E, "i16x8.add", simd, None),
    (I16X8AddSatS, simd, 0x8F, "i16x8.add_sat_s", simd, None),
    (I16X8AddSatU, simd, 0x90, "i16x8.add_sat_u", simd, None),
    (I16X8Sub, simd, 0x91, "i16x8.sub", simd, None),
    (I16X8SubSatS, simd, 0x92, "i16x8.sub_sat_s", simd, None),
    (I16X8SubSatU, simd, 0x93, "i16x8.sub_sat_u", simd, None),
    (F64X2Nearest, simd, 0x94, "f64x2.nearest", simd, None),
    (I16X8Mul, simd, 0x95, "i16x8.mul", simd, None),
    (I16X8MinS, simd, 0x96, "i16x8.min_s", simd, None),
    (I16X8MinU, simd, 0x97, "i16x8.min_u", simd, None),
    (I16X8MaxS, simd, 0x98, "i16x8.max_s", simd, None),
    (I16X8MaxU, simd, 0x99, "i16x8.max_u", simd, None),
    (I16X8AvgrU, simd, 0x9B, "i16x8.avgr_u", simd, None),
    (I16X8ExtmulLowI8X16S, simd, 0x9C, "i16x8.extmul_low_i8x16_s", simd, None),
    (I16X8ExtmulHighI8X16S, simd, 0x9D, "i16x8.extmul_high_i8x16_s", simd, None),
    (I16X8ExtmulLowI8X16U, simd, 0x9E, "i16x8.extmul_low_i8x16_u", simd, None),
    (I16X8ExtmulHighI8X16U, simd, 0x9F, "i16x8.extmul_high_i8x16_u", simd, None),
    (I32X4Abs, simd, 0xA0, "i32x4.abs", simd, None),
    (I32X4Neg, simd, 0xA1, "i32x4.neg", simd, None),
    (I32X4AllTrue, simd, 0xA3, "i32x4.all_true", simd, None),
    (I32X4Bitmask, simd, 0xA4, "i32x4.bitmask", simd, None),
    (I32X4ExtendLowI16X8S, simd, 0xA7, "i32x4.extend_low_i16x8_s", simd, None),
    (I32X4ExtendHighI16X8S, simd, 0xA8, "i32x4.extend_high_i16x8_s", simd, None),
    (I32X4ExtendLowI16X8U, simd, 0xA9, "i32x4.extend_low_i16x8_u", simd, None),
    (I32X4ExtendHighI16X8U, simd, 0xAA, "i32x4.extend_high_i16x8_u", simd, None),
    (I32X4Shl, simd, 0xAB, "i32x4.shl", simd, None),
    (I32X4ShrS, simd, 0xAC, "i32x4.shr_s", simd, None),
    (I32X4ShrU, simd, 0xAD, "i32x4.shr_u", simd, None),
    (I32X4Add, simd, 0xAE, "i32x4.add", simd, None),
    (I32X4Sub, simd, 0xB1, "i32x4.sub", simd, None),
    (I32X4Mul, simd, 0xB5, "i32x4.mul", simd, None),
    (I32X4MinS, simd, 0xB6, "i32x4.min_s", simd, None),
    (I32X4MinU, simd, 0xB7, "i32x4.min_u", simd, None),
    (I32X4MaxS, simd, 0xB8, "i32x4.max_s", simd, None),
    (I32X4MaxU, simd, 0xB9, "i32x4.max_u", simd, None),
    (I32X4DotI16X8S, simd, 0xBA, "i32x4.dot_i16x8_s", simd, None),
    (I32X4ExtmulLowI16X8S, simd, 0xBC, "i32x4.extmul_low_i16x8_s", simd, None),
    (I32X4ExtmulHighI16X8S, simd, 0xBD, "i32x4.extmul_high_i16x8_s", simd, None),
    (I32X4ExtmulLowI16X8U, simd, 0xBE, "i32x4.extmul_low_i16x8_u", simd, None),
    (I32X4ExtmulHighI16X8U, simd, 0xBF, "i32x4.extmul_high_i16x8_u", simd, None),
    (I64X2Abs, simd, 0xC0, "i64x2.abs", simd, None),
    (I64X2Neg, simd, 0xC1, "i64x2.neg", simd, None),
    (I64X2AllTrue, simd, 0xC3, "i64x2.all_true", simd, None),
    (I64X2Bitmask, simd, 0xC4, "i64x2.bitmask", simd, None),
    (I64X2ExtendLowI32X4S, simd, 0xC7, "i64x2.extend_low_i32x4_s", simd, None),
    (I64X2ExtendHighI32X4S, simd, 0xC8, "i64x2.extend_high_i32x4_s", simd, None),
    (I64X2ExtendLowI32X4U, simd, 0xC9, "i64x2.extend_low_i32x4_u", simd, None),
    (I64X2ExtendHighI32X4U, simd, 0xCA, "i64x2.extend_high_i32x4_u", simd, None),
    (I64X2Shl, simd, 0xCB, "i64x2.shl", simd, None),
    (I64X2ShrS, simd, 0xCC, "i64x2.shr_s", simd, None),
    (I64X2ShrU, simd, 0xCD, "i64x2.shr_u", simd, None),
    (I64X2Add, simd, 0xCE, "i64x2.add", simd, None),
    (I64X2Sub, simd, 0xD1, "i64x2.sub", simd, None),
    (I64X2Mul, simd, 0xD5, "i64x2.mul", simd, None),
    (I64X2Eq, simd, 0xD6, "i64x2.eq", simd, None),
    (I64X2Ne, simd, 0xD7, "i64x2.ne", simd, None),
    (I64X2LtS, simd, 0xD8, "i64x2.lt_s", simd, None),
    (I64X2GtS, simd, 0xD9, "i64x2.gt_s", simd, None),
    (I64X2LeS, simd, 0xDA, "i64x2.le_s", simd, None),
    (I64X2GeS, simd, 0xDB, "i64x2.ge_s", simd, None),
    (I64X2ExtmulLowI32X4S, simd, 0xDC, "i64x2.extmul_low_i32x4_s", simd, None),
    (I64X2ExtmulHighI32X4S, simd, 0xDD, "i64x2.extmul_high_i32x4_s", simd, None),
    (I64X2ExtmulLowI32X4U, simd, 0xDE, "i64x2.extmul_low_i32x4_u", simd, None),
    (I64X2ExtmulHighI32X4U, simd, 0xDF, "i64x2.extmul_high_i32x4_u", simd, None),
    (F32X4Abs, simd, 0xE0, "f32x4.abs", simd, None),
    (F32X4Neg, simd, 0xE1, "f32x4.neg", simd, None),
    (F32X4Sqrt, simd, 0xE3, "f32x4.sqrt", simd, None),
    (F32X4Add, simd, 0xE4, "f32x4.add", simd, None),
    (F32X4Sub, simd, 0xE5, "f32x4.sub", simd, None),
    (F32X4Mul, simd, 0xE6, "f32x4.mul", simd, None),
    (F32X4Div, simd, 0xE7, "f32x4.div", simd, None),
    (F32X4Min, simd, 0xE8, "f32x4.min", simd, None),
    (F32X4Max, simd, 0xE9, "f32x4.max", simd, None),
    (F32X4Pmin, simd, 0xEA, "f32x4.pmin", simd, None),
    (F32X4Pmax, simd, 0xEB, "f32x4.pmax", simd, None),
    (F64X2Abs, simd, 0xEC, "f64x2.abs", simd, None),
    (F64X2Neg, simd, 0xED, "f64x2.neg", simd, None),
    (F64X2Sqrt, simd, 0xEF, "f64x2.sqrt", simd, None),
    (F64X2Add, simd, 0xF0, "f64x2.add", simd, None),
    (F64X2Sub, simd, 0xF1, "f64x2.sub", simd, None),
    (F64X2Mul, simd, 0xF2, "f64x2.mul", simd, None),
    (F64X2Div, simd, 0xF3, "f64x2.div", simd, None),
    (F64X2Min, simd, 0xF4, "f64x2.min", simd, None),
    (F64X2Max, simd, 0xF5, "f64x2.max", simd, None),
    (F64X2Pmin, simd, 0xF6, "f64x2.pmin", simd, None),
    (F64X2Pmax, simd, 0xF7, "f64x2.pmax", simd, None),
    (I32X4TruncSatF32X4S, simd, 0xF8, "i32x4.trunc_sat_f32x4_s", simd, None),
    (I32X4TruncSatF32X4U, simd, 0xF9, "i32x4.trunc_sat_f32x4_u", simd, None),
    (F32X4ConvertI32X4S, simd, 0xFA, "f32x4.convert_i32x4_s", simd, None),
    (F32X4ConvertI32X4U, simd, 0xFB, "f32x4.convert_i32x4_u", simd, None),
    (I32X4TruncSatF64X2SZero, simd, 0xFC, "i32x4.trunc_sat_f64x2_s_zero", simd, None),
    (I32X4TruncSatF64X2UZero, simd, 0xFD, "i32x4.trunc_sat_f64x2_u_zero", simd, None),
    (F64X2ConvertLowI32X4S, simd, 0xFE, "f64x2.convert_low_i32x4_s", simd, None),
    (F64X2ConvertLowI32X4U, simd, 0xFF, "f64x2.convert_low_i32x4_u", simd, None),

    // Threads (0xFE prefix).
    (MemoryAtomicNotify, threads, 0x00, "memory.atomic.notify", threads, MemArg),
    (MemoryAtomicWait32, threads, 0x01, "memory.atomic.wait32", threads, MemArg),
    (MemoryAtomicWait64, threads, 0x02, "memory.atomic.wait64", threads, MemArg),
    (I32AtomicLoad, threads, 0x10, "i32.atomic.load", threads, MemArg),
    (I64AtomicLoad, threads, 0x11, "i64.atomic.load", threads, MemArg),
    (I32AtomicLoad8U, threads, 0x12, "i32.atomic.load8_u", threads, MemArg),
    (I32AtomicLoad16U, threads, 0x13, "i32.atomic.load16_u", threads, MemArg),
    (I64AtomicLoad8U, threads, 0x14, "i64.atomic.load8_u", threads, MemArg),
    (I64AtomicLoad16U, threads, 0x15, "i64.atomic.load16_u", threads, MemArg),
    (I64AtomicLoad32U, threads, 0x16, "i64.atomic.load32_u", threads, MemArg),
    (I32AtomicStore, threads, 0x17, "i32.atomic.store", threads, MemArg),
    (I64AtomicStore, threads, 0x18, "i64.atomic.store", threads, MemArg),
    (I32AtomicStore8, threads, 0x19, "i32.atomic.store8", threads, MemArg),
    (I32AtomicStore16, threads, 0x1A, "i32.atomic.store16", threads, MemArg),
    (I64AtomicStore8, threads, 0x1B, "i64.atomic.store8", threads, MemArg),
    (I64AtomicStore16, threads, 0x1C, "i64.atomic.store16", threads, MemArg),
    (I64AtomicStore32, threads, 0x1D, "i64.atomic.store32", threads, MemArg),
    (I32AtomicRmwAdd, threads, 0x1E, "i32.atomic.rmw.add", threads, MemArg),
    (I64AtomicRmwAdd, threads, 0x1F, "i64.atomic.rmw.add", threads, MemArg),
    (I32AtomicRmw8AddU, threads, 0x20, "i32.atomic.rmw8.add_u", threads, MemArg),
    (I32AtomicRmw16AddU, threads, 0x21, "i32.atomic.rmw16.add_u", threads, MemArg),
    (I64AtomicRmw8AddU, threads, 0x22, "i64.atomic.rmw8.add_u", threads, MemArg),
    (I64AtomicRmw16AddU, threads, 0x23, "i64.atomic.rmw16.add_u", threads, MemArg),
    (I64AtomicRmw32AddU, threads, 0x24, "i64.atomic.rmw32.add_u", threads, MemArg),
    (I32AtomicRmwSub, threads, 0x25, "i32.atomic.rmw.sub", threads, MemArg),
    (I64AtomicRmwSub, threads, 0x26, "i64.atomic.rmw.sub", threads, MemArg),
    (I32AtomicRmw8SubU, threads, 0x27, "i32.atomic.rmw8.sub_u", threads, MemArg),
    (I32AtomicRmw16SubU, threads, 0x28, "i32.atomic.rmw16.sub_u", threads, MemArg),
    (I64AtomicRmw8SubU, threads, 0x29, "i64.atomic.rmw8.sub_u", threads, MemArg),
    (I64AtomicRmw16SubU, threads, 0x2A, "i64.atomic.rmw16.sub_u", threads, MemArg),
    (I64AtomicRmw32SubU, threads, 0x2B, "i64.atomic.rmw32.sub_u", threads, MemArg),
    (I32AtomicRmwAnd, threads, 0x2C, "i32.atomic.rmw.and", threads, MemArg),
    (I64AtomicRmwAnd, threads, 0x2D, "i64.atomic.rmw.and", threads, MemArg),
    (I32AtomicRmw8AndU, threads, 0x2E, "i32.atomic.rmw8.and_u", threads, MemArg),
    (I32AtomicRmw16AndU, threads, 0x2F, "i32.atomic.rmw16.and_u", threads, MemArg),
    (I64AtomicRmw8AndU, threads, 0x30, "i64.atomic.rmw8.and_u", threads, MemArg),
    (I64AtomicRmw16AndU, threads, 0x31, "i64.atomic.rmw16.and_u", threads, MemArg),
    (I64AtomicRmw32AndU, threads, 0x32, "i64.atomic.rmw32.and_u", threads, MemArg),
    (I32AtomicRmwOr, threads, 0x33, "i32.atomic.rmw.or", threads, MemArg),
    (I64AtomicRmwOr, threads, 0x34, "i64.atomic.rmw.or", threads, MemArg),
    (I32AtomicRmw8OrU, threads, 0x35, "i32.atomic.rmw8.or_u", threads, MemArg),
    (I32AtomicRmw16OrU, threads, 0x36, "i32.atomic.rmw16.or_u", threads, MemArg),
    (I64AtomicRmw8OrU, threads, 0x37, "i64.atomic.rmw8.or_u", threads, MemArg),
    (I64AtomicRmw16OrU, threads, 0x38, "i64.atomic.rmw16.or_u", threads, MemArg),
    (I64AtomicRmw32OrU, threads, 0x39, "i64.atomic.rmw32.or_u", threads, MemArg),
    (I32AtomicRmwXor, threads, 0x3A, "i32.atomic.rmw.xor", threads, MemArg),
    (I64AtomicRmwXor, threads, 0x3B, "i64.atomic.rmw.xor", threads, MemArg),
    (I32AtomicRmw8XorU, threads, 0x3C, "i32.atomic.rmw8.xor_u", threads, MemArg),
    (I32AtomicRmw16XorU, threads, 0x3D, "i32.atomic.rmw16.xor_u", threads, MemArg),
    (I64AtomicRmw8XorU, threads, 0x3E, "i64.atomic.rmw8.xor_u", threads, MemArg),
    (I64AtomicRmw16XorU, threads, 0x3F, "i64.atomic.rmw16.xor_u", threads, MemArg),
    (I64AtomicRmw32XorU, threads, 0x40, "i64.atomic.rmw32.xor_u", threads, MemArg),
    (I32AtomicRmwXchg, threads, 0x41, "i32.atomic.rmw.xchg", threads, MemArg),
    (I64AtomicRmwXchg, threads, 0x42, "i64.atomic.rmw.xchg", threads, MemArg),
    (I32AtomicRmw8XchgU, threads, 0x43, "i32.atomic.rmw8.xchg_u", threads, MemArg),
    (I32AtomicRmw16XchgU, threads, 0x44, "i32.atomic.rmw16.xchg_u", threads, MemArg),
    (I64AtomicRmw8XchgU, threads, 0x45, "i64.atomic.rmw8.xchg_u", threads, MemArg),
    (I64AtomicRmw16XchgU, threads, 0x46, "i64.atomic.rmw16.xchg_u", threads, MemArg),
    (I64AtomicRmw32XchgU, threads, 0x47, "i64.atomic.rmw32.xchg_u", threads, MemArg),
    (I32AtomicRmwCmpxchg, threads, 0x48, "i32.atomic.rmw.cmpxchg", threads, MemArg),
    (I64AtomicRmwCmpxchg, threads, 0x49, "i64.atomic.rmw.cmpxchg", threads, MemArg),
    (I32AtomicRmw8CmpxchgU, threads, 0x4A, "i32.atomic.rmw8.cmpxchg_u", threads, MemArg),
    (I32AtomicRmw16CmpxchgU, threads, 0x4B, "i32.atomic.rmw16.cmpxchg_u", threads, MemArg),
    (I64AtomicRmw8CmpxchgU, threads, 0x4C, "i64.atomic.rmw8.cmpxchg_u", threads, MemArg),
    (I64AtomicRmw16CmpxchgU, threads, 0x4D, "i64.atomic.rmw16.cmpxchg_u", threads, MemArg),
    (I64AtomicRmw32CmpxchgU, threads, 0x4E, "i64.atomic.rmw32.cmpxchg_u", threads, MemArg),

    // GC (0xFB prefix).
    (StructNewWithRtt, gc, 0x01, "struct.new_with_rtt", gc, Index),
    (StructNewDefaultWithRtt, gc, 0x02, "struct.new_default_with_rtt", gc, Index),
    (StructGet, gc, 0x03, "struct.get", gc, StructField),
    (StructGetS, gc, 0x04, "struct.get_s", gc, StructField),
    (StructGetU, gc, 0x05, "struct.get_u", gc, StructField),
    (StructSet, gc, 0x06, "struct.set", gc, StructField),
    (ArrayNewWithRtt, gc, 0x11, "array.new_with_rtt", gc, Index),
    (ArrayNewDefaultWithRtt, gc, 0x12, "array.new_default_with_rtt", gc, Index),
    (ArrayGet, gc, 0x13, "array.get", gc, Index),
    (ArrayGetS, gc, 0x14, "array.get_s", gc, Index),
    (ArrayGetU, gc, 0x15, "array.get_u", gc, Index),
    (ArraySet, gc, 0x16, "array.set", gc, Index),
    (ArrayLen, gc, 0x17, "array.len", gc, Index),
    (I31New, gc, 0x20, "i31.new", gc, None),
    (I31GetS, gc, 0x21, "i31.get_s", gc, None),
    (I31GetU, gc, 0x22, "i31.get_u", gc, None),
    (RttCanon, gc, 0x30, "rtt.canon", gc, HeapType),
    (RttSub, gc, 0x31, "rtt.sub", gc, HeapType),
    (RefTest, gc, 0x40, "ref.test", gc, HeapType2),
    (RefCast, gc, 0x41, "ref.cast", gc, HeapType2),
    (BrOnCast, gc, 0x42, "br_on_cast", gc, Index),
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
