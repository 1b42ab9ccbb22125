//! [Specification types](https://webassembly.github.io/spec/core/binary/types.html).

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

use crate::io::{
    peek_u8, read_index, read_u8, read_u32_labelled, read_vector, write_vector, Decode, Encode,
    ReadCtx, Reader, Spanned,
};
use std::fmt::{self, Display, Formatter};

pub(crate) const TAG_I32: u8 = 0x7F;
pub(crate) const TAG_I64: u8 = 0x7E;
pub(crate) const TAG_F32: u8 = 0x7D;
pub(crate) const TAG_F64: u8 = 0x7C;
pub(crate) const TAG_V128: u8 = 0x7B;
pub(crate) const TAG_I8: u8 = 0x7A;
pub(crate) const TAG_I16: u8 = 0x79;
pub(crate) const TAG_FUNCREF: u8 = 0x70;
pub(crate) const TAG_EXTERNREF: u8 = 0x6F;
pub(crate) const TAG_ANYREF: u8 = 0x6E;
pub(crate) const TAG_EQREF: u8 = 0x6D;
pub(crate) const TAG_REF_NULL: u8 = 0x6C;
pub(crate) const TAG_REF: u8 = 0x6B;
pub(crate) const TAG_I31REF: u8 = 0x6A;
pub(crate) const TAG_RTT: u8 = 0x69;
pub(crate) const TAG_EXNREF: u8 = 0x68;
pub(crate) const TAG_VOID_BLOCK: u8 = 0x40;
pub(crate) const FORM_FUNC: u8 = 0x60;
pub(crate) const FORM_STRUCT: u8 = 0x5F;
pub(crate) const FORM_ARRAY: u8 = 0x5E;

fn is_numeric_tag(byte: u8) -> bool {
    (TAG_V128..=TAG_I32).contains(&byte)
}

fn is_reference_kind_tag(byte: u8) -> bool {
    matches!(
        byte,
        TAG_FUNCREF | TAG_EXTERNREF | TAG_ANYREF | TAG_EQREF | TAG_I31REF | TAG_EXNREF
    )
}

fn is_long_ref_tag(byte: u8) -> bool {
    matches!(byte, TAG_REF | TAG_REF_NULL)
}

fn is_packed_tag(byte: u8) -> bool {
    matches!(byte, TAG_I8 | TAG_I16)
}

pub(crate) fn is_value_type_tag(byte: u8) -> bool {
    is_numeric_tag(byte) || is_reference_kind_tag(byte) || is_long_ref_tag(byte) || byte == TAG_RTT
}

/// Numeric [value type](https://webassembly.github.io/spec/core/binary/types.html#value-types).
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum NumericType {
    I32,
    I64,
    F32,
    F64,
    V128,
}

impl Display for NumericType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::V128 => "v128",
        })
    }
}

impl Encode for NumericType {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        let tag = match self {
            Self::I32 => TAG_I32,
            Self::I64 => TAG_I64,
            Self::F32 => TAG_F32,
            Self::F64 => TAG_F64,
            Self::V128 => TAG_V128,
        };
        tag.encode(w)
    }
}

/// Abbreviated reference type, e.g. `funcref`.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ReferenceKind {
    Funcref,
    Externref,
    Anyref,
    Eqref,
    I31ref,
    Exnref,
}

impl Display for ReferenceKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Funcref => "funcref",
            Self::Externref => "externref",
            Self::Anyref => "anyref",
            Self::Eqref => "eqref",
            Self::I31ref => "i31ref",
            Self::Exnref => "exnref",
        })
    }
}

impl Encode for ReferenceKind {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        let tag = match self {
            Self::Funcref => TAG_FUNCREF,
            Self::Externref => TAG_EXTERNREF,
            Self::Anyref => TAG_ANYREF,
            Self::Eqref => TAG_EQREF,
            Self::I31ref => TAG_I31REF,
            Self::Exnref => TAG_EXNREF,
        };
        tag.encode(w)
    }
}

/// Abbreviated heap type used by `ref.null`, RTTs and the long reference
/// form.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum HeapKind {
    Func,
    Extern,
    Any,
    Eq,
    I31,
    Exn,
}

impl Display for HeapKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Func => "func",
            Self::Extern => "extern",
            Self::Any => "any",
            Self::Eq => "eq",
            Self::I31 => "i31",
            Self::Exn => "exn",
        })
    }
}

impl Encode for HeapKind {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        let tag = match self {
            Self::Func => TAG_FUNCREF,
            Self::Extern => TAG_EXTERNREF,
            Self::Any => TAG_ANYREF,
            Self::Eq => TAG_EQREF,
            Self::I31 => TAG_I31REF,
            Self::Exn => TAG_EXNREF,
        };
        tag.encode(w)
    }
}

/// [Heap type](https://webassembly.github.io/gc/core/syntax/types.html#heap-types):
/// either an abbreviation or a type index.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum HeapType {
    Kind(HeapKind),
    Index(Spanned<u32>),
}

impl Display for HeapType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Kind(kind) => kind.fmt(f),
            Self::Index(index) => index.value.fmt(f),
        }
    }
}

impl<'a> Decode<'a> for HeapType {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "heap type", |ctx| {
            let peeked = peek_u8(r, ctx)?;
            if is_reference_kind_tag(peeked.value) {
                let byte = read_u8(r, ctx)?;
                let kind = decode_heap_kind(byte, ctx)?;
                Some(Spanned::new(byte.span, HeapType::Kind(kind)))
            } else {
                let value = crate::io::var::read_var_s32(r, ctx, "s32")?;
                match u32::try_from(value.value) {
                    Ok(index) => Some(Spanned::new(
                        value.span,
                        HeapType::Index(Spanned::new(value.span, index)),
                    )),
                    Err(_) => {
                        ctx.errors
                            .on_error(value.span, format!("Unknown heap type: {}", value.value));
                        None
                    }
                }
            }
        })
    }
}

impl Encode for HeapType {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        match self {
            Self::Kind(kind) => kind.encode(w),
            Self::Index(index) => i64::from(index.value).encode(w),
        }
    }
}

fn decode_heap_kind(byte: Spanned<u8>, ctx: &mut ReadCtx<'_>) -> Option<HeapKind> {
    let features = &ctx.features;
    let kind = match byte.value {
        TAG_FUNCREF => Some(HeapKind::Func),
        TAG_EXTERNREF if features.reference_types_enabled() => Some(HeapKind::Extern),
        TAG_ANYREF if features.gc_enabled() => Some(HeapKind::Any),
        TAG_EQREF if features.gc_enabled() => Some(HeapKind::Eq),
        TAG_I31REF if features.gc_enabled() => Some(HeapKind::I31),
        TAG_EXNREF if features.exceptions_enabled() => Some(HeapKind::Exn),
        _ => None,
    };
    if kind.is_none() {
        ctx.errors
            .on_error(byte.span, format!("Unknown heap kind: {}", byte.value));
    }
    kind
}

/// The long `(ref null? heaptype)` form of the function-references proposal.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct RefType {
    pub heap_type: Spanned<HeapType>,
    pub null: bool,
}

impl Display for RefType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.null {
            write!(f, "(ref null {})", self.heap_type.value)
        } else {
            write!(f, "(ref {})", self.heap_type.value)
        }
    }
}

impl<'a> Decode<'a> for RefType {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "ref type", |ctx| {
            let byte = read_u8(r, ctx)?;
            if !ctx.features.function_references_enabled() || !is_long_ref_tag(byte.value) {
                ctx.errors
                    .on_error(byte.span, format!("Unknown ref type: {}", byte.value));
                return None;
            }
            let null = byte.value == TAG_REF_NULL;
            let heap_type = HeapType::decode(r, ctx)?;
            Some(Spanned::new(r.span_from(start), RefType { heap_type, null }))
        })
    }
}

impl Encode for RefType {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        let tag = if self.null { TAG_REF_NULL } else { TAG_REF };
        tag.encode(w)?;
        self.heap_type.encode(w)
    }
}

/// [Reference type](https://webassembly.github.io/spec/core/binary/types.html#reference-types):
/// either a short kind byte or the long form.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum ReferenceType {
    Kind(ReferenceKind),
    Ref(RefType),
}

impl ReferenceType {
    pub const FUNCREF: Self = Self::Kind(ReferenceKind::Funcref);

    pub fn is_kind(&self, kind: ReferenceKind) -> bool {
        matches!(self, Self::Kind(k) if *k == kind)
    }
}

impl Display for ReferenceType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Kind(kind) => kind.fmt(f),
            Self::Ref(ref_type) => ref_type.fmt(f),
        }
    }
}

impl<'a> Decode<'a> for ReferenceType {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "reference type", |ctx| {
            let peeked = peek_u8(r, ctx)?;
            if is_long_ref_tag(peeked.value) {
                let ref_type = RefType::decode(r, ctx)?;
                Some(ref_type.map(ReferenceType::Ref))
            } else {
                let byte = read_u8(r, ctx)?;
                let features = &ctx.features;
                let kind = match byte.value {
                    TAG_FUNCREF => Some(ReferenceKind::Funcref),
                    TAG_EXTERNREF if features.reference_types_enabled() => {
                        Some(ReferenceKind::Externref)
                    }
                    TAG_ANYREF if features.gc_enabled() => Some(ReferenceKind::Anyref),
                    TAG_EQREF if features.gc_enabled() => Some(ReferenceKind::Eqref),
                    TAG_I31REF if features.gc_enabled() => Some(ReferenceKind::I31ref),
                    TAG_EXNREF if features.exceptions_enabled() => Some(ReferenceKind::Exnref),
                    _ => None,
                };
                match kind {
                    Some(kind) => Some(Spanned::new(byte.span, ReferenceType::Kind(kind))),
                    None => {
                        ctx.errors.on_error(
                            byte.span,
                            format!("Unknown reference type: {}", byte.value),
                        );
                        None
                    }
                }
            }
        })
    }
}

impl Encode for ReferenceType {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        match self {
            Self::Kind(kind) => kind.encode(w),
            Self::Ref(ref_type) => ref_type.encode(w),
        }
    }
}

/// Runtime type token of the GC proposal.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Rtt {
    pub depth: Spanned<u32>,
    pub heap_type: Spanned<HeapType>,
}

impl Display for Rtt {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "(rtt {} {})", self.depth.value, self.heap_type.value)
    }
}

impl<'a> Decode<'a> for Rtt {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "rtt", |ctx| {
            let byte = read_u8(r, ctx)?;
            if byte.value != TAG_RTT {
                ctx.errors
                    .on_error(byte.span, format!("Unknown rtt code: {}", byte.value));
                return None;
            }
            let depth = read_index(r, ctx, "depth")?;
            let heap_type = HeapType::decode(r, ctx)?;
            Some(Spanned::new(r.span_from(start), Rtt { depth, heap_type }))
        })
    }
}

impl Encode for Rtt {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        TAG_RTT.encode(w)?;
        self.depth.encode(w)?;
        self.heap_type.encode(w)
    }
}

/// [Value type](https://webassembly.github.io/spec/core/binary/types.html#value-types).
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum ValueType {
    Numeric(NumericType),
    Reference(ReferenceType),
    Rtt(Rtt),
}

impl ValueType {
    pub const I32: Self = Self::Numeric(NumericType::I32);
    pub const I64: Self = Self::Numeric(NumericType::I64);
    pub const F32: Self = Self::Numeric(NumericType::F32);
    pub const F64: Self = Self::Numeric(NumericType::F64);
    pub const V128: Self = Self::Numeric(NumericType::V128);
    pub const FUNCREF: Self = Self::Reference(ReferenceType::FUNCREF);
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Numeric(numeric) => numeric.fmt(f),
            Self::Reference(reference) => reference.fmt(f),
            Self::Rtt(rtt) => rtt.fmt(f),
        }
    }
}

impl<'a> Decode<'a> for ValueType {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "value type", |ctx| {
            let peeked = peek_u8(r, ctx)?;
            if is_numeric_tag(peeked.value) {
                let byte = read_u8(r, ctx)?;
                let numeric = match byte.value {
                    TAG_I32 => Some(NumericType::I32),
                    TAG_I64 => Some(NumericType::I64),
                    TAG_F32 => Some(NumericType::F32),
                    TAG_F64 => Some(NumericType::F64),
                    TAG_V128 if ctx.features.simd_enabled() => Some(NumericType::V128),
                    _ => None,
                };
                match numeric {
                    Some(numeric) => Some(Spanned::new(byte.span, ValueType::Numeric(numeric))),
                    None => {
                        ctx.errors
                            .on_error(byte.span, format!("Unknown value type: {}", byte.value));
                        None
                    }
                }
            } else if peeked.value == TAG_RTT && ctx.features.gc_enabled() {
                let rtt = Rtt::decode(r, ctx)?;
                Some(rtt.map(|rtt| ValueType::Rtt(rtt)))
            } else {
                let reference = ReferenceType::decode(r, ctx)?;
                // `funcref` cannot be used as a value type until the
                // reference types proposal.
                if reference.value.is_kind(ReferenceKind::Funcref)
                    && !ctx.features.reference_types_enabled()
                {
                    ctx.errors
                        .on_error(reference.span, format!("{} not allowed", reference.value));
                    return None;
                }
                Some(reference.map(ValueType::Reference))
            }
        })
    }
}

impl Encode for ValueType {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        match self {
            Self::Numeric(numeric) => numeric.encode(w),
            Self::Reference(reference) => reference.encode(w),
            Self::Rtt(rtt) => rtt.encode(w),
        }
    }
}

/// Packed storage type of GC struct/array fields.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum PackedType {
    I8,
    I16,
}

impl Display for PackedType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
        })
    }
}

impl Encode for PackedType {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        let tag = match self {
            Self::I8 => TAG_I8,
            Self::I16 => TAG_I16,
        };
        tag.encode(w)
    }
}

/// Storage type of a GC field: a value type or a packed type.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum StorageType {
    Value(ValueType),
    Packed(PackedType),
}

impl<'a> Decode<'a> for StorageType {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "storage type", |ctx| {
            let peeked = peek_u8(r, ctx)?;
            if is_packed_tag(peeked.value) {
                let byte = read_u8(r, ctx)?;
                if !ctx.features.gc_enabled() {
                    ctx.errors
                        .on_error(byte.span, format!("Unknown packed type: {}", byte.value));
                    return None;
                }
                let packed = if byte.value == TAG_I8 {
                    PackedType::I8
                } else {
                    PackedType::I16
                };
                Some(Spanned::new(byte.span, StorageType::Packed(packed)))
            } else {
                let value_type = ValueType::decode(r, ctx)?;
                Some(value_type.map(StorageType::Value))
            }
        })
    }
}

impl Encode for StorageType {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        match self {
            Self::Value(value_type) => value_type.encode(w),
            Self::Packed(packed) => packed.encode(w),
        }
    }
}

/// [Block type](https://webassembly.github.io/spec/core/binary/instructions.html#control-instructions).
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum BlockType {
    Void,
    Value(ValueType),
    /// Multi-value blocks reference a function signature in the type section.
    Index(Spanned<u32>),
}

impl<'a> Decode<'a> for BlockType {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "block type", |ctx| {
            let peeked = peek_u8(r, ctx)?;
            if peeked.value == TAG_VOID_BLOCK {
                let byte = read_u8(r, ctx)?;
                Some(Spanned::new(byte.span, BlockType::Void))
            } else if is_value_type_tag(peeked.value) {
                let value_type = ValueType::decode(r, ctx)?;
                Some(value_type.map(BlockType::Value))
            } else if ctx.features.multi_value_enabled() {
                // Type indices are encoded as positive signed integers.
                let value = crate::io::var::read_var_s32(r, ctx, "s32")?;
                match u32::try_from(value.value) {
                    Ok(index) => Some(Spanned::new(
                        value.span,
                        BlockType::Index(Spanned::new(value.span, index)),
                    )),
                    Err(_) => {
                        ctx.errors
                            .on_error(value.span, format!("Unknown block type: {}", value.value));
                        None
                    }
                }
            } else {
                ctx.errors
                    .on_error(peeked.span, format!("Unknown block type: {}", peeked.value));
                None
            }
        })
    }
}

impl Encode for BlockType {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        match self {
            Self::Void => TAG_VOID_BLOCK.encode(w),
            Self::Value(value_type) => value_type.encode(w),
            Self::Index(index) => i64::from(index.value).encode(w),
        }
    }
}

/// [Function type](https://webassembly.github.io/spec/core/binary/types.html#function-types).
#[derive(Default, PartialEq, Eq, Hash, Clone)]
pub struct FunctionType {
    pub params: Vec<Spanned<ValueType>>,
    pub results: Vec<Spanned<ValueType>>,
}

impl fmt::Debug for FunctionType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        fn types(types: &[Spanned<ValueType>], f: &mut Formatter) -> fmt::Result {
            f.write_str("(")?;
            for (i, ty) in types.iter().enumerate() {
                if i != 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", ty.value)?;
            }
            f.write_str(")")
        }

        types(&self.params, f)?;
        f.write_str(" -> ")?;
        types(&self.results, f)
    }
}

impl<'a> Decode<'a> for FunctionType {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "function type", |ctx| {
            let params = read_vector(r, ctx, "param types")?;
            let results = read_vector(r, ctx, "result types")?;
            Some(Spanned::new(
                r.span_from(start),
                FunctionType {
                    params: params.value,
                    results: results.value,
                },
            ))
        })
    }
}

impl Encode for FunctionType {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        write_vector(&self.params, w)?;
        write_vector(&self.results, w)
    }
}

/// Mutability of globals and GC fields.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Mutability {
    Const,
    Var,
}

impl Display for Mutability {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Const => "const",
            Self::Var => "var",
        })
    }
}

impl<'a> Decode<'a> for Mutability {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "mutability", |ctx| {
            let byte = read_u8(r, ctx)?;
            let mutability = match byte.value {
                0 => Mutability::Const,
                1 => Mutability::Var,
                _ => {
                    ctx.errors
                        .on_error(byte.span, format!("Unknown mutability: {}", byte.value));
                    return None;
                }
            };
            Some(Spanned::new(byte.span, mutability))
        })
    }
}

impl Encode for Mutability {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        let byte: u8 = match self {
            Self::Const => 0,
            Self::Var => 1,
        };
        byte.encode(w)
    }
}

/// GC struct/array field.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct FieldType {
    pub storage: Spanned<StorageType>,
    pub mutability: Spanned<Mutability>,
}

impl<'a> Decode<'a> for FieldType {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "field type", |ctx| {
            let storage = StorageType::decode(r, ctx)?;
            let mutability = Mutability::decode(r, ctx)?;
            Some(Spanned::new(
                r.span_from(start),
                FieldType {
                    storage,
                    mutability,
                },
            ))
        })
    }
}

impl Encode for FieldType {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.storage.encode(w)?;
        self.mutability.encode(w)
    }
}

/// GC struct type.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct StructType {
    pub fields: Vec<Spanned<FieldType>>,
}

impl<'a> Decode<'a> for StructType {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "struct type", |ctx| {
            let fields = read_vector(r, ctx, "fields")?;
            Some(Spanned::new(
                r.span_from(start),
                StructType {
                    fields: fields.value,
                },
            ))
        })
    }
}

impl Encode for StructType {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        write_vector(&self.fields, w)
    }
}

/// GC array type.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ArrayType {
    pub field: Spanned<FieldType>,
}

impl<'a> Decode<'a> for ArrayType {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "array type", |ctx| {
            let field = FieldType::decode(r, ctx)?;
            Some(Spanned::new(r.span_from(start), ArrayType { field }))
        })
    }
}

impl Encode for ArrayType {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.field.encode(w)
    }
}

/// Entry of the type section, tagged by a leading form byte.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum DefinedType {
    Func(FunctionType),
    Struct(StructType),
    Array(ArrayType),
}

impl DefinedType {
    pub fn as_function_type(&self) -> Option<&FunctionType> {
        match self {
            Self::Func(function_type) => Some(function_type),
            _ => None,
        }
    }
}

impl<'a> Decode<'a> for DefinedType {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "defined type", |ctx| {
            let form =
                ctx.guarded(r.rest_span(), "form", |ctx| read_u8(r, ctx))?;
            let defined = match form.value {
                FORM_FUNC => DefinedType::Func(FunctionType::decode(r, ctx)?.value),
                FORM_STRUCT => DefinedType::Struct(StructType::decode(r, ctx)?.value),
                FORM_ARRAY => DefinedType::Array(ArrayType::decode(r, ctx)?.value),
                _ => {
                    ctx.errors
                        .on_error(form.span, format!("Unknown type form: {}", form.value));
                    return None;
                }
            };
            Some(Spanned::new(r.span_from(start), defined))
        })
    }
}

impl Encode for DefinedType {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        match self {
            Self::Func(function_type) => {
                FORM_FUNC.encode(w)?;
                function_type.encode(w)
            }
            Self::Struct(struct_type) => {
                FORM_STRUCT.encode(w)?;
                struct_type.encode(w)
            }
            Self::Array(array_type) => {
                FORM_ARRAY.encode(w)?;
                array_type.encode(w)
            }
        }
    }
}

/// Index type of a memory or table (64-bit memories come from the memory64
/// proposal).
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub enum IndexType {
    #[default]
    I32,
    I64,
}

/// Whether limits describe a table or a memory; the legal flag combinations
/// differ.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LimitsKind {
    Table,
    Memory,
}

/// [Limits](https://webassembly.github.io/spec/core/binary/types.html#limits).
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Limits {
    pub min: Spanned<u32>,
    pub max: Option<Spanned<u32>>,
    pub shared: bool,
    pub index_type: IndexType,
}

impl Limits {
    pub fn read(r: &mut Reader<'_>, ctx: &mut ReadCtx<'_>, kind: LimitsKind) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "limits", |ctx| {
            let flags = ctx.guarded(r.rest_span(), "flags", |ctx| read_u8(r, ctx))?;

            let features = &ctx.features;
            let threads = features.threads_enabled();
            let memory64 = features.memory64_enabled();
            let (has_max, shared, index_type) = match flags.value {
                0x00 => (false, false, IndexType::I32),
                0x01 => (true, false, IndexType::I32),
                0x03 if threads => (true, true, IndexType::I32),
                0x04 if memory64 => (false, false, IndexType::I64),
                0x05 if memory64 => (true, false, IndexType::I64),
                0x07 if threads && memory64 => (true, true, IndexType::I64),
                // 0x02 and 0x06 would be shared without a maximum, which the
                // format does not allow.
                _ => {
                    ctx.errors
                        .on_error(flags.span, format!("Invalid flags value: {}", flags.value));
                    return None;
                }
            };

            if kind == LimitsKind::Table {
                if shared {
                    ctx.errors
                        .on_error(flags.span, "shared tables are not allowed");
                    return None;
                }
                if index_type == IndexType::I64 {
                    ctx.errors
                        .on_error(flags.span, "i64 index type is not allowed");
                    return None;
                }
            }

            let min = read_u32_labelled(r, ctx, "min")?;
            let max = if has_max {
                Some(read_u32_labelled(r, ctx, "max")?)
            } else {
                None
            };
            Some(Spanned::new(
                r.span_from(start),
                Limits {
                    min,
                    max,
                    shared,
                    index_type,
                },
            ))
        })
    }
}

impl Encode for Limits {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        let mut flags: u8 = 0;
        if self.max.is_some() {
            flags |= 0x01;
        }
        if self.shared {
            flags |= 0x02;
        }
        if self.index_type == IndexType::I64 {
            flags |= 0x04;
        }
        flags.encode(w)?;
        self.min.encode(w)?;
        if let Some(max) = &self.max {
            max.encode(w)?;
        }
        Ok(())
    }
}

/// [Table type](https://webassembly.github.io/spec/core/binary/types.html#table-types).
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct TableType {
    pub element: Spanned<ReferenceType>,
    pub limits: Spanned<Limits>,
}

impl<'a> Decode<'a> for TableType {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "table type", |ctx| {
            let element = ReferenceType::decode(r, ctx)?;
            let limits = Limits::read(r, ctx, LimitsKind::Table)?;
            Some(Spanned::new(r.span_from(start), TableType { element, limits }))
        })
    }
}

impl Encode for TableType {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.element.encode(w)?;
        self.limits.encode(w)
    }
}

/// [Memory type](https://webassembly.github.io/spec/core/binary/types.html#memory-types).
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct MemoryType {
    pub limits: Spanned<Limits>,
}

impl<'a> Decode<'a> for MemoryType {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "memory type", |ctx| {
            let limits = Limits::read(r, ctx, LimitsKind::Memory)?;
            Some(Spanned::new(limits.span, MemoryType { limits }))
        })
    }
}

impl Encode for MemoryType {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.limits.encode(w)
    }
}

/// [Global type](https://webassembly.github.io/spec/core/binary/types.html#global-types).
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct GlobalType {
    pub value_type: Spanned<ValueType>,
    pub mutability: Spanned<Mutability>,
}

impl<'a> Decode<'a> for GlobalType {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "global type", |ctx| {
            let value_type = ValueType::decode(r, ctx)?;
            let mutability = Mutability::decode(r, ctx)?;
            Some(Spanned::new(
                r.span_from(start),
                GlobalType {
                    value_type,
                    mutability,
                },
            ))
        })
    }
}

impl Encode for GlobalType {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.value_type.encode(w)?;
        self.mutability.encode(w)
    }
}

/// Attribute of an exception tag; `exception` is the only value so far.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum TagAttribute {
    Exception,
}

impl<'a> Decode<'a> for TagAttribute {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "tag attribute", |ctx| {
            let value = crate::io::var::read_var_u32(r, ctx, "u32")?;
            if value.value != 0 {
                ctx.errors.on_error(
                    value.span,
                    format!("Unknown tag attribute: {}", value.value),
                );
                return None;
            }
            Some(Spanned::new(value.span, TagAttribute::Exception))
        })
    }
}

impl Encode for TagAttribute {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        0u32.encode(w)
    }
}

/// [Tag type](https://webassembly.github.io/exception-handling/core/binary/types.html#tag-types).
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct TagType {
    pub attribute: Spanned<TagAttribute>,
    pub type_index: Spanned<u32>,
}

impl<'a> Decode<'a> for TagType {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "tag type", |ctx| {
            let attribute = TagAttribute::decode(r, ctx)?;
            let type_index = read_index(r, ctx, "type index")?;
            Some(Spanned::new(
                r.span_from(start),
                TagType {
                    attribute,
                    type_index,
                },
            ))
        })
    }
}

impl Encode for TagType {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.attribute.encode(w)?;
        self.type_index.encode(w)
    }
}

/// Kind byte of imports and exports.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ExternalKind {
    Function,
    Table,
    Memory,
    Global,
    Tag,
}

impl Display for ExternalKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Function => "func",
            Self::Table => "table",
            Self::Memory => "memory",
            Self::Global => "global",
            Self::Tag => "tag",
        })
    }
}

impl<'a> Decode<'a> for ExternalKind {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "external kind", |ctx| {
            let byte = read_u8(r, ctx)?;
            let kind = match byte.value {
                0 => Some(ExternalKind::Function),
                1 => Some(ExternalKind::Table),
                2 => Some(ExternalKind::Memory),
                3 => Some(ExternalKind::Global),
                4 if ctx.features.exceptions_enabled() => Some(ExternalKind::Tag),
                _ => None,
            };
            match kind {
                Some(kind) => Some(Spanned::new(byte.span, kind)),
                None => {
                    ctx.errors
                        .on_error(byte.span, format!("Unknown external kind: {}", byte.value));
                    None
                }
            }
        })
    }
}

impl Encode for ExternalKind {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        let byte: u8 = match self {
            Self::Function => 0,
            Self::Table => 1,
            Self::Memory => 2,
            Self::Global => 3,
            Self::Tag => 4,
        };
        byte.encode(w)
    }
}
