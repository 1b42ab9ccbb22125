//! Section framing and per-section element readers.
//!
//! Known sections are length-framed blobs whose payload is consumed through
//! [`LazySection`] iterators: each `next()` decodes exactly one element and
//! reports its errors, and dropping the iterator early skips the remainder.

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

use crate::instructions::{ConstantExpression, ElementExpression, Expression, Locals};
use crate::io::{
    read_bytes, read_count, read_index, read_length, read_u8, read_utf8_string, read_vector,
    write_bytes_prefixed, Decode, Encode, ReadCtx, Reader, Spanned,
};
use crate::types::{
    DefinedType, ExternalKind, GlobalType, MemoryType, ReferenceType, TableType, TagType,
};
use custom_debug::Debug as CustomDebug;
use std::fmt::{self, Display, Formatter};
use std::marker::PhantomData;

/// Identifier byte of a known section.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum SectionId {
    Custom,
    Type,
    Import,
    Function,
    Table,
    Memory,
    Global,
    Export,
    Start,
    Element,
    Code,
    Data,
    DataCount,
    Tag,
}

impl SectionId {
    pub fn id(self) -> u8 {
        match self {
            Self::Custom => 0,
            Self::Type => 1,
            Self::Import => 2,
            Self::Function => 3,
            Self::Table => 4,
            Self::Memory => 5,
            Self::Global => 6,
            Self::Export => 7,
            Self::Start => 8,
            Self::Element => 9,
            Self::Code => 10,
            Self::Data => 11,
            Self::DataCount => 12,
            Self::Tag => 13,
        }
    }

    /// Position in the required section order. This is id order except that
    /// the data-count section precedes the code section (so that
    /// `memory.init`/`data.drop` can check the declared count) and the tag
    /// section sits between memory and global, as the proposals specify.
    pub(crate) fn order_rank(self) -> u8 {
        match self {
            Self::Custom => 0,
            Self::Type => 1,
            Self::Import => 2,
            Self::Function => 3,
            Self::Table => 4,
            Self::Memory => 5,
            Self::Tag => 6,
            Self::Global => 7,
            Self::Export => 8,
            Self::Start => 9,
            Self::Element => 10,
            Self::DataCount => 11,
            Self::Code => 12,
            Self::Data => 13,
        }
    }
}

impl Display for SectionId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Custom => "custom",
            Self::Type => "type",
            Self::Import => "import",
            Self::Function => "function",
            Self::Table => "table",
            Self::Memory => "memory",
            Self::Global => "global",
            Self::Export => "export",
            Self::Start => "start",
            Self::Element => "element",
            Self::Code => "code",
            Self::Data => "data",
            Self::DataCount => "data_count",
            Self::Tag => "tag",
        })
    }
}

impl<'a> Decode<'a> for SectionId {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "section id", |ctx| {
            let byte = read_u8(r, ctx)?;
            let id = match byte.value {
                0 => Some(SectionId::Custom),
                1 => Some(SectionId::Type),
                2 => Some(SectionId::Import),
                3 => Some(SectionId::Function),
                4 => Some(SectionId::Table),
                5 => Some(SectionId::Memory),
                6 => Some(SectionId::Global),
                7 => Some(SectionId::Export),
                8 => Some(SectionId::Start),
                9 => Some(SectionId::Element),
                10 => Some(SectionId::Code),
                11 => Some(SectionId::Data),
                12 if ctx.features.bulk_memory_enabled() => Some(SectionId::DataCount),
                13 if ctx.features.exceptions_enabled() => Some(SectionId::Tag),
                _ => None,
            };
            match id {
                Some(id) => Some(Spanned::new(byte.span, id)),
                None => {
                    ctx.errors
                        .on_error(byte.span, format!("Unknown section id: {}", byte.value));
                    None
                }
            }
        })
    }
}

/// A framed known section: identifier plus raw payload bytes.
#[derive(CustomDebug, PartialEq, Eq, Hash, Clone)]
pub struct KnownSection<'a> {
    pub id: Spanned<SectionId>,
    #[debug(with = "crate::io::fmt_bytes")]
    pub data: Spanned<&'a [u8]>,
}

/// A custom section: name plus free-form payload.
#[derive(CustomDebug, PartialEq, Eq, Hash, Clone)]
pub struct CustomSection<'a> {
    pub name: Spanned<&'a str>,
    #[debug(with = "crate::io::fmt_bytes")]
    pub data: Spanned<&'a [u8]>,
}

impl Encode for CustomSection<'_> {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.name.value.encode(w)?;
        w.write_all(self.data.value)
    }
}

/// One section of a module.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Section<'a> {
    Known(Spanned<KnownSection<'a>>),
    Custom(Spanned<CustomSection<'a>>),
}

impl<'a> Decode<'a> for Section<'a> {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "section", |ctx| {
            let id = SectionId::decode(r, ctx)?;
            let length = read_length(r, ctx)?;
            let data = read_bytes(r, length.value as usize, ctx)?;
            let span = r.span_from(start);

            if id.value == SectionId::Custom {
                let mut inner = Reader::at(data.value, data.span.offset);
                let name = read_utf8_string(&mut inner, ctx, "custom section name")?;
                let payload = inner.take_rest();
                return Some(Spanned::new(
                    span,
                    Section::Custom(Spanned::new(span, CustomSection { name, data: payload })),
                ));
            }

            // Known sections have to appear in order; custom sections are
            // exempt and may appear anywhere.
            if let Some(last) = ctx.last_section_id {
                if last.value.order_rank() >= id.value.order_rank() {
                    ctx.errors.on_error(
                        id.span,
                        format!(
                            "Section out of order: {} cannot occur after {}",
                            id.value, last.value
                        ),
                    );
                }
            }
            ctx.last_section_id = Some(id);

            Some(Spanned::new(
                span,
                Section::Known(Spanned::new(span, KnownSection { id, data })),
            ))
        })
    }
}

/// An on-demand, single-pass decoder over a section payload. Each `next()`
/// decodes one element; the first element failure stops the sequence.
pub struct LazySection<'a, 'c, 'e, T> {
    pub count: Option<Spanned<u32>>,
    desc: &'static str,
    reader: Reader<'a>,
    ctx: &'c mut ReadCtx<'e>,
    remaining: Option<u32>,
    failed: bool,
    _marker: PhantomData<T>,
}

impl<'a, 'c, 'e, T: Decode<'a>> LazySection<'a, 'c, 'e, T> {
    /// A count-prefixed sequence (most known sections).
    pub(crate) fn counted(
        data: Spanned<&'a [u8]>,
        desc: &'static str,
        ctx: &'c mut ReadCtx<'e>,
    ) -> Self {
        let mut reader = Reader::at(data.value, data.span.offset);
        let count = ctx.guarded(reader.rest_span(), desc, |ctx| read_count(&mut reader, ctx));
        Self {
            count,
            desc,
            reader,
            ctx,
            remaining: Some(count.map_or(0, |c| c.value)),
            failed: count.is_none(),
            _marker: PhantomData,
        }
    }

    /// A sequence that runs to the end of the payload (subsections).
    pub(crate) fn uncounted(
        data: Spanned<&'a [u8]>,
        desc: &'static str,
        ctx: &'c mut ReadCtx<'e>,
    ) -> Self {
        Self {
            count: None,
            desc,
            reader: Reader::at(data.value, data.span.offset),
            ctx,
            remaining: None,
            failed: false,
            _marker: PhantomData,
        }
    }
}

impl<'a, T: Decode<'a>> Iterator for LazySection<'a, '_, '_, T> {
    type Item = Spanned<T>;

    fn next(&mut self) -> Option<Spanned<T>> {
        if self.failed {
            return None;
        }
        match self.remaining {
            Some(0) => return None,
            Some(_) => {}
            None => {
                if self.reader.is_empty() {
                    return None;
                }
            }
        }

        let reader = &mut self.reader;
        let item = self
            .ctx
            .guarded(reader.rest_span(), self.desc, |ctx| T::decode(reader, ctx));
        match item {
            Some(item) => {
                if let Some(remaining) = &mut self.remaining {
                    *remaining -= 1;
                }
                Some(item)
            }
            None => {
                self.failed = true;
                None
            }
        }
    }
}

/// Entry of the function section: the type index of one defined function.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Function {
    pub type_index: Spanned<u32>,
}

impl<'a> Decode<'a> for Function {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "function", |ctx| {
            ctx.defined_function_count += 1;
            let type_index = read_index(r, ctx, "type index")?;
            Some(Spanned::new(r.span_from(start), Function { type_index }))
        })
    }
}

impl Encode for Function {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.type_index.encode(w)
    }
}

/// Entry of the table section.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Table {
    pub table_type: Spanned<TableType>,
}

impl<'a> Decode<'a> for Table {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "table", |ctx| {
            let table_type = TableType::decode(r, ctx)?;
            Some(Spanned::new(table_type.span, Table { table_type }))
        })
    }
}

impl Encode for Table {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.table_type.encode(w)
    }
}

/// Entry of the memory section.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Memory {
    pub memory_type: Spanned<MemoryType>,
}

impl<'a> Decode<'a> for Memory {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "memory", |ctx| {
            let memory_type = MemoryType::decode(r, ctx)?;
            Some(Spanned::new(memory_type.span, Memory { memory_type }))
        })
    }
}

impl Encode for Memory {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.memory_type.encode(w)
    }
}

/// Entry of the global section: type plus initializer.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Global {
    pub global_type: Spanned<GlobalType>,
    pub init: Spanned<ConstantExpression>,
}

impl<'a> Decode<'a> for Global {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "global", |ctx| {
            let global_type = GlobalType::decode(r, ctx)?;
            let init = ConstantExpression::decode(r, ctx)?;
            Some(Spanned::new(r.span_from(start), Global { global_type, init }))
        })
    }
}

impl Encode for Global {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.global_type.encode(w)?;
        self.init.encode(w)
    }
}

/// Entry of the export section.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Export<'a> {
    pub name: Spanned<&'a str>,
    pub kind: Spanned<ExternalKind>,
    pub index: Spanned<u32>,
}

impl<'a> Decode<'a> for Export<'a> {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "export", |ctx| {
            let name = read_utf8_string(r, ctx, "name")?;
            let kind = ExternalKind::decode(r, ctx)?;
            let index = read_index(r, ctx, "index")?;
            Some(Spanned::new(r.span_from(start), Export { name, kind, index }))
        })
    }
}

impl Encode for Export<'_> {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.name.value.encode(w)?;
        self.kind.encode(w)?;
        self.index.encode(w)
    }
}

/// The imported entity of an [`Import`].
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum ImportDesc {
    Function(Spanned<u32>),
    Table(Spanned<TableType>),
    Memory(Spanned<MemoryType>),
    Global(Spanned<GlobalType>),
    Tag(Spanned<TagType>),
}

impl ImportDesc {
    pub fn kind(&self) -> ExternalKind {
        match self {
            Self::Function(_) => ExternalKind::Function,
            Self::Table(_) => ExternalKind::Table,
            Self::Memory(_) => ExternalKind::Memory,
            Self::Global(_) => ExternalKind::Global,
            Self::Tag(_) => ExternalKind::Tag,
        }
    }
}

/// Entry of the import section.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Import<'a> {
    pub module: Spanned<&'a str>,
    pub name: Spanned<&'a str>,
    pub desc: ImportDesc,
}

impl<'a> Decode<'a> for Import<'a> {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "import", |ctx| {
            let module = read_utf8_string(r, ctx, "module name")?;
            let name = read_utf8_string(r, ctx, "field name")?;
            let kind = ExternalKind::decode(r, ctx)?;
            let desc = match kind.value {
                ExternalKind::Function => {
                    ImportDesc::Function(read_index(r, ctx, "function index")?)
                }
                ExternalKind::Table => ImportDesc::Table(TableType::decode(r, ctx)?),
                ExternalKind::Memory => ImportDesc::Memory(MemoryType::decode(r, ctx)?),
                ExternalKind::Global => ImportDesc::Global(GlobalType::decode(r, ctx)?),
                ExternalKind::Tag => ImportDesc::Tag(TagType::decode(r, ctx)?),
            };
            Some(Spanned::new(r.span_from(start), Import { module, name, desc }))
        })
    }
}

impl Encode for Import<'_> {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.module.value.encode(w)?;
        self.name.value.encode(w)?;
        self.desc.kind().encode(w)?;
        match &self.desc {
            ImportDesc::Function(type_index) => type_index.encode(w),
            ImportDesc::Table(table_type) => table_type.encode(w),
            ImportDesc::Memory(memory_type) => memory_type.encode(w),
            ImportDesc::Global(global_type) => global_type.encode(w),
            ImportDesc::Tag(tag_type) => tag_type.encode(w),
        }
    }
}

/// Payload of the start section.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Start {
    pub func_index: Spanned<u32>,
}

impl<'a> Decode<'a> for Start {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "start", |ctx| {
            let func_index = read_index(r, ctx, "function index")?;
            Some(Spanned::new(func_index.span, Start { func_index }))
        })
    }
}

impl Encode for Start {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.func_index.encode(w)
    }
}

/// Entry of the tag section.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Tag {
    pub tag_type: Spanned<TagType>,
}

impl<'a> Decode<'a> for Tag {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "tag", |ctx| {
            let tag_type = TagType::decode(r, ctx)?;
            Some(Spanned::new(tag_type.span, Tag { tag_type }))
        })
    }
}

impl Encode for Tag {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.tag_type.encode(w)
    }
}

/// Payload of the data-count section.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct DataCount {
    pub count: Spanned<u32>,
}

impl<'a> Decode<'a> for DataCount {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "data count", |ctx| {
            let count = read_index(r, ctx, "count")?;
            ctx.declared_data_count = Some(count.value);
            Some(Spanned::new(r.span_from(start), DataCount { count }))
        })
    }
}

impl Encode for DataCount {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.count.encode(w)
    }
}

/// Entry of the code section: locals plus the undecoded body.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Code<'a> {
    pub locals: Vec<Spanned<Locals>>,
    pub body: Spanned<Expression<'a>>,
}

impl<'a> Decode<'a> for Code<'a> {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "code", |ctx| {
            ctx.code_count += 1;
            ctx.local_count = 0;
            let body_size = read_length(r, ctx)?;
            let body = read_bytes(r, body_size.value as usize, ctx)?;

            let mut inner = Reader::at(body.value, body.span.offset);
            let locals = read_vector(&mut inner, ctx, "locals vector")?;
            let expression = inner.take_rest();
            Some(Spanned::new(
                r.span_from(start),
                Code {
                    locals: locals.value,
                    body: Spanned::new(expression.span, Expression { data: expression }),
                },
            ))
        })
    }
}

impl Encode for Code<'_> {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        let mut payload = Vec::new();
        crate::io::write_vector(&self.locals, &mut payload)?;
        payload.extend_from_slice(self.body.value.data.value);
        write_bytes_prefixed(&payload, w)
    }
}

/// Classification of data/element segments.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum SegmentType {
    Active,
    Passive,
    Declared,
}

/// Entry of the data section.
#[derive(CustomDebug, PartialEq, Eq, Hash, Clone)]
pub struct DataSegment<'a> {
    pub segment_type: SegmentType,
    /// Present iff the segment is active.
    pub memory_index: Option<Spanned<u32>>,
    /// Present iff the segment is active.
    pub offset: Option<Spanned<ConstantExpression>>,
    #[debug(with = "crate::io::fmt_bytes")]
    pub init: Spanned<&'a [u8]>,
}

impl<'a> DataSegment<'a> {
    pub fn is_active(&self) -> bool {
        self.segment_type == SegmentType::Active
    }
}

impl<'a> Decode<'a> for DataSegment<'a> {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "data segment", |ctx| {
            ctx.data_count += 1;

            let (segment_type, explicit_index) = if ctx.features.bulk_memory_enabled() {
                let flags = read_index(r, ctx, "flags")?;
                match flags.value {
                    0 => (SegmentType::Active, false),
                    1 => (SegmentType::Passive, false),
                    2 => (SegmentType::Active, true),
                    _ => {
                        ctx.errors.on_error(
                            flags.span,
                            format!("Invalid flags value: {}", flags.value),
                        );
                        return None;
                    }
                }
            } else {
                // The MVP always carries an explicit memory index.
                (SegmentType::Active, true)
            };

            let memory_index = match segment_type {
                SegmentType::Active if explicit_index => {
                    Some(read_index(r, ctx, "memory index")?)
                }
                SegmentType::Active => Some(0.into()),
                _ => None,
            };

            let offset = if segment_type == SegmentType::Active {
                Some(ctx.guarded(r.rest_span(), "offset", |ctx| {
                    ConstantExpression::decode(r, ctx)
                })?)
            } else {
                None
            };

            let len = read_length(r, ctx)?;
            let init = read_bytes(r, len.value as usize, ctx)?;
            Some(Spanned::new(
                r.span_from(start),
                DataSegment {
                    segment_type,
                    memory_index,
                    offset,
                    init,
                },
            ))
        })
    }
}

impl Encode for DataSegment<'_> {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        match self.segment_type {
            SegmentType::Active => {
                let memory_index = self.memory_index.as_ref().map_or(0, |index| index.value);
                if memory_index == 0 {
                    // Also the MVP shape: memory index 0 and flags 0 share
                    // the byte.
                    0u32.encode(w)?;
                } else {
                    2u32.encode(w)?;
                    memory_index.encode(w)?;
                }
                match &self.offset {
                    Some(offset) => offset.encode(w)?,
                    None => {
                        return Err(std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            "active data segment without offset",
                        ))
                    }
                }
            }
            SegmentType::Passive | SegmentType::Declared => {
                1u32.encode(w)?;
            }
        }
        write_bytes_prefixed(self.init.value, w)
    }
}

/// The element list of an element segment: function indices or initializer
/// expressions.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum ElementList {
    Indexes {
        kind: Spanned<ExternalKind>,
        init: Vec<Spanned<u32>>,
    },
    Expressions {
        element_type: Spanned<ReferenceType>,
        init: Vec<Spanned<ElementExpression>>,
    },
}

/// Entry of the element section.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ElementSegment {
    pub segment_type: SegmentType,
    /// Present iff the segment is active.
    pub table_index: Option<Spanned<u32>>,
    /// Present iff the segment is active.
    pub offset: Option<Spanned<ConstantExpression>>,
    pub elements: ElementList,
}

impl ElementSegment {
    pub fn is_active(&self) -> bool {
        self.segment_type == SegmentType::Active
    }
}

impl<'a> Decode<'a> for ElementSegment {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "element segment", |ctx| {
            // Three independent flag bits: passive/declared, explicit table
            // index, expression-form initializers.
            let (segment_type, explicit_index, expressions, legacy) =
                if ctx.features.bulk_memory_enabled() {
                    let flags = read_index(r, ctx, "flags")?;
                    match flags.value {
                        0 => (SegmentType::Active, false, false, true),
                        1 => (SegmentType::Passive, false, false, false),
                        2 => (SegmentType::Active, true, false, false),
                        3 => (SegmentType::Declared, false, false, false),
                        4 => (SegmentType::Active, false, true, true),
                        5 => (SegmentType::Passive, false, true, false),
                        6 => (SegmentType::Active, true, true, false),
                        7 => (SegmentType::Declared, false, true, false),
                        _ => {
                            ctx.errors.on_error(
                                flags.span,
                                format!("Invalid flags value: {}", flags.value),
                            );
                            return None;
                        }
                    }
                } else {
                    (SegmentType::Active, true, false, true)
                };

            let table_index = match segment_type {
                SegmentType::Active if explicit_index => {
                    Some(read_index(r, ctx, "table index")?)
                }
                SegmentType::Active => Some(0.into()),
                _ => None,
            };

            let offset = if segment_type == SegmentType::Active {
                Some(ctx.guarded(r.rest_span(), "offset", |ctx| {
                    ConstantExpression::decode(r, ctx)
                })?)
            } else {
                None
            };

            let elements = if expressions {
                let element_type = if legacy {
                    ReferenceType::FUNCREF.into()
                } else {
                    ReferenceType::decode(r, ctx)?
                };
                let init = read_vector(r, ctx, "initializers")?;
                ElementList::Expressions {
                    element_type,
                    init: init.value,
                }
            } else {
                let kind = if legacy {
                    ExternalKind::Function.into()
                } else {
                    ExternalKind::decode(r, ctx)?
                };
                let init = read_vector(r, ctx, "initializers")?;
                ElementList::Indexes {
                    kind,
                    init: init.value,
                }
            };

            Some(Spanned::new(
                r.span_from(start),
                ElementSegment {
                    segment_type,
                    table_index,
                    offset,
                    elements,
                },
            ))
        })
    }
}

impl Encode for ElementSegment {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        let table_index = self.table_index.as_ref().map_or(0, |index| index.value);
        let (expressions, implicit_element) = match &self.elements {
            ElementList::Indexes { kind, .. } => {
                (false, kind.value == ExternalKind::Function)
            }
            ElementList::Expressions { element_type, .. } => {
                (true, element_type.value == ReferenceType::FUNCREF)
            }
        };
        let legacy = self.segment_type == SegmentType::Active
            && table_index == 0
            && implicit_element;

        let mut flags: u32 = 0;
        match self.segment_type {
            SegmentType::Active => {
                if !legacy {
                    flags |= 2;
                }
            }
            SegmentType::Passive => flags |= 1,
            SegmentType::Declared => flags |= 3,
        }
        if expressions {
            flags |= 4;
        }
        flags.encode(w)?;

        if self.segment_type == SegmentType::Active {
            if !legacy {
                table_index.encode(w)?;
            }
            match &self.offset {
                Some(offset) => offset.encode(w)?,
                None => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "active element segment without offset",
                    ))
                }
            }
        }

        match &self.elements {
            ElementList::Indexes { kind, init } => {
                if !legacy {
                    kind.encode(w)?;
                }
                crate::io::write_vector(init, w)
            }
            ElementList::Expressions { element_type, init } => {
                if !legacy {
                    element_type.encode(w)?;
                }
                crate::io::write_vector(init, w)
            }
        }
    }
}

pub fn read_type_section<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, DefinedType> {
    LazySection::counted(data, "type section", ctx)
}

pub fn read_import_section<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, Import<'a>> {
    LazySection::counted(data, "import section", ctx)
}

pub fn read_function_section<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, Function> {
    LazySection::counted(data, "function section", ctx)
}

pub fn read_table_section<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, Table> {
    LazySection::counted(data, "table section", ctx)
}

pub fn read_memory_section<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, Memory> {
    LazySection::counted(data, "memory section", ctx)
}

pub fn read_global_section<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, Global> {
    LazySection::counted(data, "global section", ctx)
}

pub fn read_export_section<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, Export<'a>> {
    LazySection::counted(data, "export section", ctx)
}

pub fn read_element_section<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, ElementSegment> {
    LazySection::counted(data, "element section", ctx)
}

pub fn read_code_section<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, Code<'a>> {
    LazySection::counted(data, "code section", ctx)
}

pub fn read_data_section<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, DataSegment<'a>> {
    LazySection::counted(data, "data section", ctx)
}

pub fn read_tag_section<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, Tag> {
    LazySection::counted(data, "tag section", ctx)
}

pub fn read_start_section<'a>(
    data: Spanned<&'a [u8]>,
    ctx: &mut ReadCtx<'_>,
) -> Option<Spanned<Start>> {
    let mut reader = Reader::at(data.value, data.span.offset);
    Start::decode(&mut reader, ctx)
}

pub fn read_data_count_section<'a>(
    data: Spanned<&'a [u8]>,
    ctx: &mut ReadCtx<'_>,
) -> Option<Spanned<DataCount>> {
    let mut reader = Reader::at(data.value, data.span.offset);
    DataCount::decode(&mut reader, ctx)
}

/// Emits a framed known section whose payload is produced by `f`. The length
/// is patched in after the payload is known and always uses the minimal
/// form.
pub fn write_known_section(
    id: SectionId,
    w: &mut impl std::io::Write,
    f: impl FnOnce(&mut Vec<u8>) -> std::io::Result<()>,
) -> std::io::Result<()> {
    let mut payload = Vec::new();
    f(&mut payload)?;
    id.id().encode(w)?;
    write_bytes_prefixed(&payload, w)
}

/// Emits a count-prefixed vector section, or nothing when it is empty.
pub fn write_vector_section<T: Encode>(
    id: SectionId,
    items: &[T],
    w: &mut impl std::io::Write,
) -> std::io::Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    write_known_section(id, w, |payload| crate::io::write_vector(items, payload))
}

/// Emits a single-value section (`start`, `data_count`), or nothing when the
/// value is absent.
pub fn write_non_empty_known_section<T: Encode>(
    id: SectionId,
    value: Option<&T>,
    w: &mut impl std::io::Write,
) -> std::io::Result<()> {
    match value {
        Some(value) => write_known_section(id, w, |payload| value.encode(payload)),
        None => Ok(()),
    }
}
