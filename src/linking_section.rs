//! The `linking` custom section: segment info, init functions, comdats and
//! the symbol table, as emitted by toolchains that produce relocatable
//! modules.

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
    read_bytes, read_index, read_length, read_u32_labelled, read_u8, read_utf8_string, read_vector,
    Decode, ReadCtx, Reader, Spanned,
};
use crate::sections::LazySection;
use custom_debug::Debug as CustomDebug;

/// The conventional name of the section.
pub const LINKING_SECTION: &str = "linking";

/// The only metadata version this reader understands.
pub const LINKING_VERSION: u32 = 2;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum LinkingSubsectionId {
    SegmentInfo,
    InitFunctions,
    ComdatInfo,
    SymbolTable,
}

impl<'a> Decode<'a> for LinkingSubsectionId {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "linking subsection id", |ctx| {
            let byte = read_u8(r, ctx)?;
            let id = match byte.value {
                5 => LinkingSubsectionId::SegmentInfo,
                6 => LinkingSubsectionId::InitFunctions,
                7 => LinkingSubsectionId::ComdatInfo,
                8 => LinkingSubsectionId::SymbolTable,
                _ => {
                    ctx.errors.on_error(
                        byte.span,
                        format!("Unknown linking subsection id: {}", byte.value),
                    );
                    return None;
                }
            };
            Some(Spanned::new(byte.span, id))
        })
    }
}

/// A framed linking subsection: identifier plus raw payload.
#[derive(CustomDebug, PartialEq, Eq, Hash, Clone)]
pub struct LinkingSubsection<'a> {
    pub id: Spanned<LinkingSubsectionId>,
    #[debug(with = "crate::io::fmt_bytes")]
    pub data: Spanned<&'a [u8]>,
}

impl<'a> Decode<'a> for LinkingSubsection<'a> {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "linking subsection", |ctx| {
            let id = LinkingSubsectionId::decode(r, ctx)?;
            let length = read_length(r, ctx)?;
            let data = read_bytes(r, length.value as usize, ctx)?;
            Some(Spanned::new(
                r.span_from(start),
                LinkingSubsection { id, data },
            ))
        })
    }
}

/// Reads the linking section header and returns the subsection iterator.
/// `None` (with a recorded error) if the version is unsupported.
pub fn read_linking_section<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> Option<(
    Spanned<u32>,
    LazySection<'a, 'c, 'e, LinkingSubsection<'a>>,
)> {
    let mut reader = Reader::at(data.value, data.span.offset);
    let version = ctx.guarded(reader.rest_span(), "linking section", |ctx| {
        let version = read_u32_labelled(&mut reader, ctx, "version")?;
        if version.value != LINKING_VERSION {
            ctx.errors.on_error(
                version.span,
                format!("Unknown linking version: {}", version.value),
            );
            return None;
        }
        Some(version)
    })?;
    let rest = reader.take_rest();
    Some((version, LazySection::uncounted(rest, "linking section", ctx)))
}

/// Name, alignment and flags of one data segment.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct SegmentInfo<'a> {
    pub name: Spanned<&'a str>,
    pub align_log2: Spanned<u32>,
    pub flags: Spanned<u32>,
}

impl<'a> Decode<'a> for SegmentInfo<'a> {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "segment info", |ctx| {
            let name = read_utf8_string(r, ctx, "name")?;
            let align_log2 = read_u32_labelled(r, ctx, "align log2")?;
            let flags = read_u32_labelled(r, ctx, "flags")?;
            Some(Spanned::new(
                r.span_from(start),
                SegmentInfo {
                    name,
                    align_log2,
                    flags,
                },
            ))
        })
    }
}

/// A function to call at instantiation, with its ordering priority.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct InitFunction {
    pub priority: Spanned<u32>,
    pub index: Spanned<u32>,
}

impl<'a> Decode<'a> for InitFunction {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "init function", |ctx| {
            let priority = read_u32_labelled(r, ctx, "priority")?;
            let index = read_index(r, ctx, "function index")?;
            Some(Spanned::new(
                r.span_from(start),
                InitFunction { priority, index },
            ))
        })
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ComdatSymbolKind {
    Data,
    Function,
    Global,
    Tag,
}

impl<'a> Decode<'a> for ComdatSymbolKind {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "comdat symbol kind", |ctx| {
            let byte = read_u8(r, ctx)?;
            let kind = match byte.value {
                0 => ComdatSymbolKind::Data,
                1 => ComdatSymbolKind::Function,
                2 => ComdatSymbolKind::Global,
                3 => ComdatSymbolKind::Tag,
                _ => {
                    ctx.errors.on_error(
                        byte.span,
                        format!("Unknown comdat symbol kind: {}", byte.value),
                    );
                    return None;
                }
            };
            Some(Spanned::new(byte.span, kind))
        })
    }
}

/// One member of a comdat group.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ComdatSymbol {
    pub kind: Spanned<ComdatSymbolKind>,
    pub index: Spanned<u32>,
}

impl<'a> Decode<'a> for ComdatSymbol {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "comdat symbol", |ctx| {
            let kind = ComdatSymbolKind::decode(r, ctx)?;
            let index = read_index(r, ctx, "index")?;
            Some(Spanned::new(r.span_from(start), ComdatSymbol { kind, index }))
        })
    }
}

/// A comdat group: name, flags and member symbols.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Comdat<'a> {
    pub name: Spanned<&'a str>,
    pub flags: Spanned<u32>,
    pub symbols: Vec<Spanned<ComdatSymbol>>,
}

impl<'a> Decode<'a> for Comdat<'a> {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "comdat", |ctx| {
            let name = read_utf8_string(r, ctx, "name")?;
            let flags = read_u32_labelled(r, ctx, "flags")?;
            let symbols = read_vector(r, ctx, "symbols")?;
            Some(Spanned::new(
                r.span_from(start),
                Comdat {
                    name,
                    flags,
                    symbols: symbols.value,
                },
            ))
        })
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum SymbolInfoKind {
    Function,
    Data,
    Global,
    Section,
    Tag,
    Table,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum SymbolBinding {
    Global,
    Weak,
    Local,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum SymbolVisibility {
    Default,
    Hidden,
}

const SYMBOL_FLAG_WEAK: u32 = 0x01;
const SYMBOL_FLAG_LOCAL: u32 = 0x02;
const SYMBOL_FLAG_HIDDEN: u32 = 0x04;
const SYMBOL_FLAG_UNDEFINED: u32 = 0x10;
const SYMBOL_FLAG_EXPLICIT_NAME: u32 = 0x40;

/// Decoded symbol flags bitfield.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct SymbolFlags {
    pub binding: SymbolBinding,
    pub visibility: SymbolVisibility,
    pub undefined: bool,
    pub explicit_name: bool,
}

impl SymbolFlags {
    fn from_bits(bits: u32) -> Self {
        let binding = if bits & SYMBOL_FLAG_LOCAL != 0 {
            SymbolBinding::Local
        } else if bits & SYMBOL_FLAG_WEAK != 0 {
            SymbolBinding::Weak
        } else {
            SymbolBinding::Global
        };
        let visibility = if bits & SYMBOL_FLAG_HIDDEN != 0 {
            SymbolVisibility::Hidden
        } else {
            SymbolVisibility::Default
        };
        Self {
            binding,
            visibility,
            undefined: bits & SYMBOL_FLAG_UNDEFINED != 0,
            explicit_name: bits & SYMBOL_FLAG_EXPLICIT_NAME != 0,
        }
    }
}

/// Location of a defined data symbol inside its segment.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct DataSymbolDef {
    pub index: Spanned<u32>,
    pub offset: Spanned<u32>,
    pub size: Spanned<u32>,
}

/// The kind-specific payload of a symbol table entry.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum SymbolBody<'a> {
    /// Function, global, tag and table symbols: an index into the matching
    /// space, plus a name for defined or explicitly-named symbols.
    Base {
        index: Spanned<u32>,
        name: Option<Spanned<&'a str>>,
    },
    Data {
        name: Spanned<&'a str>,
        /// Absent for undefined data symbols.
        defined: Option<DataSymbolDef>,
    },
    Section {
        section: Spanned<u32>,
    },
}

/// One entry of the symbol table subsection.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct SymbolInfo<'a> {
    pub kind: Spanned<SymbolInfoKind>,
    pub flags: Spanned<SymbolFlags>,
    pub body: SymbolBody<'a>,
}

impl<'a> Decode<'a> for SymbolInfo<'a> {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "symbol info", |ctx| {
            let kind_byte = read_u8(r, ctx)?;
            let kind = match kind_byte.value {
                0 => SymbolInfoKind::Function,
                1 => SymbolInfoKind::Data,
                2 => SymbolInfoKind::Global,
                3 => SymbolInfoKind::Section,
                4 => SymbolInfoKind::Tag,
                5 => SymbolInfoKind::Table,
                _ => {
                    ctx.errors.on_error(
                        kind_byte.span,
                        format!("Unknown symbol info kind: {}", kind_byte.value),
                    );
                    return None;
                }
            };
            let kind = Spanned::new(kind_byte.span, kind);

            let flag_bits = read_u32_labelled(r, ctx, "flags")?;
            let flags = Spanned::new(flag_bits.span, SymbolFlags::from_bits(flag_bits.value));

            let body = match kind.value {
                SymbolInfoKind::Function
                | SymbolInfoKind::Global
                | SymbolInfoKind::Tag
                | SymbolInfoKind::Table => {
                    let index = read_index(r, ctx, "index")?;
                    // Imported symbols reuse the import's name unless one is
                    // given explicitly.
                    let name = if !flags.value.undefined || flags.value.explicit_name {
                        Some(read_utf8_string(r, ctx, "name")?)
                    } else {
                        None
                    };
                    SymbolBody::Base { index, name }
                }
                SymbolInfoKind::Data => {
                    let name = read_utf8_string(r, ctx, "name")?;
                    let defined = if flags.value.undefined {
                        None
                    } else {
                        let index = read_index(r, ctx, "index")?;
                        let offset = read_u32_labelled(r, ctx, "offset")?;
                        let size = read_u32_labelled(r, ctx, "size")?;
                        Some(DataSymbolDef {
                            index,
                            offset,
                            size,
                        })
                    };
                    SymbolBody::Data { name, defined }
                }
                SymbolInfoKind::Section => SymbolBody::Section {
                    section: read_index(r, ctx, "section")?,
                },
            };

            Some(Spanned::new(r.span_from(start), SymbolInfo { kind, flags, body }))
        })
    }
}

pub fn read_segment_info_subsection<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, SegmentInfo<'a>> {
    LazySection::counted(data, "segment info subsection", ctx)
}

pub fn read_init_functions_subsection<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, InitFunction> {
    LazySection::counted(data, "init functions subsection", ctx)
}

pub fn read_comdat_subsection<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, Comdat<'a>> {
    LazySection::counted(data, "comdat subsection", ctx)
}

pub fn read_symbol_table_subsection<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, SymbolInfo<'a>> {
    LazySection::counted(data, "symbol table subsection", ctx)
}
