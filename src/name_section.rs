//! The `name` custom section: module, function and local name maps.

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
    read_bytes, read_index, read_length, read_u8, read_utf8_string, read_vector,
    write_bytes_prefixed, write_vector, Decode, Encode, ReadCtx, Reader, Spanned,
};
use crate::sections::LazySection;
use custom_debug::Debug as CustomDebug;

/// The conventional name of the section.
pub const NAME_SECTION: &str = "name";

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum NameSubsectionId {
    ModuleName,
    FunctionNames,
    LocalNames,
}

impl<'a> Decode<'a> for NameSubsectionId {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        ctx.guarded(r.rest_span(), "name subsection id", |ctx| {
            let byte = read_u8(r, ctx)?;
            let id = match byte.value {
                0 => NameSubsectionId::ModuleName,
                1 => NameSubsectionId::FunctionNames,
                2 => NameSubsectionId::LocalNames,
                _ => {
                    ctx.errors.on_error(
                        byte.span,
                        format!("Unknown name subsection id: {}", byte.value),
                    );
                    return None;
                }
            };
            Some(Spanned::new(byte.span, id))
        })
    }
}

impl Encode for NameSubsectionId {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        let byte: u8 = match self {
            Self::ModuleName => 0,
            Self::FunctionNames => 1,
            Self::LocalNames => 2,
        };
        byte.encode(w)
    }
}

/// A framed name subsection: identifier plus raw payload.
#[derive(CustomDebug, PartialEq, Eq, Hash, Clone)]
pub struct NameSubsection<'a> {
    pub id: Spanned<NameSubsectionId>,
    #[debug(with = "crate::io::fmt_bytes")]
    pub data: Spanned<&'a [u8]>,
}

impl<'a> Decode<'a> for NameSubsection<'a> {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "name subsection", |ctx| {
            let id = NameSubsectionId::decode(r, ctx)?;
            let length = read_length(r, ctx)?;
            let data = read_bytes(r, length.value as usize, ctx)?;
            Some(Spanned::new(r.span_from(start), NameSubsection { id, data }))
        })
    }
}

impl Encode for NameSubsection<'_> {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.id.encode(w)?;
        write_bytes_prefixed(self.data.value, w)
    }
}

/// Associates an index (function, local, …) with a name.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct NameAssoc<'a> {
    pub index: Spanned<u32>,
    pub name: Spanned<&'a str>,
}

impl<'a> Decode<'a> for NameAssoc<'a> {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "name assoc", |ctx| {
            let index = read_index(r, ctx, "index")?;
            let name = read_utf8_string(r, ctx, "name")?;
            Some(Spanned::new(r.span_from(start), NameAssoc { index, name }))
        })
    }
}

impl Encode for NameAssoc<'_> {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.index.encode(w)?;
        self.name.value.encode(w)
    }
}

/// Associates a function index with the name map of its locals.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct IndirectNameAssoc<'a> {
    pub index: Spanned<u32>,
    pub name_map: Vec<Spanned<NameAssoc<'a>>>,
}

impl<'a> Decode<'a> for IndirectNameAssoc<'a> {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>> {
        let start = r.pos();
        ctx.guarded(r.rest_span(), "indirect name assoc", |ctx| {
            let index = read_index(r, ctx, "index")?;
            let name_map = read_vector(r, ctx, "name map")?;
            Some(Spanned::new(
                r.span_from(start),
                IndirectNameAssoc {
                    index,
                    name_map: name_map.value,
                },
            ))
        })
    }
}

impl Encode for IndirectNameAssoc<'_> {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.index.encode(w)?;
        write_vector(&self.name_map, w)
    }
}

/// Iterates the subsections of a `name` custom section payload.
pub fn read_name_section<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, NameSubsection<'a>> {
    LazySection::uncounted(data, "name section", ctx)
}

/// Reads the module-name subsection payload.
pub fn read_module_name_subsection<'a>(
    data: Spanned<&'a [u8]>,
    ctx: &mut ReadCtx<'_>,
) -> Option<Spanned<&'a str>> {
    let mut reader = Reader::at(data.value, data.span.offset);
    read_utf8_string(&mut reader, ctx, "module name")
}

/// Iterates the function-name map of a function-names subsection payload.
pub fn read_function_names_subsection<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, NameAssoc<'a>> {
    LazySection::counted(data, "function names subsection", ctx)
}

/// Iterates the per-function local-name maps of a local-names subsection
/// payload.
pub fn read_local_names_subsection<'a, 'c, 'e>(
    data: Spanned<&'a [u8]>,
    ctx: &'c mut ReadCtx<'e>,
) -> LazySection<'a, 'c, 'e, IndirectNameAssoc<'a>> {
    LazySection::counted(data, "local names subsection", ctx)
}
