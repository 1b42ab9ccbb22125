//! The in-memory module aggregate and whole-module read/write entry points.

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

use crate::io::{read_bytes_expected, Decode, Encode, ReadCtx, Reader, Spanned};
use crate::sections::{
    read_code_section, read_data_count_section, read_data_section, read_element_section,
    read_export_section, read_function_section, read_global_section, read_import_section,
    read_memory_section, read_start_section, read_table_section, read_tag_section, read_type_section,
    write_known_section, write_non_empty_known_section, write_vector_section, Code, CustomSection,
    DataCount, DataSegment, ElementSegment, Export, Function, Global, Import, KnownSection, Memory,
    Section, SectionId, Start, Table, Tag,
};
use crate::types::DefinedType;

pub const MAGIC: [u8; 4] = *b"\0asm";
pub const VERSION: [u8; 4] = [1, 0, 0, 0];

/// A decoded module: every known section plus retained custom sections.
///
/// The tree borrows from the input buffer (names, data payloads, code
/// bodies) and is only valid while that buffer is alive. Imports of a kind
/// share an index space with definitions of the same kind; imported entries
/// occupy the leading indices.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Module<'a> {
    pub types: Vec<Spanned<DefinedType>>,
    pub imports: Vec<Spanned<Import<'a>>>,
    pub functions: Vec<Spanned<Function>>,
    pub tables: Vec<Spanned<Table>>,
    pub memories: Vec<Spanned<Memory>>,
    pub tags: Vec<Spanned<Tag>>,
    pub globals: Vec<Spanned<Global>>,
    pub exports: Vec<Spanned<Export<'a>>>,
    pub start: Option<Spanned<Start>>,
    pub element_segments: Vec<Spanned<ElementSegment>>,
    pub data_count: Option<Spanned<DataCount>>,
    pub codes: Vec<Spanned<Code<'a>>>,
    pub data_segments: Vec<Spanned<DataSegment<'a>>>,
    pub custom_sections: Vec<Spanned<CustomSection<'a>>>,
}

impl<'a> Module<'a> {
    /// Decodes a module; equivalent to [`read_module`].
    pub fn decode_from(data: &'a [u8], ctx: &mut ReadCtx<'_>) -> Option<Self> {
        read_module(data, ctx)
    }

    /// Encodes the module into `w` and returns it; equivalent to
    /// [`write_module`].
    pub fn encode_into<W: std::io::Write>(&self, mut w: W) -> std::io::Result<W> {
        write_module(self, &mut w)?;
        Ok(w)
    }
}

/// Decodes a whole module.
///
/// The result is partial on errors: a failing section is skipped (its
/// already-decoded elements are kept) and decoding continues with the next
/// section, with the details recorded in the error sink. `None` is only
/// returned when the header itself is unreadable.
pub fn read_module<'a>(data: &'a [u8], ctx: &mut ReadCtx<'_>) -> Option<Module<'a>> {
    ctx.reset();
    let mut r = Reader::new(data);
    ctx.guarded(r.rest_span(), "module", |ctx| {
        read_bytes_expected(&mut r, &MAGIC, ctx, "magic")?;
        read_bytes_expected(&mut r, &VERSION, ctx, "version")?;

        let mut module = Module::default();
        while !r.is_empty() {
            // A broken section header means we lost the framing; give up on
            // the rest of the stream.
            let Some(section) = Section::decode(&mut r, ctx) else {
                break;
            };
            match section.value {
                Section::Custom(custom) => module.custom_sections.push(custom),
                Section::Known(known) => read_known_section(&mut module, &known.value, ctx),
            }
        }
        end_module(&r, ctx);
        Some(module)
    })
}

fn read_known_section<'a>(
    module: &mut Module<'a>,
    section: &KnownSection<'a>,
    ctx: &mut ReadCtx<'_>,
) {
    let data = section.data;
    match section.id.value {
        // Custom sections never reach here; `Section::decode` splits them
        // off.
        SectionId::Custom => {}
        SectionId::Type => module.types.extend(read_type_section(data, ctx)),
        SectionId::Import => module.imports.extend(read_import_section(data, ctx)),
        SectionId::Function => module.functions.extend(read_function_section(data, ctx)),
        SectionId::Table => module.tables.extend(read_table_section(data, ctx)),
        SectionId::Memory => module.memories.extend(read_memory_section(data, ctx)),
        SectionId::Global => module.globals.extend(read_global_section(data, ctx)),
        SectionId::Export => module.exports.extend(read_export_section(data, ctx)),
        SectionId::Start => module.start = read_start_section(data, ctx),
        SectionId::Element => module
            .element_segments
            .extend(read_element_section(data, ctx)),
        SectionId::Code => module.codes.extend(read_code_section(data, ctx)),
        SectionId::Data => module.data_segments.extend(read_data_section(data, ctx)),
        SectionId::DataCount => module.data_count = read_data_count_section(data, ctx),
        SectionId::Tag => module.tags.extend(read_tag_section(data, ctx)),
    }
}

/// Post-hook after the last section: the function and code sections must
/// agree, and a declared data count must match the data section.
pub fn end_module(r: &Reader<'_>, ctx: &mut ReadCtx<'_>) -> bool {
    let mut ok = true;
    if ctx.defined_function_count != ctx.code_count {
        ctx.errors.on_error(
            r.rest_span(),
            format!(
                "Expected code count of {}, but got {}",
                ctx.defined_function_count, ctx.code_count
            ),
        );
        ok = false;
    }
    if let Some(declared) = ctx.declared_data_count {
        if declared != ctx.data_count {
            ctx.errors.on_error(
                r.rest_span(),
                format!(
                    "Expected data count of {declared}, but got {}",
                    ctx.data_count
                ),
            );
            ok = false;
        }
    }
    ok
}

/// Encodes a module in canonical form: minimal LEB128s, sections in the
/// required order, empty sections omitted, custom sections appended last.
pub fn write_module(module: &Module<'_>, w: &mut impl std::io::Write) -> std::io::Result<()> {
    w.write_all(&MAGIC)?;
    w.write_all(&VERSION)?;
    write_vector_section(SectionId::Type, &module.types, w)?;
    write_vector_section(SectionId::Import, &module.imports, w)?;
    write_vector_section(SectionId::Function, &module.functions, w)?;
    write_vector_section(SectionId::Table, &module.tables, w)?;
    write_vector_section(SectionId::Memory, &module.memories, w)?;
    write_vector_section(SectionId::Tag, &module.tags, w)?;
    write_vector_section(SectionId::Global, &module.globals, w)?;
    write_vector_section(SectionId::Export, &module.exports, w)?;
    write_non_empty_known_section(SectionId::Start, module.start.as_ref(), w)?;
    write_vector_section(SectionId::Element, &module.element_segments, w)?;
    write_non_empty_known_section(SectionId::DataCount, module.data_count.as_ref(), w)?;
    write_vector_section(SectionId::Code, &module.codes, w)?;
    write_vector_section(SectionId::Data, &module.data_segments, w)?;
    for custom in &module.custom_sections {
        write_known_section(SectionId::Custom, w, |payload| custom.encode(payload))?;
    }
    Ok(())
}
