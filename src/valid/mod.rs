//! Structural validation: the cross-section checks that are reachable
//! without instruction-level type checking.

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

mod disjoint_set;
mod local_map;

pub use disjoint_set::DisjointSet;
pub use local_map::LocalMap;

use crate::errors::Errors;
use crate::features::Features;
use crate::instructions::{ConstantExpression, ElementExpression, Immediate, Opcode};
use crate::io::{Span, Spanned};
use crate::module::Module;
use crate::sections::{
    DataSegment, ElementList, ElementSegment, Export, Function, Global, Import, ImportDesc, Memory,
    Start, Table, Tag,
};
use crate::types::{
    DefinedType, ExternalKind, GlobalType, IndexType, Limits, MemoryType, Mutability,
    NumericType, ReferenceType, TableType, TagType, ValueType,
};
use std::collections::{BTreeMap, BTreeSet};

/// Hard cap on memory limits, in 64 KiB pages.
pub const MAX_MEMORY_PAGES: u32 = 1 << 16;

/// Tri-state memo of in-progress coinductive `same_types` queries over
/// ordered index pairs, backed by a disjoint set of proven-equal classes.
#[derive(Debug, Default)]
pub struct SameTypes {
    disjoint: DisjointSet,
    assume: BTreeMap<(u32, u32), bool>,
}

impl SameTypes {
    pub fn reset(&mut self, size: u32) {
        self.disjoint.reset(size);
        self.assume.clear();
    }

    fn ordered(lhs: u32, rhs: u32) -> (u32, u32) {
        if lhs > rhs {
            (rhs, lhs)
        } else {
            (lhs, rhs)
        }
    }

    /// `Some(true)`/`Some(false)` for settled pairs, `None` for unknown.
    pub fn get(&mut self, expected: u32, actual: u32) -> Option<bool> {
        let (expected, actual) = Self::ordered(expected, actual);
        if !(self.disjoint.is_valid(expected) && self.disjoint.is_valid(actual)) {
            // Invalid indexes cannot be equal to anything.
            return Some(false);
        }
        if self.disjoint.is_same_set(expected, actual) {
            return Some(true);
        }
        self.assume.get(&(expected, actual)).copied()
    }

    pub fn assume(&mut self, expected: u32, actual: u32) {
        let pair = Self::ordered(expected, actual);
        self.assume.insert(pair, true);
    }

    pub fn resolve(&mut self, expected: u32, actual: u32, is_same: bool) {
        let pair = Self::ordered(expected, actual);
        if is_same {
            self.disjoint.merge_sets(pair.0, pair.1);
            self.assume.remove(&pair);
        } else {
            self.assume.insert(pair, false);
        }
    }
}

/// Assumption map of in-progress coinductive `match_types` (subtyping)
/// queries. Unlike [`SameTypes`] the relation is not symmetric, so there is
/// no disjoint set behind it.
#[derive(Debug, Default)]
pub struct MatchTypes {
    assume: BTreeMap<(u32, u32), bool>,
}

impl MatchTypes {
    pub fn reset(&mut self) {
        self.assume.clear();
    }

    pub fn get(&mut self, expected: u32, actual: u32) -> Option<bool> {
        self.assume.get(&(expected, actual)).copied()
    }

    pub fn assume(&mut self, expected: u32, actual: u32) {
        self.assume.insert((expected, actual), true);
    }

    pub fn resolve(&mut self, expected: u32, actual: u32, matches: bool) {
        self.assume.insert((expected, actual), matches);
    }
}

/// Validation context: module state accumulated section by section, in file
/// order, so every check sees exactly the entities declared before it.
pub struct ValidCtx<'e> {
    pub features: Features,
    pub errors: &'e mut Errors,
    pub types: Vec<DefinedType>,
    /// Type index of each function, imports first.
    pub functions: Vec<u32>,
    pub tables: Vec<TableType>,
    pub memories: Vec<MemoryType>,
    pub globals: Vec<GlobalType>,
    pub tags: Vec<TagType>,
    pub element_segments: Vec<ReferenceType>,
    pub imported_function_count: u32,
    pub imported_global_count: u32,
    pub declared_data_count: Option<u32>,
    pub export_names: BTreeSet<String>,
    /// Function indices usable by `ref.func`: referenced from element
    /// segments or exports.
    pub declared_functions: BTreeSet<u32>,
    pub locals: LocalMap,
    pub same_types: SameTypes,
    pub match_types: MatchTypes,
}

impl<'e> ValidCtx<'e> {
    pub fn new(features: Features, errors: &'e mut Errors) -> Self {
        Self {
            features,
            errors,
            types: Vec::new(),
            functions: Vec::new(),
            tables: Vec::new(),
            memories: Vec::new(),
            globals: Vec::new(),
            tags: Vec::new(),
            element_segments: Vec::new(),
            imported_function_count: 0,
            imported_global_count: 0,
            declared_data_count: None,
            export_names: BTreeSet::new(),
            declared_functions: BTreeSet::new(),
            locals: LocalMap::new(),
            same_types: SameTypes::default(),
            match_types: MatchTypes::default(),
        }
    }

    fn guarded<T>(&mut self, span: Span, desc: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        self.errors.push_context(span, desc);
        let result = f(self);
        self.errors.pop_context();
        result
    }
}

fn validate_index(
    index: Spanned<u32>,
    max: usize,
    desc: &str,
    errors: &mut Errors,
) -> bool {
    if (index.value as usize) >= max {
        errors.on_error(
            index.span,
            format!("Invalid {desc} {}, must be less than {max}", index.value),
        );
        return false;
    }
    true
}

/// Validates every cross-section invariant of a decoded module. Errors
/// accumulate in the context's sink; the return value is the overall
/// verdict.
pub fn validate_module(module: &Module<'_>, ctx: &mut ValidCtx<'_>) -> bool {
    let mut valid = true;
    for defined_type in &module.types {
        valid &= validate_defined_type(defined_type, ctx);
    }
    for import in &module.imports {
        valid &= validate_import(import, ctx);
    }
    for function in &module.functions {
        valid &= validate_function(function, ctx);
    }
    for table in &module.tables {
        valid &= validate_table(table, ctx);
    }
    for memory in &module.memories {
        valid &= validate_memory(memory, ctx);
    }
    for tag in &module.tags {
        valid &= validate_tag(tag, ctx);
    }
    for global in &module.globals {
        valid &= validate_global(global, ctx);
    }
    for export in &module.exports {
        valid &= validate_export(export, ctx);
    }
    if let Some(start) = &module.start {
        valid &= validate_start(start, ctx);
    }
    for segment in &module.element_segments {
        valid &= validate_element_segment(segment, ctx);
    }
    if let Some(data_count) = &module.data_count {
        ctx.declared_data_count = Some(data_count.value.count.value);
    }
    for segment in &module.data_segments {
        valid &= validate_data_segment(segment, ctx);
    }
    valid
}

pub fn validate_defined_type(
    defined_type: &Spanned<DefinedType>,
    ctx: &mut ValidCtx<'_>,
) -> bool {
    ctx.guarded(defined_type.span, "defined type", |ctx| {
        let mut valid = true;
        if let DefinedType::Func(function_type) = &defined_type.value {
            if function_type.results.len() > 1 && !ctx.features.multi_value_enabled() {
                ctx.errors.on_error(
                    defined_type.span,
                    format!(
                        "Expected result type count of 0 or 1, got {}",
                        function_type.results.len()
                    ),
                );
                valid = false;
            }
        }
        ctx.types.push(defined_type.value.clone());
        valid
    })
}

pub fn validate_import(import: &Spanned<Import<'_>>, ctx: &mut ValidCtx<'_>) -> bool {
    ctx.guarded(import.span, "import", |ctx| match &import.value.desc {
        ImportDesc::Function(type_index) => {
            ctx.functions.push(type_index.value);
            ctx.imported_function_count += 1;
            validate_index(
                *type_index,
                ctx.types.len(),
                "function type index",
                ctx.errors,
            )
        }
        ImportDesc::Table(table_type) => {
            ctx.tables.push(table_type.value.clone());
            let mut valid = validate_table_type(table_type, ctx);
            if ctx.tables.len() > 1 && !ctx.features.reference_types_enabled() {
                ctx.errors
                    .on_error(table_type.span, "Too many tables, must be 1 or fewer");
                valid = false;
            }
            valid
        }
        ImportDesc::Memory(memory_type) => {
            ctx.memories.push(memory_type.value.clone());
            let mut valid = validate_memory_type(memory_type, ctx);
            if ctx.memories.len() > 1 && !ctx.features.multi_memory_enabled() {
                ctx.errors
                    .on_error(memory_type.span, "Too many memories, must be 1 or fewer");
                valid = false;
            }
            valid
        }
        ImportDesc::Global(global_type) => {
            ctx.globals.push(global_type.value.clone());
            ctx.imported_global_count += 1;
            true
        }
        ImportDesc::Tag(tag_type) => {
            ctx.tags.push(tag_type.value.clone());
            validate_tag_type(tag_type, ctx)
        }
    })
}

pub fn validate_function(function: &Spanned<Function>, ctx: &mut ValidCtx<'_>) -> bool {
    ctx.guarded(function.span, "function", |ctx| {
        ctx.functions.push(function.value.type_index.value);
        validate_index(
            function.value.type_index,
            ctx.types.len(),
            "function type index",
            ctx.errors,
        )
    })
}

fn validate_limits(
    limits: &Spanned<Limits>,
    max_allowed: u32,
    ctx: &mut ValidCtx<'_>,
) -> bool {
    let mut valid = true;
    let min = limits.value.min.value;
    if min > max_allowed {
        ctx.errors.on_error(
            limits.value.min.span,
            format!("Invalid limits min {min}, must be less than or equal to {max_allowed}"),
        );
        valid = false;
    }
    if let Some(max) = &limits.value.max {
        if max.value > max_allowed {
            ctx.errors.on_error(
                max.span,
                format!(
                    "Invalid limits max {}, must be less than or equal to {max_allowed}",
                    max.value
                ),
            );
            valid = false;
        }
        if min > max.value {
            ctx.errors.on_error(
                limits.span,
                format!("Expected limits min {min} <= max {}", max.value),
            );
            valid = false;
        }
    }
    valid
}

pub fn validate_table_type(table_type: &Spanned<TableType>, ctx: &mut ValidCtx<'_>) -> bool {
    ctx.guarded(table_type.span, "table type", |ctx| {
        validate_limits(&table_type.value.limits, u32::MAX, ctx)
    })
}

pub fn validate_memory_type(memory_type: &Spanned<MemoryType>, ctx: &mut ValidCtx<'_>) -> bool {
    ctx.guarded(memory_type.span, "memory type", |ctx| {
        validate_limits(&memory_type.value.limits, MAX_MEMORY_PAGES, ctx)
    })
}

pub fn validate_table(table: &Spanned<Table>, ctx: &mut ValidCtx<'_>) -> bool {
    ctx.guarded(table.span, "table", |ctx| {
        ctx.tables.push(table.value.table_type.value.clone());
        let mut valid = validate_table_type(&table.value.table_type, ctx);
        if ctx.tables.len() > 1 && !ctx.features.reference_types_enabled() {
            ctx.errors
                .on_error(table.span, "Too many tables, must be 1 or fewer");
            valid = false;
        }
        valid
    })
}

pub fn validate_memory(memory: &Spanned<Memory>, ctx: &mut ValidCtx<'_>) -> bool {
    ctx.guarded(memory.span, "memory", |ctx| {
        ctx.memories.push(memory.value.memory_type.value.clone());
        let mut valid = validate_memory_type(&memory.value.memory_type, ctx);
        if ctx.memories.len() > 1 && !ctx.features.multi_memory_enabled() {
            ctx.errors
                .on_error(memory.span, "Too many memories, must be 1 or fewer");
            valid = false;
        }
        valid
    })
}

fn validate_tag_type(tag_type: &Spanned<TagType>, ctx: &mut ValidCtx<'_>) -> bool {
    ctx.guarded(tag_type.span, "tag type", |ctx| {
        let type_index = tag_type.value.type_index;
        if !validate_index(type_index, ctx.types.len(), "tag type index", ctx.errors) {
            return false;
        }
        match ctx.types[type_index.value as usize].as_function_type() {
            Some(function_type) => {
                if function_type.results.is_empty() {
                    true
                } else {
                    ctx.errors.on_error(
                        type_index.span,
                        format!(
                            "Expected tag function type to have 0 results, got {}",
                            function_type.results.len()
                        ),
                    );
                    false
                }
            }
            None => {
                ctx.errors.on_error(
                    type_index.span,
                    format!("Invalid tag type index {}, must be a function type", type_index.value),
                );
                false
            }
        }
    })
}

pub fn validate_tag(tag: &Spanned<Tag>, ctx: &mut ValidCtx<'_>) -> bool {
    ctx.guarded(tag.span, "tag", |ctx| {
        ctx.tags.push(tag.value.tag_type.value.clone());
        validate_tag_type(&tag.value.tag_type, ctx)
    })
}

/// Validates a constant expression against the type it has to produce: a
/// matching `*.const`, a `global.get` of an imported immutable global, or
/// (under reference types) `ref.null`/`ref.func`.
pub fn validate_constant_expression(
    expr: &Spanned<ConstantExpression>,
    expected_type: &ValueType,
    ctx: &mut ValidCtx<'_>,
) -> bool {
    ctx.guarded(expr.span, "constant expression", |ctx| {
        let [instruction] = expr.value.instructions.as_slice() else {
            ctx.errors.on_error(
                expr.span,
                format!(
                    "Expected constant expression to have one instruction, got {}",
                    expr.value.instructions.len()
                ),
            );
            return false;
        };

        let mut valid = true;
        let actual_type = match instruction.value.opcode.value {
            Opcode::I32Const => ValueType::I32,
            Opcode::I64Const => ValueType::I64,
            Opcode::F32Const => ValueType::F32,
            Opcode::F64Const => ValueType::F64,
            Opcode::V128Const => ValueType::V128,

            Opcode::GlobalGet => {
                let Some(index) = instruction.value.index_immediate() else {
                    return false;
                };
                if !validate_index(
                    index,
                    ctx.imported_global_count as usize,
                    "global index",
                    ctx.errors,
                ) {
                    return false;
                }
                let global = &ctx.globals[index.value as usize];
                if global.mutability.value == Mutability::Var {
                    ctx.errors.on_error(
                        index.span,
                        "A constant expression cannot contain a mutable global",
                    );
                    valid = false;
                }
                global.value_type.value.clone()
            }

            Opcode::RefNull if ctx.features.reference_types_enabled() => {
                // The produced null matches any reference type expectation;
                // deep heap-type matching is the type checker's concern.
                if matches!(expected_type, ValueType::Reference(_)) {
                    return valid;
                }
                ctx.errors.on_error(
                    instruction.span,
                    format!("Invalid type: expected {expected_type}, got a null reference"),
                );
                return false;
            }

            Opcode::RefFunc if ctx.features.reference_types_enabled() => {
                let Some(index) = instruction.value.index_immediate() else {
                    return false;
                };
                if !validate_index(index, ctx.functions.len(), "function index", ctx.errors) {
                    return false;
                }
                ctx.declared_functions.insert(index.value);
                ValueType::FUNCREF
            }

            opcode => {
                ctx.errors.on_error(
                    instruction.span,
                    format!("Illegal instruction in constant expression: {opcode}"),
                );
                return false;
            }
        };

        if actual_type != *expected_type {
            ctx.errors.on_error(
                instruction.span,
                format!("Invalid type: expected {expected_type}, got {actual_type}"),
            );
            valid = false;
        }
        valid
    })
}

pub fn validate_global(global: &Spanned<Global>, ctx: &mut ValidCtx<'_>) -> bool {
    ctx.guarded(global.span, "global", |ctx| {
        let expected = global.value.global_type.value.value_type.value.clone();
        let valid = validate_constant_expression(&global.value.init, &expected, ctx);
        ctx.globals.push(global.value.global_type.value.clone());
        valid
    })
}

pub fn validate_export(export: &Spanned<Export<'_>>, ctx: &mut ValidCtx<'_>) -> bool {
    ctx.guarded(export.span, "export", |ctx| {
        let mut valid = true;
        let name = export.value.name;
        if !ctx.export_names.insert(name.value.to_owned()) {
            ctx.errors.on_error(
                name.span,
                format!("Duplicate export name: {}", name.value),
            );
            valid = false;
        }

        let index = export.value.index;
        match export.value.kind.value {
            ExternalKind::Function => {
                valid &= validate_index(index, ctx.functions.len(), "function index", ctx.errors);
                if valid {
                    // Exported functions are declared for `ref.func`.
                    ctx.declared_functions.insert(index.value);
                }
            }
            ExternalKind::Table => {
                valid &= validate_index(index, ctx.tables.len(), "table index", ctx.errors);
            }
            ExternalKind::Memory => {
                valid &= validate_index(index, ctx.memories.len(), "memory index", ctx.errors);
            }
            ExternalKind::Global => {
                if validate_index(index, ctx.globals.len(), "global index", ctx.errors) {
                    let global = &ctx.globals[index.value as usize];
                    if global.mutability.value == Mutability::Var
                        && !ctx.features.mutable_globals_enabled()
                    {
                        ctx.errors
                            .on_error(index.span, "Mutable globals cannot be exported");
                        valid = false;
                    }
                } else {
                    valid = false;
                }
            }
            ExternalKind::Tag => {
                valid &= validate_index(index, ctx.tags.len(), "tag index", ctx.errors);
            }
        }
        valid
    })
}

pub fn validate_start(start: &Spanned<Start>, ctx: &mut ValidCtx<'_>) -> bool {
    ctx.guarded(start.span, "start", |ctx| {
        let index = start.value.func_index;
        if !validate_index(index, ctx.functions.len(), "function index", ctx.errors) {
            return false;
        }

        let mut valid = true;
        let type_index = ctx.functions[index.value as usize];
        if let Some(function_type) = ctx
            .types
            .get(type_index as usize)
            .and_then(DefinedType::as_function_type)
        {
            if !function_type.params.is_empty() {
                ctx.errors.on_error(
                    index.span,
                    format!(
                        "Expected start function to have 0 params, got {}",
                        function_type.params.len()
                    ),
                );
                valid = false;
            }
            if !function_type.results.is_empty() {
                ctx.errors.on_error(
                    index.span,
                    format!(
                        "Expected start function to have 0 results, got {}",
                        function_type.results.len()
                    ),
                );
                valid = false;
            }
        }
        valid
    })
}

fn validate_element_expression(
    expr: &Spanned<ElementExpression>,
    ctx: &mut ValidCtx<'_>,
) -> bool {
    ctx.guarded(expr.span, "element expression", |ctx| {
        let [instruction] = expr.value.instructions.as_slice() else {
            ctx.errors.on_error(
                expr.span,
                format!(
                    "Expected element expression to have one instruction, got {}",
                    expr.value.instructions.len()
                ),
            );
            return false;
        };

        match (&instruction.value.opcode.value, &instruction.value.immediate) {
            (Opcode::RefNull, _) => true,
            (Opcode::RefFunc, Immediate::Index(index)) => {
                if !validate_index(*index, ctx.functions.len(), "function index", ctx.errors) {
                    return false;
                }
                ctx.declared_functions.insert(index.value);
                true
            }
            (opcode, _) => {
                ctx.errors.on_error(
                    instruction.span,
                    format!("Illegal instruction in element expression: {opcode}"),
                );
                false
            }
        }
    })
}

pub fn validate_element_segment(
    segment: &Spanned<ElementSegment>,
    ctx: &mut ValidCtx<'_>,
) -> bool {
    ctx.guarded(segment.span, "element segment", |ctx| {
        let mut valid = true;
        if segment.value.is_active() {
            if let Some(table_index) = segment.value.table_index {
                if validate_index(table_index, ctx.tables.len(), "table index", ctx.errors) {
                    // The segment's element type has to match the table it
                    // initializes.
                    let table_element = &ctx.tables[table_index.value as usize].element;
                    let segment_element = match &segment.value.elements {
                        ElementList::Indexes { .. } => &ReferenceType::FUNCREF,
                        ElementList::Expressions { element_type, .. } => &element_type.value,
                    };
                    if segment_element != &table_element.value {
                        ctx.errors.on_error(
                            segment.span,
                            format!(
                                "Invalid type: expected {}, got {segment_element}",
                                table_element.value
                            ),
                        );
                        valid = false;
                    }
                } else {
                    valid = false;
                }
            }
            if let Some(offset) = &segment.value.offset {
                valid &= ctx.guarded(offset.span, "offset", |ctx| {
                    validate_constant_expression(offset, &ValueType::I32, ctx)
                });
            }
        }

        match &segment.value.elements {
            ElementList::Indexes { init, .. } => {
                for index in init {
                    if validate_index(*index, ctx.functions.len(), "function index", ctx.errors) {
                        ctx.declared_functions.insert(index.value);
                    } else {
                        valid = false;
                    }
                }
                ctx.element_segments.push(ReferenceType::FUNCREF);
            }
            ElementList::Expressions { element_type, init } => {
                for expr in init {
                    valid &= validate_element_expression(expr, ctx);
                }
                ctx.element_segments.push(element_type.value.clone());
            }
        }
        valid
    })
}

pub fn validate_data_segment(segment: &Spanned<DataSegment<'_>>, ctx: &mut ValidCtx<'_>) -> bool {
    ctx.guarded(segment.span, "data segment", |ctx| {
        let mut valid = true;
        if segment.value.is_active() {
            let mut offset_type = ValueType::I32;
            if let Some(memory_index) = segment.value.memory_index {
                if validate_index(memory_index, ctx.memories.len(), "memory index", ctx.errors) {
                    let memory = &ctx.memories[memory_index.value as usize];
                    if memory.limits.value.index_type == IndexType::I64 {
                        offset_type = ValueType::Numeric(NumericType::I64);
                    }
                } else {
                    valid = false;
                }
            }
            if let Some(offset) = &segment.value.offset {
                valid &= ctx.guarded(offset.span, "offset", |ctx| {
                    validate_constant_expression(offset, &offset_type, ctx)
                });
            }
        }
        valid
    })
}
