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

//! Whole-module decode/encode/validate scenarios.

use anyhow::{ensure, Result};
use wasmloom::errors::Errors;
use wasmloom::features::Features;
use wasmloom::instructions::{Expression, Immediate, Instruction, Opcode};
use wasmloom::io::{Decode, ReadCtx, Reader, Span, Spanned};
use wasmloom::module::{read_module, write_module, Module};
use wasmloom::sections::{
    Code, DataSegment, ElementList, ElementSegment, Export, Function, Global, Import, ImportDesc,
    Memory, SegmentType, Start, Table,
};
use wasmloom::types::{
    DefinedType, ExternalKind, FunctionType, GlobalType, IndexType, Limits, MemoryType, Mutability,
    ReferenceType, TableType, ValueType,
};
use wasmloom::valid::{validate_module, ValidCtx};

const EMPTY_MODULE: &[u8] = b"\0asm\x01\0\0\0";

const I32_IDENTITY_MODULE: &[u8] =
    b"\0asm\x01\0\0\0\x01\x06\x01\x60\x01\x7f\x01\x7f\x03\x02\x01\x00\x0a\x06\x01\x04\x00\x20\x00\x0b";

fn decode(bytes: &[u8], features: Features) -> (Option<Module<'_>>, Vec<String>) {
    let mut errors = Errors::new();
    let module = {
        let mut ctx = ReadCtx::new(features, &mut errors);
        read_module(bytes, &mut ctx)
    };
    let recorded = errors.iter().map(ToString::to_string).collect();
    (module, recorded)
}

fn encode(module: &Module<'_>) -> Vec<u8> {
    let mut out = Vec::new();
    write_module(module, &mut out).unwrap();
    out
}

fn validate(module: &Module<'_>, features: Features) -> (bool, Vec<String>) {
    let mut errors = Errors::new();
    let valid = {
        let mut ctx = ValidCtx::new(features, &mut errors);
        validate_module(module, &mut ctx)
    };
    (valid, errors.iter().map(ToString::to_string).collect())
}

#[test]
fn empty_module() -> Result<()> {
    let (module, errors) = decode(EMPTY_MODULE, Features::new());
    ensure!(errors.is_empty(), "unexpected errors: {errors:?}");
    let module = module.unwrap();
    ensure!(module == Module::default(), "expected an empty module");

    ensure!(encode(&module) == EMPTY_MODULE);

    let (valid, errors) = validate(&module, Features::new());
    ensure!(valid && errors.is_empty());
    Ok(())
}

#[test]
fn i32_identity_function() -> Result<()> {
    let (module, errors) = decode(I32_IDENTITY_MODULE, Features::new());
    ensure!(errors.is_empty(), "unexpected errors: {errors:?}");
    let module = module.unwrap();

    let expected_type = DefinedType::Func(FunctionType {
        params: vec![ValueType::I32.into()],
        results: vec![ValueType::I32.into()],
    });
    ensure!(module.types == [expected_type.clone().into()]);
    ensure!(module.functions == [Function { type_index: 0.into() }.into()]);
    ensure!(module.codes.len() == 1);

    let code = &module.codes[0].value;
    ensure!(code.locals.is_empty());

    // The body decodes to `local.get 0` (the final `end` is implicit).
    let mut errors = Errors::new();
    let mut ctx = ReadCtx::new(Features::new(), &mut errors);
    let body = code.body.value.read_instructions(&mut ctx).unwrap();
    ensure!(
        body == [Instruction::new(Opcode::LocalGet, Immediate::Index(0.into())).into()],
        "unexpected body: {body:?}"
    );

    ensure!(encode(&module) == I32_IDENTITY_MODULE);

    let (valid, errors) = validate(&module, Features::new());
    ensure!(valid && errors.is_empty(), "validation errors: {errors:?}");
    Ok(())
}

#[test]
fn identity_function_builds_to_the_same_bytes() {
    // Building the same module by hand produces the canonical encoding.
    let body: &[u8] = &[0x20, 0x00, 0x0B];
    let mut module = Module::default();
    module.types.push(
        DefinedType::Func(FunctionType {
            params: vec![ValueType::I32.into()],
            results: vec![ValueType::I32.into()],
        })
        .into(),
    );
    module
        .functions
        .push(Function { type_index: 0.into() }.into());
    module.codes.push(
        Code {
            locals: Vec::new(),
            body: Expression {
                data: Spanned::new(Span::default(), body),
            }
            .into(),
        }
        .into(),
    );

    assert_eq!(encode(&module), I32_IDENTITY_MODULE);
}

#[test]
fn bad_magic() {
    let (module, errors) = decode(b"\0ASM\x01\0\0\0", Features::new());
    assert!(module.is_none());
    assert_eq!(
        errors,
        ["module: magic: Mismatch: expected \"\\00\\61\\73\\6d\", got \"\\00\\41\\53\\4d\""]
    );
}

#[test]
fn bad_magic_error_is_at_offset_zero() {
    let mut errors = Errors::new();
    let mut ctx = ReadCtx::new(Features::new(), &mut errors);
    assert!(read_module(b"\0ASM\x01\0\0\0", &mut ctx).is_none());
    drop(ctx);
    assert_eq!(errors.iter().next().unwrap().span, Span::new(0, 4));
}

#[test]
fn bad_version() {
    let (module, errors) = decode(b"\0asm\x02\0\0\0", Features::new());
    assert!(module.is_none());
    assert_eq!(
        errors,
        ["module: version: Mismatch: expected \"\\01\\00\\00\\00\", got \"\\02\\00\\00\\00\""]
    );
}

#[test]
fn active_data_segment() {
    // memory 0, offset (i64.const 1), bytes "wxyz".
    let bytes = b"\x00\x42\x01\x0b\x04wxyz";
    let mut errors = Errors::new();
    let mut ctx = ReadCtx::new(Features::new(), &mut errors);
    let mut r = Reader::new(bytes);
    let segment = DataSegment::decode(&mut r, &mut ctx).unwrap();
    assert!(errors.is_empty());

    assert_eq!(segment.value.segment_type, SegmentType::Active);
    assert_eq!(segment.value.memory_index, Some(0.into()));
    assert_eq!(segment.value.init.value, b"wxyz");
    let offset = segment.value.offset.as_ref().unwrap();
    assert_eq!(
        offset.value.instructions,
        [Instruction::new(Opcode::I64Const, Immediate::S64(1.into())).into()]
    );

    let mut out = Vec::new();
    use wasmloom::io::Encode;
    segment.encode(&mut out).unwrap();
    assert_eq!(out, bytes);
}

#[test]
fn element_segment_flag_forms() {
    use wasmloom::instructions::ElementExpression;

    let mut features = Features::new();
    features.enable_bulk_memory();

    let decode_segment = |bytes: &[u8]| {
        let mut errors = Errors::new();
        let mut ctx = ReadCtx::new(features, &mut errors);
        let mut r = Reader::new(bytes);
        let segment = ElementSegment::decode(&mut r, &mut ctx).map(|s| s.value);
        assert!(errors.is_empty(), "{:?}", errors.iter().collect::<Vec<_>>());
        segment.unwrap()
    };

    // Flags 7: declared, expression-form initializers with explicit funcref.
    let segment = decode_segment(&[0x07, 0x70, 0x01, 0xD2, 0x00, 0x0B]);
    assert_eq!(segment.segment_type, SegmentType::Declared);
    assert_eq!(segment.table_index, None);
    assert!(segment.offset.is_none());
    assert_eq!(
        segment.elements,
        ElementList::Expressions {
            element_type: ReferenceType::FUNCREF.into(),
            init: vec![ElementExpression {
                instructions: vec![
                    Instruction::new(Opcode::RefFunc, Immediate::Index(0.into())).into()
                ],
            }
            .into()],
        }
    );

    // Flags 3: declared, index-form with explicit kind byte.
    let segment = decode_segment(&[0x03, 0x00, 0x02, 0x00, 0x01]);
    assert_eq!(segment.segment_type, SegmentType::Declared);
    assert_eq!(
        segment.elements,
        ElementList::Indexes {
            kind: ExternalKind::Function.into(),
            init: vec![0.into(), 1.into()],
        }
    );

    // Flags 5: passive + expressions; re-encodes identically.
    let bytes = [0x05, 0x70, 0x01, 0xD0, 0x70, 0x0B];
    let segment = decode_segment(&bytes);
    assert_eq!(segment.segment_type, SegmentType::Passive);
    let mut out = Vec::new();
    use wasmloom::io::Encode;
    segment.encode(&mut out).unwrap();
    assert_eq!(out, bytes);

    // Flags above 7 are reserved.
    let mut errors = Errors::new();
    let mut ctx = ReadCtx::new(features, &mut errors);
    let mut r = Reader::new(&[0x08]);
    assert!(ElementSegment::decode(&mut r, &mut ctx).is_none());
    drop(ctx);
    assert_eq!(
        errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
        ["element segment: Invalid flags value: 8"]
    );
}

#[test]
fn code_count_must_match_function_count() {
    // One function declared, no code section.
    let bytes = b"\0asm\x01\0\0\0\x01\x06\x01\x60\x01\x7f\x01\x7f\x03\x02\x01\x00";
    let (module, errors) = decode(bytes, Features::new());
    assert!(module.is_some());
    assert_eq!(errors, ["module: Expected code count of 1, but got 0"]);
}

#[test]
fn declared_data_count_must_match_data_count() {
    let mut features = Features::new();
    features.enable_bulk_memory();

    // data_count declares 1 segment, data section is absent.
    let bytes = b"\0asm\x01\0\0\0\x0c\x01\x01";
    let (module, errors) = decode(bytes, features);
    assert!(module.is_some());
    assert_eq!(errors, ["module: Expected data count of 1, but got 0"]);

    // With a matching passive segment everything is consistent.
    let bytes = b"\0asm\x01\0\0\0\x0c\x01\x01\x0b\x04\x01\x01\x01w";
    let (module, errors) = decode(bytes, features);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    let module = module.unwrap();
    assert_eq!(module.data_segments.len(), 1);
    assert_eq!(module.data_segments[0].value.segment_type, SegmentType::Passive);
    assert_eq!(encode(&module), bytes);
}

#[test]
fn sections_must_be_ordered() {
    // A function section (id 3) after a table section (id 4).
    let bytes = b"\0asm\x01\0\0\0\x04\x04\x01\x70\x00\x00\x03\x02\x01\x00";
    let (module, errors) = decode(bytes, Features::new());
    assert!(module.is_some());
    assert!(
        errors.contains(
            &"module: section: section id: Section out of order: function cannot occur after table"
                .to_string()
        ) || errors
            .iter()
            .any(|e| e.contains("Section out of order: function cannot occur after table")),
        "missing order error: {errors:?}"
    );
}

#[test]
fn data_count_section_is_ordered_before_code() {
    let mut features = Features::new();
    features.enable_bulk_memory();

    // data_count (id 12) after data (id 11) violates the order.
    let bytes = b"\0asm\x01\0\0\0\x0b\x04\x01\x01\x01w\x0c\x01\x01";
    let (_, errors) = decode(bytes, features);
    assert!(
        errors
            .iter()
            .any(|e| e.contains("Section out of order: data_count cannot occur after data")),
        "missing order error: {errors:?}"
    );
}

#[test]
fn section_length_past_end_is_rejected() {
    // Section id 1 claims 16 bytes of payload, 1 available.
    let bytes = b"\0asm\x01\0\0\0\x01\x10\x00";
    let (module, errors) = decode(bytes, Features::new());
    assert!(module.is_some());
    assert_eq!(errors, ["module: section: Length extends past end: 16 > 1"]);
}

#[test]
fn rich_module_roundtrip() -> Result<()> {
    let mut features = Features::new();
    features.enable_mutable_globals();

    let mut module = Module::default();
    module.types.push(
        DefinedType::Func(FunctionType {
            params: Vec::new(),
            results: Vec::new(),
        })
        .into(),
    );
    module.imports.push(
        Import {
            module: Spanned::from("env"),
            name: Spanned::from("f"),
            desc: ImportDesc::Function(0.into()),
        }
        .into(),
    );
    module.imports.push(
        Import {
            module: Spanned::from("env"),
            name: Spanned::from("g"),
            desc: ImportDesc::Global(
                GlobalType {
                    value_type: ValueType::I32.into(),
                    mutability: Mutability::Const.into(),
                }
                .into(),
            ),
        }
        .into(),
    );
    module
        .functions
        .push(Function { type_index: 0.into() }.into());
    module.tables.push(
        Table {
            table_type: TableType {
                element: ReferenceType::FUNCREF.into(),
                limits: Limits {
                    min: 1.into(),
                    max: Some(1.into()),
                    shared: false,
                    index_type: IndexType::I32,
                }
                .into(),
            }
            .into(),
        }
        .into(),
    );
    module.memories.push(
        Memory {
            memory_type: MemoryType {
                limits: Limits {
                    min: 1.into(),
                    max: None,
                    shared: false,
                    index_type: IndexType::I32,
                }
                .into(),
            }
            .into(),
        }
        .into(),
    );
    module.globals.push(
        Global {
            global_type: GlobalType {
                value_type: ValueType::I32.into(),
                mutability: Mutability::Var.into(),
            }
            .into(),
            init: wasmloom::instructions::ConstantExpression::single(Instruction::new(
                Opcode::I32Const,
                Immediate::S32(7.into()),
            ))
            .into(),
        }
        .into(),
    );
    module.exports.push(
        Export {
            name: Spanned::from("run"),
            kind: ExternalKind::Function.into(),
            index: 1.into(),
        }
        .into(),
    );
    module.start = Some(Start { func_index: 1.into() }.into());
    module.element_segments.push(
        ElementSegment {
            segment_type: SegmentType::Active,
            table_index: Some(0.into()),
            offset: Some(
                wasmloom::instructions::ConstantExpression::single(Instruction::new(
                    Opcode::I32Const,
                    Immediate::S32(0.into()),
                ))
                .into(),
            ),
            elements: ElementList::Indexes {
                kind: ExternalKind::Function.into(),
                init: vec![1.into()],
            },
        }
        .into(),
    );
    let body: &[u8] = &[0x0B]; // just the final end
    module.codes.push(
        Code {
            locals: Vec::new(),
            body: Expression {
                data: Spanned::new(Span::default(), body),
            }
            .into(),
        }
        .into(),
    );
    module.data_segments.push(
        DataSegment {
            segment_type: SegmentType::Active,
            memory_index: Some(0.into()),
            offset: Some(
                wasmloom::instructions::ConstantExpression::single(Instruction::new(
                    Opcode::I32Const,
                    Immediate::S32(0.into()),
                ))
                .into(),
            ),
            init: Spanned::new(Span::default(), &b"hi"[..]),
        }
        .into(),
    );

    let bytes = encode(&module);
    let (decoded, errors) = decode(&bytes, features);
    ensure!(errors.is_empty(), "decode errors: {errors:?}");
    let decoded = decoded.unwrap();
    ensure!(decoded == module, "roundtrip mismatch:\n{decoded:#?}\n{module:#?}");

    // Decode → encode is byte-identical for canonical input.
    ensure!(encode(&decoded) == bytes);

    let (valid, errors) = validate(&decoded, features);
    ensure!(valid && errors.is_empty(), "validation errors: {errors:?}");
    Ok(())
}

#[test]
fn unknown_section_id() {
    let bytes = b"\0asm\x01\0\0\0\x0e\x00";
    let (module, errors) = decode(bytes, Features::new());
    assert!(module.is_some());
    assert_eq!(
        errors,
        ["module: section: section id: Unknown section id: 14"]
    );
}

#[test]
fn data_count_section_requires_bulk_memory() {
    let bytes = b"\0asm\x01\0\0\0\x0c\x01\x00";
    let (_, errors) = decode(bytes, Features::new());
    assert_eq!(
        errors,
        ["module: section: section id: Unknown section id: 12"]
    );
}

#[test]
fn validation_duplicate_export_names() {
    let mut module = Module::default();
    module.memories.push(
        Memory {
            memory_type: MemoryType {
                limits: Limits {
                    min: 1.into(),
                    max: None,
                    shared: false,
                    index_type: IndexType::I32,
                }
                .into(),
            }
            .into(),
        }
        .into(),
    );
    for _ in 0..2 {
        module.exports.push(
            Export {
                name: Spanned::from("m"),
                kind: ExternalKind::Memory.into(),
                index: 0.into(),
            }
            .into(),
        );
    }

    let (valid, errors) = validate(&module, Features::new());
    assert!(!valid);
    assert_eq!(errors, ["export: Duplicate export name: m"]);
}

#[test]
fn validation_mutable_global_export_is_gated() {
    let mut module = Module::default();
    module.globals.push(
        Global {
            global_type: GlobalType {
                value_type: ValueType::I32.into(),
                mutability: Mutability::Var.into(),
            }
            .into(),
            init: wasmloom::instructions::ConstantExpression::single(Instruction::new(
                Opcode::I32Const,
                Immediate::S32(0.into()),
            ))
            .into(),
        }
        .into(),
    );
    module.exports.push(
        Export {
            name: Spanned::from("g"),
            kind: ExternalKind::Global.into(),
            index: 0.into(),
        }
        .into(),
    );

    let (valid, errors) = validate(&module, Features::new());
    assert!(!valid);
    assert_eq!(errors, ["export: Mutable globals cannot be exported"]);

    let mut features = Features::new();
    features.enable_mutable_globals();
    let (valid, errors) = validate(&module, features);
    assert!(valid, "unexpected errors: {errors:?}");
}

#[test]
fn validation_too_many_memories() {
    let mut module = Module::default();
    for _ in 0..2 {
        module.memories.push(
            Memory {
                memory_type: MemoryType {
                    limits: Limits {
                        min: 1.into(),
                        max: None,
                        shared: false,
                        index_type: IndexType::I32,
                    }
                    .into(),
                }
                .into(),
            }
            .into(),
        );
    }

    let (valid, errors) = validate(&module, Features::new());
    assert!(!valid);
    assert_eq!(errors, ["memory: Too many memories, must be 1 or fewer"]);

    let mut features = Features::new();
    features.enable_multi_memory();
    let (valid, _) = validate(&module, features);
    assert!(valid);
}

#[test]
fn validation_start_function_signature() {
    let mut module = Module::default();
    module.types.push(
        DefinedType::Func(FunctionType {
            params: vec![ValueType::I32.into()],
            results: Vec::new(),
        })
        .into(),
    );
    module
        .functions
        .push(Function { type_index: 0.into() }.into());
    module.start = Some(Start { func_index: 0.into() }.into());
    let body: &[u8] = &[0x0B];
    module.codes.push(
        Code {
            locals: Vec::new(),
            body: Expression {
                data: Spanned::new(Span::default(), body),
            }
            .into(),
        }
        .into(),
    );

    let (valid, errors) = validate(&module, Features::new());
    assert!(!valid);
    assert_eq!(errors, ["start: Expected start function to have 0 params, got 1"]);

    // An out-of-range start index is its own error.
    module.start = Some(Start { func_index: 9.into() }.into());
    let (valid, errors) = validate(&module, Features::new());
    assert!(!valid);
    assert_eq!(errors, ["start: Invalid function index 9, must be less than 1"]);
}

#[test]
fn validation_constant_expressions() {
    // A global initialized from a *defined* global is not constant.
    let mut module = Module::default();
    module.globals.push(
        Global {
            global_type: GlobalType {
                value_type: ValueType::I32.into(),
                mutability: Mutability::Const.into(),
            }
            .into(),
            init: wasmloom::instructions::ConstantExpression::single(Instruction::new(
                Opcode::GlobalGet,
                Immediate::Index(0.into()),
            ))
            .into(),
        }
        .into(),
    );
    let (valid, errors) = validate(&module, Features::new());
    assert!(!valid);
    assert_eq!(
        errors,
        ["global: constant expression: Invalid global index 0, must be less than 0"]
    );

    // A non-producer instruction is flagged as illegal.
    let mut module = Module::default();
    module.globals.push(
        Global {
            global_type: GlobalType {
                value_type: ValueType::I32.into(),
                mutability: Mutability::Const.into(),
            }
            .into(),
            init: wasmloom::instructions::ConstantExpression::single(Instruction::new(
                Opcode::Nop,
                Immediate::None,
            ))
            .into(),
        }
        .into(),
    );
    let (valid, errors) = validate(&module, Features::new());
    assert!(!valid);
    assert_eq!(
        errors,
        ["global: constant expression: Illegal instruction in constant expression: nop"]
    );

    // Type mismatch between the initializer and the global.
    let mut module = Module::default();
    module.globals.push(
        Global {
            global_type: GlobalType {
                value_type: ValueType::I32.into(),
                mutability: Mutability::Const.into(),
            }
            .into(),
            init: wasmloom::instructions::ConstantExpression::single(Instruction::new(
                Opcode::I64Const,
                Immediate::S64(0.into()),
            ))
            .into(),
        }
        .into(),
    );
    let (valid, errors) = validate(&module, Features::new());
    assert!(!valid);
    assert_eq!(
        errors,
        ["global: constant expression: Invalid type: expected i32, got i64"]
    );
}

#[test]
fn validation_element_segment_function_indices() {
    let mut module = Module::default();
    module.tables.push(
        Table {
            table_type: TableType {
                element: ReferenceType::FUNCREF.into(),
                limits: Limits {
                    min: 1.into(),
                    max: None,
                    shared: false,
                    index_type: IndexType::I32,
                }
                .into(),
            }
            .into(),
        }
        .into(),
    );
    module.element_segments.push(
        ElementSegment {
            segment_type: SegmentType::Active,
            table_index: Some(0.into()),
            offset: Some(
                wasmloom::instructions::ConstantExpression::single(Instruction::new(
                    Opcode::I32Const,
                    Immediate::S32(0.into()),
                ))
                .into(),
            ),
            elements: ElementList::Indexes {
                kind: ExternalKind::Function.into(),
                init: vec![3.into()],
            },
        }
        .into(),
    );

    let (valid, errors) = validate(&module, Features::new());
    assert!(!valid);
    assert_eq!(
        errors,
        ["element segment: Invalid function index 3, must be less than 0"]
    );
}

#[test]
fn validation_memory64_data_offsets() {
    let mut features = Features::new();
    features.enable_memory64();

    let mut module = Module::default();
    module.memories.push(
        Memory {
            memory_type: MemoryType {
                limits: Limits {
                    min: 1.into(),
                    max: None,
                    shared: false,
                    index_type: IndexType::I64,
                }
                .into(),
            }
            .into(),
        }
        .into(),
    );
    module.data_segments.push(
        DataSegment {
            segment_type: SegmentType::Active,
            memory_index: Some(0.into()),
            offset: Some(
                wasmloom::instructions::ConstantExpression::single(Instruction::new(
                    Opcode::I64Const,
                    Immediate::S64(1.into()),
                ))
                .into(),
            ),
            init: Spanned::new(Span::default(), &b"wxyz"[..]),
        }
        .into(),
    );

    let (valid, errors) = validate(&module, features);
    assert!(valid, "unexpected errors: {errors:?}");

    // An i32 offset no longer matches a 64-bit memory.
    module.data_segments[0].value.offset = Some(
        wasmloom::instructions::ConstantExpression::single(Instruction::new(
            Opcode::I32Const,
            Immediate::S32(1.into()),
        ))
        .into(),
    );
    let (valid, errors) = validate(&module, features);
    assert!(!valid);
    assert_eq!(
        errors,
        ["data segment: offset: constant expression: Invalid type: expected i64, got i32"]
    );
}
