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

//! Lazy section iteration and the name/linking custom section readers.

use wasmloom::errors::Errors;
use wasmloom::features::Features;
use wasmloom::io::{ReadCtx, Span, Spanned};
use wasmloom::linking_section::{
    read_comdat_subsection, read_init_functions_subsection, read_linking_section,
    read_segment_info_subsection, read_symbol_table_subsection, Comdat, ComdatSymbol,
    ComdatSymbolKind, DataSymbolDef, InitFunction, LinkingSubsectionId, SegmentInfo, SymbolBinding,
    SymbolBody, SymbolInfoKind, SymbolVisibility,
};
use wasmloom::name_section::{
    read_function_names_subsection, read_local_names_subsection, read_module_name_subsection,
    read_name_section, IndirectNameAssoc, NameAssoc, NameSubsectionId,
};
use wasmloom::sections::read_function_section;

fn spanned(bytes: &[u8]) -> Spanned<&[u8]> {
    Spanned::new(Span::new(0, bytes.len()), bytes)
}

#[test]
fn lazy_sections_decode_on_demand() {
    let mut errors = Errors::new();
    let mut ctx = ReadCtx::new(Features::new(), &mut errors);

    // Three function entries.
    let payload = [3u8, 0, 1, 2];
    let section = read_function_section(spanned(&payload), &mut ctx);
    assert_eq!(section.count.map(|c| c.value), Some(3));
    let indices: Vec<u32> = section.map(|f| f.value.type_index.value).collect();
    assert_eq!(indices, [0, 1, 2]);

    // Each decoded element bumped the defined-function count.
    assert_eq!(ctx.defined_function_count, 3);
    drop(ctx);
    assert!(errors.is_empty());
}

#[test]
fn lazy_sections_can_be_dropped_early() {
    let mut errors = Errors::new();
    let mut ctx = ReadCtx::new(Features::new(), &mut errors);

    let payload = [3u8, 0, 1, 2];
    let mut section = read_function_section(spanned(&payload), &mut ctx);
    assert!(section.next().is_some());
    drop(section);

    // Only the consumed prefix had side effects.
    assert_eq!(ctx.defined_function_count, 1);
}

#[test]
fn lazy_section_failure_is_terminal() {
    let mut errors = Errors::new();
    let mut ctx = ReadCtx::new(Features::new(), &mut errors);

    // Count of 2 but the payload runs dry mid-element.
    let payload = [2u8, 0x80, 0x80];
    let section = read_function_section(spanned(&payload), &mut ctx);
    let decoded: Vec<_> = section.collect();
    assert!(decoded.is_empty());
    drop(ctx);
    assert_eq!(
        errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
        ["function section: function: type index: Unable to read u8"]
    );
}

#[test]
fn name_section_subsections() {
    let mut errors = Errors::new();
    let mut ctx = ReadCtx::new(Features::new(), &mut errors);

    // Module name "m"; function names 2 => "g"; local names for function 3:
    // 4 => "g4", 5 => "g5".
    let payload = b"\x00\x02\x01m\x01\x04\x01\x02\x01g\x02\x0b\x01\x03\x02\x04\x02g4\x05\x02g5";
    let subsections: Vec<_> = read_name_section(spanned(payload), &mut ctx).collect();
    assert_eq!(subsections.len(), 3);
    assert_eq!(subsections[0].value.id.value, NameSubsectionId::ModuleName);
    assert_eq!(subsections[1].value.id.value, NameSubsectionId::FunctionNames);
    assert_eq!(subsections[2].value.id.value, NameSubsectionId::LocalNames);

    // Module name payload.
    let name = read_module_name_subsection(subsections[0].value.data, &mut ctx).unwrap();
    assert_eq!(name.value, "m");

    // Function names payload: 2 => "g".
    let names: Vec<_> =
        read_function_names_subsection(subsections[1].value.data, &mut ctx).collect();
    assert_eq!(
        names,
        [NameAssoc {
            index: 2.into(),
            name: Spanned::from("g"),
        }
        .into()]
    );

    // Local names payload: function 3, locals 4 => "g4", 5 => "g5".
    let locals: Vec<_> = read_local_names_subsection(subsections[2].value.data, &mut ctx).collect();
    assert_eq!(
        locals,
        [IndirectNameAssoc {
            index: 3.into(),
            name_map: vec![
                NameAssoc {
                    index: 4.into(),
                    name: Spanned::from("g4"),
                }
                .into(),
                NameAssoc {
                    index: 5.into(),
                    name: Spanned::from("g5"),
                }
                .into(),
            ],
        }
        .into()]
    );

    drop(ctx);
    assert!(errors.is_empty());
}

#[test]
fn unknown_name_subsection_id() {
    let mut errors = Errors::new();
    let mut ctx = ReadCtx::new(Features::new(), &mut errors);

    let payload = [9u8, 0];
    let subsections: Vec<_> = read_name_section(spanned(&payload), &mut ctx).collect();
    assert!(subsections.is_empty());
    drop(ctx);
    assert_eq!(
        errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
        ["name section: name subsection: name subsection id: Unknown name subsection id: 9"]
    );
}

#[test]
fn linking_section_subsections() {
    let mut errors = Errors::new();
    let mut ctx = ReadCtx::new(Features::new(), &mut errors);

    let payload = b"\x02\
                    \x05\x05zzzzz\
                    \x06\x05zzzzz\
                    \x07\x05zzzzz\
                    \x08\x05zzzzz";
    let (version, section) = read_linking_section(spanned(payload), &mut ctx).unwrap();
    assert_eq!(version.value, 2);
    let ids: Vec<_> = section.map(|sub| sub.value.id.value).collect();
    assert_eq!(
        ids,
        [
            LinkingSubsectionId::SegmentInfo,
            LinkingSubsectionId::InitFunctions,
            LinkingSubsectionId::ComdatInfo,
            LinkingSubsectionId::SymbolTable,
        ]
    );
    drop(ctx);
    assert!(errors.is_empty());
}

#[test]
fn unsupported_linking_version() {
    let mut errors = Errors::new();
    let mut ctx = ReadCtx::new(Features::new(), &mut errors);

    assert!(read_linking_section(spanned(b"\x01"), &mut ctx).is_none());
    drop(ctx);
    assert_eq!(
        errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
        ["linking section: Unknown linking version: 1"]
    );
}

#[test]
fn segment_info_subsection() {
    let mut errors = Errors::new();
    let mut ctx = ReadCtx::new(Features::new(), &mut errors);

    let payload = b"\x03\x01X\x01\x02\x01Y\x03\x04\x01Z\x05\x06";
    let infos: Vec<_> = read_segment_info_subsection(spanned(payload), &mut ctx).collect();
    assert_eq!(
        infos,
        [
            SegmentInfo {
                name: Spanned::from("X"),
                align_log2: 1.into(),
                flags: 2.into(),
            }
            .into(),
            SegmentInfo {
                name: Spanned::from("Y"),
                align_log2: 3.into(),
                flags: 4.into(),
            }
            .into(),
            SegmentInfo {
                name: Spanned::from("Z"),
                align_log2: 5.into(),
                flags: 6.into(),
            }
            .into(),
        ]
    );
    drop(ctx);
    assert!(errors.is_empty());
}

#[test]
fn init_functions_subsection() {
    let mut errors = Errors::new();
    let mut ctx = ReadCtx::new(Features::new(), &mut errors);

    let payload = b"\x02\x01\x02\x03\x04";
    let inits: Vec<_> = read_init_functions_subsection(spanned(payload), &mut ctx).collect();
    assert_eq!(
        inits,
        [
            InitFunction {
                priority: 1.into(),
                index: 2.into(),
            }
            .into(),
            InitFunction {
                priority: 3.into(),
                index: 4.into(),
            }
            .into(),
        ]
    );
    drop(ctx);
    assert!(errors.is_empty());
}

#[test]
fn comdat_subsection() {
    let mut errors = Errors::new();
    let mut ctx = ReadCtx::new(Features::new(), &mut errors);

    let payload = b"\x02\x01X\0\x01\x03\x04\x01Y\0\x00";
    let comdats: Vec<_> = read_comdat_subsection(spanned(payload), &mut ctx).collect();
    assert_eq!(
        comdats,
        [
            Comdat {
                name: Spanned::from("X"),
                flags: 0.into(),
                symbols: vec![ComdatSymbol {
                    kind: ComdatSymbolKind::Tag.into(),
                    index: 4.into(),
                }
                .into()],
            }
            .into(),
            Comdat {
                name: Spanned::from("Y"),
                flags: 0.into(),
                symbols: Vec::new(),
            }
            .into(),
        ]
    );
    drop(ctx);
    assert!(errors.is_empty());
}

#[test]
fn symbol_table_subsection() {
    let mut errors = Errors::new();
    let mut ctx = ReadCtx::new(Features::new(), &mut errors);

    let payload = b"\x03\
                    \x00\x40\x00\x03YYY\
                    \x01\x00\x03ZZZ\x00\x00\x00\
                    \x03\x00\x00";
    let symbols: Vec<_> = read_symbol_table_subsection(spanned(payload), &mut ctx).collect();
    assert_eq!(symbols.len(), 3);

    let function = &symbols[0].value;
    assert_eq!(function.kind.value, SymbolInfoKind::Function);
    assert_eq!(function.flags.value.binding, SymbolBinding::Global);
    assert_eq!(function.flags.value.visibility, SymbolVisibility::Default);
    assert!(!function.flags.value.undefined);
    assert!(function.flags.value.explicit_name);
    assert_eq!(
        function.body,
        SymbolBody::Base {
            index: 0.into(),
            name: Some(Spanned::from("YYY")),
        }
    );

    let data = &symbols[1].value;
    assert_eq!(data.kind.value, SymbolInfoKind::Data);
    assert_eq!(
        data.body,
        SymbolBody::Data {
            name: Spanned::from("ZZZ"),
            defined: Some(DataSymbolDef {
                index: 0.into(),
                offset: 0.into(),
                size: 0.into(),
            }),
        }
    );

    let section = &symbols[2].value;
    assert_eq!(section.kind.value, SymbolInfoKind::Section);
    assert_eq!(section.body, SymbolBody::Section { section: 0.into() });

    drop(ctx);
    assert!(errors.is_empty());
}
