//! A reader, writer and structural validator for the
//! [WebAssembly binary module format](https://webassembly.github.io/spec/core/binary/index.html).
//!
//! The decoder turns a borrowed byte buffer into a strongly-typed
//! [`Module`] tree, the encoder turns the tree back into its canonical byte
//! form, and the validator checks the cross-section invariants that do not
//! require full instruction type-checking. All proposal-gated grammar
//! (reference types, SIMD, threads, exceptions, GC, …) is controlled by a
//! runtime [`Features`](features::Features) set.

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

#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

pub mod errors;
pub mod features;
pub mod instructions;
pub mod io;
pub mod linking_section;
pub mod module;
pub mod name_section;
pub mod sections;
pub mod types;
pub mod valid;

pub use module::Module;
