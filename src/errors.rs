//! Accumulating error sink with breadcrumb contexts.

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

use crate::io::Span;
use std::fmt::{self, Display, Formatter, Write};

/// A single recorded error: the context stack at the time of emission plus
/// the leaf location and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// Snapshot of the context stack, outermost first.
    pub context: Vec<(Span, String)>,
    pub span: Span,
    pub message: String,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for (_, desc) in &self.context {
            write!(f, "{desc}: ")?;
        }
        write!(f, "{}", self.message)
    }
}

/// The error sink shared by the decoder and the validator.
///
/// Grammar productions push a context before consuming bytes and pop it on
/// the way out; [`Errors::on_error`] snapshots the current stack, so each
/// recorded error carries the full breadcrumb trail (e.g.
/// `data segment: offset: constant expression: opcode: Unable to read u8`).
/// The sink never aborts; callers signal failure by returning an absent
/// value.
#[derive(Debug, Default)]
pub struct Errors {
    context: Vec<(Span, String)>,
    errors: Vec<Error>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_context(&mut self, span: Span, desc: impl Into<String>) {
        self.context.push((span, desc.into()));
    }

    pub fn pop_context(&mut self) {
        self.context.pop();
    }

    pub fn on_error(&mut self, span: Span, message: impl Into<String>) {
        self.errors.push(Error {
            context: self.context.clone(),
            span,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.errors.iter()
    }

    pub fn into_vec(self) -> Vec<Error> {
        self.errors
    }
}

/// Formats a byte string the way mismatch diagnostics expect it, e.g.
/// `"\00\61\73\6d"`.
pub(crate) fn format_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3 + 2);
    out.push('"');
    for byte in bytes {
        let _ = write!(out, "\\{byte:02x}");
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::{format_bytes, Errors};
    use crate::io::Span;

    #[test]
    fn breadcrumbs_snapshot_the_context_stack() {
        let mut errors = Errors::new();
        errors.push_context(Span::new(0, 10), "data segment");
        errors.push_context(Span::new(2, 8), "offset");
        errors.on_error(Span::new(4, 1), "Unable to read u8");
        errors.pop_context();
        errors.pop_context();
        errors.on_error(Span::new(9, 1), "Unable to read u8");

        let recorded: Vec<_> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            recorded,
            [
                "data segment: offset: Unable to read u8",
                "Unable to read u8",
            ]
        );
        assert_eq!(errors.iter().next().unwrap().span, Span::new(4, 1));
    }

    #[test]
    fn byte_string_formatting() {
        assert_eq!(format_bytes(b"\0asm"), "\"\\00\\61\\73\\6d\"");
        assert_eq!(format_bytes(&[]), "\"\"");
    }
}
