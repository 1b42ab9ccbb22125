//! Byte-level reading and writing primitives shared by every production.

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

pub mod var;

use crate::errors::{format_bytes, Errors};
use crate::features::Features;
use crate::instructions::Opcode;
use crate::sections::SectionId;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};

/// The location of a decoded value: a sub-range of the input buffer.
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

impl Span {
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}..{}", self.offset, self.end())
    }
}

/// A decoded value paired with the byte range it was decoded from.
///
/// The span is an attribute, not part of the value: comparisons and hashing
/// ignore it, so trees built by hand (e.g. in tests) compare equal to decoded
/// ones.
#[derive(Clone, Copy)]
pub struct Spanned<T> {
    pub span: Span,
    pub value: T,
}

impl<T> Spanned<T> {
    pub fn new(span: Span, value: T) -> Self {
        Self { span, value }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            span: self.span,
            value: f(self.value),
        }
    }
}

impl<T> From<T> for Spanned<T> {
    fn from(value: T) -> Self {
        Self {
            span: Span::default(),
            value,
        }
    }
}

impl<T> Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Spanned<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: PartialEq> PartialEq for Spanned<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq> Eq for Spanned<T> {}

impl<T: Hash> Hash for Spanned<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T: Debug> Debug for Spanned<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.value.fmt(f)
    }
}

/// A borrowed cursor over the input buffer.
///
/// The cursor remembers its absolute position so that spans taken from
/// section payloads still point into the original module bytes.
#[derive(Clone, Copy)]
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// A cursor over a sub-buffer that starts at absolute position `offset`.
    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self { data, offset }
    }

    pub fn pos(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The span of all remaining data; used as the location of errors that
    /// are not attached to a narrower value.
    pub fn rest_span(&self) -> Span {
        Span::new(self.offset, self.data.len())
    }

    /// The span from an earlier position (obtained via [`Reader::pos`]) up to
    /// the current one.
    pub fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.offset - start)
    }

    /// Consumes and returns all remaining bytes.
    pub fn take_rest(&mut self) -> Spanned<&'a [u8]> {
        let span = self.rest_span();
        let bytes = self.advance(self.data.len());
        Spanned::new(span, bytes)
    }

    fn advance(&mut self, n: usize) -> &'a [u8] {
        let (taken, rest) = self.data.split_at(n);
        self.data = rest;
        self.offset += n;
        taken
    }
}

/// Decoding context threaded through every reader: the enabled features, the
/// error sink, and the cross-section state the grammar needs (section order,
/// code/data counts, the open-block stack of the instruction reader).
pub struct ReadCtx<'e> {
    pub features: Features,
    pub errors: &'e mut Errors,
    pub last_section_id: Option<Spanned<SectionId>>,
    pub defined_function_count: u32,
    pub declared_data_count: Option<u32>,
    pub code_count: u32,
    pub data_count: u32,
    pub local_count: u64,
    pub open_blocks: Vec<(Span, Opcode)>,
    pub seen_final_end: bool,
}

impl<'e> ReadCtx<'e> {
    pub fn new(features: Features, errors: &'e mut Errors) -> Self {
        Self {
            features,
            errors,
            last_section_id: None,
            defined_function_count: 0,
            declared_data_count: None,
            code_count: 0,
            data_count: 0,
            local_count: 0,
            open_blocks: Vec::new(),
            seen_final_end: false,
        }
    }

    pub fn reset(&mut self) {
        self.last_section_id = None;
        self.defined_function_count = 0;
        self.declared_data_count = None;
        self.code_count = 0;
        self.data_count = 0;
        self.local_count = 0;
        self.open_blocks.clear();
        self.seen_final_end = false;
    }

    /// A scratch context sharing this one's error sink but using a different
    /// feature set; element expressions decode through one.
    pub fn with_features(&mut self, features: Features) -> ReadCtx<'_> {
        ReadCtx::new(features, &mut *self.errors)
    }

    /// Runs `f` with `desc` pushed onto the error context stack, popping it
    /// on every exit path.
    pub fn guarded<T>(
        &mut self,
        span: Span,
        desc: &str,
        f: impl FnOnce(&mut Self) -> Option<T>,
    ) -> Option<T> {
        self.errors.push_context(span, desc);
        let result = f(self);
        self.errors.pop_context();
        result
    }
}

/// Byte-stream to typed-tree direction. `None` is always accompanied by at
/// least one recorded error.
pub trait Decode<'a>: Sized {
    fn decode(r: &mut Reader<'a>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<Self>>;
}

/// Typed-tree to byte-stream direction, mirroring [`Decode`]. The encoder
/// always emits the canonical (minimal-LEB128) form.
pub trait Encode {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()>;
}

impl<T: Encode> Encode for Spanned<T> {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        self.value.encode(w)
    }
}

impl Encode for u8 {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        w.write_all(&[*self])
    }
}

impl Encode for u32 {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        var::write_var_u32(*self, w)
    }
}

impl Encode for u64 {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        var::write_var_u64(*self, w)
    }
}

impl Encode for i32 {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        var::write_var_s32(*self, w)
    }
}

impl Encode for i64 {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        var::write_var_s64(*self, w)
    }
}

impl Encode for str {
    fn encode(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        write_bytes_prefixed(self.as_bytes(), w)
    }
}

/// Writes a count-prefixed vector.
pub fn write_vector<T: Encode>(items: &[T], w: &mut impl std::io::Write) -> std::io::Result<()> {
    u32::try_from(items.len())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "vector too long"))?
        .encode(w)?;
    for item in items {
        item.encode(w)?;
    }
    Ok(())
}

/// Writes a length-prefixed byte run (the `string` production).
pub fn write_bytes_prefixed(bytes: &[u8], w: &mut impl std::io::Write) -> std::io::Result<()> {
    u32::try_from(bytes.len())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "byte run too long"))?
        .encode(w)?;
    w.write_all(bytes)
}

pub fn peek_u8(r: &Reader<'_>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<u8>> {
    if r.is_empty() {
        ctx.errors.on_error(r.rest_span(), "Unable to read u8");
        return None;
    }
    Some(Spanned::new(Span::new(r.pos(), 1), r.data[0]))
}

pub fn read_u8(r: &mut Reader<'_>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<u8>> {
    let result = peek_u8(r, ctx)?;
    r.advance(1);
    Some(result)
}

pub fn read_bytes<'a>(
    r: &mut Reader<'a>,
    n: usize,
    ctx: &mut ReadCtx<'_>,
) -> Option<Spanned<&'a [u8]>> {
    if r.len() < n {
        ctx.errors
            .on_error(r.rest_span(), format!("Unable to read {n} bytes"));
        return None;
    }
    let start = r.pos();
    let bytes = r.advance(n);
    Some(Spanned::new(Span::new(start, n), bytes))
}

/// Reads exactly `expected.len()` bytes and checks them against `expected`;
/// used for the module magic and version.
pub fn read_bytes_expected<'a>(
    r: &mut Reader<'a>,
    expected: &[u8],
    ctx: &mut ReadCtx<'_>,
    desc: &str,
) -> Option<Spanned<&'a [u8]>> {
    ctx.guarded(r.rest_span(), desc, |ctx| {
        let actual = read_bytes(r, expected.len(), ctx)?;
        if actual.value != expected {
            ctx.errors.on_error(
                actual.span,
                format!(
                    "Mismatch: expected {}, got {}",
                    format_bytes(expected),
                    format_bytes(actual.value)
                ),
            );
            return None;
        }
        Some(actual)
    })
}

pub fn read_index(r: &mut Reader<'_>, ctx: &mut ReadCtx<'_>, desc: &str) -> Option<Spanned<u32>> {
    var::read_var_u32(r, ctx, desc)
}

/// Reads a `varu32` under an extra context label (e.g. `min`, `offset`).
pub fn read_u32_labelled(
    r: &mut Reader<'_>,
    ctx: &mut ReadCtx<'_>,
    label: &str,
) -> Option<Spanned<u32>> {
    ctx.guarded(r.rest_span(), label, |ctx| var::read_var_u32(r, ctx, "u32"))
}

fn read_check_length(
    r: &mut Reader<'_>,
    ctx: &mut ReadCtx<'_>,
    context_name: &str,
    error_name: &str,
) -> Option<Spanned<u32>> {
    let count = read_index(r, ctx, context_name)?;

    // There has to be at least one byte per counted item, so a count larger
    // than the remaining data cannot be satisfied.
    if count.value as usize > r.len() {
        ctx.errors.on_error(
            count.span,
            format!(
                "{error_name} extends past end: {} > {}",
                count.value,
                r.len()
            ),
        );
        return None;
    }
    Some(count)
}

pub fn read_length(r: &mut Reader<'_>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<u32>> {
    read_check_length(r, ctx, "length", "Length")
}

pub fn read_count(r: &mut Reader<'_>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<u32>> {
    read_check_length(r, ctx, "count", "Count")
}

pub fn read_string<'a>(
    r: &mut Reader<'a>,
    ctx: &mut ReadCtx<'_>,
    desc: &str,
) -> Option<Spanned<&'a [u8]>> {
    let start = r.pos();
    ctx.guarded(r.rest_span(), desc, |ctx| {
        let len = read_length(r, ctx)?;
        let bytes = read_bytes(r, len.value as usize, ctx)?;
        Some(Spanned::new(r.span_from(start), bytes.value))
    })
}

pub fn read_utf8_string<'a>(
    r: &mut Reader<'a>,
    ctx: &mut ReadCtx<'_>,
    desc: &str,
) -> Option<Spanned<&'a str>> {
    let bytes = read_string(r, ctx, desc)?;
    match std::str::from_utf8(bytes.value) {
        Ok(s) => Some(Spanned::new(bytes.span, s)),
        Err(_) => {
            ctx.errors.on_error(bytes.span, "Invalid UTF-8 encoding");
            None
        }
    }
}

pub fn read_reserved(r: &mut Reader<'_>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<u8>> {
    ctx.guarded(r.rest_span(), "reserved", |ctx| {
        let reserved = read_u8(r, ctx)?;
        if reserved.value != 0 {
            ctx.errors.on_error(
                reserved.span,
                format!("Expected reserved byte 0, got {}", reserved.value),
            );
            return None;
        }
        Some(reserved)
    })
}

pub fn read_reserved_index(r: &mut Reader<'_>, ctx: &mut ReadCtx<'_>) -> Option<Spanned<u32>> {
    let reserved = read_reserved(r, ctx)?;
    Some(reserved.map(u32::from))
}

/// Reads a count-prefixed vector of `T`. One element failure stops the
/// vector.
pub fn read_vector<'a, T: Decode<'a>>(
    r: &mut Reader<'a>,
    ctx: &mut ReadCtx<'_>,
    desc: &str,
) -> Option<Spanned<Vec<Spanned<T>>>> {
    let start = r.pos();
    ctx.guarded(r.rest_span(), desc, |ctx| {
        let count = read_count(r, ctx)?;
        let mut items = Vec::with_capacity(count.value.min(1024) as usize);
        for _ in 0..count.value {
            items.push(T::decode(r, ctx)?);
        }
        Some(Spanned::new(r.span_from(start), items))
    })
}

/// `f32`/`f64` wrapper that compares and hashes by bit pattern, so that
/// tree nodes containing float constants can still derive `Eq`/`Hash`.
#[derive(Clone, Copy)]
pub struct FloatConst<T>(pub T);

macro_rules! float_const {
    ($ty:ty, $bits:ty) => {
        impl FloatConst<$ty> {
            pub fn to_bits(self) -> $bits {
                self.0.to_bits()
            }
        }

        impl From<$ty> for FloatConst<$ty> {
            fn from(value: $ty) -> Self {
                Self(value)
            }
        }

        impl PartialEq for FloatConst<$ty> {
            fn eq(&self, other: &Self) -> bool {
                self.0.to_bits() == other.0.to_bits()
            }
        }

        impl Eq for FloatConst<$ty> {}

        impl Hash for FloatConst<$ty> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.to_bits().hash(state);
            }
        }

        impl Debug for FloatConst<$ty> {
            fn fmt(&self, f: &mut Formatter) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

float_const!(f32, u32);
float_const!(f64, u64);

/// `custom_debug` helper: formats borrowed byte payloads as hex.
pub(crate) fn fmt_bytes(bytes: &Spanned<&[u8]>, f: &mut Formatter) -> fmt::Result {
    write!(f, "[{} bytes:", bytes.value.len())?;
    for byte in bytes.value.iter().take(32) {
        write!(f, " {byte:02x}")?;
    }
    if bytes.value.len() > 32 {
        write!(f, " …")?;
    }
    write!(f, "]")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_pair() -> Errors {
        Errors::new()
    }

    #[test]
    fn spans_track_absolute_positions() {
        let mut errors = ctx_pair();
        let mut ctx = ReadCtx::new(Features::new(), &mut errors);
        let data = [1u8, 2, 3, 4];
        let mut r = Reader::at(&data[1..], 1);
        let byte = read_u8(&mut r, &mut ctx).unwrap();
        assert_eq!(byte.span, Span::new(1, 1));
        assert_eq!(byte.value, 2);
        let rest = read_bytes(&mut r, 2, &mut ctx).unwrap();
        assert_eq!(rest.span, Span::new(2, 2));
        assert_eq!(rest.value, &[3, 4]);
    }

    #[test]
    fn underflow_reports_remaining_span() {
        let mut errors = ctx_pair();
        let mut ctx = ReadCtx::new(Features::new(), &mut errors);
        let data = [1u8];
        let mut r = Reader::new(&data);
        assert!(read_bytes(&mut r, 4, &mut ctx).is_none());
        let all: Vec<_> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(all, ["Unable to read 4 bytes"]);
    }

    #[test]
    fn expected_bytes_mismatch() {
        let mut errors = ctx_pair();
        let mut ctx = ReadCtx::new(Features::new(), &mut errors);
        let mut r = Reader::new(b"\0ASM");
        assert!(read_bytes_expected(&mut r, b"\0asm", &mut ctx, "magic").is_none());
        let all: Vec<_> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            all,
            ["magic: Mismatch: expected \"\\00\\61\\73\\6d\", got \"\\00\\41\\53\\4d\""]
        );
    }

    #[test]
    fn count_extends_past_end() {
        let mut errors = ctx_pair();
        let mut ctx = ReadCtx::new(Features::new(), &mut errors);
        let mut r = Reader::new(&[5, 0, 0]);
        assert!(read_count(&mut r, &mut ctx).is_none());
        let all: Vec<_> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(all, ["Count extends past end: 5 > 2"]);
    }

    #[test]
    fn utf8_strings_are_validated() {
        let mut errors = ctx_pair();
        let mut ctx = ReadCtx::new(Features::new(), &mut errors);
        let mut r = Reader::new(&[2, 0xc3, 0xa9]);
        let s = read_utf8_string(&mut r, &mut ctx, "name").unwrap();
        assert_eq!(s.value, "é");

        let mut r = Reader::new(&[2, 0xc3, 0x28]);
        assert!(read_utf8_string(&mut r, &mut ctx, "name").is_none());
        let all: Vec<_> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(all, ["Invalid UTF-8 encoding"]);
    }

    #[test]
    fn reserved_byte_must_be_zero() {
        let mut errors = ctx_pair();
        let mut ctx = ReadCtx::new(Features::new(), &mut errors);
        let mut r = Reader::new(&[1]);
        assert!(read_reserved(&mut r, &mut ctx).is_none());
        let all: Vec<_> = errors.iter().map(ToString::to_string).collect();
        assert_eq!(all, ["reserved: Expected reserved byte 0, got 1"]);
    }

    #[test]
    fn float_consts_compare_by_bits() {
        assert_eq!(FloatConst(f32::NAN), FloatConst(f32::NAN));
        assert_ne!(FloatConst(0.0f64), FloatConst(-0.0f64));
        assert_eq!(FloatConst(1.5f64), FloatConst(1.5f64));
    }
}
