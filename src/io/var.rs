//! LEB128 variable-length integers of bounded bit width.
//!
//! Reading enforces the format's overlong-encoding rules: an encoding may use
//! at most `ceil(bits / 7)` bytes, and the unused high bits of the final
//! permitted byte must be a correct zero extension (unsigned) or sign
//! extension (signed) of the in-range payload. Writing goes through the
//! `leb128` crate, which emits the minimal form the canonical encoding
//! requires; the fixed-length writers exist for the patch-back pattern and
//! always produce sequences that read back to the original value.

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

use super::{read_u8, ReadCtx, Reader, Spanned};

const PAYLOAD_MASK: u8 = 0x7f;
const CONTINUATION_BIT: u8 = 0x80;

// Accumulates into a u64 regardless of the target width; the wrappers below
// truncate. For signed reads the result is sign-extended to the full 64 bits.
fn read_var(
    r: &mut Reader<'_>,
    ctx: &mut ReadCtx<'_>,
    desc: &str,
    bits: u32,
    signed: bool,
) -> Option<Spanned<u64>> {
    let start = r.pos();
    ctx.guarded(r.rest_span(), desc, |ctx| {
        let max_bytes = (bits + 6) / 7;
        let mut result: u64 = 0;
        for i in 0..max_bytes {
            let byte = read_u8(r, ctx)?;
            let shift = i * 7;
            result |= u64::from(byte.value & PAYLOAD_MASK) << shift;

            if i + 1 == max_bytes {
                // Bits of the final byte that must agree with the extension
                // of the in-range payload. The continuation bit is part of
                // the mask, so an over-length sequence fails the same check.
                let used_bits = bits - shift;
                let free_bits = if signed { used_bits - 1 } else { used_bits };
                let last_mask = (!0u8) << free_bits;
                let ones = last_mask & PAYLOAD_MASK;

                let valid = byte.value & last_mask == 0
                    || (signed && byte.value & last_mask == ones);
                if !valid {
                    let zero_ext = byte.value & !last_mask & PAYLOAD_MASK;
                    let one_ext = (byte.value | ones) & PAYLOAD_MASK;
                    let message = if signed {
                        format!(
                            "Last byte of {desc} must be sign extension: \
                             expected 0x{zero_ext:x} or 0x{one_ext:x}, got 0x{:x}",
                            byte.value
                        )
                    } else {
                        format!(
                            "Last byte of {desc} must be zero extension: \
                             expected 0x{zero_ext:x}, got 0x{:x}",
                            byte.value
                        )
                    };
                    ctx.errors.on_error(byte.span, message);
                    return None;
                }
            } else if byte.value & CONTINUATION_BIT == 0 {
                if signed {
                    let sign_bit = shift + 6;
                    if byte.value & 0x40 != 0 && sign_bit < 63 {
                        result |= (!0u64) << (sign_bit + 1);
                    }
                }
                break;
            }
        }
        Some(Spanned::new(r.span_from(start), result))
    })
}

#[allow(clippy::cast_possible_truncation)]
pub fn read_var_u32(r: &mut Reader<'_>, ctx: &mut ReadCtx<'_>, desc: &str) -> Option<Spanned<u32>> {
    read_var(r, ctx, desc, 32, false).map(|v| v.map(|v| v as u32))
}

pub fn read_var_u64(r: &mut Reader<'_>, ctx: &mut ReadCtx<'_>, desc: &str) -> Option<Spanned<u64>> {
    read_var(r, ctx, desc, 64, false)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn read_var_s32(r: &mut Reader<'_>, ctx: &mut ReadCtx<'_>, desc: &str) -> Option<Spanned<i32>> {
    read_var(r, ctx, desc, 32, true).map(|v| v.map(|v| v as u32 as i32))
}

#[allow(clippy::cast_possible_wrap)]
pub fn read_var_s64(r: &mut Reader<'_>, ctx: &mut ReadCtx<'_>, desc: &str) -> Option<Spanned<i64>> {
    read_var(r, ctx, desc, 64, true).map(|v| v.map(|v| v as i64))
}

pub fn write_var_u32(value: u32, w: &mut impl std::io::Write) -> std::io::Result<()> {
    leb128::write::unsigned(w, u64::from(value)).map(|_| ())
}

pub fn write_var_u64(value: u64, w: &mut impl std::io::Write) -> std::io::Result<()> {
    leb128::write::unsigned(w, value).map(|_| ())
}

pub fn write_var_s32(value: i32, w: &mut impl std::io::Write) -> std::io::Result<()> {
    leb128::write::signed(w, i64::from(value)).map(|_| ())
}

pub fn write_var_s64(value: i64, w: &mut impl std::io::Write) -> std::io::Result<()> {
    leb128::write::signed(w, value).map(|_| ())
}

/// Writes `value` as exactly `byte_count` LEB128 bytes, padding with
/// continuation bytes. Used when a size has to be reserved before its value
/// is known and patched afterwards.
pub fn write_fixed_var_u32(
    value: u32,
    byte_count: usize,
    w: &mut impl std::io::Write,
) -> std::io::Result<()> {
    let mut v = u64::from(value);
    for i in 0..byte_count {
        #[allow(clippy::cast_possible_truncation)]
        let mut byte = (v & u64::from(PAYLOAD_MASK)) as u8;
        v >>= 7;
        if i + 1 < byte_count {
            byte |= CONTINUATION_BIT;
        }
        w.write_all(&[byte])?;
    }
    debug_assert_eq!(v, 0, "value does not fit in {byte_count} bytes");
    Ok(())
}

/// Signed counterpart of [`write_fixed_var_u32`]; padding bytes replicate the
/// sign so the sequence still ends in a valid sign extension.
pub fn write_fixed_var_s64(
    value: i64,
    byte_count: usize,
    w: &mut impl std::io::Write,
) -> std::io::Result<()> {
    let mut v = value;
    for i in 0..byte_count {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mut byte = (v & i64::from(PAYLOAD_MASK)) as u8;
        v >>= 7;
        if i + 1 < byte_count {
            byte |= CONTINUATION_BIT;
        }
        w.write_all(&[byte])?;
    }
    debug_assert!(
        v == 0 || v == -1,
        "value does not fit in {byte_count} bytes"
    );
    Ok(())
}

pub fn write_fixed_var_s32(
    value: i32,
    byte_count: usize,
    w: &mut impl std::io::Write,
) -> std::io::Result<()> {
    write_fixed_var_s64(i64::from(value), byte_count, w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Errors;
    use crate::features::Features;

    fn u32_of(bytes: &[u8]) -> Result<u32, String> {
        let mut errors = Errors::new();
        let mut ctx = ReadCtx::new(Features::new(), &mut errors);
        let mut r = Reader::new(bytes);
        let result = read_var_u32(&mut r, &mut ctx, "u32").map(|v| v.value);
        result.ok_or_else(|| errors.iter().next().unwrap().to_string())
    }

    fn s32_of(bytes: &[u8]) -> Result<i32, String> {
        let mut errors = Errors::new();
        let mut ctx = ReadCtx::new(Features::new(), &mut errors);
        let mut r = Reader::new(bytes);
        let result = read_var_s32(&mut r, &mut ctx, "s32").map(|v| v.value);
        result.ok_or_else(|| errors.iter().next().unwrap().to_string())
    }

    fn s64_of(bytes: &[u8]) -> Result<i64, String> {
        let mut errors = Errors::new();
        let mut ctx = ReadCtx::new(Features::new(), &mut errors);
        let mut r = Reader::new(bytes);
        let result = read_var_s64(&mut r, &mut ctx, "s64").map(|v| v.value);
        result.ok_or_else(|| errors.iter().next().unwrap().to_string())
    }

    #[test]
    fn u32_basic() {
        assert_eq!(u32_of(&[0x00]), Ok(0));
        assert_eq!(u32_of(&[0x7f]), Ok(127));
        assert_eq!(u32_of(&[0x80, 0x01]), Ok(128));
        assert_eq!(u32_of(&[0xff, 0xff, 0xff, 0xff, 0x0f]), Ok(u32::MAX));
        // Non-minimal but valid encodings are accepted by the reader.
        assert_eq!(u32_of(&[0x82, 0x80, 0x80, 0x80, 0x00]), Ok(2));
    }

    #[test]
    fn u32_final_byte_must_be_zero_extension() {
        assert_eq!(
            u32_of(&[0x80, 0x80, 0x80, 0x80, 0x08]),
            Ok(1 << 31),
            "top in-range bit"
        );
        assert_eq!(
            u32_of(&[0x80, 0x80, 0x80, 0x80, 0x10]),
            Err("u32: Last byte of u32 must be zero extension: expected 0x0, got 0x10".into())
        );
        assert_eq!(
            u32_of(&[0xff, 0xff, 0xff, 0xff, 0x1f]),
            Err("u32: Last byte of u32 must be zero extension: expected 0xf, got 0x1f".into())
        );
    }

    #[test]
    fn u64_boundaries() {
        let u64_of = |bytes: &[u8]| -> Option<u64> {
            let mut errors = Errors::new();
            let mut ctx = ReadCtx::new(Features::new(), &mut errors);
            let mut r = Reader::new(bytes);
            read_var_u64(&mut r, &mut ctx, "u64").map(|v| v.value)
        };

        assert_eq!(u64_of(&[0x00]), Some(0));
        assert_eq!(
            u64_of(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]),
            Some(u64::MAX)
        );
        // The tenth byte only has one payload bit to spare.
        assert_eq!(
            u64_of(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02]),
            None
        );
    }

    #[test]
    fn u32_too_many_bytes() {
        // Continuation still set on the fifth byte.
        assert!(u32_of(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x00]).is_err());
    }

    #[test]
    fn u32_underflow() {
        assert_eq!(u32_of(&[0x80]), Err("u32: Unable to read u8".into()));
    }

    #[test]
    fn s32_sign_extension_boundaries() {
        assert_eq!(s32_of(&[0x7f]), Ok(-1));
        assert_eq!(s32_of(&[0xff, 0x7f]), Ok(-1));
        assert_eq!(s32_of(&[0xff, 0xff, 0xff, 0xff, 0x07]), Ok(i32::MAX));
        assert_eq!(s32_of(&[0x80, 0x80, 0x80, 0x80, 0x78]), Ok(i32::MIN));
        // Final-byte extension bits: 0x05 (positive) and 0x7d (negative) are
        // valid, 0x15 and 0x73 are not.
        assert_eq!(s32_of(&[0x80, 0x80, 0x80, 0x80, 0x05]), Ok(0x5000_0000));
        assert_eq!(s32_of(&[0x80, 0x80, 0x80, 0x80, 0x7d]), Ok(0x5000_0000u32 as i32 | i32::MIN));
        assert_eq!(
            s32_of(&[0x80, 0x80, 0x80, 0x80, 0x15]),
            Err("s32: Last byte of s32 must be sign extension: expected 0x5 or 0x7d, got 0x15".into())
        );
        assert_eq!(
            s32_of(&[0x80, 0x80, 0x80, 0x80, 0x73]),
            Err("s32: Last byte of s32 must be sign extension: expected 0x3 or 0x7b, got 0x73".into())
        );
    }

    #[test]
    fn s64_boundaries() {
        assert_eq!(s64_of(&[0x7f]), Ok(-1));
        assert_eq!(
            s64_of(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00]),
            Ok(i64::MAX)
        );
        assert_eq!(
            s64_of(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x7f]),
            Ok(i64::MIN)
        );
        assert_eq!(
            s64_of(&[0xff; 10]),
            Err("s64: Last byte of s64 must be sign extension: expected 0x0 or 0x7f, got 0xff".into())
        );
    }

    #[test]
    fn writers_emit_minimal_form() {
        fn written_u32(value: u32) -> Vec<u8> {
            let mut out = Vec::new();
            write_var_u32(value, &mut out).unwrap();
            out
        }
        fn written_s64(value: i64) -> Vec<u8> {
            let mut out = Vec::new();
            write_var_s64(value, &mut out).unwrap();
            out
        }

        assert_eq!(written_u32(0), [0x00]);
        assert_eq!(written_u32(624_485), [0xe5, 0x8e, 0x26]);
        assert_eq!(written_u32(u32::MAX), [0xff, 0xff, 0xff, 0xff, 0x0f]);
        assert_eq!(written_s64(-1), [0x7f]);
        assert_eq!(written_s64(-123_456), [0xc0, 0xbb, 0x78]);
    }

    #[test]
    fn roundtrip_minimal() {
        for value in [0u32, 1, 127, 128, 624_485, u32::MAX] {
            let mut out = Vec::new();
            write_var_u32(value, &mut out).unwrap();
            assert_eq!(u32_of(&out), Ok(value));
        }
        for value in [0i64, -1, 63, -64, 64, i64::MIN, i64::MAX] {
            let mut out = Vec::new();
            write_var_s64(value, &mut out).unwrap();
            assert_eq!(s64_of(&out), Ok(value));
        }
    }

    #[test]
    fn roundtrip_fixed_length() {
        for value in [0u32, 1, 0x1234, u32::MAX] {
            let mut out = Vec::new();
            write_fixed_var_u32(value, 5, &mut out).unwrap();
            assert_eq!(out.len(), 5);
            assert_eq!(u32_of(&out), Ok(value));
        }
        for value in [0i64, -1, 255, -129, i64::MIN, i64::MAX] {
            let mut out = Vec::new();
            write_fixed_var_s64(value, 10, &mut out).unwrap();
            assert_eq!(out.len(), 10);
            assert_eq!(s64_of(&out), Ok(value));
        }
    }
}
