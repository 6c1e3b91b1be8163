//! Bijective variable-length integers.
//!
//! An integer encoded in `L` bytes starts with a unary length prefix of `L - 1`
//! one bits and a terminating zero bit, followed by `7 * L` payload bits in
//! big-endian order. Every length is offset by the count of values representable
//! with fewer bytes, so each integer has exactly one encoding:
//!
//! | bytes | range                  |
//! |-------|------------------------|
//! | 1     | `0 ..= 127`            |
//! | 2     | `128 ..= 16511`        |
//! | 3     | `16512 ..= 2113663`    |
//! | ...   | ...                    |
//!
//! The prefix alone tells how many bytes the encoding occupies, which makes it
//! possible to check whether a partially received buffer already holds a full
//! varint (see [`buf_contains_varint`]).

use crate::buffer::Writer;
use crate::error::DecodeError;

/// Longest encoding produced for a `u64`.
pub const MAX_INT_LEN: usize = 10;

/// Longest encoding produced for a `u128`.
pub const MAX_BIGINT_LEN: usize = 19;

/// Smallest value that needs `len` bytes.
const fn base(len: usize) -> u128 {
    let mut sum = 0u128;
    let mut k = 1;
    while k < len {
        sum += 1u128 << (7 * k);
        k += 1;
    }
    sum
}

/// Number of bytes needed to encode `num`.
pub fn encoded_len(num: u64) -> usize {
    encoded_len_big(u128::from(num))
}

/// Number of bytes needed to encode the big integer `num`.
pub fn encoded_len_big(num: u128) -> usize {
    let mut len = 1;
    let mut rest = num;
    loop {
        let bits = 7 * len;
        if bits >= 128 || rest < (1u128 << bits) {
            return len;
        }
        rest -= 1u128 << bits;
        len += 1;
    }
}

/// Write the `len`-byte encoding of `num` into `out[..len]`.
fn write_encoded(num: u128, len: usize, out: &mut [u8]) {
    let out = &mut out[..len];
    let mut payload = num - base(len);
    for byte in out.iter_mut().rev() {
        *byte = payload as u8;
        payload >>= 8;
    }
    for bit in 0..len - 1 {
        out[bit / 8] |= 0x80 >> (bit % 8);
    }
}

/// Encode `num` at the writer's cursor, returning the number of bytes written.
///
/// This is an unsigned encoding. Signed values go through [`zigzag_encode`]
/// first.
pub fn encode_into(num: u64, writer: &mut Writer) -> usize {
    encode_into_big(u128::from(num), writer)
}

/// Encode the big integer `num` at the writer's cursor, returning the number
/// of bytes written.
pub fn encode_into_big(num: u128, writer: &mut Writer) -> usize {
    let len = encoded_len_big(num);
    write_encoded(num, len, writer.spare_mut(len));
    writer.advance(len);
    len
}

/// Encode `num` into a standalone vector.
///
/// Prefer [`encode_into`] when a [`Writer`] is already at hand; it avoids the
/// extra allocation and copy.
pub fn encode(num: u64) -> Vec<u8> {
    encode_big(u128::from(num))
}

/// Encode the big integer `num` into a standalone vector.
pub fn encode_big(num: u128) -> Vec<u8> {
    let len = encoded_len_big(num);
    let mut out = vec![0u8; len];
    write_encoded(num, len, &mut out);
    out
}

/// Number of bytes occupied by the varint at the start of `buf`.
///
/// Only the length prefix is inspected. Returns `None` if `buf` ends before the
/// prefix does.
pub fn bytes_used(buf: &[u8]) -> Option<usize> {
    let mut ones = 0usize;
    for &byte in buf {
        if byte == 0xFF {
            ones += 8;
            continue;
        }
        return Some(ones + byte.leading_ones() as usize + 1);
    }
    None
}

/// Whether `buf` starts with a complete varint.
pub fn buf_contains_varint(buf: &[u8]) -> bool {
    bytes_used(buf).is_some_and(|len| len <= buf.len())
}

fn decode_bounded(buf: &[u8], offset: usize, max: usize) -> Result<(u128, usize), DecodeError> {
    let input = buf.get(offset..).unwrap_or(&[]);
    let len = bytes_used(input).ok_or(DecodeError::OutOfBounds {
        offset,
        need: input.len() + 1,
        have: input.len(),
    })?;
    if len > max {
        return Err(DecodeError::VarintTooLong { offset, len, max });
    }
    if input.len() < len {
        return Err(DecodeError::OutOfBounds {
            offset,
            need: len,
            have: input.len(),
        });
    }

    let mut payload = 0u128;
    for (i, &byte) in input[..len].iter().enumerate() {
        let start = i * 8;
        let byte = if len >= start + 8 {
            0
        } else if len > start {
            byte & (0xFF >> (len - start))
        } else {
            byte
        };
        if payload >> 120 != 0 {
            return Err(DecodeError::VarintOverflow { offset });
        }
        payload = (payload << 8) | u128::from(byte);
    }

    let value = payload
        .checked_add(base(len))
        .ok_or(DecodeError::VarintOverflow { offset })?;
    Ok((value, len))
}

/// Decode the varint at the start of `buf`, returning `(value, bytes_used)`.
pub fn decode(buf: &[u8]) -> Result<(u64, usize), DecodeError> {
    decode_at(buf, 0)
}

/// Decode the varint starting at `offset` in `buf`.
pub fn decode_at(buf: &[u8], offset: usize) -> Result<(u64, usize), DecodeError> {
    let (value, len) = decode_bounded(buf, offset, MAX_INT_LEN)?;
    let value = u64::try_from(value).map_err(|_| DecodeError::VarintOverflow { offset })?;
    Ok((value, len))
}

/// Decode the big-integer varint at the start of `buf`.
pub fn decode_big(buf: &[u8]) -> Result<(u128, usize), DecodeError> {
    decode_big_at(buf, 0)
}

/// Decode the big-integer varint starting at `offset` in `buf`.
pub fn decode_big_at(buf: &[u8], offset: usize) -> Result<(u128, usize), DecodeError> {
    decode_bounded(buf, offset, MAX_BIGINT_LEN)
}

/// Map a signed integer onto the unsigned domain: `0, -1, 1, -2, ...` become
/// `0, 1, 2, 3, ...`.
#[inline]
pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
#[inline]
pub fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// [`zigzag_encode`] for 128-bit integers.
#[inline]
pub fn zigzag_encode_big(n: i128) -> u128 {
    ((n << 1) ^ (n >> 127)) as u128
}

/// [`zigzag_decode`] for 128-bit integers.
#[inline]
pub fn zigzag_decode_big(n: u128) -> i128 {
    ((n >> 1) as i128) ^ -((n & 1) as i128)
}
