//! Cursor-based readers for NRBF primitive data

use std::io::Cursor;

use crate::error::{Location, NrbfError};
use crate::types::{PrimitiveType, PrimitiveValue};
use crate::{MAX_LENGTH_PREFIX_BYTES, Result};

/// Current byte offset of the cursor
pub(crate) fn offset(cursor: &Cursor<&[u8]>) -> usize {
    cursor.position() as usize
}

/// Borrow the next `len` bytes and advance past them
fn take<'a>(cursor: &mut Cursor<&'a [u8]>, len: usize) -> Result<&'a [u8]> {
    let data: &'a [u8] = *cursor.get_ref();
    let start = offset(cursor);
    let remaining = data.len().saturating_sub(start);
    if remaining < len {
        return Err(NrbfError::TruncatedInput {
            at: Location::Offset(start),
            needed: len,
            remaining,
        });
    }
    cursor.set_position((start + len) as u64);
    Ok(&data[start..start + len])
}

fn read_array<const N: usize>(cursor: &mut Cursor<&[u8]>) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    buf.copy_from_slice(take(cursor, N)?);
    Ok(buf)
}

/// Read a single byte
pub(crate) fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8> {
    Ok(read_array::<1>(cursor)?[0])
}

fn read_i8(cursor: &mut Cursor<&[u8]>) -> Result<i8> {
    Ok(i8::from_le_bytes(read_array(cursor)?))
}

fn read_i16(cursor: &mut Cursor<&[u8]>) -> Result<i16> {
    Ok(i16::from_le_bytes(read_array(cursor)?))
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16> {
    Ok(u16::from_le_bytes(read_array(cursor)?))
}

/// Read a 32-bit little-endian signed integer (object ids, counts)
pub(crate) fn read_i32(cursor: &mut Cursor<&[u8]>) -> Result<i32> {
    Ok(i32::from_le_bytes(read_array(cursor)?))
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    Ok(u32::from_le_bytes(read_array(cursor)?))
}

fn read_i64(cursor: &mut Cursor<&[u8]>) -> Result<i64> {
    Ok(i64::from_le_bytes(read_array(cursor)?))
}

fn read_u64(cursor: &mut Cursor<&[u8]>) -> Result<u64> {
    Ok(u64::from_le_bytes(read_array(cursor)?))
}

fn read_f32(cursor: &mut Cursor<&[u8]>) -> Result<f32> {
    Ok(f32::from_le_bytes(read_array(cursor)?))
}

fn read_f64(cursor: &mut Cursor<&[u8]>) -> Result<f64> {
    Ok(f64::from_le_bytes(read_array(cursor)?))
}

/// Read a 7-bit variable length prefix
///
/// Each byte carries seven value bits, low group first, with the high bit set
/// while more bytes follow. At most five bytes are allowed and the value must
/// fit a non-negative `i32`, so the fifth byte is limited to `0x07`. Overlong
/// encodings (a final `0x00` group after the first byte) are rejected so that
/// every accepted prefix re-encodes to the same bytes.
pub fn read_length_prefix(cursor: &mut Cursor<&[u8]>) -> Result<usize> {
    let start = offset(cursor);
    let mut value: u32 = 0;

    for i in 0..MAX_LENGTH_PREFIX_BYTES {
        let byte = read_u8(cursor)?;

        if i == MAX_LENGTH_PREFIX_BYTES - 1 && byte > 0x07 {
            return Err(NrbfError::MalformedLength {
                at: Location::Offset(start),
            });
        }

        value |= u32::from(byte & 0x7F) << (7 * i);

        if byte & 0x80 == 0 {
            if i > 0 && byte == 0 {
                return Err(NrbfError::MalformedLength {
                    at: Location::Offset(start),
                });
            }
            return Ok(value as usize);
        }
    }

    Err(NrbfError::MalformedLength {
        at: Location::Offset(start),
    })
}

/// Read a length-prefixed UTF-8 string
pub fn read_string(cursor: &mut Cursor<&[u8]>) -> Result<String> {
    let len = read_length_prefix(cursor)?;
    let start = offset(cursor);
    let bytes = take(cursor, len)?;
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| NrbfError::InvalidEncoding {
            at: Location::Offset(start),
        })
}

/// Read one UTF-8 encoded character (1 to 4 bytes)
fn read_char(cursor: &mut Cursor<&[u8]>) -> Result<char> {
    let start = offset(cursor);
    let invalid = || NrbfError::InvalidPrimitive {
        kind: PrimitiveType::Char.name(),
        at: Location::Offset(start),
    };

    let lead = read_u8(cursor)?;
    let width = match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => return Err(invalid()),
    };

    let mut buf = [lead, 0, 0, 0];
    buf[1..width].copy_from_slice(take(cursor, width - 1)?);
    std::str::from_utf8(&buf[..width])
        .ok()
        .and_then(|s| s.chars().next())
        .ok_or_else(invalid)
}

/// Read a raw (untagged) primitive value of the given type
pub fn read_primitive(cursor: &mut Cursor<&[u8]>, kind: PrimitiveType) -> Result<PrimitiveValue> {
    Ok(match kind {
        PrimitiveType::Boolean => {
            let start = offset(cursor);
            match read_u8(cursor)? {
                0 => PrimitiveValue::Boolean(false),
                1 => PrimitiveValue::Boolean(true),
                _ => {
                    return Err(NrbfError::InvalidPrimitive {
                        kind: kind.name(),
                        at: Location::Offset(start),
                    });
                }
            }
        }
        PrimitiveType::Byte => PrimitiveValue::Byte(read_u8(cursor)?),
        PrimitiveType::Char => PrimitiveValue::Char(read_char(cursor)?),
        PrimitiveType::Decimal => PrimitiveValue::Decimal(read_string(cursor)?),
        PrimitiveType::Double => PrimitiveValue::Double(read_f64(cursor)?),
        PrimitiveType::Int16 => PrimitiveValue::Int16(read_i16(cursor)?),
        PrimitiveType::Int32 => PrimitiveValue::Int32(read_i32(cursor)?),
        PrimitiveType::Int64 => PrimitiveValue::Int64(read_i64(cursor)?),
        PrimitiveType::SByte => PrimitiveValue::SByte(read_i8(cursor)?),
        PrimitiveType::Single => PrimitiveValue::Single(read_f32(cursor)?),
        PrimitiveType::TimeSpan => PrimitiveValue::TimeSpan(read_i64(cursor)?),
        PrimitiveType::DateTime => PrimitiveValue::DateTime(read_u64(cursor)?),
        PrimitiveType::UInt16 => PrimitiveValue::UInt16(read_u16(cursor)?),
        PrimitiveType::UInt32 => PrimitiveValue::UInt32(read_u32(cursor)?),
        PrimitiveType::UInt64 => PrimitiveValue::UInt64(read_u64(cursor)?),
    })
}
