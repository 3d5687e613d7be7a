//! Append-only writers for NRBF primitive data

use crate::types::PrimitiveValue;

pub(crate) fn write_u8(output: &mut Vec<u8>, value: u8) {
    output.push(value);
}

pub(crate) fn write_i32(output: &mut Vec<u8>, value: i32) {
    output.extend_from_slice(&value.to_le_bytes());
}

/// Write a 7-bit variable length prefix (minimal form)
///
/// Lengths above `i32::MAX` cannot be read back.
pub fn write_length_prefix(output: &mut Vec<u8>, len: usize) {
    debug_assert!(len <= crate::MAX_LENGTH_PREFIX_VALUE as usize);
    let mut len = len;
    while len >= 0x80 {
        output.push((len as u8 & 0x7F) | 0x80);
        len >>= 7;
    }
    output.push(len as u8);
}

/// Write a length-prefixed UTF-8 string
pub fn write_string(output: &mut Vec<u8>, value: &str) {
    write_length_prefix(output, value.len());
    output.extend_from_slice(value.as_bytes());
}

/// Write a raw (untagged) primitive value
pub fn write_primitive(output: &mut Vec<u8>, value: &PrimitiveValue) {
    match value {
        PrimitiveValue::Boolean(v) => output.push(u8::from(*v)),
        PrimitiveValue::Byte(v) => output.push(*v),
        PrimitiveValue::Char(c) => {
            let mut buf = [0u8; 4];
            output.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
        PrimitiveValue::Decimal(s) => write_string(output, s),
        PrimitiveValue::Double(v) => output.extend_from_slice(&v.to_le_bytes()),
        PrimitiveValue::Int16(v) => output.extend_from_slice(&v.to_le_bytes()),
        PrimitiveValue::Int32(v) => output.extend_from_slice(&v.to_le_bytes()),
        PrimitiveValue::Int64(v) | PrimitiveValue::TimeSpan(v) => {
            output.extend_from_slice(&v.to_le_bytes())
        }
        PrimitiveValue::SByte(v) => output.extend_from_slice(&v.to_le_bytes()),
        PrimitiveValue::Single(v) => output.extend_from_slice(&v.to_le_bytes()),
        PrimitiveValue::DateTime(v) | PrimitiveValue::UInt64(v) => {
            output.extend_from_slice(&v.to_le_bytes())
        }
        PrimitiveValue::UInt16(v) => output.extend_from_slice(&v.to_le_bytes()),
        PrimitiveValue::UInt32(v) => output.extend_from_slice(&v.to_le_bytes()),
    }
}
