//! Primitive Codec: fixed-width little-endian values, 7-bit length prefixes,
//! length-prefixed UTF-8 strings and primitive member values

mod read;
mod write;

pub(crate) use read::{offset, read_i32, read_u8};
pub use read::{read_length_prefix, read_primitive, read_string};
pub(crate) use write::{write_i32, write_u8};
pub use write::{write_length_prefix, write_primitive, write_string};
