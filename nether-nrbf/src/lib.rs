//! Nether-NRBF: MS-NRBF (.NET Remoting Binary Format) decoder and encoder for Nethercore
//!
//! This crate reads a BinaryFormatter stream into a flat, ordered list of typed
//! records, lets the caller edit record fields in place, and writes the list back
//! out. Decoding and re-encoding an unmodified stream reproduces the input bytes
//! exactly, including the way null runs were compressed.
//!
//! # Key Features
//!
//! - **Pure Rust**: No external C/C++ dependencies
//! - **Bit-exact round trips**: Null-run segmentation and inline library records
//!   are remembered so an unchanged stream re-encodes identically
//! - **Reference checking**: Object ids, library ids and class layouts are
//!   tracked per call; dangling or duplicate ids are rejected
//! - **Edit in place**: Records are plain structs with public fields
//!
//! # NRBF Format Overview
//!
//! A stream contains:
//! - A `SerializedStreamHeader` record
//! - Class, string and array records, each introducing an object id
//! - Member values: raw primitives, or nested records (references, strings, nulls)
//! - A single `MessageEnd` record
//!
//! # Usage
//!
//! ```ignore
//! use nether_nrbf::{decode, encode, Record};
//!
//! let data = std::fs::read("save.dat").unwrap();
//! let mut records = decode(&data).unwrap();
//!
//! if let Some(Record::BinaryObjectString(s)) = records.find_object_mut(5) {
//!     s.value = "renamed".to_string();
//! }
//!
//! let bytes = encode(&records).unwrap();
//! ```
//!
//! # Format Reference
//!
//! - [MS-NRBF]: .NET Remoting: Binary Format Data Structure
//! - <https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-nrbf/>

mod codec;
mod config;
mod context;
mod error;
mod primitive;
mod record;
mod sequence;
mod types;

pub use codec::{decode_one, encode_one};
pub use config::{CodecConfig, ReferencePolicy};
pub use context::{ClassLayout, GraphContext, ObjectKind};
pub use error::{Location, NrbfError};
pub use primitive::{
    read_length_prefix, read_primitive, read_string, write_length_prefix, write_primitive,
    write_string,
};
pub use record::{
    ArraySingleObject, ArraySinglePrimitive, ArraySingleString, BinaryArray, BinaryLibrary,
    BinaryObjectString, ClassInfo, ClassWithId, ClassWithMembers, ClassWithMembersAndTypes,
    InlineLibrary, MemberPrimitiveTyped, MemberReference, MemberValue, MemberValues, NullForm,
    NullSegment, ObjectNullMultiple, ObjectNullMultiple256, Record, SerializedStreamHeader,
    SystemClassWithMembers, SystemClassWithMembersAndTypes,
};
pub use sequence::{
    RecordSequence, decode, decode_from_path, decode_from_path_with, decode_reader, decode_with,
    encode, encode_to_path, encode_to_path_with, encode_with,
};
pub use types::{
    BinaryArrayType, BinaryType, MemberType, PrimitiveType, PrimitiveValue, RecordType,
};

/// Convenience alias for results produced by this crate
pub type Result<T> = std::result::Result<T, NrbfError>;

// =============================================================================
// Constants
// =============================================================================

/// Maximum number of bytes in a 7-bit variable length prefix
pub const MAX_LENGTH_PREFIX_BYTES: usize = 5;

/// Largest value a length prefix may carry (non-negative 32-bit signed range)
pub const MAX_LENGTH_PREFIX_VALUE: u32 = i32::MAX as u32;

/// Largest count that fits an `ObjectNullMultiple256` record
pub const MAX_NULL_RUN_256: usize = u8::MAX as usize;

/// Default nesting limit for records nested inside member values
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Default limit on null slots expanded from null-run records in one pass
pub const DEFAULT_MAX_NULL_SLOTS: usize = 1 << 22;

/// Stream format major version written by BinaryFormatter
pub const MAJOR_VERSION: i32 = 1;

/// Stream format minor version written by BinaryFormatter
pub const MINOR_VERSION: i32 = 0;

// =============================================================================
// Tests
// =============================================================================
