//! Error types for NRBF decoding and encoding

use std::fmt;
use std::io;

/// Where in a stream an error was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Byte offset into the input (decode direction)
    Offset(usize),
    /// Index of the top-level record being written (encode direction)
    Record(usize),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offset(offset) => write!(f, "offset {}", offset),
            Self::Record(index) => write!(f, "record {}", index),
        }
    }
}

/// Errors that can occur when decoding or encoding an NRBF stream
///
/// Every structural error is fatal to the call that produced it.
#[derive(Debug, thiserror::Error)]
pub enum NrbfError {
    /// Fewer bytes remain than the field being read requires
    #[error("truncated input at {at}: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        at: Location,
        needed: usize,
        remaining: usize,
    },

    /// Variable length prefix is too long, overlong, or out of range
    #[error("malformed length prefix at {at}")]
    MalformedLength { at: Location },

    /// String bytes are not valid UTF-8
    #[error("invalid UTF-8 string data at {at}")]
    InvalidEncoding { at: Location },

    /// Record type marker is not one of the supported record kinds
    #[error("unknown record type 0x{tag:02X} at {at}")]
    UnknownRecordType { tag: u8, at: Location },

    /// Binary type marker in a member type descriptor is unknown
    #[error("unknown binary type {tag} at {at}")]
    UnknownBinaryType { tag: u8, at: Location },

    /// Primitive type marker is unknown or not valid as a value
    #[error("unknown primitive type {tag} at {at}")]
    UnknownPrimitiveType { tag: u8, at: Location },

    /// Binary array kind is unknown
    #[error("unknown binary array type {tag} at {at}")]
    UnknownArrayType { tag: u8, at: Location },

    /// Primitive value bytes are not a valid value of their type
    #[error("invalid {kind} value at {at}")]
    InvalidPrimitive { kind: &'static str, at: Location },

    /// Negative or overflowing count or array length
    #[error("invalid length {value} at {at}")]
    InvalidLength { value: i64, at: Location },

    /// Object id was already defined earlier in the stream
    #[error("duplicate object id {id} at {at}")]
    DuplicateObjectId { id: i32, at: Location },

    /// Reference names an object or class that was never defined
    #[error("dangling reference to object id {id} at {at}")]
    DanglingReference { id: i32, at: Location },

    /// Library id was already defined earlier in the stream
    #[error("duplicate library id {id} at {at}")]
    DuplicateLibraryId { id: i32, at: Location },

    /// Class record names a library that was never defined
    #[error("unknown library id {id} at {at}")]
    UnknownLibrary { id: i32, at: Location },

    /// Input ended before a MessageEnd record
    #[error("stream ended at offset {offset} without a MessageEnd record")]
    UnterminatedStream { offset: usize },

    /// Bytes remain after the MessageEnd record
    #[error("{remaining} trailing bytes after MessageEnd at offset {offset}")]
    TrailingBytes { offset: usize, remaining: usize },

    /// Record sequence does not end with MessageEnd
    #[error("record sequence does not end with MessageEnd")]
    MissingTerminator,

    /// Record sequence contains MessageEnd before its last position
    #[error("MessageEnd at record {index} is not the final record")]
    MultipleTerminators { index: usize },

    /// Stream does not start with a SerializedStreamHeader record
    #[error("stream does not start with a SerializedStreamHeader ({at})")]
    MissingHeader { at: Location },

    /// Record kind is not allowed where it appeared
    #[error("unexpected {kind} record at {at}")]
    UnexpectedRecord { kind: &'static str, at: Location },

    /// Null run covers more slots than remain in its container
    #[error("null run of {count} exceeds the {remaining} remaining slots at {at}")]
    NullRunOverflow {
        count: usize,
        remaining: usize,
        at: Location,
    },

    /// Member value does not match its declared type
    #[error("type mismatch at {at}: expected {expected}")]
    TypeMismatch { expected: String, at: Location },

    /// Value or descriptor count disagrees with the class or array layout
    #[error("layout mismatch at {at}: expected {expected} entries, found {found}")]
    LayoutMismatch {
        expected: usize,
        found: usize,
        at: Location,
    },

    /// Null runs expand to more slots than the configured limit
    #[error("null runs expand past the limit of {limit} slots at {at}")]
    NullSlotLimit { limit: usize, at: Location },

    /// Records are nested deeper than the configured limit
    #[error("records nested deeper than {limit} at {at}")]
    NestingTooDeep { limit: usize, at: Location },

    /// IO error reading or writing a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl NrbfError {
    /// Location attached to this error, if any
    pub fn location(&self) -> Option<Location> {
        match self {
            Self::TruncatedInput { at, .. }
            | Self::MalformedLength { at }
            | Self::InvalidEncoding { at }
            | Self::UnknownRecordType { at, .. }
            | Self::UnknownBinaryType { at, .. }
            | Self::UnknownPrimitiveType { at, .. }
            | Self::UnknownArrayType { at, .. }
            | Self::InvalidPrimitive { at, .. }
            | Self::InvalidLength { at, .. }
            | Self::DuplicateObjectId { at, .. }
            | Self::DanglingReference { at, .. }
            | Self::DuplicateLibraryId { at, .. }
            | Self::UnknownLibrary { at, .. }
            | Self::MissingHeader { at }
            | Self::UnexpectedRecord { at, .. }
            | Self::NullRunOverflow { at, .. }
            | Self::NullSlotLimit { at, .. }
            | Self::TypeMismatch { at, .. }
            | Self::LayoutMismatch { at, .. }
            | Self::NestingTooDeep { at, .. } => Some(*at),
            Self::UnterminatedStream { offset } | Self::TrailingBytes { offset, .. } => {
                Some(Location::Offset(*offset))
            }
            Self::MultipleTerminators { index } => Some(Location::Record(*index)),
            Self::MissingTerminator | Self::Io(_) => None,
        }
    }
}
