//! Hand-assembled NRBF streams for integration tests
//!
//! Streams are built byte by byte so the tests do not depend on the encoder
//! they are checking.

#![allow(dead_code)]

pub const HEADER: u8 = 0x00;
pub const CLASS_WITH_ID: u8 = 0x01;
pub const CLASS_WITH_MEMBERS_AND_TYPES: u8 = 0x05;
pub const BINARY_OBJECT_STRING: u8 = 0x06;
pub const MEMBER_REFERENCE: u8 = 0x09;
pub const OBJECT_NULL: u8 = 0x0A;
pub const MESSAGE_END: u8 = 0x0B;
pub const BINARY_LIBRARY: u8 = 0x0C;
pub const OBJECT_NULL_MULTIPLE_256: u8 = 0x0D;
pub const ARRAY_SINGLE_STRING: u8 = 0x11;

/// Little-endian stream writer
#[derive(Default)]
pub struct StreamBuilder {
    bytes: Vec<u8>,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.bytes.push(value);
        self
    }

    pub fn i32(mut self, value: i32) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Length-prefixed UTF-8 string
    pub fn str(mut self, value: &str) -> Self {
        let mut length = value.len();
        loop {
            let low = (length & 0x7F) as u8;
            length >>= 7;
            if length == 0 {
                self.bytes.push(low);
                break;
            }
            self.bytes.push(low | 0x80);
        }
        self.bytes.extend_from_slice(value.as_bytes());
        self
    }

    pub fn header(self, root_id: i32) -> Self {
        self.u8(HEADER).i32(root_id).i32(-1).i32(1).i32(0)
    }

    pub fn library(self, id: i32, name: &str) -> Self {
        self.u8(BINARY_LIBRARY).i32(id).str(name)
    }

    pub fn string(self, id: i32, value: &str) -> Self {
        self.u8(BINARY_OBJECT_STRING).i32(id).str(value)
    }

    pub fn reference(self, id: i32) -> Self {
        self.u8(MEMBER_REFERENCE).i32(id)
    }

    pub fn end(self) -> Self {
        self.u8(MESSAGE_END)
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// Save-game style stream: two players sharing one class layout and one tag array
///
/// Object ids: 1 first player, 3 its name, 4 tag array, 5 tag string,
/// 6 second player, 7 its name.
pub fn save_game(first_name: &str) -> Vec<u8> {
    StreamBuilder::new()
        .header(1)
        .library(2, "Game, Version=1.0.0.0, Culture=neutral")
        .u8(CLASS_WITH_MEMBERS_AND_TYPES)
        .i32(1)
        .str("Game.Player")
        .i32(3)
        .str("name")
        .str("score")
        .str("tags")
        // String, Primitive, StringArray
        .u8(1)
        .u8(0)
        .u8(6)
        // Int32
        .u8(8)
        .i32(2)
        .string(3, first_name)
        .i32(42)
        .u8(ARRAY_SINGLE_STRING)
        .i32(4)
        .i32(3)
        .string(5, "sword")
        .u8(OBJECT_NULL_MULTIPLE_256)
        .u8(2)
        .u8(CLASS_WITH_ID)
        .i32(6)
        .i32(1)
        .string(7, "Bob")
        .i32(-3)
        .reference(4)
        .end()
        .build()
}
