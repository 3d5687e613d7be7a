//! Tests for record decoding and encoding

use std::io::Cursor;

use super::{decode_one, encode_one};
use crate::config::CodecConfig;
use crate::context::{GraphContext, ObjectKind};
use crate::error::{Location, NrbfError};
use crate::record::{
    ArraySingleObject, BinaryObjectString, MemberValue, MemberValues, NullForm, Record,
    SerializedStreamHeader,
};
use crate::types::{BinaryArrayType, MemberType, PrimitiveType, PrimitiveValue, RecordType};
use crate::{DEFAULT_MAX_NULL_SLOTS, RecordSequence, decode, decode_with, encode};

/// Little-endian byte builder for hand-written records
#[derive(Default)]
struct Bytes(Vec<u8>);

impl Bytes {
    fn u8(mut self, value: u8) -> Self {
        self.0.push(value);
        self
    }

    fn i32(mut self, value: i32) -> Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn f64(mut self, value: f64) -> Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn str(mut self, value: &str) -> Self {
        assert!(value.len() < 0x80);
        self.0.push(value.len() as u8);
        self.0.extend_from_slice(value.as_bytes());
        self
    }

    fn header(self, root_id: i32) -> Self {
        self.u8(0x00).i32(root_id).i32(-1).i32(1).i32(0)
    }

    fn library(self, id: i32, name: &str) -> Self {
        self.u8(0x0C).i32(id).str(name)
    }

    fn string(self, id: i32, value: &str) -> Self {
        self.u8(0x06).i32(id).str(value)
    }

    fn end(self) -> Vec<u8> {
        self.u8(0x0B).0
    }
}

/// Decode a single record body from `data` against a fresh context
fn decode_single(data: &[u8], ctx: &mut GraphContext) -> crate::Result<Record> {
    let mut cursor = Cursor::new(data);
    let record = decode_one(&mut cursor, ctx)?;
    assert_eq!(cursor.position() as usize, data.len(), "record not fully consumed");
    Ok(record)
}

fn assert_roundtrip(data: &[u8]) {
    let records = decode(data).unwrap();
    assert_eq!(encode(&records).unwrap(), data);
}

/// Player class: `name` (String) and `score` (Int32), library 2
fn player_stream() -> Vec<u8> {
    Bytes::default()
        .header(1)
        .library(2, "Game, Version=1.0.0.0")
        .u8(0x05)
        .i32(1)
        .str("Game.Player")
        .i32(2)
        .str("name")
        .str("score")
        .u8(1)
        .u8(0)
        .u8(8)
        .i32(2)
        .string(3, "Ada")
        .i32(42)
        .end()
}

#[test]
fn test_decode_header() {
    let data = Bytes::default().header(1).0;
    let record = decode_single(&data, &mut GraphContext::default()).unwrap();
    match record {
        Record::SerializedStreamHeader(header) => {
            assert_eq!(header.root_id, 1);
            assert_eq!(header.header_id, -1);
            assert_eq!(header.major_version, 1);
            assert_eq!(header.minor_version, 0);
        }
        other => panic!("unexpected record {:?}", other),
    }
}

#[test]
fn test_class_with_members_and_types() {
    let data = player_stream();
    let records = decode(&data).unwrap();
    assert_eq!(records.len(), 4);

    let Some(Record::ClassWithMembersAndTypes(player)) = records.get(2) else {
        panic!("expected class record, got {:?}", records.get(2));
    };
    assert_eq!(player.class_info.object_id, 1);
    assert_eq!(player.class_info.name, "Game.Player");
    assert_eq!(player.class_info.member_names, ["name", "score"]);
    assert_eq!(
        player.member_types,
        [MemberType::String, MemberType::Primitive(PrimitiveType::Int32)]
    );
    assert_eq!(player.library_id, 2);
    assert_eq!(
        player.values.get(0).and_then(MemberValue::as_record),
        Some(&Record::BinaryObjectString(BinaryObjectString {
            object_id: 3,
            value: "Ada".to_string()
        }))
    );
    assert_eq!(
        player.values.get(1),
        Some(&MemberValue::Primitive(PrimitiveValue::Int32(42)))
    );

    assert_eq!(encode(&records).unwrap(), data);
}

#[test]
fn test_class_with_id_reuses_layout() {
    // The second Point only carries its own id and the first Point's id
    let data = Bytes::default()
        .header(1)
        .library(2, "Geo")
        .u8(0x05)
        .i32(1)
        .str("Geo.Point")
        .i32(2)
        .str("x")
        .str("y")
        .u8(0)
        .u8(0)
        .u8(8)
        .u8(6)
        .i32(2)
        .i32(-7)
        .f64(1.5)
        .u8(0x01)
        .i32(4)
        .i32(1)
        .i32(9)
        .f64(2.25)
        .end();

    let records = decode(&data).unwrap();
    let Some(Record::ClassWithId(second)) = records.get(3) else {
        panic!("expected ClassWithId, got {:?}", records.get(3));
    };
    assert_eq!(second.object_id, 4);
    assert_eq!(second.metadata_id, 1);
    assert_eq!(
        second.values.as_slice(),
        &[
            MemberValue::Primitive(PrimitiveValue::Int32(9)),
            MemberValue::Primitive(PrimitiveValue::Double(2.25)),
        ]
    );

    // Compact form is kept on encode
    assert_eq!(encode(&records).unwrap(), data);
}

#[test]
fn test_class_with_id_unknown_metadata() {
    let data = Bytes::default().u8(0x01).i32(4).i32(1).0;
    let err = decode_single(&data, &mut GraphContext::default()).unwrap_err();
    assert!(matches!(
        err,
        NrbfError::DanglingReference {
            id: 1,
            at: Location::Offset(0)
        }
    ));
}

#[test]
fn test_class_with_members_untyped() {
    // Members carry their own record tags
    let data = Bytes::default()
        .header(1)
        .library(2, "Game")
        .u8(0x03)
        .i32(1)
        .str("Game.Flags")
        .i32(2)
        .str("enabled")
        .str("label")
        .i32(2)
        .u8(0x08)
        .u8(1)
        .u8(1)
        .string(5, "on")
        .end();

    let records = decode(&data).unwrap();
    let Some(Record::ClassWithMembers(flags)) = records.get(2) else {
        panic!("expected ClassWithMembers");
    };
    assert_eq!(
        flags.values.get(0).and_then(MemberValue::as_record),
        Some(&Record::MemberPrimitiveTyped(crate::MemberPrimitiveTyped {
            value: PrimitiveValue::Boolean(true)
        }))
    );
    assert_roundtrip(&data);
}

#[test]
fn test_system_class_and_class_with_id_untyped() {
    let data = Bytes::default()
        .header(1)
        .u8(0x02)
        .i32(1)
        .str("System.Tuple")
        .i32(1)
        .str("Item1")
        .u8(0x0A)
        .u8(0x01)
        .i32(2)
        .i32(1)
        .string(3, "second")
        .end();

    let records = decode(&data).unwrap();
    let Some(Record::ClassWithId(tuple)) = records.get(2) else {
        panic!("expected ClassWithId");
    };
    assert_eq!(tuple.values.len(), 1);
    assert!(tuple.values.get(0).unwrap().as_record().is_some());
    assert_roundtrip(&data);
}

#[test]
fn test_system_class_with_members_and_types() {
    // Raw Int32 member followed by a string record member, no library id
    let data = Bytes::default()
        .header(1)
        .u8(0x04)
        .i32(1)
        .str("System.Collections.DictionaryEntry")
        .i32(2)
        .str("key")
        .str("value")
        .u8(0)
        .u8(1)
        .u8(PrimitiveType::Int32 as u8)
        .i32(7)
        .string(2, "seven")
        .end();

    let records = decode(&data).unwrap();
    let Some(Record::SystemClassWithMembersAndTypes(entry)) = records.get(1) else {
        panic!("expected SystemClassWithMembersAndTypes, got {:?}", records.get(1));
    };
    assert_eq!(entry.class_info.member_names, ["key", "value"]);
    assert_eq!(
        entry.member_types,
        [MemberType::Primitive(PrimitiveType::Int32), MemberType::String]
    );
    assert_eq!(
        entry.values.get(0),
        Some(&MemberValue::Primitive(PrimitiveValue::Int32(7)))
    );
    assert!(matches!(
        entry.values.get(1).and_then(MemberValue::as_record),
        Some(Record::BinaryObjectString(s)) if s.object_id == 2 && s.value == "seven"
    ));

    assert_eq!(encode(&records).unwrap(), data);
}

#[test]
fn test_member_reference_strict() {
    let data = Bytes::default().header(1).string(1, "a").u8(0x09).i32(1).end();
    assert_roundtrip(&data);

    let dangling = Bytes::default().header(1).u8(0x09).i32(8).end();
    assert!(matches!(
        decode(&dangling),
        Err(NrbfError::DanglingReference {
            id: 8,
            at: Location::Offset(17)
        })
    ));
}

#[test]
fn test_forward_reference_deferred() {
    let data = Bytes::default()
        .header(1)
        .u8(0x10)
        .i32(1)
        .i32(1)
        .u8(0x09)
        .i32(2)
        .string(2, "later")
        .end();

    assert!(matches!(
        decode(&data),
        Err(NrbfError::DanglingReference { id: 2, .. })
    ));

    let config = CodecConfig::deferred();
    let records = crate::decode_with(&data, &config).unwrap();
    assert_eq!(crate::encode_with(&records, &config).unwrap(), data);
}

#[test]
fn test_duplicate_object_id() {
    let data = Bytes::default().header(1).string(1, "a").string(1, "b").end();
    assert!(matches!(
        decode(&data),
        Err(NrbfError::DuplicateObjectId {
            id: 1,
            at: Location::Offset(24)
        })
    ));
}

#[test]
fn test_unknown_record_type() {
    let data = Bytes::default().u8(0x15).0;
    assert!(matches!(
        decode_single(&data, &mut GraphContext::default()),
        Err(NrbfError::UnknownRecordType { tag: 0x15, .. })
    ));
}

#[test]
fn test_unknown_library() {
    let data = Bytes::default()
        .u8(0x03)
        .i32(1)
        .str("Game.Empty")
        .i32(0)
        .i32(7)
        .0;
    assert!(matches!(
        decode_single(&data, &mut GraphContext::default()),
        Err(NrbfError::UnknownLibrary { id: 7, .. })
    ));
}

#[test]
fn test_null_run_expansion() {
    let data = Bytes::default()
        .header(1)
        .u8(0x10)
        .i32(1)
        .i32(6)
        .string(2, "first")
        .u8(0x0D)
        .u8(5)
        .end();

    let records = decode(&data).unwrap();
    let Some(Record::ArraySingleObject(array)) = records.get(1) else {
        panic!("expected ArraySingleObject");
    };
    assert_eq!(array.values.len(), 6);
    assert_eq!(array.values.iter().filter(|v| v.is_null()).count(), 5);
    assert_eq!(array.values.null_segments().len(), 1);
    assert_eq!(
        array.values.null_segments()[0].form,
        NullForm::ObjectNullMultiple256
    );

    // One run record, not five ObjectNull records
    assert_eq!(encode(&records).unwrap(), data);
}

#[test]
fn test_null_run_32bit_and_single_nulls_preserved() {
    // A 32-bit run of 5 followed by two separate ObjectNull records
    let data = Bytes::default()
        .header(1)
        .u8(0x11)
        .i32(1)
        .i32(7)
        .u8(0x0E)
        .i32(5)
        .u8(0x0A)
        .u8(0x0A)
        .end();
    assert_roundtrip(&data);
}

#[test]
fn test_null_run_overflow() {
    let data = Bytes::default()
        .header(1)
        .u8(0x10)
        .i32(1)
        .i32(2)
        .u8(0x0D)
        .u8(3)
        .end();
    assert!(matches!(
        decode(&data),
        Err(NrbfError::NullRunOverflow {
            count: 3,
            remaining: 2,
            ..
        })
    ));
}

#[test]
fn test_huge_null_run_rejected_before_expansion() {
    // Array and run both claim i32::MAX slots from a 32-byte stream
    let data = Bytes::default()
        .header(1)
        .u8(0x10)
        .i32(1)
        .i32(i32::MAX)
        .u8(0x0E)
        .i32(i32::MAX)
        .end();
    assert_eq!(data.len(), 32);

    assert!(matches!(
        decode(&data),
        Err(NrbfError::NullSlotLimit {
            limit: DEFAULT_MAX_NULL_SLOTS,
            at: Location::Offset(26)
        })
    ));
}

#[test]
fn test_null_slot_limit_spans_records() {
    // Two arrays of three nulls each, against a limit of four
    let data = Bytes::default()
        .header(1)
        .u8(0x10)
        .i32(1)
        .i32(3)
        .u8(0x0D)
        .u8(3)
        .u8(0x10)
        .i32(2)
        .i32(3)
        .u8(0x0D)
        .u8(3)
        .end();

    assert!(decode(&data).is_ok());
    let config = CodecConfig::default().with_max_null_slots(4);
    assert!(matches!(
        decode_with(&data, &config),
        Err(NrbfError::NullSlotLimit { limit: 4, .. })
    ));
}

#[test]
fn test_null_resegmentation_after_edit() {
    let data = Bytes::default()
        .header(1)
        .u8(0x10)
        .i32(1)
        .i32(4)
        .u8(0x0D)
        .u8(4)
        .end();
    let mut records = decode(&data).unwrap();

    // Break the run in the middle: 1 null, a string, 2 nulls
    if let Some(Record::ArraySingleObject(array)) = records.get_mut(1) {
        *array.values.get_mut(1).unwrap() = Record::BinaryObjectString(BinaryObjectString {
            object_id: 2,
            value: "x".to_string(),
        })
        .into();
    }

    let expected = Bytes::default()
        .header(1)
        .u8(0x10)
        .i32(1)
        .i32(4)
        .u8(0x0A)
        .string(2, "x")
        .u8(0x0D)
        .u8(2)
        .end();
    assert_eq!(encode(&records).unwrap(), expected);
}

#[test]
fn test_binary_array_rectangular() {
    let mut data = Bytes::default()
        .header(1)
        .u8(0x07)
        .i32(1)
        .u8(BinaryArrayType::Rectangular as u8)
        .i32(2)
        .i32(2)
        .i32(3)
        .u8(0)
        .u8(PrimitiveType::Int16 as u8)
        .0;
    for v in 0..6i16 {
        data.extend_from_slice(&v.to_le_bytes());
    }
    let data = Bytes(data).end();

    let records = decode(&data).unwrap();
    let Some(Record::BinaryArray(array)) = records.get(1) else {
        panic!("expected BinaryArray");
    };
    assert_eq!(array.rank(), 2);
    assert_eq!(array.lengths, [2, 3]);
    assert_eq!(array.lower_bounds, None);
    assert_eq!(array.values.len(), 6);
    assert_eq!(
        array.values.get(5),
        Some(&MemberValue::Primitive(PrimitiveValue::Int16(5)))
    );
    assert_eq!(encode(&records).unwrap(), data);
}

#[test]
fn test_binary_array_jagged_nested() {
    // int[][] with two rows: [1, 2] and null
    let data = Bytes::default()
        .header(1)
        .u8(0x07)
        .i32(1)
        .u8(BinaryArrayType::Jagged as u8)
        .i32(1)
        .i32(2)
        .u8(7)
        .u8(PrimitiveType::Int32 as u8)
        .u8(0x0F)
        .i32(2)
        .i32(2)
        .u8(PrimitiveType::Int32 as u8)
        .i32(1)
        .i32(2)
        .u8(0x0A)
        .end();

    let records = decode(&data).unwrap();
    let Some(Record::BinaryArray(array)) = records.get(1) else {
        panic!("expected BinaryArray");
    };
    assert_eq!(array.element_type, MemberType::PrimitiveArray(PrimitiveType::Int32));
    let row = array.values.get(0).and_then(MemberValue::as_record);
    let Some(Record::ArraySinglePrimitive(row)) = row else {
        panic!("expected nested primitive array");
    };
    assert_eq!(row.values, [PrimitiveValue::Int32(1), PrimitiveValue::Int32(2)]);
    assert!(array.values.get(1).unwrap().is_null());
    assert_eq!(
        records.find_object(2).map(Record::record_type),
        Some(RecordType::ArraySinglePrimitive)
    );

    assert_eq!(encode(&records).unwrap(), data);
}

#[test]
fn test_binary_array_offset_bounds() {
    let data = Bytes::default()
        .header(1)
        .u8(0x07)
        .i32(1)
        .u8(BinaryArrayType::SingleOffset as u8)
        .i32(1)
        .i32(2)
        .i32(10)
        .u8(1)
        .string(2, "a")
        .string(3, "b")
        .end();

    let records = decode(&data).unwrap();
    let Some(Record::BinaryArray(array)) = records.get(1) else {
        panic!("expected BinaryArray");
    };
    assert_eq!(array.lower_bounds, Some(vec![10]));
    assert_eq!(array.element_type, MemberType::String);
    assert_eq!(encode(&records).unwrap(), data);
}

#[test]
fn test_inline_library_before_nested_class() {
    // object[] whose only element is a class from a library declared inline
    let data = Bytes::default()
        .header(1)
        .u8(0x10)
        .i32(1)
        .i32(1)
        .library(2, "Game")
        .u8(0x05)
        .i32(3)
        .str("Game.Id")
        .i32(1)
        .str("value")
        .u8(0)
        .u8(PrimitiveType::Byte as u8)
        .i32(2)
        .u8(0x7F)
        .end();

    let records = decode(&data).unwrap();
    let Some(Record::ArraySingleObject(array)) = records.get(1) else {
        panic!("expected ArraySingleObject");
    };
    assert_eq!(array.values.len(), 1);
    assert_eq!(array.values.inline_libraries().len(), 1);
    assert_eq!(array.values.inline_libraries()[0].library.name, "Game");
    assert_eq!(encode(&records).unwrap(), data);
}

#[test]
fn test_array_single_primitive() {
    let data = Bytes::default()
        .header(1)
        .u8(0x0F)
        .i32(1)
        .i32(3)
        .u8(PrimitiveType::Byte as u8)
        .u8(1)
        .u8(2)
        .u8(3)
        .end();
    let records = decode(&data).unwrap();
    let Some(Record::ArraySinglePrimitive(array)) = records.get(1) else {
        panic!("expected ArraySinglePrimitive");
    };
    assert_eq!(array.primitive_type, PrimitiveType::Byte);
    assert_eq!(array.values.len(), 3);
    assert_eq!(encode(&records).unwrap(), data);
}

#[test]
fn test_negative_array_length() {
    let data = Bytes::default().u8(0x10).i32(1).i32(-1).0;
    assert!(matches!(
        decode_single(&data, &mut GraphContext::default()),
        Err(NrbfError::InvalidLength {
            value: -1,
            at: Location::Offset(5)
        })
    ));
}

#[test]
fn test_header_inside_values_rejected() {
    let data = Bytes::default().u8(0x10).i32(1).i32(1).header(1).0;
    assert!(matches!(
        decode_single(&data, &mut GraphContext::default()),
        Err(NrbfError::UnexpectedRecord {
            kind: "SerializedStreamHeader",
            ..
        })
    ));
}

#[test]
fn test_nesting_limit() {
    // object[] { object[] { object[] { null } } }
    let data = Bytes::default()
        .u8(0x10)
        .i32(1)
        .i32(1)
        .u8(0x10)
        .i32(2)
        .i32(1)
        .u8(0x10)
        .i32(3)
        .i32(1)
        .u8(0x0A)
        .0;

    let mut shallow = GraphContext::new(&CodecConfig::default().with_max_depth(1));
    assert!(matches!(
        decode_single(&data, &mut shallow),
        Err(NrbfError::NestingTooDeep { limit: 1, .. })
    ));

    let mut ctx = GraphContext::default();
    assert!(decode_single(&data, &mut ctx).is_ok());
    assert_eq!(ctx.object_count(), 3);
    assert_eq!(ctx.resolve_reference(3, Location::Offset(0)).unwrap(), &ObjectKind::Array);
}

#[test]
fn test_encode_one_registers_ids() {
    let mut ctx = GraphContext::default();
    let mut output = Vec::new();
    let record = Record::BinaryObjectString(BinaryObjectString {
        object_id: 4,
        value: "hi".to_string(),
    });

    encode_one(&record, &mut output, &mut ctx, 0).unwrap();
    assert_eq!(output, Bytes::default().string(4, "hi").0);

    assert!(matches!(
        encode_one(&record, &mut output, &mut ctx, 1),
        Err(NrbfError::DuplicateObjectId {
            id: 4,
            at: Location::Record(1)
        })
    ));
}

#[test]
fn test_encode_type_mismatch() {
    let mut records = decode(&player_stream()).unwrap();
    if let Some(Record::ClassWithMembersAndTypes(player)) = records.get_mut(2) {
        *player.values.get_mut(1).unwrap() = MemberValue::Null;
    }
    assert!(matches!(
        encode(&records),
        Err(NrbfError::TypeMismatch {
            at: Location::Record(2),
            ..
        })
    ));
}

#[test]
fn test_encode_layout_mismatch() {
    let mut ctx = GraphContext::default();
    let record = Record::ArraySingleObject(ArraySingleObject {
        object_id: 1,
        values: MemberValues::new(vec![MemberValue::Null; 3]),
    });
    let mut output = Vec::new();
    encode_one(&record, &mut output, &mut ctx, 0).unwrap();
    // Three fresh nulls become one 8-bit run
    assert_eq!(output, Bytes::default().u8(0x10).i32(1).i32(3).u8(0x0D).u8(3).0);

    let mut records = decode(&player_stream()).unwrap();
    if let Some(Record::ClassWithMembersAndTypes(player)) = records.get_mut(2) {
        player.member_types.pop();
    }
    assert!(matches!(
        encode(&records),
        Err(NrbfError::LayoutMismatch {
            expected: 2,
            found: 1,
            ..
        })
    ));
}

fn single_array_sequence(values: MemberValues) -> RecordSequence {
    RecordSequence::new(vec![
        Record::SerializedStreamHeader(SerializedStreamHeader {
            root_id: 1,
            header_id: -1,
            major_version: 1,
            minor_version: 0,
        }),
        Record::ArraySingleObject(ArraySingleObject {
            object_id: 1,
            values,
        }),
        Record::MessageEnd,
    ])
}

#[test]
fn test_segment_too_large_for_its_form_is_resegmented() {
    // 300 nulls recorded as one 8-bit run cannot be written as such
    let mut values = MemberValues::with_capacity(300);
    values.push_nulls(300, NullForm::ObjectNullMultiple256);
    let records = single_array_sequence(values);

    let encoded = encode(&records).unwrap();
    let expected = Bytes::default()
        .header(1)
        .u8(0x10)
        .i32(1)
        .i32(300)
        .u8(0x0E)
        .i32(300)
        .end();
    assert_eq!(encoded, expected);

    let reread = decode(&encoded).unwrap();
    let Some(Record::ArraySingleObject(array)) = reread.get(1) else {
        panic!("expected ArraySingleObject");
    };
    assert_eq!(array.values.len(), 300);
    assert!(array.values.iter().all(MemberValue::is_null));
}

#[test]
fn test_single_null_form_covering_many_slots_is_resegmented() {
    let mut values = MemberValues::with_capacity(3);
    values.push_nulls(3, NullForm::ObjectNull);
    let records = single_array_sequence(values);

    let encoded = encode(&records).unwrap();
    let expected = Bytes::default()
        .header(1)
        .u8(0x10)
        .i32(1)
        .i32(3)
        .u8(0x0D)
        .u8(3)
        .end();
    assert_eq!(encoded, expected);
    assert!(decode(&encoded).is_ok());
}
