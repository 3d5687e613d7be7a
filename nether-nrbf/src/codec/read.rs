//! Record decoding

use std::io::Cursor;

use tracing::trace;

use super::{SlotLayout, define_class};
use crate::context::{GraphContext, ObjectKind};
use crate::error::{Location, NrbfError};
use crate::primitive::{offset, read_i32, read_primitive, read_string, read_u8};
use crate::record::{
    ArraySingleObject, ArraySinglePrimitive, ArraySingleString, BinaryArray, BinaryLibrary,
    BinaryObjectString, ClassInfo, ClassWithId, ClassWithMembers, ClassWithMembersAndTypes,
    MemberPrimitiveTyped, MemberReference, MemberValue, MemberValues, NullForm,
    ObjectNullMultiple, ObjectNullMultiple256, Record, SerializedStreamHeader,
    SystemClassWithMembers, SystemClassWithMembersAndTypes,
};
use crate::types::{BinaryArrayType, BinaryType, MemberType, PrimitiveType, RecordType};
use crate::Result;

/// Decode one record, starting at its type marker
///
/// Object ids, libraries and class layouts introduced by the record (and by
/// any records nested in its values) are registered in `ctx`.
pub fn decode_one(cursor: &mut Cursor<&[u8]>, ctx: &mut GraphContext) -> Result<Record> {
    let start = offset(cursor);
    let kind = read_record_type(cursor)?;
    trace!(record = kind.name(), offset = start, "decode record");
    decode_body(cursor, ctx, kind, start)
}

fn read_record_type(cursor: &mut Cursor<&[u8]>) -> Result<RecordType> {
    let start = offset(cursor);
    let tag = read_u8(cursor)?;
    RecordType::from_u8(tag).ok_or(NrbfError::UnknownRecordType {
        tag,
        at: Location::Offset(start),
    })
}

/// Decode the fields following a record type marker at `start`
fn decode_body(
    cursor: &mut Cursor<&[u8]>,
    ctx: &mut GraphContext,
    kind: RecordType,
    start: usize,
) -> Result<Record> {
    let at = Location::Offset(start);

    Ok(match kind {
        RecordType::SerializedStreamHeader => {
            Record::SerializedStreamHeader(SerializedStreamHeader {
                root_id: read_i32(cursor)?,
                header_id: read_i32(cursor)?,
                major_version: read_i32(cursor)?,
                minor_version: read_i32(cursor)?,
            })
        }

        RecordType::ClassWithId => {
            let object_id = read_i32(cursor)?;
            let metadata_id = read_i32(cursor)?;
            let layout = ctx.class_layout(metadata_id, at)?;
            ctx.assign_object_id(object_id, ObjectKind::Class { metadata_id }, at)?;
            let values = read_values(
                cursor,
                ctx,
                SlotLayout::of_class(&layout),
                layout.member_count(),
            )?;
            Record::ClassWithId(ClassWithId {
                object_id,
                metadata_id,
                values,
            })
        }

        RecordType::SystemClassWithMembers => {
            let class_info = read_class_info(cursor)?;
            define_class(ctx, &class_info, None, None, at)?;
            let values = read_values(
                cursor,
                ctx,
                SlotLayout::Untyped,
                class_info.member_names.len(),
            )?;
            Record::SystemClassWithMembers(SystemClassWithMembers { class_info, values })
        }

        RecordType::ClassWithMembers => {
            let class_info = read_class_info(cursor)?;
            let library_id = read_i32(cursor)?;
            ctx.lookup_library(library_id, at)?;
            define_class(ctx, &class_info, None, Some(library_id), at)?;
            let values = read_values(
                cursor,
                ctx,
                SlotLayout::Untyped,
                class_info.member_names.len(),
            )?;
            Record::ClassWithMembers(ClassWithMembers {
                class_info,
                library_id,
                values,
            })
        }

        RecordType::SystemClassWithMembersAndTypes => {
            let class_info = read_class_info(cursor)?;
            let member_types = read_member_types(cursor, class_info.member_names.len())?;
            define_class(ctx, &class_info, Some(member_types.as_slice()), None, at)?;
            let values = read_values(
                cursor,
                ctx,
                SlotLayout::Members(&member_types),
                member_types.len(),
            )?;
            Record::SystemClassWithMembersAndTypes(SystemClassWithMembersAndTypes {
                class_info,
                member_types,
                values,
            })
        }

        RecordType::ClassWithMembersAndTypes => {
            let class_info = read_class_info(cursor)?;
            let member_types = read_member_types(cursor, class_info.member_names.len())?;
            let library_id = read_i32(cursor)?;
            ctx.lookup_library(library_id, at)?;
            define_class(ctx, &class_info, Some(member_types.as_slice()), Some(library_id), at)?;
            let values = read_values(
                cursor,
                ctx,
                SlotLayout::Members(&member_types),
                member_types.len(),
            )?;
            Record::ClassWithMembersAndTypes(ClassWithMembersAndTypes {
                class_info,
                member_types,
                library_id,
                values,
            })
        }

        RecordType::BinaryObjectString => {
            let object_id = read_i32(cursor)?;
            let value = read_string(cursor)?;
            ctx.assign_object_id(object_id, ObjectKind::String, at)?;
            Record::BinaryObjectString(BinaryObjectString { object_id, value })
        }

        RecordType::BinaryArray => Record::BinaryArray(read_binary_array(cursor, ctx, at)?),

        RecordType::MemberPrimitiveTyped => {
            let primitive_type = read_primitive_type(cursor)?;
            Record::MemberPrimitiveTyped(MemberPrimitiveTyped {
                value: read_primitive(cursor, primitive_type)?,
            })
        }

        RecordType::MemberReference => {
            let id_ref = read_i32(cursor)?;
            ctx.check_reference(id_ref, at)?;
            Record::MemberReference(MemberReference { id_ref })
        }

        RecordType::ObjectNull => Record::ObjectNull,

        RecordType::MessageEnd => Record::MessageEnd,

        RecordType::BinaryLibrary => {
            let library_id = read_i32(cursor)?;
            let name = read_string(cursor)?;
            ctx.register_library(library_id, &name, at)?;
            Record::BinaryLibrary(BinaryLibrary { library_id, name })
        }

        RecordType::ObjectNullMultiple256 => {
            Record::ObjectNullMultiple256(ObjectNullMultiple256 {
                null_count: read_u8(cursor)?,
            })
        }

        RecordType::ObjectNullMultiple => {
            let null_count = read_count(cursor)?;
            Record::ObjectNullMultiple(ObjectNullMultiple {
                null_count: null_count as i32,
            })
        }

        RecordType::ArraySinglePrimitive => {
            let object_id = read_i32(cursor)?;
            let length = read_count(cursor)?;
            let primitive_type = read_primitive_type(cursor)?;
            ctx.assign_object_id(object_id, ObjectKind::Array, at)?;

            let mut values = Vec::with_capacity(capacity_hint(cursor, length));
            for _ in 0..length {
                values.push(read_primitive(cursor, primitive_type)?);
            }
            Record::ArraySinglePrimitive(ArraySinglePrimitive {
                object_id,
                primitive_type,
                values,
            })
        }

        RecordType::ArraySingleObject => {
            let object_id = read_i32(cursor)?;
            let length = read_count(cursor)?;
            ctx.assign_object_id(object_id, ObjectKind::Array, at)?;
            let values = read_values(cursor, ctx, SlotLayout::Untyped, length)?;
            Record::ArraySingleObject(ArraySingleObject { object_id, values })
        }

        RecordType::ArraySingleString => {
            let object_id = read_i32(cursor)?;
            let length = read_count(cursor)?;
            ctx.assign_object_id(object_id, ObjectKind::Array, at)?;
            let values = read_values(cursor, ctx, SlotLayout::Untyped, length)?;
            Record::ArraySingleString(ArraySingleString { object_id, values })
        }
    })
}

/// Read a non-negative 32-bit count
fn read_count(cursor: &mut Cursor<&[u8]>) -> Result<usize> {
    let start = offset(cursor);
    let value = read_i32(cursor)?;
    usize::try_from(value).map_err(|_| NrbfError::InvalidLength {
        value: i64::from(value),
        at: Location::Offset(start),
    })
}

/// Bound preallocation by the bytes actually left in the input
fn capacity_hint(cursor: &Cursor<&[u8]>, count: usize) -> usize {
    count.min(cursor.get_ref().len().saturating_sub(offset(cursor)))
}

fn read_class_info(cursor: &mut Cursor<&[u8]>) -> Result<ClassInfo> {
    let object_id = read_i32(cursor)?;
    let name = read_string(cursor)?;
    let member_count = read_count(cursor)?;

    let mut member_names = Vec::with_capacity(capacity_hint(cursor, member_count));
    for _ in 0..member_count {
        member_names.push(read_string(cursor)?);
    }

    Ok(ClassInfo {
        object_id,
        name,
        member_names,
    })
}

fn read_primitive_type(cursor: &mut Cursor<&[u8]>) -> Result<PrimitiveType> {
    let start = offset(cursor);
    let tag = read_u8(cursor)?;
    PrimitiveType::from_u8(tag).ok_or(NrbfError::UnknownPrimitiveType {
        tag,
        at: Location::Offset(start),
    })
}

fn read_binary_type(cursor: &mut Cursor<&[u8]>) -> Result<BinaryType> {
    let start = offset(cursor);
    let tag = read_u8(cursor)?;
    BinaryType::from_u8(tag).ok_or(NrbfError::UnknownBinaryType {
        tag,
        at: Location::Offset(start),
    })
}

/// Read the additional info that completes a binary type
fn read_additional_info(cursor: &mut Cursor<&[u8]>, binary_type: BinaryType) -> Result<MemberType> {
    Ok(match binary_type {
        BinaryType::Primitive => MemberType::Primitive(read_primitive_type(cursor)?),
        BinaryType::String => MemberType::String,
        BinaryType::Object => MemberType::Object,
        BinaryType::SystemClass => MemberType::SystemClass(read_string(cursor)?),
        BinaryType::Class => MemberType::Class {
            name: read_string(cursor)?,
            library_id: read_i32(cursor)?,
        },
        BinaryType::ObjectArray => MemberType::ObjectArray,
        BinaryType::StringArray => MemberType::StringArray,
        BinaryType::PrimitiveArray => MemberType::PrimitiveArray(read_primitive_type(cursor)?),
    })
}

/// Read a member type table: all binary type tags first, then their additional infos
fn read_member_types(cursor: &mut Cursor<&[u8]>, count: usize) -> Result<Vec<MemberType>> {
    let mut binary_types = Vec::with_capacity(capacity_hint(cursor, count));
    for _ in 0..count {
        binary_types.push(read_binary_type(cursor)?);
    }

    binary_types
        .into_iter()
        .map(|binary_type| read_additional_info(cursor, binary_type))
        .collect()
}

fn read_binary_array(
    cursor: &mut Cursor<&[u8]>,
    ctx: &mut GraphContext,
    at: Location,
) -> Result<BinaryArray> {
    let object_id = read_i32(cursor)?;

    let type_offset = offset(cursor);
    let tag = read_u8(cursor)?;
    let array_type = BinaryArrayType::from_u8(tag).ok_or(NrbfError::UnknownArrayType {
        tag,
        at: Location::Offset(type_offset),
    })?;

    let rank_offset = offset(cursor);
    let rank = read_count(cursor)?;
    if rank == 0 {
        return Err(NrbfError::InvalidLength {
            value: 0,
            at: Location::Offset(rank_offset),
        });
    }

    let mut lengths = Vec::with_capacity(capacity_hint(cursor, rank));
    let mut element_count: usize = 1;
    for _ in 0..rank {
        let length_offset = offset(cursor);
        let length = read_count(cursor)?;
        element_count = element_count
            .checked_mul(length)
            .ok_or(NrbfError::InvalidLength {
                value: length as i64,
                at: Location::Offset(length_offset),
            })?;
        lengths.push(length as i32);
    }

    let lower_bounds = if array_type.has_lower_bounds() {
        let mut bounds = Vec::with_capacity(lengths.len());
        for _ in 0..rank {
            bounds.push(read_i32(cursor)?);
        }
        Some(bounds)
    } else {
        None
    };

    let binary_type = read_binary_type(cursor)?;
    let element_type = read_additional_info(cursor, binary_type)?;

    ctx.assign_object_id(object_id, ObjectKind::Array, at)?;
    let values = read_values(cursor, ctx, SlotLayout::Elements(&element_type), element_count)?;

    Ok(BinaryArray {
        object_id,
        array_type,
        lengths,
        lower_bounds,
        element_type,
        values,
    })
}

/// Read `count` member or element slots
fn read_values(
    cursor: &mut Cursor<&[u8]>,
    ctx: &mut GraphContext,
    layout: SlotLayout<'_>,
    count: usize,
) -> Result<MemberValues> {
    let mut values = MemberValues::with_capacity(capacity_hint(cursor, count));

    while values.len() < count {
        match layout.primitive_at(values.len()) {
            Some(primitive_type) => {
                let value = read_primitive(cursor, primitive_type)?;
                values.push(MemberValue::Primitive(value));
            }
            None => read_value_record(cursor, ctx, layout, count, &mut values)?,
        }
    }

    Ok(values)
}

/// Read the record filling the next record-valued slot
///
/// Library records in front of the value are kept as inline libraries; null
/// records fill one or more slots.
fn read_value_record(
    cursor: &mut Cursor<&[u8]>,
    ctx: &mut GraphContext,
    layout: SlotLayout<'_>,
    count: usize,
    values: &mut MemberValues,
) -> Result<()> {
    loop {
        let start = offset(cursor);
        let at = Location::Offset(start);
        let kind = read_record_type(cursor)?;

        if matches!(
            kind,
            RecordType::SerializedStreamHeader | RecordType::MessageEnd
        ) {
            return Err(NrbfError::UnexpectedRecord {
                kind: kind.name(),
                at,
            });
        }

        trace!(record = kind.name(), offset = start, slot = values.len(), "decode value");
        ctx.enter(at)?;
        let record = decode_body(cursor, ctx, kind, start)?;
        ctx.leave();

        let (null_count, form) = match record {
            Record::BinaryLibrary(library) => {
                values.push_library(library);
                continue;
            }
            Record::ObjectNull => (1, NullForm::ObjectNull),
            Record::ObjectNullMultiple256(run) => {
                (run.null_count as usize, NullForm::ObjectNullMultiple256)
            }
            Record::ObjectNullMultiple(run) => {
                (run.null_count as usize, NullForm::ObjectNullMultiple)
            }
            record => {
                values.push(record.into());
                return Ok(());
            }
        };

        let slot = values.len();
        let remaining = count - slot;
        if null_count == 0 {
            return Err(NrbfError::InvalidLength { value: 0, at });
        }
        if null_count > remaining {
            return Err(NrbfError::NullRunOverflow {
                count: null_count,
                remaining,
                at,
            });
        }
        if let Some(primitive_type) = layout.primitive_in(slot, null_count) {
            return Err(NrbfError::TypeMismatch {
                expected: format!("{} value", primitive_type.name()),
                at,
            });
        }

        ctx.expand_nulls(null_count, at)?;
        values.push_nulls(null_count, form);
        return Ok(());
    }
}
