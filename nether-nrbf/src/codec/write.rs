//! Record encoding

use tracing::trace;

use super::{SlotLayout, define_class};
use crate::context::{GraphContext, ObjectKind};
use crate::error::{Location, NrbfError};
use crate::primitive::{write_i32, write_primitive, write_string, write_u8};
use crate::record::{BinaryArray, ClassInfo, MemberValue, MemberValues, NullForm, NullSegment, Record};
use crate::types::{MemberType, RecordType};
use crate::{MAX_NULL_RUN_256, Result};

/// Encode one record, including its type marker
///
/// `index` is the position of the top-level record being written and is only
/// used to locate errors. Ids, libraries and layouts are checked against and
/// registered in `ctx` exactly as the decoder does.
pub fn encode_one(
    record: &Record,
    output: &mut Vec<u8>,
    ctx: &mut GraphContext,
    index: usize,
) -> Result<()> {
    trace!(record = record.record_type().name(), index, "encode record");
    encode_record(record, output, ctx, Location::Record(index))
}

fn encode_record(
    record: &Record,
    output: &mut Vec<u8>,
    ctx: &mut GraphContext,
    at: Location,
) -> Result<()> {
    write_u8(output, record.record_type() as u8);

    match record {
        Record::SerializedStreamHeader(header) => {
            write_i32(output, header.root_id);
            write_i32(output, header.header_id);
            write_i32(output, header.major_version);
            write_i32(output, header.minor_version);
        }

        Record::ClassWithId(r) => {
            let layout = ctx.class_layout(r.metadata_id, at)?;
            ctx.assign_object_id(
                r.object_id,
                ObjectKind::Class {
                    metadata_id: r.metadata_id,
                },
                at,
            )?;
            write_i32(output, r.object_id);
            write_i32(output, r.metadata_id);
            write_values(
                output,
                ctx,
                &r.values,
                SlotLayout::of_class(&layout),
                layout.member_count(),
                at,
            )?;
        }

        Record::SystemClassWithMembers(r) => {
            write_class_info(output, &r.class_info, at)?;
            define_class(ctx, &r.class_info, None, None, at)?;
            write_values(
                output,
                ctx,
                &r.values,
                SlotLayout::Untyped,
                r.class_info.member_names.len(),
                at,
            )?;
        }

        Record::ClassWithMembers(r) => {
            write_class_info(output, &r.class_info, at)?;
            write_i32(output, r.library_id);
            ctx.lookup_library(r.library_id, at)?;
            define_class(ctx, &r.class_info, None, Some(r.library_id), at)?;
            write_values(
                output,
                ctx,
                &r.values,
                SlotLayout::Untyped,
                r.class_info.member_names.len(),
                at,
            )?;
        }

        Record::SystemClassWithMembersAndTypes(r) => {
            write_class_info(output, &r.class_info, at)?;
            write_member_types(output, &r.class_info, &r.member_types, at)?;
            define_class(ctx, &r.class_info, Some(r.member_types.as_slice()), None, at)?;
            write_values(
                output,
                ctx,
                &r.values,
                SlotLayout::Members(&r.member_types),
                r.member_types.len(),
                at,
            )?;
        }

        Record::ClassWithMembersAndTypes(r) => {
            write_class_info(output, &r.class_info, at)?;
            write_member_types(output, &r.class_info, &r.member_types, at)?;
            write_i32(output, r.library_id);
            ctx.lookup_library(r.library_id, at)?;
            define_class(
                ctx,
                &r.class_info,
                Some(r.member_types.as_slice()),
                Some(r.library_id),
                at,
            )?;
            write_values(
                output,
                ctx,
                &r.values,
                SlotLayout::Members(&r.member_types),
                r.member_types.len(),
                at,
            )?;
        }

        Record::BinaryObjectString(r) => {
            ctx.assign_object_id(r.object_id, ObjectKind::String, at)?;
            write_i32(output, r.object_id);
            write_string(output, &r.value);
        }

        Record::BinaryArray(r) => write_binary_array(output, ctx, r, at)?,

        Record::MemberPrimitiveTyped(r) => {
            write_u8(output, r.value.primitive_type() as u8);
            write_primitive(output, &r.value);
        }

        Record::MemberReference(r) => {
            ctx.check_reference(r.id_ref, at)?;
            write_i32(output, r.id_ref);
        }

        Record::ObjectNull | Record::MessageEnd => {}

        Record::BinaryLibrary(r) => {
            ctx.register_library(r.library_id, &r.name, at)?;
            write_i32(output, r.library_id);
            write_string(output, &r.name);
        }

        Record::ObjectNullMultiple256(r) => write_u8(output, r.null_count),

        Record::ObjectNullMultiple(r) => write_i32(output, count_to_i32(i64::from(r.null_count), at)?),

        Record::ArraySinglePrimitive(r) => {
            if let Some(value) = r
                .values
                .iter()
                .find(|value| value.primitive_type() != r.primitive_type)
            {
                return Err(NrbfError::TypeMismatch {
                    expected: format!(
                        "{} element, found {}",
                        r.primitive_type.name(),
                        value.primitive_type().name()
                    ),
                    at,
                });
            }
            ctx.assign_object_id(r.object_id, ObjectKind::Array, at)?;
            write_i32(output, r.object_id);
            write_i32(output, count_to_i32(r.values.len() as i64, at)?);
            write_u8(output, r.primitive_type as u8);
            for value in &r.values {
                write_primitive(output, value);
            }
        }

        Record::ArraySingleObject(r) => {
            ctx.assign_object_id(r.object_id, ObjectKind::Array, at)?;
            write_i32(output, r.object_id);
            write_i32(output, count_to_i32(r.values.len() as i64, at)?);
            write_values(output, ctx, &r.values, SlotLayout::Untyped, r.values.len(), at)?;
        }

        Record::ArraySingleString(r) => {
            ctx.assign_object_id(r.object_id, ObjectKind::Array, at)?;
            write_i32(output, r.object_id);
            write_i32(output, count_to_i32(r.values.len() as i64, at)?);
            write_values(output, ctx, &r.values, SlotLayout::Untyped, r.values.len(), at)?;
        }
    }

    Ok(())
}

fn count_to_i32(count: i64, at: Location) -> Result<i32> {
    i32::try_from(count)
        .ok()
        .filter(|value| *value >= 0)
        .ok_or(NrbfError::InvalidLength { value: count, at })
}

fn write_class_info(output: &mut Vec<u8>, class_info: &ClassInfo, at: Location) -> Result<()> {
    write_i32(output, class_info.object_id);
    write_string(output, &class_info.name);
    write_i32(output, count_to_i32(class_info.member_names.len() as i64, at)?);
    for name in &class_info.member_names {
        write_string(output, name);
    }
    Ok(())
}

/// Write binary type tags for every member, then the additional infos
fn write_member_types(
    output: &mut Vec<u8>,
    class_info: &ClassInfo,
    member_types: &[MemberType],
    at: Location,
) -> Result<()> {
    if member_types.len() != class_info.member_names.len() {
        return Err(NrbfError::LayoutMismatch {
            expected: class_info.member_names.len(),
            found: member_types.len(),
            at,
        });
    }

    for member_type in member_types {
        write_u8(output, member_type.binary_type() as u8);
    }
    for member_type in member_types {
        write_additional_info(output, member_type);
    }
    Ok(())
}

fn write_additional_info(output: &mut Vec<u8>, member_type: &MemberType) {
    match member_type {
        MemberType::Primitive(kind) | MemberType::PrimitiveArray(kind) => {
            write_u8(output, *kind as u8)
        }
        MemberType::SystemClass(name) => write_string(output, name),
        MemberType::Class { name, library_id } => {
            write_string(output, name);
            write_i32(output, *library_id);
        }
        MemberType::String | MemberType::Object | MemberType::ObjectArray | MemberType::StringArray => {}
    }
}

fn write_binary_array(
    output: &mut Vec<u8>,
    ctx: &mut GraphContext,
    array: &BinaryArray,
    at: Location,
) -> Result<()> {
    let rank = array.rank();
    if rank == 0 {
        return Err(NrbfError::InvalidLength { value: 0, at });
    }

    let expected_bounds = if array.array_type.has_lower_bounds() {
        rank
    } else {
        0
    };
    let found_bounds = array.lower_bounds.as_ref().map_or(0, Vec::len);
    if expected_bounds != found_bounds {
        return Err(NrbfError::LayoutMismatch {
            expected: expected_bounds,
            found: found_bounds,
            at,
        });
    }

    let mut element_count: usize = 1;
    for &length in &array.lengths {
        let length = usize::try_from(length).map_err(|_| NrbfError::InvalidLength {
            value: i64::from(length),
            at,
        })?;
        element_count = element_count
            .checked_mul(length)
            .ok_or(NrbfError::InvalidLength {
                value: length as i64,
                at,
            })?;
    }

    ctx.assign_object_id(array.object_id, ObjectKind::Array, at)?;

    write_i32(output, array.object_id);
    write_u8(output, array.array_type as u8);
    write_i32(output, rank as i32);
    for &length in &array.lengths {
        write_i32(output, length);
    }
    for &bound in array.lower_bounds.iter().flatten() {
        write_i32(output, bound);
    }
    write_u8(output, array.element_type.binary_type() as u8);
    write_additional_info(output, &array.element_type);

    write_values(
        output,
        ctx,
        &array.values,
        SlotLayout::Elements(&array.element_type),
        element_count,
        at,
    )
}

/// Write member or element slots, re-applying null runs and inline libraries
fn write_values(
    output: &mut Vec<u8>,
    ctx: &mut GraphContext,
    values: &MemberValues,
    layout: SlotLayout<'_>,
    expected: usize,
    at: Location,
) -> Result<()> {
    if values.len() != expected {
        return Err(NrbfError::LayoutMismatch {
            expected,
            found: values.len(),
            at,
        });
    }

    let slots = values.as_slice();
    let mut index = 0;

    while index < slots.len() {
        for library in values.libraries_at(index) {
            ctx.register_library(library.library_id, &library.name, at)?;
            write_u8(output, RecordType::BinaryLibrary as u8);
            write_i32(output, library.library_id);
            write_string(output, &library.name);
        }

        match (layout.primitive_at(index), &slots[index]) {
            (Some(kind), MemberValue::Primitive(value)) if value.primitive_type() == kind => {
                write_primitive(output, value);
                index += 1;
            }
            (Some(kind), _) => {
                return Err(NrbfError::TypeMismatch {
                    expected: format!("{} value in slot {}", kind.name(), index),
                    at,
                });
            }
            (None, MemberValue::Primitive(_)) => {
                return Err(NrbfError::TypeMismatch {
                    expected: format!("record or null in slot {}", index),
                    at,
                });
            }
            (None, MemberValue::Record(record)) => {
                if matches!(
                    record.record_type(),
                    RecordType::SerializedStreamHeader
                        | RecordType::MessageEnd
                        | RecordType::BinaryLibrary
                        | RecordType::ObjectNull
                        | RecordType::ObjectNullMultiple256
                        | RecordType::ObjectNullMultiple
                ) {
                    return Err(NrbfError::UnexpectedRecord {
                        kind: record.record_type().name(),
                        at,
                    });
                }
                ctx.enter(at)?;
                encode_record(record, output, ctx, at)?;
                ctx.leave();
                index += 1;
            }
            (None, MemberValue::Null) => {
                let segment = null_segment_at(values, layout, index);
                write_null_segment(output, &segment, at)?;
                index += segment.count;
            }
        }
    }

    Ok(())
}

/// Choose how to encode the null slots starting at `index`
///
/// A segment recorded at decode time is reused while all of its slots are
/// still null. Otherwise the stretch of nulls up to the next recorded
/// boundary is written the way BinaryFormatter does: one null as
/// `ObjectNull`, up to 255 as `ObjectNullMultiple256`, more as
/// `ObjectNullMultiple`.
fn null_segment_at(values: &MemberValues, layout: SlotLayout<'_>, index: usize) -> NullSegment {
    if let Some(segment) = values.intact_segment_at(index) {
        return segment;
    }

    let slots = values.as_slice();
    let mut end = index + 1;
    while end < slots.len()
        && slots[end].is_null()
        && layout.primitive_at(end).is_none()
        && !values.is_boundary(end)
    {
        end += 1;
    }

    let count = end - index;
    let form = match count {
        1 => NullForm::ObjectNull,
        2..=MAX_NULL_RUN_256 => NullForm::ObjectNullMultiple256,
        _ => NullForm::ObjectNullMultiple,
    };

    NullSegment {
        start: index,
        count,
        form,
    }
}

fn write_null_segment(output: &mut Vec<u8>, segment: &NullSegment, at: Location) -> Result<()> {
    match segment.form {
        NullForm::ObjectNull => write_u8(output, RecordType::ObjectNull as u8),
        NullForm::ObjectNullMultiple256 => {
            let count = u8::try_from(segment.count).map_err(|_| NrbfError::InvalidLength {
                value: segment.count as i64,
                at,
            })?;
            write_u8(output, RecordType::ObjectNullMultiple256 as u8);
            write_u8(output, count);
        }
        NullForm::ObjectNullMultiple => {
            write_u8(output, RecordType::ObjectNullMultiple as u8);
            write_i32(output, count_to_i32(segment.count as i64, at)?);
        }
    }
    Ok(())
}
