//! Record Codec: per-record-kind layouts on top of the primitive codec

use crate::Result;
use crate::context::{ClassLayout, GraphContext, ObjectKind};
use crate::error::Location;
use crate::record::ClassInfo;
use crate::types::{MemberType, PrimitiveType};

mod read;
mod write;
#[cfg(test)]
mod tests;

pub use read::decode_one;
pub use write::encode_one;

/// How the slots of a value container are typed
#[derive(Debug, Clone, Copy)]
pub(crate) enum SlotLayout<'a> {
    /// Every slot holds a self-describing record
    Untyped,
    /// One descriptor per class member
    Members(&'a [MemberType]),
    /// One descriptor shared by every array element
    Elements(&'a MemberType),
}

impl<'a> SlotLayout<'a> {
    pub(crate) fn of_class(layout: &'a ClassLayout) -> Self {
        match &layout.member_types {
            Some(types) => Self::Members(types),
            None => Self::Untyped,
        }
    }

    /// Primitive type of slot `index` if it is written raw, without a record tag
    pub(crate) fn primitive_at(&self, index: usize) -> Option<PrimitiveType> {
        match self {
            Self::Untyped => None,
            Self::Members(types) => types.get(index).and_then(MemberType::inline_primitive),
            Self::Elements(element) => element.inline_primitive(),
        }
    }

    /// First raw primitive type among the `count` slots starting at `start`
    pub(crate) fn primitive_in(&self, start: usize, count: usize) -> Option<PrimitiveType> {
        match self {
            Self::Untyped => None,
            Self::Members(types) => types
                .iter()
                .skip(start)
                .take(count)
                .find_map(MemberType::inline_primitive),
            Self::Elements(element) if count > 0 => element.inline_primitive(),
            Self::Elements(_) => None,
        }
    }
}

/// Register a class-defining record's id and cache its layout
///
/// Both directions do this before the member values, so values may refer back
/// to the object being defined and nested `ClassWithId` records can reuse it.
pub(crate) fn define_class(
    ctx: &mut GraphContext,
    class_info: &ClassInfo,
    member_types: Option<&[MemberType]>,
    library_id: Option<i32>,
    at: Location,
) -> Result<()> {
    let object_id = class_info.object_id;
    ctx.assign_object_id(
        object_id,
        ObjectKind::Class {
            metadata_id: object_id,
        },
        at,
    )?;
    ctx.cache_class_layout(
        object_id,
        ClassLayout {
            name: class_info.name.clone(),
            member_names: class_info.member_names.clone(),
            member_types: member_types.map(<[MemberType]>::to_vec),
            library_id,
        },
    );
    Ok(())
}
