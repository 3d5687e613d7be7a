//! NRBF record model
//!
//! A decoded stream is a flat list of [`Record`]s. Edges between objects are
//! object ids, not nesting; the only nesting is a record written inline as the
//! value of a class member or array element, which the wire format requires.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::MAX_NULL_RUN_256;
use crate::types::{BinaryArrayType, MemberType, PrimitiveType, PrimitiveValue, RecordType};

/// Stream header, always the first record
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SerializedStreamHeader {
    pub root_id: i32,
    pub header_id: i32,
    pub major_version: i32,
    pub minor_version: i32,
}

/// Object id, class name and member names shared by every class record
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassInfo {
    pub object_id: i32,
    pub name: String,
    pub member_names: Vec<String>,
}

/// Class instance with full member layout, belonging to a user library
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassWithMembersAndTypes {
    pub class_info: ClassInfo,
    pub member_types: Vec<MemberType>,
    pub library_id: i32,
    pub values: MemberValues,
}

/// Class instance with full member layout, belonging to the runtime library
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SystemClassWithMembersAndTypes {
    pub class_info: ClassInfo,
    pub member_types: Vec<MemberType>,
    pub values: MemberValues,
}

/// Class instance without member types; every member is a self-describing record
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassWithMembers {
    pub class_info: ClassInfo,
    pub library_id: i32,
    pub values: MemberValues,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SystemClassWithMembers {
    pub class_info: ClassInfo,
    pub values: MemberValues,
}

/// Class instance reusing the layout of an earlier class record
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassWithId {
    pub object_id: i32,
    /// Object id of the record whose layout is reused
    pub metadata_id: i32,
    pub values: MemberValues,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BinaryObjectString {
    pub object_id: i32,
    pub value: String,
}

/// General array: any rank, optional lower bounds, any element type
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BinaryArray {
    pub object_id: i32,
    pub array_type: BinaryArrayType,
    /// One length per dimension; the rank is `lengths.len()`
    pub lengths: Vec<i32>,
    /// Present only for the `*Offset` array types, one per dimension
    pub lower_bounds: Option<Vec<i32>>,
    pub element_type: MemberType,
    /// Elements in row-major order
    pub values: MemberValues,
}

impl BinaryArray {
    pub fn rank(&self) -> usize {
        self.lengths.len()
    }
}

/// Primitive value written as a standalone record (untyped member slots)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemberPrimitiveTyped {
    pub value: PrimitiveValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemberReference {
    pub id_ref: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BinaryLibrary {
    pub library_id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectNullMultiple256 {
    pub null_count: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectNullMultiple {
    pub null_count: i32,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArraySinglePrimitive {
    pub object_id: i32,
    pub primitive_type: PrimitiveType,
    pub values: Vec<PrimitiveValue>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArraySingleObject {
    pub object_id: i32,
    pub values: MemberValues,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArraySingleString {
    pub object_id: i32,
    pub values: MemberValues,
}

/// One NRBF record
///
/// Fields may be edited in place. Object ids, record order and record kinds
/// must not be changed; the encoder re-checks id integrity but cannot repair it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Record {
    SerializedStreamHeader(SerializedStreamHeader),
    ClassWithId(ClassWithId),
    SystemClassWithMembers(SystemClassWithMembers),
    ClassWithMembers(ClassWithMembers),
    SystemClassWithMembersAndTypes(SystemClassWithMembersAndTypes),
    ClassWithMembersAndTypes(ClassWithMembersAndTypes),
    BinaryObjectString(BinaryObjectString),
    BinaryArray(BinaryArray),
    MemberPrimitiveTyped(MemberPrimitiveTyped),
    MemberReference(MemberReference),
    ObjectNull,
    MessageEnd,
    BinaryLibrary(BinaryLibrary),
    ObjectNullMultiple256(ObjectNullMultiple256),
    ObjectNullMultiple(ObjectNullMultiple),
    ArraySinglePrimitive(ArraySinglePrimitive),
    ArraySingleObject(ArraySingleObject),
    ArraySingleString(ArraySingleString),
}

impl Record {
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::SerializedStreamHeader(_) => RecordType::SerializedStreamHeader,
            Self::ClassWithId(_) => RecordType::ClassWithId,
            Self::SystemClassWithMembers(_) => RecordType::SystemClassWithMembers,
            Self::ClassWithMembers(_) => RecordType::ClassWithMembers,
            Self::SystemClassWithMembersAndTypes(_) => RecordType::SystemClassWithMembersAndTypes,
            Self::ClassWithMembersAndTypes(_) => RecordType::ClassWithMembersAndTypes,
            Self::BinaryObjectString(_) => RecordType::BinaryObjectString,
            Self::BinaryArray(_) => RecordType::BinaryArray,
            Self::MemberPrimitiveTyped(_) => RecordType::MemberPrimitiveTyped,
            Self::MemberReference(_) => RecordType::MemberReference,
            Self::ObjectNull => RecordType::ObjectNull,
            Self::MessageEnd => RecordType::MessageEnd,
            Self::BinaryLibrary(_) => RecordType::BinaryLibrary,
            Self::ObjectNullMultiple256(_) => RecordType::ObjectNullMultiple256,
            Self::ObjectNullMultiple(_) => RecordType::ObjectNullMultiple,
            Self::ArraySinglePrimitive(_) => RecordType::ArraySinglePrimitive,
            Self::ArraySingleObject(_) => RecordType::ArraySingleObject,
            Self::ArraySingleString(_) => RecordType::ArraySingleString,
        }
    }

    /// Object id introduced by this record, if it defines an object
    pub fn object_id(&self) -> Option<i32> {
        match self {
            Self::ClassWithId(r) => Some(r.object_id),
            Self::SystemClassWithMembers(r) => Some(r.class_info.object_id),
            Self::ClassWithMembers(r) => Some(r.class_info.object_id),
            Self::SystemClassWithMembersAndTypes(r) => Some(r.class_info.object_id),
            Self::ClassWithMembersAndTypes(r) => Some(r.class_info.object_id),
            Self::BinaryObjectString(r) => Some(r.object_id),
            Self::BinaryArray(r) => Some(r.object_id),
            Self::ArraySinglePrimitive(r) => Some(r.object_id),
            Self::ArraySingleObject(r) => Some(r.object_id),
            Self::ArraySingleString(r) => Some(r.object_id),
            _ => None,
        }
    }

    /// Class name and member names, for records that carry them inline
    pub fn class_info(&self) -> Option<&ClassInfo> {
        match self {
            Self::SystemClassWithMembers(r) => Some(&r.class_info),
            Self::ClassWithMembers(r) => Some(&r.class_info),
            Self::SystemClassWithMembersAndTypes(r) => Some(&r.class_info),
            Self::ClassWithMembersAndTypes(r) => Some(&r.class_info),
            _ => None,
        }
    }

    /// Member or element values of class and array records
    ///
    /// `ArraySinglePrimitive` keeps its elements as plain primitives and is not
    /// covered here.
    pub fn values(&self) -> Option<&MemberValues> {
        match self {
            Self::ClassWithId(r) => Some(&r.values),
            Self::SystemClassWithMembers(r) => Some(&r.values),
            Self::ClassWithMembers(r) => Some(&r.values),
            Self::SystemClassWithMembersAndTypes(r) => Some(&r.values),
            Self::ClassWithMembersAndTypes(r) => Some(&r.values),
            Self::BinaryArray(r) => Some(&r.values),
            Self::ArraySingleObject(r) => Some(&r.values),
            Self::ArraySingleString(r) => Some(&r.values),
            _ => None,
        }
    }

    pub fn values_mut(&mut self) -> Option<&mut MemberValues> {
        match self {
            Self::ClassWithId(r) => Some(&mut r.values),
            Self::SystemClassWithMembers(r) => Some(&mut r.values),
            Self::ClassWithMembers(r) => Some(&mut r.values),
            Self::SystemClassWithMembersAndTypes(r) => Some(&mut r.values),
            Self::ClassWithMembersAndTypes(r) => Some(&mut r.values),
            Self::BinaryArray(r) => Some(&mut r.values),
            Self::ArraySingleObject(r) => Some(&mut r.values),
            Self::ArraySingleString(r) => Some(&mut r.values),
            _ => None,
        }
    }

    /// Find the record defining `id`, searching this record and its nested values
    pub fn find_object(&self, id: i32) -> Option<&Record> {
        if self.object_id() == Some(id) {
            return Some(self);
        }
        self.values()?.iter().find_map(|value| match value {
            MemberValue::Record(record) => record.find_object(id),
            _ => None,
        })
    }

    pub fn find_object_mut(&mut self, id: i32) -> Option<&mut Record> {
        if self.object_id() == Some(id) {
            return Some(self);
        }
        self.values_mut()?.iter_mut().find_map(|value| match value {
            MemberValue::Record(record) => record.find_object_mut(id),
            _ => None,
        })
    }
}

/// One logical member or element slot
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MemberValue {
    /// Raw value of a slot declared with a primitive type
    Primitive(PrimitiveValue),
    /// Null; null runs are expanded to one `Null` per slot
    Null,
    /// Record written inline (string, reference, typed primitive, nested object)
    Record(Box<Record>),
}

impl MemberValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            Self::Primitive(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl From<Record> for MemberValue {
    fn from(record: Record) -> Self {
        Self::Record(Box::new(record))
    }
}

impl From<PrimitiveValue> for MemberValue {
    fn from(value: PrimitiveValue) -> Self {
        Self::Primitive(value)
    }
}

/// Record used to encode a stretch of null slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NullForm {
    ObjectNull,
    ObjectNullMultiple256,
    ObjectNullMultiple,
}

impl NullForm {
    /// Whether a run of `count` nulls can be written as this record
    pub fn fits(self, count: usize) -> bool {
        match self {
            Self::ObjectNull => count == 1,
            Self::ObjectNullMultiple256 => (1..=MAX_NULL_RUN_256).contains(&count),
            Self::ObjectNullMultiple => (1..=i32::MAX as usize).contains(&count),
        }
    }
}

/// Null slots `start..start + count` were written as one `form` record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NullSegment {
    pub start: usize,
    pub count: usize,
    pub form: NullForm,
}

/// A `BinaryLibrary` record written right before the value of `slot`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InlineLibrary {
    pub slot: usize,
    pub library: BinaryLibrary,
}

/// Member or element values of a class or array record
///
/// Holds the logical slots plus the framing seen on the wire (null run
/// segmentation, inline library records) so an unchanged container re-encodes
/// to the same bytes. The slot count is fixed once built; slots are edited in
/// place through [`get_mut`](Self::get_mut) or [`iter_mut`](Self::iter_mut).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemberValues {
    slots: Vec<MemberValue>,
    null_segments: Vec<NullSegment>,
    libraries: Vec<InlineLibrary>,
}

impl MemberValues {
    /// Values with no recorded framing; nulls are segmented on encode
    pub fn new(slots: Vec<MemberValue>) -> Self {
        Self {
            slots,
            ..Self::default()
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    pub(crate) fn push(&mut self, value: MemberValue) {
        self.slots.push(value);
    }

    pub(crate) fn push_nulls(&mut self, count: usize, form: NullForm) {
        self.null_segments.push(NullSegment {
            start: self.slots.len(),
            count,
            form,
        });
        self.slots.extend(std::iter::repeat_n(MemberValue::Null, count));
    }

    /// Record a library that precedes the next slot's value
    pub(crate) fn push_library(&mut self, library: BinaryLibrary) {
        self.libraries.push(InlineLibrary {
            slot: self.slots.len(),
            library,
        });
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MemberValue> {
        self.slots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut MemberValue> {
        self.slots.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MemberValue> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, MemberValue> {
        self.slots.iter_mut()
    }

    pub fn as_slice(&self) -> &[MemberValue] {
        &self.slots
    }

    /// Null segmentation recorded at decode time
    pub fn null_segments(&self) -> &[NullSegment] {
        &self.null_segments
    }

    /// Library records that appeared between slots
    pub fn inline_libraries(&self) -> &[InlineLibrary] {
        &self.libraries
    }

    /// Recorded segment starting at `index`, if all its slots are still null
    /// and its record form can carry its count
    pub(crate) fn intact_segment_at(&self, index: usize) -> Option<NullSegment> {
        let segment = self.null_segments.iter().find(|s| s.start == index)?;
        let end = segment.start.checked_add(segment.count)?;
        let slots = self.slots.get(segment.start..end)?;
        (segment.form.fits(segment.count) && slots.iter().all(MemberValue::is_null))
            .then_some(*segment)
    }

    /// Whether a recorded segment or inline library starts at `index`
    pub(crate) fn is_boundary(&self, index: usize) -> bool {
        self.null_segments.iter().any(|s| s.start == index)
            || self.libraries.iter().any(|l| l.slot == index)
    }

    pub(crate) fn libraries_at(&self, index: usize) -> impl Iterator<Item = &BinaryLibrary> {
        self.libraries
            .iter()
            .filter(move |l| l.slot == index)
            .map(|l| &l.library)
    }
}

impl From<Vec<MemberValue>> for MemberValues {
    fn from(slots: Vec<MemberValue>) -> Self {
        Self::new(slots)
    }
}

impl<'a> IntoIterator for &'a MemberValues {
    type Item = &'a MemberValue;
    type IntoIter = std::slice::Iter<'a, MemberValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}
