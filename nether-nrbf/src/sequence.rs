//! Sequence Model: the ordered record list and the public decode/encode entry points

use std::io::{Cursor, Read};
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{decode_one, encode_one};
use crate::config::CodecConfig;
use crate::context::GraphContext;
use crate::error::{Location, NrbfError};
use crate::primitive::offset;
use crate::record::{Record, SerializedStreamHeader};
use crate::Result;

/// Ordered records of one NRBF stream, in stream order
///
/// Records are edited in place through [`get_mut`](Self::get_mut),
/// [`iter_mut`](Self::iter_mut) or [`find_object_mut`](Self::find_object_mut).
/// Reordering, inserting or removing records is not supported; the encoder
/// rejects sequences whose ids no longer line up.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RecordSequence {
    records: Vec<Record>,
}

impl RecordSequence {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Record> {
        self.records.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Record> {
        self.records.iter_mut()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// The stream header, if the first record is one
    pub fn header(&self) -> Option<&SerializedStreamHeader> {
        match self.records.first() {
            Some(Record::SerializedStreamHeader(header)) => Some(header),
            _ => None,
        }
    }

    /// Record defining object `id`, including records nested in member values
    pub fn find_object(&self, id: i32) -> Option<&Record> {
        self.records.iter().find_map(|record| record.find_object(id))
    }

    pub fn find_object_mut(&mut self, id: i32) -> Option<&mut Record> {
        self.records
            .iter_mut()
            .find_map(|record| record.find_object_mut(id))
    }

    /// Record named as the root object by the header
    pub fn root(&self) -> Option<&Record> {
        self.find_object(self.header()?.root_id)
    }
}

impl From<Vec<Record>> for RecordSequence {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

impl<'a> IntoIterator for &'a RecordSequence {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Decode an NRBF stream with the default configuration
pub fn decode(data: &[u8]) -> Result<RecordSequence> {
    decode_with(data, &CodecConfig::default())
}

/// Decode an NRBF stream
///
/// Reads records until the first `MessageEnd`. The stream must start with a
/// header and must not have bytes after the terminator.
pub fn decode_with(data: &[u8], config: &CodecConfig) -> Result<RecordSequence> {
    let mut cursor = Cursor::new(data);
    let mut ctx = GraphContext::new(config);
    let mut records = Vec::new();

    loop {
        let start = offset(&cursor);
        if start >= data.len() {
            return Err(NrbfError::UnterminatedStream { offset: start });
        }

        let record = decode_one(&mut cursor, &mut ctx)?;
        check_position(&record, records.len(), Location::Offset(start))?;

        let end = matches!(record, Record::MessageEnd);
        records.push(record);
        if end {
            break;
        }
    }

    ctx.finish()?;

    let end = offset(&cursor);
    if end < data.len() {
        return Err(NrbfError::TrailingBytes {
            offset: end,
            remaining: data.len() - end,
        });
    }

    debug!(
        records = records.len(),
        objects = ctx.object_count(),
        libraries = ctx.library_count(),
        bytes = data.len(),
        "decoded NRBF stream"
    );
    Ok(RecordSequence::new(records))
}

/// Encode a record sequence with the default configuration
pub fn encode(sequence: &RecordSequence) -> Result<Vec<u8>> {
    encode_with(sequence, &CodecConfig::default())
}

/// Encode a record sequence
///
/// The sequence must start with a header and contain exactly one
/// `MessageEnd`, as its last record.
pub fn encode_with(sequence: &RecordSequence, config: &CodecConfig) -> Result<Vec<u8>> {
    let records = sequence.records();

    if !matches!(records.last(), Some(Record::MessageEnd)) {
        return Err(NrbfError::MissingTerminator);
    }
    if let Some(index) = records
        .iter()
        .position(|record| matches!(record, Record::MessageEnd))
        .filter(|&index| index != records.len() - 1)
    {
        return Err(NrbfError::MultipleTerminators { index });
    }

    let mut ctx = GraphContext::new(config);
    let mut output = Vec::new();

    for (index, record) in records.iter().enumerate() {
        check_position(record, index, Location::Record(index))?;
        encode_one(record, &mut output, &mut ctx, index)?;
    }

    ctx.finish()?;

    debug!(
        records = records.len(),
        objects = ctx.object_count(),
        libraries = ctx.library_count(),
        bytes = output.len(),
        "encoded NRBF stream"
    );
    Ok(output)
}

/// The header must come first and only first
fn check_position(record: &Record, index: usize, at: Location) -> Result<()> {
    let is_header = matches!(record, Record::SerializedStreamHeader(_));
    match (index, is_header) {
        (0, false) => Err(NrbfError::MissingHeader { at }),
        (0, true) | (_, false) => Ok(()),
        (_, true) => Err(NrbfError::UnexpectedRecord {
            kind: record.record_type().name(),
            at,
        }),
    }
}

/// Read everything from `reader` and decode it
pub fn decode_reader(mut reader: impl Read, config: &CodecConfig) -> Result<RecordSequence> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    decode_with(&data, config)
}

/// Read a file fully and decode it with the default configuration
pub fn decode_from_path(path: impl AsRef<Path>) -> Result<RecordSequence> {
    decode_from_path_with(path, &CodecConfig::default())
}

pub fn decode_from_path_with(
    path: impl AsRef<Path>,
    config: &CodecConfig,
) -> Result<RecordSequence> {
    let data = std::fs::read(path)?;
    decode_with(&data, config)
}

/// Encode a sequence and write it to a file, replacing any existing contents
pub fn encode_to_path(sequence: &RecordSequence, path: impl AsRef<Path>) -> Result<()> {
    encode_to_path_with(sequence, path, &CodecConfig::default()).map(|_| ())
}

/// Encode with `config` and write the bytes to a file; returns the encoded size
pub fn encode_to_path_with(
    sequence: &RecordSequence,
    path: impl AsRef<Path>,
    config: &CodecConfig,
) -> Result<usize> {
    let data = encode_with(sequence, config)?;
    std::fs::write(path, &data)?;
    Ok(data.len())
}
