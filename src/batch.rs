//! Write batches: framed logs of Put/Delete records applied atomically.
//!
//! A batch owns a self-describing byte buffer:
//!
//! ```text
//! sequence: fixed64    (offset 0)
//! count:    fixed32    (offset 8)
//! data:     record[count]
//! record :=
//!    value_tag varstring varstring       |
//!    deletion_tag varstring
//! varstring :=
//!    len:  varint32
//!    data: uint8[len]
//! ```
//!
//! [`WriteBatchMv`] uses the same framing but every record carries a
//! fixed64 valid time after the key:
//!
//! ```text
//! record :=
//!    value_tag varstring valid_time varstring    |
//!    deletion_tag varstring valid_time
//! ```
//!
//! All fixed-width fields are little-endian.

use bytes::{BufMut, BytesMut};

use crate::error::{Error, Result};
use crate::memtable::MemTable;
use crate::types::{SequenceNumber, ValidTime, ValueType};
use crate::util::coding::{
    decode_fixed32, decode_fixed64, get_fixed64, get_length_prefixed_slice,
    put_length_prefixed_slice,
};

/// Batch header: an 8-byte sequence number followed by a 4-byte count.
pub const BATCH_HEADER_LEN: usize = 12;

/// Callback interface for [`WriteBatch::iterate`].
pub trait Handler {
    /// A Put record.
    fn put(&mut self, key: &[u8], value: &[u8]);
    /// A Delete record.
    fn delete(&mut self, key: &[u8]);
}

/// Callback interface for [`WriteBatchMv::iterate`].
pub trait MvHandler {
    /// A Put record with its valid time.
    fn put(&mut self, key: &[u8], valid_time: ValidTime, value: &[u8]);
    /// A Delete record with its valid time.
    fn delete(&mut self, key: &[u8], valid_time: ValidTime);
}

/// A batch of single-version write operations.
#[derive(Debug, Clone)]
pub struct WriteBatch {
    rep: BytesMut,
}

impl Default for WriteBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteBatch {
    /// Create a new empty write batch.
    pub fn new() -> Self {
        let mut rep = BytesMut::with_capacity(64);
        rep.resize(BATCH_HEADER_LEN, 0);
        Self { rep }
    }

    /// Reset to the empty state: a zeroed 12-byte header.
    pub fn clear(&mut self) {
        self.rep.clear();
        self.rep.resize(BATCH_HEADER_LEN, 0);
    }

    /// Current encoded size in bytes.
    pub fn approximate_size(&self) -> usize {
        self.rep.len()
    }

    /// Check if the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Add a put operation to the batch.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.set_count(self.count() + 1);
        self.rep.put_u8(ValueType::Value.to_byte());
        put_length_prefixed_slice(&mut self.rep, key);
        put_length_prefixed_slice(&mut self.rep, value);
    }

    /// Add a delete operation to the batch.
    pub fn delete(&mut self, key: &[u8]) {
        self.set_count(self.count() + 1);
        self.rep.put_u8(ValueType::Deletion.to_byte());
        put_length_prefixed_slice(&mut self.rep, key);
    }

    /// Concatenate the records of `source` onto this batch.
    ///
    /// The sequence field is untouched; the caller owns sequence
    /// management.
    pub fn append(&mut self, source: &WriteBatch) {
        assert!(source.rep.len() >= BATCH_HEADER_LEN);
        self.set_count(self.count() + source.count());
        self.rep.extend_from_slice(&source.rep[BATCH_HEADER_LEN..]);
    }

    /// Replay the records in insertion order through `handler`.
    ///
    /// Fails with a corruption error on the first malformed record, or
    /// when the number of records disagrees with the header count.
    pub fn iterate(&self, handler: &mut dyn Handler) -> Result<()> {
        if self.rep.len() < BATCH_HEADER_LEN {
            return Err(Error::corruption("malformed WriteBatch (too small)"));
        }

        let mut input: &[u8] = &self.rep[BATCH_HEADER_LEN..];
        let mut found: u32 = 0;
        while !input.is_empty() {
            found += 1;
            let tag = input[0];
            input = &input[1..];
            match ValueType::from_byte(tag) {
                Some(ValueType::Value) => {
                    match (
                        get_length_prefixed_slice(&mut input),
                        get_length_prefixed_slice(&mut input),
                    ) {
                        (Some(key), Some(value)) => handler.put(key, value),
                        _ => return Err(Error::corruption("bad WriteBatch Put")),
                    }
                }
                Some(ValueType::Deletion) => match get_length_prefixed_slice(&mut input) {
                    Some(key) => handler.delete(key),
                    None => return Err(Error::corruption("bad WriteBatch Delete")),
                },
                None => return Err(Error::corruption("unknown WriteBatch tag")),
            }
        }

        if found != self.count() {
            return Err(Error::corruption("WriteBatch has wrong count"));
        }
        Ok(())
    }

    /// Starting sequence number of this batch. Engine-internal.
    pub fn sequence(&self) -> SequenceNumber {
        decode_fixed64(&self.rep).unwrap()
    }

    /// Set the starting sequence number. Engine-internal.
    pub fn set_sequence(&mut self, seq: SequenceNumber) {
        self.rep[..8].copy_from_slice(&seq.to_le_bytes());
    }

    /// Number of records in this batch. Engine-internal.
    pub fn count(&self) -> u32 {
        decode_fixed32(&self.rep[8..]).unwrap()
    }

    /// Set the record count. Engine-internal.
    pub fn set_count(&mut self, n: u32) {
        self.rep[8..BATCH_HEADER_LEN].copy_from_slice(&n.to_le_bytes());
    }

    /// The raw encoded contents. Engine-internal.
    pub fn contents(&self) -> &[u8] {
        &self.rep
    }

    /// Replace the contents with a previously encoded batch (e.g. read
    /// back from a log). Engine-internal.
    pub fn set_contents(&mut self, contents: &[u8]) {
        assert!(contents.len() >= BATCH_HEADER_LEN);
        self.rep.clear();
        self.rep.extend_from_slice(contents);
    }

    /// Apply the batch to a memtable, assigning `sequence() + i` to the
    /// i-th record. Engine-internal.
    pub fn insert_into(&self, memtable: &MemTable) -> Result<()> {
        let mut inserter = MemTableInserter {
            sequence: self.sequence(),
            mem: memtable,
        };
        self.iterate(&mut inserter)
    }
}

/// A batch of multi-version write operations carrying valid times.
#[derive(Debug, Clone)]
pub struct WriteBatchMv {
    rep: BytesMut,
}

impl Default for WriteBatchMv {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteBatchMv {
    /// Create a new empty write batch.
    pub fn new() -> Self {
        let mut rep = BytesMut::with_capacity(64);
        rep.resize(BATCH_HEADER_LEN, 0);
        Self { rep }
    }

    /// Reset to the empty state: a zeroed 12-byte header.
    pub fn clear(&mut self) {
        self.rep.clear();
        self.rep.resize(BATCH_HEADER_LEN, 0);
    }

    /// Current encoded size in bytes.
    pub fn approximate_size(&self) -> usize {
        self.rep.len()
    }

    /// Check if the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Add a put operation valid from `valid_time`.
    pub fn put(&mut self, key: &[u8], valid_time: ValidTime, value: &[u8]) {
        self.set_count(self.count() + 1);
        self.rep.put_u8(ValueType::Value.to_byte());
        put_length_prefixed_slice(&mut self.rep, key);
        self.rep.put_u64_le(valid_time);
        put_length_prefixed_slice(&mut self.rep, value);
    }

    /// Add a delete operation effective at `valid_time`.
    pub fn delete(&mut self, key: &[u8], valid_time: ValidTime) {
        self.set_count(self.count() + 1);
        self.rep.put_u8(ValueType::Deletion.to_byte());
        put_length_prefixed_slice(&mut self.rep, key);
        self.rep.put_u64_le(valid_time);
    }

    /// Concatenate the records of `source` onto this batch.
    pub fn append(&mut self, source: &WriteBatchMv) {
        assert!(source.rep.len() >= BATCH_HEADER_LEN);
        self.set_count(self.count() + source.count());
        self.rep.extend_from_slice(&source.rep[BATCH_HEADER_LEN..]);
    }

    /// Replay the records in insertion order through `handler`.
    pub fn iterate(&self, handler: &mut dyn MvHandler) -> Result<()> {
        if self.rep.len() < BATCH_HEADER_LEN {
            return Err(Error::corruption("malformed WriteBatchMv (too small)"));
        }

        let mut input: &[u8] = &self.rep[BATCH_HEADER_LEN..];
        let mut found: u32 = 0;
        while !input.is_empty() {
            found += 1;
            let tag = input[0];
            input = &input[1..];
            match ValueType::from_byte(tag) {
                Some(ValueType::Value) => {
                    let key = get_length_prefixed_slice(&mut input);
                    let vt = get_fixed64(&mut input);
                    let value = get_length_prefixed_slice(&mut input);
                    match (key, vt, value) {
                        (Some(key), Some(vt), Some(value)) => handler.put(key, vt, value),
                        _ => return Err(Error::corruption("bad WriteBatchMv Put")),
                    }
                }
                Some(ValueType::Deletion) => {
                    let key = get_length_prefixed_slice(&mut input);
                    let vt = get_fixed64(&mut input);
                    match (key, vt) {
                        (Some(key), Some(vt)) => handler.delete(key, vt),
                        _ => return Err(Error::corruption("bad WriteBatchMv Delete")),
                    }
                }
                None => return Err(Error::corruption("unknown WriteBatchMv tag")),
            }
        }

        if found != self.count() {
            return Err(Error::corruption("WriteBatchMv has wrong count"));
        }
        Ok(())
    }

    /// Starting sequence number of this batch. Engine-internal.
    pub fn sequence(&self) -> SequenceNumber {
        decode_fixed64(&self.rep).unwrap()
    }

    /// Set the starting sequence number. Engine-internal.
    pub fn set_sequence(&mut self, seq: SequenceNumber) {
        self.rep[..8].copy_from_slice(&seq.to_le_bytes());
    }

    /// Number of records in this batch. Engine-internal.
    pub fn count(&self) -> u32 {
        decode_fixed32(&self.rep[8..]).unwrap()
    }

    /// Set the record count. Engine-internal.
    pub fn set_count(&mut self, n: u32) {
        self.rep[8..BATCH_HEADER_LEN].copy_from_slice(&n.to_le_bytes());
    }

    /// The raw encoded contents. Engine-internal.
    pub fn contents(&self) -> &[u8] {
        &self.rep
    }

    /// Replace the contents with a previously encoded batch. Engine-internal.
    pub fn set_contents(&mut self, contents: &[u8]) {
        assert!(contents.len() >= BATCH_HEADER_LEN);
        self.rep.clear();
        self.rep.extend_from_slice(contents);
    }

    /// Apply the batch to a memtable, assigning `sequence() + i` to the
    /// i-th record. Engine-internal.
    pub fn insert_into(&self, memtable: &MemTable) -> Result<()> {
        let mut inserter = MvMemTableInserter {
            sequence: self.sequence(),
            mem: memtable,
        };
        self.iterate(&mut inserter)
    }
}

struct MemTableInserter<'a> {
    sequence: SequenceNumber,
    mem: &'a MemTable,
}

impl Handler for MemTableInserter<'_> {
    fn put(&mut self, key: &[u8], value: &[u8]) {
        self.mem.add(self.sequence, ValueType::Value, key, value);
        self.sequence += 1;
    }

    fn delete(&mut self, key: &[u8]) {
        self.mem.add(self.sequence, ValueType::Deletion, key, b"");
        self.sequence += 1;
    }
}

struct MvMemTableInserter<'a> {
    sequence: SequenceNumber,
    mem: &'a MemTable,
}

impl MvHandler for MvMemTableInserter<'_> {
    fn put(&mut self, key: &[u8], valid_time: ValidTime, value: &[u8]) {
        self.mem
            .add_mv(self.sequence, ValueType::Value, key, valid_time, value);
        self.sequence += 1;
    }

    fn delete(&mut self, key: &[u8], valid_time: ValidTime) {
        self.mem
            .add_mv(self.sequence, ValueType::Deletion, key, valid_time, b"");
        self.sequence += 1;
    }
}
