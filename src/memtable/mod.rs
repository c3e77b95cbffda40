//! MemTable - in-memory sorted storage for recent writes.
//!
//! The memtable is the first destination for every mutation. It uses a
//! concurrent skip list keyed by [`InternalKey`], so entries sort by
//! user key ascending and version descending: the newest visible
//! version of a user key is always the first entry at or after its
//! lookup position.
//!
//! Multiple versions of the same user key coexist under different
//! sequence numbers (and, in multi-version mode, valid times). Reads at
//! a sequence snapshot see the latest version at or before that
//! sequence.

use bytes::Bytes;
use crossbeam_skiplist::SkipMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::{
    unpack_sequence_and_type, InternalKey, LookupKey, LookupResult, SequenceNumber, ValidTime,
    ValueType, MV_TRAILER_LEN, VALUE_TYPE_FOR_SEEK,
};
use crate::util::coding::decode_fixed64;

/// Per-entry bookkeeping overhead estimate (skip list node, atomics).
const ENTRY_OVERHEAD: usize = 64;

/// MemTable for in-memory sorted storage.
///
/// Thread-safe for concurrent reads and writes; the engine serializes
/// writers of a single batch externally.
#[derive(Debug)]
pub struct MemTable {
    table: SkipMap<InternalKey, Bytes>,
    approximate_memory_usage: AtomicUsize,
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MemTable {
    /// Create a new empty MemTable.
    pub fn new() -> Self {
        Self {
            table: SkipMap::new(),
            approximate_memory_usage: AtomicUsize::new(0),
        }
    }

    /// Insert a single-version entry.
    pub fn add(&self, seq: SequenceNumber, value_type: ValueType, user_key: &[u8], value: &[u8]) {
        let key = InternalKey::new(Bytes::copy_from_slice(user_key), seq, value_type);
        self.insert(key, value);
    }

    /// Insert a multi-version entry carrying a valid time.
    pub fn add_mv(
        &self,
        seq: SequenceNumber,
        value_type: ValueType,
        user_key: &[u8],
        valid_time: ValidTime,
        value: &[u8],
    ) {
        let key = InternalKey::new_mv(
            Bytes::copy_from_slice(user_key),
            seq,
            value_type,
            valid_time,
        );
        self.insert(key, value);
    }

    fn insert(&self, key: InternalKey, value: &[u8]) {
        let entry_size = key.encoded_len() + value.len() + ENTRY_OVERHEAD;
        self.approximate_memory_usage
            .fetch_add(entry_size, Ordering::Relaxed);
        self.table.insert(key, Bytes::copy_from_slice(value));
    }

    /// Look up the newest version visible at the lookup key's snapshot.
    ///
    /// Returns `Found` with the stored value, `Deleted` when the newest
    /// visible version is a tombstone, and `NotFound` when no version
    /// of the user key exists at or before the snapshot.
    pub fn get(&self, key: &LookupKey) -> LookupResult {
        let user_key = key.user_key();
        let ikey = key.internal_key();
        let trailer = ikey.len() - user_key.len();

        let packed = decode_fixed64(&ikey[user_key.len()..]).unwrap();
        let (sequence, _) = unpack_sequence_and_type(packed);
        let seek = if trailer == MV_TRAILER_LEN {
            let vt = decode_fixed64(&ikey[ikey.len() - 8..]).unwrap();
            InternalKey::new_mv(
                Bytes::copy_from_slice(user_key),
                sequence,
                VALUE_TYPE_FOR_SEEK,
                vt,
            )
        } else {
            InternalKey::new(Bytes::copy_from_slice(user_key), sequence, VALUE_TYPE_FOR_SEEK)
        };

        // Versions newer than the snapshot sort before the seek key, so
        // the first entry at or after it is the newest visible one.
        if let Some(entry) = self.table.range(seek..).next() {
            if entry.key().user_key() == user_key {
                return if entry.key().is_deletion() {
                    LookupResult::Deleted
                } else {
                    LookupResult::Found(entry.value().clone())
                };
            }
        }
        LookupResult::NotFound
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check if the memtable is empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Get approximate memory usage in bytes.
    pub fn approximate_memory_usage(&self) -> usize {
        self.approximate_memory_usage.load(Ordering::Relaxed)
    }

    /// Iterate over all entries in internal-key order.
    pub fn iter(&self) -> impl Iterator<Item = (InternalKey, Bytes)> + '_ {
        self.table
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
    }
}
