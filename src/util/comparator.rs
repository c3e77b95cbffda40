//! Key comparison utilities.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::types::{
    pack_sequence_and_type, MAX_SEQUENCE_NUMBER, MIN_VALID_TIME, MV_TRAILER_LEN, TRAILER_LEN,
    VALUE_TYPE_FOR_SEEK,
};
use crate::util::coding::decode_fixed64;

/// Trait for comparing keys.
pub trait Comparator: Send + Sync {
    /// Compare two keys.
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;

    /// Get the name of this comparator.
    fn name(&self) -> &str;

    /// Find a short separator between two keys.
    ///
    /// Returns a key `sep` with `start <= sep < limit`, used to trim
    /// index-block keys. Returning `start` unchanged is always valid.
    fn find_shortest_separator(&self, start: &[u8], limit: &[u8]) -> Vec<u8>;

    /// Find a short key `succ` with `key <= succ`.
    fn find_short_successor(&self, key: &[u8]) -> Vec<u8>;
}

/// Default bytewise comparator (lexicographic ordering).
#[derive(Debug, Clone, Copy, Default)]
pub struct BytewiseComparator;

impl BytewiseComparator {
    /// Create a new bytewise comparator.
    pub fn new() -> Self {
        Self
    }
}

impl Comparator for BytewiseComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }

    fn name(&self) -> &str {
        "leveldb.BytewiseComparator"
    }

    fn find_shortest_separator(&self, start: &[u8], limit: &[u8]) -> Vec<u8> {
        // Length of the common prefix
        let min_len = std::cmp::min(start.len(), limit.len());
        let mut diff_index = 0;

        while diff_index < min_len && start[diff_index] == limit[diff_index] {
            diff_index += 1;
        }

        if diff_index >= min_len {
            // One key is a prefix of the other, or they are equal
            return start.to_vec();
        }

        let diff_byte = start[diff_index];

        // If the differing byte can be incremented while staying below
        // limit, truncate there for a shorter separator
        if diff_byte < 0xFF && diff_byte + 1 < limit[diff_index] {
            let mut result = start[..=diff_index].to_vec();
            result[diff_index] += 1;
            return result;
        }

        start.to_vec()
    }

    fn find_short_successor(&self, key: &[u8]) -> Vec<u8> {
        // Find the first byte that can be incremented
        for (i, &byte) in key.iter().enumerate() {
            if byte != 0xFF {
                let mut result = key[..=i].to_vec();
                result[i] += 1;
                return result;
            }
        }

        // All bytes are 0xFF, return the key as-is
        key.to_vec()
    }
}

/// Comparator over encoded internal keys.
///
/// Orders by:
/// 1. User key ascending, per the wrapped user comparator
/// 2. Packed (sequence, type) descending, so newer entries sort first
/// 3. In multi-version mode, valid time descending
///
/// The mode is fixed at construction: every key compared through one
/// instance must carry the matching trailer (8 bytes single-version,
/// 16 bytes multi-version).
#[derive(Clone)]
pub struct InternalKeyComparator {
    user_comparator: Arc<dyn Comparator>,
    multi_version: bool,
}

impl InternalKeyComparator {
    /// Create an internal key comparator over the given user comparator.
    pub fn new(user_comparator: Arc<dyn Comparator>, multi_version: bool) -> Self {
        Self {
            user_comparator,
            multi_version,
        }
    }

    /// Whether this comparator expects multi-version keys.
    pub fn is_multi_version(&self) -> bool {
        self.multi_version
    }

    /// The trailer length of keys in this keyspace.
    pub fn trailer_len(&self) -> usize {
        if self.multi_version {
            MV_TRAILER_LEN
        } else {
            TRAILER_LEN
        }
    }

    /// Extract the user key portion of an internal key.
    pub fn user_key<'a>(&self, internal_key: &'a [u8]) -> &'a [u8] {
        assert!(internal_key.len() >= self.trailer_len());
        &internal_key[..internal_key.len() - self.trailer_len()]
    }

    /// Get the user comparator.
    pub fn user_comparator(&self) -> &Arc<dyn Comparator> {
        &self.user_comparator
    }

    // The packed (sequence << 8 | type) field of an internal key.
    fn packed(&self, internal_key: &[u8]) -> u64 {
        let off = internal_key.len() - self.trailer_len();
        decode_fixed64(&internal_key[off..]).unwrap()
    }

    // The valid-time field of a multi-version internal key.
    fn valid_time(&self, internal_key: &[u8]) -> u64 {
        decode_fixed64(&internal_key[internal_key.len() - 8..]).unwrap()
    }

    // Append the earliest-possible trailer for a user key: maximum
    // sequence with the seek tag sorts before every real entry, and in
    // multi-version mode the minimum valid time follows.
    fn append_earliest_trailer(&self, key: &mut Vec<u8>) {
        let packed = pack_sequence_and_type(MAX_SEQUENCE_NUMBER, VALUE_TYPE_FOR_SEEK);
        key.extend_from_slice(&packed.to_le_bytes());
        if self.multi_version {
            key.extend_from_slice(&MIN_VALID_TIME.to_le_bytes());
        }
    }
}

impl Comparator for InternalKeyComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        let r = self
            .user_comparator
            .compare(self.user_key(a), self.user_key(b));
        if r != Ordering::Equal {
            return r;
        }

        // Descending: the larger packed value sorts first.
        match self.packed(b).cmp(&self.packed(a)) {
            Ordering::Equal if self.multi_version => {
                // Descending valid time; byte-identical keys are equal.
                self.valid_time(b).cmp(&self.valid_time(a))
            }
            ord => ord,
        }
    }

    fn name(&self) -> &str {
        "leveldb.InternalKeyComparator"
    }

    fn find_shortest_separator(&self, start: &[u8], limit: &[u8]) -> Vec<u8> {
        // Attempt to shorten the user portion of the key
        let user_start = self.user_key(start);
        let user_limit = self.user_key(limit);

        let tmp = self
            .user_comparator
            .find_shortest_separator(user_start, user_limit);

        if tmp.len() < user_start.len()
            && self.user_comparator.compare(user_start, &tmp) == Ordering::Less
        {
            // User key is physically shorter but logically larger.
            // Tack on the earliest possible trailer so the separator
            // sorts at the first slot for its user key.
            let mut result = tmp;
            self.append_earliest_trailer(&mut result);
            debug_assert_eq!(self.compare(start, &result), Ordering::Less);
            debug_assert_eq!(self.compare(&result, limit), Ordering::Less);
            return result;
        }

        start.to_vec()
    }

    fn find_short_successor(&self, key: &[u8]) -> Vec<u8> {
        let user_key = self.user_key(key);
        let tmp = self.user_comparator.find_short_successor(user_key);

        if tmp.len() < user_key.len()
            && self.user_comparator.compare(user_key, &tmp) == Ordering::Less
        {
            let mut result = tmp;
            self.append_earliest_trailer(&mut result);
            debug_assert_eq!(self.compare(key, &result), Ordering::Less);
            return result;
        }

        key.to_vec()
    }
}
