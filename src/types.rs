//! Core key types for chronodb.
//!
//! Every entry in the engine is keyed by an *internal key*: the user
//! key followed by an 8-byte trailer packing a 56-bit sequence number
//! with a one-byte value type. In multi-version (MV) mode a further
//! 8-byte valid-time field follows the trailer. All fixed-width fields
//! are little-endian.

use bytes::{BufMut, Bytes, BytesMut};
use std::cmp::Ordering;

use crate::util::coding::{decode_fixed64, encode_varint32, put_fixed64, MAX_VARINT32_LEN};

/// Sequence number assigned to each mutation. Only the low 56 bits are
/// usable; the top byte of the packed trailer holds the value type.
pub type SequenceNumber = u64;

/// Maximum sequence number (56 bits).
pub const MAX_SEQUENCE_NUMBER: SequenceNumber = (1 << 56) - 1;

/// Application-defined valid-time coordinate attached to MV entries.
pub type ValidTime = u64;

/// Smallest valid time.
pub const MIN_VALID_TIME: ValidTime = 0;

/// Trailer length of a single-version internal key.
pub const TRAILER_LEN: usize = 8;

/// Trailer length of a multi-version internal key.
pub const MV_TRAILER_LEN: usize = 16;

/// Value type indicator in internal keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ValueType {
    /// Deletion marker (tombstone).
    Deletion = 0x00,
    /// Normal value.
    Value = 0x01,
}

/// Value type used when packing a seek target. `Value` is the highest
/// defined tag, so a seek positions at or after the newest entry for
/// the target (user key, sequence).
pub const VALUE_TYPE_FOR_SEEK: ValueType = ValueType::Value;

impl ValueType {
    /// Create from byte.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(ValueType::Deletion),
            0x01 => Some(ValueType::Value),
            _ => None,
        }
    }

    /// Convert to byte.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Check if this is a deletion marker.
    pub fn is_deletion(&self) -> bool {
        matches!(self, ValueType::Deletion)
    }
}

/// Pack a sequence number and value type into the 8-byte trailer value.
pub fn pack_sequence_and_type(seq: SequenceNumber, t: ValueType) -> u64 {
    debug_assert!(seq <= MAX_SEQUENCE_NUMBER);
    debug_assert!(t <= VALUE_TYPE_FOR_SEEK);
    (seq << 8) | t.to_byte() as u64
}

/// Split a packed trailer into (sequence, raw tag byte).
pub fn unpack_sequence_and_type(packed: u64) -> (SequenceNumber, u8) {
    (packed >> 8, (packed & 0xFF) as u8)
}

/// Append the single-version encoding of an internal key.
pub fn append_internal_key(buf: &mut BytesMut, user_key: &[u8], seq: SequenceNumber, t: ValueType) {
    buf.put_slice(user_key);
    put_fixed64(buf, pack_sequence_and_type(seq, t));
}

/// Append the multi-version encoding of an internal key.
pub fn append_mv_internal_key(
    buf: &mut BytesMut,
    user_key: &[u8],
    seq: SequenceNumber,
    t: ValueType,
    valid_time: ValidTime,
) {
    buf.put_slice(user_key);
    put_fixed64(buf, pack_sequence_and_type(seq, t));
    put_fixed64(buf, valid_time);
}

/// Extract the user key from a single-version internal key.
pub fn extract_user_key(internal_key: &[u8]) -> &[u8] {
    assert!(internal_key.len() >= TRAILER_LEN);
    &internal_key[..internal_key.len() - TRAILER_LEN]
}

/// Extract the user key from a multi-version internal key.
pub fn extract_mv_user_key(internal_key: &[u8]) -> &[u8] {
    assert!(internal_key.len() >= MV_TRAILER_LEN);
    &internal_key[..internal_key.len() - MV_TRAILER_LEN]
}

/// Internal key with decoded fields.
///
/// `valid_time` is present exactly when the key belongs to a
/// multi-version keyspace; mixing modes within one ordered structure is
/// undefined.
///
/// Ordering matches the internal comparator with a bytewise user
/// comparator: user key ascending, then packed (sequence, type)
/// descending, then valid time descending. Newer versions of a user key
/// always sort first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalKey {
    /// The user-provided key.
    user_key: Bytes,
    /// Sequence number (version).
    sequence: SequenceNumber,
    /// Value type.
    value_type: ValueType,
    /// Valid time, in multi-version mode.
    valid_time: Option<ValidTime>,
}

impl InternalKey {
    /// Create a new single-version internal key.
    pub fn new(user_key: impl Into<Bytes>, sequence: SequenceNumber, value_type: ValueType) -> Self {
        debug_assert!(sequence <= MAX_SEQUENCE_NUMBER);
        Self {
            user_key: user_key.into(),
            sequence,
            value_type,
            valid_time: None,
        }
    }

    /// Create a new multi-version internal key.
    pub fn new_mv(
        user_key: impl Into<Bytes>,
        sequence: SequenceNumber,
        value_type: ValueType,
        valid_time: ValidTime,
    ) -> Self {
        debug_assert!(sequence <= MAX_SEQUENCE_NUMBER);
        Self {
            user_key: user_key.into(),
            sequence,
            value_type,
            valid_time: Some(valid_time),
        }
    }

    /// Create an internal key for a put operation.
    pub fn for_value(user_key: impl Into<Bytes>, sequence: SequenceNumber) -> Self {
        Self::new(user_key, sequence, ValueType::Value)
    }

    /// Create an internal key for a delete operation.
    pub fn for_deletion(user_key: impl Into<Bytes>, sequence: SequenceNumber) -> Self {
        Self::new(user_key, sequence, ValueType::Deletion)
    }

    /// Get the user key.
    pub fn user_key(&self) -> &[u8] {
        &self.user_key
    }

    /// Get the sequence number.
    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    /// Get the value type.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Get the valid time, if this is a multi-version key.
    pub fn valid_time(&self) -> Option<ValidTime> {
        self.valid_time
    }

    /// Check if this is a deletion marker.
    pub fn is_deletion(&self) -> bool {
        self.value_type.is_deletion()
    }

    fn packed(&self) -> u64 {
        pack_sequence_and_type(self.sequence, self.value_type)
    }

    /// Encode to the contiguous byte representation.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_to(&mut buf);
        buf.freeze()
    }

    /// Encode into an existing buffer.
    pub fn encode_to(&self, buf: &mut BytesMut) {
        match self.valid_time {
            None => append_internal_key(buf, &self.user_key, self.sequence, self.value_type),
            Some(vt) => {
                append_mv_internal_key(buf, &self.user_key, self.sequence, self.value_type, vt)
            }
        }
    }

    /// Get the encoded length.
    pub fn encoded_len(&self) -> usize {
        let trailer = if self.valid_time.is_some() {
            MV_TRAILER_LEN
        } else {
            TRAILER_LEN
        };
        self.user_key.len() + trailer
    }

    /// Decode a single-version internal key.
    ///
    /// Returns None when the input is shorter than the trailer or the
    /// tag byte is not a defined value type.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < TRAILER_LEN {
            return None;
        }
        let split = data.len() - TRAILER_LEN;
        let packed = decode_fixed64(&data[split..])?;
        let (sequence, tag) = unpack_sequence_and_type(packed);
        let value_type = ValueType::from_byte(tag)?;
        Some(Self {
            user_key: Bytes::copy_from_slice(&data[..split]),
            sequence,
            value_type,
            valid_time: None,
        })
    }

    /// Decode a multi-version internal key.
    pub fn decode_mv(data: &[u8]) -> Option<Self> {
        if data.len() < MV_TRAILER_LEN {
            return None;
        }
        let split = data.len() - MV_TRAILER_LEN;
        let packed = decode_fixed64(&data[split..])?;
        let valid_time = decode_fixed64(&data[split + 8..])?;
        let (sequence, tag) = unpack_sequence_and_type(packed);
        let value_type = ValueType::from_byte(tag)?;
        Some(Self {
            user_key: Bytes::copy_from_slice(&data[..split]),
            sequence,
            value_type,
            valid_time: Some(valid_time),
        })
    }

    /// Human-readable rendering: `'escaped_user_key' @ seq : tag`.
    pub fn debug_string(&self) -> String {
        match self.valid_time {
            None => format!(
                "'{}' @ {} : {}",
                escape_bytes(&self.user_key),
                self.sequence,
                self.value_type.to_byte()
            ),
            Some(vt) => format!(
                "'{}' @ {} : {} vt {}",
                escape_bytes(&self.user_key),
                self.sequence,
                self.value_type.to_byte(),
                vt
            ),
        }
    }
}

impl Ord for InternalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.user_key
            .cmp(&other.user_key)
            .then_with(|| other.packed().cmp(&self.packed()))
            .then_with(|| {
                other
                    .valid_time
                    .unwrap_or(MIN_VALID_TIME)
                    .cmp(&self.valid_time.unwrap_or(MIN_VALID_TIME))
            })
    }
}

impl PartialOrd for InternalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Render an encoded single-version internal key for debugging.
/// Unparseable inputs render as `(bad)` plus the escaped raw bytes.
pub fn format_internal_key(data: &[u8]) -> String {
    match InternalKey::decode(data) {
        Some(key) => key.debug_string(),
        None => format!("(bad){}", escape_bytes(data)),
    }
}

/// Render an encoded multi-version internal key for debugging.
pub fn format_mv_internal_key(data: &[u8]) -> String {
    match InternalKey::decode_mv(data) {
        Some(key) => key.debug_string(),
        None => format!("(bad){}", escape_bytes(data)),
    }
}

/// Escape non-printable bytes as `\xHH`.
pub fn escape_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len());
    for &b in data {
        if (b' '..=b'~').contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\x{:02x}", b));
        }
    }
    out
}

/// Inline capacity of a [`LookupKey`]. Point reads whose encoded form
/// fits here never touch the heap.
const LOOKUP_KEY_INLINE_LEN: usize = 200;

/// Encoded query key for a point read.
///
/// Layout: `varint32(klength) ‖ user_key ‖ packed(seq, seek tag)` with
/// an optional trailing valid time in multi-version mode. The memtable
/// consumes the whole buffer; table iterators consume the suffix
/// starting at the user key.
pub struct LookupKey {
    inline: [u8; LOOKUP_KEY_INLINE_LEN],
    heap: Option<Vec<u8>>,
    kstart: usize,
    uend: usize,
    end: usize,
}

impl LookupKey {
    /// Build a single-version lookup key for `user_key` at `sequence`.
    pub fn new(user_key: &[u8], sequence: SequenceNumber) -> Self {
        Self::build(user_key, sequence, None)
    }

    /// Build a multi-version lookup key for `user_key` at
    /// (`sequence`, `valid_time`).
    pub fn new_mv(user_key: &[u8], sequence: SequenceNumber, valid_time: ValidTime) -> Self {
        Self::build(user_key, sequence, Some(valid_time))
    }

    fn build(user_key: &[u8], sequence: SequenceNumber, valid_time: Option<ValidTime>) -> Self {
        let usize_ = user_key.len();
        let trailer = if valid_time.is_some() {
            MV_TRAILER_LEN
        } else {
            TRAILER_LEN
        };
        // Conservative estimate: full-width varint plus trailer.
        let needed = usize_ + MAX_VARINT32_LEN + trailer;

        let (varint, vlen) = encode_varint32((usize_ + trailer) as u32);
        let total = vlen + usize_ + trailer;

        let mut inline = [0u8; LOOKUP_KEY_INLINE_LEN];
        let mut heap = None;
        let dst: &mut [u8] = if needed <= LOOKUP_KEY_INLINE_LEN {
            &mut inline[..total]
        } else {
            heap = Some(vec![0u8; total]);
            heap.as_deref_mut().unwrap()
        };

        dst[..vlen].copy_from_slice(&varint[..vlen]);
        dst[vlen..vlen + usize_].copy_from_slice(user_key);
        let packed = pack_sequence_and_type(sequence, VALUE_TYPE_FOR_SEEK);
        dst[vlen + usize_..vlen + usize_ + 8].copy_from_slice(&packed.to_le_bytes());
        if let Some(vt) = valid_time {
            dst[vlen + usize_ + 8..vlen + usize_ + 16].copy_from_slice(&vt.to_le_bytes());
        }

        Self {
            inline,
            heap,
            kstart: vlen,
            uend: vlen + usize_,
            end: total,
        }
    }

    fn buf(&self) -> &[u8] {
        self.heap.as_deref().unwrap_or(&self.inline)
    }

    /// The key to probe the memtable with (starts at the varint).
    pub fn memtable_key(&self) -> &[u8] {
        &self.buf()[..self.end]
    }

    /// The key to probe tables with (starts at the user key).
    pub fn internal_key(&self) -> &[u8] {
        &self.buf()[self.kstart..self.end]
    }

    /// The user key portion alone.
    pub fn user_key(&self) -> &[u8] {
        &self.buf()[self.kstart..self.uend]
    }
}

/// Result of a point lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    /// Value found.
    Found(Bytes),
    /// Key was deleted (tombstone found).
    Deleted,
    /// Key not found.
    NotFound,
}

impl LookupResult {
    /// Check if a value was found.
    pub fn is_found(&self) -> bool {
        matches!(self, LookupResult::Found(_))
    }

    /// Get the value if found.
    pub fn value(&self) -> Option<&Bytes> {
        match self {
            LookupResult::Found(v) => Some(v),
            _ => None,
        }
    }

    /// Convert to Option<Bytes>.
    pub fn into_option(self) -> Option<Bytes> {
        match self {
            LookupResult::Found(v) => Some(v),
            _ => None,
        }
    }
}
