//! # chronodb
//!
//! The internal-format core of an LSM-tree storage engine with a
//! valid-time dimension.
//!
//! Every entry the engine stores is keyed by an *internal key*: the
//! caller's key plus a trailer packing a 56-bit sequence number with a
//! one-byte value type, and optionally a 64-bit valid time in
//! multi-version (MV) mode. This crate owns that byte layout and
//! everything that depends on getting it exactly right:
//!
//! - **Key codecs**: encode, decode, and debug-render internal keys.
//! - **Comparator adapter**: [`InternalKeyComparator`] lifts a user
//!   comparator into the internal keyspace, including the
//!   separator-shortening helpers block builders rely on.
//! - **Filter-policy adapter**: [`InternalFilterPolicy`] lets user
//!   filters see user keys while filter blocks are built from internal
//!   keys.
//! - **Lookup keys**: [`LookupKey`] builds the ephemeral encoded query
//!   key for point reads, allocation-free in the common case.
//! - **Write batches**: [`WriteBatch`] and [`WriteBatchMv`] frame
//!   Put/Delete records for atomic application to a [`MemTable`].
//!
//! ## Quick start
//!
//! ```rust
//! use chronodb::{LookupKey, MemTable, WriteBatch};
//!
//! let mut batch = WriteBatch::new();
//! batch.set_sequence(100);
//! batch.put(b"hello", b"world");
//!
//! let memtable = MemTable::new();
//! batch.insert_into(&memtable).unwrap();
//!
//! let result = memtable.get(&LookupKey::new(b"hello", 100));
//! assert!(result.is_found());
//! ```
//!
//! This core performs no I/O and owns no threads; durability, table
//! files, and compaction live in the layers built on top of it.

// Public modules
pub mod batch;
pub mod error;
pub mod filter;
pub mod memtable;
pub mod types;
pub mod util;

// Re-export main types for convenience
pub use batch::{Handler, MvHandler, WriteBatch, WriteBatchMv, BATCH_HEADER_LEN};
pub use error::{Error, Result};
pub use filter::{BloomFilterPolicy, FilterPolicy, InternalFilterPolicy};
pub use memtable::MemTable;
pub use types::{
    InternalKey, LookupKey, LookupResult, SequenceNumber, ValidTime, ValueType,
    MAX_SEQUENCE_NUMBER, MIN_VALID_TIME,
};
pub use util::comparator::{BytewiseComparator, Comparator, InternalKeyComparator};
