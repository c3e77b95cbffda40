//! Integration tests for write-batch workflows.

use bytes::Bytes;
use chronodb::{
    Handler, LookupKey, LookupResult, MemTable, MvHandler, ValueType, WriteBatch, WriteBatchMv,
    BATCH_HEADER_LEN,
};

/// Test a full put round-trip: encode, iterate, replay.
#[test]
fn batch_single_put_roundtrip() {
    let mut batch = WriteBatch::new();
    batch.set_sequence(100);
    batch.put(b"foo", b"bar");

    // Exact wire bytes: header then one Put record.
    assert_eq!(
        batch.contents(),
        &[
            0x64, 0, 0, 0, 0, 0, 0, 0, // sequence
            0x01, 0, 0, 0, // count
            0x01, 0x03, b'f', b'o', b'o', 0x03, b'b', b'a', b'r',
        ]
    );

    let memtable = MemTable::new();
    batch.insert_into(&memtable).unwrap();

    let (key, value) = memtable.iter().next().unwrap();
    assert_eq!(key.user_key(), b"foo");
    assert_eq!(key.sequence(), 100);
    assert_eq!(key.value_type(), ValueType::Value);
    assert_eq!(value, Bytes::from("bar"));
}

/// Test that a mixed batch replays with consecutive sequence numbers.
#[test]
fn batch_mixed_replay() {
    let mut batch = WriteBatch::new();
    batch.set_sequence(7);
    batch.put(b"a", b"1");
    batch.delete(b"b");
    batch.put(b"c", b"3");

    let memtable = MemTable::new();
    batch.insert_into(&memtable).unwrap();
    assert_eq!(memtable.len(), 3);

    let entries: Vec<_> = memtable
        .iter()
        .map(|(k, v)| (k.user_key().to_vec(), k.sequence(), k.value_type(), v))
        .collect();
    assert_eq!(
        entries,
        vec![
            (b"a".to_vec(), 7, ValueType::Value, Bytes::from("1")),
            (b"b".to_vec(), 8, ValueType::Deletion, Bytes::new()),
            (b"c".to_vec(), 9, ValueType::Value, Bytes::from("3")),
        ]
    );

    // The replayed state answers point reads at the right snapshots.
    assert_eq!(
        memtable.get(&LookupKey::new(b"a", 9)),
        LookupResult::Found(Bytes::from("1"))
    );
    assert_eq!(memtable.get(&LookupKey::new(b"b", 9)), LookupResult::Deleted);
    assert_eq!(memtable.get(&LookupKey::new(b"b", 7)), LookupResult::NotFound);
}

/// Test batch append keeps record order and count arithmetic.
#[test]
fn batch_append_concatenates() {
    let mut first = WriteBatch::new();
    first.set_sequence(10);
    first.put(b"k1", b"v1");
    first.put(b"k2", b"v2");

    let mut second = WriteBatch::new();
    second.put(b"k3", b"v3");

    let expected_size =
        first.approximate_size() + second.approximate_size() - BATCH_HEADER_LEN;
    first.append(&second);

    assert_eq!(first.count(), 3);
    assert_eq!(first.approximate_size(), expected_size);

    struct Names(Vec<Vec<u8>>);
    impl Handler for Names {
        fn put(&mut self, key: &[u8], _value: &[u8]) {
            self.0.push(key.to_vec());
        }
        fn delete(&mut self, key: &[u8]) {
            self.0.push(key.to_vec());
        }
    }

    let mut names = Names(Vec::new());
    first.iterate(&mut names).unwrap();
    assert_eq!(names.0, vec![b"k1".to_vec(), b"k2".to_vec(), b"k3".to_vec()]);
}

/// Test corruption reporting for doctored batches.
#[test]
fn batch_corruption_detection() {
    struct Ignore;
    impl Handler for Ignore {
        fn put(&mut self, _key: &[u8], _value: &[u8]) {}
        fn delete(&mut self, _key: &[u8]) {}
    }

    // Header count disagrees with the encoded records.
    let mut batch = WriteBatch::new();
    batch.put(b"k", b"v");
    batch.set_count(2);
    let err = batch.iterate(&mut Ignore).unwrap_err();
    assert_eq!(err.message(), "WriteBatch has wrong count");

    // Unknown tag byte.
    let mut batch = WriteBatch::new();
    batch.put(b"k", b"v");
    let mut raw = batch.contents().to_vec();
    raw[BATCH_HEADER_LEN] = 0x7F;
    batch.set_contents(&raw);
    let err = batch.iterate(&mut Ignore).unwrap_err();
    assert_eq!(err.message(), "unknown WriteBatch tag");
}

/// Test the multi-version record layout end to end.
#[test]
fn mv_batch_put_roundtrip() {
    let mut batch = WriteBatchMv::new();
    batch.set_sequence(500);
    batch.put(b"k", 42, b"v");

    assert_eq!(
        &batch.contents()[BATCH_HEADER_LEN..],
        &[0x01, 0x01, b'k', 0x2A, 0, 0, 0, 0, 0, 0, 0, 0x01, b'v']
    );

    struct Collect(Vec<(Vec<u8>, u64, Vec<u8>)>);
    impl MvHandler for Collect {
        fn put(&mut self, key: &[u8], valid_time: u64, value: &[u8]) {
            self.0.push((key.to_vec(), valid_time, value.to_vec()));
        }
        fn delete(&mut self, _key: &[u8], _valid_time: u64) {}
    }

    let mut collect = Collect(Vec::new());
    batch.iterate(&mut collect).unwrap();
    assert_eq!(collect.0, vec![(b"k".to_vec(), 42, b"v".to_vec())]);

    let memtable = MemTable::new();
    batch.insert_into(&memtable).unwrap();
    let (key, value) = memtable.iter().next().unwrap();
    assert_eq!(key.sequence(), 500);
    assert_eq!(key.valid_time(), Some(42));
    assert_eq!(value, Bytes::from("v"));
}

/// Test that clearing returns a batch to its pristine state.
#[test]
fn batch_clear_resets() {
    let mut batch = WriteBatch::new();
    batch.set_sequence(1234);
    for i in 0..100 {
        batch.put(format!("key{:03}", i).as_bytes(), b"value");
    }
    assert_eq!(batch.count(), 100);

    batch.clear();
    assert_eq!(batch.count(), 0);
    assert_eq!(batch.sequence(), 0);
    assert_eq!(batch.approximate_size(), BATCH_HEADER_LEN);

    // Reusable after clear.
    batch.put(b"k", b"v");
    assert_eq!(batch.count(), 1);
}

/// Test a batch surviving serialization through raw contents.
#[test]
fn batch_contents_roundtrip_through_log() {
    let mut batch = WriteBatchMv::new();
    batch.set_sequence(77);
    batch.put(b"alpha", 1, b"one");
    batch.delete(b"beta", 2);

    // Simulate a log write/read cycle.
    let logged: Vec<u8> = batch.contents().to_vec();
    let mut recovered = WriteBatchMv::new();
    recovered.set_contents(&logged);

    assert_eq!(recovered.sequence(), 77);
    assert_eq!(recovered.count(), 2);

    let memtable = MemTable::new();
    recovered.insert_into(&memtable).unwrap();
    assert_eq!(memtable.len(), 2);
}
