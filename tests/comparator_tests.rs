//! Integration tests for internal key ordering and shortening.

use bytes::BytesMut;
use chronodb::types::{
    append_internal_key, append_mv_internal_key, pack_sequence_and_type, VALUE_TYPE_FOR_SEEK,
};
use chronodb::util::coding::decode_fixed64;
use chronodb::{
    BytewiseComparator, Comparator, InternalKeyComparator, ValueType, MAX_SEQUENCE_NUMBER,
    MIN_VALID_TIME,
};
use std::cmp::Ordering;
use std::sync::Arc;

fn ikey(user_key: &[u8], seq: u64, t: ValueType) -> Vec<u8> {
    let mut buf = BytesMut::new();
    append_internal_key(&mut buf, user_key, seq, t);
    buf.to_vec()
}

fn mv_ikey(user_key: &[u8], seq: u64, t: ValueType, vt: u64) -> Vec<u8> {
    let mut buf = BytesMut::new();
    append_mv_internal_key(&mut buf, user_key, seq, t, vt);
    buf.to_vec()
}

/// Test the total order over a set of keys the engine would actually
/// hold: user key ascending, version descending.
#[test]
fn comparator_total_order() {
    let cmp = InternalKeyComparator::new(Arc::new(BytewiseComparator::new()), false);

    // Already in the expected order.
    let ordered = vec![
        ikey(b"", 100, ValueType::Value),
        ikey(b"", 2, ValueType::Deletion),
        ikey(b"a", 50, ValueType::Value),
        ikey(b"a", 50, ValueType::Deletion),
        ikey(b"a", 3, ValueType::Value),
        ikey(b"aa", 99, ValueType::Value),
        ikey(b"b", 1, ValueType::Value),
    ];

    for i in 0..ordered.len() {
        for j in 0..ordered.len() {
            let expected = i.cmp(&j);
            assert_eq!(
                cmp.compare(&ordered[i], &ordered[j]),
                expected,
                "keys {} vs {}",
                i,
                j
            );
        }
    }
}

/// Test the multi-version order: valid time breaks (user key, seq) ties.
#[test]
fn mv_comparator_total_order() {
    let cmp = InternalKeyComparator::new(Arc::new(BytewiseComparator::new()), true);

    let ordered = vec![
        mv_ikey(b"a", 50, ValueType::Value, 9),
        mv_ikey(b"a", 10, ValueType::Value, 99),
        mv_ikey(b"a", 10, ValueType::Value, 3),
        mv_ikey(b"a", 10, ValueType::Value, 0),
        mv_ikey(b"b", 1, ValueType::Value, 50),
    ];

    for i in 0..ordered.len() {
        for j in 0..ordered.len() {
            assert_eq!(
                cmp.compare(&ordered[i], &ordered[j]),
                i.cmp(&j),
                "keys {} vs {}",
                i,
                j
            );
        }
    }
}

/// Test that separator shortening keeps index keys strictly sandwiched.
#[test]
fn separator_sandwich_property() {
    for multi_version in [false, true] {
        let cmp = InternalKeyComparator::new(Arc::new(BytewiseComparator::new()), multi_version);
        let make = |user_key: &[u8], seq: u64| {
            if multi_version {
                mv_ikey(user_key, seq, ValueType::Value, 5)
            } else {
                ikey(user_key, seq, ValueType::Value)
            }
        };

        let cases: Vec<(Vec<u8>, Vec<u8>)> = vec![
            (make(b"abcd", 100), make(b"abxyz", 50)),
            (make(b"foo", 100), make(b"foo", 50)),
            (make(b"a", 1), make(b"b", 1)),
            (make(b"", 2), make(b"x", 2)),
        ];

        for (start, limit) in cases {
            assert_eq!(cmp.compare(&start, &limit), Ordering::Less);
            let sep = cmp.find_shortest_separator(&start, &limit);
            assert_ne!(cmp.compare(&start, &sep), Ordering::Greater);
            assert_eq!(cmp.compare(&sep, &limit), Ordering::Less);
        }
    }
}

/// Test the synthesized separator trailer byte for byte.
#[test]
fn separator_uses_earliest_trailer() {
    let cmp = InternalKeyComparator::new(Arc::new(BytewiseComparator::new()), true);

    let start = mv_ikey(b"abcd", 100, ValueType::Value, 7);
    let limit = mv_ikey(b"abxyz", 50, ValueType::Value, 7);
    let sep = cmp.find_shortest_separator(&start, &limit);

    assert_eq!(cmp.user_key(&sep), b"abd");
    let packed = decode_fixed64(&sep[3..11]).unwrap();
    assert_eq!(
        packed,
        pack_sequence_and_type(MAX_SEQUENCE_NUMBER, VALUE_TYPE_FOR_SEEK)
    );
    assert_eq!(decode_fixed64(&sep[11..]).unwrap(), MIN_VALID_TIME);
}

/// Test successor shortening against the strictly-greater contract.
#[test]
fn successor_is_greater() {
    for multi_version in [false, true] {
        let cmp = InternalKeyComparator::new(Arc::new(BytewiseComparator::new()), multi_version);
        let make = |user_key: &[u8]| {
            if multi_version {
                mv_ikey(user_key, 33, ValueType::Value, 8)
            } else {
                ikey(user_key, 33, ValueType::Value)
            }
        };

        for user_key in [&b"abcd"[..], &b"a"[..], &b"\xff\x00"[..]] {
            let key = make(user_key);
            let succ = cmp.find_short_successor(&key);
            assert_ne!(cmp.compare(&key, &succ), Ordering::Greater);
        }

        // Unshortenable key comes back unchanged.
        let key = make(b"\xff\xff\xff");
        assert_eq!(cmp.find_short_successor(&key), key);
    }
}

/// Test a non-bytewise user comparator flowing through the adapter.
#[test]
fn custom_user_comparator() {
    /// Orders keys by length, then bytewise.
    struct LengthFirstComparator;

    impl Comparator for LengthFirstComparator {
        fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        }

        fn name(&self) -> &str {
            "test.LengthFirstComparator"
        }

        fn find_shortest_separator(&self, start: &[u8], _limit: &[u8]) -> Vec<u8> {
            // Shortening would reorder under length-first; decline.
            start.to_vec()
        }

        fn find_short_successor(&self, key: &[u8]) -> Vec<u8> {
            key.to_vec()
        }
    }

    let cmp = InternalKeyComparator::new(Arc::new(LengthFirstComparator), false);

    // "z" < "aa" under length-first ordering.
    let a = ikey(b"z", 1, ValueType::Value);
    let b = ikey(b"aa", 9, ValueType::Value);
    assert_eq!(cmp.compare(&a, &b), Ordering::Less);

    // A declining user comparator leaves separators untouched.
    let sep = cmp.find_shortest_separator(&a, &b);
    assert_eq!(sep, a);
}
