// SPDX-License-Identifier: Apache-2.0
//! Round-trip laws over generated values.

mod common;

use std::collections::{BTreeMap, HashMap};

use common::{Node, Person, Point};
use mote::{Guid, MsgPacker, Rational, SharedStr, Timestamp, VersionId};
use proptest::prelude::*;

fn packer() -> MsgPacker {
    MsgPacker::new()
}

proptest! {
    #[test]
    fn integers_roundtrip(value in any::<i64>()) {
        let p = packer();
        let bytes = p.serialize(&value).unwrap();
        prop_assert_eq!(p.deserialize::<i64>(&bytes).unwrap(), value);
    }

    #[test]
    fn unsigned_roundtrip(value in any::<u64>()) {
        let p = packer();
        let bytes = p.serialize(&value).unwrap();
        prop_assert_eq!(p.deserialize::<u64>(&bytes).unwrap(), value);
    }

    #[test]
    fn floats_roundtrip_bit_exactly(value in any::<f64>()) {
        let p = packer();
        let bytes = p.serialize(&value).unwrap();
        let back = p.deserialize::<f64>(&bytes).unwrap();
        prop_assert_eq!(back.to_bits(), value.to_bits());
    }

    #[test]
    fn strings_roundtrip(value in ".{0,120}") {
        let p = packer();
        let bytes = p.serialize(&value).unwrap();
        prop_assert_eq!(p.deserialize::<String>(&bytes).unwrap(), value);
    }

    #[test]
    fn vectors_of_strings_roundtrip(value in prop::collection::vec(".{0,12}", 0..20)) {
        let p = packer();
        let bytes = p.serialize(&value).unwrap();
        prop_assert_eq!(p.deserialize::<Vec<String>>(&bytes).unwrap(), value);
    }

    #[test]
    fn hash_maps_roundtrip(value in prop::collection::hash_map(".{0,8}", any::<i64>(), 0..16)) {
        let p = packer();
        let value: HashMap<String, i64> = value;
        let bytes = p.serialize(&value).unwrap();
        prop_assert_eq!(p.deserialize::<HashMap<String, i64>>(&bytes).unwrap(), value);
    }

    #[test]
    fn btree_maps_roundtrip(value in prop::collection::btree_map(any::<u32>(), ".{0,8}", 0..16)) {
        let p = packer();
        let value: BTreeMap<u32, String> = value;
        let bytes = p.serialize(&value).unwrap();
        prop_assert_eq!(p.deserialize::<BTreeMap<u32, String>>(&bytes).unwrap(), value);
    }

    #[test]
    fn options_roundtrip(value in prop::option::of(any::<i32>())) {
        let p = packer();
        let bytes = p.serialize(&value).unwrap();
        prop_assert_eq!(p.deserialize::<Option<i32>>(&bytes).unwrap(), value);
    }

    #[test]
    fn points_roundtrip(x in any::<i32>(), y in any::<i32>()) {
        let p = packer();
        let value = Point { x, y };
        let bytes = p.serialize(&value).unwrap();
        prop_assert_eq!(p.deserialize::<Point>(&bytes).unwrap(), value);
    }

    #[test]
    fn people_roundtrip(name in ".{0,24}", age in any::<u32>()) {
        let p = packer();
        let value = Person { name, age };
        let bytes = p.serialize(&value).unwrap();
        prop_assert_eq!(p.deserialize::<Person>(&bytes).unwrap(), value);
    }

    #[test]
    fn timestamps_roundtrip(seconds in any::<i64>(), nanos in 0u32..1_000_000_000) {
        let p = packer();
        let value = Timestamp::new(seconds, nanos);
        let bytes = p.serialize(&value).unwrap();
        prop_assert_eq!(p.deserialize::<Timestamp>(&bytes).unwrap(), value);
    }

    #[test]
    fn guids_roundtrip(raw in prop::array::uniform16(any::<u8>())) {
        let p = packer();
        let value = Guid::from_bytes(raw);
        let bytes = p.serialize(&value).unwrap();
        prop_assert_eq!(p.deserialize::<Guid>(&bytes).unwrap(), value);
        // The textual forms decode to the same value.
        let text = p.serialize(&value.to_string()).unwrap();
        prop_assert_eq!(p.deserialize::<Guid>(&text).unwrap(), value);
    }
}

#[test]
fn nested_trees_roundtrip() {
    let p = packer();
    let tree = Node {
        value: 1,
        children: vec![
            Node {
                value: 2,
                children: vec![Node {
                    value: 4,
                    children: Vec::new(),
                }],
            },
            Node {
                value: 3,
                children: Vec::new(),
            },
        ],
    };
    let bytes = p.serialize(&tree).expect("serialize");
    assert_eq!(p.deserialize::<Node>(&bytes).expect("deserialize"), tree);
}

#[test]
fn fixed_arrays_enforce_their_length() {
    let p = packer();
    let value = [10u8, 20, 30];
    let bytes = p.serialize(&value).expect("serialize");
    assert_eq!(p.deserialize::<[u8; 3]>(&bytes).expect("deserialize"), value);
    assert!(p.deserialize::<[u8; 4]>(&bytes).is_err());
}

#[test]
fn rationals_and_versions_roundtrip() {
    let p = packer();
    let ratio = Rational::new(-7, 16).expect("nonzero denominator");
    let bytes = p.serialize(&ratio).expect("serialize");
    assert_eq!(p.deserialize::<Rational>(&bytes).expect("deserialize"), ratio);

    let version = VersionId::new(&[1, 2, 3]).expect("three components");
    let bytes = p.serialize(&version).expect("serialize");
    assert_eq!(
        p.deserialize::<VersionId>(&bytes).expect("deserialize"),
        version
    );
}

#[test]
fn shared_strings_roundtrip() {
    let p = packer();
    let value = SharedStr::from("hello");
    let bytes = p.serialize(&value).expect("serialize");
    assert_eq!(
        p.deserialize::<SharedStr>(&bytes).expect("deserialize").as_str(),
        "hello"
    );
}
