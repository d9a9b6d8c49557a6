// SPDX-License-Identifier: Apache-2.0
//! Object layout behavior: naming policies, defaults policies, unknown
//! keys, constructor binding, and the index-keyed layout.

mod common;

use common::{Compact, Person, Point};
use mote::{DefaultsPolicy, ErrorKind, MsgPacker, NamingPolicy, Writer};

fn encode(f: impl FnOnce(&mut Writer<'_>)) -> Vec<u8> {
    let mut out = Vec::new();
    let mut w = Writer::new(&mut out);
    f(&mut w);
    out
}

#[test]
fn unknown_keys_are_skipped_with_their_values() {
    let packer = MsgPacker::new();
    let bytes = encode(|w| {
        w.write_map_header(3);
        w.write_str("x");
        w.write_int(5);
        w.write_str("debug");
        // A nested structure that must be skipped whole.
        w.write_map_header(1);
        w.write_str("inner");
        w.write_array_header(2);
        w.write_int(1);
        w.write_int(2);
        w.write_str("y");
        w.write_int(6);
    });
    let point = packer.deserialize::<Point>(&bytes).expect("deserialize");
    assert_eq!(point, Point { x: 5, y: 6 });
}

#[test]
fn naming_policy_rewrites_wire_keys() {
    let packer = MsgPacker::builder()
        .configure(|options| options.naming_policy = NamingPolicy::PascalCase)
        .build();
    let bytes = packer.serialize(&Point { x: 1, y: 2 }).expect("serialize");
    let expected = [
        0x82, //
        0xa1, b'X', 0x01, //
        0xa1, b'Y', 0x02,
    ];
    assert_eq!(bytes, expected);
    // The same policy reads its own keys back.
    assert_eq!(
        packer.deserialize::<Point>(&bytes).expect("deserialize"),
        Point { x: 1, y: 2 }
    );
}

#[test]
fn required_policy_elides_declared_defaults() {
    let packer = MsgPacker::builder()
        .configure(|options| options.serialize_defaults = DefaultsPolicy::Required)
        .build();
    let bytes = packer.serialize(&Point { x: 9, y: 0 }).expect("serialize");
    // y equals its declared default and is omitted.
    let expected = [0x81, 0xa1, b'x', 0x09];
    assert_eq!(bytes, expected);
    let back = packer.deserialize::<Point>(&bytes).expect("deserialize");
    assert_eq!(back, Point { x: 9, y: 0 });
}

#[test]
fn always_policy_keeps_defaults() {
    let packer = MsgPacker::new();
    let bytes = packer.serialize(&Point { x: 0, y: 0 }).expect("serialize");
    assert_eq!(bytes[0], 0x82);
}

#[test]
fn missing_required_ctor_argument_is_an_error() {
    let packer = MsgPacker::new();
    let bytes = encode(|w| {
        w.write_map_header(1);
        w.write_str("name");
        w.write_str("Ada");
    });
    let err = packer.deserialize::<Person>(&bytes).expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::MissingRequiredProperty);
    assert!(err.to_string().contains("age"));
}

#[test]
fn ctor_arguments_bind_through_pascal_case_keys() {
    let packer = MsgPacker::new();
    let bytes = encode(|w| {
        w.write_map_header(2);
        w.write_str("Name");
        w.write_str("Grace");
        w.write_str("Age");
        w.write_int(46);
    });
    let person = packer.deserialize::<Person>(&bytes).expect("deserialize");
    assert_eq!(
        person,
        Person {
            name: "Grace".to_string(),
            age: 46
        }
    );
}

#[test]
fn index_keyed_layout_writes_nil_holes() {
    let packer = MsgPacker::new();
    let compact = Compact {
        id: 7,
        label: Some("tag".to_string()),
        weight: 0.0,
    };
    let bytes = packer.serialize(&compact).expect("serialize");
    // Indexes 0, 2 and 4 are declared; 1 and 3 are Nil holes.
    assert_eq!(bytes[0], 0x95);
    assert_eq!(bytes[1], 0x07);
    assert_eq!(bytes[2], 0xc0);
    assert_eq!(&bytes[3..7], &[0xa3, b't', b'a', b'g']);
    assert_eq!(bytes[7], 0xc0);
    assert_eq!(
        packer.deserialize::<Compact>(&bytes).expect("deserialize"),
        compact
    );
}

#[test]
fn index_keyed_layout_tolerates_short_and_long_arrays() {
    let packer = MsgPacker::new();

    // Shorter array: the missing tail keeps its defaults.
    let short = encode(|w| {
        w.write_array_header(1);
        w.write_uint(9);
    });
    let compact = packer.deserialize::<Compact>(&short).expect("deserialize");
    assert_eq!(compact.id, 9);
    assert_eq!(compact.label, None);
    assert_eq!(compact.weight, 0.0);

    // Longer array: the excess is skipped.
    let long = encode(|w| {
        w.write_array_header(7);
        w.write_uint(9);
        w.write_nil();
        w.write_str("x");
        w.write_nil();
        w.write_f64(2.5);
        w.write_str("excess");
        w.write_array_header(0);
    });
    let compact = packer.deserialize::<Compact>(&long).expect("deserialize");
    assert_eq!(compact.id, 9);
    assert_eq!(compact.label, Some("x".to_string()));
    assert_eq!(compact.weight, 2.5);
}

#[test]
fn middle_property_set_while_tail_is_default() {
    let packer = MsgPacker::new();
    let compact = Compact {
        id: 0,
        label: Some("mid".to_string()),
        weight: 0.0,
    };
    let bytes = packer.serialize(&compact).expect("serialize");
    // The array layout never elides: every slot is present even though
    // the tail is at its default.
    assert_eq!(bytes[0], 0x95);
    assert_eq!(
        packer.deserialize::<Compact>(&bytes).expect("deserialize"),
        compact
    );
}

#[test]
fn renamed_properties_bypass_the_naming_policy() {
    use mote::shape::{ObjectShape, PropertyDef, Shape, Shaped};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Tagged {
        inner_value: u32,
    }

    impl Shaped for Tagged {
        fn shape() -> Shape<Self> {
            Shape::Object(
                ObjectShape::with_default("Tagged", Tagged::default).property(
                    PropertyDef::new("inner_value", |t: &Tagged| &t.inner_value)
                        .with_setter(|t, v| t.inner_value = v)
                        .renamed("$v")
                        .finish(),
                ),
            )
        }
    }

    let packer = MsgPacker::builder()
        .configure(|options| options.naming_policy = NamingPolicy::PascalCase)
        .build();
    let bytes = packer
        .serialize(&Tagged { inner_value: 3 })
        .expect("serialize");
    assert_eq!(&bytes[..4], &[0x81, 0xa2, b'$', b'v']);
    assert_eq!(
        packer.deserialize::<Tagged>(&bytes).expect("deserialize"),
        Tagged { inner_value: 3 }
    );
}
