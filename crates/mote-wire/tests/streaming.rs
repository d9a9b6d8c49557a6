// SPDX-License-Identifier: Apache-2.0
//! Token-level properties of the streaming reader: one-byte-at-a-time
//! feeding decodes the same token sequence as a full buffer, and `skip`
//! advances past exactly one encoded value.

use mote_wire::{Decoded, Depth, Reader, Timestamp, Writer};
use proptest::prelude::*;

/// A value tree that exercises every token family.
#[derive(Debug, Clone)]
enum Sample {
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
    Ext(i8, Vec<u8>),
    Timestamp(i64, u32),
    Array(Vec<Sample>),
    Map(Vec<(Sample, Sample)>),
}

fn encode_sample(sample: &Sample, w: &mut Writer<'_>) {
    match sample {
        Sample::Nil => w.write_nil(),
        Sample::Bool(b) => w.write_bool(*b),
        Sample::Int(v) => w.write_int(*v),
        Sample::Uint(v) => w.write_uint(*v),
        Sample::F64(v) => w.write_f64(*v),
        Sample::Str(s) => w.write_str(s),
        Sample::Bin(b) => w.write_bin(b),
        Sample::Ext(code, payload) => w.write_ext(*code, payload),
        Sample::Timestamp(sec, nanos) => w.write_timestamp(Timestamp::new(*sec, *nanos)),
        Sample::Array(items) => {
            w.write_array_header(items.len() as u32);
            for item in items {
                encode_sample(item, w);
            }
        }
        Sample::Map(pairs) => {
            w.write_map_header(pairs.len() as u32);
            for (k, v) in pairs {
                encode_sample(k, w);
                encode_sample(v, w);
            }
        }
    }
}

fn encode_to_vec(sample: &Sample) -> Vec<u8> {
    let mut out = Vec::new();
    let mut w = Writer::new(&mut out);
    encode_sample(sample, &mut w);
    out
}

fn sample_strategy() -> impl Strategy<Value = Sample> {
    let leaf = prop_oneof![
        Just(Sample::Nil),
        any::<bool>().prop_map(Sample::Bool),
        any::<i64>().prop_map(Sample::Int),
        any::<u64>().prop_map(Sample::Uint),
        any::<f64>().prop_map(Sample::F64),
        ".{0,40}".prop_map(Sample::Str),
        prop::collection::vec(any::<u8>(), 0..48).prop_map(Sample::Bin),
        (0i8..=127, prop::collection::vec(any::<u8>(), 0..20))
            .prop_map(|(code, payload)| Sample::Ext(code, payload)),
        (any::<i64>(), 0u32..1_000_000_000)
            .prop_map(|(sec, nanos)| Sample::Timestamp(sec, nanos)),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Sample::Array),
            prop::collection::vec((inner.clone(), inner), 0..3).prop_map(Sample::Map),
        ]
    })
}

/// Decodes the whole buffer in one go, rendering each token.
fn collect_full(bytes: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    let mut r = Reader::new(bytes);
    while r.remaining_len() > 0 {
        match r.read_token() {
            Decoded::Value(token) => out.push(format!("{token:?}")),
            other => panic!("full decode failed: {other:?}"),
        }
    }
    out
}

/// Decodes the buffer while revealing it one byte at a time, retrying
/// each token until enough input has arrived.
fn collect_streaming(bytes: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    let mut consumed = 0;
    let mut avail = 0;
    while consumed < bytes.len() {
        let mut r = Reader::new(&bytes[consumed..avail]);
        match r.read_token() {
            Decoded::Value(token) => {
                out.push(format!("{token:?}"));
                consumed += r.position();
            }
            Decoded::Insufficient(_) => {
                assert!(avail < bytes.len(), "reader demanded bytes past the end");
                avail += 1;
            }
            other => panic!("streaming decode failed: {other:?}"),
        }
    }
    out
}

proptest! {
    #[test]
    fn streaming_decode_matches_full_decode(sample in sample_strategy()) {
        let bytes = encode_to_vec(&sample);
        prop_assert_eq!(collect_full(&bytes), collect_streaming(&bytes));
    }

    #[test]
    fn skip_advances_exactly_one_value(sample in sample_strategy()) {
        let mut bytes = encode_to_vec(&sample);
        let value_len = bytes.len();
        // Trailing content must be untouched by the skip.
        bytes.extend_from_slice(&[0xc3, 0x07]);

        let mut r = Reader::new(&bytes);
        let mut depth = Depth::new(64);
        prop_assert_eq!(r.skip(&mut depth), Decoded::Value(()));
        prop_assert_eq!(r.position(), value_len);
        prop_assert_eq!(r.read_bool(), Decoded::Value(true));
        prop_assert_eq!(r.read_int::<u8>(), Decoded::Value(7));
    }

    #[test]
    fn skip_then_reread_sees_identical_bytes(sample in sample_strategy()) {
        let bytes = encode_to_vec(&sample);
        let mut skipper = Reader::new(&bytes);
        let mut depth = Depth::new(64);
        prop_assert_eq!(skipper.skip(&mut depth), Decoded::Value(()));

        // Re-decoding the skipped extent token-by-token consumes the
        // same number of bytes.
        let mut reread = Reader::new(&bytes[..skipper.position()]);
        for token in collect_full(&bytes[..skipper.position()]) {
            prop_assert_eq!(reread.read_token().map(|t| format!("{t:?}")), Decoded::Value(token));
        }
        prop_assert_eq!(reread.remaining_len(), 0);
    }
}
