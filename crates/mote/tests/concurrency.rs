// SPDX-License-Identifier: Apache-2.0
//! Cross-thread behavior: one shared serializer, many operations.

mod common;

use std::sync::Arc;
use std::thread;

use common::Node;
use mote::MsgPacker;

#[test]
fn one_serializer_shared_across_threads() {
    let packer = Arc::new(MsgPacker::new());
    let tree = Arc::new(Node {
        value: 1,
        children: vec![
            Node {
                value: 2,
                children: vec![Node::chain(3)],
            },
            Node {
                value: 3,
                children: Vec::new(),
            },
        ],
    });

    let reference = packer.serialize(tree.as_ref()).expect("serialize");

    // All threads race converter construction and then reuse the cached
    // converter; every result must be identical.
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let packer = Arc::clone(&packer);
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                let mut last = Vec::new();
                for _ in 0..25 {
                    last = packer.serialize(tree.as_ref()).expect("serialize");
                    let back: Node = packer.deserialize(&last).expect("deserialize");
                    assert_eq!(&back, tree.as_ref());
                }
                last
            })
        })
        .collect();

    for handle in handles {
        let bytes = handle.join().expect("worker");
        assert_eq!(bytes, reference);
    }
}

#[test]
fn distinct_serializers_do_not_interfere() {
    let ordinal = MsgPacker::new();
    let by_name = ordinal.reconfigure(|options| options.enum_by_name = true);

    let handle = thread::spawn(move || by_name.serialize(&common::Color::Red).expect("name"));
    let plain = ordinal.serialize(&common::Color::Red).expect("ordinal");

    assert_eq!(plain, [0x00]);
    assert_eq!(handle.join().expect("worker"), [0xa3, b'R', b'e', b'd']);
}
