use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use granule::tracker::track_read;
use granule::{is_related, ObserverId, PathSet, Store};
use proptest::prelude::*;
use serde_json::{json, Value};

const KEYS: [&str; 3] = ["a", "b", "c"];

/// Fixed-shape tree: three objects of three numeric leaves, plus a list.
fn base_tree() -> Value {
    let mut root = serde_json::Map::new();
    for outer in KEYS {
        let mut inner = serde_json::Map::new();
        for leaf in KEYS {
            inner.insert(leaf.to_string(), json!(0));
        }
        root.insert(outer.to_string(), Value::Object(inner));
    }
    root.insert("list".to_string(), json!([0, 0, 0]));
    Value::Object(root)
}

fn leaf_path() -> impl Strategy<Value = String> {
    prop_oneof![
        (0..3usize, 0..3usize).prop_map(|(o, l)| format!("{}.{}", KEYS[o], KEYS[l])),
        (0..3usize).prop_map(|i| format!("list.{i}")),
        Just("list.length".to_string()),
    ]
}

fn subscribed_path() -> impl Strategy<Value = String> {
    prop_oneof![
        leaf_path(),
        (0..3usize).prop_map(|o| KEYS[o].to_string()),
        Just("list".to_string()),
    ]
}

#[derive(Debug, Clone)]
enum WriteOp {
    Leaf(String),
    Push,
    Reverse,
}

fn write_op() -> impl Strategy<Value = WriteOp> {
    prop_oneof![
        4 => (0..3usize, 0..3usize)
            .prop_map(|(o, l)| WriteOp::Leaf(format!("{}.{}", KEYS[o], KEYS[l]))),
        1 => Just(WriteOp::Push),
        1 => Just(WriteOp::Reverse),
    ]
}

fn changed_by(ops: &[WriteOp]) -> PathSet {
    ops.iter()
        .map(|op| match op {
            WriteOp::Leaf(path) => path.clone(),
            WriteOp::Push | WriteOp::Reverse => "list".to_string(),
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn property_notified_iff_related(
        observers in prop::collection::vec(
            prop::collection::btree_set(subscribed_path(), 0..4),
            1..6,
        ),
        ops in prop::collection::vec(write_op(), 1..4),
    ) {
        let store = Store::new(base_tree());
        let notified = Rc::new(RefCell::new(Vec::new()));
        for (index, paths) in observers.iter().enumerate() {
            let id = ObserverId::next();
            let log = notified.clone();
            let _ = store.subscribe_component(id, move || log.borrow_mut().push(index));
            store.update_component_paths(id, paths.iter().cloned());
        }

        let counter = Rc::new(RefCell::new(0i64));
        store.set(|s| {
            for op in &ops {
                match op {
                    WriteOp::Leaf(path) => {
                        *counter.borrow_mut() += 1;
                        s.set_at(path, *counter.borrow())?;
                    }
                    WriteOp::Push => {
                        s.key("list")?.push(1)?;
                    }
                    WriteOp::Reverse => s.key("list")?.reverse()?,
                }
            }
            Ok(())
        }).unwrap();

        let changed = changed_by(&ops);
        let expected: Vec<usize> = observers
            .iter()
            .enumerate()
            .filter(|(_, paths)| {
                paths.iter().any(|p| changed.iter().any(|c| is_related(p, c)))
            })
            .map(|(index, _)| index)
            .collect();
        let mut seen = notified.borrow().clone();
        seen.sort_unstable();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn property_read_set_independent_of_order(
        reads in prop::collection::vec(leaf_path(), 0..8),
    ) {
        let tree = base_tree();
        let (_, forward) = track_read(&tree, |s| {
            for path in &reads {
                s.at(path).exists();
            }
        });
        let (_, backward) = track_read(&tree, |s| {
            for path in reads.iter().rev().chain(reads.iter()) {
                s.at(path).exists();
            }
        });
        let expected: BTreeSet<String> = reads.iter().cloned().collect();
        prop_assert_eq!(&forward, &expected);
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn property_cleared_observer_never_notified(
        paths in prop::collection::btree_set(subscribed_path(), 1..4),
        op in write_op(),
    ) {
        let store = Store::new(base_tree());
        let hits = Rc::new(RefCell::new(0));
        let id = ObserverId::next();
        let log = hits.clone();
        let _sub = store.subscribe_component(id, move || *log.borrow_mut() += 1);
        store.update_component_paths(id, paths);
        store.clear_component_paths(id);
        prop_assert!(store.subscribed_paths().is_empty());

        store.set(|s| match &op {
            WriteOp::Leaf(path) => s.set_at(path, 7).map(drop),
            WriteOp::Push => s.key("list")?.push(7).map(drop),
            WriteOp::Reverse => s.key("list")?.reverse(),
        }).unwrap();
        prop_assert_eq!(*hits.borrow(), 0);
    }
}
