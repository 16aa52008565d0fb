// crates/stackscope-graph/tests/proptest_collection.rs
// ============================================================================
// Module: Collection Property Tests
// Description: Index and membership invariants under random operations.
// Purpose: Validate that arbitrary link/unlink/re-key sequences preserve
//          the bucket invariants.
// Dependencies: stackscope-graph, stackscope-reactive, proptest
// ============================================================================

//! Property tests for collection and index invariants.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::any::Any;
use std::rc::Rc;

use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;
use stackscope_graph::Collection;
use stackscope_graph::EdgeHandle;
use stackscope_graph::EdgeKind;
use stackscope_graph::EntityId;
use stackscope_graph::IndexKey;
use stackscope_graph::Lifecycle;
use stackscope_graph::Node;
use stackscope_graph::Store;
use stackscope_reactive::Scope;
use stackscope_reactive::Signal;

/// Minimal entity with one indexed string field.
struct Token {
    id: EntityId,
    scope: Scope,
    lifecycle: Lifecycle,
    bucket: Signal<String>,
}

impl Token {
    fn create(store: &Store, bucket: &str) -> Rc<Token> {
        let bucket = bucket.to_owned();
        store.insert(|id| {
            let scope = Scope::new();
            scope.with(|| {
                Rc::new(Token {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    bucket: Signal::new(bucket),
                })
            })
        })
    }
}

impl Node for Token {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "token"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "bucket" => Some(json!(self.bucket.get_untracked())),
            _ => None,
        }
    }

    fn edges(&self) -> Vec<EdgeHandle> {
        Vec::new()
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// One randomized operation against the collection.
#[derive(Debug, Clone)]
enum Op {
    /// Link the item at this slot, creating it if needed.
    Link(usize),
    /// Unlink the item at this slot.
    Unlink(usize),
    /// Re-key the item at this slot.
    Rekey(usize, String),
    /// Delete the item at this slot.
    Delete(usize),
}

fn bucket_name() -> impl Strategy<Value = String> {
    prop_oneof![Just("a".to_owned()), Just("b".to_owned()), Just("c".to_owned())]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..8).prop_map(Op::Link),
        (0usize..8).prop_map(Op::Unlink),
        ((0usize..8), bucket_name()).prop_map(|(slot, bucket)| Op::Rekey(slot, bucket)),
        (0usize..8).prop_map(Op::Delete),
    ]
}

/// Collects the union of all buckets of the `bucket` index.
fn bucket_union(collection: &Collection) -> Vec<EntityId> {
    let mut union: Vec<EntityId> = Vec::new();
    for bucket in ["a", "b", "c"] {
        union.extend(
            collection
                .by("bucket", &IndexKey::from(bucket))
                .unwrap(),
        );
    }
    union.sort();
    union
}

proptest! {
    #[test]
    fn membership_equals_bucket_union_under_random_ops(ops in proptest::collection::vec(op(), 1..40)) {
        let store = Store::new();
        let collection = Collection::new(&store, "tokens", EdgeKind::Lifecycle, None)
            .with_index("bucket", |node| {
                let token = Rc::clone(node).as_any().downcast::<Token>().ok()?;
                Some(IndexKey::Str(token.bucket.get()))
            });
        let mut slots: Vec<Option<Rc<Token>>> = vec![None; 8];
        for operation in ops {
            match operation {
                Op::Link(slot) => {
                    let token = slots[slot]
                        .get_or_insert_with(|| Token::create(&store, "a"))
                        .clone();
                    collection.link(token.id());
                }
                Op::Unlink(slot) => {
                    if let Some(token) = &slots[slot] {
                        collection.unlink(token.id());
                    }
                }
                Op::Rekey(slot, bucket) => {
                    if let Some(token) = &slots[slot] {
                        token.bucket.set(bucket);
                    }
                }
                Op::Delete(slot) => {
                    if let Some(token) = slots[slot].take() {
                        store.delete(token.id());
                    }
                }
            }
            // Invariant: membership equals the union of the index buckets.
            let mut members = collection.ids();
            members.sort();
            prop_assert_eq!(&members, &bucket_union(&collection));
            // Invariant: every member sits in exactly the bucket of its
            // current key.
            for token in slots.iter().flatten() {
                if !collection.contains(token.id()) {
                    continue;
                }
                let key = token.bucket.get_untracked();
                for bucket in ["a", "b", "c"] {
                    let hit = collection
                        .by("bucket", &IndexKey::from(bucket))
                        .unwrap()
                        .contains(&token.id());
                    prop_assert_eq!(hit, bucket == key);
                }
            }
        }
    }
}
