// crates/stackscope-graph/src/tests.rs
// ============================================================================
// Module: Graph Unit Tests
// Description: Store, collection, index, rollup, and propagation behavior.
// Purpose: Validate membership invariants, reactive re-bucketing, and
//          lifecycle propagation along typed edges.
// Dependencies: stackscope-graph, stackscope-reactive
// ============================================================================

//! Unit tests for the entity graph.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use serde_json::json;
use stackscope_reactive::Scope;
use stackscope_reactive::Signal;

use crate::Collection;
use crate::CollectionEvent;
use crate::EdgeHandle;
use crate::EdgeKind;
use crate::EdgeSlot;
use crate::EntityId;
use crate::GraphError;
use crate::IndexKey;
use crate::Lifecycle;
use crate::Node;
use crate::Store;

/// Minimal entity used across the graph tests.
struct Item {
    id: EntityId,
    scope: Scope,
    lifecycle: Lifecycle,
    label: Signal<String>,
    size: Signal<i64>,
    /// Strong child edge.
    children: Collection,
    /// Lifecycle reference edge.
    related: Collection,
    /// Weak one-to-one edge.
    buddy: EdgeSlot,
}

impl Item {
    fn create(store: &Store, label: &str, size: i64) -> Rc<Item> {
        let label = label.to_owned();
        store.insert(|id| {
            let scope = Scope::new();
            scope.with(|| {
                Rc::new(Item {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    label: Signal::new(label),
                    size: Signal::new(size),
                    children: Collection::new(store, "children", EdgeKind::Strong, Some(id))
                        .with_index("label", |node| {
                            let item = downcast(node)?;
                            Some(IndexKey::Str(item.label.get()))
                        })
                        .with_index("size", |node| {
                            let item = downcast(node)?;
                            Some(IndexKey::Int(item.size.get()))
                        }),
                    related: Collection::new(store, "related", EdgeKind::Lifecycle, Some(id)),
                    buddy: EdgeSlot::new(store, "buddy", EdgeKind::Weak),
                })
            })
        })
    }
}

fn downcast(node: &Rc<dyn Node>) -> Option<Rc<Item>> {
    Rc::clone(node).as_any().downcast::<Item>().ok()
}

impl Node for Item {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "item"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "label" => Some(json!(self.label.get_untracked())),
            "size" => Some(json!(self.size.get_untracked())),
            _ => None,
        }
    }

    fn edges(&self) -> Vec<EdgeHandle> {
        vec![
            EdgeHandle::Many(self.children.clone()),
            EdgeHandle::Many(self.related.clone()),
            EdgeHandle::One(self.buddy.clone()),
        ]
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

#[test]
fn link_preserves_insertion_order() {
    let store = Store::new();
    let parent = Item::create(&store, "parent", 0);
    let a = Item::create(&store, "a", 1);
    let b = Item::create(&store, "b", 2);
    parent.children.link(a.id());
    parent.children.link(b.id());
    parent.children.link(a.id());
    assert_eq!(parent.children.ids(), vec![a.id(), b.id()]);
    assert_eq!(parent.children.len(), 2);
}

#[test]
fn index_buckets_members_by_projection() {
    let store = Store::new();
    let parent = Item::create(&store, "parent", 0);
    let a = Item::create(&store, "x", 1);
    let b = Item::create(&store, "y", 2);
    let c = Item::create(&store, "x", 3);
    for child in [&a, &b, &c] {
        parent.children.link(child.id());
    }
    let xs = parent.children.by("label", &IndexKey::from("x")).unwrap();
    assert_eq!(xs, vec![a.id(), c.id()]);
    let ys = parent.children.by("label", &IndexKey::from("y")).unwrap();
    assert_eq!(ys, vec![b.id()]);
}

#[test]
fn membership_equals_union_of_buckets() {
    let store = Store::new();
    let parent = Item::create(&store, "parent", 0);
    let labels = ["x", "y", "x", "z"];
    let mut ids = Vec::new();
    for (position, label) in labels.iter().enumerate() {
        let child = Item::create(&store, label, position as i64);
        parent.children.link(child.id());
        ids.push(child.id());
    }
    let mut bucketed: Vec<EntityId> = Vec::new();
    for label in ["x", "y", "z"] {
        bucketed.extend(parent.children.by("label", &IndexKey::from(label)).unwrap());
    }
    bucketed.sort();
    let mut members = parent.children.ids();
    members.sort();
    assert_eq!(bucketed, members);
}

#[test]
fn reactive_rekey_moves_item_to_exactly_one_bucket() {
    let store = Store::new();
    let parent = Item::create(&store, "parent", 0);
    let child = Item::create(&store, "old", 1);
    parent.children.link(child.id());
    assert_eq!(
        parent.children.by("label", &IndexKey::from("old")).unwrap(),
        vec![child.id()]
    );
    child.label.set("new".to_owned());
    assert!(parent.children.by("label", &IndexKey::from("old")).unwrap().is_empty());
    assert_eq!(
        parent.children.by("label", &IndexKey::from("new")).unwrap(),
        vec![child.id()]
    );
}

#[test]
fn unknown_index_is_reported() {
    let store = Store::new();
    let parent = Item::create(&store, "parent", 0);
    let result = parent.children.by("missing", &IndexKey::from(1));
    assert!(matches!(result, Err(GraphError::UnknownIndex { .. })));
}

#[test]
fn filtered_view_tracks_parent_changes_lazily() {
    let store = Store::new();
    let parent = Item::create(&store, "parent", 0);
    let view = parent.children.filtered("label", IndexKey::from("x")).unwrap();
    assert!(view.is_empty());
    let a = Item::create(&store, "x", 1);
    parent.children.link(a.id());
    assert_eq!(view.ids(), vec![a.id()]);
    a.label.set("y".to_owned());
    assert!(view.is_empty());
}

#[test]
fn filtered_view_restricts_other_indexes() {
    let store = Store::new();
    let parent = Item::create(&store, "parent", 0);
    let a = Item::create(&store, "x", 1);
    let b = Item::create(&store, "x", 2);
    let c = Item::create(&store, "y", 1);
    for child in [&a, &b, &c] {
        parent.children.link(child.id());
    }
    let view = parent.children.filtered("label", IndexKey::from("x")).unwrap();
    assert_eq!(view.by("size", &IndexKey::from(1)).unwrap(), vec![a.id()]);
}

#[test]
fn ids_returns_a_snapshot() {
    let store = Store::new();
    let parent = Item::create(&store, "parent", 0);
    let a = Item::create(&store, "a", 1);
    parent.children.link(a.id());
    let snapshot = parent.children.ids();
    let b = Item::create(&store, "b", 2);
    parent.children.link(b.id());
    assert_eq!(snapshot, vec![a.id()]);
    assert_eq!(parent.children.ids(), vec![a.id(), b.id()]);
}

#[test]
fn occupied_one_to_one_edge_rejects_second_link() {
    let store = Store::new();
    let a = Item::create(&store, "a", 1);
    let b = Item::create(&store, "b", 2);
    let c = Item::create(&store, "c", 3);
    a.buddy.link(b.id()).unwrap();
    let result = a.buddy.link(c.id());
    assert!(matches!(result, Err(GraphError::EdgeOccupied { edge: "buddy" })));
    assert_eq!(a.buddy.get(), Some(b.id()));
}

#[test]
fn count_where_tracks_membership_and_member_signals() {
    let store = Store::new();
    let parent = Item::create(&store, "parent", 0);
    let big = parent.children.count_where(|node| {
        downcast(node).is_some_and(|item| item.size.get() > 10)
    });
    assert_eq!(big.get(), 0);
    let a = Item::create(&store, "a", 20);
    parent.children.link(a.id());
    assert_eq!(big.get(), 1);
    a.size.set(5);
    assert_eq!(big.get(), 0);
    let b = Item::create(&store, "b", 30);
    parent.children.link(b.id());
    assert_eq!(big.get(), 1);
}

#[test]
fn numeric_rollups_track_member_signals() {
    let store = Store::new();
    let parent = Item::create(&store, "parent", 0);
    let total = parent
        .children
        .sum_by(|node| downcast(node).map_or(0, |item| item.size.get()));
    let largest = parent
        .children
        .max_by(|node| downcast(node).map_or(0, |item| item.size.get()));
    let any_small = parent
        .children
        .any_where(|node| downcast(node).is_some_and(|item| item.size.get() < 3));
    assert_eq!(total.get(), 0);
    assert_eq!(largest.get(), None);
    let a = Item::create(&store, "a", 2);
    let b = Item::create(&store, "b", 9);
    parent.children.link(a.id());
    parent.children.link(b.id());
    assert_eq!(total.get(), 11);
    assert_eq!(largest.get(), Some(9));
    assert!(any_small.get());
    a.size.set(5);
    assert_eq!(total.get(), 14);
    assert!(!any_small.get());
}

#[test]
fn first_where_breaks_ties_by_insertion_order() {
    let store = Store::new();
    let parent = Item::create(&store, "parent", 0);
    let a = Item::create(&store, "a", 7);
    let b = Item::create(&store, "b", 7);
    parent.children.link(a.id());
    parent.children.link(b.id());
    let pick = parent
        .children
        .first_where(|node| downcast(node).is_some_and(|item| item.size.get() == 7));
    assert_eq!(pick.get(), Some(a.id()));
    parent.children.unlink(a.id());
    assert_eq!(pick.get(), Some(b.id()));
}

#[test]
fn delete_disposes_strong_subtree() {
    let store = Store::new();
    let root = Item::create(&store, "root", 0);
    let child = Item::create(&store, "child", 1);
    let grandchild = Item::create(&store, "grandchild", 2);
    root.children.link(child.id());
    child.children.link(grandchild.id());
    store.delete(root.id());
    assert!(!store.contains(root.id()));
    assert!(!store.contains(child.id()));
    assert!(!store.contains(grandchild.id()));
    assert!(!root.lifecycle.is_alive());
    assert!(!child.lifecycle.is_alive());
    assert!(!grandchild.lifecycle.is_alive());
}

#[test]
fn delete_spares_lifecycle_targets_and_clears_backrefs() {
    let store = Store::new();
    let owner = Item::create(&store, "owner", 0);
    let friend = Item::create(&store, "friend", 1);
    owner.related.link(friend.id());
    friend.buddy.link(owner.id()).unwrap();
    store.delete(owner.id());
    // The lifecycle target survives, but its slot back to the dead entity
    // is cleared.
    assert!(store.contains(friend.id()));
    assert!(friend.lifecycle.is_alive());
    assert_eq!(friend.buddy.get(), None);
}

#[test]
fn dead_entities_leave_every_collection_and_bucket() {
    let store = Store::new();
    let parent = Item::create(&store, "parent", 0);
    let other = Item::create(&store, "other", 0);
    let child = Item::create(&store, "x", 1);
    parent.children.link(child.id());
    other.related.link(child.id());
    store.delete(child.id());
    assert!(!parent.children.contains(child.id()));
    assert!(!other.related.contains(child.id()));
    assert!(parent.children.by("label", &IndexKey::from("x")).unwrap().is_empty());
}

#[test]
fn removal_event_fires_after_subtree_is_marked_dead() {
    let store = Store::new();
    let parent = Item::create(&store, "parent", 0);
    let child = Item::create(&store, "child", 1);
    parent.children.link(child.id());
    let observed = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&observed);
    let probe = child.clone();
    parent.children.on_change(move |event| {
        if let CollectionEvent::Removed(_) = event {
            log.borrow_mut().push(probe.lifecycle.is_alive());
        }
    });
    store.delete(child.id());
    assert_eq!(*observed.borrow(), vec![false]);
}

#[test]
fn delete_is_idempotent() {
    let store = Store::new();
    let parent = Item::create(&store, "parent", 0);
    let child = Item::create(&store, "child", 1);
    parent.children.link(child.id());
    store.delete(child.id());
    store.delete(child.id());
    assert!(!store.contains(child.id()));
}

#[test]
fn mark_stale_cascades_without_disposal_and_is_idempotent() {
    let store = Store::new();
    let root = Item::create(&store, "root", 0);
    let child = Item::create(&store, "child", 1);
    let referenced = Item::create(&store, "referenced", 2);
    root.children.link(child.id());
    root.related.link(referenced.id());
    store.mark_stale(root.id());
    store.mark_stale(root.id());
    for item in [&root, &child, &referenced] {
        assert!(!item.lifecycle.is_current());
        assert!(item.lifecycle.is_alive());
        assert!(store.contains(item.id()));
    }
    // Stale entities remain readable.
    assert_eq!(child.label.get(), "child");
}

#[test]
fn uri_walks_strong_parents_to_the_root() {
    let store = Store::new();
    let root = Item::create(&store, "root", 0);
    let a = Item::create(&store, "a", 1);
    let b = Item::create(&store, "b", 2);
    let leaf = Item::create(&store, "leaf", 3);
    root.children.link(a.id());
    root.children.link(b.id());
    b.children.link(leaf.id());
    assert_eq!(store.uri_of(root.id()).unwrap(), "/");
    assert_eq!(store.uri_of(b.id()).unwrap(), "/children[1]");
    assert_eq!(store.uri_of(leaf.id()).unwrap(), "/children[1]/children[0]");
}

#[test]
fn serials_order_entities_by_creation() {
    let store = Store::new();
    let first = Item::create(&store, "first", 0);
    let second = Item::create(&store, "second", 0);
    assert!(store.serial(first.id()).unwrap() < store.serial(second.id()).unwrap());
}

#[test]
fn get_as_downcasts_to_the_concrete_type() {
    let store = Store::new();
    let item = Item::create(&store, "only", 4);
    let fetched: Rc<Item> = store.get_as(item.id()).unwrap();
    assert_eq!(fetched.size.get(), 4);
    assert_eq!(store.of_kind("item"), vec![item.id()]);
}
