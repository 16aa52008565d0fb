// crates/stackscope-query/src/tests.rs
// ============================================================================
// Module: Query Unit Tests
// Description: Parser and resolver behavior over a small fixture graph.
// Purpose: Validate grammar acceptance, canonical printing, filter
//          semantics, selectors, and anchor resolution.
// Dependencies: stackscope-query, stackscope-graph, stackscope-reactive
// ============================================================================

//! Unit tests for the query engine.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::any::Any;
use std::rc::Rc;

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

use crate::FilterOp;
use crate::QueryError;
use crate::Selector;
use crate::parse_query;
use crate::query_many;
use crate::query_one;
use crate::resolve_anchor;

/// Fixture entity with a `parts` edge and `label`/`size` fields.
struct Gadget {
    id: EntityId,
    scope: Scope,
    lifecycle: Lifecycle,
    label: Signal<String>,
    size: Signal<i64>,
    parts: Collection,
}

impl Gadget {
    fn create(store: &Store, label: &str, size: i64) -> Rc<Gadget> {
        let label = label.to_owned();
        store.insert(|id| {
            let scope = Scope::new();
            scope.with(|| {
                Rc::new(Gadget {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    label: Signal::new(label),
                    size: Signal::new(size),
                    parts: Collection::new(store, "parts", EdgeKind::Strong, Some(id)).with_index(
                        "label",
                        |node| {
                            let gadget = Rc::clone(node).as_any().downcast::<Gadget>().ok()?;
                            Some(IndexKey::Str(gadget.label.get()))
                        },
                    ),
                })
            })
        })
    }
}

impl Node for Gadget {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "gadget"
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
        vec![EdgeHandle::Many(self.parts.clone())]
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// Builds a root gadget with three parts, one of which has a nested part.
fn fixture(store: &Store) -> (Rc<Gadget>, Vec<Rc<Gadget>>) {
    let root = Gadget::create(store, "root", 0);
    let a = Gadget::create(store, "alpha", 1);
    let b = Gadget::create(store, "beta", 2);
    let c = Gadget::create(store, "alpha", 3);
    for part in [&a, &b, &c] {
        root.parts.link(part.id());
    }
    let nested = Gadget::create(store, "nested", 9);
    b.parts.link(nested.id());
    (root, vec![a, b, c, nested])
}

#[test]
fn parses_root_path_with_filter_and_selector() {
    let query = parse_query("/parts(label=alpha)[0]/parts[first]").unwrap();
    assert!(query.anchor.is_none());
    assert_eq!(query.segments.len(), 2);
    assert_eq!(query.segments[0].edge, "parts");
    assert_eq!(query.segments[0].filters[0].field, "label");
    assert_eq!(query.segments[0].filters[0].op, FilterOp::Eq);
    assert_eq!(query.segments[0].filters[0].value, json!("alpha"));
    assert_eq!(query.segments[0].selector, Some(Selector::Index(0)));
    assert_eq!(query.segments[1].selector, Some(Selector::First));
}

#[test]
fn parses_anchor_paths() {
    let query = parse_query("@frame/scopes[0]/variables(name=counter)").unwrap();
    assert_eq!(query.anchor.as_deref(), Some("frame"));
    assert_eq!(query.segments.len(), 2);
    let bare = parse_query("@thread").unwrap();
    assert_eq!(bare.anchor.as_deref(), Some("thread"));
    assert!(bare.segments.is_empty());
}

#[test]
fn parses_every_operator() {
    let query = parse_query("/parts(a=1,b!=2,c<3,d<=4,e>5,f>=6)").unwrap();
    let ops: Vec<FilterOp> = query.segments[0]
        .filters
        .iter()
        .map(|filter| filter.op)
        .collect();
    assert_eq!(
        ops,
        vec![
            FilterOp::Eq,
            FilterOp::Ne,
            FilterOp::Lt,
            FilterOp::Le,
            FilterOp::Gt,
            FilterOp::Ge,
        ]
    );
}

#[test]
fn printing_is_canonical() {
    for input in [
        "/",
        "/parts",
        "/parts(label=alpha)[0]",
        "/parts(size>=2)[last]",
        "@frame/scopes[0]",
        "@session",
    ] {
        let query = parse_query(input).unwrap();
        assert_eq!(query.to_string(), input);
        assert_eq!(parse_query(&query.to_string()).unwrap(), query);
    }
}

#[test]
fn rejects_malformed_input() {
    assert_eq!(parse_query(""), Err(QueryError::EmptyInput));
    assert!(matches!(
        parse_query("parts"),
        Err(QueryError::UnexpectedToken { .. })
    ));
    assert!(matches!(
        parse_query("/parts(label)"),
        Err(QueryError::UnexpectedToken { .. })
    ));
    assert!(matches!(
        parse_query("/parts(label!alpha)"),
        Err(QueryError::UnexpectedToken { .. })
    ));
    assert!(matches!(
        parse_query("/parts[nope]"),
        Err(QueryError::InvalidNumber { .. })
    ));
    assert!(matches!(
        parse_query("/parts[0] trailing"),
        Err(QueryError::UnexpectedToken { .. })
    ));
}

#[test]
fn resolves_filters_and_selectors() {
    let store = Store::new();
    let (root, parts) = fixture(&store);
    let alphas = query_many(&store, root.id(), None, "/parts(label=alpha)").unwrap();
    assert_eq!(alphas, vec![parts[0].id(), parts[2].id()]);
    let second = query_one(&store, root.id(), None, "/parts(label=alpha)[1]").unwrap();
    assert_eq!(second, parts[2].id());
    let last = query_one(&store, root.id(), None, "/parts[last]").unwrap();
    assert_eq!(last, parts[2].id());
    let nested = query_one(&store, root.id(), None, "/parts(label=beta)[0]/parts[0]").unwrap();
    assert_eq!(nested, parts[3].id());
}

#[test]
fn ordering_filters_are_numeric_only() {
    let store = Store::new();
    let (root, parts) = fixture(&store);
    let big = query_many(&store, root.id(), None, "/parts(size>=2)").unwrap();
    assert_eq!(big, vec![parts[1].id(), parts[2].id()]);
    // Ordering against a string literal matches nothing.
    let none = query_many(&store, root.id(), None, "/parts(label>alpha)").unwrap();
    assert!(none.is_empty());
}

#[test]
fn query_one_reports_cardinality() {
    let store = Store::new();
    let (root, _) = fixture(&store);
    assert_eq!(
        query_one(&store, root.id(), None, "/parts(label=missing)"),
        Err(QueryError::NotFound)
    );
    assert_eq!(
        query_one(&store, root.id(), None, "/parts(label=alpha)"),
        Err(QueryError::Ambiguous { count: 2 })
    );
}

#[test]
fn bare_root_query_returns_the_root() {
    let store = Store::new();
    let (root, _) = fixture(&store);
    assert_eq!(
        query_many(&store, root.id(), None, "/").unwrap(),
        vec![root.id()]
    );
}

#[test]
fn unknown_edge_yields_empty_not_error() {
    let store = Store::new();
    let (root, _) = fixture(&store);
    assert!(query_many(&store, root.id(), None, "/nonsense").unwrap().is_empty());
}

#[test]
fn anchors_resolve_from_the_focused_url() {
    let store = Store::new();
    let (root, parts) = fixture(&store);
    let focused = "/parts(label=beta)[0]/parts[0]";
    let part = resolve_anchor(&store, root.id(), Some(focused), "part").unwrap();
    assert_eq!(part, parts[3].id());
    // The anchor picks the entity reached by the last matching segment.
    let anchored = query_many(&store, root.id(), Some("/parts[1]"), "@part/parts").unwrap();
    assert_eq!(anchored, vec![parts[3].id()]);
}

#[test]
fn anchor_without_focus_is_unresolved() {
    let store = Store::new();
    let (root, _) = fixture(&store);
    assert_eq!(
        resolve_anchor(&store, root.id(), None, "part"),
        Err(QueryError::UnresolvedAnchor {
            anchor: "part".to_owned()
        })
    );
}
