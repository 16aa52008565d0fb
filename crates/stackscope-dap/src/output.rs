// crates/stackscope-dap/src/output.rs
// ============================================================================
// Module: Output Entities
// Description: Ordered adapter output lines owned by their session.
// Purpose: Record `output` events with category and source correlation.
// Dependencies: stackscope-graph, stackscope-reactive
// ============================================================================

//! ## Overview
//! Outputs are session-owned and ordered by arrival; the owning collection's
//! insertion order is the display order. They are disposed with their
//! session and survive stack expiry in between.

use std::any::Any;
use std::rc::Rc;

use serde_json::Value;
use serde_json::json;
use stackscope_graph::EdgeHandle;
use stackscope_graph::EdgeKind;
use stackscope_graph::EdgeSlot;
use stackscope_graph::EntityId;
use stackscope_graph::Lifecycle;
use stackscope_graph::Node;
use stackscope_graph::Store;
use stackscope_reactive::Scope as ReactiveScope;
use stackscope_reactive::Signal;

/// One output line from the adapter or debuggee.
pub struct Output {
    /// Arena identity.
    id: EntityId,
    /// Reactive scope owning the entity's signals.
    scope: ReactiveScope,
    /// Lifecycle pair.
    lifecycle: Lifecycle,
    /// Output category: `stdout`, `stderr`, `console`, `telemetry`, or an
    /// adapter-specific label.
    pub category: Signal<String>,
    /// Output text.
    pub text: Signal<String>,
    /// One-based line in the referenced source, when known.
    pub line: Signal<Option<i64>>,
    /// Owning session. Reference edge.
    pub session: EdgeSlot,
    /// Source the output refers to. Reference edge.
    pub source: EdgeSlot,
}

impl Output {
    /// Creates an output entity.
    pub(crate) fn create(
        store: &Store,
        category: String,
        text: String,
        line: Option<i64>,
    ) -> Rc<Self> {
        store.insert(|id| {
            let scope = ReactiveScope::new();
            scope.with(|| {
                Rc::new(Self {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    category: Signal::new(category),
                    text: Signal::new(text),
                    line: Signal::new(line),
                    session: EdgeSlot::new(store, "session", EdgeKind::Weak),
                    source: EdgeSlot::new(store, "source", EdgeKind::Weak),
                })
            })
        })
    }
}

impl Node for Output {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "output"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn scope(&self) -> ReactiveScope {
        self.scope
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "category" => Some(json!(self.category.get_untracked())),
            "text" => Some(json!(self.text.get_untracked())),
            "line" => self.line.get_untracked().map(|line| json!(line)),
            "current" => Some(json!(self.lifecycle.current_signal().get_untracked())),
            "alive" => Some(json!(self.lifecycle.alive_signal().get_untracked())),
            _ => None,
        }
    }

    fn edges(&self) -> Vec<EdgeHandle> {
        vec![
            EdgeHandle::One(self.session.clone()),
            EdgeHandle::One(self.source.clone()),
        ]
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
