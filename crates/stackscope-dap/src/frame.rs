// crates/stackscope-dap/src/frame.rs
// ============================================================================
// Module: Frame and Scope Entities
// Description: Stack frames and their variable scopes.
// Purpose: Track per-frame position data and lazily fetched scopes.
// Dependencies: stackscope-graph, stackscope-reactive
// ============================================================================

//! ## Overview
//! A [`Frame`] mirrors one frame of a stop-time stack; a [`VariableScope`]
//! is one of its variable containers (`Locals`, `Globals`, registers).
//! Scopes and variables are fetched lazily on first access; frames inherit
//! `current` from their stack through the staleness cascade.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use serde_json::Value;
use serde_json::json;
use stackscope_graph::Collection;
use stackscope_graph::EdgeHandle;
use stackscope_graph::EdgeKind;
use stackscope_graph::EdgeSlot;
use stackscope_graph::EntityId;
use stackscope_graph::IndexKey;
use stackscope_graph::Lifecycle;
use stackscope_graph::Node;
use stackscope_graph::Store;
use stackscope_reactive::Memo;
use stackscope_reactive::Scope as ReactiveScope;
use stackscope_reactive::Signal;

use crate::thread::Stack;
use crate::thread::Thread;
use crate::variable::Variable;

/// One frame of a stop-time stack.
pub struct Frame {
    /// Arena identity.
    id: EntityId,
    /// Reactive scope owning the entity's signals.
    scope: ReactiveScope,
    /// Lifecycle pair.
    lifecycle: Lifecycle,
    /// Adapter-scoped frame identifier.
    pub frame_id: Signal<i64>,
    /// Position within the stack; `0` is the top frame.
    pub index: Signal<i64>,
    /// Display name, usually the function name.
    pub name: Signal<String>,
    /// One-based line.
    pub line: Signal<i64>,
    /// One-based column.
    pub column: Signal<i64>,
    /// Presentation hint reported by the adapter.
    pub presentation_hint: Signal<Option<String>>,
    /// Owning stack. Reference edge.
    pub stack: EdgeSlot,
    /// Source of the frame. Reference edge.
    pub source: EdgeSlot,
    /// Variable scopes, most specific first. Owning edge.
    pub scopes: Collection,
    /// Rollup: the owning session, hopped over `stack -> thread ->
    /// session`.
    pub session: Memo<Option<EntityId>>,
    /// Whether scopes were fetched for this frame already.
    pub(crate) scopes_fetched: Cell<bool>,
}

impl Frame {
    /// Creates a frame at `index` within its stack.
    pub(crate) fn create(
        store: &Store,
        frame_id: i64,
        index: i64,
        name: String,
        line: i64,
        column: i64,
        presentation_hint: Option<String>,
    ) -> Rc<Self> {
        store.insert(|id| {
            let scope = ReactiveScope::new();
            scope.with(|| {
                let stack = EdgeSlot::new(store, "stack", EdgeKind::Weak);
                let scopes = Collection::new(store, "scopes", EdgeKind::Strong, Some(id));
                let session = {
                    let stack = stack.clone();
                    let scopes = scopes.clone();
                    Memo::new(move || {
                        let store = scopes.store_handle()?;
                        let stack = store.get_as::<Stack>(stack.get()?)?;
                        let thread = store.get_as::<Thread>(stack.thread.get()?)?;
                        thread.session.get()
                    })
                };
                Rc::new(Self {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    frame_id: Signal::new(frame_id),
                    index: Signal::new(index),
                    name: Signal::new(name),
                    line: Signal::new(line),
                    column: Signal::new(column),
                    presentation_hint: Signal::new(presentation_hint),
                    stack,
                    source: EdgeSlot::new(store, "source", EdgeKind::Weak),
                    scopes,
                    session,
                    scopes_fetched: Cell::new(false),
                })
            })
        })
    }
}

impl Node for Frame {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "frame"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn scope(&self) -> ReactiveScope {
        self.scope
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "index" => Some(json!(self.index.get_untracked())),
            "name" => Some(json!(self.name.get_untracked())),
            "line" => Some(json!(self.line.get_untracked())),
            "column" => Some(json!(self.column.get_untracked())),
            "current" => Some(json!(self.lifecycle.current_signal().get_untracked())),
            "alive" => Some(json!(self.lifecycle.alive_signal().get_untracked())),
            _ => None,
        }
    }

    fn edges(&self) -> Vec<EdgeHandle> {
        vec![
            EdgeHandle::One(self.stack.clone()),
            EdgeHandle::One(self.source.clone()),
            EdgeHandle::Many(self.scopes.clone()),
        ]
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// One variable container of a frame.
pub struct VariableScope {
    /// Arena identity.
    id: EntityId,
    /// Reactive scope owning the entity's signals.
    scope: ReactiveScope,
    /// Lifecycle pair.
    lifecycle: Lifecycle,
    /// Display name, such as `Locals`.
    pub name: Signal<String>,
    /// Reference for fetching the contained variables.
    pub variables_reference: Signal<i64>,
    /// Whether the adapter flagged the fetch as expensive.
    pub expensive: Signal<bool>,
    /// Owning frame. Reference edge.
    pub frame: EdgeSlot,
    /// Contained variables. Owning edge.
    pub variables: Collection,
    /// Whether variables were fetched for this scope already.
    pub(crate) variables_fetched: Cell<bool>,
}

impl VariableScope {
    /// Creates a scope container.
    pub(crate) fn create(
        store: &Store,
        name: String,
        variables_reference: i64,
        expensive: bool,
    ) -> Rc<Self> {
        store.insert(|id| {
            let scope = ReactiveScope::new();
            scope.with(|| {
                Rc::new(Self {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    name: Signal::new(name),
                    variables_reference: Signal::new(variables_reference),
                    expensive: Signal::new(expensive),
                    frame: EdgeSlot::new(store, "frame", EdgeKind::Weak),
                    variables: Collection::new(store, "variables", EdgeKind::Strong, Some(id))
                        .with_index("name", |node| {
                            let variable =
                                Rc::clone(node).as_any().downcast::<Variable>().ok()?;
                            Some(IndexKey::Str(variable.name.get()))
                        }),
                    variables_fetched: Cell::new(false),
                })
            })
        })
    }
}

impl Node for VariableScope {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "scope"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn scope(&self) -> ReactiveScope {
        self.scope
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(json!(self.name.get_untracked())),
            "expensive" => Some(json!(self.expensive.get_untracked())),
            "current" => Some(json!(self.lifecycle.current_signal().get_untracked())),
            "alive" => Some(json!(self.lifecycle.alive_signal().get_untracked())),
            _ => None,
        }
    }

    fn edges(&self) -> Vec<EdgeHandle> {
        vec![
            EdgeHandle::One(self.frame.clone()),
            EdgeHandle::Many(self.variables.clone()),
        ]
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
