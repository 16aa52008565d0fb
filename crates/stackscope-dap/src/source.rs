// crates/stackscope-dap/src/source.rs
// ============================================================================
// Module: Source Entities
// Description: Debugger-wide sources and per-session source bindings.
// Purpose: Deduplicate adapter-reported sources by correlation key and track
//          each session's view of them.
// Dependencies: stackscope-graph, stackscope-reactive, stackscope-wire,
//               crate::correlation
// ============================================================================

//! ## Overview
//! A [`Source`] is the debugger-wide identity of a file or generated source,
//! keyed by its correlation key. A [`SourceBinding`] is the per-(session,
//! source) projection carrying the session-specific `sourceReference`.
//!
//! Invariants:
//! - One `Source` per correlation key, across all sessions.
//! - One `SourceBinding` per (session, source) pair.

use std::any::Any;
use std::rc::Rc;

use serde_json::Value;
use serde_json::json;
use stackscope_graph::Collection;
use stackscope_graph::EdgeHandle;
use stackscope_graph::EdgeKind;
use stackscope_graph::EdgeSlot;
use stackscope_graph::EntityId;
use stackscope_graph::Lifecycle;
use stackscope_graph::Node;
use stackscope_graph::Store;
use stackscope_reactive::Scope as ReactiveScope;
use stackscope_reactive::Signal;
use stackscope_wire::Source as WireSource;

/// Debugger-wide source identity.
pub struct Source {
    /// Arena identity.
    id: EntityId,
    /// Reactive scope owning the entity's signals.
    scope: ReactiveScope,
    /// Lifecycle pair.
    lifecycle: Lifecycle,
    /// Correlation key. Immutable for the entity's lifetime.
    pub key: String,
    /// Display name, filled from the first sighting that carries one.
    pub name: Signal<Option<String>>,
    /// Filesystem path, when the source exists on disk.
    pub path: Signal<Option<String>>,
    /// Origin label reported by the adapter.
    pub origin: Signal<Option<String>>,
    /// Bindings of this source across sessions. Reference edge.
    pub bindings: Collection,
}

impl Source {
    /// Creates a source entity from its first wire sighting.
    pub(crate) fn create(store: &Store, key: String, wire: &WireSource) -> Rc<Self> {
        let wire = wire.clone();
        store.insert(|id| {
            let scope = ReactiveScope::new();
            scope.with(|| {
                Rc::new(Self {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    key,
                    name: Signal::new(wire.name.clone()),
                    path: Signal::new(wire.path.clone()),
                    origin: Signal::new(wire.origin.clone()),
                    bindings: Collection::new(store, "bindings", EdgeKind::Weak, Some(id)),
                })
            })
        })
    }

    /// Merges attributes from a later sighting without clobbering known
    /// values.
    pub(crate) fn absorb(&self, wire: &WireSource) {
        if self.name.get_untracked().is_none() {
            self.name.set(wire.name.clone());
        }
        if self.path.get_untracked().is_none() {
            self.path.set(wire.path.clone());
        }
        if self.origin.get_untracked().is_none() {
            self.origin.set(wire.origin.clone());
        }
    }

    /// Builds the wire form of this source for requests, using the
    /// session-specific reference when the source has no path.
    #[must_use]
    pub fn to_wire(&self, source_reference: Option<i64>) -> WireSource {
        WireSource {
            name: self.name.get_untracked(),
            path: self.path.get_untracked(),
            source_reference: if self.path.get_untracked().is_some() {
                None
            } else {
                source_reference
            },
            ..WireSource::default()
        }
    }
}

impl Node for Source {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "source"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn scope(&self) -> ReactiveScope {
        self.scope
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "key" => Some(json!(self.key)),
            "name" => self.name.get_untracked().map(|name| json!(name)),
            "path" => self.path.get_untracked().map(|path| json!(path)),
            "origin" => self.origin.get_untracked().map(|origin| json!(origin)),
            "current" => Some(json!(self.lifecycle.current_signal().get_untracked())),
            "alive" => Some(json!(self.lifecycle.alive_signal().get_untracked())),
            _ => None,
        }
    }

    fn edges(&self) -> Vec<EdgeHandle> {
        vec![EdgeHandle::Many(self.bindings.clone())]
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// Per-(session, source) projection.
pub struct SourceBinding {
    /// Arena identity.
    id: EntityId,
    /// Reactive scope owning the entity's signals.
    scope: ReactiveScope,
    /// Lifecycle pair.
    lifecycle: Lifecycle,
    /// Session-scoped source reference, for pathless sources.
    pub source_reference: Signal<Option<i64>>,
    /// Owning session. Reference edge.
    pub session: EdgeSlot,
    /// The debugger-wide source. Reference edge.
    pub source: EdgeSlot,
    /// Breakpoint bindings tied to this source view. Staleness edge.
    pub breakpoint_bindings: Collection,
}

impl SourceBinding {
    /// Creates a binding for one (session, source) pair.
    pub(crate) fn create(store: &Store, source_reference: Option<i64>) -> Rc<Self> {
        store.insert(|id| {
            let scope = ReactiveScope::new();
            scope.with(|| {
                Rc::new(Self {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    source_reference: Signal::new(source_reference),
                    session: EdgeSlot::new(store, "session", EdgeKind::Weak),
                    source: EdgeSlot::new(store, "source", EdgeKind::Weak),
                    breakpoint_bindings: Collection::new(
                        store,
                        "breakpoint_bindings",
                        EdgeKind::Lifecycle,
                        Some(id),
                    ),
                })
            })
        })
    }
}

impl Node for SourceBinding {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "source_binding"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn scope(&self) -> ReactiveScope {
        self.scope
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "reference" => self
                .source_reference
                .get_untracked()
                .map(|reference| json!(reference)),
            "current" => Some(json!(self.lifecycle.current_signal().get_untracked())),
            "alive" => Some(json!(self.lifecycle.alive_signal().get_untracked())),
            _ => None,
        }
    }

    fn edges(&self) -> Vec<EdgeHandle> {
        vec![
            EdgeHandle::One(self.session.clone()),
            EdgeHandle::One(self.source.clone()),
            EdgeHandle::Many(self.breakpoint_bindings.clone()),
        ]
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
