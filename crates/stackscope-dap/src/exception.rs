// crates/stackscope-dap/src/exception.rs
// ============================================================================
// Module: Exception Filter Entities
// Description: Debugger-wide exception filters and per-session overrides.
// Purpose: Track adapter-offered exception filters, their per-session
//          enablement, and the effective enabled set.
// Dependencies: stackscope-graph, stackscope-reactive, stackscope-wire
// ============================================================================

//! ## Overview
//! Adapters advertise exception filters in their capabilities. Filters are
//! debugger-scoped and deduplicated by `filter_id`; a per-session
//! [`ExceptionFilterBinding`] overrides the default enablement and carries
//! an optional condition. The effective enabled set of a session is the
//! filter default overridden by its binding.

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
use stackscope_wire::ExceptionBreakpointsFilter;

/// One exception filter offered by an adapter, debugger-scoped.
pub struct ExceptionFilter {
    /// Arena identity.
    id: EntityId,
    /// Reactive scope owning the entity's signals.
    scope: ReactiveScope,
    /// Lifecycle pair.
    lifecycle: Lifecycle,
    /// Stable filter identifier.
    pub filter_id: String,
    /// Human-readable label.
    pub label: Signal<String>,
    /// Whether the filter accepts a condition expression.
    pub supports_condition: Signal<bool>,
    /// Whether the filter is enabled when no binding overrides it.
    pub default_enabled: Signal<bool>,
    /// Per-session bindings. Owning edge.
    pub bindings: Collection,
}

impl ExceptionFilter {
    /// Creates a filter entity from its wire description.
    pub(crate) fn create(store: &Store, wire: &ExceptionBreakpointsFilter) -> Rc<Self> {
        let wire = wire.clone();
        store.insert(|id| {
            let scope = ReactiveScope::new();
            scope.with(|| {
                Rc::new(Self {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    filter_id: wire.filter.clone(),
                    label: Signal::new(wire.label.clone()),
                    supports_condition: Signal::new(wire.supports_condition),
                    default_enabled: Signal::new(wire.default_enabled),
                    bindings: Collection::new(store, "bindings", EdgeKind::Strong, Some(id)),
                })
            })
        })
    }
}

impl Node for ExceptionFilter {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "exception_filter"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn scope(&self) -> ReactiveScope {
        self.scope
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "filter" => Some(json!(self.filter_id)),
            "label" => Some(json!(self.label.get_untracked())),
            "enabled" => Some(json!(self.default_enabled.get_untracked())),
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

/// Per-session enablement override for one exception filter.
pub struct ExceptionFilterBinding {
    /// Arena identity.
    id: EntityId,
    /// Reactive scope owning the entity's signals.
    scope: ReactiveScope,
    /// Lifecycle pair.
    lifecycle: Lifecycle,
    /// Enablement override; `None` falls back to the filter default.
    pub enabled_override: Signal<Option<bool>>,
    /// Condition expression, when the filter supports one.
    pub condition: Signal<Option<String>>,
    /// The session this binding belongs to. Reference edge.
    pub session: EdgeSlot,
    /// The filter being overridden. Reference edge.
    pub filter: EdgeSlot,
}

impl ExceptionFilterBinding {
    /// Creates a binding with no override.
    pub(crate) fn create(store: &Store) -> Rc<Self> {
        store.insert(|id| {
            let scope = ReactiveScope::new();
            scope.with(|| {
                Rc::new(Self {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    enabled_override: Signal::new(None),
                    condition: Signal::new(None),
                    session: EdgeSlot::new(store, "session", EdgeKind::Weak),
                    filter: EdgeSlot::new(store, "filter", EdgeKind::Weak),
                })
            })
        })
    }
}

impl Node for ExceptionFilterBinding {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "exception_filter_binding"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn scope(&self) -> ReactiveScope {
        self.scope
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "enabled" => self
                .enabled_override
                .get_untracked()
                .map(|enabled| json!(enabled)),
            "current" => Some(json!(self.lifecycle.current_signal().get_untracked())),
            "alive" => Some(json!(self.lifecycle.alive_signal().get_untracked())),
            _ => None,
        }
    }

    fn edges(&self) -> Vec<EdgeHandle> {
        vec![
            EdgeHandle::One(self.session.clone()),
            EdgeHandle::One(self.filter.clone()),
        ]
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
