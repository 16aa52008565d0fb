// crates/stackscope-dap/src/breakpoint.rs
// ============================================================================
// Module: Breakpoint Entities
// Description: Debugger-owned breakpoints and per-session bindings.
// Purpose: Track requested breakpoints, adapter-reported binding state, and
//          the derived display state.
// Dependencies: stackscope-graph, stackscope-reactive
// ============================================================================

//! ## Overview
//! A [`Breakpoint`] is what the user asked for: a (source, line) pair with
//! optional condition, hit condition, and log message. A
//! [`BreakpointBinding`] is what one session's adapter made of it: verified
//! or not, possibly moved to an adjusted line, possibly hit at the current
//! stop. Display state is a pure derivation over the bindings:
//! `disabled`, then `hit`, then `adjusted`, then `verified`, then
//! `unverified`, first match wins.
//!
//! Invariants:
//! - One binding per (breakpoint, session) pair.
//! - Pick rollups (`hit_binding`, `verified_binding`) break ties by
//!   insertion order.

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
use stackscope_reactive::Memo;
use stackscope_reactive::Scope as ReactiveScope;
use stackscope_reactive::Signal;

/// Derived display state of a breakpoint, for UI consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    /// The breakpoint is disabled by the user.
    Disabled,
    /// Some session stopped on this breakpoint at the current stop.
    Hit,
    /// Verified, but the adapter moved it to a different line.
    Adjusted,
    /// Verified at the requested line.
    Verified,
    /// No session could verify the breakpoint.
    Unverified,
}

impl DisplayState {
    /// Returns a stable label for filters and display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Hit => "hit",
            Self::Adjusted => "adjusted",
            Self::Verified => "verified",
            Self::Unverified => "unverified",
        }
    }
}

/// A user-requested breakpoint, debugger-owned.
pub struct Breakpoint {
    /// Arena identity.
    id: EntityId,
    /// Reactive scope owning the entity's signals.
    scope: ReactiveScope,
    /// Lifecycle pair.
    lifecycle: Lifecycle,
    /// One-based requested line.
    pub line: Signal<i64>,
    /// One-based requested column.
    pub column: Signal<Option<i64>>,
    /// Condition expression.
    pub condition: Signal<Option<String>>,
    /// Hit-count condition.
    pub hit_condition: Signal<Option<String>>,
    /// Log message for log points.
    pub log_message: Signal<Option<String>>,
    /// Whether the breakpoint participates in synchronisation.
    pub enabled: Signal<bool>,
    /// The source the breakpoint lives in. Reference edge.
    pub source: EdgeSlot,
    /// Per-session bindings. Owning edge.
    pub bindings: Collection,
    /// Rollup: first binding with `hit=true`.
    pub hit_binding: Memo<Option<EntityId>>,
    /// Rollup: first binding with `verified=true`.
    pub verified_binding: Memo<Option<EntityId>>,
    /// Rollup: derived display state.
    pub display_state: Memo<DisplayState>,
}

impl Breakpoint {
    /// Creates an enabled breakpoint at `line`.
    pub(crate) fn create(store: &Store, line: i64, column: Option<i64>) -> Rc<Self> {
        store.insert(|id| {
            let scope = ReactiveScope::new();
            scope.with(|| {
                let line = Signal::new(line);
                let enabled = Signal::new(true);
                let bindings = Collection::new(store, "bindings", EdgeKind::Strong, Some(id));
                let hit_binding = bindings.first_where(|node| {
                    downcast_binding(node).is_some_and(|binding| binding.hit.get())
                });
                let verified_binding = bindings.first_where(|node| {
                    downcast_binding(node).is_some_and(|binding| binding.verified.get())
                });
                let display_state = {
                    let enabled = enabled.clone();
                    let requested_line = line.clone();
                    let bindings = bindings.clone();
                    Memo::new(move || {
                        derive_display_state(&enabled, &requested_line, &bindings)
                    })
                };
                Rc::new(Self {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    line,
                    column: Signal::new(column),
                    condition: Signal::new(None),
                    hit_condition: Signal::new(None),
                    log_message: Signal::new(None),
                    enabled,
                    source: EdgeSlot::new(store, "source", EdgeKind::Weak),
                    bindings,
                    hit_binding,
                    verified_binding,
                    display_state,
                })
            })
        })
    }
}

/// Computes the display state from the breakpoint's signals and bindings.
fn derive_display_state(
    enabled: &Signal<bool>,
    requested_line: &Signal<i64>,
    bindings: &Collection,
) -> DisplayState {
    if !enabled.get() {
        return DisplayState::Disabled;
    }
    let members: Vec<Rc<BreakpointBinding>> = bindings
        .ids()
        .into_iter()
        .filter_map(|id| bindings.resolve(id))
        .filter_map(|node| downcast_binding(&node))
        .collect();
    if members.iter().any(|binding| binding.hit.get()) {
        return DisplayState::Hit;
    }
    let requested = requested_line.get();
    let verified: Vec<&Rc<BreakpointBinding>> = members
        .iter()
        .filter(|binding| binding.verified.get())
        .collect();
    if verified.is_empty() {
        return DisplayState::Unverified;
    }
    let adjusted = verified.iter().any(|binding| {
        binding
            .actual_line
            .get()
            .is_some_and(|actual| actual != requested)
    });
    if adjusted {
        DisplayState::Adjusted
    } else {
        DisplayState::Verified
    }
}

/// Downcasts a node to a breakpoint binding.
fn downcast_binding(node: &Rc<dyn Node>) -> Option<Rc<BreakpointBinding>> {
    Rc::clone(node).as_any().downcast::<BreakpointBinding>().ok()
}

impl Node for Breakpoint {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "breakpoint"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn scope(&self) -> ReactiveScope {
        self.scope
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "line" => Some(json!(self.line.get_untracked())),
            "column" => self.column.get_untracked().map(|column| json!(column)),
            "enabled" => Some(json!(self.enabled.get_untracked())),
            "state" => Some(json!(self.display_state.get_untracked().label())),
            "current" => Some(json!(self.lifecycle.current_signal().get_untracked())),
            "alive" => Some(json!(self.lifecycle.alive_signal().get_untracked())),
            _ => None,
        }
    }

    fn edges(&self) -> Vec<EdgeHandle> {
        vec![
            EdgeHandle::One(self.source.clone()),
            EdgeHandle::Many(self.bindings.clone()),
        ]
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// What one session's adapter made of a breakpoint.
pub struct BreakpointBinding {
    /// Arena identity.
    id: EntityId,
    /// Reactive scope owning the entity's signals.
    scope: ReactiveScope,
    /// Lifecycle pair.
    lifecycle: Lifecycle,
    /// Whether the adapter verified the breakpoint.
    pub verified: Signal<bool>,
    /// Whether this session is currently stopped on the breakpoint.
    pub hit: Signal<bool>,
    /// Line the adapter actually bound to.
    pub actual_line: Signal<Option<i64>>,
    /// Column the adapter actually bound to.
    pub actual_column: Signal<Option<i64>>,
    /// Adapter-scoped breakpoint identifier, for `hitBreakpointIds`.
    pub adapter_id: Signal<Option<i64>>,
    /// Per-session condition override.
    pub condition_override: Signal<Option<String>>,
    /// Per-session hit-condition override.
    pub hit_condition_override: Signal<Option<String>>,
    /// Per-session log-message override.
    pub log_message_override: Signal<Option<String>>,
    /// Per-session enablement override.
    pub enabled_override: Signal<Option<bool>>,
    /// The breakpoint being bound. Reference edge.
    pub breakpoint: EdgeSlot,
    /// The session's view of the source. Reference edge.
    pub source_binding: EdgeSlot,
    /// The owning session. Reference edge.
    pub session: EdgeSlot,
}

impl BreakpointBinding {
    /// Creates an unverified binding.
    pub(crate) fn create(store: &Store) -> Rc<Self> {
        store.insert(|id| {
            let scope = ReactiveScope::new();
            scope.with(|| {
                Rc::new(Self {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    verified: Signal::new(false),
                    hit: Signal::new(false),
                    actual_line: Signal::new(None),
                    actual_column: Signal::new(None),
                    adapter_id: Signal::new(None),
                    condition_override: Signal::new(None),
                    hit_condition_override: Signal::new(None),
                    log_message_override: Signal::new(None),
                    enabled_override: Signal::new(None),
                    breakpoint: EdgeSlot::new(store, "breakpoint", EdgeKind::Weak),
                    source_binding: EdgeSlot::new(store, "source_binding", EdgeKind::Weak),
                    session: EdgeSlot::new(store, "session", EdgeKind::Weak),
                })
            })
        })
    }
}

impl Node for BreakpointBinding {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "breakpoint_binding"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn scope(&self) -> ReactiveScope {
        self.scope
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "verified" => Some(json!(self.verified.get_untracked())),
            "hit" => Some(json!(self.hit.get_untracked())),
            "line" => self.actual_line.get_untracked().map(|line| json!(line)),
            "current" => Some(json!(self.lifecycle.current_signal().get_untracked())),
            "alive" => Some(json!(self.lifecycle.alive_signal().get_untracked())),
            _ => None,
        }
    }

    fn edges(&self) -> Vec<EdgeHandle> {
        vec![
            EdgeHandle::One(self.breakpoint.clone()),
            EdgeHandle::One(self.source_binding.clone()),
            EdgeHandle::One(self.session.clone()),
        ]
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
