// crates/stackscope-dap/src/thread.rs
// ============================================================================
// Module: Thread and Stack Entities
// Description: Per-session threads and their stop-time stacks.
// Purpose: Track thread execution state and the succession of stacks, where
//          only the newest stack is current.
// Dependencies: stackscope-graph, stackscope-reactive
// ============================================================================

//! ## Overview
//! A [`Thread`] mirrors one adapter thread. Every stop produces a new
//! [`Stack`]; the previous current stack and its descendants are
//! stale-marked, never disposed, so historical stops stay queryable. The
//! `current_stack` rollup picks the unique stack with `current=true`.

use std::any::Any;
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

use crate::frame::Frame;

/// Execution state of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// The thread is executing.
    Running,
    /// The thread is stopped and inspectable.
    Stopped,
    /// The thread is gone.
    Exited,
}

impl ThreadState {
    /// Returns a stable label for filters and display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Exited => "exited",
        }
    }
}

/// One adapter thread.
pub struct Thread {
    /// Arena identity.
    id: EntityId,
    /// Reactive scope owning the entity's signals.
    scope: ReactiveScope,
    /// Lifecycle pair.
    lifecycle: Lifecycle,
    /// Adapter-scoped thread identifier.
    pub thread_id: Signal<i64>,
    /// Display name.
    pub name: Signal<String>,
    /// Execution state.
    pub state: Signal<ThreadState>,
    /// Reason of the most recent stop.
    pub stop_reason: Signal<Option<String>>,
    /// Owning session. Reference edge.
    pub session: EdgeSlot,
    /// Stacks in stop order. Owning edge.
    pub stacks: Collection,
    /// Rollup: the unique stack with `current=true`.
    pub current_stack: Memo<Option<EntityId>>,
}

impl Thread {
    /// Creates a running thread.
    pub(crate) fn create(store: &Store, thread_id: i64, name: String) -> Rc<Self> {
        store.insert(|id| {
            let scope = ReactiveScope::new();
            scope.with(|| {
                let stacks = Collection::new(store, "stacks", EdgeKind::Strong, Some(id));
                let current_stack =
                    stacks.first_where(|node| node.lifecycle().is_current());
                Rc::new(Self {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    thread_id: Signal::new(thread_id),
                    name: Signal::new(name),
                    state: Signal::new(ThreadState::Running),
                    stop_reason: Signal::new(None),
                    session: EdgeSlot::new(store, "session", EdgeKind::Weak),
                    stacks,
                    current_stack,
                })
            })
        })
    }
}

impl Node for Thread {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "thread"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn scope(&self) -> ReactiveScope {
        self.scope
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(json!(self.thread_id.get_untracked())),
            "name" => Some(json!(self.name.get_untracked())),
            "state" => Some(json!(self.state.get_untracked().label())),
            "reason" => self.stop_reason.get_untracked().map(|reason| json!(reason)),
            "current" => Some(json!(self.lifecycle.current_signal().get_untracked())),
            "alive" => Some(json!(self.lifecycle.alive_signal().get_untracked())),
            _ => None,
        }
    }

    fn edges(&self) -> Vec<EdgeHandle> {
        vec![
            EdgeHandle::One(self.session.clone()),
            EdgeHandle::Many(self.stacks.clone()),
        ]
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// One stop-time stack of a thread.
pub struct Stack {
    /// Arena identity.
    id: EntityId,
    /// Reactive scope owning the entity's signals.
    scope: ReactiveScope,
    /// Lifecycle pair.
    lifecycle: Lifecycle,
    /// Stop sequence number within the thread.
    pub index: Signal<i64>,
    /// Stop reason that produced this stack.
    pub reason: Signal<String>,
    /// Owning thread. Reference edge.
    pub thread: EdgeSlot,
    /// Frames, top first. Owning edge.
    pub frames: Collection,
}

impl Stack {
    /// Creates a stack for one stop.
    pub(crate) fn create(store: &Store, index: i64, reason: String) -> Rc<Self> {
        store.insert(|id| {
            let scope = ReactiveScope::new();
            scope.with(|| {
                Rc::new(Self {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    index: Signal::new(index),
                    reason: Signal::new(reason),
                    thread: EdgeSlot::new(store, "thread", EdgeKind::Weak),
                    frames: Collection::new(store, "frames", EdgeKind::Strong, Some(id))
                        .with_index("line", |node| {
                            let frame = Rc::clone(node).as_any().downcast::<Frame>().ok()?;
                            Some(IndexKey::Int(frame.line.get()))
                        }),
                })
            })
        })
    }
}

impl Node for Stack {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "stack"
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
            "reason" => Some(json!(self.reason.get_untracked())),
            "current" => Some(json!(self.lifecycle.current_signal().get_untracked())),
            "alive" => Some(json!(self.lifecycle.alive_signal().get_untracked())),
            _ => None,
        }
    }

    fn edges(&self) -> Vec<EdgeHandle> {
        vec![
            EdgeHandle::One(self.thread.clone()),
            EdgeHandle::Many(self.frames.clone()),
        ]
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
