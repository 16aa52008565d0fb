// crates/stackscope-dap/src/config.rs
// ============================================================================
// Module: Config Entities
// Description: Session groups launched from one debug action.
// Purpose: Track the sessions a launch action produced, derive the group
//          state, and coordinate stop-all shutdown.
// Dependencies: stackscope-graph, stackscope-reactive, crate::session
// ============================================================================

//! ## Overview
//! A [`Config`] groups every session spawned by one user action and stores
//! the launch specifications so the action can be restarted. Derived state:
//! the group is `terminated` once every target (leaf session) has
//! terminated. With `stop_all` set, the first root session to terminate
//! takes the remaining sessions down with it.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use serde_json::json;
use stackscope_graph::Collection;
use stackscope_graph::EdgeHandle;
use stackscope_graph::EdgeKind;
use stackscope_graph::EntityId;
use stackscope_graph::Lifecycle;
use stackscope_graph::Node;
use stackscope_graph::Store;
use stackscope_reactive::Effect;
use stackscope_reactive::Memo;
use stackscope_reactive::Scope as ReactiveScope;
use stackscope_reactive::Signal;
use stackscope_reactive::untracked;

use crate::session::LaunchSpec;
use crate::session::Session;
use crate::session::SessionState;

/// Group lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigState {
    /// At least one target is still live, or nothing was started yet.
    Active,
    /// Every target has terminated.
    Terminated,
}

impl ConfigState {
    /// Returns a stable label for filters and display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Terminated => "terminated",
        }
    }
}

/// Preferred presentation of the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Show leaf sessions.
    Targets,
    /// Show root sessions.
    Roots,
}

impl ViewMode {
    /// Returns a stable label for filters and display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Targets => "targets",
            Self::Roots => "roots",
        }
    }
}

/// One debug action and the sessions it produced.
pub struct Config {
    /// Arena identity.
    id: EntityId,
    /// Reactive scope owning the entity's signals.
    scope: ReactiveScope,
    /// Lifecycle pair.
    lifecycle: Lifecycle,
    /// Display name of the action.
    pub name: Signal<String>,
    /// Launch specifications, re-issued on restart.
    pub specifications: RefCell<Vec<LaunchSpec>>,
    /// Preferred presentation.
    pub view_mode: Signal<ViewMode>,
    /// Terminate every session when any root terminates.
    pub stop_all: Signal<bool>,
    /// Sessions of the group. Reference edge.
    pub sessions: Collection,
    /// Rollup: group state derived from the targets.
    pub state: Memo<ConfigState>,
}

impl Config {
    /// Creates a config entity and wires its stop-all coordination.
    pub(crate) fn create(
        store: &Store,
        name: String,
        specifications: Vec<LaunchSpec>,
        stop_all: bool,
    ) -> Rc<Self> {
        let config = store.insert(|id| {
            let scope = ReactiveScope::new();
            scope.with(|| {
                let sessions = Collection::new(store, "sessions", EdgeKind::Weak, Some(id));
                let state = {
                    let sessions = sessions.clone();
                    Memo::new(move || derive_state(&sessions))
                };
                Rc::new(Self {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    name: Signal::new(name),
                    specifications: RefCell::new(specifications),
                    view_mode: Signal::new(ViewMode::Targets),
                    stop_all: Signal::new(stop_all),
                    sessions,
                    state,
                })
            })
        });
        config.scope.with(|| {
            let sessions = config.sessions.clone();
            let stop_all = config.stop_all.clone();
            let _stop_all_watch = Effect::new(move || enforce_stop_all(&sessions, &stop_all));
        });
        config
    }

    /// Sessions of the group that are leaves (no live children).
    #[must_use]
    pub fn targets(&self) -> Vec<Rc<Session>> {
        self.group_sessions()
            .into_iter()
            .filter(|session| session.leaf.get_untracked())
            .collect()
    }

    /// Sessions of the group with no parent inside the group.
    #[must_use]
    pub fn roots(&self) -> Vec<Rc<Session>> {
        let members = self.group_sessions();
        let ids: Vec<EntityId> = members.iter().map(|session| session.id()).collect();
        members
            .into_iter()
            .filter(|session| {
                session
                    .parent
                    .get_untracked()
                    .map_or(true, |parent| !ids.contains(&parent))
            })
            .collect()
    }

    /// Resolves the group's session entities.
    fn group_sessions(&self) -> Vec<Rc<Session>> {
        self.sessions
            .ids_untracked()
            .into_iter()
            .filter_map(|id| self.sessions.resolve(id))
            .filter_map(|node| node.as_any().downcast::<Session>().ok())
            .collect()
    }
}

/// Derives the group state: terminated once all targets are terminated.
fn derive_state(sessions: &Collection) -> ConfigState {
    let members: Vec<Rc<Session>> = sessions
        .ids()
        .into_iter()
        .filter_map(|id| sessions.resolve(id))
        .filter_map(|node| node.as_any().downcast::<Session>().ok())
        .collect();
    if members.is_empty() {
        return ConfigState::Active;
    }
    let targets: Vec<&Rc<Session>> = members
        .iter()
        .filter(|session| session.leaf.get())
        .collect();
    let all_done = targets
        .iter()
        .all(|session| session.state.get() == SessionState::Terminated);
    if all_done {
        ConfigState::Terminated
    } else {
        ConfigState::Active
    }
}

/// Takes the remaining sessions down once any root has terminated.
fn enforce_stop_all(sessions: &Collection, stop_all: &Signal<bool>) {
    if !stop_all.get() {
        return;
    }
    let members: Vec<Rc<Session>> = sessions
        .ids()
        .into_iter()
        .filter_map(|id| sessions.resolve(id))
        .filter_map(|node| node.as_any().downcast::<Session>().ok())
        .collect();
    let ids: Vec<EntityId> = members.iter().map(|session| session.id()).collect();
    let root_terminated = members.iter().any(|session| {
        session.state.get() == SessionState::Terminated
            && session
                .parent
                .get_untracked()
                .map_or(true, |parent| !ids.contains(&parent))
    });
    if !root_terminated {
        return;
    }
    untracked(|| {
        for session in &members {
            if session.state.get_untracked() != SessionState::Terminated {
                session.shutdown_local();
            }
        }
    });
}

impl Node for Config {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "config"
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
            "state" => Some(json!(self.state.get_untracked().label())),
            "stopAll" => Some(json!(self.stop_all.get_untracked())),
            "current" => Some(json!(self.lifecycle.current_signal().get_untracked())),
            "alive" => Some(json!(self.lifecycle.alive_signal().get_untracked())),
            _ => None,
        }
    }

    fn edges(&self) -> Vec<EdgeHandle> {
        vec![EdgeHandle::Many(self.sessions.clone())]
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
