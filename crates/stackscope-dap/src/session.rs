// crates/stackscope-dap/src/session.rs
// ============================================================================
// Module: Session Entity
// Description: One adapter connection: state machine, typed requests, and
//              owned debug state.
// Purpose: Drive the DAP lifecycle and expose execution-control and data
//          requests over the request client.
// Dependencies: stackscope-graph, stackscope-reactive, stackscope-wire,
//               crate::{client, frame, thread, variable}
// ============================================================================

//! ## Overview
//! A [`Session`] owns everything one adapter connection produced: threads,
//! source bindings, outputs, and exception filter bindings. Its state
//! machine is `initializing -> running <-> stopped -> terminated`, with
//! `terminated` absorbing. Requests suspend only at the DAP boundary; every
//! graph mutation in between is synchronous.
//!
//! Invariants:
//! - `state` never leaves `terminated`.
//! - Requests that need an unadvertised capability fail client-side with
//!   [`DapError::Unsupported`] and send nothing.

use std::any::Any;
use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use rustc_hash::FxHashSet;
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
use stackscope_wire::Capabilities;
use stackscope_wire::ContinueArguments;
use stackscope_wire::ContinueResponseBody;
use stackscope_wire::DisconnectArguments;
use stackscope_wire::EvaluateArguments;
use stackscope_wire::EvaluateResponseBody;
use stackscope_wire::PauseArguments;
use stackscope_wire::ScopesArguments;
use stackscope_wire::ScopesResponseBody;
use stackscope_wire::SetVariableArguments;
use stackscope_wire::SetVariableResponseBody;
use stackscope_wire::StepArguments;
use stackscope_wire::SteppingGranularity;
use stackscope_wire::TerminateArguments;
use stackscope_wire::ThreadsResponseBody;
use stackscope_wire::VariablesArguments;
use stackscope_wire::VariablesResponseBody;

use crate::client::RequestClient;
use crate::error::DapError;
use crate::frame::Frame;
use crate::frame::VariableScope;
use crate::thread::Thread;
use crate::thread::ThreadState;
use crate::variable::Variable;
use crate::variable::VariableObservation;

/// Hard cap on termination requests before the session is forced down.
pub(crate) const TERMINATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handshake in progress.
    Initializing,
    /// Debuggee executing.
    Running,
    /// At least one thread stopped.
    Stopped,
    /// The session is over. Absorbing.
    Terminated,
}

impl SessionState {
    /// Returns a stable label for filters and display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Terminated => "terminated",
        }
    }
}

/// One launch or attach specification, as stored on a config group.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchSpec {
    /// Display name of the session.
    pub name: String,
    /// Adapter identifier for the `initialize` handshake.
    pub adapter_id: String,
    /// `launch` or `attach`.
    pub request: String,
    /// Adapter-specific launch configuration.
    pub configuration: Value,
}

/// One adapter connection and the debug state it produced.
pub struct Session {
    /// Arena identity.
    id: EntityId,
    /// Reactive scope owning the entity's signals.
    scope: ReactiveScope,
    /// Lifecycle pair.
    lifecycle: Lifecycle,
    /// Stable session identifier.
    pub session_id: Signal<String>,
    /// Display name.
    pub name: Signal<String>,
    /// Lifecycle state machine.
    pub state: Signal<SessionState>,
    /// Capabilities from the `initialize` response.
    pub capabilities: Signal<Capabilities>,
    /// Parent session in multi-session hierarchies. Reference edge.
    pub parent: EdgeSlot,
    /// Child sessions. Staleness edge; ownership stays with the debugger.
    pub children: Collection,
    /// Threads. Owning edge.
    pub threads: Collection,
    /// Per-source views. Owning edge.
    pub source_bindings: Collection,
    /// Output lines in arrival order. Owning edge.
    pub outputs: Collection,
    /// Exception filter overrides. Owning edge.
    pub exception_filter_bindings: Collection,
    /// Config group the session belongs to. Reference edge.
    pub config: EdgeSlot,
    /// Rollup: true when no live child session exists.
    pub leaf: Memo<bool>,
    /// Request client, set once a transport is attached.
    pub(crate) client: RefCell<Option<Rc<RequestClient>>>,
    /// Next stack sequence number.
    pub(crate) next_stack_index: Cell<i64>,
    /// The specification the session was started from.
    pub(crate) launch_spec: RefCell<Option<LaunchSpec>>,
}

impl Session {
    /// Creates a session entity.
    pub(crate) fn create(store: &Store, session_id: String, name: String) -> Rc<Self> {
        store.insert(|id| {
            let scope = ReactiveScope::new();
            scope.with(|| {
                let children = Collection::new(store, "children", EdgeKind::Lifecycle, Some(id));
                let leaf = {
                    let children = children.clone();
                    Memo::new(move || {
                        !children.ids().into_iter().any(|child| {
                            children
                                .resolve(child)
                                .and_then(|node| node.as_any().downcast::<Session>().ok())
                                .is_some_and(|session| {
                                    session.state.get() != SessionState::Terminated
                                })
                        })
                    })
                };
                Rc::new(Self {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    session_id: Signal::new(session_id),
                    name: Signal::new(name),
                    state: Signal::new(SessionState::Initializing),
                    capabilities: Signal::new(Capabilities::default()),
                    parent: EdgeSlot::new(store, "parent", EdgeKind::Weak),
                    children,
                    threads: Collection::new(store, "threads", EdgeKind::Strong, Some(id))
                        .with_index("id", |node| {
                            let thread = Rc::clone(node).as_any().downcast::<Thread>().ok()?;
                            Some(IndexKey::Int(thread.thread_id.get()))
                        }),
                    source_bindings: Collection::new(
                        store,
                        "source_bindings",
                        EdgeKind::Strong,
                        Some(id),
                    ),
                    outputs: Collection::new(store, "outputs", EdgeKind::Strong, Some(id))
                        .with_index("category", |node| {
                            node.field("category")
                                .as_ref()
                                .and_then(IndexKey::from_json)
                        }),
                    exception_filter_bindings: Collection::new(
                        store,
                        "exception_filter_bindings",
                        EdgeKind::Strong,
                        Some(id),
                    ),
                    config: EdgeSlot::new(store, "config", EdgeKind::Weak),
                    leaf,
                    client: RefCell::new(None),
                    next_stack_index: Cell::new(0),
                    launch_spec: RefCell::new(None),
                })
            })
        })
    }

    /// Advances the state machine. `terminated` is absorbing.
    pub(crate) fn transition(&self, next: SessionState) {
        if self.state.get_untracked() == SessionState::Terminated {
            return;
        }
        self.state.set(next);
    }

    /// Returns the request client.
    ///
    /// # Errors
    ///
    /// Returns [`DapError::TransportDead`] before a transport is attached or
    /// after the session terminated.
    pub(crate) fn client(&self) -> Result<Rc<RequestClient>, DapError> {
        self.client
            .borrow()
            .as_ref()
            .map(Rc::clone)
            .ok_or(DapError::TransportDead)
    }

    /// Returns the backing store, while the graph is alive.
    #[must_use]
    pub fn store(&self) -> Option<Store> {
        self.threads.store_handle()
    }

    /// Lists this session's breakpoint bindings.
    #[must_use]
    pub fn breakpoint_bindings(&self) -> Vec<Rc<crate::breakpoint::BreakpointBinding>> {
        let Some(store) = self.store() else {
            return Vec::new();
        };
        self.session_breakpoint_bindings(&store)
            .into_iter()
            .filter_map(|id| store.get_as::<crate::breakpoint::BreakpointBinding>(id))
            .collect()
    }

    /// Finds a thread by its adapter identifier.
    #[must_use]
    pub fn find_thread(&self, thread_id: i64) -> Option<Rc<Thread>> {
        self.threads
            .by("id", &IndexKey::Int(thread_id))
            .ok()?
            .into_iter()
            .find_map(|id| {
                self.threads
                    .resolve(id)?
                    .as_any()
                    .downcast::<Thread>()
                    .ok()
            })
    }

    /// Lists the session's thread entities in creation order.
    #[must_use]
    pub fn thread_entities(&self) -> Vec<Rc<Thread>> {
        self.threads
            .ids()
            .into_iter()
            .filter_map(|id| self.threads.resolve(id))
            .filter_map(|node| node.as_any().downcast::<Thread>().ok())
            .collect()
    }

    /// Resumes a thread, or the first stopped thread when `thread_id` is
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`DapError::NotFound`]-free failures only: request errors per
    /// category. Resuming with no stopped thread is a no-op.
    pub async fn resume(&self, thread_id: Option<i64>) -> Result<(), DapError> {
        let Some(thread) = self.pick_thread(thread_id) else {
            return Ok(());
        };
        let client = self.client()?;
        let single = self
            .capabilities
            .get_untracked()
            .supports_single_thread_execution_requests;
        let arguments = ContinueArguments {
            thread_id: thread.thread_id.get_untracked(),
            single_thread: single.then_some(true),
        };
        let body = client.request("continue", to_arguments(&arguments)).await?;
        let all_continued = body
            .map(|body| {
                serde_json::from_value::<ContinueResponseBody>(body)
                    .map(|body| body.all_threads_continued.unwrap_or(true))
                    .unwrap_or(true)
            })
            .unwrap_or(true);
        self.apply_continued(&thread, all_continued || !single);
        Ok(())
    }

    /// Steps a thread: `next`, `stepIn`, or `stepOut`.
    ///
    /// # Errors
    ///
    /// Returns request failures per category; granularity is silently
    /// dropped when the adapter does not support it.
    pub async fn step(
        &self,
        command: &str,
        thread_id: i64,
        granularity: Option<SteppingGranularity>,
    ) -> Result<(), DapError> {
        let client = self.client()?;
        let capabilities = self.capabilities.get_untracked();
        let arguments = StepArguments {
            thread_id,
            single_thread: capabilities
                .supports_single_thread_execution_requests
                .then_some(true),
            granularity: granularity.filter(|_| capabilities.supports_stepping_granularity),
        };
        client.request(command, to_arguments(&arguments)).await?;
        if let Some(thread) = self.find_thread(thread_id) {
            self.apply_continued(&thread, false);
        }
        Ok(())
    }

    /// Pauses a running thread.
    ///
    /// # Errors
    ///
    /// Returns request failures per category.
    pub async fn pause(&self, thread_id: i64) -> Result<(), DapError> {
        let client = self.client()?;
        client
            .request("pause", to_arguments(&PauseArguments { thread_id }))
            .await?;
        Ok(())
    }

    /// Terminates the session, falling back to `disconnect` and finally to
    /// local shutdown after the hard cap.
    ///
    /// # Errors
    ///
    /// Never fails: termination always completes locally.
    pub async fn terminate(&self) -> Result<(), DapError> {
        if let Ok(client) = self.client() {
            let supports_terminate = self
                .capabilities
                .get_untracked()
                .supports_terminate_request;
            let gracefully = if supports_terminate {
                client
                    .request_with_timeout(
                        "terminate",
                        to_arguments(&TerminateArguments { restart: None }),
                        TERMINATION_TIMEOUT,
                    )
                    .await
                    .is_ok()
            } else {
                false
            };
            if !gracefully {
                let _ = client
                    .request_with_timeout(
                        "disconnect",
                        to_arguments(&DisconnectArguments {
                            terminate_debuggee: Some(true),
                        }),
                        TERMINATION_TIMEOUT,
                    )
                    .await;
            }
        }
        self.finalize_termination();
        Ok(())
    }

    /// Disconnects from the adapter without terminating the debuggee.
    ///
    /// # Errors
    ///
    /// Never fails: the session always reaches `terminated` locally.
    pub async fn disconnect(&self) -> Result<(), DapError> {
        if let Ok(client) = self.client() {
            let _ = client
                .request_with_timeout(
                    "disconnect",
                    to_arguments(&DisconnectArguments {
                        terminate_debuggee: Some(false),
                    }),
                    TERMINATION_TIMEOUT,
                )
                .await;
        }
        self.finalize_termination();
        Ok(())
    }

    /// Fire-and-forget shutdown used by stop-all coordination.
    pub(crate) fn shutdown_local(&self) {
        if let Ok(client) = self.client() {
            client.notify(
                "disconnect",
                to_arguments(&DisconnectArguments {
                    terminate_debuggee: Some(true),
                }),
            );
        }
        self.finalize_termination();
    }

    /// Reaches the terminal state: pending requests are cancelled, threads
    /// are disposed, bindings go stale, outputs stay until the session
    /// itself is disposed.
    pub(crate) fn finalize_termination(&self) {
        self.transition(SessionState::Terminated);
        if let Ok(client) = self.client() {
            client.fail_all(|| DapError::Cancelled);
        }
        let Some(store) = self.store() else {
            return;
        };
        for thread in self.threads.ids_untracked() {
            store.delete(thread);
        }
        for binding in self.source_bindings.ids_untracked() {
            store.mark_stale(binding);
        }
        for binding in self.exception_filter_bindings.ids_untracked() {
            store.mark_stale(binding);
        }
    }

    /// Fetches the thread list and reconciles thread entities.
    ///
    /// # Errors
    ///
    /// Returns request failures per category.
    pub async fn fetch_threads(&self) -> Result<Vec<Rc<Thread>>, DapError> {
        let client = self.client()?;
        let body = client.request("threads", None).await?;
        let body: ThreadsResponseBody = parse_body(body)?;
        let Some(store) = self.store() else {
            return Ok(Vec::new());
        };
        let mut reported = FxHashSet::default();
        for wire in &body.threads {
            reported.insert(wire.id);
            match self.find_thread(wire.id) {
                Some(thread) => thread.name.set(wire.name.clone()),
                None => {
                    let thread = Thread::create(&store, wire.id, wire.name.clone());
                    thread.session.relink(self.id);
                    self.threads.link(thread.id());
                }
            }
        }
        for thread in self.thread_entities() {
            if !reported.contains(&thread.thread_id.get_untracked())
                && thread.state.get_untracked() != ThreadState::Exited
            {
                thread.state.set(ThreadState::Exited);
                store.mark_stale(thread.id());
            }
        }
        Ok(self.thread_entities())
    }

    /// Fetches the scopes of a frame, lazily.
    ///
    /// # Errors
    ///
    /// Returns request failures per category.
    pub async fn frame_scopes(&self, frame: &Rc<Frame>) -> Result<Vec<Rc<VariableScope>>, DapError> {
        if !frame.scopes_fetched.get() {
            let client = self.client()?;
            let body = client
                .request(
                    "scopes",
                    to_arguments(&ScopesArguments {
                        frame_id: frame.frame_id.get_untracked(),
                    }),
                )
                .await?;
            let body: ScopesResponseBody = parse_body(body)?;
            let Some(store) = self.store() else {
                return Ok(Vec::new());
            };
            // A concurrent fetch may have landed while we awaited.
            if !frame.scopes_fetched.get() {
                for wire in &body.scopes {
                    let scope = VariableScope::create(
                        &store,
                        wire.name.clone(),
                        wire.variables_reference,
                        wire.expensive,
                    );
                    scope.frame.relink(frame.id());
                    frame.scopes.link(scope.id());
                }
                frame.scopes_fetched.set(true);
            }
        }
        Ok(frame
            .scopes
            .ids()
            .into_iter()
            .filter_map(|id| frame.scopes.resolve(id))
            .filter_map(|node| node.as_any().downcast::<VariableScope>().ok())
            .collect())
    }

    /// Fetches the variables of a scope, lazily, reusing entities by name.
    ///
    /// # Errors
    ///
    /// Returns request failures per category.
    pub async fn scope_variables(
        &self,
        scope: &Rc<VariableScope>,
    ) -> Result<Vec<Rc<Variable>>, DapError> {
        let reference = scope.variables_reference.get_untracked();
        if !scope.variables_fetched.get() {
            let reported = self.fetch_variable_list(reference).await?;
            self.reconcile_variables(&scope.variables, reported, |variable| {
                variable.var_scope.relink(scope.id());
            });
            scope.variables_fetched.set(true);
        }
        Ok(collect_variables(&scope.variables))
    }

    /// Fetches the children of a structured variable, lazily.
    ///
    /// # Errors
    ///
    /// Returns request failures per category. A leaf variable yields no
    /// children and no request.
    pub async fn variable_children(
        &self,
        variable: &Rc<Variable>,
    ) -> Result<Vec<Rc<Variable>>, DapError> {
        let reference = variable.variables_reference.get_untracked();
        if reference <= 0 {
            return Ok(Vec::new());
        }
        if !variable.children_fetched.get() {
            let reported = self.fetch_variable_list(reference).await?;
            self.reconcile_variables(&variable.children, reported, |child| {
                child.parent.relink(variable.id());
            });
            variable.children_fetched.set(true);
        }
        Ok(collect_variables(&variable.children))
    }

    /// Sets a variable's value through the adapter and absorbs the result.
    ///
    /// # Errors
    ///
    /// Returns [`DapError::Unsupported`] when the adapter lacks
    /// `supportsSetVariable`, request failures otherwise.
    pub async fn set_variable(
        &self,
        variable: &Rc<Variable>,
        new_value: &str,
    ) -> Result<(), DapError> {
        if !self.capabilities.get_untracked().supports_set_variable {
            return Err(DapError::Unsupported("setVariable"));
        }
        let container = self.variable_container_reference(variable)?;
        let client = self.client()?;
        let body = client
            .request(
                "setVariable",
                to_arguments(&SetVariableArguments {
                    variables_reference: container,
                    name: variable.name.get_untracked(),
                    value: new_value.to_owned(),
                }),
            )
            .await?;
        let body: SetVariableResponseBody = parse_body(body)?;
        variable.absorb(body.value, body.variable_type, body.variables_reference);
        Ok(())
    }

    /// Evaluates an expression, optionally in a frame context.
    ///
    /// # Errors
    ///
    /// Returns request failures per category.
    pub async fn evaluate(
        &self,
        frame: Option<&Rc<Frame>>,
        expression: &str,
        context: Option<&str>,
    ) -> Result<EvaluateResponseBody, DapError> {
        let client = self.client()?;
        let arguments = EvaluateArguments {
            expression: expression.to_owned(),
            frame_id: frame.map(|frame| frame.frame_id.get_untracked()),
            context: context.map(ToOwned::to_owned),
        };
        let body = client.request("evaluate", to_arguments(&arguments)).await?;
        parse_body(body)
    }

    /// Returns every observation of a named variable in this session,
    /// oldest first. The only current observation is the latest fetch's.
    #[must_use]
    pub fn variable_history(&self, name: &str) -> Vec<VariableObservation> {
        let Some(store) = self.store() else {
            return Vec::new();
        };
        let mut observations: Vec<(u64, VariableObservation)> = store
            .of_kind("variable")
            .into_iter()
            .filter_map(|id| {
                let variable = store.get_as::<Variable>(id)?;
                if variable.name.get_untracked() != name {
                    return None;
                }
                if !self.owns_transitively(&store, id) {
                    return None;
                }
                let serial = store.serial(id)?;
                let is_current = variable.lifecycle().current_signal().get_untracked();
                Some((serial, VariableObservation {
                    variable,
                    is_current,
                }))
            })
            .collect();
        observations.sort_by_key(|(serial, _)| *serial);
        observations
            .into_iter()
            .map(|(_, observation)| observation)
            .collect()
    }

    /// True when the strong-parent chain of `id` passes through this
    /// session.
    fn owns_transitively(&self, store: &Store, id: EntityId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == self.id {
                return true;
            }
            cursor = store.strong_parent(current);
        }
        false
    }

    /// Issues a `variables` request and returns the reported list.
    async fn fetch_variable_list(
        &self,
        reference: i64,
    ) -> Result<Vec<stackscope_wire::Variable>, DapError> {
        let client = self.client()?;
        let body = client
            .request(
                "variables",
                to_arguments(&VariablesArguments {
                    variables_reference: reference,
                }),
            )
            .await?;
        let body: VariablesResponseBody = parse_body(body)?;
        Ok(body.variables)
    }

    /// Applies a fetched variable list to a container collection.
    ///
    /// Reported names reuse the existing current entity; replaced entities
    /// are stale-marked; new names create entities wired by `wire_new`.
    fn reconcile_variables(
        &self,
        container: &Collection,
        reported: Vec<stackscope_wire::Variable>,
        wire_new: impl Fn(&Rc<Variable>),
    ) {
        let Some(store) = self.store() else {
            return;
        };
        let mut seen = FxHashSet::default();
        for wire in reported {
            let existing = container
                .by("name", &IndexKey::Str(wire.name.clone()))
                .ok()
                .into_iter()
                .flatten()
                .filter_map(|id| store.get_as::<Variable>(id))
                .find(|variable| variable.lifecycle().current_signal().get_untracked());
            match existing {
                Some(variable) => {
                    variable.absorb(
                        wire.value.clone(),
                        wire.variable_type.clone(),
                        wire.variables_reference,
                    );
                    seen.insert(variable.id());
                }
                None => {
                    let variable = Variable::create(
                        &store,
                        wire.name.clone(),
                        wire.value.clone(),
                        wire.variable_type.clone(),
                        wire.variables_reference,
                    );
                    wire_new(&variable);
                    container.link(variable.id());
                    seen.insert(variable.id());
                }
            }
        }
        for id in container.ids_untracked() {
            if !seen.contains(&id) {
                if let Some(variable) = store.get_as::<Variable>(id) {
                    if variable.lifecycle().current_signal().get_untracked() {
                        store.mark_stale(id);
                    }
                }
            }
        }
    }

    /// Resolves the `variablesReference` of the container holding
    /// `variable`.
    fn variable_container_reference(&self, variable: &Rc<Variable>) -> Result<i64, DapError> {
        let store = self.store().ok_or(DapError::TransportDead)?;
        if let Some(parent) = variable.parent.get_untracked() {
            if let Some(parent) = store.get_as::<Variable>(parent) {
                return Ok(parent.variables_reference.get_untracked());
            }
        }
        if let Some(scope) = variable.var_scope.get_untracked() {
            if let Some(scope) = store.get_as::<VariableScope>(scope) {
                return Ok(scope.variables_reference.get_untracked());
            }
        }
        Err(DapError::Malformed(
            "variable has no containing reference".to_owned(),
        ))
    }

    /// Marks a thread (or all threads) running again and clears breakpoint
    /// hit flags for this session.
    pub(crate) fn apply_continued(&self, thread: &Rc<Thread>, all_threads: bool) {
        if all_threads {
            for thread in self.thread_entities() {
                if thread.state.get_untracked() == ThreadState::Stopped {
                    thread.state.set(ThreadState::Running);
                }
            }
        } else {
            thread.state.set(ThreadState::Running);
        }
        self.transition(SessionState::Running);
        self.clear_breakpoint_hits();
    }

    /// Clears `hit` on every breakpoint binding of this session.
    pub(crate) fn clear_breakpoint_hits(&self) {
        let Some(store) = self.store() else {
            return;
        };
        for binding_id in self.session_breakpoint_bindings(&store) {
            if let Some(binding) = store.get_as::<crate::breakpoint::BreakpointBinding>(binding_id)
            {
                binding.hit.set(false);
            }
        }
    }

    /// Lists the breakpoint binding ids attached to this session's source
    /// bindings.
    pub(crate) fn session_breakpoint_bindings(&self, store: &Store) -> Vec<EntityId> {
        self.source_bindings
            .ids_untracked()
            .into_iter()
            .filter_map(|id| store.get_as::<crate::source::SourceBinding>(id))
            .flat_map(|binding| binding.breakpoint_bindings.ids_untracked())
            .collect()
    }

    /// Picks an explicit thread or the first stopped one.
    fn pick_thread(&self, thread_id: Option<i64>) -> Option<Rc<Thread>> {
        match thread_id {
            Some(thread_id) => self.find_thread(thread_id),
            None => self
                .thread_entities()
                .into_iter()
                .find(|thread| thread.state.get_untracked() == ThreadState::Stopped),
        }
    }
}

/// Collects and downcasts a variable container's current members.
fn collect_variables(container: &Collection) -> Vec<Rc<Variable>> {
    container
        .ids()
        .into_iter()
        .filter_map(|id| container.resolve(id))
        .filter_map(|node| node.as_any().downcast::<Variable>().ok())
        .filter(|variable| variable.lifecycle().current_signal().get_untracked())
        .collect()
}

/// Deserializes an optional response body, treating absence as empty.
pub(crate) fn parse_body<T: serde::de::DeserializeOwned>(
    body: Option<Value>,
) -> Result<T, DapError> {
    let value = body.unwrap_or_else(|| json!({}));
    serde_json::from_value(value).map_err(|error| DapError::Malformed(error.to_string()))
}

/// Serializes typed request arguments to their wire value.
///
/// Serialization of the wire argument types cannot fail; a `None` here
/// would only follow from a malformed custom type and results in an
/// argument-less request.
pub(crate) fn to_arguments<T: serde::Serialize>(arguments: &T) -> Option<Value> {
    serde_json::to_value(arguments).ok()
}

impl Node for Session {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "session"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn scope(&self) -> ReactiveScope {
        self.scope
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "sessionId" => Some(json!(self.session_id.get_untracked())),
            "name" => Some(json!(self.name.get_untracked())),
            "state" => Some(json!(self.state.get_untracked().label())),
            "leaf" => Some(json!(self.leaf.get_untracked())),
            "current" => Some(json!(self.lifecycle.current_signal().get_untracked())),
            "alive" => Some(json!(self.lifecycle.alive_signal().get_untracked())),
            _ => None,
        }
    }

    fn edges(&self) -> Vec<EdgeHandle> {
        vec![
            EdgeHandle::One(self.parent.clone()),
            EdgeHandle::Many(self.children.clone()),
            EdgeHandle::Many(self.threads.clone()),
            EdgeHandle::Many(self.source_bindings.clone()),
            EdgeHandle::Many(self.outputs.clone()),
            EdgeHandle::Many(self.exception_filter_bindings.clone()),
            EdgeHandle::One(self.config.clone()),
        ]
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
