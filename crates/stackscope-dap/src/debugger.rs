// crates/stackscope-dap/src/debugger.rs
// ============================================================================
// Module: Debugger Root
// Description: Singleton root entity, command surface, and session spawning.
// Purpose: Own the debugger-wide collections, intern sources, manage focus,
//          and start sessions and session groups.
// Dependencies: stackscope-graph, stackscope-query, stackscope-reactive,
//               stackscope-wire, crate::*
// ============================================================================

//! ## Overview
//! The [`Debugger`] handle wraps the root entity of the graph. It owns every
//! session, source, breakpoint, exception filter, and config group, and
//! exposes the command surface consumers drive: `start`, `focus`, `query`,
//! `add_breakpoint`, and config management.
//!
//! Invariants:
//! - One root entity per debugger; its URI is `/`.
//! - One source entity per correlation key.
//! - The focused URL always names an entity that resolved at focus time;
//!   anchors resolve against it lazily on each read.

use std::any::Any;
use std::cell::Cell;
use std::cell::RefCell;
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
use stackscope_query::parse_query;
use stackscope_reactive::Scope as ReactiveScope;
use stackscope_reactive::Signal;
use stackscope_wire::Source as WireSource;
use stackscope_wire::Transport;

use crate::breakpoint::Breakpoint;
use crate::config::Config;
use crate::correlation::correlation_key;
use crate::error::DapError;
use crate::events;
use crate::exception::ExceptionFilter;
use crate::exception::ExceptionFilterBinding;
use crate::session::LaunchSpec;
use crate::session::Session;
use crate::source::Source;
use crate::source::SourceBinding;
use crate::sync;

/// Produces a transport for a launch specification.
///
/// The host owns process spawning and handshake parsing; the core only
/// consumes the resulting duplex channel.
pub trait SessionSpawner {
    /// Spawns an adapter for `spec` and returns its transport.
    ///
    /// # Errors
    ///
    /// Returns a [`DapError`] when the adapter cannot be produced.
    fn spawn(&self, spec: &LaunchSpec) -> Result<Rc<dyn Transport>, DapError>;
}

/// The singleton root entity.
pub struct DebuggerEntity {
    /// Arena identity.
    id: EntityId,
    /// Reactive scope owning the entity's signals.
    scope: ReactiveScope,
    /// Lifecycle pair.
    lifecycle: Lifecycle,
    /// Canonical URL of the focused entity.
    pub focused_url: Signal<Option<String>>,
    /// Every session, root and child alike. Owning edge.
    pub sessions: Collection,
    /// Deduplicated sources. Owning edge.
    pub sources: Collection,
    /// User breakpoints. Owning edge.
    pub breakpoints: Collection,
    /// Exception filters offered by adapters. Owning edge.
    pub exception_filters: Collection,
    /// Config groups. Owning edge.
    pub configs: Collection,
}

impl DebuggerEntity {
    /// Creates the root entity with its indexed collections.
    fn create(store: &Store) -> Rc<Self> {
        store.insert(|id| {
            let scope = ReactiveScope::new();
            scope.with(|| {
                Rc::new(Self {
                    id,
                    scope,
                    lifecycle: Lifecycle::new(),
                    focused_url: Signal::new(None),
                    sessions: Collection::new(store, "sessions", EdgeKind::Strong, Some(id))
                        .with_index("state", |node| {
                            let session = Rc::clone(node).as_any().downcast::<Session>().ok()?;
                            Some(IndexKey::Str(session.state.get().label().to_owned()))
                        })
                        .with_index("sessionId", |node| {
                            let session = Rc::clone(node).as_any().downcast::<Session>().ok()?;
                            Some(IndexKey::Str(session.session_id.get()))
                        })
                        .with_index("leaf", |node| {
                            let session = Rc::clone(node).as_any().downcast::<Session>().ok()?;
                            Some(IndexKey::Bool(session.leaf.get()))
                        }),
                    sources: Collection::new(store, "sources", EdgeKind::Strong, Some(id))
                        .with_index("key", |node| {
                            let source = Rc::clone(node).as_any().downcast::<Source>().ok()?;
                            Some(IndexKey::Str(source.key.clone()))
                        }),
                    breakpoints: Collection::new(store, "breakpoints", EdgeKind::Strong, Some(id))
                        .with_index("line", |node| {
                            let breakpoint =
                                Rc::clone(node).as_any().downcast::<Breakpoint>().ok()?;
                            Some(IndexKey::Int(breakpoint.line.get()))
                        }),
                    exception_filters: Collection::new(
                        store,
                        "exception_filters",
                        EdgeKind::Strong,
                        Some(id),
                    )
                    .with_index("filter", |node| {
                        let filter =
                            Rc::clone(node).as_any().downcast::<ExceptionFilter>().ok()?;
                        Some(IndexKey::Str(filter.filter_id.clone()))
                    }),
                    configs: Collection::new(store, "configs", EdgeKind::Strong, Some(id)),
                })
            })
        })
    }

    /// Sources currently known for a correlation key.
    #[must_use]
    pub fn source_by_key(&self, key: &str) -> Option<Rc<Source>> {
        self.sources
            .by("key", &IndexKey::Str(key.to_owned()))
            .ok()?
            .into_iter()
            .find_map(|id| self.sources.resolve(id)?.as_any().downcast::<Source>().ok())
    }
}

impl Node for DebuggerEntity {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "debugger"
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn scope(&self) -> ReactiveScope {
        self.scope
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "current" => Some(json!(self.lifecycle.current_signal().get_untracked())),
            "alive" => Some(json!(self.lifecycle.alive_signal().get_untracked())),
            _ => None,
        }
    }

    fn edges(&self) -> Vec<EdgeHandle> {
        vec![
            EdgeHandle::Many(self.sessions.clone()),
            EdgeHandle::Many(self.sources.clone()),
            EdgeHandle::Many(self.breakpoints.clone()),
            EdgeHandle::Many(self.exception_filters.clone()),
            EdgeHandle::Many(self.configs.clone()),
        ]
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// Shared state behind every debugger handle.
struct DebuggerShared {
    /// The entity graph.
    store: Store,
    /// The root entity.
    root: Rc<DebuggerEntity>,
    /// Host-provided adapter spawner.
    spawner: RefCell<Option<Rc<dyn SessionSpawner>>>,
    /// Counter for generated session identifiers.
    session_counter: Cell<u64>,
}

/// Handle to one debugger instance.
///
/// Handles are cheap clones sharing one graph.
#[derive(Clone)]
pub struct Debugger {
    /// Shared debugger state.
    shared: Rc<DebuggerShared>,
}

impl Debugger {
    /// Creates a debugger with an empty graph.
    #[must_use]
    pub fn new() -> Self {
        let store = Store::new();
        let root = DebuggerEntity::create(&store);
        Self {
            shared: Rc::new(DebuggerShared {
                store,
                root,
                spawner: RefCell::new(None),
                session_counter: Cell::new(0),
            }),
        }
    }

    /// Installs the host's adapter spawner.
    pub fn set_spawner(&self, spawner: Rc<dyn SessionSpawner>) {
        *self.shared.spawner.borrow_mut() = Some(spawner);
    }

    /// Returns the entity graph.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    /// Returns the root entity.
    #[must_use]
    pub fn entity(&self) -> &Rc<DebuggerEntity> {
        &self.shared.root
    }

    /// Starts a session from a launch specification.
    ///
    /// Returns once the launch or attach request was answered; the
    /// configuration phase continues concurrently on `initialized`.
    ///
    /// # Errors
    ///
    /// Returns [`DapError::NoSpawner`] without a spawner, transport and
    /// request failures per category. A failed launch leaves the session in
    /// `terminated`.
    pub async fn start(&self, spec: LaunchSpec) -> Result<Rc<Session>, DapError> {
        self.start_with_config(spec, None).await
    }

    /// Starts a session, optionally linked to a config group.
    ///
    /// # Errors
    ///
    /// See [`Debugger::start`].
    pub async fn start_with_config(
        &self,
        spec: LaunchSpec,
        config: Option<&Rc<Config>>,
    ) -> Result<Rc<Session>, DapError> {
        let session = self.create_session(&spec, None, config)?;
        events::start_protocol(self, &session, &spec).await?;
        Ok(session)
    }

    /// Starts a child session for a reverse `startDebugging` request.
    ///
    /// The protocol handshake runs concurrently; the parent's reverse
    /// request is answered immediately.
    ///
    /// # Errors
    ///
    /// Returns [`DapError::NoSpawner`] without a spawner and transport
    /// failures from spawning.
    pub(crate) fn start_child_session(
        &self,
        parent: &Rc<Session>,
        spec: LaunchSpec,
    ) -> Result<Rc<Session>, DapError> {
        let config = parent
            .config
            .get_untracked()
            .and_then(|id| self.store().get_as::<Config>(id));
        let session = self.create_session(&spec, Some(parent), config.as_ref())?;
        let debugger = self.clone();
        let child = Rc::clone(&session);
        tokio::task::spawn_local(async move {
            if let Err(error) = events::start_protocol(&debugger, &child, &spec).await {
                tracing::warn!(
                    target: "stackscope::dap",
                    session_id = %child.session_id.get_untracked(),
                    %error,
                    "child session handshake failed"
                );
            }
        });
        Ok(session)
    }

    /// Creates, links, and attaches a session entity.
    fn create_session(
        &self,
        spec: &LaunchSpec,
        parent: Option<&Rc<Session>>,
        config: Option<&Rc<Config>>,
    ) -> Result<Rc<Session>, DapError> {
        let spawner = self
            .shared
            .spawner
            .borrow()
            .as_ref()
            .map(Rc::clone)
            .ok_or(DapError::NoSpawner)?;
        let transport = spawner.spawn(spec)?;
        let session_id = spec
            .configuration
            .get("__sessionId")
            .and_then(|value| value.as_str())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| {
                let serial = self.shared.session_counter.get() + 1;
                self.shared.session_counter.set(serial);
                format!("session-{serial}")
            });
        let session = Session::create(self.store(), session_id, spec.name.clone());
        *session.launch_spec.borrow_mut() = Some(spec.clone());
        self.entity().sessions.link(session.id());
        if let Some(parent) = parent {
            session.parent.relink(parent.id());
            parent.children.link(session.id());
        }
        if let Some(config) = config {
            session.config.relink(config.id());
            config.sessions.link(session.id());
        }
        events::attach_transport(self, &session, transport);
        Ok(session)
    }

    /// Removes a terminated session from the graph entirely.
    ///
    /// Its breakpoint bindings are deleted first so the owning breakpoints
    /// do not accumulate bindings of dead sessions.
    pub fn remove_session(&self, session: &Rc<Session>) {
        let store = self.store();
        for binding in session.session_breakpoint_bindings(store) {
            store.delete(binding);
        }
        if let Some(config) = session
            .config
            .get_untracked()
            .and_then(|id| store.get_as::<Config>(id))
        {
            config.sessions.unlink(session.id());
        }
        store.delete(session.id());
    }

    /// Interns a wire source, returning the debugger-wide entity.
    ///
    /// A second sighting with the same correlation key returns the existing
    /// entity; a source binding for (session, source) is ensured either
    /// way.
    ///
    /// # Errors
    ///
    /// Returns [`DapError::UnidentifiableSource`] for sources without an
    /// identity.
    pub fn intern_source(
        &self,
        session: &Rc<Session>,
        wire: &WireSource,
    ) -> Result<Rc<Source>, DapError> {
        let key = correlation_key(wire)?;
        let source = match self.entity().source_by_key(&key) {
            Some(existing) => {
                existing.absorb(wire);
                existing
            }
            None => {
                let source = Source::create(self.store(), key, wire);
                self.entity().sources.link(source.id());
                source
            }
        };
        let reference = wire.source_reference.filter(|reference| *reference > 0);
        self.ensure_source_binding(session, &source, reference);
        Ok(source)
    }

    /// Finds or creates the binding for one (session, source) pair.
    pub(crate) fn ensure_source_binding(
        &self,
        session: &Rc<Session>,
        source: &Rc<Source>,
        reference: Option<i64>,
    ) -> Rc<SourceBinding> {
        let store = self.store();
        let existing = session
            .source_bindings
            .ids_untracked()
            .into_iter()
            .filter_map(|id| store.get_as::<SourceBinding>(id))
            .find(|binding| binding.source.get_untracked() == Some(source.id()));
        if let Some(binding) = existing {
            if reference.is_some() && binding.source_reference.get_untracked().is_none() {
                binding.source_reference.set(reference);
            }
            return binding;
        }
        let binding = SourceBinding::create(store, reference);
        binding.session.relink(session.id());
        binding.source.relink(source.id());
        session.source_bindings.link(binding.id());
        source.bindings.link(binding.id());
        binding
    }

    /// Creates a breakpoint under the source identified by `path`.
    ///
    /// Active sessions re-synchronise the source concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`DapError::UnidentifiableSource`] for an empty path.
    pub fn add_breakpoint(
        &self,
        path: &str,
        line: i64,
        column: Option<i64>,
    ) -> Result<Rc<Breakpoint>, DapError> {
        let wire = WireSource {
            path: Some(path.to_owned()),
            ..WireSource::default()
        };
        let key = correlation_key(&wire)?;
        let source = match self.entity().source_by_key(&key) {
            Some(existing) => existing,
            None => {
                let source = Source::create(self.store(), key, &wire);
                self.entity().sources.link(source.id());
                source
            }
        };
        let breakpoint = Breakpoint::create(self.store(), line, column);
        breakpoint.source.relink(source.id());
        self.entity().breakpoints.link(breakpoint.id());
        self.resync_source(&source);
        Ok(breakpoint)
    }

    /// Removes a breakpoint and re-synchronises its source everywhere.
    pub fn remove_breakpoint(&self, breakpoint: &Rc<Breakpoint>) {
        let source = breakpoint
            .source
            .get_untracked()
            .and_then(|id| self.store().get_as::<Source>(id));
        self.store().delete(breakpoint.id());
        if let Some(source) = source {
            self.resync_source(&source);
        }
    }

    /// Re-sends `setBreakpoints` for `source` on every active session.
    fn resync_source(&self, source: &Rc<Source>) {
        for session in self.active_sessions() {
            let debugger = self.clone();
            let source = Rc::clone(source);
            tokio::task::spawn_local(async move {
                if let Err(error) =
                    sync::sync_source_breakpoints(&debugger, &session, &source).await
                {
                    tracing::warn!(
                        target: "stackscope::dap",
                        session_id = %session.session_id.get_untracked(),
                        %error,
                        "breakpoint resync failed"
                    );
                }
            });
        }
    }

    /// Registers the adapter's exception filters and the session's
    /// bindings.
    pub(crate) fn register_exception_filters(&self, session: &Rc<Session>) {
        let store = self.store();
        for wire in &session
            .capabilities
            .get_untracked()
            .exception_breakpoint_filters
        {
            let filter = self
                .entity()
                .exception_filters
                .by("filter", &IndexKey::Str(wire.filter.clone()))
                .ok()
                .into_iter()
                .flatten()
                .find_map(|id| store.get_as::<ExceptionFilter>(id));
            let filter = match filter {
                Some(existing) => existing,
                None => {
                    let filter = ExceptionFilter::create(store, wire);
                    self.entity().exception_filters.link(filter.id());
                    filter
                }
            };
            let already_bound = session
                .exception_filter_bindings
                .ids_untracked()
                .into_iter()
                .filter_map(|id| store.get_as::<ExceptionFilterBinding>(id))
                .any(|binding| binding.filter.get_untracked() == Some(filter.id()));
            if !already_bound {
                let binding = ExceptionFilterBinding::create(store);
                binding.session.relink(session.id());
                binding.filter.relink(filter.id());
                session.exception_filter_bindings.link(binding.id());
                filter.bindings.link(binding.id());
            }
        }
    }

    /// Overrides a filter's enablement for one session and re-synchronises.
    ///
    /// # Errors
    ///
    /// Returns request failures from `setExceptionBreakpoints`.
    pub async fn set_exception_filter_enabled(
        &self,
        session: &Rc<Session>,
        filter_id: &str,
        enabled: bool,
    ) -> Result<(), DapError> {
        let store = self.store();
        let changed = session
            .exception_filter_bindings
            .ids_untracked()
            .into_iter()
            .filter_map(|id| store.get_as::<ExceptionFilterBinding>(id))
            .find(|binding| {
                binding
                    .filter
                    .get_untracked()
                    .and_then(|id| store.get_as::<ExceptionFilter>(id))
                    .is_some_and(|filter| filter.filter_id == filter_id)
            });
        if let Some(binding) = changed {
            binding.enabled_override.set(Some(enabled));
            sync::sync_exception_filters(self, session).await?;
        }
        Ok(())
    }

    /// Creates a config group.
    #[must_use]
    pub fn create_config(
        &self,
        name: &str,
        specifications: Vec<LaunchSpec>,
        stop_all: bool,
    ) -> Rc<Config> {
        let config = Config::create(self.store(), name.to_owned(), specifications, stop_all);
        self.entity().configs.link(config.id());
        config
    }

    /// Starts every specification of a config group.
    ///
    /// # Errors
    ///
    /// Returns the first launch failure; earlier sessions stay running.
    pub async fn start_config(&self, config: &Rc<Config>) -> Result<Vec<Rc<Session>>, DapError> {
        let specifications = config.specifications.borrow().clone();
        let mut sessions = Vec::with_capacity(specifications.len());
        for spec in specifications {
            sessions.push(self.start_with_config(spec, Some(config)).await?);
        }
        Ok(sessions)
    }

    /// Restarts a config group: unlinks the old sessions and re-issues the
    /// stored specifications.
    ///
    /// # Errors
    ///
    /// Returns the first launch failure of the new generation.
    pub async fn restart_config(&self, config: &Rc<Config>) -> Result<Vec<Rc<Session>>, DapError> {
        for session in config.sessions.ids_untracked() {
            config.sessions.unlink(session);
            if let Some(session) = self.store().get_as::<Session>(session) {
                session.config.unlink();
            }
        }
        self.start_config(config).await
    }

    /// Focuses an entity by URL, storing its canonical form.
    ///
    /// An unresolvable URL walks up its segments until an ancestor
    /// resolves; with no resolvable ancestor the focus is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns parse failures; an absent target is not an error.
    pub fn focus(&self, url: &str) -> Result<Option<String>, DapError> {
        let mut query = parse_query(url)?;
        while !query.segments.is_empty() {
            let candidate = query.to_string();
            let resolved = stackscope_query::resolve(
                self.store(),
                self.entity().id(),
                self.focused_url().as_deref(),
                &candidate,
            )?;
            if !resolved.is_empty() {
                self.entity().focused_url.set(Some(candidate.clone()));
                return Ok(Some(candidate));
            }
            query.segments.pop();
        }
        Ok(self.focused_url())
    }

    /// Clears the focus.
    pub fn unfocus(&self) {
        self.entity().focused_url.set(None);
    }

    /// Returns the focused URL.
    #[must_use]
    pub fn focused_url(&self) -> Option<String> {
        self.entity().focused_url.get_untracked()
    }

    /// Resolves a query to exactly one entity.
    ///
    /// # Errors
    ///
    /// Returns [`stackscope_query::QueryError::NotFound`] and
    /// [`stackscope_query::QueryError::Ambiguous`] through
    /// [`DapError::Query`].
    pub fn query_one(&self, url: &str) -> Result<EntityId, DapError> {
        Ok(stackscope_query::query_one(
            self.store(),
            self.entity().id(),
            self.focused_url().as_deref(),
            url,
        )?)
    }

    /// Resolves a query to zero or more entities.
    ///
    /// # Errors
    ///
    /// Returns parse and anchor failures.
    pub fn query_many(&self, url: &str) -> Result<Vec<EntityId>, DapError> {
        Ok(stackscope_query::query_many(
            self.store(),
            self.entity().id(),
            self.focused_url().as_deref(),
            url,
        )?)
    }

    /// Lists the session entities in creation order.
    #[must_use]
    pub fn sessions(&self) -> Vec<Rc<Session>> {
        self.entity()
            .sessions
            .ids_untracked()
            .into_iter()
            .filter_map(|id| self.store().get_as::<Session>(id))
            .collect()
    }

    /// Lists sessions that have not terminated.
    fn active_sessions(&self) -> Vec<Rc<Session>> {
        self.sessions()
            .into_iter()
            .filter(|session| {
                session.state.get_untracked() != crate::session::SessionState::Terminated
            })
            .collect()
    }
}

impl Default for Debugger {
    fn default() -> Self {
        Self::new()
    }
}
