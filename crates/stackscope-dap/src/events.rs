// crates/stackscope-dap/src/events.rs
// ============================================================================
// Module: Message Dispatch
// Description: Per-session message loop, event handlers, and reverse
//              requests.
// Purpose: Translate incoming DAP traffic into graph mutations, FIFO per
//          session.
// Dependencies: stackscope-wire, tokio, crate::{client, debugger, session}
// ============================================================================

//! ## Overview
//! Each attached session runs one local task draining its transport.
//! Responses route to the request client; events mutate the graph through
//! type-specific handlers; reverse requests are answered inline. Malformed
//! bodies are logged and dropped, never fatal.
//!
//! Invariants:
//! - Events are processed in arrival order per session.
//! - The `stopped` handler stale-marks the previous current stack before
//!   the replacement stack is linked.

use std::rc::Rc;

use stackscope_graph::Node;
use stackscope_wire::BreakpointEventBody;
use stackscope_wire::ContinuedEventBody;
use stackscope_wire::Event;
use stackscope_wire::InitializeRequestArguments;
use stackscope_wire::Message;
use stackscope_wire::OutputEventBody;
use stackscope_wire::Request;
use stackscope_wire::StackTraceArguments;
use stackscope_wire::StartDebuggingRequestArguments;
use stackscope_wire::StoppedEventBody;
use stackscope_wire::ThreadEventBody;
use stackscope_wire::Transport;

use crate::breakpoint::BreakpointBinding;
use crate::client::RequestClient;
use crate::debugger::Debugger;
use crate::error::DapError;
use crate::frame::Frame;
use crate::output::Output;
use crate::session::LaunchSpec;
use crate::session::Session;
use crate::session::SessionState;
use crate::session::parse_body;
use crate::session::to_arguments;
use crate::sync;
use crate::thread::Stack;
use crate::thread::Thread;
use crate::thread::ThreadState;

/// Wires a transport to a session and spawns its message loop.
pub(crate) fn attach_transport(
    debugger: &Debugger,
    session: &Rc<Session>,
    transport: Rc<dyn Transport>,
) {
    let client = Rc::new(RequestClient::new(Rc::clone(&transport)));
    *session.client.borrow_mut() = Some(client);
    let Some(mut incoming) = transport.take_incoming() else {
        tracing::error!(
            target: "stackscope::dap",
            session_id = %session.session_id.get_untracked(),
            "transport incoming stream was already taken"
        );
        return;
    };
    let debugger = debugger.clone();
    let session = Rc::clone(session);
    tokio::task::spawn_local(async move {
        while let Some(message) = incoming.recv().await {
            dispatch_message(&debugger, &session, message);
        }
        on_transport_closed(&session);
    });
}

/// Routes one incoming message.
pub(crate) fn dispatch_message(debugger: &Debugger, session: &Rc<Session>, message: Message) {
    match message {
        Message::Response(response) => {
            if let Ok(client) = session.client() {
                client.dispatch_response(response);
            }
        }
        Message::Event(event) => handle_event(debugger, session, event),
        Message::Request(request) => handle_reverse_request(debugger, session, &request),
    }
}

/// Dispatches one adapter event to its handler.
fn handle_event(debugger: &Debugger, session: &Rc<Session>, event: Event) {
    let session_id = session.session_id.get_untracked();
    tracing::debug!(
        target: "stackscope::dap",
        session_id = %session_id,
        event = %event.event,
        "adapter event"
    );
    let outcome = match event.event.as_str() {
        "initialized" => {
            let debugger = debugger.clone();
            let session = Rc::clone(session);
            tokio::task::spawn_local(async move {
                if let Err(error) = configure(&debugger, &session).await {
                    tracing::warn!(
                        target: "stackscope::dap",
                        session_id = %session.session_id.get_untracked(),
                        %error,
                        "configuration phase failed"
                    );
                }
            });
            Ok(())
        }
        "stopped" => parse_body::<StoppedEventBody>(event.body).map(|body| {
            let debugger = debugger.clone();
            let session = Rc::clone(session);
            tokio::task::spawn_local(async move {
                handle_stopped(&debugger, &session, body).await;
            });
        }),
        "continued" => {
            parse_body::<ContinuedEventBody>(event.body).map(|body| {
                if let Some(thread) = session.find_thread(body.thread_id) {
                    session.apply_continued(&thread, body.all_threads_continued.unwrap_or(false));
                }
            })
        }
        "thread" => parse_body::<ThreadEventBody>(event.body)
            .map(|body| handle_thread_event(session, &body)),
        "output" => parse_body::<OutputEventBody>(event.body)
            .map(|body| handle_output(debugger, session, body)),
        "breakpoint" => parse_body::<BreakpointEventBody>(event.body)
            .map(|body| handle_breakpoint_event(session, &body)),
        "terminated" | "exited" => {
            session.finalize_termination();
            Ok(())
        }
        other => {
            tracing::debug!(
                target: "stackscope::dap",
                session_id = %session_id,
                event = other,
                "ignoring unhandled event"
            );
            Ok(())
        }
    };
    if let Err(error) = outcome {
        // Malformed bodies are dropped; the session continues.
        tracing::warn!(
            target: "stackscope::dap",
            session_id = %session_id,
            event = %event.event,
            %error,
            "dropping malformed event"
        );
    }
}

/// Runs the configuration phase after the `initialized` event.
async fn configure(debugger: &Debugger, session: &Rc<Session>) -> Result<(), DapError> {
    sync::sync_all_breakpoints(debugger, session).await?;
    sync::sync_exception_filters(debugger, session).await?;
    if session
        .capabilities
        .get_untracked()
        .supports_configuration_done_request
    {
        let client = session.client()?;
        client.request("configurationDone", None).await?;
    }
    Ok(())
}

/// Handles a `stopped` event: thread states, stack replacement, and hits.
async fn handle_stopped(debugger: &Debugger, session: &Rc<Session>, body: StoppedEventBody) {
    session.transition(SessionState::Stopped);
    let all_stopped = body.all_threads_stopped.unwrap_or(false);
    let needs_thread_list = match body.thread_id {
        Some(thread_id) => session.find_thread(thread_id).is_none(),
        None => true,
    } || all_stopped;
    if needs_thread_list {
        if let Err(error) = session.fetch_threads().await {
            tracing::warn!(
                target: "stackscope::dap",
                session_id = %session.session_id.get_untracked(),
                %error,
                "thread fetch after stop failed"
            );
        }
    }
    if all_stopped {
        for thread in session.thread_entities() {
            if thread.state.get_untracked() == ThreadState::Running {
                thread.state.set(ThreadState::Stopped);
            }
        }
    }
    let Some(thread) = body
        .thread_id
        .and_then(|thread_id| session.find_thread(thread_id))
        .or_else(|| session.thread_entities().into_iter().next())
    else {
        return;
    };
    thread.state.set(ThreadState::Stopped);
    thread.stop_reason.set(Some(body.reason.clone()));
    let stack = match fetch_stack(debugger, session, &thread, &body.reason).await {
        Ok(stack) => stack,
        Err(error) => {
            tracing::warn!(
                target: "stackscope::dap",
                session_id = %session.session_id.get_untracked(),
                %error,
                "stack fetch after stop failed"
            );
            return;
        }
    };
    if body.reason == "breakpoint" {
        apply_breakpoint_hits(debugger, session, &stack, body.hit_breakpoint_ids.as_deref());
    }
}

/// Fetches a thread's stack, retiring the previous current stack first.
async fn fetch_stack(
    debugger: &Debugger,
    session: &Rc<Session>,
    thread: &Rc<Thread>,
    reason: &str,
) -> Result<Rc<Stack>, DapError> {
    let client = session.client()?;
    let body = client
        .request(
            "stackTrace",
            to_arguments(&StackTraceArguments {
                thread_id: thread.thread_id.get_untracked(),
                start_frame: None,
                levels: None,
            }),
        )
        .await?;
    let body: stackscope_wire::StackTraceResponseBody = parse_body(body)?;
    let store = debugger.store().clone();
    if let Some(previous) = thread.current_stack.get_untracked() {
        store.mark_stale(previous);
    }
    let index = session.next_stack_index.get();
    session.next_stack_index.set(index + 1);
    let stack = Stack::create(&store, index, reason.to_owned());
    stack.thread.relink(thread.id());
    thread.stacks.link(stack.id());
    for (position, wire) in body.stack_frames.iter().enumerate() {
        let frame = Frame::create(
            &store,
            wire.id,
            position as i64,
            wire.name.clone(),
            wire.line,
            wire.column,
            wire.presentation_hint.clone(),
        );
        frame.stack.relink(stack.id());
        if let Some(source) = &wire.source {
            if let Ok(interned) = debugger.intern_source(session, source) {
                frame.source.relink(interned.id());
            }
        }
        stack.frames.link(frame.id());
    }
    Ok(stack)
}

/// Marks breakpoint bindings hit, from adapter ids or the line polyfill.
///
/// When the adapter names `hitBreakpointIds`, those bindings are marked.
/// Otherwise the top frame's source and line identify the breakpoint; its
/// session-scoped binding is marked. Other bindings are untouched.
fn apply_breakpoint_hits(
    debugger: &Debugger,
    session: &Rc<Session>,
    stack: &Rc<Stack>,
    hit_ids: Option<&[i64]>,
) {
    let store = debugger.store();
    let bindings: Vec<Rc<BreakpointBinding>> = session
        .session_breakpoint_bindings(store)
        .into_iter()
        .filter_map(|id| store.get_as::<BreakpointBinding>(id))
        .collect();
    if let Some(hit_ids) = hit_ids {
        if !hit_ids.is_empty() {
            for binding in &bindings {
                if binding
                    .adapter_id
                    .get_untracked()
                    .is_some_and(|id| hit_ids.contains(&id))
                {
                    binding.hit.set(true);
                }
            }
            return;
        }
    }
    // Polyfill: no adapter-reported ids; infer from the top frame.
    let Some(top) = stack
        .frames
        .first()
        .and_then(|id| store.get_as::<Frame>(id))
    else {
        return;
    };
    let Some(source) = top.source.get_untracked() else {
        return;
    };
    let line = top.line.get_untracked();
    for binding in &bindings {
        let Some(breakpoint) = binding
            .breakpoint
            .get_untracked()
            .and_then(|id| store.get_as::<crate::breakpoint::Breakpoint>(id))
        else {
            continue;
        };
        let same_source = breakpoint.source.get_untracked() == Some(source);
        let same_line = breakpoint.line.get_untracked() == line
            || binding.actual_line.get_untracked() == Some(line);
        if same_source && same_line {
            binding.hit.set(true);
        }
    }
}

/// Handles `thread` events: creation on `started`, retirement on `exited`.
fn handle_thread_event(session: &Rc<Session>, body: &ThreadEventBody) {
    match body.reason.as_str() {
        "started" => {
            if session.find_thread(body.thread_id).is_none() {
                let Some(store) = session.store() else {
                    return;
                };
                let thread = Thread::create(
                    &store,
                    body.thread_id,
                    format!("Thread {}", body.thread_id),
                );
                thread.session.relink(session.id());
                session.threads.link(thread.id());
            }
        }
        "exited" => {
            if let Some(thread) = session.find_thread(body.thread_id) {
                thread.state.set(ThreadState::Exited);
                if let Some(store) = session.store() {
                    store.mark_stale(thread.id());
                }
            }
        }
        other => {
            tracing::debug!(
                target: "stackscope::dap",
                reason = other,
                "ignoring thread event reason"
            );
        }
    }
}

/// Handles `output` events: an ordered session-owned output line.
fn handle_output(debugger: &Debugger, session: &Rc<Session>, body: OutputEventBody) {
    let store = debugger.store();
    let output = Output::create(
        store,
        body.category.unwrap_or_else(|| "console".to_owned()),
        body.output,
        body.line,
    );
    output.session.relink(session.id());
    if let Some(source) = &body.source {
        if let Ok(interned) = debugger.intern_source(session, source) {
            output.source.relink(interned.id());
        }
    }
    session.outputs.link(output.id());
}

/// Handles `breakpoint` events: adapter-side binding updates.
fn handle_breakpoint_event(session: &Rc<Session>, body: &BreakpointEventBody) {
    let Some(store) = session.store() else {
        return;
    };
    let Some(adapter_id) = body.breakpoint.id else {
        return;
    };
    let binding = session
        .session_breakpoint_bindings(&store)
        .into_iter()
        .filter_map(|id| store.get_as::<BreakpointBinding>(id))
        .find(|binding| binding.adapter_id.get_untracked() == Some(adapter_id));
    let Some(binding) = binding else {
        return;
    };
    if body.reason == "removed" {
        binding.verified.set(false);
        binding.actual_line.set(None);
        binding.actual_column.set(None);
        return;
    }
    binding.verified.set(body.breakpoint.verified);
    binding.actual_line.set(body.breakpoint.line);
    binding.actual_column.set(body.breakpoint.column);
}

/// Answers a reverse request from the adapter.
fn handle_reverse_request(debugger: &Debugger, session: &Rc<Session>, request: &Request) {
    let Ok(client) = session.client() else {
        return;
    };
    match request.command.as_str() {
        "startDebugging" => {
            let arguments: Result<StartDebuggingRequestArguments, DapError> =
                parse_body(request.arguments.clone());
            match arguments {
                Ok(arguments) => {
                    let spec = child_launch_spec(session, &arguments);
                    match debugger.start_child_session(session, spec) {
                        Ok(_) => client.respond(request, true, None, None),
                        Err(error) => {
                            client.respond(request, false, Some(error.to_string()), None);
                        }
                    }
                }
                Err(error) => client.respond(request, false, Some(error.to_string()), None),
            }
        }
        "runInTerminal" => {
            // The core has no terminal to offer.
            client.respond(
                request,
                false,
                Some("runInTerminal is not supported".to_owned()),
                None,
            );
        }
        other => {
            client.respond(
                request,
                false,
                Some(format!("unsupported reverse request: {other}")),
                None,
            );
        }
    }
}

/// Derives the child session's launch specification from a reverse
/// `startDebugging` request.
fn child_launch_spec(
    parent: &Rc<Session>,
    arguments: &StartDebuggingRequestArguments,
) -> LaunchSpec {
    let parent_spec = parent.launch_spec.borrow().clone();
    let name = arguments
        .configuration
        .get("name")
        .and_then(|name| name.as_str())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| format!("{} (child)", parent.name.get_untracked()));
    LaunchSpec {
        name,
        adapter_id: parent_spec
            .map(|spec| spec.adapter_id)
            .unwrap_or_else(|| "unknown".to_owned()),
        request: arguments.request.clone(),
        configuration: arguments.configuration.clone(),
    }
}

/// Handles transport death: session-fatal, owned debug state disposed,
/// outputs preserved until session disposal.
fn on_transport_closed(session: &Rc<Session>) {
    if session.state.get_untracked() != SessionState::Terminated {
        tracing::info!(
            target: "stackscope::dap",
            session_id = %session.session_id.get_untracked(),
            "adapter transport closed"
        );
    }
    if let Ok(client) = session.client() {
        client.fail_all(|| DapError::TransportDead);
    }
    session.finalize_termination();
}

/// Runs the initialize handshake and the launch or attach request.
///
/// A failed launch or attach terminates the session, per the failure
/// policy; other request failures surface to the caller without state
/// change.
pub(crate) async fn start_protocol(
    debugger: &Debugger,
    session: &Rc<Session>,
    spec: &LaunchSpec,
) -> Result<(), DapError> {
    let client = session.client()?;
    let body = client
        .request(
            "initialize",
            to_arguments(&InitializeRequestArguments {
                client_id: Some("stackscope".to_owned()),
                client_name: Some("stackscope".to_owned()),
                adapter_id: spec.adapter_id.clone(),
                lines_start_at1: true,
                columns_start_at1: true,
                path_format: Some("path".to_owned()),
                supports_variable_type: true,
                supports_start_debugging_request: true,
            }),
        )
        .await?;
    let capabilities: stackscope_wire::Capabilities = parse_body(body)?;
    session.capabilities.set(capabilities);
    debugger.register_exception_filters(session);
    match client
        .request(&spec.request, Some(spec.configuration.clone()))
        .await
    {
        Ok(_) => {
            session.transition(SessionState::Running);
            Ok(())
        }
        Err(error) => {
            session.finalize_termination();
            Err(error)
        }
    }
}
