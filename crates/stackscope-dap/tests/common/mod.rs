// crates/stackscope-dap/tests/common/mod.rs
// ============================================================================
// Module: Fake Adapter Harness
// Description: In-process scripted adapter for session integration tests.
// Purpose: Answer DAP requests deterministically and emit events on
//          command, over the channel transport.
// Dependencies: stackscope-dap, stackscope-wire, tokio, serde_json
// ============================================================================

//! Shared test harness: a [`FakeAdapter`] that implements
//! [`SessionSpawner`], answers every request the client issues, and exposes
//! an [`AdapterControl`] per session for emitting events mid-test.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    dead_code,
    reason = "Test-only helpers; not every test uses every helper."
)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;
use serde_json::json;
use stackscope_dap::DapError;
use stackscope_dap::Debugger;
use stackscope_dap::LaunchSpec;
use stackscope_dap::SessionSpawner;
use stackscope_wire::Capabilities;
use stackscope_wire::ChannelTransport;
use stackscope_wire::Event;
use stackscope_wire::Message;
use stackscope_wire::Request;
use stackscope_wire::Response;
use stackscope_wire::Transport;
use stackscope_wire::TransportPeer;
use tokio::sync::mpsc;

/// Commands a test can issue to a running fake adapter.
pub enum Control {
    /// Emit a `stopped` event with the given frame list installed.
    Stop {
        /// Thread that stopped.
        thread_id: i64,
        /// Stop reason.
        reason: String,
        /// Frames for the next `stackTrace` response, top first.
        frames: Vec<Value>,
        /// `hitBreakpointIds` for the event; `None` omits the field.
        hit_ids: Option<Vec<i64>>,
    },
    /// Install the variables returned for one `variablesReference`.
    SetVariables {
        /// Container reference.
        reference: i64,
        /// Variables to report.
        variables: Vec<Value>,
    },
    /// Emit an `output` event.
    Output {
        /// Output category.
        category: String,
        /// Output text.
        text: String,
    },
    /// Emit a `terminated` event.
    Terminated,
    /// Emit a reverse `startDebugging` request.
    StartChild {
        /// Child configuration value.
        configuration: Value,
    },
    /// Drop the transport, simulating adapter death.
    Close,
}

/// Cloneable control handle for one spawned session.
#[derive(Clone)]
pub struct AdapterControl {
    sender: mpsc::UnboundedSender<Control>,
}

impl AdapterControl {
    /// Emits a stop at one source line with a single frame.
    pub fn stop_at_line(&self, thread_id: i64, reason: &str, path: &str, line: i64) {
        self.send(Control::Stop {
            thread_id,
            reason: reason.to_owned(),
            frames: vec![frame_json(1, "main", path, line)],
            hit_ids: None,
        });
    }

    /// Emits a stop with explicit frames and optional hit ids.
    pub fn stop(
        &self,
        thread_id: i64,
        reason: &str,
        frames: Vec<Value>,
        hit_ids: Option<Vec<i64>>,
    ) {
        self.send(Control::Stop {
            thread_id,
            reason: reason.to_owned(),
            frames,
            hit_ids,
        });
    }

    /// Installs the variables reported for a reference.
    pub fn set_variables(&self, reference: i64, variables: Vec<Value>) {
        self.send(Control::SetVariables {
            reference,
            variables,
        });
    }

    /// Emits an output event.
    pub fn output(&self, category: &str, text: &str) {
        self.send(Control::Output {
            category: category.to_owned(),
            text: text.to_owned(),
        });
    }

    /// Emits a terminated event.
    pub fn terminated(&self) {
        self.send(Control::Terminated);
    }

    /// Emits a reverse `startDebugging` request.
    pub fn start_child(&self, configuration: Value) {
        self.send(Control::StartChild { configuration });
    }

    /// Drops the transport.
    pub fn close(&self) {
        self.send(Control::Close);
    }

    fn send(&self, control: Control) {
        self.sender.send(control).expect("adapter task is gone");
    }
}

/// Script shared by every session the adapter spawns.
#[derive(Clone)]
pub struct AdapterScript {
    /// Capabilities advertised on `initialize`.
    pub capabilities: Capabilities,
    /// Line adjustments applied to `setBreakpoints` responses.
    pub line_adjustments: HashMap<i64, i64>,
    /// Scope reference handed out per stop; incremented each stop.
    pub first_scope_reference: i64,
}

impl Default for AdapterScript {
    fn default() -> Self {
        Self {
            capabilities: Capabilities {
                supports_configuration_done_request: true,
                supports_conditional_breakpoints: true,
                supports_set_variable: true,
                supports_terminate_request: true,
                ..Capabilities::default()
            },
            line_adjustments: HashMap::new(),
            first_scope_reference: 1000,
        }
    }
}

/// Spawner producing one scripted in-process adapter per session.
pub struct FakeAdapter {
    /// Script template for new sessions.
    pub script: RefCell<AdapterScript>,
    /// Control handles, in spawn order.
    controls: RefCell<Vec<AdapterControl>>,
}

impl FakeAdapter {
    /// Creates an adapter factory with the default script.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            script: RefCell::new(AdapterScript::default()),
            controls: RefCell::new(Vec::new()),
        })
    }

    /// Returns the control handle of the `index`-th spawned session.
    pub fn control(&self, index: usize) -> AdapterControl {
        self.controls.borrow()[index].clone()
    }

    /// Number of sessions spawned so far.
    pub fn spawned(&self) -> usize {
        self.controls.borrow().len()
    }
}

impl SessionSpawner for FakeAdapter {
    fn spawn(&self, _spec: &LaunchSpec) -> Result<Rc<dyn Transport>, DapError> {
        let (transport, peer) = ChannelTransport::pair();
        let (sender, receiver) = mpsc::unbounded_channel();
        self.controls.borrow_mut().push(AdapterControl { sender });
        let script = self.script.borrow().clone();
        tokio::task::spawn_local(run_adapter(peer, receiver, script));
        Ok(Rc::new(transport))
    }
}

/// Builds a debugger wired to a fresh fake adapter.
pub fn harness() -> (Debugger, Rc<FakeAdapter>) {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("stackscope=debug")
        .try_init();
    let debugger = Debugger::new();
    let adapter = FakeAdapter::new();
    debugger.set_spawner(Rc::clone(&adapter) as Rc<dyn SessionSpawner>);
    (debugger, adapter)
}

/// A plain launch specification for tests.
pub fn spec(name: &str) -> LaunchSpec {
    LaunchSpec {
        name: name.to_owned(),
        adapter_id: "fake".to_owned(),
        request: "launch".to_owned(),
        configuration: json!({ "program": "/work/app.py" }),
    }
}

/// Builds one wire stack frame as JSON.
pub fn frame_json(id: i64, name: &str, path: &str, line: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "line": line,
        "column": 1,
        "source": { "name": "app.py", "path": path },
    })
}

/// Builds one wire variable as JSON.
pub fn variable_json(name: &str, value: &str, reference: i64) -> Value {
    json!({
        "name": name,
        "value": value,
        "variablesReference": reference,
    })
}

/// Polls `condition` across task switches until it holds.
///
/// Panics after a bounded number of scheduler turns so a broken condition
/// fails the test instead of hanging it.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition did not hold within the scheduling budget");
}

/// Per-session adapter state.
struct AdapterState {
    script: AdapterScript,
    /// Frames for the next `stackTrace` response.
    frames: Vec<Value>,
    /// Variables per reference.
    variables: HashMap<i64, Vec<Value>>,
    /// Scope reference for the current stop.
    scope_reference: i64,
    /// Next event sequence number.
    next_seq: u64,
}

impl AdapterState {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// Runs one scripted adapter until its transport or control closes.
async fn run_adapter(
    mut peer: TransportPeer,
    mut controls: mpsc::UnboundedReceiver<Control>,
    script: AdapterScript,
) {
    let mut state = AdapterState {
        scope_reference: script.first_scope_reference,
        script,
        frames: Vec::new(),
        variables: HashMap::new(),
        next_seq: 0,
    };
    loop {
        tokio::select! {
            message = peer.recv() => {
                let Some(message) = message else { break };
                if let Message::Request(request) = message {
                    if !handle_request(&mut peer, &mut state, &request) {
                        break;
                    }
                }
            }
            control = controls.recv() => {
                let Some(control) = control else { break };
                if !handle_control(&mut peer, &mut state, control) {
                    break;
                }
            }
        }
    }
}

/// Answers one client request. Returns false to drop the transport.
fn handle_request(peer: &mut TransportPeer, state: &mut AdapterState, request: &Request) -> bool {
    let body = match request.command.as_str() {
        "initialize" => Some(serde_json::to_value(&state.script.capabilities).unwrap()),
        "launch" | "attach" => {
            respond(peer, state, request, None);
            emit(peer, state, "initialized", None);
            return true;
        }
        "setBreakpoints" => {
            let requested = request.arguments.as_ref().and_then(|arguments| {
                arguments.get("breakpoints").and_then(Value::as_array).cloned()
            });
            let breakpoints: Vec<Value> = requested
                .unwrap_or_default()
                .iter()
                .map(|breakpoint| {
                    let line = breakpoint.get("line").and_then(Value::as_i64).unwrap_or(0);
                    let actual = state
                        .script
                        .line_adjustments
                        .get(&line)
                        .copied()
                        .unwrap_or(line);
                    json!({
                        "id": 100 + line,
                        "verified": true,
                        "line": actual,
                    })
                })
                .collect();
            Some(json!({ "breakpoints": breakpoints }))
        }
        "setExceptionBreakpoints" | "configurationDone" | "pause" | "next" | "stepIn"
        | "stepOut" => None,
        "threads" => Some(json!({ "threads": [{ "id": 1, "name": "main" }] })),
        "stackTrace" => Some(json!({
            "stackFrames": state.frames.clone(),
            "totalFrames": state.frames.len(),
        })),
        "scopes" => Some(json!({
            "scopes": [{
                "name": "Locals",
                "variablesReference": state.scope_reference,
                "expensive": false,
            }],
        })),
        "variables" => {
            let reference = request
                .arguments
                .as_ref()
                .and_then(|arguments| arguments.get("variablesReference"))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            let variables = state.variables.get(&reference).cloned().unwrap_or_default();
            Some(json!({ "variables": variables }))
        }
        "continue" => Some(json!({ "allThreadsContinued": true })),
        "evaluate" => Some(json!({ "result": "<evaluated>", "variablesReference": 0 })),
        "setVariable" => {
            let value = request
                .arguments
                .as_ref()
                .and_then(|arguments| arguments.get("value"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            Some(json!({ "value": value, "variablesReference": 0 }))
        }
        "terminate" | "disconnect" => {
            respond(peer, state, request, None);
            return false;
        }
        other => {
            let seq = state.next_seq();
            let _ = peer.send(Message::Response(Response {
                seq,
                request_seq: request.seq,
                success: false,
                command: request.command.clone(),
                message: Some(format!("unsupported command: {other}")),
                body: None,
            }));
            return true;
        }
    };
    respond(peer, state, request, body);
    true
}

/// Applies one control command. Returns false to drop the transport.
fn handle_control(peer: &mut TransportPeer, state: &mut AdapterState, control: Control) -> bool {
    match control {
        Control::Stop {
            thread_id,
            reason,
            frames,
            hit_ids,
        } => {
            state.frames = frames;
            state.scope_reference += 1;
            let mut body = json!({
                "reason": reason,
                "threadId": thread_id,
                "allThreadsStopped": true,
            });
            if let Some(hit_ids) = hit_ids {
                body["hitBreakpointIds"] = json!(hit_ids);
            }
            emit(peer, state, "stopped", Some(body));
        }
        Control::SetVariables {
            reference,
            variables,
        } => {
            state.variables.insert(reference, variables);
        }
        Control::Output { category, text } => {
            emit(
                peer,
                state,
                "output",
                Some(json!({ "category": category, "output": text })),
            );
        }
        Control::Terminated => emit(peer, state, "terminated", None),
        Control::StartChild { configuration } => {
            let seq = state.next_seq();
            let _ = peer.send(Message::Request(Request {
                seq,
                command: "startDebugging".to_owned(),
                arguments: Some(json!({
                    "configuration": configuration,
                    "request": "attach",
                })),
            }));
        }
        Control::Close => return false,
    }
    true
}

/// Sends a success response.
fn respond(peer: &mut TransportPeer, state: &mut AdapterState, request: &Request, body: Option<Value>) {
    let seq = state.next_seq();
    let _ = peer.send(Message::Response(Response {
        seq,
        request_seq: request.seq,
        success: true,
        command: request.command.clone(),
        message: None,
        body,
    }));
}

/// Sends an event.
fn emit(peer: &mut TransportPeer, state: &mut AdapterState, event: &str, body: Option<Value>) {
    let seq = state.next_seq();
    let _ = peer.send(Message::Event(Event {
        seq,
        event: event.to_owned(),
        body,
    }));
}

/// Returns the current stop's scope reference for a control sequence.
pub fn scope_reference_for_stop(script: &AdapterScript, stop_number: i64) -> i64 {
    script.first_scope_reference + stop_number
}
