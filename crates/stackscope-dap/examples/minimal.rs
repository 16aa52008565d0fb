// crates/stackscope-dap/examples/minimal.rs
// ============================================================================
// Module: Stackscope Minimal Example
// Description: Minimal end-to-end debug session against an inline adapter.
// Purpose: Demonstrate launch, stop, stack inspection, and URL queries
//          without an external debug adapter.
// Dependencies: stackscope-dap, stackscope-wire, tokio
// ============================================================================

//! ## Overview
//! Drives one session against a tiny inline adapter: launch, hit a
//! breakpoint, read the top frame through a URL query, and terminate. The
//! example is transport-agnostic and suitable for quick verification.

use std::rc::Rc;

use serde_json::json;
use stackscope_dap::DapError;
use stackscope_dap::Debugger;
use stackscope_dap::Frame;
use stackscope_dap::LaunchSpec;
use stackscope_dap::SessionSpawner;
use stackscope_dap::SessionState;
use stackscope_wire::Capabilities;
use stackscope_wire::ChannelTransport;
use stackscope_wire::Event;
use stackscope_wire::Message;
use stackscope_wire::Request;
use stackscope_wire::Response;
use stackscope_wire::Transport;
use stackscope_wire::TransportPeer;

/// Spawner producing one inline adapter per session.
struct InlineAdapter;

impl SessionSpawner for InlineAdapter {
    fn spawn(&self, _spec: &LaunchSpec) -> Result<Rc<dyn Transport>, DapError> {
        let (transport, peer) = ChannelTransport::pair();
        tokio::task::spawn_local(run_adapter(peer));
        Ok(Rc::new(transport))
    }
}

/// Answers the handful of requests the example exercises.
async fn run_adapter(mut peer: TransportPeer) {
    let mut seq = 0u64;
    let mut next_seq = move || {
        seq += 1;
        seq
    };
    while let Some(message) = peer.recv().await {
        let Message::Request(request) = message else {
            continue;
        };
        let body = match request.command.as_str() {
            "initialize" => serde_json::to_value(Capabilities {
                supports_configuration_done_request: true,
                ..Capabilities::default()
            })
            .ok(),
            "launch" => {
                send_response(&peer, next_seq(), &request, None);
                send_event(&peer, next_seq(), "initialized", None);
                send_event(
                    &peer,
                    next_seq(),
                    "stopped",
                    Some(json!({
                        "reason": "breakpoint",
                        "threadId": 1,
                        "allThreadsStopped": true,
                    })),
                );
                continue;
            }
            "threads" => Some(json!({ "threads": [{ "id": 1, "name": "main" }] })),
            "stackTrace" => Some(json!({
                "stackFrames": [{
                    "id": 1,
                    "name": "main",
                    "line": 7,
                    "column": 1,
                    "source": { "name": "app.py", "path": "/work/app.py" },
                }],
            })),
            "disconnect" | "terminate" => {
                send_response(&peer, next_seq(), &request, None);
                return;
            }
            _ => None,
        };
        send_response(&peer, next_seq(), &request, body);
    }
}

fn send_response(peer: &TransportPeer, seq: u64, request: &Request, body: Option<serde_json::Value>) {
    let _ = peer.send(Message::Response(Response {
        seq,
        request_seq: request.seq,
        success: true,
        command: request.command.clone(),
        message: None,
        body,
    }));
}

fn send_event(peer: &TransportPeer, seq: u64, event: &str, body: Option<serde_json::Value>) {
    let _ = peer.send(Message::Event(Event {
        seq,
        event: event.to_owned(),
        body,
    }));
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), DapError> {
    tokio::task::LocalSet::new()
        .run_until(async {
            let debugger = Debugger::new();
            debugger.set_spawner(Rc::new(InlineAdapter));
            let session = debugger
                .start(LaunchSpec {
                    name: "example".to_owned(),
                    adapter_id: "inline".to_owned(),
                    request: "launch".to_owned(),
                    configuration: json!({ "program": "/work/app.py" }),
                })
                .await?;

            // Drain the stop: the adapter emits it right after launch.
            while session.state.get_untracked() != SessionState::Stopped
                || session
                    .find_thread(1)
                    .and_then(|thread| thread.current_stack.get_untracked())
                    .is_none()
            {
                tokio::task::yield_now().await;
            }

            let frame_id = debugger.query_one("/sessions[0]/threads[0]/stacks[0]/frames[0]")?;
            let frame = debugger
                .store()
                .get_as::<Frame>(frame_id)
                .ok_or(DapError::TransportDead)?;
            assert_eq!(frame.line.get_untracked(), 7);

            debugger.focus("/sessions[0]/threads[0]/stacks[0]/frames[0]")?;
            assert_eq!(debugger.query_one("@frame")?, frame_id);

            session.terminate().await?;
            assert_eq!(session.state.get_untracked(), SessionState::Terminated);
            Ok(())
        })
        .await
}
