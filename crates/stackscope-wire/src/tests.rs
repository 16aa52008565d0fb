// crates/stackscope-wire/src/tests.rs
// ============================================================================
// Module: Wire Unit Tests
// Description: Envelope classification, field naming, and transport pairing.
// Purpose: Validate DAP-conformant serialization and the in-process
//          transport semantics.
// Dependencies: stackscope-wire, serde_json, tokio
// ============================================================================

//! Unit tests for the wire surface.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use serde_json::json;

use crate::Capabilities;
use crate::ChannelTransport;
use crate::Message;
use crate::Request;
use crate::Source;
use crate::StoppedEventBody;
use crate::Transport;

#[test]
fn envelope_classifies_by_type_tag() {
    let request: Message = serde_json::from_value(json!({
        "seq": 1, "type": "request", "command": "initialize", "arguments": {"adapterID": "fake"}
    }))
    .unwrap();
    assert!(matches!(request, Message::Request(_)));

    let response: Message = serde_json::from_value(json!({
        "seq": 2, "type": "response", "request_seq": 1, "success": true, "command": "initialize"
    }))
    .unwrap();
    match response {
        Message::Response(response) => {
            assert_eq!(response.request_seq, 1);
            assert!(response.success);
            assert!(response.body.is_none());
        }
        other => panic!("expected response, got {other:?}"),
    }

    let event: Message = serde_json::from_value(json!({
        "seq": 3, "type": "event", "event": "stopped",
        "body": {"reason": "breakpoint", "threadId": 7}
    }))
    .unwrap();
    match event {
        Message::Event(event) => {
            let body: StoppedEventBody = serde_json::from_value(event.body.unwrap()).unwrap();
            assert_eq!(body.reason, "breakpoint");
            assert_eq!(body.thread_id, Some(7));
            assert_eq!(body.hit_breakpoint_ids, None);
        }
        other => panic!("expected event, got {other:?}"),
    }
}

#[test]
fn requests_serialize_with_wire_names() {
    let message = Message::Request(Request {
        seq: 9,
        command: "stackTrace".to_owned(),
        arguments: Some(json!({"threadId": 1})),
    });
    let value = serde_json::to_value(&message).unwrap();
    assert_eq!(value["type"], "request");
    assert_eq!(value["seq"], 9);
    assert_eq!(value["command"], "stackTrace");
}

#[test]
fn capabilities_tolerate_partial_and_unknown_fields() {
    let capabilities: Capabilities = serde_json::from_value(json!({
        "supportsConfigurationDoneRequest": true,
        "someFutureCapability": true
    }))
    .unwrap();
    assert!(capabilities.supports_configuration_done_request);
    assert!(!capabilities.supports_set_variable);
    assert!(capabilities.exception_breakpoint_filters.is_empty());
}

#[test]
fn source_round_trips_camel_case() {
    let source: Source = serde_json::from_value(json!({
        "name": "app.py",
        "path": "/work/app.py",
        "sourceReference": 0
    }))
    .unwrap();
    assert_eq!(source.source_reference, Some(0));
    let value = serde_json::to_value(&source).unwrap();
    assert_eq!(value["sourceReference"], 0);
    assert!(value.get("checksums").is_none());
}

#[tokio::test]
async fn channel_transport_delivers_both_directions() {
    let (transport, mut peer) = ChannelTransport::pair();
    transport
        .send(Message::Request(Request {
            seq: 1,
            command: "threads".to_owned(),
            arguments: None,
        }))
        .unwrap();
    let received = peer.recv().await.unwrap();
    assert!(matches!(received, Message::Request(request) if request.command == "threads"));

    peer.send(Message::Event(crate::Event {
        seq: 1,
        event: "initialized".to_owned(),
        body: None,
    }))
    .unwrap();
    let mut incoming = transport.take_incoming().unwrap();
    assert!(transport.take_incoming().is_none());
    let event = incoming.recv().await.unwrap();
    assert!(matches!(event, Message::Event(event) if event.event == "initialized"));
}

#[tokio::test]
async fn dropped_peer_closes_the_stream() {
    let (transport, peer) = ChannelTransport::pair();
    let mut incoming = transport.take_incoming().unwrap();
    drop(peer);
    assert!(incoming.recv().await.is_none());
    assert!(transport
        .send(Message::Event(crate::Event {
            seq: 1,
            event: "noise".to_owned(),
            body: None,
        }))
        .is_err());
}
