// crates/stackscope-wire/src/message.rs
// ============================================================================
// Module: Message Envelope
// Description: The three-way DAP message envelope.
// Purpose: Classify incoming traffic into requests, responses, and events,
//          and carry sequencing metadata.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every DAP message is one of three kinds, discriminated by the `type`
//! field: a request (also sent by adapters as reverse requests), a response
//! matched to a request by `request_seq`, or an event.
//!
//! Invariants:
//! - `seq` is assigned monotonically per sender.
//! - Responses are matched by `request_seq`; arrival order is not assumed.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// A DAP message, classified by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// A request, from the client or (reverse) from the adapter.
    Request(Request),
    /// A response to a prior request.
    Response(Response),
    /// An adapter-initiated event.
    Event(Event),
}

/// A DAP request.
///
/// # Invariants
/// - `seq` is unique per sender connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Sender-assigned sequence number.
    pub seq: u64,
    /// Request command name.
    pub command: String,
    /// Command arguments, request-specific.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// A DAP response.
///
/// # Invariants
/// - `request_seq` names the request being answered.
/// - `body` is meaningful only when `success` is true; `message` carries the
///   error summary otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Sender-assigned sequence number.
    pub seq: u64,
    /// Sequence number of the request being answered. This field is
    /// snake_case on the wire, unlike the rest of the protocol.
    #[serde(rename = "request_seq")]
    pub request_seq: u64,
    /// Whether the request succeeded.
    pub success: bool,
    /// Command name echoed from the request.
    pub command: String,
    /// Error summary for failed requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Response body, command-specific.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// A DAP event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Sender-assigned sequence number.
    pub seq: u64,
    /// Event name.
    pub event: String,
    /// Event body, event-specific.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}
