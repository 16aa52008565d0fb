// crates/stackscope-wire/src/lib.rs
// ============================================================================
// Module: Stackscope Wire
// Description: Debug Adapter Protocol wire types and transport abstraction.
// Purpose: Model DAP messages as typed serde structures and expose the
//          duplex channel the session layer speaks through.
// Dependencies: serde, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! This crate carries the wire surface of the Debug Adapter Protocol: the
//! three-way message envelope (request, response, event), the request and
//! event bodies the client consumes, and the [`Transport`] trait hiding how
//! bytes reach the adapter process.
//!
//! Invariants:
//! - Wire field names follow the DAP specification (camelCase); Rust names
//!   are snake_case with serde renames.
//! - Unknown fields are ignored on deserialization; absent optional fields
//!   default, so partial adapter implementations stay parseable.

mod message;
mod requests;
mod transport;
mod types;

pub use message::Event;
pub use message::Message;
pub use message::Request;
pub use message::Response;
pub use requests::ContinueArguments;
pub use requests::ContinueResponseBody;
pub use requests::DisconnectArguments;
pub use requests::EvaluateArguments;
pub use requests::EvaluateResponseBody;
pub use requests::InitializeRequestArguments;
pub use requests::PauseArguments;
pub use requests::ScopesArguments;
pub use requests::ScopesResponseBody;
pub use requests::SetBreakpointsArguments;
pub use requests::SetBreakpointsResponseBody;
pub use requests::SetExceptionBreakpointsArguments;
pub use requests::SetVariableArguments;
pub use requests::SetVariableResponseBody;
pub use requests::StackTraceArguments;
pub use requests::StackTraceResponseBody;
pub use requests::StartDebuggingRequestArguments;
pub use requests::StepArguments;
pub use requests::SteppingGranularity;
pub use requests::TerminateArguments;
pub use requests::ThreadsResponseBody;
pub use requests::VariablesArguments;
pub use requests::VariablesResponseBody;
pub use transport::ChannelTransport;
pub use transport::Transport;
pub use transport::TransportError;
pub use transport::TransportPeer;
pub use types::Breakpoint;
pub use types::BreakpointEventBody;
pub use types::Capabilities;
pub use types::Checksum;
pub use types::ContinuedEventBody;
pub use types::ExceptionBreakpointsFilter;
pub use types::ExceptionFilterOptions;
pub use types::ExitedEventBody;
pub use types::OutputEventBody;
pub use types::Scope;
pub use types::Source;
pub use types::SourceBreakpoint;
pub use types::StackFrame;
pub use types::StoppedEventBody;
pub use types::TerminatedEventBody;
pub use types::Thread;
pub use types::ThreadEventBody;
pub use types::Variable;

#[cfg(test)]
mod tests;
