// crates/stackscope-dap/src/lib.rs
// ============================================================================
// Module: Stackscope DAP
// Description: Debug Adapter Protocol domain model over the reactive graph.
// Purpose: Drive DAP sessions through the entity graph: state machines,
//          source deduplication, breakpoint bindings, stacks, and
//          variables, all observable through signals and URL queries.
// Dependencies: stackscope-graph, stackscope-query, stackscope-reactive,
//               stackscope-wire, tokio, serde, serde_json, sha2, thiserror,
//               tracing
// ============================================================================

//! ## Overview
//! This crate is the consumer-facing layer: a [`Debugger`] owning sessions,
//! sources, breakpoints, exception filters, and config groups, with every
//! entity's fields observable as signals and every relationship addressable
//! through URL queries.
//!
//! The runtime model is single-threaded cooperative: graph reads and
//! mutations never yield; only DAP requests suspend. Sessions are driven on
//! a tokio current-thread runtime inside a `LocalSet`.
//!
//! Invariants:
//! - Session state machines reach `terminated` monotonically.
//! - Stale debug state (previous stacks, replaced variables) stays
//!   queryable until its owner is disposed.
//! - One source entity per correlation key, one binding per
//!   (session, source).

mod breakpoint;
mod client;
mod config;
mod correlation;
mod debugger;
mod error;
mod events;
mod exception;
mod frame;
mod output;
mod session;
mod source;
mod sync;
mod thread;
mod variable;

pub use breakpoint::Breakpoint;
pub use breakpoint::BreakpointBinding;
pub use breakpoint::DisplayState;
pub use client::DEFAULT_REQUEST_TIMEOUT;
pub use config::Config;
pub use config::ConfigState;
pub use config::ViewMode;
pub use correlation::correlation_key;
pub use debugger::Debugger;
pub use debugger::DebuggerEntity;
pub use debugger::SessionSpawner;
pub use error::DapError;
pub use exception::ExceptionFilter;
pub use exception::ExceptionFilterBinding;
pub use frame::Frame;
pub use frame::VariableScope;
pub use output::Output;
pub use session::LaunchSpec;
pub use session::Session;
pub use session::SessionState;
pub use source::Source;
pub use source::SourceBinding;
pub use thread::Stack;
pub use thread::Thread;
pub use thread::ThreadState;
pub use variable::Variable;
pub use variable::VariableObservation;
