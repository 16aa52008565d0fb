// crates/stackscope-wire/src/requests.rs
// ============================================================================
// Module: Request Bodies
// Description: Argument and response body types for client requests.
// Purpose: Give every request the client issues a typed argument and
//          response surface.
// Dependencies: serde, serde_json, crate::types
// ============================================================================

//! ## Overview
//! Typed bodies for the requests the client sends (`initialize`, `launch`
//! and friends, breakpoint and exception synchronisation, execution control,
//! and data fetches) plus the reverse `startDebugging` request the adapter
//! sends back.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::types::Breakpoint;
use crate::types::ExceptionFilterOptions;
use crate::types::Scope;
use crate::types::Source;
use crate::types::SourceBreakpoint;
use crate::types::StackFrame;
use crate::types::Thread;
use crate::types::Variable;

/// Arguments of the `initialize` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitializeRequestArguments {
    /// Client identifier.
    #[serde(rename = "clientID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Client display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    /// Adapter identifier the client believes it is talking to.
    #[serde(rename = "adapterID")]
    pub adapter_id: String,
    /// Whether line numbers are one-based.
    pub lines_start_at1: bool,
    /// Whether column numbers are one-based.
    pub columns_start_at1: bool,
    /// Path format, `path` or `uri`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_format: Option<String>,
    /// Client understands the `type` attribute on variables.
    pub supports_variable_type: bool,
    /// Client handles the reverse `startDebugging` request.
    pub supports_start_debugging_request: bool,
}

/// Arguments of the `setBreakpoints` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SetBreakpointsArguments {
    /// Source the breakpoints belong to.
    pub source: Source,
    /// Requested breakpoints, replacing any previous set for the source.
    pub breakpoints: Vec<SourceBreakpoint>,
}

/// Body of the `setBreakpoints` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SetBreakpointsResponseBody {
    /// Adapter-reported records, index-aligned with the request.
    pub breakpoints: Vec<Breakpoint>,
}

/// Arguments of the `setExceptionBreakpoints` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SetExceptionBreakpointsArguments {
    /// Enabled filter identifiers.
    pub filters: Vec<String>,
    /// Per-filter options, for adapters that support them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_options: Option<Vec<ExceptionFilterOptions>>,
}

/// Body of the `threads` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreadsResponseBody {
    /// All current threads.
    pub threads: Vec<Thread>,
}

/// Arguments of the `stackTrace` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StackTraceArguments {
    /// Thread to fetch the stack of.
    pub thread_id: i64,
    /// Index of the first frame to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_frame: Option<i64>,
    /// Maximum number of frames to return; `0` or absent means all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub levels: Option<i64>,
}

/// Body of the `stackTrace` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StackTraceResponseBody {
    /// Frames, top first.
    pub stack_frames: Vec<StackFrame>,
    /// Total frame count, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<i64>,
}

/// Arguments of the `scopes` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScopesArguments {
    /// Frame to fetch the scopes of.
    pub frame_id: i64,
}

/// Body of the `scopes` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScopesResponseBody {
    /// Scopes, most specific first.
    pub scopes: Vec<Scope>,
}

/// Arguments of the `variables` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VariablesArguments {
    /// Container reference from a scope or structured variable.
    pub variables_reference: i64,
}

/// Body of the `variables` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VariablesResponseBody {
    /// Child variables.
    pub variables: Vec<Variable>,
}

/// Arguments of the `continue` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContinueArguments {
    /// Thread to resume.
    pub thread_id: i64,
    /// Resume only this thread, for adapters that support it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_thread: Option<bool>,
}

/// Body of the `continue` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContinueResponseBody {
    /// Whether every thread resumed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_threads_continued: Option<bool>,
}

/// Stepping granularity for step requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteppingGranularity {
    /// One statement.
    Statement,
    /// One source line.
    Line,
    /// One instruction.
    Instruction,
}

/// Arguments shared by `next`, `stepIn`, and `stepOut`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StepArguments {
    /// Thread to step.
    pub thread_id: i64,
    /// Step only this thread, for adapters that support it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_thread: Option<bool>,
    /// Step granularity, for adapters that support it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<SteppingGranularity>,
}

/// Arguments of the `pause` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PauseArguments {
    /// Thread to pause.
    pub thread_id: i64,
}

/// Arguments of the `evaluate` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluateArguments {
    /// Expression to evaluate.
    pub expression: String,
    /// Frame the expression is evaluated in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<i64>,
    /// Evaluation context, such as `watch`, `repl`, or `hover`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Body of the `evaluate` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluateResponseBody {
    /// Rendered result.
    pub result: String,
    /// Type label, when reported.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub result_type: Option<String>,
    /// Reference for fetching structured children; `0` means a leaf.
    pub variables_reference: i64,
}

/// Arguments of the `setVariable` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SetVariableArguments {
    /// Container holding the variable.
    pub variables_reference: i64,
    /// Variable name within the container.
    pub name: String,
    /// New value expression.
    pub value: String,
}

/// Body of the `setVariable` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SetVariableResponseBody {
    /// Rendered new value.
    pub value: String,
    /// Type label, when reported.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub variable_type: Option<String>,
    /// Reference for fetching structured children; `0` means a leaf.
    pub variables_reference: i64,
}

/// Arguments of the `disconnect` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisconnectArguments {
    /// Whether the debuggee should be terminated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminate_debuggee: Option<bool>,
}

/// Arguments of the `terminate` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TerminateArguments {
    /// Whether the adapter plans to restart the debuggee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart: Option<bool>,
}

/// Arguments of the reverse `startDebugging` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartDebuggingRequestArguments {
    /// Launch or attach configuration for the child session.
    pub configuration: Value,
    /// `launch` or `attach`.
    pub request: String,
}
