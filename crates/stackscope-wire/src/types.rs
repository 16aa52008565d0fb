// crates/stackscope-wire/src/types.rs
// ============================================================================
// Module: Protocol Types
// Description: DAP domain structures shared by requests and events.
// Purpose: Model sources, frames, scopes, variables, breakpoints,
//          capabilities, and event bodies with lenient deserialization.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! These are the DAP structures the client consumes. Every optional wire
//! field is optional here and defaults on absence, so adapters that omit
//! fields stay parseable.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Adapter capabilities advertised in the `initialize` response.
///
/// Only the capabilities the client gates behavior on are modeled; unknown
/// capabilities are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Capabilities {
    /// Adapter supports the `configurationDone` request.
    pub supports_configuration_done_request: bool,
    /// Adapter supports breakpoint conditions.
    pub supports_conditional_breakpoints: bool,
    /// Adapter supports hit-count conditions.
    pub supports_hit_conditional_breakpoints: bool,
    /// Adapter supports log points.
    pub supports_log_points: bool,
    /// Adapter supports the `setVariable` request.
    pub supports_set_variable: bool,
    /// Adapter supports the `terminate` request.
    pub supports_terminate_request: bool,
    /// Adapter supports per-filter exception conditions.
    pub supports_exception_filter_options: bool,
    /// Adapter supports single-thread `continue`/step requests.
    pub supports_single_thread_execution_requests: bool,
    /// Adapter supports stepping granularities.
    pub supports_stepping_granularity: bool,
    /// Exception filters the adapter offers.
    pub exception_breakpoint_filters: Vec<ExceptionBreakpointsFilter>,
}

/// One exception filter offered by the adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExceptionBreakpointsFilter {
    /// Stable filter identifier.
    pub filter: String,
    /// Human-readable label.
    pub label: String,
    /// Whether the filter starts enabled.
    #[serde(rename = "default")]
    pub default_enabled: bool,
    /// Whether the filter accepts a condition expression.
    pub supports_condition: bool,
}

/// A source file or generated source known to the adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Source {
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Filesystem path, when the source exists on disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Session-scoped reference for pathless sources; `0` means none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<i64>,
    /// Origin label, such as `internal module`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Content checksums.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checksums: Vec<Checksum>,
    /// Related sources.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
}

/// A content checksum attached to a source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Checksum {
    /// Checksum algorithm label.
    pub algorithm: String,
    /// Checksum value, hex encoded.
    pub checksum: String,
}

/// One thread reported by the adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Thread {
    /// Adapter-scoped thread identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
}

/// One stack frame of a stopped thread.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StackFrame {
    /// Adapter-scoped frame identifier.
    pub id: i64,
    /// Display name, usually the function name.
    pub name: String,
    /// Source of the frame, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// One-based line.
    pub line: i64,
    /// One-based column.
    pub column: i64,
    /// Presentation hint, such as `subtle` or `label`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_hint: Option<String>,
}

/// One variable scope of a frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scope {
    /// Display name, such as `Locals`.
    pub name: String,
    /// Reference for fetching the scope's variables; `0` means none.
    pub variables_reference: i64,
    /// Whether fetching the scope is expensive.
    pub expensive: bool,
    /// Presentation hint, such as `locals` or `registers`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_hint: Option<String>,
}

/// One variable or structured child value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Variable {
    /// Variable name.
    pub name: String,
    /// Rendered value.
    pub value: String,
    /// Type label, when the adapter reports one.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub variable_type: Option<String>,
    /// Reference for fetching children; `0` means a leaf.
    pub variables_reference: i64,
}

/// A breakpoint record reported by the adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Breakpoint {
    /// Adapter-scoped breakpoint identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Whether the adapter could bind the breakpoint.
    pub verified: bool,
    /// Explanation for unverified breakpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Source the breakpoint bound to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Line the adapter actually bound to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
    /// Column the adapter actually bound to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
}

/// A breakpoint the client asks the adapter to set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceBreakpoint {
    /// One-based requested line.
    pub line: i64,
    /// One-based requested column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
    /// Condition expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Hit-count condition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_condition: Option<String>,
    /// Log message for log points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_message: Option<String>,
}

/// Per-filter exception options sent with `setExceptionBreakpoints`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExceptionFilterOptions {
    /// Filter identifier from [`ExceptionBreakpointsFilter::filter`].
    pub filter_id: String,
    /// Condition expression, when the filter supports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Body of the `stopped` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoppedEventBody {
    /// Stop reason, such as `breakpoint`, `step`, or `exception`.
    pub reason: String,
    /// Longer description of the stop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Thread that stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<i64>,
    /// Whether every thread stopped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_threads_stopped: Option<bool>,
    /// Breakpoints that caused the stop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_breakpoint_ids: Option<Vec<i64>>,
    /// Additional stop text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Body of the `continued` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContinuedEventBody {
    /// Thread that continued.
    pub thread_id: i64,
    /// Whether every thread continued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_threads_continued: Option<bool>,
}

/// Body of the `thread` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreadEventBody {
    /// `started` or `exited`.
    pub reason: String,
    /// The thread in question.
    pub thread_id: i64,
}

/// Body of the `output` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputEventBody {
    /// Output category, such as `stdout` or `console`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Output text.
    pub output: String,
    /// Source the output refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// One-based line in the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
}

/// Body of the `terminated` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TerminatedEventBody {
    /// Restart attribute the adapter wants echoed into a relaunch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart: Option<Value>,
}

/// Body of the `exited` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExitedEventBody {
    /// Debuggee exit code.
    pub exit_code: i64,
}

/// Body of the `breakpoint` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BreakpointEventBody {
    /// `changed`, `new`, or `removed`.
    pub reason: String,
    /// The breakpoint record.
    pub breakpoint: Breakpoint,
}
