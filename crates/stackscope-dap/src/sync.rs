// crates/stackscope-dap/src/sync.rs
// ============================================================================
// Module: Breakpoint and Exception Synchronisation
// Description: Per-session replication of debugger-owned breakpoints and
//              exception filters.
// Purpose: Keep each adapter's view aligned with the user's breakpoints and
//          the effective exception filter set.
// Dependencies: stackscope-wire, crate::{breakpoint, debugger, session,
//               source}
// ============================================================================

//! ## Overview
//! Breakpoints and exception filters live on the debugger; sessions carry
//! bindings. Synchronisation sends one `setBreakpoints` per source with the
//! enabled breakpoints (per-session overrides applied) and creates or
//! updates one [`BreakpointBinding`] per (breakpoint, session) pair from
//! the index-aligned response. The exception filter set is re-sent whenever
//! the effective enabled set changes.
//!
//! Invariants:
//! - One binding per (breakpoint, session); re-syncs update in place.
//! - `actualLine`/`actualColumn` reflect the adapter's last report.

use std::rc::Rc;

use stackscope_graph::Node;
use stackscope_wire::ExceptionFilterOptions;
use stackscope_wire::SetBreakpointsArguments;
use stackscope_wire::SetBreakpointsResponseBody;
use stackscope_wire::SetExceptionBreakpointsArguments;
use stackscope_wire::SourceBreakpoint;

use crate::breakpoint::Breakpoint;
use crate::breakpoint::BreakpointBinding;
use crate::debugger::Debugger;
use crate::error::DapError;
use crate::exception::ExceptionFilter;
use crate::exception::ExceptionFilterBinding;
use crate::session::Session;
use crate::session::parse_body;
use crate::session::to_arguments;
use crate::source::Source;

/// Synchronises every source that carries breakpoints to one session.
pub(crate) async fn sync_all_breakpoints(
    debugger: &Debugger,
    session: &Rc<Session>,
) -> Result<(), DapError> {
    let store = debugger.store();
    let mut sources: Vec<Rc<Source>> = Vec::new();
    for breakpoint_id in debugger.entity().breakpoints.ids_untracked() {
        let Some(breakpoint) = store.get_as::<Breakpoint>(breakpoint_id) else {
            continue;
        };
        let Some(source) = breakpoint
            .source
            .get_untracked()
            .and_then(|id| store.get_as::<Source>(id))
        else {
            continue;
        };
        if !sources.iter().any(|known| known.id() == source.id()) {
            sources.push(source);
        }
    }
    for source in sources {
        sync_source_breakpoints(debugger, session, &source).await?;
    }
    Ok(())
}

/// Sends `setBreakpoints` for one source and applies the response.
pub(crate) async fn sync_source_breakpoints(
    debugger: &Debugger,
    session: &Rc<Session>,
    source: &Rc<Source>,
) -> Result<(), DapError> {
    let store = debugger.store();
    let client = session.client()?;
    let capabilities = session.capabilities.get_untracked();
    let source_binding = debugger.ensure_source_binding(session, source, None);
    // Enabled breakpoints for this source, with per-session overrides.
    let mut requested: Vec<(Rc<Breakpoint>, SourceBreakpoint)> = Vec::new();
    for breakpoint_id in debugger.entity().breakpoints.ids_untracked() {
        let Some(breakpoint) = store.get_as::<Breakpoint>(breakpoint_id) else {
            continue;
        };
        if breakpoint.source.get_untracked() != Some(source.id()) {
            continue;
        }
        let binding = find_binding(&breakpoint, session);
        let enabled = binding
            .as_ref()
            .and_then(|binding| binding.enabled_override.get_untracked())
            .unwrap_or_else(|| breakpoint.enabled.get_untracked());
        if !enabled {
            continue;
        }
        let condition = binding
            .as_ref()
            .and_then(|binding| binding.condition_override.get_untracked())
            .or_else(|| breakpoint.condition.get_untracked());
        let hit_condition = binding
            .as_ref()
            .and_then(|binding| binding.hit_condition_override.get_untracked())
            .or_else(|| breakpoint.hit_condition.get_untracked());
        let log_message = binding
            .as_ref()
            .and_then(|binding| binding.log_message_override.get_untracked())
            .or_else(|| breakpoint.log_message.get_untracked());
        let wire = SourceBreakpoint {
            line: breakpoint.line.get_untracked(),
            column: breakpoint.column.get_untracked(),
            condition: condition.filter(|_| capabilities.supports_conditional_breakpoints),
            hit_condition: hit_condition
                .filter(|_| capabilities.supports_hit_conditional_breakpoints),
            log_message: log_message.filter(|_| capabilities.supports_log_points),
        };
        requested.push((breakpoint, wire));
    }
    let reference = source_binding.source_reference.get_untracked();
    let arguments = SetBreakpointsArguments {
        source: source.to_wire(reference),
        breakpoints: requested.iter().map(|(_, wire)| wire.clone()).collect(),
    };
    let body = client
        .request("setBreakpoints", to_arguments(&arguments))
        .await?;
    let body: SetBreakpointsResponseBody = parse_body(body)?;
    // The response is index-aligned with the request.
    for (position, (breakpoint, _)) in requested.iter().enumerate() {
        let Some(reported) = body.breakpoints.get(position) else {
            break;
        };
        let binding = match find_binding(breakpoint, session) {
            Some(binding) => binding,
            None => {
                let binding = BreakpointBinding::create(store);
                binding.breakpoint.relink(breakpoint.id());
                binding.source_binding.relink(source_binding.id());
                binding.session.relink(session.id());
                breakpoint.bindings.link(binding.id());
                source_binding.breakpoint_bindings.link(binding.id());
                binding
            }
        };
        binding.verified.set(reported.verified);
        binding.actual_line.set(reported.line);
        binding.actual_column.set(reported.column);
        binding.adapter_id.set(reported.id);
    }
    Ok(())
}

/// Finds the session's binding of one breakpoint.
pub(crate) fn find_binding(
    breakpoint: &Rc<Breakpoint>,
    session: &Rc<Session>,
) -> Option<Rc<BreakpointBinding>> {
    breakpoint
        .bindings
        .ids_untracked()
        .into_iter()
        .filter_map(|id| breakpoint.bindings.resolve(id))
        .filter_map(|node| node.as_any().downcast::<BreakpointBinding>().ok())
        .find(|binding| binding.session.get_untracked() == Some(session.id()))
}

/// Sends the session's effective exception filter set.
pub(crate) async fn sync_exception_filters(
    debugger: &Debugger,
    session: &Rc<Session>,
) -> Result<(), DapError> {
    let store = debugger.store();
    let client = session.client()?;
    let capabilities = session.capabilities.get_untracked();
    let mut filters: Vec<String> = Vec::new();
    let mut filter_options = Vec::new();
    for binding_id in session.exception_filter_bindings.ids_untracked() {
        let Some(binding) = store.get_as::<ExceptionFilterBinding>(binding_id) else {
            continue;
        };
        let Some(filter) = binding
            .filter
            .get_untracked()
            .and_then(|id| store.get_as::<ExceptionFilter>(id))
        else {
            continue;
        };
        let enabled = binding
            .enabled_override
            .get_untracked()
            .unwrap_or_else(|| filter.default_enabled.get_untracked());
        if !enabled {
            continue;
        }
        filters.push(filter.filter_id.clone());
        if capabilities.supports_exception_filter_options {
            filter_options.push(ExceptionFilterOptions {
                filter_id: filter.filter_id.clone(),
                condition: binding.condition.get_untracked(),
            });
        }
    }
    let arguments = SetExceptionBreakpointsArguments {
        filters,
        filter_options: capabilities
            .supports_exception_filter_options
            .then_some(filter_options),
    };
    client
        .request("setExceptionBreakpoints", to_arguments(&arguments))
        .await?;
    Ok(())
}
