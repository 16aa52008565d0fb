// crates/stackscope-dap/tests/sources_breakpoints.rs
// ============================================================================
// Module: Source and Breakpoint Tests
// Description: Cross-session source deduplication and breakpoint binding
//              state.
// Purpose: Validate correlation-key interning, per-session bindings, and
//          the derived display state.
// Dependencies: stackscope-dap, stackscope-graph, tokio
// ============================================================================

//! End-to-end source and breakpoint tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::rc::Rc;

use common::harness;
use common::spec;
use common::wait_until;
use stackscope_dap::DisplayState;
use stackscope_dap::Session;
use stackscope_dap::SessionState;
use stackscope_graph::Node;
use tokio::task::LocalSet;

/// Waits until thread 1 of `session` has at least one stack.
async fn wait_first_stop(session: &Rc<Session>) {
    let session = Rc::clone(session);
    wait_until(move || {
        session.state.get_untracked() == SessionState::Stopped
            && session
                .find_thread(1)
                .is_some_and(|thread| thread.current_stack.get_untracked().is_some())
    })
    .await;
}

#[tokio::test(flavor = "current_thread")]
async fn sources_deduplicate_across_sessions() {
    LocalSet::new()
        .run_until(async {
            let (debugger, adapter) = harness();
            let first = debugger.start(spec("one")).await.unwrap();
            let second = debugger.start(spec("two")).await.unwrap();
            adapter
                .control(0)
                .stop_at_line(1, "step", "/work/shared.py", 4);
            adapter
                .control(1)
                .stop_at_line(1, "step", "/work/shared.py", 9);
            wait_first_stop(&first).await;
            wait_first_stop(&second).await;

            let source = debugger
                .entity()
                .source_by_key("path:/work/shared.py")
                .unwrap();
            assert_eq!(debugger.entity().sources.ids_untracked().len(), 1);
            assert_eq!(source.bindings.ids_untracked().len(), 2);
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn display_state_tracks_bindings() {
    LocalSet::new()
        .run_until(async {
            let (debugger, adapter) = harness();
            let breakpoint = debugger.add_breakpoint("/work/app.py", 7, None).unwrap();
            assert_eq!(
                breakpoint.display_state.get_untracked(),
                DisplayState::Unverified
            );

            let session = debugger.start(spec("app")).await.unwrap();
            {
                let session = Rc::clone(&session);
                wait_until(move || !session.breakpoint_bindings().is_empty()).await;
            }
            // The fake adapter verifies at the requested line.
            assert_eq!(
                breakpoint.display_state.get_untracked(),
                DisplayState::Verified
            );

            adapter
                .control(0)
                .stop_at_line(1, "breakpoint", "/work/app.py", 7);
            wait_first_stop(&session).await;
            assert_eq!(breakpoint.display_state.get_untracked(), DisplayState::Hit);

            session.resume(Some(1)).await.unwrap();
            assert_eq!(
                breakpoint.display_state.get_untracked(),
                DisplayState::Verified
            );

            breakpoint.enabled.set(false);
            assert_eq!(
                breakpoint.display_state.get_untracked(),
                DisplayState::Disabled
            );
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn adjusted_lines_surface_in_display_state() {
    LocalSet::new()
        .run_until(async {
            let (debugger, adapter) = harness();
            // The adapter moves line 8 to line 9.
            adapter
                .script
                .borrow_mut()
                .line_adjustments
                .insert(8, 9);
            let breakpoint = debugger.add_breakpoint("/work/app.py", 8, None).unwrap();
            let session = debugger.start(spec("app")).await.unwrap();
            {
                let session = Rc::clone(&session);
                wait_until(move || !session.breakpoint_bindings().is_empty()).await;
            }
            assert_eq!(
                breakpoint.display_state.get_untracked(),
                DisplayState::Adjusted
            );
            let binding = session.breakpoint_bindings()[0].clone();
            assert_eq!(binding.actual_line.get_untracked(), Some(9));
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn one_binding_per_breakpoint_and_session() {
    LocalSet::new()
        .run_until(async {
            let (debugger, adapter) = harness();
            let breakpoint = debugger.add_breakpoint("/work/app.py", 7, None).unwrap();
            let first = debugger.start(spec("one")).await.unwrap();
            let second = debugger.start(spec("two")).await.unwrap();
            {
                let (first, second) = (Rc::clone(&first), Rc::clone(&second));
                wait_until(move || {
                    first.breakpoint_bindings().len() == 1
                        && second.breakpoint_bindings().len() == 1
                })
                .await;
            }
            assert_eq!(breakpoint.bindings.ids_untracked().len(), 2);
            // A second sync updates in place instead of duplicating.
            adapter
                .control(0)
                .stop_at_line(1, "breakpoint", "/work/app.py", 7);
            wait_first_stop(&first).await;
            assert_eq!(breakpoint.bindings.ids_untracked().len(), 2);
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn removing_a_breakpoint_disposes_its_bindings() {
    LocalSet::new()
        .run_until(async {
            let (debugger, _adapter) = harness();
            let breakpoint = debugger.add_breakpoint("/work/app.py", 7, None).unwrap();
            let session = debugger.start(spec("app")).await.unwrap();
            {
                let session = Rc::clone(&session);
                wait_until(move || !session.breakpoint_bindings().is_empty()).await;
            }
            let binding = session.breakpoint_bindings()[0].clone();
            debugger.remove_breakpoint(&breakpoint);
            assert!(!breakpoint.lifecycle().is_alive());
            // The binding is strong-owned by the breakpoint and dies with
            // it.
            assert!(!binding.lifecycle().is_alive());
            assert!(session.breakpoint_bindings().is_empty());
            assert!(debugger.entity().breakpoints.ids_untracked().is_empty());
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn removing_a_session_drops_its_bindings() {
    LocalSet::new()
        .run_until(async {
            let (debugger, _adapter) = harness();
            let breakpoint = debugger.add_breakpoint("/work/app.py", 7, None).unwrap();
            let session = debugger.start(spec("app")).await.unwrap();
            {
                let session = Rc::clone(&session);
                wait_until(move || !session.breakpoint_bindings().is_empty()).await;
            }
            session.terminate().await.unwrap();
            debugger.remove_session(&session);
            assert!(!session.lifecycle().is_alive());
            assert!(breakpoint.bindings.ids_untracked().is_empty());
            assert!(debugger.entity().sessions.ids_untracked().is_empty());
        })
        .await;
}
