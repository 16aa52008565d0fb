// crates/stackscope-dap/tests/focus_navigation.rs
// ============================================================================
// Module: Focus and Query Tests
// Description: URL queries, focus anchors, and walk-up on absent targets.
// Purpose: Validate the query surface against a live session graph.
// Dependencies: stackscope-dap, stackscope-graph, tokio
// ============================================================================

//! End-to-end focus and query tests.

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
use stackscope_dap::DapError;
use stackscope_dap::Frame;
use stackscope_dap::Session;
use stackscope_dap::SessionState;
use stackscope_graph::Node;
use stackscope_query::QueryError;
use tokio::task::LocalSet;

/// Starts a session and stops it at `/work/app.py:7`.
async fn stopped_session(
    debugger: &stackscope_dap::Debugger,
    adapter: &Rc<common::FakeAdapter>,
) -> Rc<Session> {
    let session = debugger.start(spec("app")).await.unwrap();
    adapter
        .control(adapter.spawned() - 1)
        .stop_at_line(1, "breakpoint", "/work/app.py", 7);
    {
        let session = Rc::clone(&session);
        wait_until(move || {
            session.state.get_untracked() == SessionState::Stopped
                && session
                    .find_thread(1)
                    .is_some_and(|thread| thread.current_stack.get_untracked().is_some())
        })
        .await;
    }
    session
}

#[tokio::test(flavor = "current_thread")]
async fn queries_walk_the_graph_from_the_root() {
    LocalSet::new()
        .run_until(async {
            let (debugger, adapter) = harness();
            let session = stopped_session(&debugger, &adapter).await;
            let found = debugger
                .query_one("/sessions(state=stopped)/threads/stacks[0]/frames[0]")
                .unwrap();
            let frame = debugger.store().get_as::<Frame>(found).unwrap();
            assert_eq!(frame.line.get_untracked(), 7);
            let _ = session;
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn focus_anchors_resolve_lazily() {
    LocalSet::new()
        .run_until(async {
            let (debugger, adapter) = harness();
            let _session = stopped_session(&debugger, &adapter).await;
            let focused = debugger
                .focus("/sessions[0]/threads[0]/stacks[0]/frames[0]")
                .unwrap();
            assert_eq!(
                focused.as_deref(),
                Some("/sessions[0]/threads[0]/stacks[0]/frames[0]")
            );
            let frame = debugger.query_one("@frame").unwrap();
            let direct = debugger
                .query_one("/sessions[0]/threads[0]/stacks[0]/frames[0]")
                .unwrap();
            assert_eq!(frame, direct);
            let anchored_scope_query = debugger.query_many("@thread/stacks[0]").unwrap();
            assert_eq!(anchored_scope_query.len(), 1);
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn focusing_an_absent_url_walks_up_to_an_ancestor() {
    LocalSet::new()
        .run_until(async {
            let (debugger, adapter) = harness();
            let _session = stopped_session(&debugger, &adapter).await;
            let focused = debugger
                .focus("/sessions[0]/threads[0]/stacks[0]/frames[99]")
                .unwrap();
            assert_eq!(
                focused.as_deref(),
                Some("/sessions[0]/threads[0]/stacks[0]")
            );
            // A fully unresolvable URL leaves the focus unchanged.
            let unchanged = debugger.focus("/configs[5]/sessions[9]").unwrap();
            assert_eq!(unchanged, focused);
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn focus_round_trips_through_derived_uris() {
    LocalSet::new()
        .run_until(async {
            let (debugger, adapter) = harness();
            let session = stopped_session(&debugger, &adapter).await;
            let thread = session.find_thread(1).unwrap();
            let stack_id = thread.current_stack.get_untracked().unwrap();
            let store = debugger.store();
            let frame_id = store
                .get_as::<stackscope_dap::Stack>(stack_id)
                .unwrap()
                .frames
                .first()
                .unwrap();
            let uri = store.uri_of(frame_id).unwrap();
            debugger.focus(&uri).unwrap();
            assert_eq!(debugger.query_one("@frame").unwrap(), frame_id);
            assert_eq!(debugger.query_one("@session").unwrap(), session.id());
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn query_one_cardinality_failures_are_typed() {
    LocalSet::new()
        .run_until(async {
            let (debugger, adapter) = harness();
            let _one = stopped_session(&debugger, &adapter).await;
            let _two = stopped_session(&debugger, &adapter).await;
            let ambiguous = debugger.query_one("/sessions(state=stopped)");
            assert!(matches!(
                ambiguous,
                Err(DapError::Query(QueryError::Ambiguous { count: 2 }))
            ));
            let missing = debugger.query_one("/sessions(state=initializing)");
            assert!(matches!(
                missing,
                Err(DapError::Query(QueryError::NotFound))
            ));
            let many = debugger.query_many("/sessions(state=stopped)").unwrap();
            assert_eq!(many.len(), 2);
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn unfocus_clears_anchor_resolution() {
    LocalSet::new()
        .run_until(async {
            let (debugger, adapter) = harness();
            let _session = stopped_session(&debugger, &adapter).await;
            debugger.focus("/sessions[0]").unwrap();
            assert!(debugger.query_one("@session").is_ok());
            debugger.unfocus();
            assert!(matches!(
                debugger.query_one("@session"),
                Err(DapError::Query(QueryError::UnresolvedAnchor { .. }))
            ));
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn frames_filter_by_line_through_the_declared_index() {
    LocalSet::new()
        .run_until(async {
            let (debugger, adapter) = harness();
            let session = debugger.start(spec("app")).await.unwrap();
            adapter.control(0).stop(
                1,
                "step",
                vec![
                    common::frame_json(1, "inner", "/work/app.py", 2),
                    common::frame_json(2, "outer", "/work/app.py", 10),
                ],
                None,
            );
            {
                let session = Rc::clone(&session);
                wait_until(move || {
                    session
                        .find_thread(1)
                        .is_some_and(|thread| thread.current_stack.get_untracked().is_some())
                })
                .await;
            }
            debugger.focus("/sessions[0]/threads[0]").unwrap();
            let hit = debugger.query_one("@thread/stacks[0]/frames(line=2)[0]").unwrap();
            let frame = debugger.store().get_as::<Frame>(hit).unwrap();
            assert_eq!(frame.name.get_untracked(), "inner");
        })
        .await;
}
