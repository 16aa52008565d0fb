// crates/stackscope-dap/src/client.rs
// ============================================================================
// Module: Request Client
// Description: Sequenced DAP request issuing with response correlation.
// Purpose: Assign request sequence numbers, await responses out of order,
//          enforce timeouts, and answer reverse requests.
// Dependencies: stackscope-wire, tokio, rustc-hash, serde_json, tracing
// ============================================================================

//! ## Overview
//! Every outgoing request carries a monotonic `seq` and is awaited through a
//! oneshot future keyed by that sequence number. Responses route by
//! `request_seq`, so out-of-order arrival is fine. A timed-out or abandoned
//! request leaves no state behind; a response arriving for it later is
//! dropped.
//!
//! Invariants:
//! - At most one pending future per sequence number.
//! - `fail_all` drains every pending future; late responses are logged and
//!   dropped.

use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use rustc_hash::FxHashMap;
use serde_json::Value;
use stackscope_wire::Message;
use stackscope_wire::Request;
use stackscope_wire::Response;
use stackscope_wire::Transport;
use tokio::sync::oneshot;

use crate::error::DapError;

/// Default timeout for DAP requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sequenced request issuer over one transport.
pub(crate) struct RequestClient {
    /// Channel to the adapter.
    transport: Rc<dyn Transport>,
    /// Next outgoing sequence number.
    next_seq: Cell<u64>,
    /// Futures awaiting responses, keyed by request sequence number.
    pending: RefCell<FxHashMap<u64, oneshot::Sender<Result<Response, DapError>>>>,
    /// Default per-request timeout.
    timeout: Cell<Duration>,
}

impl RequestClient {
    /// Creates a client over `transport`.
    pub(crate) fn new(transport: Rc<dyn Transport>) -> Self {
        Self {
            transport,
            next_seq: Cell::new(1),
            pending: RefCell::new(FxHashMap::default()),
            timeout: Cell::new(DEFAULT_REQUEST_TIMEOUT),
        }
    }

    /// Overrides the default request timeout.
    pub(crate) fn set_timeout(&self, timeout: Duration) {
        self.timeout.set(timeout);
    }

    /// Issues `command` and awaits the response body with the default
    /// timeout.
    pub(crate) async fn request(
        &self,
        command: &str,
        arguments: Option<Value>,
    ) -> Result<Option<Value>, DapError> {
        self.request_with_timeout(command, arguments, self.timeout.get())
            .await
    }

    /// Issues `command` and awaits the response body.
    ///
    /// # Errors
    ///
    /// [`DapError::Timeout`] after `timeout`, [`DapError::TransportDead`]
    /// when the message cannot be sent or the session dies while waiting,
    /// [`DapError::Adapter`] for error responses.
    pub(crate) async fn request_with_timeout(
        &self,
        command: &str,
        arguments: Option<Value>,
        timeout: Duration,
    ) -> Result<Option<Value>, DapError> {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        let (sender, receiver) = oneshot::channel();
        self.pending.borrow_mut().insert(seq, sender);
        let message = Message::Request(Request {
            seq,
            command: command.to_owned(),
            arguments,
        });
        if self.transport.send(message).is_err() {
            self.pending.borrow_mut().remove(&seq);
            return Err(DapError::TransportDead);
        }
        let outcome = tokio::time::timeout(timeout, receiver).await;
        match outcome {
            Err(_) => {
                self.pending.borrow_mut().remove(&seq);
                Err(DapError::Timeout)
            }
            Ok(Err(_)) => Err(DapError::TransportDead),
            Ok(Ok(Err(error))) => Err(error),
            Ok(Ok(Ok(response))) => {
                if response.success {
                    Ok(response.body)
                } else {
                    Err(DapError::Adapter {
                        code: adapter_error_code(response.body.as_ref()),
                        message: response
                            .message
                            .unwrap_or_else(|| format!("{command} failed")),
                    })
                }
            }
        }
    }

    /// Routes a response to its pending future.
    ///
    /// Responses without a pending future (timed out, cancelled, or never
    /// issued) are logged and dropped.
    pub(crate) fn dispatch_response(&self, response: Response) {
        let Some(sender) = self.pending.borrow_mut().remove(&response.request_seq) else {
            tracing::debug!(
                target: "stackscope::dap",
                request_seq = response.request_seq,
                command = %response.command,
                "dropping response with no pending request"
            );
            return;
        };
        // A dropped receiver means the caller abandoned the request.
        let _ = sender.send(Ok(response));
    }

    /// Fails every pending request with errors produced by `error`.
    pub(crate) fn fail_all(&self, error: impl Fn() -> DapError) {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        for (_, sender) in pending {
            let _ = sender.send(Err(error()));
        }
    }

    /// Sends a response to a reverse request.
    pub(crate) fn respond(
        &self,
        request: &Request,
        success: bool,
        message: Option<String>,
        body: Option<Value>,
    ) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        let response = Message::Response(Response {
            seq,
            request_seq: request.seq,
            success,
            command: request.command.clone(),
            message,
            body,
        });
        if self.transport.send(response).is_err() {
            tracing::debug!(
                target: "stackscope::dap",
                command = %request.command,
                "transport died before reverse-request response"
            );
        }
    }

    /// Sends a fire-and-forget request without awaiting its response.
    pub(crate) fn notify(&self, command: &str, arguments: Option<Value>) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        let message = Message::Request(Request {
            seq,
            command: command.to_owned(),
            arguments,
        });
        let _ = self.transport.send(message);
    }
}

/// Extracts the structured error id from an error response body.
fn adapter_error_code(body: Option<&Value>) -> Option<i64> {
    body?.get("error")?.get("id")?.as_i64()
}
