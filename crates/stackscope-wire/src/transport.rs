// crates/stackscope-wire/src/transport.rs
// ============================================================================
// Module: Transport
// Description: Abstract duplex message channel to an adapter process.
// Purpose: Decouple the session layer from how DAP messages reach the
//          adapter, and provide an in-process channel pair for tests.
// Dependencies: tokio, thiserror, crate::message
// ============================================================================

//! ## Overview
//! The session layer speaks to an adapter through a [`Transport`]: a
//! fire-and-forget `send` plus a single incoming message stream. Transport
//! death is observed as the stream ending.
//!
//! [`ChannelTransport`] is the in-process implementation: a pair of
//! unbounded channels whose far side is a [`TransportPeer`], used by tests
//! and fake adapters. Process-backed transports live with the host.
//!
//! Invariants:
//! - Message order is preserved per direction.
//! - The incoming receiver can be taken exactly once.

use std::cell::RefCell;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::message::Message;

/// Transport failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The far side is gone; the message was not delivered.
    #[error("transport is closed")]
    Closed,
}

/// Duplex message channel to an adapter.
pub trait Transport {
    /// Sends one message toward the adapter. Fire-and-forget; ordering is
    /// preserved by the transport.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] when the far side is gone.
    fn send(&self, message: Message) -> Result<(), TransportError>;

    /// Takes the incoming message stream.
    ///
    /// Returns `None` on every call after the first. The stream yielding
    /// `None` means the transport died.
    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<Message>>;
}

/// In-process transport backed by a channel pair.
pub struct ChannelTransport {
    /// Messages toward the adapter.
    outgoing: mpsc::UnboundedSender<Message>,
    /// Messages from the adapter, until taken by the session.
    incoming: RefCell<Option<mpsc::UnboundedReceiver<Message>>>,
}

impl ChannelTransport {
    /// Creates a connected transport and its far-side peer.
    #[must_use]
    pub fn pair() -> (Self, TransportPeer) {
        let (to_adapter, from_client) = mpsc::unbounded_channel();
        let (to_client, from_adapter) = mpsc::unbounded_channel();
        let transport = Self {
            outgoing: to_adapter,
            incoming: RefCell::new(Some(from_adapter)),
        };
        let peer = TransportPeer {
            incoming: from_client,
            outgoing: to_client,
        };
        (transport, peer)
    }
}

impl Transport for ChannelTransport {
    fn send(&self, message: Message) -> Result<(), TransportError> {
        self.outgoing
            .send(message)
            .map_err(|_| TransportError::Closed)
    }

    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<Message>> {
        self.incoming.borrow_mut().take()
    }
}

/// Far side of a [`ChannelTransport`], playing the adapter role.
pub struct TransportPeer {
    /// Messages the client sent.
    incoming: mpsc::UnboundedReceiver<Message>,
    /// Messages toward the client.
    outgoing: mpsc::UnboundedSender<Message>,
}

impl TransportPeer {
    /// Sends one message toward the client.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] when the client side is gone.
    pub fn send(&self, message: Message) -> Result<(), TransportError> {
        self.outgoing
            .send(message)
            .map_err(|_| TransportError::Closed)
    }

    /// Receives the next client message, `None` when the client is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        self.incoming.recv().await
    }

    /// Receives a client message without waiting, `None` when empty.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.incoming.try_recv().ok()
    }
}
