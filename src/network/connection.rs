//! Connection Handles
//!
//! A connection is whatever can deliver a [`ServerMessage`] to one peer and
//! be closed. Sends are fire-and-forget: no acknowledgement, no retry.

use std::fmt;

use tokio::sync::mpsc;
use tracing::trace;

use crate::network::protocol::ServerMessage;

/// Handle to one connected peer.
pub trait Connection: Send + Sync {
    /// Queue a message for the peer. Never blocks.
    fn send(&self, message: ServerMessage);

    /// Ask the transport to close the connection.
    fn close(&self);
}

/// Item carried on a connection's outbound channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Deliver a message.
    Message(ServerMessage),
    /// Close the socket.
    Close,
}

/// Connection backed by an unbounded tokio channel.
///
/// The transport's writer task drains the receiving half.
#[derive(Clone)]
pub struct ChannelConnection {
    sender: mpsc::UnboundedSender<Outbound>,
}

impl ChannelConnection {
    /// Create a connection and the receiver its writer task drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Whether the receiving half is gone.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl fmt::Debug for ChannelConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelConnection")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Connection for ChannelConnection {
    fn send(&self, message: ServerMessage) {
        if self.sender.send(Outbound::Message(message)).is_err() {
            // Peer already gone; sending to it is a no-op.
            trace!("Dropped message for closed connection");
        }
    }

    fn close(&self) {
        let _ = self.sender.send(Outbound::Close);
    }
}
