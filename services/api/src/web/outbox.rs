//! services/api/src/web/outbox.rs
//!
//! The per-connection queue of outbound messages. Handlers and delayed tasks
//! push into it; a single writer task drains it onto the socket.

use crate::web::protocol::ServerMessage;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl Outbox {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues a message. Returns `false` once the connection is gone.
    pub fn send(&self, msg: ServerMessage) -> bool {
        match self.tx.send(msg) {
            Ok(()) => true,
            Err(e) => {
                debug!("Dropping outbound message, writer is gone: {:?}", e.0);
                false
            }
        }
    }
}
