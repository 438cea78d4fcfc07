//! Inbound message dispatch
//!
//! Every chunk read from a client is wrapped in an [`InboundMessage`] and
//! handed to each registered [`MessageHandler`] in registration order.

use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

/// A chunk of bytes received from one client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Address of the sending client
    pub peer: SocketAddr,

    /// Raw bytes exactly as read from the socket
    pub payload: Bytes,
}

impl InboundMessage {
    pub fn new(peer: SocketAddr, payload: Bytes) -> Self {
        Self { peer, payload }
    }

    /// Payload decoded as UTF-8 (invalid sequences are replaced)
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Receives inbound client messages
///
/// Handlers are called from the per-client read threads, so two clients
/// can be delivering at the same time.
pub trait MessageHandler: Send + Sync {
    fn on_message(&self, message: &InboundMessage);
}

impl<F> MessageHandler for F
where
    F: Fn(&InboundMessage) + Send + Sync,
{
    fn on_message(&self, message: &InboundMessage) {
        self(message)
    }
}

/// Fan-out over registered handlers
///
/// Handlers are only ever appended. `dispatch` clones the list under the
/// read lock and calls handlers outside of it, so a handler may register
/// another one without deadlocking.
#[derive(Default)]
pub struct Dispatcher {
    handlers: RwLock<Vec<Arc<dyn MessageHandler>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler
    pub fn register(&self, handler: Arc<dyn MessageHandler>) {
        self.handlers.write().push(handler);
    }

    /// Deliver a message to every handler, in registration order
    pub fn dispatch(&self, message: &InboundMessage) {
        let handlers = self.handlers.read().clone();
        for handler in &handlers {
            handler.on_message(message);
        }
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
