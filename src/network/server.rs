//! Broadcast Server
//!
//! Accepts connections on a background thread and gives every client its
//! own read thread. Output is fanned out to all live clients; input from
//! any client is handed to the registered message handlers.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{RelayError, Result};

use super::{ClientConnection, ClientRegistry, ConnectionReader, Dispatcher, InboundMessage, MessageHandler};

/// TCP server relaying bytes between a console and its clients
///
/// Cloning is cheap; all clones drive the same listening endpoint.
///
/// ## Threads
/// - One accept thread (`accept:<port>`), started by [`start`](Self::start)
/// - One read thread per client (`client:<peer>`)
/// - Broadcasts run on the caller's thread
#[derive(Clone)]
pub struct BroadcastServer {
    shared: Arc<Shared>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Active,
    Stopped,
}

struct Shared {
    config: Config,

    /// true between a successful bind and `stop()`
    active: AtomicBool,

    /// Serializes start/stop transitions
    lifecycle: Mutex<Lifecycle>,

    local_addr: Mutex<Option<SocketAddr>>,
    registry: ClientRegistry,
    dispatcher: Dispatcher,
    accept_thread: Mutex<Option<JoinHandle<()>>>,
}

impl BroadcastServer {
    /// Create a server for the configured listen address (not yet bound)
    pub fn new(config: Config) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                active: AtomicBool::new(false),
                lifecycle: Mutex::new(Lifecycle::Idle),
                local_addr: Mutex::new(None),
                registry: ClientRegistry::new(),
                dispatcher: Dispatcher::new(),
                accept_thread: Mutex::new(None),
            }),
        }
    }

    /// Bind the listening socket and spawn the accept loop
    ///
    /// Returns the bound address once the socket is listening; the accept
    /// loop itself runs in the background.
    pub fn start(&self) -> Result<SocketAddr> {
        let mut lifecycle = self.shared.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Idle => {}
            Lifecycle::Active => return Err(RelayError::AlreadyStarted),
            Lifecycle::Stopped => return Err(RelayError::Stopped),
        }

        let addr = self.shared.config.listen_addr.clone();
        let listener = TcpListener::bind(&addr).map_err(|source| RelayError::Bind {
            addr: addr.clone(),
            source,
        })?;

        // Non-blocking so the loop can notice deactivation between accepts
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        *self.shared.local_addr.lock() = Some(local_addr);
        self.shared.active.store(true, Ordering::Release);
        *lifecycle = Lifecycle::Active;

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("accept:{}", local_addr.port()))
            .spawn(move || accept_loop(shared, listener, local_addr));

        match spawned {
            Ok(handle) => *self.shared.accept_thread.lock() = Some(handle),
            Err(e) => {
                self.shared.active.store(false, Ordering::Release);
                *lifecycle = Lifecycle::Stopped;
                return Err(e.into());
            }
        }

        tracing::info!("Socket server now listening on {}", local_addr);
        Ok(local_addr)
    }

    /// Send `message` to every live client
    ///
    /// A client that fails the write is removed and closed; the rest still
    /// get the message. Returns how many clients received it.
    pub fn broadcast(&self, message: impl AsRef<[u8]>) -> usize {
        let message = message.as_ref();
        let clients = self.shared.registry.snapshot();

        let mut delivered = 0;
        for client in &clients {
            match client.send(message) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::debug!("Dropping client {} after failed write: {}", client.peer_addr(), e);
                    self.shared.registry.remove(client.id());
                    client.close();
                }
            }
        }

        tracing::trace!(
            "Broadcast {} bytes to {}/{} clients",
            message.len(),
            delivered,
            clients.len()
        );
        delivered
    }

    /// Register a handler for messages from any client
    pub fn on_receive(&self, handler: impl MessageHandler + 'static) {
        self.shared.dispatcher.register(Arc::new(handler));
    }

    /// Deactivate the server
    ///
    /// Stops accepting and shuts down every live connection so their read
    /// threads unwind promptly. Idempotent; a stopped server can't be
    /// restarted.
    pub fn stop(&self) {
        let was_active = {
            let mut lifecycle = self.shared.lifecycle.lock();
            *lifecycle = Lifecycle::Stopped;
            self.shared.active.swap(false, Ordering::AcqRel)
        };
        let clients = self.shared.registry.close();

        if was_active {
            tracing::info!(
                "Disabling socket server on {} ({} clients connected)",
                self.describe_addr(),
                clients.len()
            );
        }

        for client in clients {
            client.close();
        }
    }

    /// Wait for the accept loop to exit and release the listening socket
    pub fn join(&self) {
        let handle = self.shared.accept_thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("Accept thread for {} panicked", self.describe_addr());
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Bound address, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.shared.local_addr.lock()
    }

    /// Number of clients in the live set
    pub fn client_count(&self) -> usize {
        self.shared.registry.len()
    }

    fn describe_addr(&self) -> String {
        self.local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|| self.shared.config.listen_addr.clone())
    }
}

// =============================================================================
// Background Loops
// =============================================================================

fn accept_loop(shared: Arc<Shared>, listener: TcpListener, local_addr: SocketAddr) {
    let poll = shared.config.accept_poll_interval();

    while shared.active.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = register_client(&shared, stream, peer) {
                    tracing::warn!("Failed to set up client {}: {}", peer, e);
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(poll),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                // Transient (e.g. out of file descriptors): log and keep going
                tracing::warn!("{}", RelayError::Accept(e));
                thread::sleep(poll);
            }
        }
    }

    drop(listener);
    tracing::info!("Accept loop for {} stopped", local_addr);
}

fn register_client(shared: &Arc<Shared>, stream: TcpStream, peer: SocketAddr) -> Result<()> {
    // Accepted sockets may inherit the listener's non-blocking mode
    stream.set_nonblocking(false)?;

    let id = shared.registry.next_id();
    let connection = Arc::new(ClientConnection::new(id, stream, peer)?);
    connection.set_timeouts(shared.config.read_timeout_ms, shared.config.write_timeout_ms)?;
    let reader = connection.reader()?;

    if !shared.registry.insert(Arc::clone(&connection)) {
        tracing::debug!("Server stopping, refusing client {}", peer);
        connection.close();
        return Ok(());
    }

    let thread_shared = Arc::clone(shared);
    let thread_connection = Arc::clone(&connection);
    let spawned = thread::Builder::new()
        .name(format!("client:{}", peer))
        .spawn(move || read_loop(thread_shared, thread_connection, reader));

    if let Err(e) = spawned {
        shared.registry.remove(id);
        connection.close();
        return Err(e.into());
    }

    tracing::info!("Accepted socket client {} (id {})", peer, id);
    Ok(())
}

fn read_loop(shared: Arc<Shared>, connection: Arc<ClientConnection>, mut reader: ConnectionReader) {
    let peer = reader.peer_addr();
    let mut buf = vec![0u8; shared.config.read_buffer_size];

    while shared.active.load(Ordering::Acquire) {
        match reader.read_chunk(&mut buf) {
            Ok(0) => {
                tracing::debug!("Client {} disconnected", peer);
                break;
            }
            Ok(n) => {
                let message = InboundMessage::new(peer, Bytes::copy_from_slice(&buf[..n]));
                tracing::debug!("Received from {}: {}", peer, message.text().trim_end());
                shared.dispatcher.dispatch(&message);
            }
            Err(RelayError::ClientIo { source, .. })
                if matches!(source.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                tracing::debug!("Read timeout for client {}", peer);
                break;
            }
            Err(e) => {
                tracing::debug!("Closing client {}: {}", peer, e);
                break;
            }
        }
    }

    shared.registry.remove(connection.id());
    connection.close();
}
