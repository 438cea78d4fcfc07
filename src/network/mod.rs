//! Network Module
//!
//! TCP broadcast server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One read thread per client
//! - Shared live client set for broadcast
//! - Inbound bytes routed through a dispatcher

mod server;
mod connection;
mod registry;
mod dispatch;

pub use server::BroadcastServer;
pub use connection::{ClientConnection, ConnectionReader};
pub use registry::ClientRegistry;
pub use dispatch::{Dispatcher, InboundMessage, MessageHandler};
