//! # ConsoleRelay
//!
//! Exposes the console of a supervised game server process over TCP:
//! - Multi-client broadcast of everything the process prints
//! - Any client can type into the process's stdin
//! - Thread-per-responsibility concurrency model
//! - Orderly shutdown when the process exits or on request
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────┐ ┌──────────┐ ┌──────────┐
//! │ Client A │ │ Client B │ │ Client N │
//! └────┬─────┘ └────┬─────┘ └────┬─────┘
//!      │            │            │        raw bytes
//! ┌────▼────────────▼────────────▼──────────────────┐
//! │               Broadcast Server                   │
//! │   accept thread · read thread per client         │
//! │   live client set (Mutex) · dispatcher           │
//! └────────────┬──────────────────────▲─────────────┘
//!   on_receive │                      │ broadcast(line)
//! ┌────────────▼──────────────────────┴─────────────┐
//! │                     Relay                        │
//! │   stdin handler · process-output thread          │
//! └────────────┬──────────────────────▲─────────────┘
//!        stdin │                      │ stdout
//! ┌────────────▼──────────────────────┴─────────────┐
//! │               Supervised Process                 │
//! │          (java -jar spigot.jar nogui)            │
//! └──────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod network;
pub mod process;
pub mod relay;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RelayError, Result};
pub use config::Config;
pub use network::{BroadcastServer, InboundMessage, MessageHandler};
pub use process::{LaunchSpec, SupervisedProcess};
pub use relay::{ConsoleSession, Relay, ShutdownHandle};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ConsoleRelay
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
