//! Configuration for ConsoleRelay
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

/// Main configuration for a relay session
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address (port 0 picks an ephemeral port)
    pub listen_addr: String,

    /// Max bytes read from a client in one go
    pub read_buffer_size: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    /// How often the accept loop wakes up to check for deactivation
    pub accept_poll_ms: u64,

    // -------------------------------------------------------------------------
    // Session Configuration
    // -------------------------------------------------------------------------
    /// Console command written to the process on orderly shutdown
    pub stop_command: Option<String>,

    /// Time the process gets to exit after the stop command (milliseconds)
    pub stop_grace_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:25575".to_string(),
            read_buffer_size: 4096,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
            accept_poll_ms: 50,
            stop_command: Some("stop".to_string()),
            stop_grace_ms: 30_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn accept_poll_interval(&self) -> Duration {
        Duration::from_millis(self.accept_poll_ms.max(1))
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the per-read chunk size (in bytes)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size.max(1);
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the accept loop poll interval (in milliseconds)
    pub fn accept_poll_ms(mut self, ms: u64) -> Self {
        self.config.accept_poll_ms = ms;
        self
    }

    /// Set the command sent to the process on shutdown (None disables it)
    pub fn stop_command(mut self, command: Option<String>) -> Self {
        self.config.stop_command = command;
        self
    }

    /// Set the shutdown grace period (in milliseconds)
    pub fn stop_grace_ms(mut self, ms: u64) -> Self {
        self.config.stop_grace_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
