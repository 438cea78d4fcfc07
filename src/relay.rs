//! Relay Module
//!
//! Wires a supervised process to a broadcast server.
//!
//! ## Responsibilities
//! - Broadcast every line the process prints to all clients
//! - Forward every client message to the process input
//! - Stop the server when the process output ends
//! - Order session shutdown: stop accepting → close connections → terminate process

use std::io::{BufRead, Write};
use std::process::ExitStatus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use crossbeam::select;
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::network::{BroadcastServer, InboundMessage};
use crate::process::{LaunchSpec, SupervisedProcess};

/// Process input shared between the client handler and session shutdown
type SharedInput = Arc<Mutex<Box<dyn Write + Send>>>;

// =============================================================================
// Relay
// =============================================================================

/// Bidirectional bridge between one process and one server
///
/// ## Threads
/// - `process-output`: reads lines and broadcasts them in emission order
/// - Client read threads call the stdin handler directly
///
/// Completion is signalled by the output thread dropping its end of a
/// channel, so any number of waiters observe it.
pub struct Relay {
    server: BroadcastServer,
    input: SharedInput,
    done: Receiver<()>,
    lines_relayed: Arc<AtomicU64>,
}

impl Relay {
    /// Register the stdin handler on `server` and start pumping `output`
    ///
    /// The server does not have to be started yet; attaching first means no
    /// client message can arrive before the handler exists.
    pub fn attach<R, W>(server: BroadcastServer, output: R, input: W) -> Result<Self>
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        let input: Box<dyn Write + Send> = Box::new(input);
        let input: SharedInput = Arc::new(Mutex::new(input));

        let handler_input = Arc::clone(&input);
        server.on_receive(move |message: &InboundMessage| {
            match write_input(&handler_input, &message.payload) {
                Ok(()) => tracing::debug!("Wrote to STDIN: {}", message.text().trim_end()),
                // The output thread sees the exit and ends the session
                Err(e) => tracing::warn!("Dropped message from {}: {}", message.peer, e),
            }
        });

        let (done_tx, done) = channel::bounded(0);
        let lines_relayed = Arc::new(AtomicU64::new(0));

        let pump_server = server.clone();
        let pump_lines = Arc::clone(&lines_relayed);
        thread::Builder::new()
            .name("process-output".to_string())
            .spawn(move || pump_output(pump_server, output, pump_lines, done_tx))?;

        Ok(Self {
            server,
            input,
            done,
            lines_relayed,
        })
    }

    /// Write bytes to the process input (flushed)
    pub fn send_to_process(&self, bytes: impl AsRef<[u8]>) -> Result<()> {
        write_input(&self.input, bytes.as_ref())
    }

    /// Block until the process output has ended
    pub fn wait(&self) {
        // Never sent on; returns once the sender is dropped
        let _ = self.done.recv();
    }

    /// Wait up to `timeout`; true if the output has ended
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(
            self.done.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected) | Ok(())
        )
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.done.try_recv(), Err(TryRecvError::Disconnected) | Ok(()))
    }

    /// Lines read from the process so far
    pub fn lines_relayed(&self) -> u64 {
        self.lines_relayed.load(Ordering::Relaxed)
    }

    pub fn server(&self) -> &BroadcastServer {
        &self.server
    }

    fn completion(&self) -> &Receiver<()> {
        &self.done
    }
}

fn write_input(input: &SharedInput, bytes: &[u8]) -> Result<()> {
    let mut input = input.lock();
    input
        .write_all(bytes)
        .and_then(|_| input.flush())
        .map_err(|e| RelayError::ProcessIo(format!("write to process input failed: {}", e)))
}

fn pump_output<R: BufRead>(
    server: BroadcastServer,
    mut output: R,
    lines_relayed: Arc<AtomicU64>,
    _done: Sender<()>,
) {
    let mut line = Vec::new();

    loop {
        line.clear();
        match output.read_until(b'\n', &mut line) {
            Ok(0) => {
                tracing::debug!("Process output reached end of stream");
                break;
            }
            Ok(_) => {
                tracing::trace!("Received from STDOUT: {}", String::from_utf8_lossy(&line).trim_end());
                server.broadcast(&line);
                lines_relayed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!("Failed to read process output: {}", e);
                break;
            }
        }
    }

    server.stop();
}

// =============================================================================
// Console Session
// =============================================================================

/// Requests an orderly shutdown of a running [`ConsoleSession`]
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Sender<()>,
}

impl ShutdownHandle {
    /// Ask the session to shut down (repeated calls are harmless)
    pub fn request(&self) {
        let _ = self.tx.try_send(());
    }
}

/// A supervised process exposed over a broadcast server
///
/// ## Shutdown ordering
/// Both paths stop accepting, then close connections, then end the process:
/// - Process exits on its own: the output thread stops the server, `run`
///   reaps the process
/// - [`ShutdownHandle::request`]: `run` stops the server, writes the stop
///   command, waits out the grace period, then kills the process
pub struct ConsoleSession {
    config: Config,
    server: BroadcastServer,
    relay: Relay,
    process: SupervisedProcess,
    shutdown_tx: Sender<()>,
    shutdown_rx: Receiver<()>,
}

impl ConsoleSession {
    /// Spawn the process, attach the relay and start listening
    pub fn start(config: Config, spec: &LaunchSpec) -> Result<Self> {
        let mut process = SupervisedProcess::spawn(spec)?;

        let streams = process
            .take_input()
            .zip(process.take_output())
            .ok_or_else(|| RelayError::ProcessIo("process streams were not captured".to_string()));
        let (input, output) = match streams {
            Ok(streams) => streams,
            Err(e) => {
                abandon(&mut process);
                return Err(e);
            }
        };

        let server = BroadcastServer::new(config.clone());
        let started = Relay::attach(server.clone(), output, input)
            .and_then(|relay| server.start().map(|addr| (relay, addr)));

        let relay = match started {
            Ok((relay, addr)) => {
                tracing::info!("Console of pid {} exposed on {}", process.id(), addr);
                relay
            }
            Err(e) => {
                server.stop();
                abandon(&mut process);
                return Err(e);
            }
        };

        let (shutdown_tx, shutdown_rx) = channel::bounded(1);

        Ok(Self {
            config,
            server,
            relay,
            process,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    pub fn server(&self) -> &BroadcastServer {
        &self.server
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    pub fn pid(&self) -> u32 {
        self.process.id()
    }

    /// Run until the process exits or shutdown is requested
    pub fn run(mut self) -> Result<ExitStatus> {
        let requested = select! {
            recv(self.relay.completion()) -> _ => false,
            recv(self.shutdown_rx) -> _ => true,
        };

        let status = if requested {
            self.terminate()?
        } else {
            tracing::info!("Process output closed, ending session");
            self.server.stop();
            self.process.wait()?
        };

        self.server.join();

        // A grandchild holding the pipe open could keep the output thread alive
        if !self.relay.wait_timeout(self.config.stop_grace()) {
            tracing::warn!("Process output still open after exit");
        }

        Ok(status)
    }

    fn terminate(&mut self) -> Result<ExitStatus> {
        tracing::info!("Shutdown requested, stopping socket server");
        self.server.stop();

        if let Some(command) = &self.config.stop_command {
            tracing::info!("Sending `{}` to the process", command);
            if let Err(e) = self.relay.send_to_process(format!("{}\n", command)) {
                tracing::warn!("Could not send stop command: {}", e);
            }
        }

        if let Some(status) = self.process.wait_timeout(self.config.stop_grace())? {
            return Ok(status);
        }

        tracing::warn!(
            "Process did not exit within {:?}, killing it",
            self.config.stop_grace()
        );
        self.process.kill()?;
        self.process.wait()
    }
}

/// Kill and reap a process whose session failed to come up
fn abandon(process: &mut SupervisedProcess) {
    if let Err(e) = process.kill().and_then(|_| process.wait()) {
        tracing::warn!("Failed to clean up `{}`: {}", process.command_line(), e);
    }
}
