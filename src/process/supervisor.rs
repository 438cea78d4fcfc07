//! Process Supervisor
//!
//! Owns the child process and hands out its console streams.

use std::io::{BufReader, PipeReader};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{RelayError, Result};

use super::LaunchSpec;

/// How often `wait_timeout` polls the child
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A running child process with piped stdin and a combined output pipe
///
/// stdout and stderr share one pipe, so error logs and stack traces come
/// out of the same stream as regular console lines. Each stream can be
/// taken exactly once.
pub struct SupervisedProcess {
    child: Child,
    output: Option<PipeReader>,
    command_line: String,
}

impl SupervisedProcess {
    /// Spawn the process described by `spec`
    pub fn spawn(spec: &LaunchSpec) -> Result<Self> {
        let (output, output_writer) = std::io::pipe()?;

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(output_writer.try_clone()?)
            .stderr(output_writer);

        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        let spawned = command.spawn();

        // The command still holds our copies of the write end; without
        // dropping them the output would never reach end of stream
        drop(command);

        let child = spawned.map_err(|source| RelayError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let command_line = spec.display();
        tracing::info!("Started `{}` (pid {})", command_line, child.id());

        Ok(Self {
            child,
            output: Some(output),
            command_line,
        })
    }

    /// Take the process input stream
    pub fn take_input(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    /// Take the combined stdout/stderr stream, buffered for line reads
    pub fn take_output(&mut self) -> Option<BufReader<PipeReader>> {
        self.output.take().map(BufReader::new)
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Exit status if the process has already exited
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }

    /// Block until the process exits
    pub fn wait(&mut self) -> Result<ExitStatus> {
        let status = self.child.wait()?;
        tracing::info!("`{}` exited with {}", self.command_line, status);
        Ok(status)
    }

    /// Wait up to `timeout` for the process to exit
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<ExitStatus>> {
        // Too far out to represent: no practical deadline
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.wait().map(Some);
        };

        loop {
            if let Some(status) = self.child.try_wait()? {
                tracing::info!("`{}` exited with {}", self.command_line, status);
                return Ok(Some(status));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            thread::sleep(EXIT_POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Kill the process (no-op if it already exited)
    pub fn kill(&mut self) -> Result<()> {
        match self.child.kill() {
            Ok(()) => {
                tracing::warn!("Killed `{}` (pid {})", self.command_line, self.child.id());
                Ok(())
            }
            // Already reaped
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }
}
