//! Launch recipes
//!
//! Describes how the supervised process is started. The game server is a
//! Spigot jar run headless from its own directory.

use std::path::{Path, PathBuf};

use crate::error::{RelayError, Result};

/// Argument that keeps the server from opening its Swing console
pub const NO_GUI_ARG: &str = "nogui";

/// Program, arguments and working directory of a process to supervise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl LaunchSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// `java -jar <jar> nogui`, run from the jar's directory
    ///
    /// The jar is passed by file name since the process runs next to it.
    pub fn spigot(jar_path: impl AsRef<Path>) -> Result<Self> {
        let jar_path = jar_path.as_ref();

        let file_name = jar_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                RelayError::Config(format!("Invalid server jar path: {}", jar_path.display()))
            })?;

        let working_dir = match jar_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self::new("java")
            .arg("-jar")
            .arg(file_name)
            .arg(NO_GUI_ARG)
            .working_dir(working_dir))
    }

    /// Use a specific Java binary instead of `java` from PATH
    pub fn with_java(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Command line for logging
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Java major version required by a Minecraft revision (`major.minor[.build]`)
///
/// | Revision     | Java |
/// |--------------|------|
/// | 1.19         | 18   |
/// | 1.18         | 17   |
/// | 1.17         | 16   |
/// | 1.8 - 1.16   | 11   |
pub fn required_java_version(revision: &str) -> Result<u32> {
    let unsupported = || RelayError::Config(format!("No known Java version for revision {}", revision));

    let mut parts = revision.trim().splitn(3, '.');
    let major: u32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(unsupported)?;
    let minor: u32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(unsupported)?;

    if major != 1 {
        return Err(unsupported());
    }

    match minor {
        19 => Ok(18),
        18 => Ok(17),
        17 => Ok(16),
        8..=16 => Ok(11),
        _ => Err(unsupported()),
    }
}
