//! Process Module
//!
//! Launching and owning the supervised game server process.
//!
//! ## Components
//! - `LaunchSpec`: what to run and where
//! - `SupervisedProcess`: the running child and its console streams
//! - `workspace`: server directory preparation before launch

mod launch;
mod supervisor;
pub mod workspace;

pub use launch::{required_java_version, LaunchSpec, NO_GUI_ARG};
pub use supervisor::SupervisedProcess;
