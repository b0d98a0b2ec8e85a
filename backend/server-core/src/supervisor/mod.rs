//! Server process supervision.
//!
//! This module provides functionality for:
//! - Building the launch plan (executable, `start`/`dev` arguments, `PORT`/`NODE_ENV`)
//! - Spawning the server and forwarding its output to the log
//! - Tearing the server down with an escalating SIGTERM → SIGKILL sequence

pub mod launch;
pub mod process;
pub mod spawn;

pub use launch::{LaunchPlan, RunMode};
pub use process::{ServerProcess, TerminationOutcome};
pub use spawn::spawn_server;
