use common::ErrorLocation;

use serde::Serialize;
use thiserror::Error;

/// Errors raised by the desktop shell.
///
/// Core failures are flattened to their display text so the enum stays
/// serializable; the location always points into this crate.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OverwatchError {
    /// Setup-level failure (paths, logger, toolkit)
    #[error("Overwatch Error: {message} {location}")]
    Overwatch {
        message: String,
        location: ErrorLocation,
    },

    /// Failure reported by server-core (port, spawn, readiness, teardown)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// The main window could not be created or reached
    #[error("Window Error: {message} {location}")]
    Window {
        message: String,
        location: ErrorLocation,
    },

    /// The lifecycle state actor is gone or rejected the request
    #[error("State Error: {message} {location}")]
    State {
        message: String,
        location: ErrorLocation,
    },
}

impl OverwatchError {
    /// Wrap a server-core error, keeping its message and recording the caller.
    #[track_caller]
    pub fn core(err: impl std::error::Error) -> Self {
        OverwatchError::Core {
            message: err.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
