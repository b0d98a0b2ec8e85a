use common::ErrorLocation;

use thiserror::Error as ThisError;

/// Failures while tearing down the supervised server process.
#[derive(Debug, ThisError)]
pub enum ProcessError {
    #[error("Wait Error: {message} {location}")]
    Wait {
        message: String,
        location: ErrorLocation,
        #[source]
        source: std::io::Error,
    },

    #[error("Kill Error: {message} {location}")]
    Kill {
        message: String,
        location: ErrorLocation,
        #[source]
        source: std::io::Error,
    },
}
