use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum PortError {
    #[error("Invalid Port Error: {message} {location}")]
    InvalidPort {
        message: String,
        location: ErrorLocation,
    },

    #[error("Port Exhausted Error: {message} {location}")]
    Exhausted {
        message: String,
        location: ErrorLocation,
        attempts: u32,
    },
}
