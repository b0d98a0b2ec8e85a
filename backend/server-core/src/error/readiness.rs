use common::ErrorLocation;

use std::time::Duration;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ReadinessError {
    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
        attempts: u32,
        elapsed: Duration,
    },
}
