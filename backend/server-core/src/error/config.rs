use common::ErrorLocation;

use std::path::PathBuf;

use thiserror::Error as ThisError;

/// Failures loading, validating or persisting `overwatch.json`.
#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("Config Read Error: {path}: {message} {location}")]
    Read {
        message: String,
        path: PathBuf,
        location: ErrorLocation,
        #[source]
        source: std::io::Error,
    },

    #[error("Config Parse Error: {path}: {message} {location}")]
    Parse {
        message: String,
        path: PathBuf,
        location: ErrorLocation,
    },

    #[error("Config Write Error: {path}: {message} {location}")]
    Write {
        message: String,
        path: PathBuf,
        location: ErrorLocation,
        #[source]
        source: std::io::Error,
    },

    #[error("Config Validation Error: {message} {location}")]
    Validation {
        message: String,
        location: ErrorLocation,
    },
}
