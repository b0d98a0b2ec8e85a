//! Shared building blocks for the OVERWATCH desktop shell.
//!
//! ## Architecture
//!
//! - **common** (this crate): error location tracking shared by every layer
//! - **server-core**: port allocation, server supervision, readiness probing
//! - **overwatch**: Tauri application wiring everything together

pub mod error;

pub use error::error_location::ErrorLocation;
