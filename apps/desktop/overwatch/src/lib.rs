//! OVERWATCH desktop shell.
//!
//! The binary in `main.rs` wires these modules into the Tauri builder; they are
//! a library so unit and integration tests can reach them.

pub mod error;
pub mod lifecycle;
pub mod logger;
pub mod menu;
pub mod state;
pub mod window;

#[cfg(test)]
mod tests;
