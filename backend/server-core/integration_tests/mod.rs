mod config;
mod error;
mod port;
mod readiness;
mod supervisor;
