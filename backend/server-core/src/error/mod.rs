pub mod config;
pub mod port;
pub mod process;
pub mod readiness;
pub mod spawn;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Port(#[from] port::PortError),

    #[error(transparent)]
    Spawn(#[from] spawn::SpawnError),

    #[error(transparent)]
    Readiness(#[from] readiness::ReadinessError),

    #[error(transparent)]
    Process(#[from] process::ProcessError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}
