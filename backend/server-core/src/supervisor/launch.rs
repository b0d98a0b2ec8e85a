use crate::SERVER_BINARY;
use crate::error::spawn::SpawnError;

use common::ErrorLocation;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::process::Command as TokioCommand;

pub const PORT_ENV: &str = "PORT";
pub const MODE_ENV: &str = "NODE_ENV";

const PORT_FLAG: &str = "-p";
const BUNDLED_APP_DIR: &str = "app";
const NODE_MODULES_DIR: &str = "node_modules";
const NODE_BIN_DIR: &str = ".bin";

/// Whether the server runs from a packaged bundle or a development tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Production,
    Development,
}

impl RunMode {
    pub fn from_packaged(packaged: bool) -> Self {
        if packaged {
            RunMode::Production
        } else {
            RunMode::Development
        }
    }

    /// Server subcommand: `start` serves a prebuilt app, `dev` runs the dev server.
    pub fn startup_command(self) -> &'static str {
        match self {
            RunMode::Production => "start",
            RunMode::Development => "dev",
        }
    }

    /// Value exported to the child as `NODE_ENV`.
    pub fn env_value(self) -> &'static str {
        match self {
            RunMode::Production => "production",
            RunMode::Development => "development",
        }
    }
}

impl Display for RunMode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.env_value())
    }
}

impl FromStr for RunMode {
    type Err = SpawnError;

    #[track_caller]
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(RunMode::Production),
            "development" | "dev" => Ok(RunMode::Development),
            other => Err(SpawnError::Validation {
                message: format!("Unknown run mode '{other}' (expected production or development)"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

/// Everything needed to start the server child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Overlaid on top of the inherited parent environment.
    pub env: Vec<(String, String)>,
    pub mode: RunMode,
    pub port: u16,
}

impl LaunchPlan {
    /// Plan for `<app_root>/node_modules/.bin/next <start|dev> -p <port>`.
    pub fn new(port: u16, mode: RunMode, app_root: &Path) -> Self {
        Self {
            program: default_executable(app_root),
            args: vec![
                mode.startup_command().to_string(),
                PORT_FLAG.to_string(),
                port.to_string(),
            ],
            cwd: app_root.to_path_buf(),
            env: vec![
                (PORT_ENV.to_string(), port.to_string()),
                (MODE_ENV.to_string(), mode.env_value().to_string()),
            ],
            mode,
            port,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Program and arguments, for logging.
    pub fn command_line(&self) -> Vec<String> {
        let mut parts = vec![self.program.to_string_lossy().to_string()];
        parts.extend(self.args.iter().cloned());
        parts
    }

    pub(crate) fn to_command(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.cwd)
            .envs(self.env.iter().map(|(key, value)| (key.as_str(), value.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// `<app_root>/node_modules/.bin/next` (`next.cmd` on Windows).
pub fn default_executable(app_root: &Path) -> PathBuf {
    let binary = if cfg!(target_os = "windows") {
        format!("{SERVER_BINARY}.cmd")
    } else {
        SERVER_BINARY.to_string()
    };
    app_root.join(NODE_MODULES_DIR).join(NODE_BIN_DIR).join(binary)
}

/// Resolve the directory the server runs from.
///
/// An explicit override always wins. Otherwise a packaged build runs from
/// `<resource_dir>/app` and a development build from `dev_root`.
///
/// # Errors
///
/// Returns [`SpawnError::Resolve`] in production mode when no resource directory is known.
#[track_caller]
pub fn resolve_app_root(
    mode: RunMode,
    resource_dir: Option<&Path>,
    dev_root: &Path,
    override_root: Option<&Path>,
) -> Result<PathBuf, SpawnError> {
    if let Some(root) = override_root {
        return Ok(root.to_path_buf());
    }

    match (mode, resource_dir) {
        (RunMode::Production, Some(dir)) => Ok(dir.join(BUNDLED_APP_DIR)),
        (RunMode::Production, None) => Err(SpawnError::Resolve {
            message: String::from("Packaged build has no resource directory"),
            location: ErrorLocation::from(Location::caller()),
        }),
        (RunMode::Development, _) => Ok(dev_root.to_path_buf()),
    }
}
