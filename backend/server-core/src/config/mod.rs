use crate::DEFAULT_SERVER_PORT;
use crate::error::config::ConfigError;
use crate::port::DEFAULT_PORT_SEARCH_LIMIT;
use crate::readiness::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL, ReadinessPolicy,
};
use crate::supervisor::RunMode;
use crate::supervisor::process::DEFAULT_GRACE_PERIOD;

use common::ErrorLocation;

use std::env;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "overwatch.json";
const CONFIG_VERSION: u32 = 1;
const MAX_RETRY_INTERVAL_MS: u64 = 60_000;
const MAX_GRACE_PERIOD_MS: u64 = 60_000;

pub const ENV_PORT: &str = "OVERWATCH_PORT";
pub const ENV_APP_ROOT: &str = "OVERWATCH_APP_ROOT";
pub const ENV_SERVER_BIN: &str = "OVERWATCH_SERVER_BIN";
pub const ENV_MODE: &str = "OVERWATCH_MODE";
pub const ENV_READY_RETRIES: &str = "OVERWATCH_READY_RETRIES";

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_preferred_port")]
    pub preferred_port: u16,
    #[serde(default = "default_port_search_limit")]
    pub port_search_limit: u16,
    /// Directory the server runs from; replaces the bundled/dev-tree default.
    #[serde(default)]
    pub app_root: Option<PathBuf>,
    /// Server executable; replaces `<app_root>/node_modules/.bin/next`.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Forces `start` or `dev` regardless of how the shell was built.
    #[serde(default)]
    pub mode: Option<RunMode>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            preferred_port: default_preferred_port(),
            port_search_limit: default_port_search_limit(),
            app_root: None,
            executable: None,
            mode: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_interval_ms: default_retry_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl ReadinessConfig {
    pub fn policy(&self) -> ReadinessPolicy {
        ReadinessPolicy {
            max_retries: self.max_retries,
            retry_interval: Duration::from_millis(self.retry_interval_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownConfig {
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period_ms(),
        }
    }
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub readiness: ReadinessConfig,

    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: ServerConfig::default(),
            readiness: ReadinessConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_preferred_port() -> u16 {
    DEFAULT_SERVER_PORT
}
fn default_port_search_limit() -> u16 {
    DEFAULT_PORT_SEARCH_LIMIT
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_retry_interval_ms() -> u64 {
    DEFAULT_RETRY_INTERVAL.as_millis() as u64
}
fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_millis() as u64
}
fn default_grace_period_ms() -> u64 {
    DEFAULT_GRACE_PERIOD.as_millis() as u64
}

// ============================================
// IMPLEMENTATION
// ============================================

impl ShellConfig {
    /// Load config from `{config_dir}/overwatch.json`.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file does not exist.
    /// Returns `Err(ConfigError)` if the file exists but is unreadable, malformed or invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Read {
            message: e.to_string(),
            path: config_path.clone(),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;

        let config: ShellConfig =
            serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
                message: e.to_string(),
                path: config_path.clone(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Load config, logging and falling back to defaults on any error.
    pub fn load_or_default(config_dir: &Path) -> Self {
        Self::load(config_dir).unwrap_or_else(|e| {
            warn!("Ignoring invalid config, using defaults: {e}");
            Self::default()
        })
    }

    /// Load config, writing the defaults to disk on first run so there is a
    /// file to edit. A failed write is logged and the defaults are still used.
    pub fn load_or_create(config_dir: &Path) -> Self {
        if config_dir.join(CONFIG_FILE_NAME).exists() {
            return Self::load_or_default(config_dir);
        }

        let config = Self::default();
        if let Err(e) = config.save(config_dir) {
            warn!("Failed to write default config: {e}");
        }
        config
    }

    /// Save config to `{config_dir}/overwatch.json` (temp file + rename).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, directory creation, serialization,
    /// write or rename fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::Write {
            message: format!("Failed to create config directory: {e}"),
            path: config_dir.to_path_buf(),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{CONFIG_FILE_NAME}.tmp"));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Validation {
            message: format!("Config is not serializable: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::Write {
            message: e.to_string(),
            path: temp_path.clone(),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::Write {
            message: e.to_string(),
            path: config_path.clone(),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::Validation {
            message,
            location: ErrorLocation::from(Location::caller()),
        };

        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(invalid(format!(
                "Invalid version: {} (expected 1-{CONFIG_VERSION})",
                self.version
            )));
        }

        if self.server.preferred_port == 0 {
            return Err(invalid(String::from("preferred_port must be 1-65535")));
        }

        if self.server.port_search_limit == 0 {
            return Err(invalid(String::from("port_search_limit must be at least 1")));
        }

        if self.readiness.max_retries == 0 {
            return Err(invalid(String::from("max_retries must be at least 1")));
        }

        if self.readiness.retry_interval_ms == 0
            || self.readiness.retry_interval_ms > MAX_RETRY_INTERVAL_MS
        {
            return Err(invalid(format!(
                "Invalid retry_interval_ms: {} (must be 1-{MAX_RETRY_INTERVAL_MS})",
                self.readiness.retry_interval_ms
            )));
        }

        if self.readiness.connect_timeout_ms == 0 {
            return Err(invalid(String::from("connect_timeout_ms must be at least 1")));
        }

        if self.shutdown.grace_period_ms > MAX_GRACE_PERIOD_MS {
            return Err(invalid(format!(
                "Invalid grace_period_ms: {} (must be at most {MAX_GRACE_PERIOD_MS})",
                self.shutdown.grace_period_ms
            )));
        }

        Ok(())
    }

    /// Apply `OVERWATCH_*` environment overrides on top of file values.
    ///
    /// Values that fail to parse are logged and ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = env_override::<u16>(ENV_PORT).filter(|port| *port != 0) {
            debug!("{ENV_PORT} overrides preferred port: {port}");
            self.server.preferred_port = port;
        }

        if let Some(root) = env_value(ENV_APP_ROOT) {
            debug!("{ENV_APP_ROOT} overrides app root: {root}");
            self.server.app_root = Some(PathBuf::from(root));
        }

        if let Some(bin) = env_value(ENV_SERVER_BIN) {
            debug!("{ENV_SERVER_BIN} overrides server executable: {bin}");
            self.server.executable = Some(PathBuf::from(bin));
        }

        if let Some(mode) = env_override::<RunMode>(ENV_MODE) {
            debug!("{ENV_MODE} overrides run mode: {mode}");
            self.server.mode = Some(mode);
        }

        if let Some(retries) = env_override::<u32>(ENV_READY_RETRIES).filter(|r| *r > 0) {
            debug!("{ENV_READY_RETRIES} overrides readiness retries: {retries}");
            self.readiness.max_retries = retries;
        }
    }

    /// Load a `.env` file from the working directory, then next to the executable.
    ///
    /// Returns the path that was loaded, if any.
    pub fn load_dotenv() -> Option<PathBuf> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded .env from: {}", path.display());
            return Some(path);
        }

        let env_path = env::current_exe().ok()?.parent()?.join(".env");
        if !env_path.exists() {
            return None;
        }

        match dotenvy::from_path(&env_path) {
            Ok(()) => {
                info!("Loaded .env from: {}", env_path.display());
                Some(env_path)
            }
            Err(e) => {
                warn!("Failed to parse .env at {}: {e}", env_path.display());
                None
            }
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_override<T: FromStr>(key: &str) -> Option<T> {
    let raw = env_value(key)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid {key} value: {raw}");
            None
        }
    }
}
