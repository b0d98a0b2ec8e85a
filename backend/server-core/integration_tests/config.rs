use server_core::config::{ENV_MODE, ENV_PORT, ENV_READY_RETRIES, ShellConfig};
use server_core::error::config::ConfigError;
use server_core::supervisor::RunMode;

use serial_test::serial;

// ============================================================================
// Integration tests for loading, saving and overriding the shell config
// ============================================================================

const CONFIG_FILE: &str = "overwatch.json";

fn clear_env() {
    // SAFETY: env-mutating tests are #[serial]
    unsafe {
        std::env::remove_var(ENV_PORT);
        std::env::remove_var(ENV_MODE);
        std::env::remove_var(ENV_READY_RETRIES);
    }
}

/// **VALUE**: Verifies a missing config file yields defaults, not an error.
///
/// **WHY THIS MATTERS**: A first launch has no config file at all, and the shell must still start.
#[test]
fn given_no_config_file_when_loading_then_returns_defaults() {
    let dir = tempfile::tempdir().unwrap();

    let config = ShellConfig::load(dir.path()).unwrap();

    assert_eq!(config, ShellConfig::default());
}

/// **VALUE**: Verifies the first launch writes the defaults to disk and later launches keep
/// what the user edited.
///
/// **WHY THIS MATTERS**: Users tune the port and readiness budget by editing `overwatch.json`.
/// The file has to exist to be found, and an existing file must never be overwritten.
///
/// **BUG THIS CATCHES**: Would catch defaults being rewritten over a user's file on every start.
#[test]
fn given_first_launch_when_loading_or_creating_then_defaults_written_once() {
    // GIVEN: A config directory that does not exist yet
    let dir = tempfile::tempdir().unwrap();
    let config_dir = dir.path().join("overwatch");

    // WHEN: Loading on first launch
    let first = ShellConfig::load_or_create(&config_dir);

    // THEN: Defaults are returned and persisted
    assert_eq!(first, ShellConfig::default());
    assert!(config_dir.join(CONFIG_FILE).exists());
    assert_eq!(ShellConfig::load(&config_dir).unwrap(), first);

    // WHEN: The user edits the file and the shell starts again
    let mut edited = first.clone();
    edited.server.preferred_port = 4000;
    edited.save(&config_dir).unwrap();
    let second = ShellConfig::load_or_create(&config_dir);

    // THEN: The edit survives
    assert_eq!(second.server.preferred_port, 4000);
}

/// **VALUE**: Verifies saved values are what a later load sees.
///
/// **BUG THIS CATCHES**: Would catch save writing to a different file name than load reads,
/// or the temp file never being renamed into place.
#[test]
fn given_saved_config_when_loading_then_values_persist() {
    // GIVEN: A non-default config saved to a fresh directory
    let dir = tempfile::tempdir().unwrap();
    let mut config = ShellConfig::default();
    config.server.preferred_port = 4000;
    config.server.mode = Some(RunMode::Production);
    config.shutdown.grace_period_ms = 1500;
    config.save(dir.path()).unwrap();

    // WHEN: Loading it back
    let loaded = ShellConfig::load(dir.path()).unwrap();

    // THEN: Same values, and no temp file left behind
    assert_eq!(loaded, config);
    assert!(dir.path().join(CONFIG_FILE).exists());
    assert!(!dir.path().join(format!("{CONFIG_FILE}.tmp")).exists());
}

/// **VALUE**: Verifies malformed JSON is a parse error that names the file.
#[test]
fn given_malformed_file_when_loading_then_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();

    let result = ShellConfig::load(dir.path());

    match result {
        Err(ConfigError::Parse { path, .. }) => assert!(path.ends_with(CONFIG_FILE)),
        other => panic!("Expected Parse error, got {other:?}"),
    }
}

/// **VALUE**: Verifies out-of-range values in the file are rejected on load.
#[test]
fn given_invalid_values_in_file_when_loading_then_returns_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE),
        r#"{ "readiness": { "max_retries": 0 } }"#,
    )
    .unwrap();

    let result = ShellConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::Validation { .. })));
}

/// **VALUE**: Verifies a broken config never prevents startup.
///
/// **WHY THIS MATTERS**: A hand-edited config with a typo should cost the user their
/// customisations, not the whole app.
#[test]
fn given_malformed_file_when_loading_or_default_then_returns_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE), "[]").unwrap();

    let config = ShellConfig::load_or_default(dir.path());

    assert_eq!(config, ShellConfig::default());
}

/// **VALUE**: Verifies an invalid config is refused on save and nothing is written.
#[test]
fn given_invalid_config_when_saving_then_nothing_written() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ShellConfig::default();
    config.server.port_search_limit = 0;

    let result = config.save(dir.path());

    assert!(matches!(result, Err(ConfigError::Validation { .. })));
    assert!(!dir.path().join(CONFIG_FILE).exists());
}

/// **VALUE**: Verifies `OVERWATCH_*` variables override file values.
///
/// **WHY THIS MATTERS**: Developers point the shell at another port or force production mode
/// without editing files.
#[test]
#[serial]
fn given_env_overrides_when_applied_then_replace_file_values() {
    // GIVEN: Overrides for port, mode and retries
    clear_env();
    // SAFETY: serialized with the other env tests
    unsafe {
        std::env::set_var(ENV_PORT, "4567");
        std::env::set_var(ENV_MODE, "prod");
        std::env::set_var(ENV_READY_RETRIES, "12");
    }

    // WHEN: Applying them to defaults
    let mut config = ShellConfig::default();
    config.apply_env_overrides();
    clear_env();

    // THEN: Each override took effect
    assert_eq!(config.server.preferred_port, 4567);
    assert_eq!(config.server.mode, Some(RunMode::Production));
    assert_eq!(config.readiness.max_retries, 12);
}

/// **VALUE**: Verifies unparsable or zero overrides are ignored.
///
/// **BUG THIS CATCHES**: Would catch `OVERWATCH_PORT=0` turning into a port-0 allocation
/// error at startup.
#[test]
#[serial]
fn given_invalid_env_overrides_when_applied_then_keeps_existing_values() {
    clear_env();
    // SAFETY: serialized with the other env tests
    unsafe {
        std::env::set_var(ENV_PORT, "0");
        std::env::set_var(ENV_MODE, "staging");
        std::env::set_var(ENV_READY_RETRIES, "many");
    }

    let mut config = ShellConfig::default();
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config, ShellConfig::default());
}
