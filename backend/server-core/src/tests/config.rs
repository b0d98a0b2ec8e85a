// Unit tests for ShellConfig defaults and validation
// File and environment handling is covered in integration_tests/config.rs

use crate::config::ShellConfig;
use crate::error::config::ConfigError;

use std::time::Duration;

/// **VALUE**: Verifies the defaults describe the documented startup budget and are valid.
///
/// **WHY THIS MATTERS**: A first launch has no config file; defaults alone must start the
/// server on 3457 and wait up to 30 s for it.
#[test]
fn given_default_config_when_inspected_then_matches_documented_values() {
    let config = ShellConfig::default();

    assert!(config.validate().is_ok(), "Defaults must validate");
    assert_eq!(config.server.preferred_port, 3457);
    assert_eq!(config.server.port_search_limit, 100);
    assert_eq!(config.readiness.max_retries, 60);
    assert_eq!(config.readiness.retry_interval_ms, 500);
    assert_eq!(config.shutdown.grace_period(), Duration::from_secs(5));
}

/// **VALUE**: Verifies the readiness section converts into the prober's policy unchanged.
///
/// **BUG THIS CATCHES**: Would catch milliseconds being read as seconds (or vice versa).
#[test]
fn given_readiness_config_when_converted_then_policy_uses_milliseconds() {
    let mut config = ShellConfig::default();
    config.readiness.max_retries = 7;
    config.readiness.retry_interval_ms = 250;
    config.readiness.connect_timeout_ms = 40;

    let policy = config.readiness.policy();

    assert_eq!(policy.max_retries, 7);
    assert_eq!(policy.retry_interval, Duration::from_millis(250));
    assert_eq!(policy.connect_timeout, Duration::from_millis(40));
}

/// **VALUE**: Verifies partial JSON is completed with defaults.
///
/// **WHY THIS MATTERS**: Users edit one field (usually the port); the rest must not reset to
/// zero and fail validation.
#[test]
fn given_partial_json_when_deserialized_then_missing_fields_default() {
    let config: ShellConfig =
        serde_json::from_str(r#"{ "server": { "preferred_port": 4100 } }"#).unwrap();

    assert_eq!(config.server.preferred_port, 4100);
    assert_eq!(config.server.port_search_limit, 100);
    assert_eq!(config.readiness.max_retries, 60);
    assert!(config.validate().is_ok());
}

/// **VALUE**: Verifies each out-of-range value is rejected by validation.
///
/// **WHY THIS MATTERS**: Zero retries or a zero interval would make the shell quit instantly
/// or spin; port 0 would hand port choice to the OS behind the prober's back.
///
/// **BUG THIS CATCHES**: Would catch a validation rule being dropped.
#[test]
fn given_invalid_values_when_validated_then_each_is_rejected() {
    let cases: [(&str, fn(&mut ShellConfig)); 9] = [
        ("version", |c| c.version = 0),
        ("future version", |c| c.version = 99),
        ("port", |c| c.server.preferred_port = 0),
        ("search limit", |c| c.server.port_search_limit = 0),
        ("retries", |c| c.readiness.max_retries = 0),
        ("interval", |c| c.readiness.retry_interval_ms = 0),
        ("huge interval", |c| c.readiness.retry_interval_ms = 600_000),
        ("connect timeout", |c| c.readiness.connect_timeout_ms = 0),
        ("grace", |c| c.shutdown.grace_period_ms = 600_000),
    ];

    for (name, mutate) in cases {
        let mut config = ShellConfig::default();
        mutate(&mut config);

        assert!(
            matches!(config.validate(), Err(ConfigError::Validation { .. })),
            "Invalid {name} should be rejected"
        );
    }
}
