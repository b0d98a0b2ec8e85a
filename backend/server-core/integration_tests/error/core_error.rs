use server_core::error::CoreError;
use server_core::port::find_available_port;
use server_core::readiness::{ReadinessPolicy, wait_for_server};

use std::error::Error as StdError;
use std::time::Duration;

/// **VALUE**: Verifies `CoreError` wraps subsystem errors without changing their message.
///
/// **WHY THIS MATTERS**: The desktop shell logs `CoreError` directly; the text has to match
/// what the subsystem produced.
#[tokio::test]
async fn given_port_error_when_converted_then_display_is_transparent() {
    let port_err = find_available_port(0, 1).await.unwrap_err();
    let expected = port_err.to_string();

    let core: CoreError = port_err.into();

    assert_eq!(core.to_string(), expected);
    assert!(matches!(core, CoreError::Port(_)));
}

/// **VALUE**: Verifies readiness timeouts convert and keep their attempt count in the text.
#[tokio::test]
async fn given_readiness_timeout_when_converted_then_message_keeps_attempts() {
    let policy = ReadinessPolicy {
        max_retries: 0,
        retry_interval: Duration::from_millis(1),
        connect_timeout: Duration::from_millis(1),
    };
    let err = wait_for_server(1, &policy).await.unwrap_err();

    let core = CoreError::from(err);

    assert!(core.to_string().starts_with("Timeout Error: "));
    assert!(core.to_string().contains("0 attempts"));
    assert!(core.source().is_none());
}
