// Unit tests for the shell error type

use crate::error::OverwatchError;

use server_core::error::readiness::ReadinessError;

use common::ErrorLocation;

use std::time::Duration;

/// **VALUE**: Verifies errors serialize with a `type` tag and their data.
///
/// **WHY THIS MATTERS**: Startup failures are written to the log as structured values; a
/// non-serializable field would break that at compile time, a changed tag silently.
///
/// **BUG THIS CATCHES**: Would catch removal of `#[serde(tag = "type", content = "data")]`.
#[test]
fn given_window_error_when_serialized_then_tagged_with_variant() {
    // GIVEN: A window error
    let err = OverwatchError::Window {
        message: String::from("no display"),
        location: ErrorLocation::caller(),
    };

    // WHEN: Serializing to JSON
    let json = serde_json::to_value(&err).unwrap();

    // THEN: Variant name under "type", fields under "data"
    assert_eq!(json["type"], "Window");
    assert_eq!(json["data"]["message"], "no display");
    assert!(json["data"]["location"]["line"].as_u64().unwrap() > 0);
}

/// **VALUE**: Verifies wrapping a core error keeps its text and points at the caller.
///
/// **BUG THIS CATCHES**: Would catch `core()` losing `#[track_caller]`, which would make every
/// wrapped error claim to come from error.rs.
#[test]
fn given_core_error_when_wrapped_then_keeps_message_and_caller_location() {
    // GIVEN: A readiness timeout from server-core
    let inner = ReadinessError::Timeout {
        message: String::from("did not start in time"),
        location: ErrorLocation::caller(),
        attempts: 60,
        elapsed: Duration::from_secs(30),
    };

    // WHEN: Wrapping it
    let expected_line = line!() + 1;
    let err = OverwatchError::core(inner);

    // THEN: Core variant, original message, this line
    match err {
        OverwatchError::Core { message, location } => {
            assert!(message.contains("did not start in time"));
            assert_eq!(location.line, expected_line);
            assert!(location.file.ends_with("error.rs"));
            assert!(location.file.contains("tests"));
        }
        other => panic!("Expected Core, got {other:?}"),
    }
}

/// **VALUE**: Verifies the display format used in log lines.
#[test]
fn given_state_error_when_displayed_then_has_prefix_and_location() {
    let err = OverwatchError::State {
        message: String::from("actor gone"),
        location: ErrorLocation::caller(),
    };

    let display = err.to_string();

    assert!(display.starts_with("State Error: actor gone ["));
    assert!(display.ends_with(']'));
}
