use server_core::error::spawn::SpawnError;
use server_core::supervisor::RunMode;
use server_core::supervisor::launch::resolve_app_root;

use std::path::Path;

/// **VALUE**: Verifies error locations point at the public call site.
///
/// **WHY THIS MATTERS**: Log lines carry `[file:line:column]`; pointing inside the library
/// would send whoever debugs a failed launch to the wrong place.
///
/// **BUG THIS CATCHES**: Would catch a lost `#[track_caller]` on `resolve_app_root`.
#[test]
fn given_missing_resource_dir_when_resolving_then_location_is_this_file() {
    // WHEN: Resolving a production root without a resource directory
    let err = resolve_app_root(RunMode::Production, None, Path::new("/dev/tree"), None)
        .unwrap_err();

    // THEN: The error carries this test file in its location
    match &err {
        SpawnError::Resolve { location, .. } => {
            assert!(
                location.file.contains("integration_tests"),
                "Location should be this file, got {}",
                location.file
            );
        }
        other => panic!("Expected Resolve error, got {other:?}"),
    }
    assert!(err.to_string().starts_with("Resolve Error: "));
}

/// **VALUE**: Verifies run-mode parse errors display the rejected value.
#[test]
fn given_unknown_mode_when_parsing_then_display_names_value() {
    let err = "staging".parse::<RunMode>().unwrap_err();

    let display = err.to_string();

    assert!(display.starts_with("Validation Error: "));
    assert!(display.contains("staging"));
}
