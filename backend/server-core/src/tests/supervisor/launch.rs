// Unit tests for launch plan construction

use crate::supervisor::launch::{
    LaunchPlan, MODE_ENV, PORT_ENV, RunMode, default_executable, resolve_app_root,
};
use crate::error::spawn::SpawnError;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// **VALUE**: Verifies the production plan runs `next start -p <port>` with `PORT` and `NODE_ENV`.
///
/// **WHY THIS MATTERS**: The allocated port must reach the server twice (flag and env var),
/// otherwise the server binds one port while the prober and window use another.
///
/// **BUG THIS CATCHES**: Would catch a plan that forgets the `-p` flag or the env overlay.
#[test]
fn given_production_mode_when_plan_built_then_uses_start_and_port_everywhere() {
    // GIVEN: A bundled app root
    let root = Path::new("/opt/overwatch/resources/app");

    // WHEN: Building the plan
    let plan = LaunchPlan::new(3457, RunMode::Production, root);

    // THEN: start -p 3457 from the app root, with env overlay
    assert_eq!(plan.program, default_executable(root));
    assert_eq!(plan.args, vec!["start", "-p", "3457"]);
    assert_eq!(plan.cwd, root);
    assert!(plan.env.contains(&(PORT_ENV.to_string(), "3457".to_string())));
    assert!(plan.env.contains(&(MODE_ENV.to_string(), "production".to_string())));
}

/// **VALUE**: Verifies the development plan switches to `dev` and `NODE_ENV=development`.
///
/// **BUG THIS CATCHES**: Would catch the mode flag being ignored (e.g. always `start`, which
/// fails in a dev tree with no production build).
#[test]
fn given_development_mode_when_plan_built_then_uses_dev_command() {
    let plan = LaunchPlan::new(4000, RunMode::Development, Path::new("/src/overwatch"));

    assert_eq!(plan.args, vec!["dev", "-p", "4000"]);
    assert!(plan.env.contains(&(MODE_ENV.to_string(), "development".to_string())));
}

/// **VALUE**: Verifies the tokio command mirrors the plan (program, args, cwd, env).
///
/// **WHY THIS MATTERS**: `LaunchPlan` is what gets logged; `to_command()` is what actually runs.
/// They must not drift apart.
///
/// **BUG THIS CATCHES**: Would catch a command builder that drops the env overlay or cwd.
#[test]
fn given_plan_when_converted_to_command_then_carries_all_settings() {
    // GIVEN: A plan with an overridden executable
    let plan = LaunchPlan::new(3458, RunMode::Production, Path::new("/app"))
        .with_program("/usr/local/bin/next");

    // WHEN: Converting to a command
    let cmd = plan.to_command();
    let std_cmd = cmd.as_std();

    // THEN: Everything is carried over
    assert_eq!(std_cmd.get_program(), OsStr::new("/usr/local/bin/next"));
    let args: Vec<&OsStr> = std_cmd.get_args().collect();
    assert_eq!(args, vec!["start", "-p", "3458"]);
    assert_eq!(std_cmd.get_current_dir(), Some(Path::new("/app")));

    let envs: Vec<(&OsStr, Option<&OsStr>)> = std_cmd.get_envs().collect();
    assert!(envs.contains(&(OsStr::new("PORT"), Some(OsStr::new("3458")))));
    assert!(envs.contains(&(OsStr::new("NODE_ENV"), Some(OsStr::new("production")))));
}

/// **VALUE**: Verifies the default executable lives under `node_modules/.bin`.
#[test]
fn given_app_root_when_default_executable_resolved_then_points_into_node_modules_bin() {
    let exe = default_executable(Path::new("/app"));

    assert!(exe.starts_with("/app/node_modules/.bin"));
    let name = exe.file_name().unwrap().to_string_lossy().to_string();
    assert!(name == "next" || name == "next.cmd", "Unexpected binary: {name}");
}

/// **VALUE**: Verifies app root resolution for bundled, development and overridden setups.
///
/// **WHY THIS MATTERS**: A packaged build must never try to run from the developer's source
/// tree, and an explicit override must win in both modes.
///
/// **BUG THIS CATCHES**: Would catch swapped branches or an ignored override.
#[test]
fn given_each_mode_when_app_root_resolved_then_picks_expected_directory() {
    let resources = Path::new("/bundle/resources");
    let dev_root = Path::new("/src/overwatch");

    let bundled = resolve_app_root(RunMode::Production, Some(resources), dev_root, None).unwrap();
    assert_eq!(bundled, PathBuf::from("/bundle/resources/app"));

    let dev = resolve_app_root(RunMode::Development, Some(resources), dev_root, None).unwrap();
    assert_eq!(dev, PathBuf::from("/src/overwatch"));

    let overridden = resolve_app_root(
        RunMode::Production,
        Some(resources),
        dev_root,
        Some(Path::new("/custom")),
    )
    .unwrap();
    assert_eq!(overridden, PathBuf::from("/custom"));
}

/// **VALUE**: Verifies a packaged build without a resource directory fails with a clear error.
#[test]
fn given_production_without_resources_when_app_root_resolved_then_returns_resolve_error() {
    let result = resolve_app_root(RunMode::Production, None, Path::new("/src"), None);

    assert!(matches!(result, Err(SpawnError::Resolve { .. })));
}

/// **VALUE**: Verifies run-mode parsing accepts long and short names, case-insensitively.
///
/// **BUG THIS CATCHES**: Would catch `OVERWATCH_MODE=Dev` being rejected.
#[test]
fn given_mode_strings_when_parsed_then_maps_or_rejects() {
    assert_eq!("production".parse::<RunMode>().unwrap(), RunMode::Production);
    assert_eq!(" PROD ".parse::<RunMode>().unwrap(), RunMode::Production);
    assert_eq!("Dev".parse::<RunMode>().unwrap(), RunMode::Development);
    assert_eq!("development".parse::<RunMode>().unwrap(), RunMode::Development);
    assert!(matches!(
        "staging".parse::<RunMode>(),
        Err(SpawnError::Validation { .. })
    ));
}

/// **VALUE**: Verifies the packaged flag maps to the right mode.
#[test]
fn given_packaged_flag_when_mode_derived_then_matches() {
    assert_eq!(RunMode::from_packaged(true), RunMode::Production);
    assert_eq!(RunMode::from_packaged(false), RunMode::Development);
}
