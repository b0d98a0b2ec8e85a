// Unit tests for lifecycle phases, exit policy and launch planning

use crate::lifecycle::{ExitPolicy, LifecyclePhase, build_launch_plan, dev_root};

use server_core::config::ShellConfig;
use server_core::error::spawn::SpawnError;
use server_core::supervisor::RunMode;

use std::path::{Path, PathBuf};

use LifecyclePhase::{Probing, Quitting, Ready, Running, Starting};

const ALL_PHASES: [LifecyclePhase; 5] = [Starting, Probing, Ready, Running, Quitting];

/// **VALUE**: Verifies the startup path only moves forward, one step at a time.
///
/// **WHY THIS MATTERS**: A window must never open before readiness. Rejecting
/// `Starting → Ready` or `Probing → Running` keeps that ordering in the state machine itself.
#[test]
fn given_forward_steps_when_checked_then_only_adjacent_steps_allowed() {
    assert!(Starting.can_transition_to(Probing));
    assert!(Probing.can_transition_to(Ready));
    assert!(Ready.can_transition_to(Running));

    assert!(!Starting.can_transition_to(Ready));
    assert!(!Starting.can_transition_to(Running));
    assert!(!Probing.can_transition_to(Running));
    assert!(!Running.can_transition_to(Probing));
    assert!(!Running.can_transition_to(Running));
}

/// **VALUE**: Verifies `quitting` is reachable from every phase and is never left.
///
/// **BUG THIS CATCHES**: Would catch a late readiness success moving a quitting shell back
/// to `ready` and opening a window during shutdown.
#[test]
fn given_any_phase_when_quitting_then_allowed_and_absorbing() {
    for phase in ALL_PHASES {
        assert!(phase.can_transition_to(Quitting), "{phase} -> quitting");
    }
    for phase in [Starting, Probing, Ready, Running] {
        assert!(!Quitting.can_transition_to(phase), "quitting -> {phase}");
    }
}

#[test]
fn given_phases_when_displayed_then_lowercase_names() {
    let names: Vec<String> = ALL_PHASES.iter().map(ToString::to_string).collect();

    assert_eq!(names, ["starting", "probing", "ready", "running", "quitting"]);
}

/// **VALUE**: Verifies closing the last window quits except under the keep-running policy.
///
/// **WHY THIS MATTERS**: macOS apps stay in the dock with no windows; elsewhere a closed
/// window with a live server behind it would be an orphaned background process.
#[test]
fn given_exit_policies_when_last_window_closes_then_only_keep_running_prevents() {
    assert!(ExitPolicy::KeepRunning.should_prevent_exit(None));
    assert!(!ExitPolicy::Quit.should_prevent_exit(None));
}

/// **VALUE**: Verifies explicit exits (startup failure, quit) are never swallowed.
///
/// **BUG THIS CATCHES**: Would catch `exit(1)` after a readiness timeout being prevented on
/// macOS, leaving a windowless app that never quits.
#[test]
fn given_explicit_exit_code_when_checked_then_never_prevented() {
    assert!(!ExitPolicy::KeepRunning.should_prevent_exit(Some(1)));
    assert!(!ExitPolicy::KeepRunning.should_prevent_exit(Some(0)));
    assert!(!ExitPolicy::Quit.should_prevent_exit(Some(1)));
}

#[test]
fn given_current_platform_when_reading_policy_then_matches_target_os() {
    let expected = if cfg!(target_os = "macos") {
        ExitPolicy::KeepRunning
    } else {
        ExitPolicy::Quit
    };

    assert_eq!(ExitPolicy::current(), expected);
}

/// **VALUE**: Verifies a packaged build runs `start` from the bundled app directory.
#[test]
fn given_packaged_build_when_planning_then_production_from_resources() {
    // GIVEN: Default config and a resource directory
    let config = ShellConfig::default();
    let resources = Path::new("/opt/overwatch/resources");

    // WHEN: Planning a packaged launch
    let plan = build_launch_plan(&config, 3457, true, Some(resources)).unwrap();

    // THEN: Production mode in <resources>/app
    assert_eq!(plan.mode, RunMode::Production);
    assert_eq!(plan.cwd, resources.join("app"));
    assert_eq!(plan.args, ["start", "-p", "3457"]);
}

/// **VALUE**: Verifies a development build runs `dev` from the workspace tree.
#[test]
fn given_dev_build_when_planning_then_development_from_dev_root() {
    let config = ShellConfig::default();

    let plan = build_launch_plan(&config, 3458, false, None).unwrap();

    assert_eq!(plan.mode, RunMode::Development);
    assert_eq!(plan.cwd, dev_root());
    assert_eq!(plan.args, ["dev", "-p", "3458"]);
    assert!(plan.env.contains(&(String::from("PORT"), String::from("3458"))));
}

/// **VALUE**: Verifies config overrides win over build-derived defaults.
///
/// **WHY THIS MATTERS**: Pointing a dev build at a prebuilt app (or a custom server binary)
/// is the main reason the overrides exist.
#[test]
fn given_config_overrides_when_planning_then_override_mode_root_and_executable() {
    // GIVEN: Config forcing production from a custom root with a custom binary
    let mut config = ShellConfig::default();
    config.server.mode = Some(RunMode::Production);
    config.server.app_root = Some(PathBuf::from("/srv/dashboard"));
    config.server.executable = Some(PathBuf::from("/usr/local/bin/next"));

    // WHEN: Planning an unpackaged launch without resources
    let plan = build_launch_plan(&config, 4000, false, None).unwrap();

    // THEN: All three overrides applied
    assert_eq!(plan.mode, RunMode::Production);
    assert_eq!(plan.cwd, PathBuf::from("/srv/dashboard"));
    assert_eq!(plan.program, PathBuf::from("/usr/local/bin/next"));
}

/// **VALUE**: Verifies a forced production mode without resources or root is an error.
#[test]
fn given_forced_production_without_resources_when_planning_then_resolve_error() {
    let mut config = ShellConfig::default();
    config.server.mode = Some(RunMode::Production);

    let result = build_launch_plan(&config, 4000, false, None);

    assert!(matches!(result, Err(SpawnError::Resolve { .. })));
}

#[test]
fn given_dev_root_when_resolved_then_contains_this_crate() {
    let root = dev_root();

    assert!(root.join("apps/desktop/overwatch/Cargo.toml").exists());
}
