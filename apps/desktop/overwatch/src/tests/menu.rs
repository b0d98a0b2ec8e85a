// Unit tests for menu ids and zoom stepping

use crate::menu::{DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM, MenuAction, ZoomState, next_zoom};

use std::collections::HashSet;

/// **VALUE**: Verifies every custom item id maps back to its action.
///
/// **BUG THIS CATCHES**: Would catch a new action added to the menu but missing from
/// `ALL`, which would leave its item dead.
#[test]
fn given_all_actions_when_looking_up_ids_then_round_trip_uniquely() {
    let ids: HashSet<&str> = MenuAction::ALL.iter().map(|action| action.id()).collect();
    assert_eq!(ids.len(), MenuAction::ALL.len(), "Menu ids must be unique");

    for action in MenuAction::ALL {
        assert_eq!(MenuAction::from_id(action.id()), Some(action));
    }
}

/// **VALUE**: Verifies each custom item has its own label and shortcut, and reload exists once.
///
/// **BUG THIS CATCHES**: Would catch a second reload item that looks like a cache-bypassing
/// reload but runs the same plain reload under another shortcut.
#[test]
fn given_all_actions_when_listing_labels_and_accelerators_then_distinct() {
    let labels: HashSet<&str> = MenuAction::ALL.iter().map(|action| action.label()).collect();
    let accelerators: HashSet<&str> =
        MenuAction::ALL.iter().map(|action| action.accelerator()).collect();

    assert_eq!(labels.len(), MenuAction::ALL.len());
    assert_eq!(accelerators.len(), MenuAction::ALL.len());
    assert_eq!(
        MenuAction::ALL
            .iter()
            .filter(|action| action.label().contains("Reload"))
            .count(),
        1
    );
    assert_eq!(MenuAction::from_id("view.force_reload"), None);
}

/// **VALUE**: Verifies ids of predefined items are ignored by the custom handler.
#[test]
fn given_unknown_id_when_looking_up_then_none() {
    assert_eq!(MenuAction::from_id("quit"), None);
    assert_eq!(MenuAction::from_id(""), None);
}

/// **VALUE**: Verifies zoom steps by a tenth and snaps away float drift.
///
/// **WHY THIS MATTERS**: Repeated `+ 0.1` on f64 accumulates error (1.2000000000000002);
/// without snapping, "Actual Size" followed by zooming would never return to round values.
#[test]
fn given_zoom_in_and_out_when_stepping_then_snaps_to_tenths() {
    assert_eq!(next_zoom(1.0, MenuAction::ZoomIn), Some(1.1));
    assert_eq!(next_zoom(1.1, MenuAction::ZoomIn), Some(1.2));
    assert_eq!(next_zoom(1.0, MenuAction::ZoomOut), Some(0.9));
    assert_eq!(next_zoom(0.30000000000000004 + 0.9, MenuAction::ZoomOut), Some(1.1));
}

/// **VALUE**: Verifies zoom never leaves [0.5, 3.0].
///
/// **BUG THIS CATCHES**: Would catch a missing clamp letting the page shrink to nothing.
#[test]
fn given_zoom_at_limits_when_stepping_past_then_clamped() {
    assert_eq!(next_zoom(MAX_ZOOM, MenuAction::ZoomIn), Some(MAX_ZOOM));
    assert_eq!(next_zoom(MIN_ZOOM, MenuAction::ZoomOut), Some(MIN_ZOOM));
}

/// **VALUE**: Verifies "Actual Size" resets and non-zoom actions leave zoom alone.
#[test]
fn given_non_stepping_actions_when_computing_zoom_then_reset_or_none() {
    assert_eq!(next_zoom(2.4, MenuAction::ActualSize), Some(DEFAULT_ZOOM));
    assert_eq!(next_zoom(2.4, MenuAction::Reload), None);
    assert_eq!(next_zoom(2.4, MenuAction::ToggleDevtools), None);
}

#[test]
fn given_zoom_state_when_set_then_get_returns_new_value() {
    let state = ZoomState::default();
    assert_eq!(state.get(), DEFAULT_ZOOM);

    state.set(1.5);

    assert_eq!(state.get(), 1.5);
}
