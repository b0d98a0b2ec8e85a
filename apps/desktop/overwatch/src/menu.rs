//! Native menu bar and the handlers for its custom View items.

use crate::window::MAIN_WINDOW_LABEL;

use std::sync::Mutex;

use log::{debug, warn};
use tauri::menu::{Menu, MenuEvent, MenuItem, PredefinedMenuItem, Submenu};
use tauri::{AppHandle, Manager, Runtime, WebviewWindow};

pub const APP_MENU_TITLE: &str = "OVERWATCH";

pub const ZOOM_STEP: f64 = 0.1;
pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 3.0;
pub const DEFAULT_ZOOM: f64 = 1.0;

/// Custom View menu items. Everything else in the menu is a predefined item
/// handled by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Reload,
    ToggleDevtools,
    ActualSize,
    ZoomIn,
    ZoomOut,
}

impl MenuAction {
    pub const ALL: [MenuAction; 5] = [
        MenuAction::Reload,
        MenuAction::ToggleDevtools,
        MenuAction::ActualSize,
        MenuAction::ZoomIn,
        MenuAction::ZoomOut,
    ];

    pub fn id(self) -> &'static str {
        match self {
            MenuAction::Reload => "view.reload",
            MenuAction::ToggleDevtools => "view.toggle_devtools",
            MenuAction::ActualSize => "view.actual_size",
            MenuAction::ZoomIn => "view.zoom_in",
            MenuAction::ZoomOut => "view.zoom_out",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.id() == id)
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            MenuAction::Reload => "Reload",
            MenuAction::ToggleDevtools => "Toggle Developer Tools",
            MenuAction::ActualSize => "Actual Size",
            MenuAction::ZoomIn => "Zoom In",
            MenuAction::ZoomOut => "Zoom Out",
        }
    }

    pub(crate) fn accelerator(self) -> &'static str {
        match self {
            MenuAction::Reload => "CmdOrCtrl+R",
            MenuAction::ToggleDevtools => "Alt+CmdOrCtrl+I",
            MenuAction::ActualSize => "CmdOrCtrl+0",
            MenuAction::ZoomIn => "CmdOrCtrl+=",
            MenuAction::ZoomOut => "CmdOrCtrl+-",
        }
    }
}

/// Zoom factor after applying `action` to `current`, or `None` if the action
/// does not change zoom. Steps snap to tenths and stay within
/// [`MIN_ZOOM`, `MAX_ZOOM`].
pub fn next_zoom(current: f64, action: MenuAction) -> Option<f64> {
    let target = match action {
        MenuAction::ActualSize => return Some(DEFAULT_ZOOM),
        MenuAction::ZoomIn => current + ZOOM_STEP,
        MenuAction::ZoomOut => current - ZOOM_STEP,
        _ => return None,
    };

    Some(((target * 10.0).round() / 10.0).clamp(MIN_ZOOM, MAX_ZOOM))
}

/// Current zoom factor of the main window. The webview has no getter, so the
/// shell keeps its own copy.
#[derive(Debug)]
pub struct ZoomState(Mutex<f64>);

impl ZoomState {
    pub fn get(&self) -> f64 {
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set(&self, zoom: f64) {
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = zoom;
    }
}

impl Default for ZoomState {
    fn default() -> Self {
        Self(Mutex::new(DEFAULT_ZOOM))
    }
}

/// Build the menu bar: app, Edit, View and Window submenus.
pub fn build_menu<R: Runtime>(app: &AppHandle<R>) -> tauri::Result<Menu<R>> {
    let item = |action: MenuAction| {
        MenuItem::with_id(
            app,
            action.id(),
            action.label(),
            true,
            Some(action.accelerator()),
        )
    };

    let app_menu = Submenu::with_items(
        app,
        APP_MENU_TITLE,
        true,
        &[
            &PredefinedMenuItem::about(app, None, None)?,
            &PredefinedMenuItem::separator(app)?,
            &PredefinedMenuItem::hide(app, None)?,
            &PredefinedMenuItem::hide_others(app, None)?,
            &PredefinedMenuItem::show_all(app, None)?,
            &PredefinedMenuItem::separator(app)?,
            &PredefinedMenuItem::quit(app, None)?,
        ],
    )?;

    let edit_menu = Submenu::with_items(
        app,
        "Edit",
        true,
        &[
            &PredefinedMenuItem::undo(app, None)?,
            &PredefinedMenuItem::redo(app, None)?,
            &PredefinedMenuItem::separator(app)?,
            &PredefinedMenuItem::cut(app, None)?,
            &PredefinedMenuItem::copy(app, None)?,
            &PredefinedMenuItem::paste(app, None)?,
            &PredefinedMenuItem::select_all(app, None)?,
        ],
    )?;

    let view_menu = Submenu::with_items(
        app,
        "View",
        true,
        &[
            &item(MenuAction::Reload)?,
            &item(MenuAction::ToggleDevtools)?,
            &PredefinedMenuItem::separator(app)?,
            &item(MenuAction::ActualSize)?,
            &item(MenuAction::ZoomIn)?,
            &item(MenuAction::ZoomOut)?,
            &PredefinedMenuItem::separator(app)?,
            &PredefinedMenuItem::fullscreen(app, None)?,
        ],
    )?;

    let window_menu = Submenu::with_items(
        app,
        "Window",
        true,
        &[
            &PredefinedMenuItem::minimize(app, None)?,
            &PredefinedMenuItem::maximize(app, None)?,
            &PredefinedMenuItem::separator(app)?,
            &PredefinedMenuItem::close_window(app, None)?,
        ],
    )?;

    Menu::with_items(app, &[&app_menu, &edit_menu, &view_menu, &window_menu])
}

/// Dispatch a custom View item to the focused window.
pub fn handle_menu_event<R: Runtime>(app: &AppHandle<R>, event: MenuEvent) {
    let Some(action) = MenuAction::from_id(event.id().as_ref()) else {
        return;
    };
    let Some(window) = target_window(app) else {
        debug!("Menu action {action:?} with no window open");
        return;
    };

    let result = match action {
        MenuAction::Reload => window.reload(),
        MenuAction::ToggleDevtools => {
            if window.is_devtools_open() {
                window.close_devtools();
            } else {
                window.open_devtools();
            }
            Ok(())
        }
        MenuAction::ActualSize | MenuAction::ZoomIn | MenuAction::ZoomOut => {
            apply_zoom(app, &window, action)
        }
    };

    if let Err(e) = result {
        warn!("Menu action {action:?} failed: {e}");
    }
}

fn apply_zoom<R: Runtime>(
    app: &AppHandle<R>,
    window: &WebviewWindow<R>,
    action: MenuAction,
) -> tauri::Result<()> {
    let Some(zoom_state) = app.try_state::<ZoomState>() else {
        return Ok(());
    };
    let Some(zoom) = next_zoom(zoom_state.get(), action) else {
        return Ok(());
    };

    window.set_zoom(zoom)?;
    zoom_state.set(zoom);
    debug!("Zoom set to {zoom}");
    Ok(())
}

fn target_window<R: Runtime>(app: &AppHandle<R>) -> Option<WebviewWindow<R>> {
    app.webview_windows()
        .into_values()
        .find(|window| window.is_focused().unwrap_or(false))
        .or_else(|| app.get_webview_window(MAIN_WINDOW_LABEL))
}
