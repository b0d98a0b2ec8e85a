use crate::error::OverwatchError;
use crate::state::AppState;

use server_core::content_url;

use common::ErrorLocation;

use log::{debug, error, info, warn};
use tauri::webview::NewWindowResponse;
use tauri::window::Color;
use tauri::{AppHandle, Manager, Runtime, WebviewUrl, WebviewWindow, WebviewWindowBuilder};
use tauri_plugin_opener::OpenerExt;
use url::Url;

pub const MAIN_WINDOW_LABEL: &str = "main";
pub const WINDOW_TITLE: &str = "OVERWATCH";

pub const WINDOW_WIDTH: f64 = 1440.0;
pub const WINDOW_HEIGHT: f64 = 900.0;
pub const MIN_WINDOW_WIDTH: f64 = 1024.0;
pub const MIN_WINDOW_HEIGHT: f64 = 680.0;

/// `#0a0e17`, shown before the first paint.
pub const BACKGROUND: Color = Color(0x0a, 0x0e, 0x17, 0xff);

#[cfg(target_os = "macos")]
const TRAFFIC_LIGHT_INSET: f64 = 16.0;

/// Schemes the shell hands to the system instead of the webview.
const EXTERNAL_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

/// Create the main window pointed at the local server on `port`.
///
/// The page gets no access to the host: no global Tauri object and no
/// capabilities are granted to remote URLs. Pop-ups are denied and their
/// target is opened in the default browser.
///
/// # Errors
///
/// Returns [`OverwatchError::Window`] if the URL is malformed or the toolkit
/// fails to build the window.
#[track_caller]
pub fn create_main_window<R: Runtime>(
    app: &AppHandle<R>,
    port: u16,
) -> Result<WebviewWindow<R>, OverwatchError> {
    let location = ErrorLocation::caller();
    let url = content_url(port);
    let parsed: Url = url.parse().map_err(|e| OverwatchError::Window {
        message: format!("Invalid content URL {url}: {e}"),
        location,
    })?;

    let opener = app.clone();
    let builder = WebviewWindowBuilder::new(app, MAIN_WINDOW_LABEL, WebviewUrl::External(parsed))
        .title(WINDOW_TITLE)
        .inner_size(WINDOW_WIDTH, WINDOW_HEIGHT)
        .min_inner_size(MIN_WINDOW_WIDTH, MIN_WINDOW_HEIGHT)
        .background_color(BACKGROUND)
        .on_new_window(move |url, _features| {
            open_external(&opener, &url);
            NewWindowResponse::Deny
        });

    #[cfg(target_os = "macos")]
    let builder = builder
        .hidden_title(true)
        .title_bar_style(tauri::TitleBarStyle::Overlay)
        .traffic_light_position(tauri::LogicalPosition::new(
            TRAFFIC_LIGHT_INSET,
            TRAFFIC_LIGHT_INSET,
        ));

    let window = builder.build().map_err(|e| OverwatchError::Window {
        message: format!("Failed to create main window: {e}"),
        location,
    })?;

    info!("Main window opened at {url}");
    Ok(window)
}

/// Whether `url` may be handed to the system opener.
pub fn is_external_openable(url: &Url) -> bool {
    EXTERNAL_SCHEMES.contains(&url.scheme())
}

fn open_external<R: Runtime>(app: &AppHandle<R>, url: &Url) {
    if !is_external_openable(url) {
        warn!("Blocked new-window request for {url}");
        return;
    }

    debug!("Opening {url} in the default browser");
    if let Err(e) = app.opener().open_url(url.as_str(), None::<&str>) {
        error!("Failed to open {url} externally: {e}");
    }
}

/// Re-activation (dock click): show the existing window, or recreate it if
/// every window was closed while the server kept running.
pub fn reopen<R: Runtime>(app: &AppHandle<R>) {
    if let Some(window) = app.get_webview_window(MAIN_WINDOW_LABEL) {
        let _ = window.show();
        let _ = window.set_focus();
        return;
    }

    if !app.webview_windows().is_empty() {
        return;
    }

    let Some(state) = app.try_state::<AppState>() else {
        return;
    };
    let (true, Some(port)) = (state.is_running(), state.port()) else {
        debug!("Reopen before the server is ready, ignoring");
        return;
    };

    if let Err(e) = create_main_window(app, port) {
        error!("{e}");
    }
}
