// Prevents additional console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use overwatch::error::OverwatchError;
use overwatch::lifecycle;
use overwatch::logger::initialize as LoggerInitialize;
use overwatch::menu::{self, ZoomState};
use overwatch::state::AppState;

use server_core::config::ShellConfig;

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;

use log::info;
use tauri::Manager;

fn main() {
    let app = tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .menu(menu::build_menu)
        .on_menu_event(menu::handle_menu_event)
        .setup(|app| {
            let log_dir = app
                .path()
                .app_log_dir()
                .map_err(|e| OverwatchError::Overwatch {
                    message: format!("Failed to get log directory: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            create_dir_all(&log_dir).map_err(|e| OverwatchError::Overwatch {
                message: format!("Failed to create log directory: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

            // Logger first so config loading is visible
            LoggerInitialize(&log_dir)?;

            info!("OVERWATCH starting");
            info!("Log directory: {}", log_dir.display());

            ShellConfig::load_dotenv();

            let config_dir = app
                .path()
                .app_config_dir()
                .map_err(|e| OverwatchError::Overwatch {
                    message: format!("Failed to get config directory: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            let mut config = ShellConfig::load_or_create(&config_dir);
            config.apply_env_overrides();

            let state = AppState::default();
            app.manage(state.clone());
            app.manage(ZoomState::default());
            app.manage(config.clone());

            tauri::async_runtime::spawn(lifecycle::start(app.handle().clone(), state, config));

            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while running tauri application");

    app.run(lifecycle::handle_run_event);
}
