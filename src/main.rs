#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod bridge;
mod consts;
mod core;
mod embedded;
mod notifications;
mod relay;
mod settings;
mod theme;
mod ui_shell;
mod updates;

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex,
    },
    time::Duration,
};

use tauri::menu::{Menu, MenuItem};
use tauri::tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent};
use tauri::{AppHandle, Listener, Manager, WebviewUrl, WebviewWindowBuilder};

pub(crate) use crate::consts::*;
use crate::core::debug_log;
use crate::settings::{read_settings, StoredSettings};
use crate::updates::{UpdateFlow, UpdatePhase};

#[derive(Clone)]
struct TrayMenuState {
    toggle_item: MenuItem<tauri::Wry>,
}

/// The single application session. Everything the event handlers mutate
/// lives here, managed by Tauri, instead of in module-level globals.
struct AppState {
    is_quitting: AtomicBool,
    /// Last observed taskbar brightness; skips redundant icon swaps.
    taskbar_dark: Mutex<Option<bool>>,
    /// Bumped on every navigation of the main window; stale load probes
    /// compare against it and drop their result.
    load_epoch: AtomicU64,
    update_flow: Mutex<UpdateFlow>,
    pending_update: Mutex<Option<tauri_plugin_updater::Update>>,
    downloaded_update: Mutex<Option<Vec<u8>>>,
    tray_menu: Mutex<Option<TrayMenuState>>,
}

impl AppState {
    fn new() -> Self {
        Self {
            is_quitting: AtomicBool::new(false),
            taskbar_dark: Mutex::new(None),
            load_epoch: AtomicU64::new(0),
            update_flow: Mutex::new(UpdateFlow::default()),
            pending_update: Mutex::new(None),
            downloaded_update: Mutex::new(None),
            tray_menu: Mutex::new(None),
        }
    }
}

/// Explicit quit: mark the session as quitting, take the tray icon down,
/// end the process.
pub(crate) fn quit(app: &AppHandle) {
    if let Some(state) = app.try_state::<AppState>() {
        state.is_quitting.store(true, Ordering::SeqCst);
    }
    if let Some(tray) = app.remove_tray_by_id(TRAY_ID) {
        drop(tray);
    }
    debug_log("quitting");
    app.exit(0);
}

#[tauri::command]
fn get_settings(app: AppHandle) -> Result<StoredSettings, String> {
    read_settings(&app)
}

#[tauri::command]
fn set_setting(app: AppHandle, key: String, value: serde_json::Value) -> Result<(), String> {
    let updated = settings::apply_setting(&app, &key, &value)?;
    if key == "theme" {
        theme::handle_theme_setting_changed(&app, updated.theme);
    }
    Ok(())
}

#[tauri::command]
fn clear_data(app: AppHandle) -> Result<(), String> {
    let defaults = settings::clear_settings(&app)?;
    theme::handle_theme_setting_changed(&app, defaults.theme);
    Ok(())
}

/// Validates, pings and persists a server URL, then points the main window
/// at it. Returns the normalized URL the shell should display.
#[tauri::command]
async fn connect_server(app: AppHandle, url: String) -> Result<String, String> {
    let normalized = settings::normalize_server_url(&url)?;
    settings::test_server_connection(&normalized).await?;

    settings::apply_setting(&app, "serverUrl", &serde_json::Value::String(normalized.clone()))?;
    embedded::navigate_to_server(&app, &normalized)?;
    ui_shell::show_main_window(&app);
    Ok(normalized)
}

/// Retry hook for the shell's load-failure view.
#[tauri::command]
fn reload_embedded_page(app: AppHandle) -> Result<(), String> {
    let settings = read_settings(&app)?;
    if settings.server_url.is_empty() {
        return Err("No server configured".to_string());
    }
    embedded::navigate_to_server(&app, &settings.server_url)
}

#[tauri::command]
fn get_system_theme(app: AppHandle) -> String {
    theme::system_theme(&app).as_str().to_string()
}

#[tauri::command]
fn get_effective_theme(app: AppHandle) -> Result<String, String> {
    let settings = read_settings(&app)?;
    let effective = theme::resolve_effective(settings.theme, theme::system_theme(&app));
    Ok(effective.as_str().to_string())
}

#[tauri::command]
async fn check_for_updates(app: AppHandle) -> Result<(), String> {
    updates::run_update_check(app, true).await;
    Ok(())
}

#[tauri::command]
async fn download_update(app: AppHandle) -> Result<(), String> {
    updates::run_update_download(app).await
}

#[tauri::command]
fn install_update(app: AppHandle) -> Result<(), String> {
    updates::run_update_install(&app)
}

#[tauri::command]
fn get_update_state(app: AppHandle) -> UpdatePhase {
    updates::current_phase(&app)
}

fn main() {
    debug_log("═══════════════════════════════════════");
    debug_log(&format!(
        "mattermost-desktop starting (pid={})",
        std::process::id()
    ));
    debug_log("═══════════════════════════════════════");
    tauri::Builder::default()
        .manage(AppState::new())
        .plugin(tauri_plugin_updater::Builder::new().build())
        .plugin(tauri_plugin_notification::init())
        .invoke_handler(tauri::generate_handler![
            get_settings,
            set_setting,
            clear_data,
            connect_server,
            reload_embedded_page,
            get_system_theme,
            get_effective_theme,
            check_for_updates,
            download_update,
            install_update,
            get_update_state
        ])
        .setup(|app| {
            debug_log("setup: starting");

            let startup_settings = read_settings(app.handle()).unwrap_or_default();
            debug_log(&format!(
                "setup: server_url={:?} theme={:?}",
                startup_settings.server_url, startup_settings.theme
            ));

            WebviewWindowBuilder::new(
                app,
                MAIN_WINDOW_LABEL,
                WebviewUrl::App("index.html".into()),
            )
            .title(BASE_WINDOW_TITLE)
            .inner_size(1200.0, 800.0)
            .min_inner_size(800.0, 600.0)
            .visible(true)
            .build()?;

            WebviewWindowBuilder::new(
                app,
                SHELL_WINDOW_LABEL,
                WebviewUrl::App("index.html".into()),
            )
            .title(format!("{BASE_WINDOW_TITLE} Settings"))
            .inner_size(520.0, 680.0)
            .min_inner_size(420.0, 480.0)
            .visible(false)
            .build()?;

            setup_tray(app)?;
            theme::update_taskbar_icons(app.handle());

            // Everything the embedded page says arrives here.
            let bridge_handle = app.handle().clone();
            app.listen(bridge::BRIDGE_EVENT, move |event| {
                relay::handle_bridge_event(&bridge_handle, event.payload());
            });

            if !startup_settings.server_url.is_empty() {
                if let Err(error) =
                    embedded::navigate_to_server(app.handle(), &startup_settings.server_url)
                {
                    debug_log(&format!("setup: failed to open server page: {error}"));
                }
            }

            // One automatic check shortly after the window first shows;
            // its failures stay in the log.
            let update_handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                tokio::time::sleep(Duration::from_secs(UPDATE_CHECK_STARTUP_DELAY_SECS)).await;
                updates::run_update_check(update_handle, false).await;
            });

            Ok(())
        })
        .on_page_load(|webview, payload| {
            let settings = read_settings(webview.app_handle()).unwrap_or_default();
            if webview.window().label() == MAIN_WINDOW_LABEL
                && embedded::should_inject_bridge(&settings.server_url, payload.url())
            {
                debug_log(&format!("injecting bridge into {}", payload.url()));
                if let Err(error) = webview.eval(bridge::BRIDGE_SCRIPT) {
                    debug_log(&format!("bridge injection failed: {error}"));
                }
            }
        })
        .on_window_event(|window, event| {
            ui_shell::handle_window_event(window, event);
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

fn setup_tray(app: &tauri::App) -> Result<(), Box<dyn std::error::Error>> {
    let toggle_item = MenuItem::with_id(app, "toggle_window", "Hide", true, None::<&str>)?;
    let settings_item = MenuItem::with_id(app, "open_settings", "Settings", true, None::<&str>)?;
    let quit_item = MenuItem::with_id(app, "quit", "Quit", true, None::<&str>)?;
    let menu = Menu::with_items(app, &[&toggle_item, &settings_item, &quit_item])?;

    let state = app.state::<AppState>();
    if let Ok(mut tray_menu) = state.tray_menu.lock() {
        *tray_menu = Some(TrayMenuState {
            toggle_item: toggle_item.clone(),
        });
    }

    let mut tray_builder = TrayIconBuilder::with_id(TRAY_ID)
        .menu(&menu)
        .show_menu_on_left_click(false)
        .tooltip(BASE_WINDOW_TITLE)
        .on_tray_icon_event(|tray, event| match event {
            TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } => {
                ui_shell::toggle_main_window(tray.app_handle());
            }
            TrayIconEvent::DoubleClick {
                button: MouseButton::Left,
                ..
            } => {
                ui_shell::show_main_window(tray.app_handle());
            }
            _ => {}
        })
        .on_menu_event(move |app, event| match event.id().as_ref() {
            "toggle_window" => {
                ui_shell::toggle_main_window(app);
            }
            "open_settings" => {
                ui_shell::open_settings(app);
            }
            "quit" => {
                quit(app);
            }
            _ => {}
        });
    if let Some(icon) = ui_shell::tray_icon_for_brightness(theme::sample_taskbar_dark())
        .or_else(|| app.default_window_icon().cloned())
    {
        tray_builder = tray_builder.icon(icon);
    }
    tray_builder.build(app)?;

    Ok(())
}
