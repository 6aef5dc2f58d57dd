use std::sync::atomic::Ordering;
use tauri::image::Image;
use tauri::{AppHandle, Emitter, Manager, WindowEvent};

use crate::{
    settings::read_settings, theme, AppState, MAIN_WINDOW_LABEL, SHELL_WINDOW_LABEL,
};

pub(crate) fn show_main_window(app: &AppHandle) {
    if let Some(window) = app.get_webview_window(MAIN_WINDOW_LABEL) {
        let _ = window.show();
        let _ = window.unminimize();
        let _ = window.set_focus();
    }
    refresh_tray_menu_labels(app);
}

pub(crate) fn toggle_main_window(app: &AppHandle) {
    if let Some(window) = app.get_webview_window(MAIN_WINDOW_LABEL) {
        if window.is_visible().unwrap_or(false) {
            let _ = window.hide();
            refresh_tray_menu_labels(app);
        } else {
            show_main_window(app);
        }
    }
}

pub(crate) fn main_window_visible(app: &AppHandle) -> bool {
    app.get_webview_window(MAIN_WINDOW_LABEL)
        .map(|window| window.is_visible().unwrap_or(false))
        .unwrap_or(false)
}

pub(crate) fn show_shell_window(app: &AppHandle) {
    if let Some(window) = app.get_webview_window(SHELL_WINDOW_LABEL) {
        let _ = window.show();
        let _ = window.unminimize();
        let _ = window.set_focus();
    }
}

/// Tray → Settings: surface the shell window already switched to its
/// settings view.
pub(crate) fn open_settings(app: &AppHandle) {
    show_shell_window(app);
    if let Some(window) = app.get_webview_window(SHELL_WINDOW_LABEL) {
        let _ = window.emit("navigate-to-settings", ());
    }
}

/// The Show/Hide entry tracks actual visibility so the menu never lies
/// about what a click will do.
pub(crate) fn refresh_tray_menu_labels(app: &AppHandle) {
    let label = if main_window_visible(app) { "Hide" } else { "Show" };
    if let Some(state) = app.try_state::<AppState>() {
        if let Ok(menu) = state.tray_menu.lock() {
            if let Some(menu) = menu.as_ref() {
                let _ = menu.toggle_item.set_text(label);
            }
        }
    }
}

/// A close request becomes a hide when the user asked to keep the app in
/// the tray and nothing is actually quitting.
pub(crate) fn should_intercept_close(is_quitting: bool, minimize_to_tray: bool) -> bool {
    !is_quitting && minimize_to_tray
}

pub(crate) fn handle_window_event(window: &tauri::Window, event: &WindowEvent) {
    let app = window.app_handle();

    if window.label() == MAIN_WINDOW_LABEL {
        match event {
            WindowEvent::CloseRequested { api, .. } => {
                let is_quitting = app
                    .try_state::<AppState>()
                    .map(|state| state.is_quitting.load(Ordering::SeqCst))
                    .unwrap_or(false);
                let minimize_to_tray = read_settings(app)
                    .map(|settings| settings.minimize_to_tray)
                    .unwrap_or(true);

                if should_intercept_close(is_quitting, minimize_to_tray) {
                    api.prevent_close();
                    let _ = window.hide();
                    refresh_tray_menu_labels(app);
                } else {
                    // Closing the last real window ends the app, tray included.
                    crate::quit(app);
                }
            }
            WindowEvent::Focused(true) => {
                theme::check_taskbar_theme_changed(app);
            }
            WindowEvent::ThemeChanged(os_theme) => {
                theme::handle_os_theme_changed(app, *os_theme);
            }
            _ => {}
        }
        return;
    }

    if window.label() == SHELL_WINDOW_LABEL {
        if let WindowEvent::CloseRequested { api, .. } = event {
            api.prevent_close();
            let _ = window.hide();
        }
    }
}

pub(crate) fn tray_icon_for_brightness(taskbar_dark: bool) -> Option<Image<'static>> {
    let bytes = if taskbar_dark {
        include_bytes!("../icons/tray-dark.png").as_slice()
    } else {
        include_bytes!("../icons/tray-light.png").as_slice()
    };
    Image::from_bytes(bytes).ok().map(|icon| icon.to_owned())
}

pub(crate) fn window_icon() -> Option<Image<'static>> {
    Image::from_bytes(include_bytes!("../icons/icon.png").as_slice())
        .ok()
        .map(|icon| icon.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_is_intercepted_only_when_tray_minimize_is_on_and_not_quitting() {
        assert!(should_intercept_close(false, true));
        assert!(!should_intercept_close(true, true));
        assert!(!should_intercept_close(false, false));
        assert!(!should_intercept_close(true, false));
    }
}
