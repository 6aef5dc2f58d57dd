use serde::Serialize;
use tauri::{AppHandle, Emitter, Manager};

use crate::{
    core::debug_log,
    settings::{read_settings, ThemePreference},
    ui_shell, AppState, MAIN_WINDOW_LABEL, SHELL_WINDOW_LABEL, TRAY_ID,
};

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ThemeKind {
    Light,
    Dark,
}

impl ThemeKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ThemeKind::Light => "light",
            ThemeKind::Dark => "dark",
        }
    }
}

/// `system` defers to the OS; explicit preferences win unconditionally.
pub(crate) fn resolve_effective(preference: ThemePreference, system: ThemeKind) -> ThemeKind {
    match preference {
        ThemePreference::System => system,
        ThemePreference::Light => ThemeKind::Light,
        ThemePreference::Dark => ThemeKind::Dark,
    }
}

pub(crate) fn theme_kind_of(theme: tauri::Theme) -> ThemeKind {
    match theme {
        tauri::Theme::Dark => ThemeKind::Dark,
        _ => ThemeKind::Light,
    }
}

pub(crate) fn system_theme(app: &AppHandle) -> ThemeKind {
    app.get_webview_window(MAIN_WINDOW_LABEL)
        .and_then(|window| window.theme().ok())
        .map(theme_kind_of)
        .unwrap_or(ThemeKind::Light)
}

/// Windows keeps the taskbar brightness separate from the app theme; read it
/// from the registry the same way the taskbar itself does. Everything else
/// reports a light taskbar.
#[cfg(target_os = "windows")]
pub(crate) fn sample_taskbar_dark() -> bool {
    use std::process::Command;

    let output = Command::new("reg")
        .args([
            "query",
            r"HKEY_CURRENT_USER\SOFTWARE\Microsoft\Windows\CurrentVersion\Themes\Personalize",
            "/v",
            "SystemUsesLightTheme",
        ])
        .output();

    match output {
        Ok(output) => taskbar_dark_from_query(&String::from_utf8_lossy(&output.stdout)),
        Err(error) => {
            debug_log(&format!("sample_taskbar_dark: registry query failed: {error}"));
            false
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub(crate) fn sample_taskbar_dark() -> bool {
    false
}

// SystemUsesLightTheme: 0x0 means the taskbar is dark.
pub(crate) fn taskbar_dark_from_query(output: &str) -> bool {
    output.contains("0x0")
}

/// Swaps tray and window icons to match the current taskbar brightness and
/// records the sample.
pub(crate) fn update_taskbar_icons(app: &AppHandle) {
    let dark = sample_taskbar_dark();

    if let Some(tray) = app.tray_by_id(TRAY_ID) {
        if let Some(icon) = ui_shell::tray_icon_for_brightness(dark) {
            let _ = tray.set_icon(Some(icon));
        }
    }
    if let Some(window) = app.get_webview_window(MAIN_WINDOW_LABEL) {
        if let Some(icon) = ui_shell::window_icon() {
            let _ = window.set_icon(icon);
        }
    }

    if let Some(state) = app.try_state::<AppState>() {
        if let Ok(mut cache) = state.taskbar_dark.lock() {
            *cache = Some(dark);
        }
    }
}

/// Focus-gain hook. The OS sends no notification for taskbar brightness
/// changes that happen while the window is unfocused, so re-sample and only
/// touch the icons when the value moved.
pub(crate) fn check_taskbar_theme_changed(app: &AppHandle) {
    let current = sample_taskbar_dark();
    let last = app
        .try_state::<AppState>()
        .and_then(|state| state.taskbar_dark.lock().ok().map(|cache| *cache))
        .unwrap_or(None);

    if last != Some(current) {
        debug_log(&format!("taskbar brightness changed: dark={current}"));
        update_taskbar_icons(app);
    }
}

pub(crate) fn handle_os_theme_changed(app: &AppHandle, theme: tauri::Theme) {
    let settings = match read_settings(app) {
        Ok(settings) => settings,
        Err(error) => {
            debug_log(&format!("failed to read settings for theme change: {error}"));
            return;
        }
    };

    if settings.theme != ThemePreference::System {
        return;
    }

    let kind = theme_kind_of(theme);
    debug_log(&format!("system theme changed: {}", kind.as_str()));
    update_taskbar_icons(app);
    let _ = app.emit("system-theme-changed", kind.as_str());
    if let Some(window) = app.get_webview_window(SHELL_WINDOW_LABEL) {
        let _ = window.emit("system-theme-changed", kind.as_str());
    }
}

/// Explicit preference change: propagate immediately, whatever the value.
pub(crate) fn handle_theme_setting_changed(app: &AppHandle, preference: ThemePreference) {
    update_taskbar_icons(app);
    let payload = serde_json::to_value(preference).unwrap_or(serde_json::Value::Null);
    let _ = app.emit("theme-changed", payload.clone());
    if let Some(window) = app.get_webview_window(SHELL_WINDOW_LABEL) {
        let _ = window.emit("theme-changed", payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_preference_follows_os() {
        assert_eq!(
            resolve_effective(ThemePreference::System, ThemeKind::Dark),
            ThemeKind::Dark
        );
        assert_eq!(
            resolve_effective(ThemePreference::System, ThemeKind::Light),
            ThemeKind::Light
        );
    }

    #[test]
    fn explicit_preference_ignores_os() {
        assert_eq!(
            resolve_effective(ThemePreference::Light, ThemeKind::Dark),
            ThemeKind::Light
        );
        assert_eq!(
            resolve_effective(ThemePreference::Dark, ThemeKind::Light),
            ThemeKind::Dark
        );
    }

    #[test]
    fn registry_output_parses_taskbar_brightness() {
        let dark = "    SystemUsesLightTheme    REG_DWORD    0x0";
        let light = "    SystemUsesLightTheme    REG_DWORD    0x1";
        assert!(taskbar_dark_from_query(dark));
        assert!(!taskbar_dark_from_query(light));
        assert!(!taskbar_dark_from_query(""));
    }
}
