use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};
use tauri::{AppHandle, Runtime};

use crate::{
    core::{debug_log, settings_file, truncate_message},
    CONNECTION_TEST_TIMEOUT_SECS,
};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ThemePreference {
    #[default]
    System,
    Light,
    Dark,
}

/// Settings file keys mirror the names the presentation layer uses, so the
/// generic `set_setting(key, value)` surface stays a flat five-key mapping.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct StoredSettings {
    pub(crate) server_url: String,
    pub(crate) theme: ThemePreference,
    pub(crate) notifications_enabled: bool,
    pub(crate) notification_sound: bool,
    pub(crate) minimize_to_tray: bool,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            theme: ThemePreference::System,
            notifications_enabled: true,
            notification_sound: true,
            minimize_to_tray: true,
        }
    }
}

pub(crate) fn read_settings<R: Runtime>(app: &AppHandle<R>) -> Result<StoredSettings, String> {
    read_settings_at(&settings_file(app)?)
}

pub(crate) fn read_settings_at(path: &Path) -> Result<StoredSettings, String> {
    if !path.exists() {
        return Ok(StoredSettings::default());
    }

    let content =
        fs::read_to_string(path).map_err(|error| format!("Failed to read settings: {error}"))?;
    serde_json::from_str::<StoredSettings>(&content)
        .map_err(|error| format!("Failed to parse settings: {error}"))
}

pub(crate) fn save_settings<R: Runtime>(
    app: &AppHandle<R>,
    settings: &StoredSettings,
) -> Result<(), String> {
    save_settings_at(&settings_file(app)?, settings)
}

pub(crate) fn save_settings_at(path: &Path, settings: &StoredSettings) -> Result<(), String> {
    let content = serde_json::to_string_pretty(settings)
        .map_err(|error| format!("Failed to serialize settings: {error}"))?;
    fs::write(path, content).map_err(|error| format!("Failed to write settings: {error}"))
}

/// Applies one key/value pair to the stored settings. Unknown keys and
/// mistyped values are rejected before anything is written.
pub(crate) fn apply_setting<R: Runtime>(
    app: &AppHandle<R>,
    key: &str,
    value: &serde_json::Value,
) -> Result<StoredSettings, String> {
    let path = settings_file(app)?;
    let mut settings = read_settings_at(&path).unwrap_or_default();
    apply_setting_value(&mut settings, key, value)?;
    save_settings_at(&path, &settings)?;
    debug_log(&format!(
        "apply_setting: {key}={}",
        truncate_message(&value.to_string(), 120)
    ));
    Ok(settings)
}

pub(crate) fn apply_setting_value(
    settings: &mut StoredSettings,
    key: &str,
    value: &serde_json::Value,
) -> Result<(), String> {
    match key {
        "serverUrl" => {
            settings.server_url = value
                .as_str()
                .ok_or_else(|| "serverUrl must be a string".to_string())?
                .to_string();
        }
        "theme" => {
            settings.theme = serde_json::from_value(value.clone())
                .map_err(|_| "theme must be one of system, light, dark".to_string())?;
        }
        "notificationsEnabled" => {
            settings.notifications_enabled = value
                .as_bool()
                .ok_or_else(|| "notificationsEnabled must be a boolean".to_string())?;
        }
        "notificationSound" => {
            settings.notification_sound = value
                .as_bool()
                .ok_or_else(|| "notificationSound must be a boolean".to_string())?;
        }
        "minimizeToTray" => {
            settings.minimize_to_tray = value
                .as_bool()
                .ok_or_else(|| "minimizeToTray must be a boolean".to_string())?;
        }
        _ => return Err(format!("Unknown setting key: {key}")),
    }
    Ok(())
}

pub(crate) fn clear_settings<R: Runtime>(app: &AppHandle<R>) -> Result<StoredSettings, String> {
    let defaults = StoredSettings::default();
    save_settings(app, &defaults)?;
    debug_log("clear_settings: reset to defaults");
    Ok(defaults)
}

pub(crate) fn normalize_server_url(input: &str) -> Result<String, String> {
    let mut normalized = input.trim().to_string();
    if normalized.is_empty() {
        return Err("Server URL is required".to_string());
    }

    let has_scheme = normalized
        .get(..7)
        .map_or(false, |p| p.eq_ignore_ascii_case("http://"))
        || normalized
            .get(..8)
            .map_or(false, |p| p.eq_ignore_ascii_case("https://"));
    if !has_scheme {
        normalized = format!("https://{normalized}");
    }

    let trimmed = normalized.trim_end_matches('/');

    let url =
        reqwest::Url::parse(trimmed).map_err(|error| format!("Invalid server URL: {error}"))?;

    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err("Server URL must start with http:// or https://".to_string());
    }

    Ok(trimmed.to_string())
}

/// Pings the Mattermost system endpoint before a server URL is accepted.
/// An HTTP error status rejects the URL; a transport failure does NOT —
/// the embedded page gets to make the final call, exactly like a browser
/// fetch that a CORS policy swallowed.
pub(crate) async fn test_server_connection(server_url: &str) -> Result<(), String> {
    let endpoint = format!("{server_url}/api/v4/system/ping");
    debug_log(&format!("test_server_connection: GET {endpoint}"));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(CONNECTION_TEST_TIMEOUT_SECS))
        .build()
        .map_err(|error| format!("Failed to build HTTP client: {error}"))?;

    match client.get(&endpoint).send().await {
        Ok(response) if response.status().is_success() => Ok(()),
        Ok(response) => Err(format!(
            "Could not connect to the Mattermost server (HTTP {}). Please check the URL.",
            response.status().as_u16()
        )),
        Err(error) => {
            debug_log(&format!(
                "test_server_connection: transport failure treated as valid: {error}"
            ));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let defaults = StoredSettings::default();
        assert_eq!(defaults.server_url, "");
        assert_eq!(defaults.theme, ThemePreference::System);
        assert!(defaults.notifications_enabled);
        assert!(defaults.notification_sound);
        assert!(defaults.minimize_to_tray);
    }

    #[test]
    fn read_settings_at_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = read_settings_at(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, StoredSettings::default());
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = StoredSettings::default();
        settings.server_url = "https://chat.example.com".to_string();
        settings.theme = ThemePreference::Dark;
        settings.minimize_to_tray = false;

        save_settings_at(&path, &settings).unwrap();
        assert_eq!(read_settings_at(&path).unwrap(), settings);
    }

    #[test]
    fn clear_then_read_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = StoredSettings::default();
        settings.server_url = "https://chat.example.com".to_string();
        settings.notifications_enabled = false;
        save_settings_at(&path, &settings).unwrap();

        save_settings_at(&path, &StoredSettings::default()).unwrap();
        assert_eq!(read_settings_at(&path).unwrap(), StoredSettings::default());
    }

    #[test]
    fn settings_file_keys_are_camel_case() {
        let json = serde_json::to_value(StoredSettings::default()).unwrap();
        let object = json.as_object().unwrap();
        for key in [
            "serverUrl",
            "theme",
            "notificationsEnabled",
            "notificationSound",
            "minimizeToTray",
        ] {
            assert!(object.contains_key(key), "missing key {key}");
        }
        assert_eq!(object.len(), 5);
    }

    #[test]
    fn apply_setting_value_updates_each_key() {
        let mut settings = StoredSettings::default();

        apply_setting_value(
            &mut settings,
            "serverUrl",
            &serde_json::json!("https://chat.example.com"),
        )
        .unwrap();
        apply_setting_value(&mut settings, "theme", &serde_json::json!("dark")).unwrap();
        apply_setting_value(
            &mut settings,
            "notificationsEnabled",
            &serde_json::json!(false),
        )
        .unwrap();
        apply_setting_value(&mut settings, "notificationSound", &serde_json::json!(false)).unwrap();
        apply_setting_value(&mut settings, "minimizeToTray", &serde_json::json!(false)).unwrap();

        assert_eq!(settings.server_url, "https://chat.example.com");
        assert_eq!(settings.theme, ThemePreference::Dark);
        assert!(!settings.notifications_enabled);
        assert!(!settings.notification_sound);
        assert!(!settings.minimize_to_tray);
    }

    #[test]
    fn apply_setting_value_rejects_unknown_key() {
        let mut settings = StoredSettings::default();
        let error =
            apply_setting_value(&mut settings, "fontSize", &serde_json::json!(12)).unwrap_err();
        assert!(error.contains("Unknown setting key"));
    }

    #[test]
    fn apply_setting_value_rejects_mistyped_value() {
        let mut settings = StoredSettings::default();
        assert!(apply_setting_value(&mut settings, "theme", &serde_json::json!("solarized")).is_err());
        assert!(
            apply_setting_value(&mut settings, "minimizeToTray", &serde_json::json!("yes")).is_err()
        );
        assert_eq!(settings, StoredSettings::default());
    }

    #[test]
    fn normalize_server_url_adds_scheme_and_strips_slash() {
        assert_eq!(
            normalize_server_url("chat.example.com/").unwrap(),
            "https://chat.example.com"
        );
        assert_eq!(
            normalize_server_url("  http://chat.example.com  ").unwrap(),
            "http://chat.example.com"
        );
    }

    #[test]
    fn normalize_server_url_rejects_empty_and_unparsable_input() {
        assert!(normalize_server_url("   ").is_err());
        assert!(normalize_server_url("chat example com").is_err());
    }
}
