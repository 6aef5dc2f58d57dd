use std::{sync::atomic::Ordering, time::Duration};
use tauri::{AppHandle, Emitter, Manager};

use crate::{
    core::debug_log, ui_shell, AppState, LOAD_PROBE_TIMEOUT_SECS, MAIN_WINDOW_LABEL,
    SHELL_WINDOW_LABEL,
};

/// Points the main window at the configured server and starts a fresh load
/// probe. Bumping the epoch first retires any probe still in flight for the
/// previous navigation.
pub(crate) fn navigate_to_server(app: &AppHandle, server_url: &str) -> Result<(), String> {
    let url = tauri::Url::parse(server_url)
        .map_err(|error| format!("Invalid server URL: {error}"))?;

    let mut window = app
        .get_webview_window(MAIN_WINDOW_LABEL)
        .ok_or_else(|| "Main window is not available".to_string())?;

    let epoch = bump_load_epoch(app);
    debug_log(&format!("navigate_to_server: {server_url} (epoch {epoch})"));
    window
        .navigate(url)
        .map_err(|error| format!("Failed to navigate to server: {error}"))?;

    spawn_load_probe(app.clone(), server_url.to_string(), epoch);
    Ok(())
}

pub(crate) fn bump_load_epoch(app: &AppHandle) -> u64 {
    let state = app.state::<AppState>();
    state.load_epoch.fetch_add(1, Ordering::SeqCst) + 1
}

pub(crate) fn current_load_epoch(app: &AppHandle) -> u64 {
    let state = app.state::<AppState>();
    state.load_epoch.load(Ordering::SeqCst)
}

/// A probe whose navigation was superseded is an aborted load; only a probe
/// for the navigation the window still shows may surface its failure.
pub(crate) fn probe_outcome_is_current(probe_epoch: u64, current_epoch: u64) -> bool {
    probe_epoch == current_epoch
}

/// The embedded engine gives the host no load-failure callback, so reach the
/// server out of band. Any HTTP answer means the page had something to
/// render; only transport failures surface a retryable error.
fn spawn_load_probe(app: AppHandle, server_url: String, epoch: u64) {
    tauri::async_runtime::spawn(async move {
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(LOAD_PROBE_TIMEOUT_SECS))
            .build()
        {
            Ok(client) => client,
            Err(error) => {
                debug_log(&format!("load probe: failed to build HTTP client: {error}"));
                return;
            }
        };

        let result = client.get(&server_url).send().await;

        if !probe_outcome_is_current(epoch, current_load_epoch(&app)) {
            debug_log(&format!("load probe for epoch {epoch} aborted, dropping"));
            return;
        }

        if let Err(error) = result {
            debug_log(&format!("load probe failed: {error}"));
            report_load_failure(&app, &format!("Failed to load: {error}"));
        }
    });
}

fn report_load_failure(app: &AppHandle, description: &str) {
    let _ = app.emit("page-load-failed", description);
    if let Some(window) = app.get_webview_window(SHELL_WINDOW_LABEL) {
        let _ = window.emit("page-load-failed", description);
    }
    ui_shell::show_shell_window(app);
}

/// Only pages from the configured server get the bridge; anything the user
/// navigated away to stays uninstrumented.
pub(crate) fn should_inject_bridge(server_url: &str, page_url: &tauri::Url) -> bool {
    let Ok(server) = tauri::Url::parse(server_url) else {
        return false;
    };
    server.host_str().is_some()
        && server.host_str() == page_url.host_str()
        && server.port_or_known_default() == page_url.port_or_known_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_probe_is_dropped() {
        assert!(!probe_outcome_is_current(1, 2));
        assert!(probe_outcome_is_current(2, 2));
    }

    #[test]
    fn bridge_injects_only_for_the_configured_host() {
        let page = tauri::Url::parse("https://chat.example.com/team/channel").unwrap();
        assert!(should_inject_bridge("https://chat.example.com", &page));

        let elsewhere = tauri::Url::parse("https://docs.example.com/page").unwrap();
        assert!(!should_inject_bridge("https://chat.example.com", &elsewhere));
    }

    #[test]
    fn bridge_injection_respects_ports() {
        let page = tauri::Url::parse("http://localhost:8065/login").unwrap();
        assert!(should_inject_bridge("http://localhost:8065", &page));
        assert!(!should_inject_bridge("http://localhost:9005", &page));
    }

    #[test]
    fn unconfigured_server_never_injects() {
        let page = tauri::Url::parse("https://chat.example.com").unwrap();
        assert!(!should_inject_bridge("", &page));
    }
}
