use serde::Serialize;
use tauri::{AppHandle, Emitter, Manager};
use tauri_plugin_updater::UpdaterExt;

use crate::{core::debug_log, AppState, SHELL_WINDOW_LABEL};

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum UpdatePhase {
    #[default]
    Idle,
    Checking,
    Available,
    Downloading,
    Downloaded,
    UpToDate,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpdateFlowEvent {
    CheckStarted,
    UpdateFound,
    NoUpdate,
    Failed,
    DownloadStarted,
    DownloadFinished,
}

/// The whole update lifecycle as one explicit machine. Events that make no
/// sense in the current phase are ignored and leave the phase unchanged, so
/// a stray callback can never walk the flow backwards.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct UpdateFlow {
    phase: UpdatePhase,
}

impl UpdateFlow {
    pub(crate) fn phase(&self) -> UpdatePhase {
        self.phase
    }

    pub(crate) fn apply(&mut self, event: UpdateFlowEvent) -> UpdatePhase {
        use UpdateFlowEvent::*;
        use UpdatePhase::*;

        self.phase = match (self.phase, event) {
            (Idle | UpToDate | Error | Available, CheckStarted) => Checking,
            (Checking, UpdateFound) => Available,
            (Checking, NoUpdate) => UpToDate,
            (Checking, Failed) => Error,
            (Available, DownloadStarted) => Downloading,
            (Downloading, DownloadFinished) => Downloaded,
            (Downloading, Failed) => Error,
            (current, _) => current,
        };
        self.phase
    }
}

/// Collapses updater errors into the three user-facing categories; the raw
/// text stays in the debug log only.
pub(crate) fn categorize_update_error(raw: &str) -> String {
    if raw.contains("Unable to find latest version") {
        "No releases found. Make sure a published release exists on GitHub.".to_string()
    } else if raw.contains("net::") {
        "Network error. Please check your internet connection.".to_string()
    } else {
        "Could not check for updates".to_string()
    }
}

#[derive(Debug, Serialize, Clone)]
pub(crate) struct UpdateInfo {
    pub(crate) version: String,
    pub(crate) body: Option<String>,
}

fn apply_flow_event(app: &AppHandle, event: UpdateFlowEvent) -> UpdatePhase {
    let state = app.state::<AppState>();
    let phase = match state.update_flow.lock() {
        Ok(mut flow) => flow.apply(event),
        Err(_) => return UpdatePhase::Error,
    };
    emit_to_shell(app, "update-state", &phase);
    phase
}

pub(crate) fn current_phase(app: &AppHandle) -> UpdatePhase {
    let state = app.state::<AppState>();
    state
        .update_flow
        .lock()
        .map(|flow| flow.phase())
        .unwrap_or(UpdatePhase::Error)
}

fn emit_to_shell<P: Serialize + Clone>(app: &AppHandle, event: &str, payload: &P) {
    let _ = app.emit(event, payload.clone());
    if let Some(window) = app.get_webview_window(SHELL_WINDOW_LABEL) {
        let _ = window.emit(event, payload.clone());
    }
}

/// One check pass against the release channel. Automatic checks keep their
/// failures in the log; only user-triggered checks surface an error event.
pub(crate) async fn run_update_check(app: AppHandle, surface_errors: bool) {
    match current_phase(&app) {
        UpdatePhase::Checking | UpdatePhase::Downloading | UpdatePhase::Downloaded => {
            debug_log("update check skipped: flow already past checking");
            return;
        }
        _ => {}
    }
    apply_flow_event(&app, UpdateFlowEvent::CheckStarted);

    let updater = match app.updater() {
        Ok(updater) => updater,
        Err(error) => {
            apply_flow_event(&app, UpdateFlowEvent::Failed);
            fail_check(&app, &error.to_string(), surface_errors);
            return;
        }
    };

    match updater.check().await {
        Ok(Some(update)) => {
            let info = UpdateInfo {
                version: update.version.clone(),
                body: update.body.clone(),
            };
            let state = app.state::<AppState>();
            if let Ok(mut pending) = state.pending_update.lock() {
                *pending = Some(update);
            }
            apply_flow_event(&app, UpdateFlowEvent::UpdateFound);
            debug_log(&format!("update available: {}", info.version));
            emit_to_shell(&app, "update-available", &info);
        }
        Ok(None) => {
            apply_flow_event(&app, UpdateFlowEvent::NoUpdate);
            emit_to_shell(&app, "update-not-available", &());
        }
        Err(error) => {
            apply_flow_event(&app, UpdateFlowEvent::Failed);
            fail_check(&app, &error.to_string(), surface_errors);
        }
    }
}

fn fail_check(app: &AppHandle, raw_error: &str, surface_errors: bool) {
    debug_log(&format!("update check failed: {raw_error}"));
    if surface_errors {
        emit_to_shell(app, "update-error", &categorize_update_error(raw_error));
    }
}

/// Downloads the pending update. Never called automatically; the shell asks
/// for it once the user accepts the available version.
pub(crate) async fn run_update_download(app: AppHandle) -> Result<(), String> {
    let update = {
        let state = app.state::<AppState>();
        let pending = state
            .pending_update
            .lock()
            .map_err(|_| "Pending update lock poisoned".to_string())?;
        pending.clone().ok_or_else(|| "No update available to download".to_string())?
    };

    if current_phase(&app) != UpdatePhase::Available {
        return Err("No update available to download".to_string());
    }
    apply_flow_event(&app, UpdateFlowEvent::DownloadStarted);

    let bytes = update
        .download(|_chunk, _total| {}, || {})
        .await
        .map_err(|error| {
            apply_flow_event(&app, UpdateFlowEvent::Failed);
            let raw = error.to_string();
            debug_log(&format!("update download failed: {raw}"));
            emit_to_shell(&app, "update-error", &categorize_update_error(&raw));
            format!("Failed to download update: {raw}")
        })?;

    {
        let state = app.state::<AppState>();
        let mut downloaded = state
            .downloaded_update
            .lock()
            .map_err(|_| "Downloaded update lock poisoned".to_string())?;
        *downloaded = Some(bytes);
    }

    apply_flow_event(&app, UpdateFlowEvent::DownloadFinished);
    let info = UpdateInfo {
        version: update.version.clone(),
        body: update.body.clone(),
    };
    debug_log(&format!("update downloaded: {}", info.version));
    emit_to_shell(&app, "update-downloaded", &info);
    Ok(())
}

/// Installs the downloaded update and restarts. This is one of the two
/// sanctioned ways the process terminates.
pub(crate) fn run_update_install(app: &AppHandle) -> Result<(), String> {
    if current_phase(app) != UpdatePhase::Downloaded {
        return Err("No downloaded update to install".to_string());
    }

    let (update, bytes) = {
        let state = app.state::<AppState>();
        let update = state
            .pending_update
            .lock()
            .map_err(|_| "Pending update lock poisoned".to_string())?
            .clone()
            .ok_or_else(|| "No downloaded update to install".to_string())?;
        let bytes = state
            .downloaded_update
            .lock()
            .map_err(|_| "Downloaded update lock poisoned".to_string())?
            .take()
            .ok_or_else(|| "No downloaded update to install".to_string())?;
        (update, bytes)
    };

    let state = app.state::<AppState>();
    state
        .is_quitting
        .store(true, std::sync::atomic::Ordering::SeqCst);

    update
        .install(bytes)
        .map_err(|error| format!("Failed to install update: {error}"))?;
    debug_log("update installed, restarting");
    app.restart();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_walks_the_full_flow() {
        let mut flow = UpdateFlow::default();
        assert_eq!(flow.phase(), UpdatePhase::Idle);
        assert_eq!(flow.apply(UpdateFlowEvent::CheckStarted), UpdatePhase::Checking);
        assert_eq!(flow.apply(UpdateFlowEvent::UpdateFound), UpdatePhase::Available);
        assert_eq!(
            flow.apply(UpdateFlowEvent::DownloadStarted),
            UpdatePhase::Downloading
        );
        assert_eq!(
            flow.apply(UpdateFlowEvent::DownloadFinished),
            UpdatePhase::Downloaded
        );
    }

    #[test]
    fn check_resolves_to_up_to_date_or_error() {
        let mut flow = UpdateFlow::default();
        flow.apply(UpdateFlowEvent::CheckStarted);
        assert_eq!(flow.apply(UpdateFlowEvent::NoUpdate), UpdatePhase::UpToDate);

        let mut flow = UpdateFlow::default();
        flow.apply(UpdateFlowEvent::CheckStarted);
        assert_eq!(flow.apply(UpdateFlowEvent::Failed), UpdatePhase::Error);
    }

    #[test]
    fn terminal_phases_allow_rechecking() {
        for seed in [UpdateFlowEvent::NoUpdate, UpdateFlowEvent::Failed] {
            let mut flow = UpdateFlow::default();
            flow.apply(UpdateFlowEvent::CheckStarted);
            flow.apply(seed);
            assert_eq!(flow.apply(UpdateFlowEvent::CheckStarted), UpdatePhase::Checking);
        }
    }

    #[test]
    fn nonsense_events_leave_phase_unchanged() {
        let mut flow = UpdateFlow::default();
        assert_eq!(flow.apply(UpdateFlowEvent::DownloadStarted), UpdatePhase::Idle);
        assert_eq!(flow.apply(UpdateFlowEvent::DownloadFinished), UpdatePhase::Idle);
        assert_eq!(flow.apply(UpdateFlowEvent::UpdateFound), UpdatePhase::Idle);

        flow.apply(UpdateFlowEvent::CheckStarted);
        flow.apply(UpdateFlowEvent::UpdateFound);
        flow.apply(UpdateFlowEvent::DownloadStarted);
        flow.apply(UpdateFlowEvent::DownloadFinished);
        // Downloaded is terminal until the user installs.
        assert_eq!(flow.apply(UpdateFlowEvent::CheckStarted), UpdatePhase::Downloaded);
    }

    #[test]
    fn download_failure_is_an_error() {
        let mut flow = UpdateFlow::default();
        flow.apply(UpdateFlowEvent::CheckStarted);
        flow.apply(UpdateFlowEvent::UpdateFound);
        flow.apply(UpdateFlowEvent::DownloadStarted);
        assert_eq!(flow.apply(UpdateFlowEvent::Failed), UpdatePhase::Error);
    }

    #[test]
    fn error_text_maps_to_three_categories() {
        assert_eq!(
            categorize_update_error("HttpError: net::ERR_INTERNET_DISCONNECTED"),
            "Network error. Please check your internet connection."
        );
        assert_eq!(
            categorize_update_error("Unable to find latest version on GitHub"),
            "No releases found. Make sure a published release exists on GitHub."
        );
        assert_eq!(
            categorize_update_error("something exploded"),
            "Could not check for updates"
        );
    }
}
