#[cfg(debug_assertions)]
use std::io::Write as _;
use std::{fs, path::PathBuf};
use tauri::{AppHandle, Manager, Runtime};

pub(crate) fn settings_file<R: Runtime>(app: &AppHandle<R>) -> Result<PathBuf, String> {
    let config_dir = app
        .path()
        .app_config_dir()
        .map_err(|error| format!("Failed to resolve app config dir: {error}"))?;

    fs::create_dir_all(&config_dir)
        .map_err(|error| format!("Failed to create config directory: {error}"))?;

    Ok(config_dir.join("settings.json"))
}

pub(crate) fn truncate_message(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }

    let truncated: String = input.chars().take(max_chars).collect();
    format!("{truncated}...")
}

pub(crate) fn debug_log(message: &str) {
    #[cfg(not(debug_assertions))]
    let _ = message;
    #[cfg(debug_assertions)]
    {
        let ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let line = format!("[mattermost-desktop][{ts}] {message}\n");
        eprint!("{line}");
        if let Ok(mut file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("/tmp/mattermost-desktop.log")
        {
            let _ = file.write_all(line.as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_message_leaves_short_input_alone() {
        assert_eq!(truncate_message("hello", 10), "hello");
    }

    #[test]
    fn truncate_message_appends_ellipsis() {
        assert_eq!(truncate_message("hello world", 5), "hello...");
    }
}
