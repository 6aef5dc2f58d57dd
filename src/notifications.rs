use tauri::AppHandle;

use crate::core::{debug_log, truncate_message};

/// Issues a native notification for a bridge-relayed page notification.
/// macOS goes through `mac-notification-sys` so the click response can pull
/// the window forward; elsewhere the notification plugin posts the toast.
pub(crate) fn deliver(app: &AppHandle, title: &str, body: &str, with_sound: bool) {
    debug_log(&format!(
        "notification relayed: {}",
        truncate_message(title, 60)
    ));

    #[cfg(target_os = "macos")]
    send_macos_notification(app.clone(), title.to_string(), body.to_string(), with_sound);

    #[cfg(not(target_os = "macos"))]
    send_plugin_notification(app, title, body, with_sound);
}

#[cfg(target_os = "macos")]
fn send_macos_notification(app: AppHandle, title: String, body: String, with_sound: bool) {
    use mac_notification_sys::{Notification, NotificationResponse};

    std::thread::spawn(move || {
        let message = truncate_message(&body, 220);

        let mut notification = Notification::new();
        notification
            .title(&title)
            .message(&message)
            .wait_for_click(true)
            .asynchronous(false);
        if with_sound {
            notification.default_sound();
        }

        match notification.send() {
            Ok(NotificationResponse::Click) | Ok(NotificationResponse::ActionButton(_)) => {
                crate::ui_shell::show_main_window(&app);
            }
            Ok(_) => {}
            Err(error) => {
                debug_log(&format!("failed to show macOS notification: {error}"));
            }
        }
    });
}

#[cfg(not(target_os = "macos"))]
fn send_plugin_notification(app: &AppHandle, title: &str, body: &str, with_sound: bool) {
    use tauri_plugin_notification::NotificationExt;

    let mut builder = app.notification().builder().title(title).body(body);
    if with_sound {
        builder = builder.sound("Default");
    }
    if let Err(error) = builder.show() {
        debug_log(&format!("failed to show notification: {error}"));
    }
}
