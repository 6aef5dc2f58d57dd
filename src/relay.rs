use tauri::{AppHandle, Manager};

use crate::{
    bridge::{parse_bridge_message, BridgeMessage},
    core::{debug_log, truncate_message},
    notifications, settings::read_settings, BASE_WINDOW_TITLE, MAIN_WINDOW_LABEL,
};

/// Entry point for everything the embedded page emits. Input is untrusted;
/// nothing on this path may return an error or panic.
pub(crate) fn handle_bridge_event(app: &AppHandle, payload: &str) {
    let Some(message) = parse_bridge_message(payload) else {
        debug_log(&format!(
            "bridge payload dropped: {}",
            truncate_message(payload, 140)
        ));
        return;
    };

    match message {
        BridgeMessage::Notification { title, body } => relay_notification(app, &title, &body),
        BridgeMessage::UnreadCount { count } => relay_unread_count(app, count),
        // Unknown kinds are ignored on purpose; the page is not trusted to
        // grow new capabilities by inventing message types.
        BridgeMessage::Unknown => {}
    }
}

fn relay_notification(app: &AppHandle, title: &str, body: &str) {
    let settings = match read_settings(app) {
        Ok(settings) => settings,
        Err(error) => {
            debug_log(&format!("failed to read settings for notification: {error}"));
            return;
        }
    };

    if !settings.notifications_enabled {
        return;
    }

    notifications::deliver(app, title, body, settings.notification_sound);
}

fn relay_unread_count(app: &AppHandle, count: u32) {
    let Some(window) = app.get_webview_window(MAIN_WINDOW_LABEL) else {
        return;
    };

    let current_title = window.title().unwrap_or_else(|_| BASE_WINDOW_TITLE.to_string());
    if let Some(next_title) = retitle_for_count(&current_title, count) {
        debug_log(&format!("unread badge: {count}"));
        let _ = window.set_title(&next_title);
    }
}

/// Extracts the first parenthesized decimal group, the same convention the
/// injected script applies to the page title. Anything non-numeric counts
/// as zero unread.
pub(crate) fn unread_count_from_title(title: &str) -> u32 {
    let mut rest = title;
    while let Some(open) = rest.find('(') {
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find(')') else {
            return 0;
        };
        let inner = &after_open[..close];
        if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(count) = inner.parse::<u32>() {
                return count;
            }
        }
        rest = &after_open[close + 1..];
    }
    0
}

pub(crate) fn decorated_title(count: u32) -> String {
    if count == 0 {
        BASE_WINDOW_TITLE.to_string()
    } else {
        format!("{BASE_WINDOW_TITLE} ({count})")
    }
}

/// The window title itself is the badge state: deriving the current count
/// from it makes duplicate unread messages a natural no-op.
pub(crate) fn retitle_for_count(current_title: &str, count: u32) -> Option<String> {
    if unread_count_from_title(current_title) == count {
        return None;
    }
    Some(decorated_title(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_with_count_parses() {
        assert_eq!(unread_count_from_title("Mattermost (12)"), 12);
    }

    #[test]
    fn bare_title_parses_to_zero() {
        assert_eq!(unread_count_from_title("Mattermost"), 0);
    }

    #[test]
    fn non_numeric_brackets_parse_to_zero() {
        assert_eq!(unread_count_from_title("Mattermost (x)"), 0);
        assert_eq!(unread_count_from_title("Mattermost ()"), 0);
        assert_eq!(unread_count_from_title("Mattermost ("), 0);
    }

    #[test]
    fn first_numeric_group_wins() {
        assert_eq!(unread_count_from_title("(beta) Mattermost (3) (9)"), 3);
    }

    #[test]
    fn decorated_title_follows_badge_convention() {
        assert_eq!(decorated_title(0), "Mattermost");
        assert_eq!(decorated_title(7), "Mattermost (7)");
    }

    #[test]
    fn duplicate_count_is_a_no_op() {
        assert_eq!(retitle_for_count("Mattermost (5)", 5), None);
        assert_eq!(retitle_for_count("Mattermost", 0), None);
    }

    #[test]
    fn changed_count_produces_one_update() {
        assert_eq!(
            retitle_for_count("Mattermost (5)", 6),
            Some("Mattermost (6)".to_string())
        );
        assert_eq!(
            retitle_for_count("Mattermost (5)", 0),
            Some("Mattermost".to_string())
        );
        assert_eq!(
            retitle_for_count("Mattermost", 2),
            Some("Mattermost (2)".to_string())
        );
    }
}
