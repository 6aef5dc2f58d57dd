use serde::Deserialize;

/// Event channel the injected script emits on. The embedded origin is only
/// granted `core:event:allow-emit`, so this is the sole path from page to
/// host.
pub(crate) const BRIDGE_EVENT: &str = "mattermost-bridge";

/// Injected into the embedded page on every page load. Wraps the page's
/// `Notification` constructor and mirrors title mutations; the guard flag
/// keeps a second injection (page-load fires for start and finish) from
/// stacking observers. A reload tears the whole context down, so observers
/// never outlive their page.
pub(crate) const BRIDGE_SCRIPT: &str = r#"
(function () {
  if (window.__mattermostBridgeInstalled) {
    return;
  }
  window.__mattermostBridgeInstalled = true;

  var emit = function (payload) {
    if (window.__TAURI__ && window.__TAURI__.event) {
      window.__TAURI__.event.emit('mattermost-bridge', payload);
    }
  };

  var OriginalNotification = window.Notification;
  if (OriginalNotification) {
    window.Notification = function (title, options) {
      emit({
        type: 'notification',
        title: String(title),
        body: (options && options.body) || ''
      });
      return new OriginalNotification(title, options);
    };
    window.Notification.permission = OriginalNotification.permission;
    window.Notification.requestPermission =
      OriginalNotification.requestPermission.bind(OriginalNotification);
  }

  var reportUnread = function () {
    var match = document.title.match(/\((\d+)\)/);
    emit({
      type: 'unread-count',
      count: match ? parseInt(match[1], 10) : 0
    });
  };

  var observer = new MutationObserver(reportUnread);
  observer.observe(document.querySelector('title') || document.head, {
    subtree: true,
    characterData: true,
    childList: true
  });
  reportUnread();
})();
"#;

/// Everything the embedded page may say to the host. The discriminant is
/// explicit and unknown kinds land in their own arm instead of vanishing
/// inside a failed parse.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub(crate) enum BridgeMessage {
    Notification {
        title: String,
        #[serde(default)]
        body: String,
    },
    UnreadCount {
        count: u32,
    },
    #[serde(other)]
    Unknown,
}

/// Untrusted input: anything that does not parse is simply not a message.
pub(crate) fn parse_bridge_message(payload: &str) -> Option<BridgeMessage> {
    serde_json::from_str(payload).ok()
}
