pub(crate) const TRAY_ID: &str = "main-tray";
pub(crate) const BASE_WINDOW_TITLE: &str = "Mattermost";

pub(crate) const MAIN_WINDOW_LABEL: &str = "main";
pub(crate) const SHELL_WINDOW_LABEL: &str = "shell";

pub(crate) const CONNECTION_TEST_TIMEOUT_SECS: u64 = 15;
pub(crate) const LOAD_PROBE_TIMEOUT_SECS: u64 = 20;
pub(crate) const UPDATE_CHECK_STARTUP_DELAY_SECS: u64 = 3;
