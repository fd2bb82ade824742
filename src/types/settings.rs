use serde::{Deserialize, Serialize};

/// Marker URL of the bundled start page. Never a real network resource.
pub const START_PAGE_URL: &str = "http://start/";

/// Host of [`START_PAGE_URL`]; exempt from the HTTPS upgrade.
pub const START_PAGE_HOST: &str = "start";

/// Top-level browser settings container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BrowserSettings {
    pub general: GeneralSettings,
    pub privacy: PrivacySettings,
    pub window: WindowSettings,
}

/// Start page and search settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralSettings {
    /// URL given to new tabs.
    pub new_tab_url: String,
    /// Prefix a percent-encoded query is appended to.
    pub search_url: String,
    /// Loaded when the bundled start page cannot be found.
    pub start_page_fallback_url: String,
    /// When false, a missing start page leaves the tab on `about:blank`.
    #[serde(default = "default_true")]
    pub start_page_fail_open: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            new_tab_url: START_PAGE_URL.to_string(),
            search_url: "https://duckduckgo.com/?q=".to_string(),
            start_page_fallback_url: "https://duckduckgo.com/".to_string(),
            start_page_fail_open: true,
        }
    }
}

/// Privacy toggles applied to every new view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrivacySettings {
    pub content_blocking: bool,
    pub canvas_protection: bool,
    pub https_upgrade: bool,
    pub ephemeral_storage: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            content_blocking: true,
            canvas_protection: true,
            https_upgrade: true,
            ephemeral_storage: true,
        }
    }
}

/// Main window geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            min_width: 1024,
            min_height: 768,
        }
    }
}

fn default_true() -> bool {
    true
}
