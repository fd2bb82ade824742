//! Navigation Policy Interceptor for QuietBrowser.
//!
//! Decides what happens to each main-frame navigation and popup request a view
//! raises: plain HTTP is reissued over HTTPS, document loads matching a block
//! rule are cancelled, and popups become new tabs unless a popup rule matches
//! the opener.

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::services::content_filter::CompiledRules;
use crate::services::start_page::is_start_page;
use crate::types::rules::ResourceType;
use crate::types::settings::START_PAGE_HOST;

/// Outcome of a navigation-decision callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    /// Cancel the navigation and reissue it at the given URL.
    Upgrade(Url),
    Block,
}

/// Outcome of a new-window request. The engine itself never gets a view back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupDecision {
    OpenInNewTab(Url),
    /// A content rule matched the popup for its opener page.
    Block,
    Ignore,
}

/// Trait defining the navigation policy interface.
pub trait NavigationPolicyTrait {
    fn decide(&self, url: &Url) -> NavigationDecision;
    fn on_popup(&self, url: Option<&Url>, opener: Option<&Url>) -> PopupDecision;
    fn set_rules(&mut self, rules: Arc<CompiledRules>);
}

/// Policy shared by every view. Cheap to clone and `Send`, so engine callbacks
/// running on other threads can carry their own copy.
#[derive(Debug, Clone, Default)]
pub struct NavigationPolicy {
    https_upgrade: bool,
    rules: Option<Arc<CompiledRules>>,
}

impl NavigationPolicy {
    pub fn new(https_upgrade: bool) -> Self {
        Self {
            https_upgrade,
            rules: None,
        }
    }

    pub fn with_rules(mut self, rules: Option<Arc<CompiledRules>>) -> Self {
        self.rules = rules;
        self
    }

    pub fn https_upgrade(&self) -> bool {
        self.https_upgrade
    }

    pub fn rules(&self) -> Option<&Arc<CompiledRules>> {
        self.rules.as_ref()
    }
}

impl NavigationPolicyTrait for NavigationPolicy {
    fn decide(&self, url: &Url) -> NavigationDecision {
        if is_start_page(url) {
            return NavigationDecision::Allow;
        }

        let verdict = self
            .rules
            .as_ref()
            .map(|rules| rules.evaluate(url, None, ResourceType::Document))
            .unwrap_or_default();

        if verdict.block {
            debug!(%url, "navigation blocked by content rule");
            return NavigationDecision::Block;
        }

        if self.https_upgrade || verdict.make_https {
            if let Some(secure) = upgrade_to_https(url) {
                debug!(from = %url, to = %secure, "upgrading navigation to https");
                return NavigationDecision::Upgrade(secure);
            }
        }

        NavigationDecision::Allow
    }

    fn on_popup(&self, url: Option<&Url>, opener: Option<&Url>) -> PopupDecision {
        let url = match url {
            Some(url) if matches!(url.scheme(), "http" | "https" | "about") => url,
            _ => return PopupDecision::Ignore,
        };

        let blocked = self
            .rules
            .as_ref()
            .is_some_and(|rules| rules.evaluate(url, opener, ResourceType::Popup).block);
        if blocked {
            debug!(%url, opener = ?opener.map(Url::as_str), "popup blocked by content rule");
            return PopupDecision::Block;
        }

        PopupDecision::OpenInNewTab(url.clone())
    }

    fn set_rules(&mut self, rules: Arc<CompiledRules>) {
        self.rules = Some(rules);
    }
}

/// The `https` equivalent of an `http` URL, or `None` if there is nothing to
/// upgrade. The start-page host is never upgraded.
pub fn upgrade_to_https(url: &Url) -> Option<Url> {
    if url.scheme() != "http" || url.host_str() == Some(START_PAGE_HOST) {
        return None;
    }
    let mut secure = url.clone();
    secure.set_scheme("https").ok()?;
    Some(secure)
}
