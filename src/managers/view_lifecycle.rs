//! View Lifecycle Controller for QuietBrowser.
//!
//! Builds live engine views for tabs, loads their first page, and suspends
//! them by capturing a snapshot and releasing the view. Snapshot results come
//! back later through the [`Mailbox`]; this module never waits for them.

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::engine::{EngineView, StorageContext, UserScript, ViewConfig, WebEngine};
use crate::managers::completion::{Completion, Mailbox};
use crate::managers::navigation_policy::{
    NavigationDecision, NavigationPolicy, NavigationPolicyTrait,
};
use crate::services::content_filter::{CompiledRules, ContentFilterLoader};
use crate::services::start_page;
use crate::types::errors::{EngineError, FilterError};
use crate::types::settings::{BrowserSettings, GeneralSettings, PrivacySettings};
use crate::types::snapshot::ViewportRect;
use crate::types::tab::{RequestToken, Tab, TabId};

/// What a load request ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The given URL was loaded. It may differ from the request after an upgrade.
    Loaded(Url),
    /// The bundled start page was loaded from disk.
    StartPage,
    /// The start page was missing and the fallback URL was loaded instead.
    Fallback(Url),
    /// The navigation was cancelled by policy.
    Blocked,
}

/// Creates, loads and suspends views on behalf of the tab registry.
pub struct ViewLifecycle<E: WebEngine> {
    engine: E,
    content_filter: Rc<ContentFilterLoader>,
    privacy: PrivacySettings,
    general: GeneralSettings,
    policy: NavigationPolicy,
    resource_dirs: Vec<PathBuf>,
    mailbox: Mailbox,
    bounds: ViewportRect,
    next_token: u64,
}

impl<E: WebEngine> ViewLifecycle<E> {
    pub fn new(
        engine: E,
        content_filter: Rc<ContentFilterLoader>,
        settings: &BrowserSettings,
        mailbox: Mailbox,
    ) -> Self {
        let policy = NavigationPolicy::new(settings.privacy.https_upgrade)
            .with_rules(content_filter.cached().filter(|_| settings.privacy.content_blocking));
        Self {
            engine,
            content_filter,
            privacy: settings.privacy.clone(),
            general: settings.general.clone(),
            policy,
            resource_dirs: start_page::candidate_dirs(),
            mailbox,
            bounds: ViewportRect::new(
                0.0,
                0.0,
                f64::from(settings.window.width),
                f64::from(settings.window.height),
            ),
            next_token: 0,
        }
    }

    /// Overrides where the start page is looked up.
    pub fn with_resource_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.resource_dirs = dirs;
        self
    }

    pub fn policy(&self) -> &NavigationPolicy {
        &self.policy
    }

    pub fn bounds(&self) -> ViewportRect {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: ViewportRect) {
        self.bounds = bounds;
    }

    /// Starts compiling the content rules ahead of the first view.
    pub fn preload_rules(&self) {
        if self.privacy.content_blocking && self.content_filter.cached().is_none() {
            self.content_filter.request(None, &self.mailbox);
        }
    }

    /// Builds a live view for `tab` and loads its URL.
    ///
    /// Never waits for the content rules: when they are not compiled yet a
    /// compile is requested and the view starts unfiltered.
    pub fn create(&mut self, tab: &Tab) -> Result<(E::View, LoadOutcome), EngineError> {
        let rules = if self.privacy.content_blocking {
            let cached = self.content_filter.cached();
            if cached.is_none() && self.content_filter.request(Some(tab.id), &self.mailbox) {
                debug!(tab = %tab.id, "view created before content rules were ready");
            }
            cached
        } else {
            None
        };

        // Rules may have been compiled by a direct `get_rules` call.
        if let Some(rules) = rules.as_ref().filter(|_| self.policy.rules().is_none()) {
            debug!(tab = %tab.id, "navigation policy picked up cached content rules");
            self.policy.set_rules(rules.clone());
        }

        let mut user_scripts = Vec::new();
        if self.privacy.canvas_protection {
            user_scripts.push(UserScript::canvas_guard());
        }
        if let Some(script) = rules.as_ref().and_then(|r| r.cosmetic_script()) {
            user_scripts.push(UserScript::document_start(script));
        }

        let config = ViewConfig {
            storage: if self.privacy.ephemeral_storage {
                StorageContext::Ephemeral
            } else {
                StorageContext::Persistent
            },
            content_rules: rules,
            user_scripts,
            navigation_policy: self.policy.clone(),
            bounds: self.bounds,
        };

        let mut view = self.engine.create_view(tab.id, config)?;
        debug!(tab = %tab.id, url = %tab.url, "view created");
        let outcome = self.load(&mut view, &tab.url)?;
        Ok((view, outcome))
    }

    /// Loads `url` into `view`, applying the navigation policy. The start
    /// marker and `about:blank` load the bundled start page instead.
    pub fn load(&self, view: &mut E::View, url: &Url) -> Result<LoadOutcome, EngineError> {
        if start_page::is_start_page(url) {
            return self.load_start_page(view);
        }

        match self.policy.decide(url) {
            NavigationDecision::Allow => {
                view.load_url(url)?;
                Ok(LoadOutcome::Loaded(url.clone()))
            }
            NavigationDecision::Upgrade(secure) => {
                view.load_url(&secure)?;
                Ok(LoadOutcome::Loaded(secure))
            }
            NavigationDecision::Block => Ok(LoadOutcome::Blocked),
        }
    }

    /// Loads the bundled start page with read access limited to its directory.
    /// Falls back to the configured URL, or `about:blank`, when it is missing.
    pub fn load_start_page(&self, view: &mut E::View) -> Result<LoadOutcome, EngineError> {
        if let Some(page) = start_page::locate_in(&self.resource_dirs) {
            match view.load_file(&page.file, &page.dir) {
                Ok(()) => return Ok(LoadOutcome::StartPage),
                Err(e) => warn!("failed to load start page {}: {}", page.file.display(), e),
            }
        } else {
            warn!("bundled start page not found");
        }

        let fallback = if self.general.start_page_fail_open {
            Url::parse(&self.general.start_page_fallback_url).ok()
        } else {
            None
        };
        match fallback {
            Some(url) => {
                info!(%url, "falling back to public start page");
                view.load_url(&url)?;
                Ok(LoadOutcome::Fallback(url))
            }
            None => {
                let blank = Url::parse("about:blank")
                    .map_err(|e| EngineError::Load(e.to_string()))?;
                view.load_url(&blank)?;
                Ok(LoadOutcome::Fallback(blank))
            }
        }
    }

    /// Captures the visible bounds of `view`, then releases it. The capture is
    /// awaited on the runtime and reported as [`Completion::SnapshotCaptured`].
    pub fn suspend(&mut self, tab: TabId, view: E::View) -> RequestToken {
        self.next_token += 1;
        let token = RequestToken(self.next_token);

        let receiver = view.capture_snapshot(view.bounds());
        drop(view);
        debug!(%tab, token = token.0, "view released, snapshot pending");

        let mailbox = self.mailbox.clone();
        mailbox.expect_completion();
        self.mailbox.runtime().spawn(async move {
            let result = receiver.await.unwrap_or(Err(EngineError::ViewReleased));
            mailbox.post(Completion::SnapshotCaptured { tab, token, result });
        });
        token
    }

    /// Applies a finished rule compilation. Returns the rules when they were
    /// newly installed, so the caller can hand them to the live views.
    pub fn rules_compiled(
        &mut self,
        token: RequestToken,
        result: Result<CompiledRules, FilterError>,
    ) -> Option<Arc<CompiledRules>> {
        if self.content_filter.cached().is_some() {
            debug!(token = token.0, "content rules already cached");
            return None;
        }
        let rules = self.content_filter.finish(token, result)?;
        if !self.privacy.content_blocking {
            return None;
        }
        self.policy.set_rules(rules.clone());
        Some(rules)
    }
}
