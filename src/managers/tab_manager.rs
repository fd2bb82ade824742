use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use tracing::{debug, error, info};
use url::Url;

use crate::engine::{EngineEvent, EngineView, WebEngine};
use crate::managers::completion::{Completion, Inbox, Mailbox};
use crate::managers::navigation_policy::{
    NavigationDecision, NavigationPolicy, NavigationPolicyTrait, PopupDecision,
};
use crate::managers::view_lifecycle::{LoadOutcome, ViewLifecycle};
use crate::services::address_resolver::{new_tab_url, resolve_address};
use crate::services::content_filter::ContentFilterLoader;
use crate::types::errors::TabError;
use crate::types::settings::{BrowserSettings, GeneralSettings};
use crate::types::snapshot::ViewportRect;
use crate::types::tab::{Surface, Tab, TabId, TabStripItem, ViewState};

/// Trait defining the tab registry interface.
pub trait TabManagerTrait {
    fn add_tab(&mut self, url: Option<Url>) -> TabId;
    fn close_tab(&mut self, tab_id: TabId) -> Result<(), TabError>;
    fn select_tab(&mut self, tab_id: TabId) -> Result<(), TabError>;
    fn update_title(&mut self, tab_id: TabId, title: &str) -> Result<(), TabError>;
    fn update_url(&mut self, tab_id: TabId, url: Url) -> Result<(), TabError>;
    fn tabs(&self) -> &[Tab];
    fn tab(&self, tab_id: TabId) -> Option<&Tab>;
    fn active_tab(&self) -> Option<&Tab>;
    fn active_tab_id(&self) -> Option<TabId>;
    fn tab_count(&self) -> usize;
}

/// Ordered tab collection plus the live view bound to each tab.
///
/// Owned by a single thread. Views are created and released only here;
/// asynchronous results are applied when the owner drains the inbox.
pub struct TabManager<E: WebEngine> {
    tabs: Vec<Tab>,
    views: HashMap<TabId, E::View>,
    active_tab_id: Option<TabId>,
    lifecycle: ViewLifecycle<E>,
    general: GeneralSettings,
    inbox: Inbox,
}

impl<E: WebEngine> TabManager<E> {
    pub fn new(
        engine: E,
        content_filter: Rc<ContentFilterLoader>,
        settings: &BrowserSettings,
        mailbox: Mailbox,
        inbox: Inbox,
    ) -> Self {
        Self {
            tabs: Vec::new(),
            views: HashMap::new(),
            active_tab_id: None,
            lifecycle: ViewLifecycle::new(engine, content_filter, settings, mailbox),
            general: settings.general.clone(),
            inbox,
        }
    }

    /// Overrides where the bundled start page is looked up.
    pub fn with_resource_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.lifecycle = self.lifecycle.with_resource_dirs(dirs);
        self
    }

    /// Kicks off rule compilation and opens the first tab.
    pub fn start(&mut self, initial_url: Option<Url>) -> TabId {
        self.lifecycle.preload_rules();
        self.add_tab(initial_url)
    }

    pub fn policy(&self) -> &NavigationPolicy {
        self.lifecycle.policy()
    }

    pub fn index_of(&self, tab_id: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == tab_id)
    }

    fn tab_mut(&mut self, tab_id: TabId) -> Result<&mut Tab, TabError> {
        self.tabs
            .iter_mut()
            .find(|t| t.id == tab_id)
            .ok_or_else(|| TabError::NotFound(tab_id.to_string()))
    }

    pub fn has_live_view(&self, tab_id: TabId) -> bool {
        self.views.contains_key(&tab_id)
    }

    pub fn live_view_count(&self) -> usize {
        self.views.len()
    }

    pub fn view(&self, tab_id: TabId) -> Option<&E::View> {
        self.views.get(&tab_id)
    }

    /// What the content area shows for `tab_id`.
    pub fn surface_for(&self, tab_id: TabId) -> Option<Surface<'_>> {
        let tab = self.tab(tab_id)?;
        if self.active_tab_id == Some(tab_id) && self.has_live_view(tab_id) {
            return Some(Surface::Live);
        }
        Some(match &tab.snapshot {
            Some(snapshot) => Surface::Snapshot(snapshot),
            None => Surface::Placeholder(&tab.title),
        })
    }

    pub fn tab_strip(&self) -> Vec<TabStripItem> {
        self.tabs
            .iter()
            .map(|t| TabStripItem {
                id: t.id,
                title: t.title.clone(),
                url: t.url.to_string(),
                active: self.active_tab_id == Some(t.id),
                state: t.state,
                thumbnail: t.snapshot.as_ref().map(|s| s.to_data_url()),
            })
            .collect()
    }

    /// Makes `tab_id` active, suspending the previously active tab first.
    fn activate(&mut self, tab_id: TabId) {
        if self.active_tab_id == Some(tab_id) {
            return;
        }
        if let Some(previous) = self.active_tab_id.take() {
            self.suspend(previous);
        }
        self.active_tab_id = Some(tab_id);
        self.ensure_live(tab_id);
    }

    fn suspend(&mut self, tab_id: TabId) {
        let Some(view) = self.views.remove(&tab_id) else {
            return;
        };
        self.lifecycle.suspend(tab_id, view);
        if let Ok(tab) = self.tab_mut(tab_id) {
            tab.state = ViewState::Suspended;
        }
    }

    /// Binds a live view to `tab_id` unless one already exists.
    fn ensure_live(&mut self, tab_id: TabId) {
        if self.views.contains_key(&tab_id) {
            return;
        }
        let Some(tab) = self.tab(tab_id).cloned() else {
            return;
        };

        match self.lifecycle.create(&tab) {
            Ok((view, outcome)) => {
                self.views.insert(tab_id, view);
                if let Ok(tab) = self.tab_mut(tab_id) {
                    tab.state = ViewState::Live;
                    if let LoadOutcome::Loaded(url) = outcome {
                        tab.url = url;
                    }
                }
            }
            Err(e) => error!(tab = %tab_id, "failed to create view: {}", e),
        }
    }

    /// Loads `url` into the live view of `tab_id`, applying the navigation
    /// policy on the way.
    pub fn load_in_tab(&mut self, tab_id: TabId, url: &Url) -> Result<(), TabError> {
        let view = self
            .views
            .get_mut(&tab_id)
            .ok_or_else(|| TabError::NoLiveView(tab_id.to_string()))?;
        let outcome = self.lifecycle.load(view, url)?;
        let tab = self.tab_mut(tab_id)?;
        match outcome {
            LoadOutcome::Loaded(loaded) => tab.url = loaded,
            LoadOutcome::StartPage | LoadOutcome::Fallback(_) => tab.url = url.clone(),
            LoadOutcome::Blocked => debug!(tab = %tab_id, %url, "load blocked"),
        }
        Ok(())
    }

    /// Resolves address-bar text and loads it in the active tab.
    pub fn navigate_active(&mut self, input: &str) -> Result<Url, TabError> {
        let url = resolve_address(input, &self.general)?;
        let active = self.active_tab_id.ok_or(TabError::NoActiveTab)?;
        self.load_in_tab(active, &url)?;
        Ok(url)
    }

    fn active_view_mut(&mut self) -> Result<&mut E::View, TabError> {
        let active = self.active_tab_id.ok_or(TabError::NoActiveTab)?;
        self.views
            .get_mut(&active)
            .ok_or_else(|| TabError::NoLiveView(active.to_string()))
    }

    pub fn go_back(&mut self) -> Result<(), TabError> {
        Ok(self.active_view_mut()?.go_back()?)
    }

    pub fn go_forward(&mut self) -> Result<(), TabError> {
        Ok(self.active_view_mut()?.go_forward()?)
    }

    pub fn reload(&mut self) -> Result<(), TabError> {
        Ok(self.active_view_mut()?.reload()?)
    }

    /// Runs a navigation the engine is about to perform through the policy.
    /// An upgrade is reissued here; the engine should cancel its own attempt
    /// unless the decision is [`NavigationDecision::Allow`].
    pub fn on_navigation_action(&mut self, tab_id: TabId, url: &Url) -> NavigationDecision {
        let decision = self.lifecycle.policy().decide(url);
        if let NavigationDecision::Upgrade(secure) = &decision {
            if let Err(e) = self.load_in_tab(tab_id, secure) {
                debug!(tab = %tab_id, "upgrade not reissued: {}", e);
            }
        }
        decision
    }

    /// Applies an engine notification. Returns the id of a tab opened for a
    /// popup, if any. Events for closed tabs are ignored.
    pub fn handle_engine_event(&mut self, event: EngineEvent) -> Option<TabId> {
        match event {
            EngineEvent::NavigationFinished { tab, url, title } => {
                if self.update_url(tab, url).is_err() {
                    debug!(%tab, "navigation finished for closed tab");
                    return None;
                }
                if let Some(title) = title {
                    let _ = self.update_title(tab, &title);
                }
                None
            }
            EngineEvent::TitleChanged { tab, title } => {
                if self.update_title(tab, &title).is_err() {
                    debug!(%tab, "title change for closed tab");
                }
                None
            }
            EngineEvent::PopupRequested { tab, url } => {
                let opener = self.tab(tab).map(|t| t.url.clone());
                match self.lifecycle.policy().on_popup(url.as_ref(), opener.as_ref()) {
                    PopupDecision::OpenInNewTab(url) => {
                        debug!(opener = %tab, %url, "popup redirected into a new tab");
                        Some(self.add_tab(Some(url)))
                    }
                    PopupDecision::Block | PopupDecision::Ignore => None,
                }
            }
        }
    }

    /// Resizes the content area. Live views and future views use the new bounds.
    pub fn set_viewport(&mut self, bounds: ViewportRect) {
        self.lifecycle.set_bounds(bounds);
        for view in self.views.values_mut() {
            view.set_bounds(bounds);
        }
    }

    /// Applies one asynchronous result.
    pub fn apply_completion(&mut self, completion: Completion) {
        match completion {
            Completion::SnapshotCaptured { tab, token, result } => {
                let Ok(record) = self.tab_mut(tab) else {
                    debug!(%tab, token = token.0, "snapshot for closed tab discarded");
                    return;
                };
                match result {
                    Ok(snapshot) => {
                        if record.snapshot_token.is_some_and(|applied| applied >= token) {
                            debug!(%tab, token = token.0, "stale snapshot discarded");
                            return;
                        }
                        record.snapshot = Some(snapshot);
                        record.snapshot_token = Some(token);
                    }
                    Err(e) => debug!(%tab, "snapshot capture failed, keeping previous: {}", e),
                }
            }
            Completion::RulesCompiled {
                requested_by,
                token,
                result,
            } => {
                if let Some(tab) = requested_by.filter(|t| self.index_of(*t).is_none()) {
                    debug!(%tab, "rules requested by a tab that has since closed");
                }
                if let Some(rules) = self.lifecycle.rules_compiled(token, result) {
                    info!(views = self.views.len(), "installing content rules on live views");
                    for view in self.views.values_mut() {
                        view.install_content_rules(rules.clone());
                    }
                }
            }
        }
    }

    /// Applies every completion that has already arrived. Returns how many.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(completion) = self.inbox.try_next() {
            self.apply_completion(completion);
            applied += 1;
        }
        applied
    }

    /// Waits for the next completion and applies it. Returns false when
    /// nothing is outstanding.
    pub async fn next_completion(&mut self) -> bool {
        if self.inbox.outstanding() == 0 {
            return self.pump() > 0;
        }
        match self.inbox.next().await {
            Some(completion) => {
                self.apply_completion(completion);
                true
            }
            None => false,
        }
    }

    /// Applies completions until no request is outstanding.
    pub async fn settle(&mut self) {
        while self.next_completion().await {}
    }

    pub fn pending_completions(&self) -> usize {
        self.inbox.outstanding()
    }
}

impl<E: WebEngine> TabManagerTrait for TabManager<E> {
    /// Appends a tab, makes it active and gives it a live view.
    fn add_tab(&mut self, url: Option<Url>) -> TabId {
        let tab = Tab::new(url.unwrap_or_else(|| new_tab_url(&self.general)));
        let id = tab.id;
        info!(tab = %id, url = %tab.url, "tab opened");
        self.tabs.push(tab);
        self.activate(id);
        id
    }

    /// Close a tab and release its view. Closing the active tab activates the
    /// tab now at the same position; closing the last tab opens a fresh one.
    fn close_tab(&mut self, tab_id: TabId) -> Result<(), TabError> {
        let index = self
            .index_of(tab_id)
            .ok_or_else(|| TabError::NotFound(tab_id.to_string()))?;

        self.tabs.remove(index);
        self.views.remove(&tab_id);
        info!(tab = %tab_id, "tab closed");

        if self.active_tab_id != Some(tab_id) {
            return Ok(());
        }
        self.active_tab_id = None;

        if self.tabs.is_empty() {
            self.add_tab(None);
            return Ok(());
        }

        let next = self.tabs[index.min(self.tabs.len() - 1)].id;
        self.activate(next);
        Ok(())
    }

    /// Switch the active tab. Selecting the active tab does nothing.
    fn select_tab(&mut self, tab_id: TabId) -> Result<(), TabError> {
        if self.index_of(tab_id).is_none() {
            return Err(TabError::NotFound(tab_id.to_string()));
        }
        self.activate(tab_id);
        Ok(())
    }

    fn update_title(&mut self, tab_id: TabId, title: &str) -> Result<(), TabError> {
        let tab = self.tab_mut(tab_id)?;
        if !title.is_empty() {
            tab.title = title.to_string();
        }
        Ok(())
    }

    fn update_url(&mut self, tab_id: TabId, url: Url) -> Result<(), TabError> {
        self.tab_mut(tab_id)?.url = url;
        Ok(())
    }

    fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    fn tab(&self, tab_id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == tab_id)
    }

    fn active_tab(&self) -> Option<&Tab> {
        self.active_tab_id.and_then(|id| self.tab(id))
    }

    fn active_tab_id(&self) -> Option<TabId> {
        self.active_tab_id
    }

    fn tab_count(&self) -> usize {
        self.tabs.len()
    }
}
