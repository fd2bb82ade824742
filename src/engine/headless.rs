//! In-process engine that renders nothing.
//!
//! Used by the console demo and the test-suite. It keeps a per-view history,
//! honours the content rules it was given, and produces placeholder frames
//! whose bytes are the URL that was on screen. Views are tracked in shared
//! state so callers can observe creation and release.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use tokio::sync::oneshot;
use url::Url;

use super::{EngineView, SnapshotReceiver, ViewConfig, WebEngine};
use crate::managers::navigation_policy::NavigationPolicyTrait;
use crate::services::content_filter::CompiledRules;
use crate::types::errors::EngineError;
use crate::types::rules::{ResourceType, RuleVerdict};
use crate::types::snapshot::{Snapshot, ViewportRect};
use crate::types::tab::TabId;

/// How the engine answers snapshot requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// Resolve as soon as the capture is requested.
    #[default]
    Immediate,
    /// Resolve every capture with an error.
    Fail,
    /// Hold captures until [`HeadlessEngine::complete_pending_captures`].
    Deferred,
}

/// What a headless view currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedResource {
    Url(Url),
    File { path: PathBuf, read_access: PathBuf },
}

struct PendingCapture {
    tab: TabId,
    snapshot: Snapshot,
    sender: oneshot::Sender<Result<Snapshot, EngineError>>,
}

#[derive(Default)]
struct EngineState {
    live: HashMap<TabId, usize>,
    created: usize,
    released: usize,
    capture_mode: CaptureMode,
    fail_creation: bool,
    pending: Vec<PendingCapture>,
}

/// Handle to the headless engine. Clones share state.
#[derive(Clone, Default)]
pub struct HeadlessEngine {
    state: Rc<RefCell<EngineState>>,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_capture_mode(&self, mode: CaptureMode) {
        self.state.borrow_mut().capture_mode = mode;
    }

    /// Makes every following `create_view` fail.
    pub fn set_fail_creation(&self, fail: bool) {
        self.state.borrow_mut().fail_creation = fail;
    }

    /// Number of live views bound to `tab`.
    pub fn live_views(&self, tab: TabId) -> usize {
        self.state.borrow().live.get(&tab).copied().unwrap_or(0)
    }

    pub fn total_live_views(&self) -> usize {
        self.state.borrow().live.values().sum()
    }

    pub fn views_created(&self) -> usize {
        self.state.borrow().created
    }

    pub fn views_released(&self) -> usize {
        self.state.borrow().released
    }

    pub fn pending_captures(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Tabs with a deferred capture outstanding, oldest first.
    pub fn pending_capture_tabs(&self) -> Vec<TabId> {
        self.state.borrow().pending.iter().map(|p| p.tab).collect()
    }

    /// Resolves every deferred capture successfully. Returns how many were sent.
    pub fn complete_pending_captures(&self) -> usize {
        let pending = std::mem::take(&mut self.state.borrow_mut().pending);
        let count = pending.len();
        for capture in pending {
            let _ = capture.sender.send(Ok(capture.snapshot));
        }
        count
    }

    /// Resolves deferred captures newest first, to simulate out-of-order delivery.
    pub fn complete_pending_captures_reversed(&self) -> usize {
        let pending = std::mem::take(&mut self.state.borrow_mut().pending);
        let count = pending.len();
        for capture in pending.into_iter().rev() {
            let _ = capture.sender.send(Ok(capture.snapshot));
        }
        count
    }

    /// Resolves every deferred capture with an error.
    pub fn fail_pending_captures(&self) -> usize {
        let pending = std::mem::take(&mut self.state.borrow_mut().pending);
        let count = pending.len();
        for capture in pending {
            let _ = capture
                .sender
                .send(Err(EngineError::Snapshot("headless capture failed".into())));
        }
        count
    }
}

impl WebEngine for HeadlessEngine {
    type View = HeadlessView;

    fn create_view(&mut self, tab: TabId, config: ViewConfig) -> Result<HeadlessView, EngineError> {
        let mut state = self.state.borrow_mut();
        if state.fail_creation {
            return Err(EngineError::ViewCreation("headless engine refused".into()));
        }
        state.created += 1;
        *state.live.entry(tab).or_insert(0) += 1;
        drop(state);

        Ok(HeadlessView {
            tab,
            bounds: config.bounds,
            config,
            engine: self.state.clone(),
            history: Vec::new(),
            position: 0,
            reloads: 0,
        })
    }
}

/// A headless view. Dropping it releases its slot in the engine.
pub struct HeadlessView {
    tab: TabId,
    config: ViewConfig,
    bounds: ViewportRect,
    engine: Rc<RefCell<EngineState>>,
    history: Vec<LoadedResource>,
    position: usize,
    reloads: usize,
}

impl HeadlessView {
    pub fn tab(&self) -> TabId {
        self.tab
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn current(&self) -> Option<&LoadedResource> {
        self.history.get(self.position)
    }

    /// URL on screen, if the view shows a network resource.
    pub fn current_url(&self) -> Option<&Url> {
        match self.current()? {
            LoadedResource::Url(url) => Some(url),
            LoadedResource::File { .. } => None,
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn reload_count(&self) -> usize {
        self.reloads
    }

    /// Runs a subresource request of the current page through the view's rules.
    pub fn evaluate_request(&self, url: &Url, resource: ResourceType) -> RuleVerdict {
        match &self.config.content_rules {
            Some(rules) => rules.evaluate(url, self.current_url(), resource),
            None => RuleVerdict::default(),
        }
    }

    fn push(&mut self, resource: LoadedResource) {
        if !self.history.is_empty() {
            self.history.truncate(self.position + 1);
        }
        self.history.push(resource);
        self.position = self.history.len() - 1;
    }

    fn frame_bytes(&self) -> Vec<u8> {
        match self.current() {
            Some(LoadedResource::Url(url)) => url.as_str().as_bytes().to_vec(),
            Some(LoadedResource::File { path, .. }) => path.to_string_lossy().as_bytes().to_vec(),
            None => Vec::new(),
        }
    }
}

impl EngineView for HeadlessView {
    fn load_url(&mut self, url: &Url) -> Result<(), EngineError> {
        self.push(LoadedResource::Url(url.clone()));
        Ok(())
    }

    fn load_file(&mut self, file: &Path, read_access: &Path) -> Result<(), EngineError> {
        if !file.starts_with(read_access) {
            return Err(EngineError::Load(format!(
                "{} is outside {}",
                file.display(),
                read_access.display()
            )));
        }
        self.push(LoadedResource::File {
            path: file.to_path_buf(),
            read_access: read_access.to_path_buf(),
        });
        Ok(())
    }

    fn go_back(&mut self) -> Result<(), EngineError> {
        if self.position > 0 {
            self.position -= 1;
        }
        Ok(())
    }

    fn go_forward(&mut self) -> Result<(), EngineError> {
        if self.position + 1 < self.history.len() {
            self.position += 1;
        }
        Ok(())
    }

    fn reload(&mut self) -> Result<(), EngineError> {
        self.reloads += 1;
        Ok(())
    }

    fn bounds(&self) -> ViewportRect {
        self.bounds
    }

    fn set_bounds(&mut self, bounds: ViewportRect) {
        self.bounds = bounds;
    }

    fn capture_snapshot(&self, rect: ViewportRect) -> SnapshotReceiver {
        let (sender, receiver) = oneshot::channel();
        let snapshot = Snapshot::from_png(rect.width as u32, rect.height as u32, self.frame_bytes());
        let mut engine = self.engine.borrow_mut();
        match engine.capture_mode {
            CaptureMode::Immediate => {
                let _ = sender.send(Ok(snapshot));
            }
            CaptureMode::Fail => {
                let _ = sender.send(Err(EngineError::Snapshot("headless capture failed".into())));
            }
            CaptureMode::Deferred => engine.pending.push(PendingCapture {
                tab: self.tab,
                snapshot,
                sender,
            }),
        }
        receiver
    }

    fn install_content_rules(&mut self, rules: Arc<CompiledRules>) {
        self.config.navigation_policy.set_rules(rules.clone());
        self.config.content_rules = Some(rules);
    }
}

impl Drop for HeadlessView {
    fn drop(&mut self) {
        let mut engine = self.engine.borrow_mut();
        engine.released += 1;
        if let Some(count) = engine.live.get_mut(&self.tab) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                engine.live.remove(&self.tab);
            }
        }
    }
}
