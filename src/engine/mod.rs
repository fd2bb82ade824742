//! Seam between the browser shell and the embedded web engine.
//!
//! The shell never renders anything itself. It asks a [`WebEngine`] for a view
//! per live tab, hands it a [`ViewConfig`], and drives it through
//! [`EngineView`]. Engines report back with [`EngineEvent`]s and snapshot
//! bitmaps.

pub mod headless;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::oneshot;
use url::Url;

use crate::managers::navigation_policy::NavigationPolicy;
use crate::services::content_filter::CompiledRules;
use crate::types::errors::EngineError;
use crate::types::snapshot::{Snapshot, ViewportRect};
use crate::types::tab::TabId;

/// Fingerprint mitigation injected into every frame: canvas read-back returns
/// an empty PNG payload.
pub const CANVAS_GUARD_JS: &str = include_str!("../../resources/privacy_script.js");

/// Receiver side of an asynchronous snapshot capture.
pub type SnapshotReceiver = oneshot::Receiver<Result<Snapshot, EngineError>>;

/// Storage a view is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageContext {
    /// Cookies, caches and local storage vanish with the view.
    Ephemeral,
    /// The engine's default on-disk data store.
    Persistent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionTime {
    DocumentStart,
    DocumentEnd,
}

/// Script the engine runs in pages loaded by a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserScript {
    pub source: String,
    pub injection_time: InjectionTime,
    pub main_frame_only: bool,
}

impl UserScript {
    /// Runs at document start in every frame.
    pub fn document_start(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            injection_time: InjectionTime::DocumentStart,
            main_frame_only: false,
        }
    }

    pub fn canvas_guard() -> Self {
        Self::document_start(CANVAS_GUARD_JS)
    }
}

/// Everything an engine needs to build one view.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    pub storage: StorageContext,
    pub content_rules: Option<Arc<CompiledRules>>,
    pub user_scripts: Vec<UserScript>,
    pub navigation_policy: NavigationPolicy,
    pub bounds: ViewportRect,
}

/// Notifications an engine raises about one of its views.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    NavigationFinished {
        tab: TabId,
        url: Url,
        title: Option<String>,
    },
    TitleChanged {
        tab: TabId,
        title: String,
    },
    /// A page asked for a new window.
    PopupRequested {
        tab: TabId,
        url: Option<Url>,
    },
}

/// Factory for live views.
pub trait WebEngine {
    type View: EngineView;

    fn create_view(&mut self, tab: TabId, config: ViewConfig) -> Result<Self::View, EngineError>;
}

/// A live, engine-owned rendering surface. Dropping it releases the surface.
pub trait EngineView {
    fn load_url(&mut self, url: &Url) -> Result<(), EngineError>;
    /// Loads a local file, granting read access to `read_access` only.
    fn load_file(&mut self, file: &Path, read_access: &Path) -> Result<(), EngineError>;
    fn go_back(&mut self) -> Result<(), EngineError>;
    fn go_forward(&mut self) -> Result<(), EngineError>;
    fn reload(&mut self) -> Result<(), EngineError>;
    fn bounds(&self) -> ViewportRect;
    fn set_bounds(&mut self, bounds: ViewportRect);
    /// Starts capturing `rect`. The capture must not borrow the view: the
    /// caller is free to drop it before the receiver resolves.
    fn capture_snapshot(&self, rect: ViewportRect) -> SnapshotReceiver;
    /// Rules that arrived after creation. Engines apply them from the next
    /// navigation on.
    fn install_content_rules(&mut self, rules: Arc<CompiledRules>);
}
