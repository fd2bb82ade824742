use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use super::snapshot::Snapshot;

/// Title shown for a tab until its first page reports one.
pub const DEFAULT_TAB_TITLE: &str = "New Tab";

/// Opaque unique identifier of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(Uuid);

impl TabId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Monotonic tag attached to each asynchronous request.
///
/// Completions carry the token they were issued with so that an older result
/// never overwrites a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestToken(pub u64);

/// Where a tab is in its view lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewState {
    /// Never activated: no view, no snapshot.
    Unloaded,
    /// A live engine view is bound to the tab.
    Live,
    /// The view was released; only the cached snapshot remains.
    Suspended,
}

/// Represents a browser tab with its current state.
#[derive(Debug, Clone)]
pub struct Tab {
    pub id: TabId,
    pub url: Url,
    pub title: String,
    pub snapshot: Option<Snapshot>,
    pub snapshot_token: Option<RequestToken>,
    pub state: ViewState,
}

impl Tab {
    pub fn new(url: Url) -> Self {
        Self {
            id: TabId::new(),
            url,
            title: DEFAULT_TAB_TITLE.to_string(),
            snapshot: None,
            snapshot_token: None,
            state: ViewState::Unloaded,
        }
    }
}

/// Summary of one tab for the tab strip.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TabStripItem {
    pub id: TabId,
    pub title: String,
    pub url: String,
    pub active: bool,
    pub state: ViewState,
    /// `data:` URL of the cached snapshot, if any.
    pub thumbnail: Option<String>,
}

/// What the content surface shows for a tab.
#[derive(Debug, Clone, PartialEq)]
pub enum Surface<'a> {
    /// The live engine view is on screen.
    Live,
    /// The cached bitmap of a suspended tab.
    Snapshot(&'a Snapshot),
    /// No bitmap yet; show the title on a blank surface.
    Placeholder(&'a str),
}
