use serde::{Deserialize, Serialize};

use super::tab::TabId;

/// Commands sent by the browser chrome (tab strip, toolbar, menu shortcuts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum BrowserCommand {
    NewTab,
    CloseTab { id: TabId },
    CloseActiveTab,
    SelectTab { id: TabId },
    Back,
    Forward,
    Reload,
    Submit { text: String },
}

impl BrowserCommand {
    /// Parses an IPC message body. Unknown or malformed messages yield `None`.
    pub fn from_ipc(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}
