//! App Core for QuietBrowser.
//!
//! Central struct holding settings, the content-filter loader and the tab
//! registry. Constructed once at startup; commands from the browser chrome are
//! dispatched through it.

use std::rc::Rc;

use tracing::{info, warn};
use url::Url;

use crate::engine::WebEngine;
use crate::managers::completion::{Inbox, Mailbox};
use crate::managers::tab_manager::{TabManager, TabManagerTrait};
use crate::services::content_filter::ContentFilterLoader;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::command::BrowserCommand;
use crate::types::errors::TabError;
use crate::types::settings::BrowserSettings;
use crate::types::tab::TabId;

/// Central application struct.
pub struct App<E: WebEngine> {
    pub settings_engine: SettingsEngine,
    pub content_filter: Rc<ContentFilterLoader>,
    pub tab_manager: TabManager<E>,
}

impl<E: WebEngine> App<E> {
    /// Loads settings and builds the registry over `engine`.
    ///
    /// A settings file that cannot be read is logged and replaced by defaults
    /// for this run; it is not overwritten.
    pub fn new(engine: E, mut settings_engine: SettingsEngine, mailbox: Mailbox, inbox: Inbox) -> Self {
        let settings = settings_engine.load().unwrap_or_else(|e| {
            warn!("{}, using default settings", e);
            BrowserSettings::default()
        });
        Self::with_settings(engine, settings_engine, &settings, mailbox, inbox)
    }

    /// Builds the app from settings that are already in hand.
    pub fn with_settings(
        engine: E,
        settings_engine: SettingsEngine,
        settings: &BrowserSettings,
        mailbox: Mailbox,
        inbox: Inbox,
    ) -> Self {
        let content_filter = Rc::new(ContentFilterLoader::new());
        let tab_manager = TabManager::new(engine, content_filter.clone(), settings, mailbox, inbox);
        Self {
            settings_engine,
            content_filter,
            tab_manager,
        }
    }

    /// Startup sequence: start compiling rules, open the first tab.
    pub fn startup(&mut self, initial_url: Option<Url>) -> TabId {
        let id = self.tab_manager.start(initial_url);
        info!(tab = %id, "browser started");
        id
    }

    /// Applies one command from the browser chrome.
    pub fn dispatch(&mut self, command: BrowserCommand) -> Result<(), TabError> {
        match command {
            BrowserCommand::NewTab => {
                self.tab_manager.add_tab(None);
            }
            BrowserCommand::CloseTab { id } => self.tab_manager.close_tab(id)?,
            BrowserCommand::CloseActiveTab => {
                let id = self.tab_manager.active_tab_id().ok_or(TabError::NoActiveTab)?;
                self.tab_manager.close_tab(id)?;
            }
            BrowserCommand::SelectTab { id } => self.tab_manager.select_tab(id)?,
            BrowserCommand::Back => self.tab_manager.go_back()?,
            BrowserCommand::Forward => self.tab_manager.go_forward()?,
            BrowserCommand::Reload => self.tab_manager.reload()?,
            BrowserCommand::Submit { text } => {
                self.tab_manager.navigate_active(&text)?;
            }
        }
        Ok(())
    }
}
