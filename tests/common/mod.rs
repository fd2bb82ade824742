//! Shared fixtures for the registry tests: a headless engine, a registry
//! wired to the current tokio runtime, and a temporary start-page directory.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use quietbrowser::engine::headless::HeadlessEngine;
use quietbrowser::managers::completion::Mailbox;
use quietbrowser::managers::tab_manager::TabManager;
use quietbrowser::services::content_filter::ContentFilterLoader;
use quietbrowser::services::start_page::START_PAGE_FILE;
use quietbrowser::types::settings::BrowserSettings;
use tempfile::TempDir;
use tokio::runtime::Handle;
use url::Url;

pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

/// Registry over `engine` with default settings and no start page on disk.
pub fn registry(engine: &HeadlessEngine) -> TabManager<HeadlessEngine> {
    registry_with(engine, &BrowserSettings::default(), Vec::new())
}

pub fn registry_with(
    engine: &HeadlessEngine,
    settings: &BrowserSettings,
    resource_dirs: Vec<PathBuf>,
) -> TabManager<HeadlessEngine> {
    registry_with_loader(engine, settings, resource_dirs, ContentFilterLoader::new())
}

pub fn registry_with_loader(
    engine: &HeadlessEngine,
    settings: &BrowserSettings,
    resource_dirs: Vec<PathBuf>,
    loader: ContentFilterLoader,
) -> TabManager<HeadlessEngine> {
    let (mailbox, inbox) = Mailbox::channel(Handle::current());
    TabManager::new(engine.clone(), Rc::new(loader), settings, mailbox, inbox)
        .with_resource_dirs(resource_dirs)
}

/// Directory holding a minimal `start.html`.
pub fn start_page_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(START_PAGE_FILE), "<html><body>start</body></html>").unwrap();
    dir
}
