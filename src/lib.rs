//! QuietBrowser — a minimal tabbed browser shell with privacy toggles.
//!
//! Rendering is delegated to a platform web engine. This crate owns the tab
//! registry, suspends inactive tabs behind snapshots, compiles content rules,
//! and applies the navigation policy. All modules are exposed for the binary
//! and the integration tests.

pub mod app;
pub mod engine;
pub mod managers;
pub mod platform;
pub mod services;
pub mod types;

#[cfg(feature = "gui")]
pub mod ui;
