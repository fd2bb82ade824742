//! QuietBrowser UI layer.
//!
//! Uses `wry` for cross-platform WebView rendering:
//! - Windows: WebView2
//! - Linux: WebKitGTK
//! - macOS: WKWebView
//!
//! The tab strip and address bar are HTML/JS injected into each page.
//! Communication from that chrome back to Rust uses wry IPC.

pub mod webview_app;
pub mod wry_engine;
