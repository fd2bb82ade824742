//! [`WebEngine`] backed by `wry` webviews inside the main `tao` window.
//!
//! Only the active tab has a webview, so each view fills the window. Engine
//! callbacks run on the UI thread and report back through the event-loop proxy;
//! they never touch the registry.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use tao::event_loop::EventLoopProxy;
use tao::window::Window;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use url::Url;
use wry::dpi::{LogicalPosition, LogicalSize};
use wry::http::{header::CONTENT_TYPE, Request, Response};
use wry::{NewWindowResponse, PageLoadEvent, Rect, WebView, WebViewBuilder};

use super::webview_app::UserEvent;
use crate::engine::{
    EngineEvent, EngineView, InjectionTime, SnapshotReceiver, StorageContext, ViewConfig,
    WebEngine,
};
use crate::managers::navigation_policy::{
    NavigationDecision, NavigationPolicy, NavigationPolicyTrait,
};
use crate::services::content_filter::CompiledRules;
use crate::services::start_page::resolve_within;
use crate::types::errors::EngineError;
use crate::types::snapshot::ViewportRect;
use crate::types::tab::TabId;

/// Scheme serving the bundled start page.
const PROTOCOL: &str = "quiet";

#[cfg(windows)]
const PROTOCOL_ORIGIN: &str = "http://quiet.localhost";
#[cfg(not(windows))]
const PROTOCOL_ORIGIN: &str = "quiet://localhost";

/// Browser chrome (tab strip and address bar) drawn over every page.
const CHROME_JS: &str = include_str!("../../resources/ui/chrome.js");

fn is_internal(url: &Url) -> bool {
    url.scheme() == PROTOCOL || url.host_str() == Some("quiet.localhost")
}

fn to_rect(bounds: ViewportRect) -> Rect {
    Rect {
        position: LogicalPosition::new(bounds.x, bounds.y).into(),
        size: LogicalSize::new(bounds.width, bounds.height).into(),
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn serve_start_dir(root: &Mutex<Option<PathBuf>>, request: &Request<Vec<u8>>) -> Response<Cow<'static, [u8]>> {
    let dir = root.lock().ok().and_then(|r| r.clone());
    let found = dir
        .and_then(|dir| resolve_within(&dir, request.uri().path()))
        .and_then(|file| fs::read(&file).ok().map(|bytes| (file, bytes)));

    let response = match found {
        Some((file, bytes)) => Response::builder()
            .header(CONTENT_TYPE, mime_for(&file))
            .body(Cow::Owned(bytes)),
        None => {
            debug!(path = request.uri().path(), "start page request refused");
            Response::builder().status(404).body(Cow::Borrowed(&b""[..]))
        }
    };
    response.unwrap_or_else(|_| Response::new(Cow::Borrowed(&b""[..])))
}

/// Builds webviews in the browser window.
pub struct WryEngine {
    window: Rc<Window>,
    proxy: EventLoopProxy<UserEvent>,
}

impl WryEngine {
    pub fn new(window: Rc<Window>, proxy: EventLoopProxy<UserEvent>) -> Self {
        Self { window, proxy }
    }
}

impl WebEngine for WryEngine {
    type View = WryView;

    fn create_view(&mut self, tab: TabId, config: ViewConfig) -> Result<WryView, EngineError> {
        let policy = Arc::new(Mutex::new(config.navigation_policy.clone()));
        let start_root: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));

        let mut builder = WebViewBuilder::new()
            .with_incognito(config.storage == StorageContext::Ephemeral)
            .with_bounds(to_rect(config.bounds))
            .with_initialization_script(CHROME_JS)
            .with_devtools(cfg!(debug_assertions));

        for script in &config.user_scripts {
            // wry only runs initialization scripts at document start.
            if script.injection_time == InjectionTime::DocumentStart {
                builder = builder.with_initialization_script(script.source.as_str());
            }
        }

        let root = start_root.clone();
        let nav_policy = policy.clone();
        let nav_proxy = self.proxy.clone();
        let popup_proxy = self.proxy.clone();
        let load_proxy = self.proxy.clone();
        let title_proxy = self.proxy.clone();
        let ipc_proxy = self.proxy.clone();

        let builder = builder
            .with_custom_protocol(PROTOCOL.into(), move |_id, request| {
                serve_start_dir(&root, &request)
            })
            .with_navigation_handler(move |uri: String| {
                let Ok(url) = Url::parse(&uri) else {
                    return true;
                };
                if is_internal(&url) {
                    return true;
                }
                let decision = nav_policy
                    .lock()
                    .map(|p| p.decide(&url))
                    .unwrap_or(NavigationDecision::Allow);
                match decision {
                    NavigationDecision::Allow => true,
                    NavigationDecision::Upgrade(secure) => {
                        let _ = nav_proxy.send_event(UserEvent::Reissue { tab, url: secure });
                        false
                    }
                    NavigationDecision::Block => false,
                }
            })
            .with_new_window_req_handler(move |uri: String, _features| {
                let _ = popup_proxy.send_event(UserEvent::Engine(EngineEvent::PopupRequested {
                    tab,
                    url: Url::parse(&uri).ok(),
                }));
                NewWindowResponse::Deny
            })
            .with_on_page_load_handler(move |event, uri: String| {
                if !matches!(event, PageLoadEvent::Finished) {
                    return;
                }
                if let Ok(url) = Url::parse(&uri) {
                    if !is_internal(&url) {
                        let _ = load_proxy.send_event(UserEvent::Engine(
                            EngineEvent::NavigationFinished {
                                tab,
                                url,
                                title: None,
                            },
                        ));
                    }
                }
                let _ = load_proxy.send_event(UserEvent::RefreshChrome);
            })
            .with_document_title_changed_handler(move |title: String| {
                let _ = title_proxy.send_event(UserEvent::Engine(EngineEvent::TitleChanged {
                    tab,
                    title,
                }));
            })
            .with_ipc_handler(move |request: Request<String>| {
                let _ = ipc_proxy.send_event(UserEvent::Ipc(request.body().clone()));
            });

        #[cfg(target_os = "linux")]
        let webview = {
            use tao::platform::unix::WindowExtUnix;
            use wry::WebViewBuilderExtUnix;
            let vbox = self
                .window
                .default_vbox()
                .ok_or_else(|| EngineError::ViewCreation("window has no GTK container".into()))?;
            builder.build_gtk(vbox)
        };

        #[cfg(not(target_os = "linux"))]
        let webview = builder.build_as_child(&*self.window);

        let webview = webview.map_err(|e| EngineError::ViewCreation(e.to_string()))?;

        Ok(WryView {
            tab,
            webview,
            bounds: config.bounds,
            policy,
            start_root,
        })
    }
}

/// A tab's webview. Dropping it destroys the webview.
pub struct WryView {
    tab: TabId,
    webview: WebView,
    bounds: ViewportRect,
    policy: Arc<Mutex<NavigationPolicy>>,
    start_root: Arc<Mutex<Option<PathBuf>>>,
}

impl WryView {
    pub fn evaluate_script(&self, js: &str) {
        if let Err(e) = self.webview.evaluate_script(js) {
            debug!(tab = %self.tab, "script evaluation failed: {}", e);
        }
    }

    fn run(&self, js: &str) -> Result<(), EngineError> {
        self.webview
            .evaluate_script(js)
            .map_err(|e| EngineError::Load(e.to_string()))
    }
}

impl EngineView for WryView {
    fn load_url(&mut self, url: &Url) -> Result<(), EngineError> {
        self.webview
            .load_url(url.as_str())
            .map_err(|e| EngineError::Load(e.to_string()))
    }

    fn load_file(&mut self, file: &Path, read_access: &Path) -> Result<(), EngineError> {
        let relative = file
            .strip_prefix(read_access)
            .map_err(|_| EngineError::Load(format!("{} is outside {}", file.display(), read_access.display())))?;
        if let Ok(mut root) = self.start_root.lock() {
            *root = Some(read_access.to_path_buf());
        }
        let path: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let url = format!("{}/{}", PROTOCOL_ORIGIN, path.join("/"));
        self.webview
            .load_url(&url)
            .map_err(|e| EngineError::Load(e.to_string()))
    }

    fn go_back(&mut self) -> Result<(), EngineError> {
        self.run("history.back()")
    }

    fn go_forward(&mut self) -> Result<(), EngineError> {
        self.run("history.forward()")
    }

    fn reload(&mut self) -> Result<(), EngineError> {
        self.run("location.reload()")
    }

    fn bounds(&self) -> ViewportRect {
        self.bounds
    }

    fn set_bounds(&mut self, bounds: ViewportRect) {
        self.bounds = bounds;
        if let Err(e) = self.webview.set_bounds(to_rect(bounds)) {
            warn!(tab = %self.tab, "failed to resize webview: {}", e);
        }
    }

    /// wry has no bitmap capture; the previous snapshot is kept.
    fn capture_snapshot(&self, _rect: ViewportRect) -> SnapshotReceiver {
        let (sender, receiver) = oneshot::channel();
        let _ = sender.send(Err(EngineError::Unsupported("snapshot capture".into())));
        receiver
    }

    /// Document-level rules take effect on the next navigation. wry cannot
    /// filter subresources, so cosmetic rules reach only views created later.
    fn install_content_rules(&mut self, rules: Arc<CompiledRules>) {
        if let Ok(mut policy) = self.policy.lock() {
            policy.set_rules(rules);
        }
    }
}
