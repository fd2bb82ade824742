//! Browser window built with `tao`, with tab content rendered by `wry`.
//!
//! Architecture:
//! - The event loop thread owns the [`App`] and with it the whole registry.
//! - Webview callbacks, IPC from the chrome script, and async completions
//!   all arrive as [`UserEvent`]s through the event-loop proxy.
//! - The chrome (tab strip, address bar) is injected into every page and
//!   kept current with `__quiet.update(...)`.

use std::rc::Rc;
use std::sync::{Arc, Mutex};

use tao::dpi::LogicalSize;
use tao::event::{Event, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
use tao::window::WindowBuilder;
use tracing::{debug, info, warn};
use url::Url;

use super::wry_engine::WryEngine;
use crate::app::App;
use crate::engine::EngineEvent;
use crate::managers::completion::Mailbox;
use crate::managers::tab_manager::TabManagerTrait;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::command::BrowserCommand;
use crate::types::settings::BrowserSettings;
use crate::types::snapshot::ViewportRect;
use crate::types::tab::TabId;

/// Events delivered to the UI thread.
#[derive(Debug)]
pub enum UserEvent {
    /// Raw IPC message from the chrome script.
    Ipc(String),
    Engine(EngineEvent),
    /// A navigation was cancelled and must be reissued at `url`.
    Reissue { tab: TabId, url: Url },
    /// Push the tab strip to the chrome.
    RefreshChrome,
    /// A completion was posted to the mailbox.
    Wake,
}

fn refresh_chrome(app: &App<WryEngine>) {
    let tabs = app.tab_manager.tab_strip();
    let Some(active) = app.tab_manager.active_tab_id() else {
        return;
    };
    let Some(view) = app.tab_manager.view(active) else {
        return;
    };
    let state = serde_json::json!({ "tabs": tabs, "activeId": active });
    view.evaluate_script(&format!("window.__quiet&&__quiet.update({})", state));
}

fn handle_event(app: &mut App<WryEngine>, event: UserEvent) {
    match event {
        UserEvent::Ipc(body) => match BrowserCommand::from_ipc(&body) {
            Some(command) => {
                debug!(?command, "chrome command");
                if let Err(e) = app.dispatch(command) {
                    warn!("command failed: {}", e);
                }
                refresh_chrome(app);
            }
            None => debug!("ignoring IPC message: {}", &body[..body.len().min(200)]),
        },
        UserEvent::Engine(engine_event) => {
            app.tab_manager.handle_engine_event(engine_event);
            refresh_chrome(app);
        }
        UserEvent::Reissue { tab, url } => {
            if let Err(e) = app.tab_manager.load_in_tab(tab, &url) {
                debug!(%tab, "reissue dropped: {}", e);
            }
        }
        UserEvent::RefreshChrome => refresh_chrome(app),
        UserEvent::Wake => {
            if app.tab_manager.pump() > 0 {
                refresh_chrome(app);
            }
        }
    }
}

// ─── Main entry point ───

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;

    let mut settings_engine = SettingsEngine::new(None);
    let settings = settings_engine.load().unwrap_or_else(|e| {
        warn!("{}, using default settings", e);
        BrowserSettings::default()
    });

    let event_loop: EventLoop<UserEvent> = EventLoopBuilder::with_user_event().build();
    let proxy = event_loop.create_proxy();

    let window = WindowBuilder::new()
        .with_title("QuietBrowser")
        .with_inner_size(LogicalSize::new(
            f64::from(settings.window.width),
            f64::from(settings.window.height),
        ))
        .with_min_inner_size(LogicalSize::new(
            f64::from(settings.window.min_width),
            f64::from(settings.window.min_height),
        ))
        .build(&event_loop)?;
    let window = Rc::new(window);

    let wake_proxy = Mutex::new(proxy.clone());
    let (mailbox, inbox) = Mailbox::channel(runtime.handle().clone());
    let mailbox = mailbox.with_waker(Arc::new(move || {
        if let Ok(proxy) = wake_proxy.lock() {
            let _ = proxy.send_event(UserEvent::Wake);
        }
    }));

    let engine = WryEngine::new(window.clone(), proxy);
    let mut app = App::with_settings(engine, settings_engine, &settings, mailbox, inbox);

    let size = window.inner_size().to_logical::<f64>(window.scale_factor());
    app.tab_manager
        .set_viewport(ViewportRect::new(0.0, 0.0, size.width, size.height));
    app.startup(None);
    info!("window ready");

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;
        // Keeps the runtime alive for as long as the loop runs.
        let _ = &runtime;

        match event {
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => {
                info!("window closed");
                *control_flow = ControlFlow::Exit;
            }

            Event::WindowEvent {
                event: WindowEvent::Resized(size),
                ..
            } => {
                let size = size.to_logical::<f64>(window.scale_factor());
                app.tab_manager
                    .set_viewport(ViewportRect::new(0.0, 0.0, size.width, size.height));
            }

            Event::UserEvent(user_event) => handle_event(&mut app, user_event),

            _ => {}
        }
    });
}
