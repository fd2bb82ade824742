//! QuietBrowser — a minimal tabbed browser shell with privacy toggles.
//!
//! Entry point: opens the browser window on top of the platform web engine.
//! When built without the `gui` feature, runs a console demo over the
//! headless engine.

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[cfg(feature = "gui")]
fn main() {
    init_tracing();
    if let Err(e) = quietbrowser::ui::webview_app::run() {
        tracing::error!("browser exited with an error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "gui"))]
fn main() {
    init_tracing();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              QuietBrowser v{} — Demo Mode                 ║", env!("CARGO_PKG_VERSION"));
    println!("║        Tab lifecycle over a headless web engine            ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(async {
        demo_settings()?;
        demo_address_bar()?;
        demo_content_rules().await?;
        demo_tabs().await?;
        Ok::<(), Box<dyn std::error::Error>>(())
    });

    if let Err(e) = result {
        tracing::error!("demo failed: {}", e);
        std::process::exit(1);
    }

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("  ✅ Demo finished");
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(not(feature = "gui"))]
fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  📦 {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

#[cfg(not(feature = "gui"))]
fn demo_settings() -> Result<(), Box<dyn std::error::Error>> {
    use quietbrowser::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
    section("Settings Engine");

    let dir = std::env::temp_dir().join("quietbrowser-demo");
    let path = dir.join("settings.json").to_string_lossy().to_string();
    let mut engine = SettingsEngine::new(Some(path));
    let settings = engine.load()?;
    println!("  Search URL: {}", settings.general.search_url);
    println!("  Content blocking: {}", settings.privacy.content_blocking);
    println!("  HTTPS upgrade: {}", settings.privacy.https_upgrade);

    engine.set_value("window.width", serde_json::json!(1440))?;
    println!("  Changed window width to: {}", engine.get_settings().window.width);

    engine.reset()?;
    println!("  Reset to defaults: width = {}", engine.get_settings().window.width);
    let _ = std::fs::remove_dir_all(&dir);
    println!("  ✓ SettingsEngine OK");
    println!();
    Ok(())
}

#[cfg(not(feature = "gui"))]
fn demo_address_bar() -> Result<(), Box<dyn std::error::Error>> {
    use quietbrowser::managers::navigation_policy::{NavigationPolicy, NavigationPolicyTrait};
    use quietbrowser::services::address_resolver::resolve_address;
    use quietbrowser::types::settings::GeneralSettings;
    section("Address Bar & Navigation Policy");

    let general = GeneralSettings::default();
    let policy = NavigationPolicy::new(true);
    for input in ["openai research", "example.com", "http://example.com", "http://start/"] {
        let url = resolve_address(input, &general)?;
        println!("  {:<20} -> {:<45} {:?}", input, url.as_str(), policy.decide(&url));
    }
    println!("  ✓ AddressResolver OK");
    println!();
    Ok(())
}

#[cfg(not(feature = "gui"))]
async fn demo_content_rules() -> Result<(), Box<dyn std::error::Error>> {
    use quietbrowser::services::content_filter::ContentFilterLoader;
    use quietbrowser::types::rules::ResourceType;
    use url::Url;
    section("Content-Filter Loader");

    let loader = ContentFilterLoader::new();
    let Some(rules) = loader.get_rules().await else {
        println!("  Rules failed to compile; browsing unfiltered");
        return Ok(());
    };
    println!("  Compiled {} rules", rules.len());

    let page = Url::parse("https://news.example.com/")?;
    let samples = [
        ("https://news.example.com/banner.png", ResourceType::Image),
        ("https://news.example.com/app.js", ResourceType::Script),
    ];
    for (url, resource) in samples {
        let verdict = rules.evaluate(&Url::parse(url)?, Some(&page), resource);
        println!("  {:<40} {:?} block={}", url, resource, verdict.block);
    }
    println!("  ✓ ContentFilterLoader OK");
    println!();
    Ok(())
}

#[cfg(not(feature = "gui"))]
async fn demo_tabs() -> Result<(), Box<dyn std::error::Error>> {
    use quietbrowser::app::App;
    use quietbrowser::engine::headless::HeadlessEngine;
    use quietbrowser::managers::completion::Mailbox;
    use quietbrowser::managers::tab_manager::TabManagerTrait;
    use quietbrowser::services::settings_engine::SettingsEngine;
    use quietbrowser::types::command::BrowserCommand;
    use quietbrowser::types::settings::BrowserSettings;
    use quietbrowser::types::tab::Surface;
    use url::Url;
    section("Tab Registry (headless engine)");

    let engine = HeadlessEngine::new();
    let (mailbox, inbox) = Mailbox::channel(tokio::runtime::Handle::current());
    let settings_engine = SettingsEngine::new(None);
    let mut app = App::with_settings(
        engine.clone(),
        settings_engine,
        &BrowserSettings::default(),
        mailbox,
        inbox,
    );

    let first = app.startup(Some(Url::parse("https://www.rust-lang.org/")?));
    app.dispatch(BrowserCommand::NewTab)?;
    app.dispatch(BrowserCommand::Submit {
        text: "example.com".to_string(),
    })?;
    app.tab_manager.settle().await;
    println!(
        "  Opened {} tabs, live views = {}",
        app.tab_manager.tab_count(),
        engine.total_live_views()
    );

    match app.tab_manager.surface_for(first) {
        Some(Surface::Snapshot(snapshot)) => {
            println!("  First tab suspended with a {} byte snapshot", snapshot.png_bytes().len())
        }
        other => println!("  First tab surface: {:?}", other),
    }

    app.dispatch(BrowserCommand::SelectTab { id: first })?;
    app.tab_manager.settle().await;
    if let Some(tab) = app.tab_manager.active_tab() {
        println!("  Resumed: {} ({:?})", tab.url, tab.state);
    }

    app.dispatch(BrowserCommand::CloseActiveTab)?;
    app.dispatch(BrowserCommand::CloseActiveTab)?;
    app.tab_manager.settle().await;
    if let Some(tab) = app.tab_manager.active_tab() {
        println!("  Closed everything, fresh tab: {} \"{}\"", tab.url, tab.title);
    }
    println!("  Views created = {}, released = {}", engine.views_created(), engine.views_released());
    println!("  ✓ TabManager OK");
    Ok(())
}
