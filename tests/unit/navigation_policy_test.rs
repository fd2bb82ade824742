#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use common::{registry, url};
use quietbrowser::engine::headless::HeadlessEngine;
use quietbrowser::engine::{EngineEvent, EngineView};
use quietbrowser::managers::navigation_policy::{
    NavigationDecision, NavigationPolicy, NavigationPolicyTrait, PopupDecision,
};
use quietbrowser::managers::tab_manager::TabManagerTrait;
use quietbrowser::services::content_filter::{compile_rules, BUILTIN_RULES_JSON};
use quietbrowser::types::tab::{TabId, ViewState};
use rstest::rstest;

// === Decisions ===

#[rstest]
#[case("http://example.com", Some("https://example.com/"))]
#[case("http://example.com:8080/a", Some("https://example.com:8080/a"))]
#[case("https://example.com/", None)]
#[case("http://start/", None)]
#[case("about:blank", None)]
fn test_https_upgrade(#[case] input: &str, #[case] upgraded: Option<&str>) {
    let policy = NavigationPolicy::new(true);
    let expected = match upgraded {
        Some(secure) => NavigationDecision::Upgrade(url(secure)),
        None => NavigationDecision::Allow,
    };
    assert_eq!(policy.decide(&url(input)), expected);
}

#[test]
fn test_upgrade_disabled_allows_http() {
    let policy = NavigationPolicy::new(false);
    assert_eq!(policy.decide(&url("http://example.com/")), NavigationDecision::Allow);
}

#[test]
fn test_make_https_rule_upgrades_when_toggle_off() {
    let rules = compile_rules(
        r#"[{"trigger": {"url-filter": "legacy\\.example"}, "action": {"type": "make-https"}}]"#,
    )
    .unwrap();
    let policy = NavigationPolicy::new(false).with_rules(Some(Arc::new(rules)));

    assert_eq!(
        policy.decide(&url("http://legacy.example/")),
        NavigationDecision::Upgrade(url("https://legacy.example/"))
    );
    assert_eq!(policy.decide(&url("http://other.example/")), NavigationDecision::Allow);
}

#[test]
fn test_document_block_rule_blocks_navigation() {
    let rules = compile_rules(
        r#"[{"trigger": {"url-filter": "malware", "resource-type": ["document"]}, "action": {"type": "block"}}]"#,
    )
    .unwrap();
    let mut policy = NavigationPolicy::new(true);
    policy.set_rules(Arc::new(rules));

    assert_eq!(policy.decide(&url("https://malware.test/")), NavigationDecision::Block);
    assert_eq!(policy.decide(&url("https://fine.test/")), NavigationDecision::Allow);
}

#[rstest]
#[case(Some("https://popup.example/"), true)]
#[case(Some("about:blank"), true)]
#[case(Some("javascript:alert(1)"), false)]
#[case(None, false)]
fn test_popup_decision(#[case] target: Option<&str>, #[case] opens: bool) {
    let policy = NavigationPolicy::default();
    let target = target.map(url);
    let decision = policy.on_popup(target.as_ref(), None);
    match (decision, target) {
        (PopupDecision::OpenInNewTab(opened), Some(target)) => {
            assert!(opens);
            assert_eq!(opened, target);
        }
        (PopupDecision::Ignore, _) => assert!(!opens),
        (decision, target) => panic!("unexpected {:?} for {:?}", decision, target),
    }
}

#[rstest]
#[case("https://www.facebook.com/", "https://www.facebook.com/ad", true)]
#[case("https://ads.doubleclick.net/", "https://a.example/", true)]
#[case("https://news.example/", "https://www.facebook.com/ad", false)]
#[case("https://news.example/", "https://a.example/", false)]
fn test_popup_rule_matches_opener_page(
    #[case] opener: &str,
    #[case] target: &str,
    #[case] blocked: bool,
) {
    let rules = compile_rules(BUILTIN_RULES_JSON).unwrap();
    let policy = NavigationPolicy::default().with_rules(Some(Arc::new(rules)));
    let expected = if blocked {
        PopupDecision::Block
    } else {
        PopupDecision::OpenInNewTab(url(target))
    };
    assert_eq!(policy.on_popup(Some(&url(target)), Some(&url(opener))), expected);
}

// === Registry integration ===

#[tokio::test]
async fn test_popup_from_blocked_opener_opens_nothing() {
    let engine = HeadlessEngine::new();
    let mut mgr = registry(&engine);
    let opener = mgr.start(Some(url("https://www.facebook.com/")));
    mgr.settle().await;
    assert!(mgr.policy().rules().is_some());

    let opened = mgr.handle_engine_event(EngineEvent::PopupRequested {
        tab: opener,
        url: Some(url("https://www.facebook.com/ad")),
    });

    assert!(opened.is_none());
    assert_eq!(mgr.tab_count(), 1);
    assert_eq!(mgr.active_tab_id(), Some(opener));
}

#[tokio::test]
async fn test_popup_from_allowed_opener_opens_tab_with_rules_loaded() {
    let engine = HeadlessEngine::new();
    let mut mgr = registry(&engine);
    let opener = mgr.start(Some(url("https://news.example/")));
    mgr.settle().await;
    assert!(mgr.policy().rules().is_some());

    let opened = mgr
        .handle_engine_event(EngineEvent::PopupRequested {
            tab: opener,
            url: Some(url("https://www.facebook.com/share")),
        })
        .unwrap();

    assert_eq!(mgr.tab_count(), 2);
    assert_eq!(mgr.active_tab_id(), Some(opened));
}

#[tokio::test]
async fn test_popup_opens_new_active_tab() {
    let engine = HeadlessEngine::new();
    let mut mgr = registry(&engine);
    let opener = mgr.add_tab(Some(url("https://a.example/")));

    let opened = mgr
        .handle_engine_event(EngineEvent::PopupRequested {
            tab: opener,
            url: Some(url("https://b.example/")),
        })
        .unwrap();

    assert_eq!(mgr.tab_count(), 2);
    assert_eq!(mgr.active_tab_id(), Some(opened));
    assert_eq!(mgr.tab(opened).unwrap().url, url("https://b.example/"));
    assert_eq!(mgr.tab(opener).unwrap().state, ViewState::Suspended);
}

#[tokio::test]
async fn test_popup_without_url_is_ignored() {
    let engine = HeadlessEngine::new();
    let mut mgr = registry(&engine);
    let opener = mgr.add_tab(None);

    let opened = mgr.handle_engine_event(EngineEvent::PopupRequested { tab: opener, url: None });
    assert!(opened.is_none());
    assert_eq!(mgr.tab_count(), 1);
}

#[tokio::test]
async fn test_navigation_finished_updates_tab() {
    let engine = HeadlessEngine::new();
    let mut mgr = registry(&engine);
    let id = mgr.add_tab(None);

    mgr.handle_engine_event(EngineEvent::NavigationFinished {
        tab: id,
        url: url("https://www.rust-lang.org/"),
        title: Some("Rust".to_string()),
    });
    mgr.handle_engine_event(EngineEvent::TitleChanged {
        tab: id,
        title: String::new(),
    });

    let tab = mgr.tab(id).unwrap();
    assert_eq!(tab.url, url("https://www.rust-lang.org/"));
    assert_eq!(tab.title, "Rust");
}

#[tokio::test]
async fn test_events_for_closed_tabs_are_ignored() {
    let engine = HeadlessEngine::new();
    let mut mgr = registry(&engine);
    mgr.add_tab(None);
    let gone = TabId::new();

    let opened = mgr.handle_engine_event(EngineEvent::NavigationFinished {
        tab: gone,
        url: url("https://example.com/"),
        title: None,
    });
    mgr.handle_engine_event(EngineEvent::TitleChanged {
        tab: gone,
        title: "Ghost".to_string(),
    });

    assert!(opened.is_none());
    assert_eq!(mgr.tab_count(), 1);
    assert!(mgr.tab(gone).is_none());
}

#[tokio::test]
async fn test_navigation_action_reissues_upgrade() {
    let engine = HeadlessEngine::new();
    let mut mgr = registry(&engine);
    let id = mgr.add_tab(Some(url("https://example.com/")));

    let decision = mgr.on_navigation_action(id, &url("http://example.com/next"));

    assert_eq!(decision, NavigationDecision::Upgrade(url("https://example.com/next")));
    assert_eq!(
        mgr.view(id).unwrap().current_url(),
        Some(&url("https://example.com/next"))
    );
    assert_eq!(mgr.tab(id).unwrap().url, url("https://example.com/next"));
}

#[tokio::test]
async fn test_navigate_active_upgrades_typed_http() {
    let engine = HeadlessEngine::new();
    let mut mgr = registry(&engine);
    let id = mgr.add_tab(None);

    mgr.navigate_active("http://example.com").unwrap();

    assert_eq!(mgr.tab(id).unwrap().url, url("https://example.com/"));
}

#[tokio::test]
async fn test_installed_rules_reach_view_policy() {
    let engine = HeadlessEngine::new();
    let mut mgr = registry(&engine);
    let id = mgr.add_tab(None);
    mgr.settle().await;

    let view = mgr.view(id).unwrap();
    let policy = &view.config().navigation_policy;
    assert!(policy.rules().is_some());
    assert!(policy.https_upgrade());
    assert!(view.bounds().width > 0.0);
}
