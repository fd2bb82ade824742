use std::sync::Arc;

use quietbrowser::managers::completion::{Completion, Mailbox};
use quietbrowser::services::content_filter::{compile_rules, ContentFilterLoader, BUILTIN_RULES_JSON};
use quietbrowser::types::errors::FilterError;
use quietbrowser::types::rules::{ResourceType, RuleVerdict};
use quietbrowser::types::tab::RequestToken;
use rstest::rstest;
use tokio::runtime::Handle;
use url::Url;

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

fn verdict(rules_json: &str, request: &str, page: Option<&str>, resource: ResourceType) -> RuleVerdict {
    let rules = compile_rules(rules_json).unwrap();
    let page = page.map(url);
    rules.evaluate(&url(request), page.as_ref(), resource)
}

// === Built-in list ===

#[test]
fn test_builtin_rules_compile() {
    let rules = compile_rules(BUILTIN_RULES_JSON).unwrap();
    assert_eq!(rules.len(), 2);
    assert!(rules.cosmetic_script().is_none());
}

#[rstest]
#[case("https://ad.doubleclick.net/pixel.gif", Some("https://ad.doubleclick.net/"), ResourceType::Image, true)]
#[case("https://www.facebook.com/tr.js", Some("https://www.facebook.com/"), ResourceType::Script, true)]
#[case("https://www.facebook.com/font.woff", Some("https://www.facebook.com/"), ResourceType::Font, false)]
#[case("https://news.example.com/banner.png", Some("https://news.example.com/"), ResourceType::Image, true)]
#[case("https://news.example.com/ads/frame.html", Some("https://news.example.com/"), ResourceType::Frame, true)]
#[case("https://news.example.com/app.js", Some("https://news.example.com/"), ResourceType::Script, false)]
#[case("https://ads.example.com/", None, ResourceType::Document, false)]
fn test_builtin_rule_decisions(
    #[case] request: &str,
    #[case] page: Option<&str>,
    #[case] resource: ResourceType,
    #[case] blocked: bool,
) {
    assert_eq!(verdict(BUILTIN_RULES_JSON, request, page, resource).block, blocked);
}

// === Trigger fields ===

#[test]
fn test_url_filter_is_case_insensitive_by_default() {
    let json = r#"[{"trigger": {"url-filter": "tracker"}, "action": {"type": "block"}}]"#;
    assert!(verdict(json, "https://a.com/TRACKER.js", None, ResourceType::Script).block);

    let sensitive = r#"[{"trigger": {"url-filter": "tracker", "url-filter-is-case-sensitive": true}, "action": {"type": "block"}}]"#;
    assert!(!verdict(sensitive, "https://a.com/TRACKER.js", None, ResourceType::Script).block);
}

#[test]
fn test_ignore_previous_rules_resets_verdict() {
    let json = r#"[
        {"trigger": {"url-filter": ".*"}, "action": {"type": "block"}},
        {"trigger": {"url-filter": ".*", "if-domain": ["trusted.org"]}, "action": {"type": "ignore-previous-rules"}}
    ]"#;
    let page = Some("https://trusted.org/");
    assert!(!verdict(json, "https://trusted.org/a.js", page, ResourceType::Script).block);
    assert!(verdict(json, "https://other.org/a.js", Some("https://other.org/"), ResourceType::Script).block);
}

#[test]
fn test_make_https_action() {
    let json = r#"[{"trigger": {"url-filter": "^http://legacy\\."}, "action": {"type": "make-https"}}]"#;
    let v = verdict(json, "http://legacy.example/", None, ResourceType::Document);
    assert!(v.make_https);
    assert!(!v.block);
}

#[test]
fn test_unless_domain_exempts_page() {
    let json = r#"[{"trigger": {"url-filter": "\\.js$", "unless-domain": ["*example.com"]}, "action": {"type": "block"}}]"#;
    assert!(!verdict(json, "https://cdn.net/a.js", Some("https://www.example.com/"), ResourceType::Script).block);
    assert!(verdict(json, "https://cdn.net/a.js", Some("https://other.com/"), ResourceType::Script).block);
}

#[test]
fn test_load_type_third_party() {
    let json = r#"[{"trigger": {"url-filter": ".*", "load-type": ["third-party"]}, "action": {"type": "block"}}]"#;
    let page = Some("https://example.com/");
    assert!(!verdict(json, "https://static.example.com/a.js", page, ResourceType::Script).block);
    assert!(verdict(json, "https://tracker.net/a.js", page, ResourceType::Script).block);
}

#[test]
fn test_block_cookies_does_not_block_load() {
    let json = r#"[{"trigger": {"url-filter": ".*"}, "action": {"type": "block-cookies"}}]"#;
    assert_eq!(
        verdict(json, "https://a.com/", None, ResourceType::Document),
        RuleVerdict::default()
    );
}

// === Invalid lists ===

#[test]
fn test_invalid_json_is_parse_error() {
    assert!(matches!(compile_rules("not json"), Err(FilterError::Parse(_))));
}

#[test]
fn test_invalid_regex_reports_rule_index() {
    let json = r#"[
        {"trigger": {"url-filter": "ok"}, "action": {"type": "block"}},
        {"trigger": {"url-filter": "(unclosed"}, "action": {"type": "block"}}
    ]"#;
    assert!(matches!(
        compile_rules(json),
        Err(FilterError::InvalidUrlFilter { index: 1, .. })
    ));
}

#[rstest]
#[case(r#"[{"trigger": {"url-filter": ""}, "action": {"type": "block"}}]"#)]
#[case(r#"[{"trigger": {"url-filter": ".*", "if-domain": ["a.com"], "unless-domain": ["b.com"]}, "action": {"type": "block"}}]"#)]
#[case(r#"[{"trigger": {"url-filter": ".*"}, "action": {"type": "css-display-none"}}]"#)]
fn test_structurally_invalid_rules(#[case] json: &str) {
    assert!(matches!(
        compile_rules(json),
        Err(FilterError::InvalidRule { index: 0, .. })
    ));
}

// === Cosmetic rules ===

#[test]
fn test_cosmetic_script_collects_selectors() {
    let json = r##"[
        {"trigger": {"url-filter": ".*"}, "action": {"type": "css-display-none", "selector": ".ad-slot"}},
        {"trigger": {"url-filter": ".*", "if-domain": ["*news.com"]}, "action": {"type": "css-display-none", "selector": "#promo"}}
    ]"##;
    let script = compile_rules(json).unwrap().cosmetic_script().unwrap();
    assert!(script.contains("s.push(\".ad-slot\")"));
    assert!(script.contains("if((m(\"news.com\",true)))s.push(\"#promo\")"));
    assert!(script.contains("display:none!important"));
}

// === Loader ===

#[tokio::test]
async fn test_get_rules_caches_artifact() {
    let loader = ContentFilterLoader::new();
    let first = loader.get_rules().await.unwrap();
    let second = loader.get_rules().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first, &loader.cached().unwrap()));
}

#[tokio::test]
async fn test_get_rules_failure_is_not_cached() {
    let loader = ContentFilterLoader::with_source("not json");
    assert!(loader.get_rules().await.is_none());
    assert!(loader.cached().is_none());
    assert!(loader.get_rules().await.is_none());
}

#[tokio::test]
async fn test_requests_coalesce_into_one_compile() {
    let loader = ContentFilterLoader::new();
    let (mailbox, mut inbox) = Mailbox::channel(Handle::current());

    assert!(loader.request(None, &mailbox));
    assert!(!loader.request(None, &mailbox));
    assert!(loader.is_compiling());
    assert_eq!(inbox.outstanding(), 1);

    let Some(Completion::RulesCompiled { token, result, .. }) = inbox.next().await else {
        panic!("expected a rule compilation result");
    };
    let rules = loader.finish(token, result).unwrap();
    assert!(Arc::ptr_eq(&rules, &loader.cached().unwrap()));
    assert!(!loader.request(None, &mailbox));
    assert_eq!(inbox.outstanding(), 0);
}

#[tokio::test]
async fn test_stale_compile_result_is_ignored() {
    let loader = ContentFilterLoader::new();
    let (mailbox, mut inbox) = Mailbox::channel(Handle::current());
    loader.request(None, &mailbox);

    let Some(Completion::RulesCompiled { token, result, .. }) = inbox.next().await else {
        panic!("expected a rule compilation result");
    };
    assert!(loader.finish(RequestToken(token.0 + 5), result).is_none());
    assert!(loader.is_compiling());
    assert!(loader.cached().is_none());
}

#[tokio::test]
async fn test_failed_compile_allows_retry() {
    let loader = ContentFilterLoader::with_source("[{\"trigger\": {}}]");
    let (mailbox, mut inbox) = Mailbox::channel(Handle::current());
    assert!(loader.request(None, &mailbox));

    let Some(Completion::RulesCompiled { token, result, .. }) = inbox.next().await else {
        panic!("expected a rule compilation result");
    };
    assert!(result.is_err());
    assert!(loader.finish(token, result).is_none());
    assert!(!loader.is_compiling());
    assert!(loader.request(None, &mailbox));
}
