//! Content-Filter Loader for QuietBrowser.
//!
//! Compiles the static block-rule list into [`CompiledRules`] once per process
//! and hands the cached artifact to every view created afterwards. Compilation
//! runs on the blocking pool; a failure is logged and leaves tabs unfiltered.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use tracing::{debug, info, warn};
use url::Url;

use crate::managers::completion::{Completion, Mailbox};
use crate::types::errors::FilterError;
use crate::types::rules::{ActionKind, LoadType, ResourceType, RuleSpec, RuleVerdict};
use crate::types::tab::{RequestToken, TabId};

/// Rule list shipped with the browser.
pub const BUILTIN_RULES_JSON: &str = include_str!("../../resources/content_rules.json");

#[derive(Debug, Clone)]
struct DomainPattern {
    domain: String,
    include_subdomains: bool,
}

impl DomainPattern {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_ascii_lowercase();
        match raw.strip_prefix('*') {
            Some(rest) => Self {
                domain: rest.trim_start_matches('.').to_string(),
                include_subdomains: true,
            },
            None => Self {
                domain: raw,
                include_subdomains: false,
            },
        }
    }

    fn matches(&self, host: &str) -> bool {
        host == self.domain
            || (self.include_subdomains && host.ends_with(&format!(".{}", self.domain)))
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    url_filter: Regex,
    resource_types: Vec<ResourceType>,
    load_types: Vec<LoadType>,
    if_domain: Vec<DomainPattern>,
    unless_domain: Vec<DomainPattern>,
    action: ActionKind,
    selector: Option<String>,
}

impl CompiledRule {
    fn matches(&self, url: &Url, document: Option<&Url>, resource: ResourceType) -> bool {
        if !self.resource_types.is_empty() && !self.resource_types.contains(&resource) {
            return false;
        }
        if !self.load_types.is_empty() && !self.load_types.contains(&load_type(url, document)) {
            return false;
        }
        if !self.applies_to_page(document.unwrap_or(url).host_str().unwrap_or("")) {
            return false;
        }
        self.url_filter.is_match(url.as_str())
    }

    fn applies_to_page(&self, page_host: &str) -> bool {
        let page_host = page_host.to_ascii_lowercase();
        if !self.if_domain.is_empty() {
            return self.if_domain.iter().any(|d| d.matches(&page_host));
        }
        !self.unless_domain.iter().any(|d| d.matches(&page_host))
    }
}

fn load_type(url: &Url, document: Option<&Url>) -> LoadType {
    let (Some(host), Some(page)) = (url.host_str(), document.and_then(|d| d.host_str())) else {
        return LoadType::FirstParty;
    };
    let same_site = host == page
        || host.ends_with(&format!(".{}", page))
        || page.ends_with(&format!(".{}", host));
    if same_site {
        LoadType::FirstParty
    } else {
        LoadType::ThirdParty
    }
}

/// Engine-consumable form of the rule list.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    rules: Vec<CompiledRule>,
}

impl CompiledRules {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Runs a request through the rules in order.
    ///
    /// `document` is the page that issued the request; `None` for main-frame
    /// navigations, where the request URL itself is the page.
    pub fn evaluate(&self, url: &Url, document: Option<&Url>, resource: ResourceType) -> RuleVerdict {
        let mut verdict = RuleVerdict::default();
        for rule in self.rules.iter().filter(|r| r.matches(url, document, resource)) {
            match rule.action {
                ActionKind::Block => verdict.block = true,
                ActionKind::MakeHttps => verdict.make_https = true,
                ActionKind::IgnorePreviousRules => verdict = RuleVerdict::default(),
                ActionKind::BlockCookies | ActionKind::CssDisplayNone => {}
            }
        }
        verdict
    }

    /// Script hiding the elements named by `css-display-none` rules, or `None`
    /// when the list has no cosmetic rules.
    ///
    /// Domain-scoped selectors are guarded by a hostname check in the page.
    pub fn cosmetic_script(&self) -> Option<String> {
        let cosmetic: Vec<&CompiledRule> = self
            .rules
            .iter()
            .filter(|r| r.action == ActionKind::CssDisplayNone && r.selector.is_some())
            .collect();
        if cosmetic.is_empty() {
            return None;
        }

        let mut js = String::from(
            "(function(){var h=location.hostname.toLowerCase();\
             function m(d,s){return h===d||(s&&h.slice(-d.length-1)==='.'+d);}\
             var s=[];",
        );
        for rule in cosmetic {
            let selector = serde_json::to_string(rule.selector.as_deref().unwrap_or_default())
                .unwrap_or_else(|_| "\"\"".to_string());
            let guard = domain_guard(&rule.if_domain, &rule.unless_domain);
            if guard.is_empty() {
                js.push_str(&format!("s.push({});", selector));
            } else {
                js.push_str(&format!("if({})s.push({});", guard, selector));
            }
        }
        js.push_str(
            "if(!s.length)return;var e=document.createElement('style');\
             e.textContent=s.join(',')+'{display:none!important}';\
             (document.head||document.documentElement).appendChild(e);})();",
        );
        Some(js)
    }
}

fn domain_guard(if_domain: &[DomainPattern], unless_domain: &[DomainPattern]) -> String {
    let call = |d: &DomainPattern| {
        format!(
            "m({},{})",
            serde_json::to_string(&d.domain).unwrap_or_else(|_| "\"\"".to_string()),
            d.include_subdomains
        )
    };
    if !if_domain.is_empty() {
        let any: Vec<String> = if_domain.iter().map(call).collect();
        format!("({})", any.join("||"))
    } else if !unless_domain.is_empty() {
        let any: Vec<String> = unless_domain.iter().map(call).collect();
        format!("!({})", any.join("||"))
    } else {
        String::new()
    }
}

/// Parses and compiles a JSON rule list. Any invalid rule fails the whole list.
pub fn compile_rules(source: &str) -> Result<CompiledRules, FilterError> {
    let specs: Vec<RuleSpec> =
        serde_json::from_str(source).map_err(|e| FilterError::Parse(e.to_string()))?;

    let mut rules = Vec::with_capacity(specs.len());
    for (index, spec) in specs.into_iter().enumerate() {
        let trigger = spec.trigger;
        if trigger.url_filter.is_empty() {
            return Err(FilterError::InvalidRule {
                index,
                message: "url-filter must not be empty".to_string(),
            });
        }
        if !trigger.if_domain.is_empty() && !trigger.unless_domain.is_empty() {
            return Err(FilterError::InvalidRule {
                index,
                message: "if-domain and unless-domain are mutually exclusive".to_string(),
            });
        }
        if spec.action.kind == ActionKind::CssDisplayNone && spec.action.selector.is_none() {
            return Err(FilterError::InvalidRule {
                index,
                message: "css-display-none requires a selector".to_string(),
            });
        }

        let url_filter = RegexBuilder::new(&trigger.url_filter)
            .case_insensitive(!trigger.url_filter_is_case_sensitive)
            .build()
            .map_err(|e| FilterError::InvalidUrlFilter {
                index,
                message: e.to_string(),
            })?;

        rules.push(CompiledRule {
            url_filter,
            resource_types: trigger.resource_type,
            load_types: trigger.load_type,
            if_domain: trigger.if_domain.iter().map(|d| DomainPattern::parse(d)).collect(),
            unless_domain: trigger.unless_domain.iter().map(|d| DomainPattern::parse(d)).collect(),
            action: spec.action.kind,
            selector: spec.action.selector,
        });
    }

    Ok(CompiledRules { rules })
}

enum CompileState {
    Idle,
    Compiling(RequestToken),
    Ready(Arc<CompiledRules>),
}

/// Process-scoped rule cache. Constructed once at startup and shared by
/// reference with whatever creates views.
pub struct ContentFilterLoader {
    source: Arc<str>,
    state: RefCell<CompileState>,
    next_token: Cell<u64>,
}

impl ContentFilterLoader {
    /// Loader over the built-in rule list.
    pub fn new() -> Self {
        Self::with_source(BUILTIN_RULES_JSON)
    }

    pub fn with_source(source: impl Into<String>) -> Self {
        Self {
            source: Arc::from(source.into()),
            state: RefCell::new(CompileState::Idle),
            next_token: Cell::new(0),
        }
    }

    pub fn cached(&self) -> Option<Arc<CompiledRules>> {
        match &*self.state.borrow() {
            CompileState::Ready(rules) => Some(rules.clone()),
            _ => None,
        }
    }

    pub fn is_compiling(&self) -> bool {
        matches!(&*self.state.borrow(), CompileState::Compiling(_))
    }

    /// Starts a background compile unless one is running or the rules are
    /// cached. The result arrives as [`Completion::RulesCompiled`].
    ///
    /// Returns true if a compile was started.
    pub fn request(&self, requested_by: Option<TabId>, mailbox: &Mailbox) -> bool {
        if !matches!(&*self.state.borrow(), CompileState::Idle) {
            return false;
        }

        let token = RequestToken(self.next_token.get() + 1);
        self.next_token.set(token.0);
        *self.state.borrow_mut() = CompileState::Compiling(token);
        debug!(?requested_by, token = token.0, "compiling content rules");

        let source = self.source.clone();
        let mailbox = mailbox.clone();
        mailbox.expect_completion();
        let runtime = mailbox.runtime().clone();
        runtime.spawn(async move {
            let result = tokio::task::spawn_blocking(move || compile_rules(&source))
                .await
                .unwrap_or_else(|e| Err(FilterError::Aborted(e.to_string())));
            mailbox.post(Completion::RulesCompiled {
                requested_by,
                token,
                result,
            });
        });
        true
    }

    /// Applies a compile result delivered through the mailbox. Returns the
    /// cached rules, if any, after applying it.
    pub fn finish(
        &self,
        token: RequestToken,
        result: Result<CompiledRules, FilterError>,
    ) -> Option<Arc<CompiledRules>> {
        let current = match &*self.state.borrow() {
            CompileState::Compiling(t) => Some(*t),
            _ => None,
        };
        if current != Some(token) {
            debug!(token = token.0, "stale rule compilation result discarded");
            return self.cached();
        }

        match result {
            Ok(rules) => {
                info!(rules = rules.len(), "content rules compiled");
                let rules = Arc::new(rules);
                *self.state.borrow_mut() = CompileState::Ready(rules.clone());
                Some(rules)
            }
            Err(e) => {
                warn!("content rule compilation failed, browsing unfiltered: {}", e);
                *self.state.borrow_mut() = CompileState::Idle;
                None
            }
        }
    }

    /// Returns the compiled rules, compiling them first if needed.
    pub async fn get_rules(&self) -> Option<Arc<CompiledRules>> {
        if let Some(rules) = self.cached() {
            return Some(rules);
        }

        let source = self.source.clone();
        let result = tokio::task::spawn_blocking(move || compile_rules(&source))
            .await
            .unwrap_or_else(|e| Err(FilterError::Aborted(e.to_string())));

        match result {
            Ok(rules) => {
                let rules = Arc::new(rules);
                let mut state = self.state.borrow_mut();
                if let CompileState::Ready(existing) = &*state {
                    return Some(existing.clone());
                }
                // A mailbox compile in flight will install its own result.
                if matches!(*state, CompileState::Idle) {
                    info!(rules = rules.len(), "content rules compiled");
                    *state = CompileState::Ready(rules.clone());
                }
                Some(rules)
            }
            Err(e) => {
                warn!("content rule compilation failed, browsing unfiltered: {}", e);
                None
            }
        }
    }
}

impl Default for ContentFilterLoader {
    fn default() -> Self {
        Self::new()
    }
}
