//! Serde model of the content-blocker rule source.
//!
//! The format mirrors the WebKit content-blocker JSON: a list of
//! `{ "trigger": {...}, "action": {...} }` objects.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub trigger: TriggerSpec,
    pub action: ActionSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TriggerSpec {
    pub url_filter: String,
    #[serde(default)]
    pub url_filter_is_case_sensitive: bool,
    #[serde(default)]
    pub resource_type: Vec<ResourceType>,
    #[serde(default)]
    pub load_type: Vec<LoadType>,
    #[serde(default)]
    pub if_domain: Vec<String>,
    #[serde(default)]
    pub unless_domain: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Block,
    BlockCookies,
    CssDisplayNone,
    IgnorePreviousRules,
    MakeHttps,
}

/// Kind of resource a request loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    Document,
    Image,
    StyleSheet,
    Script,
    Font,
    Raw,
    SvgDocument,
    Media,
    Popup,
    Ping,
    Fetch,
    Websocket,
    Frame,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadType {
    FirstParty,
    ThirdParty,
}

/// Outcome of running a request through the compiled rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuleVerdict {
    pub block: bool,
    pub make_https: bool,
}
