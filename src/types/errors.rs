use thiserror::Error;

// === TabError ===

/// Errors related to tab registry operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TabError {
    /// Tab with the given ID was not found.
    #[error("Tab not found: {0}")]
    NotFound(String),
    /// There is no active tab to act on.
    #[error("No active tab")]
    NoActiveTab,
    /// The active tab has no live view bound to it.
    #[error("Tab has no live view: {0}")]
    NoLiveView(String),
    /// The engine rejected an operation on the tab's view.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    /// Address-bar text could not be turned into a URL.
    #[error("Address error: {0}")]
    Address(#[from] AddressError),
}

// === EngineError ===

/// Errors reported by the embedded web engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine could not create a view.
    #[error("View creation failed: {0}")]
    ViewCreation(String),
    /// A load request was rejected.
    #[error("Load failed: {0}")]
    Load(String),
    /// A snapshot capture failed.
    #[error("Snapshot capture failed: {0}")]
    Snapshot(String),
    /// The view was released before the operation completed.
    #[error("View released")]
    ViewReleased,
    /// The engine does not support the requested operation.
    #[error("Unsupported engine operation: {0}")]
    Unsupported(String),
}

// === FilterError ===

/// Errors related to compiling the content-filter rule list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The rule source is not valid JSON for a rule list.
    #[error("Rule list parse error: {0}")]
    Parse(String),
    /// A rule has an invalid `url-filter` regular expression.
    #[error("Invalid url-filter in rule {index}: {message}")]
    InvalidUrlFilter { index: usize, message: String },
    /// A rule is structurally invalid.
    #[error("Invalid rule {index}: {message}")]
    InvalidRule { index: usize, message: String },
    /// The compile task did not finish.
    #[error("Rule compilation aborted: {0}")]
    Aborted(String),
}

// === SettingsError ===

/// Errors related to loading and saving settings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Settings I/O error: {0}")]
    IoError(String),
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

// === AddressError ===

/// Errors related to turning address-bar text into a URL.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The configured search URL prefix is not a valid URL.
    #[error("Invalid search URL: {0}")]
    InvalidSearchUrl(String),
}
