//! Turns address-bar text into a URL.
//!
//! Text that already names an `http`/`https` URL is used as-is. Text with
//! whitespace or without a dot is a search query; anything else is treated as
//! a hostname and given the `https` scheme.

use url::Url;

use crate::types::errors::AddressError;
use crate::types::settings::{GeneralSettings, START_PAGE_URL};

/// Resolves `input` against the configured search and start pages.
pub fn resolve_address(input: &str, general: &GeneralSettings) -> Result<Url, AddressError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(new_tab_url(general));
    }

    let lower = input.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("about:") {
        if let Ok(url) = Url::parse(input) {
            return Ok(url);
        }
    }

    if !looks_like_query(input) {
        if let Ok(url) = Url::parse(&format!("https://{}", input)) {
            return Ok(url);
        }
    }

    search_url(input, general)
}

/// Whitespace or a missing dot means the user typed words, not a host.
pub fn looks_like_query(input: &str) -> bool {
    input.chars().any(char::is_whitespace) || !input.contains('.')
}

/// Builds the search-engine URL for `query`.
pub fn search_url(query: &str, general: &GeneralSettings) -> Result<Url, AddressError> {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    Url::parse(&format!("{}{}", general.search_url, encoded))
        .map_err(|e| AddressError::InvalidSearchUrl(format!("{}: {}", general.search_url, e)))
}

/// URL given to a tab opened without one.
pub fn new_tab_url(general: &GeneralSettings) -> Url {
    Url::parse(&general.new_tab_url)
        .or_else(|_| Url::parse(START_PAGE_URL))
        .expect("START_PAGE_URL is a valid URL")
}
