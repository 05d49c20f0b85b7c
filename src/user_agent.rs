//! Header values shared by page, listing and media requests.
//!
//! The site serves its embedded page state only to browser-looking clients,
//! so every request identifies as a desktop browser.

/// Browser User-Agent sent with every request.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// `Accept` header for HTML page fetches.
pub(crate) const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// `Accept` header for listing-endpoint queries.
pub(crate) const ACCEPT_JSON: &str = "application/json, text/javascript, */*; q=0.01";

/// `Accept` header for media downloads.
pub(crate) const ACCEPT_MEDIA: &str = "image/webp,image/*,*/*;q=0.8";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_looks_like_a_browser() {
        assert!(BROWSER_USER_AGENT.starts_with("Mozilla/5.0"));
        assert!(BROWSER_USER_AGENT.contains("Chrome"));
        assert!(!BROWSER_USER_AGENT.contains("  "), "continuation must not leave double spaces");
    }

    #[test]
    fn test_accept_headers_prefer_expected_types() {
        assert!(ACCEPT_HTML.starts_with("text/html"));
        assert!(ACCEPT_JSON.starts_with("application/json"));
        assert!(ACCEPT_MEDIA.contains("image/*"));
    }
}
