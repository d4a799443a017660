//! Storefront access-gate detection.

use std::sync::LazyLock;

use regex::Regex;
use stockwatch_core::StorefrontOrigin;

use crate::client::StorefrontClient;
use crate::error::ScraperError;

static PASSWORD_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(storefront_password|template-password|password-page|action\s*=\s*["'][^"']*/password["']|enter\s+using\s+password)"#,
    )
    .expect("valid regex")
});

/// Returns `true` when the storefront root is gated behind a visitor
/// password.
///
/// The root is fetched with redirects followed; a final URL under
/// `/password`, an HTTP 401, or any known password-page marker in the body
/// counts as protected.
///
/// # Errors
///
/// Propagates transport and status errors other than 401 so the caller can
/// skip the check for this cycle instead of recording a false state.
pub async fn check_access_state(
    client: &StorefrontClient,
    origin: &StorefrontOrigin,
) -> Result<bool, ScraperError> {
    match client.get_page(&origin.join("/")).await {
        Ok(page) => Ok(is_password_url(&page.final_url) || looks_password_protected(&page.body)),
        Err(ScraperError::UnexpectedStatus { status: 401, .. }) => Ok(true),
        Err(e) => Err(e),
    }
}

fn is_password_url(url: &str) -> bool {
    reqwest::Url::parse(url)
        .map(|u| u.path().trim_end_matches('/').ends_with("/password"))
        .unwrap_or(false)
}

/// Pattern-matches access-gate markers in a storefront page.
#[must_use]
pub fn looks_password_protected(html: &str) -> bool {
    PASSWORD_MARKERS.is_match(html)
}
