//! Collection-page scrape: product hrefs from `/collections/all`.

use std::sync::LazyLock;

use regex::Regex;
use stockwatch_core::{ProductHandle, StorefrontOrigin};

use super::{dedupe_handles, LOCALE_PREFIXES};
use crate::client::{same_host, StorefrontClient};

static PRODUCT_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href\s*=\s*["']([^"']*/products/[^"']+)["']"#).expect("valid regex")
});

/// Scrapes the default collection page, then its locale-prefixed variants,
/// stopping at the first page that links to any product.
pub(super) async fn product_handles(
    client: &StorefrontClient,
    origin: &StorefrontOrigin,
) -> Vec<ProductHandle> {
    let paths = std::iter::once("/collections/all".to_owned()).chain(
        LOCALE_PREFIXES
            .iter()
            .map(|locale| format!("/{locale}/collections/all")),
    );

    for path in paths {
        let url = origin.join(&path);
        let page = match client.get_page(&url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::debug!(origin = %origin, url = %url, error = %e, "collection page unavailable");
                continue;
            }
        };
        let handles = extract_product_hrefs(&page.body, origin);
        if !handles.is_empty() {
            return handles;
        }
    }
    Vec::new()
}

/// Extracts product handles from `href` attributes that point at
/// `/products/<slug>` on this storefront. Absolute links to other hosts are
/// skipped.
#[must_use]
pub fn extract_product_hrefs(html: &str, origin: &StorefrontOrigin) -> Vec<ProductHandle> {
    let handles = PRODUCT_HREF
        .captures_iter(html)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .filter(|href| {
            let absolute = href.starts_with("http://") || href.starts_with("https://");
            !absolute || same_host(origin.as_str(), href)
        })
        .filter_map(ProductHandle::from_product_url)
        .collect();
    dedupe_handles(handles)
}
