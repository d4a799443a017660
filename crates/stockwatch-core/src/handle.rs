//! Canonical product handles.
//!
//! The same product reaches us as `"Blue-Vinyl"` from a sitemap,
//! `"blue%2Dvinyl"` from an href and `"blue-vinyl"` from the JSON API. State
//! keys must not fork on those differences, so every source funnels through
//! [`ProductHandle::normalize`].

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

/// Characters escaped when a handle is placed in a URL path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Lower-cased, URL-decoded product slug, unique within one origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductHandle(String);

impl ProductHandle {
    /// Decodes percent-escapes, trims slashes and whitespace, and lower-cases.
    ///
    /// Returns `None` when nothing is left.
    #[must_use]
    pub fn normalize(raw: &str) -> Option<Self> {
        let decoded = percent_decode_str(raw.trim()).decode_utf8_lossy();
        let cleaned = decoded.trim().trim_matches('/').trim().to_lowercase();
        if cleaned.is_empty() {
            None
        } else {
            Some(Self(cleaned))
        }
    }

    /// Handle substitute for products that do not expose a slug.
    #[must_use]
    pub fn from_product_id(id: &str) -> Option<Self> {
        Self::normalize(id)
    }

    /// Extracts the handle from a product URL or path such as
    /// `https://shop.example.com/en/products/blue-vinyl?variant=1`.
    ///
    /// Returns `None` when the URL has no `/products/<slug>` segment.
    #[must_use]
    pub fn from_product_url(url: &str) -> Option<Self> {
        let (_, after) = url.split_once("/products/")?;
        let slug = after
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();
        let slug = slug
            .strip_suffix(".json")
            .or_else(|| slug.strip_suffix(".js"))
            .unwrap_or(slug);
        Self::normalize(slug)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The handle re-encoded for use as one URL path segment.
    #[must_use]
    pub fn path_segment(&self) -> String {
        utf8_percent_encode(&self.0, PATH_SEGMENT).to_string()
    }
}

impl fmt::Display for ProductHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
