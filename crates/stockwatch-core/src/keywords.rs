//! Keyword gate deciding which discovered products are tracked at all.

use crate::ProductSnapshot;

/// Case-insensitive substring matcher over a product's title, category and
/// tags.
#[derive(Debug, Clone, Default)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
}

impl KeywordMatcher {
    /// Builds a matcher, dropping blank entries and lower-casing the rest.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Returns `true` iff any keyword occurs in the product's text fields.
    /// An empty matcher matches nothing.
    #[must_use]
    pub fn wanted(&self, product: &ProductSnapshot) -> bool {
        if self.keywords.is_empty() {
            return false;
        }
        let haystack = format!(
            "{} {} {}",
            product.title,
            product.product_type,
            product.tags.join(" ")
        )
        .to_lowercase();
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }
}
