use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ProductHandle, StorefrontOrigin};

/// A product as seen in one discovery cycle, already normalized from
/// whichever upstream shape it arrived in.
///
/// Snapshots are rebuilt every cycle and never mutated in place; the last one
/// seen is cached in the state store so a product that disappears can still be
/// rendered in its "removed" notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Storefront product id, kept as a string so numeric and opaque ids
    /// share one representation.
    pub id: String,
    pub title: String,
    pub handle: ProductHandle,
    /// Image URLs in storefront order. May be empty.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    /// Category string; empty when the storefront does not set one.
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Plain-text product description with markup removed.
    #[serde(default)]
    pub description: String,
}

impl ProductSnapshot {
    /// A product is available when any of its variants is.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.variants.iter().any(|v| v.available)
    }

    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Canonical storefront page for this product.
    #[must_use]
    pub fn product_url(&self, origin: &StorefrontOrigin) -> String {
        origin.join(&format!("/products/{}", self.handle.path_segment()))
    }

    /// Lowest variant price, preferring available variants.
    #[must_use]
    pub fn display_price(&self) -> Option<&str> {
        let pick = |only_available: bool| {
            self.variants
                .iter()
                .filter(|v| !only_available || v.available)
                .min_by(|a, b| {
                    let a = a.price.parse::<f64>().unwrap_or(f64::MAX);
                    let b = b.price.parse::<f64>().unwrap_or(f64::MAX);
                    a.total_cmp(&b)
                })
                .map(|v| v.price.as_str())
        };
        pick(true).or_else(|| pick(false))
    }
}

/// A single purchasable variant of a [`ProductSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub title: String,
    /// Decimal string with exactly two fraction digits, e.g. `"24.99"`.
    pub price: String,
    pub available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(id: &str, price: &str, available: bool) -> Variant {
        Variant {
            id: id.to_owned(),
            title: "Default Title".to_owned(),
            price: price.to_owned(),
            available,
        }
    }

    fn snapshot(variants: Vec<Variant>) -> ProductSnapshot {
        ProductSnapshot {
            id: "1".to_owned(),
            title: "Blue Vinyl".to_owned(),
            handle: ProductHandle::normalize("blue-vinyl").unwrap(),
            images: vec!["https://cdn.example.com/a.jpg".to_owned()],
            variants,
            product_type: "Vinyl".to_owned(),
            tags: vec![],
            published_at: None,
            description: String::new(),
        }
    }

    #[test]
    fn availability_is_or_of_variants() {
        assert!(!snapshot(vec![]).is_available());
        assert!(!snapshot(vec![variant("1", "10.00", false)]).is_available());
        assert!(snapshot(vec![
            variant("1", "10.00", false),
            variant("2", "12.00", true)
        ])
        .is_available());
    }

    #[test]
    fn product_url_uses_origin_and_handle() {
        let origin = StorefrontOrigin::parse("https://shop.example.com/collections/all").unwrap();
        assert_eq!(
            snapshot(vec![]).product_url(&origin),
            "https://shop.example.com/products/blue-vinyl"
        );
    }

    #[test]
    fn product_url_escapes_handle() {
        let origin = StorefrontOrigin::parse("https://shop.example.com").unwrap();
        let mut product = snapshot(vec![]);
        product.handle = ProductHandle::normalize("Blue%20Vinyl").unwrap();
        assert_eq!(
            product.product_url(&origin),
            "https://shop.example.com/products/blue%20vinyl"
        );
    }

    #[test]
    fn display_price_prefers_cheapest_available() {
        let product = snapshot(vec![
            variant("1", "8.00", false),
            variant("2", "15.00", true),
            variant("3", "12.50", true),
        ]);
        assert_eq!(product.display_price(), Some("12.50"));
    }

    #[test]
    fn display_price_falls_back_to_any_variant() {
        let product = snapshot(vec![variant("1", "9.99", false)]);
        assert_eq!(product.display_price(), Some("9.99"));
    }

    #[test]
    fn snapshot_round_trips_through_json_with_missing_optionals() {
        let json = r#"{"id":"7","title":"CD","handle":"cd"}"#;
        let parsed: ProductSnapshot = serde_json::from_str(json).unwrap();
        assert!(parsed.variants.is_empty());
        assert!(parsed.published_at.is_none());
        assert_eq!(parsed.handle.as_str(), "cd");
    }
}
