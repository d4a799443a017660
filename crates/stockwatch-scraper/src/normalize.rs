//! Normalization from any plausible upstream product shape to
//! [`ProductSnapshot`].
//!
//! Storefront endpoints disagree on field names and units. Every shape goes
//! through [`normalize_product`], which applies these precedence rules:
//!
//! | Snapshot field | Source fields, first match wins |
//! |----------------|---------------------------------|
//! | envelope       | `product` object if present, else the value itself |
//! | `id`           | `id` (string or number) |
//! | `title`        | `title`, then `name` |
//! | `handle`       | `handle`, then the `/products/<slug>` of `url` or `link`, then the caller's handle, then `id` |
//! | `images`       | `images` (strings or `{src}`/`{url}` objects), then `image`, then `featured_image` |
//! | `product_type` | `product_type`, then `type` |
//! | `tags`         | array of strings or one comma-separated string |
//! | `published_at` | `published_at` as RFC 3339 |
//! | `description`  | `body_html`, then `description`, with tags removed and whitespace collapsed |
//!
//! Variant `price` is a string in major units (`"24.99"`), an integer in
//! minor units (`2499`, from the `.js` endpoint), or a float in major units.
//! All three normalize to a two-decimal string. A missing `available` is
//! treated as `false`; [`reports_availability`] tells callers whether the
//! body said anything at all. Products without a `variants` array but with a
//! top-level `price` or `available` (search-suggest results) get one
//! synthetic variant carrying the product id.
//!
//! Protocol-relative image URLs (`//cdn...`) get an `https:` scheme.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use stockwatch_core::{ProductHandle, ProductSnapshot, Variant};

use crate::error::ScraperError;

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Normalizes one product value into a [`ProductSnapshot`].
///
/// `fallback_handle` is the handle the caller requested, used when the body
/// carries neither a `handle` nor a product URL.
///
/// # Errors
///
/// Returns [`ScraperError::Normalization`] if the value is not an object, or
/// has neither an id nor any way to derive a handle.
pub fn normalize_product(
    raw: &Value,
    fallback_handle: Option<&ProductHandle>,
) -> Result<ProductSnapshot, ScraperError> {
    let product = match raw.get("product") {
        Some(inner @ Value::Object(_)) => inner,
        _ => raw,
    };
    let Some(obj) = product.as_object() else {
        return Err(ScraperError::Normalization {
            context: fallback_handle.map_or_else(|| "product".to_owned(), ToString::to_string),
            reason: "product body is not a JSON object".to_owned(),
        });
    };

    let id = obj.get("id").and_then(scalar_string);
    let handle = obj
        .get("handle")
        .and_then(Value::as_str)
        .and_then(ProductHandle::normalize)
        .or_else(|| {
            ["url", "link"]
                .iter()
                .filter_map(|key| obj.get(*key).and_then(Value::as_str))
                .find_map(ProductHandle::from_product_url)
        })
        .or_else(|| fallback_handle.cloned())
        .or_else(|| id.as_deref().and_then(ProductHandle::from_product_id));

    let Some(handle) = handle else {
        return Err(ScraperError::Normalization {
            context: "product".to_owned(),
            reason: "product has neither a handle nor an id".to_owned(),
        });
    };
    let id = id.unwrap_or_else(|| handle.to_string());

    let title = ["title", "name"]
        .iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map_or_else(|| handle.to_string(), str::to_owned);

    let variants = match obj.get("variants").and_then(Value::as_array) {
        Some(list) if !list.is_empty() => list.iter().filter_map(normalize_variant).collect(),
        _ => synthetic_variant(obj, &id).into_iter().collect(),
    };

    let product_type = ["product_type", "type"]
        .iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_owned();

    let published_at = obj
        .get("published_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(ProductSnapshot {
        id,
        title,
        handle,
        images: extract_images(obj),
        variants,
        product_type,
        tags: extract_tags(obj.get("tags")),
        published_at,
        description: extract_description(obj),
    })
}

/// Normalizes a price value to a two-decimal string.
///
/// Strings and floats are major units; integers are minor units and are
/// divided by 100. Returns `None` for anything that does not parse.
#[must_use]
pub fn normalize_price(value: &Value) -> Option<String> {
    let amount = match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok()?,
        Value::Number(n) => {
            if let Some(minor) = n.as_i64() {
                Decimal::new(minor, 2)
            } else if let Some(minor) = n.as_u64() {
                Decimal::from(minor) / Decimal::ONE_HUNDRED
            } else {
                Decimal::try_from(n.as_f64()?).ok()?
            }
        }
        _ => return None,
    };
    Some(format!("{:.2}", amount.round_dp(2)))
}

/// Whether a product body carries an explicit `available` flag, either on a
/// variant or at the top level.
///
/// The per-product `.json` endpoint omits it, so a body without one says
/// nothing about stock.
#[must_use]
pub fn reports_availability(raw: &Value) -> bool {
    let product = match raw.get("product") {
        Some(inner @ Value::Object(_)) => inner,
        _ => raw,
    };
    let has_flag = |v: &Value| v.get("available").is_some_and(Value::is_boolean);
    has_flag(product)
        || product
            .get("variants")
            .and_then(Value::as_array)
            .is_some_and(|list| list.iter().any(has_flag))
}

fn normalize_variant(raw: &Value) -> Option<Variant> {
    let obj = raw.as_object()?;
    let id = obj.get("id").and_then(scalar_string)?;
    Some(Variant {
        id,
        title: obj
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        price: obj
            .get("price")
            .and_then(normalize_price)
            .unwrap_or_else(|| "0.00".to_owned()),
        available: obj.get("available").and_then(Value::as_bool).unwrap_or(false),
    })
}

fn synthetic_variant(obj: &Map<String, Value>, product_id: &str) -> Option<Variant> {
    let price = obj.get("price").and_then(normalize_price);
    let available = obj.get("available").and_then(Value::as_bool);
    if price.is_none() && available.is_none() {
        return None;
    }
    Some(Variant {
        id: product_id.to_owned(),
        title: "Default Title".to_owned(),
        price: price.unwrap_or_else(|| "0.00".to_owned()),
        available: available.unwrap_or(false),
    })
}

fn extract_description(obj: &Map<String, Value>) -> String {
    ["body_html", "description"]
        .iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(|html| {
            MARKUP_TAG
                .replace_all(html, " ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

fn extract_images(obj: &Map<String, Value>) -> Vec<String> {
    if let Some(list) = obj.get("images").and_then(Value::as_array) {
        let images: Vec<String> = list.iter().filter_map(image_url).collect();
        if !images.is_empty() {
            return images;
        }
    }
    ["image", "featured_image"]
        .iter()
        .filter_map(|key| obj.get(*key))
        .find_map(image_url)
        .into_iter()
        .collect()
}

fn image_url(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.as_str(),
        Value::Object(o) => ["src", "url"]
            .iter()
            .find_map(|key| o.get(*key).and_then(Value::as_str))?,
        _ => return None,
    };
    let raw = raw.trim();
    if raw.is_empty() {
        None
    } else if raw.starts_with("//") {
        Some(format!("https:{raw}"))
    } else {
        Some(raw.to_owned())
    }
}

fn extract_tags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(list)) => list
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
