//! Search-suggest probe.
//!
//! `/search/suggest.json` nests results differently across themes and API
//! versions (`resources.results.products[]`, flat `products[]`, bare arrays).
//! Rather than model each layout, the response is walked and every handle
//! or product link found anywhere is collected.

use serde_json::Value;
use stockwatch_core::{ProductHandle, StorefrontOrigin};

use super::{dedupe_handles, or_empty};
use crate::client::StorefrontClient;
use crate::error::ScraperError;

const RESULT_LIMIT: &str = "10";
const LINK_KEYS: [&str; 3] = ["url", "link", "href"];

/// Queries the suggest endpoint once per keyword and unions the handles.
pub(super) async fn product_handles(
    client: &StorefrontClient,
    origin: &StorefrontOrigin,
    keywords: &[String],
) -> Vec<ProductHandle> {
    let mut handles = Vec::new();
    for keyword in keywords {
        handles.extend(or_empty(
            query(client, origin, keyword).await,
            origin,
            "search suggest",
        ));
    }
    dedupe_handles(handles)
}

async fn query(
    client: &StorefrontClient,
    origin: &StorefrontOrigin,
    keyword: &str,
) -> Result<Vec<ProductHandle>, ScraperError> {
    let base = origin.join("/search/suggest.json");
    let mut url = reqwest::Url::parse(&base).map_err(|e| ScraperError::InvalidShopUrl {
        shop_url: origin.to_string(),
        reason: format!("\"{base}\" is not a valid URL: {e}"),
    })?;
    url.query_pairs_mut()
        .append_pair("q", keyword)
        .append_pair("resources[type]", "product")
        .append_pair("resources[limit]", RESULT_LIMIT);

    let body: Value = client.get_json(url.as_str()).await?;
    let mut handles = Vec::new();
    collect_suggest_handles(&body, &mut handles);
    Ok(handles)
}

/// Walks a suggest response and pushes every product handle it can find:
/// `handle` string fields, and `url`/`link`/`href` values that contain a
/// `/products/<slug>` path.
pub fn collect_suggest_handles(value: &Value, out: &mut Vec<ProductHandle>) {
    match value {
        Value::Object(map) => {
            if let Some(handle) = map
                .get("handle")
                .and_then(Value::as_str)
                .and_then(ProductHandle::normalize)
            {
                out.push(handle);
            }
            for key in LINK_KEYS {
                if let Some(handle) = map
                    .get(key)
                    .and_then(Value::as_str)
                    .and_then(ProductHandle::from_product_url)
                {
                    out.push(handle);
                }
            }
            for child in map.values() {
                if child.is_object() || child.is_array() {
                    collect_suggest_handles(child, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_suggest_handles(item, out);
            }
        }
        _ => {}
    }
}
