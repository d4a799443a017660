use stockwatch_core::{ProductSnapshot, StorefrontOrigin};

use crate::client::StorefrontClient;
use crate::error::ScraperError;
use crate::normalize::normalize_product;
use crate::types::ProductsResponse;

/// Fetches one bounded page of the canonical bulk listing.
///
/// Products that fail to normalize are skipped; the listing itself only
/// fails on transport or body errors.
pub(super) async fn fetch_listing(
    client: &StorefrontClient,
    origin: &StorefrontOrigin,
    page_size: u32,
) -> Result<Vec<ProductSnapshot>, ScraperError> {
    let url = origin.join(&format!("/products.json?limit={page_size}"));
    let response: ProductsResponse = client.get_json(&url).await?;

    Ok(response
        .products
        .iter()
        .filter_map(|raw| match normalize_product(raw, None) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::debug!(origin = %origin, error = %e, "skipping unparseable listing entry");
                None
            }
        })
        .collect())
}
