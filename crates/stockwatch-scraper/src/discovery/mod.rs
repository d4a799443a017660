//! Catalog discovery cascade.
//!
//! Strategies run strictly in [`Strategy::CASCADE`] order and the first one
//! that yields products wins. Every fetch inside a strategy is best-effort:
//! failures are logged at debug and count as "nothing found" for that step,
//! so a dead endpoint only ever moves the cascade along. When every strategy
//! comes up empty the catalog is empty, which callers must read as "nothing
//! to reconcile this cycle".

mod bulk;
mod collection;
mod sitemap;
mod suggest;

use std::collections::HashSet;
use std::fmt;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use stockwatch_core::{ProductHandle, ProductSnapshot, StorefrontOrigin};

use crate::client::StorefrontClient;
use crate::error::ScraperError;
use crate::normalize::{normalize_product, reports_availability};

pub use collection::extract_product_hrefs;
pub use sitemap::parse_sitemap_locs;
pub use suggest::collect_suggest_handles;

/// Locale path prefixes tried for localized sitemaps and collection pages.
pub(crate) const LOCALE_PREFIXES: [&str; 8] =
    ["en", "en-us", "en-gb", "nl", "de", "fr", "es", "it"];

/// One way of enumerating a storefront's catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `GET /products.json?limit=N`.
    BulkListing,
    /// `/sitemap.xml` and its nested product sitemaps.
    Sitemap,
    /// The sitemap crawl repeated under each locale prefix.
    LocaleSitemap,
    /// `/search/suggest.json` once per keyword.
    SearchSuggest,
    /// Product links scraped from `/collections/all`.
    CollectionPage,
}

impl Strategy {
    pub const CASCADE: [Strategy; 5] = [
        Strategy::BulkListing,
        Strategy::Sitemap,
        Strategy::LocaleSitemap,
        Strategy::SearchSuggest,
        Strategy::CollectionPage,
    ];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::BulkListing => "bulk_listing",
            Strategy::Sitemap => "sitemap",
            Strategy::LocaleSitemap => "locale_sitemap",
            Strategy::SearchSuggest => "search_suggest",
            Strategy::CollectionPage => "collection_page",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// `limit` passed to the bulk listing endpoint.
    pub bulk_page_size: u32,
    /// Upper bound on concurrent per-handle product fetches.
    pub max_concurrent_fetches: usize,
    /// Search terms for the suggest probe.
    pub keywords: Vec<String>,
}

/// Result of one discovery run: de-duplicated products plus the strategy
/// that produced them (`None` when every strategy came up empty).
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub products: Vec<ProductSnapshot>,
    pub strategy: Option<Strategy>,
}

impl Catalog {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[derive(Clone)]
pub struct CatalogDiscovery {
    client: StorefrontClient,
    options: DiscoveryOptions,
}

impl CatalogDiscovery {
    #[must_use]
    pub fn new(client: StorefrontClient, options: DiscoveryOptions) -> Self {
        Self { client, options }
    }

    #[must_use]
    pub fn client(&self) -> &StorefrontClient {
        &self.client
    }

    /// Enumerates the catalog of `origin`. Never fails; see the module docs.
    pub async fn discover(&self, origin: &StorefrontOrigin) -> Catalog {
        for strategy in Strategy::CASCADE {
            let products = dedupe_by_handle(self.run_strategy(strategy, origin).await);
            if products.is_empty() {
                tracing::debug!(origin = %origin, %strategy, "strategy found no products");
                continue;
            }
            tracing::info!(
                origin = %origin,
                %strategy,
                products = products.len(),
                "catalog discovered"
            );
            return Catalog {
                products,
                strategy: Some(strategy),
            };
        }

        tracing::info!(origin = %origin, "no discovery strategy returned products");
        Catalog::default()
    }

    async fn run_strategy(
        &self,
        strategy: Strategy,
        origin: &StorefrontOrigin,
    ) -> Vec<ProductSnapshot> {
        match strategy {
            Strategy::BulkListing => or_empty(
                bulk::fetch_listing(&self.client, origin, self.options.bulk_page_size).await,
                origin,
                "bulk listing",
            ),
            Strategy::Sitemap => {
                let handles = sitemap::product_handles(&self.client, origin, "").await;
                self.resolve_handles(origin, handles).await
            }
            Strategy::LocaleSitemap => {
                for locale in LOCALE_PREFIXES {
                    let prefix = format!("/{locale}");
                    let handles = sitemap::product_handles(&self.client, origin, &prefix).await;
                    if handles.is_empty() {
                        continue;
                    }
                    let products = self.resolve_handles(origin, handles).await;
                    if !products.is_empty() {
                        return products;
                    }
                }
                Vec::new()
            }
            Strategy::SearchSuggest => {
                let handles =
                    suggest::product_handles(&self.client, origin, &self.options.keywords).await;
                self.resolve_handles(origin, handles).await
            }
            Strategy::CollectionPage => {
                let handles = collection::product_handles(&self.client, origin).await;
                self.resolve_handles(origin, handles).await
            }
        }
    }

    /// Fetches each handle individually with bounded concurrency. Handles
    /// that cannot be resolved are dropped.
    pub async fn resolve_handles(
        &self,
        origin: &StorefrontOrigin,
        handles: Vec<ProductHandle>,
    ) -> Vec<ProductSnapshot> {
        if handles.is_empty() {
            return Vec::new();
        }
        stream::iter(handles)
            .map(|handle| async move { self.resolve_handle(origin, &handle).await })
            .buffer_unordered(self.options.max_concurrent_fetches.max(1))
            .filter_map(|resolved| async move { resolved })
            .collect()
            .await
    }

    /// Resolves one handle through `/products/{handle}.json`, falling back
    /// to `/products/{handle}.js`.
    ///
    /// A `.json` body without any `available` flag is held back while the
    /// `.js` body is tried, since only the latter reports stock. If `.js`
    /// fails the held body is used and reads as unavailable.
    pub async fn resolve_handle(
        &self,
        origin: &StorefrontOrigin,
        handle: &ProductHandle,
    ) -> Option<ProductSnapshot> {
        let encoded = handle.path_segment();
        let mut without_stock = None;
        for suffix in [".json", ".js"] {
            let url = origin.join(&format!("/products/{encoded}{suffix}"));
            let resolved = self.client.get_json::<Value>(&url).await.and_then(|body| {
                normalize_product(&body, Some(handle)).map(|p| (p, reports_availability(&body)))
            });
            match resolved {
                Ok((snapshot, true)) => return Some(snapshot),
                Ok((snapshot, false)) => {
                    tracing::debug!(origin = %origin, %handle, url = %url, "product body has no availability");
                    without_stock.get_or_insert(snapshot);
                }
                Err(e) => {
                    tracing::debug!(origin = %origin, %handle, url = %url, error = %e, "product fetch failed");
                }
            }
        }
        without_stock
    }
}

/// Converts a failed sub-step into an empty result.
pub(crate) fn or_empty<T>(
    result: Result<Vec<T>, ScraperError>,
    origin: &StorefrontOrigin,
    step: &str,
) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::debug!(origin = %origin, step, error = %e, "discovery step failed");
        Vec::new()
    })
}

/// Keeps the first occurrence of every handle, preserving order.
fn dedupe_by_handle(products: Vec<ProductSnapshot>) -> Vec<ProductSnapshot> {
    let mut seen = HashSet::new();
    products
        .into_iter()
        .filter(|p| seen.insert(p.handle.clone()))
        .collect()
}

/// Keeps the first occurrence of every handle, preserving order.
pub(crate) fn dedupe_handles(handles: Vec<ProductHandle>) -> Vec<ProductHandle> {
    let mut seen = HashSet::new();
    handles
        .into_iter()
        .filter(|h| seen.insert(h.clone()))
        .collect()
}
