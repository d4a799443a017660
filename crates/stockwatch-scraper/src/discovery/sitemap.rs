//! Sitemap crawl: `/sitemap.xml`, its nested product sitemaps, and the
//! conventional fallbacks.

use quick_xml::events::Event;
use quick_xml::Reader;
use stockwatch_core::{ProductHandle, StorefrontOrigin};

use super::{dedupe_handles, or_empty};
use crate::client::StorefrontClient;
use crate::error::ScraperError;

/// Nested product sitemaps followed per crawl.
const MAX_NESTED_SITEMAPS: usize = 2;

/// Tried when the root sitemap advertises no product sitemap.
const FALLBACK_SITEMAPS: [&str; 2] = ["/sitemap_products_1.xml", "/product-sitemap.xml"];

/// Collects product handles from the sitemaps under `prefix` (`""` or a
/// locale prefix such as `"/nl"`).
pub(super) async fn product_handles(
    client: &StorefrontClient,
    origin: &StorefrontOrigin,
    prefix: &str,
) -> Vec<ProductHandle> {
    let root_url = origin.join(&format!("{prefix}/sitemap.xml"));
    let root_locs = or_empty(fetch_locs(client, &root_url).await, origin, "sitemap index");

    let mut handles = handles_from_locs(&root_locs);
    let mut nested: Vec<String> = root_locs
        .iter()
        .filter(|loc| is_product_sitemap(loc))
        .take(MAX_NESTED_SITEMAPS)
        .map(|loc| absolutize(origin, loc))
        .collect();

    if nested.is_empty() && handles.is_empty() {
        nested = FALLBACK_SITEMAPS
            .iter()
            .map(|path| origin.join(&format!("{prefix}{path}")))
            .collect();
    }

    for url in nested {
        let locs = or_empty(fetch_locs(client, &url).await, origin, "product sitemap");
        handles.extend(handles_from_locs(&locs));
    }

    dedupe_handles(handles)
}

async fn fetch_locs(client: &StorefrontClient, url: &str) -> Result<Vec<String>, ScraperError> {
    let page = client.get_page(url).await?;
    parse_sitemap_locs(&page.body, url)
}

/// Extracts every `<loc>` value from a sitemap or sitemap index.
///
/// Only un-prefixed `<loc>` elements count; `<image:loc>` entries inside
/// product sitemaps point at CDN images, not pages.
///
/// # Errors
///
/// Returns [`ScraperError::Xml`] when the document is malformed.
pub fn parse_sitemap_locs(xml: &str, context: &str) -> Result<Vec<String>, ScraperError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut locs = Vec::new();
    let mut in_loc = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => in_loc = e.name().as_ref() == b"loc",
            Ok(Event::End(_)) => in_loc = false,
            Ok(Event::Text(t)) if in_loc => {
                let text = t.unescape().unwrap_or_default();
                let text = text.trim();
                if !text.is_empty() {
                    locs.push(text.to_owned());
                }
            }
            Ok(Event::CData(c)) if in_loc => {
                let text = String::from_utf8_lossy(&c.into_inner()).trim().to_owned();
                if !text.is_empty() {
                    locs.push(text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ScraperError::Xml {
                    context: context.to_owned(),
                    source: e,
                })
            }
        }
    }

    Ok(locs)
}

fn is_product_sitemap(loc: &str) -> bool {
    let lower = loc.to_lowercase();
    lower.contains("sitemap") && lower.contains("product") && !lower.contains("/products/")
}

fn handles_from_locs(locs: &[String]) -> Vec<ProductHandle> {
    locs.iter()
        .filter_map(|loc| ProductHandle::from_product_url(loc))
        .collect()
}

fn absolutize(origin: &StorefrontOrigin, loc: &str) -> String {
    if loc.starts_with("http://") || loc.starts_with("https://") {
        loc.to_owned()
    } else {
        origin.join(loc)
    }
}
