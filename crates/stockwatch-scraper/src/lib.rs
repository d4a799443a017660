pub mod access;
pub mod client;
pub mod discovery;
pub mod error;
pub mod normalize;
mod rate_limit;
pub mod types;

pub use access::check_access_state;
pub use client::{FetchedPage, StorefrontClient};
pub use discovery::{Catalog, CatalogDiscovery, DiscoveryOptions, Strategy};
pub use error::ScraperError;
pub use normalize::{normalize_price, normalize_product, reports_availability};
