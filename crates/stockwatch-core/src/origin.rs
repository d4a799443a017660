//! Storefront origin: the scheme+host namespace every state key hangs off.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ConfigError;

/// Normalized `scheme://host[:port]` of a configured shop URL.
///
/// Given `"https://Shop.Example.com/collections/all"`, the origin is
/// `"https://shop.example.com"`. Discovery always hits the store root, and
/// state keys stay stable no matter which path the operator configured.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorefrontOrigin(String);

impl StorefrontOrigin {
    /// Parses a configured shop URL into its origin.
    ///
    /// A bare host (`"shop.example.com"`) is treated as `https://`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidShopUrl`] when the value does not parse as
    /// an absolute http(s) URL with a host.
    pub fn parse(shop_url: &str) -> Result<Self, ConfigError> {
        let trimmed = shop_url.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::InvalidShopUrl {
                shop_url: shop_url.to_owned(),
                reason: "empty URL".to_owned(),
            });
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_owned()
        } else {
            format!("https://{trimmed}")
        };

        let url = Url::parse(&candidate).map_err(|e| ConfigError::InvalidShopUrl {
            shop_url: shop_url.to_owned(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidShopUrl {
                shop_url: shop_url.to_owned(),
                reason: format!("unsupported scheme \"{}\"", url.scheme()),
            });
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ConfigError::InvalidShopUrl {
                shop_url: shop_url.to_owned(),
                reason: "URL has no host".to_owned(),
            });
        }

        // `Url` already lower-cases the host and drops default ports.
        Ok(Self(url.origin().ascii_serialization()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hostname without scheme, for log fields and message footers.
    #[must_use]
    pub fn host(&self) -> &str {
        self.0
            .split_once("://")
            .map_or(self.0.as_str(), |(_, rest)| rest)
    }

    /// Joins an absolute path (`"/products.json"`) onto the origin.
    #[must_use]
    pub fn join(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.0)
        } else {
            format!("{}/{path}", self.0)
        }
    }
}

impl fmt::Display for StorefrontOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
