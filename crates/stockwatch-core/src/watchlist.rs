//! Storefront/destination pairs to watch.
//!
//! Targets come either from the `STOCKWATCH_SHOPS` / `STOCKWATCH_CHANNELS`
//! env lists or from a YAML file:
//!
//! ```yaml
//! targets:
//!   - shop_url: https://records.example.com/collections/all
//!     channel: "1234567890"
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::{ConfigError, StorefrontOrigin};

/// One (storefront, destination) pair. The same shop may appear more than
/// once with different destinations; each pair is tracked independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchTarget {
    pub origin: StorefrontOrigin,
    pub destination: String,
}

impl WatchTarget {
    /// Stable identifier used for log fields and sweep gating.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}|{}", self.origin, self.destination)
    }
}

#[derive(Debug, Deserialize)]
pub struct WatchlistEntry {
    pub shop_url: String,
    pub channel: String,
}

#[derive(Debug, Deserialize)]
pub struct WatchlistFile {
    pub targets: Vec<WatchlistEntry>,
}

/// Loads and validates a YAML watch list.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or parsed, a shop URL
/// is invalid, or validation fails.
pub fn load_watchlist(path: &Path) -> Result<Vec<WatchTarget>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::WatchlistIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: WatchlistFile = serde_yaml::from_str(&content)?;
    let (shops, channels): (Vec<String>, Vec<String>) = file
        .targets
        .into_iter()
        .map(|entry| (entry.shop_url, entry.channel))
        .unzip();

    build_targets(&shops, &channels)
}

/// Pairs shop URLs with destinations positionally.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when the lists are empty, differ in
/// length, contain a blank destination or a duplicated pair, and
/// [`ConfigError::InvalidShopUrl`] for an unparseable shop URL.
pub fn build_targets(shops: &[String], channels: &[String]) -> Result<Vec<WatchTarget>, ConfigError> {
    if shops.is_empty() {
        return Err(ConfigError::Validation(
            "at least one shop must be configured".to_owned(),
        ));
    }
    if shops.len() != channels.len() {
        return Err(ConfigError::Validation(format!(
            "{} shops configured but {} channels; every shop needs exactly one channel",
            shops.len(),
            channels.len()
        )));
    }

    let mut seen = HashSet::new();
    let mut targets = Vec::with_capacity(shops.len());

    for (shop, channel) in shops.iter().zip(channels) {
        let origin = StorefrontOrigin::parse(shop)?;
        let destination = channel.trim().to_owned();
        if destination.is_empty() {
            return Err(ConfigError::Validation(format!(
                "shop '{shop}' has an empty channel"
            )));
        }

        let target = WatchTarget {
            origin,
            destination,
        };
        if !seen.insert(target.id()) {
            return Err(ConfigError::Validation(format!(
                "duplicate target: '{}' -> '{}'",
                target.origin, target.destination
            )));
        }
        targets.push(target);
    }

    Ok(targets)
}
