//! Reconciliation policies the operator can choose between.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What to do when a product's content hash changes but its availability
/// does not (price change, variant added or removed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceChangePolicy {
    /// Edit the existing message so it shows the new prices.
    #[default]
    Notify,
    /// Record the new hash without touching any message.
    Silent,
}

/// How a product previously flagged as removed is treated when it shows up
/// in the catalog again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReappearPolicy {
    /// Keep history: reuse the stored message and treat the return as a
    /// restock (or a sold-out edit when it comes back unavailable).
    #[default]
    Restock,
    /// Forget the prior message and hash; behave like first discovery.
    Fresh,
}

impl FromStr for PriceChangePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "notify" => Ok(Self::Notify),
            "silent" => Ok(Self::Silent),
            other => Err(format!("unknown price change policy \"{other}\"; expected notify or silent")),
        }
    }
}

impl FromStr for ReappearPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "restock" => Ok(Self::Restock),
            "fresh" => Ok(Self::Fresh),
            other => Err(format!("unknown reappear policy \"{other}\"; expected restock or fresh")),
        }
    }
}

impl fmt::Display for PriceChangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceChangePolicy::Notify => write!(f, "notify"),
            PriceChangePolicy::Silent => write!(f, "silent"),
        }
    }
}

impl fmt::Display for ReappearPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReappearPolicy::Restock => write!(f, "restock"),
            ReappearPolicy::Fresh => write!(f, "fresh"),
        }
    }
}
