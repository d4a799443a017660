use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{
    DisplaySettings, PriceChangePolicy, ReappearPolicy, StorefrontOrigin, WatchTarget,
};

/// Where notifications are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Discord REST API (requires `DISCORD_TOKEN`).
    Discord,
    /// Log every message instead of sending it.
    Log,
}

impl FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discord" => Ok(Self::Discord),
            "log" => Ok(Self::Log),
            other => Err(format!("unknown sink \"{other}\"; expected discord or log")),
        }
    }
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkKind::Discord => write!(f, "discord"),
            SinkKind::Log => write!(f, "log"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub targets: Vec<WatchTarget>,
    pub keywords: Vec<String>,
    pub poll_interval_secs: u64,
    pub display: DisplaySettings,
    pub force_refresh_origins: HashSet<StorefrontOrigin>,
    pub access_cooldown_secs: u64,
    pub price_change_policy: PriceChangePolicy,
    pub reappear_policy: ReappearPolicy,
    pub state_path: PathBuf,
    pub log_level: String,
    pub sink: SinkKind,
    pub discord_token: Option<String>,
    pub discord_api_base: String,
    pub scraper_request_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub scraper_max_retries: u32,
    pub scraper_retry_backoff_base_ms: u64,
    pub scraper_bulk_page_size: u32,
    pub scraper_max_concurrent_fetches: usize,
    pub max_concurrent_shops: usize,
    pub sweep_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("targets", &self.targets)
            .field("keywords", &self.keywords)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("display", &self.display)
            .field("force_refresh_origins", &self.force_refresh_origins)
            .field("access_cooldown_secs", &self.access_cooldown_secs)
            .field("price_change_policy", &self.price_change_policy)
            .field("reappear_policy", &self.reappear_policy)
            .field("state_path", &self.state_path)
            .field("log_level", &self.log_level)
            .field("sink", &self.sink)
            .field(
                "discord_token",
                &self.discord_token.as_ref().map(|_| "[redacted]"),
            )
            .field("discord_api_base", &self.discord_api_base)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("scraper_max_retries", &self.scraper_max_retries)
            .field(
                "scraper_retry_backoff_base_ms",
                &self.scraper_retry_backoff_base_ms,
            )
            .field("scraper_bulk_page_size", &self.scraper_bulk_page_size)
            .field(
                "scraper_max_concurrent_fetches",
                &self.scraper_max_concurrent_fetches,
            )
            .field("max_concurrent_shops", &self.max_concurrent_shops)
            .field("sweep_timeout_secs", &self.sweep_timeout_secs)
            .finish()
    }
}
