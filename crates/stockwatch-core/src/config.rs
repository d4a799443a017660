use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::FixedOffset;

use crate::app_config::{AppConfig, SinkKind};
use crate::display::{DisplaySettings, Locale};
use crate::watchlist::{build_targets, load_watchlist};
use crate::{ConfigError, PriceChangePolicy, ReappearPolicy, StorefrontOrigin};

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files; useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Splits a comma-separated env value, trimming entries and dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parses a raw env value, reporting failures against the variable name.
fn parse_value<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

fn require_positive(var: &str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup without touching the process environment.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let targets = match lookup("STOCKWATCH_WATCHLIST_PATH") {
        Ok(path) => load_watchlist(&PathBuf::from(path))?,
        Err(_) => {
            let shops = split_list(&require("STOCKWATCH_SHOPS")?);
            let channels = split_list(&require("STOCKWATCH_CHANNELS")?);
            build_targets(&shops, &channels)?
        }
    };

    let keywords = split_list(&or_default("STOCKWATCH_KEYWORDS", "vinyl,cd"));

    let poll_interval_secs = require_positive(
        "STOCKWATCH_POLL_INTERVAL_SECS",
        parse_value(
            "STOCKWATCH_POLL_INTERVAL_SECS",
            &or_default("STOCKWATCH_POLL_INTERVAL_SECS", "60"),
        )?,
    )?;

    let locale: Locale = parse_value("STOCKWATCH_LOCALE", &or_default("STOCKWATCH_LOCALE", "en"))?;
    let utc_offset_hours: i32 = parse_value(
        "STOCKWATCH_UTC_OFFSET_HOURS",
        &or_default("STOCKWATCH_UTC_OFFSET_HOURS", "0"),
    )?;
    let utc_offset = utc_offset_hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| ConfigError::InvalidEnvVar {
            var: "STOCKWATCH_UTC_OFFSET_HOURS".to_string(),
            reason: format!("offset {utc_offset_hours}h is out of range"),
        })?;
    let display = DisplaySettings {
        locale,
        utc_offset,
        currency_label: or_default("STOCKWATCH_CURRENCY", "€"),
    };

    let force_refresh_origins = split_list(&or_default("STOCKWATCH_FORCE_REFRESH_ORIGINS", ""))
        .iter()
        .map(|raw| StorefrontOrigin::parse(raw))
        .collect::<Result<HashSet<_>, _>>()?;

    let access_cooldown_secs: u64 = parse_value(
        "STOCKWATCH_ACCESS_COOLDOWN_SECS",
        &or_default("STOCKWATCH_ACCESS_COOLDOWN_SECS", "21600"),
    )?;
    let price_change_policy: PriceChangePolicy = parse_value(
        "STOCKWATCH_PRICE_CHANGE_POLICY",
        &or_default("STOCKWATCH_PRICE_CHANGE_POLICY", "notify"),
    )?;
    let reappear_policy: ReappearPolicy = parse_value(
        "STOCKWATCH_REAPPEAR_POLICY",
        &or_default("STOCKWATCH_REAPPEAR_POLICY", "restock"),
    )?;

    let state_path = PathBuf::from(or_default("STOCKWATCH_STATE_PATH", "./data/products.json"));
    let log_level = or_default("STOCKWATCH_LOG_LEVEL", "info");
    let sink: SinkKind = parse_value("STOCKWATCH_SINK", &or_default("STOCKWATCH_SINK", "discord"))?;
    let discord_token = lookup("DISCORD_TOKEN").ok().filter(|t| !t.trim().is_empty());
    let discord_api_base = or_default("DISCORD_API_BASE", "https://discord.com/api/v10");

    let scraper_request_timeout_secs = require_positive(
        "STOCKWATCH_REQUEST_TIMEOUT_SECS",
        parse_value(
            "STOCKWATCH_REQUEST_TIMEOUT_SECS",
            &or_default("STOCKWATCH_REQUEST_TIMEOUT_SECS", "20"),
        )?,
    )?;
    let scraper_user_agent = or_default(
        "STOCKWATCH_USER_AGENT",
        "stockwatch/0.1 (+restock-monitor)",
    );
    let scraper_max_retries: u32 = parse_value(
        "STOCKWATCH_MAX_RETRIES",
        &or_default("STOCKWATCH_MAX_RETRIES", "2"),
    )?;
    let scraper_retry_backoff_base_ms: u64 = parse_value(
        "STOCKWATCH_RETRY_BACKOFF_BASE_MS",
        &or_default("STOCKWATCH_RETRY_BACKOFF_BASE_MS", "500"),
    )?;
    let scraper_bulk_page_size: u32 = parse_value(
        "STOCKWATCH_BULK_PAGE_SIZE",
        &or_default("STOCKWATCH_BULK_PAGE_SIZE", "250"),
    )?;
    let scraper_max_concurrent_fetches: usize = parse_value(
        "STOCKWATCH_MAX_CONCURRENT_FETCHES",
        &or_default("STOCKWATCH_MAX_CONCURRENT_FETCHES", "4"),
    )?;
    let max_concurrent_shops: usize = parse_value(
        "STOCKWATCH_MAX_CONCURRENT_SHOPS",
        &or_default("STOCKWATCH_MAX_CONCURRENT_SHOPS", "4"),
    )?;
    let sweep_timeout_secs = require_positive(
        "STOCKWATCH_SWEEP_TIMEOUT_SECS",
        parse_value(
            "STOCKWATCH_SWEEP_TIMEOUT_SECS",
            &or_default("STOCKWATCH_SWEEP_TIMEOUT_SECS", "300"),
        )?,
    )?;

    Ok(AppConfig {
        targets,
        keywords,
        poll_interval_secs,
        display,
        force_refresh_origins,
        access_cooldown_secs,
        price_change_policy,
        reappear_policy,
        state_path,
        log_level,
        sink,
        discord_token,
        discord_api_base,
        scraper_request_timeout_secs,
        scraper_user_agent,
        scraper_max_retries,
        scraper_retry_backoff_base_ms,
        scraper_bulk_page_size,
        scraper_max_concurrent_fetches,
        max_concurrent_shops,
        sweep_timeout_secs,
    })
}

impl AppConfig {
    /// Checks that the selected sink has the credentials it needs.
    ///
    /// Kept separate from parsing so the CLI can switch to the log sink
    /// (`--dry-run`) before credentials are enforced.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] for `DISCORD_TOKEN` when the
    /// Discord sink is selected without a token.
    pub fn validate_credentials(&self) -> Result<(), ConfigError> {
        if self.sink == SinkKind::Discord && self.discord_token.is_none() {
            return Err(ConfigError::MissingEnvVar("DISCORD_TOKEN".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
