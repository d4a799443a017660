//! Shared domain types and configuration for stockwatch.

pub mod app_config;
pub mod config;
pub mod display;
pub mod error;
pub mod handle;
pub mod keywords;
pub mod origin;
pub mod policy;
pub mod products;
pub mod watchlist;

pub use app_config::{AppConfig, SinkKind};
pub use config::{load_app_config, load_app_config_from_env};
pub use display::{DisplaySettings, Locale};
pub use error::ConfigError;
pub use handle::ProductHandle;
pub use keywords::KeywordMatcher;
pub use origin::StorefrontOrigin;
pub use policy::{PriceChangePolicy, ReappearPolicy};
pub use products::{ProductSnapshot, Variant};
pub use watchlist::{load_watchlist, WatchTarget, WatchlistFile};
