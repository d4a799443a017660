use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// All variants are fatal at startup: the process must not begin polling
/// with a half-valid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read watch list {path}: {source}")]
    WatchlistIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse watch list: {0}")]
    WatchlistParse(#[from] serde_yaml::Error),

    #[error("invalid shop URL \"{shop_url}\": {reason}")]
    InvalidShopUrl { shop_url: String, reason: String },

    #[error("configuration validation failed: {0}")]
    Validation(String),
}
