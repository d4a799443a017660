use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("state store error: {0}")]
    Store(#[from] stockwatch_store::StoreError),

    #[error("notification error: {0}")]
    Notify(#[from] stockwatch_notify::NotifyError),

    #[error("storefront error: {0}")]
    Scraper(#[from] stockwatch_scraper::ScraperError),
}
