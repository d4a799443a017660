//! Envelope shapes returned by storefront JSON endpoints.
//!
//! Product bodies are kept as raw [`serde_json::Value`] because the same
//! product arrives in several shapes depending on the endpoint (bulk listing,
//! `.json`, `.js`, search suggest). [`crate::normalize`] maps every shape to
//! [`stockwatch_core::ProductSnapshot`].

use serde::Deserialize;
use serde_json::Value;

/// Top-level response from `GET /products.json`.
#[derive(Debug, Deserialize)]
pub struct ProductsResponse {
    #[serde(default)]
    pub products: Vec<Value>,
}
