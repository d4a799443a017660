//! Typed records persisted through the key-value store.
//!
//! Fields accept the camelCase names written by earlier releases
//! (`messageId`, `contentHash`, ...) so legacy entries still decode.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stockwatch_core::{ProductHandle, ProductSnapshot};

/// Persisted state of one product in one destination.
///
/// `message_id` is set exactly while a notification for the product exists
/// in the sink. `removed` stays set until the product is discovered again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductStateRecord {
    pub available: bool,
    #[serde(alias = "contentHash")]
    pub content_hash: String,
    #[serde(alias = "messageId")]
    pub message_id: Option<String>,
    #[serde(alias = "lastPostedAt")]
    pub last_posted_at: Option<DateTime<Utc>>,
    pub removed: bool,
    #[serde(alias = "forceRefreshed")]
    pub force_refreshed: bool,
    #[serde(alias = "lastSnapshot")]
    pub last_snapshot: Option<ProductSnapshot>,
    /// Set on a legacy entry once it has been copied to its scoped key.
    #[serde(rename = "_migrated")]
    pub migrated: bool,
}

/// Partial update for a [`ProductStateRecord`]. `None` leaves the stored
/// field untouched; `message_id: Some(None)` clears it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_posted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_refreshed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_snapshot: Option<ProductSnapshot>,
    #[serde(rename = "_migrated", skip_serializing_if = "Option::is_none")]
    pub migrated: Option<bool>,
}

impl ProductPatch {
    /// Patch that rewrites every field of `record`.
    #[must_use]
    pub fn full(record: &ProductStateRecord) -> Self {
        Self {
            available: Some(record.available),
            content_hash: Some(record.content_hash.clone()),
            message_id: Some(record.message_id.clone()),
            last_posted_at: record.last_posted_at,
            removed: Some(record.removed),
            force_refreshed: Some(record.force_refreshed),
            last_snapshot: record.last_snapshot.clone(),
            migrated: Some(record.migrated),
        }
    }

    /// Patch that only refreshes the cached snapshot.
    #[must_use]
    pub fn snapshot_only(snapshot: &ProductSnapshot) -> Self {
        Self {
            last_snapshot: Some(snapshot.clone()),
            ..Self::default()
        }
    }

    pub(crate) fn into_map(self) -> Result<Map<String, Value>, serde_json::Error> {
        to_object(&self)
    }
}

/// Last known access-gate state of an origin, per destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessStateRecord {
    /// `None` until the first check has run.
    pub protected: Option<bool>,
    #[serde(alias = "messageId")]
    pub message_id: Option<String>,
    /// Last time the access notification was created or touched, or the
    /// baseline time when none exists.
    #[serde(alias = "lastCheckedAt")]
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// Handles seen in the previous discovery cycle, used for removal detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogIndexRecord {
    pub handles: BTreeSet<ProductHandle>,
    pub observed_at: DateTime<Utc>,
}

pub(crate) fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(serde::ser::Error::custom("record did not serialize to an object")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn legacy_camel_case_record_decodes() {
        let record: ProductStateRecord =
            serde_json::from_value(json!({"available": true, "messageId": "m-1"})).unwrap();
        assert!(record.available);
        assert_eq!(record.message_id.as_deref(), Some("m-1"));
        assert!(!record.migrated);
        assert!(record.last_snapshot.is_none());
    }

    #[test]
    fn patch_omits_untouched_fields() {
        let map = ProductPatch {
            available: Some(false),
            ..ProductPatch::default()
        }
        .into_map()
        .unwrap();
        assert_eq!(Value::Object(map), json!({"available": false}));
    }

    #[test]
    fn patch_can_clear_message_id() {
        let map = ProductPatch {
            message_id: Some(None),
            ..ProductPatch::default()
        }
        .into_map()
        .unwrap();
        assert_eq!(Value::Object(map), json!({"message_id": null}));
    }

    #[test]
    fn migrated_marker_uses_underscore_name() {
        let map = ProductPatch {
            migrated: Some(true),
            ..ProductPatch::default()
        }
        .into_map()
        .unwrap();
        assert_eq!(Value::Object(map), json!({"_migrated": true}));
    }
}
