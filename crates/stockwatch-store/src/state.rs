//! Typed access to product, access-state and catalog-index records.

use serde::de::DeserializeOwned;
use stockwatch_core::StorefrontOrigin;

use crate::error::StoreError;
use crate::keys::{access_key, index_key, ProductKey};
use crate::kv::KeyValueStore;
use crate::records::{
    to_object, AccessStateRecord, CatalogIndexRecord, ProductPatch, ProductStateRecord,
};

/// Typed view over a [`KeyValueStore`], injected into the engine.
pub struct StateStore<S> {
    kv: S,
}

impl<S: KeyValueStore> StateStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    /// # Errors
    ///
    /// Propagates the backend's load error.
    pub async fn load(&self) -> Result<(), StoreError> {
        self.kv.load().await
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Persist`] when the write did not reach disk.
    /// In-memory state already reflects every write.
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.kv.flush().await
    }

    /// Looks up the record for `key`, migrating a legacy origin+handle entry
    /// forward on first miss.
    ///
    /// A legacy entry is copied at most once: after the copy it is marked
    /// `_migrated` and later probes ignore it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] if a stored record does not decode.
    pub async fn product(&self, key: &ProductKey) -> Result<Option<ProductStateRecord>, StoreError> {
        if let Some(record) = self.decode(&key.storage_key()).await? {
            return Ok(Some(record));
        }

        let legacy_key = key.legacy_storage_key();
        let Some(legacy) = self.decode::<ProductStateRecord>(&legacy_key).await? else {
            return Ok(None);
        };
        if legacy.migrated {
            return Ok(None);
        }

        self.kv
            .put(&key.storage_key(), ProductPatch::full(&legacy).into_map()?)
            .await?;
        self.kv
            .put(
                &legacy_key,
                ProductPatch {
                    migrated: Some(true),
                    ..ProductPatch::default()
                }
                .into_map()?,
            )
            .await?;
        tracing::info!(key = %key, legacy_key = %legacy_key, "migrated legacy product record");
        Ok(Some(legacy))
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] if the patch cannot be encoded.
    pub async fn put_product(&self, key: &ProductKey, patch: ProductPatch) -> Result<(), StoreError> {
        self.kv.put(&key.storage_key(), patch.into_map()?).await
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] if the stored record does not decode.
    pub async fn access(
        &self,
        origin: &StorefrontOrigin,
        destination: &str,
    ) -> Result<Option<AccessStateRecord>, StoreError> {
        self.decode(&access_key(origin, destination)).await
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] if the record cannot be encoded.
    pub async fn put_access(
        &self,
        origin: &StorefrontOrigin,
        destination: &str,
        record: &AccessStateRecord,
    ) -> Result<(), StoreError> {
        self.kv
            .put(&access_key(origin, destination), to_object(record)?)
            .await
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] if the stored record does not decode.
    pub async fn catalog_index(
        &self,
        origin: &StorefrontOrigin,
        destination: &str,
    ) -> Result<Option<CatalogIndexRecord>, StoreError> {
        self.decode(&index_key(origin, destination)).await
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] if the record cannot be encoded.
    pub async fn put_catalog_index(
        &self,
        origin: &StorefrontOrigin,
        destination: &str,
        record: &CatalogIndexRecord,
    ) -> Result<(), StoreError> {
        self.kv
            .put(&index_key(origin, destination), to_object(record)?)
            .await
    }

    async fn decode<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.kv.get(key).await {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}
