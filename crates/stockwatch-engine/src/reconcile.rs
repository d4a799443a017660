//! Per-product state machine and removal detection for one
//! (storefront, destination) pair.
//!
//! | Prior record | Current | Result |
//! |---|---|---|
//! | none | available | send "new" |
//! | none | unavailable | record only |
//! | unavailable | available | restock: edit, else send ("new" wording without a message) |
//! | available | unavailable | sold out: edit, else send |
//! | same availability | hash changed | [`PriceChangePolicy`] decides |
//! | same availability | hash unchanged | refresh cached snapshot |
//! | removed | reappears | [`ReappearPolicy`] decides |
//!
//! A failed send never advances availability, hash or message id, so the
//! transition is retried on the next cycle.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use stockwatch_core::{
    KeywordMatcher, PriceChangePolicy, ProductHandle, ProductSnapshot, ReappearPolicy,
    WatchTarget,
};
use stockwatch_notify::{NotificationSink, ProductEvent, Renderer};
use stockwatch_store::{
    CatalogIndexRecord, KeyValueStore, ProductKey, ProductPatch, ProductStateRecord, StateStore,
};

use crate::deliver::{deliver, Delivery};
use crate::error::EngineError;
use crate::hash::content_hash;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcilePolicy {
    pub price_change: PriceChangePolicy,
    pub reappear: ReappearPolicy,
}

/// What reconciling one product did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// A new message was posted.
    Sent,
    /// An existing message was edited in place.
    Edited,
    /// State changed without a notification.
    Recorded,
    /// Nothing changed; only the cached snapshot was refreshed.
    Unchanged,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub discovered: usize,
    pub wanted: usize,
    pub sent: usize,
    pub edited: usize,
    pub recorded: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub failed: usize,
    /// The catalog was empty, so nothing was reconciled.
    pub skipped_empty: bool,
}

impl PassSummary {
    fn count(&mut self, action: Action) {
        match action {
            Action::Sent => self.sent += 1,
            Action::Edited => self.edited += 1,
            Action::Recorded => self.recorded += 1,
            Action::Unchanged => self.unchanged += 1,
        }
    }

    /// Total sink calls that produced a visible message change.
    #[must_use]
    pub fn notifications(&self) -> usize {
        self.sent + self.edited + self.removed
    }
}

pub struct Reconciler<'a, S, N> {
    store: &'a StateStore<S>,
    sink: &'a N,
    renderer: &'a Renderer,
    policy: ReconcilePolicy,
}

impl<'a, S: KeyValueStore, N: NotificationSink> Reconciler<'a, S, N> {
    #[must_use]
    pub fn new(
        store: &'a StateStore<S>,
        sink: &'a N,
        renderer: &'a Renderer,
        policy: ReconcilePolicy,
    ) -> Self {
        Self {
            store,
            sink,
            renderer,
            policy,
        }
    }

    /// Reconciles one discovery cycle of `target`.
    ///
    /// `catalog` is the full discovered catalog; only products the keyword
    /// matcher wants are reconciled, but every handle goes into the catalog
    /// index. An empty catalog is a no-op (never "everything removed").
    ///
    /// Per-product failures are logged and counted, not returned.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] when the catalog index cannot be read
    /// or encoded.
    pub async fn reconcile(
        &self,
        target: &WatchTarget,
        catalog: &[ProductSnapshot],
        keywords: &KeywordMatcher,
        force_refresh: bool,
        now: DateTime<Utc>,
    ) -> Result<PassSummary, EngineError> {
        let mut summary = PassSummary {
            discovered: catalog.len(),
            ..PassSummary::default()
        };
        if catalog.is_empty() {
            tracing::info!(pair = %target.id(), "empty catalog, skipping reconciliation");
            summary.skipped_empty = true;
            return Ok(summary);
        }

        for product in catalog.iter().filter(|p| keywords.wanted(p)) {
            summary.wanted += 1;
            let key = ProductKey::new(&target.origin, &product.handle, &target.destination);
            match self.reconcile_product(&key, product, force_refresh, now).await {
                Ok(action) => {
                    summary.count(action);
                    if matches!(action, Action::Sent | Action::Edited) {
                        self.flush_logged().await;
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(key = %key, error = %e, "product reconciliation failed, retrying next cycle");
                }
            }
        }

        let mut handles: BTreeSet<ProductHandle> =
            catalog.iter().map(|p| p.handle.clone()).collect();
        let pending = self
            .detect_removals(target, &handles, now, &mut summary)
            .await?;
        // Removals that could not be delivered stay in the index so they are
        // detected again next cycle.
        handles.extend(pending);
        self.store
            .put_catalog_index(
                &target.origin,
                &target.destination,
                &CatalogIndexRecord {
                    handles,
                    observed_at: now,
                },
            )
            .await?;
        self.flush_logged().await;

        Ok(summary)
    }

    /// Applies the state machine to one product.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Notify`] when a required send fails and
    /// [`EngineError::Store`] when state cannot be read or encoded.
    pub async fn reconcile_product(
        &self,
        key: &ProductKey,
        product: &ProductSnapshot,
        force_refresh: bool,
        now: DateTime<Utc>,
    ) -> Result<Action, EngineError> {
        let hash = content_hash(&product.variants);
        let available = product.is_available();

        let prior = match self.store.product(key).await? {
            Some(record) if record.removed && self.policy.reappear == ReappearPolicy::Fresh => {
                tracing::debug!(key = %key, "removed product reappeared, treating as new");
                None
            }
            other => other,
        };
        let Some(prior) = prior else {
            return self
                .first_sighting(key, product, hash, force_refresh, now)
                .await;
        };

        let Some(event) = self.transition(&prior, available, &hash, force_refresh) else {
            let changed =
                prior.removed || prior.available != available || prior.content_hash != hash;
            let patch = if changed {
                ProductPatch {
                    available: Some(available),
                    content_hash: Some(hash),
                    removed: Some(false),
                    last_snapshot: Some(product.clone()),
                    ..ProductPatch::default()
                }
            } else {
                ProductPatch::snapshot_only(product)
            };
            self.store.put_product(key, patch).await?;
            return Ok(if changed {
                Action::Recorded
            } else {
                Action::Unchanged
            });
        };

        let content = self.renderer.product(event, product, &key.origin, now);
        let delivery = match deliver(
            self.sink,
            &key.destination,
            prior.message_id.as_deref(),
            &content,
        )
        .await
        {
            Ok(delivery) => delivery,
            Err(e) => {
                self.store
                    .put_product(key, ProductPatch::snapshot_only(product))
                    .await?;
                return Err(e.into());
            }
        };

        let action = match delivery {
            Delivery::Edited(_) => Action::Edited,
            Delivery::Sent(_) => Action::Sent,
        };
        tracing::info!(key = %key, ?event, ?action, "product notification delivered");

        self.store
            .put_product(
                key,
                ProductPatch {
                    available: Some(available),
                    content_hash: Some(hash),
                    message_id: Some(Some(delivery.into_message_id())),
                    last_posted_at: Some(now),
                    removed: Some(false),
                    force_refreshed: force_refresh.then_some(true),
                    last_snapshot: Some(product.clone()),
                    migrated: None,
                },
            )
            .await?;
        Ok(action)
    }

    /// Picks the notification for a tracked product, or `None` when the
    /// change (if any) is recorded silently.
    fn transition(
        &self,
        prior: &ProductStateRecord,
        available: bool,
        hash: &str,
        force_refresh: bool,
    ) -> Option<ProductEvent> {
        let has_message = prior.message_id.is_some();
        let arrival = if has_message {
            ProductEvent::Restock
        } else {
            ProductEvent::New
        };

        if prior.removed {
            return match (available, has_message) {
                (true, _) => Some(arrival),
                (false, true) => Some(ProductEvent::SoldOut),
                (false, false) => None,
            };
        }

        match (prior.available, available) {
            (false, true) => Some(arrival),
            (true, false) => Some(ProductEvent::SoldOut),
            _ if prior.content_hash != hash => match self.policy.price_change {
                PriceChangePolicy::Notify if has_message => Some(ProductEvent::Update),
                _ => None,
            },
            _ if force_refresh && !prior.force_refreshed && has_message => {
                Some(ProductEvent::Refresh)
            }
            _ => None,
        }
    }

    async fn first_sighting(
        &self,
        key: &ProductKey,
        product: &ProductSnapshot,
        hash: String,
        force_refresh: bool,
        now: DateTime<Utc>,
    ) -> Result<Action, EngineError> {
        let available = product.is_available();
        let mut record = ProductStateRecord {
            available,
            content_hash: hash,
            force_refreshed: force_refresh,
            last_snapshot: Some(product.clone()),
            ..ProductStateRecord::default()
        };

        // Unavailable on first sight: index it without announcing.
        if !available {
            self.store
                .put_product(key, ProductPatch::full(&record))
                .await?;
            tracing::debug!(key = %key, "first sighting unavailable, recorded silently");
            return Ok(Action::Recorded);
        }

        let content = self
            .renderer
            .product(ProductEvent::New, product, &key.origin, now);
        let message_id = self.sink.send(&key.destination, &content).await?;
        tracing::info!(key = %key, message_id = %message_id, "new product announced");

        record.message_id = Some(message_id);
        record.last_posted_at = Some(now);
        self.store
            .put_product(key, ProductPatch::full(&record))
            .await?;
        Ok(Action::Sent)
    }

    /// Announces products present in the previous index but missing now.
    ///
    /// Returns handles whose removal could not be delivered.
    async fn detect_removals(
        &self,
        target: &WatchTarget,
        current: &BTreeSet<ProductHandle>,
        now: DateTime<Utc>,
        summary: &mut PassSummary,
    ) -> Result<Vec<ProductHandle>, EngineError> {
        let Some(previous) = self
            .store
            .catalog_index(&target.origin, &target.destination)
            .await?
        else {
            return Ok(Vec::new());
        };

        let mut pending = Vec::new();
        for handle in previous.handles.difference(current) {
            let key = ProductKey::new(&target.origin, handle, &target.destination);
            let record = match self.store.product(&key).await {
                Ok(Some(record)) if !record.removed => record,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "unreadable record, retrying removal next cycle");
                    summary.failed += 1;
                    pending.push(handle.clone());
                    continue;
                }
            };

            let snapshot = record
                .last_snapshot
                .clone()
                .unwrap_or_else(|| placeholder_snapshot(handle));
            let content = self.renderer.product(
                ProductEvent::Removed {
                    was_available: record.available,
                },
                &snapshot,
                &target.origin,
                now,
            );

            match deliver(
                self.sink,
                &target.destination,
                record.message_id.as_deref(),
                &content,
            )
            .await
            {
                Ok(delivery) => {
                    self.store
                        .put_product(
                            &key,
                            ProductPatch {
                                removed: Some(true),
                                message_id: Some(Some(delivery.into_message_id())),
                                last_posted_at: Some(now),
                                ..ProductPatch::default()
                            },
                        )
                        .await?;
                    summary.removed += 1;
                    tracing::info!(key = %key, "product removed from catalog");
                    self.flush_logged().await;
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "removal notification failed, retrying next cycle");
                    summary.failed += 1;
                    pending.push(handle.clone());
                }
            }
        }
        Ok(pending)
    }

    async fn flush_logged(&self) {
        if let Err(e) = self.store.flush().await {
            tracing::warn!(error = %e, "state not persisted, continuing with in-memory state");
        }
    }
}

/// Minimal snapshot for records that predate cached snapshots.
fn placeholder_snapshot(handle: &ProductHandle) -> ProductSnapshot {
    ProductSnapshot {
        id: handle.to_string(),
        title: handle.to_string(),
        handle: handle.clone(),
        images: Vec::new(),
        variants: Vec::new(),
        product_type: String::new(),
        tags: Vec::new(),
        published_at: None,
        description: String::new(),
    }
}
