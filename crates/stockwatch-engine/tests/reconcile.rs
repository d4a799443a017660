//! Reconciliation state machine against an in-memory store and a recording
//! sink.

mod support;

use std::sync::atomic::Ordering;

use serde_json::json;
use stockwatch_core::{KeywordMatcher, PriceChangePolicy, ProductSnapshot, ReappearPolicy};
use stockwatch_engine::{content_hash, Action, PassSummary, ReconcilePolicy, Reconciler};
use stockwatch_notify::Renderer;
use stockwatch_store::{CatalogIndexRecord, KeyValueStore, MemoryStore, ProductKey, StateStore};

use support::{at, handle, origin, target, vinyl, CallKind, RecordingSink};

struct Harness {
    store: StateStore<MemoryStore>,
    sink: RecordingSink,
    renderer: Renderer,
    keywords: KeywordMatcher,
    policy: ReconcilePolicy,
}

impl Harness {
    fn new() -> Self {
        Self::with_policy(ReconcilePolicy::default())
    }

    fn with_policy(policy: ReconcilePolicy) -> Self {
        Self {
            store: StateStore::new(MemoryStore::new()),
            sink: RecordingSink::default(),
            renderer: Renderer::default(),
            keywords: KeywordMatcher::new(["vinyl"]),
            policy,
        }
    }

    async fn cycle(&self, catalog: &[ProductSnapshot], minute: u32) -> PassSummary {
        self.cycle_with(catalog, minute, false).await
    }

    async fn cycle_with(
        &self,
        catalog: &[ProductSnapshot],
        minute: u32,
        force_refresh: bool,
    ) -> PassSummary {
        Reconciler::new(&self.store, &self.sink, &self.renderer, self.policy)
            .reconcile(&target("100"), catalog, &self.keywords, force_refresh, at(minute))
            .await
            .unwrap()
    }

    async fn record(&self, raw_handle: &str) -> stockwatch_store::ProductStateRecord {
        self.store
            .product(&ProductKey::new(&origin(), &handle(raw_handle), "100"))
            .await
            .unwrap()
            .expect("record exists")
    }
}

// ---------------------------------------------------------------------------
// First sighting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_sighting_announces_only_available_products() {
    let h = Harness::new();
    let summary = h
        .cycle(
            &[vinyl("in-stock", "10.00", true), vinyl("sold-out", "12.00", false)],
            0,
        )
        .await;

    let calls = h.sink.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].is_send());
    assert_eq!(calls[0].title(), "in-stock vinyl");
    assert_eq!(calls[0].status(), "New listing");
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.recorded, 1);

    let silent = h.record("sold-out").await;
    assert!(!silent.available);
    assert!(silent.message_id.is_none());
    assert!(silent.last_snapshot.is_some());

    let announced = h.record("in-stock").await;
    assert_eq!(announced.message_id.as_deref(), Some("msg-1"));
    assert_eq!(announced.last_posted_at, Some(at(0)));
}

#[tokio::test]
async fn products_without_keyword_are_ignored() {
    let h = Harness::new();
    let mut shirt = vinyl("band-shirt", "20.00", true);
    shirt.title = "Band shirt".to_owned();
    shirt.product_type = "Apparel".to_owned();

    let summary = h.cycle(&[shirt], 0).await;
    assert_eq!(summary.discovered, 1);
    assert_eq!(summary.wanted, 0);
    assert!(h.sink.calls().is_empty());
}

#[tokio::test]
async fn unavailable_then_available_then_unchanged() {
    let h = Harness::new();

    h.cycle(&[vinyl("x", "10.00", false)], 0).await;
    assert!(h.sink.take().is_empty());

    h.cycle(&[vinyl("x", "10.00", true)], 1).await;
    let calls = h.sink.take();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].is_send());
    assert_eq!(calls[0].status(), "New listing");

    h.cycle(&[vinyl("x", "10.00", true)], 2).await;
    assert!(h.sink.take().is_empty());
}

// ---------------------------------------------------------------------------
// Availability transitions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn restock_edits_existing_message_exactly_once() {
    let h = Harness::new();
    h.cycle(&[vinyl("x", "10.00", true)], 0).await;
    h.cycle(&[vinyl("x", "10.00", false)], 1).await;
    h.sink.take();

    let summary = h.cycle(&[vinyl("x", "10.00", true)], 2).await;
    let calls = h.sink.take();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, CallKind::Edit);
    assert_eq!(calls[0].id, "msg-1");
    assert_eq!(calls[0].status(), "Back in stock");
    assert_eq!(summary.edited, 1);
    assert!(h.record("x").await.available);
}

#[tokio::test]
async fn sold_out_strikes_through_title() {
    let h = Harness::new();
    h.cycle(&[vinyl("x", "10.00", true)], 0).await;
    h.sink.take();

    h.cycle(&[vinyl("x", "10.00", false)], 1).await;
    let calls = h.sink.take();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, CallKind::Edit);
    assert_eq!(calls[0].title(), "~~x vinyl~~ (SOLD OUT)");
    assert!(calls[0].content.actions.is_empty());
    assert!(!h.record("x").await.available);
}

#[tokio::test]
async fn failed_edit_falls_back_to_exactly_one_send() {
    let h = Harness::new();
    h.cycle(&[vinyl("x", "10.00", true)], 0).await;
    h.cycle(&[vinyl("x", "10.00", false)], 1).await;
    h.sink.take();

    h.sink.fail_edits.store(true, Ordering::SeqCst);
    let summary = h.cycle(&[vinyl("x", "10.00", true)], 2).await;
    let calls = h.sink.take();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].is_send());
    assert_eq!(summary.sent, 1);
    assert_eq!(h.record("x").await.message_id.as_deref(), Some("msg-2"));
}

#[tokio::test]
async fn deleted_message_is_replaced() {
    let h = Harness::new();
    h.cycle(&[vinyl("x", "10.00", true)], 0).await;
    h.sink.take();

    h.sink.missing_edits.store(true, Ordering::SeqCst);
    h.cycle(&[vinyl("x", "10.00", false)], 1).await;
    let calls = h.sink.take();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].is_send());
    assert_eq!(h.record("x").await.message_id.as_deref(), Some("msg-2"));
}

#[tokio::test]
async fn unchanged_catalog_makes_no_calls_on_second_run() {
    let h = Harness::new();
    let catalog = [vinyl("a", "10.00", true), vinyl("b", "11.00", false)];
    h.cycle(&catalog, 0).await;
    h.sink.take();

    let summary = h.cycle(&catalog, 1).await;
    assert!(h.sink.calls().is_empty());
    assert_eq!(summary.unchanged, 2);
    assert_eq!(summary.notifications(), 0);
}

#[tokio::test]
async fn snapshot_is_refreshed_without_notification() {
    let h = Harness::new();
    h.cycle(&[vinyl("x", "10.00", true)], 0).await;

    let mut renamed = vinyl("x", "10.00", true);
    renamed.title = "x vinyl (repress)".to_owned();
    h.cycle(&[renamed], 1).await;

    assert_eq!(h.sink.calls().len(), 1);
    let record = h.record("x").await;
    assert_eq!(
        record.last_snapshot.map(|s| s.title).as_deref(),
        Some("x vinyl (repress)")
    );
}

// ---------------------------------------------------------------------------
// Price-change policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn price_change_edits_message_under_notify_policy() {
    let h = Harness::new();
    h.cycle(&[vinyl("x", "10.00", true)], 0).await;
    h.sink.take();

    h.cycle(&[vinyl("x", "8.50", true)], 1).await;
    let calls = h.sink.take();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, CallKind::Edit);
    assert_eq!(calls[0].status(), "In stock · Updated");
    assert_eq!(
        h.record("x").await.content_hash,
        content_hash(&vinyl("x", "8.50", true).variants)
    );
}

#[tokio::test]
async fn price_change_is_recorded_silently_under_silent_policy() {
    let h = Harness::with_policy(ReconcilePolicy {
        price_change: PriceChangePolicy::Silent,
        ..ReconcilePolicy::default()
    });
    h.cycle(&[vinyl("x", "10.00", true)], 0).await;
    h.sink.take();

    let summary = h.cycle(&[vinyl("x", "8.50", true)], 1).await;
    assert!(h.sink.calls().is_empty());
    assert_eq!(summary.recorded, 1);
    assert_eq!(
        h.record("x").await.content_hash,
        content_hash(&vinyl("x", "8.50", true).variants)
    );
}

#[tokio::test]
async fn price_change_without_message_sends_nothing() {
    let h = Harness::new();
    h.cycle(&[vinyl("x", "10.00", false)], 0).await;
    h.cycle(&[vinyl("x", "9.00", false)], 1).await;
    assert!(h.sink.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Removal and reappearance
// ---------------------------------------------------------------------------

#[tokio::test]
async fn removal_is_announced_exactly_once() {
    let h = Harness::new();
    let keep = vinyl("keep", "10.00", true);
    h.cycle(&[keep.clone(), vinyl("gone", "12.00", true)], 0).await;
    h.sink.take();

    let summary = h.cycle(std::slice::from_ref(&keep), 1).await;
    let calls = h.sink.take();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, CallKind::Edit);
    assert_eq!(calls[0].id, "msg-2");
    assert_eq!(calls[0].title(), "~~gone vinyl~~ (REMOVED)");
    assert_eq!(calls[0].status(), "Removed (was in stock)");
    assert_eq!(summary.removed, 1);
    assert!(h.record("gone").await.removed);

    h.cycle(&[keep], 2).await;
    assert!(h.sink.calls().is_empty());
}

#[tokio::test]
async fn removal_of_silent_product_is_sent() {
    let h = Harness::new();
    let keep = vinyl("keep", "10.00", true);
    h.cycle(&[keep.clone(), vinyl("never", "12.00", false)], 0).await;
    h.sink.take();

    h.cycle(&[keep], 1).await;
    let calls = h.sink.take();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].is_send());
    assert_eq!(calls[0].status(), "Removed (was sold out)");
}

#[tokio::test]
async fn failed_removal_is_retried_next_cycle() {
    let h = Harness::new();
    let keep = vinyl("keep", "10.00", true);
    h.cycle(&[keep.clone(), vinyl("gone", "12.00", true)], 0).await;
    h.sink.take();

    h.sink.fail_edits.store(true, Ordering::SeqCst);
    h.sink.fail_sends.store(true, Ordering::SeqCst);
    let summary = h.cycle(std::slice::from_ref(&keep), 1).await;
    assert_eq!(summary.failed, 1);
    assert!(!h.record("gone").await.removed);

    h.sink.fail_edits.store(false, Ordering::SeqCst);
    h.sink.fail_sends.store(false, Ordering::SeqCst);
    let summary = h.cycle(&[keep], 2).await;
    assert_eq!(summary.removed, 1);
    assert_eq!(h.sink.take().len(), 1);
}

#[tokio::test]
async fn reappearing_product_restocks_under_default_policy() {
    let h = Harness::new();
    let keep = vinyl("keep", "10.00", true);
    h.cycle(&[keep.clone(), vinyl("back", "12.00", true)], 0).await;
    h.cycle(std::slice::from_ref(&keep), 1).await;
    h.sink.take();

    h.cycle(&[keep, vinyl("back", "12.00", true)], 2).await;
    let calls = h.sink.take();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, CallKind::Edit);
    assert_eq!(calls[0].id, "msg-2");
    assert_eq!(calls[0].status(), "Back in stock");
    assert!(!h.record("back").await.removed);
}

#[tokio::test]
async fn reappearing_product_is_new_under_fresh_policy() {
    let h = Harness::with_policy(ReconcilePolicy {
        reappear: ReappearPolicy::Fresh,
        ..ReconcilePolicy::default()
    });
    let keep = vinyl("keep", "10.00", true);
    h.cycle(&[keep.clone(), vinyl("back", "12.00", true)], 0).await;
    h.cycle(std::slice::from_ref(&keep), 1).await;
    h.sink.take();

    h.cycle(&[keep, vinyl("back", "12.00", true)], 2).await;
    let calls = h.sink.take();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].is_send());
    assert_eq!(calls[0].status(), "New listing");

    let record = h.record("back").await;
    assert!(!record.removed);
    assert_eq!(record.message_id.as_deref(), Some("msg-3"));
}

#[tokio::test]
async fn empty_catalog_changes_nothing() {
    let h = Harness::new();
    h.cycle(&[vinyl("x", "10.00", true)], 0).await;
    h.sink.take();

    let summary = h.cycle(&[], 1).await;
    assert!(summary.skipped_empty);
    assert!(h.sink.calls().is_empty());
    assert!(!h.record("x").await.removed);

    let index: CatalogIndexRecord = h
        .store
        .catalog_index(&origin(), "100")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(index.observed_at, at(0));
}

// ---------------------------------------------------------------------------
// Sink failures and force refresh
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_first_send_creates_no_record() {
    let h = Harness::new();
    h.sink.fail_sends.store(true, Ordering::SeqCst);

    let summary = h.cycle(&[vinyl("x", "10.00", true)], 0).await;
    assert_eq!(summary.failed, 1);
    let key = ProductKey::new(&origin(), &handle("x"), "100");
    assert!(h.store.product(&key).await.unwrap().is_none());

    h.sink.fail_sends.store(false, Ordering::SeqCst);
    h.cycle(&[vinyl("x", "10.00", true)], 1).await;
    assert_eq!(h.sink.calls().len(), 1);
}

#[tokio::test]
async fn failed_transition_does_not_advance_state() {
    let h = Harness::new();
    h.cycle(&[vinyl("x", "10.00", true)], 0).await;
    h.sink.take();

    h.sink.fail_edits.store(true, Ordering::SeqCst);
    h.sink.fail_sends.store(true, Ordering::SeqCst);
    h.cycle(&[vinyl("x", "10.00", false)], 1).await;

    let record = h.record("x").await;
    assert!(record.available);
    assert_eq!(record.message_id.as_deref(), Some("msg-1"));
    assert!(!record.last_snapshot.unwrap().is_available());

    h.sink.fail_edits.store(false, Ordering::SeqCst);
    h.sink.fail_sends.store(false, Ordering::SeqCst);
    h.cycle(&[vinyl("x", "10.00", false)], 2).await;
    let calls = h.sink.take();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, CallKind::Edit);
}

#[tokio::test]
async fn force_refresh_re_renders_each_message_once() {
    let h = Harness::new();
    h.cycle(
        &[vinyl("a", "10.00", true), vinyl("quiet", "11.00", false)],
        0,
    )
    .await;
    h.sink.take();

    let catalog = [vinyl("a", "10.00", true), vinyl("quiet", "11.00", false)];
    h.cycle_with(&catalog, 1, true).await;
    let calls = h.sink.take();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, CallKind::Edit);
    assert_eq!(calls[0].status(), "In stock");
    assert!(h.record("a").await.force_refreshed);

    h.cycle_with(&catalog, 2, true).await;
    assert!(h.sink.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Legacy migration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn legacy_record_is_migrated_once_and_reused() {
    let h = Harness::new();
    let product = vinyl("x", "10.00", true);
    let key = ProductKey::new(&origin(), &handle("x"), "100");
    let legacy = json!({
        "available": true,
        "contentHash": content_hash(&product.variants),
        "messageId": "legacy-7",
    });
    h.store
        .kv()
        .put(&key.legacy_storage_key(), legacy.as_object().cloned().unwrap())
        .await
        .unwrap();

    h.cycle(std::slice::from_ref(&product), 0).await;
    assert!(h.sink.calls().is_empty());
    let entries = h.store.kv().snapshot().await;
    assert_eq!(entries[&key.legacy_storage_key()]["_migrated"], json!(true));
    assert_eq!(entries[&key.storage_key()]["message_id"], json!("legacy-7"));

    h.cycle(&[vinyl("x", "10.00", false)], 1).await;
    let calls = h.sink.take();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, CallKind::Edit);
    assert_eq!(calls[0].id, "legacy-7");
}

#[tokio::test]
async fn reconcile_product_reports_action() {
    let h = Harness::new();
    let reconciler = Reconciler::new(&h.store, &h.sink, &h.renderer, h.policy);
    let key = ProductKey::new(&origin(), &handle("x"), "100");

    let first = reconciler
        .reconcile_product(&key, &vinyl("x", "10.00", true), false, at(0))
        .await
        .unwrap();
    let second = reconciler
        .reconcile_product(&key, &vinyl("x", "10.00", true), false, at(1))
        .await
        .unwrap();
    assert_eq!(first, Action::Sent);
    assert_eq!(second, Action::Unchanged);
}
