//! One sweep over every configured target.
//!
//! Each (storefront, destination) pair runs access check, discovery and
//! reconciliation in order. Pairs run concurrently up to
//! `max_concurrent_targets`; a pair whose previous sweep is still running is
//! skipped rather than queued, and one pair's failure never stops the others.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use futures::stream::{self, StreamExt};
use stockwatch_core::{AppConfig, KeywordMatcher, StorefrontOrigin, WatchTarget};
use stockwatch_notify::{NotificationSink, Renderer};
use stockwatch_scraper::{check_access_state, CatalogDiscovery};
use stockwatch_store::{KeyValueStore, StateStore};
use tokio::sync::Mutex;

use crate::access::AccessMonitor;
use crate::error::EngineError;
use crate::reconcile::{PassSummary, ReconcilePolicy, Reconciler};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub policy: ReconcilePolicy,
    pub access_cooldown: TimeDelta,
    pub force_refresh_origins: HashSet<StorefrontOrigin>,
    pub max_concurrent_targets: usize,
    pub target_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            policy: ReconcilePolicy::default(),
            access_cooldown: TimeDelta::hours(6),
            force_refresh_origins: HashSet::new(),
            max_concurrent_targets: 4,
            target_timeout: Duration::from_secs(300),
        }
    }
}

impl EngineSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            policy: ReconcilePolicy {
                price_change: config.price_change_policy,
                reappear: config.reappear_policy,
            },
            access_cooldown: i64::try_from(config.access_cooldown_secs)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .unwrap_or(TimeDelta::MAX),
            force_refresh_origins: config.force_refresh_origins.clone(),
            max_concurrent_targets: config.max_concurrent_shops.max(1),
            target_timeout: Duration::from_secs(config.sweep_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub targets: usize,
    pub completed: usize,
    /// Targets whose previous sweep was still running.
    pub skipped_busy: usize,
    /// Targets that errored or timed out.
    pub failed: usize,
    pub sent: usize,
    pub edited: usize,
    pub removed: usize,
}

impl SweepSummary {
    fn absorb(&mut self, outcome: TargetOutcome) {
        match outcome {
            TargetOutcome::Done(pass) => {
                self.completed += 1;
                self.sent += pass.sent;
                self.edited += pass.edited;
                self.removed += pass.removed;
            }
            TargetOutcome::Busy => self.skipped_busy += 1,
            TargetOutcome::Failed => self.failed += 1,
        }
    }
}

enum TargetOutcome {
    Done(PassSummary),
    Busy,
    Failed,
}

/// Owns every collaborator a sweep needs; shared behind an `Arc` by the
/// scheduler.
pub struct Watcher<S, N> {
    discovery: CatalogDiscovery,
    store: StateStore<S>,
    sink: N,
    renderer: Renderer,
    keywords: KeywordMatcher,
    targets: Vec<WatchTarget>,
    settings: EngineSettings,
    gates: HashMap<String, Mutex<()>>,
}

impl<S: KeyValueStore, N: NotificationSink> Watcher<S, N> {
    #[must_use]
    pub fn new(
        discovery: CatalogDiscovery,
        store: StateStore<S>,
        sink: N,
        renderer: Renderer,
        keywords: KeywordMatcher,
        targets: Vec<WatchTarget>,
        settings: EngineSettings,
    ) -> Self {
        let gates = targets
            .iter()
            .map(|t| (t.id(), Mutex::new(())))
            .collect();
        Self {
            discovery,
            store,
            sink,
            renderer,
            keywords,
            targets,
            settings,
            gates,
        }
    }

    #[must_use]
    pub fn store(&self) -> &StateStore<S> {
        &self.store
    }

    /// Runs one sweep over all targets and flushes state at the end.
    pub async fn run_once(&self) -> SweepSummary {
        let started = std::time::Instant::now();
        let mut summary = SweepSummary {
            targets: self.targets.len(),
            ..SweepSummary::default()
        };

        // Collected up front so the stream holds plain futures rather than a
        // borrowing closure; the sweep future must stay Send for the scheduler.
        let passes: Vec<_> = self
            .targets
            .iter()
            .map(|target| self.sweep_target(target))
            .collect();
        let outcomes: Vec<TargetOutcome> = stream::iter(passes)
            .buffer_unordered(self.settings.max_concurrent_targets.max(1))
            .collect()
            .await;
        for outcome in outcomes {
            summary.absorb(outcome);
        }

        if let Err(e) = self.store.flush().await {
            tracing::warn!(error = %e, "state not persisted after sweep, will retry");
        }

        tracing::info!(
            targets = summary.targets,
            completed = summary.completed,
            skipped_busy = summary.skipped_busy,
            failed = summary.failed,
            sent = summary.sent,
            edited = summary.edited,
            removed = summary.removed,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "sweep finished"
        );
        summary
    }

    async fn sweep_target(&self, target: &WatchTarget) -> TargetOutcome {
        let id = target.id();
        let Some(gate) = self.gates.get(&id) else {
            return TargetOutcome::Failed;
        };
        let Ok(_guard) = gate.try_lock() else {
            tracing::warn!(pair = %id, "previous sweep still running, skipping");
            return TargetOutcome::Busy;
        };

        match tokio::time::timeout(self.settings.target_timeout, self.run_target(target)).await {
            Ok(Ok(pass)) => TargetOutcome::Done(pass),
            Ok(Err(e)) => {
                tracing::error!(pair = %id, error = %e, "target sweep failed");
                TargetOutcome::Failed
            }
            Err(_) => {
                tracing::error!(
                    pair = %id,
                    timeout_secs = self.settings.target_timeout.as_secs(),
                    "target sweep timed out"
                );
                TargetOutcome::Failed
            }
        }
    }

    /// Access check, discovery and reconciliation for one target.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when reconciliation cannot read or write
    /// the catalog index. Access-check failures are logged and skipped.
    pub async fn run_target(&self, target: &WatchTarget) -> Result<PassSummary, EngineError> {
        let origin = &target.origin;

        match check_access_state(self.discovery.client(), origin).await {
            Ok(protected) => {
                let monitor = AccessMonitor::new(
                    &self.store,
                    &self.sink,
                    &self.renderer,
                    self.settings.access_cooldown,
                );
                if let Err(e) = monitor.apply(target, protected, Utc::now()).await {
                    tracing::warn!(pair = %target.id(), error = %e, "access state not updated");
                }
            }
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "access check failed, skipping this cycle");
            }
        }

        let catalog = self.discovery.discover(origin).await;
        let force_refresh = self.settings.force_refresh_origins.contains(origin);

        let reconciler = Reconciler::new(&self.store, &self.sink, &self.renderer, self.settings.policy);
        let pass = reconciler
            .reconcile(target, &catalog.products, &self.keywords, force_refresh, Utc::now())
            .await?;

        tracing::info!(
            pair = %target.id(),
            strategy = ?catalog.strategy,
            discovered = pass.discovered,
            wanted = pass.wanted,
            sent = pass.sent,
            edited = pass.edited,
            removed = pass.removed,
            failed = pass.failed,
            "target reconciled"
        );
        Ok(pass)
    }
}
