//! Per-(origin, destination) access-state notifications.

use chrono::{DateTime, TimeDelta, Utc};
use stockwatch_core::WatchTarget;
use stockwatch_notify::{EditOutcome, NotificationSink, Renderer};
use stockwatch_store::{AccessStateRecord, KeyValueStore, StateStore};

use crate::deliver::deliver;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    /// First check ever; state recorded without notifying.
    Baseline,
    /// State flipped; one notification sent or edited.
    Changed,
    /// State unchanged; the existing message was re-rendered after the cooldown.
    Refreshed,
    Unchanged,
}

pub struct AccessMonitor<'a, S, N> {
    store: &'a StateStore<S>,
    sink: &'a N,
    renderer: &'a Renderer,
    cooldown: TimeDelta,
}

impl<'a, S: KeyValueStore, N: NotificationSink> AccessMonitor<'a, S, N> {
    #[must_use]
    pub fn new(
        store: &'a StateStore<S>,
        sink: &'a N,
        renderer: &'a Renderer,
        cooldown: TimeDelta,
    ) -> Self {
        Self {
            store,
            sink,
            renderer,
            cooldown,
        }
    }

    /// Records the latest access check for `target` and notifies on change.
    ///
    /// `last_checked_at` tracks the last time the notification was created
    /// or touched, so the refresh cooldown runs from the last touch.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Notify`] when a change notification cannot be
    /// delivered (the baseline is left untouched so the change is retried),
    /// and [`EngineError::Store`] when state cannot be read or encoded.
    pub async fn apply(
        &self,
        target: &WatchTarget,
        protected: bool,
        now: DateTime<Utc>,
    ) -> Result<AccessOutcome, EngineError> {
        let prior = self
            .store
            .access(&target.origin, &target.destination)
            .await?
            .unwrap_or_default();

        let Some(previous) = prior.protected else {
            self.put(target, protected, prior.message_id, now).await?;
            tracing::info!(pair = %target.id(), protected, "access state baseline recorded");
            return Ok(AccessOutcome::Baseline);
        };

        if previous != protected {
            let content = self.renderer.access(protected, &target.origin, now);
            let delivery = deliver(
                self.sink,
                &target.destination,
                prior.message_id.as_deref(),
                &content,
            )
            .await?;
            self.put(target, protected, Some(delivery.into_message_id()), now)
                .await?;
            tracing::info!(pair = %target.id(), protected, "access state changed");
            return Ok(AccessOutcome::Changed);
        }

        let Some(message_id) = prior.message_id else {
            return Ok(AccessOutcome::Unchanged);
        };
        let due = prior
            .last_checked_at
            .is_none_or(|last| now - last >= self.cooldown);
        if !due {
            return Ok(AccessOutcome::Unchanged);
        }

        let content = self.renderer.access(protected, &target.origin, now);
        match self
            .sink
            .edit(&target.destination, &message_id, &content)
            .await
        {
            Ok(EditOutcome::Edited) => {
                self.put(target, protected, Some(message_id), now).await?;
                Ok(AccessOutcome::Refreshed)
            }
            Ok(EditOutcome::NotFound) => {
                tracing::warn!(pair = %target.id(), message_id = %message_id, "access message no longer exists, dropping it");
                self.put(target, protected, None, now).await?;
                Ok(AccessOutcome::Unchanged)
            }
            Err(e) => {
                tracing::warn!(pair = %target.id(), error = %e, "access message refresh failed");
                Ok(AccessOutcome::Unchanged)
            }
        }
    }

    async fn put(
        &self,
        target: &WatchTarget,
        protected: bool,
        message_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.store
            .put_access(
                &target.origin,
                &target.destination,
                &AccessStateRecord {
                    protected: Some(protected),
                    message_id,
                    last_checked_at: Some(now),
                },
            )
            .await?;
        Ok(())
    }
}
