//! Recurring sweep job.

use std::sync::Arc;
use std::time::Duration;

use stockwatch_engine::Watcher;
use stockwatch_notify::NotificationSink;
use stockwatch_store::KeyValueStore;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts a scheduler that runs one sweep every `interval_secs`.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. A tick that fires while the previous sweep
/// of a target is still running skips that target.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler<S, N>(
    watcher: Arc<Watcher<S, N>>,
    interval_secs: u64,
) -> Result<JobScheduler, JobSchedulerError>
where
    S: KeyValueStore + 'static,
    N: NotificationSink + 'static,
{
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_repeated_async(Duration::from_secs(interval_secs), move |_uuid, _lock| {
        let watcher = Arc::clone(&watcher);
        Box::pin(async move {
            tracing::debug!("scheduler: starting sweep");
            watcher.run_once().await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(interval_secs, "scheduler: registered sweep job");
    scheduler.start().await?;
    Ok(scheduler)
}
