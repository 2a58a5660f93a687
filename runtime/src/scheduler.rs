//! Cron-driven re-checks of tracked domains.
//!
//! At most one automation job exists. Applying new settings removes the
//! current job and, when automation is enabled with a schedule, adds a
//! replacement.

use anyhow::{bail, Context, Result};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;
use uuid::Uuid;

use crate::config::Settings;

/// The work a scheduled run performs.
pub type RunFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Convert a cron expression to the six-field form the scheduler expects.
///
/// Five-field expressions (minute precision) get a leading `0` seconds
/// field; six- and seven-field expressions pass through.
pub fn normalize_cron(expr: &str) -> Result<String> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    match fields.len() {
        5 => Ok(format!("0 {}", fields.join(" "))),
        6 | 7 => Ok(fields.join(" ")),
        n => bail!("invalid cron expression {expr:?}: expected 5 or 6 fields, got {n}"),
    }
}

/// Owns the cron scheduler and the current automation job.
pub struct Automation {
    scheduler: JobScheduler,
    job: Mutex<Option<Uuid>>,
    run: RunFn,
}

impl Automation {
    /// Start an empty scheduler.
    pub async fn start(run: RunFn) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .context("failed to create scheduler")?;
        scheduler
            .start()
            .await
            .context("failed to start scheduler")?;

        Ok(Self {
            scheduler,
            job: Mutex::new(None),
            run,
        })
    }

    /// Replace the automation job according to `settings`.
    ///
    /// Returns the new job id, or `None` when automation is off. An invalid
    /// schedule leaves no job in place.
    pub async fn apply(&self, settings: &Settings) -> Result<Option<Uuid>> {
        let mut current = self.job.lock().await;

        if let Some(old) = current.take() {
            self.scheduler
                .remove(&old)
                .await
                .context("failed to remove automation job")?;
            info!(job = %old, "automation job removed");
        }

        let schedule = match (settings.automation, settings.cron_schedule()) {
            (true, Some(schedule)) => normalize_cron(schedule)?,
            _ => return Ok(None),
        };

        let run = Arc::clone(&self.run);
        let job = Job::new_async(schedule.as_str(), move |_id, _scheduler| {
            let run = Arc::clone(&run);
            Box::pin(async move { run().await })
        })
        .with_context(|| format!("invalid cron schedule {schedule:?}"))?;

        let id = self
            .scheduler
            .add(job)
            .await
            .context("failed to add automation job")?;
        info!(job = %id, schedule = %schedule, "automation job scheduled");

        *current = Some(id);
        Ok(Some(id))
    }

    pub async fn active_job(&self) -> Option<Uuid> {
        *self.job.lock().await
    }

    pub async fn shutdown(&self) -> Result<()> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .context("failed to stop scheduler")?;
        Ok(())
    }
}
