use std::sync::Arc;

use tracing::info;

use clo_lease::{ConcurrencyMonitor, LeaseStore};
use clo_scheduler::Scheduler;

use crate::collaborators::Collaborators;
use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::jobs::register_default_handlers;
use crate::runner::JobRunnerRegistry;
use crate::seeding::{seed_with_lease, SeedReport};
use crate::worker::{Worker, WorkerHandle};

/// A fully wired worker process
pub struct WorkerApp {
    pub handle: WorkerHandle,

    /// `None` when another instance held the startup lease
    pub seed_report: Option<SeedReport>,
}

/// Wire handlers, seed recurring jobs under the startup lease, and spawn
/// the worker loop.
///
/// Seeding failures are fatal: the loop is never started without the
/// recurring jobs in place.
pub async fn build(
    config: WorkerConfig,
    scheduler: Arc<dyn Scheduler>,
    lease_store: Arc<dyn LeaseStore>,
    collaborators: Collaborators,
) -> WorkerResult<WorkerApp> {
    config.validate()?;

    let mut registry = JobRunnerRegistry::new();
    register_default_handlers(&mut registry, &collaborators)?;

    let monitor = ConcurrencyMonitor::new(lease_store, config.lease_config());
    let seed_report = seed_with_lease(
        &monitor,
        scheduler.as_ref(),
        config.file_pipeline_interval_minutes,
    )
    .await?;

    match &seed_report {
        Some(report) => info!(
            scheduled = report.scheduled.len(),
            skipped = report.skipped.len(),
            "Seeded recurring jobs"
        ),
        None => info!("Another instance is seeding recurring jobs"),
    }

    let process_jobs = config.process_jobs;
    let handle = Worker::new(scheduler, Arc::new(registry), config).spawn();
    if process_jobs {
        handle.start_processing();
    }

    Ok(WorkerApp {
        handle,
        seed_report,
    })
}
