use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use clo_lease::MemoryLeaseStore;
use clo_scheduler::MemoryScheduler;
use clo_worker::{app, telemetry, Collaborators, WorkerConfig, WorkerState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env()?;
    telemetry::init(config.log_format);

    // Durable queue, table and blob backends are provided by the deployment;
    // this binary runs against the in-process stand-ins
    let scheduler = Arc::new(MemoryScheduler::new().with_visibility_timeout(config.visibility_timeout));
    let lease_store = Arc::new(MemoryLeaseStore::new());

    let worker = app::build(config, scheduler, lease_store, Collaborators::in_memory()).await?;
    info!(state = ?worker.handle.state(), "Worker started");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, draining");

    worker.handle.stop_processing();
    if worker.handle.state() == WorkerState::Processing {
        worker.handle.wait_for_state(WorkerState::Draining).await?;
    }
    worker.handle.exit();
    worker.handle.join().await?;

    Ok(())
}
