use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use clo_scheduler::{JobPayload, ScheduledJobDetails, ScheduledJobType};

use crate::error::{JobError, JobResult};
use crate::orchestration::{
    execute_orchestrated_job, OrchestratedExecutionResult, OrchestratedJob, OrchestratedTask,
};

/// Handler built for one delivery of a job
#[derive(Clone)]
pub enum JobHandler {
    /// Flat job: a single task
    Task(Arc<dyn OrchestratedTask>),

    /// Job fanned out into tasks and child jobs
    Orchestrated(Arc<dyn OrchestratedJob>),
}

impl JobHandler {
    pub fn is_orchestrated(&self) -> bool {
        matches!(self, Self::Orchestrated(_))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Task(task) => task.name(),
            Self::Orchestrated(job) => job.name(),
        }
    }

    pub async fn execute(&self) -> JobResult<OrchestratedExecutionResult> {
        match self {
            Self::Task(task) => task.execute().await,
            Self::Orchestrated(job) => execute_orchestrated_job(job.as_ref()).await,
        }
    }
}

impl std::fmt::Debug for JobHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandler")
            .field("name", &self.name())
            .field("orchestrated", &self.is_orchestrated())
            .finish()
    }
}

/// Builds a handler from a decoded payload
pub type HandlerConstructor = Arc<dyn Fn(JobPayload) -> JobResult<JobHandler> + Send + Sync>;

/// Registry mapping job types to handler constructors
#[derive(Default)]
pub struct JobRunnerRegistry {
    constructors: HashMap<ScheduledJobType, HandlerConstructor>,
}

impl JobRunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the constructor for a job type
    pub fn register<F>(&mut self, job_type: ScheduledJobType, constructor: F) -> JobResult<()>
    where
        F: Fn(JobPayload) -> JobResult<JobHandler> + Send + Sync + 'static,
    {
        if self.constructors.contains_key(&job_type) {
            return Err(JobError::AlreadyRegistered(job_type));
        }
        self.constructors.insert(job_type, Arc::new(constructor));
        Ok(())
    }

    pub fn is_registered(&self, job_type: ScheduledJobType) -> bool {
        self.constructors.contains_key(&job_type)
    }

    /// Registered job types, sorted
    pub fn registered_types(&self) -> Vec<ScheduledJobType> {
        let mut types: Vec<_> = self.constructors.keys().copied().collect();
        types.sort();
        types
    }

    /// Decode the payload and build the handler for a job record.
    ///
    /// Decoding happens before the constructor runs, so a missing payload
    /// key fails here and no task is ever built.
    pub fn resolve(&self, details: &ScheduledJobDetails) -> JobResult<JobHandler> {
        let job_type = details.job_type;
        let constructor = self
            .constructors
            .get(&job_type)
            .ok_or(JobError::NoHandlerRegistered(job_type))?;

        let payload = details
            .decode_payload()
            .map_err(|source| JobError::payload(job_type, source))?;

        let handler = constructor(payload)?;
        if handler.is_orchestrated() != details.orchestrated {
            return Err(JobError::HandlerKindMismatch {
                job_type,
                orchestrated: details.orchestrated,
            });
        }

        debug!(job_id = %details.job_id, %job_type, handler = handler.name(), "Resolved job handler");
        Ok(handler)
    }

    /// Resolve and execute the handler for a job record
    pub async fn run(&self, details: &ScheduledJobDetails) -> JobResult<OrchestratedExecutionResult> {
        let handler = self.resolve(details)?;
        handler.execute().await
    }
}
