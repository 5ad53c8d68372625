use std::sync::Arc;

use futures::future::{join_all, BoxFuture, FutureExt};
use tracing::{debug, warn};

use super::{OrchestratedExecutionResult, OrchestratedJob, OrchestratedTask};
use crate::error::JobResult;

/// One schedulable piece of a job body
enum Unit<'a> {
    Task(&'a Arc<dyn OrchestratedTask>),
    Child(&'a Arc<dyn OrchestratedJob>),
}

impl<'a> Unit<'a> {
    fn run(self) -> BoxFuture<'a, JobResult<OrchestratedExecutionResult>> {
        match self {
            Unit::Task(task) => async move {
                debug!(task = task.name(), "Executing task");
                let result = task.execute().await;
                match &result {
                    Ok(OrchestratedExecutionResult::Success) => {}
                    Ok(other) => warn!(task = task.name(), result = %other, "Task did not succeed"),
                    Err(e) => warn!(task = task.name(), error = %e, "Task failed"),
                }
                result
            }
            .boxed(),
            Unit::Child(child) => execute_orchestrated_job(child.as_ref()),
        }
    }
}

/// Execute a job: start-up, body, then tear-down with the aggregate.
///
/// A fatal `Err` from the start-up hook, a task or a child is returned after
/// tear-down has run; tear-down receives `TerminalError` in that case.
pub fn execute_orchestrated_job(
    job: &dyn OrchestratedJob,
) -> BoxFuture<'_, JobResult<OrchestratedExecutionResult>> {
    async move {
        debug!(job = job.name(), asynchronous = job.asynchronous(), "Starting orchestrated job");

        let outcome = match job.start_up().await {
            Ok(OrchestratedExecutionResult::Success) => run_body(job).await,
            Ok(other) => {
                warn!(job = job.name(), result = %other, "Start-up did not succeed, skipping job body");
                Ok(other)
            }
            Err(e) => Err(e),
        };

        let aggregate = match &outcome {
            Ok(result) => *result,
            Err(_) => OrchestratedExecutionResult::TerminalError,
        };

        let torn_down = job.tear_down(aggregate).await;

        let result = outcome?;
        torn_down?;
        debug!(job = job.name(), %result, "Finished orchestrated job");
        Ok(result)
    }
    .boxed()
}

async fn run_body(job: &dyn OrchestratedJob) -> JobResult<OrchestratedExecutionResult> {
    let tasks = job.tasks().iter().map(Unit::Task);
    let children = job.child_jobs().iter().map(Unit::Child);

    if job.asynchronous() {
        let results = join_all(tasks.chain(children).map(Unit::run)).await;

        // Every unit has finished by now; surface the first fatal error
        let mut aggregate = OrchestratedExecutionResult::Success;
        for result in results {
            aggregate = aggregate.combine(result?);
        }
        return Ok(aggregate);
    }

    let ordered: Vec<Unit<'_>> = if job.tasks_first() {
        tasks.chain(children).collect()
    } else {
        children.chain(tasks).collect()
    };

    let mut aggregate = OrchestratedExecutionResult::Success;
    for unit in ordered {
        aggregate = aggregate.combine(unit.run().await?);
        if aggregate == OrchestratedExecutionResult::TerminalError {
            warn!(job = job.name(), "Terminal error, skipping remaining units");
            break;
        }
    }
    Ok(aggregate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    type Log = Arc<Mutex<Vec<String>>>;

    struct RecordingTask {
        name: String,
        result: OrchestratedExecutionResult,
        fail: bool,
        log: Log,
    }

    impl RecordingTask {
        fn new(name: &str, result: OrchestratedExecutionResult, log: &Log) -> Arc<dyn OrchestratedTask> {
            Arc::new(Self {
                name: name.to_string(),
                result,
                fail: false,
                log: log.clone(),
            })
        }

        fn failing(name: &str, log: &Log) -> Arc<dyn OrchestratedTask> {
            Arc::new(Self {
                name: name.to_string(),
                result: OrchestratedExecutionResult::Success,
                fail: true,
                log: log.clone(),
            })
        }
    }

    #[async_trait]
    impl OrchestratedTask for RecordingTask {
        fn name(&self) -> &str {
            &self.name
        }

        async fn execute(&self) -> JobResult<OrchestratedExecutionResult> {
            self.log.lock().push(self.name.clone());
            if self.fail {
                return Err(JobError::failed(format!("{} exploded", self.name)));
            }
            Ok(self.result)
        }
    }

    struct RecordingJob {
        name: String,
        tasks: Vec<Arc<dyn OrchestratedTask>>,
        children: Vec<Arc<dyn OrchestratedJob>>,
        asynchronous: bool,
        tasks_first: bool,
        start_up: OrchestratedExecutionResult,
        log: Log,
    }

    impl RecordingJob {
        fn new(name: &str, tasks: Vec<Arc<dyn OrchestratedTask>>, log: &Log) -> Self {
            Self {
                name: name.to_string(),
                tasks,
                children: Vec::new(),
                asynchronous: false,
                tasks_first: true,
                start_up: OrchestratedExecutionResult::Success,
                log: log.clone(),
            }
        }
    }

    #[async_trait]
    impl OrchestratedJob for RecordingJob {
        fn name(&self) -> &str {
            &self.name
        }

        fn tasks(&self) -> &[Arc<dyn OrchestratedTask>] {
            &self.tasks
        }

        fn child_jobs(&self) -> &[Arc<dyn OrchestratedJob>] {
            &self.children
        }

        fn asynchronous(&self) -> bool {
            self.asynchronous
        }

        fn tasks_first(&self) -> bool {
            self.tasks_first
        }

        async fn start_up(&self) -> JobResult<OrchestratedExecutionResult> {
            self.log.lock().push(format!("{}:start_up", self.name));
            Ok(self.start_up)
        }

        async fn tear_down(&self, result: OrchestratedExecutionResult) -> JobResult<()> {
            self.log.lock().push(format!("{}:tear_down:{}", self.name, result));
            Ok(())
        }
    }

    fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn test_children_first_ordering() {
        let log = new_log();
        let child = RecordingJob::new("child", vec![RecordingTask::new("c1", OrchestratedExecutionResult::Success, &log)], &log);

        let mut job = RecordingJob::new("parent", vec![RecordingTask::new("t1", OrchestratedExecutionResult::Success, &log)], &log);
        job.children.push(Arc::new(child));
        job.tasks_first = false;

        let result = execute_orchestrated_job(&job).await.unwrap();
        assert_eq!(result, OrchestratedExecutionResult::Success);
        assert_eq!(
            *log.lock(),
            vec![
                "parent:start_up",
                "child:start_up",
                "c1",
                "child:tear_down:Success",
                "t1",
                "parent:tear_down:Success",
            ]
        );
    }

    #[tokio::test]
    async fn test_start_up_failure_skips_body() {
        let log = new_log();
        let mut job = RecordingJob::new("job", vec![RecordingTask::new("t1", OrchestratedExecutionResult::Success, &log)], &log);
        job.start_up = OrchestratedExecutionResult::NonTerminalError;

        let result = execute_orchestrated_job(&job).await.unwrap();
        assert_eq!(result, OrchestratedExecutionResult::NonTerminalError);
        assert_eq!(*log.lock(), vec!["job:start_up", "job:tear_down:NonTerminalError"]);
    }

    #[tokio::test]
    async fn test_sequential_stops_on_terminal_error() {
        let log = new_log();
        let job = RecordingJob::new(
            "job",
            vec![
                RecordingTask::new("t1", OrchestratedExecutionResult::NonTerminalError, &log),
                RecordingTask::new("t2", OrchestratedExecutionResult::TerminalError, &log),
                RecordingTask::new("t3", OrchestratedExecutionResult::Success, &log),
            ],
            &log,
        );

        let result = execute_orchestrated_job(&job).await.unwrap();
        assert_eq!(result, OrchestratedExecutionResult::TerminalError);
        assert_eq!(*log.lock(), vec!["job:start_up", "t1", "t2", "job:tear_down:TerminalError"]);
    }

    #[tokio::test]
    async fn test_task_error_propagates_after_tear_down() {
        let log = new_log();
        let job = RecordingJob::new(
            "job",
            vec![
                RecordingTask::failing("t1", &log),
                RecordingTask::new("t2", OrchestratedExecutionResult::Success, &log),
            ],
            &log,
        );

        let err = execute_orchestrated_job(&job).await.unwrap_err();
        assert!(matches!(err, JobError::Failed(_)));
        assert_eq!(*log.lock(), vec!["job:start_up", "t1", "job:tear_down:TerminalError"]);
    }

    #[tokio::test]
    async fn test_asynchronous_error_waits_for_siblings() {
        let log = new_log();
        let mut job = RecordingJob::new(
            "job",
            vec![
                RecordingTask::failing("t1", &log),
                RecordingTask::new("t2", OrchestratedExecutionResult::Success, &log),
            ],
            &log,
        );
        job.asynchronous = true;

        assert!(execute_orchestrated_job(&job).await.is_err());

        let log = log.lock();
        assert!(log.contains(&"t2".to_string()));
        assert_eq!(log.last().map(String::as_str), Some("job:tear_down:TerminalError"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_asynchronous_units_overlap() {
        struct SleepyTask(&'static str);

        #[async_trait]
        impl OrchestratedTask for SleepyTask {
            fn name(&self) -> &str {
                self.0
            }

            async fn execute(&self) -> JobResult<OrchestratedExecutionResult> {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(OrchestratedExecutionResult::Success)
            }
        }

        let log = new_log();
        let mut job = RecordingJob::new(
            "job",
            (0..3).map(|_| Arc::new(SleepyTask("sleepy")) as Arc<dyn OrchestratedTask>).collect(),
            &log,
        );
        job.asynchronous = true;

        let started = tokio::time::Instant::now();
        execute_orchestrated_job(&job).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(20));
    }
}
