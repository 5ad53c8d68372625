use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};

use clo_scheduler::{ClaimedJob, Scheduler};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::orchestration::OrchestratedExecutionResult;
use crate::runner::JobRunnerRegistry;

/// Instruction sent to a running worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerSignal {
    /// Do not claim jobs
    Hold,
    /// Claim and run jobs
    Process,
    /// Stop the loop once in-flight work is done
    Exit,
}

/// Observable lifecycle of the worker loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    WaitingToStart,
    Processing,
    /// No longer claiming; idle until told to process again or exit
    Draining,
    Exited,
}

/// Handle for managing worker lifecycle
pub struct WorkerHandle {
    signal_tx: watch::Sender<WorkerSignal>,
    state_rx: watch::Receiver<WorkerState>,
    join_handle: JoinHandle<WorkerResult<()>>,
}

impl WorkerHandle {
    pub fn start_processing(&self) {
        self.signal_tx.send_replace(WorkerSignal::Process);
    }

    /// Stop claiming new jobs; a job already running is finished first
    pub fn stop_processing(&self) {
        self.signal_tx.send_replace(WorkerSignal::Hold);
    }

    pub fn exit(&self) {
        self.signal_tx.send_replace(WorkerSignal::Exit);
    }

    pub fn state(&self) -> WorkerState {
        *self.state_rx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<WorkerState> {
        self.state_rx.clone()
    }

    /// Wait until the loop reports `target`
    pub async fn wait_for_state(&self, target: WorkerState) -> WorkerResult<()> {
        let mut state_rx = self.state_rx.clone();
        state_rx
            .wait_for(|state| *state == target)
            .await
            .map(|_| ())
            .map_err(|_| WorkerError::Stopped)
    }

    pub async fn join(self) -> WorkerResult<()> {
        self.join_handle
            .await
            .map_err(|e| WorkerError::Join(e.to_string()))?
    }

    /// Gracefully shutdown the worker
    pub async fn shutdown(self) -> WorkerResult<()> {
        self.stop_processing();
        self.exit();
        self.join().await
    }
}

/// Polls the scheduler and runs one job at a time
pub struct Worker {
    scheduler: Arc<dyn Scheduler>,
    registry: Arc<JobRunnerRegistry>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(scheduler: Arc<dyn Scheduler>, registry: Arc<JobRunnerRegistry>, config: WorkerConfig) -> Self {
        Self {
            scheduler,
            registry,
            config,
        }
    }

    /// Spawn the loop in `WaitingToStart`; nothing is claimed until
    /// [`WorkerHandle::start_processing`]
    pub fn spawn(self) -> WorkerHandle {
        let (signal_tx, signal_rx) = watch::channel(WorkerSignal::Hold);
        let (state_tx, state_rx) = watch::channel(WorkerState::WaitingToStart);

        let join_handle = tokio::spawn(
            self.run(signal_rx, state_tx)
                .instrument(info_span!("worker")),
        );

        WorkerHandle {
            signal_tx,
            state_rx,
            join_handle,
        }
    }

    async fn run(
        self,
        mut signals: watch::Receiver<WorkerSignal>,
        state_tx: watch::Sender<WorkerState>,
    ) -> WorkerResult<()> {
        let mut state = WorkerState::WaitingToStart;
        info!("Worker waiting to start");

        loop {
            let signal = *signals.borrow_and_update();
            let next = match (state, signal) {
                (_, WorkerSignal::Exit) => break,
                (WorkerState::Processing, WorkerSignal::Process) => {
                    if !self.poll_once(&mut signals).await {
                        break;
                    }
                    continue;
                }
                (WorkerState::Processing, WorkerSignal::Hold) => WorkerState::Draining,
                (_, WorkerSignal::Process) => WorkerState::Processing,
                (_, WorkerSignal::Hold) => {
                    // Handle dropped means nobody can signal us again
                    if signals.changed().await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            state = next;
            info!(?state, "Worker state changed");
            state_tx.send_replace(state);
        }

        state_tx.send_replace(WorkerState::Exited);
        info!("Worker exited");
        Ok(())
    }

    /// Sleep the poll interval, then claim and run at most one job.
    ///
    /// Returns `false` once the signal channel is closed.
    async fn poll_once(&self, signals: &mut watch::Receiver<WorkerSignal>) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.config.poll_interval) => {}
            changed = signals.changed() => return changed.is_ok(),
        }

        if let Err(e) = self.process_next_job().await {
            error!(severity = "critical", error = %e, "Worker iteration failed");
        }
        true
    }

    /// Claim the next job, if any, and run it
    pub async fn process_next_job(&self) -> WorkerResult<bool> {
        let Some(claimed) = self.scheduler.get_job_to_process().await? else {
            return Ok(false);
        };

        let span = info_span!(
            "job",
            job_id = %claimed.job.job_id,
            job_type = %claimed.job.job_type
        );
        self.run_claimed(claimed).instrument(span).await?;
        Ok(true)
    }

    async fn run_claimed(&self, claimed: ClaimedJob) -> WorkerResult<()> {
        info!(run_count = claimed.job.run_count, "Processing job");

        let renewal = self.spawn_visibility_renewal(&claimed);
        let outcome = AssertUnwindSafe(self.registry.run(&claimed.job))
            .catch_unwind()
            .await;
        drop(renewal);

        match outcome {
            Ok(Ok(result)) if result.completes_iteration() => {
                if result == OrchestratedExecutionResult::NonTerminalError {
                    warn!("Job finished with non-terminal errors");
                }
                self.scheduler.complete_job_iteration(&claimed).await?;
                info!(%result, "Completed job iteration");
            }
            Ok(Ok(result)) => {
                error!(severity = "critical", %result, "Job failed, leaving it for redelivery");
            }
            Ok(Err(e)) => {
                error!(severity = "critical", error = %e, "Job failed, leaving it for redelivery");
            }
            Err(panic) => {
                error!(
                    severity = "critical",
                    panic = %panic_message(&*panic),
                    "Job handler panicked, leaving it for redelivery"
                );
            }
        }
        Ok(())
    }

    fn spawn_visibility_renewal(&self, claimed: &ClaimedJob) -> RenewalGuard {
        let scheduler = self.scheduler.clone();
        let mut claimed = claimed.clone();
        let every = self.config.visibility_renewal_interval;
        let timeout = self.config.visibility_timeout;

        let renewal = async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match scheduler.increase_visibility_timeout(&claimed, timeout).await {
                    Ok(renewed) => {
                        debug!(visible_until = %renewed.visible_until, "Renewed job visibility");
                        claimed = renewed;
                    }
                    Err(e) => warn!(error = %e, "Failed to renew job visibility"),
                }
            }
        };

        RenewalGuard(tokio::spawn(renewal.in_current_span()))
    }
}

/// Stops visibility renewal when the job finishes, panics included
struct RenewalGuard(JoinHandle<()>);

impl Drop for RenewalGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
