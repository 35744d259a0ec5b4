//! Background poll loop for report exports.
//!
//! [`ExportPoller::start`] spawns one Tokio task per job. The task checks the
//! job's status at a constant interval until the remote queue reports a
//! terminal status, the attempt budget runs out, or the caller cancels. The
//! terminal [`ExportOutcome`] lands in a single-assignment slot on the
//! [`ExportHandle`], where any number of callers can read it.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

use crate::error::ExportError;

use super::job::{ExportOutcome, Job, PollConfig};
use super::state::{PollState, RetryReason, Transition};
use super::traits::{JobSubmitter, StatusChecker};

type OutcomeSlot = watch::Sender<Option<ExportOutcome>>;

/// Entry point for polling export jobs.
pub struct ExportPoller;

impl ExportPoller {
    /// Begin polling `job` in the background and return its handle.
    ///
    /// Must be called from within a Tokio runtime. Never blocks.
    pub fn start<C: StatusChecker>(
        job: Job,
        checker: Arc<C>,
        config: PollConfig,
    ) -> Result<ExportHandle, ExportError> {
        if job.job_id().trim().is_empty() {
            return Err(ExportError::InvalidConfig("job id must not be empty".into()));
        }
        config.validate()?;

        let id = Uuid::new_v4();
        let slot = Arc::new(watch::Sender::new(None));
        let outcome_rx = slot.subscribe();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (progress_tx, progress_rx) = watch::channel(0u32);

        let span = tracing::info_span!("export_poll", job_id = %job.job_id(), handle = %id);
        let task = tokio::spawn(
            run_loop(job.clone(), checker, config, slot.clone(), cancel_rx, progress_tx)
                .instrument(span),
        );

        info!(
            job_id = %job.job_id(),
            interval_ms = config.interval.as_millis() as u64,
            max_attempts = config.max_attempts,
            "Started export polling"
        );

        Ok(ExportHandle {
            id,
            job,
            config,
            slot: Arc::downgrade(&slot),
            outcome_rx,
            cancel_tx,
            progress_rx,
            task,
        })
    }

    /// Submit a job and start polling it.
    ///
    /// A submission failure is returned before anything is scheduled.
    pub async fn submit_and_start<S, C>(
        submitter: &S,
        params: &S::Params,
        checker: Arc<C>,
        config: PollConfig,
    ) -> Result<ExportHandle, ExportError>
    where
        S: JobSubmitter,
        C: StatusChecker,
    {
        config.validate()?;
        let job = submitter.submit(params).await?;
        Self::start(job, checker, config)
    }
}

/// Caller-side view of one running (or finished) poll loop.
pub struct ExportHandle {
    id: Uuid,
    job: Job,
    config: PollConfig,
    // The loop owns the only strong reference; once it exits the slot is
    // either filled or the loop died, and `await_result` can tell the two apart.
    slot: Weak<OutcomeSlot>,
    outcome_rx: watch::Receiver<Option<ExportOutcome>>,
    cancel_tx: watch::Sender<bool>,
    progress_rx: watch::Receiver<u32>,
    task: JoinHandle<()>,
}

impl ExportHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Status checks performed so far.
    pub fn attempts(&self) -> u32 {
        *self.progress_rx.borrow()
    }

    /// Receiver that changes after every status check.
    pub fn progress(&self) -> watch::Receiver<u32> {
        self.progress_rx.clone()
    }

    /// The terminal outcome, if one has been delivered.
    pub fn try_outcome(&self) -> Option<ExportOutcome> {
        self.outcome_rx.borrow().clone()
    }

    /// Whether the background loop has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the terminal outcome.
    ///
    /// With `Some(timeout)`, gives up after that long and returns `TimedOut`
    /// without cancelling the loop. Once an outcome exists every call returns
    /// it immediately.
    pub async fn await_result(&self, timeout: Option<Duration>) -> ExportOutcome {
        let mut rx = self.outcome_rx.clone();
        let wait = async move {
            rx.wait_for(Option::is_some)
                .await
                .map(|slot| slot.clone())
                .ok()
                .flatten()
        };

        let delivered = match timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(delivered) => delivered,
                Err(_) => {
                    debug!(job_id = %self.job.job_id(), "Caller timeout elapsed before export finished");
                    return ExportOutcome::TimedOut;
                }
            },
            None => wait.await,
        };

        delivered.unwrap_or_else(|| ExportOutcome::Failure {
            reason: "poll loop stopped without an outcome".into(),
        })
    }

    /// Stop polling. Later `await_result` calls return the cancelled failure
    /// unless an outcome was already delivered. Safe to call repeatedly.
    pub fn cancel(&self) {
        if let Some(slot) = self.slot.upgrade()
            && settle(&slot, ExportOutcome::cancelled())
        {
            info!(job_id = %self.job.job_id(), "Export polling cancelled");
        }
        self.cancel_tx.send_replace(true);
    }
}

/// Write the outcome unless one is already there.
fn settle(slot: &OutcomeSlot, outcome: ExportOutcome) -> bool {
    slot.send_if_modified(|current| {
        if current.is_some() {
            return false;
        }
        *current = Some(outcome);
        true
    })
}

async fn run_loop<C: StatusChecker>(
    job: Job,
    checker: Arc<C>,
    config: PollConfig,
    slot: Arc<OutcomeSlot>,
    mut cancel_rx: watch::Receiver<bool>,
    progress_tx: watch::Sender<u32>,
) {
    let mut state = PollState::new(config.max_attempts);

    loop {
        if *cancel_rx.borrow() {
            debug!(attempts = state.attempts(), "Cancellation observed before status check");
            return;
        }

        let result = checker.check_status(job.job_id()).await;

        if *cancel_rx.borrow() {
            debug!(attempts = state.attempts(), "Discarding status check finished after cancellation");
            return;
        }

        let transition = state.next(result);
        progress_tx.send_replace(state.attempts());

        match transition {
            Transition::Complete(outcome) => {
                info!(attempts = state.attempts(), outcome = %outcome, "Export reached terminal outcome");
                settle(&slot, outcome);
                return;
            }
            Transition::Retry { attempt, reason } => {
                log_retry(attempt, config.max_attempts, &reason, config.interval);
                tokio::select! {
                    _ = tokio::time::sleep(config.interval) => {}
                    _ = cancelled(&mut cancel_rx) => {
                        debug!(attempts = attempt, "Cancellation observed while sleeping");
                        return;
                    }
                }
            }
        }
    }
}

/// Resolves once the cancel flag is raised. A dropped handle never cancels.
async fn cancelled(cancel_rx: &mut watch::Receiver<bool>) {
    if cancel_rx.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn log_retry(attempt: u32, max: u32, reason: &RetryReason, delay: Duration) {
    match reason {
        RetryReason::Pending => debug!(
            attempt,
            max_attempts = max,
            delay_ms = delay.as_millis() as u64,
            "Export still pending"
        ),
        RetryReason::Transport(_) => warn!(
            attempt,
            max_attempts = max,
            reason = %reason,
            delay_ms = delay.as_millis() as u64,
            "Retrying status check"
        ),
    }
}
