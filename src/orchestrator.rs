use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::ReportingConfig;
use crate::error::{ExportError, SdkError};
use crate::export::{ExportHandle, ExportOutcome, ExportPoller, ExportRecord, Job, PollConfig};
use crate::management::{ExportParams, ManagementClient, ReportFormat, ReportKind, ReportQueue};
use crate::reports::{ReportRecord, fetch_records};

/// Drives exports through submit, poll and read.
#[derive(Debug, Clone)]
pub struct ReportExporter {
    client: ManagementClient,
    poll_config: PollConfig,
    /// How long `export_and_read` waits on a handle; `None` waits for the loop.
    caller_timeout: Option<Duration>,
}

impl ReportExporter {
    pub fn new(client: ManagementClient, poll_config: PollConfig) -> Self {
        Self {
            client,
            poll_config,
            caller_timeout: None,
        }
    }

    pub fn from_config(config: &ReportingConfig) -> Result<Self, SdkError> {
        Ok(Self::new(config.client()?, config.poll_config())
            .with_caller_timeout(config.caller_timeout()))
    }

    pub fn with_caller_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.caller_timeout = timeout;
        self
    }

    pub fn poll_config(&self) -> PollConfig {
        self.poll_config
    }

    pub fn caller_timeout(&self) -> Option<Duration> {
        self.caller_timeout
    }

    pub fn queue(&self, kind: ReportKind) -> ReportQueue {
        ReportQueue::new(self.client.clone(), kind)
    }

    /// Place an export on the remote queue.
    pub async fn submit(&self, kind: ReportKind, params: &ExportParams) -> Result<Job, ExportError> {
        Ok(self.client.submit_export(kind, params).await?)
    }

    /// Start polling an already submitted job.
    pub fn poll(&self, kind: ReportKind, job: Job) -> Result<ExportHandle, ExportError> {
        ExportPoller::start(job, Arc::new(self.queue(kind)), self.poll_config)
    }

    /// Wait on `handle` with the configured caller timeout and summarize.
    pub async fn finish(&self, handle: &ExportHandle) -> ExportRecord {
        let outcome = handle.await_result(self.caller_timeout).await;
        ExportRecord::new(handle.job(), outcome, handle.attempts(), handle.config())
    }

    /// Submit, poll to completion, then download and parse the artifact.
    pub async fn export_and_read(
        &self,
        kind: ReportKind,
        params: &ExportParams,
    ) -> Result<Vec<ReportRecord>, SdkError> {
        let queue = self.queue(kind);
        let handle =
            ExportPoller::submit_and_start(&queue, params, Arc::new(queue.clone()), self.poll_config)
                .await?;

        let record = self.finish(&handle).await;
        // Nobody else holds the handle; stop a loop the caller timeout left running.
        handle.cancel();
        log_record(kind, &record);

        let url = record.outcome.into_result()?;
        let records = fetch_records(self.client.http(), &url, params.format).await?;
        info!(report = %kind, rows = records.len(), "Report read");
        Ok(records)
    }

    /// Poll a job submitted elsewhere and read its artifact.
    pub async fn fetch_and_read(
        &self,
        kind: ReportKind,
        job: Job,
        format: ReportFormat,
    ) -> Result<Vec<ReportRecord>, SdkError> {
        let handle = self.poll(kind, job)?;
        let record = self.finish(&handle).await;
        // Nobody else holds the handle; stop a loop the caller timeout left running.
        handle.cancel();
        log_record(kind, &record);

        let url = record.outcome.into_result()?;
        Ok(fetch_records(self.client.http(), &url, format).await?)
    }
}

fn log_record(kind: ReportKind, record: &ExportRecord) {
    match &record.outcome {
        ExportOutcome::Success { .. } => info!(
            report = %kind,
            job_id = %record.job_id,
            attempts = record.attempts,
            duration_ms = record.duration_ms,
            "Export completed"
        ),
        outcome => warn!(
            report = %kind,
            job_id = %record.job_id,
            attempts = record.attempts,
            max_attempts = record.max_attempts,
            outcome = %outcome,
            "Export did not complete"
        ),
    }
}
