use crate::error::{SubmissionError, TransportError};
use crate::export::{Job, JobSubmitter, PollResult, StatusChecker};

use super::client::ManagementClient;
use super::types::{ExportParams, ReportKind};

/// One report family's export queue, seen through the poller's traits.
#[derive(Debug, Clone)]
pub struct ReportQueue {
    client: ManagementClient,
    kind: ReportKind,
}

impl ReportQueue {
    pub fn new(client: ManagementClient, kind: ReportKind) -> Self {
        Self { client, kind }
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn client(&self) -> &ManagementClient {
        &self.client
    }
}

impl JobSubmitter for ReportQueue {
    type Params = ExportParams;

    async fn submit(&self, params: &ExportParams) -> Result<Job, SubmissionError> {
        self.client.submit_export(self.kind, params).await
    }
}

impl StatusChecker for ReportQueue {
    async fn check_status(&self, job_id: &str) -> Result<PollResult, TransportError> {
        Ok(self.client.export_status(self.kind, job_id).await?)
    }
}
