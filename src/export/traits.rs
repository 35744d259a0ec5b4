use std::future::Future;

use crate::error::{SubmissionError, TransportError};

use super::job::{Job, PollResult};

/// Places a report-generation request on the remote export queue.
pub trait JobSubmitter: Send + Sync {
    type Params: ?Sized + Sync;

    fn submit(
        &self,
        params: &Self::Params,
    ) -> impl Future<Output = Result<Job, SubmissionError>> + Send;
}

/// Asks the remote export queue how a job is doing.
///
/// A `TransportError` is retryable: the poll loop counts it against the
/// attempt budget and checks again.
pub trait StatusChecker: Send + Sync + 'static {
    fn check_status(
        &self,
        job_id: &str,
    ) -> impl Future<Output = Result<PollResult, TransportError>> + Send;
}
