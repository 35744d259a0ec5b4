use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ExportError;

/// Reason attached to the `Failure` outcome of a cancelled export.
pub const CANCELLED_REASON: &str = "cancelled";

/// One report-export request, identified by the job id the remote queue issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    job_id: String,
    submitted_at: DateTime<Utc>,
}

impl Job {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self::with_submitted_at(job_id, Utc::now())
    }

    pub fn with_submitted_at(job_id: impl Into<String>, submitted_at: DateTime<Utc>) -> Self {
        Self {
            job_id: job_id.into(),
            submitted_at,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

/// Status reported by a single status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollStatus {
    Pending,
    Complete,
    Failed,
}

impl fmt::Display for PollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollStatus::Pending => write!(f, "PENDING"),
            PollStatus::Complete => write!(f, "COMPLETE"),
            PollStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Outcome of one status check.
///
/// The artifact url only exists on `Complete` and the error detail only on
/// `Failed`, so the variants carry them directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollResult {
    Pending,
    Complete { artifact_url: String },
    Failed { error_detail: String },
}

impl PollResult {
    pub fn status(&self) -> PollStatus {
        match self {
            PollResult::Pending => PollStatus::Pending,
            PollResult::Complete { .. } => PollStatus::Complete,
            PollResult::Failed { .. } => PollStatus::Failed,
        }
    }
}

/// Terminal result of a job's lifecycle, as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExportOutcome {
    Success { artifact_url: String },
    Failure { reason: String },
    TimedOut,
}

impl ExportOutcome {
    pub fn cancelled() -> Self {
        ExportOutcome::Failure {
            reason: CANCELLED_REASON.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExportOutcome::Failure { reason } if reason == CANCELLED_REASON)
    }

    /// Convert into a `Result` carrying the artifact url.
    pub fn into_result(self) -> Result<String, ExportError> {
        match self {
            ExportOutcome::Success { artifact_url } => Ok(artifact_url),
            ExportOutcome::Failure { reason } if reason == CANCELLED_REASON => {
                Err(ExportError::Cancelled)
            }
            ExportOutcome::Failure { reason } => Err(ExportError::RemoteFailure(reason)),
            ExportOutcome::TimedOut => Err(ExportError::Timeout),
        }
    }
}

impl fmt::Display for ExportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportOutcome::Success { artifact_url } => write!(f, "Success: {artifact_url}"),
            ExportOutcome::Failure { reason } => write!(f, "Failure: {reason}"),
            ExportOutcome::TimedOut => write!(f, "TimedOut"),
        }
    }
}

/// Pacing and budget for a poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Constant delay between two status checks.
    pub interval: Duration,
    /// Ceiling on status checks before the job is forced to `TimedOut`.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: 60,
        }
    }
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// A zero interval is accepted so tests can poll without sleeping.
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.max_attempts == 0 {
            return Err(ExportError::InvalidConfig(
                "max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Summary written once an export reaches its terminal outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRecord {
    pub job_id: String,
    pub outcome: ExportOutcome,
    pub attempts: u32,
    pub max_attempts: u32,
    pub submitted_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl ExportRecord {
    pub fn new(job: &Job, outcome: ExportOutcome, attempts: u32, config: &PollConfig) -> Self {
        let now = Utc::now();
        Self {
            job_id: job.job_id().to_string(),
            outcome,
            attempts,
            max_attempts: config.max_attempts,
            submitted_at: job.submitted_at(),
            completed_at: now,
            duration_ms: (now - job.submitted_at()).num_milliseconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_keeps_remote_identifier() {
        let job = Job::new("job-42");
        assert_eq!(job.job_id(), "job-42");
        assert!(job.submitted_at() <= Utc::now());
    }

    #[test]
    fn poll_result_reports_status() {
        assert_eq!(PollResult::Pending.status(), PollStatus::Pending);
        let done = PollResult::Complete {
            artifact_url: "r.csv".into(),
        };
        assert_eq!(done.status(), PollStatus::Complete);
        let failed = PollResult::Failed {
            error_detail: "boom".into(),
        };
        assert_eq!(failed.status(), PollStatus::Failed);
    }

    #[test]
    fn outcome_into_result() {
        let ok = ExportOutcome::Success {
            artifact_url: "r.csv".into(),
        };
        assert_eq!(ok.into_result().unwrap(), "r.csv");

        assert!(matches!(
            ExportOutcome::cancelled().into_result(),
            Err(ExportError::Cancelled)
        ));
        assert!(matches!(
            ExportOutcome::Failure {
                reason: "quota".into()
            }
            .into_result(),
            Err(ExportError::RemoteFailure(r)) if r == "quota"
        ));
        assert!(matches!(
            ExportOutcome::TimedOut.into_result(),
            Err(ExportError::Timeout)
        ));
    }

    #[test]
    fn cancelled_outcome_is_a_failure() {
        let outcome = ExportOutcome::cancelled();
        assert!(outcome.is_cancelled());
        assert_eq!(outcome.to_string(), "Failure: cancelled");
        assert!(!ExportOutcome::TimedOut.is_cancelled());
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let json = serde_json::to_string(&ExportOutcome::TimedOut).unwrap();
        assert_eq!(json, r#"{"outcome":"timed_out"}"#);
    }

    #[test]
    fn poll_config_rejects_zero_attempts() {
        let config = PollConfig::new(Duration::ZERO, 0);
        assert!(config.validate().is_err());
        assert!(PollConfig::new(Duration::ZERO, 1).validate().is_ok());
    }

    #[test]
    fn export_record_from_job() {
        let job = Job::new("job-7");
        let config = PollConfig::default();
        let record = ExportRecord::new(&job, ExportOutcome::TimedOut, 60, &config);
        assert_eq!(record.job_id, "job-7");
        assert_eq!(record.attempts, 60);
        assert_eq!(record.max_attempts, 60);
        assert!(record.duration_ms >= 0);
    }
}
