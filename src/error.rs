use thiserror::Error;

use crate::management::ApiError;
use crate::reports::ReportError;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Management API error: {0}")]
    Api(#[from] ApiError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// The export job never made it onto the remote queue.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("invalid export parameters: {0}")]
    Validation(String),

    #[error("export request failed: {0}")]
    Api(#[from] ApiError),
}

/// A single status check failed before the remote queue answered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ApiError> for TransportError {
    fn from(err: ApiError) -> Self {
        Self::new(err.to_string())
    }
}

/// Ways an export can end without a report.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{0}")]
    Submission(#[from] SubmissionError),

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("export failed remotely: {0}")]
    RemoteFailure(String),

    #[error("export did not complete within its attempt budget")]
    Timeout,

    #[error("export was cancelled")]
    Cancelled,

    #[error("invalid poll configuration: {0}")]
    InvalidConfig(String),
}
