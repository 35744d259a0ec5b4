//! Reading the artifacts that completed exports point at.

mod reader;

use thiserror::Error;

pub use reader::{
    CsvReportReader, JsonReportReader, ReportReader, ReportRecord, download_report,
    fetch_records, reader_for,
};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid report url {0}")]
    InvalidUrl(String),

    #[error("report download failed with HTTP {status}: {url}")]
    Download { status: u16, url: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected report shape: {0}")]
    Shape(String),
}
