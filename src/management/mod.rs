//! Client for the Management API and its report export queue.

pub mod client;
pub mod error;
pub mod query;
pub mod queue;
pub mod types;

pub use client::{API_URL_BASE, API_VERSION, ManagementClient};
pub use error::ApiError;
pub use query::{QueryStringBuilder, QueryValue};
pub use queue::ReportQueue;
pub use types::{ExportEndpoint, ExportParams, ManagementResponse, ReportFormat, ReportKind};
