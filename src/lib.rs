//! Client for the Management API's report export queue.
//!
//! Exports are submitted with [`management::ManagementClient`], polled in the
//! background by [`export::ExportPoller`], and read back with the readers in
//! [`reports`]. [`orchestrator::ReportExporter`] wires the three together.

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod management;
pub mod orchestrator;
pub mod reports;
pub mod ui;

pub use error::{ExportError, SdkError, SubmissionError, TransportError};
pub use export::{ExportHandle, ExportOutcome, ExportPoller, Job, PollConfig, PollResult};
pub use orchestrator::ReportExporter;
