//! Readers for completed export artifacts.
//!
//! A finished export leaves a CSV or JSON file behind a download url. The
//! readers here turn the raw body into [`ReportRecord`]s, one per row.

use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::management::ReportFormat;

use super::ReportError;

/// One report row keyed by column name.
pub type ReportRecord = Map<String, Value>;

pub trait ReportReader: Send + Sync {
    fn read(&self, body: &[u8]) -> Result<Vec<ReportRecord>, ReportError>;
}

/// Header row first, then one record per line. Ragged rows are errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReportReader;

impl ReportReader for CsvReportReader {
    fn read(&self, body: &[u8]) -> Result<Vec<ReportRecord>, ReportError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(body);

        let headers = reader.headers()?.clone();
        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let record = headers
                .iter()
                .zip(row.iter())
                .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
                .collect();
            records.push(record);
        }
        Ok(records)
    }
}

/// Accepts an array of objects or a single object.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportReader;

impl ReportReader for JsonReportReader {
    fn read(&self, body: &[u8]) -> Result<Vec<ReportRecord>, ReportError> {
        match serde_json::from_slice::<Value>(body)? {
            Value::Object(map) => Ok(vec![map]),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(map) => Ok(map),
                    other => Err(ReportError::Shape(format!(
                        "row {} is not an object: {other}",
                        i + 1
                    ))),
                })
                .collect(),
            other => Err(ReportError::Shape(format!(
                "expected an array of objects, got {}",
                kind_of(&other)
            ))),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn reader_for(format: ReportFormat) -> Box<dyn ReportReader> {
    match format {
        ReportFormat::Csv => Box::new(CsvReportReader),
        ReportFormat::Json => Box::new(JsonReportReader),
    }
}

/// Fetch an artifact body. The url is the one the export completed with.
pub async fn download_report(http: &Client, report_url: &str) -> Result<Vec<u8>, ReportError> {
    let url = Url::parse(report_url.trim())
        .map_err(|e| ReportError::InvalidUrl(format!("'{report_url}': {e}")))?;

    debug!(url = %url, "Downloading report");
    let response = http.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ReportError::Download {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = response.bytes().await?;
    debug!(bytes = body.len(), "Report downloaded");
    Ok(body.to_vec())
}

/// Download and parse in one step.
pub async fn fetch_records(
    http: &Client,
    report_url: &str,
    format: ReportFormat,
) -> Result<Vec<ReportRecord>, ReportError> {
    let body = download_report(http, report_url).await?;
    reader_for(format).read(&body)
}
