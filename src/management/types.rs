//! Request and response types for the Management API.
//!
//! Every action answers with the same JSON envelope
//! (`status_code`, `response_size`, `data`, `errors`); [`ManagementResponse`]
//! wraps it together with the HTTP status and the request url. The export
//! actions are described by [`ReportKind`] / [`ExportEndpoint`] and their
//! parameters by [`ExportParams`].

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SubmissionError;
use crate::export::PollResult;

use super::error::ApiError;
use super::query::QueryStringBuilder;

/// Response envelope returned by every Management API action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagementResponse {
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub response_size: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Option<Value>,
    /// HTTP status of the exchange; not part of the body.
    #[serde(skip)]
    pub http_status: u16,
    /// Request url without the query string, kept for diagnostics.
    #[serde(skip)]
    pub request_url: String,
}

impl ManagementResponse {
    /// Whether the envelope reports errors. `null`, `[]` and `{}` do not count.
    pub fn has_errors(&self) -> bool {
        match &self.errors {
            None | Some(Value::Null) => false,
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    /// Reject non-200 exchanges and envelopes that carry errors.
    pub fn ensure_success(self) -> Result<Self, ApiError> {
        if self.http_status != 200 {
            let message = self
                .errors
                .as_ref()
                .map(render)
                .unwrap_or_else(|| "request failed".to_string());
            return Err(ApiError::Status {
                status: self.http_status,
                message,
            });
        }
        if self.has_errors() {
            return Err(ApiError::Service {
                status_code: self.status_code.unwrap_or(self.http_status),
                errors: self.errors.as_ref().map(render).unwrap_or_default(),
            });
        }
        Ok(self)
    }

    /// Job identifier returned by an export action.
    ///
    /// Log reports answer with the id as `data`; insight reports answer with
    /// `data.job_id`.
    pub fn job_id(&self) -> Result<String, ApiError> {
        let id = match &self.data {
            Some(Value::String(id)) => Some(id.as_str()),
            Some(data @ Value::Object(_)) => data.get("job_id").and_then(Value::as_str),
            _ => None,
        };
        match id.map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Err(ApiError::Malformed(format!(
                "export response did not return a job id: {}",
                self.request_url
            ))),
        }
    }

    /// Classify an export status response.
    ///
    /// The status and download url sit either directly under `data` or one
    /// level deeper under `data.data`, depending on the report family.
    pub fn poll_result(&self) -> Result<PollResult, ApiError> {
        let data = self.data.as_ref().ok_or_else(|| {
            ApiError::Malformed("export status response has no data".into())
        })?;

        let status = lookup(data, "status")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ApiError::Malformed("export status response has no 'status'".into())
            })?;

        match status {
            "complete" => {
                let url = lookup(data, "url")
                    .and_then(Value::as_str)
                    .filter(|url| !url.is_empty())
                    .ok_or_else(|| {
                        ApiError::Malformed("completed export has no download url".into())
                    })?;
                Ok(PollResult::Complete {
                    artifact_url: url.to_string(),
                })
            }
            "fail" => Ok(PollResult::Failed {
                error_detail: failure_detail(data),
            }),
            _ => Ok(PollResult::Pending),
        }
    }
}

fn lookup<'a>(data: &'a Value, key: &str) -> Option<&'a Value> {
    data.get(key)
        .or_else(|| data.get("data").and_then(|inner| inner.get(key)))
}

fn failure_detail(data: &Value) -> String {
    ["errors", "error", "message"]
        .iter()
        .find_map(|key| lookup(data, key))
        .filter(|v| !v.is_null())
        .map(render)
        .unwrap_or_else(|| "export job reported status 'fail'".to_string())
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Report controllers that export through the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Clicks,
    EventItems,
    Events,
    Installs,
    Postbacks,
    Updates,
    Actuals,
    Cohort,
    Retention,
}

impl ReportKind {
    pub const ALL: [ReportKind; 9] = [
        ReportKind::Clicks,
        ReportKind::EventItems,
        ReportKind::Events,
        ReportKind::Installs,
        ReportKind::Postbacks,
        ReportKind::Updates,
        ReportKind::Actuals,
        ReportKind::Cohort,
        ReportKind::Retention,
    ];

    pub fn controller(&self) -> &'static str {
        match self {
            ReportKind::Clicks => "advertiser/stats/clicks",
            ReportKind::EventItems => "advertiser/stats/event/items",
            ReportKind::Events => "advertiser/stats/events",
            ReportKind::Installs => "advertiser/stats/installs",
            ReportKind::Postbacks => "advertiser/stats/postbacks",
            ReportKind::Updates => "advertiser/stats/updates",
            ReportKind::Actuals => "advertiser/stats",
            ReportKind::Cohort => "advertiser/stats/ltv",
            ReportKind::Retention => "advertiser/stats/retention",
        }
    }

    /// Cohort and retention reports use their own export/status actions.
    pub fn is_insight(&self) -> bool {
        matches!(self, ReportKind::Cohort | ReportKind::Retention)
    }

    pub fn endpoint(&self) -> ExportEndpoint {
        let controller = self.controller();
        if self.is_insight() {
            ExportEndpoint {
                submit_controller: controller,
                submit_action: "export",
                status_controller: controller,
                status_action: "status",
            }
        } else {
            ExportEndpoint {
                submit_controller: controller,
                submit_action: "find_export_queue",
                status_controller: "export",
                status_action: "download",
            }
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportKind::Clicks => "clicks",
            ReportKind::EventItems => "event_items",
            ReportKind::Events => "events",
            ReportKind::Installs => "installs",
            ReportKind::Postbacks => "postbacks",
            ReportKind::Updates => "updates",
            ReportKind::Actuals => "actuals",
            ReportKind::Cohort => "cohort",
            ReportKind::Retention => "retention",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ReportKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.to_string() == s.trim().to_lowercase())
            .ok_or_else(|| ApiError::InvalidParameter(format!("unknown report kind: '{s}'")))
    }
}

/// Controller/action pairs used to submit an export and to poll it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportEndpoint {
    pub submit_controller: &'static str,
    pub submit_action: &'static str,
    pub status_controller: &'static str,
    pub status_action: &'static str,
}

/// File format of the exported report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of an export request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportParams {
    /// `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`.
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub group: Vec<String>,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub format: ReportFormat,
    #[serde(default)]
    pub response_timezone: Option<String>,
    /// Report-specific parameters such as `cohort_type` or `interval`.
    #[serde(default)]
    pub extra: Vec<(String, String)>,
}

impl ExportParams {
    pub fn new(start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            start_date: start_date.into(),
            end_date: end_date.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), SubmissionError> {
        validate_datetime("start_date", &self.start_date)?;
        validate_datetime("end_date", &self.end_date)?;

        if self.fields.iter().any(|f| f.trim().is_empty()) {
            return Err(SubmissionError::Validation(
                "fields contains an empty entry".into(),
            ));
        }
        if self.group.iter().any(|g| g.trim().is_empty()) {
            return Err(SubmissionError::Validation(
                "group contains an empty entry".into(),
            ));
        }
        if let Some(filter) = &self.filter
            && (filter.trim().is_empty() || !parentheses_balanced(filter))
        {
            return Err(SubmissionError::Validation(format!(
                "filter is invalid: '{filter}'"
            )));
        }
        Ok(())
    }

    /// [`validate`](Self::validate) plus the rules of `kind`'s export action.
    ///
    /// Cohort and retention exports require `cohort_type`, `aggregation_type`,
    /// `group` and `fields`; `interval` (or `cohort_interval`) is optional.
    pub fn validate_for(&self, kind: ReportKind) -> Result<(), SubmissionError> {
        self.validate()?;
        if !kind.is_insight() {
            return Ok(());
        }

        if self.group.is_empty() {
            return Err(SubmissionError::Validation(format!(
                "group is required for {kind} exports"
            )));
        }
        if self.fields.is_empty() {
            return Err(SubmissionError::Validation(format!(
                "fields is required for {kind} exports"
            )));
        }
        for (name, allowed) in [
            ("cohort_type", COHORT_TYPES.as_slice()),
            ("aggregation_type", AGGREGATION_TYPES.as_slice()),
        ] {
            match self.extra_value(name) {
                Some(value) => check_choice(name, value, allowed)?,
                None => {
                    return Err(SubmissionError::Validation(format!(
                        "{name} is required for {kind} exports"
                    )));
                }
            }
        }
        for name in ["interval", "cohort_interval"] {
            if let Some(value) = self.extra_value(name) {
                check_choice(name, value, &COHORT_INTERVALS)?;
            }
        }
        Ok(())
    }

    fn extra_value(&self, name: &str) -> Option<&str> {
        self.extra
            .iter()
            .find(|(key, _)| key.trim() == name)
            .map(|(_, value)| value.trim())
    }

    /// Append this request's parameters after the api key.
    pub fn append_to(&self, qsb: &mut QueryStringBuilder) -> Result<(), ApiError> {
        qsb.add("start_date", Some(self.start_date.as_str()))?
            .add("end_date", Some(self.end_date.as_str()))?;
        if !self.fields.is_empty() {
            qsb.add("fields", Some(self.fields.join(",")))?;
        }
        if !self.group.is_empty() {
            qsb.add("group", Some(self.group.join(",")))?;
        }
        qsb.add("filter", self.filter.as_ref().map(|f| format!("({})", f.trim())))?
            .add("format", Some(self.format.as_str()))?
            .add("response_timezone", self.response_timezone.as_deref())?;
        for (name, value) in &self.extra {
            // The export actions call the cohort interval `interval`.
            let name = if name.trim() == "cohort_interval" {
                "interval"
            } else {
                name.as_str()
            };
            qsb.add(name, Some(value.as_str()))?;
        }
        Ok(())
    }
}

pub const COHORT_TYPES: [&str; 2] = ["click", "install"];
pub const AGGREGATION_TYPES: [&str; 2] = ["incremental", "cumulative"];
pub const COHORT_INTERVALS: [&str; 4] = ["year_day", "year_week", "year_month", "year"];

fn check_choice(name: &str, value: &str, allowed: &[&str]) -> Result<(), SubmissionError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(SubmissionError::Validation(format!(
            "{name} is invalid: '{value}' (expected one of {})",
            allowed.join(", ")
        )))
    }
}

fn validate_datetime(name: &str, value: &str) -> Result<(), SubmissionError> {
    let value = value.trim();
    let ok = NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").is_ok();
    if ok {
        Ok(())
    } else {
        Err(SubmissionError::Validation(format!(
            "{name} is invalid: '{value}'"
        )))
    }
}

/// Whether every `(` has a matching `)` in order.
pub fn parentheses_balanced(text: &str) -> bool {
    let mut depth: usize = 0;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    depth == 0
}
