use std::fmt;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::error::SubmissionError;
use crate::export::{Job, PollResult};

use super::error::ApiError;
use super::query::QueryStringBuilder;
use super::types::{ExportParams, ManagementResponse, ReportKind};

pub const API_URL_BASE: &str = "https://api.mobileapptracking.com";
pub const API_VERSION: &str = "v2";

/// Thin client over the Management API's `controller/action` endpoints.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct ManagementClient {
    api_key: String,
    client: Client,
    base_url: String,
    version: String,
}

impl fmt::Debug for ManagementClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagementClient")
            .field("base_url", &self.base_url)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl ManagementClient {
    pub fn new(api_key: String) -> Result<Self, ApiError> {
        Self::with_base_url(api_key, API_URL_BASE.to_string(), API_VERSION.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(api_key: String, base_url: String, version: String) -> Result<Self, ApiError> {
        Self::with_timeout(api_key, base_url, version, Duration::from_secs(60))
    }

    pub fn with_timeout(
        api_key: String,
        base_url: String,
        version: String,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        if api_key.trim().is_empty() {
            return Err(ApiError::InvalidParameter("api_key is not defined".into()));
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            api_key: api_key.trim().to_string(),
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            version: version.trim_matches('/').to_string(),
        })
    }

    /// Underlying HTTP client, shared with report downloads.
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// `{base}/{version}/{controller}/{action}.json`, without the query string.
    pub fn action_path(&self, controller: &str, action: &str) -> String {
        format!(
            "{}/{}/{}/{}.json",
            self.base_url,
            self.version,
            controller.trim_matches('/'),
            action
        )
    }

    /// Call one action. The api key always leads the query string.
    pub async fn call(
        &self,
        controller: &str,
        action: &str,
        params: &QueryStringBuilder,
    ) -> Result<ManagementResponse, ApiError> {
        let mut query = QueryStringBuilder::new();
        query.add("api_key", Some(self.api_key.as_str()))?;
        let mut url = format!("{}?{}", self.action_path(controller, action), query.build());
        if !params.is_empty() {
            url.push('&');
            url.push_str(&params.build());
        }

        debug!(controller, action, "Calling Management API");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let mut envelope = match serde_json::from_str::<ManagementResponse>(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    message: if body.trim().is_empty() {
                        status.to_string()
                    } else {
                        body
                    },
                });
            }
            Err(e) => {
                return Err(ApiError::Malformed(format!(
                    "{controller}/{action} returned a body that is not a response envelope: {e}"
                )));
            }
        };
        envelope.http_status = status.as_u16();
        envelope.request_url = self.action_path(controller, action);

        envelope.ensure_success()
    }

    /// Place an export on the queue and return the issued job.
    pub async fn submit_export(
        &self,
        kind: ReportKind,
        params: &ExportParams,
    ) -> Result<Job, SubmissionError> {
        params.validate_for(kind)?;

        let mut query = QueryStringBuilder::new();
        params.append_to(&mut query)?;

        let endpoint = kind.endpoint();
        let response = self
            .call(endpoint.submit_controller, endpoint.submit_action, &query)
            .await?;
        let job_id = response.job_id()?;

        debug!(report = %kind, job_id = %job_id, "Export job submitted");
        Ok(Job::new(job_id))
    }

    /// One status check for an export job.
    pub async fn export_status(&self, kind: ReportKind, job_id: &str) -> Result<PollResult, ApiError> {
        if job_id.trim().is_empty() {
            return Err(ApiError::InvalidParameter("job_id is not defined".into()));
        }

        let mut query = QueryStringBuilder::new();
        query.add("job_id", Some(job_id))?;

        let endpoint = kind.endpoint();
        let response = self
            .call(endpoint.status_controller, endpoint.status_action, &query)
            .await?;
        response.poll_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> ManagementClient {
        ManagementClient::with_base_url("test-key".into(), server.uri(), "v2".into()).unwrap()
    }

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(matches!(
            ManagementClient::new("  ".into()),
            Err(ApiError::InvalidParameter(_))
        ));
    }

    #[test]
    fn action_path_layout() {
        let client = ManagementClient::with_base_url(
            "k".into(),
            "https://api.example.com/".into(),
            "/v2/".into(),
        )
        .unwrap();
        assert_eq!(
            client.action_path("advertiser/stats/clicks", "find_export_queue"),
            "https://api.example.com/v2/advertiser/stats/clicks/find_export_queue.json"
        );
    }

    #[tokio::test]
    async fn submit_export_returns_job() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/advertiser/stats/clicks/find_export_queue.json"))
            .and(query_param("api_key", "test-key"))
            .and(query_param("start_date", "2024-01-01"))
            .and(query_param("format", "csv"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status_code": 200,
                "response_size": 42,
                "data": "job-123",
                "errors": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let job = client
            .submit_export(ReportKind::Clicks, &ExportParams::new("2024-01-01", "2024-01-02"))
            .await
            .unwrap();
        assert_eq!(job.job_id(), "job-123");
    }

    #[tokio::test]
    async fn invalid_params_never_reach_the_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let result = client
            .submit_export(ReportKind::Installs, &ExportParams::new("yesterday", "2024-01-02"))
            .await;
        assert!(matches!(result, Err(SubmissionError::Validation(_))));
    }

    #[tokio::test]
    async fn invalid_cohort_type_never_reaches_the_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut params = ExportParams::new("2024-01-01", "2024-01-07");
        params.fields = vec!["site_id".into()];
        params.group = vec!["site_id".into()];
        params.extra = vec![
            ("cohort_type".into(), "impression".into()),
            ("aggregation_type".into(), "cumulative".into()),
        ];

        let client = client_for(&server).await;
        let result = client.submit_export(ReportKind::Cohort, &params).await;
        assert!(matches!(
            result,
            Err(SubmissionError::Validation(msg)) if msg.contains("cohort_type")
        ));
    }

    #[tokio::test]
    async fn submit_surfaces_service_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status_code": 400,
                "data": null,
                "errors": [{ "message": "Invalid fields" }]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let result = client
            .submit_export(ReportKind::Events, &ExportParams::new("2024-01-01", "2024-01-02"))
            .await;
        assert!(matches!(
            result,
            Err(SubmissionError::Api(ApiError::Service { status_code: 400, .. }))
        ));
    }

    #[tokio::test]
    async fn export_status_polls_download_action() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/export/download.json"))
            .and(query_param("job_id", "job-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status_code": 200,
                "data": { "status": "complete", "data": { "url": "https://files.example.com/r.csv" } }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let result = client.export_status(ReportKind::Clicks, "job-123").await.unwrap();
        assert_eq!(
            result,
            PollResult::Complete {
                artifact_url: "https://files.example.com/r.csv".into()
            }
        );
    }

    #[tokio::test]
    async fn insight_status_polls_report_controller() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/advertiser/stats/ltv/status.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status_code": 200,
                "data": { "status": "running", "percent_complete": 10 }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let result = client.export_status(ReportKind::Cohort, "job-9").await.unwrap();
        assert_eq!(result, PollResult::Pending);
    }

    #[tokio::test]
    async fn non_json_error_page_is_a_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        match client.export_status(ReportKind::Clicks, "job-1").await {
            Err(ApiError::Status { status, message }) => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(matches!(
            client.export_status(ReportKind::Clicks, "job-1").await,
            Err(ApiError::Malformed(_))
        ));
    }
}
