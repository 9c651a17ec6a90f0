//! Authenticated REST calls against the tracker's issue endpoints.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::config::JiraConfig;
use crate::types::{IssueCreationRequest, IssueCreationResult, IssueRef, IssueSummary, JiraError};

#[derive(Debug, Clone, Deserialize)]
struct IssueResponse {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    fields: Option<IssueFields>,
}

#[derive(Debug, Clone, Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    status: Option<NamedEntity>,
    #[serde(default)]
    issuetype: Option<NamedEntity>,
    #[serde(default)]
    reporter: Option<UserEntity>,
    #[serde(default)]
    assignee: Option<UserEntity>,
}

#[derive(Debug, Clone, Deserialize)]
struct NamedEntity {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct UserEntity {
    #[serde(rename = "displayName", default)]
    display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CreatedIssueResponse {
    #[serde(default)]
    key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    #[serde(rename = "errorMessages", default)]
    error_messages: Vec<String>,
}

#[derive(Clone, Debug)]
/// Stateless tracker client. Every call is a single best-effort attempt;
/// credentials are carried as a default header on each request.
pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
}

impl JiraClient {
    /// Validates `config` and builds the HTTP client. Fails with
    /// [`JiraError::Config`] before any network call when credentials or
    /// the base URL are missing.
    pub fn new(config: &JiraConfig) -> Result<Self, JiraError> {
        config.validate()?;

        let credentials = BASE64.encode(format!("{}:{}", config.user.trim(), config.api_token.trim()));
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("bosun-tracker-client"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&format!("Basic {credentials}"))
                .map_err(|error| JiraError::Config(format!("invalid credentials: {error}")))?,
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .map_err(|error| JiraError::Config(format!("failed to create tracker client: {error}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    /// Browse URL for an issue key on this tracker instance.
    pub fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.base_url, key)
    }

    /// Fetches one issue and projects the fields the bot renders.
    pub async fn fetch_issue(&self, reference: &IssueRef) -> Result<IssueSummary, JiraError> {
        let key = reference.key();
        let response = self
            .http
            .get(format!("{}/rest/api/3/issue/{}", self.base_url, key))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(JiraError::NotFound);
        }
        if !status.is_success() {
            return Err(JiraError::HttpStatus {
                status: status.as_u16(),
                details: Vec::new(),
            });
        }

        let body = response.text().await?;
        let parsed = serde_json::from_str::<IssueResponse>(&body).map_err(|error| {
            JiraError::MalformedResponse(format!("issue response is not valid JSON: {error}"))
        })?;
        let fields = parsed
            .fields
            .ok_or_else(|| JiraError::MalformedResponse("issue response missing fields".to_string()))?;

        let title = required_field(fields.summary, "fields.summary")?;
        let status_name = required_field(fields.status.and_then(|value| value.name), "fields.status.name")?;
        let issue_type =
            required_field(fields.issuetype.and_then(|value| value.name), "fields.issuetype.name")?;
        let reporter = required_field(
            fields.reporter.and_then(|value| value.display_name),
            "fields.reporter.displayName",
        )?;
        let assignee = fields
            .assignee
            .and_then(|value| value.display_name)
            .filter(|value| !value.trim().is_empty());

        let key = parsed.key.filter(|value| !value.trim().is_empty()).unwrap_or(key);
        Ok(IssueSummary {
            browse_url: self.browse_url(&key),
            key,
            title,
            status: status_name,
            issue_type,
            reporter,
            assignee,
        })
    }

    /// Creates an issue with exactly the three fields the tracker expects:
    /// summary, issue type name, and project key.
    pub async fn create_issue(
        &self,
        request: &IssueCreationRequest,
    ) -> Result<IssueCreationResult, JiraError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(JiraError::Validation(
                "issue title must not be empty".to_string(),
            ));
        }

        let payload = json!({
            "fields": {
                "summary": title,
                "issuetype": { "name": request.issue_type },
                "project": { "key": request.project_key },
            }
        });
        let response = self
            .http
            .post(format!("{}/rest/api/3/issue", self.base_url))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JiraError::HttpStatus {
                status: status.as_u16(),
                details: parse_error_details(&body),
            });
        }

        let body = response.text().await?;
        let parsed = serde_json::from_str::<CreatedIssueResponse>(&body).map_err(|error| {
            JiraError::MalformedResponse(format!("creation response is not valid JSON: {error}"))
        })?;
        let key = parsed
            .key
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                JiraError::MalformedResponse("creation response missing issue key".to_string())
            })?;

        Ok(IssueCreationResult {
            browse_url: self.browse_url(&key),
            key,
            title: title.to_string(),
        })
    }
}

fn required_field(value: Option<String>, label: &str) -> Result<String, JiraError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| JiraError::MalformedResponse(format!("issue response missing {label}")))
}

/// Extracts the tracker's `errorMessages` list from a failure body. An
/// unparsable body yields an empty list; the raw text only reaches the log.
fn parse_error_details(body: &str) -> Vec<String> {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error_messages,
        Err(_) => {
            if !body.trim().is_empty() {
                warn!(
                    "tracker error body was not parseable JSON: {}",
                    bosun_core::truncate_for_error(body, 800)
                );
            }
            Vec::new()
        }
    }
}
