//! Immutable tracker configuration, built once at startup.

use crate::types::JiraError;

#[derive(Debug, Clone)]
/// Connection settings for the tracker REST API. Constructed from the CLI
/// environment once and passed by value into the runtimes.
pub struct JiraConfig {
    pub base_url: String,
    pub user: String,
    pub api_token: String,
    pub project_key: String,
    pub issue_type: String,
    pub request_timeout_ms: u64,
}

impl JiraConfig {
    /// Rejects empty-after-trim required values. Called by
    /// [`crate::JiraClient::new`] before any network activity.
    pub fn validate(&self) -> Result<(), JiraError> {
        for (label, value) in [
            ("base URL", &self.base_url),
            ("user", &self.user),
            ("API token", &self.api_token),
            ("project key", &self.project_key),
            ("issue type", &self.issue_type),
        ] {
            if value.trim().is_empty() {
                return Err(JiraError::Config(format!("{label} must not be empty")));
            }
        }
        Ok(())
    }
}
