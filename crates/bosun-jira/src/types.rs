//! Typed issue model and error taxonomy for the tracker client.

use std::fmt;

use thiserror::Error;

/// Label rendered in place of an assignee when the tracker reports none.
pub const UNASSIGNED_LABEL: &str = "unassigned";

#[derive(Debug, Error)]
/// Enumerates the failure modes of a single tracker operation.
pub enum JiraError {
    #[error("tracker configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    Validation(String),
    #[error("issue not found")]
    NotFound,
    #[error("tracker returned status {status}")]
    HttpStatus { status: u16, details: Vec<String> },
    #[error("tracker request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed tracker response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A project key plus issue number, e.g. `PROJ-123`.
pub struct IssueRef {
    project_key: String,
    number: u64,
}

impl IssueRef {
    /// Parses a user-supplied reference token. Input is trimmed and
    /// uppercased; the tracker treats keys case-insensitively.
    pub fn parse(raw: &str) -> Result<Self, JiraError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(JiraError::Validation(
                "issue reference must not be empty".to_string(),
            ));
        }
        let normalized = trimmed.to_ascii_uppercase();
        let Some((project_key, number)) = normalized.rsplit_once('-') else {
            return Err(JiraError::Validation(format!(
                "invalid issue reference `{trimmed}`, expected a key like PROJ-123"
            )));
        };
        let valid_project = !project_key.is_empty()
            && project_key
                .chars()
                .next()
                .is_some_and(|ch| ch.is_ascii_alphabetic())
            && project_key.chars().all(|ch| ch.is_ascii_alphanumeric());
        if !valid_project {
            return Err(JiraError::Validation(format!(
                "invalid issue reference `{trimmed}`, expected a key like PROJ-123"
            )));
        }
        let number = number.parse::<u64>().map_err(|_| {
            JiraError::Validation(format!(
                "invalid issue reference `{trimmed}`, expected a key like PROJ-123"
            ))
        })?;
        Ok(Self {
            project_key: project_key.to_string(),
            number,
        })
    }

    pub fn project_key(&self) -> &str {
        &self.project_key
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    /// Returns the canonical `KEY-123` token.
    pub fn key(&self) -> String {
        format!("{}-{}", self.project_key, self.number)
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}-{}", self.project_key, self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Read-only projection of a fetched issue, discarded after formatting.
pub struct IssueSummary {
    pub key: String,
    pub title: String,
    pub status: String,
    pub issue_type: String,
    pub reporter: String,
    pub assignee: Option<String>,
    pub browse_url: String,
}

impl IssueSummary {
    /// Assignee display name, or the `unassigned` sentinel when absent.
    pub fn assignee_label(&self) -> &str {
        self.assignee.as_deref().unwrap_or(UNASSIGNED_LABEL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Payload for one issue-creation call.
pub struct IssueCreationRequest {
    pub project_key: String,
    pub title: String,
    pub issue_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Normalized result of a successful issue creation.
pub struct IssueCreationResult {
    pub key: String,
    pub browse_url: String,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_issue_ref_parses_and_uppercases() {
        let reference = IssueRef::parse(" proj-123 ").expect("reference");
        assert_eq!(reference.project_key(), "PROJ");
        assert_eq!(reference.number(), 123);
        assert_eq!(reference.key(), "PROJ-123");
        assert_eq!(reference.to_string(), "PROJ-123");
    }

    #[test]
    fn unit_issue_ref_rejects_malformed_tokens() {
        for raw in ["", "PROJ", "PROJ-", "-123", "PROJ-abc", "1BAD-7", "PR J-7"] {
            assert!(
                matches!(IssueRef::parse(raw), Err(JiraError::Validation(_))),
                "expected validation error for `{raw}`"
            );
        }
    }

    #[test]
    fn regression_issue_ref_splits_on_last_dash() {
        let reference = IssueRef::parse("X9-42").expect("reference");
        assert_eq!(reference.key(), "X9-42");
    }

    #[test]
    fn unit_assignee_label_falls_back_to_sentinel() {
        let mut summary = IssueSummary {
            key: "PROJ-1".to_string(),
            title: "t".to_string(),
            status: "Open".to_string(),
            issue_type: "Bug".to_string(),
            reporter: "Alice".to_string(),
            assignee: None,
            browse_url: "https://example/browse/PROJ-1".to_string(),
        };
        assert_eq!(summary.assignee_label(), UNASSIGNED_LABEL);
        summary.assignee = Some("Bob".to_string());
        assert_eq!(summary.assignee_label(), "Bob");
    }
}
