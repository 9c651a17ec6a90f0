//! Renders tracker results and errors into platform-neutral messages.

use bosun_jira::{IssueCreationResult, IssueRef, IssueSummary, JiraError};

/// Accent color for fetched-issue cards.
pub const COLOR_INFO: u32 = 0x3498DB;
/// Accent color for creation confirmations.
pub const COLOR_SUCCESS: u32 = 0x2ECC71;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One labeled value on a card message.
pub struct MessageField {
    pub label: String,
    pub value: String,
}

impl MessageField {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outbound chat message: plain text, or a card the runtime renders
/// natively (Discord embed, Slack text lines).
pub enum ChatMessage {
    Text(String),
    Card {
        title: String,
        url: Option<String>,
        color: u32,
        fields: Vec<MessageField>,
    },
}

impl ChatMessage {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Flattens the message into plain text lines for transports without
    /// a card format.
    pub fn to_plain_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Card {
                title, url, fields, ..
            } => {
                let mut lines = vec![title.clone()];
                if let Some(url) = url {
                    lines.push(url.clone());
                }
                for field in fields {
                    lines.push(format!("{}: {}", field.label, field.value));
                }
                lines.join("\n")
            }
        }
    }
}

/// Card for a fetched issue: title, browse URL, status, assignee (or the
/// unassigned sentinel), reporter, and type.
pub fn render_fetch_success(summary: &IssueSummary) -> ChatMessage {
    ChatMessage::Card {
        title: format!("{}: {}", summary.key, summary.title),
        url: Some(summary.browse_url.clone()),
        color: COLOR_INFO,
        fields: vec![
            MessageField::new("Status", &summary.status),
            MessageField::new("Assignee", summary.assignee_label()),
            MessageField::new("Reporter", &summary.reporter),
            MessageField::new("Type", &summary.issue_type),
        ],
    }
}

/// Failure message for a fetch. Not-found gets a dedicated reply.
pub fn render_fetch_error(reference: &IssueRef, error: &JiraError) -> ChatMessage {
    match error {
        JiraError::NotFound => {
            ChatMessage::text(format!("Issue `{}` was not found.", reference.key()))
        }
        other => ChatMessage::text(format!(
            "Failed to fetch `{}`: {}.",
            reference.key(),
            describe_error(other)
        )),
    }
}

/// Acknowledgment sent before the creation call is made.
pub fn render_create_ack(title: &str) -> ChatMessage {
    ChatMessage::text(format!("Creating ticket titled \"{}\"...", title.trim()))
}

/// Confirmation card for a created issue, attributed to the invoking user.
pub fn render_create_success(
    result: &IssueCreationResult,
    project_key: &str,
    requested_by: &str,
) -> ChatMessage {
    ChatMessage::Card {
        title: format!("Created {}", result.key),
        url: Some(result.browse_url.clone()),
        color: COLOR_SUCCESS,
        fields: vec![
            MessageField::new("Title", &result.title),
            MessageField::new("Project", project_key),
            MessageField::new("Requested by", requested_by),
        ],
    }
}

/// Failure message for a create, with any tracker detail list joined in.
pub fn render_create_error(error: &JiraError) -> ChatMessage {
    ChatMessage::text(format!("Failed to create ticket: {}.", describe_error(error)))
}

/// Human-readable error kind used in failure replies.
pub fn describe_error(error: &JiraError) -> String {
    match error {
        JiraError::NotFound => "issue not found".to_string(),
        JiraError::HttpStatus { status, details } => {
            if details.is_empty() {
                format!("tracker returned status {status}")
            } else {
                format!("tracker returned status {status}: {}", details.join("; "))
            }
        }
        JiraError::Transport(_) => "tracker request failed (transport error)".to_string(),
        JiraError::MalformedResponse(detail) => {
            format!("tracker response was malformed ({detail})")
        }
        JiraError::Config(detail) => format!("tracker configuration error ({detail})"),
        JiraError::Validation(detail) => detail.clone(),
    }
}

#[cfg(test)]
mod tests {
    use bosun_jira::{IssueCreationResult, IssueRef, IssueSummary};

    use super::*;

    fn summary(assignee: Option<&str>) -> IssueSummary {
        IssueSummary {
            key: "PROJ-123".to_string(),
            title: "Fix bug".to_string(),
            status: "Open".to_string(),
            issue_type: "Bug".to_string(),
            reporter: "Alice".to_string(),
            assignee: assignee.map(str::to_string),
            browse_url: "https://example.atlassian.net/browse/PROJ-123".to_string(),
        }
    }

    #[test]
    fn functional_fetch_card_lists_issue_fields() {
        let rendered = render_fetch_success(&summary(None)).to_plain_text();
        assert!(rendered.contains("Fix bug"));
        assert!(rendered.contains("Open"));
        assert!(rendered.contains("Alice"));
        assert!(rendered.contains("unassigned"));
        assert!(rendered.contains("https://example.atlassian.net/browse/PROJ-123"));
    }

    #[test]
    fn unit_fetch_card_uses_assignee_when_present() {
        let rendered = render_fetch_success(&summary(Some("Bob"))).to_plain_text();
        assert!(rendered.contains("Assignee: Bob"));
    }

    #[test]
    fn unit_fetch_not_found_has_dedicated_message() {
        let reference = IssueRef::parse("PROJ-999").expect("reference");
        let rendered = render_fetch_error(&reference, &JiraError::NotFound).to_plain_text();
        assert_eq!(rendered, "Issue `PROJ-999` was not found.");
    }

    #[test]
    fn unit_fetch_error_names_status_code() {
        let reference = IssueRef::parse("PROJ-1").expect("reference");
        let error = JiraError::HttpStatus {
            status: 500,
            details: Vec::new(),
        };
        let rendered = render_fetch_error(&reference, &error).to_plain_text();
        assert!(rendered.contains("PROJ-1"));
        assert!(rendered.contains("500"));
    }

    #[test]
    fn functional_create_confirmation_lists_ticket_fields() {
        let result = IssueCreationResult {
            key: "PROJ-124".to_string(),
            browse_url: "https://example.atlassian.net/browse/PROJ-124".to_string(),
            title: "Fix login bug".to_string(),
        };
        let rendered = render_create_success(&result, "PROJ", "Alice").to_plain_text();
        assert!(rendered.contains("PROJ-124"));
        assert!(rendered.contains("Fix login bug"));
        assert!(rendered.contains("Project: PROJ"));
        assert!(rendered.contains("Requested by: Alice"));
    }

    #[test]
    fn regression_create_confirmation_round_trips_issue_key() {
        let result = IssueCreationResult {
            key: "PROJ-124".to_string(),
            browse_url: "https://example.atlassian.net/browse/PROJ-124".to_string(),
            title: "Fix login bug".to_string(),
        };
        let message = render_create_success(&result, "PROJ", "Alice");
        let ChatMessage::Card { title, .. } = &message else {
            panic!("expected card");
        };
        let token = title.strip_prefix("Created ").expect("key token");
        let parsed = IssueRef::parse(token).expect("round-trip parse");
        assert_eq!(parsed.key(), result.key);
    }

    #[test]
    fn unit_create_error_joins_detail_list() {
        let error = JiraError::HttpStatus {
            status: 400,
            details: vec!["bad project".to_string(), "bad type".to_string()],
        };
        let rendered = render_create_error(&error).to_plain_text();
        assert!(rendered.contains("status 400"));
        assert!(rendered.contains("bad project; bad type"));
    }

    #[test]
    fn unit_create_ack_quotes_title() {
        let rendered = render_create_ack(" Fix login bug ").to_plain_text();
        assert_eq!(rendered, "Creating ticket titled \"Fix login bug\"...");
    }
}
