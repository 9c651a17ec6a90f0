//! Issue-tracker REST client for Bosun.
//!
//! Translates the two bot operations (fetch issue, create issue) into
//! authenticated Jira REST calls and normalizes responses into typed
//! results or a [`JiraError`].

pub mod client;
pub mod config;
pub mod types;

pub use client::JiraClient;
pub use config::JiraConfig;
pub use types::{
    IssueCreationRequest, IssueCreationResult, IssueRef, IssueSummary, JiraError, UNASSIGNED_LABEL,
};
