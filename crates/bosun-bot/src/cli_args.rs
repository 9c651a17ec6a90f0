//! CLI surface for the bot binary. All settings are env-backed so the
//! process can run with no flags; missing required values fail at startup.

use clap::{Args, Parser, Subcommand};

use bosun_jira::JiraConfig;

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "bosun",
    about = "Chat bot that relays ticket commands to an issue tracker",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub jira: JiraArgs,

    #[arg(
        long = "reconnect-delay-ms",
        env = "BOSUN_RECONNECT_DELAY_MS",
        default_value_t = 5_000,
        value_parser = parse_positive_u64,
        help = "Delay between chat gateway reconnect attempts in milliseconds"
    )]
    pub reconnect_delay_ms: u64,

    #[arg(
        long = "chat-timeout-ms",
        env = "BOSUN_CHAT_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "HTTP request timeout for chat platform REST calls in milliseconds"
    )]
    pub chat_timeout_ms: u64,

    #[command(subcommand)]
    pub mode: BotMode,
}

#[derive(Debug, Args)]
/// Tracker connection settings shared by both bot variants.
pub struct JiraArgs {
    #[arg(
        long = "jira-base-url",
        env = "BOSUN_JIRA_BASE_URL",
        help = "Base URL of the tracker instance, e.g. https://example.atlassian.net"
    )]
    pub base_url: String,

    #[arg(
        long = "jira-user",
        env = "BOSUN_JIRA_USER",
        help = "Tracker account email used for HTTP Basic authentication"
    )]
    pub user: String,

    #[arg(
        long = "jira-token",
        env = "BOSUN_JIRA_TOKEN",
        help = "Tracker API token used for HTTP Basic authentication"
    )]
    pub api_token: String,

    #[arg(
        long = "jira-project",
        env = "BOSUN_JIRA_PROJECT",
        help = "Default project key for created tickets"
    )]
    pub project_key: String,

    #[arg(
        long = "jira-issue-type",
        env = "BOSUN_JIRA_ISSUE_TYPE",
        default_value = "Task",
        help = "Issue type name for created tickets"
    )]
    pub issue_type: String,

    #[arg(
        long = "jira-timeout-ms",
        env = "BOSUN_JIRA_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "HTTP request timeout for tracker calls in milliseconds"
    )]
    pub request_timeout_ms: u64,
}

impl JiraArgs {
    pub fn to_config(&self) -> JiraConfig {
        JiraConfig {
            base_url: self.base_url.clone(),
            user: self.user.clone(),
            api_token: self.api_token.clone(),
            project_key: self.project_key.clone(),
            issue_type: self.issue_type.clone(),
            request_timeout_ms: self.request_timeout_ms,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum BotMode {
    /// Run the Discord variant of the bot.
    Discord(DiscordArgs),
    /// Run the Slack variant of the bot.
    Slack(SlackArgs),
}

#[derive(Debug, Args)]
pub struct DiscordArgs {
    #[arg(
        long = "discord-bot-token",
        env = "BOSUN_DISCORD_BOT_TOKEN",
        help = "Discord bot token used for the gateway and REST API"
    )]
    pub bot_token: String,

    #[arg(
        long = "discord-api-base",
        env = "BOSUN_DISCORD_API_BASE",
        default_value = "https://discord.com/api/v10",
        help = "Base URL for the Discord REST API"
    )]
    pub api_base: String,

    #[arg(
        long = "command-prefix",
        env = "BOSUN_COMMAND_PREFIX",
        default_value = "!ticket",
        help = "Prefix that marks ticket commands in chat messages"
    )]
    pub command_prefix: String,
}

#[derive(Debug, Args)]
pub struct SlackArgs {
    #[arg(
        long = "slack-app-token",
        env = "BOSUN_SLACK_APP_TOKEN",
        help = "Slack app-level token used to open Socket Mode connections"
    )]
    pub app_token: String,

    #[arg(
        long = "slack-bot-token",
        env = "BOSUN_SLACK_BOT_TOKEN",
        help = "Slack bot token used for Web API calls"
    )]
    pub bot_token: String,

    #[arg(
        long = "slack-api-base",
        env = "BOSUN_SLACK_API_BASE",
        default_value = "https://slack.com/api",
        help = "Base URL for the Slack Web API"
    )]
    pub api_base: String,

    #[arg(
        long = "command-prefix",
        env = "BOSUN_COMMAND_PREFIX",
        default_value = "/ticket",
        help = "Prefix that marks ticket commands in chat messages"
    )]
    pub command_prefix: String,
}
