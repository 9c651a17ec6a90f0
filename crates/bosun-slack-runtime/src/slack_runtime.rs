//! Slack Socket Mode runtime that relays ticket commands to the tracker.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, warn};

use bosun_commands::{
    command_usage, parse_ticket_command, render_create_ack, render_create_error,
    render_create_success, render_fetch_error, render_fetch_success, ChatMessage, TicketCommand,
};
use bosun_core::{current_unix_timestamp_ms, truncate_for_chat};
use bosun_jira::{IssueCreationRequest, JiraClient, JiraConfig};

mod slack_api_client;
#[cfg(test)]
mod tests;

use slack_api_client::SlackApiClient;

const SLACK_SAFE_MAX_CHARS: usize = 38_000;

#[derive(Debug, Clone)]
/// Runtime configuration for the Slack transport loop.
pub struct SlackRuntimeConfig {
    pub app_token: String,
    pub bot_token: String,
    pub api_base: String,
    pub command_prefix: String,
    pub request_timeout_ms: u64,
    pub reconnect_delay: Duration,
    /// Overrides the `auth.test` lookup when already known.
    pub bot_user_id: Option<String>,
    pub jira: JiraConfig,
}

/// Runs the Slack bot until shutdown is requested.
pub async fn run_slack_bot(config: SlackRuntimeConfig) -> Result<()> {
    let runtime = SlackRuntime::new(config).await?;
    runtime.run().await
}

enum SessionExit {
    Shutdown,
    Disconnected,
}

struct SlackRuntime {
    config: SlackRuntimeConfig,
    slack_client: SlackApiClient,
    jira_client: Arc<JiraClient>,
    bot_user_id: String,
}

impl SlackRuntime {
    async fn new(config: SlackRuntimeConfig) -> Result<Self> {
        let slack_client = SlackApiClient::new(
            config.api_base.clone(),
            config.app_token.clone(),
            config.bot_token.clone(),
            config.request_timeout_ms,
        )?;
        let jira_client =
            JiraClient::new(&config.jira).context("invalid tracker configuration")?;
        let bot_user_id = match config.bot_user_id.clone() {
            Some(user_id) if !user_id.trim().is_empty() => user_id.trim().to_string(),
            _ => slack_client.resolve_bot_user_id().await?,
        };
        Ok(Self {
            config,
            slack_client,
            jira_client: Arc::new(jira_client),
            bot_user_id,
        })
    }

    async fn run(self) -> Result<()> {
        loop {
            let socket_url = match self.slack_client.open_socket_connection().await {
                Ok(url) => url,
                Err(error) => {
                    warn!("slack socket connection open failed: {error:#}");
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            println!("slack bot shutdown requested");
                            return Ok(());
                        }
                        _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                    }
                    continue;
                }
            };

            match self.run_socket_session(&socket_url).await {
                Ok(SessionExit::Shutdown) => return Ok(()),
                Ok(SessionExit::Disconnected) => {}
                Err(error) => warn!("slack socket session error: {error:#}"),
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!("slack bot shutdown requested");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }
    }

    async fn run_socket_session(&self, socket_url: &str) -> Result<SessionExit> {
        let (stream, _response) = connect_async(socket_url)
            .await
            .context("failed to connect slack socket mode websocket")?;
        let (mut sink, mut source) = stream.split();
        println!("slack socket connected");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!("slack bot shutdown requested");
                    return Ok(SessionExit::Shutdown);
                }
                maybe_message = source.next() => {
                    let Some(message_result) = maybe_message else {
                        return Ok(SessionExit::Disconnected);
                    };
                    let message = message_result.context("failed reading slack websocket message")?;
                    let Some(envelope) = parse_socket_envelope(message)? else {
                        continue;
                    };
                    match envelope.envelope_type.as_str() {
                        "hello" => debug!("slack socket hello received"),
                        "disconnect" => {
                            debug!("slack socket disconnect requested");
                            return Ok(SessionExit::Disconnected);
                        }
                        "events_api" => {
                            self.ack_envelope(&mut sink, &envelope.envelope_id).await?;
                            if let Some(event) =
                                normalize_socket_envelope(&envelope, &self.bot_user_id)?
                            {
                                self.dispatch_event(event);
                            }
                        }
                        other => debug!("ignoring slack envelope type {other}"),
                    }
                }
            }
        }
    }

    async fn ack_envelope<S>(&self, sink: &mut S, envelope_id: &str) -> Result<()>
    where
        S: futures_util::Sink<WsMessage> + Unpin,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        if envelope_id.is_empty() {
            return Ok(());
        }
        let ack = json!({ "envelope_id": envelope_id }).to_string();
        sink.send(WsMessage::Text(ack.into()))
            .await
            .context("failed to send slack socket ack")
    }

    fn dispatch_event(&self, event: SlackBridgeEvent) {
        let text = normalize_event_text(&event.text, &self.bot_user_id);
        let Some(command) = parse_ticket_command(&text, &self.config.command_prefix) else {
            debug!(
                "ignoring {} without ticket command in channel {}",
                event.kind.as_str(),
                event.channel_id
            );
            return;
        };

        let slack_client = self.slack_client.clone();
        let jira_client = Arc::clone(&self.jira_client);
        let context = CommandContext {
            command_prefix: self.config.command_prefix.clone(),
            project_key: self.config.jira.project_key.clone(),
            issue_type: self.config.jira.issue_type.clone(),
            channel_id: event.channel_id.clone(),
            thread_ts: event.reply_thread_ts().map(str::to_string),
            // Mention markup renders as the member's display name in Slack.
            requested_by: format!("<@{}>", event.user_id),
        };
        let started_unix_ms = current_unix_timestamp_ms();
        tokio::spawn(async move {
            match handle_ticket_command(&slack_client, &jira_client, &context, command).await {
                Ok(()) => debug!(
                    "slack command completed in {}ms",
                    current_unix_timestamp_ms().saturating_sub(started_unix_ms)
                ),
                Err(error) => warn!("slack command handling failed: {error:#}"),
            }
        });
    }
}

#[derive(Debug, Clone)]
struct CommandContext {
    command_prefix: String,
    project_key: String,
    issue_type: String,
    channel_id: String,
    thread_ts: Option<String>,
    requested_by: String,
}

/// Linear receive, validate, call, format, reply sequence for one command
/// invocation. Stateless across invocations.
async fn handle_ticket_command(
    slack_client: &SlackApiClient,
    jira_client: &JiraClient,
    context: &CommandContext,
    command: TicketCommand,
) -> Result<()> {
    match command {
        TicketCommand::Help => {
            post_reply(
                slack_client,
                context,
                &ChatMessage::text(command_usage(&context.command_prefix)),
            )
            .await?;
        }
        TicketCommand::Invalid { message } => {
            post_reply(slack_client, context, &ChatMessage::text(message)).await?;
        }
        TicketCommand::Fetch { reference } => {
            let message = match jira_client.fetch_issue(&reference).await {
                Ok(summary) => render_fetch_success(&summary),
                Err(error) => {
                    warn!("fetch of {} failed: {error}", reference.key());
                    render_fetch_error(&reference, &error)
                }
            };
            post_reply(slack_client, context, &message).await?;
        }
        TicketCommand::Create { title } => {
            post_reply(slack_client, context, &render_create_ack(&title)).await?;
            let request = IssueCreationRequest {
                project_key: context.project_key.clone(),
                title,
                issue_type: context.issue_type.clone(),
            };
            let message = match jira_client.create_issue(&request).await {
                Ok(result) => {
                    render_create_success(&result, &context.project_key, &context.requested_by)
                }
                Err(error) => {
                    warn!("create in project {} failed: {error}", context.project_key);
                    render_create_error(&error)
                }
            };
            post_reply(slack_client, context, &message).await?;
        }
    }
    Ok(())
}

async fn post_reply(
    slack_client: &SlackApiClient,
    context: &CommandContext,
    message: &ChatMessage,
) -> Result<()> {
    let text = truncate_for_chat(&message.to_plain_text(), SLACK_SAFE_MAX_CHARS);
    slack_client
        .post_message(&context.channel_id, &text, context.thread_ts.as_deref())
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
struct SlackSocketEnvelope {
    #[serde(default)]
    envelope_id: String,
    #[serde(rename = "type")]
    envelope_type: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SlackEventKind {
    AppMention,
    DirectMessage,
}

impl SlackEventKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::AppMention => "app_mention",
            Self::DirectMessage => "message.im",
        }
    }
}

#[derive(Debug, Clone)]
struct SlackBridgeEvent {
    kind: SlackEventKind,
    event_id: String,
    channel_id: String,
    user_id: String,
    text: String,
    ts: String,
    thread_ts: Option<String>,
}

impl SlackBridgeEvent {
    fn reply_thread_ts(&self) -> Option<&str> {
        self.thread_ts.as_deref().or(Some(self.ts.as_str()))
    }
}

#[derive(Debug, Deserialize)]
struct SlackEventCallbackEnvelope {
    #[serde(rename = "type")]
    callback_type: String,
    event_id: String,
    event: SlackEventPayload,
}

#[derive(Debug, Deserialize)]
struct SlackEventPayload {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    channel_type: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
}

fn parse_socket_envelope(message: WsMessage) -> Result<Option<SlackSocketEnvelope>> {
    match message {
        WsMessage::Text(text) => {
            let envelope = serde_json::from_str::<SlackSocketEnvelope>(&text)
                .context("failed to parse slack socket envelope")?;
            Ok(Some(envelope))
        }
        WsMessage::Binary(bytes) => {
            let text =
                String::from_utf8(bytes.to_vec()).context("invalid utf-8 slack socket payload")?;
            let envelope = serde_json::from_str::<SlackSocketEnvelope>(&text)
                .context("failed to parse slack socket envelope")?;
            Ok(Some(envelope))
        }
        WsMessage::Ping(_) | WsMessage::Pong(_) => Ok(None),
        WsMessage::Close(_) => Ok(None),
        WsMessage::Frame(_) => Ok(None),
    }
}

fn normalize_socket_envelope(
    envelope: &SlackSocketEnvelope,
    bot_user_id: &str,
) -> Result<Option<SlackBridgeEvent>> {
    if envelope.envelope_type != "events_api" {
        return Ok(None);
    }

    let callback = serde_json::from_value::<SlackEventCallbackEnvelope>(envelope.payload.clone())
        .context("failed to decode slack event callback payload")?;
    if callback.callback_type != "event_callback" {
        return Ok(None);
    }

    let event = callback.event;
    if event.subtype.as_deref() == Some("bot_message") {
        return Ok(None);
    }
    let user_id = match event.user {
        Some(user) if !user.trim().is_empty() => user,
        _ => return Ok(None),
    };
    if user_id == bot_user_id {
        return Ok(None);
    }

    let channel_id = match event.channel {
        Some(channel) if !channel.trim().is_empty() => channel,
        _ => return Ok(None),
    };
    let message_ts = match event.ts {
        Some(ts) if !ts.trim().is_empty() => ts,
        _ => return Ok(None),
    };
    let text = event.text.unwrap_or_default();

    let kind = match event.event_type.as_str() {
        "app_mention" => SlackEventKind::AppMention,
        "message" if event.channel_type.as_deref() == Some("im") || channel_id.starts_with('D') => {
            SlackEventKind::DirectMessage
        }
        _ => return Ok(None),
    };

    Ok(Some(SlackBridgeEvent {
        kind,
        event_id: callback.event_id,
        channel_id,
        user_id,
        text,
        ts: message_ts,
        thread_ts: event.thread_ts,
    }))
}

/// Strips the bot's own mention markup so the command prefix leads.
fn normalize_event_text(text: &str, bot_user_id: &str) -> String {
    text.replace(&format!("<@{bot_user_id}>"), " ")
        .trim()
        .to_string()
}
