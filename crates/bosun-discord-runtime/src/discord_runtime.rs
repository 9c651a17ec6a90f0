//! Discord gateway runtime that relays ticket commands to the tracker.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, warn};

use bosun_commands::{
    command_usage, parse_ticket_command, render_create_ack, render_create_error,
    render_create_success, render_fetch_error, render_fetch_success, ChatMessage, TicketCommand,
};
use bosun_core::current_unix_timestamp_ms;
use bosun_jira::{IssueCreationRequest, JiraClient, JiraConfig};

mod discord_api_client;

use discord_api_client::DiscordApiClient;

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

// GUILD_MESSAGES | DIRECT_MESSAGES | MESSAGE_CONTENT
const GATEWAY_INTENTS: u64 = (1 << 9) | (1 << 12) | (1 << 15);

#[derive(Debug, Clone)]
/// Runtime configuration for the Discord transport loop.
pub struct DiscordRuntimeConfig {
    pub bot_token: String,
    pub api_base: String,
    pub command_prefix: String,
    pub request_timeout_ms: u64,
    pub reconnect_delay: Duration,
    pub jira: JiraConfig,
}

/// Runs the Discord bot until shutdown is requested.
pub async fn run_discord_bot(config: DiscordRuntimeConfig) -> Result<()> {
    let runtime = DiscordRuntime::new(config)?;
    runtime.run().await
}

enum SessionExit {
    Shutdown,
    Disconnected,
}

struct DiscordRuntime {
    config: DiscordRuntimeConfig,
    discord_client: DiscordApiClient,
    jira_client: Arc<JiraClient>,
    bot_user_id: Option<String>,
}

impl DiscordRuntime {
    fn new(config: DiscordRuntimeConfig) -> Result<Self> {
        let discord_client = DiscordApiClient::new(
            config.api_base.clone(),
            config.bot_token.clone(),
            config.request_timeout_ms,
        )?;
        let jira_client =
            JiraClient::new(&config.jira).context("invalid tracker configuration")?;
        Ok(Self {
            config,
            discord_client,
            jira_client: Arc::new(jira_client),
            bot_user_id: None,
        })
    }

    async fn run(mut self) -> Result<()> {
        loop {
            let gateway_url = match self.discord_client.resolve_gateway_url().await {
                Ok(url) => url,
                Err(error) => {
                    warn!("discord gateway lookup failed: {error:#}");
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            println!("discord bot shutdown requested");
                            return Ok(());
                        }
                        _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                    }
                    continue;
                }
            };

            match self.run_gateway_session(&gateway_url).await {
                Ok(SessionExit::Shutdown) => return Ok(()),
                Ok(SessionExit::Disconnected) => {}
                Err(error) => warn!("discord gateway session error: {error:#}"),
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!("discord bot shutdown requested");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }
    }

    async fn run_gateway_session(&mut self, gateway_url: &str) -> Result<SessionExit> {
        let socket_url = format!("{}/?v=10&encoding=json", gateway_url.trim_end_matches('/'));
        let (stream, _response) = connect_async(socket_url.as_str())
            .await
            .context("failed to connect discord gateway websocket")?;
        let (mut sink, mut source) = stream.split();
        println!("discord gateway connected");

        let mut last_sequence: Option<u64> = None;
        // Replaced with the negotiated interval once hello arrives.
        let mut heartbeat = tokio::time::interval(Duration::from_secs(41));
        let mut identified = false;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!("discord bot shutdown requested");
                    return Ok(SessionExit::Shutdown);
                }
                _ = heartbeat.tick(), if identified => {
                    send_heartbeat(&mut sink, last_sequence).await?;
                }
                maybe_message = source.next() => {
                    let Some(message_result) = maybe_message else {
                        return Ok(SessionExit::Disconnected);
                    };
                    let message = message_result.context("failed reading discord gateway message")?;
                    let Some(event) = parse_gateway_event(message)? else {
                        continue;
                    };
                    if let Some(sequence) = event.sequence {
                        last_sequence = Some(sequence);
                    }
                    match event.op {
                        OP_HELLO => {
                            let hello = serde_json::from_value::<GatewayHello>(event.data.clone())
                                .context("failed to decode discord gateway hello")?;
                            heartbeat = tokio::time::interval(Duration::from_millis(
                                hello.heartbeat_interval.max(1_000),
                            ));
                            self.send_identify(&mut sink).await?;
                            identified = true;
                        }
                        OP_HEARTBEAT => send_heartbeat(&mut sink, last_sequence).await?,
                        OP_HEARTBEAT_ACK => {}
                        OP_RECONNECT => {
                            debug!("discord gateway requested reconnect");
                            return Ok(SessionExit::Disconnected);
                        }
                        OP_INVALID_SESSION => {
                            warn!("discord gateway reported invalid session");
                            return Ok(SessionExit::Disconnected);
                        }
                        OP_DISPATCH => self.handle_dispatch(&event),
                        other => debug!("ignoring discord gateway opcode {other}"),
                    }
                }
            }
        }
    }

    async fn send_identify<S>(&self, sink: &mut S) -> Result<()>
    where
        S: futures_util::Sink<WsMessage> + Unpin,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let payload = json!({
            "op": OP_IDENTIFY,
            "d": {
                "token": self.config.bot_token,
                "intents": GATEWAY_INTENTS,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "bosun",
                    "device": "bosun",
                },
            }
        });
        sink.send(WsMessage::Text(payload.to_string().into()))
            .await
            .context("failed to send discord identify")
    }

    fn handle_dispatch(&mut self, event: &GatewayEvent) {
        match event.event_type.as_deref() {
            Some("READY") => match serde_json::from_value::<GatewayReady>(event.data.clone()) {
                Ok(ready) => {
                    info!("discord gateway ready as {}", ready.user.username);
                    self.bot_user_id = Some(ready.user.id);
                }
                Err(error) => warn!("failed to decode discord ready payload: {error}"),
            },
            Some("MESSAGE_CREATE") => {
                match serde_json::from_value::<InboundMessage>(event.data.clone()) {
                    Ok(inbound) => self.dispatch_inbound_message(inbound),
                    Err(error) => warn!("failed to decode discord message payload: {error}"),
                }
            }
            _ => {}
        }
    }

    fn dispatch_inbound_message(&self, inbound: InboundMessage) {
        if inbound.author.bot {
            return;
        }
        if self.bot_user_id.as_deref() == Some(inbound.author.id.as_str()) {
            return;
        }
        let Some(command) = parse_ticket_command(&inbound.content, &self.config.command_prefix)
        else {
            return;
        };

        debug!("discord ticket command received in channel {}", inbound.channel_id);
        let discord_client = self.discord_client.clone();
        let jira_client = Arc::clone(&self.jira_client);
        let context = CommandContext {
            command_prefix: self.config.command_prefix.clone(),
            project_key: self.config.jira.project_key.clone(),
            issue_type: self.config.jira.issue_type.clone(),
            channel_id: inbound.channel_id,
            requested_by: inbound.author.display_name().to_string(),
        };
        let started_unix_ms = current_unix_timestamp_ms();
        tokio::spawn(async move {
            match handle_ticket_command(&discord_client, &jira_client, &context, command).await {
                Ok(()) => debug!(
                    "discord command completed in {}ms",
                    current_unix_timestamp_ms().saturating_sub(started_unix_ms)
                ),
                Err(error) => warn!("discord command handling failed: {error:#}"),
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
    requested_by: String,
}

/// Linear receive, validate, call, format, reply sequence for one command
/// invocation. Stateless across invocations.
async fn handle_ticket_command(
    discord_client: &DiscordApiClient,
    jira_client: &JiraClient,
    context: &CommandContext,
    command: TicketCommand,
) -> Result<()> {
    match command {
        TicketCommand::Help => {
            discord_client
                .send_message(
                    &context.channel_id,
                    &ChatMessage::text(command_usage(&context.command_prefix)),
                )
                .await?;
        }
        TicketCommand::Invalid { message } => {
            discord_client
                .send_message(&context.channel_id, &ChatMessage::text(message))
                .await?;
        }
        TicketCommand::Fetch { reference } => {
            let message = match jira_client.fetch_issue(&reference).await {
                Ok(summary) => render_fetch_success(&summary),
                Err(error) => {
                    warn!("fetch of {} failed: {error}", reference.key());
                    render_fetch_error(&reference, &error)
                }
            };
            discord_client
                .send_message(&context.channel_id, &message)
                .await?;
        }
        TicketCommand::Create { title } => {
            discord_client
                .send_message(&context.channel_id, &render_create_ack(&title))
                .await?;
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
            discord_client
                .send_message(&context.channel_id, &message)
                .await?;
        }
    }
    Ok(())
}

async fn send_heartbeat<S>(sink: &mut S, last_sequence: Option<u64>) -> Result<()>
where
    S: futures_util::Sink<WsMessage> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let payload = json!({ "op": OP_HEARTBEAT, "d": last_sequence });
    sink.send(WsMessage::Text(payload.to_string().into()))
        .await
        .context("failed to send discord heartbeat")
}

#[derive(Debug, Clone, Deserialize)]
struct GatewayEvent {
    op: u8,
    #[serde(rename = "d", default)]
    data: Value,
    #[serde(rename = "s", default)]
    sequence: Option<u64>,
    #[serde(rename = "t", default)]
    event_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GatewayHello {
    heartbeat_interval: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct GatewayReady {
    user: DiscordUser,
}

#[derive(Debug, Clone, Deserialize)]
struct DiscordUser {
    id: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    global_name: Option<String>,
    #[serde(default)]
    bot: bool,
}

impl DiscordUser {
    /// Display name for confirmations: global name when set, else username.
    fn display_name(&self) -> &str {
        self.global_name
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct InboundMessage {
    channel_id: String,
    #[serde(default)]
    content: String,
    author: DiscordUser,
}

fn parse_gateway_event(message: WsMessage) -> Result<Option<GatewayEvent>> {
    match message {
        WsMessage::Text(text) => {
            let event = serde_json::from_str::<GatewayEvent>(&text)
                .context("failed to parse discord gateway event")?;
            Ok(Some(event))
        }
        WsMessage::Binary(bytes) => {
            let text = String::from_utf8(bytes.to_vec())
                .context("invalid utf-8 discord gateway payload")?;
            let event = serde_json::from_str::<GatewayEvent>(&text)
                .context("failed to parse discord gateway event")?;
            Ok(Some(event))
        }
        WsMessage::Ping(_) | WsMessage::Pong(_) => Ok(None),
        WsMessage::Close(_) => Ok(None),
        WsMessage::Frame(_) => Ok(None),
    }
}
