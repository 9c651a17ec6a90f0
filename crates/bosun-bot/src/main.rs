mod bootstrap_helpers;
mod cli_args;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use bosun_discord_runtime::{run_discord_bot, DiscordRuntimeConfig};
use bosun_slack_runtime::{run_slack_bot, SlackRuntimeConfig};

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::{BotMode, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let jira = cli.jira.to_config();
    let reconnect_delay = Duration::from_millis(cli.reconnect_delay_ms);

    match cli.mode {
        BotMode::Discord(discord) => {
            run_discord_bot(DiscordRuntimeConfig {
                bot_token: discord.bot_token,
                api_base: discord.api_base,
                command_prefix: discord.command_prefix,
                request_timeout_ms: cli.chat_timeout_ms,
                reconnect_delay,
                jira,
            })
            .await
        }
        BotMode::Slack(slack) => {
            run_slack_bot(SlackRuntimeConfig {
                app_token: slack.app_token,
                bot_token: slack.bot_token,
                api_base: slack.api_base,
                command_prefix: slack.command_prefix,
                request_timeout_ms: cli.chat_timeout_ms,
                reconnect_delay,
                bot_user_id: None,
                jira,
            })
            .await
        }
    }
}
