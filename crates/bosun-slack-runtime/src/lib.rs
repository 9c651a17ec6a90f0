//! Slack variant of the Bosun relay bot.
//!
//! Connects over Socket Mode, listens for ticket commands in mentions
//! and direct messages, and relays them to the issue tracker through the
//! shared dispatch core.

mod slack_runtime;

pub use slack_runtime::{run_slack_bot, SlackRuntimeConfig};
