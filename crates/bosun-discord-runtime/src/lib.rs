//! Discord variant of the Bosun relay bot.
//!
//! Connects to the Discord gateway, listens for prefix commands, and
//! relays them to the issue tracker through the shared dispatch core.

mod discord_runtime;

pub use discord_runtime::{run_discord_bot, DiscordRuntimeConfig};
