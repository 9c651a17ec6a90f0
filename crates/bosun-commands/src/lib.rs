//! Command dispatch core shared by the chat runtimes.
//!
//! Parses ticket commands out of chat text and renders tracker results
//! into platform-neutral messages. Each runtime converts the resulting
//! [`ChatMessage`] into its native delivery format.

pub mod command_parser;
pub mod render;

pub use command_parser::{command_usage, parse_ticket_command, TicketCommand};
pub use render::{
    describe_error, render_create_ack, render_create_error, render_create_success,
    render_fetch_error, render_fetch_success, ChatMessage, MessageField, COLOR_INFO, COLOR_SUCCESS,
};
