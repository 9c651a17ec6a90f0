//! Ticket command parsing shared by the Discord and Slack runtimes.

use bosun_jira::IssueRef;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates supported `TicketCommand` values. Dispatch is a static
/// match over this enum; there is no runtime command registration.
pub enum TicketCommand {
    Fetch { reference: IssueRef },
    Create { title: String },
    Help,
    Invalid { message: String },
}

/// Usage text listing the supported commands for `prefix`.
pub fn command_usage(prefix: &str) -> String {
    [
        format!("Supported `{prefix}` commands:"),
        format!("- `{prefix} fetch <issue-key>`"),
        format!("- `{prefix} create <title>`"),
        format!("- `{prefix} help`"),
    ]
    .join("\n")
}

/// Parses a chat message into a ticket command. Returns `None` when the
/// text does not start with `prefix`, so unrelated chatter is ignored.
pub fn parse_ticket_command(text: &str, prefix: &str) -> Option<TicketCommand> {
    let trimmed = text.trim();
    let mut pieces = trimmed.split_whitespace();
    let command_prefix = pieces.next()?;
    if command_prefix != prefix {
        return None;
    }

    let args = trimmed[command_prefix.len()..].trim();
    if args.is_empty() {
        return Some(TicketCommand::Invalid {
            message: command_usage(prefix),
        });
    }
    let mut parts = args.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let remainder = parts.next().unwrap_or_default().trim();
    let parsed = match command {
        "help" => {
            if remainder.is_empty() {
                TicketCommand::Help
            } else {
                TicketCommand::Invalid {
                    message: format!("Usage: {prefix} help"),
                }
            }
        }
        "fetch" => {
            if remainder.is_empty() || remainder.split_whitespace().count() > 1 {
                TicketCommand::Invalid {
                    message: format!("Usage: {prefix} fetch <issue-key>"),
                }
            } else {
                match IssueRef::parse(remainder) {
                    Ok(reference) => TicketCommand::Fetch { reference },
                    Err(error) => TicketCommand::Invalid {
                        message: error.to_string(),
                    },
                }
            }
        }
        "create" => {
            if remainder.is_empty() {
                TicketCommand::Invalid {
                    message: format!(
                        "A ticket title is required. Usage: {prefix} create <title>"
                    ),
                }
            } else {
                TicketCommand::Create {
                    title: remainder.to_string(),
                }
            }
        }
        _ => TicketCommand::Invalid {
            message: format!("Unknown command `{}`.\n\n{}", command, command_usage(prefix)),
        },
    };
    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_parse_returns_none_for_unrelated_text() {
        assert_eq!(parse_ticket_command("hello there", "!ticket"), None);
        assert_eq!(parse_ticket_command("", "!ticket"), None);
        assert_eq!(parse_ticket_command("!ticketfetch PROJ-1", "!ticket"), None);
    }

    #[test]
    fn functional_parse_fetch_command() {
        let parsed = parse_ticket_command("!ticket fetch proj-123", "!ticket").expect("parsed");
        match parsed {
            TicketCommand::Fetch { reference } => assert_eq!(reference.key(), "PROJ-123"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn functional_parse_create_keeps_full_title() {
        let parsed =
            parse_ticket_command("/ticket create Fix login bug", "/ticket").expect("parsed");
        assert_eq!(
            parsed,
            TicketCommand::Create {
                title: "Fix login bug".to_string(),
            }
        );
    }

    #[test]
    fn unit_parse_create_without_title_is_invalid() {
        let parsed = parse_ticket_command("!ticket create", "!ticket").expect("parsed");
        match parsed {
            TicketCommand::Invalid { message } => assert!(message.contains("title is required")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unit_parse_fetch_rejects_extra_arguments() {
        let parsed = parse_ticket_command("!ticket fetch PROJ-1 PROJ-2", "!ticket").expect("parsed");
        assert!(matches!(parsed, TicketCommand::Invalid { .. }));
    }

    #[test]
    fn unit_parse_fetch_rejects_malformed_reference() {
        let parsed = parse_ticket_command("!ticket fetch banana", "!ticket").expect("parsed");
        match parsed {
            TicketCommand::Invalid { message } => assert!(message.contains("banana")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn regression_parse_bare_prefix_returns_usage() {
        let parsed = parse_ticket_command("  !ticket  ", "!ticket").expect("parsed");
        assert_eq!(
            parsed,
            TicketCommand::Invalid {
                message: command_usage("!ticket"),
            }
        );
    }

    #[test]
    fn unit_parse_unknown_command_includes_usage() {
        let parsed = parse_ticket_command("!ticket close PROJ-1", "!ticket").expect("parsed");
        match parsed {
            TicketCommand::Invalid { message } => {
                assert!(message.contains("Unknown command `close`"));
                assert!(message.contains("fetch <issue-key>"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unit_parse_help_command() {
        assert_eq!(
            parse_ticket_command("!ticket help", "!ticket"),
            Some(TicketCommand::Help)
        );
    }
}
