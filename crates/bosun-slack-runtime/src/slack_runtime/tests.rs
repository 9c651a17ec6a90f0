//! Tests for Slack envelope handling and ticket command dispatch.

use httpmock::prelude::*;
use serde_json::json;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::slack_api_client::SlackApiClient;
use super::{
    handle_ticket_command, normalize_event_text, normalize_socket_envelope, parse_socket_envelope,
    CommandContext, SlackBridgeEvent, SlackEventKind, SlackSocketEnvelope, TicketCommand,
};
use bosun_jira::{IssueRef, JiraClient, JiraConfig};

fn jira_config(base_url: &str) -> JiraConfig {
    JiraConfig {
        base_url: base_url.to_string(),
        user: "bot@example.com".to_string(),
        api_token: "jira-token".to_string(),
        project_key: "PROJ".to_string(),
        issue_type: "Task".to_string(),
        request_timeout_ms: 3_000,
    }
}

fn slack_client(base_url: &str) -> SlackApiClient {
    SlackApiClient::new(
        base_url.to_string(),
        "xapp-test".to_string(),
        "xoxb-test".to_string(),
        3_000,
    )
    .expect("client")
}

fn command_context(channel_id: &str) -> CommandContext {
    CommandContext {
        command_prefix: "/ticket".to_string(),
        project_key: "PROJ".to_string(),
        issue_type: "Task".to_string(),
        channel_id: channel_id.to_string(),
        thread_ts: Some("11.0".to_string()),
        requested_by: "<@U1>".to_string(),
    }
}

fn mention_envelope(text: &str) -> SlackSocketEnvelope {
    SlackSocketEnvelope {
        envelope_id: "env1".to_string(),
        envelope_type: "events_api".to_string(),
        payload: json!({
            "type": "event_callback",
            "event_id": "Ev1",
            "event": {
                "type": "app_mention",
                "user": "U1",
                "channel": "C1",
                "text": text,
                "ts": "10.0",
            }
        }),
    }
}

#[test]
fn unit_parse_socket_envelope_handles_text_binary_and_ping() {
    let text = WsMessage::Text(
        json!({
            "envelope_id": "1",
            "type": "events_api",
            "payload": { "type": "event_callback" },
        })
        .to_string()
        .into(),
    );
    let parsed = parse_socket_envelope(text).expect("parse text").expect("envelope");
    assert_eq!(parsed.envelope_type, "events_api");
    assert_eq!(parsed.envelope_id, "1");

    let hello = WsMessage::Binary(
        json!({ "type": "hello", "num_connections": 1 })
            .to_string()
            .into_bytes()
            .into(),
    );
    let parsed = parse_socket_envelope(hello)
        .expect("parse binary")
        .expect("envelope");
    assert_eq!(parsed.envelope_type, "hello");
    assert!(parsed.envelope_id.is_empty());

    assert!(parse_socket_envelope(WsMessage::Ping(vec![].into()))
        .expect("ping")
        .is_none());
}

#[test]
fn unit_normalize_socket_envelope_maps_mentions_and_dms() {
    let mention = mention_envelope("<@UBOT> /ticket fetch PROJ-1");
    let event = normalize_socket_envelope(&mention, "UBOT")
        .expect("normalize")
        .expect("event");
    assert_eq!(event.kind, SlackEventKind::AppMention);
    assert_eq!(event.channel_id, "C1");
    assert_eq!(event.user_id, "U1");
    assert_eq!(event.ts, "10.0");

    let dm = SlackSocketEnvelope {
        envelope_id: "env2".to_string(),
        envelope_type: "events_api".to_string(),
        payload: json!({
            "type": "event_callback",
            "event_id": "Ev2",
            "event": {
                "type": "message",
                "channel_type": "im",
                "user": "U2",
                "channel": "D1",
                "text": "/ticket help",
                "ts": "10.1",
            }
        }),
    };
    let event = normalize_socket_envelope(&dm, "UBOT")
        .expect("normalize")
        .expect("event");
    assert_eq!(event.kind, SlackEventKind::DirectMessage);
    assert_eq!(event.channel_id, "D1");
}

#[test]
fn unit_normalize_socket_envelope_skips_bot_traffic() {
    let own_message = SlackSocketEnvelope {
        envelope_id: "env3".to_string(),
        envelope_type: "events_api".to_string(),
        payload: json!({
            "type": "event_callback",
            "event_id": "Ev3",
            "event": {
                "type": "app_mention",
                "user": "UBOT",
                "channel": "C1",
                "text": "/ticket help",
                "ts": "10.2",
            }
        }),
    };
    assert!(normalize_socket_envelope(&own_message, "UBOT")
        .expect("normalize")
        .is_none());

    let bot_message = SlackSocketEnvelope {
        envelope_id: "env4".to_string(),
        envelope_type: "events_api".to_string(),
        payload: json!({
            "type": "event_callback",
            "event_id": "Ev4",
            "event": {
                "type": "message",
                "subtype": "bot_message",
                "channel": "D1",
                "text": "automated",
                "ts": "10.3",
            }
        }),
    };
    assert!(normalize_socket_envelope(&bot_message, "UBOT")
        .expect("normalize")
        .is_none());

    let non_event = SlackSocketEnvelope {
        envelope_id: String::new(),
        envelope_type: "hello".to_string(),
        payload: json!({}),
    };
    assert!(normalize_socket_envelope(&non_event, "UBOT")
        .expect("normalize")
        .is_none());
}

#[test]
fn unit_normalize_event_text_strips_bot_mention() {
    assert_eq!(
        normalize_event_text("<@UBOT> /ticket fetch PROJ-1", "UBOT"),
        "/ticket fetch PROJ-1"
    );
    assert_eq!(normalize_event_text("/ticket help", "UBOT"), "/ticket help");
}

#[test]
fn unit_reply_thread_ts_falls_back_to_message_ts() {
    let mut event = SlackBridgeEvent {
        kind: SlackEventKind::AppMention,
        event_id: "Ev1".to_string(),
        channel_id: "C1".to_string(),
        user_id: "U1".to_string(),
        text: "/ticket help".to_string(),
        ts: "10.0".to_string(),
        thread_ts: None,
    };
    assert_eq!(event.reply_thread_ts(), Some("10.0"));
    event.thread_ts = Some("9.5".to_string());
    assert_eq!(event.reply_thread_ts(), Some("9.5"));
}

#[tokio::test]
async fn functional_resolve_bot_user_id_returns_id() {
    let server = MockServer::start();
    let auth = server.mock(|when, then| {
        when.method(POST).path("/auth.test");
        then.status(200)
            .json_body(json!({ "ok": true, "user_id": "UBOT" }));
    });

    let client = slack_client(&server.base_url());
    let user_id = client.resolve_bot_user_id().await.expect("user id");
    auth.assert();
    assert_eq!(user_id, "UBOT");
}

#[tokio::test]
async fn regression_resolve_bot_user_id_surfaces_slack_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/auth.test");
        then.status(200)
            .json_body(json!({ "ok": false, "error": "invalid_auth" }));
    });

    let client = slack_client(&server.base_url());
    let error = client.resolve_bot_user_id().await.expect_err("error");
    assert!(error.to_string().contains("invalid_auth"));
}

#[tokio::test]
async fn functional_open_socket_connection_returns_url() {
    let server = MockServer::start();
    let open = server.mock(|when, then| {
        when.method(POST).path("/apps.connections.open");
        then.status(200)
            .json_body(json!({ "ok": true, "url": "wss://wss.slack.com/link/abc" }));
    });

    let client = slack_client(&server.base_url());
    let url = client.open_socket_connection().await.expect("url");
    open.assert();
    assert_eq!(url, "wss://wss.slack.com/link/abc");
}

#[tokio::test]
async fn functional_post_message_threads_reply() {
    let server = MockServer::start();
    let post = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .body_includes("\"channel\":\"C1\"")
            .body_includes("\"thread_ts\":\"11.0\"");
        then.status(200)
            .json_body(json!({ "ok": true, "channel": "C1", "ts": "12.0" }));
    });

    let client = slack_client(&server.base_url());
    let posted = client
        .post_message("C1", "hello", Some("11.0"))
        .await
        .expect("posted");
    post.assert();
    assert_eq!(posted.channel, "C1");
    assert_eq!(posted.ts, "12.0");
}

#[tokio::test]
async fn regression_post_message_surfaces_slack_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/chat.postMessage");
        then.status(200)
            .json_body(json!({ "ok": false, "error": "channel_not_found" }));
    });

    let client = slack_client(&server.base_url());
    let error = client
        .post_message("C1", "hello", None)
        .await
        .expect_err("error");
    assert!(error.to_string().contains("channel_not_found"));
}

#[tokio::test]
async fn integration_handle_fetch_command_posts_summary_text() {
    let server = MockServer::start();
    let issue = server.mock(|when, then| {
        when.method(GET).path("/rest/api/3/issue/PROJ-123");
        then.status(200).json_body(json!({
            "key": "PROJ-123",
            "fields": {
                "summary": "Fix bug",
                "status": {"name": "Open"},
                "reporter": {"displayName": "Alice"},
                "issuetype": {"name": "Bug"},
            }
        }));
    });
    let reply = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .body_includes("Fix bug")
            .body_includes("Open")
            .body_includes("Alice")
            .body_includes("unassigned");
        then.status(200)
            .json_body(json!({ "ok": true, "channel": "C1", "ts": "12.1" }));
    });

    let slack = slack_client(&server.base_url());
    let jira = JiraClient::new(&jira_config(&server.base_url())).expect("jira client");
    let command = TicketCommand::Fetch {
        reference: IssueRef::parse("PROJ-123").expect("reference"),
    };
    handle_ticket_command(&slack, &jira, &command_context("C1"), command)
        .await
        .expect("handled");

    issue.assert();
    reply.assert();
}

#[tokio::test]
async fn integration_handle_create_command_posts_ack_then_confirmation() {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method(POST).path("/rest/api/3/issue");
        then.status(201).json_body(json!({ "key": "PROJ-124" }));
    });
    let ack = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .body_includes("Creating ticket titled");
        then.status(200)
            .json_body(json!({ "ok": true, "channel": "C1", "ts": "12.2" }));
    });
    let confirmation = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .body_includes("PROJ-124")
            .body_includes("Fix login bug");
        then.status(200)
            .json_body(json!({ "ok": true, "channel": "C1", "ts": "12.3" }));
    });

    let slack = slack_client(&server.base_url());
    let jira = JiraClient::new(&jira_config(&server.base_url())).expect("jira client");
    let command = TicketCommand::Create {
        title: "Fix login bug".to_string(),
    };
    handle_ticket_command(&slack, &jira, &command_context("C1"), command)
        .await
        .expect("handled");

    create.assert();
    ack.assert();
    confirmation.assert();
}
