//! WebSocket integration tests.
//!
//! Connects with `tokio-tungstenite`, issues commands, and checks that
//! notifications of committed mutations reach subscribers.

mod common;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

use common::{TestServer, seeded_event};

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

fn command(id: &str, payload: Value) -> Message {
    let envelope = json!({
        "id": id,
        "type": "command",
        "timestamp": chrono::Utc::now(),
        "payload": payload,
    });
    Message::text(envelope.to_string())
}

/// Reads frames until a text frame arrives, with a deadline.
async fn next_json(socket: &mut Socket) -> Result<Value, anyhow::Error> {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await?
            .ok_or_else(|| anyhow::anyhow!("socket closed"))??;
        if let Message::Text(text) = frame {
            return Ok(serde_json::from_str(text.as_str())?);
        }
    }
}

#[tokio::test]
async fn subscriber_receives_registration_and_round() -> Result<(), anyhow::Error> {
    let server = TestServer::spawn().await?;
    let client = reqwest::Client::new();
    let serial = seeded_event(&server, &client, &[]).await?;

    let (mut socket, _) = tokio_tungstenite::connect_async(server.ws_url()).await?;
    socket
        .send(command(
            "sub-1",
            json!({ "command": "subscribe", "event_serials": [serial] }),
        ))
        .await?;
    let reply = next_json(&mut socket).await?;
    assert_eq!(reply["id"], "sub-1");
    assert_eq!(reply["type"], "response");
    assert_eq!(reply["payload"]["count"], 1);

    let response = client
        .post(format!("{}/api/v1/events/{serial}/participants", server.url()))
        .json(&json!({ "references": ["amy", "bo"] }))
        .send()
        .await?;
    assert_eq!(response.status(), 201);

    let event = next_json(&mut socket).await?;
    assert_eq!(event["type"], "event");
    assert_eq!(event["payload"]["notification_type"], "participants_registered");
    assert_eq!(event["payload"]["inserted"], 2);

    client
        .post(format!("{}/api/v1/events/{serial}/start", server.url()))
        .send()
        .await?;
    let event = next_json(&mut socket).await?;
    assert_eq!(event["payload"]["notification_type"], "round_paired");
    assert_eq!(event["payload"]["groups"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn commands_report_service_errors() -> Result<(), anyhow::Error> {
    let server = TestServer::spawn().await?;
    let (mut socket, _) = tokio_tungstenite::connect_async(server.ws_url()).await?;

    socket.send(Message::text("{not json")).await?;
    let reply = next_json(&mut socket).await?;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["payload"]["code"], 400);

    let missing = uuid::Uuid::now_v7().to_string();
    socket
        .send(command(
            "people-1",
            json!({ "command": "get_people", "event_serial": missing }),
        ))
        .await?;
    let reply = next_json(&mut socket).await?;
    assert_eq!(reply["id"], "people-1");
    assert_eq!(reply["payload"]["code"], 2001);
    Ok(())
}

#[tokio::test]
async fn register_over_socket_is_visible_over_http() -> Result<(), anyhow::Error> {
    let server = TestServer::spawn().await?;
    let client = reqwest::Client::new();
    let serial = seeded_event(&server, &client, &[]).await?;

    let (mut socket, _) = tokio_tungstenite::connect_async(server.ws_url()).await?;
    socket
        .send(command(
            "reg-1",
            json!({
                "command": "register",
                "event_serial": serial,
                "references": ["kai", "lu", "kai"],
            }),
        ))
        .await?;
    let reply = next_json(&mut socket).await?;
    assert_eq!(reply["type"], "response");
    assert_eq!(reply["payload"]["registered"], 2);

    let listed: Value = client
        .get(format!("{}/api/v1/events/{serial}/participants", server.url()))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(listed["pagination"]["total"], 2);
    Ok(())
}
