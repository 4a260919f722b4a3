//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered notifications.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::Subscriptions;
use crate::api::dto::EventInformationResponse;
use crate::domain::{Notification, Serial};
use crate::error::DonutError;
use crate::service::DonutService;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards notifications of subscribed events from the
///   [`broadcast::Receiver`] to the client.
pub async fn run_connection(
    socket: WebSocket,
    mut notification_rx: broadcast::Receiver<Notification>,
    donut_service: Arc<DonutService>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = Subscriptions::new();
    tracing::debug!("ws connection opened");

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_text_message(&text, &mut subs, &donut_service).await;
                        if let Some(json) = encode(&reply)
                            && ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "ws read failed");
                        break;
                    }
                    _ => {}
                }
            }
            // Notification from the bus
            notification = notification_rx.recv() => {
                match notification {
                    Ok(notification) => {
                        if subs.admits(&notification) {
                            let msg = WsMessage::new(
                                uuid::Uuid::new_v4().to_string(),
                                WsMessageType::Event,
                                serde_json::to_value(&notification).unwrap_or_default(),
                            );
                            if let Some(json) = encode(&msg)
                                && ws_tx.send(Message::text(json)).await.is_err() {
                                    break;
                                }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind notification bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

fn encode(msg: &WsMessage) -> Option<String> {
    serde_json::to_string(msg).ok()
}

/// Handles a text message from the client and builds the reply.
async fn handle_text_message(
    text: &str,
    subs: &mut Subscriptions,
    service: &DonutService,
) -> WsMessage {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return WsMessage::error(String::new(), 400, "malformed JSON");
    };

    let command = match serde_json::from_value::<WsCommand>(msg.payload) {
        Ok(command) => command,
        Err(e) => {
            return WsMessage::error(msg.id, 400, &format!("invalid command: {e}"));
        }
    };

    match execute(command, subs, service).await {
        Ok(payload) => WsMessage::new(msg.id, WsMessageType::Response, payload),
        Err(e) => WsMessage::error(msg.id, e.error_code(), &e.to_string()),
    }
}

async fn execute(
    command: WsCommand,
    subs: &mut Subscriptions,
    service: &DonutService,
) -> Result<serde_json::Value, DonutError> {
    match command {
        WsCommand::Subscribe { event_serials } => {
            let (serials, wildcard) = parse_serials(&event_serials)?;
            subs.follow(&serials, wildcard);
            Ok(serde_json::json!({
                "subscribed": serials.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "count": subs.followed(),
                "wildcard": subs.follows_everything(),
            }))
        }
        WsCommand::Unsubscribe { event_serials } => {
            let (serials, wildcard) = parse_serials(&event_serials)?;
            subs.unfollow(&serials, wildcard);
            Ok(serde_json::json!({
                "unsubscribed": serials.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "remaining_count": subs.followed(),
                "wildcard": subs.follows_everything(),
            }))
        }
        WsCommand::Register {
            event_serial,
            references,
        } => {
            let serial = parse_serial(&event_serial)?;
            let registered = service.register(serial, &references).await?;
            Ok(serde_json::json!({
                "event_serial": serial,
                "registered": registered,
            }))
        }
        WsCommand::Unregister {
            event_serial,
            references,
        } => {
            let serial = parse_serial(&event_serial)?;
            let removed = service.unregister(serial, &references).await?;
            Ok(serde_json::json!({
                "event_serial": serial,
                "removed": removed,
            }))
        }
        WsCommand::GetPeople { event_serial } => {
            let serial = parse_serial(&event_serial)?;
            let info = service.get_information(serial).await?;
            serde_json::to_value(EventInformationResponse::from(info))
                .map_err(|e| DonutError::Internal(e.to_string()))
        }
    }
}

fn parse_serial(raw: &str) -> Result<Serial, DonutError> {
    raw.trim()
        .parse()
        .map_err(|_| DonutError::Validation(format!("invalid event serial: {raw}")))
}

/// Splits a subscription list into serials and the `"*"` wildcard flag.
fn parse_serials(raw: &[String]) -> Result<(Vec<Serial>, bool), DonutError> {
    let mut serials = Vec::new();
    let mut wildcard = false;
    for value in raw {
        if value == "*" {
            wildcard = true;
        } else {
            serials.push(parse_serial(value)?);
        }
    }
    Ok((serials, wildcard))
}
