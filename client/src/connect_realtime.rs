use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use shared::constants::{CHANNEL_NOTES, CHANNEL_PHOENIX, COLUMN_USER_ID, EVENT_CHANGES, EVENT_CLOSE, EVENT_ERROR, EVENT_HEARTBEAT, EVENT_JOIN, EVENT_LEAVE, EVENT_REPLY, EVENT_SYSTEM, TABLE_NOTES, TABLE_SCHEMA};
use shared::types::{ChangesFilter, ChangesPayload, PhoenixMessage, ReplyPayload, Session, SystemPayload};
use shared::utils::filter_eq;

use crate::connect_http::SupabaseHttp;
use crate::error::RemoteError;
use crate::gateway::{ChangeFeed, ChangeStream};
use crate::types::{ChangeEvent, ChangeKind};

const JOIN_REF: u64 = 1;

pub struct SupabaseRealtime {
    http: SupabaseHttp,
    heartbeat: Duration,
}

impl SupabaseRealtime {
    pub fn new(http: &SupabaseHttp, heartbeat: Duration) -> Self {
        Self {
            http: http.clone(),
            heartbeat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Change(ChangeEvent),
    Joined,
    Rejected(String),
    Closed(String),
    Other,
}

pub fn join_frame(session: &Session, reference: u64) -> PhoenixMessage {
    let changes = ChangesFilter {
        event: "*".to_string(),
        schema: TABLE_SCHEMA.to_string(),
        table: TABLE_NOTES.to_string(),
        filter: filter_eq(COLUMN_USER_ID, session.owner_id()),
    };
    PhoenixMessage {
        topic: CHANNEL_NOTES.to_string(),
        event: EVENT_JOIN.to_string(),
        payload: json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [changes],
            },
            "access_token": session.access_token,
        }),
        reference: Some(reference.to_string()),
        join_ref: Some(reference.to_string()),
    }
}

pub fn heartbeat_frame(reference: u64) -> PhoenixMessage {
    PhoenixMessage {
        topic: CHANNEL_PHOENIX.to_string(),
        event: EVENT_HEARTBEAT.to_string(),
        payload: json!({}),
        reference: Some(reference.to_string()),
        join_ref: None,
    }
}

pub fn leave_frame(reference: u64) -> PhoenixMessage {
    PhoenixMessage {
        topic: CHANNEL_NOTES.to_string(),
        event: EVENT_LEAVE.to_string(),
        payload: json!({}),
        reference: Some(reference.to_string()),
        join_ref: Some(JOIN_REF.to_string()),
    }
}

pub fn decode_frame(text: &str) -> Result<Inbound, serde_json::Error> {
    let msg = serde_json::from_str::<PhoenixMessage>(text)?;
    if msg.topic != CHANNEL_NOTES {
        // heartbeat replies and system frames
        return Ok(Inbound::Other);
    }
    let event = msg.event.as_str();
    if event == EVENT_CHANGES {
        let payload = serde_json::from_value::<ChangesPayload>(msg.payload)?;
        Ok(Inbound::Change(ChangeEvent {
            kind: ChangeKind::from(payload.data.type_.as_str()),
            table: payload.data.table,
        }))
    } else if event == EVENT_REPLY && msg.reference.as_deref() == Some(JOIN_REF.to_string().as_str()) {
        let reply = serde_json::from_value::<ReplyPayload>(msg.payload)?;
        if reply.status == "ok" {
            Ok(Inbound::Joined)
        } else {
            Ok(Inbound::Rejected(reply.response.to_string()))
        }
    } else if event == EVENT_SYSTEM {
        // the join can succeed while the changes subscription behind it fails
        let system = serde_json::from_value::<SystemPayload>(msg.payload)?;
        if system.status == "error" {
            Ok(Inbound::Rejected(format!("{}: {}", system.extension, system.message)))
        } else {
            Ok(Inbound::Other)
        }
    } else if event == EVENT_ERROR || event == EVENT_CLOSE {
        Ok(Inbound::Closed(event.to_string()))
    } else {
        Ok(Inbound::Other)
    }
}

async fn send_frame<S>(sink: &mut S, frame: &PhoenixMessage) -> Result<(), RemoteError>
    where
        S: Sink<Message, Error=tokio_tungstenite::tungstenite::Error> + Unpin
{
    let text = serde_json::to_string(frame)?;
    sink.send(Message::Text(text)).await?;
    Ok(())
}

#[async_trait]
impl ChangeFeed for SupabaseRealtime {
    async fn subscribe(&self, session: &Session) -> Result<ChangeStream, RemoteError> {
        let url = self.http.realtime_url()?;
        let (mut socket, _) = connect_async(url.as_str()).await?;
        send_frame(&mut socket, &join_frame(session, JOIN_REF)).await?;
        tracing::info!("[realtime] joining {CHANNEL_NOTES} for {}", session.owner_id());

        let (events, receiver) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = oneshot::channel();
        let heartbeat = self.heartbeat;

        let connection = tokio::spawn(async move {
            let (mut write, mut read) = socket.split();
            let mut reference = JOIN_REF;
            let mut shutdown_rx = shutdown_rx;
            let mut timer = tokio::time::interval(heartbeat);
            timer.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => {
                        reference += 1;
                        if let Err(err) = send_frame(&mut write, &leave_frame(reference)).await {
                            tracing::debug!("[realtime] leave: {err}");
                        }
                        break;
                    }
                    _ = events.closed() => break,
                    _ = timer.tick() => {
                        reference += 1;
                        if let Err(err) = send_frame(&mut write, &heartbeat_frame(reference)).await {
                            tracing::error!("[realtime] heartbeat: {err}");
                            break;
                        }
                    }
                    frame = read.next() => match frame {
                        Some(Ok(Message::Text(text))) => match decode_frame(&text) {
                            Ok(Inbound::Change(event)) => {
                                tracing::debug!("[realtime] {:?} on {}", event.kind, event.table);
                                if events.send(event).is_err() {
                                    break;
                                }
                            }
                            Ok(Inbound::Joined) => tracing::info!("[realtime] joined"),
                            Ok(Inbound::Rejected(reason)) => {
                                tracing::error!("[realtime] join rejected: {reason}");
                                break;
                            }
                            Ok(Inbound::Closed(reason)) => {
                                tracing::warn!("[realtime] channel closed: {reason}");
                                break;
                            }
                            Ok(Inbound::Other) => {}
                            Err(err) => tracing::warn!("[realtime] unreadable frame: {err}"),
                        },
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!("[realtime] socket closed");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            tracing::error!("[realtime] socket: {err}");
                            break;
                        }
                    }
                }
            }

            if let Err(err) = write.close().await {
                tracing::debug!("[realtime] close: {err}");
            }
        });

        Ok(ChangeStream::new(receiver).with_connection(shutdown, connection))
    }
}
