// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The push channel. A connection gets one ordered snapshot on upgrade —
//! `init`, `connected`, `sessions`, `text_tiles`, `history` — then two
//! directions run concurrently: hub broadcasts forwarded out, and client
//! messages (subscribe/ping/get_history/voice_*/permission_response)
//! consumed in.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::core::Core;

/// Initial-snapshot history is filtered to the active session set and capped
/// small; `get_history` lets a client ask for a larger, explicit window.
const INITIAL_HISTORY_LIMIT: usize = 50;
const DEFAULT_HISTORY_LIMIT: usize = 100;
const MAX_HISTORY_LIMIT: usize = 2000;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(super) enum ClientMessage {
    Subscribe,
    Ping,
    GetHistory {
        #[serde(default = "default_history_limit")]
        limit: usize,
    },
    VoiceStart,
    VoiceStop,
    VoiceAudio,
    PermissionResponse {
        #[serde(rename = "sessionId")]
        session_id: String,
        response: u32,
    },
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

pub async fn ws_handler(State(core): State<Arc<Core>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, core))
}

fn envelope(kind: &str, data: serde_json::Value) -> Message {
    let body = serde_json::json!({ "type": kind, "data": data, "payload": data });
    Message::Text(body.to_string().into())
}

async fn handle_ws(socket: WebSocket, core: Arc<Core>) {
    let (client_id, mut rx) = core.push.subscribe().await;
    let (mut tx, mut socket_rx) = socket.split();

    let sessions = core.registry.list().await;
    let active_ids: std::collections::HashSet<String> = sessions.iter().map(|s| s.id.clone()).collect();
    let history = core.event_log.recent(INITIAL_HISTORY_LIMIT, Some(&active_ids)).await;
    let snapshot = [
        envelope("init", serde_json::json!({ "clientId": client_id })),
        envelope("connected", serde_json::json!({ "ok": true })),
        envelope("sessions", serde_json::json!({ "sessions": sessions })),
        envelope("text_tiles", serde_json::json!({ "tiles": [] })),
        envelope("history", serde_json::json!({ "events": history })),
    ];
    for message in snapshot {
        if tx.send(message).await.is_err() {
            core.push.unsubscribe(client_id).await;
            return;
        }
    }

    loop {
        tokio::select! {
            broadcast = rx.recv() => {
                match broadcast {
                    Some(text) => {
                        if tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = socket_rx.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&core, &mut tx, &text).await;
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        tracing::debug!(len = bytes.len(), "ignoring binary ws frame (voice audio path not wired to a transcription backend)");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    core.push.unsubscribe(client_id).await;
}

async fn handle_client_message(core: &Arc<Core>, tx: &mut futures_util::stream::SplitSink<WebSocket, Message>, text: &str) {
    let Ok(message) = serde_json::from_str::<ClientMessage>(text) else {
        tracing::debug!(%text, "unrecognized ws client message, ignoring");
        return;
    };
    match message {
        ClientMessage::Subscribe => {}
        ClientMessage::Ping => {
            let _ = tx.send(envelope("pong", serde_json::json!({}))).await;
        }
        ClientMessage::GetHistory { limit } => {
            let limit = limit.min(MAX_HISTORY_LIMIT);
            let events = core.event_log.recent(limit, None).await;
            let _ = tx.send(envelope("history", serde_json::json!({ "events": events }))).await;
        }
        ClientMessage::VoiceStart | ClientMessage::VoiceStop | ClientMessage::VoiceAudio => {
            // Voice transcription is a collaborator-backed pipeline in this
            // deployment; acknowledge without a backend to hand audio to.
            let _ = tx
                .send(envelope(
                    "voice_error",
                    serde_json::json!({ "message": "voice transcription is not available on this build" }),
                ))
                .await;
        }
        ClientMessage::PermissionResponse { session_id, response } => {
            if let Err(err) =
                crate::command::permission_response(&core.registry, &core.executor, &session_id, response).await
            {
                let _ = tx
                    .send(envelope(
                        "permission_resolved",
                        serde_json::json!({ "sessionId": session_id, "ok": false, "error": err.message }),
                    ))
                    .await;
            }
        }
    }
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
