// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The push hub: a single set of subscribers, each a WebSocket connection's
//! outbound half. Broadcasting encodes a message once and writes it to every
//! open subscriber; a subscriber whose channel is closed is dropped on the
//! next broadcast rather than stalling the others.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};

use crate::event::Event;
use crate::session::Session;

/// Envelope carried over the WebSocket. `data` is the modern field; `payload`
/// duplicates it for one release's worth of older clients.
#[derive(Debug, Clone, Serialize)]
struct Envelope<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    data: &'a serde_json::Value,
    payload: &'a serde_json::Value,
}

pub struct PushHub {
    subscribers: RwLock<HashMap<u64, mpsc::UnboundedSender<String>>>,
    next_id: AtomicU64,
}

impl Default for PushHub {
    fn default() -> Self {
        Self { subscribers: RwLock::new(HashMap::new()), next_id: AtomicU64::new(1) }
    }
}

impl PushHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self) -> (u64, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.write().await.insert(id, tx);
        (id, rx)
    }

    pub async fn unsubscribe(&self, id: u64) {
        self.subscribers.write().await.remove(&id);
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    fn encode(kind: &str, data: &serde_json::Value) -> String {
        let envelope = Envelope { kind, data, payload: data };
        serde_json::to_string(&envelope).unwrap_or_else(|_| "{}".to_owned())
    }

    /// Encode once, fan out to every open subscriber, and drop any whose
    /// channel has closed.
    pub async fn broadcast(&self, kind: &str, data: impl Serialize) {
        let value = serde_json::to_value(data).unwrap_or(serde_json::Value::Null);
        let message = Self::encode(kind, &value);
        let mut dead = Vec::new();
        {
            let subscribers = self.subscribers.read().await;
            for (id, tx) in subscribers.iter() {
                if tx.send(message.clone()).is_err() {
                    dead.push(*id);
                }
            }
        }
        if !dead.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in dead {
                subscribers.remove(&id);
            }
        }
    }

    pub async fn broadcast_session_created(&self, session: &Session) {
        self.broadcast("session_created", session).await;
    }

    pub async fn broadcast_session_updated(&self, session: &Session) {
        self.broadcast("session_updated", session).await;
    }

    pub async fn broadcast_session_removed(&self, id: &str) {
        self.broadcast("session_removed", serde_json::json!({ "id": id })).await;
    }

    pub async fn broadcast_event_and_session(&self, event: &Event, session: &Session) {
        self.broadcast("event", event).await;
        self.broadcast("session_updated", session).await;
    }

    pub async fn broadcast_permission_prompt(
        &self,
        session_id: &str,
        pending: &crate::event::PendingPermission,
    ) {
        self.broadcast(
            "permission_prompt",
            serde_json::json!({ "sessionId": session_id, "permission": pending }),
        )
        .await;
    }

    pub async fn broadcast_permission_resolved(&self, session_id: &str) {
        self.broadcast("permission_resolved", serde_json::json!({ "sessionId": session_id })).await;
    }

    pub async fn broadcast_tokens(&self, session_id: &str, tokens: &crate::event::SessionTokenData) {
        self.broadcast("tokens", serde_json::json!({ "sessionId": session_id, "tokens": tokens }))
            .await;
    }
}

#[cfg(test)]
#[path = "push_tests.rs"]
mod tests;
