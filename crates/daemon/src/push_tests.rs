// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn subscriber_receives_broadcast_envelope_with_both_fields() {
    let hub = PushHub::new();
    let (_id, mut rx) = hub.subscribe().await;

    hub.broadcast("hello", serde_json::json!({ "clientId": "c1" })).await;

    let raw = rx.recv().await.expect("message");
    let parsed: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(parsed["type"], "hello");
    assert_eq!(parsed["data"]["clientId"], "c1");
    assert_eq!(parsed["payload"]["clientId"], "c1");
}

#[tokio::test]
async fn unsubscribe_stops_delivery() {
    let hub = PushHub::new();
    let (id, mut rx) = hub.subscribe().await;
    hub.unsubscribe(id).await;

    hub.broadcast("hello", serde_json::json!({})).await;

    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn dropped_receiver_is_pruned_on_next_broadcast() {
    let hub = PushHub::new();
    let (_id, rx) = hub.subscribe().await;
    drop(rx);

    hub.broadcast("hello", serde_json::json!({})).await;
    assert_eq!(hub.subscriber_count().await, 0);
}

#[tokio::test]
async fn two_subscribers_both_receive_one_broadcast() {
    let hub = PushHub::new();
    let (_id1, mut rx1) = hub.subscribe().await;
    let (_id2, mut rx2) = hub.subscribe().await;

    hub.broadcast("ping", serde_json::json!({ "n": 1 })).await;

    assert!(rx1.recv().await.is_some());
    assert!(rx2.recv().await.is_some());
}
