// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `supervisord` binary and
//! exercise its HTTP and WebSocket surface.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use supervisord_specs::SupervisordProcess;

const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn http_health_reports_ok() -> anyhow::Result<()> {
    let daemon = SupervisordProcess::start()?;
    daemon.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value =
        reqwest::get(format!("{}/health", daemon.base_url())).await?.json().await?;

    assert_eq!(resp["ok"], true);
    assert!(resp["events"].is_number());
    Ok(())
}

#[tokio::test]
async fn http_sessions_starts_empty() -> anyhow::Result<()> {
    let daemon = SupervisordProcess::start()?;
    daemon.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value =
        reqwest::get(format!("{}/sessions", daemon.base_url())).await?.json().await?;

    assert_eq!(resp["ok"], true);
    assert_eq!(resp["sessions"].as_array().map(|a| a.len()), Some(0));
    Ok(())
}

#[tokio::test]
async fn http_event_auto_creates_an_external_session() -> anyhow::Result<()> {
    let daemon = SupervisordProcess::start()?;
    daemon.wait_healthy(TIMEOUT).await?;

    let client = reqwest::Client::new();
    let body = serde_json::json!({
        "hook_event_name": "UserPromptSubmit",
        "session_id": "smoke-session-1",
        "cwd": "/tmp/smoke-proj",
        "ts": 0,
    });
    let resp = client.post(format!("{}/event", daemon.base_url())).json(&body).send().await?;
    assert!(resp.status().is_success());

    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("external session was never auto-created");
        }
        let sessions: serde_json::Value =
            reqwest::get(format!("{}/sessions", daemon.base_url())).await?.json().await?;
        let found = sessions["sessions"]
            .as_array()
            .map(|list| list.iter().any(|s| s["agentSessionId"] == "smoke-session-1"))
            .unwrap_or(false);
        if found {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::test]
async fn http_unknown_session_is_404() -> anyhow::Result<()> {
    let daemon = SupervisordProcess::start()?;
    daemon.wait_healthy(TIMEOUT).await?;

    let resp =
        reqwest::get(format!("{}/sessions/sdeadbeef", daemon.base_url())).await?;
    assert_eq!(resp.status().as_u16(), 404);
    Ok(())
}

#[tokio::test]
async fn ws_sends_an_ordered_initial_snapshot() -> anyhow::Result<()> {
    let daemon = SupervisordProcess::start()?;
    daemon.wait_healthy(TIMEOUT).await?;

    let (mut ws, _) = tokio_tungstenite::connect_async(daemon.ws_url()).await?;

    let mut kinds = Vec::new();
    for _ in 0..5 {
        let msg = tokio::time::timeout(TIMEOUT, ws.next())
            .await?
            .ok_or_else(|| anyhow::anyhow!("ws stream ended early"))??;
        let Message::Text(text) = msg else { anyhow::bail!("expected a text frame") };
        let parsed: serde_json::Value = serde_json::from_str(&text)?;
        kinds.push(parsed["type"].as_str().unwrap_or_default().to_owned());
    }

    assert_eq!(kinds, vec!["init", "connected", "sessions", "text_tiles", "history"]);
    Ok(())
}

#[tokio::test]
async fn ws_get_history_round_trips() -> anyhow::Result<()> {
    let daemon = SupervisordProcess::start()?;
    daemon.wait_healthy(TIMEOUT).await?;

    let (mut ws, _) = tokio_tungstenite::connect_async(daemon.ws_url()).await?;
    // Drain the five-message initial snapshot before sending a request.
    for _ in 0..5 {
        tokio::time::timeout(TIMEOUT, ws.next()).await?;
    }

    ws.send(Message::Text(r#"{"type":"get_history","limit":5}"#.into())).await?;
    let msg = tokio::time::timeout(TIMEOUT, ws.next())
        .await?
        .ok_or_else(|| anyhow::anyhow!("ws stream ended"))??;
    let Message::Text(text) = msg else { anyhow::bail!("expected a text frame") };
    let parsed: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(parsed["type"], "history");
    Ok(())
}
