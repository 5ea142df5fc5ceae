// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers. Every handler either answers directly from the registry
//! or delegates its side effects to the command layer; none of them touch
//! a `TerminalExecutor` or the registry's locks directly.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::command::{self, CreateSessionRequest};
use crate::core::Core;
use crate::error::ApiError;
use crate::scheduler;
use crate::session::adapter::ImageAttachment;
use crate::session::{Session, SessionKind};
use crate::transport::fsops;

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const ALLOWED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

/// A session id is an opaque `"s" + hex counter"` token, not a UUID — this
/// registry mints its own ids rather than generating one per session (see
/// the session-id Open Question resolution).
fn validate_session_id(id: &str) -> Result<(), ApiError> {
    let valid = id.len() > 1
        && id.starts_with('s')
        && id[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(ApiError::validation(format!("invalid session id: {id}")))
    }
}

// -- /health, /config ---------------------------------------------------------

#[derive(Debug, Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
    clients: usize,
    events: u64,
    #[serde(rename = "voiceEnabled")]
    voice_enabled: bool,
}

pub async fn health(State(core): State<Arc<Core>>) -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
        clients: core.push.subscriber_count().await,
        events: core.event_log.count(),
        voice_enabled: std::env::var("DEEPGRAM_API_KEY").is_ok(),
    })
}

#[derive(Debug, Serialize)]
struct ConfigResponse {
    ok: bool,
    username: String,
    hostname: String,
    #[serde(rename = "tmuxSession")]
    tmux_session: String,
}

pub async fn config(State(core): State<Arc<Core>>) -> impl IntoResponse {
    Json(ConfigResponse {
        ok: true,
        username: std::env::var("USER").unwrap_or_else(|_| "unknown".to_owned()),
        hostname: std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_owned()),
        tmux_session: core.registry.tmux_session_prefix().to_owned(),
    })
}

// -- /event, /event/<agent> ---------------------------------------------------

#[derive(Debug, Serialize)]
struct OkBody {
    ok: bool,
}

pub async fn post_event(State(core): State<Arc<Core>>, body: String) -> Result<Json<OkBody>, ApiError> {
    match crate::ingest::ingest_line(&core.registry, &core.event_log, &body, core.config.trace, None).await {
        Some(_) => Ok(Json(OkBody { ok: true })),
        None => Err(ApiError::validation("could not parse event payload")),
    }
}

pub async fn post_event_for_agent(
    State(core): State<Arc<Core>>,
    Path(agent): Path<String>,
    body: String,
) -> Result<Json<OkBody>, ApiError> {
    let event = crate::ingest::ingest_line(&core.registry, &core.event_log, &body, core.config.trace, Some(&agent))
        .await
        .ok_or_else(|| ApiError::validation("could not parse event payload"))?;
    let _ = event;
    let announcements = core.transcripts.trigger_check_for_thread(&core.event_log).await;
    core.announce_session_new(announcements).await;
    Ok(Json(OkBody { ok: true }))
}

// -- /sessions ------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SessionsResponse {
    ok: bool,
    sessions: Vec<Session>,
}

pub async fn list_sessions(State(core): State<Arc<Core>>) -> impl IntoResponse {
    Json(SessionsResponse { ok: true, sessions: core.registry.list().await })
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    ok: bool,
    session: Session,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LaunchFlagsBody {
    #[serde(default)]
    #[serde(rename = "continue")]
    continue_session: bool,
    #[serde(default)]
    skip_permissions: bool,
    #[serde(default)]
    open_terminal: bool,
    #[serde(default)]
    extras: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionBody {
    name: Option<String>,
    cwd: String,
    #[serde(default)]
    agent: Option<String>,
    #[serde(default)]
    flags: LaunchFlagsBody,
    #[serde(default)]
    zone_position: Option<serde_json::Value>,
}

const DEFAULT_AGENT: &str = "agent-a";

pub async fn create_session(
    State(core): State<Arc<Core>>,
    Json(body): Json<CreateSessionBody>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let req = CreateSessionRequest {
        name: body.name,
        cwd: body.cwd,
        agent: body.agent.unwrap_or_else(|| DEFAULT_AGENT.to_owned()),
        continue_session: body.flags.continue_session,
        skip_permissions: body.flags.skip_permissions,
        open_terminal: body.flags.open_terminal,
        extras: body.flags.extras,
        zone_position: body.zone_position,
    };
    let session = command::create_session(&core.registry, &core.executor, req).await?;
    Ok((StatusCode::CREATED, Json(SessionResponse { ok: true, session })))
}

pub async fn get_session(
    State(core): State<Arc<Core>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    validate_session_id(&id)?;
    let session = core.registry.get(&id).await.ok_or_else(|| ApiError::not_found("session not found"))?;
    Ok(Json(SessionResponse { ok: true, session }))
}

fn deserialize_double_option<'de, D>(
    deserializer: D,
) -> Result<Option<Option<serde_json::Value>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_double_option")]
    zone_position: Option<Option<serde_json::Value>>,
    #[serde(default)]
    auto_accept: Option<bool>,
}

pub async fn update_session(
    State(core): State<Arc<Core>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateSessionBody>,
) -> Result<Json<SessionResponse>, ApiError> {
    validate_session_id(&id)?;
    let session = core
        .registry
        .update_fields(&id, body.name, body.zone_position, body.auto_accept)
        .await
        .ok_or_else(|| ApiError::not_found("session not found"))?;
    Ok(Json(SessionResponse { ok: true, session }))
}

pub async fn delete_session(
    State(core): State<Arc<Core>>,
    Path(id): Path<String>,
) -> Result<Json<OkBody>, ApiError> {
    validate_session_id(&id)?;
    command::delete_session(&core.registry, &core.executor, &id).await?;
    Ok(Json(OkBody { ok: true }))
}

#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    #[serde(rename = "maxAge")]
    max_age: Option<u64>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    phantom: bool,
}

#[derive(Debug, Serialize)]
struct CleanupResponse {
    ok: bool,
    removed: usize,
}

pub async fn cleanup_sessions(
    State(core): State<Arc<Core>>,
    Query(query): Query<CleanupQuery>,
) -> Result<Json<CleanupResponse>, ApiError> {
    let kind = match query.kind.as_deref() {
        Some("internal") => Some(SessionKind::Internal),
        Some("external") => Some(SessionKind::External),
        Some(other) => return Err(ApiError::validation(format!("unknown session kind: {other}"))),
        None => None,
    };
    let removed =
        scheduler::run_cleanup(&core.registry, &core.executor, query.max_age, kind, query.phantom).await;
    Ok(Json(CleanupResponse { ok: true, removed }))
}

// -- /sessions/{id}/prompt|cancel|restart|terminal|focus ----------------------

#[derive(Debug, Deserialize)]
pub struct ImageAttachmentBody {
    #[serde(rename = "data")]
    data_base64: String,
    #[serde(rename = "mediaType")]
    media_type: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PromptBody {
    prompt: String,
    #[serde(default)]
    images: Vec<ImageAttachmentBody>,
}

fn validate_images(images: Vec<ImageAttachmentBody>) -> Result<Vec<ImageAttachment>, ApiError> {
    images
        .into_iter()
        .map(|img| {
            if !ALLOWED_IMAGE_TYPES.contains(&img.media_type.as_str()) {
                return Err(ApiError::validation(format!("unsupported image type: {}", img.media_type)));
            }
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(&img.data_base64)
                .map_err(|e| ApiError::validation(format!("invalid base64 image data: {e}")))?;
            if decoded.len() > MAX_IMAGE_BYTES {
                return Err(ApiError::validation("image exceeds the 5 MB limit"));
            }
            Ok(ImageAttachment { data_base64: img.data_base64, media_type: img.media_type, name: img.name })
        })
        .collect()
}

pub async fn send_prompt(
    State(core): State<Arc<Core>>,
    Path(id): Path<String>,
    Json(body): Json<PromptBody>,
) -> Result<Json<OkBody>, ApiError> {
    validate_session_id(&id)?;
    let attachments = validate_images(body.images)?;
    command::send_prompt(&core.registry, &core.executor, &id, &body.prompt, &attachments).await?;
    Ok(Json(OkBody { ok: true }))
}

pub async fn cancel_session(
    State(core): State<Arc<Core>>,
    Path(id): Path<String>,
) -> Result<Json<OkBody>, ApiError> {
    validate_session_id(&id)?;
    command::cancel(&core.registry, &core.executor, &id).await?;
    Ok(Json(OkBody { ok: true }))
}

pub async fn restart_session(
    State(core): State<Arc<Core>>,
    Path(id): Path<String>,
) -> Result<Json<OkBody>, ApiError> {
    validate_session_id(&id)?;
    command::restart(&core.registry, &core.executor, &id).await?;
    Ok(Json(OkBody { ok: true }))
}

/// Opening an attached terminal window is a platform-gated, best-effort UI
/// action with no counterpart on this build's host — there is no windowing
/// layer to ask. Acknowledges the request without doing anything.
pub async fn open_terminal(
    State(core): State<Arc<Core>>,
    Path(id): Path<String>,
) -> Result<Json<OkBody>, ApiError> {
    validate_session_id(&id)?;
    core.registry.get(&id).await.ok_or_else(|| ApiError::not_found("session not found"))?;
    Ok(Json(OkBody { ok: false }))
}

pub async fn focus_session(
    State(core): State<Arc<Core>>,
    Path(id): Path<String>,
) -> Result<Json<OkBody>, ApiError> {
    validate_session_id(&id)?;
    core.registry.get(&id).await.ok_or_else(|| ApiError::not_found("session not found"))?;
    Ok(Json(OkBody { ok: false }))
}

// Permission responses arrive only over the push channel per the external
// interface surface (see ws.rs's `ClientMessage::PermissionResponse`), not
// as an HTTP route.

// -- /sessions/{id}/files, /file, /files/tree ---------------------------------

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    path: String,
}

#[derive(Debug, Deserialize)]
pub struct TreeQuery {
    #[serde(default)]
    path: String,
    #[serde(default = "default_tree_depth")]
    depth: u32,
}

fn default_tree_depth() -> u32 {
    3
}

async fn session_cwd(core: &Core, id: &str) -> Result<String, ApiError> {
    validate_session_id(id)?;
    let session = core.registry.get(id).await.ok_or_else(|| ApiError::not_found("session not found"))?;
    Ok(session.cwd)
}

pub async fn list_files(
    State(core): State<Arc<Core>>,
    Path(id): Path<String>,
    Query(query): Query<PathQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cwd = session_cwd(&core, &id).await?;
    let entries = fsops::list_dir(&cwd, &query.path)?;
    Ok(Json(serde_json::json!({ "ok": true, "entries": entries })))
}

pub async fn read_file(
    State(core): State<Arc<Core>>,
    Path(id): Path<String>,
    Query(query): Query<PathQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cwd = session_cwd(&core, &id).await?;
    let content = fsops::read_file(&cwd, &query.path)?;
    Ok(Json(serde_json::json!({ "ok": true, "content": content })))
}

pub async fn files_tree(
    State(core): State<Arc<Core>>,
    Path(id): Path<String>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cwd = session_cwd(&core, &id).await?;
    let tree = fsops::tree(&cwd, &query.path, query.depth)?;
    Ok(Json(serde_json::json!({ "ok": true, "tree": tree })))
}

// -- External-collaborator-backed stubs ---------------------------------------
//
// `/projects*`, `/tiles*`, and `/feedback*` are served in full by the UI's
// external collaborators (a directory-autocomplete helper, the text-tile
// store, and the feedback/ticket store, respectively). This build answers
// them with minimal, honest placeholders rather than pretending to own
// data it doesn't track.

pub async fn projects_default() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true, "project": serde_json::Value::Null }))
}

pub async fn projects_autocomplete() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true, "matches": Vec::<String>::new() }))
}

pub async fn projects_list() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true, "projects": Vec::<String>::new() }))
}

pub async fn tiles_list() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true, "tiles": Vec::<serde_json::Value>::new() }))
}

pub async fn tiles_not_implemented() -> Result<Json<OkBody>, ApiError> {
    Err(ApiError::internal("tile storage is owned by an external collaborator in this deployment"))
}

pub async fn feedback_list() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true, "feedback": Vec::<serde_json::Value>::new() }))
}

pub async fn feedback_not_implemented() -> Result<Json<OkBody>, ApiError> {
    Err(ApiError::internal("feedback storage is owned by an external collaborator in this deployment"))
}

pub async fn static_fallback() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({ "ok": false, "error": "not found" })))
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
