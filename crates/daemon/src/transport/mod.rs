// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket transport: a single axum `Router` covering the command
//! surface, the file-browsing endpoints, and the push channel.

pub mod fsops;
pub mod http;
pub mod ws;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::Core;

fn is_loopback_origin(value: &HeaderValue) -> bool {
    let Ok(text) = value.to_str() else { return false };
    let Some(host_part) = text.split("://").nth(1) else { return false };
    let host = host_part.split(':').next().unwrap_or(host_part);
    matches!(host, "localhost" | "127.0.0.1" | "[::1]")
}

/// Loopback origins are always allowed; one additional named origin from
/// configuration may be allowed alongside them (e.g. a LAN-facing UI).
fn cors_layer(allowed_origin: Option<String>) -> CorsLayer {
    CorsLayer::new()
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
        .allow_origin(AllowOrigin::predicate(move |origin, _parts| {
            if is_loopback_origin(origin) {
                return true;
            }
            match &allowed_origin {
                Some(named) => origin.to_str().map(|o| o == named).unwrap_or(false),
                None => false,
            }
        }))
}

pub fn build_router(core: Arc<Core>) -> Router {
    let allowed_origin = core.config.allowed_origin.clone();

    Router::new()
        .route("/health", get(http::health))
        .route("/config", get(http::config))
        .route("/event", post(http::post_event))
        .route("/event/{agent}", post(http::post_event_for_agent))
        .route("/sessions", get(http::list_sessions).post(http::create_session))
        .route("/sessions/cleanup", delete(http::cleanup_sessions))
        .route(
            "/sessions/{id}",
            get(http::get_session).patch(http::update_session).delete(http::delete_session),
        )
        .route("/sessions/{id}/prompt", post(http::send_prompt))
        .route("/sessions/{id}/cancel", post(http::cancel_session))
        .route("/sessions/{id}/restart", post(http::restart_session))
        .route("/sessions/{id}/terminal", post(http::open_terminal))
        .route("/sessions/{id}/focus", post(http::focus_session))
        .route("/sessions/{id}/files", get(http::list_files))
        .route("/sessions/{id}/file", get(http::read_file))
        .route("/sessions/{id}/files/tree", get(http::files_tree))
        .route("/projects", get(http::projects_list))
        .route("/projects/default", get(http::projects_default))
        .route("/projects/autocomplete", get(http::projects_autocomplete))
        .route("/tiles", get(http::tiles_list).post(http::tiles_not_implemented))
        .route(
            "/tiles/{id}",
            patch(http::tiles_not_implemented).delete(http::tiles_not_implemented),
        )
        .route("/feedback", get(http::feedback_list).post(http::feedback_not_implemented))
        .route(
            "/feedback/{id}",
            patch(http::feedback_not_implemented).delete(http::feedback_not_implemented),
        )
        .route("/ws", get(ws::ws_handler))
        .fallback(http::static_fallback)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origin))
        .with_state(core)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
