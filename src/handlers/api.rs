use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{config::AppConfig, AppState};

// ── Request/response types ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ShortenParams {
    url: Option<String>,
}

#[derive(Serialize)]
pub struct ShortenResponse {
    pub original_url: String,
    pub short_id: String,
    pub short_url: String,
}

#[derive(Deserialize)]
pub struct RecentParams {
    limit: Option<i64>,
}

// ── Handlers ───────────────────────────────────────────────────────────────

/// GET /ping — liveness probe with a fixed payload.
pub async fn ping() -> impl IntoResponse {
    Json(json!({ "status": "ok", "data": "pong" }))
}

/// GET /shorten?url=…
///
/// Rejects a missing or blank `url` before touching storage; otherwise
/// returns the existing or newly allocated mapping. URL well-formedness is
/// deliberately not checked.
pub async fn shorten(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ShortenParams>,
) -> Response {
    let url = params.url.as_deref().map(str::trim).unwrap_or_default();
    if url.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing required 'url' query parameter" })),
        )
            .into_response();
    }

    match state.registry.get_or_create(url).await {
        Ok(link) => {
            let base = public_base(&headers, &state.config);
            let body = ShortenResponse {
                short_url: format!("{}/{}", base, link.short_id),
                original_url: link.original_url,
                short_id: link.short_id,
            };
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to shorten '{}': {:?}", url, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal error" })),
            )
                .into_response()
        }
    }
}

/// GET /api/links?limit=N — most recently created records, newest first.
/// Diagnostic endpoint, not part of the guaranteed contract.
pub async fn recent(State(state): State<Arc<AppState>>, Query(params): Query<RecentParams>) -> Response {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);

    match state.registry.list_recent(limit).await {
        Ok(links) => Json(links).into_response(),
        Err(e) => {
            tracing::error!("Failed to list recent links: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal error" })),
            )
                .into_response()
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────

/// Base URL for generated short links. Proxy forwarding headers win over the
/// request's own Host; the configured BASE_URL is the fallback when neither
/// is present.
fn public_base(headers: &HeaderMap, config: &AppConfig) -> String {
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty());

    match host {
        Some(host) => {
            let proto = headers
                .get("x-forwarded-proto")
                .and_then(|v| v.to_str().ok())
                .filter(|p| !p.is_empty())
                .unwrap_or("http");
            format!("{}://{}", proto, host)
        }
        None => config.base_url.clone(),
    }
}
