use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::AppState;

/// GET /:short_id
///
/// Pure lookup followed by a redirect. An unknown id is a normal miss
/// (typo'd or stale link), answered with 404.
pub async fn redirect(State(state): State<Arc<AppState>>, Path(short_id): Path<String>) -> Response {
    match state.registry.resolve(&short_id).await {
        Ok(Some(link)) => {
            // Plain 302 with a Location header; axum's Redirect::to would
            // emit a 303.
            (StatusCode::FOUND, [(header::LOCATION, link.original_url)]).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Unknown short link" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("DB error resolving short id '{}': {:?}", short_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal error" })),
            )
                .into_response()
        }
    }
}
