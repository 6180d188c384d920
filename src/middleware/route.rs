use std::collections::HashMap;

use axum::{
    extract::{Path, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Captured segments must be word characters only. Anything else is treated
/// as an unmatched route and answered like the router's own fallback.
pub async fn word_segments(
    path_params: Option<Path<HashMap<String, String>>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(Path(params)) = path_params {
        if !params.values().all(|v| is_word(v)) {
            return StatusCode::NOT_FOUND.into_response();
        }
    }

    next.run(request).await
}

fn is_word(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_alphanumeric() || c == '_')
}
