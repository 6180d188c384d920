use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::schema::Operation;

/// Rejects requests whose parameters do not satisfy the operation's contract.
/// On success the parsed [`crate::schema::RequestArgs`] ride along as a request extension.
pub async fn validate_request(
    State(operation): State<Arc<Operation>>,
    path_params: Option<Path<HashMap<String, String>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path_params = path_params.map(|Path(p)| p).unwrap_or_default();

    let args = operation
        .validate(&path_params, request.uri().query())
        .map_err(|e| {
            tracing::debug!(
                "Request failed validation for {}: {:?}",
                operation.operation_id.as_deref().unwrap_or("operation"),
                e.field_errors
            );
            ApiError::from(e)
        })?;

    request.extensions_mut().insert(args);
    Ok(next.run(request).await)
}
