use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{RoleSet, TokenVerifier};
use crate::error::ApiError;

/// Per-operation authorization: the roles an operation accepts plus the verifier to check them with
#[derive(Clone)]
pub struct RoleGate {
    pub tokens: Arc<TokenVerifier>,
    pub roles: RoleSet,
}

impl RoleGate {
    pub fn new(tokens: Arc<TokenVerifier>, roles: RoleSet) -> Self {
        Self { tokens, roles }
    }
}

/// Rejects the request before anything downstream runs unless the bearer
/// token is valid and carries one of the gate's roles
pub async fn require_roles(
    State(gate): State<RoleGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(request.headers()).map_err(ApiError::unauthorized)?;

    let account = gate.tokens.verify(&token).map_err(|e| {
        tracing::warn!("Rejected bearer token: {}", e);
        ApiError::unauthorized("Invalid or expired token")
    })?;

    if !gate.roles.permits(&account.roles) {
        tracing::warn!(
            "Service account '{}' lacks required role, one of {}",
            account.subject,
            gate.roles
        );
        return Err(ApiError::forbidden(format!(
            "Caller lacks a required role: {}",
            gate.roles
        )));
    }

    tracing::debug!("Authorized '{}' for roles {}", account.subject, gate.roles);
    request.extensions_mut().insert(account);

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
