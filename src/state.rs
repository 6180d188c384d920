use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::TokenVerifier;
use crate::database::{DocumentStore, MqProfileClient};
use crate::schema::RequestSchema;

/// Shared, read-only state handed to every request
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub tokens: Arc<TokenVerifier>,
    pub schema: Arc<RequestSchema>,
    /// Version segment in front of every resource route, e.g. "v1"
    pub route_prefix: Arc<str>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        tokens: TokenVerifier,
        schema: RequestSchema,
        route_prefix: &str,
    ) -> Self {
        Self {
            store,
            tokens: Arc::new(tokens),
            schema: Arc::new(schema),
            route_prefix: Arc::from(route_prefix.trim_matches('/')),
        }
    }
}

// Each request gets its own accessor over the shared store handle
impl FromRef<AppState> for MqProfileClient {
    fn from_ref(state: &AppState) -> Self {
        MqProfileClient::new(state.store.clone())
    }
}
