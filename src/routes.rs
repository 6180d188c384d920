use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, MethodRouter},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::RoleSet;
use crate::config::{AppConfig, Environment};
use crate::handlers::{self, mqprofile};
use crate::middleware::{require_roles, validate_request, word_segments, RoleGate};
use crate::schema::SchemaError;
use crate::state::AppState;

/// Path templates, as written in the request contract
pub const MQPROFILE_PATH: &str = "/mq-profiles/{mqid}";
pub const PUBLIC_ACTIVATED_PATH: &str = "/mq-profiles/public/activated";

/// Build the full application router.
///
/// Fails if an operation has no entry in the request contract.
pub fn app(state: AppState, config: &AppConfig) -> Result<Router, SchemaError> {
    let router = Router::new()
        // Public
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Role-gated
        .merge(mqprofile_routes(&state)?)
        .with_state(state);

    Ok(with_global_layers(router, config))
}

fn mqprofile_routes(state: &AppState) -> Result<Router<AppState>, SchemaError> {
    Ok(Router::new()
        // Static path first in the contract, matched ahead of {mqid}
        .route(
            &versioned(&state.route_prefix, PUBLIC_ACTIVATED_PATH),
            gated(state, PUBLIC_ACTIVATED_PATH, RoleSet::USER, get(mqprofile::get_public_activated))?,
        )
        .route(
            &versioned(&state.route_prefix, MQPROFILE_PATH),
            gated(state, MQPROFILE_PATH, RoleSet::WMS, get(mqprofile::get))?,
        ))
}

/// Wrap a GET operation in its gates: route guard, then authorization, then validation
fn gated(
    state: &AppState,
    path: &str,
    roles: RoleSet,
    method_router: MethodRouter<AppState>,
) -> Result<MethodRouter<AppState>, SchemaError> {
    let operation = state.schema.operation(path, &Method::GET)?;
    let gate = RoleGate::new(state.tokens.clone(), roles);

    // Not applied to the method fallback, so other verbs get 405 before any gate
    Ok(method_router.route_layer(
        ServiceBuilder::new()
            .layer(from_fn(word_segments))
            .layer(from_fn_with_state(gate, require_roles))
            .layer(from_fn_with_state(operation, validate_request)),
    ))
}

/// Turn a contract path template into an axum route under the version prefix
pub fn versioned(prefix: &str, template: &str) -> String {
    let path = template.replace('{', ":").replace('}', "");
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        path
    } else {
        format!("/{}{}", prefix, path)
    }
}

fn with_global_layers(router: Router, config: &AppConfig) -> Router {
    let router = if config.security.enable_cors {
        router.layer(cors_layer(config))
    } else {
        router
    };

    if config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.environment == Environment::Development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET])
        .allow_headers([header::AUTHORIZATION])
}
