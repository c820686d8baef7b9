//! # Routes
//!
//! Axum router configuration for the billing API.

use crate::handlers;
use crate::middleware::{adyen_basic_auth, maintenance};
use crate::state::{AppConfig, AppState};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

/// Create the main application router
///
/// Routes:
/// - Probes (outside all middleware):
///   - GET /healthz, /livez - Liveness
///   - GET /readyz - Readiness
///
/// - Pages:
///   - GET / - Index
///
/// - API v1:
///   - GET  /v1/status - Heartbeat
///   - POST /v1/adyen/payments - Adyen payments webhook
pub fn create_router(state: AppState) -> Router {
    // Kubernetes probes must answer even in maintenance mode
    let probe_routes = Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/livez", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .method_not_allowed_fallback(handlers::method_not_allowed);

    // Adyen webhooks, optionally behind basic auth
    let adyen_routes = Router::new()
        .route("/payments", post(handlers::adyen_payments_webhook))
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .route_layer(from_fn_with_state(state.clone(), adyen_basic_auth));

    let api_routes = Router::new()
        .route("/status", get(handlers::status))
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .nest("/adyen", adyen_routes);

    // Ordering matters: tracing on the outside so latency covers the rest
    let app_routes = Router::new()
        .route("/", get(handlers::index))
        .nest("/v1", api_routes)
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(handlers::panic_response))
                .layer(cors_layer(&state.config))
                .layer(from_fn_with_state(state.clone(), maintenance)),
        );

    probe_routes.merge(app_routes).with_state(state)
}

/// CORS for the configured user interface origin
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-csrf-token"),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(12 * 60 * 60));

    // Validated when the config is loaded
    match HeaderValue::from_str(&config.origin) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => cors,
    }
}
