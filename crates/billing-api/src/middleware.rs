//! Request middleware: maintenance mode and webhook basic auth.

use crate::handlers::ErrorResponse;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde_json::json;
use tracing::warn;

/// Answer 503 to everything while the service is in maintenance mode
pub async fn maintenance(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.config.maintenance {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "maintenance",
                "version": env!("CARGO_PKG_VERSION"),
            })),
        )
            .into_response();
    }
    next.run(request).await
}

/// HTTP basic auth for the Adyen webhook, when enabled in the config
pub async fn adyen_basic_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let webhook = &state.config.adyen;
    if !webhook.use_basic_auth {
        return next.run(request).await;
    }

    match basic_credentials(request.headers()) {
        Some((username, password)) if webhook.credentials_match(&username, &password) => {
            next.run(request).await
        }
        _ => {
            warn!("Rejected adyen webhook with missing or wrong credentials");
            let mut response = (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("authorization required", 401)),
            )
                .into_response();
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"Authorization Required\""),
            );
            response
        }
    }
}

/// Extract `username:password` from a `Basic` authorization header
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = BASE64_STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
