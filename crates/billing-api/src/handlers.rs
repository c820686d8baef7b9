//! # Request Handlers
//!
//! Axum request handlers for the billing API: Kubernetes probes, the status
//! endpoint, the index page and the Adyen payments webhook.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use billing_adyen::{process_notifications, NotificationRequest};
use billing_core::BillingError;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::any::Any;
use tracing::{error, info, instrument};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

fn billing_error_to_response(
    message: &str,
    err: BillingError,
) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    let response = ErrorResponse::new(message, code).with_details(err.to_string());
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Liveness probe
pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    if state.status.is_healthy() {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not healthy" })),
        )
    }
}

/// Readiness probe
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.status.is_ready() {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not ready" })),
        )
    }
}

/// Heartbeat with version and uptime
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let current = state.status.status();
    let label = if state.config.maintenance {
        "maintenance"
    } else if !current.healthy {
        "stopping"
    } else {
        "ok"
    };

    let uptime = current
        .started_at
        .map(|started| format_uptime((Utc::now() - started).num_seconds()));

    Json(json!({
        "status": label,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime": uptime,
    }))
}

/// Handle an Adyen payments webhook
#[instrument(skip(state, body), fields(bytes = body.len()))]
pub async fn adyen_payments_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let request = NotificationRequest::from_json(&body).map_err(|e| {
        error!("Could not parse payments webhook: {}", e);
        billing_error_to_response("could not parse payments webhook request", e)
    })?;

    let count = process_notifications(&request, &state.config.adyen, state.notifications.as_ref())
        .map_err(|e| {
            error!("Payments webhook rejected: {}", e);
            let message = match &e {
                BillingError::Verification(_) => "HMAC signature cannot be verified",
                _ => "could not process payments webhook",
            };
            billing_error_to_response(message, e)
        })?;

    info!("Accepted {} adyen notifications", count);
    Ok(StatusCode::ACCEPTED)
}

/// Landing page
pub async fn index() -> impl IntoResponse {
    Html(
        r#"<!DOCTYPE html>
<html>
<head><title>Exchequer</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0;">
    <div style="text-align: center;">
        <h1>Exchequer</h1>
        <p style="color: #666;">Billing service</p>
    </div>
</body>
</html>
"#,
    )
}

/// Fallback for unknown routes
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("resource not found", 404)),
    )
}

/// Fallback for known routes hit with the wrong method
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse::new("method not allowed", 405)),
    )
}

/// Turn a handler panic into a 500, keeping the connection and the process alive
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %details, "request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("internal server error", 500)),
    )
        .into_response()
}

fn format_uptime(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (hours, rest) = (seconds / 3600, seconds % 3600);
    let (minutes, seconds) = (rest / 60, rest % 60);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
