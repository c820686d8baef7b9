//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the service configuration, the server status and the handler
//! verified payment notifications are dispatched to.

use crate::status::StatusLock;
use axum::http::HeaderValue;
use billing_adyen::{AdyenWebhookConfig, LoggingNotificationHandler, NotificationHandler};
use billing_core::env::{bool_var, var_or};
use billing_core::{BillingError, BillingResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

/// How long in-flight requests get to finish once shutdown starts
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(35);

/// Server modes accepted in `EXCHEQUER_MODE`
pub const MODES: &[&str] = &["release", "debug", "test"];

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Start in maintenance mode (everything but the probes returns 503)
    pub maintenance: bool,
    /// Server mode (release, debug, test)
    pub mode: String,
    /// Log verbosity
    pub log_level: Level,
    /// Human readable logs on stderr instead of JSON on stdout
    pub console_log: bool,
    /// Address to bind, `host:port`, `:port` or a bare port
    pub bind_addr: String,
    /// Origin of the user interface, allowed for CORS
    pub origin: String,
    /// Deadline for draining connections on shutdown
    pub drain_timeout: Duration,
    /// Adyen webhook authentication
    pub adyen: AdyenWebhookConfig,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> BillingResult<Self> {
        dotenvy::dotenv().ok();

        let log_level = var_or("EXCHEQUER_LOG_LEVEL", "info");
        let config = Self {
            maintenance: bool_var("EXCHEQUER_MAINTENANCE", false)?,
            mode: var_or("EXCHEQUER_MODE", "release"),
            log_level: parse_level(&log_level).ok_or_else(|| {
                BillingError::Configuration(format!("{:?} is not a valid log level", log_level))
            })?,
            console_log: bool_var("EXCHEQUER_CONSOLE_LOG", false)?,
            bind_addr: var_or("EXCHEQUER_BIND_ADDR", ":8204"),
            origin: var_or("EXCHEQUER_ORIGIN", "http://localhost:8204"),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            adyen: AdyenWebhookConfig::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validations that need more than one field, including nested configs
    pub fn validate(&self) -> BillingResult<()> {
        if !MODES.contains(&self.mode.as_str()) {
            return Err(BillingError::Configuration(format!(
                "{:?} is not a valid server mode",
                self.mode
            )));
        }

        if HeaderValue::from_str(&self.origin).is_err() {
            return Err(BillingError::Configuration(format!(
                "{:?} is not a valid origin",
                self.origin
            )));
        }

        self.adyen.validate()
    }

    /// The address handed to the listener.
    ///
    /// `:8204` and `8204` both mean every interface on port 8204.
    pub fn listen_addr(&self) -> String {
        let addr = self.bind_addr.trim();
        if addr.starts_with(':') {
            format!("0.0.0.0{}", addr)
        } else if addr.parse::<u16>().is_ok() {
            format!("0.0.0.0:{}", addr)
        } else {
            addr.to_string()
        }
    }

    /// Check if running in debug mode
    pub fn is_debug(&self) -> bool {
        self.mode == "debug"
    }

    /// Builder: set the bind address
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Builder: set the drain deadline
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Builder: toggle maintenance mode
    pub fn with_maintenance(mut self, maintenance: bool) -> Self {
        self.maintenance = maintenance;
        self
    }

    /// Builder: set the webhook authentication
    pub fn with_adyen(mut self, adyen: AdyenWebhookConfig) -> Self {
        self.adyen = adyen;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            maintenance: false,
            mode: "release".to_string(),
            log_level: Level::INFO,
            console_log: false,
            bind_addr: ":8204".to_string(),
            origin: "http://localhost:8204".to_string(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            adyen: AdyenWebhookConfig::default(),
        }
    }
}

/// Parse a log level name. `fatal` and `panic` are accepted for old
/// deployments and map to `error`.
pub fn parse_level(raw: &str) -> Option<Level> {
    match raw.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" | "fatal" | "panic" => Some(Level::ERROR),
        _ => None,
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: Arc<AppConfig>,
    /// Health and readiness, shared with the server lifecycle
    pub status: StatusLock,
    /// Receives verified payment notifications
    pub notifications: Arc<dyn NotificationHandler>,
}

impl AppState {
    /// Create a new AppState that logs notifications
    pub fn new(config: AppConfig, status: StatusLock) -> Self {
        Self {
            config: Arc::new(config),
            status,
            notifications: Arc::new(LoggingNotificationHandler),
        }
    }
}
