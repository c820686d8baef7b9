//! # Billing Error Types
//!
//! Typed error handling for the exchequer billing service.
//! Webhook verification returns `Result<(), VerificationError>`; everything
//! else in the request path returns `BillingResult<T>`.

use thiserror::Error;

/// Reasons a payment notification fails HMAC verification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// No usable `hmacSignature` in the notification's additional data
    #[error("HMAC id or signature is missing")]
    MissingSignature,

    /// The configured secret is not a hex encoded string
    #[error("HMAC secret must be a hex encoded string")]
    InvalidSecret,

    /// The computed signature does not match the one sent
    #[error("invalid HMAC signature")]
    InvalidSignature,
}

impl VerificationError {
    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            VerificationError::MissingSignature => 401,
            VerificationError::InvalidSignature => 401,
            // A bad secret is a server misconfiguration, not the caller's fault.
            VerificationError::InvalidSecret => 500,
        }
    }
}

/// Core error type for the billing service
#[derive(Debug, Error)]
pub enum BillingError {
    /// Configuration errors (missing keys, invalid values)
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    Verification(#[from] VerificationError),
}

impl BillingError {
    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            BillingError::Configuration(_) => 500,
            BillingError::WebhookParse(_) => 400,
            BillingError::Verification(err) => err.status_code(),
        }
    }
}

impl From<serde_json::Error> for BillingError {
    fn from(err: serde_json::Error) -> Self {
        BillingError::WebhookParse(err.to_string())
    }
}

/// Result type alias for billing operations
pub type BillingResult<T> = Result<T, BillingError>;
