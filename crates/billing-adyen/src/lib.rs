//! # billing-adyen
//!
//! Adyen webhook support for the exchequer billing service.
//!
//! Adyen posts batches of payment notifications to the service. Each item is
//! signed with HMAC-SHA256 using a key shared through the Adyen customer area;
//! this crate parses the batches, verifies the signatures and dispatches the
//! verified items to a [`NotificationHandler`].
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use billing_adyen::{AdyenWebhookConfig, NotificationRequest, LoggingNotificationHandler};
//!
//! let config = AdyenWebhookConfig::from_env()?;
//! let request = NotificationRequest::from_json(&body)?;
//! billing_adyen::process_notifications(&request, &config, &LoggingNotificationHandler)?;
//! ```

pub mod config;
pub mod notification;
pub mod verify;
pub mod webhook;

// Re-exports
pub use config::AdyenWebhookConfig;
pub use notification::{NotificationItem, NotificationRecord, NotificationRequest, HMAC_SIGNATURE_KEY};
pub use verify::{constant_time_compare, sign, verify_hmac};
pub use webhook::{
    dispatch_notification, process_notifications, LoggingNotificationHandler, NotificationHandler,
};
