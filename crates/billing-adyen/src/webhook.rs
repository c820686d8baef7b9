//! # Adyen Webhook Handling
//!
//! Verification and dispatch of Adyen notification batches.
//! Every item in a batch is verified before any item is dispatched, so a
//! batch with one forged item is rejected as a whole and Adyen's retry of the
//! batch does not double-process the genuine items.

use crate::config::AdyenWebhookConfig;
use crate::notification::{NotificationRecord, NotificationRequest};
use crate::verify::verify_hmac;
use billing_core::{BillingResult, EventKind};
use tracing::{debug, info, warn};

/// Notification handler trait
///
/// Implement this trait to act on verified notifications.
#[allow(unused_variables)]
pub trait NotificationHandler: Send + Sync {
    /// Called when a payment is authorised
    fn on_authorisation(&self, notification: &NotificationRecord) -> BillingResult<()> {
        info!(
            psp_reference = %notification.psp_reference,
            success = notification.is_success(),
            "payment authorisation"
        );
        Ok(())
    }

    /// Called when authorised funds are captured
    fn on_capture(&self, notification: &NotificationRecord) -> BillingResult<()> {
        info!(psp_reference = %notification.psp_reference, "payment captured");
        Ok(())
    }

    /// Called when a payment is refunded
    fn on_refund(&self, notification: &NotificationRecord) -> BillingResult<()> {
        info!(
            psp_reference = %notification.psp_reference,
            original_reference = %notification.original_reference,
            "payment refunded"
        );
        Ok(())
    }

    /// Called when a payment is cancelled
    fn on_cancellation(&self, notification: &NotificationRecord) -> BillingResult<()> {
        info!(psp_reference = %notification.psp_reference, "payment cancelled");
        Ok(())
    }

    /// Called when the shopper disputes a payment
    fn on_chargeback(&self, notification: &NotificationRecord) -> BillingResult<()> {
        warn!(
            psp_reference = %notification.psp_reference,
            reason = %notification.reason,
            "chargeback received"
        );
        Ok(())
    }

    /// Called for unknown/unhandled event codes
    fn on_unknown(&self, notification: &NotificationRecord) -> BillingResult<()> {
        debug!(event_code = %notification.event_code, "unhandled adyen event");
        Ok(())
    }
}

/// Default handler (just logs events)
pub struct LoggingNotificationHandler;

impl NotificationHandler for LoggingNotificationHandler {}

/// Dispatch a notification to the appropriate handler method
pub fn dispatch_notification(
    handler: &dyn NotificationHandler,
    notification: &NotificationRecord,
) -> BillingResult<()> {
    match notification.kind() {
        EventKind::Authorisation => handler.on_authorisation(notification),
        EventKind::Capture => handler.on_capture(notification),
        EventKind::Refund => handler.on_refund(notification),
        EventKind::Cancellation => handler.on_cancellation(notification),
        EventKind::Chargeback => handler.on_chargeback(notification),
        EventKind::Unknown(_) => handler.on_unknown(notification),
    }
}

/// Verify (when enabled) and dispatch every notification in a batch.
///
/// Returns the number of notifications dispatched.
pub fn process_notifications(
    request: &NotificationRequest,
    config: &AdyenWebhookConfig,
    handler: &dyn NotificationHandler,
) -> BillingResult<usize> {
    if config.verify_hmac {
        for notification in request.records() {
            verify_hmac(notification, &config.hmac_secret).map_err(|err| {
                warn!(
                    psp_reference = %notification.psp_reference,
                    error = %err,
                    "adyen notification failed hmac verification"
                );
                err
            })?;
        }
    }

    let total = request.notification_items.len();
    for (index, notification) in request.records().enumerate() {
        info!(
            live = %request.live,
            num_notification_items = total,
            notification_index = index,
            event_code = %notification.event_code,
            event_date = ?notification.event_date,
            amount = %notification.amount,
            reversal = notification.kind().is_reversal(),
            merchant_account_code = %notification.merchant_account_code,
            merchant_reference = %notification.merchant_reference,
            operations = ?notification.operations,
            original_reference = %notification.original_reference,
            payment_method = %notification.payment_method,
            psp_reference = %notification.psp_reference,
            reason = %notification.reason,
            success = %notification.success,
            "adyen payment webhook received"
        );
        dispatch_notification(handler, notification)?;
    }

    Ok(total)
}
