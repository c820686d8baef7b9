//! # HMAC Verification
//!
//! Adyen signs every notification item with HMAC-SHA256 over the record's
//! canonical reference string, keyed with the hex-decoded merchant secret,
//! and sends the base64 digest as `additionalData.hmacSignature`.

use crate::notification::NotificationRecord;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use billing_core::VerificationError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verify that a notification was signed with `secret`.
///
/// Checks run in this order: signature present, secret decodes, signature
/// matches. A missing signature is reported even when the secret is bad.
pub fn verify_hmac(notification: &NotificationRecord, secret: &str) -> Result<(), VerificationError> {
    let expected = notification
        .hmac_signature()
        .ok_or(VerificationError::MissingSignature)?;

    let signature = sign(&notification.canonical_reference(), secret)?;

    if !constant_time_compare(&signature, expected) {
        return Err(VerificationError::InvalidSignature);
    }
    Ok(())
}

/// Compute the base64 HMAC-SHA256 of `reference` keyed by the hex `secret`.
pub fn sign(reference: &str, secret: &str) -> Result<String, VerificationError> {
    let key = hex::decode(secret).map_err(|_| VerificationError::InvalidSecret)?;

    let mut mac =
        HmacSha256::new_from_slice(&key).map_err(|_| VerificationError::InvalidSecret)?;
    mac.update(reference.as_bytes());
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

/// Compare two strings without short-circuiting on the first difference.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
