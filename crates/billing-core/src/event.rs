//! # Payment Events
//!
//! Provider-neutral view of payment notifications. Provider crates map their
//! own event codes onto [`EventKind`] so handlers don't need to know the wire
//! vocabulary of each provider.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment event kinds we care about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Payment authorised
    Authorisation,
    /// Authorised funds captured
    Capture,
    /// Payment refunded
    Refund,
    /// Payment cancelled before capture
    Cancellation,
    /// Cardholder dispute
    Chargeback,
    /// Unknown event (passthrough)
    Unknown(String),
}

impl EventKind {
    /// True for events that move money back to the shopper
    pub fn is_reversal(&self) -> bool {
        matches!(self, EventKind::Refund | EventKind::Chargeback)
    }
}

/// Monetary amount in minor currency units
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    /// Value in the smallest unit (cents for EUR/USD)
    pub value: i64,
    /// ISO 4217 currency code
    pub currency: String,
}

impl Amount {
    pub fn new(value: i64, currency: impl Into<String>) -> Self {
        Self {
            value,
            currency: currency.into(),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversal_kinds() {
        assert!(EventKind::Refund.is_reversal());
        assert!(EventKind::Chargeback.is_reversal());
        assert!(!EventKind::Authorisation.is_reversal());
        assert!(!EventKind::Unknown("REPORT_AVAILABLE".into()).is_reversal());
    }

    #[test]
    fn test_amount_display() {
        assert_eq!(Amount::new(1130, "EUR").to_string(), "1130 EUR");
    }
}
