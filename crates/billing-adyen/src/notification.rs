//! # Adyen Notification Types
//!
//! Wire types for Adyen standard webhooks. Adyen batches one or more
//! `NotificationRequestItem`s into each POST; every item carries its own HMAC
//! signature in `additionalData`.

use billing_core::{Amount, BillingResult, EventKind};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key under `additionalData` that holds the base64 HMAC signature
pub const HMAC_SIGNATURE_KEY: &str = "hmacSignature";

/// Top-level webhook envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    /// "true" for live platform events, "false" for test
    #[serde(default)]
    pub live: String,

    #[serde(default)]
    pub notification_items: Vec<NotificationItem>,
}

impl NotificationRequest {
    /// Parse a raw webhook body
    pub fn from_json(body: &[u8]) -> BillingResult<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Whether the events come from the live platform
    pub fn is_live(&self) -> bool {
        self.live == "true"
    }

    /// Iterate over the notification records in the batch
    pub fn records(&self) -> impl Iterator<Item = &NotificationRecord> {
        self.notification_items
            .iter()
            .map(|item| &item.notification_request_item)
    }
}

/// Wrapper object Adyen puts around each record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationItem {
    #[serde(rename = "NotificationRequestItem")]
    pub notification_request_item: NotificationRecord,
}

/// A single payment notification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    /// Adyen's reference for the payment or modification
    #[serde(default)]
    pub psp_reference: String,

    /// Reference of the original payment (modifications only)
    #[serde(default)]
    pub original_reference: String,

    #[serde(default)]
    pub merchant_account_code: String,

    /// Our reference, set when the payment was created
    #[serde(default)]
    pub merchant_reference: String,

    #[serde(default)]
    pub amount: Amount,

    /// e.g. AUTHORISATION, CAPTURE, REFUND
    #[serde(default)]
    pub event_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<DateTime<FixedOffset>>,

    #[serde(default)]
    pub operations: Vec<String>,

    #[serde(default)]
    pub payment_method: String,

    #[serde(default)]
    pub reason: String,

    /// "true" or "false", sent as a string
    #[serde(default)]
    pub success: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<HashMap<String, serde_json::Value>>,
}

impl NotificationRecord {
    /// The signature sent with the record, if it is a non-empty string
    pub fn hmac_signature(&self) -> Option<&str> {
        self.additional_data
            .as_ref()
            .and_then(|data| data.get(HMAC_SIGNATURE_KEY))
            .and_then(|v| v.as_str())
            .filter(|sig| !sig.is_empty())
    }

    /// The colon-joined string Adyen signs.
    ///
    /// Fields are not escaped, so a colon inside a value is indistinguishable
    /// from a separator. Adyen signs it this way and so must we.
    pub fn canonical_reference(&self) -> String {
        [
            self.psp_reference.as_str(),
            self.original_reference.as_str(),
            self.merchant_account_code.as_str(),
            self.merchant_reference.as_str(),
            &self.amount.value.to_string(),
            self.amount.currency.as_str(),
            self.event_code.as_str(),
            self.success.as_str(),
        ]
        .join(":")
    }

    /// Map the Adyen event code onto the provider-neutral event kind
    pub fn kind(&self) -> EventKind {
        match self.event_code.as_str() {
            "AUTHORISATION" => EventKind::Authorisation,
            "CAPTURE" => EventKind::Capture,
            "REFUND" => EventKind::Refund,
            "CANCELLATION" => EventKind::Cancellation,
            "CHARGEBACK" => EventKind::Chargeback,
            other => EventKind::Unknown(other.to_string()),
        }
    }

    /// Check if the operation the event reports succeeded
    pub fn is_success(&self) -> bool {
        self.success == "true"
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const EXAMPLE_WEBHOOK_EVENT: &str = r#"{
   "live":"false",
   "notificationItems":[
      {
         "NotificationRequestItem":{
            "additionalData":{
               "hmacSignature":"coqCmt/IZ4E3CzPvMY8zTjQVL5hYJUiBRg8UU+iCWo0="
            },
            "amount":{
               "value":1130,
               "currency":"EUR"
            },
            "pspReference":"7914073381342284",
            "eventCode":"AUTHORISATION",
            "eventDate":"2019-05-06T17:15:34.121+02:00",
            "merchantAccountCode":"TestMerchant",
            "operations":[
               "CANCEL",
               "CAPTURE",
               "REFUND"
            ],
            "merchantReference":"TestPayment-1407325143704",
            "paymentMethod":"visa",
            "success":"true"
         }
      }
   ]
}"#;

    pub(crate) fn example_record() -> NotificationRecord {
        let request = NotificationRequest::from_json(EXAMPLE_WEBHOOK_EVENT.as_bytes()).unwrap();
        let record = request.records().next().cloned().unwrap();
        record
    }

    #[test]
    fn test_parse_example_event() {
        let request = NotificationRequest::from_json(EXAMPLE_WEBHOOK_EVENT.as_bytes()).unwrap();
        assert!(!request.is_live());
        assert_eq!(request.records().count(), 1);

        let record = example_record();
        assert_eq!(record.psp_reference, "7914073381342284");
        assert_eq!(record.original_reference, "");
        assert_eq!(record.amount, Amount::new(1130, "EUR"));
        assert_eq!(record.operations, vec!["CANCEL", "CAPTURE", "REFUND"]);
        assert_eq!(record.payment_method, "visa");
        assert!(record.is_success());
        assert_eq!(record.kind(), EventKind::Authorisation);
        assert!(record.event_date.is_some());
        assert_eq!(
            record.hmac_signature(),
            Some("coqCmt/IZ4E3CzPvMY8zTjQVL5hYJUiBRg8UU+iCWo0=")
        );
    }

    #[test]
    fn test_canonical_reference() {
        let record = example_record();
        assert_eq!(
            record.canonical_reference(),
            "7914073381342284::TestMerchant:TestPayment-1407325143704:1130:EUR:AUTHORISATION:true"
        );
    }

    #[test]
    fn test_hmac_signature_must_be_non_empty_string() {
        let mut record = example_record();

        record.additional_data = None;
        assert_eq!(record.hmac_signature(), None);

        let mut data = HashMap::new();
        data.insert(HMAC_SIGNATURE_KEY.to_string(), serde_json::json!(42));
        record.additional_data = Some(data.clone());
        assert_eq!(record.hmac_signature(), None);

        data.insert(HMAC_SIGNATURE_KEY.to_string(), serde_json::json!(""));
        record.additional_data = Some(data);
        assert_eq!(record.hmac_signature(), None);
    }

    #[test]
    fn test_event_kind_mapping() {
        let mut record = example_record();
        for (code, kind) in [
            ("CAPTURE", EventKind::Capture),
            ("REFUND", EventKind::Refund),
            ("CANCELLATION", EventKind::Cancellation),
            ("CHARGEBACK", EventKind::Chargeback),
            ("REPORT_AVAILABLE", EventKind::Unknown("REPORT_AVAILABLE".into())),
        ] {
            record.event_code = code.to_string();
            assert_eq!(record.kind(), kind);
        }
    }

    #[test]
    fn test_malformed_body() {
        assert!(NotificationRequest::from_json(b"{\"notificationItems\": 7}").is_err());
        assert!(NotificationRequest::from_json(b"not json").is_err());
    }
}
