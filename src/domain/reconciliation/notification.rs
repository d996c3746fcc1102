//! Gateway notification payload types.
//!
//! Midtrans delivers payment notifications as JSON over HTTP POST. Only the
//! fields this service acts on are extracted; the raw payload is preserved
//! verbatim in the notification ledger for audit and replay.

use serde_json::Value;

use super::errors::WebhookError;

/// Required keys every notification must carry.
///
/// Extraction collects ALL absent keys before failing, so a malformed
/// payload produces one exhaustive error instead of a drip of retries.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "order_id",
    "status_code",
    "gross_amount",
    "signature_key",
    "transaction_status",
    "transaction_id",
    "payment_type",
];

/// Transaction status reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    /// Funds captured (card flows). Treated identically to Settlement.
    Capture,
    /// Funds settled successfully.
    Settlement,
    /// Payment initiated but not completed.
    Pending,
    /// Payment rejected by the bank or fraud screen.
    Deny,
    /// Order cancelled on the gateway side.
    Cancel,
    /// Order expired before the customer paid.
    Expire,
    /// A status this service does not act on.
    Unknown,
}

impl TransactionStatus {
    /// Parse the gateway's status string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "capture" => Self::Capture,
            "settlement" => Self::Settlement,
            "pending" => Self::Pending,
            "deny" => Self::Deny,
            "cancel" => Self::Cancel,
            "expire" => Self::Expire,
            _ => Self::Unknown,
        }
    }

    /// Convert to the gateway's status string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Settlement => "settlement",
            Self::Pending => "pending",
            Self::Deny => "deny",
            Self::Cancel => "cancel",
            Self::Expire => "expire",
            Self::Unknown => "unknown",
        }
    }

    /// True for statuses meaning the payment succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Capture | Self::Settlement)
    }
}

/// A parsed gateway notification.
///
/// `gross_amount` stays a string on purpose: the signature is computed over
/// the gateway's exact serialization (e.g. `"10000.00"`), and parsing to a
/// float would corrupt the comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayNotification {
    pub order_id: String,
    pub status_code: String,
    pub gross_amount: String,
    pub signature_key: String,
    pub transaction_status: TransactionStatus,
    /// The provider's event identifier - the idempotency key.
    pub transaction_id: String,
    pub payment_type: String,
    pub fraud_status: Option<String>,
    pub transaction_time: Option<String>,
}

impl GatewayNotification {
    /// Extract required fields from a raw payload.
    ///
    /// # Errors
    ///
    /// - `ParseError` if the payload is not a JSON object
    /// - `MissingFields` listing every required key that is absent or not
    ///   a string - no partial extraction
    pub fn from_value(raw: &Value) -> Result<Self, WebhookError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| WebhookError::ParseError("payload is not a JSON object".to_string()))?;

        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .iter()
            .filter(|key| !matches!(obj.get(**key), Some(Value::String(s)) if !s.is_empty()))
            .copied()
            .collect();

        if !missing.is_empty() {
            return Err(WebhookError::MissingFields(missing));
        }

        let get = |key: &str| -> String {
            // Presence checked above
            obj[key].as_str().unwrap_or_default().to_string()
        };

        let opt = |key: &str| -> Option<String> {
            obj.get(key)
                .and_then(Value::as_str)
                .map(|s| s.to_string())
        };

        Ok(Self {
            order_id: get("order_id"),
            status_code: get("status_code"),
            gross_amount: get("gross_amount"),
            signature_key: get("signature_key"),
            transaction_status: TransactionStatus::from_str(&get("transaction_status")),
            transaction_id: get("transaction_id"),
            payment_type: get("payment_type"),
            fraud_status: opt("fraud_status"),
            transaction_time: opt("transaction_time"),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ══════════════════════════════════════════════════════════════
    // TransactionStatus Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn status_parses_known_values() {
        assert_eq!(
            TransactionStatus::from_str("settlement"),
            TransactionStatus::Settlement
        );
        assert_eq!(
            TransactionStatus::from_str("capture"),
            TransactionStatus::Capture
        );
        assert_eq!(
            TransactionStatus::from_str("pending"),
            TransactionStatus::Pending
        );
        assert_eq!(TransactionStatus::from_str("deny"), TransactionStatus::Deny);
        assert_eq!(
            TransactionStatus::from_str("cancel"),
            TransactionStatus::Cancel
        );
        assert_eq!(
            TransactionStatus::from_str("expire"),
            TransactionStatus::Expire
        );
    }

    #[test]
    fn status_parses_unrecognized_as_unknown() {
        assert_eq!(
            TransactionStatus::from_str("refund"),
            TransactionStatus::Unknown
        );
        assert_eq!(TransactionStatus::from_str(""), TransactionStatus::Unknown);
    }

    #[test]
    fn status_roundtrips_through_strings() {
        for status in [
            TransactionStatus::Capture,
            TransactionStatus::Settlement,
            TransactionStatus::Pending,
            TransactionStatus::Deny,
            TransactionStatus::Cancel,
            TransactionStatus::Expire,
        ] {
            assert_eq!(TransactionStatus::from_str(status.as_str()), status);
        }
    }

    #[test]
    fn success_statuses_are_capture_and_settlement() {
        assert!(TransactionStatus::Settlement.is_success());
        assert!(TransactionStatus::Capture.is_success());
        assert!(!TransactionStatus::Pending.is_success());
        assert!(!TransactionStatus::Deny.is_success());
        assert!(!TransactionStatus::Expire.is_success());
    }

    // ══════════════════════════════════════════════════════════════
    // Field Extraction Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn extracts_complete_payload() {
        let raw = fixtures::settlement_payload("SUB-1-2-123", "10000.00");

        let notification = GatewayNotification::from_value(&raw).unwrap();

        assert_eq!(notification.order_id, "SUB-1-2-123");
        assert_eq!(notification.status_code, "200");
        assert_eq!(notification.gross_amount, "10000.00");
        assert_eq!(
            notification.transaction_status,
            TransactionStatus::Settlement
        );
        assert_eq!(notification.transaction_id, "tx-SUB-1-2-123");
        assert_eq!(notification.payment_type, "gopay");
        assert_eq!(notification.fraud_status, Some("accept".to_string()));
    }

    #[test]
    fn gross_amount_is_never_parsed_to_a_number() {
        let mut raw = fixtures::settlement_payload("SUB-1-2-123", "10000.00");
        raw["gross_amount"] = json!("10000.000000");

        let notification = GatewayNotification::from_value(&raw).unwrap();
        // Preserved exactly as serialized by the gateway
        assert_eq!(notification.gross_amount, "10000.000000");
    }

    #[test]
    fn missing_fields_are_all_reported_at_once() {
        let raw = json!({"order_id": "x"});

        let err = GatewayNotification::from_value(&raw).unwrap_err();

        match err {
            WebhookError::MissingFields(fields) => {
                assert_eq!(
                    fields,
                    vec![
                        "status_code",
                        "gross_amount",
                        "signature_key",
                        "transaction_status",
                        "transaction_id",
                        "payment_type",
                    ]
                );
            }
            other => panic!("expected MissingFields, got {:?}", other),
        }
    }

    #[test]
    fn empty_string_field_counts_as_missing() {
        let mut raw = fixtures::settlement_payload("SUB-1-2-123", "10000.00");
        raw["transaction_id"] = json!("");

        let err = GatewayNotification::from_value(&raw).unwrap_err();
        assert!(matches!(
            err,
            WebhookError::MissingFields(fields) if fields == vec!["transaction_id"]
        ));
    }

    #[test]
    fn non_string_field_counts_as_missing() {
        let mut raw = fixtures::settlement_payload("SUB-1-2-123", "10000.00");
        // A numeric gross_amount would break signature verification
        raw["gross_amount"] = json!(10000.0);

        let err = GatewayNotification::from_value(&raw).unwrap_err();
        assert!(matches!(
            err,
            WebhookError::MissingFields(fields) if fields == vec!["gross_amount"]
        ));
    }

    #[test]
    fn non_object_payload_is_a_parse_error() {
        let err = GatewayNotification::from_value(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, WebhookError::ParseError(_)));
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let mut raw = fixtures::settlement_payload("SUB-1-2-123", "10000.00");
        raw.as_object_mut().unwrap().remove("fraud_status");
        raw.as_object_mut().unwrap().remove("transaction_time");

        let notification = GatewayNotification::from_value(&raw).unwrap();
        assert_eq!(notification.fraud_status, None);
        assert_eq!(notification.transaction_time, None);
    }
}
