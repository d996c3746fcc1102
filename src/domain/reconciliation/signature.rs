//! Gateway webhook signature verification.
//!
//! Midtrans signs each notification with a SHA-512 digest over the
//! concatenation of `order_id + status_code + gross_amount + server_key`,
//! hex-encoded into the payload's `signature_key` field. There is no
//! timestamp in the scheme; replay protection comes from the notification
//! ledger's event-id deduplication, not from the signature.

use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use super::errors::WebhookError;
use super::notification::GatewayNotification;

/// Verifier for Midtrans notification signatures.
///
/// Holds the merchant server key as an explicit value so the verifier is
/// unit-testable without any configuration context.
pub struct SignatureVerifier {
    server_key: String,
}

impl SignatureVerifier {
    /// Creates a new verifier with the given server key.
    pub fn new(server_key: impl Into<String>) -> Self {
        Self {
            server_key: server_key.into(),
        }
    }

    /// Verifies the notification's signature.
    ///
    /// # Verification Steps
    ///
    /// 1. Reject outright if the server key is unset (fail closed)
    /// 2. Compute SHA-512 over order id + status code + gross amount + key
    /// 3. Decode the supplied hex signature
    /// 4. Compare digests in constant time
    ///
    /// The gross amount is used exactly as the gateway serialized it; the
    /// caller must never normalize or re-format it.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::InvalidSignature` on any mismatch, malformed
    /// hex, or missing server key. No state has been touched at this point.
    pub fn verify(&self, notification: &GatewayNotification) -> Result<(), WebhookError> {
        if self.server_key.is_empty() {
            return Err(WebhookError::InvalidSignature);
        }

        let expected = self.compute_digest(
            &notification.order_id,
            &notification.status_code,
            &notification.gross_amount,
        );

        let supplied = match hex::decode(&notification.signature_key) {
            Ok(bytes) => bytes,
            Err(_) => return Err(WebhookError::InvalidSignature),
        };

        if !constant_time_compare(&expected, &supplied) {
            return Err(WebhookError::InvalidSignature);
        }

        Ok(())
    }

    /// Computes the SHA-512 digest for the signed tuple.
    fn compute_digest(&self, order_id: &str, status_code: &str, gross_amount: &str) -> Vec<u8> {
        let mut hasher = Sha512::new();
        hasher.update(order_id.as_bytes());
        hasher.update(status_code.as_bytes());
        hasher.update(gross_amount.as_bytes());
        hasher.update(self.server_key.as_bytes());
        hasher.finalize().to_vec()
    }
}

/// Performs constant-time comparison of two byte slices.
///
/// This prevents timing attacks that could leak information about the
/// expected digest.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes a valid hex signature for use in test fixtures.
#[cfg(test)]
pub fn compute_test_signature(
    server_key: &str,
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reconciliation::notification::fixtures::settlement_payload;
    use serde_json::json;

    const TEST_KEY: &str = "SB-Mid-server-test_key_12345";

    fn signed_notification(order_id: &str, gross_amount: &str) -> GatewayNotification {
        let mut raw = settlement_payload(order_id, gross_amount);
        raw["signature_key"] = json!(compute_test_signature(
            TEST_KEY,
            order_id,
            "200",
            gross_amount
        ));
        GatewayNotification::from_value(&raw).unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Signature Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verify_valid_signature() {
        let verifier = SignatureVerifier::new(TEST_KEY);
        let notification = signed_notification("SUB-1-2-123", "10000.00");

        assert!(verifier.verify(&notification).is_ok());
    }

    #[test]
    fn verify_tampered_signature_fails() {
        let verifier = SignatureVerifier::new(TEST_KEY);
        let mut notification = signed_notification("SUB-1-2-123", "10000.00");
        notification.signature_key = "a".repeat(128);

        assert!(matches!(
            verifier.verify(&notification),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn verify_wrong_server_key_fails() {
        let verifier = SignatureVerifier::new("SB-Mid-server-other_key");
        let notification = signed_notification("SUB-1-2-123", "10000.00");

        assert!(matches!(
            verifier.verify(&notification),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn verify_tampered_gross_amount_fails() {
        let verifier = SignatureVerifier::new(TEST_KEY);
        let mut notification = signed_notification("SUB-1-2-123", "10000.00");
        // Signed over 10000.00, attacker claims 1.00
        notification.gross_amount = "1.00".to_string();

        assert!(matches!(
            verifier.verify(&notification),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn verify_tampered_order_id_fails() {
        let verifier = SignatureVerifier::new(TEST_KEY);
        let mut notification = signed_notification("SUB-1-2-123", "10000.00");
        notification.order_id = "SUB-9-9-999".to_string();

        assert!(matches!(
            verifier.verify(&notification),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn verify_reformatted_gross_amount_fails() {
        // "10000.00" and "10000.0" are the same number but different bytes;
        // the digest covers bytes, so the comparison must fail
        let verifier = SignatureVerifier::new(TEST_KEY);
        let mut notification = signed_notification("SUB-1-2-123", "10000.00");
        notification.gross_amount = "10000.0".to_string();

        assert!(verifier.verify(&notification).is_err());
    }

    #[test]
    fn verify_non_hex_signature_fails() {
        let verifier = SignatureVerifier::new(TEST_KEY);
        let mut notification = signed_notification("SUB-1-2-123", "10000.00");
        notification.signature_key = "not-hex-at-all".to_string();

        assert!(matches!(
            verifier.verify(&notification),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn verify_truncated_signature_fails() {
        let verifier = SignatureVerifier::new(TEST_KEY);
        let mut notification = signed_notification("SUB-1-2-123", "10000.00");
        notification.signature_key.truncate(64);

        assert!(verifier.verify(&notification).is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // Fail-Closed Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn empty_server_key_rejects_even_matching_digest() {
        let verifier = SignatureVerifier::new("");
        let mut notification = signed_notification("SUB-1-2-123", "10000.00");
        // Digest computed over the empty key - must still reject
        notification.signature_key =
            compute_test_signature("", "SUB-1-2-123", "200", "10000.00");

        assert!(matches!(
            verifier.verify(&notification),
            Err(WebhookError::InvalidSignature)
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Constant Time Comparison Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn constant_time_compare_equal_values() {
        let a = vec![1, 2, 3, 4, 5];
        let b = vec![1, 2, 3, 4, 5];
        assert!(constant_time_compare(&a, &b));
    }

    #[test]
    fn constant_time_compare_different_values() {
        let a = vec![1, 2, 3, 4, 5];
        let b = vec![1, 2, 3, 4, 6];
        assert!(!constant_time_compare(&a, &b));
    }

    #[test]
    fn constant_time_compare_different_lengths() {
        let a = vec![1, 2, 3];
        let b = vec![1, 2, 3, 4];
        assert!(!constant_time_compare(&a, &b));
    }

    #[test]
    fn constant_time_compare_empty_slices() {
        let a: Vec<u8> = vec![];
        let b: Vec<u8> = vec![];
        assert!(constant_time_compare(&a, &b));
    }

    // ══════════════════════════════════════════════════════════════
    // Known-Vector Test
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn digest_matches_reference_concatenation() {
        // The digest must equal SHA-512 of the plain concatenation,
        // mirroring how the gateway documents the scheme
        let verifier = SignatureVerifier::new("key");
        let expected = verifier.compute_digest("order", "200", "10.00");

        let mut hasher = Sha512::new();
        hasher.update(b"order20010.00key");
        assert_eq!(expected, hasher.finalize().to_vec());
    }
}
