//! PayFast integration.
//!
//! PayFast delivers ITNs (Instant Transaction Notifications) as form-encoded
//! key/value bodies signed with an MD5 hash of the alphabetically sorted,
//! URL-encoded parameter string, optionally salted with a merchant
//! passphrase. The same canonicalization signs outbound hosted-checkout
//! URLs, so both directions share one implementation.

use std::collections::BTreeMap;

use anyhow::anyhow;
use md5::{Digest, Md5};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use service_core::error::AppError;

use crate::config::PayFastConfig;
use crate::models::booking::ProcessorKind;
use crate::services::processors::{
    MappedStatus, PaymentProcessor, ReconciliationEvent, WebhookDelivery,
};

const SANDBOX_PROCESS_URL: &str = "https://sandbox.payfast.co.za/eng/process";
const LIVE_PROCESS_URL: &str = "https://www.payfast.co.za/eng/process";

#[derive(Clone)]
pub struct PayFastProcessor {
    config: PayFastConfig,
}

/// Parameters for building a hosted-checkout redirect.
#[derive(Debug, Clone)]
pub struct CheckoutParams {
    pub booking_id: String,
    pub amount: Decimal,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub item_name: Option<String>,
}

impl PayFastProcessor {
    pub fn new(config: PayFastConfig) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.merchant_id.is_empty() && !self.config.merchant_key.is_empty()
    }

    /// MD5 signature over the canonical parameter string for a parameter
    /// set, salted with the merchant passphrase when one is configured.
    pub fn sign(&self, params: &BTreeMap<String, String>) -> String {
        let param_string = canonical_param_string(params);
        let payload = match self.config.passphrase.expose_secret() {
            p if p.is_empty() => param_string,
            p => format!("{param_string}&passphrase={}", pf_encode(p)),
        };
        hex::encode(Md5::digest(payload.as_bytes()))
    }

    /// Hosted-checkout URL for a booking payment.
    pub fn checkout_redirect(&self, params: &CheckoutParams) -> Result<String, AppError> {
        if !self.is_configured() {
            return Err(AppError::ConfigError(anyhow!(
                "PayFast merchant credentials not configured"
            )));
        }

        let base_url = if self.config.sandbox {
            SANDBOX_PROCESS_URL
        } else {
            LIVE_PROCESS_URL
        };

        let item_name = params
            .item_name
            .clone()
            .unwrap_or_else(|| format!("Booking {}", params.booking_id));

        let mut data = BTreeMap::new();
        data.insert("merchant_id".to_string(), self.config.merchant_id.clone());
        data.insert("merchant_key".to_string(), self.config.merchant_key.clone());
        data.insert("return_url".to_string(), self.config.return_url.clone());
        data.insert("cancel_url".to_string(), self.config.cancel_url.clone());
        data.insert("notify_url".to_string(), self.config.notify_url.clone());
        data.insert("name_first".to_string(), params.first_name.clone());
        data.insert("name_last".to_string(), params.last_name.clone());
        data.insert("email_address".to_string(), params.email.clone());
        data.insert("m_payment_id".to_string(), params.booking_id.clone());
        data.insert("amount".to_string(), params.amount.round_dp(2).to_string());
        data.insert("item_name".to_string(), item_name);
        data.insert(
            "item_description".to_string(),
            format!("Booking {}", params.booking_id),
        );

        let signature = self.sign(&data);
        let query = canonical_param_string(&data);
        Ok(format!("{base_url}?{query}&signature={signature}"))
    }

    fn parse_body(&self, body: &str) -> Result<BTreeMap<String, String>, AppError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(body)
            .map_err(|e| AppError::BadRequest(anyhow!("malformed ITN body: {e}")))?;
        Ok(pairs.into_iter().collect())
    }
}

impl PaymentProcessor for PayFastProcessor {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Payfast
    }

    fn verify_signature(&self, delivery: &WebhookDelivery) -> Result<bool, AppError> {
        let mut params = self.parse_body(&delivery.body)?;
        let Some(signature) = params.remove("signature") else {
            return Ok(false);
        };
        Ok(self.sign(&params) == signature.to_lowercase())
    }

    fn parse_event(&self, delivery: &WebhookDelivery) -> Result<ReconciliationEvent, AppError> {
        let params = self.parse_body(&delivery.body)?;

        let payment_status = params
            .get("payment_status")
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());

        // PayFast has no ignorable event types: anything that is not
        // COMPLETE or in flight is a failure.
        let status = match payment_status.as_str() {
            "COMPLETE" => MappedStatus::Paid,
            "PENDING" | "PROCESSING" => MappedStatus::Pending,
            _ => MappedStatus::Failed,
        };

        Ok(ReconciliationEvent {
            processor: ProcessorKind::Payfast,
            event_type: payment_status,
            booking_ref: params.get("m_payment_id").cloned(),
            transaction_id: params.get("pf_payment_id").cloned(),
            amount: params
                .get("amount_gross")
                .and_then(|raw| raw.parse::<Decimal>().ok()),
            status,
        })
    }
}

/// Canonical parameter string: keys sorted alphabetically (the `BTreeMap`
/// ordering), values URL-encoded with spaces as `+`, joined with `&`. The
/// `signature` key never participates.
fn canonical_param_string(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .filter(|(key, _)| key.as_str() != "signature")
        .map(|(key, value)| format!("{key}={}", pf_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encoding that matches what PayFast signs against: unreserved
/// characters plus `!~*'()` pass through, spaces become `+`, everything
/// else is uppercase-hex escaped.
fn pf_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => encoded.push(byte as char),
            b' ' => encoded.push('+'),
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use secrecy::Secret;

    fn test_config(passphrase: &str) -> PayFastConfig {
        PayFastConfig {
            merchant_id: "10000100".to_string(),
            merchant_key: "46f0cd694581a".to_string(),
            passphrase: Secret::new(passphrase.to_string()),
            sandbox: true,
            return_url: "https://example.test/pay/success".to_string(),
            cancel_url: "https://example.test/pay/cancel".to_string(),
            notify_url: "https://example.test/api/webhooks/payfast".to_string(),
        }
    }

    fn signed_body(processor: &PayFastProcessor, pairs: &[(&str, &str)]) -> String {
        let params: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let signature = processor.sign(&params);
        let mut all: Vec<(String, String)> = params.into_iter().collect();
        all.push(("signature".to_string(), signature));
        serde_urlencoded::to_string(all).unwrap()
    }

    fn delivery(body: String) -> WebhookDelivery {
        WebhookDelivery {
            body,
            signature_header: None,
            source_ip: "196.33.227.225".to_string(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn encodes_like_the_signature_expects() {
        assert_eq!(pf_encode("Booking BK-1"), "Booking+BK-1");
        assert_eq!(pf_encode("a@b.co"), "a%40b.co");
        assert_eq!(pf_encode("it's (fine)!"), "it's+(fine)!");
    }

    #[test]
    fn verifies_a_correctly_signed_itn() {
        let processor = PayFastProcessor::new(test_config("jt7NOE43FZPn"));
        let body = signed_body(
            &processor,
            &[
                ("m_payment_id", "BK-ABC123"),
                ("pf_payment_id", "1089250"),
                ("payment_status", "COMPLETE"),
                ("amount_gross", "200.00"),
            ],
        );

        assert!(processor.verify_signature(&delivery(body)).unwrap());
    }

    #[test]
    fn rejects_a_tampered_field() {
        let processor = PayFastProcessor::new(test_config("jt7NOE43FZPn"));
        let body = signed_body(
            &processor,
            &[
                ("m_payment_id", "BK-ABC123"),
                ("pf_payment_id", "1089250"),
                ("payment_status", "COMPLETE"),
                ("amount_gross", "200.00"),
            ],
        );
        let tampered = body.replace("200.00", "1.00");

        assert!(!processor.verify_signature(&delivery(tampered)).unwrap());
    }

    #[test]
    fn passphrase_salts_the_signature() {
        let params: BTreeMap<String, String> =
            [("m_payment_id".to_string(), "BK-1".to_string())].into();

        let unsalted = PayFastProcessor::new(test_config("")).sign(&params);
        let salted = PayFastProcessor::new(test_config("jt7NOE43FZPn")).sign(&params);
        assert_ne!(unsalted, salted);
    }

    #[test]
    fn missing_signature_field_fails_verification() {
        let processor = PayFastProcessor::new(test_config(""));
        let body = "m_payment_id=BK-1&payment_status=COMPLETE".to_string();
        assert!(!processor.verify_signature(&delivery(body)).unwrap());
    }

    #[test]
    fn maps_payment_statuses() {
        let processor = PayFastProcessor::new(test_config(""));

        for (raw, expected) in [
            ("COMPLETE", MappedStatus::Paid),
            ("PENDING", MappedStatus::Pending),
            ("PROCESSING", MappedStatus::Pending),
            ("FAILED", MappedStatus::Failed),
            ("CANCELLED", MappedStatus::Failed),
            ("SOMETHING_ELSE", MappedStatus::Failed),
        ] {
            let body = format!("m_payment_id=BK-1&payment_status={raw}");
            let event = processor.parse_event(&delivery(body)).unwrap();
            assert_eq!(event.status, expected, "status {raw}");
        }
    }

    #[test]
    fn checkout_redirect_is_signed_and_sorted() {
        let processor = PayFastProcessor::new(test_config("jt7NOE43FZPn"));
        let url = processor
            .checkout_redirect(&CheckoutParams {
                booking_id: "BK-ABC123".to_string(),
                amount: Decimal::new(150050, 2),
                email: "guest@example.test".to_string(),
                first_name: "Thandi".to_string(),
                last_name: "Nkosi".to_string(),
                item_name: None,
            })
            .unwrap();

        assert!(url.starts_with(SANDBOX_PROCESS_URL));
        assert!(url.contains("amount=1500.50"));
        assert!(url.contains("m_payment_id=BK-ABC123"));
        assert!(url.contains("&signature="));
        // The query keys are emitted in canonical (sorted) order.
        let amount_pos = url.find("amount=").unwrap();
        let merchant_pos = url.find("merchant_id=").unwrap();
        assert!(amount_pos < merchant_pos);
    }

    #[test]
    fn checkout_requires_merchant_credentials() {
        let mut config = test_config("");
        config.merchant_id.clear();
        let processor = PayFastProcessor::new(config);

        let err = processor
            .checkout_redirect(&CheckoutParams {
                booking_id: "BK-1".to_string(),
                amount: Decimal::new(100, 0),
                email: "guest@example.test".to_string(),
                first_name: "A".to_string(),
                last_name: "B".to_string(),
                item_name: None,
            })
            .unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
