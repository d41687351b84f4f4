//! Yoco integration.
//!
//! Yoco webhooks are JSON bodies signed with an HMAC-SHA256 of the raw
//! payload, delivered in the `X-Yoco-Signature` header and compared in
//! constant time. Amounts arrive in integer minor units (cents).

use anyhow::anyhow;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Deserialize;
use service_core::error::AppError;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::YocoConfig;
use crate::models::booking::ProcessorKind;
use crate::services::processors::{
    MappedStatus, PaymentProcessor, ReconciliationEvent, WebhookDelivery,
};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct YocoProcessor {
    config: YocoConfig,
}

/// Yoco webhook envelope.
#[derive(Debug, Deserialize)]
pub struct YocoEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: YocoEventData,
}

#[derive(Debug, Default, Deserialize)]
pub struct YocoEventData {
    /// Checkout id.
    #[serde(default)]
    pub id: Option<String>,
    /// Amount in minor units (cents).
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default, rename = "chargeId")]
    pub charge_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<YocoMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct YocoMetadata {
    #[serde(default, rename = "bookingId")]
    pub booking_id: Option<String>,
}

impl YocoProcessor {
    pub fn new(config: YocoConfig) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty() && !self.config.public_key.is_empty()
    }

    /// HMAC-SHA256 of a raw body under the webhook secret, hex-encoded.
    pub fn compute_signature(&self, body: &str) -> Result<String, AppError> {
        let mut mac =
            HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
                .map_err(|_| AppError::ConfigError(anyhow!("invalid webhook secret length")))?;
        mac.update(body.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl PaymentProcessor for YocoProcessor {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Yoco
    }

    fn verify_signature(&self, delivery: &WebhookDelivery) -> Result<bool, AppError> {
        if self.config.webhook_secret.expose_secret().is_empty() {
            return Ok(false);
        }
        let Some(signature) = delivery.signature_header.as_deref() else {
            return Ok(false);
        };

        let expected = self.compute_signature(&delivery.body)?;
        let expected_bytes = expected.as_bytes();
        let signature_bytes = signature.as_bytes();
        if expected_bytes.len() != signature_bytes.len() {
            return Ok(false);
        }
        Ok(expected_bytes.ct_eq(signature_bytes).into())
    }

    fn parse_event(&self, delivery: &WebhookDelivery) -> Result<ReconciliationEvent, AppError> {
        let event: YocoEvent = serde_json::from_str(&delivery.body)
            .map_err(|e| AppError::BadRequest(anyhow!("invalid webhook payload: {e}")))?;

        let status = match event.event_type.as_str() {
            "checkout.completed" | "checkout.paid" | "charge.succeeded" => MappedStatus::Paid,
            "charge.failed" => MappedStatus::Failed,
            _ => MappedStatus::Ignored,
        };

        let booking_ref = event
            .data
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.booking_id.clone())
            .or_else(|| event.data.reference.clone());

        // Minor units to currency units.
        let amount = Decimal::from(event.data.amount.unwrap_or(0)) / Decimal::from(100);

        Ok(ReconciliationEvent {
            processor: ProcessorKind::Yoco,
            event_type: event.event_type,
            booking_ref,
            transaction_id: event.data.charge_id.clone().or_else(|| event.data.id.clone()),
            amount: Some(amount),
            status,
        })
    }
}
