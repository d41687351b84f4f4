//! Payment reconciliation state machine.
//!
//! Consumes webhook deliveries from the registered processors and drives
//! booking payment state: `pending → paid` or `pending → failed`, where a
//! later success may still recover a failed booking but a paid booking is
//! never reverted. Processors redeliver at-least-once, so the processor
//! transaction id doubles as a dedup key and replays short-circuit before
//! any side effect.
//!
//! Anomalies (unknown booking, amount mismatch) are acknowledged to the
//! caller — a processor retrying them forever helps nobody — but every
//! event lands in the audit log before the handler returns.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use dashmap::DashMap;
use rust_decimal::Decimal;
use service_core::error::AppError;

use crate::models::booking::{BookingPatch, PaymentStatus, ProcessorKind};
use crate::services::audit::{AuditOutcome, PaymentAuditLog, PaymentAuditRecord};
use crate::services::ledger::BookingLedger;
use crate::services::metrics;
use crate::services::notifications::{NotificationService, PaymentReceipt};
use crate::services::processors::{PaymentProcessor, ReconciliationEvent, WebhookDelivery};

/// What the transport should answer the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookAck {
    /// Acknowledge receipt (200-equivalent); stops redelivery.
    Ok,
    /// Signature rejection (400-equivalent).
    BadSignature,
}

pub struct ReconciliationService {
    ledger: Arc<BookingLedger>,
    audit: Arc<dyn PaymentAuditLog>,
    notifier: Arc<dyn NotificationService>,
    processors: HashMap<ProcessorKind, Arc<dyn PaymentProcessor>>,
    /// Serializes mutation per booking id: two racing deliveries for the
    /// same booking take turns through lookup → check → apply → notify.
    booking_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

/// Amounts within a cent of the expected total reconcile.
fn amount_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

impl ReconciliationService {
    pub fn new(
        ledger: Arc<BookingLedger>,
        audit: Arc<dyn PaymentAuditLog>,
        notifier: Arc<dyn NotificationService>,
    ) -> Self {
        Self {
            ledger,
            audit,
            notifier,
            processors: HashMap::new(),
            booking_locks: DashMap::new(),
        }
    }

    pub fn register_processor(&mut self, processor: Arc<dyn PaymentProcessor>) {
        self.processors.insert(processor.kind(), processor);
    }

    /// Process one webhook delivery end to end.
    pub async fn process(
        &self,
        kind: ProcessorKind,
        delivery: WebhookDelivery,
    ) -> Result<WebhookAck, AppError> {
        let processor = self.processors.get(&kind).ok_or_else(|| {
            AppError::ConfigError(anyhow!("no processor registered for {kind}"))
        })?;

        // 1. Authenticate before anything else. An unverifiable body —
        // garbled or tampered — is rejected without touching any state.
        let verified = match processor.verify_signature(&delivery) {
            Ok(verified) => verified,
            Err(e) => {
                tracing::warn!(processor = %kind, error = %e, "webhook verification error");
                false
            }
        };
        if !verified {
            tracing::warn!(processor = %kind, "webhook signature verification failed");
            let hint = processor.parse_event(&delivery).ok();
            self.record(kind, &delivery, AuditOutcome::SignatureFailed, hint.as_ref(), None, None);
            return Ok(WebhookAck::BadSignature);
        }

        let event = match processor.parse_event(&delivery) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(processor = %kind, error = %e, "failed to parse webhook event");
                self.record(kind, &delivery, AuditOutcome::ParseFailed, None, None, None);
                return Ok(WebhookAck::Ok);
            }
        };

        // 2. Event types the platform does not act on are acknowledged
        // without a booking lookup.
        let Some(new_status) = event.status.as_payment_status() else {
            tracing::debug!(
                processor = %kind,
                event_type = %event.event_type,
                "ignoring unhandled webhook event type"
            );
            self.record(kind, &delivery, AuditOutcome::Ignored, Some(&event), None, None);
            return Ok(WebhookAck::Ok);
        };

        let Some(booking_id) = event.booking_ref.clone() else {
            tracing::warn!(processor = %kind, event_type = %event.event_type, "webhook carries no booking reference");
            self.record(kind, &delivery, AuditOutcome::MissingReference, Some(&event), None, None);
            return Ok(WebhookAck::Ok);
        };

        let lock = self
            .booking_locks
            .entry(booking_id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .value()
            .clone();
        let _guard = lock.lock().await;

        // 3. Resolve the booking. An unknown reference is not the caller's
        // fault to retry endlessly: acknowledge, log, move on.
        let booking = match self.ledger.get_booking(&booking_id).await {
            Ok(booking) => booking,
            Err(AppError::NotFound(_)) => {
                tracing::warn!(processor = %kind, booking_id = %booking_id, "booking not found for webhook");
                self.record(kind, &delivery, AuditOutcome::BookingNotFound, Some(&event), None, None);
                return Ok(WebhookAck::Ok);
            }
            Err(e) => return Err(e),
        };

        // 4. Reconcile the reported amount against the expected total.
        // A mismatch is suspicious, not an automatic failure: leave the
        // booking alone and flag it for manual review.
        let expected = booking.pricing.total;
        if let Some(received) = event.amount {
            if (received - expected).abs() > amount_tolerance() {
                tracing::warn!(
                    processor = %kind,
                    booking_id = %booking_id,
                    expected = %expected,
                    received = %received,
                    "webhook amount mismatch"
                );
                self.record(
                    kind,
                    &delivery,
                    AuditOutcome::AmountMismatch,
                    Some(&event),
                    Some(expected),
                    None,
                );
                return Ok(WebhookAck::Ok);
            }
        }

        // 5. Replay of an already-applied event: same transaction id, same
        // resulting status. Skip the apply and, crucially, the notification.
        if booking.payment_id.is_some()
            && booking.payment_id == event.transaction_id
            && booking.payment_status == new_status
        {
            tracing::info!(
                processor = %kind,
                booking_id = %booking_id,
                transaction_id = ?event.transaction_id,
                "duplicate webhook delivery, already applied"
            );
            self.record(kind, &delivery, AuditOutcome::Duplicate, Some(&event), None, Some(new_status));
            return Ok(WebhookAck::Ok);
        }

        // 6. Paid is terminal for this subsystem: a stale failure or
        // pending event never downgrades a settled booking.
        let was_paid = booking.payment_status == PaymentStatus::Paid;
        if was_paid && new_status != PaymentStatus::Paid {
            tracing::warn!(
                processor = %kind,
                booking_id = %booking_id,
                event_type = %event.event_type,
                "ignoring stale webhook for already-paid booking"
            );
            self.record(kind, &delivery, AuditOutcome::StaleEvent, Some(&event), None, Some(new_status));
            return Ok(WebhookAck::Ok);
        }

        // 7. Apply the transition.
        let mut patch = BookingPatch {
            payment_status: Some(new_status),
            payment_id: event.transaction_id.clone(),
            payment_processor: Some(kind),
            last_payment_update: Some(delivery.received_at),
            ..Default::default()
        };
        if new_status == PaymentStatus::Paid {
            patch.paid_at = Some(delivery.received_at);
        }
        let updated = self.ledger.update_booking(&booking_id, patch).await?;

        tracing::info!(
            processor = %kind,
            booking_id = %booking_id,
            status = new_status.as_str(),
            transaction_id = ?event.transaction_id,
            "payment state updated from webhook"
        );

        // 8. Confirmation and receipt go out once per transition to paid.
        // Notification failure must not disturb the already-applied payment
        // state or the acknowledgement to the processor.
        if new_status == PaymentStatus::Paid && !was_paid {
            match updated.customer_email() {
                Some(email) => {
                    let receipt = PaymentReceipt {
                        processor: kind,
                        amount: event.amount.unwrap_or(expected),
                        transaction_id: event.transaction_id.clone(),
                        paid_at: delivery.received_at,
                    };
                    if let Err(e) = self
                        .notifier
                        .send_booking_confirmation(&updated, email)
                        .await
                    {
                        tracing::error!(booking_id = %booking_id, error = %e, "failed to send booking confirmation");
                    }
                    if let Err(e) = self
                        .notifier
                        .send_payment_receipt(&updated, email, &receipt)
                        .await
                    {
                        tracing::error!(booking_id = %booking_id, error = %e, "failed to send payment receipt");
                    }
                }
                None => {
                    tracing::warn!(booking_id = %booking_id, "no customer email on booking, skipping notifications");
                }
            }
        }

        self.record(kind, &delivery, AuditOutcome::Applied, Some(&event), None, Some(new_status));
        Ok(WebhookAck::Ok)
    }

    fn record(
        &self,
        kind: ProcessorKind,
        delivery: &WebhookDelivery,
        outcome: AuditOutcome,
        event: Option<&ReconciliationEvent>,
        expected: Option<Decimal>,
        status: Option<PaymentStatus>,
    ) {
        metrics::record_webhook_event(kind.as_str(), outcome.as_str());
        self.audit.append(PaymentAuditRecord {
            ts: delivery.received_at,
            processor: kind,
            outcome,
            event_type: event.map(|e| e.event_type.clone()).unwrap_or_default(),
            booking_id: event.and_then(|e| e.booking_ref.clone()),
            transaction_id: event.and_then(|e| e.transaction_id.clone()),
            expected,
            received: event.and_then(|e| e.amount),
            status,
            source_ip: delivery.source_ip.clone(),
        });
    }
}
