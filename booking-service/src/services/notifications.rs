//! Customer notification collaborator.
//!
//! Confirmation and receipt delivery happen outside this crate; the
//! reconciliation state machine only needs an interface whose failures it
//! can log and swallow. Payment truth is never coupled to whether an email
//! went out.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;

use crate::models::booking::{Booking, ProcessorKind};

/// Details for a payment receipt.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub processor: ProcessorKind,
    pub amount: Decimal,
    pub transaction_id: Option<String>,
    pub paid_at: DateTime<Utc>,
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send_booking_confirmation(
        &self,
        booking: &Booking,
        email: &str,
    ) -> Result<(), AppError>;

    async fn send_payment_receipt(
        &self,
        booking: &Booking,
        email: &str,
        receipt: &PaymentReceipt,
    ) -> Result<(), AppError>;
}

/// Notifier that only logs; used where delivery is wired up elsewhere or
/// intentionally disabled.
pub struct NoopNotifier;

#[async_trait]
impl NotificationService for NoopNotifier {
    async fn send_booking_confirmation(
        &self,
        booking: &Booking,
        email: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(booking_id = %booking.id, email = %email, "skipping booking confirmation");
        Ok(())
    }

    async fn send_payment_receipt(
        &self,
        booking: &Booking,
        email: &str,
        receipt: &PaymentReceipt,
    ) -> Result<(), AppError> {
        tracing::debug!(
            booking_id = %booking.id,
            email = %email,
            processor = %receipt.processor,
            "skipping payment receipt"
        );
        Ok(())
    }
}
