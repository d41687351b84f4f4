//! Payment processor integrations.
//!
//! Each processor verifies webhook authenticity its own way and speaks its
//! own event vocabulary; the [`PaymentProcessor`] capability normalizes both
//! so the reconciliation state machine stays processor-agnostic.

pub mod payfast;
pub mod yoco;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;

use crate::models::booking::{PaymentStatus, ProcessorKind};

pub use payfast::PayFastProcessor;
pub use yoco::YocoProcessor;

/// A webhook exactly as the transport received it: raw body, the signature
/// header when the processor uses one, and the caller's address for the
/// audit trail.
#[derive(Debug, Clone)]
pub struct WebhookDelivery {
    pub body: String,
    pub signature_header: Option<String>,
    pub source_ip: String,
    pub received_at: DateTime<Utc>,
}

impl WebhookDelivery {
    pub fn new(body: impl Into<String>, signature_header: Option<String>, source_ip: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            signature_header,
            source_ip: source_ip.into(),
            received_at: Utc::now(),
        }
    }
}

/// A processor's event vocabulary mapped onto the booking payment states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedStatus {
    Paid,
    Pending,
    Failed,
    /// Event types the platform does not act on.
    Ignored,
}

impl MappedStatus {
    pub fn as_payment_status(self) -> Option<PaymentStatus> {
        match self {
            MappedStatus::Paid => Some(PaymentStatus::Paid),
            MappedStatus::Pending => Some(PaymentStatus::Pending),
            MappedStatus::Failed => Some(PaymentStatus::Failed),
            MappedStatus::Ignored => None,
        }
    }
}

/// A verified webhook reduced to what reconciliation needs.
#[derive(Debug, Clone)]
pub struct ReconciliationEvent {
    pub processor: ProcessorKind,
    pub event_type: String,
    pub booking_ref: Option<String>,
    pub transaction_id: Option<String>,
    /// Reported paid amount in currency units, when the event carries one.
    pub amount: Option<Decimal>,
    pub status: MappedStatus,
}

pub trait PaymentProcessor: Send + Sync {
    fn kind(&self) -> ProcessorKind;

    /// Authenticate a delivery. `Ok(false)` and `Err` are both treated as
    /// rejection by the caller; `Err` additionally carries the parse failure
    /// for logging.
    fn verify_signature(&self, delivery: &WebhookDelivery) -> Result<bool, AppError>;

    /// Reduce an authenticated delivery to a [`ReconciliationEvent`].
    fn parse_event(&self, delivery: &WebhookDelivery) -> Result<ReconciliationEvent, AppError>;
}
