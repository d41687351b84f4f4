//! Booking entities.
//!
//! A booking's pricing and payment-terms snapshots are computed once at
//! creation and never recomputed; only payment state, lifecycle status and
//! their timestamps mutate afterwards.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::supplier::CommissionModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

/// Payment processors whose webhooks the platform reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    Payfast,
    Yoco,
}

impl ProcessorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorKind::Payfast => "payfast",
            ProcessorKind::Yoco => "yoco",
        }
    }
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One priced service line on a booking. Immutable once the booking exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub service_type: String,
    pub description: String,
    pub base_price: Decimal,
    pub retail_price: Decimal,
    pub quantity: u32,
    pub nights: u32,
    pub commission_rate: Decimal,
    pub commission_model: CommissionModel,
    pub commission_amount: Decimal,
    /// What the customer is charged for this line.
    pub final_price: Decimal,
    /// What the supplier ultimately receives for this line.
    pub partner_receives: Decimal,
    pub total_retail: Decimal,
    pub service_fee: Decimal,
}

/// Booking-level pricing snapshot. VAT is backed out of the retail total
/// (prices are VAT-inclusive), not summed from line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingSummary {
    pub base_total: Decimal,
    pub retail_total: Decimal,
    pub commission_total: Decimal,
    /// VAT-exclusive subtotal.
    pub subtotal: Decimal,
    pub vat: Decimal,
    pub service_fee: Decimal,
    pub total: Decimal,
    /// Commission owed back by the supplier under the rebate model;
    /// zero under the discount model.
    pub rebate_receivable: Decimal,
    pub item_count: usize,
}

/// Supplier payment terms as applied to this booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTermsSnapshot {
    pub deposit: Decimal,
    pub due_days: i64,
    pub balance_due_days: Option<i64>,
    pub deposit_due_date: DateTime<Utc>,
    pub balance_due_date: Option<DateTime<Utc>>,
    pub deposit_amount: Decimal,
    pub balance_amount: Decimal,
}

/// Refund evaluation for a cancellation, snapshotted onto the booking when
/// it is cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundBreakdown {
    pub booking_id: String,
    pub supplier_id: String,
    pub booking_type: String,
    pub check_in_date: DateTime<Utc>,
    pub days_before: i64,
    pub refund_rate: Decimal,
    pub total_paid: Decimal,
    pub refund_amount: Decimal,
    pub non_refundable_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub supplier_id: String,
    pub user_id: String,
    pub booking_type: String,
    pub check_in_date: DateTime<Utc>,
    pub check_out_date: DateTime<Utc>,
    pub line_items: Vec<LineItem>,
    pub pricing: PricingSummary,
    pub payment_terms: PaymentTermsSnapshot,
    pub payment_status: PaymentStatus,
    /// Processor transaction reference; doubles as the webhook dedup key.
    pub payment_id: Option<String>,
    pub payment_processor: Option<ProcessorKind>,
    pub paid_at: Option<DateTime<Utc>>,
    pub last_payment_update: Option<DateTime<Utc>>,
    pub status: BookingStatus,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub refund: Option<RefundBreakdown>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Customer email carried in booking metadata, when the caller supplied
    /// one at creation.
    pub fn customer_email(&self) -> Option<&str> {
        self.metadata.get("customerEmail").and_then(|v| v.as_str())
    }
}

/// Shallow patch applied by [`crate::services::ledger::BookingLedger::update_booking`].
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    pub payment_status: Option<PaymentStatus>,
    pub payment_id: Option<String>,
    pub payment_processor: Option<ProcessorKind>,
    pub paid_at: Option<DateTime<Utc>>,
    pub last_payment_update: Option<DateTime<Utc>>,
    pub status: Option<BookingStatus>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub refund: Option<RefundBreakdown>,
    pub metadata: Option<serde_json::Value>,
}

impl BookingPatch {
    pub fn apply(&self, booking: &mut Booking) {
        if let Some(payment_status) = self.payment_status {
            booking.payment_status = payment_status;
        }
        if let Some(payment_id) = &self.payment_id {
            booking.payment_id = Some(payment_id.clone());
        }
        if let Some(processor) = self.payment_processor {
            booking.payment_processor = Some(processor);
        }
        if let Some(paid_at) = self.paid_at {
            booking.paid_at = Some(paid_at);
        }
        if let Some(last_payment_update) = self.last_payment_update {
            booking.last_payment_update = Some(last_payment_update);
        }
        if let Some(status) = self.status {
            booking.status = status;
        }
        if let Some(cancelled_at) = self.cancelled_at {
            booking.cancelled_at = Some(cancelled_at);
        }
        if let Some(reason) = &self.cancellation_reason {
            booking.cancellation_reason = Some(reason.clone());
        }
        if let Some(refund) = &self.refund {
            booking.refund = Some(refund.clone());
        }
        if let Some(metadata) = &self.metadata {
            booking.metadata = metadata.clone();
        }
    }
}
