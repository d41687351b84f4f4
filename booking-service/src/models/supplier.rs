//! Supplier reference data.
//!
//! Suppliers are read-only configuration loaded before booking creation:
//! commission schedules, payment terms, and cancellation policies keyed by
//! booking category. Everything a booking needs from its supplier is
//! snapshotted into the booking at creation time, so later edits to a
//! supplier never alter existing bookings.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default booking category used when a supplier has no terms for the
/// requested one.
pub const DEFAULT_BOOKING_TYPE: &str = "FIT";

/// How the platform's commission is settled with the supplier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionModel {
    /// Commission is deducted from what the supplier receives.
    #[default]
    Discount,
    /// Supplier is paid in full and rebates the commission out-of-band.
    Rebate,
}

impl CommissionModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionModel::Discount => "discount",
            CommissionModel::Rebate => "rebate",
        }
    }
}

/// Per-service-type commission rates plus the settlement model.
///
/// Serialized flat, the way supplier config files carry it:
/// `{ "model": "discount", "accommodation": "0.10", "conference": "0.15" }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommissionSchedule {
    #[serde(default)]
    pub model: CommissionModel,
    #[serde(flatten)]
    pub rates: HashMap<String, Decimal>,
}

impl CommissionSchedule {
    /// Rate for a service type; unknown types earn no commission.
    pub fn rate_for(&self, service_type: &str) -> Decimal {
        self.rates
            .get(service_type)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

/// Payment terms for one booking category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTerms {
    /// Fraction of the retail total due as a deposit.
    pub deposit: Decimal,
    /// Days from booking creation until the deposit is due.
    pub due_days: i64,
    /// Days before check-in the balance is due, if the category has a
    /// balance window at all.
    #[serde(default)]
    pub balance_due_days: Option<i64>,
}

/// One tier of a cancellation policy: cancelling at least `days_before`
/// days ahead of check-in refunds `refund` of the amount paid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationTier {
    pub days_before: i64,
    pub refund: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateParity {
    /// When false, rate-parity validation always passes for this supplier.
    pub enforce: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplierStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub commission: CommissionSchedule,
    /// Payment terms keyed by booking category (e.g. `FIT`, `Groups`).
    pub payment_terms: HashMap<String, PaymentTerms>,
    /// Cancellation tiers keyed by booking category.
    pub cancellation_policy: HashMap<String, Vec<CancellationTier>>,
    #[serde(default)]
    pub rate_parity: RateParity,
    #[serde(default)]
    pub status: SupplierStatus,
}

impl Supplier {
    /// Payment terms for a booking category, falling back to the default
    /// category when the specific one is absent.
    pub fn payment_terms_for(&self, booking_type: &str) -> Option<&PaymentTerms> {
        self.payment_terms
            .get(booking_type)
            .or_else(|| self.payment_terms.get(DEFAULT_BOOKING_TYPE))
    }

    /// Cancellation tiers for a booking category, with the same fallback.
    pub fn cancellation_policy_for(&self, booking_type: &str) -> Option<&[CancellationTier]> {
        self.cancellation_policy
            .get(booking_type)
            .or_else(|| self.cancellation_policy.get(DEFAULT_BOOKING_TYPE))
            .map(Vec::as_slice)
    }
}
