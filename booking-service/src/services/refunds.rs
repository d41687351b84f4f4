//! Cancellation refund evaluation.
//!
//! Read-only: evaluates a supplier's tiered cancellation policy against the
//! notice given (whole days before check-in, rounded up). Persisting the
//! result onto a cancelled booking is the ledger's job.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;

use crate::models::booking::{Booking, RefundBreakdown};
use crate::models::supplier::{CancellationTier, Supplier};

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days of notice before check-in, rounded up. Negative once the
/// check-in date has passed.
pub fn days_until_checkin(check_in: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    ceil_div((check_in - now).num_seconds(), SECONDS_PER_DAY)
}

fn ceil_div(numerator: i64, denominator: i64) -> i64 {
    let quotient = numerator / denominator;
    if numerator % denominator > 0 {
        quotient + 1
    } else {
        quotient
    }
}

/// Refund ratio for the given notice. Tiers are sorted descending by
/// `days_before` before matching, so a mis-ordered policy still resolves the
/// most-notice tier first; the first tier whose threshold the notice meets
/// wins, and no matching tier means no refund.
pub fn refund_rate_for(tiers: &[CancellationTier], days_before: i64) -> Decimal {
    let mut ordered: Vec<&CancellationTier> = tiers.iter().collect();
    ordered.sort_by(|a, b| b.days_before.cmp(&a.days_before));

    for tier in ordered {
        if days_before >= tier.days_before {
            return tier.refund;
        }
    }
    Decimal::ZERO
}

/// Evaluate the refund due if `booking` were cancelled at `now`.
pub fn refund_breakdown(
    booking: &Booking,
    supplier: &Supplier,
    now: DateTime<Utc>,
) -> Result<RefundBreakdown, AppError> {
    let days_before = days_until_checkin(booking.check_in_date, now);

    let policy = supplier
        .cancellation_policy_for(&booking.booking_type)
        .ok_or_else(|| {
            AppError::ConfigError(anyhow!(
                "supplier {} has no cancellation policy for {}",
                supplier.id,
                booking.booking_type
            ))
        })?;

    let refund_rate = refund_rate_for(policy, days_before);
    let total_paid = booking.pricing.total;
    let refund_amount = (total_paid * refund_rate).round_dp(2);

    Ok(RefundBreakdown {
        booking_id: booking.id.clone(),
        supplier_id: booking.supplier_id.clone(),
        booking_type: booking.booking_type.clone(),
        check_in_date: booking.check_in_date,
        days_before,
        refund_rate,
        total_paid,
        refund_amount,
        non_refundable_amount: (total_paid - refund_amount).round_dp(2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tiers() -> Vec<CancellationTier> {
        vec![
            CancellationTier {
                days_before: 30,
                refund: dec!(1.0),
            },
            CancellationTier {
                days_before: 7,
                refund: dec!(0.5),
            },
            CancellationTier {
                days_before: 0,
                refund: dec!(0),
            },
        ]
    }

    #[test]
    fn first_matching_tier_wins() {
        let tiers = tiers();
        assert_eq!(refund_rate_for(&tiers, 31), dec!(1.0));
        assert_eq!(refund_rate_for(&tiers, 30), dec!(1.0));
        assert_eq!(refund_rate_for(&tiers, 7), dec!(0.5));
        assert_eq!(refund_rate_for(&tiers, 6), dec!(0));
    }

    #[test]
    fn tiers_are_sorted_before_matching() {
        // Same policy supplied out of order still resolves most-notice first.
        let mut shuffled = tiers();
        shuffled.reverse();
        assert_eq!(refund_rate_for(&shuffled, 31), dec!(1.0));
        assert_eq!(refund_rate_for(&shuffled, 7), dec!(0.5));
    }

    #[test]
    fn no_matching_tier_means_no_refund() {
        let tiers = vec![CancellationTier {
            days_before: 14,
            refund: dec!(1.0),
        }];
        assert_eq!(refund_rate_for(&tiers, 3), dec!(0));
        assert_eq!(refund_rate_for(&tiers, -2), dec!(0));
    }

    #[test]
    fn notice_is_rounded_up_to_whole_days() {
        let check_in = "2025-06-15T12:00:00Z".parse().unwrap();

        let now = "2025-06-08T12:00:00Z".parse().unwrap();
        assert_eq!(days_until_checkin(check_in, now), 7);

        // A second past the boundary still counts as 7 days of notice.
        let now = "2025-06-08T12:00:01Z".parse().unwrap();
        assert_eq!(days_until_checkin(check_in, now), 7);

        let now = "2025-06-09T12:00:00Z".parse().unwrap();
        assert_eq!(days_until_checkin(check_in, now), 6);
    }
}
