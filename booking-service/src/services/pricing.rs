//! Commission and pricing calculation.
//!
//! Pure functions: given a supplier's commission schedule and the requested
//! line items, produce the per-item breakdown and the booking-level pricing
//! snapshot. All amounts are rounded to 2 decimal places.

use anyhow::anyhow;
use rust_decimal::Decimal;
use service_core::error::AppError;
use thiserror::Error;

use crate::dtos::LineItemRequest;
use crate::models::booking::{LineItem, PricingSummary};
use crate::models::supplier::{CommissionModel, Supplier};

/// VAT is included in retail prices at a fixed 15%.
fn vat_rate() -> Decimal {
    Decimal::new(15, 2)
}

/// Selling a cent under the published retail rate is tolerated as rounding.
fn parity_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

/// Commission outcome for a single line.
#[derive(Debug, Clone)]
pub struct CommissionBreakdown {
    pub base_price: Decimal,
    pub quantity: u32,
    pub commission_rate: Decimal,
    pub commission_model: CommissionModel,
    pub commission_amount: Decimal,
    pub final_price: Decimal,
    pub partner_receives: Decimal,
}

#[derive(Debug, Error)]
#[error("selling price {selling_price} below retail rate {retail_rate}")]
pub struct RateParityViolation {
    pub retail_rate: Decimal,
    pub selling_price: Decimal,
}

/// Compute commission and settlement amounts for one line.
///
/// Under the discount model the commission is deducted from the supplier's
/// payout; under the rebate model the supplier is paid in full and owes the
/// commission back separately. The customer price is the same either way.
pub fn calculate_commission(
    supplier: &Supplier,
    service_type: &str,
    base_price: Decimal,
    quantity: u32,
) -> CommissionBreakdown {
    let commission_rate = supplier.commission.rate_for(service_type);
    let final_price = base_price * Decimal::from(quantity);
    let commission_amount = (final_price * commission_rate).round_dp(2);

    let partner_receives = match supplier.commission.model {
        CommissionModel::Discount => final_price - commission_amount,
        CommissionModel::Rebate => final_price,
    };

    CommissionBreakdown {
        base_price,
        quantity,
        commission_rate,
        commission_model: supplier.commission.model,
        commission_amount,
        final_price: final_price.round_dp(2),
        partner_receives: partner_receives.round_dp(2),
    }
}

/// Rate parity: the customer-facing price may never undercut the supplier's
/// published retail rate, beyond a 1-cent rounding tolerance. Suppliers that
/// do not enforce parity always pass.
pub fn validate_rate_parity(
    supplier: &Supplier,
    retail_rate: Decimal,
    selling_price: Decimal,
) -> Result<(), RateParityViolation> {
    if !supplier.rate_parity.enforce {
        return Ok(());
    }
    if selling_price >= retail_rate - parity_tolerance() {
        Ok(())
    } else {
        Err(RateParityViolation {
            retail_rate,
            selling_price,
        })
    }
}

/// Price a booking's line items and aggregate the booking-level snapshot.
///
/// Any line item failing rate parity aborts the whole computation; a booking
/// is never priced from a partial item list. VAT is backed out of the retail
/// total (`vat = retail − retail / 1.15`) rather than added on top, because
/// retail prices already include it.
pub fn price_line_items(
    supplier: &Supplier,
    items: &[LineItemRequest],
) -> Result<(Vec<LineItem>, PricingSummary), AppError> {
    let mut line_items = Vec::with_capacity(items.len());
    let mut base_total = Decimal::ZERO;
    let mut retail_total = Decimal::ZERO;
    let mut commission_total = Decimal::ZERO;
    let mut rebate_receivable = Decimal::ZERO;

    for item in items {
        if item.service_type.is_empty() || item.base_price <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow!(
                "invalid line item: missing serviceType or basePrice"
            )));
        }

        let quantity = item.quantity.unwrap_or(1);
        let nights = item.nights.unwrap_or(1);
        let retail_price = item.retail_price.unwrap_or(item.base_price);
        let description = item
            .description
            .clone()
            .unwrap_or_else(|| item.service_type.clone());

        let commission = calculate_commission(supplier, &item.service_type, item.base_price, quantity);

        validate_rate_parity(supplier, item.base_price, retail_price).map_err(|violation| {
            AppError::BadRequest(anyhow!(
                "rate parity violation on {}: {violation}",
                item.service_type
            ))
        })?;

        base_total += commission.base_price * Decimal::from(quantity);
        retail_total += commission.final_price;
        commission_total += commission.commission_amount;
        if commission.commission_model == CommissionModel::Rebate {
            rebate_receivable += commission.commission_amount;
        }

        line_items.push(LineItem {
            service_type: item.service_type.clone(),
            description,
            base_price: commission.base_price,
            retail_price,
            quantity,
            nights,
            commission_rate: commission.commission_rate,
            commission_model: commission.commission_model,
            commission_amount: commission.commission_amount,
            final_price: commission.final_price,
            partner_receives: commission.partner_receives,
            total_retail: commission.final_price,
            service_fee: commission.commission_amount,
        });
    }

    let vat = (retail_total - retail_total / (Decimal::ONE + vat_rate())).round_dp(2);
    let subtotal = (retail_total - vat).round_dp(2);

    let pricing = PricingSummary {
        base_total: base_total.round_dp(2),
        retail_total: retail_total.round_dp(2),
        commission_total: commission_total.round_dp(2),
        subtotal,
        vat,
        service_fee: commission_total.round_dp(2),
        total: retail_total.round_dp(2),
        rebate_receivable: rebate_receivable.round_dp(2),
        item_count: items.len(),
    };

    Ok((line_items, pricing))
}
