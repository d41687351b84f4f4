//! Booking ledger: the sole writer of booking entities.
//!
//! Creation prices the request against supplier terms and persists the full
//! snapshot; afterwards only payment state and lifecycle status mutate, and
//! every mutation goes through a compare-and-swap retry loop so concurrent
//! writers for the same booking cannot lose updates.

use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::CreateBookingRequest;
use crate::models::booking::{
    Booking, BookingPatch, BookingStatus, PaymentStatus, PaymentTermsSnapshot,
};
use crate::services::store::VersionedStore;
use crate::services::suppliers::SupplierDirectory;
use crate::services::{metrics, pricing, refunds};

pub struct BookingLedger {
    store: Arc<dyn VersionedStore<Booking>>,
    suppliers: Arc<SupplierDirectory>,
}

fn new_booking_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("BK-{}", &uuid[..12])
}

impl BookingLedger {
    pub fn new(store: Arc<dyn VersionedStore<Booking>>, suppliers: Arc<SupplierDirectory>) -> Self {
        Self { store, suppliers }
    }

    pub async fn create_booking(&self, request: CreateBookingRequest) -> Result<Booking, AppError> {
        self.create_booking_at(request, Utc::now()).await
    }

    /// Validate, price and persist a new booking. Any line item failing rate
    /// parity aborts the whole creation; no partial booking is stored.
    pub async fn create_booking_at(
        &self,
        request: CreateBookingRequest,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        request.validate()?;

        let line_items = request.normalized_line_items();
        if line_items.is_empty() {
            return Err(AppError::BadRequest(anyhow!(
                "missing required booking fields (supplierId, userId, checkInDate, checkOutDate, lineItems)"
            )));
        }

        let supplier = self.suppliers.require(&request.supplier_id)?;
        let (items, pricing) = pricing::price_line_items(supplier, &line_items)?;

        let terms = supplier
            .payment_terms_for(&request.booking_type)
            .ok_or_else(|| {
                AppError::ConfigError(anyhow!(
                    "supplier {} has no payment terms for {}",
                    supplier.id,
                    request.booking_type
                ))
            })?;

        let deposit_due_date = now + Duration::days(terms.due_days);
        let balance_due_date = terms
            .balance_due_days
            .map(|days| request.check_in_date - Duration::days(days));
        let deposit_amount = (pricing.retail_total * terms.deposit).round_dp(2);
        let balance_amount = (pricing.retail_total - deposit_amount).round_dp(2);

        let booking = Booking {
            id: new_booking_id(),
            supplier_id: request.supplier_id.clone(),
            user_id: request.user_id.clone(),
            booking_type: request.booking_type.clone(),
            check_in_date: request.check_in_date,
            check_out_date: request.check_out_date,
            line_items: items,
            pricing,
            payment_terms: PaymentTermsSnapshot {
                deposit: terms.deposit,
                due_days: terms.due_days,
                balance_due_days: terms.balance_due_days,
                deposit_due_date,
                balance_due_date,
                deposit_amount,
                balance_amount,
            },
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            payment_processor: None,
            paid_at: None,
            last_payment_update: None,
            status: BookingStatus::Pending,
            cancelled_at: None,
            cancellation_reason: None,
            refund: None,
            metadata: request.metadata,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(&booking.id, booking.clone()).await?;
        metrics::record_booking_created(&booking.supplier_id);
        tracing::info!(
            booking_id = %booking.id,
            supplier_id = %booking.supplier_id,
            line_items = booking.line_items.len(),
            total = %booking.pricing.total,
            "booking created"
        );

        Ok(booking)
    }

    pub async fn get_booking(&self, booking_id: &str) -> Result<Booking, AppError> {
        self.store
            .get(booking_id)
            .await?
            .map(|versioned| versioned.value)
            .ok_or_else(|| AppError::NotFound(anyhow!("booking {booking_id} not found")))
    }

    /// Apply a shallow patch to a stored booking and bump `updated_at`.
    /// This is the single generic mutation path; payment reconciliation and
    /// cancellation both go through it.
    pub async fn update_booking(
        &self,
        booking_id: &str,
        patch: BookingPatch,
    ) -> Result<Booking, AppError> {
        self.mutate(booking_id, |booking| {
            patch.apply(booking);
            Ok(())
        })
        .await
    }

    pub async fn cancel_booking(
        &self,
        booking_id: &str,
        reason: &str,
    ) -> Result<Booking, AppError> {
        self.cancel_booking_at(booking_id, reason, Utc::now()).await
    }

    /// Cancel a booking, recording the refund evaluated at `now`. Fails with
    /// `Conflict` if the booking is already cancelled.
    pub async fn cancel_booking_at(
        &self,
        booking_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        let booking = self.get_booking(booking_id).await?;
        let supplier = self.suppliers.require(&booking.supplier_id)?;
        // The refund depends only on creation-time snapshots, so it can be
        // evaluated outside the mutation loop.
        let refund = refunds::refund_breakdown(&booking, supplier, now)?;

        let updated = self
            .mutate(booking_id, |booking| {
                if booking.status == BookingStatus::Cancelled {
                    return Err(AppError::Conflict(anyhow!(
                        "booking {} is already cancelled",
                        booking.id
                    )));
                }
                booking.status = BookingStatus::Cancelled;
                booking.cancelled_at = Some(now);
                booking.cancellation_reason = Some(reason.to_string());
                booking.refund = Some(refund.clone());
                Ok(())
            })
            .await?;

        tracing::info!(
            booking_id = %booking_id,
            refund_rate = %refund.refund_rate,
            refund_amount = %refund.refund_amount,
            "booking cancelled"
        );

        Ok(updated)
    }

    /// CAS retry loop: re-reads and re-applies `mutation` until the swap
    /// lands. Errors from the mutation itself propagate immediately.
    async fn mutate<F>(&self, booking_id: &str, mutation: F) -> Result<Booking, AppError>
    where
        F: Fn(&mut Booking) -> Result<(), AppError>,
    {
        loop {
            let current = self
                .store
                .get(booking_id)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow!("booking {booking_id} not found")))?;

            let mut updated = current.value.clone();
            mutation(&mut updated)?;
            updated.updated_at = Utc::now();

            match self
                .store
                .compare_and_swap(booking_id, current.version, updated.clone())
                .await
            {
                Ok(_) => return Ok(updated),
                Err(AppError::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn all_bookings(&self) -> Result<Vec<Booking>, AppError> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .map(|versioned| versioned.value)
            .collect())
    }

    pub async fn bookings_by_user(&self, user_id: &str) -> Result<Vec<Booking>, AppError> {
        Ok(self
            .all_bookings()
            .await?
            .into_iter()
            .filter(|booking| booking.user_id == user_id)
            .collect())
    }

    pub async fn bookings_by_supplier(&self, supplier_id: &str) -> Result<Vec<Booking>, AppError> {
        Ok(self
            .all_bookings()
            .await?
            .into_iter()
            .filter(|booking| booking.supplier_id == supplier_id)
            .collect())
    }

    /// Bookings whose check-in date falls inside the (inclusive) range; open
    /// bounds are unconstrained.
    pub async fn bookings_by_checkin_range(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Booking>, AppError> {
        Ok(self
            .all_bookings()
            .await?
            .into_iter()
            .filter(|booking| {
                from.map_or(true, |from| booking.check_in_date >= from)
                    && to.map_or(true, |to| booking.check_in_date <= to)
            })
            .collect())
    }
}
