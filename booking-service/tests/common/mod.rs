#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::Secret;
use service_core::error::AppError;

use booking_service::config::{PayFastConfig, YocoConfig};
use booking_service::dtos::{CreateBookingRequest, LineItemRequest};
use booking_service::models::booking::{Booking, ProcessorKind};
use booking_service::models::supplier::{
    CancellationTier, CommissionModel, CommissionSchedule, PaymentTerms, RateParity, Supplier,
    SupplierStatus,
};
use booking_service::services::audit::InMemoryAuditLog;
use booking_service::services::ledger::BookingLedger;
use booking_service::services::notifications::{NotificationService, PaymentReceipt};
use booking_service::services::processors::{PayFastProcessor, YocoProcessor};
use booking_service::services::reconciliation::ReconciliationService;
use booking_service::services::store::InMemoryStore;
use booking_service::services::suppliers::SupplierDirectory;

pub const SUPPLIER_ID: &str = "karoo-lodges";
pub const REBATE_SUPPLIER_ID: &str = "whale-route-tours";
pub const USER_ID: &str = "user-42";
pub const CUSTOMER_EMAIL: &str = "guest@example.test";

fn tier(days_before: i64, refund: Decimal) -> CancellationTier {
    CancellationTier {
        days_before,
        refund,
    }
}

pub fn discount_supplier() -> Supplier {
    Supplier {
        id: SUPPLIER_ID.to_string(),
        name: "Karoo Lodges".to_string(),
        commission: CommissionSchedule {
            model: CommissionModel::Discount,
            rates: HashMap::from([
                ("accommodation".to_string(), dec!(0.10)),
                ("conference".to_string(), dec!(0.15)),
            ]),
        },
        payment_terms: HashMap::from([
            (
                "FIT".to_string(),
                PaymentTerms {
                    deposit: dec!(0.5),
                    due_days: 7,
                    balance_due_days: Some(14),
                },
            ),
            (
                "Groups".to_string(),
                PaymentTerms {
                    deposit: dec!(0.25),
                    due_days: 14,
                    balance_due_days: Some(30),
                },
            ),
        ]),
        cancellation_policy: HashMap::from([(
            "FIT".to_string(),
            vec![tier(30, dec!(1.0)), tier(7, dec!(0.5)), tier(0, dec!(0))],
        )]),
        rate_parity: RateParity { enforce: true },
        status: SupplierStatus::Active,
    }
}

pub fn rebate_supplier() -> Supplier {
    Supplier {
        id: REBATE_SUPPLIER_ID.to_string(),
        name: "Whale Route Tours".to_string(),
        commission: CommissionSchedule {
            model: CommissionModel::Rebate,
            rates: HashMap::from([("accommodation".to_string(), dec!(0.10))]),
        },
        payment_terms: HashMap::from([(
            "FIT".to_string(),
            PaymentTerms {
                deposit: dec!(1.0),
                due_days: 3,
                balance_due_days: None,
            },
        )]),
        cancellation_policy: HashMap::from([(
            "FIT".to_string(),
            vec![tier(14, dec!(1.0)), tier(0, dec!(0))],
        )]),
        rate_parity: RateParity { enforce: false },
        status: SupplierStatus::Active,
    }
}

pub fn payfast_config() -> PayFastConfig {
    PayFastConfig {
        merchant_id: "10000100".to_string(),
        merchant_key: "46f0cd694581a".to_string(),
        passphrase: Secret::new("jt7NOE43FZPn".to_string()),
        sandbox: true,
        return_url: "https://example.test/pay/success".to_string(),
        cancel_url: "https://example.test/pay/cancel".to_string(),
        notify_url: "https://example.test/api/webhooks/payfast".to_string(),
    }
}

pub fn yoco_config() -> YocoConfig {
    YocoConfig {
        secret_key: Secret::new("sk_test_abc".to_string()),
        public_key: "pk_test_abc".to_string(),
        webhook_secret: Secret::new("whsec_test".to_string()),
        test_mode: true,
        success_url: "https://example.test/pay/success".to_string(),
        cancel_url: "https://example.test/pay/cancel".to_string(),
    }
}

/// Notifier that records every dispatch; can be switched into failure mode
/// to exercise the swallow-and-log path.
#[derive(Default)]
pub struct RecordingNotifier {
    pub confirmations: Mutex<Vec<(String, String)>>,
    pub receipts: Mutex<Vec<(String, ProcessorKind, Decimal)>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn confirmation_count(&self) -> usize {
        self.confirmations.lock().unwrap().len()
    }

    pub fn receipt_count(&self) -> usize {
        self.receipts.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationService for RecordingNotifier {
    async fn send_booking_confirmation(
        &self,
        booking: &Booking,
        email: &str,
    ) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::InternalError(anyhow::anyhow!("smtp down")));
        }
        self.confirmations
            .lock()
            .unwrap()
            .push((booking.id.clone(), email.to_string()));
        Ok(())
    }

    async fn send_payment_receipt(
        &self,
        booking: &Booking,
        _email: &str,
        receipt: &PaymentReceipt,
    ) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::InternalError(anyhow::anyhow!("smtp down")));
        }
        self.receipts
            .lock()
            .unwrap()
            .push((booking.id.clone(), receipt.processor, receipt.amount));
        Ok(())
    }
}

pub struct TestHarness {
    pub ledger: Arc<BookingLedger>,
    pub audit: Arc<InMemoryAuditLog>,
    pub notifier: Arc<RecordingNotifier>,
    pub reconciliation: ReconciliationService,
    pub payfast: PayFastProcessor,
    pub yoco: YocoProcessor,
}

impl TestHarness {
    pub fn new() -> Self {
        service_core::observability::init_tracing("booking-service-tests", "warn");

        let store: Arc<InMemoryStore<Booking>> = Arc::new(InMemoryStore::new());
        let suppliers = Arc::new(SupplierDirectory::new(vec![
            discount_supplier(),
            rebate_supplier(),
        ]));
        let ledger = Arc::new(BookingLedger::new(store, suppliers));
        let audit = Arc::new(InMemoryAuditLog::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let payfast = PayFastProcessor::new(payfast_config());
        let yoco = YocoProcessor::new(yoco_config());

        let mut reconciliation =
            ReconciliationService::new(ledger.clone(), audit.clone(), notifier.clone());
        reconciliation.register_processor(Arc::new(payfast.clone()));
        reconciliation.register_processor(Arc::new(yoco.clone()));

        Self {
            ledger,
            audit,
            notifier,
            reconciliation,
            payfast,
            yoco,
        }
    }

    /// A pending booking with a customer email, ready to be paid.
    /// Accommodation at 1000 × 2 prices the total at 2000.00.
    pub async fn pending_booking(&self) -> Booking {
        self.ledger
            .create_booking(booking_request(SUPPLIER_ID, Some(CUSTOMER_EMAIL)))
            .await
            .expect("failed to create booking")
    }
}

pub fn days_from_now(days: i64) -> DateTime<Utc> {
    Utc::now() + Duration::days(days)
}

pub fn booking_request(supplier_id: &str, email: Option<&str>) -> CreateBookingRequest {
    CreateBookingRequest {
        supplier_id: supplier_id.to_string(),
        user_id: USER_ID.to_string(),
        booking_type: "FIT".to_string(),
        check_in_date: days_from_now(30),
        check_out_date: days_from_now(33),
        line_items: vec![LineItemRequest {
            service_type: "accommodation".to_string(),
            description: Some("Double room".to_string()),
            base_price: dec!(1000),
            retail_price: Some(dec!(1000)),
            quantity: Some(2),
            nights: Some(2),
        }],
        metadata: email
            .map(|email| serde_json::json!({ "customerEmail": email }))
            .unwrap_or(serde_json::Value::Null),
        service_type: None,
        base_price: None,
        retail_price: None,
        quantity: None,
        description: None,
    }
}

/// Form-encoded PayFast ITN body with a valid signature.
pub fn payfast_itn_body(
    processor: &PayFastProcessor,
    booking_id: &str,
    amount: Decimal,
    payment_status: &str,
    pf_payment_id: &str,
) -> String {
    let mut params = BTreeMap::new();
    params.insert("m_payment_id".to_string(), booking_id.to_string());
    params.insert("pf_payment_id".to_string(), pf_payment_id.to_string());
    params.insert("payment_status".to_string(), payment_status.to_string());
    params.insert("amount_gross".to_string(), amount.to_string());
    params.insert("item_name".to_string(), format!("Booking {booking_id}"));

    let signature = processor.sign(&params);
    let mut pairs: Vec<(String, String)> = params.into_iter().collect();
    pairs.push(("signature".to_string(), signature));
    serde_urlencoded::to_string(pairs).expect("failed to encode ITN body")
}

/// JSON Yoco webhook body plus its `X-Yoco-Signature` value.
pub fn yoco_webhook(
    processor: &YocoProcessor,
    event_type: &str,
    booking_id: &str,
    amount_cents: i64,
    charge_id: &str,
) -> (String, String) {
    let body = serde_json::json!({
        "type": event_type,
        "data": {
            "id": "co_1",
            "amount": amount_cents,
            "chargeId": charge_id,
            "metadata": { "bookingId": booking_id }
        }
    })
    .to_string();
    let signature = processor
        .compute_signature(&body)
        .expect("failed to sign webhook body");
    (body, signature)
}
