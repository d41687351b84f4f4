//! Payment audit trail.
//!
//! Every webhook the platform processes is appended here regardless of
//! outcome, so anomalies (unknown bookings, amount mismatches, replays) are
//! visible for manual follow-up even though the processor was told all is
//! well. Appending is best-effort: audit failures are logged, never allowed
//! to fail reconciliation.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::booking::{PaymentStatus, ProcessorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    SignatureFailed,
    ParseFailed,
    Ignored,
    MissingReference,
    BookingNotFound,
    AmountMismatch,
    Duplicate,
    StaleEvent,
    Applied,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::SignatureFailed => "signature_failed",
            AuditOutcome::ParseFailed => "parse_failed",
            AuditOutcome::Ignored => "ignored",
            AuditOutcome::MissingReference => "missing_reference",
            AuditOutcome::BookingNotFound => "booking_not_found",
            AuditOutcome::AmountMismatch => "amount_mismatch",
            AuditOutcome::Duplicate => "duplicate",
            AuditOutcome::StaleEvent => "stale_event",
            AuditOutcome::Applied => "applied",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAuditRecord {
    pub ts: DateTime<Utc>,
    pub processor: ProcessorKind,
    pub outcome: AuditOutcome,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    pub source_ip: String,
}

pub trait PaymentAuditLog: Send + Sync {
    fn append(&self, record: PaymentAuditRecord);
}

/// Audit log held in memory; used by tests and short-lived tooling.
#[derive(Default)]
pub struct InMemoryAuditLog {
    records: Mutex<Vec<PaymentAuditRecord>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<PaymentAuditRecord> {
        self.records.lock().expect("audit lock poisoned").clone()
    }
}

impl PaymentAuditLog for InMemoryAuditLog {
    fn append(&self, record: PaymentAuditRecord) {
        self.records.lock().expect("audit lock poisoned").push(record);
    }
}

/// Append-only JSON-lines file, one record per line.
pub struct JsonlAuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

impl PaymentAuditLog for JsonlAuditLog {
    fn append(&self, record: PaymentAuditRecord) {
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize payment audit record");
                return;
            }
        };

        let _guard = self.write_lock.lock().expect("audit lock poisoned");
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{line}"));

        if let Err(e) = result {
            tracing::error!(
                error = %e,
                path = %self.path.display(),
                "failed to append payment audit record"
            );
        }
    }
}
