//! Booking ledger and payment reconciliation core.
//!
//! Owns booking entities (pricing snapshots, payment terms, lifecycle state),
//! supplier commission and refund policy evaluation, year-scoped document
//! numbering, and reconciliation of at-least-once payment webhooks from the
//! supported processors. The HTTP transport, document rendering, and email
//! delivery live elsewhere and reach this crate through the narrow interfaces
//! in [`services`].

pub mod config;
pub mod dtos;
pub mod models;
pub mod services;

pub use services::ledger::BookingLedger;
pub use services::reconciliation::{ReconciliationService, WebhookAck};
pub use services::sequences::SequenceGenerator;
pub use services::suppliers::SupplierDirectory;
