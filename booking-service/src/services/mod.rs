pub mod audit;
pub mod ledger;
pub mod metrics;
pub mod notifications;
pub mod pricing;
pub mod processors;
pub mod reconciliation;
pub mod refunds;
pub mod sequences;
pub mod store;
pub mod suppliers;

pub use ledger::BookingLedger;
pub use reconciliation::{ReconciliationService, WebhookAck};
pub use sequences::SequenceGenerator;
pub use suppliers::SupplierDirectory;
