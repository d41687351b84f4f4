pub mod booking;
pub mod sequence;
pub mod supplier;

pub use booking::{
    Booking, BookingPatch, BookingStatus, LineItem, PaymentStatus, PaymentTermsSnapshot,
    PricingSummary, ProcessorKind, RefundBreakdown,
};
pub use sequence::{DocumentNumber, SequenceCounter, SequenceKind};
pub use supplier::{
    CancellationTier, CommissionModel, CommissionSchedule, PaymentTerms, RateParity, Supplier,
    SupplierStatus,
};
