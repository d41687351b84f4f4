//! service-core: shared infrastructure for the booking platform crates.
pub mod error;
pub mod observability;

pub use anyhow;
pub use tracing;
pub use validator;
