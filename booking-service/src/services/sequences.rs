//! Document number generation.
//!
//! Quote and invoice numbers are issued from durable year-scoped counters.
//! The counter store's compare-and-swap guarantees two callers never receive
//! the same `(prefix, year, counter)` tuple; a raced increment simply
//! retries against the fresh counter value.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use service_core::error::AppError;

use crate::models::sequence::{DocumentNumber, SequenceCounter, SequenceKind};
use crate::services::store::VersionedStore;

pub struct SequenceGenerator {
    store: Arc<dyn VersionedStore<SequenceCounter>>,
}

impl SequenceGenerator {
    pub fn new(store: Arc<dyn VersionedStore<SequenceCounter>>) -> Self {
        Self { store }
    }

    pub async fn next_quote_number(&self) -> Result<String, AppError> {
        self.next_number(SequenceKind::Quote).await
    }

    pub async fn next_invoice_number(&self) -> Result<String, AppError> {
        self.next_number(SequenceKind::Invoice).await
    }

    pub async fn next_number(&self, kind: SequenceKind) -> Result<String, AppError> {
        self.next_number_with(kind, None, Utc::now()).await
    }

    /// Issue the next number for `kind`, resetting the counter when the
    /// calendar year has rolled over since the last issue.
    pub async fn next_number_with(
        &self,
        kind: SequenceKind,
        prefix: Option<&str>,
        today: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let year = today.year();

        loop {
            match self.store.get(kind.as_str()).await? {
                None => {
                    let counter = SequenceCounter {
                        year,
                        counter: 1,
                        prefix: kind.default_prefix().to_string(),
                    };
                    match self.store.insert(kind.as_str(), counter.clone()).await {
                        Ok(_) => {
                            return Ok(format_number(
                                prefix.unwrap_or(&counter.prefix),
                                year,
                                counter.counter,
                            ))
                        }
                        // Another caller initialised the counter first.
                        Err(AppError::Conflict(_)) => continue,
                        Err(e) => return Err(e),
                    }
                }
                Some(stored) => {
                    let mut counter = stored.value.clone();
                    if counter.year != year {
                        counter.year = year;
                        counter.counter = 0;
                    }
                    counter.counter += 1;

                    match self
                        .store
                        .compare_and_swap(kind.as_str(), stored.version, counter.clone())
                        .await
                    {
                        Ok(_) => {
                            return Ok(format_number(
                                prefix.unwrap_or(&counter.prefix),
                                year,
                                counter.counter,
                            ))
                        }
                        Err(AppError::Conflict(_)) => continue,
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }

    /// Invoice number for a quote being converted: same year and sequence
    /// digits under the invoice prefix, keeping the quote and its invoice
    /// 1:1 traceable without consuming a counter value. A malformed quote
    /// number falls through to the regular invoice counter.
    pub async fn invoice_number_for_quote(&self, quote_number: &str) -> Result<String, AppError> {
        if let Some(derived) = derive_invoice_number(quote_number, None) {
            return Ok(derived);
        }
        self.next_number(SequenceKind::Invoice).await
    }

    /// Current counter state without incrementing.
    pub async fn current(&self, kind: SequenceKind) -> Result<Option<SequenceCounter>, AppError> {
        Ok(self
            .store
            .get(kind.as_str())
            .await?
            .map(|versioned| versioned.value))
    }
}

/// Derive an invoice number from an existing quote number by substituting
/// the prefix; returns `None` when the quote number is malformed.
pub fn derive_invoice_number(quote_number: &str, prefix: Option<&str>) -> Option<String> {
    let parsed = DocumentNumber::parse(quote_number)?;
    Some(format_number(
        prefix.unwrap_or_else(|| SequenceKind::Invoice.default_prefix()),
        parsed.year,
        parsed.sequence,
    ))
}

fn format_number(prefix: &str, year: i32, counter: u32) -> String {
    format!("{prefix}-{year}-{counter:04}")
}
