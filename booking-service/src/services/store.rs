//! Versioned key-value storage.
//!
//! Business logic sees only get / insert / compare-and-swap semantics, so
//! the booking store, sequence counters and any future persistence adapter
//! share one contract with per-key atomic read-modify-write. Writers run
//! CAS retry loops; a lost update is impossible, the loser just re-reads.

use anyhow::anyhow;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use service_core::error::AppError;

/// A stored value paired with its monotonically increasing version.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

#[async_trait]
pub trait VersionedStore<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<Versioned<T>>, AppError>;

    /// Store a new value at version 1. Fails with `Conflict` if the key
    /// already exists.
    async fn insert(&self, key: &str, value: T) -> Result<Versioned<T>, AppError>;

    /// Replace the value only if the stored version still matches
    /// `expected_version`. Fails with `Conflict` on a version mismatch and
    /// `NotFound` if the key does not exist.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: u64,
        value: T,
    ) -> Result<Versioned<T>, AppError>;

    async fn list(&self) -> Result<Vec<Versioned<T>>, AppError>;
}

/// In-memory store with per-key optimistic concurrency.
pub struct InMemoryStore<T> {
    entries: DashMap<String, Versioned<T>>,
}

impl<T> InMemoryStore<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<T> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> VersionedStore<T> for InMemoryStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<Versioned<T>>, AppError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, key: &str, value: T) -> Result<Versioned<T>, AppError> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => Err(AppError::Conflict(anyhow!("key {key} already exists"))),
            Entry::Vacant(slot) => {
                let versioned = Versioned { version: 1, value };
                slot.insert(versioned.clone());
                Ok(versioned)
            }
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: u64,
        value: T,
    ) -> Result<Versioned<T>, AppError> {
        match self.entries.get_mut(key) {
            None => Err(AppError::NotFound(anyhow!("no entry for key {key}"))),
            Some(mut entry) => {
                if entry.version != expected_version {
                    return Err(AppError::Conflict(anyhow!(
                        "version conflict for key {key}: expected {expected_version}, found {}",
                        entry.version
                    )));
                }
                let next = Versioned {
                    version: expected_version + 1,
                    value,
                };
                *entry = next.clone();
                Ok(next)
            }
        }
    }

    async fn list(&self) -> Result<Vec<Versioned<T>>, AppError> {
        Ok(self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }
}
