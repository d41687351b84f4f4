//! Supplier directory.
//!
//! Read-only lookup over supplier reference data. Loaded once at startup
//! (from a JSON document or built directly in tests) and safe to share
//! across request handlers without locking.

use std::collections::HashMap;
use std::path::Path;

use anyhow::anyhow;
use service_core::error::AppError;

use crate::models::supplier::{Supplier, SupplierStatus};

#[derive(Debug)]
pub struct SupplierDirectory {
    suppliers: HashMap<String, Supplier>,
}

impl SupplierDirectory {
    pub fn new(suppliers: Vec<Supplier>) -> Self {
        let suppliers = suppliers
            .into_iter()
            .map(|supplier| (supplier.id.clone(), supplier))
            .collect();
        Self { suppliers }
    }

    /// Parse a JSON array of suppliers.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let suppliers: Vec<Supplier> = serde_json::from_str(raw)
            .map_err(|e| AppError::ConfigError(anyhow!("invalid supplier data: {e}")))?;
        Ok(Self::new(suppliers))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            AppError::ConfigError(anyhow!(
                "failed to read supplier data from {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json(&raw)
    }

    pub fn get(&self, supplier_id: &str) -> Option<&Supplier> {
        self.suppliers.get(supplier_id)
    }

    /// Look up a supplier that a request claims to exist; an unknown id is
    /// a validation failure on the request, not an internal error.
    pub fn require(&self, supplier_id: &str) -> Result<&Supplier, AppError> {
        self.get(supplier_id)
            .ok_or_else(|| AppError::BadRequest(anyhow!("supplier {supplier_id} not found")))
    }

    pub fn active(&self) -> Vec<&Supplier> {
        self.suppliers
            .values()
            .filter(|supplier| supplier.status == SupplierStatus::Active)
            .collect()
    }
}
