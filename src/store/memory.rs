//! In-memory store
//!
//! HashMap-backed implementation of the storage interfaces. Used by unit
//! tests and demo setups without a MySQL instance. Supports one-shot write
//! fault injection so callers can verify all-or-nothing behavior.

use super::{BinStore, CollectionStore};
use crate::bin_registry::types::Bin;
use crate::collection::types::CollectionRecord;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// In-memory bin + collection store
#[derive(Default)]
pub struct InMemoryStore {
    bins: RwLock<HashMap<String, Bin>>,
    records: RwLock<Vec<CollectionRecord>>,
    /// When set, the next write fails without mutating anything
    fail_next_write: AtomicBool,
}

impl InMemoryStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write operation fail
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    fn take_fault(&self) -> Result<()> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(Error::Database("Injected write failure".to_string()));
        }
        Ok(())
    }

    /// Total record count (test helper)
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl BinStore for InMemoryStore {
    async fn find_by_human_code(&self, code: &str) -> Result<Option<Bin>> {
        let bins = self.bins.read().await;
        Ok(bins.values().find(|b| b.human_code == code).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Bin>> {
        let bins = self.bins.read().await;
        Ok(bins.get(id).cloned())
    }

    async fn list_bins(&self) -> Result<Vec<Bin>> {
        let bins = self.bins.read().await;
        let mut all: Vec<Bin> = bins.values().cloned().collect();
        all.sort_by(|a, b| a.human_code.cmp(&b.human_code));
        Ok(all)
    }

    async fn insert_bin(&self, bin: &Bin) -> Result<()> {
        self.take_fault()?;
        let mut bins = self.bins.write().await;
        if bins.contains_key(&bin.id) {
            return Err(Error::Conflict(format!("Bin {} already exists", bin.id)));
        }
        bins.insert(bin.id.clone(), bin.clone());
        Ok(())
    }

    async fn update_bin(&self, bin: &Bin) -> Result<()> {
        self.take_fault()?;
        let mut bins = self.bins.write().await;
        match bins.get_mut(&bin.id) {
            Some(existing) => {
                *existing = bin.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("Bin {} not found", bin.id))),
        }
    }
}

#[async_trait]
impl CollectionStore for InMemoryStore {
    async fn apply_collection(&self, bin: &Bin, record: &CollectionRecord) -> Result<()> {
        // Fault check and both writes happen under the bins write lock,
        // so a failure leaves neither the record nor the bin changed.
        let mut bins = self.bins.write().await;
        self.take_fault()?;

        if !bins.contains_key(&bin.id) {
            return Err(Error::NotFound(format!("Bin {} not found", bin.id)));
        }

        let mut records = self.records.write().await;
        records.push(record.clone());
        bins.insert(bin.id.clone(), bin.clone());
        Ok(())
    }

    async fn list_records(&self, bin_id: &str, limit: usize) -> Result<Vec<CollectionRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.bin_ref == bin_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
