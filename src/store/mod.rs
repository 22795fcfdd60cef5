//! Storage interfaces
//!
//! Async trait seams between the domain services and persistence.
//! Production uses the MySQL repositories (`bin_registry::repository`,
//! `collection::repository`); tests and demos use `memory::InMemoryStore`.

pub mod memory;

use crate::bin_registry::types::Bin;
use crate::collection::types::CollectionRecord;
use crate::error::Result;
use async_trait::async_trait;

pub use memory::InMemoryStore;

/// Bin persistence interface
#[async_trait]
pub trait BinStore: Send + Sync {
    /// Look up a bin by its external human code
    async fn find_by_human_code(&self, code: &str) -> Result<Option<Bin>>;

    /// Look up a bin by internal id
    async fn find_by_id(&self, id: &str) -> Result<Option<Bin>>;

    /// List all bins
    async fn list_bins(&self) -> Result<Vec<Bin>>;

    /// Insert a new bin
    async fn insert_bin(&self, bin: &Bin) -> Result<()>;

    /// Persist updated bin fields
    async fn update_bin(&self, bin: &Bin) -> Result<()>;
}

/// Collection record persistence interface
///
/// Records are append-only; nothing here mutates or deletes an existing
/// record.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Atomically append `record` and persist the updated `bin`.
    ///
    /// Either both writes land or neither does; implementations carry the
    /// transaction/locking needed for that.
    async fn apply_collection(&self, bin: &Bin, record: &CollectionRecord) -> Result<()>;

    /// Most recent records for a bin, newest first
    async fn list_records(&self, bin_id: &str, limit: usize) -> Result<Vec<CollectionRecord>>;
}
