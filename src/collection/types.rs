//! Collection types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed collection event
///
/// Append-only audit trail entry. Once created it is never mutated or
/// deleted; the bin derives `last_collection_at` from the most recent
/// record but holds no embedded copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub id: String,
    /// Owning bin's internal id (back-reference, not ownership)
    pub bin_ref: String,
    /// Staff member who performed the collection
    pub staff_ref: String,
    /// Bin owner at time of collection
    pub resident_ref: Option<String>,
    pub waste_type: String,
    /// Collected weight in kilograms, never negative
    pub weight: f64,
    pub notes: Option<String>,
    pub collected_at: DateTime<Utc>,
}

/// Collection submission from the staff app
///
/// `bin_id` accepts either the internal id or the human code; QR scans
/// hand the staff app a human code, dashboard flows hand it an id.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplyCollectionRequest {
    pub bin_id: String,
    pub waste_type: String,
    pub weight: f64,
    pub staff_id: String,
    pub resident_id: Option<String>,
    pub notes: Option<String>,
}
