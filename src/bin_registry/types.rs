//! Bin registry types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bin lifecycle status
///
/// Bins are never hard-deleted while collection history references them;
/// retirement is a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinStatus {
    /// In service, collectible
    Active,
    /// Temporarily out of service
    Maintenance,
    /// Retired
    Inactive,
}

impl BinStatus {
    /// Convert to string for DB storage / logging
    pub fn as_str(&self) -> &'static str {
        match self {
            BinStatus::Active => "active",
            BinStatus::Maintenance => "maintenance",
            BinStatus::Inactive => "inactive",
        }
    }

    /// Parse from DB string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(BinStatus::Active),
            "maintenance" => Some(BinStatus::Maintenance),
            "inactive" => Some(BinStatus::Inactive),
            _ => None,
        }
    }
}

/// One physical waste receptacle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bin {
    /// Stable internal identifier (opaque, never reused)
    pub id: String,
    /// External-facing short identifier embedded in the QR payload (immutable)
    pub human_code: String,
    /// Exact string encoded into the physical QR code
    pub qr_payload: String,
    /// Fill percentage, always within [0, 100]
    pub fill_level: i32,
    pub status: BinStatus,
    /// Resident owning the bin
    pub owner_ref: Option<String>,
    pub location: Option<String>,
    pub last_collection_at: Option<DateTime<Utc>>,
    pub next_collection_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bin {
    /// Whether the collection state machine may act on this bin
    pub fn is_collectible(&self) -> bool {
        self.status == BinStatus::Active
    }
}

/// Bin creation request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBinRequest {
    /// Optional caller-supplied human code; generated when absent
    pub human_code: Option<String>,
    pub owner_ref: Option<String>,
    pub location: Option<String>,
    /// Initial fill level, defaults to 0
    pub fill_level: Option<i32>,
}

/// Administrative fill-level override
#[derive(Debug, Clone, Deserialize)]
pub struct SetFillLevelRequest {
    pub fill_level: i32,
}

/// Status change request (retire / reactivate / maintenance)
#[derive(Debug, Clone, Deserialize)]
pub struct SetStatusRequest {
    pub status: BinStatus,
}
