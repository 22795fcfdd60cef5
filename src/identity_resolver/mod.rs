//! IdentityResolver - scanned string to bin
//!
//! ## Responsibilities
//!
//! - Accept a raw acquired string (URL form or bare human code)
//! - Extract the candidate human code
//! - Resolve it to exactly one bin via the store
//!
//! 取得面（カメラ/手入力）の出力は必ずここを通る。URL形式と素のhuman code
//! は同一のビンに解決される（QRペイロードとのラウンドトリップ保証）。

use crate::bin_registry::qr_payload::extract_human_code;
use crate::bin_registry::types::Bin;
use crate::error::{Error, Result};
use crate::store::BinStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Failure kinds of one resolution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanErrorKind {
    /// Empty or whitespace-only input; no lookup was attempted
    InvalidInput,
    /// No bin carries the resolved human code
    NotFound,
    /// The lookup channel itself failed
    TransportFailure,
}

/// Resolved outcome of one acquisition attempt (transient, not persisted)
#[derive(Debug, Clone)]
pub enum ScanResult {
    Found(Bin),
    Failed(ScanErrorKind),
}

impl ScanResult {
    /// Convert to a crate result for HTTP handlers
    pub fn into_result(self, raw: &str) -> Result<Bin> {
        match self {
            ScanResult::Found(bin) => Ok(bin),
            ScanResult::Failed(ScanErrorKind::InvalidInput) => Err(Error::Validation(
                "Scanned input is empty".to_string(),
            )),
            ScanResult::Failed(ScanErrorKind::NotFound) => {
                Err(Error::NotFound(format!("No bin for code {}", raw.trim())))
            }
            ScanResult::Failed(ScanErrorKind::TransportFailure) => {
                Err(Error::Database("Bin lookup failed".to_string()))
            }
        }
    }
}

/// IdentityResolver instance
pub struct IdentityResolver {
    store: Arc<dyn BinStore>,
}

impl IdentityResolver {
    /// Create new IdentityResolver
    pub fn new(store: Arc<dyn BinStore>) -> Self {
        Self { store }
    }

    /// Resolve a raw scanned/typed string to a bin
    ///
    /// URL form: the `binId` query parameter carries the human code.
    /// Bare form: the whole trimmed input is the human code (legacy labels
    /// and manual entry).
    pub async fn resolve(&self, raw: &str) -> ScanResult {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return ScanResult::Failed(ScanErrorKind::InvalidInput);
        }

        let code = match extract_human_code(trimmed) {
            Some(code) => {
                debug!(code = %code, "Extracted human code from URL payload");
                code
            }
            None => trimmed.to_string(),
        };

        match self.store.find_by_human_code(&code).await {
            Ok(Some(bin)) => {
                debug!(bin_id = %bin.id, code = %code, "Scan resolved");
                ScanResult::Found(bin)
            }
            Ok(None) => {
                debug!(code = %code, "Scan resolved to no bin");
                ScanResult::Failed(ScanErrorKind::NotFound)
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Bin lookup failed during resolve");
                ScanResult::Failed(ScanErrorKind::TransportFailure)
            }
        }
    }
}
