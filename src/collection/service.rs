//! Collection Service
//!
//! ## 概要
//! 収集状態遷移の本体。解決済みのビンに対して収集イベントを検証・適用する。
//!
//! ## 処理フロー
//! 1. ビン解決（内部ID優先、human codeフォールバック）
//! 2. 前提条件チェック（status == active, weight >= 0）
//! 3. CollectionRecord構築 + ビン更新値計算
//! 4. アトミック永続化（両方成功 or 両方なし）
//!
//! 同一ビンへの短時間の再送は重複記録として両方残る。時間窓での
//! 重複排除は呼び出し側のポリシー。内部リトライもしない。

use super::types::{ApplyCollectionRequest, CollectionRecord};
use crate::bin_registry::types::Bin;
use crate::error::{Error, Result};
use crate::store::{BinStore, CollectionStore};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Collection Service
pub struct CollectionService {
    bins: Arc<dyn BinStore>,
    records: Arc<dyn CollectionStore>,
    /// Interval until the next scheduled collection
    collection_interval: Duration,
}

impl CollectionService {
    /// 新しいCollectionServiceを作成
    pub fn new(
        bins: Arc<dyn BinStore>,
        records: Arc<dyn CollectionStore>,
        collection_interval_days: i64,
    ) -> Self {
        Self {
            bins,
            records,
            collection_interval: Duration::days(collection_interval_days),
        }
    }

    /// 収集イベントを適用
    ///
    /// # Returns
    /// 追加されたCollectionRecord
    pub async fn apply_collection(
        &self,
        request: ApplyCollectionRequest,
    ) -> Result<CollectionRecord> {
        if !request.weight.is_finite() || request.weight < 0.0 {
            return Err(Error::Validation(format!(
                "Weight must be a non-negative number, got {}",
                request.weight
            )));
        }

        if request.waste_type.trim().is_empty() {
            return Err(Error::Validation("Waste type must not be empty".to_string()));
        }

        let bin = self.resolve_bin(&request.bin_id).await?;

        if !bin.is_collectible() {
            return Err(Error::InvalidState(format!(
                "Bin {} is not active (status: {})",
                bin.human_code,
                bin.status.as_str()
            )));
        }

        let now = Utc::now();
        let record = CollectionRecord {
            id: Uuid::new_v4().to_string(),
            bin_ref: bin.id.clone(),
            staff_ref: request.staff_id,
            resident_ref: request.resident_id.or_else(|| bin.owner_ref.clone()),
            waste_type: request.waste_type,
            weight: request.weight,
            notes: request.notes,
            collected_at: now,
        };

        let mut updated = bin.clone();
        updated.fill_level = 0;
        updated.last_collection_at = Some(now);
        updated.next_collection_at = Some(now + self.collection_interval);
        updated.updated_at = now;

        // Single atomic write; on failure the caller sees the error and the
        // bin keeps its pre-collection state.
        self.records.apply_collection(&updated, &record).await?;

        info!(
            bin_id = %updated.id,
            human_code = %updated.human_code,
            record_id = %record.id,
            staff = %record.staff_ref,
            weight = record.weight,
            waste_type = %record.waste_type,
            "Collection applied"
        );

        Ok(record)
    }

    /// ビンの収集履歴を取得（新しい順）
    pub async fn history(&self, bin_id: &str, limit: usize) -> Result<Vec<CollectionRecord>> {
        // Bin must exist; history of a retired bin stays readable.
        let bin = self.resolve_bin(bin_id).await?;
        self.records.list_records(&bin.id, limit).await
    }

    /// 内部ID優先でビンを解決、見つからなければhuman codeで再検索
    async fn resolve_bin(&self, bin_id: &str) -> Result<Bin> {
        if let Some(bin) = self.bins.find_by_id(bin_id).await? {
            return Ok(bin);
        }

        self.bins
            .find_by_human_code(bin_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Bin {} not found", bin_id)))
    }
}
