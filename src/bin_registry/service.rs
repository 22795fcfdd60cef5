//! BinRegistry Service
//!
//! ## 概要
//! ビン（ゴミ収集容器）のライフサイクル管理。作成時にhuman codeを確定し、
//! QRペイロードをエンコードして永続化する。
//!
//! ## 処理フロー
//! 1. human code決定（指定値のバリデーション or 自動生成）
//! 2. 一意性チェック
//! 3. QRペイロードエンコード
//! 4. DB保存

use super::qr_payload::{encode_qr_payload, generate_human_code, validate_human_code};
use super::types::{Bin, BinStatus, CreateBinRequest};
use crate::error::{Error, Result};
use crate::store::BinStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Attempts to draw a unique generated human code before giving up
const GENERATE_ATTEMPTS: usize = 5;

/// BinRegistry Service
pub struct BinRegistryService {
    store: Arc<dyn BinStore>,
    /// Base collection URL embedded in QR payloads
    collect_base_url: String,
}

impl BinRegistryService {
    /// 新しいBinRegistryServiceを作成
    pub fn new(store: Arc<dyn BinStore>, collect_base_url: impl Into<String>) -> Self {
        Self {
            store,
            collect_base_url: collect_base_url.into(),
        }
    }

    /// ビンを作成（QRペイロードはここで確定する）
    pub async fn create_bin(&self, request: CreateBinRequest) -> Result<Bin> {
        let human_code = match request.human_code {
            Some(code) => {
                let code = code.trim().to_string();
                validate_human_code(&code).map_err(Error::Validation)?;

                if self.store.find_by_human_code(&code).await?.is_some() {
                    return Err(Error::Conflict(format!(
                        "Human code {} already assigned",
                        code
                    )));
                }
                code
            }
            None => self.draw_unique_code().await?,
        };

        let fill_level = request.fill_level.unwrap_or(0);
        if !(0..=100).contains(&fill_level) {
            return Err(Error::Validation(format!(
                "Fill level must be within 0..=100, got {}",
                fill_level
            )));
        }

        let qr_payload = encode_qr_payload(&self.collect_base_url, &human_code)
            .map_err(Error::Config)?;

        let now = Utc::now();
        let bin = Bin {
            id: Uuid::new_v4().to_string(),
            human_code,
            qr_payload,
            fill_level,
            status: BinStatus::Active,
            owner_ref: request.owner_ref,
            location: request.location,
            last_collection_at: None,
            next_collection_at: None,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_bin(&bin).await?;

        info!(
            bin_id = %bin.id,
            human_code = %bin.human_code,
            qr_payload = %bin.qr_payload,
            "Bin created"
        );

        Ok(bin)
    }

    /// ビンを取得
    pub async fn get_bin(&self, id: &str) -> Result<Bin> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Bin {} not found", id)))
    }

    /// ビン一覧を取得
    pub async fn list_bins(&self) -> Result<Vec<Bin>> {
        self.store.list_bins().await
    }

    /// fill levelの管理者オーバーライド
    pub async fn set_fill_level(&self, id: &str, fill_level: i32) -> Result<Bin> {
        if !(0..=100).contains(&fill_level) {
            return Err(Error::Validation(format!(
                "Fill level must be within 0..=100, got {}",
                fill_level
            )));
        }

        let mut bin = self.get_bin(id).await?;
        bin.fill_level = fill_level;
        bin.updated_at = Utc::now();
        self.store.update_bin(&bin).await?;

        info!(bin_id = %bin.id, fill_level = fill_level, "Fill level overridden");
        Ok(bin)
    }

    /// ステータス変更（退役はソフトリタイア、履歴は保持）
    pub async fn set_status(&self, id: &str, status: BinStatus) -> Result<Bin> {
        let mut bin = self.get_bin(id).await?;
        bin.status = status;
        bin.updated_at = Utc::now();
        self.store.update_bin(&bin).await?;

        info!(bin_id = %bin.id, status = %status.as_str(), "Bin status changed");
        Ok(bin)
    }

    /// 衝突しないhuman codeを引く
    async fn draw_unique_code(&self) -> Result<String> {
        for _ in 0..GENERATE_ATTEMPTS {
            let candidate = generate_human_code();
            if self.store.find_by_human_code(&candidate).await?.is_none() {
                return Ok(candidate);
            }
            debug!(candidate = %candidate, "Generated human code collided, redrawing");
        }

        Err(Error::Internal(format!(
            "Could not draw a unique human code in {} attempts",
            GENERATE_ATTEMPTS
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn service() -> (Arc<InMemoryStore>, BinRegistryService) {
        let store = Arc::new(InMemoryStore::new());
        let svc = BinRegistryService::new(store.clone(), "https://x/staff/collect");
        (store, svc)
    }

    fn create_request(code: Option<&str>) -> CreateBinRequest {
        CreateBinRequest {
            human_code: code.map(String::from),
            owner_ref: Some("resident-1".to_string()),
            location: Some("Block 4".to_string()),
            fill_level: None,
        }
    }

    #[tokio::test]
    async fn test_create_bin_encodes_payload() {
        let (_, svc) = service();
        let bin = svc.create_bin(create_request(Some("BIN42"))).await.unwrap();

        assert_eq!(bin.human_code, "BIN42");
        assert_eq!(
            bin.qr_payload,
            "https://x/staff/collect?binId=BIN42&autoSubmit=true"
        );
        assert_eq!(bin.fill_level, 0);
        assert_eq!(bin.status, BinStatus::Active);
    }

    #[tokio::test]
    async fn test_create_bin_generates_code_when_absent() {
        let (_, svc) = service();
        let bin = svc.create_bin(create_request(None)).await.unwrap();

        assert!(bin.human_code.starts_with("BIN-"));
        assert!(bin.qr_payload.contains(&format!("binId={}", bin.human_code)));
    }

    #[tokio::test]
    async fn test_create_bin_rejects_duplicate_code() {
        let (_, svc) = service();
        svc.create_bin(create_request(Some("BIN42"))).await.unwrap();

        let err = svc.create_bin(create_request(Some("BIN42"))).await;
        assert!(matches!(err, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_bin_rejects_invalid_code() {
        let (_, svc) = service();
        let err = svc.create_bin(create_request(Some("bad code!"))).await;
        assert!(matches!(err, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_set_fill_level_bounds() {
        let (_, svc) = service();
        let bin = svc.create_bin(create_request(Some("BIN42"))).await.unwrap();

        let updated = svc.set_fill_level(&bin.id, 80).await.unwrap();
        assert_eq!(updated.fill_level, 80);

        assert!(matches!(
            svc.set_fill_level(&bin.id, 101).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            svc.set_fill_level(&bin.id, -1).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_set_status_soft_retires() {
        let (store, svc) = service();
        let bin = svc.create_bin(create_request(Some("BIN42"))).await.unwrap();

        let retired = svc.set_status(&bin.id, BinStatus::Inactive).await.unwrap();
        assert_eq!(retired.status, BinStatus::Inactive);

        // Still present in the store, only the status changed
        let found = store.find_by_human_code("BIN42").await.unwrap();
        assert!(found.is_some());
    }
}
