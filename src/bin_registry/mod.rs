//! BinRegistry Module
//!
//! ## 概要
//! ビン（ゴミ収集容器）のレジストリ。作成時にhuman codeを確定し、
//! スキャン可能なQRペイロードをエンコードして永続化する。
//!
//! ## モジュール構成
//! - `types`: 型定義
//! - `qr_payload`: human code生成・QRペイロードエンコード
//! - `repository`: DB永続化
//! - `service`: レジストリサービス本体
//!
//! ## QRペイロード形式
//! ```text
//! <collect_base_url>?binId=<humanCode>&autoSubmit=true
//! ```
//!
//! ## 使用例
//! ```rust,ignore
//! use ecobin_server::bin_registry::{BinRegistryService, CreateBinRequest};
//!
//! let service = BinRegistryService::new(store, "https://x/staff/collect");
//!
//! let bin = service.create_bin(CreateBinRequest {
//!     human_code: Some("BIN42".to_string()),
//!     owner_ref: Some("resident-1".to_string()),
//!     location: Some("Block 4".to_string()),
//!     fill_level: None,
//! }).await?;
//!
//! assert_eq!(bin.qr_payload, "https://x/staff/collect?binId=BIN42&autoSubmit=true");
//! ```

pub mod qr_payload;
pub mod repository;
pub mod service;
pub mod types;

// Re-exports
pub use qr_payload::{encode_qr_payload, extract_human_code, generate_human_code};
pub use repository::BinRepository;
pub use service::BinRegistryService;
pub use types::*;
