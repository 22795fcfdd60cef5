//! Collection Module
//!
//! ## 概要
//! 収集状態機械。解決済みのビンに収集イベントを適用し、不変の
//! CollectionRecordを追記、fill levelとタイムスタンプを更新する。
//!
//! ## モジュール構成
//! - `types`: 型定義
//! - `repository`: DB永続化（トランザクション）
//! - `service`: 状態遷移本体
//!
//! ## 不変条件
//! - 成功時: fill_level == 0、新規レコードちょうど1件
//! - 失敗時: 部分適用なし（レコードもビンも未変更）
//! - レコードは作成後、変更・削除されない

pub mod repository;
pub mod service;
pub mod types;

// Re-exports
pub use repository::CollectionRepository;
pub use service::CollectionService;
pub use types::*;
