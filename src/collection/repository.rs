//! Collection repository
//!
//! MySQL access layer for collection records. The record append and the bin
//! update run inside one transaction; a failure on either side rolls both
//! back.

use crate::bin_registry::types::Bin;
use crate::collection::types::CollectionRecord;
use crate::error::Result;
use crate::store::CollectionStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

/// MySQL-backed collection repository
#[derive(Clone)]
pub struct CollectionRepository {
    pool: MySqlPool,
}

impl CollectionRepository {
    /// Create new repository
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Record SELECT columns
    const RECORD_COLUMNS: &'static str = r#"
        id, bin_ref, staff_ref, resident_ref, waste_type, weight, notes, collected_at
    "#;
}

#[async_trait]
impl CollectionStore for CollectionRepository {
    async fn apply_collection(&self, bin: &Bin, record: &CollectionRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO collection_records (
                id, bin_ref, staff_ref, resident_ref, waste_type, weight, notes, collected_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.bin_ref)
        .bind(&record.staff_ref)
        .bind(&record.resident_ref)
        .bind(&record.waste_type)
        .bind(record.weight)
        .bind(&record.notes)
        .bind(record.collected_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE bins SET
                fill_level = ?, last_collection_at = ?, next_collection_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(bin.fill_level)
        .bind(bin.last_collection_at)
        .bind(bin.next_collection_at)
        .bind(bin.updated_at)
        .bind(&bin.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn list_records(&self, bin_id: &str, limit: usize) -> Result<Vec<CollectionRecord>> {
        let query = format!(
            "SELECT {} FROM collection_records WHERE bin_ref = ? ORDER BY collected_at DESC LIMIT ?",
            Self::RECORD_COLUMNS
        );
        let rows = sqlx::query_as::<_, RecordRow>(&query)
            .bind(bin_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(CollectionRecord::from).collect())
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: String,
    bin_ref: String,
    staff_ref: String,
    resident_ref: Option<String>,
    waste_type: String,
    weight: f64,
    notes: Option<String>,
    collected_at: DateTime<Utc>,
}

impl From<RecordRow> for CollectionRecord {
    fn from(row: RecordRow) -> Self {
        Self {
            id: row.id,
            bin_ref: row.bin_ref,
            staff_ref: row.staff_ref,
            resident_ref: row.resident_ref,
            waste_type: row.waste_type,
            weight: row.weight,
            notes: row.notes,
            collected_at: row.collected_at,
        }
    }
}
