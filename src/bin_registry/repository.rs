//! Bin registry repository
//!
//! MySQL access layer for bins

use crate::bin_registry::types::{Bin, BinStatus};
use crate::error::{Error, Result};
use crate::store::BinStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

/// MySQL-backed bin repository
#[derive(Clone)]
pub struct BinRepository {
    pool: MySqlPool,
}

impl BinRepository {
    /// Create new repository
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Bin SELECT columns
    const BIN_COLUMNS: &'static str = r#"
        id, human_code, qr_payload, fill_level, status,
        owner_ref, location, last_collection_at, next_collection_at,
        created_at, updated_at
    "#;

    async fn fetch_one_opt(&self, where_clause: &str, bind: &str) -> Result<Option<Bin>> {
        let query = format!(
            "SELECT {} FROM bins WHERE {}",
            Self::BIN_COLUMNS,
            where_clause
        );
        let row = sqlx::query_as::<_, BinRow>(&query)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Bin::try_from).transpose()
    }
}

#[async_trait]
impl BinStore for BinRepository {
    async fn find_by_human_code(&self, code: &str) -> Result<Option<Bin>> {
        self.fetch_one_opt("human_code = ?", code).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Bin>> {
        self.fetch_one_opt("id = ?", id).await
    }

    async fn list_bins(&self) -> Result<Vec<Bin>> {
        let query = format!(
            "SELECT {} FROM bins ORDER BY human_code",
            Self::BIN_COLUMNS
        );
        let rows = sqlx::query_as::<_, BinRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Bin::try_from).collect()
    }

    async fn insert_bin(&self, bin: &Bin) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bins (
                id, human_code, qr_payload, fill_level, status,
                owner_ref, location, last_collection_at, next_collection_at,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&bin.id)
        .bind(&bin.human_code)
        .bind(&bin.qr_payload)
        .bind(bin.fill_level)
        .bind(bin.status.as_str())
        .bind(&bin.owner_ref)
        .bind(&bin.location)
        .bind(bin.last_collection_at)
        .bind(bin.next_collection_at)
        .bind(bin.created_at)
        .bind(bin.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_bin(&self, bin: &Bin) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE bins SET
                fill_level = ?, status = ?, owner_ref = ?, location = ?,
                last_collection_at = ?, next_collection_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(bin.fill_level)
        .bind(bin.status.as_str())
        .bind(&bin.owner_ref)
        .bind(&bin.location)
        .bind(bin.last_collection_at)
        .bind(bin.next_collection_at)
        .bind(bin.updated_at)
        .bind(&bin.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Bin {} not found", bin.id)));
        }

        Ok(())
    }
}

/// Raw bin row (status as stored string)
#[derive(sqlx::FromRow)]
pub(crate) struct BinRow {
    pub id: String,
    pub human_code: String,
    pub qr_payload: String,
    pub fill_level: i32,
    pub status: String,
    pub owner_ref: Option<String>,
    pub location: Option<String>,
    pub last_collection_at: Option<DateTime<Utc>>,
    pub next_collection_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BinRow> for Bin {
    type Error = Error;

    fn try_from(row: BinRow) -> Result<Bin> {
        let status = BinStatus::parse(&row.status)
            .ok_or_else(|| Error::Database(format!("Unknown bin status: {}", row.status)))?;

        Ok(Bin {
            id: row.id,
            human_code: row.human_code,
            qr_payload: row.qr_payload,
            fill_level: row.fill_level,
            status,
            owner_ref: row.owner_ref,
            location: row.location,
            last_collection_at: row.last_collection_at,
            next_collection_at: row.next_collection_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
