use async_trait::async_trait;
use chrono::Utc;
use inventory_core::{HostRecord, HostRepository, InventoryResult};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::database::mapping::{
    decode_document, encode_document, key_column, nullable_column, to_millis, HostColumns,
};

/// 以 JSON 文本存储主机记录，身份列单独建索引
pub struct SqliteHostRepository {
    pool: SqlitePool,
}

impl SqliteHostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_host(row: &sqlx::sqlite::SqliteRow) -> InventoryResult<HostRecord> {
        let document: String = row.try_get("document")?;
        decode_document(&document)
    }
}

#[async_trait]
impl HostRepository for SqliteHostRepository {
    async fn find_by_host_and_external_ip(
        &self,
        host_name: Option<&str>,
        external_ip: Option<&str>,
    ) -> InventoryResult<Option<HostRecord>> {
        let row = sqlx::query(
            r#"
            SELECT document FROM host_data
            WHERE host_name = $1 AND external_ip IS $2
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(key_column(host_name))
        .bind(nullable_column(external_ip))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_host).transpose()
    }

    async fn insert(&self, record: &HostRecord) -> InventoryResult<()> {
        let columns = HostColumns::of(record);
        sqlx::query(
            r#"
            INSERT INTO host_data (host_name, internal_ip, external_ip, recent_raw_hash, document, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(columns.host_name)
        .bind(columns.internal_ip)
        .bind(columns.external_ip)
        .bind(columns.recent_raw_hash)
        .bind(encode_document(record)?)
        .bind(to_millis(Utc::now()))
        .execute(&self.pool)
        .await?;

        debug!("插入主机记录: {}", record.describe());
        Ok(())
    }

    async fn update_by_host_name(&self, record: &HostRecord) -> InventoryResult<bool> {
        let columns = HostColumns::of(record);
        let result = sqlx::query(
            r#"
            UPDATE host_data
            SET internal_ip = $1, external_ip = $2, recent_raw_hash = $3, document = $4, updated_at = $5
            WHERE id = (SELECT id FROM host_data WHERE host_name = $6 ORDER BY id LIMIT 1)
            "#,
        )
        .bind(columns.internal_ip)
        .bind(columns.external_ip)
        .bind(columns.recent_raw_hash)
        .bind(encode_document(record)?)
        .bind(to_millis(Utc::now()))
        .bind(columns.host_name)
        .execute(&self.pool)
        .await?;

        debug!("更新主机记录: {}", record.describe());
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> InventoryResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM host_data")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("count")?)
    }

    async fn list(&self) -> InventoryResult<Vec<HostRecord>> {
        let rows = sqlx::query("SELECT document FROM host_data ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_host).collect()
    }
}
