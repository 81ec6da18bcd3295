use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use inventory_core::{InventoryError, InventoryResult, LinkClaim, LinkRecord, LinkRepository};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

pub struct PostgresLinkRepository {
    pool: PgPool,
}

impl PostgresLinkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_link(row: &sqlx::postgres::PgRow) -> InventoryResult<LinkRecord> {
        Ok(LinkRecord {
            source_type: row.try_get("source_type")?,
            endpoint: row.try_get("endpoint")?,
            last_checked: row.try_get("last_checked")?,
        })
    }
}

#[async_trait]
impl LinkRepository for PostgresLinkRepository {
    async fn seed_links(&self, links: &[LinkRecord]) -> InventoryResult<u64> {
        let mut inserted = 0;
        for link in links {
            let result = sqlx::query(
                r#"
                INSERT INTO links (source_type, endpoint, last_checked)
                VALUES ($1, $2, $3)
                ON CONFLICT (source_type) DO NOTHING
                "#,
            )
            .bind(&link.source_type)
            .bind(&link.endpoint)
            .bind(link.last_checked)
            .execute(&self.pool)
            .await?;
            inserted += result.rows_affected();
        }

        debug!("初始化链接完成，新增 {} 条", inserted);
        Ok(inserted)
    }

    async fn set_endpoint(&self, source_type: &str, endpoint: &str) -> InventoryResult<bool> {
        let result = sqlx::query("UPDATE links SET endpoint = $1 WHERE source_type = $2")
            .bind(endpoint)
            .bind(source_type)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_by_source_type(&self, source_type: &str) -> InventoryResult<Option<LinkRecord>> {
        let row = sqlx::query(
            "SELECT source_type, endpoint, last_checked FROM links WHERE source_type = $1",
        )
        .bind(source_type)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_link).transpose()
    }

    async fn list(&self) -> InventoryResult<Vec<LinkRecord>> {
        let rows = sqlx::query(
            "SELECT source_type, endpoint, last_checked FROM links ORDER BY source_type",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_link).collect()
    }

    async fn due_links(
        &self,
        now: DateTime<Utc>,
        refresh_interval: Duration,
    ) -> InventoryResult<Vec<LinkRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT source_type, endpoint, last_checked FROM links
            WHERE last_checked <= $1
            ORDER BY source_type
            "#,
        )
        .bind(now - refresh_interval)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_link).collect()
    }

    async fn mark_checked(&self, source_type: &str, now: DateTime<Utc>) -> InventoryResult<()> {
        sqlx::query("UPDATE links SET last_checked = $1 WHERE source_type = $2")
            .bind(now)
            .bind(source_type)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn claim_due_links(
        &self,
        now: DateTime<Utc>,
        refresh_interval: Duration,
    ) -> InventoryResult<Box<dyn LinkClaim>> {
        let mut tx = self.pool.begin().await?;

        // 已被其他实例锁定的行直接跳过
        let rows = sqlx::query(
            r#"
            SELECT source_type, endpoint, last_checked FROM links
            WHERE last_checked <= $1
            ORDER BY source_type
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(now - refresh_interval)
        .fetch_all(&mut *tx)
        .await?;

        let links = rows
            .iter()
            .map(Self::row_to_link)
            .collect::<InventoryResult<Vec<_>>>()?;

        Ok(Box::new(PostgresLinkClaim {
            tx: Some(tx),
            links,
        }))
    }
}

/// PostgreSQL 上的到期链接认领，持有行锁直到提交或丢弃
pub struct PostgresLinkClaim {
    tx: Option<Transaction<'static, Postgres>>,
    links: Vec<LinkRecord>,
}

#[async_trait]
impl LinkClaim for PostgresLinkClaim {
    fn links(&self) -> &[LinkRecord] {
        &self.links
    }

    async fn mark_checked(&mut self, source_type: &str, now: DateTime<Utc>) -> InventoryResult<()> {
        let tx = self
            .tx
            .as_mut()
            .ok_or_else(|| InventoryError::Internal("链接认领已提交".to_string()))?;
        sqlx::query("UPDATE links SET last_checked = $1 WHERE source_type = $2")
            .bind(now)
            .bind(source_type)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn commit(&mut self) -> InventoryResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| InventoryError::Internal("链接认领已提交".to_string()))?;
        tx.commit().await?;
        Ok(())
    }
}
