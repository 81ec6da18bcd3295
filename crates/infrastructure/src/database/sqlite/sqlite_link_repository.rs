use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use inventory_core::{InventoryError, InventoryResult, LinkClaim, LinkRecord, LinkRepository};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::database::mapping::{from_millis, to_millis};

pub struct SqliteLinkRepository {
    pool: SqlitePool,
}

impl SqliteLinkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_link(row: &sqlx::sqlite::SqliteRow) -> InventoryResult<LinkRecord> {
        Ok(LinkRecord {
            source_type: row.try_get("source_type")?,
            endpoint: row.try_get("endpoint")?,
            last_checked: from_millis(row.try_get("last_checked")?)?,
        })
    }
}

#[async_trait]
impl LinkRepository for SqliteLinkRepository {
    async fn seed_links(&self, links: &[LinkRecord]) -> InventoryResult<u64> {
        let mut inserted = 0;
        for link in links {
            let result = sqlx::query(
                r#"
                INSERT INTO links (source_type, endpoint, last_checked)
                VALUES ($1, $2, $3)
                ON CONFLICT(source_type) DO NOTHING
                "#,
            )
            .bind(&link.source_type)
            .bind(&link.endpoint)
            .bind(to_millis(link.last_checked))
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
        .bind(to_millis(now - refresh_interval))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_link).collect()
    }

    async fn mark_checked(&self, source_type: &str, now: DateTime<Utc>) -> InventoryResult<()> {
        sqlx::query("UPDATE links SET last_checked = $1 WHERE source_type = $2")
            .bind(to_millis(now))
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
        let cutoff = to_millis(now - refresh_interval);
        let mut tx = self.pool.begin().await?;

        // SQLite 的 BEGIN 是延迟事务，先执行一次写操作以获取写锁，
        // 其他实例的认领会在此等待直到本事务结束
        sqlx::query("UPDATE links SET last_checked = last_checked WHERE last_checked <= $1")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT source_type, endpoint, last_checked FROM links
            WHERE last_checked <= $1
            ORDER BY source_type
            "#,
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await?;

        let links = rows
            .iter()
            .map(Self::row_to_link)
            .collect::<InventoryResult<Vec<_>>>()?;

        Ok(Box::new(SqliteLinkClaim {
            tx: Some(tx),
            links,
        }))
    }
}

/// SQLite 上的到期链接认领，持有写事务直到提交或丢弃
pub struct SqliteLinkClaim {
    tx: Option<Transaction<'static, Sqlite>>,
    links: Vec<LinkRecord>,
}

impl SqliteLinkClaim {
    fn transaction(&mut self) -> InventoryResult<&mut Transaction<'static, Sqlite>> {
        self.tx
            .as_mut()
            .ok_or_else(|| InventoryError::Internal("链接认领已提交".to_string()))
    }
}

#[async_trait]
impl LinkClaim for SqliteLinkClaim {
    fn links(&self) -> &[LinkRecord] {
        &self.links
    }

    async fn mark_checked(&mut self, source_type: &str, now: DateTime<Utc>) -> InventoryResult<()> {
        let tx = self.transaction()?;
        sqlx::query("UPDATE links SET last_checked = $1 WHERE source_type = $2")
            .bind(to_millis(now))
            .bind(source_type)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn commit(&mut self) -> InventoryResult<()> {
        match self.tx.take() {
            Some(tx) => Ok(tx.commit().await?),
            None => Err(InventoryError::Internal("链接认领已提交".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::sqlite::run_migrations;
    use inventory_core::SourceType;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;
    use std::sync::Arc;

    async fn setup() -> SqliteLinkRepository {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteLinkRepository::new(pool)
    }

    fn seeds() -> Vec<LinkRecord> {
        SourceType::ALL
            .iter()
            .map(|s| LinkRecord::new(s.as_str(), s.placeholder_endpoint()))
            .collect()
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let repo = setup().await;
        assert_eq!(repo.seed_links(&seeds()).await.unwrap(), 2);
        assert_eq!(repo.seed_links(&seeds()).await.unwrap(), 0);

        let links = repo.list().await.unwrap();
        assert_eq!(links.len(), 2);
        assert!(links
            .iter()
            .all(|l| l.last_checked == DateTime::<Utc>::UNIX_EPOCH));
    }

    #[tokio::test]
    async fn test_seed_keeps_existing_endpoint() {
        let repo = setup().await;
        repo.seed_links(&seeds()).await.unwrap();
        assert!(repo
            .set_endpoint("qualys", "https://scan.example.com/hosts")
            .await
            .unwrap());
        repo.seed_links(&seeds()).await.unwrap();

        let link = repo.get_by_source_type("qualys").await.unwrap().unwrap();
        assert_eq!(link.endpoint, "https://scan.example.com/hosts");
        assert!(!repo.set_endpoint("unknown", "https://x").await.unwrap());
    }

    #[tokio::test]
    async fn test_due_links_respects_refresh_interval() {
        let repo = setup().await;
        repo.seed_links(&seeds()).await.unwrap();

        let now = Utc::now();
        let interval = Duration::hours(1);
        assert_eq!(repo.due_links(now, interval).await.unwrap().len(), 2);

        repo.mark_checked("crowdstrike", now).await.unwrap();
        let due = repo.due_links(now, interval).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].source_type, "qualys");

        let later = now + Duration::hours(1);
        assert_eq!(repo.due_links(later, interval).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_claim_commit_marks_links() {
        let repo = setup().await;
        repo.seed_links(&seeds()).await.unwrap();
        let now = Utc::now();
        let interval = Duration::hours(1);

        let mut claim = repo.claim_due_links(now, interval).await.unwrap();
        let claimed: Vec<String> = claim.links().iter().map(|l| l.source_type.clone()).collect();
        assert_eq!(claimed, vec!["crowdstrike", "qualys"]);
        for source_type in &claimed {
            claim.mark_checked(source_type, now).await.unwrap();
        }
        claim.commit().await.unwrap();
        assert!(claim.commit().await.is_err());
        drop(claim);

        assert!(repo.due_links(now, interval).await.unwrap().is_empty());
        let link = repo.get_by_source_type("crowdstrike").await.unwrap().unwrap();
        assert_eq!(link.last_checked.timestamp_millis(), now.timestamp_millis());
    }

    #[tokio::test]
    async fn test_dropped_claim_rolls_back() {
        let repo = setup().await;
        repo.seed_links(&seeds()).await.unwrap();
        let now = Utc::now();
        let interval = Duration::hours(1);

        {
            let mut claim = repo.claim_due_links(now, interval).await.unwrap();
            claim.mark_checked("crowdstrike", now).await.unwrap();
        }

        assert_eq!(repo.due_links(now, interval).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_claim_waits_for_first_commit() {
        let dir = tempfile::TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("links.db").display());
        let options = SqliteConnectOptions::from_str(&url)
            .unwrap()
            .create_if_missing(true)
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        let repo = Arc::new(SqliteLinkRepository::new(pool));
        repo.seed_links(&seeds()).await.unwrap();

        let now = Utc::now();
        let interval = Duration::hours(1);
        let mut first = repo.claim_due_links(now, interval).await.unwrap();
        assert_eq!(first.links().len(), 2);

        let second = {
            let repo = repo.clone();
            tokio::spawn(async move {
                let mut claim = repo.claim_due_links(now, interval).await.unwrap();
                let claimed = claim.links().len();
                claim.commit().await.unwrap();
                claimed
            })
        };

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert!(!second.is_finished());

        for source_type in ["crowdstrike", "qualys"] {
            first.mark_checked(source_type, now).await.unwrap();
        }
        first.commit().await.unwrap();

        let claimed = tokio::time::timeout(std::time::Duration::from_secs(5), second)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed, 0);
    }
}
