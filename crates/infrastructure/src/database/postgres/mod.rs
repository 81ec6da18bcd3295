pub mod postgres_host_repository;
pub mod postgres_link_repository;

pub use postgres_host_repository::PostgresHostRepository;
pub use postgres_link_repository::{PostgresLinkClaim, PostgresLinkRepository};

use inventory_core::InventoryResult;
use sqlx::PgPool;
use tracing::debug;

/// 创建 PostgreSQL 表结构
pub async fn run_migrations(pool: &PgPool) -> InventoryResult<()> {
    debug!("Running PostgreSQL database migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS links (
            source_type VARCHAR(64) PRIMARY KEY,
            endpoint TEXT NOT NULL,
            last_checked TIMESTAMPTZ NOT NULL DEFAULT 'epoch'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS host_data (
            id BIGSERIAL PRIMARY KEY,
            host_name TEXT NOT NULL DEFAULT '',
            internal_ip TEXT NOT NULL DEFAULT '',
            external_ip TEXT,
            recent_raw_hash TEXT,
            document JSONB NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_host_data_identity ON host_data(host_name, internal_ip)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_host_data_candidate ON host_data(host_name, external_ip)",
    )
    .execute(pool)
    .await?;

    debug!("PostgreSQL database migrations completed");
    Ok(())
}
