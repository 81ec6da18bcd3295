pub mod sqlite_host_repository;
pub mod sqlite_link_repository;

pub use sqlite_host_repository::SqliteHostRepository;
pub use sqlite_link_repository::{SqliteLinkClaim, SqliteLinkRepository};

use inventory_core::InventoryResult;
use sqlx::SqlitePool;
use tracing::debug;

/// 创建 SQLite 表结构
pub async fn run_migrations(pool: &SqlitePool) -> InventoryResult<()> {
    debug!("Running SQLite database migrations");

    // 链接注册表，时间以毫秒时间戳存储
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS links (
            source_type TEXT PRIMARY KEY,
            endpoint TEXT NOT NULL,
            last_checked INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS host_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            host_name TEXT NOT NULL DEFAULT '',
            internal_ip TEXT NOT NULL DEFAULT '',
            external_ip TEXT,
            recent_raw_hash TEXT,
            document TEXT NOT NULL,
            updated_at INTEGER NOT NULL
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

    debug!("SQLite database migrations completed");
    Ok(())
}
