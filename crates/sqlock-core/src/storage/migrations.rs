//! Database migrations
//!
//! This module manages SQLite schema migrations for sqlock.
//! Migrations are versioned and applied automatically on database connection.
//!
//! Seeding the lock table lives here and only here: the locking mechanism
//! never inserts rows, it fails with `LockRowMissing` instead.

use crate::domain::locking::ids::WELL_KNOWN_LOCKS;
use crate::domain::locking::store::LOCK_VALUE_SEED;
use sqlx::SqlitePool;

/// Current schema version
pub const CURRENT_VERSION: i32 = 2;

/// SQL for creating the migrations tracking table
const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// Migration 1: Lock row table
const MIGRATION_V1: &str = r#"
    -- One row per logical lock id. `value` is toggled to force a write.
    CREATE TABLE IF NOT EXISTS sqlock_locks (
        id INTEGER PRIMARY KEY NOT NULL,
        value INTEGER NOT NULL DEFAULT 1,
        name TEXT NOT NULL
    );
"#;

/// Insert a lock row unless the id is already present
const SEED_LOCK_ROW: &str = "INSERT OR IGNORE INTO sqlock_locks (id, value, name) VALUES (?, ?, ?)";

/// Get the current schema version from the database
async fn get_current_version(pool: &SqlitePool) -> anyhow::Result<i32> {
    // Ensure migrations table exists; opening an up-to-date database must
    // not take the write lock while another process holds a lock row
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = '_migrations')",
    )
    .fetch_one(pool)
    .await?;
    if !exists {
        sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;
    }

    // MAX() yields a single NULL row on an empty table
    let (version,): (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_one(pool)
        .await?;

    Ok(version.unwrap_or(0))
}

/// Record that a migration has been applied
///
/// Another process opening the same fresh database may have recorded the
/// version first.
async fn record_migration(pool: &SqlitePool, version: i32) -> anyhow::Result<()> {
    sqlx::query("INSERT OR IGNORE INTO _migrations (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

/// Migration 2: seed one row per well-known lock id
async fn seed_well_known_locks(pool: &SqlitePool) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    for (id, name) in WELL_KNOWN_LOCKS {
        sqlx::query(SEED_LOCK_ROW)
            .bind(*id)
            .bind(LOCK_VALUE_SEED)
            .bind(*name)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Insert extra lock rows beyond the well-known set
///
/// Applications with their own logical lock ids seed them through this
/// call during deployment. Existing rows are left untouched.
pub async fn seed_lock_rows(pool: &SqlitePool, rows: &[(i32, &str)]) -> anyhow::Result<u64> {
    let mut tx = pool.begin().await?;

    let mut inserted = 0;
    for (id, name) in rows {
        inserted += sqlx::query(SEED_LOCK_ROW)
            .bind(*id)
            .bind(LOCK_VALUE_SEED)
            .bind(*name)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }

    tx.commit().await?;
    tracing::info!(requested = rows.len(), inserted, "Seeded lock rows");
    Ok(inserted)
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    let current_version = get_current_version(pool).await?;

    tracing::info!(
        current_version = current_version,
        target_version = CURRENT_VERSION,
        "Checking database migrations"
    );

    if current_version >= CURRENT_VERSION {
        tracing::debug!("Database is up to date");
        return Ok(());
    }

    if current_version < 1 {
        tracing::info!("Applying migration v1: Lock row table");
        sqlx::raw_sql(MIGRATION_V1).execute(pool).await?;
        record_migration(pool, 1).await?;
    }

    if current_version < 2 {
        tracing::info!("Applying migration v2: Well-known lock rows");
        seed_well_known_locks(pool).await?;
        record_migration(pool, 2).await?;
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

/// Check if the database needs migrations
pub async fn needs_migration(pool: &SqlitePool) -> anyhow::Result<bool> {
    let current_version = get_current_version(pool).await?;
    Ok(current_version < CURRENT_VERSION)
}

/// Get migration status information
pub async fn migration_status(pool: &SqlitePool) -> anyhow::Result<MigrationStatus> {
    let current_version = get_current_version(pool).await?;
    Ok(MigrationStatus {
        current_version,
        target_version: CURRENT_VERSION,
        needs_migration: current_version < CURRENT_VERSION,
    })
}

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Current schema version in the database
    pub current_version: i32,
    /// Target schema version (latest)
    pub target_version: i32,
    /// Whether migrations need to be run
    pub needs_migration: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::locking::ids;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool")
    }

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await;

        let status = migration_status(&pool).await.unwrap();
        assert_eq!(status.current_version, 0);
        assert!(status.needs_migration);

        run_migrations(&pool).await.unwrap();

        let status = migration_status(&pool).await.unwrap();
        assert_eq!(status.current_version, CURRENT_VERSION);
        assert!(!status.needs_migration);
        assert!(!needs_migration(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let pool = create_test_pool().await;

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let status = migration_status(&pool).await.unwrap();
        assert_eq!(status.current_version, CURRENT_VERSION);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sqlock_locks")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count as usize, WELL_KNOWN_LOCKS.len());
    }

    #[tokio::test]
    async fn test_well_known_rows_seeded_with_sentinel() {
        let pool = create_test_pool().await;
        run_migrations(&pool).await.unwrap();

        let (value, name): (i64, String) =
            sqlx::query_as("SELECT value, name FROM sqlock_locks WHERE id = ?")
                .bind(ids::CONTENT_TREE)
                .fetch_one(&pool)
                .await
                .expect("content tree lock row should exist");

        assert_eq!(value, 1);
        assert_eq!(name, "ContentTree");
    }

    #[tokio::test]
    async fn test_seed_lock_rows_leaves_existing_rows() {
        let pool = create_test_pool().await;
        run_migrations(&pool).await.unwrap();

        let inserted = seed_lock_rows(&pool, &[(3, "Custom"), (ids::MEDIA_TREE, "Clash")])
            .await
            .unwrap();
        assert_eq!(inserted, 1);

        let (name,): (String,) = sqlx::query_as("SELECT name FROM sqlock_locks WHERE id = ?")
            .bind(ids::MEDIA_TREE)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(name, "MediaTree");
    }

    #[tokio::test]
    async fn test_record_migration_tolerates_existing_version() {
        let pool = create_test_pool().await;
        run_migrations(&pool).await.unwrap();

        record_migration(&pool, 1).await.unwrap();
        record_migration(&pool, CURRENT_VERSION).await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, i64::from(CURRENT_VERSION));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_migrations_on_fresh_file() {
        use sqlx::sqlite::SqliteConnectOptions;
        use std::time::Duration;

        let dir = tempfile::TempDir::new().unwrap();
        let options = SqliteConnectOptions::new()
            .filename(dir.path().join("fresh.db"))
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        let first = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await
            .unwrap();
        let second = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            tokio::spawn(async move {
                run_migrations(&first).await.map(|_| first)
            }),
            tokio::spawn(async move { run_migrations(&second).await })
        );
        let first = a.unwrap().unwrap();
        b.unwrap().unwrap();

        let status = migration_status(&first).await.unwrap();
        assert_eq!(status.current_version, CURRENT_VERSION);
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sqlock_locks")
            .fetch_one(&first)
            .await
            .unwrap();
        assert_eq!(count as usize, WELL_KNOWN_LOCKS.len());
    }
}
