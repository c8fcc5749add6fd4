//! Lock row store
//!
//! One row per logical lock id in `sqlock_locks`. The only mutation is the
//! single-statement toggle: reading the value and writing it back in two
//! statements would not be atomic at the engine level.

use crate::domain::scope::AmbientScope;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

/// Value every lock row is seeded with
pub const LOCK_VALUE_SEED: i64 = 1;

const TOGGLE_LOCK_ROW: &str =
    "UPDATE sqlock_locks SET value = (CASE WHEN (value = 1) THEN -1 ELSE 1 END) WHERE id = ?";

/// A persisted lock row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LockRow {
    pub id: i32,
    /// Toggles between 1 and -1; carries no meaning beyond forcing a write
    pub value: i64,
    pub name: String,
}

/// Queries over the lock table, run on the ambient scope's transaction
#[derive(Debug, Clone, Copy, Default)]
pub struct LockStore;

impl LockStore {
    /// Flip the row's value and return the number of rows affected
    ///
    /// Zero means the lock id has no row. Errors are returned raw so the
    /// caller can classify busy/locked statuses.
    pub(crate) async fn toggle(
        conn: &mut SqliteConnection,
        lock_id: i32,
    ) -> std::result::Result<u64, sqlx::Error> {
        let result = sqlx::query(TOGGLE_LOCK_ROW)
            .bind(lock_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Current toggle value of a lock row, as seen by the ambient transaction
    pub async fn value(lock_id: i32) -> Result<Option<i64>> {
        let scope = AmbientScope::require(&format!("LockStore::value({})", lock_id))?;
        let mut state = scope.lock().await;
        let conn = state.connection("LockStore::value")?;

        let row: Option<(i64,)> = sqlx::query_as("SELECT value FROM sqlock_locks WHERE id = ?")
            .bind(lock_id)
            .fetch_optional(conn)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Whether a row exists for the lock id
    pub async fn exists(lock_id: i32) -> Result<bool> {
        Ok(Self::value(lock_id).await?.is_some())
    }

    /// All lock rows ordered by id
    pub async fn list() -> Result<Vec<LockRow>> {
        let scope = AmbientScope::require("LockStore::list")?;
        let mut state = scope.lock().await;
        let conn = state.connection("LockStore::list")?;

        sqlx::query_as::<_, LockRow>("SELECT id, value, name FROM sqlock_locks ORDER BY id")
            .fetch_all(conn)
            .await
            .map_err(Error::DatabaseError)
    }
}
