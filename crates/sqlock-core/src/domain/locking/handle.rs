//! Lock handles
//!
//! A handle is acquired in its constructor and never releases anything
//! itself: the lock lives exactly as long as the ambient scope's transaction.
//! Dropping a handle only logs.

use super::busy;
use super::store::LockStore;
use super::types::LockType;
use crate::domain::scope::{AmbientScope, WeakScope};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A lock held for the remainder of the ambient scope
///
/// Scope transactions begin deferred. A write lock waits out contention only
/// when it is the scope's first statement. After the scope has read anything,
/// the toggle is a read-to-write upgrade: SQLite reports `SQLITE_BUSY` at once
/// without consulting the busy handler, and the lock fails with
/// [`Error::WriteLockTimeout`] whose `waited` is far below its `timeout`.
#[derive(Debug)]
pub struct LockHandle {
    lock_id: i32,
    lock_type: LockType,
    scope: WeakScope,
    /// `host:pid` of the process that took the lock
    holder: String,
    acquired_at: DateTime<Utc>,
}

impl LockHandle {
    /// Acquire a lock inside the ambient scope's transaction
    pub(crate) async fn acquire(
        lock_id: i32,
        lock_type: LockType,
        timeout: Duration,
    ) -> Result<Self> {
        debug!(
            lock_id = lock_id,
            lock_type = %lock_type,
            timeout_ms = timeout.as_millis() as u64,
            "Requesting lock"
        );

        let operation = format!("{}({})", lock_type, lock_id);
        let scope = AmbientScope::require(&operation)?;
        {
            let mut state = scope.lock().await;
            let conn = state.connection(&operation)?;

            // Read locks only assert the transaction: WAL readers never block
            if lock_type == LockType::WriteLock {
                obtain_write_lock(conn, lock_id, timeout).await?;
            }
        }

        let handle = Self {
            lock_id,
            lock_type,
            scope: scope.downgrade(),
            holder: holder_id(),
            acquired_at: Utc::now(),
        };

        info!(
            lock_id = lock_id,
            lock_type = %lock_type,
            scope_id = %handle.scope.id(),
            "Acquired lock"
        );
        Ok(handle)
    }

    pub fn lock_id(&self) -> i32 {
        self.lock_id
    }

    pub fn lock_type(&self) -> LockType {
        self.lock_type
    }

    /// Id of the scope whose transaction holds this lock
    pub fn scope_id(&self) -> Uuid {
        self.scope.id()
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    /// Whether the owning transaction is still open
    pub async fn is_live(&self) -> bool {
        self.scope.is_live().await
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        debug!(
            lock_id = self.lock_id,
            lock_type = %self.lock_type,
            scope_id = %self.scope.id(),
            "Dropped lock"
        );
    }
}

impl fmt::Display for LockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DistributedLock({}, {})", self.lock_id, self.lock_type)
    }
}

/// Toggle the lock row under a busy timeout equal to the lock timeout
///
/// The engine's busy handler does the waiting; a single busy result is a
/// timeout, there is no retry loop here. The reported wait is measured, since
/// an upgrade from a read transaction fails without waiting at all.
async fn obtain_write_lock(
    conn: &mut SqliteConnection,
    lock_id: i32,
    timeout: Duration,
) -> Result<()> {
    let (previous,): (i64,) = sqlx::query_as("PRAGMA busy_timeout")
        .fetch_one(&mut *conn)
        .await?;
    set_busy_timeout(conn, i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX)).await?;

    let started = Instant::now();
    let toggled = LockStore::toggle(conn, lock_id).await;
    let waited = started.elapsed();

    if let Err(err) = set_busy_timeout(conn, previous).await {
        warn!(lock_id = lock_id, error = %err, "Failed to restore busy timeout");
    }

    match toggled {
        Ok(0) => Err(Error::LockRowMissing(lock_id)),
        Ok(_) => Ok(()),
        Err(err) => Err(busy::classify_write_error(err, lock_id, timeout, waited)),
    }
}

async fn set_busy_timeout(conn: &mut SqliteConnection, millis: i64) -> sqlx::Result<()> {
    let millis = millis.clamp(0, i64::from(i32::MAX));
    // PRAGMA arguments cannot be bound
    sqlx::query(&format!("PRAGMA busy_timeout = {}", millis))
        .execute(conn)
        .await?;
    Ok(())
}

fn holder_id() -> String {
    format!(
        "{}:{}",
        gethostname::gethostname().to_string_lossy(),
        std::process::id()
    )
}
