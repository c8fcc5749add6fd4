//! Scope provider
//!
//! Opens a transaction per logical operation and guarantees it ends: commit
//! when the operation succeeds, rollback on error. A panic or a dropped future
//! drops the transaction, which sqlx rolls back when the connection returns to
//! the pool.

use super::ambient::{AmbientScope, ScopeHandle};
use crate::error::{Error, Result};
use crate::storage::Database;
use sqlx::SqlitePool;
use std::future::Future;
use tracing::{debug, info, warn};

/// How a scope ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeOutcome {
    Committed,
    RolledBack,
}

/// Opens ambient scopes over a connection pool
#[derive(Debug, Clone)]
pub struct ScopeProvider {
    pool: SqlitePool,
}

impl ScopeProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn from_database(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run `operation` inside a scope
    ///
    /// When a scope is already ambient on this task, the operation joins it
    /// as a nested scope sharing the same transaction; an `Err` from a nested
    /// operation makes the outermost scope roll back. If the outermost
    /// operation still returns `Ok`, the caller gets [`Error::ScopeAborted`].
    ///
    /// The transaction begins deferred. A write lock waits out contention
    /// only when it is the scope's first statement; once the scope has read,
    /// a contended write lock fails immediately with
    /// [`Error::WriteLockTimeout`]. Take write locks before reading.
    pub async fn run<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(scope) = AmbientScope::current() {
            return run_nested(scope, operation).await;
        }

        let transaction = self.pool.begin().await?;
        let scope = ScopeHandle::new(transaction);
        debug!(scope_id = %scope.id(), "Scope opened");

        let result = AmbientScope::enter(scope.clone(), async move { operation().await }).await;

        match result {
            Ok(value) => match complete(&scope, true).await? {
                ScopeOutcome::Committed => Ok(value),
                ScopeOutcome::RolledBack => Err(Error::ScopeAborted(scope.id())),
            },
            Err(err) => {
                if let Err(rollback_err) = complete(&scope, false).await {
                    warn!(
                        scope_id = %scope.id(),
                        error = %rollback_err,
                        "Scope rollback failed"
                    );
                }
                Err(err)
            }
        }
    }
}

async fn run_nested<F, Fut, T>(scope: ScopeHandle, operation: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let depth = scope.enter_nested().await;
    debug!(scope_id = %scope.id(), depth, "Nested scope opened");

    let result = operation().await;

    scope.exit_nested(result.is_ok()).await;
    if result.is_err() {
        warn!(
            scope_id = %scope.id(),
            depth,
            "Nested scope failed; scope will roll back"
        );
    }
    result
}

/// End the outermost scope's transaction
async fn complete(scope: &ScopeHandle, commit: bool) -> Result<ScopeOutcome> {
    let mut state = scope.lock().await;
    let rollback_only = state.is_rollback_only();
    let transaction = state
        .take_transaction()
        .ok_or_else(|| Error::Other(format!("Scope {} already completed", scope.id())))?;

    if commit && !rollback_only {
        transaction.commit().await?;
        info!(scope_id = %scope.id(), "Scope committed");
        Ok(ScopeOutcome::Committed)
    } else {
        transaction.rollback().await?;
        if rollback_only {
            warn!(scope_id = %scope.id(), "Scope rolled back after nested failure");
        } else {
            debug!(scope_id = %scope.id(), "Scope rolled back");
        }
        Ok(ScopeOutcome::RolledBack)
    }
}
