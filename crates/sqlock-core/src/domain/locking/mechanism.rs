//! Distributed locking mechanisms
//!
//! A mechanism hands out [`LockHandle`]s for logical lock ids. The SQLite
//! variant relies on WAL semantics: read locks never contend, write locks
//! perform a real write to the lock row so the engine serializes writers.

use super::handle::LockHandle;
use super::types::LockType;
use crate::config::{Config, LockingConfig};
use crate::domain::scope::AmbientScope;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Provider name the SQLite mechanism answers to
pub const SQLITE_PROVIDER_NAME: &str = "Sqlite";

/// A source of distributed locks scoped to the ambient transaction
#[async_trait]
pub trait DistributedLockingMechanism: Send + Sync + fmt::Debug {
    /// Short name for logs and diagnostics
    fn name(&self) -> &str;

    /// Whether this mechanism can serve locks right now
    ///
    /// Never errors; an ineligible mechanism just answers `false`.
    fn enabled(&self) -> bool;

    /// Take a shared lock; `None` uses the configured read timeout
    async fn read_lock(&self, lock_id: i32, timeout: Option<Duration>) -> Result<LockHandle>;

    /// Take an exclusive lock; `None` uses the configured write timeout
    async fn write_lock(&self, lock_id: i32, timeout: Option<Duration>) -> Result<LockHandle>;
}

/// WAL-mode SQLite mechanism
#[derive(Debug, Clone)]
pub struct SqliteDistributedLockingMechanism {
    connection_string: Option<String>,
    provider_name: String,
    locking: LockingConfig,
}

impl SqliteDistributedLockingMechanism {
    pub fn new(
        connection_string: Option<String>,
        provider_name: impl Into<String>,
        locking: LockingConfig,
    ) -> Self {
        Self {
            connection_string,
            provider_name: provider_name.into(),
            locking,
        }
    }

    /// Build from application config, resolving the connection string once
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.database.resolved_connection_string(),
            config.database.provider_name.clone(),
            config.locking.clone(),
        )
    }

    pub fn locking(&self) -> &LockingConfig {
        &self.locking
    }

    fn is_configured(&self) -> bool {
        self.connection_string
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
            && self.provider_name.eq_ignore_ascii_case(SQLITE_PROVIDER_NAME)
    }
}

#[async_trait]
impl DistributedLockingMechanism for SqliteDistributedLockingMechanism {
    fn name(&self) -> &str {
        SQLITE_PROVIDER_NAME
    }

    fn enabled(&self) -> bool {
        self.is_configured() && AmbientScope::exists()
    }

    async fn read_lock(&self, lock_id: i32, timeout: Option<Duration>) -> Result<LockHandle> {
        let timeout = timeout.unwrap_or_else(|| self.locking.read_lock_timeout());
        LockHandle::acquire(lock_id, LockType::ReadLock, timeout).await
    }

    async fn write_lock(&self, lock_id: i32, timeout: Option<Duration>) -> Result<LockHandle> {
        let timeout = timeout.unwrap_or_else(|| self.locking.write_lock_timeout());
        LockHandle::acquire(lock_id, LockType::WriteLock, timeout).await
    }
}
