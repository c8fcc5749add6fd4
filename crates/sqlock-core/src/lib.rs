//! Sqlock Core Library
//!
//! Distributed locks for processes sharing one WAL-mode SQLite database:
//! - Ambient transaction scopes (task-local, nestable)
//! - Read/write locks on logical lock ids, held until the scope's transaction ends
//! - Busy/locked classification of engine errors into lock timeouts
//! - Storage (connection pool, migrations, seeded lock rows)
//! - TOML configuration with environment overrides

pub mod config;
pub mod domain;
pub mod error;
pub mod storage;

#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod error_tests;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::domain::locking::{
        DistributedLockingMechanism, LockHandle, LockType, LockingMechanismRegistry,
        SqliteDistributedLockingMechanism, ids,
    };
    pub use crate::domain::scope::{AmbientScope, ScopeProvider};
    pub use crate::error::{Error, Result};
    pub use crate::storage::{Database, DatabaseConfig};
}
