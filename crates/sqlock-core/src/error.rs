//! Error types for Sqlock

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias using Sqlock's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Sqlock error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Lock errors (E300-E399)
    /// A lock was requested with no open transaction in the ambient scope.
    ///
    /// This is a programming error: locks must be requested from inside
    /// `ScopeProvider::run`.
    #[error("No ambient transaction for {operation}. Locks must be requested inside a scope.")]
    NoAmbientTransaction { operation: String },

    #[error("Read lock timeout: lock {lock_id} could not be obtained within {}ms", timeout.as_millis())]
    ReadLockTimeout { lock_id: i32, timeout: Duration },

    /// `waited` is the time actually spent in the engine, which is shorter
    /// than `timeout` when the busy handler was not consulted.
    #[error("Write lock timeout: lock {lock_id} is held by another writer (waited {}ms of {}ms). Try again later.", waited.as_millis(), timeout.as_millis())]
    WriteLockTimeout {
        lock_id: i32,
        timeout: Duration,
        waited: Duration,
    },

    #[error("Lock row {0} does not exist. Run `sqlock init` to seed the lock table.")]
    LockRowMissing(i32),

    #[error("No distributed locking mechanism is enabled for the current context.")]
    NoLockingMechanism,

    #[error("Scope {0} was rolled back because a nested scope did not complete.")]
    ScopeAborted(Uuid),

    // Database errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoAmbientTransaction { .. } => "E300",
            Self::ReadLockTimeout { .. } => "E301",
            Self::WriteLockTimeout { .. } => "E302",
            Self::LockRowMissing(_) => "E303",
            Self::NoLockingMechanism => "E304",
            Self::ScopeAborted(_) => "E305",
            Self::DatabaseError(_) => "E400",
            Self::ConfigError(_) => "E600",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::LockRowMissing(_) => Some("sqlock init".to_string()),
            Self::NoLockingMechanism => Some("sqlock config get database.provider_name".to_string()),
            Self::WriteLockTimeout { .. } => Some("Retry the operation".to_string()),
            _ => None,
        }
    }

    /// Whether this error signals API misuse rather than a runtime condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NoAmbientTransaction { .. })
    }

    /// Whether retrying the whole logical operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ReadLockTimeout { .. } | Self::WriteLockTimeout { .. }
        )
    }

    /// The lock id this error is tagged with, if any
    pub fn lock_id(&self) -> Option<i32> {
        match self {
            Self::ReadLockTimeout { lock_id, .. } | Self::WriteLockTimeout { lock_id, .. } => {
                Some(*lock_id)
            }
            Self::LockRowMissing(lock_id) => Some(*lock_id),
            _ => None,
        }
    }
}
