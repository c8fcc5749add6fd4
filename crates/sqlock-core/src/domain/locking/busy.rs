//! Busy/locked classification
//!
//! SQLite reports write contention as `SQLITE_BUSY` (another connection holds
//! the write lock) or `SQLITE_LOCKED` (a conflict inside the same shared
//! cache). These, and only these, become [`Error::WriteLockTimeout`]. Porting
//! the mechanism to another engine means replacing this module.

use crate::error::Error;
use std::time::Duration;
use tracing::warn;

pub const SQLITE_BUSY: i32 = 5;
pub const SQLITE_LOCKED: i32 = 6;
pub const SQLITE_LOCKED_SHAREDCACHE: i32 = 262;

/// Result codes reinterpreted as lock timeouts
pub const BUSY_OR_LOCKED_CODES: [i32; 3] = [SQLITE_BUSY, SQLITE_LOCKED, SQLITE_LOCKED_SHAREDCACHE];

/// The SQLite result code carried by a database error, if any
///
/// sqlx reports extended result codes as decimal strings.
pub fn sqlite_error_code(err: &sqlx::Error) -> Option<i32> {
    err.as_database_error()?.code()?.parse().ok()
}

/// Whether a result code is one of the busy/locked statuses
///
/// Extended codes (`SQLITE_BUSY_SNAPSHOT`, `SQLITE_BUSY_TIMEOUT`, ...) match
/// through their primary code in the low byte.
pub fn is_busy_or_locked_code(code: i32) -> bool {
    BUSY_OR_LOCKED_CODES.contains(&code) || BUSY_OR_LOCKED_CODES.contains(&(code & 0xff))
}

/// Whether a sqlx error reports a busy or locked database
pub fn is_busy_or_locked(err: &sqlx::Error) -> bool {
    sqlite_error_code(err).is_some_and(is_busy_or_locked_code)
}

/// Map an error from the lock row toggle to the domain error
///
/// `waited` is the time the toggle actually spent in the engine.
pub fn classify_write_error(
    err: sqlx::Error,
    lock_id: i32,
    timeout: Duration,
    waited: Duration,
) -> Error {
    if is_busy_or_locked(&err) {
        warn!(
            lock_id = lock_id,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
            code = ?sqlite_error_code(&err),
            "Write lock timed out"
        );
        Error::WriteLockTimeout {
            lock_id,
            timeout,
            waited,
        }
    } else {
        Error::DatabaseError(err)
    }
}
