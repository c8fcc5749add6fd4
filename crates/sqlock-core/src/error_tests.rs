//! Error module tests

use crate::error::Error;
use std::time::Duration;
use uuid::Uuid;

#[test]
fn test_no_ambient_transaction_error() {
    let error = Error::NoAmbientTransaction {
        operation: "WriteLock(-333)".to_string(),
    };
    assert_eq!(error.code(), "E300");
    assert!(error.is_fatal());
    assert!(!error.is_retryable());
    assert_eq!(error.suggestion(), None);
    assert!(error.to_string().contains("WriteLock(-333)"));
}

#[test]
fn test_write_lock_timeout_error() {
    let error = Error::WriteLockTimeout {
        lock_id: 3,
        timeout: Duration::from_millis(250),
        waited: Duration::from_millis(251),
    };
    assert_eq!(error.code(), "E302");
    assert!(error.is_retryable());
    assert!(!error.is_fatal());
    assert_eq!(error.lock_id(), Some(3));
    assert_eq!(error.suggestion(), Some("Retry the operation".to_string()));
    assert!(error.to_string().contains("waited 251ms of 250ms"));
}

#[test]
fn test_write_lock_timeout_reports_actual_wait() {
    let error = Error::WriteLockTimeout {
        lock_id: 3,
        timeout: Duration::from_secs(2),
        waited: Duration::ZERO,
    };
    let message = error.to_string();
    assert!(message.contains("waited 0ms of 2000ms"), "got {}", message);
}

#[test]
fn test_read_lock_timeout_error() {
    let error = Error::ReadLockTimeout {
        lock_id: -333,
        timeout: Duration::from_secs(1),
    };
    assert_eq!(error.code(), "E301");
    assert!(error.is_retryable());
    assert_eq!(error.lock_id(), Some(-333));
}

#[test]
fn test_lock_row_missing_error() {
    let error = Error::LockRowMissing(42);
    assert_eq!(error.code(), "E303");
    assert_eq!(error.lock_id(), Some(42));
    assert!(!error.is_retryable());
    assert_eq!(error.suggestion(), Some("sqlock init".to_string()));
    assert!(error.to_string().contains("42"));
}

#[test]
fn test_no_locking_mechanism_error() {
    let error = Error::NoLockingMechanism;
    assert_eq!(error.code(), "E304");
    assert!(error.suggestion().is_some());
}

#[test]
fn test_scope_aborted_error() {
    let scope_id = Uuid::new_v4();
    let error = Error::ScopeAborted(scope_id);
    assert_eq!(error.code(), "E305");
    assert!(error.to_string().contains(&scope_id.to_string()));
}

#[test]
fn test_database_error_is_not_reinterpreted() {
    let error = Error::from(sqlx::Error::RowNotFound);
    assert_eq!(error.code(), "E400");
    assert_eq!(error.lock_id(), None);
    assert!(!error.is_retryable());
}

#[test]
fn test_config_error() {
    let error = Error::ConfigError("missing connection string".to_string());
    assert_eq!(error.code(), "E600");
    assert_eq!(error.suggestion(), None);
}

#[test]
fn test_io_error() {
    let error = Error::from(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "file not found",
    ));
    assert_eq!(error.code(), "E9999");
}

#[test]
fn test_error_codes_are_unique() {
    let codes = [
        Error::NoAmbientTransaction {
            operation: "x".to_string(),
        }
        .code(),
        Error::ReadLockTimeout {
            lock_id: 1,
            timeout: Duration::ZERO,
        }
        .code(),
        Error::WriteLockTimeout {
            lock_id: 1,
            timeout: Duration::ZERO,
            waited: Duration::ZERO,
        }
        .code(),
        Error::LockRowMissing(1).code(),
        Error::NoLockingMechanism.code(),
        Error::ScopeAborted(Uuid::nil()).code(),
        Error::DatabaseError(sqlx::Error::RowNotFound).code(),
        Error::ConfigError("x".to_string()).code(),
    ];

    let mut sorted = codes.to_vec();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), codes.len());
}
