//! Lock types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of lock requested on a logical lock id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockType {
    /// Shared lock; never contends under WAL
    ReadLock,
    /// Exclusive lock; performs a real write on the lock row
    WriteLock,
}

impl LockType {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadLock => "ReadLock",
            Self::WriteLock => "WriteLock",
        }
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::WriteLock)
    }
}

impl fmt::Display for LockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_type_display() {
        assert_eq!(LockType::ReadLock.to_string(), "ReadLock");
        assert_eq!(LockType::WriteLock.to_string(), "WriteLock");
    }

    #[test]
    fn test_lock_type_exclusivity() {
        assert!(LockType::WriteLock.is_exclusive());
        assert!(!LockType::ReadLock.is_exclusive());
    }
}
