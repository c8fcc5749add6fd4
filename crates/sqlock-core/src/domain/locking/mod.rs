//! Distributed locking over a shared SQLite database
//!
//! Processes sharing one WAL-mode database coordinate through logical lock
//! ids, one row per id in `sqlock_locks`. A lock is always taken inside the
//! ambient scope's transaction and held until that transaction ends:
//!
//! - **Read locks** assert that a transaction is open. WAL readers see a
//!   snapshot and never wait on writers, so there is nothing else to do.
//! - **Write locks** toggle the lock row. The engine admits one writer at a
//!   time; a second writer waits up to the lock timeout and then fails with
//!   [`Error::WriteLockTimeout`](crate::Error::WriteLockTimeout).
//!
//! # Example
//!
//! ```ignore
//! use sqlock_core::domain::locking::{ids, DistributedLockingMechanism, SqliteDistributedLockingMechanism};
//! use sqlock_core::domain::scope::ScopeProvider;
//!
//! let mechanism = SqliteDistributedLockingMechanism::from_config(&config);
//! ScopeProvider::from_database(&db)
//!     .run(|| async {
//!         let _lock = mechanism.write_lock(ids::CONTENT_TREE, None).await?;
//!         // Other writers of ContentTree now wait until this scope commits
//!         Ok(())
//!     })
//!     .await?;
//! ```

pub mod busy;
pub mod handle;
pub mod ids;
pub mod mechanism;
pub mod registry;
pub mod store;
pub mod types;

pub use busy::{classify_write_error, is_busy_or_locked};
pub use handle::LockHandle;
pub use mechanism::{
    DistributedLockingMechanism, SQLITE_PROVIDER_NAME, SqliteDistributedLockingMechanism,
};
pub use registry::LockingMechanismRegistry;
pub use store::{LockRow, LockStore};
pub use types::LockType;
