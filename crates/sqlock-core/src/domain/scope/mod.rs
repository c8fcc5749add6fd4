//! Ambient transaction scopes
//!
//! A scope is the unit of work that lock handles live in. Exactly one scope
//! is ambient per logical operation; it owns the database transaction, and
//! every lock taken inside it is released when that transaction commits or
//! rolls back.
//!
//! # Example
//!
//! ```ignore
//! use sqlock_core::domain::scope::ScopeProvider;
//!
//! let scopes = ScopeProvider::from_database(&db);
//! scopes
//!     .run(|| async {
//!         let _lock = mechanism.write_lock(ids::CONTENT_TREE, None).await?;
//!         // mutate the content tree ...
//!         Ok(())
//!     })
//!     .await?;
//! ```

pub mod ambient;
pub mod provider;

pub use ambient::{AmbientScope, ScopeHandle, ScopeState, WeakScope};
pub use provider::{ScopeOutcome, ScopeProvider};
