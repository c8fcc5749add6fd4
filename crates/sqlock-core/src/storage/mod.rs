//! Storage layer - SQLite in WAL mode
//!
//! # Architecture
//!
//! - `database`: Connection pool management and initialization
//! - `migrations`: Schema versioning, lock table creation and seeding
//!
//! # Usage
//!
//! ```ignore
//! use sqlock_core::storage::{Database, DatabaseConfig};
//!
//! // Create an in-memory database for testing
//! let db = Database::in_memory().await?;
//!
//! // Or open a shared file that several processes lock against
//! let db = Database::new(DatabaseConfig::with_path("/srv/app/app.db")).await?;
//! ```

pub mod database;
pub mod migrations;

// Re-export commonly used types
pub use database::{Database, DatabaseConfig};
pub use migrations::{
    CURRENT_VERSION, MigrationStatus, migration_status, run_migrations, seed_lock_rows,
};
