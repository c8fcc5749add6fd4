//! Domain layer
//!
//! Ambient transaction scopes and the locks that live inside them.

pub mod locking;
pub mod scope;
