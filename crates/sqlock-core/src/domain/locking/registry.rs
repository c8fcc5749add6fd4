//! Mechanism selection
//!
//! Several mechanisms may be registered; callers take the first one that is
//! enabled for the current configuration and scope.

use super::mechanism::DistributedLockingMechanism;
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::debug;

/// Ordered set of candidate locking mechanisms
#[derive(Debug, Clone, Default)]
pub struct LockingMechanismRegistry {
    mechanisms: Vec<Arc<dyn DistributedLockingMechanism>>,
}

impl LockingMechanismRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mechanism; earlier registrations win
    pub fn register(&mut self, mechanism: Arc<dyn DistributedLockingMechanism>) {
        self.mechanisms.push(mechanism);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, mechanism: Arc<dyn DistributedLockingMechanism>) -> Self {
        self.register(mechanism);
        self
    }

    /// The first enabled mechanism
    pub fn select(&self) -> Result<Arc<dyn DistributedLockingMechanism>> {
        let selected = self
            .mechanisms
            .iter()
            .find(|m| m.enabled())
            .cloned()
            .ok_or(Error::NoLockingMechanism)?;

        debug!(mechanism = selected.name(), "Selected locking mechanism");
        Ok(selected)
    }

    pub fn len(&self) -> usize {
        self.mechanisms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mechanisms.is_empty()
    }
}
