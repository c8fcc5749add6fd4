//! Task-local ambient scope
//!
//! The scope opened by [`ScopeProvider::run`](super::ScopeProvider::run) is
//! installed for the duration of the operation's future. Code running inside
//! it (lock handles, the lock store) finds the active transaction through
//! [`AmbientScope::current`]. Tasks spawned from inside a scope do not inherit
//! it.

use crate::error::{Error, Result};
use sqlx::{Sqlite, SqliteConnection, Transaction};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

tokio::task_local! {
    static AMBIENT_SCOPE: ScopeHandle;
}

/// Mutable state of one open scope
pub struct ScopeState {
    /// `None` once the scope has committed or rolled back
    transaction: Option<Transaction<'static, Sqlite>>,
    /// Number of nested scopes currently open inside this one
    depth: u32,
    /// Set when a nested scope exits without completing
    rollback_only: bool,
}

impl ScopeState {
    /// The open transaction's connection
    ///
    /// `operation` names the caller in the error raised when the transaction
    /// has already ended.
    pub fn connection(&mut self, operation: &str) -> Result<&mut SqliteConnection> {
        self.transaction
            .as_deref_mut()
            .ok_or_else(|| Error::NoAmbientTransaction {
                operation: operation.to_string(),
            })
    }

    pub fn is_active(&self) -> bool {
        self.transaction.is_some()
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only
    }

    pub(crate) fn take_transaction(&mut self) -> Option<Transaction<'static, Sqlite>> {
        self.transaction.take()
    }
}

impl fmt::Debug for ScopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeState")
            .field("active", &self.is_active())
            .field("depth", &self.depth)
            .field("rollback_only", &self.rollback_only)
            .finish()
    }
}

/// Shared reference to an open scope
#[derive(Debug, Clone)]
pub struct ScopeHandle {
    id: Uuid,
    state: Arc<Mutex<ScopeState>>,
}

impl ScopeHandle {
    pub(crate) fn new(transaction: Transaction<'static, Sqlite>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Arc::new(Mutex::new(ScopeState {
                transaction: Some(transaction),
                depth: 0,
                rollback_only: false,
            })),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Lock the scope state for exclusive use of its connection
    pub async fn lock(&self) -> MutexGuard<'_, ScopeState> {
        self.state.lock().await
    }

    /// A non-owning reference, used by lock handles
    pub fn downgrade(&self) -> WeakScope {
        WeakScope {
            id: self.id,
            state: Arc::downgrade(&self.state),
        }
    }

    /// Enter a nested scope, returning the new depth
    pub(crate) async fn enter_nested(&self) -> u32 {
        let mut state = self.state.lock().await;
        state.depth += 1;
        state.depth
    }

    /// Leave a nested scope; an incomplete nested scope dooms the whole scope
    pub(crate) async fn exit_nested(&self, completed: bool) {
        let mut state = self.state.lock().await;
        state.depth = state.depth.saturating_sub(1);
        if !completed {
            state.rollback_only = true;
        }
    }
}

/// Back-reference from a lock handle to the scope that owns its transaction
#[derive(Debug, Clone)]
pub struct WeakScope {
    id: Uuid,
    state: Weak<Mutex<ScopeState>>,
}

impl WeakScope {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the scope still exists and its transaction is still open
    pub async fn is_live(&self) -> bool {
        match self.state.upgrade() {
            Some(state) => state.lock().await.is_active(),
            None => false,
        }
    }
}

/// Accessor for the scope ambient on the current task
#[derive(Debug, Clone, Copy, Default)]
pub struct AmbientScope;

impl AmbientScope {
    /// The current task's ambient scope
    pub fn current() -> Option<ScopeHandle> {
        AMBIENT_SCOPE.try_with(|scope| scope.clone()).ok()
    }

    /// Whether the current task runs inside a scope
    pub fn exists() -> bool {
        AMBIENT_SCOPE.try_with(|_| ()).is_ok()
    }

    /// The current scope, or the fatal error naming `operation`
    pub fn require(operation: &str) -> Result<ScopeHandle> {
        Self::current().ok_or_else(|| Error::NoAmbientTransaction {
            operation: operation.to_string(),
        })
    }

    /// Run `future` with `scope` installed as the ambient scope
    pub(crate) async fn enter<F: Future>(scope: ScopeHandle, future: F) -> F::Output {
        AMBIENT_SCOPE.scope(scope, future).await
    }
}
