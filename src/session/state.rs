//! In-memory application session state
//!
//! Holds the user committed by a successful existing-user exchange. Lives
//! for the process only; nothing here is persisted.

use chrono::{DateTime, Utc};
use log::info;
use std::sync::{Arc, PoisonError, RwLock};

use crate::models::UserRecord;

/// A signed-in user
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user: UserRecord,
    pub authenticated_at: DateTime<Utc>,
}

/// Shared handle to the current application session
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    inner: Arc<RwLock<Option<AuthenticatedSession>>>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit `user` and mark the session authenticated
    pub fn sign_in(&self, user: UserRecord) {
        info!("Session authenticated for user {}", user.id);
        let session = AuthenticatedSession {
            user,
            authenticated_at: Utc::now(),
        };
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    #[must_use]
    pub fn current(&self) -> Option<AuthenticatedSession> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
