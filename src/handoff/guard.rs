//! Exchange deduplication guard
//!
//! Tracks, for the life of the process, which session tokens have been
//! submitted and whether an exchange is currently running. Admission is a
//! single check-and-set under one lock with no suspension point inside, so
//! two re-entries racing on the same token cannot both get through.

use log::{debug, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::SessionToken;

/// In-memory guard state, never persisted
#[derive(Debug, Default)]
pub struct GuardState {
    processed_tokens: HashSet<SessionToken>,
    in_flight: bool,
}

/// Shared handle to the guard state
#[derive(Debug, Clone, Default)]
pub struct DedupGuard {
    state: Arc<Mutex<GuardState>>,
}

/// Proof of admission. Dropping it clears the in-flight flag, so the
/// guard is released on every exit path of the exchange, panics and
/// cancelled futures included.
#[derive(Debug)]
#[must_use = "dropping the permit immediately releases the in-flight slot"]
pub struct ExchangePermit {
    guard: DedupGuard,
}

impl DedupGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit `token` for exchange.
    ///
    /// Succeeds only if no exchange is in flight and the token has never
    /// been admitted before; the token is marked consumed and the in-flight
    /// flag set in the same step. On rejection nothing changes.
    pub fn admit(&self, token: &SessionToken) -> Option<ExchangePermit> {
        let mut state = self.lock();

        if state.in_flight {
            warn!("Rejecting session token: another exchange is in flight");
            return None;
        }
        if state.processed_tokens.contains(token) {
            warn!("Rejecting session token: already processed in this process");
            return None;
        }

        state.processed_tokens.insert(token.clone());
        state.in_flight = true;
        debug!(
            "Admitted session token ({} chars) for exchange",
            token.len()
        );

        Some(ExchangePermit {
            guard: self.clone(),
        })
    }

    /// Clear the in-flight flag. Processed tokens are kept.
    fn release(&self) {
        self.lock().in_flight = false;
        debug!("Exchange settled, guard released");
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.lock().in_flight
    }

    #[must_use]
    pub fn was_processed(&self, token: &SessionToken) -> bool {
        self.lock().processed_tokens.contains(token)
    }

    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.lock().processed_tokens.len()
    }

    // A panic while holding the lock cannot leave the state half-written,
    // every mutation is a single assignment or insert.
    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ExchangePermit {
    fn drop(&mut self) {
        self.guard.release();
    }
}
