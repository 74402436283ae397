//! Handoff pipeline
//!
//! Wires dispatch, extraction, deduplication, exchange and routing together.
//! The web re-entry path and the native browser-session path both end up in
//! [`HandoffCoordinator::handle_callback`].

use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::handoff::dispatch::{DispatchResult, Platform, PlatformDispatcher};
use crate::handoff::error::HandoffError;
use crate::handoff::exchange::TokenExchanger;
use crate::handoff::guard::DedupGuard;
use crate::handoff::router::{Destination, OutcomeRouter};
use crate::handoff::token::extract_token;
use crate::models::{ExchangeOutcome, SessionToken};
use crate::utils::logging::LoggingHelper;

/// How a sign-in tap ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInProgress {
    /// The page is leaving for the identity provider
    Redirected,
    Cancelled,
    Dismissed,
    /// A sign-in started earlier has not finished yet
    AlreadyInProgress,
    /// The callback went through the pipeline; `None` when nothing navigated
    Finished(Option<Destination>),
}

/// Owns the guard and drives one platform's handoff
pub struct HandoffCoordinator {
    dispatcher: PlatformDispatcher,
    guard: DedupGuard,
    exchanger: Arc<dyn TokenExchanger>,
    router: OutcomeRouter,
    loading: AtomicBool,
}

impl HandoffCoordinator {
    #[must_use]
    pub fn new(
        dispatcher: PlatformDispatcher,
        exchanger: Arc<dyn TokenExchanger>,
        router: OutcomeRouter,
    ) -> Self {
        Self::with_guard(dispatcher, exchanger, router, DedupGuard::new())
    }

    /// Build a coordinator over an existing guard, e.g. one shared across
    /// remounts of the root view
    #[must_use]
    pub fn with_guard(
        dispatcher: PlatformDispatcher,
        exchanger: Arc<dyn TokenExchanger>,
        router: OutcomeRouter,
        guard: DedupGuard,
    ) -> Self {
        Self {
            dispatcher,
            guard,
            exchanger,
            router,
            loading: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.dispatcher.platform()
    }

    #[must_use]
    pub fn guard(&self) -> &DedupGuard {
        &self.guard
    }

    #[must_use]
    pub fn router(&self) -> &OutcomeRouter {
        &self.router
    }

    /// Whether a sign-in is showing its loading state
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// User tapped "sign in with provider".
    ///
    /// On web the page is redirected away and the loading state is left
    /// set. On native the browser session is awaited and, on success, its
    /// callback URL runs through the pipeline.
    pub async fn sign_in(&self) -> SignInProgress {
        if self.loading.swap(true, Ordering::SeqCst) {
            info!("Sign-in already in progress, ignoring tap");
            return SignInProgress::AlreadyInProgress;
        }
        let mut loading = LoadingScope {
            flag: &self.loading,
            keep: false,
        };

        match self.dispatcher.begin_auth().await {
            Ok(DispatchResult::Redirected) => {
                loading.keep = true;
                SignInProgress::Redirected
            }
            Ok(DispatchResult::Callback(url)) => {
                SignInProgress::Finished(self.handle_callback(&url).await)
            }
            Ok(DispatchResult::Cancelled) => SignInProgress::Cancelled,
            Ok(DispatchResult::Dismissed) => SignInProgress::Dismissed,
            Err(e) => SignInProgress::Finished(self.router.route(e.into())),
        }
    }

    /// Web re-entry check, run when the root view first becomes active.
    ///
    /// The visible URL is rewritten before the token reaches the guard.
    /// Returns `None` on native, on every call after the first, and when
    /// the page carries no token.
    pub async fn resume_web_session(&self) -> Option<Destination> {
        let callback_url = self.dispatcher.take_reentry_callback()?;
        self.handle_callback(&callback_url).await
    }

    /// Run a callback URL through extraction, the guard, the exchange and
    /// the router
    pub async fn handle_callback(&self, callback_url: &str) -> Option<Destination> {
        let outcome = match extract_token(callback_url) {
            Some(token) => self.redeem(&token).await,
            None => {
                LoggingHelper::log_missing_token(callback_url);
                HandoffError::ExtractionFailure.into()
            }
        };
        self.router.route(outcome)
    }

    /// Admit and exchange a token.
    ///
    /// Admission happens before the first suspension point. The permit is
    /// dropped, releasing the in-flight flag, before the outcome is returned.
    pub async fn redeem(&self, token: &SessionToken) -> ExchangeOutcome {
        let Some(permit) = self.guard.admit(token) else {
            return HandoffError::DuplicateOrConcurrent.into();
        };

        let outcome = self.exchanger.exchange(token).await;
        drop(permit);
        outcome
    }
}

/// Clears the loading flag when a sign-in ends, unless told to keep it
struct LoadingScope<'a> {
    flag: &'a AtomicBool,
    keep: bool,
}

impl Drop for LoadingScope<'_> {
    fn drop(&mut self) {
        if !self.keep {
            self.flag.store(false, Ordering::SeqCst);
        }
    }
}
