//! Mock objects and fake implementations for testing
//!
//! These stand in for the exchange backend, the platform browser session,
//! the web page and the host application's navigation.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;

use crate::handoff::dispatch::{BrowserSession, BrowserSessionResult, WebPage};
use crate::handoff::error::HandoffError;
use crate::handoff::exchange::TokenExchanger;
use crate::handoff::router::{AppShell, Destination};
use crate::models::{ExchangeOutcome, ProviderProfile, SessionToken, UserRecord};

type OutcomeFactory = Box<dyn Fn(&SessionToken) -> ExchangeOutcome + Send + Sync>;

/// Exchanger that counts calls and answers from a closure.
///
/// A gated exchanger parks every call until the returned [`Notify`] is
/// signalled, which keeps an exchange in flight for as long as a test needs.
pub struct MockExchanger {
    respond: OutcomeFactory,
    calls: AtomicUsize,
    tokens: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl MockExchanger {
    #[must_use]
    pub fn with(respond: impl Fn(&SessionToken) -> ExchangeOutcome + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    #[must_use]
    pub fn existing_user(user: UserRecord) -> Self {
        Self::with(move |_| ExchangeOutcome::ExistingUser { user: user.clone() })
    }

    #[must_use]
    pub fn new_user(profile: ProviderProfile) -> Self {
        Self::with(move |_| ExchangeOutcome::NewUser {
            provider_profile: profile.clone(),
        })
    }

    /// Every exchange is rejected by the backend
    #[must_use]
    pub fn rejecting() -> Self {
        Self::with(|_| {
            ExchangeOutcome::Failure(HandoffError::ProviderRejected {
                status: 401,
                message: "Invalid session".to_string(),
            })
        })
    }

    /// Every exchange times out
    #[must_use]
    pub fn timing_out() -> Self {
        Self::with(|_| {
            ExchangeOutcome::Failure(HandoffError::Network {
                message: "operation timed out".to_string(),
                timed_out: true,
            })
        })
    }

    /// Park calls until the returned handle is notified
    #[must_use]
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Tokens received, in call order
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TokenExchanger for MockExchanger {
    async fn exchange(&self, token: &SessionToken) -> ExchangeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(token.as_str().to_string());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        (self.respond)(token)
    }
}

/// Browser session that resolves to a fixed result
pub struct ScriptedBrowserSession {
    result: BrowserSessionResult,
    opened: Mutex<Vec<(String, String)>>,
}

impl ScriptedBrowserSession {
    #[must_use]
    pub fn new(result: BrowserSessionResult) -> Self {
        Self {
            result,
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Session that returns `callback_url`
    #[must_use]
    pub fn success(callback_url: &str) -> Self {
        Self::new(BrowserSessionResult::Success {
            url: callback_url.to_string(),
        })
    }

    /// `(auth_url, redirect_uri)` pairs opened so far
    #[must_use]
    pub fn opened(&self) -> Vec<(String, String)> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl BrowserSession for ScriptedBrowserSession {
    async fn open_auth_session(&self, auth_url: &str, redirect_uri: &str) -> BrowserSessionResult {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((auth_url.to_string(), redirect_uri.to_string()));
        self.result.clone()
    }
}

/// In-memory web page
#[derive(Default)]
pub struct FakeWebPage {
    location: Mutex<String>,
    navigations: Mutex<Vec<String>>,
    history_rewrites: Mutex<Vec<String>>,
    ignore_rewrites: AtomicBool,
}

impl FakeWebPage {
    #[must_use]
    pub fn at(location: &str) -> Self {
        let page = Self::default();
        page.set_location(location);
        page
    }

    pub fn set_location(&self, location: &str) {
        *self.location.lock().unwrap_or_else(PoisonError::into_inner) = location.to_string();
    }

    /// Record history rewrites without applying them, as if the browser
    /// refused or delayed them
    pub fn ignore_history_rewrites(&self) {
        self.ignore_rewrites.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.navigations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn history_rewrites(&self) -> Vec<String> {
        self.history_rewrites
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl WebPage for FakeWebPage {
    fn current_location(&self) -> String {
        self.location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn navigate(&self, url: &str) {
        self.navigations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
    }

    fn replace_history(&self, url: &str) {
        self.history_rewrites
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        if !self.ignore_rewrites.load(Ordering::SeqCst) {
            self.set_location(url);
        }
    }
}

/// App shell that records navigation and alerts
#[derive(Default)]
pub struct RecordingShell {
    destinations: Mutex<Vec<Destination>>,
    alerts: Mutex<Vec<(String, String)>>,
}

impl RecordingShell {
    #[must_use]
    pub fn destinations(&self) -> Vec<Destination> {
        self.destinations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `(title, message)` pairs shown so far
    #[must_use]
    pub fn alerts(&self) -> Vec<(String, String)> {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AppShell for RecordingShell {
    fn navigate(&self, destination: &Destination) {
        self.destinations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(destination.clone());
    }

    fn show_alert(&self, title: &str, message: &str) {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((title.to_string(), message.to_string()));
    }
}
