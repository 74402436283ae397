//! Third-party identity handoff
//!
//! The user signs in with an external identity provider in a browser the
//! application does not control, then comes back through a URL carrying a
//! single-use session token. This module gets that token exchanged exactly
//! once, whichever way the user came back.
//!
//! - [`token`] - Callback URL to session token
//! - [`guard`] - Process-lifetime deduplication of exchanges
//! - [`exchange`] - Backend token-exchange client
//! - [`dispatch`] - Web redirect vs. native browser session
//! - [`router`] - Exchange outcome to navigation
//! - [`coordinator`] - The pipeline tying them together
//! - [`error`] - Failure taxonomy

pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod exchange;
pub mod guard;
pub mod router;
pub mod token;

pub use coordinator::{HandoffCoordinator, SignInProgress};
pub use dispatch::{
    build_auth_url, BrowserSession, BrowserSessionResult, DispatchResult, NativeDispatcher,
    Platform, PlatformDispatcher, WebDispatcher, WebPage,
};
pub use error::{FailureKind, HandoffError};
pub use exchange::{HttpExchangeClient, TokenExchanger};
pub use guard::{DedupGuard, ExchangePermit};
pub use router::{AppShell, Destination, OutcomeRouter, RegistrationPrefill};
pub use token::extract_token;
