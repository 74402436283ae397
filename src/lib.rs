#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the ride-handoff library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod handoff;
pub mod models;
pub mod session;
pub mod settings;
pub mod utils;

// Make test utilities available for both unit tests and integration tests
#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use handoff::{
    extract_token, Destination, HandoffCoordinator, HandoffError, HttpExchangeClient, Platform,
    PlatformDispatcher, SignInProgress,
};
pub use models::{ExchangeOutcome, SessionToken, UserRecord};
pub use session::SessionState;
pub use settings::HandoffSettings;
