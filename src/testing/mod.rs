//! Testing utilities for the handoff pipeline
//!
//! Test doubles for every seam the coordinator talks through, plus
//! pre-built data, shared between unit tests and the integration tests in
//! `tests/` (enable the `testing` feature there).
//!
//! - [`fixtures`] - Pre-built settings, users and response bodies
//! - [`mock`] - Fake exchanger, browser session, web page and app shell
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ride_handoff::testing::{fixtures::TestFixtures, mock::MockExchanger};
//!
//! let exchanger = Arc::new(MockExchanger::existing_user(TestFixtures::driver()));
//! assert_eq!(exchanger.call_count(), 0);
//! ```

pub mod fixtures;
pub mod mock;

pub use fixtures::TestFixtures;
pub use mock::{FakeWebPage, MockExchanger, RecordingShell, ScriptedBrowserSession};

/// Common test constants
pub mod constants {
    /// Origin of the web build under test
    pub const TEST_WEB_ORIGIN: &str = "https://ride.example";

    /// Deep link registered by the native build under test
    pub const TEST_NATIVE_REDIRECT: &str = "ridehail://auth/callback";

    /// Identity provider entry point
    pub const TEST_IDP_BASE: &str = "https://auth.example.com";

    /// Default provider name
    pub const TEST_PROVIDER: &str = "google";

    pub const TEST_EMAIL: &str = "a@b.com";

    pub const TEST_USER_NAME: &str = "A B";
}
