//! Test fixtures providing pre-built test objects

use serde_json::{json, Value};
use std::sync::Arc;

use super::constants::{
    TEST_EMAIL, TEST_IDP_BASE, TEST_NATIVE_REDIRECT, TEST_PROVIDER, TEST_USER_NAME,
    TEST_WEB_ORIGIN,
};
use super::mock::{FakeWebPage, RecordingShell, ScriptedBrowserSession};
use crate::handoff::coordinator::HandoffCoordinator;
use crate::handoff::dispatch::{Platform, PlatformDispatcher};
use crate::handoff::exchange::TokenExchanger;
use crate::handoff::router::OutcomeRouter;
use crate::models::{ProviderProfile, UserRecord, UserRole};
use crate::session::SessionState;
use crate::settings::HandoffSettings;

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Settings pointing the exchange at `backend_base_url`
    #[must_use]
    pub fn settings(platform: Platform, backend_base_url: &str) -> HandoffSettings {
        let mut settings = HandoffSettings::default();
        settings.application.platform = platform;
        settings.application.web_origin = TEST_WEB_ORIGIN.to_string();
        settings.application.native_redirect_uri = TEST_NATIVE_REDIRECT.to_string();
        settings.identity_provider.name = TEST_PROVIDER.to_string();
        settings.identity_provider.auth_base_url = TEST_IDP_BASE.to_string();
        settings.backend.base_url = backend_base_url.to_string();
        settings.backend.exchange_timeout_seconds = 2;
        settings
    }

    #[must_use]
    pub fn user(id: &str, role: UserRole) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            role,
            extra: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn driver() -> UserRecord {
        Self::user("u1", UserRole::Driver)
    }

    #[must_use]
    pub fn rider() -> UserRecord {
        Self::user("u2", UserRole::Rider)
    }

    #[must_use]
    pub fn profile() -> ProviderProfile {
        ProviderProfile {
            email: TEST_EMAIL.to_string(),
            name: TEST_USER_NAME.to_string(),
            picture: "https://img.example/a.png".to_string(),
            provider_id: "g-123".to_string(),
        }
    }

    /// Exchange body for an existing account
    #[must_use]
    pub fn existing_user_body(id: &str, role: &str) -> Value {
        json!({ "is_new_user": false, "user": { "id": id, "role": role } })
    }

    /// Exchange body for an identity with no account
    #[must_use]
    pub fn new_user_body() -> Value {
        json!({
            "is_new_user": true,
            "google_data": { "email": TEST_EMAIL, "name": TEST_USER_NAME }
        })
    }

    /// Web-platform coordinator over a fake page
    #[must_use]
    pub fn web_coordinator(
        page: Arc<FakeWebPage>,
        exchanger: Arc<dyn TokenExchanger>,
        shell: Arc<RecordingShell>,
    ) -> HandoffCoordinator {
        let settings = Self::settings(Platform::Web, "http://localhost:8000");
        HandoffCoordinator::new(
            PlatformDispatcher::web(page, &settings),
            exchanger,
            OutcomeRouter::new(shell, SessionState::new(), TEST_PROVIDER),
        )
    }

    /// Native-platform coordinator over a scripted browser session
    #[must_use]
    pub fn native_coordinator(
        browser: Arc<ScriptedBrowserSession>,
        exchanger: Arc<dyn TokenExchanger>,
        shell: Arc<RecordingShell>,
    ) -> HandoffCoordinator {
        let settings = Self::settings(Platform::Native, "http://localhost:8000");
        HandoffCoordinator::new(
            PlatformDispatcher::native(browser, &settings),
            exchanger,
            OutcomeRouter::new(shell, SessionState::new(), TEST_PROVIDER),
        )
    }
}
