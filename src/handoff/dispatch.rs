//! Platform dispatch for starting authentication
//!
//! The runtime platform is fixed at process start and consumed once, when
//! the [`PlatformDispatcher`] is built. Web re-entry only exists on the web
//! variant and the awaited browser session only on the native one, so only
//! one return path is ever reachable in a running instance.

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::handoff::error::HandoffError;
use crate::handoff::token::{fragment_has_token, strip_fragment};
use crate::settings::HandoffSettings;

/// Where the application is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Web,
    Native,
}

impl Platform {
    /// Platform of the current build target
    #[must_use]
    pub fn current() -> Self {
        if cfg!(target_arch = "wasm32") {
            Self::Web
        } else {
            Self::Native
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Web => write!(f, "web"),
            Self::Native => write!(f, "native"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "web" => Ok(Self::Web),
            "native" | "ios" | "android" => Ok(Self::Native),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

/// Browser page hosting the web build
pub trait WebPage: Send + Sync {
    /// Full current location, fragment included
    fn current_location(&self) -> String;

    /// Full navigation; the current page is torn down
    fn navigate(&self, url: &str);

    /// Rewrite the visible URL without reloading
    fn replace_history(&self, url: &str);
}

/// Terminal state of a platform browser session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserSessionResult {
    /// The provider redirected to the deep link
    Success { url: String },
    /// The user backed out
    Cancel,
    /// The system dismissed the view
    Dismiss,
}

/// Platform-managed browser session (system browser / auth view)
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Open `auth_url` and resolve once, when the session reaches a terminal state
    async fn open_auth_session(&self, auth_url: &str, redirect_uri: &str) -> BrowserSessionResult;
}

/// What starting authentication led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    /// Full-page redirect issued; control comes back on the next page load
    Redirected,
    /// Native session returned a callback URL
    Callback(String),
    Cancelled,
    Dismissed,
}

/// `<idp-base>/?redirect=<urlencoded return target>`
///
/// # Errors
///
/// Returns an error if the provider base URL does not parse
pub fn build_auth_url(idp_base_url: &str, return_target: &str) -> Result<String, HandoffError> {
    let mut url = url::Url::parse(idp_base_url).map_err(|e| {
        HandoffError::Configuration(format!("Invalid identity provider URL '{idp_base_url}': {e}"))
    })?;
    url.query_pairs_mut().clear().append_pair("redirect", return_target);
    Ok(url.to_string())
}

/// Web branch: full-page redirect out, one-time re-entry check back in
pub struct WebDispatcher {
    page: Arc<dyn WebPage>,
    idp_base_url: String,
    web_origin: String,
    reentry_armed: AtomicBool,
}

impl WebDispatcher {
    #[must_use]
    pub fn new(page: Arc<dyn WebPage>, idp_base_url: &str, web_origin: &str) -> Self {
        Self {
            page,
            idp_base_url: idp_base_url.to_string(),
            web_origin: web_origin.to_string(),
            reentry_armed: AtomicBool::new(true),
        }
    }

    /// Send the page to the identity provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider URL cannot be built
    pub fn begin_auth(&self) -> Result<DispatchResult, HandoffError> {
        let auth_url = build_auth_url(&self.idp_base_url, &self.web_origin)?;
        info!("Redirecting page to identity provider");
        self.page.navigate(&auth_url);
        Ok(DispatchResult::Redirected)
    }

    /// One-time re-entry check for when the root view first becomes active.
    ///
    /// If the current location carries a token in its fragment, the visible
    /// URL is rewritten without the fragment before the callback URL is
    /// handed back, so a refresh cannot replay it. Later calls return `None`.
    pub fn take_reentry_callback(&self) -> Option<String> {
        if !self.reentry_armed.swap(false, Ordering::SeqCst) {
            debug!("Web re-entry check already performed");
            return None;
        }

        let location = self.page.current_location();
        if !fragment_has_token(&location) {
            return None;
        }

        info!("Session token found on page load, clearing URL fragment");
        self.page.replace_history(strip_fragment(&location));
        Some(location)
    }
}

/// Native branch: awaits a single browser session result
pub struct NativeDispatcher {
    browser: Arc<dyn BrowserSession>,
    idp_base_url: String,
    redirect_uri: String,
}

impl NativeDispatcher {
    #[must_use]
    pub fn new(browser: Arc<dyn BrowserSession>, idp_base_url: &str, redirect_uri: &str) -> Self {
        Self {
            browser,
            idp_base_url: idp_base_url.to_string(),
            redirect_uri: redirect_uri.to_string(),
        }
    }

    /// Open the provider in a browser session and wait for it to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider URL cannot be built
    pub async fn begin_auth(&self) -> Result<DispatchResult, HandoffError> {
        let auth_url = build_auth_url(&self.idp_base_url, &self.redirect_uri)?;
        info!("Opening browser session for identity provider");

        let result = self
            .browser
            .open_auth_session(&auth_url, &self.redirect_uri)
            .await;

        Ok(match result {
            BrowserSessionResult::Success { url } => DispatchResult::Callback(url),
            BrowserSessionResult::Cancel => {
                info!("Browser session cancelled by user");
                DispatchResult::Cancelled
            }
            BrowserSessionResult::Dismiss => {
                info!("Browser session dismissed");
                DispatchResult::Dismissed
            }
        })
    }
}

/// The one dispatcher linked into a running instance
pub enum PlatformDispatcher {
    Web(WebDispatcher),
    Native(NativeDispatcher),
}

impl PlatformDispatcher {
    /// Web dispatcher configured from settings
    #[must_use]
    pub fn web(page: Arc<dyn WebPage>, settings: &HandoffSettings) -> Self {
        Self::Web(WebDispatcher::new(
            page,
            &settings.identity_provider.auth_base_url,
            &settings.application.web_origin,
        ))
    }

    /// Native dispatcher configured from settings
    #[must_use]
    pub fn native(browser: Arc<dyn BrowserSession>, settings: &HandoffSettings) -> Self {
        Self::Native(NativeDispatcher::new(
            browser,
            &settings.identity_provider.auth_base_url,
            &settings.application.native_redirect_uri,
        ))
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        match self {
            Self::Web(_) => Platform::Web,
            Self::Native(_) => Platform::Native,
        }
    }

    /// Start authentication on whichever platform this instance runs on
    ///
    /// # Errors
    ///
    /// Returns an error if the provider URL cannot be built
    pub async fn begin_auth(&self) -> Result<DispatchResult, HandoffError> {
        match self {
            Self::Web(web) => web.begin_auth(),
            Self::Native(native) => native.begin_auth().await,
        }
    }

    /// Web re-entry callback, always `None` on native
    pub fn take_reentry_callback(&self) -> Option<String> {
        match self {
            Self::Web(web) => web.take_reentry_callback(),
            Self::Native(_) => None,
        }
    }
}
