//! Outcome routing
//!
//! Turns a resolved [`ExchangeOutcome`] into navigation. Nothing navigates
//! without an outcome, and a failure never navigates.

use log::{info, warn};
use std::sync::Arc;

use crate::handoff::error::HandoffError;
use crate::models::{ExchangeOutcome, ProviderProfile, UserRecord};
use crate::session::SessionState;

const SIGN_IN_ERROR_TITLE: &str = "Sign-in error";

/// Pre-fill handed to the registration screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationPrefill {
    pub email: String,
    pub name: String,
    pub picture: String,
    pub provider_id: String,
    /// Provider the registration came from; the registration screen skips
    /// password/OTP entry when set
    pub auth_provider: String,
}

/// Screens the handoff can land on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Registration(RegistrationPrefill),
    DriverHome,
    RiderHome,
}

impl Destination {
    /// Home screen for a signed-in user
    #[must_use]
    pub fn home_for(user: &UserRecord) -> Self {
        if user.is_driver() {
            Self::DriverHome
        } else {
            Self::RiderHome
        }
    }
}

/// Navigation and alert surface of the host application
pub trait AppShell: Send + Sync {
    fn navigate(&self, destination: &Destination);

    fn show_alert(&self, title: &str, message: &str);
}

/// Dispatches exchange outcomes to navigation, session state and alerts
#[derive(Clone)]
pub struct OutcomeRouter {
    shell: Arc<dyn AppShell>,
    session: SessionState,
    provider: String,
}

impl OutcomeRouter {
    #[must_use]
    pub fn new(shell: Arc<dyn AppShell>, session: SessionState, provider: &str) -> Self {
        Self {
            shell,
            session,
            provider: provider.to_string(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Act on `outcome`; returns where the user was sent, if anywhere
    pub fn route(&self, outcome: ExchangeOutcome) -> Option<Destination> {
        let destination = match outcome {
            ExchangeOutcome::NewUser { provider_profile } => {
                info!("New identity, continuing to registration");
                Destination::Registration(self.prefill(provider_profile))
            }
            ExchangeOutcome::ExistingUser { user } => {
                let destination = Destination::home_for(&user);
                self.session.sign_in(user);
                destination
            }
            ExchangeOutcome::Failure(error) => {
                self.report(&error);
                return None;
            }
        };

        self.shell.navigate(&destination);
        Some(destination)
    }

    fn prefill(&self, profile: ProviderProfile) -> RegistrationPrefill {
        RegistrationPrefill {
            email: profile.email,
            name: profile.name,
            picture: profile.picture,
            provider_id: profile.provider_id,
            auth_provider: self.provider.clone(),
        }
    }

    fn report(&self, error: &HandoffError) {
        let Some(base) = error.kind().user_message() else {
            warn!("Handoff attempt dropped: {error}");
            return;
        };

        warn!("Handoff failed: {error}");
        let message = match error {
            HandoffError::ProviderRejected { message, .. } => format!("{base} {message}"),
            _ => base.to_string(),
        };
        self.shell.show_alert(SIGN_IN_ERROR_TITLE, &message);
    }
}
