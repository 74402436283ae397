// Centralized logging for the handoff flow. Session tokens are never logged,
// only their length.
use log::{debug, info, warn};

use crate::handoff::error::HandoffError;
use crate::handoff::token::strip_fragment;
use crate::models::{ExchangeOutcome, SessionToken};

const BODY_PREVIEW_CHARS: usize = 200;

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log exchange start
    pub fn log_exchange_start(provider: &str, token: &SessionToken) {
        info!(
            "Exchanging session token with {provider} (token length = {} characters)",
            token.len()
        );
    }

    /// Log a resolved exchange
    pub fn log_exchange_outcome(provider: &str, outcome: &ExchangeOutcome) {
        match outcome {
            ExchangeOutcome::NewUser { provider_profile } => info!(
                "{provider} exchange succeeded: new identity (email present: {})",
                !provider_profile.email.is_empty()
            ),
            ExchangeOutcome::ExistingUser { user } => info!(
                "{provider} exchange succeeded: existing user {} ({:?})",
                user.id, user.role
            ),
            ExchangeOutcome::Failure(e) => Self::log_exchange_failure(provider, e),
        }
    }

    /// Log a failed exchange
    pub fn log_exchange_failure(provider: &str, error: &HandoffError) {
        warn!("{provider} exchange failed [{:?}]: {error}", error.kind());
    }

    /// Log a response that was refused before JSON parsing
    pub fn log_unexpected_response(content_type: &str, body: &str) {
        let preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
        warn!("Exchange endpoint returned non-JSON content type '{content_type}'");
        debug!("Non-JSON response body preview: {preview}");
    }

    /// Log a callback that carried no token, without its query or fragment
    pub fn log_missing_token(callback_url: &str) {
        let base = strip_fragment(callback_url);
        let base = base.split_once('?').map_or(base, |(path, _)| path);
        warn!("No session token in callback URL {base}");
    }
}
