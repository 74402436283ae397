//! Handoff error types
//!
//! Every failure of the handoff pipeline is non-fatal. Each one maps to a
//! [`FailureKind`], which decides the alert shown to the user.

use thiserror::Error;

/// Failures that can occur between the callback arriving and navigation
#[derive(Debug, Error)]
pub enum HandoffError {
    /// The guard refused the attempt (token already used or an exchange in flight)
    #[error("Exchange already processed or in progress")]
    DuplicateOrConcurrent,

    /// The callback URL carried no usable session token
    #[error("No session token found in callback URL")]
    ExtractionFailure,

    /// The exchange endpoint answered with a non-JSON media type
    #[error("Unexpected response format: {content_type}")]
    UnexpectedResponseFormat { content_type: String, body: String },

    #[error("Empty response from exchange endpoint")]
    EmptyResponse,

    #[error("Malformed JSON in exchange response: {0}")]
    MalformedJson(String),

    /// The backend explicitly rejected the token
    #[error("Sign-in rejected ({status}): {message}")]
    ProviderRejected { status: u16, message: String },

    /// Transport failure, including the bounded exchange timeout
    #[error("Network error: {message}")]
    Network { message: String, timed_out: bool },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Closed set of failure categories used to key user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    DuplicateOrConcurrent,
    UnexpectedResponseFormat,
    EmptyResponse,
    MalformedJson,
    ProviderRejected,
    NetworkError,
    ExtractionFailure,
    Configuration,
}

impl HandoffError {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::DuplicateOrConcurrent => FailureKind::DuplicateOrConcurrent,
            Self::ExtractionFailure => FailureKind::ExtractionFailure,
            Self::UnexpectedResponseFormat { .. } => FailureKind::UnexpectedResponseFormat,
            Self::EmptyResponse => FailureKind::EmptyResponse,
            Self::MalformedJson(_) => FailureKind::MalformedJson,
            Self::ProviderRejected { .. } => FailureKind::ProviderRejected,
            Self::Network { .. } => FailureKind::NetworkError,
            Self::Configuration(_) => FailureKind::Configuration,
        }
    }

    /// Map a transport error from the HTTP client
    pub(crate) fn from_transport(error: &reqwest::Error) -> Self {
        Self::Network {
            message: error.to_string(),
            timed_out: error.is_timeout(),
        }
    }
}

impl FailureKind {
    /// Alert text for this failure, `None` when the user should not be alerted
    #[must_use]
    pub fn user_message(self) -> Option<&'static str> {
        match self {
            Self::DuplicateOrConcurrent => None,
            Self::UnexpectedResponseFormat | Self::EmptyResponse | Self::MalformedJson => {
                Some("We couldn't read the server's response. Please try signing in again.")
            }
            Self::ProviderRejected => Some("Sign-in failed."),
            Self::NetworkError => {
                Some("Couldn't reach the server. Check your connection and try again.")
            }
            Self::ExtractionFailure => {
                Some("The sign-in provider didn't return the expected data. Please try again.")
            }
            Self::Configuration => Some("Sign-in is not available right now."),
        }
    }
}
