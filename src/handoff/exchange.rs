//! Session token exchange client
//!
//! Redeems a session token at the backend's exchange endpoint and
//! normalizes whatever comes back into an [`ExchangeOutcome`].

use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::handoff::error::HandoffError;
use crate::models::{
    ExchangeErrorBody, ExchangeOutcome, ExchangeRequest, ExchangeResponseBody, SessionToken,
};
use crate::settings::HandoffSettings;
use crate::utils::logging::LoggingHelper;

const GENERIC_REJECTION: &str = "Unable to complete sign-in with this provider";

/// Anything that can redeem a session token
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Exchange `token` for an application session.
    ///
    /// Failures are reported as [`ExchangeOutcome::Failure`], never panics.
    async fn exchange(&self, token: &SessionToken) -> ExchangeOutcome;
}

/// HTTP implementation against `POST /auth/<provider>/exchange`
#[derive(Debug, Clone)]
pub struct HttpExchangeClient {
    http_client: reqwest::Client,
    endpoint: String,
    provider: String,
}

impl HttpExchangeClient {
    /// Build a client with a bounded request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The backend base URL cannot be joined with the exchange path
    /// - The HTTP client cannot be constructed
    pub fn new(backend_base_url: &str, provider: &str, timeout: Duration) -> Result<Self, HandoffError> {
        let endpoint = exchange_endpoint(backend_base_url, provider)?;
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HandoffError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            endpoint,
            provider: provider.to_string(),
        })
    }

    /// Build a client from loaded settings
    ///
    /// # Errors
    ///
    /// Returns an error if the backend settings are invalid
    pub fn from_settings(settings: &HandoffSettings) -> Result<Self, HandoffError> {
        Self::new(
            &settings.backend.base_url,
            &settings.identity_provider.name,
            settings.exchange_timeout(),
        )
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn try_exchange(&self, token: &SessionToken) -> Result<ExchangeOutcome, HandoffError> {
        LoggingHelper::log_exchange_start(&self.provider, token);

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .json(&ExchangeRequest {
                session_id: token.as_str(),
            })
            .send()
            .await
            .map_err(|e| {
                error!("Exchange request failed: {e}");
                HandoffError::from_transport(&e)
            })?;

        let status = response.status();
        let body = read_json_body(response).await?;

        if body.trim().is_empty() {
            return Err(HandoffError::EmptyResponse);
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse exchange response: {e}");
            HandoffError::MalformedJson(e.to_string())
        })?;

        if !status.is_success() {
            return Err(rejection(status, value));
        }

        let parsed: ExchangeResponseBody = serde_json::from_value(value)
            .map_err(|e| HandoffError::MalformedJson(e.to_string()))?;

        interpret(parsed)
    }
}

#[async_trait]
impl TokenExchanger for HttpExchangeClient {
    async fn exchange(&self, token: &SessionToken) -> ExchangeOutcome {
        match self.try_exchange(token).await {
            Ok(outcome) => {
                LoggingHelper::log_exchange_outcome(&self.provider, &outcome);
                outcome
            }
            Err(e) => {
                LoggingHelper::log_exchange_failure(&self.provider, &e);
                e.into()
            }
        }
    }
}

/// `<base>/auth/<provider>/exchange`
///
/// # Errors
///
/// Returns an error if the base URL is not absolute or the provider name is empty
pub fn exchange_endpoint(backend_base_url: &str, provider: &str) -> Result<String, HandoffError> {
    if provider.trim().is_empty() {
        return Err(HandoffError::Configuration(
            "Identity provider name is empty".to_string(),
        ));
    }

    let mut url = url::Url::parse(backend_base_url).map_err(|e| {
        HandoffError::Configuration(format!("Invalid backend URL '{backend_base_url}': {e}"))
    })?;

    url.path_segments_mut()
        .map_err(|()| {
            HandoffError::Configuration(format!(
                "Backend URL '{backend_base_url}' cannot carry a path"
            ))
        })?
        .pop_if_empty()
        .extend(["auth", provider, "exchange"]);

    Ok(url.to_string())
}

/// Whether a `Content-Type` value names a JSON media type
#[must_use]
pub fn is_json_media_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// Read the body, refusing anything that is not declared as JSON.
///
/// A non-JSON body is still read as text so it can be logged, but it is
/// never handed to the JSON parser.
async fn read_json_body(response: Response) -> Result<String, HandoffError> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let body = response.text().await.map_err(|e| {
        error!("Failed to read exchange response body: {e}");
        HandoffError::from_transport(&e)
    })?;

    if !is_json_media_type(&content_type) {
        LoggingHelper::log_unexpected_response(&content_type, &body);
        return Err(HandoffError::UnexpectedResponseFormat { content_type, body });
    }

    Ok(body)
}

fn rejection(status: StatusCode, body: Value) -> HandoffError {
    let message = serde_json::from_value::<ExchangeErrorBody>(body)
        .ok()
        .and_then(|b| b.reason())
        .unwrap_or_else(|| GENERIC_REJECTION.to_string());

    HandoffError::ProviderRejected {
        status: status.as_u16(),
        message,
    }
}

fn interpret(body: ExchangeResponseBody) -> Result<ExchangeOutcome, HandoffError> {
    if body.is_new_user {
        debug!("Exchange returned a new identity");
        return Ok(ExchangeOutcome::NewUser {
            provider_profile: body.google_data.unwrap_or_default(),
        });
    }

    match body.user {
        Some(user) => {
            info!("Exchange matched existing user {}", user.id);
            Ok(ExchangeOutcome::ExistingUser { user })
        }
        None => Err(HandoffError::MalformedJson(
            "existing-user response without a user record".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_endpoint() {
        assert_eq!(
            exchange_endpoint("https://api.example.com", "google").unwrap(),
            "https://api.example.com/auth/google/exchange"
        );
        assert_eq!(
            exchange_endpoint("https://api.example.com/api/", "google").unwrap(),
            "https://api.example.com/api/auth/google/exchange"
        );
    }

    #[test]
    fn test_exchange_endpoint_rejects_bad_input() {
        assert!(exchange_endpoint("not a url", "google").is_err());
        assert!(exchange_endpoint("https://api.example.com", " ").is_err());
        assert!(exchange_endpoint("mailto:ops@example.com", "google").is_err());
    }

    #[test]
    fn test_json_media_types() {
        assert!(is_json_media_type("application/json"));
        assert!(is_json_media_type("application/json; charset=utf-8"));
        assert!(is_json_media_type("Application/JSON"));
        assert!(is_json_media_type("application/problem+json"));
        assert!(!is_json_media_type("text/html"));
        assert!(!is_json_media_type("text/plain; charset=utf-8"));
        assert!(!is_json_media_type(""));
    }

    #[test]
    fn test_rejection_uses_detail_or_generic_message() {
        let error = rejection(
            StatusCode::UNAUTHORIZED,
            serde_json::json!({ "detail": "Session expired" }),
        );
        match error {
            HandoffError::ProviderRejected { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Session expired");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let error = rejection(StatusCode::BAD_GATEWAY, serde_json::json!({}));
        match error {
            HandoffError::ProviderRejected { message, .. } => {
                assert_eq!(message, GENERIC_REJECTION);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_interpret_new_user_without_profile() {
        let body: ExchangeResponseBody = serde_json::from_str(r#"{"is_new_user": true}"#).unwrap();
        match interpret(body).unwrap() {
            ExchangeOutcome::NewUser { provider_profile } => {
                assert_eq!(provider_profile.email, "");
                assert_eq!(provider_profile.name, "");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_interpret_existing_user_requires_record() {
        let body: ExchangeResponseBody =
            serde_json::from_str(r#"{"is_new_user": false}"#).unwrap();
        assert!(matches!(
            interpret(body),
            Err(HandoffError::MalformedJson(_))
        ));
    }
}
