//! Data model for the identity handoff
//!
//! Wire shapes returned by the backend's token-exchange endpoint and the
//! outcome type every caller of the pipeline has to match on.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::handoff::error::HandoffError;

/// Opaque single-use token issued by the identity provider.
///
/// No internal structure is assumed. `Debug` only shows the length so the
/// value never ends up in logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken(<{} chars>)", self.0.len())
    }
}

/// Request body for `POST /auth/<provider>/exchange`
#[derive(Debug, Serialize)]
pub struct ExchangeRequest<'a> {
    pub session_id: &'a str,
}

/// Profile supplied by the identity provider for an identity with no account yet.
///
/// Every field defaults to an empty string so registration pre-fill is total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub picture: String,
    #[serde(
        default,
        alias = "google_id",
        deserialize_with = "string_or_empty"
    )]
    pub provider_id: String,
}

/// Role carried on the backend's user record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Rider,
    Driver,
    #[serde(other)]
    Other,
}

/// Existing application account, opaque apart from `id` and `role`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserRecord {
    #[must_use]
    pub fn is_driver(&self) -> bool {
        self.role == UserRole::Driver
    }
}

/// Raw success body of the exchange endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct ExchangeResponseBody {
    #[serde(default)]
    pub is_new_user: bool,
    #[serde(default)]
    pub user: Option<UserRecord>,
    #[serde(default, alias = "provider_data")]
    pub google_data: Option<ProviderProfile>,
}

/// Raw failure body of the exchange endpoint
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExchangeErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ExchangeErrorBody {
    /// Human-readable reason, `detail` first then `message`
    pub(crate) fn reason(&self) -> Option<String> {
        let detail = match &self.detail {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        detail
            .or_else(|| self.message.clone())
            .filter(|reason| !reason.trim().is_empty())
    }
}

/// Result of one exchange attempt
#[derive(Debug)]
pub enum ExchangeOutcome {
    /// The identity has no application account yet
    NewUser { provider_profile: ProviderProfile },
    /// The identity maps to an existing account
    ExistingUser { user: UserRecord },
    Failure(HandoffError),
}

impl From<HandoffError> for ExchangeOutcome {
    fn from(error: HandoffError) -> Self {
        Self::Failure(error)
    }
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for user id, got {other}"
        ))),
    }
}
