//! Session token extraction from callback URLs
//!
//! Web redirects from the identity provider put the token in the hash
//! fragment; native deep links put it in the query string. The fragment is
//! checked first, native callback URLs never carry one.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::SessionToken;

/// Name of the parameter carrying the token
pub const SESSION_PARAM: &str = "session_id";

// `session_id=` after `?` or `&`, value runs to the next `&` or `#`
static QUERY_TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]session_id=([^&#]+)").unwrap());

// Every `%` must introduce exactly two hex digits
static WELL_FORMED_ESCAPES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[^%]|%[0-9A-Fa-f]{2})*$").unwrap());

/// Pull the session token out of a callback URL.
///
/// Returns `None` when no token is present or when its percent-encoding is
/// malformed.
#[must_use]
pub fn extract_token(url: &str) -> Option<SessionToken> {
    if let Some(token) = extract_from_fragment(url) {
        debug!("Session token found in URL fragment");
        return Some(token);
    }

    let token = extract_from_query(url);
    if token.is_some() {
        debug!("Session token found in URL query");
    }
    token
}

/// Whether the URL carries a `session_id` in its hash fragment
#[must_use]
pub fn fragment_has_token(url: &str) -> bool {
    url.split_once('#')
        .is_some_and(|(_, fragment)| fragment_value(fragment).is_some())
}

/// Drop the hash fragment from a URL
#[must_use]
pub fn strip_fragment(url: &str) -> &str {
    url.split_once('#').map_or(url, |(base, _)| base)
}

// The fragment is a form-encoded parameter list, so `+` stands for a space
fn extract_from_fragment(url: &str) -> Option<SessionToken> {
    let (_, fragment) = url.split_once('#')?;
    let raw = fragment_value(fragment)?.replace('+', " ");
    decode_component(&raw)
}

fn fragment_value(fragment: &str) -> Option<&str> {
    fragment
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == SESSION_PARAM)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

fn extract_from_query(url: &str) -> Option<SessionToken> {
    let captures = QUERY_TOKEN_PATTERN.captures(url)?;
    let raw = captures.get(1)?.as_str();
    decode_component(raw)
}

fn decode_component(raw: &str) -> Option<SessionToken> {
    if !WELL_FORMED_ESCAPES.is_match(raw) {
        debug!("Rejecting session token with malformed percent-encoding");
        return None;
    }

    match urlencoding::decode(raw) {
        Ok(decoded) if !decoded.is_empty() => Some(SessionToken::new(decoded.into_owned())),
        Ok(_) => None,
        Err(e) => {
            debug!("Session token is not valid UTF-8 after decoding: {e}");
            None
        }
    }
}
