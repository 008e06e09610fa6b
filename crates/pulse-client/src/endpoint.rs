//! Notification endpoint URL derivation.
//!
//! The API base is either absolute (`https://rent.example.com/api`) or
//! origin-relative (`/api`). A trailing `/api` segment is dropped and the
//! notification path appended, so `https://h/api` becomes
//! `wss://h/api/ws/notifications?token=...`.

use pulse_core::constants::TOKEN_QUERY_PARAM;
use secrecy::{ExposeSecret, SecretString};
use url::{Position, Url};

use crate::config::EndpointConfig;
use crate::errors::{ClientError, Result};

/// Build the notification URL for `token`.
pub fn notification_url(config: &EndpointConfig, token: &SecretString) -> Result<Url> {
    let origin = config
        .page_origin
        .as_deref()
        .map(parse_origin)
        .transpose()?;

    let base = config.api_base_url.trim();
    let (authority_source, prefix) = match Url::parse(base) {
        Ok(absolute) if absolute.has_host() => {
            let prefix = strip_api_suffix(absolute.path()).to_string();
            (absolute, prefix)
        }
        Ok(other) => {
            return Err(ClientError::InvalidEndpoint(format!(
                "api base has no host: {other}"
            )));
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let Some(origin) = origin.clone() else {
                return Err(ClientError::InvalidEndpoint(
                    "relative api base requires a page origin".into(),
                ));
            };
            let relative = base.split(['?', '#']).next().unwrap_or_default();
            (origin, strip_api_suffix(relative).to_string())
        }
        Err(e) => return Err(ClientError::InvalidEndpoint(e.to_string())),
    };

    // The page scheme decides; without one, the base's own scheme does.
    let secure = match &origin {
        Some(origin) => is_secure(origin.scheme())?,
        None => is_secure(authority_source.scheme())?,
    };
    let scheme = if secure { "wss" } else { "ws" };
    let authority = &authority_source[Position::BeforeHost..Position::AfterPort];

    let raw = format!(
        "{scheme}://{authority}{prefix}{path}",
        path = config.notification_path
    );
    let mut url = Url::parse(&raw).map_err(|e| ClientError::InvalidEndpoint(e.to_string()))?;
    let _ = url
        .query_pairs_mut()
        .append_pair(TOKEN_QUERY_PARAM, token.expose_secret());
    Ok(url)
}

/// Copy of `url` with the token replaced, for logging.
pub fn redacted(url: &Url) -> String {
    let mut copy = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == TOKEN_QUERY_PARAM {
                "[REDACTED]".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    if !pairs.is_empty() {
        let _ = copy.query_pairs_mut().clear().extend_pairs(pairs);
    }
    copy.to_string()
}

fn parse_origin(origin: &str) -> Result<Url> {
    let url = Url::parse(origin.trim())
        .map_err(|e| ClientError::InvalidEndpoint(format!("page origin: {e}")))?;
    if url.has_host() {
        Ok(url)
    } else {
        Err(ClientError::InvalidEndpoint(format!(
            "page origin has no host: {origin}"
        )))
    }
}

fn is_secure(scheme: &str) -> Result<bool> {
    match scheme {
        "https" | "wss" => Ok(true),
        "http" | "ws" => Ok(false),
        other => Err(ClientError::InvalidEndpoint(format!(
            "unsupported scheme: {other}"
        ))),
    }
}

fn strip_api_suffix(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.strip_suffix("/api").unwrap_or(trimmed)
}
