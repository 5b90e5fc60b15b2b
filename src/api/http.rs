//! HTTP transport for the DOGE API.
//!
//! One call to [`Transport::get_json`] is one attempt; retrying is layered on
//! top by [`crate::api::retry`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{DogeError, RequestError, RequestErrorKind, Result};


/// Header carrying the static API key.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Longest slice of an error body kept in error messages.
const ERROR_BODY_LIMIT: usize = 200;

/// A single-attempt JSON GET against the API.
pub trait Transport {
    /// Full URL for `endpoint`, used for requests and error context.
    fn url(&self, endpoint: &str) -> String;

    /// Issue one GET with `params` and decode the body as JSON.
    fn get_json(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value>;
}

/// Blocking reqwest transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            let mut value = HeaderValue::from_str(key)?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(format!(
                "doge-export/{} (api {})",
                env!("CARGO_PKG_VERSION"),
                config.api_version
            ))
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Transport for HttpTransport {
    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    fn get_json(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value> {
        let url = self.url(endpoint);
        debug!(%url, params = params.len(), "GET");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DogeError::Auth {
                status: status.as_u16(),
                url,
            });
        }

        if !status.is_success() {
            let retry_after = if status == StatusCode::TOO_MANY_REQUESTS
                || status == StatusCode::SERVICE_UNAVAILABLE
            {
                response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| parse_retry_after(v, Utc::now()))
            } else {
                None
            };
            let body = response.text().unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("no reason").to_string()
            } else {
                body.trim().chars().take(ERROR_BODY_LIMIT).collect()
            };

            return Err(RequestError::new(
                RequestErrorKind::HttpStatus(status.as_u16()),
                url,
                message,
            )
            .with_retry_after(retry_after)
            .into());
        }

        let body = response.text().map_err(|e| transport_error(&url, e))?;
        serde_json::from_str(&body).map_err(|e| {
            RequestError::new(RequestErrorKind::InvalidJson, url, e.to_string()).into()
        })
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> DogeError {
    let kind = if err.is_timeout() {
        RequestErrorKind::Timeout
    } else {
        RequestErrorKind::ConnectionFailure
    };
    RequestError::new(kind, url, err.to_string()).into()
}

/// Parse a `Retry-After` value: delta-seconds or an HTTP-date. Dates in the
/// past give a zero wait.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}
