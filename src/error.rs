//! Error types for the DOGE export CLI

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;


pub type Result<T> = std::result::Result<T, DogeError>;

/// Classification of a failed request attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestErrorKind {
    /// The attempt exceeded the configured per-request timeout
    Timeout,
    /// DNS failure, refused connection, reset, or any other transport failure
    ConnectionFailure,
    /// The server answered with a non-success status code
    HttpStatus(u16),
    /// The body of a successful response was not valid JSON
    InvalidJson,
}

impl RequestErrorKind {
    /// Whether another attempt may succeed: timeouts, connection failures,
    /// 5xx and 429 are transient; everything else is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            RequestErrorKind::Timeout | RequestErrorKind::ConnectionFailure => true,
            RequestErrorKind::HttpStatus(code) => *code == 429 || *code >= 500,
            RequestErrorKind::InvalidJson => false,
        }
    }
}

impl fmt::Display for RequestErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestErrorKind::Timeout => write!(f, "timeout"),
            RequestErrorKind::ConnectionFailure => write!(f, "connection failure"),
            RequestErrorKind::HttpStatus(code) => write!(f, "HTTP {}", code),
            RequestErrorKind::InvalidJson => write!(f, "invalid JSON"),
        }
    }
}

/// A single failed request, as seen by the retry policy.
#[derive(Error, Debug, Clone)]
#[error("request to {url} failed ({kind}): {message}")]
pub struct RequestError {
    pub kind: RequestErrorKind,
    pub url: String,
    pub message: String,
    /// Server-provided wait hint (`Retry-After`), only set for 429/503 answers.
    pub retry_after: Option<Duration>,
}

impl RequestError {
    pub fn new(kind: RequestErrorKind, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }
}

#[derive(Error, Debug)]
pub enum DogeError {
    #[error("API rejected the request to {url} with HTTP {status}; check DOGE_API_KEY")]
    Auth { status: u16, url: String },

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error("export to {path} failed: {reason}")]
    Export { path: PathBuf, reason: String },

    #[error("invalid filter '{input}': {reason}")]
    InvalidFilter { input: String, reason: String },

    #[error("invalid value for {key}: {reason}")]
    Config { key: String, reason: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

impl DogeError {
    /// The request classification, when this error came from the request layer.
    pub fn request_kind(&self) -> Option<RequestErrorKind> {
        match self {
            DogeError::Request(err) => Some(err.kind),
            _ => None,
        }
    }

    /// Whether the retry policy may attempt the operation again.
    pub fn is_retryable(&self) -> bool {
        self.request_kind().is_some_and(|kind| kind.is_retryable())
    }

    pub(crate) fn export(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        DogeError::Export {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
