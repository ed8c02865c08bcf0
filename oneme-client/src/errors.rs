//! Error types for oneme-client.

use std::{fmt, io};

// ─── ApiError ─────────────────────────────────────────────────────────────────

/// A structured error returned by the server inside a response payload.
///
/// The wire convention: a response payload with a non-empty `error` string is
/// a failure; `message`, `title` and `localizedMessage` carry human-readable
/// detail when present.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiError {
    /// Machine-readable error code, e.g. `"login.token"`.
    pub code:              String,
    pub message:           Option<String>,
    pub title:             Option<String>,
    pub localized_message: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "api error {}", self.code)?;
        if let Some(m) = &self.message {
            write!(f, ": {m}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Extract an error from a response payload, or `None` if the payload
    /// denotes success (no `error` field, or an empty one).
    pub fn from_payload(payload: &serde_json::Value) -> Option<Self> {
        let code = match payload.get("error").and_then(|v| v.as_str()) {
            Some("") | None => return None,
            Some(code)      => code.to_string(),
        };
        let field = |name: &str| {
            payload.get(name).and_then(|v| v.as_str()).map(str::to_string)
        };
        Some(Self {
            code,
            message:           field("message"),
            title:             field("title"),
            localized_message: field("localizedMessage"),
        })
    }

    /// Match on the error code, with optional wildcard prefix/suffix `'*'`.
    ///
    /// # Examples
    /// - `err.is("login.token")` — exact match
    /// - `err.is("login.*")` — starts-with match
    pub fn is(&self, pattern: &str) -> bool {
        if let Some(prefix) = pattern.strip_suffix('*') {
            self.code.starts_with(prefix)
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            self.code.ends_with(suffix)
        } else {
            self.code == pattern
        }
    }

    /// The distinguished rate-limit signal.
    pub fn is_rate_limit(&self) -> bool {
        self.code == "too.many.requests"
    }
}

// ─── Error ────────────────────────────────────────────────────────────────────

/// The error type returned from any `Client` method that talks to the server.
#[derive(Debug)]
pub enum Error {
    /// The server rejected the request with a structured error payload.
    Api(ApiError),
    /// No response arrived before the caller's deadline.
    Timeout,
    /// A caller-side abort, e.g. a `CodeProvider` that gave up waiting for
    /// user input.
    Canceled,
    /// The connection and registries were torn down mid-call.
    ConnectionClosed,
    /// Transport-level failure, not worth retrying.
    Network(String),
    /// Transient transport failure; the HTTP upload path retries these.
    Temporary(String),
    /// Input rejected before any network activity (e.g. malformed phone).
    InvalidInput(String),
    /// A response payload did not have the expected shape.
    Decode(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(e)           => write!(f, "{e}"),
            Self::Timeout          => write!(f, "request timed out"),
            Self::Canceled         => write!(f, "request canceled"),
            Self::ConnectionClosed => write!(f, "connection closed"),
            Self::Network(s)       => write!(f, "network error: {s}"),
            Self::Temporary(s)     => write!(f, "temporary network error: {s}"),
            Self::InvalidInput(s)  => write!(f, "invalid input: {s}"),
            Self::Decode(s)        => write!(f, "decode error: {s}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self { Self::Network(e.to_string()) }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self { Self::Decode(e.to_string()) }
}

impl Error {
    /// Returns `true` if this is the named server error (supports `'*'` wildcards).
    pub fn is(&self, pattern: &str) -> bool {
        match self {
            Self::Api(e) => e.is(pattern),
            _            => false,
        }
    }

    /// Returns `true` for the distinguished rate-limit error code.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::Api(e) => e.is_rate_limit(),
            _            => false,
        }
    }

    /// Only [`Error::Temporary`] failures are eligible for upload retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }
}
