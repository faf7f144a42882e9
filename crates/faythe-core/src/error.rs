//! Error types for Faythe operations.
//!
//! Every failure surfaced by the transport or the resource client is mapped
//! onto the small taxonomy below. Nothing is retried; callers decide.

use thiserror::Error;

/// Main error type for Faythe operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed or unresolvable endpoint, or a request that timed out
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Connection refused or socket-level I/O failure
    #[error("Communication error: {0}")]
    CommunicationError(String),

    /// The service answered with a non-2xx status
    #[error("HTTP error: {message}")]
    HttpError {
        /// Numeric HTTP status code
        status: u16,
        /// Status text, URL and any server-provided error detail
        message: String,
    },

    /// The login exchange failed
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A successful response carried a body that is not valid JSON
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// Specialized result type for Faythe operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::CommunicationError(_) => "COMMUNICATION_ERROR",
            Self::HttpError { .. } => "HTTP_ERROR",
            Self::AuthenticationError(_) => "AUTHENTICATION_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ParseError(_) => "PARSE_ERROR",
        }
    }

    /// HTTP status carried by [`Error::HttpError`], if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify a transport failure for the request sent to `url`.
    ///
    /// Timeouts and name-resolution failures are reported as
    /// [`Error::InvalidEndpoint`]; refused connections and other I/O
    /// failures as [`Error::CommunicationError`].
    #[must_use]
    pub fn from_transport(err: &reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            Self::InvalidEndpoint(format!("Error communicating with {url}: {err}"))
        } else if is_dns_failure(err) {
            Self::InvalidEndpoint(format!("Error finding address for {url}: {err}"))
        } else if err.is_connect() {
            Self::CommunicationError(format!("Error finding address for {url}: {err}"))
        } else if err.is_builder() {
            Self::InvalidEndpoint(format!("Invalid request for {url}: {err}"))
        } else {
            Self::CommunicationError(format!("Error communicating with {url}: {err}"))
        }
    }
}

fn is_dns_failure(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if cause.to_string().contains("dns error") {
            return true;
        }
        source = cause.source();
    }
    false
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map_or_else(|| "<unknown>".to_string(), ToString::to_string);
        Self::from_transport(&err, &url)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}
