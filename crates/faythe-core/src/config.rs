//! Configuration structures for Faythe clients.
//!
//! This module provides the connection settings a client needs: the service
//! endpoint, credentials, TLS material and the request timeout.

use crate::Error;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;

/// Environment variable holding the service endpoint.
pub const ENV_ENDPOINT: &str = "FAYTHE_ENDPOINT";
/// Environment variable holding the login user.
pub const ENV_USERNAME: &str = "FAYTHE_USERNAME";
/// Environment variable holding the login password.
pub const ENV_PASSWORD: &str = "FAYTHE_PASSWORD";
/// Environment variable overriding the request timeout (seconds).
pub const ENV_TIMEOUT: &str = "FAYTHE_TIMEOUT";
/// Environment variable disabling TLS verification when set to `true` or `1`.
pub const ENV_INSECURE: &str = "FAYTHE_INSECURE";
/// Environment variable pointing at a CA bundle.
pub const ENV_CA_CERT: &str = "FAYTHE_CACERT";
/// Environment variable pointing at a client certificate (PEM).
pub const ENV_CLIENT_CERT: &str = "FAYTHE_CERT";
/// Environment variable pointing at a client private key (PEM).
pub const ENV_CLIENT_KEY: &str = "FAYTHE_KEY";

/// Configuration for a Faythe client instance.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FaytheClientConfig {
    /// Service endpoint, always carrying a scheme and no trailing slash
    #[validate(url)]
    pub endpoint: String,

    /// Login user
    #[validate(length(min = 1))]
    pub username: String,

    /// Login password
    #[serde(skip_serializing, deserialize_with = "deserialize_secret")]
    pub password: SecretString,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Optional path to a custom CA bundle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_ca_cert: Option<PathBuf>,

    /// Optional client certificate (PEM)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_client_cert: Option<PathBuf>,

    /// Optional client private key (PEM)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_client_key: Option<PathBuf>,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

const fn default_tls_verify() -> bool {
    true
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// Prefix `http://` when the endpoint has no scheme and drop trailing slashes.
#[must_use]
pub fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    let has_scheme = ["http://", "https://"].iter().any(|scheme| {
        trimmed
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    });
    if has_scheme {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

impl FaytheClientConfig {
    /// Create a new client configuration with required parameters.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The service URL; `http://` is assumed when no scheme is given
    /// * `username` - Login user
    /// * `password` - Login password
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL or the username is empty.
    pub fn new(
        endpoint: impl AsRef<str>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, Error> {
        let config = Self {
            endpoint: normalize_endpoint(endpoint.as_ref()),
            username: username.into(),
            password: SecretString::from(password.into()),
            tls_verify: default_tls_verify(),
            tls_ca_cert: None,
            tls_client_cert: None,
            tls_client_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        };

        config.check()?;
        Ok(config)
    }

    /// Build a configuration from the `FAYTHE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup using the
    /// `FAYTHE_*` variable names.
    ///
    /// # Errors
    ///
    /// Returns an error if a required key is missing or a value is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .ok_or_else(|| Error::ConfigError(format!("Missing environment variable {key}")))
        };

        let mut config = Self::new(
            required(ENV_ENDPOINT)?,
            required(ENV_USERNAME)?,
            required(ENV_PASSWORD)?,
        )?;

        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            config.request_timeout_secs = timeout.trim().parse().map_err(|err| {
                Error::ConfigError(format!("Invalid {ENV_TIMEOUT} `{timeout}`: {err}"))
            })?;
        }
        if let Some(insecure) = lookup(ENV_INSECURE) {
            config.tls_verify = !matches!(insecure.trim(), "1" | "true" | "TRUE" | "yes");
        }
        config.tls_ca_cert = lookup(ENV_CA_CERT).map(PathBuf::from);
        config.tls_client_cert = lookup(ENV_CLIENT_CERT).map(PathBuf::from);
        config.tls_client_key = lookup(ENV_CLIENT_KEY).map(PathBuf::from);

        config.check()?;
        Ok(config)
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set custom CA certificate path.
    #[must_use]
    pub fn with_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Set the client certificate and private key paths.
    #[must_use]
    pub fn with_client_cert(mut self, cert: PathBuf, key: PathBuf) -> Self {
        self.tls_client_cert = Some(cert);
        self.tls_client_key = Some(key);
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse and validate the endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_endpoint(&self) -> Result<Url, Error> {
        Url::parse(&self.endpoint)
            .map_err(|e| Error::ConfigError(format!("Invalid endpoint URL: {e}")))
    }

    /// Validate field constraints and the client certificate pairing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing the first problem found.
    pub fn check(&self) -> Result<(), Error> {
        self.validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;

        match (&self.tls_client_cert, &self.tls_client_key) {
            (Some(_), None) => Err(Error::ConfigError(
                "client certificate given without a private key".to_string(),
            )),
            (None, Some(_)) => Err(Error::ConfigError(
                "client private key given without a certificate".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
