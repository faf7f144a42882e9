//! Login and bearer token lifecycle.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use faythe_core::client::decode_json;
use faythe_core::{Error, HttpClient, Result};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{error, info};

/// Path of the credential exchange.
pub const LOGIN_PATH: &str = "/public/login";

/// Lifetime assumed for every issued token. The service does not report one.
pub const TOKEN_LIFETIME_MINUTES: i64 = 40;

/// Bearer credential and its locally estimated expiry.
#[derive(Debug, Clone)]
pub struct Token {
    value: SecretString,
    expires_at: DateTime<Utc>,
}

impl Token {
    /// Wrap a freshly issued token, expiring [`TOKEN_LIFETIME_MINUTES`] from now.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self::with_expiry(value, Utc::now() + Duration::minutes(TOKEN_LIFETIME_MINUTES))
    }

    /// Wrap a token with an explicit expiry.
    #[must_use]
    pub fn with_expiry(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: SecretString::from(value.into()),
            expires_at,
        }
    }

    /// When the token stops being used.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True once the current time is past the expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// `Authorization` header value.
    #[must_use]
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.value.expose_secret())
    }
}

/// Credential exchange producing a [`Token`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Perform the exchange over the given session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationError`] when no token could be obtained.
    async fn login(&self, http: &HttpClient) -> Result<Token>;
}

/// Basic-auth login against [`LOGIN_PATH`].
pub struct PasswordAuthenticator {
    username: String,
    password: SecretString,
}

impl PasswordAuthenticator {
    /// Create an authenticator for the given credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

// Deployments answer with `token`, `jwt` or a `Data.Token` envelope.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    jwt: Option<String>,
    #[serde(default, rename = "Data")]
    data: Option<LoginData>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(default, rename = "Token")]
    token: Option<String>,
}

impl LoginResponse {
    fn into_token(self) -> Option<String> {
        [self.token, self.jwt, self.data.and_then(|data| data.token)]
            .into_iter()
            .flatten()
            .find(|token| !token.is_empty())
    }
}

#[async_trait]
impl Authenticator for PasswordAuthenticator {
    async fn login(&self, http: &HttpClient) -> Result<Token> {
        let failed = |err: Error| {
            error!(username = %self.username, endpoint = %http.endpoint(), "Unable to authenticate a user: {err}");
            Error::AuthenticationError(format!(
                "Unable to authenticate user `{}`: {err}",
                self.username
            ))
        };

        let response = http
            .execute(Method::POST, LOGIN_PATH, |request| {
                request.basic_auth(&self.username, Some(self.password.expose_secret()))
            })
            .await
            .map_err(failed)?;

        let body: LoginResponse = decode_json(response).await.map_err(failed)?;
        let token = body.into_token().ok_or_else(|| {
            failed(Error::ParseError("login response carried no token".to_string()))
        })?;

        info!(username = %self.username, endpoint = %http.endpoint(), "Logged into Faythe");
        Ok(Token::new(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // base64("admin:secret")
    const BASIC_ADMIN: &str = "Basic YWRtaW46c2VjcmV0";

    fn authenticator() -> PasswordAuthenticator {
        PasswordAuthenticator::new("admin", SecretString::from("secret".to_string()))
    }

    #[test]
    fn new_token_expires_in_forty_minutes() {
        let lifetime = Duration::minutes(TOKEN_LIFETIME_MINUTES);
        let before = Utc::now();
        let token = Token::new("abc");
        let after = Utc::now();
        assert!(token.expires_at() >= before + lifetime);
        assert!(token.expires_at() <= after + lifetime);
        assert!(!token.is_expired());
    }

    #[test]
    fn past_expiry_is_expired() {
        let token = Token::with_expiry("abc", Utc::now() - Duration::seconds(1));
        assert!(token.is_expired());
    }

    #[test]
    fn bearer_header_and_redacted_debug() {
        let token = Token::new("abc.def");
        assert_eq!(token.bearer_header(), "Bearer abc.def");
        assert!(!format!("{token:?}").contains("abc.def"));
    }

    #[test]
    fn login_response_shapes() {
        let flat: LoginResponse = serde_json::from_value(json!({"token": "t1"})).unwrap();
        assert_eq!(flat.into_token().as_deref(), Some("t1"));

        let jwt: LoginResponse = serde_json::from_value(json!({"jwt": "t2"})).unwrap();
        assert_eq!(jwt.into_token().as_deref(), Some("t2"));

        let nested: LoginResponse =
            serde_json::from_value(json!({"Status": "OK", "Data": {"Token": "t3"}})).unwrap();
        assert_eq!(nested.into_token().as_deref(), Some("t3"));

        let empty: LoginResponse = serde_json::from_value(json!({"token": ""})).unwrap();
        assert!(empty.into_token().is_none());
    }

    #[test]
    fn login_response_with_token_and_jwt_prefers_token() {
        let both: LoginResponse =
            serde_json::from_value(json!({"token": "t1", "jwt": "t2"})).unwrap();
        assert_eq!(both.into_token().as_deref(), Some("t1"));

        let blank_token: LoginResponse =
            serde_json::from_value(json!({"token": "", "jwt": "t2"})).unwrap();
        assert_eq!(blank_token.into_token().as_deref(), Some("t2"));
    }

    #[tokio::test]
    async fn password_login_uses_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .and(header("authorization", BASIC_ADMIN))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "fresh"})))
            .expect(1)
            .mount(&server)
            .await;

        let http = HttpClient::new(server.uri()).unwrap();
        let token = authenticator().login(&http).await.unwrap();
        assert_eq!(token.bearer_header(), "Bearer fresh");
    }

    #[tokio::test]
    async fn rejected_credentials_are_authentication_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "bad creds"})))
            .mount(&server)
            .await;

        let http = HttpClient::new(server.uri()).unwrap();
        let err = authenticator().login(&http).await.unwrap_err();
        match err {
            Error::AuthenticationError(message) => {
                assert!(message.contains("admin"));
                assert!(message.contains("bad creds"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_token_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .mount(&server)
            .await;

        let http = HttpClient::new(server.uri()).unwrap();
        let err = authenticator().login(&http).await.unwrap_err();
        assert!(matches!(err, Error::AuthenticationError(_)));
    }
}
