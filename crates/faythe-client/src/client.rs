//! Asynchronous Faythe client implementation.

use crate::auth::{Authenticator, PasswordAuthenticator, Token};
use crate::models::{ListFilter, PasswordChange, Policy};
use crate::Result;
use chrono::{DateTime, Utc};
use faythe_core::client::HttpClientBuilder;
use faythe_core::ids::{CloudId, HealerId, Identifier, Provider, ScalerId, SilenceId, Username};
use faythe_core::query::generate_url;
use faythe_core::{Error, FaytheClientConfig, HttpClient};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Builder for [`FaytheClient`].
pub struct FaytheClientBuilder {
    http: HttpClientBuilder,
    authenticator: Arc<dyn Authenticator>,
}

impl FaytheClientBuilder {
    /// Create a builder from a [`FaytheClientConfig`].
    #[must_use]
    pub fn new(config: &FaytheClientConfig) -> Self {
        Self {
            http: HttpClientBuilder::from_config(config),
            authenticator: Arc::new(PasswordAuthenticator::new(
                config.username.clone(),
                config.password.clone(),
            )),
        }
    }

    /// Override the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.http = self.http.with_user_agent(user_agent);
        self
    }

    /// Replace the credential exchange.
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Build the client without logging in; the first call logs in.
    pub fn build(self) -> Result<FaytheClient> {
        Ok(FaytheClient {
            http: self.http.build()?,
            authenticator: self.authenticator,
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Build the client and log in immediately.
    pub async fn connect(self) -> Result<FaytheClient> {
        let client = self.build()?;
        client.login().await?;
        Ok(client)
    }
}

/// Asynchronous Faythe client.
///
/// Clones share the session and the current token.
#[derive(Clone)]
pub struct FaytheClient {
    http: HttpClient,
    authenticator: Arc<dyn Authenticator>,
    token: Arc<RwLock<Option<Token>>>,
}

impl FaytheClient {
    /// Connect to `endpoint` and log in with the given credentials.
    ///
    /// `http://` is assumed when the endpoint has no scheme.
    pub async fn connect(
        endpoint: impl AsRef<str>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let config = FaytheClientConfig::new(endpoint, username, password)?;
        FaytheClientBuilder::new(&config).connect().await
    }

    /// Start a builder pre-populated with the provided configuration.
    #[must_use]
    pub fn builder(config: &FaytheClientConfig) -> FaytheClientBuilder {
        FaytheClientBuilder::new(config)
    }

    /// Normalized service endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.http.endpoint()
    }

    /// Underlying session.
    #[must_use]
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Expiry of the current token, if logged in.
    pub async fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.token.read().await.as_ref().map(Token::expires_at)
    }

    /// True when a token is held and has not expired.
    pub async fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .await
            .as_ref()
            .is_some_and(|token| !token.is_expired())
    }

    /// Exchange credentials for a new token and store it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationError`] if the exchange fails.
    pub async fn login(&self) -> Result<()> {
        self.authenticate().await.map(|_| ())
    }

    async fn authenticate(&self) -> Result<String> {
        let token = self.authenticator.login(&self.http).await?;
        let header = token.bearer_header();
        *self.token.write().await = Some(token);
        Ok(header)
    }

    /// Bearer header for the next call, logging in first when the stored
    /// token is missing or expired.
    async fn bearer(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            if !token.is_expired() {
                return Ok(token.bearer_header());
            }
            debug!(expires_at = %token.expires_at(), "Faythe token expired, logging in again");
        }
        self.authenticate().await
    }

    async fn authorized_headers(&self) -> Result<HeaderMap> {
        let bearer = self.bearer().await?;
        let mut value = HeaderValue::from_str(&bearer).map_err(|err| {
            Error::AuthenticationError(format!("Token is not a valid header value: {err}"))
        })?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    /// Single dispatch point for every resource call.
    async fn call<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        let headers = self.authorized_headers().await?;
        self.http
            .request_json(method, path, body, Some(&headers))
            .await
    }

    // Clouds

    /// List clouds, or fetch a single cloud when `id` is given.
    pub async fn list_clouds(&self, id: Option<&CloudId>, filter: &ListFilter) -> Result<Value> {
        let segments: Vec<&dyn Identifier> = id
            .map(|id| id as &dyn Identifier)
            .into_iter()
            .collect();
        let path = resource_path("/clouds", &segments, filter)?;
        self.call::<()>(Method::GET, &path, None).await
    }

    /// Register a cloud for a provider.
    pub async fn register_cloud<B>(&self, provider: &Provider, body: &B) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        let path = resource_path("/clouds", &[provider], &ListFilter::new())?;
        self.call(Method::POST, &path, Some(body)).await
    }

    /// Update a registered cloud.
    pub async fn update_cloud<B>(&self, id: &CloudId, body: &B) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        let path = resource_path("/clouds", &[id], &ListFilter::new())?;
        self.call(Method::PUT, &path, Some(body)).await
    }

    /// Unregister a cloud.
    pub async fn unregister_cloud(&self, id: &CloudId) -> Result<Value> {
        let path = resource_path("/clouds", &[id], &ListFilter::new())?;
        self.call::<()>(Method::DELETE, &path, None).await
    }

    // Scalers

    /// List the scalers of a cloud.
    pub async fn list_scalers(&self, cloud_id: &CloudId, filter: &ListFilter) -> Result<Value> {
        let path = resource_path("/scalers", &[cloud_id], filter)?;
        self.call::<()>(Method::GET, &path, None).await
    }

    /// Create a scaler in a cloud.
    pub async fn create_scaler<B>(&self, cloud_id: &CloudId, body: &B) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        let path = resource_path("/scalers", &[cloud_id], &ListFilter::new())?;
        self.call(Method::POST, &path, Some(body)).await
    }

    /// Update a scaler.
    pub async fn update_scaler<B>(
        &self,
        cloud_id: &CloudId,
        scaler_id: &ScalerId,
        body: &B,
    ) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        let path = resource_path(
            "/scalers",
            &[cloud_id, scaler_id],
            &ListFilter::new(),
        )?;
        self.call(Method::PUT, &path, Some(body)).await
    }

    /// Delete a scaler.
    pub async fn delete_scaler(&self, cloud_id: &CloudId, scaler_id: &ScalerId) -> Result<Value> {
        let path = resource_path(
            "/scalers",
            &[cloud_id, scaler_id],
            &ListFilter::new(),
        )?;
        self.call::<()>(Method::DELETE, &path, None).await
    }

    // Healers

    /// List the healers of a cloud.
    pub async fn list_healers(&self, cloud_id: &CloudId, filter: &ListFilter) -> Result<Value> {
        let path = resource_path("/healers", &[cloud_id], filter)?;
        self.call::<()>(Method::GET, &path, None).await
    }

    /// Create a healer in a cloud.
    pub async fn create_healer<B>(&self, cloud_id: &CloudId, body: &B) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        let path = resource_path("/healers", &[cloud_id], &ListFilter::new())?;
        self.call(Method::POST, &path, Some(body)).await
    }

    /// Delete a healer.
    pub async fn delete_healer(&self, cloud_id: &CloudId, healer_id: &HealerId) -> Result<Value> {
        let path = resource_path(
            "/healers",
            &[cloud_id, healer_id],
            &ListFilter::new(),
        )?;
        self.call::<()>(Method::DELETE, &path, None).await
    }

    // Silences

    /// List the silences of a cloud.
    pub async fn list_silences(&self, cloud_id: &CloudId, filter: &ListFilter) -> Result<Value> {
        let path = resource_path("/silences", &[cloud_id], filter)?;
        self.call::<()>(Method::GET, &path, None).await
    }

    /// Create a silence in a cloud.
    pub async fn create_silence<B>(&self, cloud_id: &CloudId, body: &B) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        let path = resource_path("/silences", &[cloud_id], &ListFilter::new())?;
        self.call(Method::POST, &path, Some(body)).await
    }

    /// Expire (delete) a silence.
    pub async fn expire_silence(
        &self,
        cloud_id: &CloudId,
        silence_id: &SilenceId,
    ) -> Result<Value> {
        let path = resource_path(
            "/silences",
            &[cloud_id, silence_id],
            &ListFilter::new(),
        )?;
        self.call::<()>(Method::DELETE, &path, None).await
    }

    // Users and policies

    /// List users.
    pub async fn list_users(&self, filter: &ListFilter) -> Result<Value> {
        let path = resource_path("/users", &[], filter)?;
        self.call::<()>(Method::GET, &path, None).await
    }

    /// Create a user.
    pub async fn create_user<B>(&self, body: &B) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        let path = resource_path("/users", &[], &ListFilter::new())?;
        self.call(Method::POST, &path, Some(body)).await
    }

    /// Delete a user.
    pub async fn delete_user(&self, username: &Username) -> Result<Value> {
        let path = resource_path("/users", &[username], &ListFilter::new())?;
        self.call::<()>(Method::DELETE, &path, None).await
    }

    /// Change a user's password.
    pub async fn change_password(&self, username: &Username, new_password: &str) -> Result<Value> {
        let path = resource_path("/users", &[username], &ListFilter::new())?;
        let body = PasswordChange {
            password: new_password,
        };
        self.call(Method::PUT, &path, Some(&body)).await
    }

    /// Grant policies to a user.
    pub async fn add_policies(&self, username: &Username, policies: &[Policy]) -> Result<Value> {
        let path = resource_path("/policies", &[username], &ListFilter::new())?;
        self.call(Method::POST, &path, Some(policies)).await
    }

    /// Revoke policies from a user.
    pub async fn remove_policies(&self, username: &Username, policies: &[Policy]) -> Result<Value> {
        let path = resource_path("/policies", &[username], &ListFilter::new())?;
        self.call(Method::DELETE, &path, Some(policies)).await
    }

    // Name resolvers

    /// List the name resolvers registered with the service.
    pub async fn list_nsresolvers(&self) -> Result<Value> {
        self.call::<()>(Method::GET, "/nsresolvers", None).await
    }
}

/// Collection path plus identifiers and filters; identifiers must be present.
fn resource_path(
    collection: &str,
    segments: &[&dyn Identifier],
    filter: &ListFilter,
) -> Result<String> {
    if segments.iter().any(|segment| segment.is_blank()) {
        return Err(Error::InvalidEndpoint(format!(
            "empty identifier in `{collection}` request path"
        )));
    }
    Ok(generate_url(collection, segments, filter.pairs()))
}
