//! HTTP transport for the Faythe API.
//!
//! [`HttpClient`] owns the connection pool, the default headers and the
//! request timeout. Every request goes through [`HttpClient::execute`], which
//! joins the path onto the endpoint, sends the request and maps transport
//! failures and non-2xx answers onto [`Error`].

use crate::config::{normalize_endpoint, FaytheClientConfig, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::query::join_path;
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("faythe-client/", env!("CARGO_PKG_VERSION"));

/// Builder for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpClientBuilder {
    endpoint: String,
    user_agent: String,
    timeout: Duration,
    tls_verify: bool,
    tls_ca_cert: Option<PathBuf>,
    tls_identity: Option<(PathBuf, PathBuf)>,
}

impl HttpClientBuilder {
    /// Create a builder for the given endpoint; `http://` is assumed when no
    /// scheme is present.
    #[must_use]
    pub fn new(endpoint: impl AsRef<str>) -> Self {
        Self {
            endpoint: normalize_endpoint(endpoint.as_ref()),
            user_agent: USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            tls_verify: true,
            tls_ca_cert: None,
            tls_identity: None,
        }
    }

    /// Create a builder carrying the endpoint, timeout and TLS settings of a
    /// client configuration.
    #[must_use]
    pub fn from_config(config: &FaytheClientConfig) -> Self {
        let mut builder = Self::new(&config.endpoint)
            .with_timeout(config.timeout())
            .with_tls_verify(config.tls_verify);

        if let Some(ca_cert) = &config.tls_ca_cert {
            builder = builder.with_ca_cert(ca_cert.clone());
        }
        if let (Some(cert), Some(key)) = (&config.tls_client_cert, &config.tls_client_key) {
            builder = builder.with_identity(cert.clone(), key.clone());
        }
        builder
    }

    /// Override the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Trust an additional CA bundle (PEM).
    #[must_use]
    pub fn with_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Present a client certificate and private key (PEM).
    #[must_use]
    pub fn with_identity(mut self, cert: PathBuf, key: PathBuf) -> Self {
        self.tls_identity = Some((cert, key));
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] for an unparsable endpoint and
    /// [`Error::ConfigError`] when TLS material cannot be loaded.
    pub fn build(self) -> Result<HttpClient> {
        Url::parse(&self.endpoint).map_err(|err| {
            Error::InvalidEndpoint(format!("Invalid endpoint `{}`: {err}", self.endpoint))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = ClientBuilder::new()
            .user_agent(self.user_agent)
            .default_headers(headers)
            .timeout(self.timeout);

        if !self.tls_verify {
            warn!(endpoint = %self.endpoint, "TLS verification disabled for Faythe client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ca_cert) = &self.tls_ca_cert {
            debug!("loading Faythe CA certificate from {}", ca_cert.display());
            let bytes = read_pem(ca_cert, "CA certificate")?;
            let cert = reqwest::Certificate::from_pem(&bytes)
                .map_err(|err| Error::ConfigError(format!("Invalid CA certificate: {err}")))?;
            builder = builder.add_root_certificate(cert);
        }

        if let Some((cert, key)) = &self.tls_identity {
            debug!("loading Faythe client certificate from {}", cert.display());
            let mut pem = read_pem(cert, "client certificate")?;
            pem.push(b'\n');
            pem.extend(read_pem(key, "client key")?);
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|err| Error::ConfigError(format!("Invalid client certificate: {err}")))?;
            builder = builder.identity(identity);
        }

        let http = builder.build().map_err(|err| {
            Error::ConfigError(format!("Failed to build Faythe HTTP client: {err}"))
        })?;

        Ok(HttpClient {
            http,
            endpoint: self.endpoint,
            timeout: self.timeout,
        })
    }
}

fn read_pem(path: &Path, what: &str) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|err| {
        Error::ConfigError(format!("Failed to read {what} {}: {err}", path.display()))
    })
}

/// Session with the Faythe service.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpClient {
    /// Construct a client for the endpoint with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL.
    pub fn new(endpoint: impl AsRef<str>) -> Result<Self> {
        HttpClientBuilder::new(endpoint).build()
    }

    /// Construct a client from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint or TLS material is invalid.
    pub fn from_config(config: &FaytheClientConfig) -> Result<Self> {
        HttpClientBuilder::from_config(config).build()
    }

    /// Start a builder for the endpoint.
    #[must_use]
    pub fn builder(endpoint: impl AsRef<str>) -> HttpClientBuilder {
        HttpClientBuilder::new(endpoint)
    }

    /// Normalized endpoint string.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request timeout applied to every call.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full URL for a request path.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        join_path(&self.endpoint, path)
    }

    /// Send a request and return the successful response.
    ///
    /// `customize` receives the prepared request and may attach headers,
    /// credentials or a body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] or [`Error::CommunicationError`]
    /// when no response was received and [`Error::HttpError`] for non-2xx
    /// answers.
    pub async fn execute<F>(&self, method: Method, path: &str, customize: F) -> Result<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let url = self.url_for(path);
        let request = customize(self.http.request(method.clone(), &url));

        debug!(%method, url = %url, "Sending Faythe request");

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                let error = Error::from_transport(&err, &url);
                error!(%method, url = %url, code = error.error_code(), "{error}");
                return Err(error);
            }
        };

        debug!(%method, url = %url, status = %response.status(), "Faythe response received");
        handle_response(response, &url).await
    }

    /// Send a request with an optional JSON body and extra headers.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::execute`].
    pub async fn request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        headers: Option<&HeaderMap>,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.execute(method, path, |mut request| {
            if let Some(headers) = headers {
                request = request.headers(headers.clone());
            }
            if let Some(payload) = body {
                request = request.json(payload);
            }
            request
        })
        .await
    }

    /// Send a request and decode the response body as JSON.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::execute`]; additionally [`Error::ParseError`] when
    /// the body is not valid JSON for `R`.
    pub async fn request_json<B, R>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        headers: Option<&HeaderMap>,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.request(method, path, body, headers).await?;
        decode_json(response).await
    }

    /// `GET` a path.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::execute`].
    pub async fn get(&self, path: &str, headers: Option<&HeaderMap>) -> Result<Response> {
        self.request::<()>(Method::GET, path, None, headers).await
    }

    /// `HEAD` a path.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::execute`].
    pub async fn head(&self, path: &str, headers: Option<&HeaderMap>) -> Result<Response> {
        self.request::<()>(Method::HEAD, path, None, headers).await
    }

    /// `POST` to a path.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::execute`].
    pub async fn post<B>(
        &self,
        path: &str,
        body: Option<&B>,
        headers: Option<&HeaderMap>,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, body, headers).await
    }

    /// `PUT` to a path.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::execute`].
    pub async fn put<B>(
        &self,
        path: &str,
        body: Option<&B>,
        headers: Option<&HeaderMap>,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, path, body, headers).await
    }

    /// `PATCH` a path.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::execute`].
    pub async fn patch<B>(
        &self,
        path: &str,
        body: Option<&B>,
        headers: Option<&HeaderMap>,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.request(Method::PATCH, path, body, headers).await
    }

    /// `DELETE` a path, optionally with a body.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::execute`].
    pub async fn delete<B>(
        &self,
        path: &str,
        body: Option<&B>,
        headers: Option<&HeaderMap>,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.request(Method::DELETE, path, body, headers).await
    }
}

async fn handle_response(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let error = Error::HttpError {
        status: status.as_u16(),
        message: http_error_message(status, url, &body),
    };
    error!(status = %status, url = %url, "{error}");
    Err(error)
}

/// Status line and URL, followed by the server's JSON error detail when the
/// body parses as JSON.
fn http_error_message(status: StatusCode, url: &str, body: &str) -> String {
    let class = if status.is_server_error() {
        "Server"
    } else {
        "Client"
    };
    let reason = status.canonical_reason().unwrap_or("Unknown");
    let mut message = format!("{} {class} Error: {reason} for url: {url}", status.as_u16());

    if let Ok(detail) = serde_json::from_str::<serde_json::Value>(body) {
        message.push_str(&format!(" [Error: {detail}]"));
    }
    message
}

/// Decode a response body as JSON; an empty body decodes as `null`.
///
/// # Errors
///
/// Returns [`Error::CommunicationError`] if the body cannot be read and
/// [`Error::ParseError`] if it is not valid JSON for `R`.
pub async fn decode_json<R>(response: Response) -> Result<R>
where
    R: DeserializeOwned,
{
    let url = response.url().to_string();
    let text = response.text().await.map_err(|err| {
        Error::CommunicationError(format!("Failed to read response from {url}: {err}"))
    })?;

    if text.trim().is_empty() {
        return serde_json::from_value(serde_json::Value::Null)
            .map_err(|err| Error::ParseError(format!("Empty response from {url}: {err}")));
    }

    serde_json::from_str(&text)
        .map_err(|err| Error::ParseError(format!("Failed to parse response from {url}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> HttpClient {
        HttpClient::new(server.uri()).unwrap()
    }

    #[test]
    fn test_builder_prefixes_scheme() {
        let client = HttpClient::new("faythe.example.com:8600").unwrap();
        assert_eq!(client.endpoint(), "http://faythe.example.com:8600");
        assert_eq!(client.timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_builder_keeps_uppercase_scheme() {
        let client = HttpClient::new("HTTP://faythe:8600").unwrap();
        assert_eq!(client.endpoint(), "HTTP://faythe:8600");
    }

    #[test]
    fn test_url_for_trailing_slash_endpoint() {
        let client = HttpClient::new("http://faythe:8600/").unwrap();
        assert_eq!(client.url_for("/clouds"), "http://faythe:8600/clouds");
        assert_eq!(client.url_for("clouds"), "http://faythe:8600/clouds");
    }

    #[test]
    fn test_builder_rejects_missing_ca_file() {
        let result = HttpClient::builder("http://faythe")
            .with_ca_cert(PathBuf::from("/nonexistent/ca.pem"))
            .build();
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_http_error_message_with_json_detail() {
        let message = http_error_message(
            StatusCode::NOT_FOUND,
            "http://faythe/clouds/x",
            r#"{"error": "not found"}"#,
        );
        assert_eq!(
            message,
            r#"404 Client Error: Not Found for url: http://faythe/clouds/x [Error: {"error":"not found"}]"#
        );
    }

    #[test]
    fn test_http_error_message_plain_body() {
        let message =
            http_error_message(StatusCode::BAD_GATEWAY, "http://faythe/users", "<html>");
        assert_eq!(
            message,
            "502 Server Error: Bad Gateway for url: http://faythe/users"
        );
    }

    #[tokio::test]
    async fn get_sends_default_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nsresolvers"))
            .and(header("user-agent", USER_AGENT))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["10.0.0.1"])))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let response = client.get("/nsresolvers", None).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn request_json_serializes_body_and_extra_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .and(header("x-trace", "abc"))
            .and(body_json(json!({"username": "u", "password": "p"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("x-trace", HeaderValue::from_static("abc"));

        let client = test_client(&server);
        let value: Value = client
            .request_json(
                Method::POST,
                "users",
                Some(&json!({"username": "u", "password": "p"})),
                Some(&headers),
            )
            .await
            .unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[tokio::test]
    async fn request_json_empty_body_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/clouds/abc"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let value: Value = client
            .request_json::<(), _>(Method::DELETE, "/clouds/abc", None, None)
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn not_found_carries_server_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clouds/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.get("/clouds/missing", None).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        let text = err.to_string();
        assert!(text.contains("404 Client Error: Not Found"));
        assert!(text.contains("not found"));
    }

    #[tokio::test]
    async fn non_json_error_body_is_not_appended() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/users/admin"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .put("/users/admin", Some(&json!({})), None)
            .await
            .unwrap_err();
        match err {
            Error::HttpError { status, message } => {
                assert_eq!(status, 500);
                assert!(!message.contains("[Error:"));
                assert!(!message.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_json_success_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clouds"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .request_json::<(), Value>(Method::GET, "/clouds", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[tokio::test]
    async fn timeout_maps_to_invalid_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clouds"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client = HttpClient::builder(server.uri())
            .with_timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let err = client.get("/clouds", None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint(_)));
    }

    #[tokio::test]
    async fn unresolvable_host_maps_to_invalid_endpoint() {
        let client = HttpClient::new("http://no-such-host.invalid").unwrap();
        let err = client.get("/clouds", None).await.unwrap_err();
        match err {
            Error::InvalidEndpoint(message) => {
                assert!(message.starts_with("Error finding address for"));
                assert!(message.contains("no-such-host.invalid/clouds"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn connection_refused_maps_to_communication_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpClient::new(format!("http://{addr}")).unwrap();
        let err = client.head("/clouds", None).await.unwrap_err();
        assert!(matches!(err, Error::CommunicationError(_)));
    }

    #[tokio::test]
    async fn verb_helpers_use_matching_methods() {
        let server = MockServer::start().await;
        for verb in ["POST", "PUT", "PATCH", "DELETE", "HEAD"] {
            Mock::given(method(verb))
                .and(path("/verbs"))
                .respond_with(ResponseTemplate::new(200))
                .expect(1)
                .mount(&server)
                .await;
        }

        let client = test_client(&server);
        let body = json!({});
        client.post("/verbs", Some(&body), None).await.unwrap();
        client.put("/verbs", Some(&body), None).await.unwrap();
        client.patch("/verbs", Some(&body), None).await.unwrap();
        client.delete::<Value>("/verbs", None, None).await.unwrap();
        client.head("/verbs", None).await.unwrap();
    }
}
