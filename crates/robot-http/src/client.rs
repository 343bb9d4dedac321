//! Request client: auth injection, timing, network retry, envelope unwrap.

use crate::envelope::Envelope;
use crate::error::{ClientError, ClientResult, HttpError, HttpResult};
use crate::navigator::Navigator;
use crate::token::TokenStore;
use reqwest::{Client, Method, RequestBuilder, Response};
use robot_core::{retry_delay, Sleeper, TokioSleeper};
use robot_telemetry::Metrics;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Client-side route shown when the session has expired.
pub const LOGIN_PATH: &str = "/login";

/// Request client configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Backend origin, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Prefix prepended to every path.
    pub api_prefix: String,
    /// Whole-request timeout.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Retry ceiling for transport failures.
    pub max_retries: u32,
    /// Base of the `2^attempt * base` retry delay.
    pub retry_base_delay: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_prefix: "/api/v1".to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1000),
        }
    }
}

/// Per-request overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
    pub skip_auth: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append a query parameter when `value` is present.
    pub fn query_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Do not attach the stored token.
    pub fn without_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }
}

/// One logical call, carried across its retries.
#[derive(Debug)]
struct OutboundRequest {
    method: Method,
    url: String,
    body: Option<serde_json::Value>,
    options: RequestOptions,
    retry_count: u32,
    auth_retried: bool,
}

/// Backend REST client.
///
/// Cheap to clone; clones share the connection pool, token store and
/// navigator.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    config: Arc<HttpConfig>,
    tokens: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .field("api_prefix", &self.config.api_prefix)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl ApiClient {
    /// Build a client.
    ///
    /// # Errors
    /// Fails when the base URL does not parse or the TLS backend cannot be
    /// initialized.
    pub fn new(
        config: HttpConfig,
        tokens: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> HttpResult<Self> {
        reqwest::Url::parse(&config.base_url)
            .map_err(|e| HttpError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http,
            config: Arc::new(config),
            tokens,
            navigator,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the sleeper used between retries.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.token().is_some()
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ClientResult<T> {
        self.request(Method::GET, path, None, options).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ClientResult<T> {
        self.request(Method::DELETE, path, None, options).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> ClientResult<T> {
        let body = encode_body(body)?;
        self.request(Method::POST, path, Some(body), options).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> ClientResult<T> {
        let body = encode_body(body)?;
        self.request(Method::PUT, path, Some(body), options).await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> ClientResult<T> {
        let body = encode_body(body)?;
        self.request(Method::PATCH, path, Some(body), options).await
    }

    /// Send one logical request and unwrap its envelope.
    ///
    /// Transport failures (no response at all) are retried up to the
    /// configured ceiling with `2^attempt * retry_base_delay` between
    /// attempts. Any response the server actually sent is final.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        options: RequestOptions,
    ) -> ClientResult<T> {
        let mut outbound = OutboundRequest {
            method,
            url: self.url_for(path),
            body,
            options,
            retry_count: 0,
            auth_retried: false,
        };
        let max_retries = outbound
            .options
            .max_retries
            .unwrap_or(self.config.max_retries);

        loop {
            let builder = self.build(&outbound);
            let started = Instant::now();
            let result = builder.send().await;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

            match result {
                Ok(response) => {
                    let status = response.status();
                    debug!(
                        method = %outbound.method,
                        url = %outbound.url,
                        status = status.as_u16(),
                        elapsed_ms,
                        "Request completed"
                    );
                    Metrics::http_request(outbound.method.as_str(), status.as_str(), elapsed_ms);
                    return self.handle_response(response, &mut outbound).await;
                }
                Err(e) if e.is_builder() => {
                    return Err(ClientError::unknown(format!("Failed to build request: {e}")));
                }
                Err(e) => {
                    Metrics::http_request(outbound.method.as_str(), "network", elapsed_ms);
                    if outbound.retry_count >= max_retries {
                        warn!(
                            method = %outbound.method,
                            url = %outbound.url,
                            attempts = outbound.retry_count + 1,
                            error = %e,
                            "Request failed without response"
                        );
                        return Err(ClientError::network(format!("Network error: {e}")));
                    }

                    outbound.retry_count += 1;
                    let delay = retry_delay(self.config.retry_base_delay, outbound.retry_count);
                    warn!(
                        method = %outbound.method,
                        url = %outbound.url,
                        retry = outbound.retry_count,
                        max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transport failure, retrying"
                    );
                    Metrics::http_retry(outbound.method.as_str());
                    self.sleeper.sleep(delay).await;
                }
            }
        }
    }

    fn url_for(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let prefix = self.config.api_prefix.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{prefix}{path}")
        } else {
            format!("{base}{prefix}/{path}")
        }
    }

    fn build(&self, outbound: &OutboundRequest) -> RequestBuilder {
        let mut builder = self
            .http
            .request(outbound.method.clone(), outbound.url.as_str());

        if !outbound.options.query.is_empty() {
            builder = builder.query(&outbound.options.query);
        }
        if let Some(timeout) = outbound.options.timeout {
            builder = builder.timeout(timeout);
        }
        if !outbound.options.skip_auth {
            if let Some(token) = self.tokens.token() {
                builder = builder.bearer_auth(token);
            }
        }
        if let Some(body) = &outbound.body {
            builder = builder.json(body);
        }
        builder
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
        outbound: &mut OutboundRequest,
    ) -> ClientResult<T> {
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            ClientError::network(format!("Failed to read response body: {e}"))
        })?;
        let body: Option<serde_json::Value> = if bytes.is_empty() {
            None
        } else {
            serde_json::from_slice(&bytes).ok()
        };

        if status == reqwest::StatusCode::UNAUTHORIZED {
            if !outbound.auth_retried {
                outbound.auth_retried = true;
                self.expire_session(&outbound.url);
            }
            return Err(ClientError::from_status(status.as_u16(), body.as_ref()));
        }

        if !status.is_success() {
            return Err(ClientError::from_status(status.as_u16(), body.as_ref()));
        }

        let body = body.ok_or_else(|| ClientError::unknown("Response body is not valid JSON"))?;
        let envelope: Envelope = serde_json::from_value(body)
            .map_err(|e| ClientError::unknown(format!("Unexpected response shape: {e}")))?;
        envelope.into_data(status.as_u16())
    }

    fn expire_session(&self, url: &str) {
        warn!(url, "Session expired, clearing token");
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "Failed to clear stored token");
        }
        self.navigator.navigate(LOGIN_PATH);
    }
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> ClientResult<serde_json::Value> {
    serde_json::to_value(body)
        .map_err(|e| ClientError::unknown(format!("Failed to encode request body: {e}")))
}

/// Percent-encode one path segment (`BTC/USDT` -> `BTC%2FUSDT`).
pub(crate) fn segment(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}
