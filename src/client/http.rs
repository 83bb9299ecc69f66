//! reqwest implementation of [`RemoteClient`]
//!
//! Each distinct proxy gets its own underlying `reqwest::Client` (proxies are
//! a client-level setting in reqwest). Clients are built lazily and cached, so
//! every account keeps a stable connection pool and User-Agent for the life
//! of the process.

use async_trait::async_trait;
use reqwest::{multipart, Client, Proxy};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::headers::{build_api_headers, random_user_agent};
use super::{ApiRequest, Payload, RemoteClient};
use crate::config::Config;
use crate::models::{lenient_i64, ProxyBinding};
use crate::utils::error::RemoteError;

// ============================================================================
// Client Configuration
// ============================================================================

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL
    pub base_url: String,

    /// External IP lookup URL
    pub ip_check_url: String,

    /// Request timeout
    pub timeout: Duration,

    /// Timeout for the external IP lookup
    pub ip_check_timeout: Duration,
}

impl ClientConfig {
    /// Create a new client config
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ip_check_url: String::from("https://api.ipify.org?format=json"),
            timeout: Duration::from_secs(30),
            ip_check_timeout: Duration::from_secs(10),
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the IP lookup service
    pub fn with_ip_check_url(mut self, url: impl Into<String>) -> Self {
        self.ip_check_url = url.into();
        self
    }
}

impl From<&Config> for ClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            base_url: config.api.base_url.clone(),
            ip_check_url: config.api.ip_check_url.clone(),
            timeout: config.request_timeout(),
            ip_check_timeout: config.ip_check_timeout(),
        }
    }
}

// ============================================================================
// Response Envelope
// ============================================================================

/// `{ code, msg, data }` wrapper every endpoint answers with
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    code: Value,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Value,
}

impl Envelope {
    fn into_result(self) -> Result<Value, RemoteError> {
        if self.code.is_null() {
            return Err(RemoteError::Decode("response without code".to_string()));
        }

        match lenient_i64(&self.code) {
            Some(0) => Ok(self.data),
            Some(code) => Err(RemoteError::Api {
                code,
                message: self.msg.unwrap_or_default(),
            }),
            None => Err(RemoteError::Decode(format!(
                "unexpected response code: {}",
                self.code
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpResponse {
    ip: String,
}

// ============================================================================
// Bums Client
// ============================================================================

/// HTTP client for the Bums API
pub struct BumsClient {
    config: ClientConfig,

    /// One client per proxy URI (`None` = direct)
    clients: Mutex<HashMap<Option<String>, Client>>,
}

impl BumsClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Network` if the direct client cannot be built
    pub fn new(config: ClientConfig) -> Result<Self, RemoteError> {
        let client = Self {
            config,
            clients: Mutex::new(HashMap::new()),
        };
        // build the direct client eagerly so TLS setup problems surface at startup
        client.client_for(None)?;
        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn client_for(&self, proxy: Option<&ProxyBinding>) -> Result<Client, RemoteError> {
        let key = proxy.map(|p| p.uri().to_string());

        let mut clients = self
            .clients
            .lock()
            .map_err(|_| RemoteError::Network("client cache poisoned".to_string()))?;

        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let client = self.build_client(proxy)?;
        clients.insert(key, client.clone());
        Ok(client)
    }

    fn build_client(&self, proxy: Option<&ProxyBinding>) -> Result<Client, RemoteError> {
        let mut builder = Client::builder()
            .timeout(self.config.timeout)
            .gzip(true)
            .default_headers(build_api_headers(random_user_agent()));

        if let Some(proxy) = proxy {
            let proxy = Proxy::all(proxy.uri())
                .map_err(|e| RemoteError::InvalidProxy(format!("{}: {e}", proxy.display_host())))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| RemoteError::Network(format!("failed to build HTTP client: {e}")))
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl RemoteClient for BumsClient {
    async fn call(
        &self,
        request: ApiRequest<'_>,
        cancel: &CancellationToken,
    ) -> Result<Value, RemoteError> {
        let client = self.client_for(request.proxy)?;
        let url = self.url_for(request.endpoint.path());

        let mut builder = client.request(request.endpoint.method(), &url);
        if let Some(token) = request.auth_token {
            builder = builder.bearer_auth(token);
        }

        builder = match request.payload {
            Payload::Empty => builder,
            Payload::Query(params) => builder.query(&params),
            Payload::Form(params) => builder.form(&params),
            Payload::Multipart(params) => {
                let form = params
                    .into_iter()
                    .fold(multipart::Form::new(), |form, (k, v)| form.text(k, v));
                builder.multipart(form)
            }
        };

        tracing::debug!(endpoint = ?request.endpoint, url = %url, "Sending API request");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RemoteError::Cancelled),
            result = builder.send() => result.map_err(|e| RemoteError::from_reqwest(&e))?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let envelope = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RemoteError::Cancelled),
            result = response.json::<Envelope>() => {
                result.map_err(|e| RemoteError::Decode(e.to_string()))?
            }
        };

        envelope.into_result()
    }

    async fn resolve_external_ip(
        &self,
        proxy: &ProxyBinding,
        cancel: &CancellationToken,
    ) -> Result<String, RemoteError> {
        let client = self.client_for(Some(proxy))?;
        let request = client
            .get(&self.config.ip_check_url)
            .timeout(self.config.ip_check_timeout);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RemoteError::Cancelled),
            result = request.send() => result.map_err(|e| RemoteError::from_reqwest(&e))?,
        };

        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status().as_u16()));
        }

        let body: IpResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;

        Ok(body.ip)
    }
}

// ============================================================================
// Tests
// ============================================================================
