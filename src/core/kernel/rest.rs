use crate::core::errors::QueryError;
use crate::core::types::{FORM_CONTENT_TYPE, REQUEST_PATH};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use futures_util::TryStreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

/// Response body delivered chunk by chunk as it arrives
pub type ByteStream = BoxStream<'static, Result<Bytes, QueryError>>;

/// A form POST ready to be put on the wire
#[derive(Debug, Clone)]
pub struct FormRequest {
    pub host: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl FormRequest {
    /// Form POST to the root path of `host` with the standard headers
    pub fn new(host: impl Into<String>, body: String) -> Self {
        let host = host.into();
        let body = Bytes::from(body);
        let headers = vec![
            (HOST.as_str().to_string(), host.clone()),
            (
                CONTENT_TYPE.as_str().to_string(),
                FORM_CONTENT_TYPE.to_string(),
            ),
            (CONTENT_LENGTH.as_str().to_string(), body.len().to_string()),
        ];

        Self {
            host,
            path: REQUEST_PATH.to_string(),
            headers,
            body,
        }
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status line plus a streaming body
pub struct HttpResponse {
    pub status: u16,
    pub body: ByteStream,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP transport used by the client
///
/// The transport only moves bytes: it sends one request and hands back the
/// response body as a stream. Signing and parsing happen above it, which is
/// what lets tests swap in a canned transport.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a form POST and return the response as soon as headers arrive
    async fn post_form(&self, request: FormRequest) -> Result<HttpResponse, QueryError>;
}

/// Configuration for the reqwest-backed transport
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// URL scheme; `https` unless talking to a local emulator
    pub scheme: String,
    /// Connection establishment timeout in seconds. There is no
    /// whole-request timeout here; the client bounds each call itself.
    pub connect_timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            connect_timeout_seconds: 10,
            user_agent: format!("swirl/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the URL scheme
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, connect_timeout_seconds: u64) -> Self {
        self.connect_timeout_seconds = connect_timeout_seconds;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Builder for [`ReqwestTransport`]
#[derive(Debug, Default)]
pub struct TransportBuilder {
    config: TransportConfig,
}

impl TransportBuilder {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    pub fn build(self) -> Result<ReqwestTransport, QueryError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(self.config.connect_timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| {
                QueryError::TransportError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(ReqwestTransport {
            client,
            config: self.config,
        })
    }
}

/// Implementation of [`HttpTransport`] using reqwest
///
/// The underlying client keeps its connection pool, so sequential calls on
/// one transport reuse the same connection.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    config: TransportConfig,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    /// Transport with default configuration
    pub fn new() -> Result<Self, QueryError> {
        TransportBuilder::new(TransportConfig::default()).build()
    }

    fn build_url(&self, request: &FormRequest) -> String {
        format!("{}://{}{}", self.config.scheme, request.host, request.path)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(skip(self, request), fields(host = %request.host, body_len = request.body.len()))]
    async fn post_form(&self, request: FormRequest) -> Result<HttpResponse, QueryError> {
        let url = self.build_url(&request);
        let mut builder = self.client.post(&url);

        for (key, value) in &request.headers {
            // Host and Content-Length are derived from the URL and body by
            // the HTTP stack; sending them twice confuses some servers.
            if key.eq_ignore_ascii_case(HOST.as_str())
                || key.eq_ignore_ascii_case(CONTENT_LENGTH.as_str())
            {
                continue;
            }
            builder = builder.header(key.as_str(), value.as_str());
        }

        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(|e| QueryError::TransportError(format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        debug!(status, "response headers received");

        let body = response
            .bytes_stream()
            .map_err(|e| QueryError::TransportError(format!("Response body interrupted: {}", e)))
            .boxed();

        Ok(HttpResponse { status, body })
    }
}
