use crate::core::compact::{compact, TreeBuilder};
use crate::core::config::{ClientConfig, ConfigError};
use crate::core::errors::QueryError;
use crate::core::expand::expand;
use crate::core::kernel::{
    drive_events, form_encode, FormRequest, HttpResponse, HttpTransport, Signer,
};
use crate::core::traits::QueryApi;
use crate::core::types::{fields, CallParams, API_VERSION};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use futures_util::TryStreamExt;
use serde_json::Value;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::io::StreamReader;
use tracing::{debug, instrument, warn};

/// Client for the EC2 query API
///
/// Cheap to clone; clones share the transport. Every call builds its own
/// parse state, so calls may overlap freely.
#[derive(Clone)]
pub struct Ec2Client {
    pub(crate) host: String,
    pub(crate) signer: Option<Arc<dyn Signer>>,
    pub(crate) transport: Arc<dyn HttpTransport>,
    pub(crate) timeout: Duration,
}

impl std::fmt::Debug for Ec2Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ec2Client")
            .field("host", &self.host)
            .field("has_signer", &self.signer.is_some())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Ec2Client {
    /// Client with the default transport for the given configuration
    pub fn new(config: ClientConfig) -> Result<Self, QueryError> {
        super::Ec2Builder::new().with_config(config).build()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Invoke `action` and resolve with the compacted response
    ///
    /// Credentials and parameters are checked before anything is sent.
    /// The timeout covers the request and reading the whole response.
    #[instrument(skip_all, fields(host = %self.host, action = %action))]
    pub async fn call(&self, action: &str, params: CallParams) -> Result<Value, QueryError> {
        let request = self.prepare(action, &params)?;
        self.execute(request).await
    }

    /// Invoke `action` in the background and hand the outcome to `on_result`
    ///
    /// Missing credentials and invalid parameters are reported here, before
    /// the task is spawned. Otherwise `on_result` runs exactly once, with
    /// either the compacted response or the error that ended the call.
    /// Outside a tokio runtime nothing is spawned and a `ConfigError` is
    /// returned.
    pub fn call_with<F>(
        &self,
        action: &str,
        params: CallParams,
        on_result: F,
    ) -> Result<JoinHandle<()>, QueryError>
    where
        F: FnOnce(Result<Value, QueryError>) + Send + 'static,
    {
        let request = self.prepare(action, &params)?;
        let runtime = Handle::try_current().map_err(|e| {
            ConfigError::InvalidConfiguration(format!("call_with needs a tokio runtime: {}", e))
        })?;
        let client = self.clone();
        let action = action.to_string();

        Ok(runtime.spawn(async move {
            let result = client.execute(request).await;
            if let Err(e) = &result {
                warn!(action = %action, error = %e, "call failed");
            }
            on_result(result);
        }))
    }

    /// Expand, stamp and sign the parameters into a ready request body
    fn prepare(&self, action: &str, params: &CallParams) -> Result<FormRequest, QueryError> {
        let signer = self.signer.as_ref().ok_or(QueryError::MissingCredentials)?;

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut query = expand(params)?;

        let protocol_fields = [
            (fields::ACTION, action),
            (fields::VERSION, API_VERSION),
            (fields::ACCESS_KEY_ID, signer.access_key_id()),
            (fields::TIMESTAMP, timestamp.as_str()),
            (fields::SIGNATURE_METHOD, signer.signature_method()),
            (fields::SIGNATURE_VERSION, signer.signature_version()),
        ];
        for (name, value) in protocol_fields {
            if query.insert(name.to_string(), value.to_string()).is_some() {
                debug!(field = name, "protocol field replaces caller parameter");
            }
        }
        if query.remove(fields::SIGNATURE).is_some() {
            debug!("caller-supplied signature discarded");
        }

        let signature = signer.sign(&query)?;
        query.insert(fields::SIGNATURE.to_string(), signature);

        let body = form_encode(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        debug!(param_count = query.len(), body_len = body.len(), "request signed");

        Ok(FormRequest::new(self.host.clone(), body))
    }

    async fn execute(&self, request: FormRequest) -> Result<Value, QueryError> {
        match tokio::time::timeout(self.timeout, self.send_and_parse(request)).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::Timeout(self.timeout)),
        }
    }

    async fn send_and_parse(&self, request: FormRequest) -> Result<Value, QueryError> {
        let response = self.transport.post_form(request).await?;
        let status = response.status;
        let success = response.is_success();

        let parsed = parse_response(response).await;
        if success {
            if let Ok(Value::Object(doc)) = &parsed {
                debug!(root = ?doc.keys().next(), "response compacted");
            }
            parsed
        } else {
            Err(api_error(status, parsed))
        }
    }
}

#[async_trait]
impl QueryApi for Ec2Client {
    async fn call(&self, action: &str, params: CallParams) -> Result<Value, QueryError> {
        Self::call(self, action, params).await
    }
}

/// Stream the body through a fresh tree builder and compact the result
async fn parse_response(response: HttpResponse) -> Result<Value, QueryError> {
    // The original error rides inside the io::Error and is recovered by
    // `QueryError::from_stream_error` when the tokenizer reports it.
    let body = response
        .body
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
    let reader = StreamReader::new(body);

    let mut builder = TreeBuilder::new();
    drive_events(reader, &mut builder).await?;
    let document = builder.finish()?;
    compact(&document)
}

/// Turn a non-2xx response into an error, using the
/// `Response/Errors/Error` envelope when the body carries one
fn api_error(status: u16, parsed: Result<Value, QueryError>) -> QueryError {
    let document = parsed.ok();
    let error = document
        .as_ref()
        .and_then(|doc| doc.pointer("/Response/Errors/Error"));
    let field = |name: &str| {
        error
            .and_then(|e| e.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    QueryError::ApiError {
        status,
        code: field("Code").unwrap_or_else(|| "Unknown".to_string()),
        message: field("Message").unwrap_or_else(|| format!("HTTP status {}", status)),
    }
}
