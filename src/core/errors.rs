use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Missing credentials: access key id and secret key must be set")]
    MissingCredentials,

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("API error: {status} {code} - {message}")]
    ApiError {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),
}

impl From<quick_xml::Error> for QueryError {
    fn from(err: quick_xml::Error) -> Self {
        match err {
            // The tokenizer reads straight off the response stream, so I/O
            // failures here are the transport's, not the document's.
            quick_xml::Error::Io(io_err) => match Arc::try_unwrap(io_err) {
                Ok(io_err) => Self::from_stream_error(io_err),
                Err(shared) => Self::TransportError(shared.to_string()),
            },
            other => Self::MalformedResponse(other.to_string()),
        }
    }
}

impl QueryError {
    /// Recover the error carried by a failed response stream
    ///
    /// Body streams are read through an `io::Error` adapter, which boxes the
    /// original `QueryError`; unwrap it instead of stringifying it again.
    pub(crate) fn from_stream_error(err: io::Error) -> Self {
        if !err.get_ref().is_some_and(|inner| inner.is::<Self>()) {
            return Self::TransportError(err.to_string());
        }
        match err.into_inner().map(|inner| inner.downcast::<Self>()) {
            Some(Ok(inner)) => *inner,
            _ => Self::TransportError("response stream failed".to_string()),
        }
    }
}
