use crate::core::config::ClientConfig;
use crate::core::errors::QueryError;
use crate::core::kernel::{HmacSigner, HttpTransport, Signer, TransportBuilder, TransportConfig};
use crate::ec2::client::Ec2Client;
use std::sync::Arc;
use std::time::Duration;

/// Per-call timeout when none is configured
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Builder for creating EC2 clients
///
/// Credentials are optional at build time. A client built without them
/// exists, but every call fails with `MissingCredentials` before anything
/// is sent.
#[derive(Default)]
pub struct Ec2Builder {
    config: ClientConfig,
    transport_config: TransportConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    call_timeout: Option<Duration>,
}

impl Ec2Builder {
    /// Create a new `Ec2Builder` with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the client configuration
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set API credentials
    pub fn with_credentials(mut self, access_key_id: String, secret_key: String) -> Self {
        let host = self.config.host.take();
        self.config = ClientConfig::new(access_key_id, secret_key);
        self.config.host = host;
        self
    }

    /// Set the API host, e.g. `ec2.eu-west-1.amazonaws.com` or `localhost:4566`
    pub fn with_host(mut self, host: String) -> Self {
        self.config.host = Some(host);
        self
    }

    /// Set the URL scheme used by the default transport
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.transport_config = self.transport_config.with_scheme(scheme);
        self
    }

    /// Set the per-call timeout
    ///
    /// This is the only deadline on a call: it covers connecting, sending
    /// and reading the whole response, and expiry yields `Timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Set the user agent of the default transport
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.transport_config = self.transport_config.with_user_agent(user_agent);
        self
    }

    /// Use a custom transport instead of the reqwest one
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<Ec2Client, QueryError> {
        let host = self.config.resolved_host().to_string();

        let signer: Option<Arc<dyn Signer>> = if self.config.has_credentials() {
            Some(Arc::new(HmacSigner::new(
                self.config.access_key_id().to_string(),
                self.config.secret_key.clone(),
                host.clone(),
            )))
        } else {
            None
        };

        let timeout = self.call_timeout.unwrap_or(DEFAULT_CALL_TIMEOUT);

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(TransportBuilder::new(self.transport_config).build()?),
        };

        Ok(Ec2Client {
            host,
            signer,
            transport,
            timeout,
        })
    }
}

/// Client for the default host with the given credentials
pub fn create_ec2_client(access_key_id: String, secret_key: String) -> Result<Ec2Client, QueryError> {
    Ec2Builder::new()
        .with_credentials(access_key_id, secret_key)
        .build()
}

/// Client configured from `{PREFIX}_*` environment variables
pub fn create_ec2_client_from_env(prefix: &str) -> Result<Ec2Client, QueryError> {
    let config = ClientConfig::from_env(prefix)?;
    Ec2Builder::new().with_config(config).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::DEFAULT_HOST;

    #[test]
    fn test_builder_defaults() {
        let client = create_ec2_client("AKID".to_string(), "secret".to_string()).unwrap();

        assert_eq!(client.host(), DEFAULT_HOST);
        assert_eq!(client.timeout(), DEFAULT_CALL_TIMEOUT);
        assert!(client.signer.is_some());
    }

    #[test]
    fn test_credentials_keep_previously_set_host() {
        let client = Ec2Builder::new()
            .with_host("ec2.ap-southeast-1.amazonaws.com".to_string())
            .with_credentials("AKID".to_string(), "secret".to_string())
            .with_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(client.host(), "ec2.ap-southeast-1.amazonaws.com");
        assert_eq!(client.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_builder_without_credentials_has_no_signer() {
        let client = Ec2Builder::new().build().unwrap();
        assert!(client.signer.is_none());
    }

    #[test]
    fn test_signer_uses_configured_host() {
        let client = Ec2Builder::new()
            .with_credentials("AKID".to_string(), "secret".to_string())
            .with_host("localhost:4566".to_string())
            .with_scheme("http")
            .build()
            .unwrap();

        let signer = client.signer.as_ref().unwrap();
        assert_eq!(signer.access_key_id(), "AKID");
        assert_eq!(signer.signature_method(), "HmacSHA256");
        assert_eq!(signer.signature_version(), "2");
    }

    #[test]
    fn test_client_from_prefixed_environment() {
        std::env::set_var("SWIRL_BUILDER_ENV_ACCESS_KEY_ID", "AKIDENV");
        std::env::set_var("SWIRL_BUILDER_ENV_SECRET_ACCESS_KEY", "envsecret");
        std::env::set_var("SWIRL_BUILDER_ENV_HOST", "ec2.us-west-2.amazonaws.com");

        let client = create_ec2_client_from_env("swirl_builder_env").unwrap();

        assert_eq!(client.host(), "ec2.us-west-2.amazonaws.com");
        assert_eq!(client.signer.as_ref().unwrap().access_key_id(), "AKIDENV");
    }

    #[test]
    fn test_client_from_environment_requires_secret() {
        std::env::set_var("SWIRL_BUILDER_NOSECRET_ACCESS_KEY_ID", "AKIDENV");

        let err = create_ec2_client_from_env("SWIRL_BUILDER_NOSECRET").unwrap_err();
        assert!(matches!(err, QueryError::ConfigError(_)));
    }
}
