use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;

/// Host used when no override is configured
pub const DEFAULT_HOST: &str = "ec2.amazonaws.com";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub access_key_id: Secret<String>,
    pub secret_key: Secret<String>,
    pub host: Option<String>,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for ClientConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ClientConfig", 3)?;
        state.serialize_field("access_key_id", "[REDACTED]")?;
        state.serialize_field("secret_key", "[REDACTED]")?;
        state.serialize_field("host", &self.host)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ClientConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ClientConfigHelper {
            access_key_id: String,
            secret_key: String,
            host: Option<String>,
        }

        let helper = ClientConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            access_key_id: Secret::new(helper.access_key_id),
            secret_key: Secret::new(helper.secret_key),
            host: helper.host,
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl ClientConfig {
    /// Create a new configuration with API credentials
    #[must_use]
    pub fn new(access_key_id: String, secret_key: String) -> Self {
        Self {
            access_key_id: Secret::new(access_key_id),
            secret_key: Secret::new(secret_key),
            host: None,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_ACCESS_KEY_ID` (e.g., `AWS_ACCESS_KEY_ID`)
    /// - `{PREFIX}_SECRET_ACCESS_KEY` (e.g., `AWS_SECRET_ACCESS_KEY`)
    /// - `{PREFIX}_HOST` (optional)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let access_key_var = format!("{}_ACCESS_KEY_ID", prefix);
        let secret_key_var = format!("{}_SECRET_ACCESS_KEY", prefix);
        let host_var = format!("{}_HOST", prefix);

        let access_key_id = env::var(&access_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(access_key_var))?;

        let secret_key = env::var(&secret_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(secret_key_var))?;

        let host = env::var(&host_var).ok().filter(|h| !h.trim().is_empty());

        Ok(Self {
            access_key_id: Secret::new(access_key_id),
            secret_key: Secret::new(secret_key),
            host,
        })
    }

    /// Create configuration from a .env file and environment variables
    ///
    /// A missing .env file is not an error; system environment variables
    /// are used on their own in that case.
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    /// Configuration without credentials; every call made with it fails
    /// with `MissingCredentials`
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            access_key_id: Secret::new(String::new()),
            secret_key: Secret::new(String::new()),
            host: None,
        }
    }

    /// Check if this configuration has credentials for signed calls
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.access_key_id.expose_secret().is_empty()
            && !self.secret_key.expose_secret().is_empty()
    }

    /// Set custom API host
    #[must_use]
    pub fn host(mut self, host: String) -> Self {
        self.host = Some(host);
        self
    }

    /// Host calls are sent to, falling back to [`DEFAULT_HOST`]
    pub fn resolved_host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    /// Get access key id (use carefully - exposes secret)
    pub fn access_key_id(&self) -> &str {
        self.access_key_id.expose_secret()
    }

    /// Get secret key (use carefully - exposes secret)
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
