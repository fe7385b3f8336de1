//! Configuration management
//!
//! Settings live under the `minio` namespace and are read from an optional
//! `bucketeer.toml` file, then from `BUCKETEER_MINIO__*` environment variables.

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::error::StorageError;
use crate::types::validate_bucket_name;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid minio.{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl From<ConfigError> for StorageError {
    fn from(err: ConfigError) -> Self {
        StorageError::Config(err.to_string())
    }
}

/// Connection settings for the object store
#[derive(Clone, Deserialize)]
pub struct MinioConfig {
    /// Base URL of the service, `scheme://host[:port]`
    pub endpoint: String,

    // Source keys arrive lowercased, so camelCase spellings match these aliases
    #[serde(alias = "accesskey")]
    pub access_key: String,

    #[serde(alias = "secretkey")]
    pub secret_key: String,

    #[serde(default = "default_bucket_name", alias = "defaultbucketname")]
    pub default_bucket_name: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Fail startup when the default bucket cannot be provisioned
    #[serde(default, alias = "strictstartup")]
    pub strict_startup: bool,
}

fn default_bucket_name() -> String {
    "default".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl fmt::Debug for MinioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinioConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("default_bucket_name", &self.default_bucket_name)
            .field("region", &self.region)
            .field("strict_startup", &self.strict_startup)
            .finish()
    }
}

#[derive(Deserialize)]
struct Settings {
    minio: MinioConfig,
}

impl MinioConfig {
    pub fn new(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            default_bucket_name: default_bucket_name(),
            region: default_region(),
            strict_startup: false,
        }
    }

    #[must_use]
    pub fn with_default_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.default_bucket_name = bucket.into();
        self
    }

    #[must_use]
    pub fn with_strict_startup(mut self, strict: bool) -> Self {
        self.strict_startup = strict;
        self
    }

    /// Load configuration from `bucketeer.toml` (if present) and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from an explicit file (required) or the default
    /// `bucketeer.toml` (optional), overlaid with environment variables
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let builder = match path {
            Some(path) => config::Config::builder().add_source(config::File::from(path)),
            None => config::Config::builder()
                .add_source(config::File::with_name("bucketeer").required(false)),
        };

        Self::from_builder(builder.add_source(
            config::Environment::with_prefix("BUCKETEER")
                .prefix_separator("_")
                .separator("__"),
        ))
    }

    /// Build and validate from a prepared set of sources
    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let settings = builder.build()?.try_deserialize::<Settings>()?;
        settings.minio.validate()?;
        Ok(settings.minio)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = url::Url::parse(&self.endpoint).map_err(|e| ConfigError::Invalid {
            field: "endpoint",
            reason: format!("'{}' is not a URL: {e}", self.endpoint),
        })?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "endpoint",
                reason: format!("unsupported scheme '{}'", endpoint.scheme()),
            });
        }
        if endpoint.host_str().map_or(true, str::is_empty) {
            return Err(ConfigError::Invalid {
                field: "endpoint",
                reason: "missing host".to_string(),
            });
        }

        if self.access_key.is_empty() {
            return Err(ConfigError::Invalid {
                field: "access_key",
                reason: "must not be empty".to_string(),
            });
        }
        if self.secret_key.is_empty() {
            return Err(ConfigError::Invalid {
                field: "secret_key",
                reason: "must not be empty".to_string(),
            });
        }

        validate_bucket_name(&self.default_bucket_name).map_err(|e| ConfigError::Invalid {
            field: "default_bucket_name",
            reason: e.to_string(),
        })
    }
}
