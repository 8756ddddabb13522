//! Configuration for the batch workflow and its transfer client.
//!
//! All behaviour is controlled through [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. One struct means one place to look when two runs
//! behave differently, and it can be cloned freely into the transfer client.

use crate::error::BatchError;
use std::fmt;
use std::time::Duration;

/// Maximum number of files in one batch.
pub const DEFAULT_CAPACITY: usize = 30;

/// Filename suffix accepted by the type gate (compared case-insensitively).
pub const DOCX_EXTENSION: &str = ".docx";

/// Declared media type accepted by the type gate.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Multipart field name repeated once per file.
pub const DEFAULT_FIELD_NAME: &str = "files";

/// Archive name used when the response carries no usable filename.
pub const DEFAULT_ARCHIVE_NAME: &str = "converted_documents.zip";

/// Environment variable consulted by [`ClientConfig::from_env`].
pub const ENDPOINT_ENV: &str = "DOCBATCH_ENDPOINT";

/// Configuration for a batch conversion client.
///
/// # Example
/// ```rust
/// use docbatch::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .endpoint("http://localhost:8000/convert")
///     .build()
///     .unwrap();
/// assert_eq!(config.capacity, 30);
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Full URL of the conversion endpoint. Required.
    pub endpoint: String,

    /// Maximum number of files per batch. Default: 30.
    pub capacity: usize,

    /// Multipart field name for each file part. Default: `files`.
    pub field_name: String,

    /// Fallback archive name. Default: `converted_documents.zip`.
    pub default_archive_name: String,

    /// Optional whole-request timeout.
    ///
    /// `None` (the default) waits forever: a stuck server leaves the
    /// workflow in `loading`. A timeout is classified as network-unreachable.
    pub request_timeout: Option<Duration>,

    /// Optional connect timeout. Default: `None`.
    pub connect_timeout: Option<Duration>,

    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            capacity: DEFAULT_CAPACITY,
            field_name: DEFAULT_FIELD_NAME.to_string(),
            default_archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            request_timeout: None,
            connect_timeout: None,
            user_agent: concat!("docbatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("capacity", &self.capacity)
            .field("field_name", &self.field_name)
            .field("default_archive_name", &self.default_archive_name)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a config whose endpoint comes from `DOCBATCH_ENDPOINT`.
    pub fn from_env() -> Result<Self, BatchError> {
        let endpoint = std::env::var(ENDPOINT_ENV).map_err(|_| {
            BatchError::InvalidConfig(format!(
                "No conversion endpoint configured. Set {ENDPOINT_ENV} or pass --endpoint."
            ))
        })?;
        Self::builder().endpoint(endpoint).build()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn capacity(mut self, n: usize) -> Self {
        self.config.capacity = n;
        self
    }

    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.config.field_name = name.into();
        self
    }

    pub fn default_archive_name(mut self, name: impl Into<String>) -> Self {
        self.config.default_archive_name = name.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, BatchError> {
        let c = &self.config;
        if c.endpoint.trim().is_empty() {
            return Err(BatchError::InvalidConfig(
                "Conversion endpoint must not be empty".into(),
            ));
        }
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(BatchError::InvalidConfig(format!(
                "Endpoint must be an HTTP/HTTPS URL, got '{}'",
                c.endpoint
            )));
        }
        if c.capacity == 0 {
            return Err(BatchError::InvalidConfig("Capacity must be ≥ 1".into()));
        }
        if c.field_name.is_empty() {
            return Err(BatchError::InvalidConfig(
                "Multipart field name must not be empty".into(),
            ));
        }
        if c.default_archive_name.is_empty() {
            return Err(BatchError::InvalidConfig(
                "Default archive name must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let c = ClientConfig::builder()
            .endpoint("http://localhost:8000/convert")
            .build()
            .unwrap();
        assert_eq!(c.capacity, 30);
        assert_eq!(c.field_name, "files");
        assert_eq!(c.default_archive_name, DEFAULT_ARCHIVE_NAME);
        assert!(c.request_timeout.is_none());
    }

    #[test]
    fn missing_endpoint_is_rejected() {
        let err = ClientConfig::builder().build().unwrap_err();
        assert!(matches!(err, BatchError::InvalidConfig(_)));
    }

    #[test]
    fn non_http_endpoint_is_rejected() {
        let err = ClientConfig::builder()
            .endpoint("ftp://example.com/convert")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("ftp://"));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = ClientConfig::builder()
            .endpoint("https://example.com/convert")
            .capacity(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, BatchError::InvalidConfig(_)));
    }
}
