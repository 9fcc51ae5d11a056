//! Client configuration.

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Hosting region of a stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Region {
    /// North America (default).
    #[default]
    Us,
    /// Europe.
    Eu,
    /// Azure North America.
    AzureNa,
    /// Azure Europe.
    AzureEu,
    /// Google Cloud North America.
    GcpNa,
}

impl Region {
    /// Returns the delivery host for this region.
    pub fn host(&self) -> &'static str {
        match self {
            Region::Us => "cdn.contentstack.io",
            Region::Eu => "eu-cdn.contentstack.com",
            Region::AzureNa => "azure-na-cdn.contentstack.com",
            Region::AzureEu => "azure-eu-cdn.contentstack.com",
            Region::GcpNa => "gcp-na-cdn.contentstack.com",
        }
    }

    /// Returns the short region name.
    pub fn name(&self) -> &'static str {
        match self {
            Region::Us => "us",
            Region::Eu => "eu",
            Region::AzureNa => "azure-na",
            Region::AzureEu => "azure-eu",
            Region::GcpNa => "gcp-na",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Region {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "us" | "na" => Ok(Region::Us),
            "eu" => Ok(Region::Eu),
            "azure-na" => Ok(Region::AzureNa),
            "azure-eu" => Ok(Region::AzureEu),
            "gcp-na" => Ok(Region::GcpNa),
            _ => Err(ConfigError::UnknownRegion(s.to_string())),
        }
    }
}

/// Configuration shared read-only by every request of a client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Stack API key.
    pub api_key: String,
    /// Delivery token.
    pub delivery_token: String,
    /// Publishing environment.
    pub environment: String,
    /// Hosting region.
    pub region: Region,
    /// Host override; takes precedence over the region host.
    pub host: Option<String>,
    /// API version path segment.
    pub api_version: String,
    /// Branch to read from.
    pub branch: Option<String>,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Idle connections kept per host.
    pub pool_max_idle_per_host: usize,
    /// How long an idle connection is kept alive.
    pub pool_idle_timeout: Duration,
    /// Retry policy.
    pub retry: RetryPolicy,
    /// Extra headers sent with every request.
    pub custom_headers: BTreeMap<String, String>,
}

impl ClientConfig {
    /// Creates a configuration with default region, timeouts and retry policy.
    pub fn new(
        api_key: impl Into<String>,
        delivery_token: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            delivery_token: delivery_token.into(),
            environment: environment.into(),
            region: Region::default(),
            host: None,
            api_version: "v3".to_string(),
            branch: None,
            timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 10,
            pool_idle_timeout: Duration::from_secs(90),
            retry: RetryPolicy::default(),
            custom_headers: BTreeMap::new(),
        }
    }

    /// Sets the region.
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Overrides the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Sets the branch.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the connection pool size and keep-alive.
    pub fn with_pool(mut self, max_idle_per_host: usize, idle_timeout: Duration) -> Self {
        self.pool_max_idle_per_host = max_idle_per_host;
        self.pool_idle_timeout = idle_timeout;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Adds a header sent with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.insert(name.into(), value.into());
        self
    }

    /// Checks that the credentials are present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("api_key"));
        }
        if self.delivery_token.trim().is_empty() {
            return Err(ConfigError::MissingCredential("delivery_token"));
        }
        if self.environment.trim().is_empty() {
            return Err(ConfigError::MissingCredential("environment"));
        }
        Ok(())
    }

    /// Returns the scheme and host, without a trailing slash.
    pub fn base_url(&self) -> String {
        let host = self.host.as_deref().unwrap_or_else(|| self.region.host());
        let host = host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        }
    }

    /// Returns the headers every request starts with.
    pub fn default_headers(&self) -> BTreeMap<String, String> {
        let mut headers = self.custom_headers.clone();
        headers.insert("api_key".to_string(), self.api_key.clone());
        headers.insert("access_token".to_string(), self.delivery_token.clone());
        if let Some(branch) = &self.branch {
            headers.insert("branch".to_string(), branch.clone());
        }
        headers
    }
}
