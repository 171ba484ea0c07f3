//! Client configuration: endpoint, credentials, and transport tuning.

use std::collections::HashMap;
use std::time::Duration;

/// A secret string type for sensitive data like API keys.
/// Prevents accidental logging or display of secrets.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    /// Create a new secret string.
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Get the underlying secret value.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

/// Configuration for a [`ChatClient`](crate::client::ChatClient).
///
/// Only the endpoint is mandatory; everything else is layered on with the
/// `with_*` builders.
///
/// # Example
/// ```rust
/// use novachat::config::ChatConfig;
/// use std::time::Duration;
///
/// let config = ChatConfig::new("https://api.openai.com/v1/chat/completions")
///     .with_api_key("sk-...")
///     .with_timeout(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Completions endpoint the client POSTs to.
    pub endpoint: String,

    /// API key for authentication.
    pub api_key: Option<SecretString>,

    /// Request timeout.
    pub timeout: Option<Duration>,

    /// HTTP proxy URL.
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests.
    pub extra_headers: Option<HashMap<String, String>>,
}

impl ChatConfig {
    /// Create a configuration pointing at the given completions endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            timeout: None,
            proxy: None,
            extra_headers: None,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<SecretString>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set extra headers.
    pub fn with_extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }
}
