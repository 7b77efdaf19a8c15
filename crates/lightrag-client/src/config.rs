//! Client configuration

use std::fmt;
use std::time::Duration;

/// Base URL used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:9621";

/// Per-request timeout applied to every call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Connection settings for a [`LightRagClient`](crate::LightRagClient)
///
/// Built once at startup and handed to the client; the client never re-reads
/// the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the LightRAG server (trailing `/` is ignored)
    pub base_url: String,

    /// Bearer credential sent as `Authorization: Bearer <key>`
    pub api_key: Option<String>,

    /// Workspace tag sent as the `LIGHTRAG-WORKSPACE` header
    pub workspace: Option<String>,

    /// Timeout covering a whole request, including reading the body
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration for the given base URL with default settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the API key. Empty keys are treated as unset.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = non_empty(api_key.into());
        self
    }

    /// Set the workspace. Empty names are treated as unset.
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = non_empty(workspace.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL without a trailing slash
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            workspace: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

// Keeps the API key out of logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("workspace", &self.workspace)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:9621");
        assert!(config.api_key.is_none());
        assert!(config.workspace.is_none());
        assert_eq!(config.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_builder_sets_fields() {
        let config = ClientConfig::new("http://rag:8080")
            .with_api_key("secret")
            .with_workspace("team-a")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.base_url, "http://rag:8080");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.workspace.as_deref(), Some("team-a"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = ClientConfig::default().with_api_key("").with_workspace("");
        assert!(config.api_key.is_none());
        assert!(config.workspace.is_none());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = ClientConfig::new("http://localhost:9621/");
        assert_eq!(config.normalized_base_url(), "http://localhost:9621");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ClientConfig::default().with_api_key("super-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
