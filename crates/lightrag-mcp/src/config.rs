//! Server configuration
//!
//! Settings are resolved once at startup with the precedence
//! command line > environment > config file > built-in defaults.
//! Command line and environment are merged by clap before they reach
//! [`resolve`], so this module only layers [`ConfigOverrides`] over a
//! [`ConfigFile`].
//!
//! ```toml
//! [lightrag]
//! server_url = "http://localhost:9621"
//! api_key = "secret"
//! workspace = "research"
//! timeout_secs = 300
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use lightrag_client::ClientConfig;
use serde::Deserialize;

use crate::{Error, Result};

/// Contents of a TOML config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub lightrag: LightRagSection,
}

/// The `[lightrag]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightRagSection {
    pub server_url: Option<String>,
    pub api_key: Option<String>,
    pub workspace: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ConfigFile {
    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub server_url: Option<String>,
    pub api_key: Option<String>,
    pub workspace: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Merge overrides over an optional config file into a client configuration
pub fn resolve(overrides: ConfigOverrides, file: Option<ConfigFile>) -> Result<ClientConfig> {
    let file = file.unwrap_or_default().lightrag;

    let mut config = ClientConfig::default();
    if let Some(url) = overrides.server_url.or(file.server_url) {
        if url.trim().is_empty() {
            return Err(Error::Config("server URL must not be empty".to_string()));
        }
        config.base_url = url;
    }
    if let Some(key) = overrides.api_key.or(file.api_key) {
        config = config.with_api_key(key);
    }
    if let Some(workspace) = overrides.workspace.or(file.workspace) {
        config = config.with_workspace(workspace);
    }
    if let Some(secs) = overrides.timeout_secs.or(file.timeout_secs) {
        if secs == 0 {
            return Err(Error::Config(
                "timeout must be at least one second".to_string(),
            ));
        }
        config = config.with_timeout(Duration::from_secs(secs));
    }

    Ok(config)
}
