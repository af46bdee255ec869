//! # Client configuration: `quill.toml`
//!
//! Defines the TOML configuration file read by Quill front ends at start-up
//! (filename: [`ClientConfig::filename`] = `"quill.toml"`). It says where the
//! content API lives and where the signed-in session is kept.
//!
//! ## Structure
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000/api/"
//! timeout_secs = 30      # 0 disables the client-side timeout
//!
//! [session]
//! dir = ""               # empty = platform data directory
//! ```
//!
//! ## Types
//!
//! | Struct | Purpose |
//! |--------|---------|
//! | [`ClientConfig`] | Top-level config. Provides builder helpers (`new`, `with_timeout`), TOML (de)serialisation, file loading, and the canonical filename. |
//! | [`ApiConfig`] | API section: base URL and request timeout (default **30 seconds**). |
//! | [`SessionConfig`] | Session section: directory for durable session storage. |
//!
//! All structs derive `Default` (with sensible production defaults) so that a
//! missing or empty config file is equivalent to the default configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Top-level configuration stored in `quill.toml`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Content API configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every API path is resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds. 0 disables the timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_base_url() -> String {
    "http://localhost:8000/api/".to_string()
}

fn default_timeout() -> u32 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Session storage configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory holding the persisted session.
    /// Empty string means the platform data directory.
    #[serde(default)]
    pub dir: String,
}

impl ClientConfig {
    /// Create a config pointing at the given API base URL.
    pub fn new(base_url: String) -> Self {
        Self {
            api: ApiConfig {
                base_url,
                ..ApiConfig::default()
            },
            session: SessionConfig::default(),
        }
    }

    /// Builder method to set the request timeout.
    pub fn with_timeout(mut self, secs: u32) -> Self {
        self.api.timeout_secs = secs;
        self
    }

    /// The well-known filename for the config file.
    pub fn filename() -> &'static str {
        "quill.toml"
    }

    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Read a config file. A missing file yields the default configuration;
    /// an unreadable or malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Self::from_toml(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}
