use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_API_BASE: &str = "https://lion.lamarzocco.io/api/customer-app";

pub const ENV_EMAIL: &str = "LM_EMAIL";
pub const ENV_PASSWORD: &str = "LM_PASSWORD";
pub const ENV_API_BASE: &str = "LM_API_BASE";
pub const ENV_INSTALLATION_ID: &str = "LM_INSTALLATION_ID";
pub const ENV_MACHINE_ID: &str = "LM_MACHINE_ID";

/// Caller-supplied configuration for talking to the customer-app API
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Account email, sent as `username` on sign-in and refresh
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Base URL every endpoint path is appended to (not URL-joined; the
    ///  base carries its own path prefix)
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Installation id to use when no identity has been persisted yet
    #[serde(default)]
    pub installation_id: Option<String>,
    /// Serial number of the machine to query, skips discovery
    #[serde(default)]
    pub machine_id: Option<String>,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("installation_id", &self.installation_id)
            .field("machine_id", &self.machine_id)
            .finish()
    }
}

impl Config {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            api_base: default_api_base(),
            installation_id: None,
            machine_id: None,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_installation_id(mut self, installation_id: impl Into<String>) -> Self {
        self.installation_id = Some(installation_id.into());
        self
    }

    pub fn with_machine_id(mut self, machine_id: impl Into<String>) -> Self {
        self.machine_id = Some(machine_id.into());
        self
    }

    /// Read `LM_*` variables from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Values are trimmed and
    ///  blank optional values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            email: get(ENV_EMAIL).unwrap_or_default(),
            password: get(ENV_PASSWORD).unwrap_or_default(),
            api_base: get(ENV_API_BASE).unwrap_or_else(default_api_base),
            installation_id: get(ENV_INSTALLATION_ID),
            machine_id: get(ENV_MACHINE_ID),
        }
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| Error::Configuration(format!("invalid config: {}", e)))
    }

    /// Load a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check that credentials are present and the base URL is usable
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(Error::Configuration(format!(
                "Missing {} or {} environment variables.",
                ENV_EMAIL, ENV_PASSWORD
            )));
        }
        let base = Url::parse(self.api_base()).map_err(|e| {
            Error::Configuration(format!("invalid api base {:?}: {}", self.api_base, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "invalid api base {:?}",
                self.api_base
            )));
        }
        Ok(())
    }

    /// Base URL with surrounding whitespace and trailing slashes removed
    pub fn api_base(&self) -> &str {
        let base = self.api_base.trim().trim_end_matches('/');
        if base.is_empty() {
            DEFAULT_API_BASE
        } else {
            base
        }
    }

    pub fn installation_id(&self) -> Option<&str> {
        non_blank(self.installation_id.as_deref())
    }

    pub fn machine_id(&self) -> Option<&str> {
        non_blank(self.machine_id.as_deref())
    }

    /// `{api_base}{path}`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base(), path)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
