//! Run configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CrusherError, Result};
use crate::suites::Suite;

fn default_connection_timeout_secs() -> u64 {
    10
}

fn default_connect_attempts() -> u32 {
    1
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_suites() -> Vec<Suite> {
    Suite::ALL.to_vec()
}

fn default_system_table_prefixes() -> Vec<String> {
    ["SYS", "sys", "RDB$", "MON$"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Settings for one battery run. Every field has a default, so an empty TOML
/// document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Login timeout per connection attempt
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    /// Attempts per connect, at least one
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// Pause between connect attempts
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Suites to report. They always execute in registry order.
    #[serde(default = "default_suites")]
    pub suites: Vec<Suite>,

    /// Table name prefixes that mark system tables in metadata probes
    #[serde(default = "default_system_table_prefixes")]
    pub system_table_prefixes: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: default_connection_timeout_secs(),
            connect_attempts: default_connect_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            suites: default_suites(),
            system_table_prefixes: default_system_table_prefixes(),
        }
    }
}

impl RunConfig {
    /// Parse a TOML document
    pub fn from_toml(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if self.connection_timeout_secs == 0 {
            return Err(CrusherError::Configuration(
                "connection_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.connect_attempts == 0 {
            return Err(CrusherError::Configuration(
                "connect_attempts must be at least 1".into(),
            ));
        }
        if self.suites.is_empty() {
            return Err(CrusherError::Configuration(
                "at least one suite must be selected".into(),
            ));
        }
        Ok(())
    }

    /// Replace the suite selection from user supplied names
    pub fn select_suites<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let suites = names
            .iter()
            .map(|name| {
                name.as_ref()
                    .parse::<Suite>()
                    .map_err(|_| CrusherError::UnknownSuite(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        self.suites = suites;
        self.validate()
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn is_selected(&self, suite: Suite) -> bool {
        self.suites.contains(&suite)
    }

    pub fn is_system_table(&self, name: &str) -> bool {
        self.system_table_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }
}
