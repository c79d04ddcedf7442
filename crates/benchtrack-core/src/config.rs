//! TOML configuration file.
//!
//! ```toml
//! [detector]
//! window = 5
//! threshold = 0.10
//! critical_threshold = 0.50
//! k_sigma = 2.0
//!
//! [detector.polarity.benches]
//! "cache hit ratio" = "higher_is_better"
//!
//! [alert]
//! fail_on = "critical"
//! comment_path = "alert.md"
//! webhook_url = "https://hooks.example.com/bench"
//! ```
//!
//! Every section and key is optional and falls back to its default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::alert::AlertPolicy;
use crate::detect::{DetectorConfig, Severity};
use crate::domain::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlertConfig {
    /// Lowest severity that fails the run.
    pub fail_on: Option<Severity>,

    /// Where to write the markdown alert comment.
    pub comment_path: Option<PathBuf>,

    pub webhook_url: Option<String>,
}

impl AlertConfig {
    pub fn policy(&self) -> AlertPolicy {
        AlertPolicy {
            fail_on: self.fail_on,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchtrackConfig {
    pub detector: DetectorConfig,
    pub alert: AlertConfig,
}

impl BenchtrackConfig {
    /// Read, parse and validate the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults when `path` is `None`, otherwise [`BenchtrackConfig::load`].
    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector.validate()?;
        if let Some(url) = &self.alert.webhook_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    field: "alert.webhook_url".to_string(),
                    reason: format!("expected an http(s) URL, got '{url}'"),
                });
            }
        }
        Ok(())
    }
}
