//! Layered configuration.
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. An optional TOML file
//! 3. `PIESCAN_` environment variables, nested with `__`
//!    (e.g. `PIESCAN_SETTINGS__RESOLUTION=600`,
//!    `PIESCAN_WARMUP__MAX_ATTEMPTS=10`)
//!
//! ```toml
//! [settings]
//! resolution = 600
//! exposure = { r = 3000, g = 3000, b = 3000, i = 700 }
//!
//! [warmup]
//! max_attempts = 60
//! delay_ms = 500
//!
//! [output]
//! dir = "scans"
//! prefix = "frame"
//! ```

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};
use crate::session::WarmupPolicy;
use crate::settings::ScanSettings;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "PIESCAN_";

/// Where and how captured images are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory.
    pub dir: PathBuf,
    /// File name prefix.
    pub prefix: String,
    /// Write raw `.mmarr` planes.
    pub raw: bool,
    /// Write 16-bit PNG planes.
    pub png: bool,
    /// Stretch each channel before writing PNGs.
    pub normalize: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("scans"),
            prefix: "scan".to_owned(),
            raw: true,
            png: true,
            normalize: true,
        }
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device option values.
    pub settings: ScanSettings,
    /// Warm-up polling bounds.
    pub warmup: WarmupPolicy,
    /// Output options.
    pub output: OutputConfig,
}

impl Config {
    /// Load defaults, then `path` if given, then the environment.
    ///
    /// A `path` that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if !path.is_file() {
                return Err(ScanError::from(figment::Error::from(format!(
                    "config file not found: {}",
                    path.display()
                ))));
            }
            log::debug!("Loading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    /// Render as a TOML document that [`Config::load`] reads back.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ScanError::from(figment::Error::from(e.to_string())))
    }

    /// Parse a TOML document on top of the defaults, ignoring the environment.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml))
            .extract()?;
        Ok(config)
    }
}
