//! # ferry-config
//!
//! Layered configuration loading for ferry using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`FERRY_*` prefix, `__` as separator)
//! 2. An explicit file passed with `--config`
//! 3. Project-level `.ferry/config.toml`
//! 4. User-level `~/.config/ferry/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `FERRY_TARGET__URL` -> `target.url`,
//! `FERRY_SESSION__SETTLING_DELAY_MS` -> `session.settling_delay_ms`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use ferry_config::FerryConfig;
//!
//! let config = FerryConfig::load_with_dotenv(None).expect("config");
//! if !config.target.is_configured() {
//!     println!("target store is not configured");
//! }
//! ```

mod error;
mod report;
mod session;
mod store;

pub use error::ConfigError;
pub use report::ReportConfig;
pub use session::SessionConfig;
pub use store::{StoreBackend, StoreConfig};

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FerryConfig {
    #[serde(default)]
    pub origin: StoreConfig,
    #[serde(default)]
    pub target: StoreConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl FerryConfig {
    /// Load configuration from all sources and validate it.
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is out of range.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(explicit).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.env` from the current directory, then [`Self::load`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is out of range.
    pub fn load_with_dotenv(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load(explicit)
    }

    /// Build the figment provider chain.
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = PathBuf::from(".ferry/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed("FERRY_").split("__"))
    }

    /// Reject values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.session.concurrency == 0 {
            return Err(invalid("session.concurrency", "must be at least 1"));
        }
        if self.session.connect_attempts == 0 {
            return Err(invalid("session.connect_attempts", "must be at least 1"));
        }
        for (field, value) in [
            ("report.proceed_threshold", self.report.proceed_threshold),
            ("report.caution_threshold", self.report.caution_threshold),
            ("report.success_threshold", self.report.success_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(invalid(field, "must be a percentage between 0 and 100"));
            }
        }
        if self.report.caution_threshold > self.report.proceed_threshold {
            return Err(invalid(
                "report.caution_threshold",
                "must not exceed report.proceed_threshold",
            ));
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ferry").join("config.toml"))
    }
}
