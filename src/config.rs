//! Runtime settings.
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file, then `ORDER_OUTBOX_*` environment variables. Nested keys use a
//! double underscore, e.g. `ORDER_OUTBOX_RELAY__POLL_INTERVAL_MS=250`.

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::outbox::{MaxAttempts, RetryForever, RetryPolicy};

pub const ENV_PREFIX: &str = "ORDER_OUTBOX_";
pub const DEFAULT_CONFIG_FILE: &str = "order-outbox.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    pub poll_interval_ms: u64,
    /// Failed attempts before a record is dead-lettered. Unset retries
    /// forever.
    pub max_attempts: Option<u32>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_attempts: None,
        }
    }
}

impl RelaySettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_policy(&self) -> Box<dyn RetryPolicy> {
        match self.max_attempts {
            Some(n) => Box::new(MaxAttempts(n)),
            None => Box::new(RetryForever),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub service_name: String,
    pub log_level: String,
    pub log_json: bool,
    pub relay: RelaySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_name: "order-outbox".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            relay: RelaySettings::default(),
        }
    }
}

impl Settings {
    /// Load from `.env`, [`DEFAULT_CONFIG_FILE`] if present, and the
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Like [`Settings::load`] with an explicit TOML file and no `.env`.
    /// A missing file is not an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.relay.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "relay.poll_interval_ms must be positive".into(),
            ));
        }
        if self.relay.max_attempts == Some(0) {
            return Err(ConfigError::Invalid(
                "relay.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
