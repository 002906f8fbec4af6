//! Configuration from the environment or a JSON file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use openrouter_api::OpenRouterConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::error::AssistError;
use crate::session::Session;

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const MODEL_ENV: &str = "WEBIDE_ASSIST_MODEL";
pub const BASE_URL_ENV: &str = "WEBIDE_ASSIST_BASE_URL";
pub const TIMEOUT_ENV: &str = "WEBIDE_ASSIST_TIMEOUT_SEC";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error while reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config JSON at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssistConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub referer: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub timeout_sec: Option<u64>,
}

impl AssistConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::default().overlay_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// File values (when a path is given) with environment overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.overlay_env()?;
        config.validate()?;
        Ok(config)
    }

    fn overlay_env(mut self) -> Result<Self, ConfigError> {
        if let Some(api_key) = env_string_opt(API_KEY_ENV) {
            self.api_key = Some(api_key);
        }
        if let Some(model) = env_string_opt(MODEL_ENV) {
            self.model = Some(model);
        }
        if let Some(base_url) = env_string_opt(BASE_URL_ENV) {
            self.base_url = Some(base_url);
        }
        if let Some(raw) = env_string_opt(TIMEOUT_ENV) {
            let timeout = raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                field: TIMEOUT_ENV,
                message: format!("expected whole seconds, got '{raw}'"),
            })?;
            self.timeout_sec = Some(timeout);
        }
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_sec == Some(0) {
            return Err(ConfigError::Invalid {
                field: "timeout_sec",
                message: "must be greater than zero".to_owned(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_sec.map(Duration::from_secs)
    }

    pub fn openrouter_config(&self) -> OpenRouterConfig {
        let mut config = OpenRouterConfig::new();
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url);
        }
        if let Some(referer) = &self.referer {
            config = config.with_referer(referer);
        }
        if let Some(title) = &self.title {
            config = config.with_title(title);
        }
        if let Some(timeout) = self.timeout() {
            config = config.with_timeout(timeout);
        }
        config
    }

    /// Starts a session with the configured credential and model.
    ///
    /// A model id that is not built in is registered under its own id.
    pub fn session(&self) -> Result<Session, AssistError> {
        let mut session = Session::new();
        if let Some(api_key) = &self.api_key {
            session.set_credential(api_key.as_str());
        }
        if let Some(model) = &self.model {
            let models = session.models_mut();
            if models.get(model.trim()).is_some() {
                models.select(model)?;
            } else {
                models.add(model, model)?;
            }
        }
        Ok(session)
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
