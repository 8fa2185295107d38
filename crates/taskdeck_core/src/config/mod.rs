use crate::error::AppError;
use crate::model::{DEFAULT_CATEGORY, PriorityEncoding};
use crate::storage::json_store;
use crate::store::StoreOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TASKDECK_CONFIG_PATH";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub default_category: Option<String>,
    #[serde(default)]
    pub priority_encoding: Option<PriorityEncoding>,
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    #[serde(default)]
    pub log_filter: Option<String>,
}

impl Config {
    pub fn default_category(&self) -> &str {
        self.default_category
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter
            .as_deref()
            .filter(|filter| !filter.trim().is_empty())
            .unwrap_or(DEFAULT_LOG_FILTER)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            default_category: self.default_category().to_string(),
            priority_encoding: self.priority_encoding.unwrap_or_default(),
        }
    }

    /// `TASKDECK_STORE_PATH` wins over the configured path, which wins over
    /// the platform default.
    pub fn resolve_store_path(&self) -> Result<PathBuf, AppError> {
        if let Ok(path) = std::env::var(json_store::STORE_ENV_VAR)
            && !path.trim().is_empty()
        {
            return Ok(PathBuf::from(path));
        }
        match self.store_path.as_ref() {
            Some(path) if !path.as_os_str().is_empty() => Ok(path.clone()),
            _ => json_store::default_store_path(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub default_category: Option<String>,
    pub priority_encoding: Option<PriorityEncoding>,
    pub store_path: Option<PathBuf>,
    pub log_filter: Option<String>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_input("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("taskdeck")
            .join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_input("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("taskdeck")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::persistence(format!("{}: {}", path.display(), err)))?;
    serde_json::from_str(&content).map_err(|err| {
        AppError::data_corruption(format!("invalid JSON in {}: {}", path.display(), err))
    })
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(category) = overrides.default_category.as_ref() {
        merged.default_category = Some(category.clone());
    }
    if let Some(encoding) = overrides.priority_encoding {
        merged.priority_encoding = Some(encoding);
    }
    if let Some(path) = overrides.store_path.as_ref() {
        merged.store_path = Some(path.clone());
    }
    if let Some(filter) = overrides.log_filter.as_ref() {
        merged.log_filter = Some(filter.clone());
    }

    merged
}
