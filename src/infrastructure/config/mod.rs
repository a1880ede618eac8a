use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::error::{AppError, Result};
use crate::domain::report::ViewDefaults;

pub const CONFIG_FILE: &str = "bni-dashboard.toml";
pub const ENV_PREFIX: &str = "BNI_DASHBOARD_";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(length(min = 1))]
    pub host: String,

    #[validate(range(min = 1))]
    pub port: u16,

    /// Largest accepted upload body
    #[validate(range(min = 1024))]
    pub max_upload_bytes: usize,

    #[validate(range(min = 1))]
    pub default_display_limit: usize,

    pub default_compare_members: usize,

    pub default_compare_metrics: usize,

    #[validate(range(min = 200, max = 4000))]
    pub chart_width: u32,

    #[validate(range(min = 150, max = 3000))]
    pub chart_height: u32,

    #[validate(range(min = 1))]
    pub session_capacity: usize,

    #[validate(range(min = 1))]
    pub cache_capacity: usize,

    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            max_upload_bytes: 20 * 1024 * 1024,
            default_display_limit: 10,
            default_compare_members: 3,
            default_compare_metrics: 5,
            chart_width: 900,
            chart_height: 480,
            session_capacity: 64,
            cache_capacity: 16,
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `bni-dashboard.toml`, then `BNI_DASHBOARD_*` env vars
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_figment(Self::figment(Path::new(CONFIG_FILE)))
    }

    pub fn figment(config_file: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;
        config
            .validate()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;
        Ok(config)
    }

    pub fn view_defaults(&self) -> ViewDefaults {
        ViewDefaults {
            display_limit: self.default_display_limit,
            compare_members: self.default_compare_members,
            compare_metrics: self.default_compare_metrics,
        }
    }
}
