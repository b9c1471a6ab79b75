use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use validator::Validate;

/// Environment variable naming the configuration file (without extension).
pub const CONFIG_PATH_ENV: &str = "PRODUCT_IMPORT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/default";
const ENV_PREFIX: &str = "PRODUCT_IMPORT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Configuration options of the import and backfill jobs.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    /// Path of the SQLite catalog database.
    #[validate(length(min = 1))]
    pub database_url: String,
    #[serde(default)]
    #[validate(nested)]
    pub import: ImportConfig,
    #[serde(default)]
    #[validate(nested)]
    pub image_backfill: ImageBackfillConfig,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ImportConfig {
    /// Rows processed between checkpoint commits.
    #[validate(range(min = 1))]
    pub batch_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { batch_size: 50 }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ImageBackfillConfig {
    /// Maximum entries considered per invocation.
    #[validate(range(min = 1))]
    pub limit: usize,
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
    /// Download outcomes written per checkpoint commit.
    #[validate(range(min = 1))]
    pub commit_batch_size: usize,
}

impl Default for ImageBackfillConfig {
    fn default() -> Self {
        Self {
            limit: 50,
            timeout_secs: 30,
            commit_batch_size: 10,
        }
    }
}

impl ImageBackfillConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Loads the configuration file (optional) and `PRODUCT_IMPORT__*`
    /// environment overrides, e.g. `PRODUCT_IMPORT__IMPORT__BATCH_SIZE=20`.
    ///
    /// `path` takes precedence over [`CONFIG_PATH_ENV`].
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let path = path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let settings = config::Config::builder()
            .set_default("database_url", "catalog.db")?
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
