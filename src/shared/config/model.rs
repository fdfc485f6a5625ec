use std::env;

use serde::Deserialize;

use crate::pipeline::PipelineJob;
use crate::shared::datetime::BucketLabel;

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub pipeline: Option<PipelineJobConfig>,
}

/// What to do with a record whose fields cannot be used by an operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQualityPolicy {
    /// Drop the record and report it in the skip counts
    #[default]
    SkipAndCount,
    /// Abort the call with the record's error
    FailFast,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub data_quality: DataQualityPolicy,
    #[serde(default = "default_frequency")]
    pub default_frequency: String,
    #[serde(default)]
    pub bucket_label: BucketLabel,
}

fn default_frequency() -> String {
    "1T".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_quality: DataQualityPolicy::default(),
            default_frequency: default_frequency(),
            bucket_label: BucketLabel::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_level")]
    pub stdout_level: String,
    #[serde(default = "default_level")]
    pub file_level: String,
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            stdout_level: default_level(),
            file_level: default_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_pool_idle_timeout_secs() -> u64 {
    30
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            pool_idle_timeout_secs: default_pool_idle_timeout_secs(),
        }
    }
}

/// One-shot job run by the binary.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineJobConfig {
    pub machine_id: String,
    #[serde(flatten)]
    pub job: PipelineJob,
}

pub fn load_settings() -> Result<Settings, config::ConfigError> {
    let config_path = env::var("REFINER_CONFIG").unwrap_or_else(|_| "config".to_string());
    load_settings_from(&config_path)
}

/// Load settings from `path` (extension optional); a missing file yields defaults.
pub fn load_settings_from(path: &str) -> Result<Settings, config::ConfigError> {
    let settings: Settings = config::Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .build()?
        .try_deserialize()?;

    Ok(settings)
}
