use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::orchestrator::BatchLimits;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelBackendConfig {
    Remote {
        localization_url: Url,
        severity_url: Url,
    },
    Torch {
        localization_path: PathBuf,
        severity_path: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub bucket: String,
    pub folder: String,
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightRefreshConfig {
    pub table: String,
    pub s3_key: String,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub storage: StorageConfig,
    pub models: ModelBackendConfig,
    pub limits: BatchLimits,
    pub class_table: Option<PathBuf>,
    pub weight_refresh: Option<WeightRefreshConfig>,
    pub assessments_table: Option<String>,
}

const DEFAULT_LOCALIZATION_MODEL: &str = "./models/best_localization.pt";
const DEFAULT_SEVERITY_MODEL: &str = "./models/best_256_new.pt";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let parse = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            match get(key) {
                Some(value) => parse_value(key, &value),
                None => Ok(default),
            }
        };

        let port = match get("PORT") {
            Some(value) => parse_value("PORT", &value)?,
            None => 8001,
        };

        let storage = StorageConfig {
            bucket: require("S3_BUCKET_NAME")?,
            folder: get("MASK_FOLDER").unwrap_or_else(|| "default_folder".to_string()),
            public_base_url: get("MASK_PUBLIC_BASE_URL"),
        };

        let severity_path =
            PathBuf::from(get("SEVERITY_MODEL_PATH").unwrap_or_else(|| DEFAULT_SEVERITY_MODEL.into()));
        let backend = get("MODEL_BACKEND").unwrap_or_else(|| "remote".to_string());
        let models = match backend.as_str() {
            "remote" => ModelBackendConfig::Remote {
                localization_url: parse_url("LOCALIZATION_MODEL_URL", require("LOCALIZATION_MODEL_URL")?)?,
                severity_url: parse_url("SEVERITY_MODEL_URL", require("SEVERITY_MODEL_URL")?)?,
            },
            "torch" => ModelBackendConfig::Torch {
                localization_path: PathBuf::from(
                    get("LOCALIZATION_MODEL_PATH").unwrap_or_else(|| DEFAULT_LOCALIZATION_MODEL.into()),
                ),
                severity_path: severity_path.clone(),
            },
            other => {
                return Err(ConfigError::Invalid {
                    key: "MODEL_BACKEND",
                    value: other.to_string(),
                    reason: "expected \"remote\" or \"torch\"".to_string(),
                });
            }
        };

        let concurrency = parse("BATCH_CONCURRENCY", 4)?;
        if concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "BATCH_CONCURRENCY",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let limits = BatchLimits {
            concurrency: concurrency as usize,
            acquire_timeout: Duration::from_secs(parse("ACQUIRE_TIMEOUT_SECS", 30)?),
            inference_timeout: Duration::from_secs(parse("INFERENCE_TIMEOUT_SECS", 120)?),
            publish_timeout: Duration::from_secs(parse("PUBLISH_TIMEOUT_SECS", 30)?),
        };

        // Only the torch backend reads local weights.
        let uses_local_weights = matches!(models, ModelBackendConfig::Torch { .. });
        let weight_refresh = match (get("DYNAMODB_WEIGHTS_TABLE"), get("WEIGHTS_S3_KEY")) {
            (Some(table), Some(s3_key)) if uses_local_weights => Some(WeightRefreshConfig {
                table,
                s3_key,
                destination: severity_path,
            }),
            _ => None,
        };

        Ok(Self {
            port,
            storage,
            models,
            limits,
            class_table: get("DAMAGE_CLASSES_CONFIG").map(PathBuf::from),
            weight_refresh,
            assessments_table: get("DYNAMODB_ASSESSMENTS_TABLE"),
        })
    }
}

fn parse_value<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_url(key: &'static str, value: String) -> Result<Url, ConfigError> {
    Url::parse(&value).map_err(|e| ConfigError::Invalid {
        key,
        value,
        reason: e.to_string(),
    })
}
