use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub nlu: NluConfig,
    pub geocoder: GeocoderConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct NluConfig {
    pub endpoint: String,
    pub app_id: String,
    pub subscription_key: SecretString,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct GeocoderConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_candidates: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub nlu_endpoint: Option<String>,
    pub nlu_app_id: Option<String>,
    pub nlu_subscription_key: Option<String>,
    pub geocoder_endpoint: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nlu: NluConfig {
                endpoint: "https://westus.api.cognitive.microsoft.com".to_string(),
                app_id: String::new(),
                subscription_key: String::new().into(),
                timeout_secs: 10,
            },
            geocoder: GeocoderConfig {
                endpoint: "https://geocode.arcgis.com/arcgis/rest/services/World/GeocodeServer"
                    .to_string(),
                timeout_secs: 10,
                max_candidates: 5,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    nlu: Option<NluPatch>,
    geocoder: Option<GeocoderPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct NluPatch {
    endpoint: Option<String>,
    app_id: Option<String>,
    subscription_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct GeocoderPatch {
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
    max_candidates: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    /// Loads configuration in layers: built-in defaults, then an optional
    /// `wayfarer.toml` patch file, then `WAYFARER_*` environment variables,
    /// then programmatic overrides, then validation.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("wayfarer.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(nlu) = patch.nlu {
            if let Some(endpoint) = nlu.endpoint {
                self.nlu.endpoint = endpoint;
            }
            if let Some(app_id) = nlu.app_id {
                self.nlu.app_id = app_id;
            }
            if let Some(subscription_key_value) = nlu.subscription_key {
                self.nlu.subscription_key = subscription_key_value.into();
            }
            if let Some(timeout_secs) = nlu.timeout_secs {
                self.nlu.timeout_secs = timeout_secs;
            }
        }

        if let Some(geocoder) = patch.geocoder {
            if let Some(endpoint) = geocoder.endpoint {
                self.geocoder.endpoint = endpoint;
            }
            if let Some(timeout_secs) = geocoder.timeout_secs {
                self.geocoder.timeout_secs = timeout_secs;
            }
            if let Some(max_candidates) = geocoder.max_candidates {
                self.geocoder.max_candidates = max_candidates;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(endpoint) = env::var("WAYFARER_NLU_ENDPOINT") {
            self.nlu.endpoint = endpoint;
        }
        if let Ok(app_id) = env::var("WAYFARER_NLU_APP_ID") {
            self.nlu.app_id = app_id;
        }
        if let Ok(subscription_key_value) = env::var("WAYFARER_NLU_KEY") {
            self.nlu.subscription_key = subscription_key_value.into();
        }
        if let Ok(raw) = env::var("WAYFARER_NLU_TIMEOUT_SECS") {
            self.nlu.timeout_secs = parse_env("WAYFARER_NLU_TIMEOUT_SECS", &raw)?;
        }
        if let Ok(endpoint) = env::var("WAYFARER_GEO_ENDPOINT") {
            self.geocoder.endpoint = endpoint;
        }
        if let Ok(raw) = env::var("WAYFARER_GEO_TIMEOUT_SECS") {
            self.geocoder.timeout_secs = parse_env("WAYFARER_GEO_TIMEOUT_SECS", &raw)?;
        }
        if let Ok(raw) = env::var("WAYFARER_GEO_MAX_CANDIDATES") {
            self.geocoder.max_candidates = parse_env("WAYFARER_GEO_MAX_CANDIDATES", &raw)?;
        }
        if let Ok(level) = env::var("WAYFARER_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(raw) = env::var("WAYFARER_LOG_FORMAT") {
            self.logging.format = raw.parse()?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(endpoint) = overrides.nlu_endpoint {
            self.nlu.endpoint = endpoint;
        }
        if let Some(app_id) = overrides.nlu_app_id {
            self.nlu.app_id = app_id;
        }
        if let Some(subscription_key_value) = overrides.nlu_subscription_key {
            self.nlu.subscription_key = subscription_key_value.into();
        }
        if let Some(endpoint) = overrides.geocoder_endpoint {
            self.geocoder.endpoint = endpoint;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        use secrecy::ExposeSecret;

        if self.nlu.endpoint.trim().is_empty() {
            return Err(ConfigError::Validation("nlu.endpoint must not be empty".to_string()));
        }
        if self.nlu.app_id.trim().is_empty() {
            return Err(ConfigError::Validation("nlu.app_id must be set".to_string()));
        }
        if self.nlu.subscription_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation("nlu.subscription_key must be set".to_string()));
        }
        if self.nlu.timeout_secs == 0 {
            return Err(ConfigError::Validation("nlu.timeout_secs must be positive".to_string()));
        }
        if self.geocoder.endpoint.trim().is_empty() {
            return Err(ConfigError::Validation(
                "geocoder.endpoint must not be empty".to_string(),
            ));
        }
        if self.geocoder.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "geocoder.timeout_secs must be positive".to_string(),
            ));
        }
        if self.geocoder.max_candidates == 0 {
            return Err(ConfigError::Validation(
                "geocoder.max_candidates must be at least 1".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Validation("logging.level must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }
    if let Ok(path) = env::var("WAYFARER_CONFIG") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }
    let default = PathBuf::from("wayfarer.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}
