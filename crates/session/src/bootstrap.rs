//! Wires configuration into live collaborators and a ready session.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wayfarer_core::config::{AppConfig, ConfigError, LogFormat, LoggingConfig};
use wayfarer_core::GeoPoint;
use wayfarer_geo::WorldGeocoder;
use wayfarer_nlu::LuisClient;

use crate::session::Session;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build intent classifier client")]
    Classifier(#[source] wayfarer_nlu::ClientError),
    #[error("failed to build geocoder client")]
    Geocoder(#[source] wayfarer_geo::ClientError),
}

/// Installs the global tracing subscriber per the logging config.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if result.is_err() {
        // A subscriber is already installed, e.g. by a test harness.
    }
}

/// Builds the HTTP collaborators from config and hosts the directions
/// script in a fresh session anchored at `origin`.
pub fn directions_session(
    config: &AppConfig,
    origin: GeoPoint,
) -> Result<Session, BootstrapError> {
    let classifier = LuisClient::new(&config.nlu).map_err(BootstrapError::Classifier)?;
    let geocoder = WorldGeocoder::new(&config.geocoder).map_err(BootstrapError::Geocoder)?;
    info!(
        nlu_endpoint = %config.nlu.endpoint,
        geocoder_endpoint = %config.geocoder.endpoint,
        "collaborators ready"
    );
    Ok(Session::directions(Arc::new(classifier), Arc::new(geocoder), origin))
}

#[cfg(test)]
mod tests {
    use super::directions_session;
    use wayfarer_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use wayfarer_core::GeoPoint;

    fn load_with(overrides: ConfigOverrides) -> Result<AppConfig, wayfarer_core::config::ConfigError> {
        AppConfig::load(LoadOptions {
            config_path: None,
            require_file: false,
            overrides,
        })
    }

    #[test]
    fn builds_session_from_valid_config() {
        let config = load_with(ConfigOverrides {
            nlu_app_id: Some("app".to_string()),
            nlu_subscription_key: Some("key".to_string()),
            ..ConfigOverrides::default()
        })
        .expect("config");

        let session = directions_session(&config, GeoPoint::default()).expect("session");
        assert!(!session.is_complete());
    }

    #[test]
    fn missing_credentials_fail_validation() {
        let error = load_with(ConfigOverrides::default()).expect_err("must fail");
        assert!(error.to_string().contains("app_id"));
    }
}
