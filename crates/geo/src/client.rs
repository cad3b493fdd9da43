use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;
use wayfarer_core::config::GeocoderConfig;
use wayfarer_core::{GeoPoint, GeocodeError, Geocoder, Place};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Geocoding client speaking the `findAddressCandidates` protocol.
pub struct WorldGeocoder {
    http: reqwest::Client,
    endpoint: String,
    max_candidates: u32,
}

impl WorldGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            max_candidates: config.max_candidates,
        })
    }

    fn find_url(&self) -> String {
        format!("{}/findAddressCandidates", self.endpoint)
    }
}

#[async_trait]
impl Geocoder for WorldGeocoder {
    async fn geocode(
        &self,
        query: &str,
        bias: Option<&GeoPoint>,
    ) -> Result<Vec<Place>, GeocodeError> {
        let mut params = vec![
            ("f".to_string(), "json".to_string()),
            ("singleLine".to_string(), query.to_string()),
            ("maxLocations".to_string(), self.max_candidates.to_string()),
        ];
        if let Some(point) = bias {
            params.push(("location".to_string(), location_param(point)));
        }

        let response = self
            .http
            .get(self.find_url())
            .query(&params)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|error| {
                warn!(error = %error, "geocode request failed");
                GeocodeError::Transport(error.to_string())
            })?;

        let body: WireResponse = response.json().await.map_err(|error| {
            warn!(error = %error, "geocode response unreadable");
            GeocodeError::Decode(error.to_string())
        })?;

        Ok(body.into_places())
    }
}

fn location_param(point: &GeoPoint) -> String {
    format!("{},{}", point.x, point.y)
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    address: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    location: WireLocation,
}

#[derive(Debug, Default, Deserialize)]
struct WireLocation {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

impl WireResponse {
    /// Ranked best-first regardless of wire order.
    fn into_places(self) -> Vec<Place> {
        let mut places: Vec<Place> = self
            .candidates
            .into_iter()
            .map(|candidate| Place {
                label: candidate.address,
                score: candidate.score,
                location: GeoPoint { x: candidate.location.x, y: candidate.location.y },
            })
            .collect();
        places.sort_by(|a, b| b.score.total_cmp(&a.score));
        places
    }
}

#[cfg(test)]
mod tests {
    use wayfarer_core::config::GeocoderConfig;
    use wayfarer_core::GeoPoint;

    use super::{location_param, WireResponse, WorldGeocoder};

    fn decode(raw: &str) -> WireResponse {
        serde_json::from_str(raw).expect("wire decode")
    }

    #[test]
    fn decodes_and_ranks_candidates_best_first() {
        let places = decode(
            r#"{
                "candidates": [
                    { "address": "Main St, Shelbyville", "score": 85.2, "location": { "x": -86.4, "y": 39.5 } },
                    { "address": "Main St, Springfield", "score": 97.8, "location": { "x": -89.6, "y": 39.8 } }
                ]
            }"#,
        )
        .into_places();

        assert_eq!(places.len(), 2);
        assert_eq!(places[0].label, "Main St, Springfield");
        assert_eq!(places[0].location, GeoPoint { x: -89.6, y: 39.8 });
        assert_eq!(places[1].label, "Main St, Shelbyville");
    }

    #[test]
    fn empty_candidate_list_is_legitimate() {
        assert!(decode(r#"{ "candidates": [] }"#).into_places().is_empty());
        assert!(decode(r#"{}"#).into_places().is_empty());
    }

    #[test]
    fn bias_is_encoded_as_x_comma_y() {
        assert_eq!(location_param(&GeoPoint { x: -93.27, y: 44.98 }), "-93.27,44.98");
    }

    #[test]
    fn find_url_joins_endpoint() {
        let geocoder = WorldGeocoder::new(&GeocoderConfig {
            endpoint: "https://geocode.example.test/World/GeocodeServer/".to_string(),
            timeout_secs: 5,
            max_candidates: 5,
        })
        .expect("client");

        assert_eq!(
            geocoder.find_url(),
            "https://geocode.example.test/World/GeocodeServer/findAddressCandidates"
        );
    }
}
