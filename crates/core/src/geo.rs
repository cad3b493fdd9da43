//! Geocoding collaborator boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A map coordinate, in the geocoder's spatial reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub x: f64,
    pub y: f64,
}

/// One ranked geocoding candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub label: String,
    pub score: f32,
    pub location: GeoPoint,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GeocodeError {
    #[error("geocoder transport failure: {0}")]
    Transport(String),
    #[error("geocoder returned an unreadable response: {0}")]
    Decode(String),
}

/// Maps a location description to ranked candidate places, best first.
/// May legitimately return zero results.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(
        &self,
        query: &str,
        bias: Option<&GeoPoint>,
    ) -> Result<Vec<Place>, GeocodeError>;
}
