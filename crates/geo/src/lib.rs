//! HTTP geocoding client for the wayfarer dialog engine.
//!
//! Implements [`wayfarer_core::Geocoder`] against an ArcGIS
//! `findAddressCandidates`-style endpoint, with an optional location bias
//! so results near the traveller rank first.

mod client;

pub use client::{ClientError, WorldGeocoder};
