//! HTTP intent-classification client for the wayfarer dialog engine.
//!
//! Implements [`wayfarer_core::IntentClassifier`] against a LUIS-v2-style
//! prediction endpoint. Transport and decode failures surface as
//! [`wayfarer_core::ClassifierError`]; the dialog scripts recover those as
//! "no understood intent".

mod client;

pub use client::{ClientError, LuisClient};
