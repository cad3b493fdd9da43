//! Wayfarer core: the slot-filling dialog engine behind the navigation
//! assistant.
//!
//! A conversation is modelled as a [`Context`]: an ordered list of typed
//! slots ([`Subject`]s) that must be collected from the user, plus actions
//! that fire once their prerequisite subjects are satisfied. Each turn of
//! user input is fed to [`Context::evaluate`], which decides which subject
//! consumes the utterance and returns the lines to say back.
//!
//! # Key types
//!
//! - [`Context`] - one conversation; owns the per-turn evaluation loop
//! - [`Subject`] - a named, typed, readiness-tracked slot
//! - [`SubjectHandler`] - async per-slot behavior, invoked by the loop
//! - [`IntentClassifier`] / [`Geocoder`] - pluggable collaborator traits
//! - [`scripts`] - pre-wired contexts (repeater, interview, directions)
//!
//! # Safety principle
//!
//! The engine never interprets language itself. Classification and
//! geocoding are external collaborators behind traits, and every
//! collaborator failure degrades to a conversational retry rather than an
//! error out of [`Context::evaluate`].

pub mod config;
pub mod dialog;
pub mod errors;
pub mod geo;
pub mod nlu;
pub mod numbers;
pub mod scripts;

pub use dialog::context::Context;
pub use dialog::handler::{SubjectHandler, Turn};
pub use dialog::subject::{Readiness, SlotKind, SlotValue, Subject};
pub use errors::DialogError;
pub use geo::{GeoPoint, GeocodeError, Geocoder, Place};
pub use nlu::{
    ClassifierError, DialogState, DialogStatus, EntityValue, Intent, IntentClassifier, Prediction,
};
pub use numbers::{parse_choice, ChoiceParseError};
