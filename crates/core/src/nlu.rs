//! Intent-classification collaborator boundary.
//!
//! The engine never interprets language itself; scripts hand each utterance
//! to an [`IntentClassifier`] and act on the structured [`Prediction`]. A
//! transport or decode failure is a [`ClassifierError`] that handlers
//! recover locally as "no understood intent"; it never crosses
//! [`crate::Context::evaluate`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub name: String,
    pub score: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityValue {
    pub value: String,
    pub score: f32,
}

/// Whether the classifier considers its own sub-dialog finished or is
/// asking a follow-up question of its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogStatus {
    Finished,
    InProgress,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DialogState {
    pub status: DialogStatus,
    pub prompt: Option<String>,
}

impl Default for DialogState {
    fn default() -> Self {
        Self { status: DialogStatus::Finished, prompt: None }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub top_intent: Intent,
    /// Extracted entities, grouped by entity type, best first.
    #[serde(default)]
    pub entities: BTreeMap<String, Vec<EntityValue>>,
    #[serde(default)]
    pub dialog: DialogState,
}

impl Prediction {
    /// The first extracted value for an entity type, if any.
    pub fn entity(&self, name: &str) -> Option<&str> {
        self.entities
            .get(name)
            .and_then(|values| values.first())
            .map(|value| value.value.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("classifier transport failure: {0}")]
    Transport(String),
    #[error("classifier returned an unreadable response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn predict(&self, text: &str) -> Result<Prediction, ClassifierError>;
}
