use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::warn;
use wayfarer_core::config::NluConfig;
use wayfarer_core::{
    ClassifierError, DialogState, DialogStatus, EntityValue, Intent, IntentClassifier, Prediction,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Intent-classification client speaking the LUIS v2 prediction protocol.
pub struct LuisClient {
    http: reqwest::Client,
    endpoint: String,
    app_id: String,
    subscription_key: SecretString,
}

impl LuisClient {
    /// The per-request timeout comes from config, so a hung classifier
    /// degrades into a conversational retry instead of blocking the turn.
    pub fn new(config: &NluConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            app_id: config.app_id.clone(),
            subscription_key: config.subscription_key.clone(),
        })
    }

    fn predict_url(&self) -> String {
        format!("{}/luis/v2.0/apps/{}", self.endpoint, self.app_id)
    }
}

#[async_trait]
impl IntentClassifier for LuisClient {
    async fn predict(&self, text: &str) -> Result<Prediction, ClassifierError> {
        let response = self
            .http
            .get(self.predict_url())
            .query(&[
                ("subscription-key", self.subscription_key.expose_secret()),
                ("q", text),
                ("verbose", "true"),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|error| {
                warn!(error = %error, "intent service request failed");
                ClassifierError::Transport(error.to_string())
            })?;

        let body: WirePrediction = response.json().await.map_err(|error| {
            warn!(error = %error, "intent service response unreadable");
            ClassifierError::Decode(error.to_string())
        })?;

        Ok(body.into_prediction())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePrediction {
    #[serde(default)]
    top_scoring_intent: Option<WireIntent>,
    #[serde(default)]
    entities: Vec<WireEntity>,
    #[serde(default)]
    dialog: Option<WireDialog>,
}

#[derive(Debug, Deserialize)]
struct WireIntent {
    intent: String,
    #[serde(default)]
    score: f32,
}

#[derive(Debug, Deserialize)]
struct WireEntity {
    #[serde(rename = "type")]
    kind: String,
    entity: String,
    #[serde(default)]
    score: f32,
}

#[derive(Debug, Deserialize)]
struct WireDialog {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
}

impl WirePrediction {
    fn into_prediction(self) -> Prediction {
        let top_intent = match self.top_scoring_intent {
            Some(intent) => Intent { name: intent.intent, score: intent.score },
            // LUIS reports "None" for unrecognized utterances; a missing
            // intent block maps to the same thing.
            None => Intent { name: "None".to_string(), score: 0.0 },
        };

        let mut entities: BTreeMap<String, Vec<EntityValue>> = BTreeMap::new();
        for entity in self.entities {
            entities
                .entry(entity.kind)
                .or_default()
                .push(EntityValue { value: entity.entity, score: entity.score });
        }

        let dialog = match self.dialog {
            Some(dialog) => {
                let finished = dialog
                    .status
                    .as_deref()
                    .map_or(true, |status| status.eq_ignore_ascii_case("finished"));
                DialogState {
                    status: if finished { DialogStatus::Finished } else { DialogStatus::InProgress },
                    prompt: dialog.prompt,
                }
            }
            None => DialogState::default(),
        };

        Prediction { top_intent, entities, dialog }
    }
}
