use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;
use wayfarer_core::scripts::{self, directions};
use wayfarer_core::{Context, GeoPoint, Geocoder, IntentClassifier, Place, Subject};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// One conversation between a user and the assistant.
///
/// Owns the dialog context exclusively; `&mut self` on the turn methods
/// means no two turns ever run concurrently against the same context.
pub struct Session {
    context: Context,
    transcript: Vec<ChatMessage>,
    correlation_id: String,
    destination_rx: watch::Receiver<Option<Place>>,
}

impl Session {
    /// Hosts an arbitrary pre-wired context. The destination port stays at
    /// `None` for scripts that never resolve one.
    pub fn with_context(context: Context) -> Self {
        let (_tx, rx) = watch::channel(None);
        Self::build(context, rx)
    }

    /// Hosts the directions script. The script's resolution action
    /// publishes into the destination port; publication is
    /// change-detecting, so the action re-firing on later turns does not
    /// re-notify subscribers.
    pub fn directions(
        classifier: Arc<dyn IntentClassifier>,
        geocoder: Arc<dyn Geocoder>,
        origin: GeoPoint,
    ) -> Self {
        let (tx, rx) = watch::channel(None);
        let context =
            scripts::directions_context(classifier, geocoder, origin, move |context: &Context| {
                if let Some(place) =
                    context.subject(directions::FINAL_DESTINATION).and_then(Subject::place)
                {
                    tx.send_if_modified(|current: &mut Option<Place>| {
                        if current.as_ref() == Some(place) {
                            return false;
                        }
                        *current = Some(place.clone());
                        true
                    });
                }
                Vec::new()
            });
        Self::build(context, rx)
    }

    fn build(context: Context, destination_rx: watch::Receiver<Option<Place>>) -> Self {
        Self {
            context,
            transcript: Vec::new(),
            correlation_id: Uuid::new_v4().to_string(),
            destination_rx,
        }
    }

    /// A fresh receiver on the destination port for a UI layer to watch.
    pub fn destination(&self) -> watch::Receiver<Option<Place>> {
        self.destination_rx.clone()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn is_complete(&self) -> bool {
        self.context.is_ready()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Mutable access for hosts that feed externally-sourced subjects,
    /// e.g. updating `CurrentLocation` from a positioning service.
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Runs the empty-input turn that surfaces the opening prompt.
    pub async fn open(&mut self) -> Result<Vec<String>> {
        let replies = self.context.evaluate("").await?;
        for line in &replies {
            self.push(Speaker::Assistant, line);
        }
        debug!(
            correlation_id = %self.correlation_id,
            replies = replies.len(),
            "session opened"
        );
        Ok(replies)
    }

    /// Records the user's line, runs one evaluation, records the replies.
    pub async fn say(&mut self, text: &str) -> Result<Vec<String>> {
        self.push(Speaker::User, text);
        let replies = self.context.evaluate(text).await?;
        for line in &replies {
            self.push(Speaker::Assistant, line);
        }
        debug!(
            correlation_id = %self.correlation_id,
            replies = replies.len(),
            complete = self.context.is_ready(),
            "turn evaluated"
        );
        Ok(replies)
    }

    fn push(&mut self, speaker: Speaker, text: &str) {
        // Empty lines never reach the transcript.
        if text.is_empty() {
            return;
        }
        self.transcript.push(ChatMessage { speaker, text: text.to_string(), at: Utc::now() });
    }
}
