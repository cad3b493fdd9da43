use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dialog::handler::SubjectHandler;
use crate::errors::DialogError;
use crate::geo::{GeoPoint, Place};

/// The value shape a subject is declared to hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotKind {
    Text,
    Number,
    Candidates,
    Place,
    Point,
}

/// A typed slot value. One variant per subject kind the scripts use.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SlotValue {
    Text(String),
    Number(i64),
    Candidates(Vec<Place>),
    Place(Place),
    Point(GeoPoint),
}

impl SlotValue {
    pub fn kind(&self) -> SlotKind {
        match self {
            Self::Text(_) => SlotKind::Text,
            Self::Number(_) => SlotKind::Number,
            Self::Candidates(_) => SlotKind::Candidates,
            Self::Place(_) => SlotKind::Place,
            Self::Point(_) => SlotKind::Point,
        }
    }
}

/// Whether storing a value also finalizes the slot for this conversation.
///
/// `Pending` models "the value is known but more conversation is needed",
/// e.g. a destination search that produced multiple candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Pending,
}

/// A single piece of information the dialog must collect.
///
/// Subjects are owned by a [`crate::Context`] and evaluated in insertion
/// order. Names are expected to be unique within a context; duplicates are
/// a caller-contract violation the engine does not check for.
#[derive(Clone)]
pub struct Subject {
    name: String,
    kind: SlotKind,
    value: Option<SlotValue>,
    ready: bool,
    handler: Option<Arc<dyn SubjectHandler>>,
}

impl Subject {
    /// A subject with no handler. The evaluation loop echoes non-empty
    /// input back as a single output line for these.
    pub fn new(name: impl Into<String>, kind: SlotKind) -> Self {
        Self { name: name.into(), kind, value: None, ready: false, handler: None }
    }

    pub fn with_handler(
        name: impl Into<String>,
        kind: SlotKind,
        handler: Arc<dyn SubjectHandler>,
    ) -> Self {
        Self { name: name.into(), kind, value: None, ready: false, handler: Some(handler) }
    }

    /// A subject whose value is supplied by the host up front, already
    /// ready, so the evaluation loop skips it. Used for `CurrentLocation`.
    pub fn preset(name: impl Into<String>, value: SlotValue) -> Self {
        Self { name: name.into(), kind: value.kind(), value: Some(value), ready: true, handler: None }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Readiness without a value; used when a sibling slot satisfies this
    /// one transitively (e.g. a resolved destination retires the pending
    /// candidate list).
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    /// Stores a value and marks the subject ready. Fails fast when the
    /// value's kind does not match the subject's declared kind.
    pub fn set_value(&mut self, value: SlotValue) -> Result<(), DialogError> {
        self.set_value_with(value, Readiness::Ready)
    }

    pub fn set_value_with(
        &mut self,
        value: SlotValue,
        readiness: Readiness,
    ) -> Result<(), DialogError> {
        if value.kind() != self.kind {
            return Err(DialogError::SlotKindMismatch {
                subject: self.name.clone(),
                expected: self.kind,
                found: value.kind(),
            });
        }
        self.value = Some(value);
        self.ready = readiness == Readiness::Ready;
        Ok(())
    }

    pub fn value(&self) -> Option<&SlotValue> {
        self.value.as_ref()
    }

    pub fn text(&self) -> Option<&str> {
        match &self.value {
            Some(SlotValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn number(&self) -> Option<i64> {
        match &self.value {
            Some(SlotValue::Number(number)) => Some(*number),
            _ => None,
        }
    }

    pub fn candidates(&self) -> Option<&[Place]> {
        match &self.value {
            Some(SlotValue::Candidates(places)) => Some(places),
            _ => None,
        }
    }

    pub fn place(&self) -> Option<&Place> {
        match &self.value {
            Some(SlotValue::Place(place)) => Some(place),
            _ => None,
        }
    }

    pub fn point(&self) -> Option<&GeoPoint> {
        match &self.value {
            Some(SlotValue::Point(point)) => Some(point),
            _ => None,
        }
    }

    pub(crate) fn handler(&self) -> Option<Arc<dyn SubjectHandler>> {
        self.handler.clone()
    }
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("ready", &self.ready)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}
