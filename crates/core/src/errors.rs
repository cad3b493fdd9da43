use thiserror::Error;

use crate::dialog::subject::SlotKind;

/// Caller-contract violations surfaced by the engine.
///
/// Collaborator failures (classifier, geocoder) never appear here; script
/// handlers recover those locally into conversational retries. The only
/// errors that cross [`crate::Context::evaluate`] are programmer errors.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DialogError {
    #[error("subject `{subject}` holds {expected:?} values, was given {found:?}")]
    SlotKindMismatch { subject: String, expected: SlotKind, found: SlotKind },
}
