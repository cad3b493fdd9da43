//! Pre-wired dialog contexts for specific scenarios.
//!
//! Scripts are configuration of the engine, not the engine itself: each
//! factory assembles subjects, handlers, and actions into a ready-to-run
//! [`Context`]. The directions script is the richest one and exercises
//! every engine feature (disambiguation, pending values, actions).

pub mod directions;
pub mod interview;

pub use directions::directions_context;
pub use interview::interview_context;

use crate::dialog::context::Context;
use crate::dialog::subject::{SlotKind, Subject};

/// A single handler-less slot: whatever the user says is echoed back.
pub fn repeater_context() -> Context {
    let mut context = Context::new();
    context.add_subject(Subject::new("Pete", SlotKind::Text));
    context
}
