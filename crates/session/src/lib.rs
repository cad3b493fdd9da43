//! Conversation hosting for the wayfarer dialog engine.
//!
//! A [`Session`] drives one [`wayfarer_core::Context`] turn by turn, keeps
//! the chat transcript, and exposes the resolved destination through a
//! `tokio::sync::watch` channel, the publish/subscribe port a UI layer
//! binds to. `bootstrap` wires the HTTP collaborator clients from
//! [`wayfarer_core::config::AppConfig`] and initializes tracing.

pub mod bootstrap;
mod session;

pub use bootstrap::{directions_session, init_tracing, BootstrapError};
pub use session::{ChatMessage, Session, Speaker};
