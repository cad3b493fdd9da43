use async_trait::async_trait;

use crate::dialog::subject::Subject;
use crate::errors::DialogError;

/// Per-slot behavior, invoked by the evaluation loop.
///
/// Handlers are asynchronous because most of them talk to collaborators
/// (intent classification, geocoding) mid-turn. The loop awaits each
/// handler to completion before moving on, so at most one handler is in
/// flight per context.
#[async_trait]
pub trait SubjectHandler: Send + Sync {
    /// Produce the lines to say this turn. May mark the driven subject (or
    /// any sibling reachable through the [`Turn`]) ready as a side effect.
    async fn next(&self, turn: &mut Turn<'_>) -> Result<Vec<String>, DialogError>;
}

/// The scope a handler runs in: this turn's input plus mutable access to
/// every subject of the owning context.
pub struct Turn<'a> {
    subjects: &'a mut [Subject],
    index: usize,
    input: Option<&'a str>,
}

impl<'a> Turn<'a> {
    pub(crate) fn new(subjects: &'a mut [Subject], index: usize, input: Option<&'a str>) -> Self {
        Self { subjects, index, input }
    }

    /// The user utterance, or `None` when this subject did not get the
    /// literal input this turn.
    pub fn input(&self) -> Option<&str> {
        self.input
    }

    /// The subject this handler is driving.
    pub fn current(&self) -> &Subject {
        &self.subjects[self.index]
    }

    pub fn current_mut(&mut self) -> &mut Subject {
        &mut self.subjects[self.index]
    }

    /// Looks up any subject of the context by name, the driven one
    /// included. Duplicate names return the first match.
    pub fn get(&self, name: &str) -> Option<&Subject> {
        self.subjects.iter().find(|subject| subject.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Subject> {
        self.subjects.iter_mut().find(|subject| subject.name() == name)
    }
}
