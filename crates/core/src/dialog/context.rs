use crate::dialog::handler::{SubjectHandler, Turn};
use crate::dialog::subject::Subject;
use crate::errors::DialogError;

type ActionProducer = Box<dyn Fn(&Context) -> Vec<String> + Send + Sync>;

struct ActionEntry {
    conditions: Vec<String>,
    producer: ActionProducer,
}

/// One conversation: an ordered list of subjects to collect, plus actions
/// that fire once their condition subjects are all ready.
///
/// A context is built once by a script factory, then mutated in place turn
/// by turn. It is never reset; a new scenario means a new context.
#[derive(Default)]
pub struct Context {
    subjects: Vec<Subject>,
    actions: Vec<ActionEntry>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a subject. Insertion order is evaluation order for the
    /// lifetime of the context.
    pub fn add_subject(&mut self, subject: Subject) {
        self.subjects.push(subject);
    }

    /// Registers an action. Registration order is firing order. Conditions
    /// are subject names; a condition naming a subject that does not exist
    /// never fires (caller-contract violation, not checked).
    pub fn add_action<F, I, S>(&mut self, producer: F, conditions: I)
    where
        F: Fn(&Context) -> Vec<String> + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions.push(ActionEntry {
            conditions: conditions.into_iter().map(Into::into).collect(),
            producer: Box::new(producer),
        });
    }

    /// Finds a subject by name. Duplicate names return the first match and
    /// are otherwise a caller-contract violation.
    pub fn subject(&self, name: &str) -> Option<&Subject> {
        self.subjects.iter().find(|subject| subject.name() == name)
    }

    pub fn subject_mut(&mut self, name: &str) -> Option<&mut Subject> {
        self.subjects.iter_mut().find(|subject| subject.name() == name)
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// A context is ready exactly when every subject is ready.
    pub fn is_ready(&self) -> bool {
        self.subjects.iter().all(Subject::is_ready)
    }

    /// Runs one turn of the conversation and returns the lines to say.
    ///
    /// Walks subjects in order, skipping ready ones. The first not-ready
    /// subject receives the literal input and the input is consumed; any
    /// later not-ready subject is invoked with empty input. A subject that
    /// produced no output and became ready is skipped silently and the walk
    /// continues, so a single reply can both fill one slot and surface the
    /// next question. Otherwise action output is appended to the subject's
    /// output and the turn ends. With every subject ready, only actions run.
    ///
    /// `&mut self` enforces a single in-flight evaluation per context.
    pub async fn evaluate(&mut self, input: &str) -> Result<Vec<String>, DialogError> {
        let raw = if input.is_empty() { None } else { Some(input) };
        let mut consumed = false;

        for index in 0..self.subjects.len() {
            if self.subjects[index].is_ready() {
                continue;
            }

            let turn_input = if consumed {
                None
            } else {
                consumed = true;
                raw
            };

            let lines = match self.subjects[index].handler() {
                Some(handler) => {
                    let mut turn = Turn::new(&mut self.subjects, index, turn_input);
                    handler.next(&mut turn).await?
                }
                // Handler-less subjects echo non-empty input back.
                None => turn_input.map(str::to_string).into_iter().collect(),
            };

            if lines.is_empty() && self.subjects[index].is_ready() {
                continue;
            }

            let mut output = lines;
            output.extend(self.evaluate_actions());
            return Ok(output);
        }

        Ok(self.evaluate_actions())
    }

    /// No "already fired" tracking: an action reproduces its output on
    /// every evaluation while its condition subjects remain ready.
    fn evaluate_actions(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for entry in &self.actions {
            let satisfied = entry
                .conditions
                .iter()
                .all(|name| self.subject(name).map_or(false, Subject::is_ready));
            if satisfied {
                lines.extend((entry.producer)(self));
            }
        }
        lines
    }
}
