use std::sync::Arc;

use async_trait::async_trait;

use crate::dialog::context::Context;
use crate::dialog::handler::{SubjectHandler, Turn};
use crate::dialog::subject::{SlotKind, SlotValue, Subject};
use crate::errors::DialogError;

pub const NAME: &str = "Name";
pub const AGE: &str = "Age";

struct NameHandler;

#[async_trait]
impl SubjectHandler for NameHandler {
    async fn next(&self, turn: &mut Turn<'_>) -> Result<Vec<String>, DialogError> {
        let Some(reply) = turn.input().map(str::to_string) else {
            return Ok(vec!["What is your name?".to_string()]);
        };
        // Whatever they told us is their name.
        turn.current_mut().set_value(SlotValue::Text(reply))?;
        Ok(Vec::new())
    }
}

struct AgeHandler;

#[async_trait]
impl SubjectHandler for AgeHandler {
    async fn next(&self, turn: &mut Turn<'_>) -> Result<Vec<String>, DialogError> {
        let Some(reply) = turn.input().map(str::to_string) else {
            return Ok(vec!["How old are you?".to_string()]);
        };
        match reply.trim().parse::<i64>() {
            Ok(age) => {
                turn.current_mut().set_value(SlotValue::Number(age))?;
                Ok(Vec::new())
            }
            Err(_) => Ok(vec![
                "Sorry, I didn't get that. Please enter a number".to_string(),
                "How old are you?".to_string(),
            ]),
        }
    }
}

/// A two-field interview: name, then age, then a thank-you once both are in.
pub fn interview_context() -> Context {
    let mut context = Context::new();
    context.add_subject(Subject::with_handler(NAME, SlotKind::Text, Arc::new(NameHandler)));
    context.add_subject(Subject::with_handler(AGE, SlotKind::Number, Arc::new(AgeHandler)));
    context.add_action(|_| vec!["Thanks!".to_string()], [NAME, AGE]);
    context
}
