//! Ordinal and number-word parsing for menu selection.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("`{0}` is not a choice I understand")]
pub struct ChoiceParseError(pub String);

/// Parses a menu choice into a 1-based index.
///
/// Accepts digit strings plus a closed word vocabulary:
/// first/second/third/one/two/three. Extend the vocabulary deliberately;
/// anything else is an explicit error the caller re-prompts on.
pub fn parse_choice(text: &str) -> Result<usize, ChoiceParseError> {
    let token = text.trim().to_ascii_lowercase();
    if let Ok(number) = token.parse::<usize>() {
        return Ok(number);
    }
    match token.as_str() {
        "first" | "one" => Ok(1),
        "second" | "two" => Ok(2),
        "third" | "three" => Ok(3),
        _ => Err(ChoiceParseError(text.to_string())),
    }
}
