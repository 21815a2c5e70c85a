use std::fmt;

use serde::Serialize;

use crate::errors::PipelineError;

/// Upper bound the index service accepts for `QueryText`.
pub const MAX_QUESTION_CHARS: usize = 1_000;

/// A user utterance that passed local validation.
///
/// The text is untrusted and only ever embedded as data; it is never treated
/// as instructions by anything in this workspace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Question(String);

impl Question {
    pub fn parse(raw: &str) -> Result<Self, PipelineError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::InvalidQuery("question is empty".to_owned()));
        }

        let length = trimmed.chars().count();
        if length > MAX_QUESTION_CHARS {
            return Err(PipelineError::InvalidQuery(format!(
                "question is {length} characters long (limit {MAX_QUESTION_CHARS})"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Question {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
