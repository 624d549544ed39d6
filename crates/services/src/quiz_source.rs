use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use pomo_core::model::Question;

use crate::error::GenerationError;

/// Turns note text into a multiple-choice quiz.
#[async_trait]
pub trait QuizSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `GenerationError` when no usable quiz could be produced.
    async fn generate_quiz(&self, notes: &str) -> Result<Vec<Question>, GenerationError>;
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(alias = "text")]
    question: String,
    options: Vec<String>,
    #[serde(alias = "correctAnswer", alias = "correctOptionIndex")]
    correct_answer: usize,
}

/// Parse a model reply into questions.
///
/// Accepts a bare JSON array, an object with a `questions` array, or an object
/// whose `questions` field is itself a JSON string holding the array. Markdown
/// code fences and prose around the JSON are ignored.
///
/// # Errors
///
/// Returns `GenerationError` for malformed JSON, an unexpected shape, an empty
/// list, or any question that fails validation.
pub fn parse_quiz_payload(text: &str) -> Result<Vec<Question>, GenerationError> {
    let body = extract_json(text).ok_or(GenerationError::EmptyResponse)?;
    let records = match serde_json::from_str::<Value>(body)? {
        Value::Array(items) => items,
        Value::Object(mut fields) => match fields.remove("questions") {
            Some(Value::Array(items)) => items,
            Some(Value::String(inner)) => return parse_quiz_payload(&inner),
            _ => {
                return Err(GenerationError::UnexpectedShape(
                    "object without a `questions` array".into(),
                ));
            }
        },
        other => {
            return Err(GenerationError::UnexpectedShape(format!(
                "expected an array or object, got {other}"
            )));
        }
    };
    if records.is_empty() {
        return Err(GenerationError::NoQuestions);
    }

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let raw: RawQuestion = serde_json::from_value(record)?;
            Question::new(raw.question, raw.options, raw.correct_answer)
                .map_err(|source| GenerationError::InvalidQuestion { index, source })
        })
        .collect()
}

fn extract_json(text: &str) -> Option<&str> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if text.starts_with('[') || text.starts_with('{') {
        return Some(text);
    }
    let start = text.find(['[', '{'])?;
    let end = text.rfind([']', '}'])?;
    (end >= start).then(|| &text[start..=end])
}
