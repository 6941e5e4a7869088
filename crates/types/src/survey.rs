//! Survey definitions attached to templates.
//!
//! A survey is an ordered list of questions; each question binds one form
//! field named `survey_<variable>` and contributes one key to the launch
//! `extra_vars`.

pub mod validation;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

pub use validation::validate_answer;

/// Prefix of every survey form field.
pub const SURVEY_FIELD_PREFIX: &str = "survey_";

/// Survey as returned by `GET <template>/survey_spec/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveySpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub spec: Vec<SurveyQuestion>,
}

/// Answer widget type of a survey question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyQuestionKind {
    Text,
    Textarea,
    Password,
    Integer,
    Float,
    #[serde(rename = "multiplechoice")]
    MultipleChoice,
    #[serde(rename = "multiselect")]
    MultiSelect,
}

impl SurveyQuestionKind {
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            SurveyQuestionKind::Text | SurveyQuestionKind::Textarea | SurveyQuestionKind::Password
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyQuestion {
    #[serde(default)]
    pub question_name: String,
    #[serde(default)]
    pub question_description: String,
    pub variable: String,
    #[serde(rename = "type")]
    pub kind: SurveyQuestionKind,
    #[serde(default)]
    pub required: bool,
    /// Minimum length for text answers, minimum value for numeric ones.
    #[serde(default, deserialize_with = "lenient_number")]
    pub min: Option<f64>,
    /// Maximum length for text answers, maximum value for numeric ones.
    #[serde(default, deserialize_with = "lenient_number")]
    pub max: Option<f64>,
    #[serde(default)]
    pub default: Value,
    #[serde(default, deserialize_with = "choice_list")]
    pub choices: Vec<String>,
}

impl SurveyQuestion {
    /// Name of the form field bound to this question.
    pub fn field_name(&self) -> String {
        format!("{}{}", SURVEY_FIELD_PREFIX, self.variable)
    }

    /// Form value seeded before the user answers.
    ///
    /// Multi-select defaults arrive as newline separated text; numeric
    /// defaults may arrive as strings.
    pub fn initial_value(&self) -> Value {
        match self.kind {
            SurveyQuestionKind::MultiSelect => match &self.default {
                Value::String(text) => Value::Array(
                    text.split('\n')
                        .map(str::trim)
                        .filter(|item| !item.is_empty())
                        .map(|item| Value::String(item.to_string()))
                        .collect(),
                ),
                Value::Array(items) => Value::Array(items.clone()),
                _ => Value::Array(Vec::new()),
            },
            SurveyQuestionKind::Integer => match &self.default {
                Value::Number(number) => Value::Number(number.clone()),
                Value::String(text) => text
                    .trim()
                    .parse::<i64>()
                    .map(|parsed| Value::Number(parsed.into()))
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            },
            SurveyQuestionKind::Float => match &self.default {
                Value::Number(number) => Value::Number(number.clone()),
                Value::String(text) => text
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            },
            _ => match &self.default {
                Value::Null => Value::Null,
                Value::String(text) => Value::String(text.clone()),
                other => Value::String(other.to_string()),
            },
        }
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn choice_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::String(text) => text
            .split('\n')
            .map(str::trim)
            .filter(|choice| !choice.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => text,
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    })
}
