//! Validation of survey answers against their question definitions.
//!
//! Answers come straight from the form, so numbers may still be text and
//! multi-select answers may be a single string.

use serde_json::Value;

use super::{SurveyQuestion, SurveyQuestionKind};

pub const BLANK_MESSAGE: &str = "This field must not be blank";
pub const INTEGER_MESSAGE: &str = "This field must be an integer";
pub const NUMBER_MESSAGE: &str = "This field must be a number";
pub const CHOICE_MESSAGE: &str = "This field must be one of the available choices";

/// Validate one answer against its question.
///
/// Blank answers only fail when the question is required. Length bounds
/// apply to text questions and value bounds to numeric ones.
pub fn validate_answer(question: &SurveyQuestion, answer: &Value) -> Result<(), String> {
    if is_blank(answer) {
        return if question.required {
            Err(BLANK_MESSAGE.to_string())
        } else {
            Ok(())
        };
    }

    match question.kind {
        kind if kind.is_textual() => {
            let text = match answer {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            let length = text.chars().count() as f64;
            if let Some(min) = question.min
                && length < min
            {
                return Err(format!("This field must be at least {} characters", min));
            }
            if let Some(max) = question.max
                && length > max
            {
                return Err(format!("This field must not exceed {} characters", max));
            }
            Ok(())
        }
        SurveyQuestionKind::Integer => {
            let value = as_integer(answer).ok_or_else(|| INTEGER_MESSAGE.to_string())?;
            check_range(value as f64, question.min, question.max)
        }
        SurveyQuestionKind::Float => {
            let value = as_float(answer).ok_or_else(|| NUMBER_MESSAGE.to_string())?;
            check_range(value, question.min, question.max)
        }
        SurveyQuestionKind::MultipleChoice => {
            if question.choices.iter().any(|choice| choice_matches(choice, answer)) {
                Ok(())
            } else {
                Err(CHOICE_MESSAGE.to_string())
            }
        }
        SurveyQuestionKind::MultiSelect => {
            let selected: Vec<Value> = match answer {
                Value::Array(items) => items.clone(),
                single => vec![single.clone()],
            };
            let all_known = selected
                .iter()
                .all(|item| question.choices.iter().any(|choice| choice_matches(choice, item)));
            if all_known {
                Ok(())
            } else {
                Err(CHOICE_MESSAGE.to_string())
            }
        }
        _ => Ok(()),
    }
}

/// Null, empty text and empty lists count as unanswered.
pub fn is_blank(answer: &Value) -> bool {
    match answer {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn as_integer(answer: &Value) -> Option<i64> {
    match answer {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn as_float(answer: &Value) -> Option<f64> {
    match answer {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn check_range(value: f64, min: Option<f64>, max: Option<f64>) -> Result<(), String> {
    let below = min.is_some_and(|min| value < min);
    let above = max.is_some_and(|max| value > max);
    if !below && !above {
        return Ok(());
    }
    Err(match (min, max) {
        (Some(min), Some(max)) => format!("This field must be a number and have a value between {} and {}", min, max),
        (Some(min), None) => format!("This field must be a number and have a value of at least {}", min),
        (None, Some(max)) => format!("This field must be a number and have a value of at most {}", max),
        (None, None) => NUMBER_MESSAGE.to_string(),
    })
}

fn choice_matches(choice: &str, candidate: &Value) -> bool {
    match candidate {
        Value::String(text) => text == choice,
        other => other.to_string() == choice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(kind: SurveyQuestionKind) -> SurveyQuestion {
        SurveyQuestion {
            question_name: "Question".to_string(),
            question_description: String::new(),
            variable: "answer".to_string(),
            kind,
            required: false,
            min: None,
            max: None,
            default: Value::Null,
            choices: Vec::new(),
        }
    }

    #[test]
    fn blank_answer_fails_only_when_required() {
        let mut q = question(SurveyQuestionKind::Text);
        assert!(validate_answer(&q, &json!("")).is_ok());
        q.required = true;
        assert_eq!(validate_answer(&q, &json!("")), Err(BLANK_MESSAGE.to_string()));
        assert_eq!(validate_answer(&q, &Value::Null), Err(BLANK_MESSAGE.to_string()));
    }

    #[test]
    fn text_length_bounds_are_enforced() {
        let mut q = question(SurveyQuestionKind::Password);
        q.min = Some(3.0);
        q.max = Some(5.0);
        assert_eq!(
            validate_answer(&q, &json!("ab")),
            Err("This field must be at least 3 characters".to_string())
        );
        assert_eq!(
            validate_answer(&q, &json!("abcdef")),
            Err("This field must not exceed 5 characters".to_string())
        );
        assert!(validate_answer(&q, &json!("abcd")).is_ok());
    }

    #[test]
    fn integer_answers_accept_numeric_text_and_check_range() {
        let mut q = question(SurveyQuestionKind::Integer);
        q.min = Some(1.0);
        q.max = Some(10.0);
        assert!(validate_answer(&q, &json!("7")).is_ok());
        assert_eq!(validate_answer(&q, &json!("7.5")), Err(INTEGER_MESSAGE.to_string()));
        assert_eq!(
            validate_answer(&q, &json!(11)),
            Err("This field must be a number and have a value between 1 and 10".to_string())
        );
    }

    #[test]
    fn float_answers_reject_text() {
        let q = question(SurveyQuestionKind::Float);
        assert!(validate_answer(&q, &json!(2.5)).is_ok());
        assert_eq!(validate_answer(&q, &json!("abc")), Err(NUMBER_MESSAGE.to_string()));
    }

    #[test]
    fn choices_must_be_known() {
        let mut q = question(SurveyQuestionKind::MultiSelect);
        q.choices = vec!["a".to_string(), "b".to_string()];
        assert!(validate_answer(&q, &json!(["a", "b"])).is_ok());
        assert_eq!(validate_answer(&q, &json!(["a", "c"])), Err(CHOICE_MESSAGE.to_string()));

        q.kind = SurveyQuestionKind::MultipleChoice;
        assert!(validate_answer(&q, &json!("b")).is_ok());
        assert_eq!(validate_answer(&q, &json!("z")), Err(CHOICE_MESSAGE.to_string()));
    }
}
