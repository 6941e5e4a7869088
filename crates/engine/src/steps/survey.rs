use indexmap::IndexMap;
use launchdeck_types::survey::validate_answer;
use launchdeck_types::{SurveyQuestion, SurveySpec};
use serde_json::{Map, Value};

use super::{PromptStep, StepContext, StepId};
use crate::form::FormState;

/// One field per survey question, named `survey_<variable>`.
#[derive(Debug, Clone)]
pub struct SurveyStep {
    questions: Vec<SurveyQuestion>,
}

impl SurveyStep {
    pub fn for_context(ctx: &StepContext<'_>) -> Option<Self> {
        if !ctx.config.survey_enabled {
            return None;
        }
        let survey = ctx.survey.filter(|survey| !survey.spec.is_empty())?;
        Some(Self::new(survey))
    }

    pub fn new(survey: &SurveySpec) -> Self {
        Self {
            questions: survey.spec.clone(),
        }
    }

    /// Answers keyed by variable name, ready to merge into `extra_vars`.
    /// Unanswered optional questions are left out.
    pub fn answers(&self, form: &FormState) -> Map<String, Value> {
        self.questions
            .iter()
            .filter_map(|question| {
                let value = form.value(&question.field_name());
                match value {
                    Value::Null => None,
                    Value::String(text) if text.is_empty() && !question.required => None,
                    _ => Some((question.variable.clone(), value.clone())),
                }
            })
            .collect()
    }
}

impl PromptStep for SurveyStep {
    fn id(&self) -> StepId {
        StepId::Survey
    }

    fn field_names(&self) -> Vec<String> {
        self.questions.iter().map(SurveyQuestion::field_name).collect()
    }

    fn initial_values(&self) -> IndexMap<String, Value> {
        self.questions
            .iter()
            .map(|question| (question.field_name(), question.initial_value()))
            .collect()
    }

    fn field_errors(&self, form: &FormState) -> IndexMap<String, String> {
        self.questions
            .iter()
            .filter_map(|question| {
                let field = question.field_name();
                validate_answer(question, form.value(&field))
                    .err()
                    .map(|message| (field, message))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::test_support::Fixture;
    use serde_json::json;

    fn survey() -> SurveySpec {
        serde_json::from_value(json!({
            "name": "Deploy",
            "spec": [
                { "variable": "release", "type": "text", "required": true, "min": 2, "max": 12 },
                { "variable": "replicas", "type": "integer", "min": 1, "max": 5, "default": 2 },
                { "variable": "tier", "type": "multiplechoice", "choices": "web\ndb", "default": "web" },
                { "variable": "note", "type": "textarea" }
            ]
        }))
        .expect("survey parse")
    }

    #[test]
    fn present_only_when_enabled_with_questions() {
        let mut fixture = Fixture::default();
        fixture.survey = Some(survey());
        assert!(SurveyStep::for_context(&fixture.ctx()).is_none());

        fixture.config.survey_enabled = true;
        assert!(SurveyStep::for_context(&fixture.ctx()).is_some());

        fixture.survey = Some(SurveySpec::default());
        assert!(SurveyStep::for_context(&fixture.ctx()).is_none());
    }

    #[test]
    fn blank_required_answer_and_out_of_range_number() {
        let step = SurveyStep::new(&survey());
        let mut form = FormState::new(step.initial_values());
        assert_eq!(
            step.field_errors(&form),
            IndexMap::from([("survey_release".to_string(), "This field must not be blank".to_string())])
        );

        form.set("survey_release", json!("v1.2"));
        form.set("survey_replicas", json!(9));
        form.set("survey_tier", json!("cache"));
        let errors = step.field_errors(&form);
        assert_eq!(
            errors["survey_replicas"],
            "This field must be a number and have a value between 1 and 5"
        );
        assert_eq!(errors["survey_tier"], "This field must be one of the available choices");
    }

    #[test]
    fn answers_skip_unanswered_optional_questions() {
        let step = SurveyStep::new(&survey());
        let mut form = FormState::new(step.initial_values());
        form.set("survey_release", json!("v2"));

        let answers = step.answers(&form);
        assert_eq!(answers["release"], json!("v2"));
        assert_eq!(answers["replicas"], json!(2));
        assert_eq!(answers["tier"], json!("web"));
        assert!(!answers.contains_key("note"));
    }
}
