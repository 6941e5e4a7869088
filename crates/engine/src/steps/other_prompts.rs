use indexmap::IndexMap;
use serde_json::{Map, Value, json};

use super::{PromptStep, StepContext, StepId};
use crate::form::FormState;

pub const JOB_TYPE_FIELD: &str = "job_type";
pub const LIMIT_FIELD: &str = "limit";
pub const VERBOSITY_FIELD: &str = "verbosity";
pub const JOB_TAGS_FIELD: &str = "job_tags";
pub const SKIP_TAGS_FIELD: &str = "skip_tags";
pub const EXTRA_VARS_FIELD: &str = "extra_vars";
pub const SCM_BRANCH_FIELD: &str = "scm_branch";
pub const DIFF_MODE_FIELD: &str = "diff_mode";
pub const LABELS_FIELD: &str = "labels";
pub const FORKS_FIELD: &str = "forks";
pub const JOB_SLICE_COUNT_FIELD: &str = "job_slice_count";
pub const TIMEOUT_FIELD: &str = "timeout";

const JOB_TYPES: [&str; 2] = ["run", "check"];
const MAX_VERBOSITY: i64 = 4;

/// Parse an `extra_vars` document. YAML and JSON are both accepted; an empty
/// document (or a bare `---`) is an empty mapping.
pub fn parse_variables(text: &str) -> Result<Map<String, Value>, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "---" {
        return Ok(Map::new());
    }
    match serde_yaml::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err("Variables must be a YAML or JSON mapping".to_string()),
        Err(error) => Err(format!("Invalid YAML or JSON: {}", error)),
    }
}

/// Integer form values may still be text while the user is typing.
pub(crate) fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn check_minimum(value: &Value, minimum: i64) -> Option<String> {
    match as_integer(value) {
        None => Some("This field must be an integer".to_string()),
        Some(number) if number < minimum => {
            Some(format!("This field must be a number greater than or equal to {}", minimum))
        }
        Some(_) => None,
    }
}

/// Job type, limit, tags, variables and the other scalar launch knobs.
#[derive(Debug, Clone)]
pub struct OtherPromptsStep {
    initial: IndexMap<String, Value>,
}

impl OtherPromptsStep {
    pub fn for_context(ctx: &StepContext<'_>) -> Option<Self> {
        let config = ctx.config;
        if !config.asks_other_prompts() {
            return None;
        }
        let defaults = &config.defaults;
        let text = |value: &Option<String>| Value::String(value.clone().unwrap_or_default());

        let mut initial = IndexMap::new();
        if config.ask_job_type_on_launch {
            let job_type = defaults.job_type.clone().unwrap_or_else(|| "run".to_string());
            initial.insert(JOB_TYPE_FIELD.to_string(), Value::String(job_type));
        }
        if config.ask_limit_on_launch {
            initial.insert(LIMIT_FIELD.to_string(), text(&defaults.limit));
        }
        if config.ask_verbosity_on_launch {
            initial.insert(VERBOSITY_FIELD.to_string(), json!(defaults.verbosity.unwrap_or(0)));
        }
        if config.ask_tags_on_launch {
            initial.insert(JOB_TAGS_FIELD.to_string(), text(&defaults.job_tags));
        }
        if config.ask_skip_tags_on_launch {
            initial.insert(SKIP_TAGS_FIELD.to_string(), text(&defaults.skip_tags));
        }
        if config.ask_variables_on_launch {
            let variables = defaults
                .extra_vars
                .clone()
                .filter(|vars| !vars.trim().is_empty())
                .unwrap_or_else(|| "---\n".to_string());
            initial.insert(EXTRA_VARS_FIELD.to_string(), Value::String(variables));
        }
        if config.ask_scm_branch_on_launch {
            initial.insert(SCM_BRANCH_FIELD.to_string(), text(&defaults.scm_branch));
        }
        if config.ask_diff_mode_on_launch {
            initial.insert(DIFF_MODE_FIELD.to_string(), json!(defaults.diff_mode.unwrap_or(false)));
        }
        if config.ask_labels_on_launch {
            let labels = if defaults.labels.is_empty() {
                &ctx.side_data.labels
            } else {
                &defaults.labels
            };
            initial.insert(
                LABELS_FIELD.to_string(),
                serde_json::to_value(labels).unwrap_or(Value::Array(Vec::new())),
            );
        }
        if config.ask_forks_on_launch {
            initial.insert(FORKS_FIELD.to_string(), json!(defaults.forks.unwrap_or(0)));
        }
        if config.ask_job_slice_count_on_launch {
            initial.insert(JOB_SLICE_COUNT_FIELD.to_string(), json!(defaults.job_slice_count.unwrap_or(1)));
        }
        if config.ask_timeout_on_launch {
            initial.insert(TIMEOUT_FIELD.to_string(), json!(defaults.timeout.unwrap_or(0)));
        }

        Some(Self { initial })
    }

    fn owns(&self, field: &str) -> bool {
        self.initial.contains_key(field)
    }
}

impl PromptStep for OtherPromptsStep {
    fn id(&self) -> StepId {
        StepId::OtherPrompts
    }

    fn field_names(&self) -> Vec<String> {
        self.initial.keys().cloned().collect()
    }

    fn initial_values(&self) -> IndexMap<String, Value> {
        self.initial.clone()
    }

    fn field_errors(&self, form: &FormState) -> IndexMap<String, String> {
        let mut errors = IndexMap::new();

        if self.owns(JOB_TYPE_FIELD) && !JOB_TYPES.contains(&form.text(JOB_TYPE_FIELD)) {
            errors.insert(
                JOB_TYPE_FIELD.to_string(),
                "Job type must be either run or check".to_string(),
            );
        }
        if self.owns(VERBOSITY_FIELD) {
            match as_integer(form.value(VERBOSITY_FIELD)) {
                Some(level) if (0..=MAX_VERBOSITY).contains(&level) => {}
                _ => {
                    errors.insert(
                        VERBOSITY_FIELD.to_string(),
                        format!("Verbosity must be between 0 and {}", MAX_VERBOSITY),
                    );
                }
            }
        }
        if self.owns(EXTRA_VARS_FIELD)
            && let Err(message) = parse_variables(form.text(EXTRA_VARS_FIELD))
        {
            errors.insert(EXTRA_VARS_FIELD.to_string(), message);
        }
        for (field, minimum) in [(FORKS_FIELD, 0), (TIMEOUT_FIELD, 0), (JOB_SLICE_COUNT_FIELD, 1)] {
            if self.owns(field)
                && let Some(message) = check_minimum(form.value(field), minimum)
            {
                errors.insert(field.to_string(), message);
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::test_support::Fixture;
    use launchdeck_types::Label;

    #[test]
    fn absent_without_any_flag() {
        let fixture = Fixture::default();
        assert!(OtherPromptsStep::for_context(&fixture.ctx()).is_none());
    }

    #[test]
    fn only_prompted_fields_are_owned() {
        let mut fixture = Fixture::default();
        fixture.config.ask_limit_on_launch = true;
        fixture.config.ask_variables_on_launch = true;
        fixture.config.defaults.limit = Some("webservers".to_string());

        let step = OtherPromptsStep::for_context(&fixture.ctx()).expect("step present");
        assert_eq!(step.field_names(), vec![LIMIT_FIELD.to_string(), EXTRA_VARS_FIELD.to_string()]);
        let initial = step.initial_values();
        assert_eq!(initial[LIMIT_FIELD], json!("webservers"));
        assert_eq!(initial[EXTRA_VARS_FIELD], json!("---\n"));
        assert!(step.field_errors(&FormState::new(initial)).is_empty());
    }

    #[test]
    fn labels_fall_back_to_side_data() {
        let mut fixture = Fixture::default();
        fixture.config.ask_labels_on_launch = true;
        fixture.side_data.labels = vec![Label {
            id: Some(3),
            name: "nightly".to_string(),
        }];

        let step = OtherPromptsStep::for_context(&fixture.ctx()).expect("step present");
        assert_eq!(step.initial_values()[LABELS_FIELD], json!([{ "id": 3, "name": "nightly" }]));
    }

    #[test]
    fn invalid_values_are_reported_per_field() {
        let mut fixture = Fixture::default();
        fixture.config.ask_job_type_on_launch = true;
        fixture.config.ask_verbosity_on_launch = true;
        fixture.config.ask_variables_on_launch = true;
        fixture.config.ask_forks_on_launch = true;
        fixture.config.ask_job_slice_count_on_launch = true;
        fixture.config.ask_timeout_on_launch = true;

        let step = OtherPromptsStep::for_context(&fixture.ctx()).expect("step present");
        let mut form = FormState::new(step.initial_values());
        assert!(step.field_errors(&form).is_empty());

        form.set(JOB_TYPE_FIELD, json!("deploy"));
        form.set(VERBOSITY_FIELD, json!(7));
        form.set(EXTRA_VARS_FIELD, json!("- just\n- a list\n"));
        form.set(FORKS_FIELD, json!("-1"));
        form.set(JOB_SLICE_COUNT_FIELD, json!(0));
        form.set(TIMEOUT_FIELD, json!("soon"));

        let errors = step.field_errors(&form);
        assert_eq!(errors.len(), 6);
        assert_eq!(errors[EXTRA_VARS_FIELD], "Variables must be a YAML or JSON mapping");
        assert_eq!(errors[TIMEOUT_FIELD], "This field must be an integer");
        assert_eq!(errors[JOB_SLICE_COUNT_FIELD], "This field must be a number greater than or equal to 1");
    }

    #[test]
    fn variables_accept_yaml_and_json() {
        assert_eq!(parse_variables("---").expect("empty"), Map::new());
        let yaml = parse_variables("region: us-east\nreplicas: 3\n").expect("yaml");
        assert_eq!(yaml["replicas"], json!(3));
        let json_doc = parse_variables(r#"{"debug": true}"#).expect("json");
        assert_eq!(json_doc["debug"], json!(true));
        assert!(parse_variables("key: [unclosed").is_err());
    }
}
