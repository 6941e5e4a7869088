use indexmap::IndexMap;
use launchdeck_types::ResourceKind;
use serde_json::Value;

use super::{LookupStatus, PromptStep, StepContext, StepId, single_field};
use crate::error::ContentError;
use crate::form::FormState;
use crate::loader::OptionQuery;

pub const EXECUTION_ENVIRONMENT_FIELD: &str = "execution_environment";

/// Optional execution environment override.
#[derive(Debug, Clone)]
pub struct ExecutionEnvironmentStep {
    default_environment: Value,
    organization: Option<i64>,
    page_size: u32,
    status: LookupStatus,
}

impl ExecutionEnvironmentStep {
    pub fn for_context(ctx: &StepContext<'_>) -> Option<Self> {
        if !ctx.config.ask_execution_environment_on_launch {
            return None;
        }
        Some(Self {
            default_environment: ctx
                .config
                .defaults
                .execution_environment
                .as_ref()
                .and_then(|environment| serde_json::to_value(environment).ok())
                .unwrap_or(Value::Null),
            organization: ctx.resource.organization,
            page_size: ctx.options.page_size,
            status: LookupStatus::of(ctx, StepId::ExecutionEnvironment),
        })
    }
}

impl PromptStep for ExecutionEnvironmentStep {
    fn id(&self) -> StepId {
        StepId::ExecutionEnvironment
    }

    fn field_names(&self) -> Vec<String> {
        vec![EXECUTION_ENVIRONMENT_FIELD.to_string()]
    }

    fn initial_values(&self) -> IndexMap<String, Value> {
        single_field(EXECUTION_ENVIRONMENT_FIELD, self.default_environment.clone())
    }

    fn field_errors(&self, _form: &FormState) -> IndexMap<String, String> {
        IndexMap::new()
    }

    fn is_ready(&self) -> bool {
        self.status.is_ready()
    }

    fn content_error(&self) -> Option<&ContentError> {
        self.status.content_error()
    }

    /// Global environments plus those of the template's organization.
    fn option_query(&self) -> Option<OptionQuery> {
        let query = OptionQuery::first_page(ResourceKind::ExecutionEnvironments, self.page_size);
        Some(match self.organization {
            Some(organization) => query
                .with_param("or__organization__isnull", "True")
                .with_param("or__organization__id", organization.to_string()),
            None => query.with_param("organization__isnull", "True"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::test_support::Fixture;

    #[test]
    fn organization_scopes_the_lookup() {
        let mut fixture = Fixture::default();
        fixture.config.ask_execution_environment_on_launch = true;
        fixture.resource.organization = Some(7);

        let step = ExecutionEnvironmentStep::for_context(&fixture.ctx()).expect("step present");
        let query = step.option_query().expect("query");
        assert!(query.params.contains(&("or__organization__id".to_string(), "7".to_string())));
        assert_eq!(step.initial_values()[EXECUTION_ENVIRONMENT_FIELD], Value::Null);
        assert!(step.field_errors(&FormState::default()).is_empty());
    }
}
