use indexmap::IndexMap;
use launchdeck_types::ResourceKind;
use serde_json::Value;

use super::{LookupStatus, PromptStep, StepContext, StepId, single_field};
use crate::error::ContentError;
use crate::form::FormState;
use crate::loader::OptionQuery;

pub const INSTANCE_GROUPS_FIELD: &str = "instance_groups";

/// Ordered instance group override.
#[derive(Debug, Clone)]
pub struct InstanceGroupsStep {
    current_groups: Value,
    page_size: u32,
    status: LookupStatus,
}

impl InstanceGroupsStep {
    pub fn for_context(ctx: &StepContext<'_>) -> Option<Self> {
        if !ctx.config.ask_instance_groups_on_launch {
            return None;
        }
        Some(Self {
            current_groups: serde_json::to_value(&ctx.side_data.instance_groups).unwrap_or(Value::Array(Vec::new())),
            page_size: ctx.options.page_size,
            status: LookupStatus::of(ctx, StepId::InstanceGroups),
        })
    }
}

impl PromptStep for InstanceGroupsStep {
    fn id(&self) -> StepId {
        StepId::InstanceGroups
    }

    fn field_names(&self) -> Vec<String> {
        vec![INSTANCE_GROUPS_FIELD.to_string()]
    }

    fn initial_values(&self) -> IndexMap<String, Value> {
        single_field(INSTANCE_GROUPS_FIELD, self.current_groups.clone())
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

    fn option_query(&self) -> Option<OptionQuery> {
        Some(OptionQuery::first_page(ResourceKind::InstanceGroups, self.page_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::test_support::Fixture;
    use launchdeck_types::NamedResource;
    use serde_json::json;

    #[test]
    fn seeds_groups_from_side_data() {
        let mut fixture = Fixture::default();
        fixture.config.ask_instance_groups_on_launch = true;
        fixture.side_data.instance_groups = vec![NamedResource {
            id: 1,
            name: "default".to_string(),
        }];

        let step = InstanceGroupsStep::for_context(&fixture.ctx()).expect("step present");
        assert_eq!(step.initial_values()[INSTANCE_GROUPS_FIELD], json!([{"id": 1, "name": "default"}]));
    }
}
