use indexmap::IndexMap;
use launchdeck_types::ResourceKind;
use serde_json::Value;

use super::{LookupStatus, PromptStep, StepContext, StepId, single_field};
use crate::error::ContentError;
use crate::form::FormState;
use crate::loader::OptionQuery;

pub const INVENTORY_FIELD: &str = "inventory";
pub const INVENTORY_REQUIRED_MESSAGE: &str = "An inventory must be selected";

/// Prompts for the inventory to run against.
#[derive(Debug, Clone)]
pub struct InventoryStep {
    default_inventory: Value,
    page_size: u32,
    status: LookupStatus,
}

impl InventoryStep {
    pub fn for_context(ctx: &StepContext<'_>) -> Option<Self> {
        if !ctx.config.ask_inventory_on_launch {
            return None;
        }
        let default_inventory = ctx
            .config
            .defaults
            .inventory
            .as_ref()
            .and_then(|inventory| serde_json::to_value(inventory).ok())
            .unwrap_or(Value::Null);
        Some(Self {
            default_inventory,
            page_size: ctx.options.page_size,
            status: LookupStatus::of(ctx, StepId::Inventory),
        })
    }
}

impl PromptStep for InventoryStep {
    fn id(&self) -> StepId {
        StepId::Inventory
    }

    fn field_names(&self) -> Vec<String> {
        vec![INVENTORY_FIELD.to_string()]
    }

    fn initial_values(&self) -> IndexMap<String, Value> {
        single_field(INVENTORY_FIELD, self.default_inventory.clone())
    }

    fn field_errors(&self, form: &FormState) -> IndexMap<String, String> {
        let mut errors = IndexMap::new();
        if form.value(INVENTORY_FIELD).get("id").is_none() {
            errors.insert(INVENTORY_FIELD.to_string(), INVENTORY_REQUIRED_MESSAGE.to_string());
        }
        errors
    }

    fn is_ready(&self) -> bool {
        self.status.is_ready()
    }

    fn content_error(&self) -> Option<&ContentError> {
        self.status.content_error()
    }

    fn option_query(&self) -> Option<OptionQuery> {
        Some(OptionQuery::first_page(ResourceKind::Inventories, self.page_size).with_param("role_level", "use_role"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::test_support::Fixture;
    use launchdeck_types::NamedResource;
    use serde_json::json;

    #[test]
    fn absent_unless_prompted() {
        let fixture = Fixture::default();
        assert!(InventoryStep::for_context(&fixture.ctx()).is_none());
    }

    #[test]
    fn seeds_default_and_requires_selection() {
        let mut fixture = Fixture::default();
        fixture.config.ask_inventory_on_launch = true;
        fixture.config.defaults.inventory = Some(NamedResource {
            id: 2,
            name: "Demo Inventory".to_string(),
        });
        let step = InventoryStep::for_context(&fixture.ctx()).expect("step present");

        let initial = step.initial_values();
        assert_eq!(initial[INVENTORY_FIELD], json!({"id": 2, "name": "Demo Inventory"}));
        assert!(!step.is_ready());

        let mut form = FormState::new(initial);
        assert!(step.field_errors(&form).is_empty());
        form.set(INVENTORY_FIELD, Value::Null);
        assert_eq!(
            step.field_errors(&form).get(INVENTORY_FIELD).map(String::as_str),
            Some(INVENTORY_REQUIRED_MESSAGE)
        );
    }
}
