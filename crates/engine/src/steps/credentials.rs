use indexmap::IndexMap;
use launchdeck_types::{Credential, ResourceKind};
use serde_json::Value;
use tracing::warn;

use super::{LookupStatus, PromptStep, StepContext, StepId, single_field};
use crate::credentials::validate_credentials;
use crate::error::ContentError;
use crate::form::FormState;
use crate::loader::OptionQuery;

pub const CREDENTIALS_FIELD: &str = "credentials";

/// Credentials currently held by the form. Malformed entries are skipped.
pub fn selected_credentials(form: &FormState) -> Vec<Credential> {
    match form.value(CREDENTIALS_FIELD) {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match serde_json::from_value::<Credential>(item.clone()) {
                Ok(credential) => Some(credential),
                Err(error) => {
                    warn!(%error, "ignoring malformed credential in form state");
                    None
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Credential selection, checked against the template's defaults.
#[derive(Debug, Clone)]
pub struct CredentialsStep {
    defaults: Vec<Credential>,
    allow_password_prompting: bool,
    page_size: u32,
    status: LookupStatus,
}

impl CredentialsStep {
    pub fn for_context(ctx: &StepContext<'_>) -> Option<Self> {
        if !ctx.config.ask_credential_on_launch {
            return None;
        }
        let defaults = if ctx.side_data.default_credentials.is_empty() {
            ctx.config
                .defaults
                .credentials
                .iter()
                .map(|default| default.to_credential())
                .collect()
        } else {
            ctx.side_data.default_credentials.clone()
        };
        Some(Self {
            defaults,
            allow_password_prompting: ctx.options.allow_credentials_with_passwords,
            page_size: ctx.options.page_size,
            status: LookupStatus::of(ctx, StepId::Credentials),
        })
    }
}

impl PromptStep for CredentialsStep {
    fn id(&self) -> StepId {
        StepId::Credentials
    }

    fn field_names(&self) -> Vec<String> {
        vec![CREDENTIALS_FIELD.to_string()]
    }

    fn initial_values(&self) -> IndexMap<String, Value> {
        let defaults = serde_json::to_value(&self.defaults).unwrap_or(Value::Array(Vec::new()));
        single_field(CREDENTIALS_FIELD, defaults)
    }

    fn field_errors(&self, form: &FormState) -> IndexMap<String, String> {
        let selected = selected_credentials(form);
        validate_credentials(self.allow_password_prompting, &selected, &self.defaults)
            .map(|message| IndexMap::from([(CREDENTIALS_FIELD.to_string(), message)]))
            .unwrap_or_default()
    }

    fn is_ready(&self) -> bool {
        self.status.is_ready()
    }

    fn content_error(&self) -> Option<&ContentError> {
        self.status.content_error()
    }

    /// Credential types feed the type picker of the credential lookup.
    fn option_query(&self) -> Option<OptionQuery> {
        Some(OptionQuery::first_page(ResourceKind::CredentialTypes, self.page_size))
    }
}
