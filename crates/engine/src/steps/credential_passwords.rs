//! Passwords for credentials that prompt at launch.
//!
//! The step appears when the template cannot prompt for credentials but
//! still needs passwords to start, or when a selected credential prompts for
//! one. Field names live under `credential_passwords.`; the machine
//! `password` input maps to `ssh_password`, and vault passwords of
//! credentials with a vault id are suffixed with `.<vault_id>`.

use indexmap::IndexMap;
use launchdeck_types::{Credential, PasswordField};
use serde_json::Value;

use super::{PromptStep, StepContext, StepId, selected_credentials};
use crate::form::FormState;

pub const PASSWORD_FIELD_PREFIX: &str = "credential_passwords.";
pub const PASSWORD_BLANK_MESSAGE: &str = "This field may not be blank";

fn field_path(field: PasswordField, vault_id: Option<&str>) -> String {
    match (field, vault_id) {
        (PasswordField::VaultPassword, Some(vault_id)) => {
            format!("{}{}.{}", PASSWORD_FIELD_PREFIX, field.launch_key(), vault_id)
        }
        _ => format!("{}{}", PASSWORD_FIELD_PREFIX, field.launch_key()),
    }
}

fn prompted_paths(credential: &Credential) -> Vec<String> {
    credential
        .inputs
        .prompted_fields()
        .into_iter()
        .map(|field| field_path(field, credential.vault_id()))
        .collect()
}

fn needed_paths<'a>(entries: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    entries
        .into_iter()
        .filter_map(|entry| PasswordField::from_needed(entry))
        .map(|(field, vault_id)| field_path(field, vault_id))
        .collect()
}

fn push_unique(target: &mut Vec<String>, paths: Vec<String>) {
    for path in paths {
        if !target.contains(&path) {
            target.push(path);
        }
    }
}

#[derive(Debug, Clone)]
pub struct CredentialPasswordsStep {
    /// Every password field the launch needs, in credential order.
    required_fields: Vec<String>,
    /// Fields checked by validation.
    validated_fields: Vec<String>,
}

impl CredentialPasswordsStep {
    pub fn for_context(ctx: &StepContext<'_>) -> Option<Self> {
        let config = ctx.config;

        if !config.ask_credential_on_launch {
            if config.passwords_needed_to_start.is_empty() {
                return None;
            }
            // No credential is selected, so nothing is validated.
            return Some(Self {
                required_fields: needed_paths(&config.passwords_needed_to_start),
                validated_fields: Vec::new(),
            });
        }

        let selected = selected_credentials(ctx.form);
        let mut required_fields = Vec::new();
        for credential in &selected {
            if credential.prompts_for_password() {
                push_unique(&mut required_fields, prompted_paths(credential));
            } else if let Some(default) = config
                .defaults
                .credentials
                .iter()
                .find(|default| default.id == credential.id)
            {
                push_unique(&mut required_fields, needed_paths(&default.passwords_needed));
            }
        }
        if required_fields.is_empty() {
            return None;
        }

        let validated_fields = selected.first().map(prompted_paths).unwrap_or_default();
        Some(Self {
            required_fields,
            validated_fields,
        })
    }

    /// Launch payload keys (without the `credential_passwords.` prefix)
    /// mapped to the entered passwords. Blank entries are left out.
    pub fn passwords(&self, form: &FormState) -> IndexMap<String, String> {
        self.required_fields
            .iter()
            .filter_map(|path| {
                let value = form.text(path);
                let key = path.strip_prefix(PASSWORD_FIELD_PREFIX)?;
                (!value.is_empty()).then(|| (key.to_string(), value.to_string()))
            })
            .collect()
    }
}

impl PromptStep for CredentialPasswordsStep {
    fn id(&self) -> StepId {
        StepId::CredentialPasswords
    }

    fn field_names(&self) -> Vec<String> {
        self.required_fields.clone()
    }

    fn initial_values(&self) -> IndexMap<String, Value> {
        self.required_fields
            .iter()
            .map(|path| (path.clone(), Value::String(String::new())))
            .collect()
    }

    fn field_errors(&self, form: &FormState) -> IndexMap<String, String> {
        self.validated_fields
            .iter()
            .filter(|path| matches!(form.value(path), Value::Null) || form.value(path).as_str() == Some(""))
            .map(|path| (path.clone(), PASSWORD_BLANK_MESSAGE.to_string()))
            .collect()
    }
}
