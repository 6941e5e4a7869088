//! Credential shapes and the `"ASK"` password-prompt convention.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::NamedResource;

/// Sentinel stored in a credential input when the secret is supplied at launch.
pub const ASK: &str = "ASK";

/// Password-bearing credential inputs that may hold the [`ASK`] sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordField {
    Password,
    BecomePassword,
    SshKeyUnlock,
    VaultPassword,
}

impl PasswordField {
    pub const ALL: [PasswordField; 4] = [
        PasswordField::Password,
        PasswordField::BecomePassword,
        PasswordField::SshKeyUnlock,
        PasswordField::VaultPassword,
    ];

    /// Key of the field inside a credential's `inputs`.
    pub fn input_key(self) -> &'static str {
        match self {
            PasswordField::Password => "password",
            PasswordField::BecomePassword => "become_password",
            PasswordField::SshKeyUnlock => "ssh_key_unlock",
            PasswordField::VaultPassword => "vault_password",
        }
    }

    /// Key used under `credential_passwords` in the launch form and payload.
    /// The machine `password` input is submitted as `ssh_password`.
    pub fn launch_key(self) -> &'static str {
        match self {
            PasswordField::Password => "ssh_password",
            other => other.input_key(),
        }
    }

    /// Parses a `passwords_needed` entry. Vault entries may carry a
    /// `.vault_id` suffix, which is returned alongside.
    pub fn from_needed(entry: &str) -> Option<(PasswordField, Option<&str>)> {
        let (name, vault_id) = match entry.split_once('.') {
            Some((name, vault_id)) => (name, Some(vault_id)),
            None => (entry, None),
        };
        let field = match name {
            "ssh_password" | "password" => PasswordField::Password,
            "become_password" => PasswordField::BecomePassword,
            "ssh_key_unlock" => PasswordField::SshKeyUnlock,
            "vault_password" => PasswordField::VaultPassword,
            _ => return None,
        };
        Some((field, vault_id.filter(|id| !id.is_empty())))
    }
}

/// Secret-bearing and free-form inputs of a credential.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialInputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub become_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_unlock: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_id: Option<String>,
    #[serde(flatten)]
    pub other: IndexMap<String, Value>,
}

impl CredentialInputs {
    pub fn get(&self, field: PasswordField) -> Option<&str> {
        match field {
            PasswordField::Password => self.password.as_deref(),
            PasswordField::BecomePassword => self.become_password.as_deref(),
            PasswordField::SshKeyUnlock => self.ssh_key_unlock.as_deref(),
            PasswordField::VaultPassword => self.vault_password.as_deref(),
        }
    }

    /// Password fields set to [`ASK`], in input order.
    pub fn prompted_fields(&self) -> Vec<PasswordField> {
        PasswordField::ALL
            .into_iter()
            .filter(|field| self.get(*field) == Some(ASK))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialSummaryFields {
    #[serde(default)]
    pub credential_type: Option<NamedResource>,
}

/// A credential as returned by the credentials collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub credential_type: i64,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub inputs: CredentialInputs,
    #[serde(default)]
    pub summary_fields: CredentialSummaryFields,
}

impl Credential {
    /// True when any password-bearing input holds the [`ASK`] sentinel.
    pub fn prompts_for_password(&self) -> bool {
        !self.inputs.prompted_fields().is_empty()
    }

    /// The vault id, treating an empty string as absent.
    pub fn vault_id(&self) -> Option<&str> {
        self.inputs.vault_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Key under which at most one credential may be selected.
    pub fn selection_key(&self) -> (i64, Option<&str>) {
        (self.credential_type, self.vault_id())
    }

    /// Human-readable credential type name.
    pub fn type_name(&self) -> String {
        if let Some(credential_type) = &self.summary_fields.credential_type
            && !credential_type.name.is_empty()
        {
            return credential_type.name.clone();
        }
        self.kind
            .clone()
            .unwrap_or_else(|| format!("Credential type {}", self.credential_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ask_in_any_password_field_prompts() {
        let credential: Credential = serde_json::from_value(json!({
            "id": 3,
            "name": "Vault",
            "credential_type": 3,
            "inputs": { "vault_password": "ASK", "vault_id": "prod" }
        }))
        .expect("credential parse");
        assert!(credential.prompts_for_password());
        assert_eq!(credential.inputs.prompted_fields(), vec![PasswordField::VaultPassword]);
        assert_eq!(credential.selection_key(), (3, Some("prod")));
    }

    #[test]
    fn username_ask_does_not_count_as_password_prompt() {
        let credential: Credential = serde_json::from_value(json!({
            "id": 1,
            "name": "Machine",
            "credential_type": 1,
            "inputs": { "username": "ASK", "password": "hunter2" }
        }))
        .expect("credential parse");
        assert!(!credential.prompts_for_password());
        assert_eq!(credential.inputs.other.get("username"), Some(&json!("ASK")));
    }

    #[test]
    fn needed_entries_map_to_fields() {
        assert_eq!(
            PasswordField::from_needed("ssh_password"),
            Some((PasswordField::Password, None))
        );
        assert_eq!(
            PasswordField::from_needed("vault_password.dev"),
            Some((PasswordField::VaultPassword, Some("dev")))
        );
        assert_eq!(PasswordField::from_needed("token"), None);
        assert_eq!(PasswordField::Password.launch_key(), "ssh_password");
    }

    #[test]
    fn type_name_prefers_summary_then_kind() {
        let mut credential: Credential = serde_json::from_value(json!({
            "id": 9,
            "credential_type": 5,
            "kind": "aws",
            "summary_fields": { "credential_type": { "id": 5, "name": "Amazon Web Services" } }
        }))
        .expect("credential parse");
        assert_eq!(credential.type_name(), "Amazon Web Services");
        credential.summary_fields.credential_type = None;
        assert_eq!(credential.type_name(), "aws");
        credential.kind = None;
        assert_eq!(credential.type_name(), "Credential type 5");
    }
}
