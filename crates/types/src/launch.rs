//! Launch configuration as served by `GET <template>/launch/`.

use serde::{Deserialize, Serialize};

use crate::{Credential, CredentialInputs, Label, NamedResource};

/// Server-declared capability descriptor of a launchable template.
///
/// Every `ask_*_on_launch` flag enables one prompt; `defaults` carries the
/// template's current value for each promptable field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfiguration {
    pub ask_inventory_on_launch: bool,
    pub ask_credential_on_launch: bool,
    pub ask_execution_environment_on_launch: bool,
    pub ask_instance_groups_on_launch: bool,
    pub ask_variables_on_launch: bool,
    pub ask_tags_on_launch: bool,
    pub ask_skip_tags_on_launch: bool,
    pub ask_limit_on_launch: bool,
    pub ask_verbosity_on_launch: bool,
    pub ask_job_type_on_launch: bool,
    pub ask_scm_branch_on_launch: bool,
    pub ask_diff_mode_on_launch: bool,
    pub ask_labels_on_launch: bool,
    pub ask_forks_on_launch: bool,
    pub ask_job_slice_count_on_launch: bool,
    pub ask_timeout_on_launch: bool,
    pub survey_enabled: bool,
    pub passwords_needed_to_start: Vec<String>,
    pub variables_needed_to_start: Vec<String>,
    pub can_start_without_user_input: bool,
    pub defaults: LaunchDefaults,
}

impl LaunchConfiguration {
    /// True when at least one field of the "other prompts" group is promptable.
    pub fn asks_other_prompts(&self) -> bool {
        self.ask_job_type_on_launch
            || self.ask_limit_on_launch
            || self.ask_verbosity_on_launch
            || self.ask_tags_on_launch
            || self.ask_skip_tags_on_launch
            || self.ask_variables_on_launch
            || self.ask_scm_branch_on_launch
            || self.ask_diff_mode_on_launch
            || self.ask_labels_on_launch
            || self.ask_forks_on_launch
            || self.ask_job_slice_count_on_launch
            || self.ask_timeout_on_launch
    }
}

/// Template defaults for each promptable field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchDefaults {
    pub inventory: Option<NamedResource>,
    pub credentials: Vec<DefaultCredential>,
    pub execution_environment: Option<NamedResource>,
    pub extra_vars: Option<String>,
    pub job_tags: Option<String>,
    pub skip_tags: Option<String>,
    pub limit: Option<String>,
    pub verbosity: Option<i64>,
    pub job_type: Option<String>,
    pub scm_branch: Option<String>,
    pub diff_mode: Option<bool>,
    pub labels: Vec<Label>,
    pub forks: Option<i64>,
    pub job_slice_count: Option<i64>,
    pub timeout: Option<i64>,
}

/// Unresolved default credential reference from the launch endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultCredential {
    pub id: i64,
    pub name: String,
    pub credential_type: i64,
    pub passwords_needed: Vec<String>,
    pub vault_id: Option<String>,
}

impl DefaultCredential {
    /// A credential carrying only what the launch endpoint knows. Its
    /// inputs are empty, so password needs come from `passwords_needed`.
    pub fn to_credential(&self) -> Credential {
        Credential {
            id: self.id,
            name: self.name.clone(),
            credential_type: self.credential_type,
            kind: None,
            inputs: CredentialInputs {
                vault_id: self.vault_id.clone(),
                ..CredentialInputs::default()
            },
            summary_fields: Default::default(),
        }
    }
}

/// Data the surrounding screen fetched alongside the launch configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchSideData {
    pub labels: Vec<Label>,
    pub instance_groups: Vec<NamedResource>,
    /// Fully resolved default credentials of the template.
    pub default_credentials: Vec<Credential>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_flags_default_to_false() {
        let config: LaunchConfiguration = serde_yaml::from_str(
            r#"
ask_limit_on_launch: true
passwords_needed_to_start: [ssh_password]
defaults:
  limit: webservers
  credentials:
    - id: 4
      name: Machine
      credential_type: 1
      passwords_needed: [ssh_password]
"#,
        )
        .expect("config parse");

        assert!(!config.ask_inventory_on_launch);
        assert!(config.asks_other_prompts());
        assert_eq!(config.defaults.limit.as_deref(), Some("webservers"));
        assert_eq!(config.defaults.credentials[0].passwords_needed, vec!["ssh_password".to_string()]);
    }

    #[test]
    fn no_flags_means_no_other_prompts() {
        assert!(!LaunchConfiguration::default().asks_other_prompts());
    }
}
