//! Credential compatibility rules.
//!
//! Two rules apply to a credential selection, checked in order, and only
//! the first one with violations reports:
//!
//! 1. Every default credential of the template must be replaced by a
//!    selected credential of the same type (and the same vault id for
//!    vault credentials).
//! 2. When password prompting is not allowed (schedules, workflow nodes),
//!    no selected credential may hold an `ASK` password input.

use launchdeck_types::Credential;
use tracing::debug;

/// Validate a credential selection against the template defaults.
///
/// Returns the error message to attach to the `credentials` field, or
/// `None` when the selection is acceptable.
pub fn validate_credentials(
    allow_password_prompting: bool,
    selected: &[Credential],
    defaults: &[Credential],
) -> Option<String> {
    let missing_types: Vec<String> = defaults
        .iter()
        .filter(|default| !selected.iter().any(|candidate| covers_default(candidate, default)))
        .map(|default| match default.vault_id() {
            Some(vault_id) => format!("{} | {}", default.type_name(), vault_id),
            None => default.type_name(),
        })
        .collect();
    if !missing_types.is_empty() {
        debug!(missing = missing_types.len(), "default credentials not replaced");
        return Some(format!(
            "Job Template default credentials must be replaced with one of the same type. \
             Please select a credential for the following types in order to proceed: {}",
            missing_types.join(", ")
        ));
    }

    if !allow_password_prompting {
        let prompting: Vec<&str> = selected
            .iter()
            .filter(|credential| credential.prompts_for_password())
            .map(|credential| credential.name.as_str())
            .collect();
        if !prompting.is_empty() {
            return Some(format!(
                "Credentials that require passwords on launch are not permitted. \
                 Please remove or replace the following credentials with a credential of the same type in order to proceed: {}",
                prompting.join(", ")
            ));
        }
    }

    None
}

fn covers_default(candidate: &Credential, default: &Credential) -> bool {
    candidate.credential_type == default.credential_type && candidate.vault_id() == default.vault_id()
}

/// Add `credential` to a selection, replacing any credential that shares
/// its type and vault id. Vault credentials with distinct vault ids
/// coexist.
pub fn select_credential(selected: &mut Vec<Credential>, credential: Credential) {
    match selected
        .iter()
        .position(|existing| existing.selection_key() == credential.selection_key())
    {
        Some(index) => selected[index] = credential,
        None => selected.push(credential),
    }
}

/// Remove the credential with `id` from a selection.
pub fn deselect_credential(selected: &mut Vec<Credential>, id: i64) {
    selected.retain(|credential| credential.id != id);
}
