//! Shared data model for the launch console.
//!
//! Everything in this crate is plain serde data: the launch configuration a
//! template declares, credentials and their password prompts, survey
//! definitions, the list/options envelopes returned by the controller API, and
//! the loosely typed schedule form values edited by users. Behaviour lives in
//! `launchdeck-engine`; this crate only describes shapes.

pub mod credential;
pub mod launch;
pub mod schedule;
pub mod survey;

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use credential::{ASK, Credential, CredentialInputs, PasswordField};
pub use launch::{DefaultCredential, LaunchConfiguration, LaunchDefaults, LaunchSideData};
pub use schedule::{FieldNumber, ScheduleFormValues};
pub use survey::{SurveyQuestion, SurveyQuestionKind, SurveySpec};

/// Collections the console reads option lists from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Credentials,
    CredentialTypes,
    ExecutionEnvironments,
    InstanceGroups,
    Inventories,
    Labels,
}

impl ResourceKind {
    /// API-relative collection path, including the trailing slash the
    /// controller insists on.
    pub fn collection_path(self) -> &'static str {
        match self {
            ResourceKind::Credentials => "/api/v2/credentials/",
            ResourceKind::CredentialTypes => "/api/v2/credential_types/",
            ResourceKind::ExecutionEnvironments => "/api/v2/execution_environments/",
            ResourceKind::InstanceGroups => "/api/v2/instance_groups/",
            ResourceKind::Inventories => "/api/v2/inventories/",
            ResourceKind::Labels => "/api/v2/labels/",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Credentials => "credentials",
            ResourceKind::CredentialTypes => "credential_types",
            ResourceKind::ExecutionEnvironments => "execution_environments",
            ResourceKind::InstanceGroups => "instance_groups",
            ResourceKind::Inventories => "inventories",
            ResourceKind::Labels => "labels",
        };
        f.write_str(name)
    }
}

/// Launchable template flavours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    #[default]
    JobTemplate,
    WorkflowJobTemplate,
}

impl TemplateKind {
    pub fn collection_path(self) -> &'static str {
        match self {
            TemplateKind::JobTemplate => "/api/v2/job_templates/",
            TemplateKind::WorkflowJobTemplate => "/api/v2/workflow_job_templates/",
        }
    }
}

/// The template (or template-derived object) being launched or scheduled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: TemplateKind,
    #[serde(default)]
    pub organization: Option<i64>,
}

impl Resource {
    /// Path of the template detail endpoint, e.g. `/api/v2/job_templates/7/`.
    pub fn detail_path(&self) -> String {
        format!("{}{}/", self.kind.collection_path(), self.id)
    }
}

/// A `{ id, name }` reference as found in summary fields and lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// A label attached to a launch. Labels typed by the user but not yet stored
/// on the server carry no id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

/// Paginated list envelope returned by collection endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

impl<T> Default for ListResponse<T> {
    fn default() -> Self {
        Self {
            count: 0,
            results: Vec::new(),
            next: None,
            previous: None,
        }
    }
}

/// Metadata returned by an `OPTIONS` request against a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsResponse {
    #[serde(default)]
    pub actions: OptionsActions,
    #[serde(default)]
    pub related_search_fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsActions {
    #[serde(rename = "GET", default)]
    pub get: IndexMap<String, FieldOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldOptions {
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl OptionsResponse {
    /// Field names that may be used as list filters, in server order.
    pub fn searchable_keys(&self) -> Vec<String> {
        self.actions
            .get
            .iter()
            .filter(|(_, options)| options.filterable)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Option data a lookup step fetched for its picker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupData {
    pub count: u64,
    pub results: Vec<Value>,
    pub searchable_keys: Vec<String>,
    pub related_search_keys: Vec<String>,
}

impl LookupData {
    pub fn from_responses(list: ListResponse<Value>, options: OptionsResponse) -> Self {
        Self {
            count: list.count,
            searchable_keys: options.searchable_keys(),
            related_search_keys: options.related_search_fields,
            results: list.results,
        }
    }
}

/// Account and branding context threaded explicitly into screens that need it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleContext {
    pub brand_name: String,
    pub is_superuser: bool,
    pub default_timezone: String,
}

impl Default for ConsoleContext {
    fn default() -> Self {
        Self {
            brand_name: "AWX".to_string(),
            is_superuser: false,
            default_timezone: "UTC".to_string(),
        }
    }
}
