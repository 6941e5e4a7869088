//! Resource endpoints used by the launch and schedule flows.

use anyhow::{Context, Result};
use launchdeck_types::{
    Credential, Label, LaunchConfiguration, ListResponse, NamedResource, OptionsResponse, Resource, ResourceKind,
    SurveySpec, TemplateKind,
};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::ControllerClient;

/// Page size used when pulling related collections in full.
const RELATED_PAGE_SIZE: &str = "200";

impl ControllerClient {
    /// `GET` one page of a collection.
    pub async fn read_list(&self, kind: ResourceKind, params: &[(String, String)]) -> Result<ListResponse<Value>> {
        let list: ListResponse<Value> = self.get_json(kind.collection_path(), params).await?;
        debug!(%kind, count = list.count, returned = list.results.len(), "read collection");
        Ok(list)
    }

    /// `OPTIONS` on a collection, used to discover searchable fields.
    pub async fn read_options(&self, kind: ResourceKind) -> Result<OptionsResponse> {
        self.options_json(kind.collection_path()).await
    }

    pub async fn read_template(&self, kind: TemplateKind, id: i64) -> Result<Resource> {
        let path = format!("{}{}/", kind.collection_path(), id);
        let mut resource: Resource = self.get_json(&path, &[]).await?;
        resource.kind = kind;
        Ok(resource)
    }

    pub async fn read_launch(&self, resource: &Resource) -> Result<LaunchConfiguration> {
        let path = format!("{}launch/", resource.detail_path());
        self.get_json(&path, &[])
            .await
            .with_context(|| format!("read launch configuration of {}", resource.name))
    }

    pub async fn read_survey(&self, resource: &Resource) -> Result<SurveySpec> {
        let path = format!("{}survey_spec/", resource.detail_path());
        self.get_json(&path, &[]).await
    }

    /// Fully resolved default credentials of a template.
    pub async fn read_template_credentials(&self, resource: &Resource) -> Result<Vec<Credential>> {
        let path = format!("{}credentials/", resource.detail_path());
        let list: ListResponse<Credential> = self.get_json(&path, &related_params()).await?;
        Ok(list.results)
    }

    pub async fn read_template_labels(&self, resource: &Resource) -> Result<Vec<Label>> {
        let path = format!("{}labels/", resource.detail_path());
        let list: ListResponse<Label> = self.get_json(&path, &related_params()).await?;
        Ok(list.results)
    }

    /// Instance groups are only exposed on job templates.
    pub async fn read_template_instance_groups(&self, resource: &Resource) -> Result<Vec<NamedResource>> {
        if resource.kind != TemplateKind::JobTemplate {
            return Ok(Vec::new());
        }
        let path = format!("{}instance_groups/", resource.detail_path());
        let list: ListResponse<NamedResource> = self.get_json(&path, &related_params()).await?;
        Ok(list.results)
    }

    pub async fn create_label(&self, name: &str, organization: i64) -> Result<Label> {
        let label: Label = self
            .post_json(
                ResourceKind::Labels.collection_path(),
                &json!({ "name": name, "organization": organization }),
            )
            .await
            .with_context(|| format!("create label '{}'", name))?;
        info!(label = %label.name, id = ?label.id, "created label");
        Ok(label)
    }

    pub async fn launch(&self, resource: &Resource, payload: &Value) -> Result<Value> {
        let path = format!("{}launch/", resource.detail_path());
        self.post_json(&path, payload).await
    }

    pub async fn create_schedule(&self, resource: &Resource, payload: &Value) -> Result<Value> {
        let path = format!("{}schedules/", resource.detail_path());
        let created: Value = self.post_json(&path, payload).await?;
        info!(template = resource.id, schedule = ?created.get("id"), "created schedule");
        Ok(created)
    }

    pub async fn read_schedule(&self, id: i64) -> Result<Value> {
        self.get_json(&schedule_path(id), &[]).await
    }

    pub async fn update_schedule(&self, id: i64, payload: &Value) -> Result<Value> {
        self.patch_json(&schedule_path(id), payload).await
    }
}

fn schedule_path(id: i64) -> String {
    format!("/api/v2/schedules/{}/", id)
}

fn related_params() -> Vec<(String, String)> {
    vec![("page_size".to_string(), RELATED_PAGE_SIZE.to_string())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_paths_are_absolute_with_trailing_slash() {
        assert_eq!(schedule_path(42), "/api/v2/schedules/42/");
    }
}
