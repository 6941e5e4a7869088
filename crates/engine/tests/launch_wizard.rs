use std::sync::Mutex;

use anyhow::{Result, bail};
use async_trait::async_trait;
use launchdeck_engine::{
    LabelStore, LaunchWizard, OptionSource, StepId, WizardError, WizardInput, WizardOptions, WizardPhase,
};
use launchdeck_types::{
    Credential, Label, LaunchConfiguration, ListResponse, LookupData, OptionsResponse, Resource, ResourceKind,
    SurveySpec,
};
use serde_json::{Value, json};

#[derive(Default)]
struct StubSource {
    failing: Option<ResourceKind>,
    reads: Mutex<Vec<ResourceKind>>,
}

#[async_trait]
impl OptionSource for StubSource {
    async fn read(&self, kind: ResourceKind, _params: &[(String, String)]) -> Result<ListResponse<Value>> {
        self.reads.lock().expect("reads lock").push(kind);
        if self.failing == Some(kind) {
            bail!("{} is unavailable", kind);
        }
        Ok(ListResponse {
            count: 1,
            results: vec![json!({ "id": 1, "name": format!("first {}", kind) })],
            ..ListResponse::default()
        })
    }

    async fn read_options(&self, _kind: ResourceKind) -> Result<OptionsResponse> {
        Ok(serde_json::from_value(json!({
            "actions": { "GET": { "name": { "filterable": true } } },
            "related_search_fields": ["created_by__search"]
        }))?)
    }
}

struct StubLabels;

#[async_trait]
impl LabelStore for StubLabels {
    async fn create_label(&self, name: &str, organization: i64) -> Result<Label> {
        assert_eq!(organization, 2);
        Ok(Label {
            id: Some(40 + name.len() as i64),
            name: name.to_string(),
        })
    }
}

fn input() -> WizardInput {
    let config: LaunchConfiguration =
        serde_json::from_str(include_str!("data/launch_config.json")).expect("launch config fixture");
    let survey: SurveySpec = serde_json::from_str(include_str!("data/survey.json")).expect("survey fixture");
    WizardInput {
        config,
        survey: Some(survey),
        resource: Resource {
            id: 7,
            name: "Deploy".to_string(),
            organization: Some(2),
            ..Resource::default()
        },
        ..WizardInput::default()
    }
}

fn prompting_credential() -> Credential {
    serde_json::from_value(json!({
        "id": 7,
        "name": "Ops Machine",
        "credential_type": 1,
        "inputs": { "username": "ops", "password": "ASK" }
    }))
    .expect("credential")
}

#[tokio::test]
async fn launch_flow_collects_every_prompt() {
    let mut wizard = LaunchWizard::new(input(), WizardOptions::default());
    assert_eq!(wizard.phase(), WizardPhase::Loading);

    let source = StubSource::default();
    wizard.load(&source).await.expect("options load");
    assert_eq!(wizard.phase(), WizardPhase::Ready);
    let mut reads = source.reads.lock().expect("reads lock").clone();
    reads.sort_by_key(|kind| kind.to_string());
    assert_eq!(reads, vec![ResourceKind::CredentialTypes, ResourceKind::Inventories]);

    let steps: Vec<StepId> = wizard.steps().iter().map(|view| view.id).collect();
    assert_eq!(
        steps,
        vec![
            StepId::Inventory,
            StepId::Credentials,
            StepId::CredentialPasswords,
            StepId::OtherPrompts,
            StepId::Survey,
            StepId::Preview,
        ]
    );
    assert_eq!(wizard.current_step(), Some(StepId::Inventory));
    assert_eq!(wizard.form().value("limit"), &json!("all"));
    assert_eq!(
        wizard.lookup(StepId::Inventory).map(|lookup| lookup.searchable_keys.clone()),
        Some(vec!["name".to_string()])
    );

    wizard.go_to(StepId::Preview).expect("jump to preview");
    assert!(wizard.has_errors());
    assert!(wizard.form().error("survey_region").is_some());
    assert!(matches!(wizard.submit(&StubLabels).await, Err(WizardError::HasErrors)));

    wizard.set_value("survey_region", json!("us")).expect("answer region");
    wizard.select_credential(prompting_credential()).expect("select credential");
    assert!(wizard.has_errors());
    wizard
        .set_value("credential_passwords.ssh_password", json!("secret"))
        .expect("password");
    wizard
        .set_value("labels", json!([{ "id": 5, "name": "nightly" }, { "name": "hotfix" }]))
        .expect("labels");
    assert!(!wizard.has_errors());

    let payload = wizard.submit(&StubLabels).await.expect("submit");
    assert_eq!(payload.inventory_id, Some(1));
    assert_eq!(payload.credentials, Some(vec![7]));
    assert_eq!(payload.credential_passwords.get("ssh_password").map(String::as_str), Some("secret"));
    assert_eq!(payload.limit.as_deref(), Some("all"));
    assert_eq!(payload.labels, Some(vec![5, 46]));
    assert_eq!(payload.extra_data.get("region"), Some(&json!("us")));
    assert_eq!(payload.extra_data.get("replicas"), Some(&json!(2)));
    let extra_vars = payload.extra_vars.as_deref().expect("extra vars");
    assert!(extra_vars.contains("region: us"));

    assert_eq!(wizard.phase(), WizardPhase::Closed);
    assert!(matches!(wizard.set_value("limit", json!("web")), Err(WizardError::Closed)));
}

#[test]
fn closing_drops_late_results() {
    let mut wizard = LaunchWizard::new(input(), WizardOptions::default());
    let tickets = wizard.pending_fetches();
    assert_eq!(tickets.len(), 2);

    wizard.close();
    assert!(!wizard.apply_fetch(&tickets[0], Ok(LookupData::default())));
    assert_eq!(wizard.phase(), WizardPhase::Closed);
    assert!(wizard.form().values().is_empty());
}

#[tokio::test]
async fn schedules_reject_prompting_credentials() {
    let options = WizardOptions {
        allow_credentials_with_passwords: false,
        ..WizardOptions::default()
    };
    let mut wizard = LaunchWizard::new(input(), options);
    wizard.load(&StubSource::default()).await.expect("options load");

    wizard.visit_step(StepId::Credentials).expect("visit credentials");
    wizard.select_credential(prompting_credential()).expect("select credential");

    let message = wizard.form().error("credentials").expect("credentials error");
    assert!(message.starts_with("Credentials that require passwords on launch are not permitted."));
    assert!(message.ends_with("Ops Machine"));
}

#[tokio::test]
async fn failed_option_load_stops_the_wizard() {
    let source = StubSource {
        failing: Some(ResourceKind::Inventories),
        ..StubSource::default()
    };
    let mut wizard = LaunchWizard::new(input(), WizardOptions::default());

    let error = wizard.load(&source).await.expect_err("inventory load fails");
    match error {
        WizardError::Content(content) => {
            assert_eq!(content.step, StepId::Inventory);
            assert!(content.message.contains("inventories is unavailable"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(wizard.phase(), WizardPhase::Error);
    assert!(matches!(wizard.next(), Err(WizardError::Content(_))));
}
