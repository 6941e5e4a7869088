use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indexmap::IndexMap;
use launchdeck_api::ControllerClient;
use launchdeck_engine::{
    LaunchPayload, LaunchWizard, WizardError, WizardInput, WizardOptions, build_rule, build_schedule_payload,
    parse_rule, read_document,
};
use launchdeck_types::{FieldNumber, LaunchSideData, Resource, ScheduleFormValues, TemplateKind};
use launchdeck_util::{ConsoleSettings, SettingsStore, redact_json};
use serde_json::Value;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "launchdeck", version, about = "Launch prompts and schedules for automation controller templates")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build and parse recurrence rules
    #[command(subcommand)]
    Rrule(RruleCommand),
    /// Walk a template's launch prompts
    #[command(subcommand)]
    Launch(LaunchCommand),
    /// Create schedules for a template
    #[command(subcommand)]
    Schedule(ScheduleCommand),
    /// Show or change the settings file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
enum RruleCommand {
    /// Print the rule for a set of schedule form values
    Build(ScheduleValuesArgs),
    /// Print the schedule form values of a rule
    Parse {
        /// Full rule text, e.g. "DTSTART;TZID=UTC:20200325T104500 RRULE:FREQ=DAILY"
        rule: String,
    },
}

#[derive(Debug, Subcommand)]
enum LaunchCommand {
    /// Print the launch payload the prompts would produce
    Preview {
        #[command(flatten)]
        template: TemplateArgs,
        /// YAML or JSON mapping of form field to value
        #[arg(long)]
        answers: Option<PathBuf>,
        /// Create new labels and launch the template
        #[arg(long)]
        submit: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ScheduleCommand {
    /// Create a schedule from form values
    Create {
        #[command(flatten)]
        template: TemplateArgs,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[command(flatten)]
        values: ScheduleValuesArgs,
        /// Prompt answers applied through the launch wizard
        #[arg(long)]
        answers: Option<PathBuf>,
        /// Print the payload instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the settings file (secrets redacted)
    Show,
    /// Update settings fields
    Set {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        timezone: Option<String>,
        #[arg(long)]
        page_size: Option<u32>,
    },
}

#[derive(Debug, Args)]
struct TemplateArgs {
    /// Template id
    id: i64,
    /// Treat the id as a workflow job template
    #[arg(long)]
    workflow: bool,
}

#[derive(Debug, Args)]
struct ScheduleValuesArgs {
    /// YAML or JSON file of schedule form values; other flags are ignored
    #[arg(long, short = 'f')]
    file: Option<PathBuf>,
    /// Local start time, YYYY-MM-DDTHH:MM[:SS]
    #[arg(long)]
    start: Option<String>,
    #[arg(long)]
    timezone: Option<String>,
    /// none, minute, hour, day, week, month or year
    #[arg(long, default_value = "none")]
    frequency: String,
    #[arg(long, default_value_t = 1)]
    interval: i64,
    /// Weekday codes for weekly rules, e.g. MO,WE,FR
    #[arg(long, value_delimiter = ',')]
    days: Vec<String>,
    /// Day of the month for monthly and yearly rules
    #[arg(long)]
    day_number: Option<i64>,
    /// Month for yearly rules
    #[arg(long)]
    month: Option<i64>,
    /// Stop after this many occurrences
    #[arg(long, conflicts_with = "until")]
    count: Option<i64>,
    /// Stop at this local time
    #[arg(long)]
    until: Option<String>,
}

impl ScheduleValuesArgs {
    fn resolve(&self, settings: &ConsoleSettings) -> Result<ScheduleFormValues> {
        if let Some(file) = &self.file {
            return read_document(file);
        }
        let start = self.start.clone().context("--start is required without --file")?;
        let mut values = ScheduleFormValues {
            start_date_time: start,
            timezone: self
                .timezone
                .clone()
                .unwrap_or_else(|| settings.default_timezone.clone()),
            interval: Some(FieldNumber::Integer(self.interval)),
            frequency: self.frequency.clone(),
            days_of_week: self.days.iter().map(|day| day.trim().to_uppercase()).collect(),
            ..ScheduleFormValues::default()
        };
        if let Some(day_number) = self.day_number {
            values.run_on_day_number = Some(day_number.into());
        }
        if let Some(month) = self.month {
            values.run_on_day_month = Some(month.into());
        }
        if let Some(count) = self.count {
            values.end = Some("after".to_string());
            values.occurrences = Some(count.into());
        } else if let Some(until) = &self.until {
            values.end = Some("onDate".to_string());
            values.end_date_time = Some(until.clone());
        }
        Ok(values)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = open_settings();

    match cli.command {
        Command::Rrule(command) => run_rrule(command, &settings.settings()),
        Command::Launch(LaunchCommand::Preview {
            template,
            answers,
            submit,
        }) => run_launch_preview(&settings.settings(), &template, answers.as_deref(), submit).await,
        Command::Schedule(ScheduleCommand::Create {
            template,
            name,
            description,
            values,
            answers,
            dry_run,
        }) => {
            let settings = settings.settings();
            let values = values.resolve(&settings)?;
            run_schedule_create(&settings, &template, &name, &description, &values, answers.as_deref(), dry_run)
                .await
        }
        Command::Config(command) => run_config(&settings, command),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_settings() -> SettingsStore {
    SettingsStore::new().unwrap_or_else(|error| {
        warn!(%error, "settings unavailable; using in-memory defaults");
        SettingsStore::ephemeral()
    })
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&redact_json(value))?);
    Ok(())
}

fn run_rrule(command: RruleCommand, settings: &ConsoleSettings) -> Result<()> {
    match command {
        RruleCommand::Build(args) => {
            let values = args.resolve(settings)?;
            let rule = build_rule(&values)?;
            println!("{}", rule);
        }
        RruleCommand::Parse { rule } => {
            let values = parse_rule(&rule)?;
            print_json(&serde_json::to_value(&values)?)?;
        }
    }
    Ok(())
}

fn run_config(store: &SettingsStore, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            println!("# {}", store.path().display());
            print_json(&serde_json::to_value(store.settings())?)?;
        }
        ConfigCommand::Set {
            host,
            token,
            timezone,
            page_size,
        } => {
            store.update(|settings| {
                if let Some(host) = host {
                    settings.host = Some(host);
                }
                if let Some(token) = token {
                    settings.token = Some(token);
                }
                if let Some(timezone) = timezone {
                    settings.default_timezone = timezone;
                }
                if let Some(page_size) = page_size {
                    settings.page_size = page_size;
                }
            })?;
            info!(path = %store.path().display(), "settings updated");
        }
    }
    Ok(())
}

fn template_kind(args: &TemplateArgs) -> TemplateKind {
    if args.workflow {
        TemplateKind::WorkflowJobTemplate
    } else {
        TemplateKind::JobTemplate
    }
}

/// Fetch everything the wizard needs for `resource`. Related collections
/// are only read for the prompts that use them.
async fn read_wizard_input(client: &ControllerClient, resource: Resource) -> Result<WizardInput> {
    let config = client.read_launch(&resource).await?;
    let survey = if config.survey_enabled {
        Some(client.read_survey(&resource).await.context("read survey")?)
    } else {
        None
    };
    let mut side_data = LaunchSideData::default();
    if config.ask_labels_on_launch {
        side_data.labels = client.read_template_labels(&resource).await?;
    }
    if config.ask_instance_groups_on_launch {
        side_data.instance_groups = client.read_template_instance_groups(&resource).await?;
    }
    if config.ask_credential_on_launch {
        side_data.default_credentials = client.read_template_credentials(&resource).await?;
    }
    Ok(WizardInput {
        config,
        survey,
        resource,
        side_data,
    })
}

/// Open the wizard, load its options and apply `answers` field by field.
async fn prepare_wizard(
    client: &ControllerClient,
    resource: Resource,
    options: WizardOptions,
    answers: Option<&Path>,
) -> Result<LaunchWizard> {
    let input = read_wizard_input(client, resource).await?;
    let mut wizard = LaunchWizard::new(input, options);
    wizard.load(client).await?;

    if let Some(path) = answers {
        let answers: IndexMap<String, Value> = read_document(path)?;
        for (field, value) in answers {
            debug!(%field, "applying answer");
            wizard.set_value(&field, value)?;
        }
    }
    Ok(wizard)
}

fn report_errors(wizard: &LaunchWizard, error: WizardError) -> anyhow::Error {
    if matches!(error, WizardError::HasErrors) {
        for (field, message) in wizard.form().errors() {
            eprintln!("{}: {}", field, message);
        }
    }
    error.into()
}

async fn run_launch_preview(
    settings: &ConsoleSettings,
    template: &TemplateArgs,
    answers: Option<&Path>,
    submit: bool,
) -> Result<()> {
    let client = ControllerClient::from_env(settings)?;
    let resource = client.read_template(template_kind(template), template.id).await?;
    let options = WizardOptions {
        page_size: settings.page_size,
        ..WizardOptions::default()
    };
    let mut wizard = prepare_wizard(&client, resource.clone(), options, answers).await?;

    if !submit {
        let payload = wizard.preview().map_err(|error| report_errors(&wizard, error))?;
        return print_json(&payload.to_value()?);
    }
    let payload = match wizard.submit(&client).await {
        Ok(payload) => payload,
        Err(error) => return Err(report_errors(&wizard, error)),
    };
    let job = client.launch(&resource, &payload.to_value()?).await?;
    info!(template = resource.id, job = ?job.get("id"), "template launched");
    print_json(&job)
}

async fn run_schedule_create(
    settings: &ConsoleSettings,
    template: &TemplateArgs,
    name: &str,
    description: &str,
    values: &ScheduleFormValues,
    answers: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    let needs_client = answers.is_some() || !dry_run;
    let client = if needs_client {
        Some(ControllerClient::from_env(settings)?)
    } else {
        None
    };

    let mut resource = Resource {
        id: template.id,
        kind: template_kind(template),
        ..Resource::default()
    };
    let mut prompts: Option<LaunchPayload> = None;
    if let (Some(client), Some(answers)) = (&client, answers) {
        resource = client.read_template(resource.kind, resource.id).await?;
        let options = WizardOptions {
            allow_credentials_with_passwords: false,
            page_size: settings.page_size,
        };
        let mut wizard = prepare_wizard(client, resource.clone(), options, Some(answers)).await?;
        let payload = wizard.preview().map_err(|error| report_errors(&wizard, error))?;
        if !payload.pending_labels.is_empty() {
            warn!(labels = ?payload.pending_labels, "schedules cannot create labels; ignoring new labels");
        }
        prompts = Some(payload);
    }

    let payload = build_schedule_payload(name, description, values, prompts.as_ref())?;
    let body = serde_json::to_value(&payload)?;
    match client {
        Some(client) if !dry_run => {
            let created = client.create_schedule(&resource, &body).await?;
            print_json(&created)
        }
        _ => print_json(&body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekly_flags_become_form_values() {
        let cli = Cli::try_parse_from([
            "launchdeck",
            "rrule",
            "build",
            "--start",
            "2020-03-25T10:45",
            "--frequency",
            "week",
            "--days",
            "mo,we",
            "--count",
            "4",
        ])
        .expect("parse args");
        let Command::Rrule(RruleCommand::Build(args)) = cli.command else {
            panic!("expected rrule build");
        };

        let values = args.resolve(&ConsoleSettings::default()).expect("values");
        assert_eq!(values.timezone, "UTC");
        assert_eq!(values.days_of_week, vec!["MO".to_string(), "WE".to_string()]);
        assert_eq!(
            build_rule(&values).expect("rule").to_string(),
            "DTSTART;TZID=UTC:20200325T104500 RRULE:INTERVAL=1;FREQ=WEEKLY;BYDAY=MO,WE;COUNT=4"
        );
    }

    #[test]
    fn start_is_required_without_a_file() {
        let cli = Cli::try_parse_from(["launchdeck", "rrule", "build"]).expect("parse args");
        let Command::Rrule(RruleCommand::Build(args)) = cli.command else {
            panic!("expected rrule build");
        };
        assert!(args.resolve(&ConsoleSettings::default()).is_err());
    }

    #[test]
    fn count_and_until_conflict() {
        let parsed = Cli::try_parse_from([
            "launchdeck",
            "rrule",
            "build",
            "--start",
            "2020-03-25T10:45",
            "--count",
            "2",
            "--until",
            "2020-04-01T00:00",
        ]);
        assert!(parsed.is_err());
    }
}
