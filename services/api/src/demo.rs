use crate::cli::RulesArgs;
use crate::infra::{load_rules, InMemorySessionRepository};
use clap::Args;
use imci_triage::config::AppConfig;
use imci_triage::error::AppError;
use imci_triage::telemetry;
use imci_triage::triage::{
    assess_patients, read_patients, FieldUpdate, FieldValue, PatientRecord, RuleSet,
    SessionRepository, TriageOrchestrator, TriageOutcome, TriageReport, TriageService,
};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Extracted patient fields as a JSON object, e.g. '{"age_months": 18, "cough": true}'
    #[arg(long)]
    pub(crate) fields: String,
    #[command(flatten)]
    pub(crate) rules: RulesArgs,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// CSV file with one patient per row and field names in the header
    #[arg(long)]
    pub(crate) input: PathBuf,
    #[command(flatten)]
    pub(crate) rules: RulesArgs,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    #[command(flatten)]
    pub(crate) rules: RulesArgs,
}

fn prepare(rules: &RulesArgs) -> Result<(AppConfig, Arc<RuleSet>), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let rules = load_rules(&config.triage, rules.path.as_deref())?;
    Ok((config, rules))
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let (config, rules) = prepare(&args.rules)?;
    let fields: FieldUpdate = serde_json::from_str(&args.fields)?;

    let orchestrator = TriageOrchestrator::new(rules);
    let mut record = PatientRecord::new(&config.triage.schema());
    record.merge(&fields);
    let report = orchestrator.assess(&record);

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub(crate) fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let (config, rules) = prepare(&args.rules)?;
    let file = File::open(&args.input)?;
    let rows = read_patients(BufReader::new(file))?;

    let orchestrator = TriageOrchestrator::new(rules);
    let assessments = assess_patients(&orchestrator, &config.triage.schema(), &rows);
    let classified = assessments
        .iter()
        .filter(|assessment| assessment.report.outcome.result().is_some())
        .count();
    info!(
        input = %args.input.display(),
        patients = assessments.len(),
        classified,
        "batch triage finished"
    );

    println!("{}", serde_json::to_string_pretty(&assessments)?);
    Ok(())
}

/// One scripted caregiver message with the fields an extractor would pull from it.
pub(crate) struct DemoTurn {
    pub(crate) utterance: &'static str,
    pub(crate) fields: FieldUpdate,
}

pub(crate) fn demo_script() -> Vec<DemoTurn> {
    fn turn(utterance: &'static str, entries: &[(&str, FieldValue)]) -> DemoTurn {
        DemoTurn {
            utterance,
            fields: entries
                .iter()
                .map(|(name, value)| (name.to_string(), Some(value.clone())))
                .collect(),
        }
    }

    vec![
        turn(
            "My daughter is 18 months old and she has been coughing for three days.",
            &[
                ("age_months", FieldValue::Number(18.0)),
                ("cough", FieldValue::Flag(true)),
            ],
        ),
        turn(
            "She is not hot to the touch and she has not had any fits.",
            &[
                ("fever", FieldValue::Flag(false)),
                ("convulsions", FieldValue::Flag(false)),
            ],
        ),
        turn(
            "I counted 46 breaths in a minute. Her chest does not pull in.",
            &[
                ("respiratory_rate", FieldValue::Number(46.0)),
                ("chest_indrawing", FieldValue::Flag(false)),
            ],
        ),
    ]
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let (config, rules) = prepare(&args.rules)?;
    let service = TriageService::new(
        Arc::new(InMemorySessionRepository::default()),
        rules,
        config.triage.schema(),
    );

    println!("IMCI triage demo");
    play_script(&service)
}

fn play_script<R>(service: &TriageService<R>) -> Result<(), AppError>
where
    R: SessionRepository + 'static,
{
    let session = service.start()?;
    println!("- Started session {}", session.id);

    for (index, turn) in demo_script().into_iter().enumerate() {
        println!("\nTurn {}: \"{}\"", index + 1, turn.utterance);
        let report = service.record_turn(&session.id, &turn.fields)?;
        for line in render_report(&report) {
            println!("  {}", line);
        }
        if report.outcome.result().is_some() {
            break;
        }
    }

    let session = service.end(&session.id)?;
    println!(
        "\n- Session {} closed as {} after {} turns (started {})",
        session.id,
        session.status().label(),
        session.turns,
        session.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    Ok(())
}

pub(crate) fn render_report(report: &TriageReport) -> Vec<String> {
    let mut lines = Vec::new();
    match &report.outcome {
        TriageOutcome::Complete(result) => {
            lines.push(format!("Overall risk: {}", result.overall_risk_level));
            for matched in &result.classifications {
                lines.push(format!(
                    "- {} ({} severity, priority {}, confidence {:.2})",
                    matched.classification, matched.severity, matched.priority, matched.confidence
                ));
            }
        }
        TriageOutcome::Incomplete { missing_fields } => {
            lines.push(format!("Need more information: {}", missing_fields.join(", ")));
        }
        TriageOutcome::Undetermined => {
            lines.push("No classification matched with every field known".to_string());
        }
    }
    for warning in &report.warnings {
        lines.push(format!("Warning: {}", warning));
    }
    lines
}
