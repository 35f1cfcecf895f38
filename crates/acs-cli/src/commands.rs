//! Subcommand implementations
//!
//! Each command returns a value that renders either as text or as JSON, so the
//! binary only decides where output goes.

use crate::input;
use acs_compiler::Action;
use acs_model::{ProvisioningState, ResourceSubmission};
use acs_provision::{
    Plan, PhaseSummary, ProvisioningConfig, ProvisioningOrchestrator, ProvisioningReport,
    ProvisioningService, Services, Stores, SubmissionOutcome,
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::{self, Display, Formatter, Write as _};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Load the service configuration, applying command line overrides
pub fn load_config(
    path: Option<&Path>,
    state_dir: Option<&Path>,
    dry_run: bool,
) -> Result<ProvisioningConfig> {
    let mut config = match path {
        Some(path) => ProvisioningConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => ProvisioningConfig::default(),
    };
    if let Some(dir) = state_dir {
        config = config.with_state_dir(dir);
    }
    if dry_run {
        config = config.with_dry_run(true);
    }
    debug!(?config, "configuration loaded");
    Ok(config)
}

/// Provisioning service over the configured stores and HTTP clients
pub fn service(config: &ProvisioningConfig) -> Result<ProvisioningService> {
    let stores = Stores::from_config(config).context("opening stores")?;
    let services = Services::http(config).context("building service clients")?;
    Ok(ProvisioningService::new(ProvisioningOrchestrator::new(
        stores, services, config,
    )))
}

/// Definition counts of a valid submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmissionSummary {
    /// PM schemas
    pub pm_schemas: usize,
    /// PM counters, including those lifted from schemas
    pub pm_defs: usize,
    /// KPI definitions
    pub kpi_defs: usize,
    /// Profiles
    pub profile_defs: usize,
    /// Augmentations
    pub augmentations: usize,
}

impl From<&ResourceSubmission> for SubmissionSummary {
    fn from(submission: &ResourceSubmission) -> Self {
        Self {
            pm_schemas: submission.pm_schemas.len(),
            pm_defs: submission.effective_pm_definitions().len(),
            kpi_defs: submission.kpi_defs.len(),
            profile_defs: submission.profile_defs.len(),
            augmentations: submission.augmentations.len(),
        }
    }
}

impl Display for SubmissionSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "valid: {} pm schemas, {} pm counters, {} kpis, {} profiles, {} augmentations",
            self.pm_schemas, self.pm_defs, self.kpi_defs, self.profile_defs, self.augmentations
        )
    }
}

/// `acs validate`
pub fn validate(paths: &[PathBuf]) -> Result<SubmissionSummary> {
    let submission = input::load_all(paths)?;
    submission.validate()?;
    let summary = SubmissionSummary::from(&submission);
    info!(files = paths.len(), kpis = summary.kpi_defs, "submission is valid");
    Ok(summary)
}

/// `acs plan`
pub fn plan(service: &ProvisioningService, paths: &[PathBuf]) -> Result<Plan> {
    let submission = input::load_all(paths)?;
    Ok(service.plan(&submission)?)
}

/// `acs provision`
pub async fn provision(
    service: &ProvisioningService,
    paths: &[PathBuf],
) -> Result<SubmissionOutcome> {
    let submission = input::load_all(paths)?;
    Ok(service.submit(&submission).await?)
}

/// `acs state`: every recorded run, oldest first
pub fn history(stores: &Stores) -> Result<Vec<ProvisioningState>> {
    Ok(stores.state.history()?)
}

#[derive(Serialize)]
struct PlannedKpi<'a> {
    name: &'a str,
    source_kpi: &'a str,
    action: String,
    output_table: &'a str,
    profiles: Vec<&'a str>,
}

#[derive(Serialize)]
struct PlanView<'a> {
    profiles: &'a [String],
    kpis: Vec<PlannedKpi<'a>>,
}

impl<'a> From<&'a Plan> for PlanView<'a> {
    fn from(plan: &'a Plan) -> Self {
        Self {
            profiles: &plan.profiles,
            kpis: plan
                .compilation
                .kpis
                .iter()
                .map(|compiled| PlannedKpi {
                    name: &compiled.artifact.name,
                    source_kpi: &compiled.artifact.source_kpi,
                    action: compiled.action.to_string(),
                    output_table: &compiled.artifact.output_table,
                    profiles: compiled.profiles.iter().map(String::as_str).collect(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum OutcomeView<'a> {
    Unchanged,
    Stored,
    Planned(PlanView<'a>),
    Provisioned(&'a ProvisioningReport),
}

/// Plan as text, one artifact per line
#[must_use]
pub fn render_plan(plan: &Plan) -> String {
    let mut out = format!("profiles: {}\n", plan.profiles.join(", "));
    for compiled in &plan.compilation.kpis {
        let _ = writeln!(
            out,
            "  {:<9} {} ({} -> {})",
            compiled.action.to_string(),
            compiled.artifact.name,
            compiled.artifact.source_kpi,
            compiled.artifact.output_table
        );
    }
    let _ = write!(
        out,
        "{} to create, {} to update, {} unchanged",
        plan.compilation.count(Action::Create),
        plan.compilation.count(Action::Update),
        plan.compilation.count(Action::Unchanged)
    );
    out
}

fn render_summary(phase: &str, summary: &PhaseSummary) -> String {
    format!(
        "  {phase:<13} created {}, updated {}, unchanged {}, deleted {}",
        summary.created, summary.updated, summary.unchanged, summary.deleted
    )
}

/// Submission outcome as text
#[must_use]
pub fn render_outcome(outcome: &SubmissionOutcome) -> String {
    match outcome {
        SubmissionOutcome::Unchanged => "no changes".to_string(),
        SubmissionOutcome::Stored => "definitions stored, no profile affected".to_string(),
        SubmissionOutcome::Planned(plan) => render_plan(plan),
        SubmissionOutcome::Provisioned(report) => [
            format!("run {}: {}", report.run_id, report.profiles.join(", ")),
            render_summary("augmentations", &report.augmentations),
            render_summary("kpis", &report.kpis),
            render_summary("indexes", &report.indexes),
            format!("  elapsed       {:?}", report.elapsed),
        ]
        .join("\n"),
    }
}

/// Run history as text, one run per line
#[must_use]
pub fn render_history(history: &[ProvisioningState]) -> String {
    if history.is_empty() {
        return "no provisioning runs".to_string();
    }
    history
        .iter()
        .map(|state| {
            format!(
                "{} {:<9} {} [{}]",
                state.id,
                state.status.as_str(),
                state.started_at.to_rfc3339(),
                state.pending_profiles.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Plan as JSON
pub fn plan_json(plan: &Plan) -> Result<String> {
    Ok(serde_json::to_string_pretty(&PlanView::from(plan))?)
}

/// Submission outcome as JSON, tagged by `outcome`
pub fn outcome_json(outcome: &SubmissionOutcome) -> Result<String> {
    let view = match outcome {
        SubmissionOutcome::Unchanged => OutcomeView::Unchanged,
        SubmissionOutcome::Stored => OutcomeView::Stored,
        SubmissionOutcome::Planned(plan) => OutcomeView::Planned(PlanView::from(plan)),
        SubmissionOutcome::Provisioned(report) => OutcomeView::Provisioned(report),
    };
    Ok(serde_json::to_string_pretty(&view)?)
}
