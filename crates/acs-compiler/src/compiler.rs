//! KPI compiler
//!
//! Turns the KPI references of affected profiles into deployable artifacts.
//!
//! # Resolution order
//! 1. Every simple KPI of every profile, including the extra simple
//!    artifacts produced by input-metric overrides
//! 2. Complex KPIs by dependency depth, so a complex input is resolved
//!    before the KPIs built on it
//!
//! Artifacts are deduplicated on [`KpiIdentity`] through a per-run memo.

use crate::error::CompileError;
use crate::expression;
use crate::result::{Action, CompilationResult, CompiledKpi};
use acs_model::{
    output_table, qualify, table_scope, AggregationPeriod, DeployedKpi, KpiDefinition,
    KpiIdentity, KpiKind, KpiReference, MetricType, ProfileDefinition, ValidationError,
};
use acs_store::{Dictionary, RuntimeStore};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Prefix of complex-KPI execution groups
pub const EXECUTION_GROUP_PREFIX: &str = "acs_complex_";

/// Compiles profile KPI references into deployed artifacts
#[derive(Clone)]
pub struct KpiCompiler {
    dictionary: Dictionary,
    runtime: Arc<dyn RuntimeStore>,
    default_period: AggregationPeriod,
}

impl std::fmt::Debug for KpiCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KpiCompiler")
            .field("default_period", &self.default_period)
            .finish_non_exhaustive()
    }
}

/// State of one compilation run
#[derive(Default)]
struct Run {
    memo: DashMap<KpiIdentity, CompiledKpi>,
    order: Vec<KpiIdentity>,
}

/// Assign the content-derived name to a freshly built artifact
fn named(mut artifact: DeployedKpi) -> DeployedKpi {
    artifact.name = artifact.identity().deployed_name();
    artifact
}

/// One complex reference waiting for compilation
struct ComplexTask<'a> {
    depth: usize,
    profile: &'a ProfileDefinition,
    reference: &'a KpiReference,
    kpi: KpiDefinition,
}

impl KpiCompiler {
    /// Create compiler over the dictionary and runtime stores
    #[must_use]
    pub fn new(dictionary: Dictionary, runtime: Arc<dyn RuntimeStore>) -> Self {
        Self {
            dictionary,
            runtime,
            default_period: AggregationPeriod::default(),
        }
    }

    /// With process-wide default aggregation period
    #[inline]
    #[must_use]
    pub fn with_default_period(mut self, period: AggregationPeriod) -> Self {
        self.default_period = period;
        self
    }

    /// Compile every KPI referenced by the given profiles
    ///
    /// # Errors
    /// Fails fast on the first invalid definition or unresolved input
    pub fn calculate_affected_kpis(
        &self,
        profiles: &[ProfileDefinition],
    ) -> Result<CompilationResult, CompileError> {
        let mut run = Run::default();
        let mut complex = Vec::new();

        for profile in profiles {
            for reference in &profile.kpis {
                let kpi = self.kpi(profile, &reference.kpi)?;
                let period = self.period(reference, &kpi);
                if kpi.is_complex() {
                    self.resolve_override_inputs(&mut run, profile, reference, &kpi, period)?;
                    let depth = self.depth(&kpi.name, &mut BTreeSet::new())?;
                    complex.push(ComplexTask {
                        depth,
                        profile,
                        reference,
                        kpi,
                    });
                } else {
                    let artifact = self.resolve_simple(profile, &kpi, &profile.context, period)?;
                    self.record(&mut run, artifact, &profile.name)?;
                }
            }
        }

        complex.sort_by(|a, b| {
            a.depth
                .cmp(&b.depth)
                .then_with(|| a.profile.name.cmp(&b.profile.name))
        });
        for task in &complex {
            let period = self.period(task.reference, &task.kpi);
            let artifact = self.resolve_complex(&run, task, period)?;
            self.record(&mut run, artifact, &task.profile.name)?;
        }

        let kpis: Vec<CompiledKpi> = run
            .order
            .iter()
            .filter_map(|identity| run.memo.remove(identity).map(|(_, compiled)| compiled))
            .collect();
        let result = CompilationResult { kpis };
        info!(
            profiles = profiles.len(),
            artifacts = result.len(),
            create = result.count(Action::Create),
            update = result.count(Action::Update),
            unchanged = result.count(Action::Unchanged),
            "kpis compiled"
        );
        Ok(result)
    }

    fn kpi(&self, profile: &ProfileDefinition, name: &str) -> Result<KpiDefinition, CompileError> {
        self.dictionary
            .kpi_defs
            .get(name)?
            .ok_or_else(|| CompileError::UnknownKpi {
                profile: profile.name.clone(),
                kpi: name.to_string(),
            })
    }

    fn period(&self, reference: &KpiReference, kpi: &KpiDefinition) -> AggregationPeriod {
        AggregationPeriod::effective(
            reference.aggregation_period(),
            kpi.aggregation_period(),
            self.default_period,
        )
    }

    /// Dependency depth: 0 for simple KPIs, 1 + deepest KPI input otherwise
    fn depth(&self, name: &str, visiting: &mut BTreeSet<String>) -> Result<usize, CompileError> {
        if !visiting.insert(name.to_string()) {
            return Err(CompileError::Cycle {
                kpi: name.to_string(),
            });
        }
        let Some(kpi) = self.dictionary.kpi_defs.get(name)? else {
            visiting.remove(name);
            return Ok(0);
        };
        let mut depth = 0;
        for input in kpi.input_metrics() {
            if input.metric_type == MetricType::Kpi {
                depth = depth.max(1 + self.depth(&input.id, visiting)?);
            }
        }
        visiting.remove(name);
        Ok(depth)
    }

    /// Extra simple artifacts for overridden inputs of a complex KPI
    fn resolve_override_inputs(
        &self,
        run: &mut Run,
        profile: &ProfileDefinition,
        reference: &KpiReference,
        kpi: &KpiDefinition,
        period: AggregationPeriod,
    ) -> Result<(), CompileError> {
        for input_override in &reference.input_metric_overrides {
            if !kpi.input_metrics().iter().any(|i| i.id == input_override.id) {
                return Err(ValidationError::invalid(
                    &kpi.name,
                    format!("override for undeclared input '{}'", input_override.id),
                )
                .into());
            }
            let input = self.kpi(profile, &input_override.id)?;
            if input.is_complex() {
                continue;
            }
            let artifact = self.resolve_simple(profile, &input, &input_override.context, period)?;
            self.record(run, artifact, &profile.name)?;
        }
        Ok(())
    }

    fn resolve_simple(
        &self,
        profile: &ProfileDefinition,
        kpi: &KpiDefinition,
        context: &[String],
        period: AggregationPeriod,
    ) -> Result<DeployedKpi, CompileError> {
        let mut schemas = BTreeSet::new();
        let mut counters = BTreeMap::new();
        for input in kpi.input_metrics() {
            let pm = self
                .dictionary
                .pm_defs
                .get(&input.id)?
                .ok_or_else(|| CompileError::UnknownPm {
                    kpi: kpi.name.clone(),
                    pm: input.id.clone(),
                })?;
            schemas.insert(pm.schema().to_string());
            counters.insert(input.alias.as_str(), pm.name);
        }
        let schemas: Vec<String> = schemas.into_iter().collect();
        let [schema] = <[String; 1]>::try_from(schemas).map_err(|schemas| {
            CompileError::MixedSchemas {
                kpi: kpi.name.clone(),
                schemas,
            }
        })?;
        let source = match &profile.augmentation {
            Some(augmentation) => format!("{augmentation}_{schema}"),
            None => schema,
        };
        let replacements: BTreeMap<&str, String> = counters
            .into_iter()
            .map(|(alias, counter)| (alias, format!("{source}.{counter}")))
            .collect();

        let scope = table_scope(profile.augmentation.as_deref(), context);
        Ok(named(DeployedKpi {
            name: String::new(),
            source_kpi: kpi.name.clone(),
            kind: KpiKind::Simple,
            expression: expression::simple(&kpi.expression, &replacements, &source),
            aggregation_type: kpi.aggregation_type.clone(),
            aggregation_elements: qualify(&source, context),
            aggregation_period: period,
            output_table: output_table(&scope, period),
            scope,
            context: context.to_vec(),
            execution_group: None,
            is_visible: kpi.is_visible,
            display_name: kpi.display_name.clone(),
            description: kpi.description.clone(),
        }))
    }

    /// Find an input artifact in the profile's table scope on a context
    ///
    /// Artifacts of this run come first, those of the same profile before
    /// those of others; deployed artifacts are the fallback. Within each, the
    /// requested period wins over the shortest other period.
    fn lookup_input(
        &self,
        run: &Run,
        profile: &ProfileDefinition,
        input: &str,
        context: &[String],
        period: AggregationPeriod,
    ) -> Result<Option<DeployedKpi>, CompileError> {
        let wanted = table_scope(profile.augmentation.as_deref(), context);
        let mut candidates: Vec<(bool, DeployedKpi)> = run
            .order
            .iter()
            .filter_map(|identity| {
                run.memo.get(identity).map(|compiled| {
                    (
                        compiled.profiles.contains(&profile.name),
                        compiled.artifact.clone(),
                    )
                })
            })
            .filter(|(_, artifact)| artifact.source_kpi == input && artifact.scope == wanted)
            .collect();
        if candidates.is_empty() {
            candidates = self
                .runtime
                .kpis_for_source(input)?
                .into_iter()
                .filter(|artifact| artifact.scope == wanted)
                .map(|artifact| (false, artifact))
                .collect();
        }
        Ok(candidates
            .into_iter()
            .min_by_key(|(in_profile, artifact)| {
                (
                    !in_profile,
                    artifact.aggregation_period != period,
                    artifact.aggregation_period,
                )
            })
            .map(|(_, artifact)| artifact))
    }

    fn resolve_complex(
        &self,
        run: &Run,
        task: &ComplexTask<'_>,
        period: AggregationPeriod,
    ) -> Result<DeployedKpi, CompileError> {
        let ComplexTask {
            depth,
            profile,
            reference,
            kpi,
        } = task;
        if kpi
            .input_metrics()
            .iter()
            .any(|input| input.metric_type == MetricType::PmData)
        {
            return Err(CompileError::MixedInputs {
                kpi: kpi.name.clone(),
            });
        }

        let common_scope = table_scope(profile.augmentation.as_deref(), &profile.context);
        let common_table = output_table(&common_scope, period);
        let mut replacements = BTreeMap::new();
        let mut override_tables: Vec<(String, Vec<String>)> = Vec::new();
        let mut any_common = false;

        for input in kpi.input_metrics() {
            let input_override = reference.override_for(&input.id);
            let context = input_override.map_or(&profile.context, |o| &o.context);
            let resolved = self
                .lookup_input(run, profile, &input.id, context, period)?
                .ok_or_else(|| CompileError::Unresolved {
                    profile: profile.name.clone(),
                    kpi: kpi.name.clone(),
                    input: input.id.clone(),
                    context: context.clone(),
                })?;
            debug!(
                kpi = %kpi.name,
                input = %input.id,
                artifact = %resolved.name,
                "complex input resolved"
            );
            if input_override.is_some() {
                if !override_tables.iter().any(|(t, _)| *t == resolved.output_table) {
                    override_tables.push((resolved.output_table.clone(), context.clone()));
                }
            } else {
                any_common = true;
            }
            replacements.insert(input.alias.as_str(), resolved.column());
        }

        let (primary_table, primary_context) = if any_common || override_tables.is_empty() {
            (common_table, profile.context.clone())
        } else {
            override_tables[0].clone()
        };
        let mut elements = qualify(&primary_table, &primary_context);
        for (table, context) in &override_tables {
            for element in qualify(table, context) {
                if !elements.contains(&element) {
                    elements.push(element);
                }
            }
        }

        Ok(named(DeployedKpi {
            name: String::new(),
            source_kpi: kpi.name.clone(),
            kind: KpiKind::Complex,
            expression: expression::complex(&kpi.expression, &replacements, &primary_table),
            aggregation_type: kpi.aggregation_type.clone(),
            aggregation_elements: elements,
            aggregation_period: period,
            output_table: output_table(&common_scope, period),
            scope: common_scope,
            context: profile.context.clone(),
            execution_group: Some(format!("{EXECUTION_GROUP_PREFIX}{depth}")),
            is_visible: kpi.is_visible,
            display_name: kpi.display_name.clone(),
            description: kpi.description.clone(),
        }))
    }

    /// Deduplicate into the run memo and classify against the runtime store
    fn record(&self, run: &mut Run, mut artifact: DeployedKpi, profile: &str) -> Result<(), CompileError> {
        let identity = artifact.identity();
        match run.memo.entry(identity.clone()) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get_mut();
                if existing.artifact.aggregation_period != artifact.aggregation_period {
                    return Err(CompileError::PeriodConflict {
                        kpi: artifact.source_kpi,
                        first: existing.artifact.aggregation_period,
                        second: artifact.aggregation_period,
                    });
                }
                existing.profiles.insert(profile.to_string());
            }
            Entry::Vacant(vacant) => {
                let action = match self.runtime.find_kpi(&identity)? {
                    None => Action::Create,
                    Some(deployed) => {
                        artifact.name = deployed.name.clone();
                        if deployed == artifact {
                            Action::Unchanged
                        } else {
                            Action::Update
                        }
                    }
                };
                debug!(
                    kpi = %artifact.source_kpi,
                    name = %artifact.name,
                    %action,
                    "artifact recorded"
                );
                vacant.insert(CompiledKpi {
                    artifact,
                    action,
                    profiles: BTreeSet::from([profile.to_string()]),
                });
                run.order.push(identity);
            }
        }
        Ok(())
    }
}
