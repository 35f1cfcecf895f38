//! Index phase
//!
//! One index definition per KPI output table touched by the run, listing the
//! table's context fields and every visible KPI deployed into it.

use super::PhaseSummary;
use crate::clients::IndexService;
use crate::error::ProvisionError;
use crate::retry::RetryPolicy;
use acs_compiler::CompilationResult;
use acs_model::{DeployedKpi, IndexDefinition, IndexValue};
use acs_store::RuntimeStore;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

pub(crate) struct IndexPhase<'a> {
    pub(crate) runtime: &'a dyn RuntimeStore,
    pub(crate) service: &'a dyn IndexService,
    pub(crate) policy: &'a RetryPolicy,
}

/// Index layout of one output table; `None` when nothing in it is visible
pub(crate) fn index_for(table: &str, deployed: &[DeployedKpi]) -> Option<IndexDefinition> {
    let visible: Vec<&DeployedKpi> = deployed
        .iter()
        .filter(|kpi| kpi.output_table == table && kpi.is_visible)
        .collect();
    let context = visible.first()?.context.clone();
    let mut values: Vec<IndexValue> = visible
        .into_iter()
        .map(|kpi| IndexValue {
            name: kpi.name.clone(),
            display_name: kpi.display_name.clone(),
            description: kpi.description.clone(),
        })
        .collect();
    values.sort();
    values.dedup();
    Some(IndexDefinition {
        name: IndexDefinition::name_for(table),
        source_table: table.to_string(),
        context,
        values,
    })
}

impl IndexPhase<'_> {
    pub(crate) async fn run(
        &self,
        compilation: &CompilationResult,
    ) -> Result<PhaseSummary, ProvisionError> {
        let tables: BTreeSet<&str> = compilation
            .artifacts()
            .map(|kpi| kpi.output_table.as_str())
            .collect();
        let deployed = self.runtime.all_kpis()?;
        let mut summary = PhaseSummary::default();
        let mut pending = BTreeMap::new();

        for table in tables {
            let Some(index) = index_for(table, &deployed) else {
                debug!(table, "no visible kpis, index skipped");
                continue;
            };
            match self.runtime.index(&index.name)? {
                Some(existing) if existing == index => summary.unchanged += 1,
                existing => {
                    pending.insert(index.name.clone(), (index, existing.is_some()));
                }
            }
        }

        for (name, (index, exists)) in pending {
            if exists {
                self.policy
                    .run("index.update", |_| self.service.update(&index))
                    .await?;
                summary.updated += 1;
            } else {
                self.policy
                    .run("index.create", |_| self.service.create(&index))
                    .await?;
                summary.created += 1;
            }
            self.runtime.save_index(&index)?;
            debug!(index = %name, values = index.values.len(), "index provisioned");
        }

        info!(
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            "indexes provisioned"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::MockIndexService;
    use acs_compiler::{Action, CompiledKpi};
    use acs_model::{AggregationPeriod, KpiKind};
    use acs_store::InMemoryRuntimeStore;
    use pretty_assertions::assert_eq;

    fn deployed(name: &str, table: &str, visible: bool) -> DeployedKpi {
        DeployedKpi {
            name: name.to_string(),
            source_kpi: name.to_string(),
            kind: KpiKind::Simple,
            expression: "SUM(x)".to_string(),
            aggregation_type: "SUM".to_string(),
            aggregation_elements: vec![format!("{table}.snssai")],
            aggregation_period: AggregationPeriod::Quarter,
            scope: "snssai".to_string(),
            output_table: table.to_string(),
            context: vec!["snssai".to_string()],
            execution_group: None,
            is_visible: visible,
            display_name: name.to_uppercase(),
            description: String::new(),
        }
    }

    fn compiled(kpis: &[DeployedKpi]) -> CompilationResult {
        CompilationResult {
            kpis: kpis
                .iter()
                .map(|artifact| CompiledKpi {
                    artifact: artifact.clone(),
                    action: Action::Create,
                    profiles: BTreeSet::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn index_lists_visible_kpis_sorted() {
        let kpis = [
            deployed("b", "kpi_snssai_15", true),
            deployed("a", "kpi_snssai_15", true),
            deployed("hidden", "kpi_snssai_15", false),
            deployed("other", "kpi_nf_15", true),
        ];
        let index = index_for("kpi_snssai_15", &kpis).unwrap();
        assert_eq!(index.name, "acs-index-kpi-snssai-15");
        assert_eq!(index.context, vec!["snssai"]);
        let names: Vec<&str> = index.values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        assert!(index_for("kpi_snssai_15", &[deployed("h", "kpi_snssai_15", false)]).is_none());
    }

    #[tokio::test]
    async fn creates_then_updates_then_skips() {
        let runtime = InMemoryRuntimeStore::new();
        let first = [deployed("a", "kpi_snssai_15", true)];
        runtime.save_kpis(&first).unwrap();

        let mut service = MockIndexService::new();
        service.expect_create().times(1).returning(|_| Ok(()));
        service.expect_update().times(1).returning(|_| Ok(()));
        let policy = RetryPolicy::immediate(3);
        let phase = IndexPhase {
            runtime: &runtime,
            service: &service,
            policy: &policy,
        };

        let summary = phase.run(&compiled(&first)).await.unwrap();
        assert_eq!(summary.created, 1);

        let second = [deployed("b", "kpi_snssai_15", true)];
        runtime.save_kpis(&second).unwrap();
        let summary = phase.run(&compiled(&second)).await.unwrap();
        assert_eq!(summary.updated, 1);

        let summary = phase.run(&compiled(&second)).await.unwrap();
        assert_eq!(summary.unchanged, 1);
        assert_eq!(
            runtime
                .index("acs-index-kpi-snssai-15")
                .unwrap()
                .unwrap()
                .values
                .len(),
            2
        );
    }
}
