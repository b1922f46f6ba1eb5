//! Staged batch orchestration: resolve → assemble → network → report.
//!
//! Sources are processed in the configured priority order, never in
//! arrival order: the merge outcome for a later source depends on which
//! entities earlier sources already created. The whole run is a single
//! pass; cancellation takes effect between sources.

use petgraph::graph::DiGraph;
use tracing::info;

use roma_core::cancel::Cancellable;
use roma_core::config::RomaConfig;
use roma_core::diagnostics::RunReport;
use roma_core::errors::PipelineError;
use roma_core::types::{
    AssembledTables, NormalizedRecord, RawTravelEdge, RecordType, SourceName,
};

use crate::assemble::SchemaAssembler;
use crate::network::{NetworkStats, TravelNetworkBuilder};
use crate::resolver::EntityResolver;

/// One source's normalized output: its records plus any travel edges.
#[derive(Debug)]
pub struct SourceBatch {
    pub source: SourceName,
    pub records: Vec<NormalizedRecord>,
    pub edges: Vec<RawTravelEdge>,
}

impl SourceBatch {
    pub fn new(source: SourceName) -> Self {
        Self {
            source,
            records: Vec::new(),
            edges: Vec::new(),
        }
    }
}

/// Everything a run produces: the relational tables, the travel graph and
/// the structured account of what happened.
pub struct RunOutput {
    pub tables: AssembledTables,
    pub graph: DiGraph<String, f64>,
    pub network_stats: NetworkStats,
    pub report: RunReport,
    /// The priority-table version the run was resolved under.
    pub priority_version: u32,
}

pub struct Pipeline {
    config: RomaConfig,
}

impl Pipeline {
    pub fn new(config: RomaConfig) -> Self {
        Self { config }
    }

    /// Run the full pipeline over the given source batches.
    pub fn run(&self, batches: Vec<SourceBatch>) -> Result<RunOutput, PipelineError> {
        self.run_cancellable(batches, &NeverCancelled)
    }

    /// Run with a cooperative cancellation token, checked before each source.
    pub fn run_cancellable(
        &self,
        mut batches: Vec<SourceBatch>,
        cancel: &dyn Cancellable,
    ) -> Result<RunOutput, PipelineError> {
        // Fixed, documented processing order.
        batches.sort_by_key(|b| self.config.priorities.rank(b.source));

        let mut resolver =
            EntityResolver::new(&self.config.resolve, self.config.priorities.clone());
        let mut raw: Vec<NormalizedRecord> = Vec::new();
        let mut edges: Vec<RawTravelEdge> = Vec::new();

        for batch in batches {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            let (locations, others): (Vec<_>, Vec<_>) = batch
                .records
                .into_iter()
                .partition(|r| r.record_type == RecordType::Location);
            resolver.ingest_source(batch.source, locations)?;
            raw.extend(others);
            edges.extend(batch.edges);
        }

        let (sealed, mut report) = resolver.seal()?;
        info!(entities = sealed.len(), "resolution complete");

        let assembler = SchemaAssembler::new(&self.config.assembly);
        let mut tables = assembler.assemble(&sealed, &raw, &mut report)?;

        let builder = TravelNetworkBuilder::new(&self.config.network);
        let network = builder.build(&sealed, &tables.locations, edges, &mut report)?;
        tables.travel_network = network.rows;

        report.table_counts = tables
            .row_counts()
            .iter()
            .map(|(name, n)| (name.to_string(), *n))
            .collect();
        info!(
            accepted = report.records_accepted,
            merged = report.records_merged,
            rejected = report.records_rejected,
            edges = report.edges_promoted,
            dropped = report.edges_dropped,
            "run complete"
        );

        Ok(RunOutput {
            tables,
            graph: network.graph,
            network_stats: network.stats,
            report,
            priority_version: self.config.priorities.version,
        })
    }
}

/// Placeholder token for uncancellable runs.
struct NeverCancelled;

impl Cancellable for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }

    fn cancel(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use roma_core::cancel::CancellationToken;
    use roma_core::types::NameVariant;
    use smallvec::smallvec;

    fn location_batch(source: SourceName, items: &[(&str, &str, f64, f64)]) -> SourceBatch {
        SourceBatch {
            source,
            records: items
                .iter()
                .map(|(id, name, lat, lon)| {
                    let mut rec = NormalizedRecord::new(source, *id, RecordType::Location);
                    rec.names = smallvec![NameVariant::new(*name)];
                    rec.latitude = Some(*lat);
                    rec.longitude = Some(*lon);
                    rec
                })
                .collect(),
            edges: Vec::new(),
        }
    }

    #[test]
    fn test_batches_processed_in_priority_order() {
        let pipeline = Pipeline::new(RomaConfig::default());
        // Handed over in the "wrong" order: Orbis first, Pleiades second.
        let output = pipeline
            .run(vec![
                location_batch(SourceName::Orbis, &[("5", "Rome", 41.89, 12.49)]),
                location_batch(SourceName::Pleiades, &[("1", "Roma", 41.9, 12.5)]),
            ])
            .unwrap();

        // One entity, seeded by the higher-priority source.
        assert_eq!(output.tables.locations.len(), 1);
        assert_eq!(output.tables.locations[0].name_latin, "Roma");
        assert_eq!(output.priority_version, 1);
    }

    #[test]
    fn test_cancellation_before_first_source() {
        let pipeline = Pipeline::new(RomaConfig::default());
        let token = CancellationToken::new();
        token.cancel();
        let result = pipeline.run_cancellable(
            vec![location_batch(SourceName::Pleiades, &[("1", "Roma", 41.9, 12.5)])],
            &token,
        );
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }

    #[test]
    fn test_table_counts_reported() {
        let pipeline = Pipeline::new(RomaConfig::default());
        let output = pipeline
            .run(vec![location_batch(
                SourceName::Pleiades,
                &[("1", "Roma", 41.9, 12.5)],
            )])
            .unwrap();
        let counts: std::collections::HashMap<_, _> =
            output.report.table_counts.iter().cloned().collect();
        assert_eq!(counts["locations"], 1);
        assert_eq!(counts["travel_network"], 0);
    }
}
