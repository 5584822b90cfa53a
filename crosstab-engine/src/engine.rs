//! FILENAME: crosstab-engine/src/engine.rs
//! Crosstab Engine - drives one request from definition to results.
//!
//! Algorithm:
//! 1. Look up the primary measure and its entity dimensions
//! 2. Build the break plan (computation + presentation trees)
//! 3. Expand secondary dimensions into capped, pageable filter tuples
//! 4. Enumerate entity-instance rows
//! 5. Aggregate concurrently with bounded fan-out, collecting results in
//!    issue order (an order-preserving combinator, never a completion-order
//!    channel: positional zipping is the only reconciliation there is)
//! 6. Zip results onto presentation leaves; count mismatch is fatal
//! 7. Run the selected comparative statistics
//!
//! Every structure is request-scoped; nothing is cached or shared.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use rustc_hash::FxHashMap;
use tokio_util::sync::CancellationToken;

use model::{
    CrosstabError, InstanceId, Measure, MeasureRepository, ReportWindow, SignificanceTester,
    WeightedResult,
};

use crate::definition::{CrosstabRequest, SignificanceMode};
use crate::expand::{expand_cartesian, page_window};
use crate::significance::{
    annotate_vs_total, annotate_within_break, apply_index_scores, SignificanceContext,
};
use crate::tree::{total_leaf, BreakTreeBuilder, ComputationLeaf};
use crate::view::{
    CrosstabResults, CrosstabRow, CrosstabTable, TableSlice, TOTAL_COLUMN_ID,
};

/// Upper bound on concurrently outstanding aggregator calls.
pub const MAX_AGGREGATION_FANOUT: usize = 8;

// ============================================================================
// AGGREGATOR SEAM
// ============================================================================

/// The population a computation tree is evaluated against: entity instances
/// (row plus filter tuple) and the period/weighting window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationScope {
    pub instances: Vec<InstanceId>,
    pub window: ReportWindow,
}

/// The external weighted-aggregation primitive.
///
/// Must return exactly one result per computation leaf, in the order the
/// leaves were given (their depth-first order). Implementations should
/// observe the cancellation token and abort outstanding work cooperatively.
#[async_trait]
pub trait Aggregator: Send + Sync {
    async fn aggregate(
        &self,
        measure: &Measure,
        scope: &AggregationScope,
        leaves: &[ComputationLeaf],
        cancel: &CancellationToken,
    ) -> Result<Vec<WeightedResult>, CrosstabError>;
}

// ============================================================================
// CALCULATOR
// ============================================================================

/// One entity-instance row before aggregation.
#[derive(Debug, Clone)]
struct RowSeed {
    instance_id: Option<InstanceId>,
    label: String,
}

/// The main calculation engine for crosstab requests.
pub struct CrosstabCalculator<'a> {
    repo: &'a dyn MeasureRepository,
    aggregator: &'a dyn Aggregator,
    tester: &'a dyn SignificanceTester,
}

impl<'a> CrosstabCalculator<'a> {
    pub fn new(
        repo: &'a dyn MeasureRepository,
        aggregator: &'a dyn Aggregator,
        tester: &'a dyn SignificanceTester,
    ) -> Self {
        CrosstabCalculator {
            repo,
            aggregator,
            tester,
        }
    }

    /// Executes the full calculation and returns the assembled tables.
    ///
    /// Errors are terminal for the whole request: no retries, no partial or
    /// degraded result. Post-processing (empty-column removal, dual-entity
    /// merges) is the composer's job, downstream of this call.
    pub async fn calculate(
        &self,
        request: &CrosstabRequest,
        cancel: &CancellationToken,
    ) -> Result<CrosstabResults, CrosstabError> {
        // Step 1: primary measure and its dimensions
        let measure = self.repo.lookup_measure(&request.measure)?;
        let dimensions = self.repo.entity_dimensions(&measure);

        // Step 2: break plan (computation + presentation trees)
        let plan = BreakTreeBuilder::new(self.repo).build(&request.cross_measures)?;

        // Step 3: secondary dimensions slice the report into sub-tables
        let filter_lists: Vec<Vec<TableSlice>> = dimensions
            .iter()
            .skip(1)
            .map(|dimension| {
                self.repo
                    .instances_of(dimension, None)
                    .into_iter()
                    .map(|instance| TableSlice {
                        dimension: dimension.name.clone(),
                        instance,
                    })
                    .collect()
            })
            .collect();
        let mut tuples = expand_cartesian(&filter_lists, request.options.max_combinations)?;
        if let Some(window) = &request.options.page {
            tuples = page_window(tuples, window);
        }

        // Step 4: rows from the primary dimension
        let rows: Vec<RowSeed> = match dimensions.first() {
            Some(dimension) => self
                .repo
                .instances_of(dimension, None)
                .into_iter()
                .map(|instance| RowSeed {
                    instance_id: Some(instance.id),
                    label: instance.name,
                })
                .collect(),
            None => vec![RowSeed {
                instance_id: None,
                label: measure.display_name.clone(),
            }],
        };

        if cancel.is_cancelled() {
            return Err(CrosstabError::Cancelled);
        }

        // Step 5: one job per (tuple, row), collected strictly in issue order
        let total = total_leaf();
        let mut scopes = Vec::with_capacity(tuples.len() * rows.len());
        for tuple in &tuples {
            for row in &rows {
                let mut instances: Vec<InstanceId> = Vec::new();
                if let Some(id) = row.instance_id {
                    instances.push(id);
                }
                instances.extend(tuple.iter().map(|slice| slice.instance.id));
                scopes.push(AggregationScope {
                    instances,
                    window: request.window.clone(),
                });
            }
        }

        log::debug!(
            "issuing {} aggregation jobs ({} tuples x {} rows, {} leaves each)",
            scopes.len(),
            tuples.len(),
            rows.len(),
            plan.leaves.len()
        );

        let outcomes: Vec<(WeightedResult, Vec<WeightedResult>)> = stream::iter(
            scopes
                .iter()
                .map(|scope| self.run_job(&measure, scope, &total, &plan.leaves, cancel)),
        )
        .buffered(MAX_AGGREGATION_FANOUT)
        .try_collect()
        .await?;

        if cancel.is_cancelled() {
            return Err(CrosstabError::Cancelled);
        }

        // Step 6: zip results back, one chunk of rows per tuple
        let mut tables = Vec::with_capacity(tuples.len());
        let mut outcome_iter = outcomes.into_iter();
        for tuple in tuples {
            let mut table_rows = Vec::with_capacity(rows.len());
            for seed in &rows {
                let (total_result, break_results) = outcome_iter.next().ok_or_else(|| {
                    CrosstabError::Invariant(
                        "aggregation outcome missing for a scheduled job".to_string(),
                    )
                })?;

                let mut cells = FxHashMap::default();
                cells.insert(TOTAL_COLUMN_ID.to_string(), total_result);
                for (leaf, result) in plan.leaves.iter().zip(break_results) {
                    cells.insert(leaf.column_id.clone(), result);
                }
                table_rows.push(CrosstabRow {
                    instance_id: seed.instance_id,
                    label: seed.label.clone(),
                    cells,
                });
            }

            let title = if tuple.is_empty() {
                measure.display_name.clone()
            } else {
                tuple
                    .iter()
                    .map(|slice| slice.instance.name.as_str())
                    .collect::<Vec<_>>()
                    .join(" / ")
            };
            tables.push(CrosstabTable {
                title,
                slices: tuple,
                categories: plan.categories.clone(),
                leaf_groups: plan.leaf_groups.clone(),
                rows: table_rows,
            });
        }

        // Step 7: comparative statistics per table
        let ctx = SignificanceContext {
            measure: &measure,
            tester: self.tester,
            confidence_level: request.options.confidence_level,
        };
        for table in &mut tables {
            match request.options.significance {
                SignificanceMode::None => {}
                SignificanceMode::VsTotal => annotate_vs_total(table, &ctx)?,
                SignificanceMode::WithinBreak => annotate_within_break(table, &ctx)?,
            }
            if request.options.index_scores {
                apply_index_scores(table)?;
            }
        }

        let sample_summary = CrosstabResults::summarize(&tables);
        Ok(CrosstabResults {
            tables,
            hidden_columns: 0,
            sample_summary,
        })
    }

    /// Runs one aggregation job: the row's Total cell plus every break leaf.
    async fn run_job(
        &self,
        measure: &Measure,
        scope: &AggregationScope,
        total: &ComputationLeaf,
        leaves: &[ComputationLeaf],
        cancel: &CancellationToken,
    ) -> Result<(WeightedResult, Vec<WeightedResult>), CrosstabError> {
        if cancel.is_cancelled() {
            return Err(CrosstabError::Cancelled);
        }

        let total_results = self
            .aggregator
            .aggregate(measure, scope, std::slice::from_ref(total), cancel)
            .await?;
        let total_result = total_results.into_iter().next().ok_or_else(|| {
            CrosstabError::Invariant("aggregator returned no result for the total column".to_string())
        })?;

        let break_results = if leaves.is_empty() {
            Vec::new()
        } else {
            self.aggregator
                .aggregate(measure, scope, leaves, cancel)
                .await?
        };
        if break_results.len() != leaves.len() {
            return Err(CrosstabError::Invariant(format!(
                "aggregator returned {} results for {} computation leaves",
                break_results.len(),
                leaves.len()
            )));
        }

        Ok((total_result, break_results))
    }
}
