//! FILENAME: report-engine/src/compose.rs
//! Table Composer - post-processing of assembled crosstab results.
//!
//! Runs after the significance engine: strips empty columns on request, then
//! decides whether dual-entity sub-tables get merged into a single table
//! (flattened when there are no further breaks, nested when the caller asked
//! for one table) or returned separately.

use rustc_hash::FxHashSet;
use tokio_util::sync::CancellationToken;

use model::{CrosstabError, MeasureRepository, SignificanceTester};

use crosstab_engine::definition::{CrosstabOptions, CrosstabRequest};
use crosstab_engine::engine::{Aggregator, CrosstabCalculator};
use crosstab_engine::view::{break_leaf_ids, CategoryNode, CrosstabResults, CrosstabTable, NodeRole};

use crate::merge::{merge_flat, merge_nested};

/// Runs one crosstab request end to end: aggregation and statistics in the
/// engine, then composition here. Errors are terminal; nothing partial comes
/// back.
pub async fn run_crosstab(
    repo: &dyn MeasureRepository,
    aggregator: &dyn Aggregator,
    tester: &dyn SignificanceTester,
    request: &CrosstabRequest,
    cancel: &CancellationToken,
) -> Result<CrosstabResults, CrosstabError> {
    let results = CrosstabCalculator::new(repo, aggregator, tester)
        .calculate(request, cancel)
        .await?;
    compose_report(results, &request.options)
}

/// Finalizes the column set and table count of one result.
pub fn compose_report(
    mut results: CrosstabResults,
    options: &CrosstabOptions,
) -> Result<CrosstabResults, CrosstabError> {
    if options.hide_empty_columns {
        for table in &mut results.tables {
            results.hidden_columns += remove_empty_columns(table);
        }
    }

    if results.tables.len() > 1 {
        let has_breaks = results.tables.iter().any(|table| !table.leaf_groups.is_empty());
        if !has_breaks {
            results.tables = vec![merge_flat(std::mem::take(&mut results.tables))?];
        } else if options.show_as_single_table {
            results.tables = vec![merge_nested(std::mem::take(&mut results.tables))?];
        }
    }

    results.sample_summary = CrosstabResults::summarize(&results.tables);
    Ok(results)
}

// ============================================================================
// EMPTY COLUMN REMOVAL
// ============================================================================

/// Removes break columns whose value is <= 0 in every row, prunes the
/// matching leaf categories and any now-childless intermediates, and returns
/// how many columns were hidden. The synthetic entity and Total roots are
/// never candidates.
pub fn remove_empty_columns(table: &mut CrosstabTable) -> usize {
    let removed: Vec<String> = break_leaf_ids(&table.categories)
        .into_iter()
        .filter(|id| {
            table
                .rows
                .iter()
                .all(|row| row.cells.get(id).map_or(true, |cell| cell.value <= 0.0))
        })
        .collect();
    if removed.is_empty() {
        return 0;
    }

    let removed_set: FxHashSet<String> = removed.iter().cloned().collect();
    for row in &mut table.rows {
        for id in &removed {
            row.cells.remove(id);
        }
    }

    prune_removed(&mut table.categories, &removed_set);

    for group in &mut table.leaf_groups {
        group
            .columns
            .retain(|column| !removed_set.contains(&column.id));
        if let Some(comparand) = &group.comparand {
            if removed_set.contains(comparand) {
                group.comparand = None;
            }
        }
    }
    table.leaf_groups.retain(|group| !group.columns.is_empty());

    log::debug!("hid {} empty columns from '{}'", removed.len(), table.title);
    removed.len()
}

fn prune_removed(nodes: &mut Vec<CategoryNode>, removed: &FxHashSet<String>) {
    nodes.retain_mut(|node| {
        if !matches!(node.role, NodeRole::BreakCategory) {
            return true;
        }
        if node.children.is_empty() {
            !removed.contains(node.id.as_str())
        } else {
            prune_removed(&mut node.children, removed);
            !node.children.is_empty()
        }
    });
}
