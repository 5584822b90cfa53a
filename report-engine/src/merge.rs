//! FILENAME: report-engine/src/merge.rs
//! Dual-entity table merges.
//!
//! A primary measure spanning two entity dimensions produces one sub-table
//! per secondary-dimension instance. These merges combine them:
//! - `merge_flat`: no further breaks; the per-instance Totals become named
//!   columns of a single table
//! - `merge_nested`: with breaks; each sub-table's category tree nests under
//!   a synthetic wrapper, depth-padded so all nested blocks are equally deep
//!
//! Both synthesize a cross-table Total per row from the summed counts and
//! bases of the merged cells, and both merge rows by entity-instance
//! identity. A row missing from any sub-table is an invariant violation.

use rustc_hash::FxHashMap;

use model::{CrosstabError, InstanceId, WeightedResult};

use crosstab_engine::tree::sibling_letter;
use crosstab_engine::view::{
    CategoryNode, CrosstabRow, CrosstabTable, LeafColumn, LeafGroup, NodeRole, TableSlice,
    TOTAL_COLUMN_ID,
};

// ============================================================================
// FLAT MERGE (no further breaks)
// ============================================================================

/// Flattens per-instance sub-tables into one table whose columns are keyed
/// `{dimension-name}{instance-name}`, with an aggregate Total prepended.
pub fn merge_flat(tables: Vec<CrosstabTable>) -> Result<CrosstabTable, CrosstabError> {
    let first = tables
        .first()
        .ok_or_else(|| CrosstabError::Invariant("no sub-tables to merge".to_string()))?;
    let dimension = slice_of(first)?.dimension.clone();

    let mut categories = vec![CategoryNode::entity_root(), CategoryNode::total_root()];
    let mut columns = Vec::with_capacity(tables.len());
    let mut keys = Vec::with_capacity(tables.len());
    for (i, table) in tables.iter().enumerate() {
        let slice = slice_of(table)?;
        let key = format!("{}{}", slice.dimension, slice.instance.name);
        let letter = sibling_letter(i);
        categories.push(CategoryNode::break_category(key.clone(), key.clone(), letter));
        columns.push(LeafColumn {
            id: key.clone(),
            letter,
        });
        keys.push(key);
    }

    let mut rows = Vec::with_capacity(first.rows.len());
    for seed in &first.rows {
        let mut cells: FxHashMap<String, WeightedResult> = FxHashMap::default();
        let mut count_sum = 0.0;
        let mut unweighted_sum = 0.0;
        let mut base_sum = 0.0;

        for (table, key) in tables.iter().zip(&keys) {
            let total = total_cell_of(table, seed)?;
            count_sum += total.count;
            unweighted_sum += total.unweighted_base;
            base_sum += total.weighted_base;
            cells.insert(key.clone(), total);
        }

        cells.insert(
            TOTAL_COLUMN_ID.to_string(),
            aggregate_total(count_sum, unweighted_sum, base_sum),
        );
        rows.push(CrosstabRow {
            instance_id: seed.instance_id,
            label: seed.label.clone(),
            cells,
        });
    }

    Ok(CrosstabTable {
        title: dimension.clone(),
        slices: Vec::new(),
        categories,
        leaf_groups: vec![LeafGroup {
            measure: dimension,
            columns,
            comparand: None,
        }],
        rows,
    })
}

// ============================================================================
// NESTED MERGE (with breaks, shown as a single table)
// ============================================================================

/// Nests each sub-table's category tree under a synthetic wrapper, padding
/// tree depth so all nested blocks are equal, and merges rows by
/// entity-instance identity.
pub fn merge_nested(tables: Vec<CrosstabTable>) -> Result<CrosstabTable, CrosstabError> {
    let first = tables
        .first()
        .ok_or_else(|| CrosstabError::Invariant("no sub-tables to merge".to_string()))?;
    let title = slice_of(first)?.dimension.clone();
    let seeds: Vec<(Option<InstanceId>, String)> = first
        .rows
        .iter()
        .map(|row| (row.instance_id, row.label.clone()))
        .collect();

    // Each nested block holds the sub-table's own Total leaf plus its break
    // subtree; the deepest block sets the padding target.
    let depths: Vec<usize> = tables
        .iter()
        .map(|table| nested_block_depth(&table.categories))
        .collect();
    let max_depth = depths.iter().copied().max().unwrap_or(1);

    let mut wrappers = Vec::with_capacity(tables.len());
    let mut leaf_groups = Vec::new();
    let mut prefixed: Vec<(String, CrosstabTable)> = Vec::with_capacity(tables.len());

    for (i, table) in tables.into_iter().enumerate() {
        let slice = slice_of(&table)?.clone();
        let prefix = format!("{}{}{}", i, slice.dimension, slice.instance.name);

        let mut children = Vec::new();
        children.push(CategoryNode::break_category(
            format!("{}{}", prefix, TOTAL_COLUMN_ID),
            "Total".to_string(),
            'a',
        ));
        for node in &table.categories {
            if matches!(node.role, NodeRole::BreakCategory) {
                children.push(remap_ids(node, &prefix));
            }
        }

        // Pad shallower blocks with pass-through levels.
        let mut level = children;
        for pad in 0..max_depth.saturating_sub(depths[i]) {
            let mut wrapper = CategoryNode::break_category(
                format!("{}pad{}", prefix, pad),
                slice.instance.name.clone(),
                'a',
            );
            wrapper.children = level;
            level = vec![wrapper];
        }

        let mut wrapper = CategoryNode::break_category(
            prefix.clone(),
            slice.instance.name.clone(),
            sibling_letter(i),
        );
        wrapper.children = level;
        wrappers.push(wrapper);

        for group in &table.leaf_groups {
            leaf_groups.push(LeafGroup {
                measure: group.measure.clone(),
                columns: group
                    .columns
                    .iter()
                    .map(|column| LeafColumn {
                        id: format!("{}{}", prefix, column.id),
                        letter: column.letter,
                    })
                    .collect(),
                comparand: group
                    .comparand
                    .as_ref()
                    .map(|id| format!("{}{}", prefix, id)),
            });
        }

        prefixed.push((prefix, table));
    }

    let mut rows = Vec::with_capacity(seeds.len());
    for (instance_id, label) in seeds {
        let mut cells: FxHashMap<String, WeightedResult> = FxHashMap::default();
        let mut count_sum = 0.0;
        let mut unweighted_sum = 0.0;
        let mut base_sum = 0.0;

        for (prefix, table) in &prefixed {
            let row = table
                .rows
                .iter()
                .find(|row| row.instance_id == instance_id)
                .ok_or_else(|| {
                    CrosstabError::Invariant(format!(
                        "row '{label}' missing from sub-table '{}' during merge",
                        table.title
                    ))
                })?;

            for (id, cell) in &row.cells {
                cells.insert(format!("{}{}", prefix, id), cell.clone());
            }
            let total = row.cells.get(TOTAL_COLUMN_ID).ok_or_else(|| {
                CrosstabError::Invariant(format!(
                    "total column missing from result map of row '{label}'"
                ))
            })?;
            count_sum += total.count;
            unweighted_sum += total.unweighted_base;
            base_sum += total.weighted_base;
        }

        cells.insert(
            TOTAL_COLUMN_ID.to_string(),
            aggregate_total(count_sum, unweighted_sum, base_sum),
        );
        rows.push(CrosstabRow {
            instance_id,
            label,
            cells,
        });
    }

    let mut categories = vec![CategoryNode::entity_root(), CategoryNode::total_root()];
    categories.extend(wrappers);

    Ok(CrosstabTable {
        title,
        slices: Vec::new(),
        categories,
        leaf_groups,
        rows,
    })
}

// ============================================================================
// HELPERS
// ============================================================================

fn slice_of(table: &CrosstabTable) -> Result<&TableSlice, CrosstabError> {
    table.slices.first().ok_or_else(|| {
        CrosstabError::Invariant(format!(
            "sub-table '{}' has no filter slice during dual-entity merge",
            table.title
        ))
    })
}

fn total_cell_of(table: &CrosstabTable, seed: &CrosstabRow) -> Result<WeightedResult, CrosstabError> {
    let row = table
        .rows
        .iter()
        .find(|row| row.instance_id == seed.instance_id)
        .ok_or_else(|| {
            CrosstabError::Invariant(format!(
                "row '{}' missing from sub-table '{}' during merge",
                seed.label, table.title
            ))
        })?;
    row.cells.get(TOTAL_COLUMN_ID).cloned().ok_or_else(|| {
        CrosstabError::Invariant(format!(
            "total column missing from result map of row '{}'",
            seed.label
        ))
    })
}

fn aggregate_total(count_sum: f64, unweighted_sum: f64, base_sum: f64) -> WeightedResult {
    let value = if base_sum > 0.0 {
        count_sum / base_sum
    } else {
        0.0
    };
    WeightedResult::new(value, count_sum, unweighted_sum, base_sum)
}

/// Depth of a sub-table's nested block: its Total leaf plus break subtree.
fn nested_block_depth(categories: &[CategoryNode]) -> usize {
    let break_depth = categories
        .iter()
        .filter(|node| matches!(node.role, NodeRole::BreakCategory))
        .map(subtree_depth)
        .max()
        .unwrap_or(0);
    // The nested Total leaf alone is one level deep.
    break_depth.max(1)
}

fn subtree_depth(node: &CategoryNode) -> usize {
    1 + node
        .children
        .iter()
        .map(subtree_depth)
        .max()
        .unwrap_or(0)
}

fn remap_ids(node: &CategoryNode, prefix: &str) -> CategoryNode {
    let mut remapped = CategoryNode::break_category(
        format!("{}{}", prefix, node.id),
        node.name.clone(),
        node.letter,
    );
    remapped.children = node
        .children
        .iter()
        .map(|child| remap_ids(child, prefix))
        .collect();
    remapped
}
