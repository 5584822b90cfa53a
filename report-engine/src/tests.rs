//! FILENAME: report-engine/src/tests.rs
//! PURPOSE: Consolidated unit tests for the report composition crate.

use rustc_hash::FxHashMap;

use model::{EntityInstance, WeightedResult};

use crosstab_engine::definition::CrosstabOptions;
use crosstab_engine::view::{
    CategoryNode, CrosstabResults, CrosstabRow, CrosstabTable, LeafColumn, LeafGroup, TableSlice,
    TOTAL_COLUMN_ID,
};

use crate::compose::{compose_report, remove_empty_columns};
use crate::merge::{merge_flat, merge_nested};

// ============================================================================
// FIXTURES
// ============================================================================

fn cell(value: f64) -> WeightedResult {
    WeightedResult::new(value, value, 100.0, 100.0)
}

/// A single table with one break wrapper holding columns A and B.
fn two_column_table(a_values: [f64; 2], b_values: [f64; 2]) -> CrosstabTable {
    let mut wrapper = CategoryNode::break_category("0age".to_string(), "Age".to_string(), 'a');
    wrapper.children = vec![
        CategoryNode::break_category("colA".to_string(), "A".to_string(), 'a'),
        CategoryNode::break_category("colB".to_string(), "B".to_string(), 'b'),
    ];

    let rows = (0..2)
        .map(|i| {
            let mut cells: FxHashMap<String, WeightedResult> = FxHashMap::default();
            cells.insert(TOTAL_COLUMN_ID.to_string(), cell(50.0));
            cells.insert("colA".to_string(), cell(a_values[i]));
            cells.insert("colB".to_string(), cell(b_values[i]));
            CrosstabRow {
                instance_id: Some(i as u32 + 1),
                label: format!("Brand {}", i + 1),
                cells,
            }
        })
        .collect();

    CrosstabTable {
        title: "Awareness".to_string(),
        slices: Vec::new(),
        categories: vec![
            CategoryNode::entity_root(),
            CategoryNode::total_root(),
            wrapper,
        ],
        leaf_groups: vec![LeafGroup {
            measure: "age".to_string(),
            columns: vec![
                LeafColumn {
                    id: "colA".to_string(),
                    letter: 'a',
                },
                LeafColumn {
                    id: "colB".to_string(),
                    letter: 'b',
                },
            ],
            comparand: None,
        }],
        rows,
    }
}

/// A breakless sub-table sliced by one secondary-dimension instance.
fn sliced_total_table(
    instance: EntityInstance,
    totals: &[(u32, &str, f64, f64)],
) -> CrosstabTable {
    let rows = totals
        .iter()
        .map(|(id, label, count, base)| {
            let mut cells: FxHashMap<String, WeightedResult> = FxHashMap::default();
            cells.insert(
                TOTAL_COLUMN_ID.to_string(),
                WeightedResult::new(count / base, *count, *base, *base),
            );
            CrosstabRow {
                instance_id: Some(*id),
                label: label.to_string(),
                cells,
            }
        })
        .collect();

    CrosstabTable {
        title: instance.name.clone(),
        slices: vec![TableSlice {
            dimension: "Region".to_string(),
            instance,
        }],
        categories: vec![CategoryNode::entity_root(), CategoryNode::total_root()],
        leaf_groups: Vec::new(),
        rows,
    }
}

// ============================================================================
// EMPTY COLUMN REMOVAL
// ============================================================================

#[test]
fn empty_column_is_removed_and_counted() {
    let mut table = two_column_table([10.0, 11.0], [0.0, 0.0]);
    let hidden = remove_empty_columns(&mut table);
    assert_eq!(hidden, 1);

    for row in &table.rows {
        assert!(!row.cells.contains_key("colB"));
        assert!(row.cells.contains_key("colA"));
    }
    let wrapper = &table.categories[2];
    assert_eq!(wrapper.children.len(), 1);
    assert_eq!(wrapper.children[0].id, "colA");
    assert_eq!(table.leaf_groups[0].columns.len(), 1);
}

#[test]
fn columns_with_any_positive_value_survive() {
    let mut table = two_column_table([10.0, 11.0], [0.0, 5.0]);
    assert_eq!(remove_empty_columns(&mut table), 0);
    assert_eq!(table.categories[2].children.len(), 2);
}

#[test]
fn childless_intermediates_are_pruned() {
    let mut table = two_column_table([0.0, 0.0], [0.0, 0.0]);
    let hidden = remove_empty_columns(&mut table);
    assert_eq!(hidden, 2);

    // Both leaves went, so the wrapper goes too; the synthetic roots stay.
    assert_eq!(table.categories.len(), 2);
    assert!(table.leaf_groups.is_empty());
}

#[test]
fn compose_report_reports_hidden_columns() {
    let table = two_column_table([10.0, 11.0], [0.0, 0.0]);
    let results = CrosstabResults {
        sample_summary: CrosstabResults::summarize(std::slice::from_ref(&table)),
        tables: vec![table],
        hidden_columns: 0,
    };

    let options = CrosstabOptions {
        hide_empty_columns: true,
        ..CrosstabOptions::default()
    };
    let results = compose_report(results, &options).unwrap();
    assert_eq!(results.hidden_columns, 1);
    assert_eq!(results.tables.len(), 1);
}

// ============================================================================
// DUAL-ENTITY FLAT MERGE
// ============================================================================

#[test]
fn flat_merge_keys_columns_by_dimension_and_instance() {
    let north = sliced_total_table(
        EntityInstance::new(1, "North"),
        &[(1, "Brand A", 30.0, 100.0), (2, "Brand B", 20.0, 100.0)],
    );
    let south = sliced_total_table(
        EntityInstance::new(2, "South"),
        &[(1, "Brand A", 10.0, 100.0), (2, "Brand B", 40.0, 100.0)],
    );

    let merged = merge_flat(vec![north, south]).unwrap();
    assert_eq!(merged.rows.len(), 2);

    let row = &merged.rows[0];
    assert_eq!(row.cells.get("RegionNorth").unwrap().value, 0.3);
    assert_eq!(row.cells.get("RegionSouth").unwrap().value, 0.1);

    // Total = sum(counts) / sum(bases) across the flattened columns.
    let total = row.cells.get(TOTAL_COLUMN_ID).unwrap();
    assert_eq!(total.count, 40.0);
    assert_eq!(total.weighted_base, 200.0);
    assert_eq!(total.value, 0.2);

    let column_ids: Vec<&str> = merged.categories[2..].iter().map(|c| c.id.as_str()).collect();
    assert_eq!(column_ids, vec!["RegionNorth", "RegionSouth"]);
}

#[test]
fn compose_report_merges_breakless_sub_tables() {
    let north = sliced_total_table(EntityInstance::new(1, "North"), &[(1, "Brand A", 30.0, 100.0)]);
    let south = sliced_total_table(EntityInstance::new(2, "South"), &[(1, "Brand A", 10.0, 100.0)]);
    let results = CrosstabResults {
        sample_summary: Default::default(),
        tables: vec![north, south],
        hidden_columns: 0,
    };

    let merged = compose_report(results, &CrosstabOptions::default()).unwrap();
    assert_eq!(merged.tables.len(), 1);
    assert_eq!(merged.sample_summary.row_count, 1);
}

// ============================================================================
// DUAL-ENTITY NESTED MERGE
// ============================================================================

fn sliced_break_table(index_instance: (u32, &str)) -> CrosstabTable {
    let mut table = two_column_table([10.0, 11.0], [20.0, 21.0]);
    table.slices = vec![TableSlice {
        dimension: "Region".to_string(),
        instance: EntityInstance::new(index_instance.0, index_instance.1),
    }];
    table
}

#[test]
fn nested_merge_wraps_and_prefixes_each_sub_table() {
    let north = sliced_break_table((1, "North"));
    let south = sliced_break_table((2, "South"));

    let merged = merge_nested(vec![north, south]).unwrap();

    // Two wrappers behind the synthetic roots, one per slice.
    assert_eq!(merged.categories.len(), 4);
    let north_wrapper = &merged.categories[2];
    assert_eq!(north_wrapper.name, "North");
    // Nested Total leaf first, then the remapped break subtree.
    assert_eq!(north_wrapper.children[0].id, "0RegionNorthtotal");
    assert_eq!(north_wrapper.children[1].children[0].id, "0RegionNorthcolA");

    let row = &merged.rows[0];
    assert_eq!(row.cells.get("0RegionNorthcolA").unwrap().value, 10.0);
    assert_eq!(row.cells.get("1RegionSouthcolA").unwrap().value, 10.0);

    // Cross-table Total sums the nested Totals' counts and bases.
    let total = row.cells.get(TOTAL_COLUMN_ID).unwrap();
    assert_eq!(total.count, 100.0);
    assert_eq!(total.weighted_base, 200.0);

    // Leaf groups carry the remapped ids.
    assert_eq!(merged.leaf_groups.len(), 2);
    assert_eq!(merged.leaf_groups[0].columns[0].id, "0RegionNorthcolA");
}

#[test]
fn nested_merge_pads_shallower_blocks() {
    let deep = sliced_break_table((1, "North"));
    let shallow = sliced_total_table(EntityInstance::new(2, "South"), &[
        (1, "Brand 1", 30.0, 100.0),
        (2, "Brand 2", 20.0, 100.0),
    ]);

    let merged = merge_nested(vec![deep, shallow]).unwrap();

    let south_wrapper = &merged.categories[3];
    assert_eq!(south_wrapper.name, "South");
    // One pass-through level brings the shallow block to the common depth.
    assert_eq!(south_wrapper.children.len(), 1);
    assert_eq!(south_wrapper.children[0].id, "1RegionSouthpad0");
    assert_eq!(south_wrapper.children[0].children[0].id, "1RegionSouthtotal");
}
