//! FILENAME: crosstab-engine/src/view.rs
//! Crosstab View - the renderable result structure.
//!
//! This module holds everything the presentation/export layers consume:
//! the hierarchical category tree, per-row cell maps, and summary metadata.
//! Built fresh per request, discarded after response serialization.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use model::{EntityInstance, InstanceId, WeightedResult};

/// Column id of the synthetic entity-instance (row label) column.
pub const ENTITY_COLUMN_ID: &str = "entity";

/// Column id of the synthetic Total column.
pub const TOTAL_COLUMN_ID: &str = "total";

// ============================================================================
// CATEGORY TREE
// ============================================================================

/// What part a category node plays in the tree. Traversal code filters by
/// role; nothing counts tree levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    /// The synthetic row-label column.
    EntityRoot,
    /// The synthetic Total column.
    TotalRoot,
    /// A measure-driven break category.
    BreakCategory,
}

/// One node of the presentation tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryNode {
    /// Stable id built by concatenating ancestor disambiguators.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Significance identifier, assigned per sibling position and reused at
    /// every depth. Letters collide across distant subtrees on purpose:
    /// comparisons never cross sibling-group boundaries.
    pub letter: char,

    pub role: NodeRole,

    /// Ordered child categories.
    #[serde(default)]
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    pub fn entity_root() -> Self {
        CategoryNode {
            id: ENTITY_COLUMN_ID.to_string(),
            name: "Entity".to_string(),
            letter: 'a',
            role: NodeRole::EntityRoot,
            children: Vec::new(),
        }
    }

    pub fn total_root() -> Self {
        CategoryNode {
            id: TOTAL_COLUMN_ID.to_string(),
            name: "Total".to_string(),
            letter: 'b',
            role: NodeRole::TotalRoot,
            children: Vec::new(),
        }
    }

    pub fn break_category(id: String, name: String, letter: char) -> Self {
        CategoryNode {
            id,
            name,
            letter,
            role: NodeRole::BreakCategory,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Collects leaf column ids below this node in depth-first order.
    pub fn collect_leaf_ids(&self, out: &mut Vec<String>) {
        if self.is_leaf() {
            out.push(self.id.clone());
        } else {
            for child in &self.children {
                child.collect_leaf_ids(out);
            }
        }
    }
}

/// Leaf column ids of the measure-driven subtree (synthetic roots excluded),
/// in depth-first order.
pub fn break_leaf_ids(categories: &[CategoryNode]) -> Vec<String> {
    let mut ids = Vec::new();
    for node in categories {
        if matches!(node.role, NodeRole::BreakCategory) {
            node.collect_leaf_ids(&mut ids);
        }
    }
    ids
}

// ============================================================================
// SIBLING LEAF GROUPS
// ============================================================================

/// One column of a sibling leaf group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafColumn {
    pub id: String,
    pub letter: char,
}

/// A sibling leaf group: the leaf columns one cross-measure produced under
/// one parent. Within-break significance and index scores operate on these
/// groups, never on raw tree levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafGroup {
    /// Name of the measure that produced this group.
    pub measure: String,

    /// The group's columns, in sibling order.
    pub columns: Vec<LeafColumn>,

    /// Column id that within-break comparisons are restricted to, if any.
    #[serde(default)]
    pub comparand: Option<String>,
}

// ============================================================================
// TABLES AND ROWS
// ============================================================================

/// The secondary-dimension instance a sub-table was filtered by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSlice {
    pub dimension: String,
    pub instance: EntityInstance,
}

/// One entity-instance row: a label plus the column-id -> cell map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosstabRow {
    /// The entity instance this row represents, if the primary measure has
    /// an entity dimension.
    pub instance_id: Option<InstanceId>,

    /// Row label shown in the entity column.
    pub label: String,

    /// Weighted cells keyed by column id.
    pub cells: FxHashMap<String, WeightedResult>,
}

/// One crosstab table: category tree, sibling groups, and rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosstabTable {
    pub title: String,

    /// The filter-tuple instances this table was sliced by (empty for
    /// single-dimension measures).
    #[serde(default)]
    pub slices: Vec<TableSlice>,

    /// Category roots: entity, Total, then the measure-driven subtree.
    pub categories: Vec<CategoryNode>,

    /// Sibling leaf groups below the synthetic roots.
    #[serde(default)]
    pub leaf_groups: Vec<LeafGroup>,

    pub rows: Vec<CrosstabRow>,
}

// ============================================================================
// RESULTS
// ============================================================================

/// Sample-size metadata summarized across every row's Total cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub row_count: usize,
    pub lowest_unweighted_base: f64,
    pub highest_unweighted_base: f64,
}

/// The complete response of one crosstab request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosstabResults {
    /// Result tables; one unless a dual-entity measure produced unmerged
    /// sub-tables.
    pub tables: Vec<CrosstabTable>,

    /// How many empty columns post-processing removed.
    #[serde(default)]
    pub hidden_columns: usize,

    pub sample_summary: SampleSummary,
}

impl CrosstabResults {
    /// Recomputes the sample summary from the current tables.
    pub fn summarize(tables: &[CrosstabTable]) -> SampleSummary {
        let mut summary = SampleSummary::default();
        let mut lowest = f64::INFINITY;
        for table in tables {
            for row in &table.rows {
                summary.row_count += 1;
                if let Some(total) = row.cells.get(TOTAL_COLUMN_ID) {
                    lowest = lowest.min(total.unweighted_base);
                    summary.highest_unweighted_base =
                        summary.highest_unweighted_base.max(total.unweighted_base);
                }
            }
        }
        if lowest.is_finite() {
            summary.lowest_unweighted_base = lowest;
        }
        summary
    }
}
