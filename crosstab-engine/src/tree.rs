//! FILENAME: crosstab-engine/src/tree.rs
//! Break Category Tree Builder - turns nested cross-measures into parallel trees.
//!
//! One recursion produces two positionally-aligned structures:
//! - the computation tree: a flat, ordered list of leaves handed to the
//!   external aggregator, with strictly increasing start indices in
//!   depth-first, sibling-ordered traversal order
//! - the presentation tree: hierarchical named categories with per-sibling
//!   significance letters
//!
//! Because both sides come out of the same walk, a flat result array from the
//! aggregator zips back onto presentation leaves by simple sequential
//! pairing. A count mismatch is a fatal invariant violation, never truncated.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use model::{CrosstabError, InstanceId, MeasureRepository};

use crate::definition::CrossMeasure;
use crate::resolve::{resolve_filter_instances, FilterInstance, FilterKey};
use crate::view::{break_leaf_ids, CategoryNode, LeafColumn, LeafGroup, TOTAL_COLUMN_ID};

// ============================================================================
// COMPUTATION TREE
// ============================================================================

/// One unit of work for the external aggregator; corresponds 1:1 with a
/// presentation-tree leaf column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationLeaf {
    /// The presentation column this leaf's result lands in.
    pub column_id: String,

    /// Raw response values to match; empty means no value restriction.
    pub values: SmallVec<[i64; 4]>,

    /// Whether `values` holds range endpoints rather than a discrete list.
    pub is_range: bool,

    /// Matches "not these values" instead.
    pub inverted: bool,

    /// Base-population entity instances accumulated from ancestor filters.
    pub base_instances: Vec<InstanceId>,

    /// Global result-array slot, increasing in depth-first traversal order.
    pub start_index: usize,
}

/// The computation unit for a Total column: no response-value restriction.
pub fn total_leaf() -> ComputationLeaf {
    ComputationLeaf {
        column_id: TOTAL_COLUMN_ID.to_string(),
        values: SmallVec::new(),
        is_range: false,
        inverted: false,
        base_instances: Vec::new(),
        start_index: 0,
    }
}

// ============================================================================
// BREAK PLAN
// ============================================================================

/// The two parallel trees plus the sibling leaf groups, built once per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakPlan {
    /// Category roots: entity, Total, then the measure-driven subtree.
    pub categories: Vec<CategoryNode>,

    /// Flat computation tree in depth-first order.
    pub leaves: Vec<ComputationLeaf>,

    /// Sibling leaf groups below the synthetic roots.
    pub leaf_groups: Vec<LeafGroup>,
}

impl BreakPlan {
    /// Leaf columns of the measure-driven subtree, synthetic roots excluded.
    pub fn presentation_leaf_count(&self) -> usize {
        break_leaf_ids(&self.categories).len()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Significance identifier for a sibling position. Reused at every depth.
pub fn sibling_letter(index: usize) -> char {
    char::from(b'a' + (index % 26) as u8)
}

/// Recursive builder over the request's cross-measure tree.
pub struct BreakTreeBuilder<'a> {
    repo: &'a dyn MeasureRepository,
    leaves: Vec<ComputationLeaf>,
    leaf_groups: Vec<LeafGroup>,
    next_index: usize,
}

impl<'a> BreakTreeBuilder<'a> {
    pub fn new(repo: &'a dyn MeasureRepository) -> Self {
        BreakTreeBuilder {
            repo,
            leaves: Vec::new(),
            leaf_groups: Vec::new(),
            next_index: 0,
        }
    }

    /// Builds the break plan for the given top-level cross-measures.
    pub fn build(mut self, cross_measures: &[CrossMeasure]) -> Result<BreakPlan, CrosstabError> {
        let subtree = self.build_level(cross_measures, &[], &[])?;

        // The synthetic roots are prepended outside the recursion.
        let mut categories = vec![CategoryNode::entity_root(), CategoryNode::total_root()];
        categories.extend(subtree);

        let plan = BreakPlan {
            categories,
            leaves: self.leaves,
            leaf_groups: self.leaf_groups,
        };

        let presentation = plan.presentation_leaf_count();
        if presentation != plan.leaves.len() {
            return Err(CrosstabError::Invariant(format!(
                "presentation tree has {presentation} leaf columns but the computation tree has {}",
                plan.leaves.len()
            )));
        }

        log::debug!(
            "break plan: {} leaf columns in {} sibling groups",
            plan.leaves.len(),
            plan.leaf_groups.len()
        );
        Ok(plan)
    }

    fn build_level(
        &mut self,
        siblings: &[CrossMeasure],
        ancestors: &[String],
        base_instances: &[InstanceId],
    ) -> Result<Vec<CategoryNode>, CrosstabError> {
        let mut nodes = Vec::new();

        for (sibling_index, cross) in siblings.iter().enumerate() {
            let measure = self.repo.lookup_measure(&cross.measure)?;
            let filters = resolve_filter_instances(&measure, cross, self.repo)?;

            if cross.children.is_empty() {
                // Leaf measure: its filters become leaf columns and one
                // sibling group.
                let mut leaf_nodes = Vec::with_capacity(filters.len());
                let mut columns = Vec::with_capacity(filters.len());

                for (filter_index, filter) in filters.iter().enumerate() {
                    let id = column_id(ancestors, sibling_index, &measure.name, &filter.name);
                    let letter = sibling_letter(filter_index);
                    self.push_leaf(&id, filter, base_instances);
                    columns.push(LeafColumn {
                        id: id.clone(),
                        letter,
                    });
                    leaf_nodes.push(CategoryNode::break_category(
                        id,
                        filter.name.clone(),
                        letter,
                    ));
                }

                let comparand = cross.comparand.as_ref().and_then(|name| {
                    filters
                        .iter()
                        .position(|f| &f.name == name)
                        .map(|i| columns[i].id.clone())
                });
                self.leaf_groups.push(LeafGroup {
                    measure: measure.name.clone(),
                    columns,
                    comparand,
                });

                if ancestors.is_empty() {
                    // Top-level leaf measure: one extra category level named
                    // after the measure keeps single-level breakdowns
                    // visually consistent with multi-level ones.
                    let mut wrapper = CategoryNode::break_category(
                        format!("{}{}", sibling_index, measure.name),
                        measure.display_name.clone(),
                        sibling_letter(sibling_index),
                    );
                    wrapper.children = leaf_nodes;
                    nodes.push(wrapper);
                } else {
                    nodes.extend(leaf_nodes);
                }
            } else {
                // Each filter spawns the full child subtree beneath it.
                for (filter_index, filter) in filters.iter().enumerate() {
                    let disambiguator =
                        format!("{}{}{}", sibling_index, measure.name, filter.name);
                    let id = format!("{}{}", ancestors.concat(), disambiguator);

                    let mut path = ancestors.to_vec();
                    path.push(disambiguator);

                    let mut base = base_instances.to_vec();
                    if let FilterKey::Instance(instance_id) = filter.key {
                        base.push(instance_id);
                    }

                    let children = self.build_level(&cross.children, &path, &base)?;
                    let mut node = CategoryNode::break_category(
                        id,
                        filter.name.clone(),
                        sibling_letter(filter_index),
                    );
                    node.children = children;
                    nodes.push(node);
                }
            }
        }

        Ok(nodes)
    }

    fn push_leaf(
        &mut self,
        column_id: &str,
        filter: &FilterInstance,
        base_instances: &[InstanceId],
    ) {
        let mut base = base_instances.to_vec();
        if let FilterKey::Instance(instance_id) = filter.key {
            base.push(instance_id);
        }
        self.leaves.push(ComputationLeaf {
            column_id: column_id.to_string(),
            values: filter.values.clone(),
            is_range: filter.is_range,
            inverted: filter.inverted,
            base_instances: base,
            start_index: self.next_index,
        });
        self.next_index += 1;
    }
}

fn column_id(
    ancestors: &[String],
    sibling_index: usize,
    measure_name: &str,
    filter_name: &str,
) -> String {
    format!(
        "{}{}{}{}",
        ancestors.concat(),
        sibling_index,
        measure_name,
        filter_name
    )
}
