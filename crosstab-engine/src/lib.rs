//! FILENAME: crosstab-engine/src/lib.rs
//! Crosstab subsystem for survey-analytics reports.
//!
//! This crate turns a recursively-nested breakdown specification into a flat,
//! positionally-ordered list of computation units for an external weighted
//! aggregator, plus a matching hierarchical column structure for
//! presentation, then reconciles the two and runs the comparative statistics.
//! It depends on `model` only for shared types and the repository seams.
//!
//! Layers:
//! - `definition`: Serializable request configuration (what the request IS)
//! - `mapping`: Value-mapping string parser
//! - `resolve`: Filter-instance resolution strategies
//! - `expand`: Cartesian expansion of simultaneous filter dimensions
//! - `tree`: Break/category tree builder (HOW columns come to be)
//! - `engine`: Async ordered aggregation and assembly (HOW we calculate)
//! - `significance`: Comparative statistics (HOW cells get annotated)
//! - `view`: Renderable output (WHAT we return)

pub mod definition;
pub mod engine;
pub mod expand;
pub mod mapping;
pub mod resolve;
pub mod significance;
pub mod tree;
pub mod view;

pub use definition::*;
pub use engine::{Aggregator, AggregationScope, CrosstabCalculator, MAX_AGGREGATION_FANOUT};
pub use expand::{expand_cartesian, page_window};
pub use mapping::{parse_value_mappings, ValueMapping};
pub use resolve::{resolve_filter_instances, resolution_strategy, FilterInstance, FilterKey, ResolutionStrategy};
pub use significance::{index_score, SignificanceContext};
pub use tree::{sibling_letter, total_leaf, BreakPlan, BreakTreeBuilder, ComputationLeaf};
pub use view::*;
