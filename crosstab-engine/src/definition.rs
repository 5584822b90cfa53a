//! FILENAME: crosstab-engine/src/definition.rs
//! Crosstab Request Definition - The serializable configuration.
//!
//! This module contains all the types needed to DESCRIBE a crosstab request.
//! These structures are designed to be:
//! - Serializable (requests arrive over the wire and travel with saved reports)
//! - Immutable snapshots of caller intent; the engine only reads them

use serde::{Deserialize, Serialize};

use model::ReportWindow;

/// Default safety cap on the cartesian product of filter-dimension tuples.
pub const DEFAULT_COMBINATION_CAP: usize = 1000;

/// Default confidence level handed to the significance primitive.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

// ============================================================================
// CROSS-MEASURE TREE
// ============================================================================

/// One breakdown dimension ("break") in the request, recursively nested.
///
/// Each node names a measure whose resolved filter instances become columns;
/// its children sub-divide every one of those columns in turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossMeasure {
    /// Name of the measure to break by.
    pub measure: String,

    /// Explicit restrictions: entity-instance ids/names, or value-mapping
    /// entry names. Empty means "all".
    #[serde(default)]
    pub restrict_to: Vec<String>,

    /// Multiple-choice-by-value: columns match the measure's true values
    /// instead of the entity-instance id.
    #[serde(default)]
    pub by_value: bool,

    /// Optional filter name that within-break significance compares against
    /// exclusively, instead of every sibling pair.
    #[serde(default)]
    pub comparand: Option<String>,

    /// Nested sub-breaks applied to every column this node produces.
    #[serde(default)]
    pub children: Vec<CrossMeasure>,
}

impl CrossMeasure {
    pub fn new(measure: impl Into<String>) -> Self {
        CrossMeasure {
            measure: measure.into(),
            restrict_to: Vec::new(),
            by_value: false,
            comparand: None,
            children: Vec::new(),
        }
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

/// Which pairwise comparison the significance engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignificanceMode {
    /// No significance testing.
    None,
    /// Every non-Total column against the row's Total column.
    VsTotal,
    /// Every ordered column pair within each sibling leaf group.
    WithinBreak,
}

impl Default for SignificanceMode {
    fn default() -> Self {
        SignificanceMode::None
    }
}

/// A 1-based page window over the expanded filter-tuple list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    pub number: usize,
    pub size: usize,
}

/// Post-processing and statistics options for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrosstabOptions {
    /// Significance mode (mutually exclusive comparisons).
    #[serde(default)]
    pub significance: SignificanceMode,

    /// Confidence level for the external significance primitive.
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,

    /// Compute index scores relative to the row total.
    #[serde(default)]
    pub index_scores: bool,

    /// Strip columns whose value is <= 0 in every row.
    #[serde(default)]
    pub hide_empty_columns: bool,

    /// Merge dual-entity sub-tables into one nested table instead of
    /// returning them separately.
    #[serde(default)]
    pub show_as_single_table: bool,

    /// Optional page window over the filter-tuple list. Absent means all
    /// tuples; exceeding the cap is then a hard error, never truncation.
    #[serde(default)]
    pub page: Option<PageWindow>,

    /// Safety cap on the cartesian product of filter tuples.
    #[serde(default = "default_combination_cap")]
    pub max_combinations: usize,
}

fn default_confidence_level() -> f64 {
    DEFAULT_CONFIDENCE_LEVEL
}

fn default_combination_cap() -> usize {
    DEFAULT_COMBINATION_CAP
}

impl Default for CrosstabOptions {
    fn default() -> Self {
        CrosstabOptions {
            significance: SignificanceMode::None,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            index_scores: false,
            hide_empty_columns: false,
            show_as_single_table: false,
            page: None,
            max_combinations: DEFAULT_COMBINATION_CAP,
        }
    }
}

// ============================================================================
// MAIN REQUEST STRUCT
// ============================================================================

/// The complete definition of one crosstab request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrosstabRequest {
    /// The primary measure whose values fill the cells.
    pub measure: String,

    /// Top-level breakdown dimensions.
    #[serde(default)]
    pub cross_measures: Vec<CrossMeasure>,

    /// Period and weighting selection, passed through to the aggregator.
    #[serde(default)]
    pub window: ReportWindow,

    /// Statistics and post-processing options.
    #[serde(default)]
    pub options: CrosstabOptions,
}

impl CrosstabRequest {
    pub fn new(measure: impl Into<String>) -> Self {
        CrosstabRequest {
            measure: measure.into(),
            cross_measures: Vec::new(),
            window: ReportWindow::default(),
            options: CrosstabOptions::default(),
        }
    }
}
