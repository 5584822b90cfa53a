//! FILENAME: model/src/result.rs
//! Weighted results and the external statistics seam.

use serde::{Deserialize, Serialize};

use crate::measure::Measure;

// ============================================================================
// WEIGHTED RESULT
// ============================================================================

/// One weighted cell value as returned by the external aggregator.
///
/// The aggregator fills the first four fields; the significance engine
/// annotates the rest in place. `count` and `weighted_base` carry through so
/// merged tables can recompute totals as `sum(counts) / sum(bases)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedResult {
    /// The cell value (a share for yes/no measures, a mean for averages).
    pub value: f64,

    /// Weighted count of matching responses.
    pub count: f64,

    /// Unweighted sample size behind this cell.
    pub unweighted_base: f64,

    /// Weighted sample size behind this cell.
    pub weighted_base: f64,

    /// T-score against the comparison column, when computed.
    #[serde(default)]
    pub t_score: Option<f64>,

    /// Verdict of the vs-total comparison, when computed.
    #[serde(default)]
    pub significant: Option<bool>,

    /// Human-readable "+N% vs Total" style annotation.
    #[serde(default)]
    pub explanation: Option<String>,

    /// Significance identifiers of sibling columns this cell differs from.
    #[serde(default)]
    pub significant_against: Vec<char>,

    /// Index score relative to the row total (100 = on par).
    #[serde(default)]
    pub index_score: Option<i64>,
}

impl WeightedResult {
    pub fn new(value: f64, count: f64, unweighted_base: f64, weighted_base: f64) -> Self {
        WeightedResult {
            value,
            count,
            unweighted_base,
            weighted_base,
            t_score: None,
            significant: None,
            explanation: None,
            significant_against: Vec::new(),
            index_score: None,
        }
    }
}

// ============================================================================
// SIGNIFICANCE SEAM
// ============================================================================

/// Outcome of one pairwise significance test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignificanceVerdict {
    pub t_score: f64,
    pub significant: bool,
}

/// The external t-score/z-test primitive. The engines never look inside the
/// math; they only route the right cell pairs through it.
pub trait SignificanceTester: Send + Sync {
    fn significance(
        &self,
        measure: &Measure,
        a: &WeightedResult,
        b: &WeightedResult,
        confidence_level: f64,
    ) -> SignificanceVerdict;
}

// ============================================================================
// REPORT WINDOW
// ============================================================================

/// Period and weighting selection, passed through to the aggregator untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    #[serde(default)]
    pub period: Option<String>,

    #[serde(default)]
    pub weighting: Option<String>,
}
