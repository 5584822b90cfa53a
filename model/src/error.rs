//! FILENAME: model/src/error.rs

use thiserror::Error;

/// Caller-correctable configuration problems. Always surfaced verbatim,
/// never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("cross-measures cannot span multiple entity dimensions (measure '{0}')")]
    MultiEntityCrossMeasure(String),

    #[error("cross-measures without an entity type must have a filter mapping (measure '{0}')")]
    MissingFilterMapping(String),

    #[error("malformed mapping entry '{0}'")]
    MalformedMappingEntry(String),

    #[error("malformed value range '{spec}': {reason}")]
    MalformedRange { spec: String, reason: String },

    #[error("descending value range '{spec}': {hi} is below {lo}")]
    DescendingRange { spec: String, lo: i64, hi: i64 },

    #[error("cannot build crosstab breaks from a range mapping (measure '{0}')")]
    RangeMappingBreak(String),
}

/// Terminal failure of a crosstab request. No partial or degraded result is
/// ever returned alongside one of these.
#[derive(Error, Debug)]
pub enum CrosstabError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("cartesian product of {actual} filter tuples exceeds the cap of {cap}")]
    Capacity { actual: usize, cap: usize },

    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error("measure not found: '{0}'")]
    UnknownMeasure(String),

    #[error("aggregation failed: {0}")]
    Aggregation(String),

    #[error("request cancelled")]
    Cancelled,
}

impl CrosstabError {
    /// True for the programmer/ordering-bug class that must never be
    /// caught and continued from.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, CrosstabError::Invariant(_))
    }
}
