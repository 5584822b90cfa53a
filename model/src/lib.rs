//! FILENAME: model/src/lib.rs
//! PURPOSE: Shared domain types for the crosstab engine workspace.
//! CONTEXT: Re-exports measures, entity catalogs, weighted results, and the
//! error taxonomy for use by the engine crates.

pub mod error;
pub mod measure;
pub mod result;

// Re-export commonly used types at the crate root
pub use error::{ConfigurationError, CrosstabError};
pub use measure::{
    EntityDimension, EntityInstance, FilterMapping, InstanceId, Measure, MeasureKind,
    MeasureRepository, TrueValues, POSITIVE_RESPONSE_MAX,
};
pub use result::{ReportWindow, SignificanceTester, SignificanceVerdict, WeightedResult};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_resolves_default_true_values() {
        let measure = Measure::new("awareness", "Awareness");
        let tv = measure.resolved_true_values();
        assert!(tv.is_range);
        assert_eq!(tv.values.as_slice(), &[1, POSITIVE_RESPONSE_MAX]);
    }

    #[test]
    fn it_keeps_configured_true_values() {
        let mut measure = Measure::new("nps", "NPS");
        measure.true_values = Some(TrueValues::list([9, 10]));
        let tv = measure.resolved_true_values();
        assert!(!tv.is_range);
        assert_eq!(tv.values.as_slice(), &[9, 10]);
    }

    #[test]
    fn weighted_result_round_trips_through_json() {
        let mut result = WeightedResult::new(42.5, 85.0, 200.0, 198.4);
        result.index_score = Some(110);
        result.significant_against = vec!['a', 'c'];

        let json = serde_json::to_string(&result).unwrap();
        let back: WeightedResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn configuration_errors_render_their_context() {
        let err = ConfigurationError::DescendingRange {
            spec: "5-2".to_string(),
            lo: 5,
            hi: 2,
        };
        assert!(err.to_string().contains("5-2"));

        let wrapped: CrosstabError = err.into();
        assert!(!wrapped.is_invariant_violation());
    }
}
