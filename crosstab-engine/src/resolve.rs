//! FILENAME: crosstab-engine/src/resolve.rs
//! Filter Instance Resolver - decides which columns a cross-measure produces.
//!
//! The priority chain over a measure's shape (entity span, classification,
//! mapping) is compiled once into an explicit `ResolutionStrategy`, then
//! executed. Traversal code matches on the strategy instead of re-evaluating
//! predicate chains per call.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use model::{
    ConfigurationError, CrosstabError, EntityDimension, FilterMapping, InstanceId, Measure,
    MeasureRepository,
};

use crate::definition::CrossMeasure;
use crate::mapping::{parse_value_mappings, ValueMapping};

// ============================================================================
// FILTER INSTANCE
// ============================================================================

/// What a resolved column is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKey {
    /// An entity instance of the measure's dimension.
    Instance(InstanceId),
    /// A named value-mapping entry.
    Mapping,
}

/// One resolved column definition: a name plus the raw response values that
/// select its respondents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterInstance {
    pub name: String,
    pub key: FilterKey,
    /// Matching values; for a range, the two inclusive endpoints.
    pub values: SmallVec<[i64; 4]>,
    pub is_range: bool,
    pub inverted: bool,
}

// ============================================================================
// RESOLUTION STRATEGY
// ============================================================================

/// How a measure's columns are enumerated, decided once per measure.
#[derive(Debug, Clone)]
pub enum ResolutionStrategy {
    /// One column per entity instance, matching the measure's true values.
    ByInstanceTrueValues { dimension: EntityDimension },

    /// One column per entity instance, matching the instance id itself.
    ByInstance { dimension: EntityDimension },

    /// Columns from the measure's parsed value mapping.
    ByMapping { entries: Vec<ValueMapping> },
}

/// Compiles the resolution priority chain for one cross-measure node.
pub fn resolution_strategy(
    measure: &Measure,
    request: &CrossMeasure,
    repo: &dyn MeasureRepository,
) -> Result<ResolutionStrategy, CrosstabError> {
    let mut dimensions = repo.entity_dimensions(measure);
    if dimensions.len() > 1 {
        return Err(ConfigurationError::MultiEntityCrossMeasure(measure.name.clone()).into());
    }
    let dimension = dimensions.pop();

    if let Some(dimension) = &dimension {
        if !measure.single_choice {
            return Ok(if request.by_value {
                ResolutionStrategy::ByInstanceTrueValues {
                    dimension: dimension.clone(),
                }
            } else {
                ResolutionStrategy::ByInstance {
                    dimension: dimension.clone(),
                }
            });
        }
    }

    match &measure.filter_mapping {
        Some(FilterMapping::Values(encoded)) => {
            let entries = parse_value_mappings(encoded)?;
            let usable = request.restrict_to.is_empty()
                || request
                    .restrict_to
                    .iter()
                    .any(|r| entries.iter().any(|e| &e.name == r));
            if usable {
                return Ok(ResolutionStrategy::ByMapping { entries });
            }
        }
        Some(FilterMapping::Range { .. }) => {
            return Err(ConfigurationError::RangeMappingBreak(measure.name.clone()).into());
        }
        None => {}
    }

    if let Some(dimension) = dimension {
        return Ok(ResolutionStrategy::ByInstance { dimension });
    }

    Err(ConfigurationError::MissingFilterMapping(measure.name.clone()).into())
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Resolves the concrete column list for one cross-measure node.
pub fn resolve_filter_instances(
    measure: &Measure,
    request: &CrossMeasure,
    repo: &dyn MeasureRepository,
) -> Result<Vec<FilterInstance>, CrosstabError> {
    let strategy = resolution_strategy(measure, request, repo)?;
    let subset = if request.restrict_to.is_empty() {
        None
    } else {
        Some(request.restrict_to.as_slice())
    };

    let filters = match strategy {
        ResolutionStrategy::ByInstanceTrueValues { dimension } => {
            let true_values = measure.resolved_true_values();
            repo.instances_of(&dimension, subset)
                .into_iter()
                .map(|instance| FilterInstance {
                    name: instance.name,
                    key: FilterKey::Instance(instance.id),
                    values: true_values.values.clone(),
                    is_range: true_values.is_range,
                    inverted: false,
                })
                .collect()
        }
        ResolutionStrategy::ByInstance { dimension } => {
            // The entity id doubles as the response value here even though
            // the two are not guaranteed equal; existing report consumers
            // depend on the numbers this produces.
            repo.instances_of(&dimension, subset)
                .into_iter()
                .map(|instance| FilterInstance {
                    name: instance.name,
                    key: FilterKey::Instance(instance.id),
                    values: SmallVec::from_slice(&[instance.id as i64]),
                    is_range: false,
                    inverted: false,
                })
                .collect()
        }
        ResolutionStrategy::ByMapping { entries } => entries
            .into_iter()
            .filter(|entry| {
                request.restrict_to.is_empty() || request.restrict_to.contains(&entry.name)
            })
            .map(|entry| FilterInstance {
                name: entry.name,
                key: FilterKey::Mapping,
                values: entry.values,
                is_range: entry.is_range,
                inverted: entry.inverted,
            })
            .collect(),
    };

    Ok(filters)
}
