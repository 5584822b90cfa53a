//! FILENAME: model/src/measure.rs
//! Measure and entity catalog types.
//!
//! These structures describe WHAT a report can be built from. They are:
//! - Serializable (definitions travel with saved reports)
//! - Loaded by an external repository
//! - Immutable snapshots; the engines read them, never mutate them

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::CrosstabError;

/// Unique identifier for an entity instance within a dimension.
pub type InstanceId = u32;

/// Upper bound used when a yes/no measure has no explicit true-value spec:
/// "any positive response value" is encoded as the range `1..=POSITIVE_RESPONSE_MAX`.
pub const POSITIVE_RESPONSE_MAX: i64 = i32::MAX as i64;

// ============================================================================
// MEASURE
// ============================================================================

/// How a measure's cell values are calculated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasureKind {
    /// Share of respondents matching the true-value spec.
    YesNo,
    /// Numeric average over matching responses.
    Average,
    /// Verbatim text; carries no comparable numeric value.
    Text,
}

impl Default for MeasureKind {
    fn default() -> Self {
        MeasureKind::YesNo
    }
}

/// The filter mapping a measure was configured with, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterMapping {
    /// Pipe-delimited `[!]values:name` entries (e.g. `"7:Love|5,6:Like|1-3:Dislike"`).
    Values(String),
    /// A single numeric band. Valid for filtering, but never as break columns.
    Range { lo: i64, hi: i64 },
}

/// Which raw response values count as a "yes" for a yes/no measure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrueValues {
    /// The matching values; for a range, the two inclusive endpoints.
    pub values: SmallVec<[i64; 4]>,
    /// Whether `values` holds range endpoints rather than a discrete list.
    pub is_range: bool,
}

impl TrueValues {
    pub fn list(values: impl IntoIterator<Item = i64>) -> Self {
        TrueValues {
            values: values.into_iter().collect(),
            is_range: false,
        }
    }

    pub fn range(lo: i64, hi: i64) -> Self {
        TrueValues {
            values: SmallVec::from_slice(&[lo, hi]),
            is_range: true,
        }
    }

    /// The default when a measure has no field driving its truth condition:
    /// any positive response value, treated as a range.
    pub fn any_positive() -> Self {
        TrueValues::range(1, POSITIVE_RESPONSE_MAX)
    }
}

/// A survey measure (question or derived variable).
///
/// Referenced by name from requests; owned by the external repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measure {
    /// Stable identifier used in requests and column ids.
    pub name: String,

    /// Human-readable name shown as a category header.
    pub display_name: String,

    /// Names of the entity dimensions this measure varies over (0, 1 or 2).
    pub entity_dimensions: Vec<String>,

    /// Optional mapping of raw response values to named groups.
    #[serde(default)]
    pub filter_mapping: Option<FilterMapping>,

    /// Which response values count as "yes" (yes/no measures only).
    #[serde(default)]
    pub true_values: Option<TrueValues>,

    /// How cell values are calculated.
    #[serde(default)]
    pub kind: MeasureKind,

    /// Whether this measure is classified as single-choice / custom-variable.
    #[serde(default)]
    pub single_choice: bool,
}

impl Measure {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Measure {
            name: name.into(),
            display_name: display_name.into(),
            entity_dimensions: Vec::new(),
            filter_mapping: None,
            true_values: None,
            kind: MeasureKind::YesNo,
            single_choice: false,
        }
    }

    /// Number of entity dimensions this measure spans.
    pub fn entity_span(&self) -> usize {
        self.entity_dimensions.len()
    }

    /// Resolves the true-value spec, falling back to "any positive value".
    pub fn resolved_true_values(&self) -> TrueValues {
        self.true_values.clone().unwrap_or_else(TrueValues::any_positive)
    }
}

// ============================================================================
// ENTITY CATALOG
// ============================================================================

/// A named axis (e.g. "Brand", "Region") whose instances form report rows
/// and filter columns. The instance set is owned by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDimension {
    pub name: String,
}

impl EntityDimension {
    pub fn new(name: impl Into<String>) -> Self {
        EntityDimension { name: name.into() }
    }
}

/// One concrete member of an entity dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInstance {
    pub id: InstanceId,
    pub name: String,
}

impl EntityInstance {
    pub fn new(id: InstanceId, name: impl Into<String>) -> Self {
        EntityInstance { id, name: name.into() }
    }
}

// ============================================================================
// REPOSITORY TRAIT
// ============================================================================

/// Read-only access to the measure and entity catalogs.
///
/// Implemented outside this workspace (database, API client, fixtures).
/// `instances_of` must return instances ordered by ascending id; the engines
/// rely on that order for deterministic column layout.
pub trait MeasureRepository: Send + Sync {
    fn lookup_measure(&self, name: &str) -> Result<Measure, CrosstabError>;

    fn entity_dimensions(&self, measure: &Measure) -> Vec<EntityDimension>;

    /// Instances of `dimension`, optionally restricted to the given subset.
    /// Subset entries may name an instance by id string or display name.
    fn instances_of(
        &self,
        dimension: &EntityDimension,
        subset: Option<&[String]>,
    ) -> Vec<EntityInstance>;
}
