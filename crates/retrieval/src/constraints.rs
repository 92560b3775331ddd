//! Categorical constraints extracted from questions
//!
//! A constraint set maps attribute dimensions to include/exclude value sets
//! and is applied as a hard filter during candidate search. The per-dimension
//! filter is a tagged variant so that a value can never sit in both sides at
//! once; normalization gives exclusion precedence.

use astromenu_common::models::ChunkMetadata;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Attribute dimensions known to the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Restaurant,
    Planet,
    Chef,
    Ingredient,
    Technique,
}

impl Dimension {
    /// All dimensions, in canonical order
    pub const ALL: [Dimension; 5] = [
        Dimension::Restaurant,
        Dimension::Planet,
        Dimension::Chef,
        Dimension::Ingredient,
        Dimension::Technique,
    ];

    /// Payload key carried by indexed chunks for this dimension
    pub fn payload_key(&self) -> &'static str {
        match self {
            Dimension::Restaurant => "restaurant",
            Dimension::Planet => "planet",
            Dimension::Chef => "chef",
            Dimension::Ingredient => "ingredients",
            Dimension::Technique => "techniques",
        }
    }

    /// Whether a chunk carries a list of values for this dimension
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, Dimension::Ingredient | Dimension::Technique)
    }
}

/// Include/exclude filter for a single dimension.
///
/// An unconstrained dimension is simply absent from the constraint set, so
/// the invalid "both sides empty" state is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionFilter {
    Include(BTreeSet<String>),
    Exclude(BTreeSet<String>),
    Both {
        include: BTreeSet<String>,
        exclude: BTreeSet<String>,
    },
}

impl DimensionFilter {
    /// Build a filter from raw include/exclude values.
    ///
    /// Values are trimmed and empty strings dropped. A value appearing on
    /// both sides is pruned from the include side (exclusion takes
    /// precedence). Returns None when nothing remains.
    pub fn new(
        include: impl IntoIterator<Item = String>,
        exclude: impl IntoIterator<Item = String>,
    ) -> Option<Self> {
        let exclude: BTreeSet<String> = exclude
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        let include: BTreeSet<String> = include
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && !exclude.contains(v))
            .collect();

        match (include.is_empty(), exclude.is_empty()) {
            (true, true) => None,
            (false, true) => Some(DimensionFilter::Include(include)),
            (true, false) => Some(DimensionFilter::Exclude(exclude)),
            (false, false) => Some(DimensionFilter::Both { include, exclude }),
        }
    }

    /// Values the chunk must match
    pub fn include(&self) -> Option<&BTreeSet<String>> {
        match self {
            DimensionFilter::Include(set) => Some(set),
            DimensionFilter::Both { include, .. } => Some(include),
            DimensionFilter::Exclude(_) => None,
        }
    }

    /// Values the chunk must not match
    pub fn exclude(&self) -> Option<&BTreeSet<String>> {
        match self {
            DimensionFilter::Exclude(set) => Some(set),
            DimensionFilter::Both { exclude, .. } => Some(exclude),
            DimensionFilter::Include(_) => None,
        }
    }
}

/// Per-dimension include/exclude constraints over dish attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSet {
    filters: BTreeMap<Dimension, DimensionFilter>,
}

impl ConstraintSet {
    /// Insert a filter for a dimension, normalizing include/exclude overlap.
    ///
    /// Inserting an effectively empty filter leaves the dimension
    /// unconstrained.
    pub fn insert(
        &mut self,
        dimension: Dimension,
        include: impl IntoIterator<Item = String>,
        exclude: impl IntoIterator<Item = String>,
    ) {
        match DimensionFilter::new(include, exclude) {
            Some(filter) => {
                self.filters.insert(dimension, filter);
            }
            None => {
                self.filters.remove(&dimension);
            }
        }
    }

    /// Get the filter for a dimension, if constrained
    pub fn get(&self, dimension: Dimension) -> Option<&DimensionFilter> {
        self.filters.get(&dimension)
    }

    /// Whether no dimension is constrained
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Number of constrained dimensions
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Iterate over constrained dimensions in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &DimensionFilter)> {
        self.filters.iter().map(|(d, f)| (*d, f))
    }

    /// Evaluate the constraint set against chunk metadata.
    ///
    /// Logical AND across dimensions and across must/must-not within a
    /// dimension. Single-valued dimensions require the chunk value to be a
    /// member of the include set; list-valued dimensions require every
    /// included value to be present. Exclusions require absence in both
    /// cases. Matching is exact after trimming.
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        self.iter().all(|(dimension, filter)| {
            let values = chunk_values(dimension, metadata);

            if let Some(include) = filter.include() {
                let satisfied = if dimension.is_multi_valued() {
                    include.iter().all(|v| contains(&values, v))
                } else {
                    values.len() == 1 && include.iter().any(|v| contains(&values, v))
                };
                if !satisfied {
                    return false;
                }
            }

            if let Some(exclude) = filter.exclude() {
                if exclude.iter().any(|v| contains(&values, v)) {
                    return false;
                }
            }

            true
        })
    }
}

/// Chunk attribute values for a dimension
fn chunk_values<'a>(dimension: Dimension, metadata: &'a ChunkMetadata) -> Vec<&'a str> {
    match dimension {
        Dimension::Restaurant => vec![metadata.restaurant.as_str()],
        Dimension::Planet => metadata.planet.as_deref().into_iter().collect(),
        Dimension::Chef => metadata.chef.as_deref().into_iter().collect(),
        Dimension::Ingredient => metadata.ingredients.iter().map(String::as_str).collect(),
        Dimension::Technique => metadata.techniques.iter().map(String::as_str).collect(),
    }
}

fn contains(values: &[&str], needle: &str) -> bool {
    values.iter().any(|v| v.trim() == needle)
}
