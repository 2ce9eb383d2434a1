//! Threshold table: joint category to safe angle range.

use std::collections::BTreeMap;

use pose_types::{JointCategory, ThresholdRange};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Raw `{min, max}` bounds as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleBounds {
    /// Lower bound in degrees.
    pub min: f64,
    /// Upper bound in degrees.
    pub max: f64,
}

impl AngleBounds {
    /// Creates bounds.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Immutable mapping from joint category to its inclusive safe range.
///
/// Built once at startup; the whole table is rejected if any entry is
/// invalid. Reads need no synchronization.
///
/// # Example
///
/// ```
/// use pose_safety::ThresholdTable;
/// use pose_types::JointCategory;
///
/// let table = ThresholdTable::defaults().unwrap();
/// let knee = table.range_for(&JointCategory::knee()).unwrap();
/// assert!((knee.min() - 90.0).abs() < f64::EPSILON);
/// assert!((knee.max() - 170.0).abs() < f64::EPSILON);
///
/// assert!(table.range_for(&JointCategory::new("wrist")).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ThresholdTable {
    ranges: BTreeMap<JointCategory, ThresholdRange>,
}

impl ThresholdTable {
    /// Builds a table from raw `(category name, bounds)` entries.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidThreshold`] if any range is invalid.
    /// - [`ConfigError::DuplicateCategory`] if two names normalize to the same category.
    /// - [`ConfigError::InvalidParameter`] if a category name is empty.
    pub fn from_bounds<I, S>(entries: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (S, AngleBounds)>,
        S: AsRef<str>,
    {
        let mut ranges = BTreeMap::new();
        for (name, bounds) in entries {
            let category = JointCategory::new(name);
            if category.is_empty() {
                return Err(ConfigError::invalid_parameter(
                    "thresholds",
                    "category name must not be empty",
                ));
            }
            let range = ThresholdRange::new(category.clone(), bounds.min, bounds.max)
                .map_err(ConfigError::InvalidThreshold)?;
            if ranges.insert(category.clone(), range).is_some() {
                return Err(ConfigError::DuplicateCategory(category.to_string()));
            }
        }
        Ok(Self { ranges })
    }

    /// The source system's defaults: elbow, knee, hip and shoulder.
    ///
    /// # Errors
    ///
    /// Fails like [`ThresholdTable::from_bounds`] if a built-in entry is invalid.
    pub fn defaults() -> ConfigResult<Self> {
        Self::from_bounds(default_bounds())
    }

    /// Looks up the range for a category.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownJointCategory`] if the category is absent.
    pub fn range_for(&self, category: &JointCategory) -> ConfigResult<&ThresholdRange> {
        self.ranges
            .get(category)
            .ok_or_else(|| ConfigError::unknown_category("", category.as_str()))
    }

    /// Returns `true` if the category has a range.
    #[must_use]
    pub fn contains(&self, category: &JointCategory) -> bool {
        self.ranges.contains_key(category)
    }

    /// Number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Returns `true` if the table has no categories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Iterates ranges in category name order.
    pub fn iter(&self) -> impl Iterator<Item = &ThresholdRange> {
        self.ranges.values()
    }
}

/// Default threshold bounds keyed by category name.
#[must_use]
pub fn default_bounds() -> BTreeMap<String, AngleBounds> {
    [
        ("elbow", AngleBounds::new(80.0, 160.0)),
        ("knee", AngleBounds::new(90.0, 170.0)),
        ("hip", AngleBounds::new(60.0, 180.0)),
        ("shoulder", AngleBounds::new(70.0, 180.0)),
    ]
    .into_iter()
    .map(|(name, bounds)| (name.to_string(), bounds))
    .collect()
}
