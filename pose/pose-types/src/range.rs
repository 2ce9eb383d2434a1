//! Safe angle ranges per joint category.

use serde::Serialize;

use crate::category::JointCategory;
use crate::error::{PoseError, PoseResult};

/// Smallest representable joint angle in degrees.
pub const MIN_JOINT_ANGLE: f64 = 0.0;

/// Largest representable joint angle in degrees.
pub const MAX_JOINT_ANGLE: f64 = 180.0;

/// The inclusive safe interval `[min, max]` in degrees for a joint category.
///
/// Construction enforces `min < max` with both bounds finite and inside
/// `[0, 180]`; an existing `ThresholdRange` is always valid.
///
/// # Example
///
/// ```
/// use pose_types::{JointCategory, ThresholdRange};
///
/// let knee = ThresholdRange::new(JointCategory::knee(), 90.0, 170.0).unwrap();
/// assert!(knee.contains(90.0));
/// assert!(knee.contains(170.0));
/// assert!(!knee.contains(55.0));
/// assert!((knee.distance_outside(55.0) - 35.0).abs() < 1e-12);
///
/// assert!(ThresholdRange::new(JointCategory::knee(), 170.0, 90.0).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdRange {
    category: JointCategory,
    min: f64,
    max: f64,
}

impl ThresholdRange {
    /// Creates a validated range.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::InvalidRange`] if a bound is non-finite, outside
    /// `[0, 180]`, or `min >= max`.
    pub fn new(category: JointCategory, min: f64, max: f64) -> PoseResult<Self> {
        let reason = if !(min.is_finite() && max.is_finite()) {
            Some("bounds must be finite")
        } else if min < MIN_JOINT_ANGLE || max > MAX_JOINT_ANGLE {
            Some("bounds must lie within [0, 180]")
        } else if min >= max {
            Some("min must be below max")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(PoseError::invalid_range(category.as_str(), min, max, reason)),
            None => Ok(Self { category, min, max }),
        }
    }

    /// The joint category this range applies to.
    #[must_use]
    pub const fn category(&self) -> &JointCategory {
        &self.category
    }

    /// Lower bound in degrees (inclusive).
    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound in degrees (inclusive).
    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    /// Width of the range in degrees.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Returns `true` if the angle lies within the inclusive bounds.
    #[must_use]
    pub fn contains(&self, angle: f64) -> bool {
        (self.min..=self.max).contains(&angle)
    }

    /// Degrees by which the angle falls outside the range, `0.0` when inside.
    #[must_use]
    pub fn distance_outside(&self, angle: f64) -> f64 {
        if angle < self.min {
            self.min - angle
        } else if angle > self.max {
            angle - self.max
        } else {
            0.0
        }
    }
}
