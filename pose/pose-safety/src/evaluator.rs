//! Joint evaluator: classifies one measured angle against its threshold range.
//!
//! # Severity Policy
//!
//! ```text
//!            critical | warning |        ok        | warning | critical
//!  ----------+--------+---------[min ----------- max]---------+--------+------
//!           min - m                                         max + m
//! ```
//!
//! Boundaries are inclusive: an angle exactly at `min` or `max` is within
//! range, and a deviation of exactly `m` is still a warning.

use pose_types::{JointAngleMeasurement, JointCategory, ThresholdRange};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::table::ThresholdTable;

/// Where a measured angle falls relative to its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointStatus {
    /// `min <= angle <= max`.
    WithinRange,
    /// `angle < min`.
    BelowMin,
    /// `angle > max`.
    AboveMax,
}

/// How serious a verdict is. Ordered `Ok < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Within range.
    Ok,
    /// Outside range by no more than the tolerance margin.
    Warning,
    /// Outside range by more than the tolerance margin.
    Critical,
}

impl Severity {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Tolerance margin beyond a range boundary that still counts as a warning.
///
/// # Example
///
/// ```
/// use pose_safety::ToleranceMargin;
/// use pose_types::{JointCategory, ThresholdRange};
///
/// let elbow = ThresholdRange::new(JointCategory::elbow(), 80.0, 160.0).unwrap();
/// assert!((ToleranceMargin::Fraction(0.1).degrees_for(&elbow) - 8.0).abs() < 1e-12);
/// assert!((ToleranceMargin::Degrees(5.0).degrees_for(&elbow) - 5.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceMargin {
    /// Absolute margin in degrees.
    Degrees(f64),
    /// Margin as a fraction of the range width.
    Fraction(f64),
}

impl Default for ToleranceMargin {
    fn default() -> Self {
        Self::Fraction(0.1)
    }
}

impl ToleranceMargin {
    /// Resolves the margin in degrees for a given range.
    #[must_use]
    pub fn degrees_for(&self, range: &ThresholdRange) -> f64 {
        match *self {
            Self::Degrees(d) => d,
            Self::Fraction(f) => f * range.width(),
        }
    }

    /// Returns `true` if the margin is finite and non-negative.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let v = match *self {
            Self::Degrees(v) | Self::Fraction(v) => v,
        };
        v.is_finite() && v >= 0.0
    }
}

/// Evaluation knobs shared by every joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationParams {
    /// Severity tolerance margin.
    pub tolerance: ToleranceMargin,
    /// Measurements below this confidence are flagged low-confidence.
    pub min_confidence: f64,
}

impl Default for EvaluationParams {
    fn default() -> Self {
        Self {
            tolerance: ToleranceMargin::default(),
            min_confidence: 0.5,
        }
    }
}

impl EvaluationParams {
    /// Sets the tolerance margin.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: ToleranceMargin) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the low-confidence threshold.
    #[must_use]
    pub const fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }
}

/// The classification of one measured joint angle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JointVerdict {
    /// Joint name, e.g. `left_knee`.
    pub joint: String,
    /// Joint category.
    pub category: JointCategory,
    /// Measured angle in degrees.
    pub angle: f64,
    /// Range the angle was compared against.
    pub range: ThresholdRange,
    /// Position relative to the range.
    pub status: JointStatus,
    /// Severity before any low-confidence downgrade.
    pub severity: Severity,
    /// Measurement confidence.
    pub confidence: f64,
    /// Confidence was below the configured minimum.
    pub low_confidence: bool,
}

impl JointVerdict {
    /// Degrees outside the range, `0.0` when within.
    #[must_use]
    pub fn deviation(&self) -> f64 {
        self.range.distance_outside(self.angle)
    }

    /// Severity used for aggregation.
    ///
    /// A low-confidence critical verdict counts as a warning: a noisy
    /// detection must not force an unsafe call on its own.
    #[must_use]
    pub fn effective_severity(&self) -> Severity {
        if self.low_confidence && self.severity == Severity::Critical {
            Severity::Warning
        } else {
            self.severity
        }
    }

    /// Returns `true` if the angle is outside its range.
    #[must_use]
    pub fn is_flagged(&self) -> bool {
        self.status != JointStatus::WithinRange
    }
}

/// Classifies a measurement against an already resolved range.
///
/// Only an angle inside the range is `WithinRange`; anything else, including
/// a value that compares false both ways, is out of range.
#[must_use]
pub fn classify(
    measurement: &JointAngleMeasurement,
    range: &ThresholdRange,
    params: &EvaluationParams,
) -> JointVerdict {
    let angle = measurement.angle();
    let status = if range.contains(angle) {
        JointStatus::WithinRange
    } else if angle < range.min() {
        JointStatus::BelowMin
    } else {
        JointStatus::AboveMax
    };

    let severity = match status {
        JointStatus::WithinRange => Severity::Ok,
        JointStatus::BelowMin | JointStatus::AboveMax => {
            // NaN distance fails the comparison and lands on critical.
            if range.distance_outside(angle) <= params.tolerance.degrees_for(range) {
                Severity::Warning
            } else {
                Severity::Critical
            }
        }
    };

    let low_confidence = measurement.confidence() < params.min_confidence;

    debug!(
        joint = %measurement.joint(),
        category = %measurement.category(),
        angle,
        ?status,
        ?severity,
        low_confidence,
        "Evaluated joint"
    );

    JointVerdict {
        joint: measurement.joint().to_string(),
        category: measurement.category().clone(),
        angle,
        range: range.clone(),
        status,
        severity,
        confidence: measurement.confidence(),
        low_confidence,
    }
}

/// Evaluates a measurement against the threshold table.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownJointCategory`] if the measurement's category
/// is not in the table. The engine rules this out at startup.
///
/// # Example
///
/// ```
/// use pose_safety::{EvaluationParams, JointStatus, Severity, ThresholdTable, ToleranceMargin, evaluate};
/// use pose_types::{JointAngleMeasurement, JointCategory};
///
/// let table = ThresholdTable::defaults().unwrap();
/// let params = EvaluationParams::default().with_tolerance(ToleranceMargin::Degrees(8.0));
///
/// let knee = JointAngleMeasurement::from_angle("left_knee", JointCategory::knee(), 55.0, 0.9).unwrap();
/// let verdict = evaluate(&knee, &table, &params).unwrap();
/// assert_eq!(verdict.status, JointStatus::BelowMin);
/// assert_eq!(verdict.severity, Severity::Critical);
/// ```
pub fn evaluate(
    measurement: &JointAngleMeasurement,
    table: &ThresholdTable,
    params: &EvaluationParams,
) -> ConfigResult<JointVerdict> {
    let range = table.range_for(measurement.category()).map_err(|_| {
        ConfigError::unknown_category(measurement.joint(), measurement.category().as_str())
    })?;
    Ok(classify(measurement, range, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(margin: f64) -> EvaluationParams {
        EvaluationParams::default().with_tolerance(ToleranceMargin::Degrees(margin))
    }

    fn knee(angle: f64) -> JointAngleMeasurement {
        JointAngleMeasurement::from_angle("left_knee", JointCategory::knee(), angle, 0.9).unwrap()
    }

    fn elbow(angle: f64) -> JointAngleMeasurement {
        JointAngleMeasurement::from_angle("left_elbow", JointCategory::elbow(), angle, 0.9).unwrap()
    }

    #[test]
    fn elbow_within_range() {
        let v = evaluate(&elbow(150.0), &ThresholdTable::defaults().unwrap(), &params(8.0)).unwrap();
        assert_eq!(v.status, JointStatus::WithinRange);
        assert_eq!(v.severity, Severity::Ok);
        assert!(!v.is_flagged());
        assert_relative_eq!(v.deviation(), 0.0);
    }

    #[test]
    fn knee_far_below_is_critical() {
        let v = evaluate(&knee(55.0), &ThresholdTable::defaults().unwrap(), &params(8.0)).unwrap();
        assert_eq!(v.status, JointStatus::BelowMin);
        assert_eq!(v.severity, Severity::Critical);
        assert_relative_eq!(v.deviation(), 35.0);
    }

    #[test]
    fn boundaries_are_inclusive() {
        let table = ThresholdTable::defaults().unwrap();
        for angle in [90.0, 170.0] {
            let v = evaluate(&knee(angle), &table, &params(8.0)).unwrap();
            assert_eq!(v.status, JointStatus::WithinRange, "angle {angle}");
            assert_eq!(v.severity, Severity::Ok);
        }
    }

    #[test]
    fn margin_edges() {
        let table = ThresholdTable::defaults().unwrap();
        let m = 8.0;

        let half = evaluate(&knee(170.0 + m / 2.0), &table, &params(m)).unwrap();
        assert_eq!(half.status, JointStatus::AboveMax);
        assert_eq!(half.severity, Severity::Warning);

        let exact = evaluate(&knee(170.0 + m), &table, &params(m)).unwrap();
        assert_eq!(exact.severity, Severity::Warning);

        let beyond = evaluate(&knee(170.0 + m + 1e-6), &table, &params(m)).unwrap();
        assert_eq!(beyond.severity, Severity::Critical);

        let below = evaluate(&knee(90.0 - m / 2.0), &table, &params(m)).unwrap();
        assert_eq!(below.status, JointStatus::BelowMin);
        assert_eq!(below.severity, Severity::Warning);
    }

    #[test]
    fn fraction_margin_scales_with_width() {
        let table = ThresholdTable::defaults().unwrap();
        let p = EvaluationParams::default().with_tolerance(ToleranceMargin::Fraction(0.1));
        // hip range is [60, 180], width 120 -> margin 12
        let hip = JointAngleMeasurement::from_angle("left_hip", JointCategory::hip(), 49.0, 0.9)
            .unwrap();
        assert_eq!(evaluate(&hip, &table, &p).unwrap().severity, Severity::Warning);
        let hip = JointAngleMeasurement::from_angle("left_hip", JointCategory::hip(), 47.0, 0.9)
            .unwrap();
        assert_eq!(evaluate(&hip, &table, &p).unwrap().severity, Severity::Critical);
    }

    #[test]
    fn zero_margin_is_binary() {
        let v = evaluate(&knee(170.5), &ThresholdTable::defaults().unwrap(), &params(0.0)).unwrap();
        assert_eq!(v.severity, Severity::Critical);
    }

    #[test]
    fn low_confidence_downgrades_critical_only() {
        let table = ThresholdTable::defaults().unwrap();
        let p = params(8.0).with_min_confidence(0.5);

        let noisy = JointAngleMeasurement::from_angle("left_knee", JointCategory::knee(), 55.0, 0.2)
            .unwrap();
        let v = evaluate(&noisy, &table, &p).unwrap();
        assert!(v.low_confidence);
        assert_eq!(v.severity, Severity::Critical);
        assert_eq!(v.effective_severity(), Severity::Warning);

        let noisy_ok = JointAngleMeasurement::from_angle("left_knee", JointCategory::knee(), 120.0, 0.2)
            .unwrap();
        let v = evaluate(&noisy_ok, &table, &p).unwrap();
        assert!(v.low_confidence);
        assert_eq!(v.effective_severity(), Severity::Ok);
    }

    #[test]
    fn confidence_at_threshold_is_not_low() {
        let m = JointAngleMeasurement::from_angle("left_knee", JointCategory::knee(), 55.0, 0.5)
            .unwrap();
        let v = evaluate(&m, &ThresholdTable::defaults().unwrap(), &params(8.0)).unwrap();
        assert!(!v.low_confidence);
        assert_eq!(v.effective_severity(), Severity::Critical);
    }

    #[test]
    fn unknown_category_fails() {
        let m = JointAngleMeasurement::from_angle("left_wrist", JointCategory::new("wrist"), 90.0, 1.0)
            .unwrap();
        let err = evaluate(&m, &ThresholdTable::defaults().unwrap(), &params(8.0)).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownJointCategory { joint, .. } if joint == "left_wrist"));
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Ok < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
        assert_eq!(Severity::Critical.as_str(), "critical");
    }

    #[test]
    fn tolerance_validity() {
        assert!(ToleranceMargin::Degrees(0.0).is_valid());
        assert!(!ToleranceMargin::Degrees(-1.0).is_valid());
        assert!(!ToleranceMargin::Fraction(f64::NAN).is_valid());
    }
}
