//! Pose safety aggregator: combines per-joint verdicts into one assessment.

use std::cmp::{Ordering, Reverse};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::evaluator::{JointVerdict, Severity};

/// Overall safety verdict for one detected body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseStatus {
    /// Every measured joint is within range.
    Safe,
    /// At least one warning, no (effective) critical verdicts.
    Caution,
    /// At least one effective critical verdict.
    Unsafe,
    /// No joint could be measured; safety is unknown.
    Indeterminate,
}

impl PoseStatus {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Caution => "caution",
            Self::Unsafe => "unsafe",
            Self::Indeterminate => "indeterminate",
        }
    }
}

/// The aggregated assessment of one analyzed frame or image.
///
/// Constructed only by [`aggregate`] and immutable afterwards. Both verdict
/// lists are in a canonical order, so the assessment depends only on the
/// set of input verdicts, never on their order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseAssessment {
    status: PoseStatus,
    flagged: Vec<JointVerdict>,
    verdicts: Vec<JointVerdict>,
}

impl PoseAssessment {
    /// Overall status.
    #[must_use]
    pub const fn status(&self) -> PoseStatus {
        self.status
    }

    /// Verdicts outside their range: effective severity descending, then
    /// category name, then joint name.
    #[must_use]
    pub fn flagged(&self) -> &[JointVerdict] {
        &self.flagged
    }

    /// All verdicts, ordered by category name then joint name.
    #[must_use]
    pub fn verdicts(&self) -> &[JointVerdict] {
        &self.verdicts
    }

    /// Returns `true` if the status is [`PoseStatus::Safe`].
    #[must_use]
    pub fn is_safe(&self) -> bool {
        self.status == PoseStatus::Safe
    }

    /// The indeterminate assessment (nothing could be measured).
    #[must_use]
    pub const fn indeterminate() -> Self {
        Self {
            status: PoseStatus::Indeterminate,
            flagged: Vec::new(),
            verdicts: Vec::new(),
        }
    }
}

fn canonical_order(a: &JointVerdict, b: &JointVerdict) -> Ordering {
    a.category
        .cmp(&b.category)
        .then_with(|| a.joint.cmp(&b.joint))
        .then_with(|| a.angle.total_cmp(&b.angle))
        .then_with(|| a.confidence.total_cmp(&b.confidence))
}

fn flagged_order(a: &JointVerdict, b: &JointVerdict) -> Ordering {
    Reverse(a.effective_severity())
        .cmp(&Reverse(b.effective_severity()))
        .then_with(|| canonical_order(a, b))
}

/// Aggregates per-joint verdicts into a [`PoseAssessment`].
///
/// - any effective critical verdict → `unsafe`
/// - otherwise any warning → `caution`
/// - otherwise → `safe`
/// - no verdicts at all → `indeterminate` (absence of evidence is not safety)
///
/// # Example
///
/// ```
/// use pose_safety::{EvaluationParams, PoseStatus, ThresholdTable, ToleranceMargin, aggregate, evaluate};
/// use pose_types::{JointAngleMeasurement, JointCategory};
///
/// let table = ThresholdTable::defaults().unwrap();
/// let params = EvaluationParams::default().with_tolerance(ToleranceMargin::Degrees(8.0));
/// let verdicts = [
///     JointAngleMeasurement::from_angle("left_elbow", JointCategory::elbow(), 150.0, 0.9).unwrap(),
///     JointAngleMeasurement::from_angle("left_knee", JointCategory::knee(), 55.0, 0.9).unwrap(),
/// ]
/// .iter()
/// .map(|m| evaluate(m, &table, &params))
/// .collect::<Result<Vec<_>, _>>()
/// .unwrap();
///
/// let assessment = aggregate(verdicts);
/// assert_eq!(assessment.status(), PoseStatus::Unsafe);
/// assert_eq!(assessment.flagged().len(), 1);
/// assert_eq!(assessment.flagged()[0].joint, "left_knee");
///
/// assert_eq!(aggregate(Vec::new()).status(), PoseStatus::Indeterminate);
/// ```
#[must_use]
pub fn aggregate(verdicts: impl IntoIterator<Item = JointVerdict>) -> PoseAssessment {
    let mut verdicts: Vec<JointVerdict> = verdicts.into_iter().collect();
    if verdicts.is_empty() {
        debug!("No joint verdicts; assessment is indeterminate");
        return PoseAssessment::indeterminate();
    }

    verdicts.sort_by(canonical_order);

    for v in verdicts
        .iter()
        .filter(|v| v.effective_severity() != v.severity)
    {
        warn!(
            joint = %v.joint,
            angle = v.angle,
            confidence = v.confidence,
            "Low-confidence critical verdict downgraded to warning"
        );
    }

    let worst = verdicts
        .iter()
        .map(JointVerdict::effective_severity)
        .max()
        .unwrap_or(Severity::Ok);
    let status = match worst {
        Severity::Critical => PoseStatus::Unsafe,
        Severity::Warning => PoseStatus::Caution,
        Severity::Ok => PoseStatus::Safe,
    };

    let mut flagged: Vec<JointVerdict> = verdicts.iter().filter(|v| v.is_flagged()).cloned().collect();
    flagged.sort_by(flagged_order);

    debug!(
        status = status.as_str(),
        joints = verdicts.len(),
        flagged = flagged.len(),
        "Aggregated pose assessment"
    );

    PoseAssessment {
        status,
        flagged,
        verdicts,
    }
}
