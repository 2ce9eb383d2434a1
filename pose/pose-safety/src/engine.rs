//! The safety engine: validated configuration plus the analysis pipeline.
//!
//! ```text
//! upload ──► validate_upload ──► (external decoding + detection) ──► KeypointSet
//!                                                                       │
//!            measure ◄──────────────────────────────────────────────────┘
//!               │  per joint: angle, or SkippedJoint
//!               ▼
//!            classify against the joint's range ──► JointVerdict
//!               ▼
//!            aggregate ──► PoseAssessment ──► report ──► PoseReport
//! ```
//!
//! A [`SafetyEngine`] is immutable after construction and holds no per-request
//! state, so one instance can be shared by any number of threads.

use pose_types::{JointAngleMeasurement, JointCategory, KeypointSet, ThresholdRange};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregator::{PoseAssessment, PoseStatus, aggregate};
use crate::error::{ConfigResult, MeasurementError};
use crate::evaluator::{EvaluationParams, JointVerdict, classify, evaluate};
use crate::gate::{ProcessingParams, RejectReason, UploadLimits, ValidationResult};
use crate::joints::{JointDefinition, validate_definitions};
use crate::messages::{MessageCatalog, MessageKey};
use crate::table::ThresholdTable;

/// A joint with its range resolved at construction.
#[derive(Debug, Clone, PartialEq)]
struct ResolvedJoint {
    definition: JointDefinition,
    range: ThresholdRange,
}

/// A joint left out of aggregation because it could not be measured.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedJoint {
    /// Joint name.
    pub joint: String,
    /// Joint category.
    pub category: JointCategory,
    /// Why it was skipped.
    pub reason: String,
}

impl SkippedJoint {
    fn new(definition: &JointDefinition, error: &MeasurementError) -> Self {
        Self {
            joint: definition.name.clone(),
            category: definition.category.clone(),
            reason: error.to_string(),
        }
    }
}

/// Result of analyzing one detected body (or the lack of one).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseAnalysis {
    /// Aggregated assessment.
    pub assessment: PoseAssessment,
    /// Joints that could not be measured.
    pub skipped: Vec<SkippedJoint>,
    /// The detector reported no body at all.
    pub no_pose_detected: bool,
}

impl PoseAnalysis {
    /// Shorthand for `self.assessment.status()`.
    #[must_use]
    pub const fn status(&self) -> PoseStatus {
        self.assessment.status()
    }
}

/// Presentation of an analysis: status, catalog text and per-joint feedback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseReport {
    /// Overall status.
    pub status: PoseStatus,
    /// Headline text for the status.
    pub message: String,
    /// One line per flagged joint, in flagged order.
    pub feedback: Vec<String>,
    /// Flagged verdicts.
    pub flagged: Vec<JointVerdict>,
    /// All verdicts.
    pub verdicts: Vec<JointVerdict>,
    /// Joints that could not be measured.
    pub skipped: Vec<SkippedJoint>,
}

/// Presentation of an upload rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectionReport {
    /// Why the upload was rejected.
    pub reason: RejectReason,
    /// Catalog text for the rejection.
    pub message: String,
}

/// Immutable, shareable pose safety engine.
///
/// Built by [`SafetyConfig::build`](crate::SafetyConfig::build); every joint's
/// category was resolved against the threshold table at that point, so
/// analysis never fails on configuration.
///
/// # Example
///
/// ```
/// use pose_safety::{PoseStatus, SafetyEngine};
/// use pose_types::{Keypoint, KeypointSet};
///
/// let engine = SafetyEngine::with_defaults().unwrap();
///
/// // A straight left leg: hip, knee, ankle on one line. 180° is 10° past the
/// // knee maximum of 170°, beyond the default 8° margin (10% of 80°).
/// let body: KeypointSet = [
///     Keypoint::planar("left_hip", 0.0, 0.0, 0.9),
///     Keypoint::planar("left_knee", 0.0, 1.0, 0.9),
///     Keypoint::planar("left_ankle", 0.0, 2.0, 0.9),
/// ]
/// .into_iter()
/// .collect();
///
/// let analysis = engine.analyze(&body);
/// assert_eq!(analysis.status(), PoseStatus::Unsafe);
/// assert_eq!(analysis.assessment.verdicts().len(), 1);
/// assert_eq!(analysis.skipped.len(), 7);
/// ```
#[derive(Debug, Clone)]
pub struct SafetyEngine {
    table: ThresholdTable,
    joints: Vec<ResolvedJoint>,
    params: EvaluationParams,
    limits: UploadLimits,
    processing: ProcessingParams,
    catalog: MessageCatalog,
}

impl SafetyEngine {
    /// Assembles an engine from validated parts.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`](crate::ConfigError) if a joint definition
    /// does not resolve against `table`.
    pub(crate) fn from_parts(
        table: ThresholdTable,
        joints: &[JointDefinition],
        params: EvaluationParams,
        limits: UploadLimits,
        processing: ProcessingParams,
        catalog: MessageCatalog,
    ) -> ConfigResult<Self> {
        validate_definitions(joints, &table)?;
        let joints = joints
            .iter()
            .map(|definition| -> ConfigResult<ResolvedJoint> {
                let range = table.range_for(&definition.category)?.clone();
                Ok(ResolvedJoint {
                    definition: definition.clone(),
                    range,
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        info!(
            categories = table.len(),
            joints = joints.len(),
            tolerance = ?params.tolerance,
            min_confidence = params.min_confidence,
            max_file_size = limits.max_file_size(),
            "Pose safety engine ready"
        );

        Ok(Self {
            table,
            joints,
            params,
            limits,
            processing,
            catalog,
        })
    }

    /// Engine built from the default configuration.
    ///
    /// # Errors
    ///
    /// Never fails for the shipped defaults; the `Result` mirrors
    /// [`SafetyConfig::build`](crate::SafetyConfig::build).
    pub fn with_defaults() -> ConfigResult<Self> {
        crate::SafetyConfig::default().build()
    }

    /// The threshold table.
    #[must_use]
    pub const fn table(&self) -> &ThresholdTable {
        &self.table
    }

    /// Joint definitions, in configuration order.
    #[must_use]
    pub fn joints(&self) -> Vec<&JointDefinition> {
        self.joints.iter().map(|j| &j.definition).collect()
    }

    /// Evaluation parameters.
    #[must_use]
    pub const fn params(&self) -> &EvaluationParams {
        &self.params
    }

    /// Upload limits.
    #[must_use]
    pub const fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Image processing parameters.
    #[must_use]
    pub const fn processing(&self) -> &ProcessingParams {
        &self.processing
    }

    /// Message catalog.
    #[must_use]
    pub const fn catalog(&self) -> &MessageCatalog {
        &self.catalog
    }

    /// Validation gate on declared size and extension.
    #[must_use]
    pub fn validate_upload(&self, file_size: u64, extension: &str) -> ValidationResult {
        self.limits.validate(file_size, extension)
    }

    /// Validation gate taking the extension from a file name.
    #[must_use]
    pub fn validate_file_name(&self, file_size: u64, file_name: &str) -> ValidationResult {
        self.limits.validate_file_name(file_size, file_name)
    }

    /// Catalog text for a rejected upload, `None` when accepted.
    #[must_use]
    pub fn rejection(&self, result: &ValidationResult) -> Option<RejectionReport> {
        result.reason.as_ref().map(|reason| RejectionReport {
            reason: reason.clone(),
            message: self.catalog.rejection_message(reason).to_string(),
        })
    }

    /// Measures every configured joint.
    ///
    /// Joints that cannot be measured are returned as [`SkippedJoint`]s and
    /// never abort the rest.
    #[must_use]
    pub fn measure(&self, keypoints: &KeypointSet) -> (Vec<JointAngleMeasurement>, Vec<SkippedJoint>) {
        let mut measured = Vec::with_capacity(self.joints.len());
        let mut skipped = Vec::new();
        for joint in &self.joints {
            match self.measure_joint(joint, keypoints) {
                Ok(m) => measured.push(m),
                Err(s) => skipped.push(s),
            }
        }
        (measured, skipped)
    }

    /// Evaluates a single measurement against the engine's table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownJointCategory`](crate::ConfigError::UnknownJointCategory)
    /// for a measurement whose category has no range.
    pub fn evaluate(&self, measurement: &JointAngleMeasurement) -> ConfigResult<JointVerdict> {
        evaluate(measurement, &self.table, &self.params)
    }

    /// Aggregates verdicts; see [`aggregate`].
    #[must_use]
    pub fn aggregate(&self, verdicts: impl IntoIterator<Item = JointVerdict>) -> PoseAssessment {
        aggregate(verdicts)
    }

    /// Runs measurement, evaluation and aggregation on one detected body.
    #[must_use]
    pub fn analyze(&self, keypoints: &KeypointSet) -> PoseAnalysis {
        debug!(
            keypoints = keypoints.len(),
            visible = keypoints.visible_count(self.params.min_confidence),
            "Analyzing pose"
        );
        let mut verdicts = Vec::with_capacity(self.joints.len());
        let mut skipped = Vec::new();
        for joint in &self.joints {
            match self.measure_joint(joint, keypoints) {
                Ok(m) => verdicts.push(classify(&m, &joint.range, &self.params)),
                Err(s) => skipped.push(s),
            }
        }

        if verdicts.is_empty() {
            debug!(skipped = skipped.len(), "No measurable joints");
        }

        PoseAnalysis {
            assessment: aggregate(verdicts),
            skipped,
            no_pose_detected: false,
        }
    }

    /// Like [`analyze`](Self::analyze), for a detector that may find nothing.
    ///
    /// `None` or an empty set is "no pose detected": indeterminate, never safe.
    #[must_use]
    pub fn analyze_detection(&self, detection: Option<&KeypointSet>) -> PoseAnalysis {
        match detection {
            Some(keypoints) if !keypoints.is_empty() => self.analyze(keypoints),
            _ => {
                debug!("No pose detected");
                PoseAnalysis {
                    assessment: PoseAssessment::indeterminate(),
                    skipped: Vec::new(),
                    no_pose_detected: true,
                }
            }
        }
    }

    /// Attaches catalog text to an analysis.
    #[must_use]
    pub fn report(&self, analysis: &PoseAnalysis) -> PoseReport {
        let assessment = &analysis.assessment;
        let message = if analysis.no_pose_detected {
            self.catalog.message(MessageKey::NoPoseDetected)
        } else {
            self.catalog.status_message(assessment.status())
        };
        PoseReport {
            status: assessment.status(),
            message: message.to_string(),
            feedback: assessment
                .flagged()
                .iter()
                .filter_map(|v| self.catalog.joint_feedback(v))
                .collect(),
            flagged: assessment.flagged().to_vec(),
            verdicts: assessment.verdicts().to_vec(),
            skipped: analysis.skipped.clone(),
        }
    }

    fn measure_joint(
        &self,
        joint: &ResolvedJoint,
        keypoints: &KeypointSet,
    ) -> Result<JointAngleMeasurement, SkippedJoint> {
        joint.definition.measure(keypoints).map_err(|err| {
            warn!(joint = %joint.definition.name, error = %err, "Skipping joint");
            SkippedJoint::new(&joint.definition, &err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Severity;
    use crate::{SafetyConfig, ToleranceMargin};
    use pose_types::{Keypoint, Point3};
    use std::sync::Arc;

    /// Elbows and knees only, so hip and shoulder angles stay out of the way.
    fn engine() -> SafetyEngine {
        let mut config = SafetyConfig::default().with_tolerance(ToleranceMargin::Degrees(8.0));
        config
            .joints
            .retain(|j| j.category == JointCategory::elbow() || j.category == JointCategory::knee());
        config.build().unwrap()
    }

    /// Point at `angle_deg` around `vertex`, one unit away.
    fn around(name: &str, vertex: (f64, f64), angle_deg: f64, confidence: f64) -> Keypoint {
        let r = angle_deg.to_radians();
        Keypoint::planar(name, vertex.0 + r.cos(), vertex.1 + r.sin(), confidence)
    }

    /// Left elbow at 150° and left knee at 55°.
    fn body(knee_confidence: f64) -> KeypointSet {
        vec![
            Keypoint::planar("left_elbow", 0.0, 0.0, 0.9),
            around("left_shoulder", (0.0, 0.0), 0.0, 0.9),
            around("left_wrist", (0.0, 0.0), 150.0, 0.9),
            Keypoint::planar("left_knee", 10.0, 10.0, knee_confidence),
            around("left_hip", (10.0, 10.0), 0.0, 0.9),
            around("left_ankle", (10.0, 10.0), 55.0, 0.9),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SafetyEngine>();
    }

    #[test]
    fn analyze_flags_knee() {
        let analysis = engine().analyze(&body(0.9));
        let a = &analysis.assessment;
        assert_eq!(a.status(), PoseStatus::Unsafe);
        assert_eq!(a.flagged().len(), 1);
        assert_eq!(a.flagged()[0].joint, "left_knee");
        assert_eq!(a.flagged()[0].severity, Severity::Critical);
        assert_eq!(a.verdicts().len(), 2);
        assert_eq!(analysis.skipped.len(), 2);
        assert!(!analysis.no_pose_detected);
    }

    #[test]
    fn low_confidence_knee_is_caution() {
        let analysis = engine().analyze(&body(0.2));
        assert_eq!(analysis.status(), PoseStatus::Caution);
        assert!(analysis.assessment.flagged()[0].low_confidence);
    }

    #[test]
    fn measure_reports_skips() {
        let (measured, skipped) = engine().measure(&body(0.9));
        assert_eq!(measured.len(), 2);
        assert!(skipped.iter().any(|s| s.joint == "right_knee"));
        assert!(skipped.iter().all(|s| s.reason.contains("missing keypoint")));
    }

    #[test]
    fn degenerate_joint_is_skipped() {
        let set: KeypointSet = vec![
            Keypoint::planar("left_knee", 1.0, 1.0, 0.9),
            Keypoint::planar("left_hip", 1.0, 1.0, 0.9),
            Keypoint::planar("left_ankle", 1.0, 3.0, 0.9),
        ]
        .into_iter()
        .collect();
        let analysis = engine().analyze(&set);
        assert_eq!(analysis.status(), PoseStatus::Indeterminate);
        assert!(
            analysis
                .skipped
                .iter()
                .any(|s| s.joint == "left_knee" && s.reason.contains("indeterminate"))
        );
    }

    #[test]
    fn degenerate_joint_among_measurable_ones() {
        // Left knee collapses onto the hip; the elbow is still assessed.
        let mut keypoints = body(0.9).keypoints().to_vec();
        for kp in &mut keypoints {
            if kp.name == "left_hip" {
                kp.position = Point3::new(10.0, 10.0, 0.0);
            }
        }
        let set: KeypointSet = keypoints.into_iter().collect();

        let analysis = engine().analyze(&set);
        assert_eq!(analysis.status(), PoseStatus::Safe);
        assert_eq!(analysis.assessment.verdicts().len(), 1);
        assert_eq!(analysis.assessment.verdicts()[0].joint, "left_elbow");
        let knee = analysis.skipped.iter().find(|s| s.joint == "left_knee").unwrap();
        assert!(knee.reason.contains("degenerate"));
        assert_eq!(analysis.skipped.len(), 3);
    }

    #[test]
    fn invalid_keypoint_confidence_skips_joint() {
        let mut keypoints = body(0.9).keypoints().to_vec();
        for kp in &mut keypoints {
            if kp.name == "left_ankle" {
                kp.confidence = f64::NAN;
            }
        }
        let set: KeypointSet = keypoints.into_iter().collect();

        let analysis = engine().analyze(&set);
        assert!(analysis.assessment.verdicts().iter().all(|v| v.joint != "left_knee"));
        let knee = analysis.skipped.iter().find(|s| s.joint == "left_knee").unwrap();
        assert!(knee.reason.contains("invalid confidence"));
        assert_eq!(analysis.status(), PoseStatus::Safe);
    }

    #[test]
    fn no_detection_is_indeterminate() {
        let engine = engine();
        let none = engine.analyze_detection(None);
        assert_eq!(none.status(), PoseStatus::Indeterminate);
        assert!(none.no_pose_detected);

        let empty = engine.analyze_detection(Some(&KeypointSet::default()));
        assert!(empty.no_pose_detected);

        let report = engine.report(&none);
        assert_eq!(
            report.message,
            "No pose detected in the image. Please ensure the person is clearly visible."
        );
        assert!(report.feedback.is_empty());
    }

    #[test]
    fn report_has_feedback() {
        let engine = engine();
        let report = engine.report(&engine.analyze(&body(0.9)));
        assert_eq!(report.status, PoseStatus::Unsafe);
        assert_eq!(report.message, engine.catalog().status_message(PoseStatus::Unsafe));
        assert_eq!(report.feedback.len(), 1);
        assert!(report.feedback[0].starts_with("left_knee: 55.0°"));
    }

    #[test]
    fn rejection_text() {
        let engine = engine();
        let result = engine.validate_file_name(20_000_000, "photo.jpg");
        let report = engine.rejection(&result).unwrap();
        assert_eq!(report.message, "File size exceeds maximum limit of 10MB.");
        assert!(engine.rejection(&engine.validate_upload(10, ".png")).is_none());
    }

    #[test]
    fn evaluate_unknown_category() {
        let m = JointAngleMeasurement::from_angle("left_wrist", JointCategory::new("wrist"), 100.0, 0.9)
            .unwrap();
        assert!(engine().evaluate(&m).is_err());
    }

    #[test]
    fn shared_across_threads() {
        let engine = Arc::new(engine());
        let set = body(0.9);
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let engine = Arc::clone(&engine);
                    let set = &set;
                    s.spawn(move || engine.analyze(set).status())
                })
                .collect();
            for h in handles {
                assert_eq!(h.join().unwrap(), PoseStatus::Unsafe);
            }
        });
    }
}
