//! Joint angle measurements.

use serde::Serialize;

use crate::angle::joint_angle;
use crate::category::JointCategory;
use crate::error::{PoseError, PoseResult};
use crate::keypoint::Keypoint;
use crate::range::{MAX_JOINT_ANGLE, MIN_JOINT_ANGLE};

/// One joint's measured angle together with the keypoints it was derived from.
///
/// The confidence is the minimum confidence of the three keypoints: a
/// measurement is only as trustworthy as its weakest landmark.
///
/// Fields are private so every measurement holds a finite angle in
/// `[0, 180]` and a confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JointAngleMeasurement {
    joint: String,
    category: JointCategory,
    angle: f64,
    keypoints: [Keypoint; 3],
    confidence: f64,
}

impl JointAngleMeasurement {
    /// Measures the angle at `vertex` between the segments to `a` and `b`.
    ///
    /// # Errors
    ///
    /// - [`PoseError::InvalidConfidence`] if a keypoint confidence is
    ///   non-finite or outside `[0, 1]`.
    /// - [`joint_angle`] failures; the joint is then indeterminate.
    pub fn from_keypoints(
        joint: impl Into<String>,
        category: JointCategory,
        vertex: &Keypoint,
        a: &Keypoint,
        b: &Keypoint,
    ) -> PoseResult<Self> {
        for kp in [vertex, a, b] {
            check_confidence(&kp.name, kp.confidence)?;
        }
        let angle = joint_angle(vertex, a, b)?;
        let confidence = vertex.confidence.min(a.confidence).min(b.confidence);
        Ok(Self {
            joint: joint.into(),
            category,
            angle,
            keypoints: [vertex.clone(), a.clone(), b.clone()],
            confidence,
        })
    }

    /// Creates a measurement from an already computed angle.
    ///
    /// Used when the angle comes from somewhere other than three keypoints
    /// (recorded sessions, synthetic tests). Keypoints are left empty-named.
    ///
    /// # Errors
    ///
    /// - [`PoseError::InvalidAngle`] if `angle` is non-finite or outside `[0, 180]`.
    /// - [`PoseError::InvalidConfidence`] if `confidence` is non-finite or outside `[0, 1]`.
    pub fn from_angle(
        joint: impl Into<String>,
        category: JointCategory,
        angle: f64,
        confidence: f64,
    ) -> PoseResult<Self> {
        let joint = joint.into();
        if !(MIN_JOINT_ANGLE..=MAX_JOINT_ANGLE).contains(&angle) {
            return Err(PoseError::InvalidAngle { joint, angle });
        }
        check_confidence(&joint, confidence)?;

        let placeholder = Keypoint::planar("", 0.0, 0.0, confidence);
        Ok(Self {
            joint,
            category,
            angle,
            keypoints: [placeholder.clone(), placeholder.clone(), placeholder],
            confidence,
        })
    }

    /// Joint name, e.g. `left_knee`.
    #[must_use]
    pub fn joint(&self) -> &str {
        &self.joint
    }

    /// Category used to select the threshold range.
    #[must_use]
    pub const fn category(&self) -> &JointCategory {
        &self.category
    }

    /// Measured angle in degrees `[0, 180]`.
    #[must_use]
    pub const fn angle(&self) -> f64 {
        self.angle
    }

    /// Minimum confidence of the three keypoints.
    #[must_use]
    pub const fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Keypoints used: `[vertex, a, b]`.
    #[must_use]
    pub const fn keypoints(&self) -> &[Keypoint; 3] {
        &self.keypoints
    }

    /// Returns the vertex keypoint.
    #[must_use]
    pub const fn vertex(&self) -> &Keypoint {
        &self.keypoints[0]
    }
}

fn check_confidence(name: &str, confidence: f64) -> PoseResult<()> {
    if (0.0..=1.0).contains(&confidence) {
        Ok(())
    } else {
        Err(PoseError::InvalidConfidence {
            name: name.to_string(),
            confidence,
        })
    }
}
