//! Joint definitions: which keypoint triple measures which joint.
//!
//! Keypoint names follow the `MediaPipe`/BlazePose landmark convention
//! (`left_shoulder`, `right_knee`, ...).

use std::collections::BTreeSet;

use pose_types::{JointAngleMeasurement, JointCategory, KeypointSet};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult, MeasurementError};
use crate::table::ThresholdTable;

/// One measured joint: the angle at `vertex` between `proximal` and `distal`.
///
/// # Example
///
/// ```
/// use pose_safety::JointDefinition;
/// use pose_types::JointCategory;
///
/// let knee = JointDefinition::new(
///     "left_knee",
///     JointCategory::knee(),
///     "left_knee",
///     "left_hip",
///     "left_ankle",
/// );
/// assert_eq!(knee.keypoint_names(), ["left_knee", "left_hip", "left_ankle"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointDefinition {
    /// Joint name reported in verdicts, e.g. `left_knee`.
    pub name: String,
    /// Category selecting the threshold range.
    pub category: JointCategory,
    /// Keypoint at the joint.
    pub vertex: String,
    /// Keypoint on the segment toward the body's center.
    pub proximal: String,
    /// Keypoint on the segment away from the body's center.
    pub distal: String,
}

impl JointDefinition {
    /// Creates a joint definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        category: JointCategory,
        vertex: impl Into<String>,
        proximal: impl Into<String>,
        distal: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            vertex: vertex.into(),
            proximal: proximal.into(),
            distal: distal.into(),
        }
    }

    /// Returns `[vertex, proximal, distal]`.
    #[must_use]
    pub fn keypoint_names(&self) -> [&str; 3] {
        [&self.vertex, &self.proximal, &self.distal]
    }

    /// Measures this joint from a detected body.
    ///
    /// # Errors
    ///
    /// - [`MeasurementError::MissingKeypoint`] if a keypoint was not reported.
    /// - [`MeasurementError::Geometry`] if the angle is indeterminate.
    pub fn measure(&self, keypoints: &KeypointSet) -> Result<JointAngleMeasurement, MeasurementError> {
        let lookup = |name: &str| {
            keypoints
                .get(name)
                .ok_or_else(|| MeasurementError::MissingKeypoint {
                    joint: self.name.clone(),
                    keypoint: name.to_string(),
                })
        };
        let vertex = lookup(&self.vertex)?;
        let proximal = lookup(&self.proximal)?;
        let distal = lookup(&self.distal)?;

        JointAngleMeasurement::from_keypoints(
            self.name.clone(),
            self.category.clone(),
            vertex,
            proximal,
            distal,
        )
        .map_err(|source| MeasurementError::Geometry {
            joint: self.name.clone(),
            source,
        })
    }

    fn check_shape(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid_joint(&self.name, "name must not be empty"));
        }
        if self.category.is_empty() {
            return Err(ConfigError::invalid_joint(&self.name, "category must not be empty"));
        }
        let names = self.keypoint_names();
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(ConfigError::invalid_joint(&self.name, "keypoint names must not be empty"));
        }
        if names[0] == names[1] || names[0] == names[2] || names[1] == names[2] {
            return Err(ConfigError::invalid_joint(&self.name, "keypoints must be distinct"));
        }
        Ok(())
    }
}

/// Validates joint definitions against a threshold table.
///
/// # Errors
///
/// - [`ConfigError::InvalidJoint`] for malformed definitions.
/// - [`ConfigError::DuplicateJoint`] if two definitions share a name.
/// - [`ConfigError::UnknownJointCategory`] if a category has no range.
pub fn validate_definitions(joints: &[JointDefinition], table: &ThresholdTable) -> ConfigResult<()> {
    let mut seen = BTreeSet::new();
    for joint in joints {
        joint.check_shape()?;
        if !seen.insert(joint.name.as_str()) {
            return Err(ConfigError::DuplicateJoint(joint.name.clone()));
        }
        if !table.contains(&joint.category) {
            return Err(ConfigError::unknown_category(&joint.name, joint.category.as_str()));
        }
    }
    Ok(())
}

/// Default joints: elbows, knees, hips and shoulders on both sides.
#[must_use]
pub fn default_joints() -> Vec<JointDefinition> {
    let mut joints = Vec::with_capacity(8);
    for side in ["left", "right"] {
        let kp = |part: &str| format!("{side}_{part}");
        joints.push(JointDefinition::new(
            kp("elbow"),
            JointCategory::elbow(),
            kp("elbow"),
            kp("shoulder"),
            kp("wrist"),
        ));
        joints.push(JointDefinition::new(
            kp("knee"),
            JointCategory::knee(),
            kp("knee"),
            kp("hip"),
            kp("ankle"),
        ));
        joints.push(JointDefinition::new(
            kp("hip"),
            JointCategory::hip(),
            kp("hip"),
            kp("shoulder"),
            kp("knee"),
        ));
        joints.push(JointDefinition::new(
            kp("shoulder"),
            JointCategory::shoulder(),
            kp("shoulder"),
            kp("hip"),
            kp("elbow"),
        ));
    }
    joints
}
