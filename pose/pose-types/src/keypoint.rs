//! Keypoints reported by an external pose detector.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// A named anatomical landmark with a position and detector confidence.
///
/// Positions may be 2D (use [`Keypoint::planar`], `z = 0`) or 3D. Units are
/// whatever the detector emits; angles are scale invariant.
///
/// # Example
///
/// ```
/// use pose_types::Keypoint;
///
/// let nose = Keypoint::planar("nose", 0.5, 0.3, 0.95);
/// assert!(nose.is_visible(0.5));
/// assert!((nose.position.z).abs() < f64::EPSILON);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// Landmark name, e.g. `left_elbow`.
    pub name: String,
    /// Position `[x, y, z]`.
    pub position: Point3<f64>,
    /// Detector confidence `[0, 1]`.
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

const fn full_confidence() -> f64 {
    1.0
}

impl Keypoint {
    /// Creates a 3D keypoint.
    #[must_use]
    pub fn new(name: impl Into<String>, x: f64, y: f64, z: f64, confidence: f64) -> Self {
        Self {
            name: name.into(),
            position: Point3::new(x, y, z),
            confidence,
        }
    }

    /// Creates a 2D keypoint (`z = 0`).
    #[must_use]
    pub fn planar(name: impl Into<String>, x: f64, y: f64, confidence: f64) -> Self {
        Self::new(name, x, y, 0.0, confidence)
    }

    /// Returns `true` if the detector confidence reaches the threshold.
    #[must_use]
    pub fn is_visible(&self, threshold: f64) -> bool {
        self.confidence >= threshold
    }

    /// Returns `true` if all coordinates are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.coords.iter().all(|c| c.is_finite())
    }
}

/// The keypoints of one detected body.
///
/// Order follows the detector's topology; lookups are by name.
///
/// # Example
///
/// ```
/// use pose_types::{Keypoint, KeypointSet};
///
/// let set = KeypointSet::new(vec![
///     Keypoint::planar("left_hip", 0.4, 0.6, 0.9),
///     Keypoint::planar("left_knee", 0.4, 0.8, 0.7),
/// ]);
/// assert_eq!(set.len(), 2);
/// assert!(set.get("left_knee").is_some());
/// assert!(set.get("right_knee").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeypointSet {
    keypoints: Vec<Keypoint>,
}

impl KeypointSet {
    /// Creates a keypoint set.
    #[must_use]
    pub const fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    /// Returns the number of keypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    /// Returns `true` if there are no keypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Returns the keypoints in detector order.
    #[must_use]
    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Looks up a keypoint by name.
    ///
    /// If the detector reported a name twice, the first occurrence wins.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Keypoint> {
        self.keypoints.iter().find(|kp| kp.name == name)
    }

    /// Returns the number of keypoints whose confidence reaches the threshold.
    #[must_use]
    pub fn visible_count(&self, threshold: f64) -> usize {
        self.keypoints
            .iter()
            .filter(|kp| kp.is_visible(threshold))
            .count()
    }
}

impl FromIterator<Keypoint> for KeypointSet {
    fn from_iter<I: IntoIterator<Item = Keypoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
