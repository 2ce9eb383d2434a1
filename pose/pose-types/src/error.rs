//! Error types for pose primitives.

use thiserror::Error;

/// Result type alias for pose primitive operations.
pub type PoseResult<T> = Result<T, PoseError>;

/// Errors that can occur when building pose primitives or measuring angles.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PoseError {
    /// A limb segment at the vertex is too short to define an angle
    /// (coincident keypoints or a collapsed detection).
    #[error("degenerate geometry at '{vertex}': segment length {length:e} below {min_length:e}")]
    DegenerateGeometry {
        /// Name of the vertex keypoint.
        vertex: String,
        /// Length of the shorter limb segment.
        length: f64,
        /// Minimum segment length accepted.
        min_length: f64,
    },

    /// A keypoint coordinate is `NaN` or infinite, or a limb segment
    /// overflows `f64`.
    #[error("non-finite coordinate in keypoint '{0}'")]
    NonFiniteCoordinate(String),

    /// A joint angle is `NaN`, infinite or outside `[0, 180]`.
    #[error("invalid angle for joint '{joint}': {angle} is not within [0, 180]")]
    InvalidAngle {
        /// Joint name.
        joint: String,
        /// Rejected angle in degrees.
        angle: f64,
    },

    /// A confidence is `NaN`, infinite or outside `[0, 1]`.
    #[error("invalid confidence for '{name}': {confidence} is not within [0, 1]")]
    InvalidConfidence {
        /// Keypoint (or joint) the confidence belongs to.
        name: String,
        /// Rejected confidence.
        confidence: f64,
    },

    /// A threshold range violates `min < max` within `[0, 180]`.
    #[error("invalid range for '{category}': [{min}, {max}] ({reason})")]
    InvalidRange {
        /// Joint category the range belongs to.
        category: String,
        /// Lower bound in degrees.
        min: f64,
        /// Upper bound in degrees.
        max: f64,
        /// Which rule was violated.
        reason: &'static str,
    },
}

impl PoseError {
    /// Creates a degenerate geometry error.
    #[must_use]
    pub fn degenerate(vertex: impl Into<String>, length: f64, min_length: f64) -> Self {
        Self::DegenerateGeometry {
            vertex: vertex.into(),
            length,
            min_length,
        }
    }

    /// Creates an invalid range error.
    #[must_use]
    pub fn invalid_range(
        category: impl Into<String>,
        min: f64,
        max: f64,
        reason: &'static str,
    ) -> Self {
        Self::InvalidRange {
            category: category.into(),
            min,
            max,
            reason,
        }
    }
}
