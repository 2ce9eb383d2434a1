//! Error types for pose safety configuration and measurement.

use std::path::PathBuf;

use pose_types::PoseError;
use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration defects.
///
/// These are detected once, when the [`SafetyEngine`](crate::SafetyEngine)
/// is built, and must prevent startup. None of them can occur per request.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A joint definition (or lookup) names a category missing from the threshold table.
    #[error("unknown joint category '{category}' (joint '{joint}')")]
    UnknownJointCategory {
        /// Joint that referenced the category.
        joint: String,
        /// The missing category.
        category: String,
    },

    /// A threshold range violates `min < max` within `[0, 180]`.
    #[error("invalid threshold: {0}")]
    InvalidThreshold(#[source] PoseError),

    /// Two threshold entries normalize to the same category.
    #[error("duplicate joint category '{0}'")]
    DuplicateCategory(String),

    /// Two joint definitions share a name.
    #[error("duplicate joint '{0}'")]
    DuplicateJoint(String),

    /// A joint definition is malformed.
    #[error("invalid joint '{joint}': {reason}")]
    InvalidJoint {
        /// Joint name.
        joint: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A scalar parameter is out of range.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// An environment override could not be parsed.
    #[error("invalid override {key}={value}: {reason}")]
    InvalidOverride {
        /// Environment variable name.
        key: String,
        /// Raw value.
        value: String,
        /// Parse failure.
        reason: String,
    },

    /// The TOML configuration could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Creates an unknown joint category error.
    #[must_use]
    pub fn unknown_category(joint: impl Into<String>, category: impl Into<String>) -> Self {
        Self::UnknownJointCategory {
            joint: joint.into(),
            category: category.into(),
        }
    }

    /// Creates an invalid joint error.
    #[must_use]
    pub fn invalid_joint(joint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidJoint {
            joint: joint.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Creates an invalid override error.
    #[must_use]
    pub fn invalid_override(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidOverride {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Why a single joint could not be measured.
///
/// Recoverable: the joint is excluded from aggregation and the rest of the
/// pose is still assessed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeasurementError {
    /// The detector did not report one of the joint's keypoints.
    #[error("joint '{joint}' is missing keypoint '{keypoint}'")]
    MissingKeypoint {
        /// Joint name.
        joint: String,
        /// Keypoint the detector did not report.
        keypoint: String,
    },

    /// The keypoints do not define a usable measurement.
    #[error("joint '{joint}' has indeterminate angle: {source}")]
    Geometry {
        /// Joint name.
        joint: String,
        /// Underlying geometry failure.
        #[source]
        source: PoseError,
    },
}

impl MeasurementError {
    /// Returns the joint name.
    #[must_use]
    pub fn joint(&self) -> &str {
        match self {
            Self::MissingKeypoint { joint, .. } | Self::Geometry { joint, .. } => joint,
        }
    }
}
