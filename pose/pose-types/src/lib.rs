//! Keypoint, joint category and joint-angle geometry types for pose safety analysis.
//!
//! This crate provides the foundational, dependency-light types shared by the
//! pose safety pipeline:
//! - [`Keypoint`] / [`KeypointSet`] - landmarks reported by an external pose detector
//! - [`JointCategory`] - a named class of joint (elbow, knee, hip, shoulder, ...)
//! - [`ThresholdRange`] - the inclusive safe interval for a joint category
//! - [`JointAngleMeasurement`] - one joint's measured angle and the keypoints behind it
//! - [`joint_angle`] / [`angle_at`] - the angle formed at a vertex by two limb segments
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies** and no I/O. It can be used in:
//! - CLI tools
//! - Servers
//! - Web applications (WASM)
//!
//! # Example
//!
//! ```
//! use pose_types::{JointAngleMeasurement, JointCategory, Keypoint};
//!
//! let shoulder = Keypoint::planar("left_shoulder", 0.0, 0.0, 0.9);
//! let elbow = Keypoint::planar("left_elbow", 1.0, 0.0, 0.8);
//! let wrist = Keypoint::planar("left_wrist", 1.0, 1.0, 0.95);
//!
//! let m = JointAngleMeasurement::from_keypoints(
//!     "left_elbow",
//!     JointCategory::elbow(),
//!     &elbow,
//!     &shoulder,
//!     &wrist,
//! )
//! .unwrap();
//!
//! assert!((m.angle() - 90.0).abs() < 1e-9);
//! assert!((m.confidence() - 0.8).abs() < 1e-12);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod angle;
mod category;
mod error;
mod keypoint;
mod measurement;
mod range;

pub use angle::{MIN_SEGMENT_LENGTH, angle_at, joint_angle};
pub use category::JointCategory;
pub use error::{PoseError, PoseResult};
pub use keypoint::{Keypoint, KeypointSet};
pub use measurement::JointAngleMeasurement;
pub use range::{MAX_JOINT_ANGLE, MIN_JOINT_ANGLE, ThresholdRange};

// Re-export nalgebra point type used by keypoint positions.
pub use nalgebra::Point3;
