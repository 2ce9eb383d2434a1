//! Joint-angle threshold evaluation and pose safety aggregation.
//!
//! This crate turns a detected body ([`pose_types::KeypointSet`]) into a
//! safety verdict:
//!
//! - [`ThresholdTable`] - validated, immutable safe ranges per joint category
//! - [`JointDefinition`] - which keypoint triple measures which joint
//! - [`classify`] / [`evaluate`] - one measurement to a [`JointVerdict`]
//! - [`aggregate`] - verdicts to a [`PoseAssessment`] (`safe`, `caution`,
//!   `unsafe` or `indeterminate`)
//! - [`UploadLimits`] - size and type gate run before any decoding
//! - [`MessageCatalog`] - user-facing text for every outcome
//! - [`SafetyConfig`] / [`SafetyEngine`] - layered configuration and the
//!   shareable engine built from it
//!
//! Image decoding and keypoint detection are external collaborators; this
//! crate only consumes their output.
//!
//! # Example
//!
//! ```
//! use pose_safety::{PoseStatus, SafetyConfig};
//! use pose_types::{Keypoint, KeypointSet};
//!
//! let engine = SafetyConfig::default().build().unwrap();
//! assert!(engine.validate_file_name(500_000, "warrior.png").accepted);
//!
//! let analysis = engine.analyze_detection(None);
//! assert_eq!(analysis.status(), PoseStatus::Indeterminate);
//!
//! let body: KeypointSet = [
//!     Keypoint::planar("left_shoulder", 0.0, 0.0, 0.9),
//!     Keypoint::planar("left_elbow", 1.0, 0.0, 0.9),
//!     Keypoint::planar("left_wrist", 2.0, 1.0, 0.9),
//! ]
//! .into_iter()
//! .collect();
//! let report = engine.report(&engine.analyze(&body));
//! assert_eq!(report.status, PoseStatus::Safe);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod aggregator;
mod config;
mod engine;
mod error;
mod evaluator;
mod gate;
mod joints;
mod messages;
mod table;

pub use aggregator::{PoseAssessment, PoseStatus, aggregate};
pub use config::{ENV_PREFIX, SafetyConfig};
pub use engine::{PoseAnalysis, PoseReport, RejectionReport, SafetyEngine, SkippedJoint};
pub use error::{ConfigError, ConfigResult, MeasurementError};
pub use evaluator::{
    EvaluationParams, JointStatus, JointVerdict, Severity, ToleranceMargin, classify, evaluate,
};
pub use gate::{
    DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_FILE_SIZE, ProcessingParams, RejectReason,
    UploadLimits, ValidationResult, normalize_extension,
};
pub use joints::{JointDefinition, default_joints, validate_definitions};
pub use messages::{
    DEFAULT_FALLBACK, ErrorKind, MessageCatalog, MessageKey, default_messages, format_megabytes,
};
pub use table::{AngleBounds, ThresholdTable, default_bounds};
