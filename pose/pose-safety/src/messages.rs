//! Message catalog: maps outcomes and error kinds to user-facing text.
//!
//! Domain code never builds presentation strings itself; it picks a
//! [`MessageKey`] and the catalog supplies the text. Unmapped or blank
//! entries resolve to the catalog's fallback, so output is never empty.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::aggregator::PoseStatus;
use crate::evaluator::{JointStatus, JointVerdict};
use crate::gate::{DEFAULT_MAX_FILE_SIZE, RejectReason};

/// Keys of the message catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKey {
    /// The detector found no usable body.
    NoPoseDetected,
    /// Upload exceeds the size limit.
    FileTooLarge,
    /// Upload has a disallowed extension.
    InvalidFileType,
    /// Camera could not be opened.
    CameraError,
    /// Image processing failed.
    ProcessingError,
    /// A backend collaborator failed.
    BackendError,
    /// Analysis completed.
    PoseAnalyzed,
    /// Camera capture started.
    CameraStarted,
    /// Camera capture stopped.
    CameraStopped,
    /// Overall status: safe.
    PoseSafe,
    /// Overall status: caution.
    PoseCaution,
    /// Overall status: unsafe.
    PoseUnsafe,
    /// Overall status: indeterminate.
    PoseIndeterminate,
    /// Per-joint feedback: angle below range.
    JointBelowMin,
    /// Per-joint feedback: angle above range.
    JointAboveMax,
    /// Suffix appended to feedback for low-confidence joints.
    JointLowConfidence,
}

impl MessageKey {
    /// Every key, in declaration order.
    pub const ALL: [Self; 16] = [
        Self::NoPoseDetected,
        Self::FileTooLarge,
        Self::InvalidFileType,
        Self::CameraError,
        Self::ProcessingError,
        Self::BackendError,
        Self::PoseAnalyzed,
        Self::CameraStarted,
        Self::CameraStopped,
        Self::PoseSafe,
        Self::PoseCaution,
        Self::PoseUnsafe,
        Self::PoseIndeterminate,
        Self::JointBelowMin,
        Self::JointAboveMax,
        Self::JointLowConfidence,
    ];

    /// Snake-case name, as used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoPoseDetected => "no_pose_detected",
            Self::FileTooLarge => "file_too_large",
            Self::InvalidFileType => "invalid_file_type",
            Self::CameraError => "camera_error",
            Self::ProcessingError => "processing_error",
            Self::BackendError => "backend_error",
            Self::PoseAnalyzed => "pose_analyzed",
            Self::CameraStarted => "camera_started",
            Self::CameraStopped => "camera_stopped",
            Self::PoseSafe => "pose_safe",
            Self::PoseCaution => "pose_caution",
            Self::PoseUnsafe => "pose_unsafe",
            Self::PoseIndeterminate => "pose_indeterminate",
            Self::JointBelowMin => "joint_below_min",
            Self::JointAboveMax => "joint_above_max",
            Self::JointLowConfidence => "joint_low_confidence",
        }
    }

    /// Key for an overall pose status.
    #[must_use]
    pub const fn for_status(status: PoseStatus) -> Self {
        match status {
            PoseStatus::Safe => Self::PoseSafe,
            PoseStatus::Caution => Self::PoseCaution,
            PoseStatus::Unsafe => Self::PoseUnsafe,
            PoseStatus::Indeterminate => Self::PoseIndeterminate,
        }
    }

    /// Key for an upload rejection.
    #[must_use]
    pub const fn for_rejection(reason: &RejectReason) -> Self {
        match reason {
            RejectReason::FileTooLarge { .. } => Self::FileTooLarge,
            RejectReason::InvalidFileType { .. } => Self::InvalidFileType,
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| format!("unknown message key '{s}'"))
    }
}

/// Request-level error kinds a transport layer reports to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The detector found no usable body.
    NoPoseDetected,
    /// Upload exceeds the size limit.
    FileTooLarge,
    /// Upload has a disallowed extension.
    InvalidFileType,
    /// Camera could not be opened.
    CameraError,
    /// Image decoding or processing failed.
    ProcessingError,
    /// A backend collaborator failed.
    BackendError,
}

impl ErrorKind {
    /// Catalog key for this error kind.
    #[must_use]
    pub const fn message_key(self) -> MessageKey {
        match self {
            Self::NoPoseDetected => MessageKey::NoPoseDetected,
            Self::FileTooLarge => MessageKey::FileTooLarge,
            Self::InvalidFileType => MessageKey::InvalidFileType,
            Self::CameraError => MessageKey::CameraError,
            Self::ProcessingError => MessageKey::ProcessingError,
            Self::BackendError => MessageKey::BackendError,
        }
    }
}

impl From<&RejectReason> for ErrorKind {
    fn from(reason: &RejectReason) -> Self {
        match reason {
            RejectReason::FileTooLarge { .. } => Self::FileTooLarge,
            RejectReason::InvalidFileType { .. } => Self::InvalidFileType,
        }
    }
}

/// Default fallback text.
pub const DEFAULT_FALLBACK: &str = "An unexpected error occurred. Please try again.";

/// Formats a byte limit as whole megabytes for user-facing text.
#[must_use]
pub fn format_megabytes(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        #[allow(clippy::cast_precision_loss)]
        let mb = bytes as f64 / MIB as f64;
        format!("{mb:.1}MB")
    }
}

/// Default catalog entries. `file_too_large` states `max_file_size`.
#[must_use]
pub fn default_messages(max_file_size: u64) -> BTreeMap<MessageKey, String> {
    let file_too_large = format!(
        "File size exceeds maximum limit of {}.",
        format_megabytes(max_file_size)
    );
    [
        (
            MessageKey::NoPoseDetected,
            "No pose detected in the image. Please ensure the person is clearly visible.",
        ),
        (MessageKey::FileTooLarge, file_too_large.as_str()),
        (
            MessageKey::InvalidFileType,
            "Invalid file type. Please upload an image file.",
        ),
        (
            MessageKey::CameraError,
            "Unable to access camera. Please check permissions.",
        ),
        (
            MessageKey::ProcessingError,
            "Error processing image. Please try again.",
        ),
        (
            MessageKey::BackendError,
            "Backend service error. Please try again later.",
        ),
        (MessageKey::PoseAnalyzed, "Pose analyzed successfully!"),
        (MessageKey::CameraStarted, "Camera started successfully!"),
        (MessageKey::CameraStopped, "Camera stopped successfully!"),
        (
            MessageKey::PoseSafe,
            "All measured joints are within safe ranges.",
        ),
        (
            MessageKey::PoseCaution,
            "Some joints are slightly outside their safe ranges. Adjust gently.",
        ),
        (
            MessageKey::PoseUnsafe,
            "Unsafe joint angles detected. Ease out of the pose and realign.",
        ),
        (
            MessageKey::PoseIndeterminate,
            "Unable to assess the pose. Make sure your whole body is in frame.",
        ),
        (
            MessageKey::JointBelowMin,
            "{joint}: {angle}° is below the safe minimum of {min}° ({severity}).",
        ),
        (
            MessageKey::JointAboveMax,
            "{joint}: {angle}° is above the safe maximum of {max}° ({severity}).",
        ),
        (
            MessageKey::JointLowConfidence,
            " Low detection confidence; treat with care.",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k, v.to_string()))
    .collect()
}

/// Fixed, configuration-defined message catalog.
///
/// # Example
///
/// ```
/// use pose_safety::{MessageCatalog, MessageKey, PoseStatus};
///
/// let catalog = MessageCatalog::default();
/// assert!(catalog.message(MessageKey::FileTooLarge).contains("10MB"));
/// assert!(!catalog.status_message(PoseStatus::Indeterminate).is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageCatalog {
    messages: BTreeMap<MessageKey, String>,
    fallback: String,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::new(default_messages(DEFAULT_MAX_FILE_SIZE), DEFAULT_FALLBACK)
    }
}

impl MessageCatalog {
    /// Creates a catalog. A blank `fallback` is replaced by [`DEFAULT_FALLBACK`].
    #[must_use]
    pub fn new(messages: BTreeMap<MessageKey, String>, fallback: impl Into<String>) -> Self {
        let fallback = fallback.into();
        let fallback = if fallback.trim().is_empty() {
            DEFAULT_FALLBACK.to_string()
        } else {
            fallback
        };
        Self { messages, fallback }
    }

    /// Text for a key, or the fallback when unmapped or blank.
    #[must_use]
    pub fn message(&self, key: MessageKey) -> &str {
        self.messages
            .get(&key)
            .map(String::as_str)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(self.fallback.as_str())
    }

    /// The fallback text.
    #[must_use]
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Text for an overall pose status.
    #[must_use]
    pub fn status_message(&self, status: PoseStatus) -> &str {
        self.message(MessageKey::for_status(status))
    }

    /// Text for an upload rejection.
    #[must_use]
    pub fn rejection_message(&self, reason: &RejectReason) -> &str {
        self.message(MessageKey::for_rejection(reason))
    }

    /// Text for a request-level error kind.
    #[must_use]
    pub fn error_message(&self, kind: ErrorKind) -> &str {
        self.message(kind.message_key())
    }

    /// Feedback line for a verdict, `None` when the joint is within range.
    ///
    /// Templates may use `{joint}`, `{angle}`, `{min}`, `{max}` and `{severity}`.
    #[must_use]
    pub fn joint_feedback(&self, verdict: &JointVerdict) -> Option<String> {
        let key = match verdict.status {
            JointStatus::WithinRange => return None,
            JointStatus::BelowMin => MessageKey::JointBelowMin,
            JointStatus::AboveMax => MessageKey::JointAboveMax,
        };
        let mut line = self
            .message(key)
            .replace("{joint}", &verdict.joint)
            .replace("{angle}", &format!("{:.1}", verdict.angle))
            .replace("{min}", &format!("{:.0}", verdict.range.min()))
            .replace("{max}", &format!("{:.0}", verdict.range.max()))
            .replace("{severity}", verdict.effective_severity().as_str());
        if verdict.low_confidence {
            line.push_str(self.message(MessageKey::JointLowConfidence));
        }
        Some(line)
    }
}
