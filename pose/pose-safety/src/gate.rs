//! Validation gate for uploaded images, plus image processing knobs.
//!
//! The gate runs before any decoding: it only looks at the declared size
//! and the file extension, so a rejection is cheap and precise.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ConfigResult};

/// Default maximum upload size: 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default accepted image extensions.
pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// Why an upload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// Declared size exceeds the configured maximum.
    FileTooLarge {
        /// Declared size in bytes.
        size: u64,
        /// Configured maximum in bytes.
        limit: u64,
    },
    /// Extension is not in the allowed set.
    InvalidFileType {
        /// Normalized extension (may be empty).
        extension: String,
    },
}

/// Outcome of the validation gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// Whether processing may proceed.
    pub accepted: bool,
    /// Rejection reason, `None` when accepted.
    pub reason: Option<RejectReason>,
}

impl ValidationResult {
    /// An accepted result.
    #[must_use]
    pub const fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    /// A rejected result.
    #[must_use]
    pub const fn reject(reason: RejectReason) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
        }
    }
}

/// Normalizes an extension to lowercase with a single leading dot.
///
/// `"PNG"`, `".png"` and `" .Png "` all become `".png"`; blank input stays empty.
#[must_use]
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(".{}", trimmed.to_lowercase())
    }
}

/// Upload size and type limits.
///
/// # Example
///
/// ```
/// use pose_safety::{RejectReason, UploadLimits};
///
/// let limits = UploadLimits::default();
/// assert!(limits.validate(500_000, ".png").accepted);
/// assert_eq!(
///     limits.validate(500_000, ".bmp").reason,
///     Some(RejectReason::InvalidFileType { extension: ".bmp".into() }),
/// );
/// assert!(matches!(
///     limits.validate(15_000_000, ".jpg").reason,
///     Some(RejectReason::FileTooLarge { .. }),
/// ));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLimits {
    max_file_size: u64,
    allowed_extensions: BTreeSet<String>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| normalize_extension(e))
                .collect(),
        }
    }
}

impl UploadLimits {
    /// Creates validated limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] if the size limit is zero or
    /// no non-blank extension is given.
    pub fn new<I, S>(max_file_size: u64, allowed_extensions: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if max_file_size == 0 {
            return Err(ConfigError::invalid_parameter(
                "max_file_size",
                "must be greater than zero",
            ));
        }
        let allowed_extensions: BTreeSet<String> = allowed_extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        if allowed_extensions.is_empty() {
            return Err(ConfigError::invalid_parameter(
                "allowed_extensions",
                "at least one extension is required",
            ));
        }
        Ok(Self {
            max_file_size,
            allowed_extensions,
        })
    }

    /// Maximum accepted size in bytes.
    #[must_use]
    pub const fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Allowed extensions, normalized.
    #[must_use]
    pub const fn allowed_extensions(&self) -> &BTreeSet<String> {
        &self.allowed_extensions
    }

    /// Checks a declared size and extension (case-insensitive, dot optional).
    ///
    /// Size is checked first.
    #[must_use]
    pub fn validate(&self, file_size: u64, extension: &str) -> ValidationResult {
        if file_size > self.max_file_size {
            warn!(
                size = file_size,
                limit = self.max_file_size,
                "Upload rejected: file too large"
            );
            return ValidationResult::reject(RejectReason::FileTooLarge {
                size: file_size,
                limit: self.max_file_size,
            });
        }

        let extension = normalize_extension(extension);
        if !self.allowed_extensions.contains(&extension) {
            warn!(extension = %extension, "Upload rejected: invalid file type");
            return ValidationResult::reject(RejectReason::InvalidFileType { extension });
        }

        ValidationResult::accept()
    }

    /// Like [`validate`](Self::validate), taking the extension from a file name.
    #[must_use]
    pub fn validate_file_name(&self, file_size: u64, file_name: &str) -> ValidationResult {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        self.validate(file_size, extension)
    }
}

/// Image processing knobs applied after the gate, before detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingParams {
    /// Longest side in pixels after downscaling.
    pub max_image_dimension: u32,
    /// Re-encoding quality `(0, 1]`.
    pub image_quality: f64,
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self {
            max_image_dimension: 1024,
            image_quality: 0.8,
        }
    }
}

impl ProcessingParams {
    /// Checks the knobs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] on a zero dimension or a
    /// quality outside `(0, 1]`.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_image_dimension == 0 {
            return Err(ConfigError::invalid_parameter(
                "max_image_dimension",
                "must be greater than zero",
            ));
        }
        if !(self.image_quality > 0.0 && self.image_quality <= 1.0) {
            return Err(ConfigError::invalid_parameter(
                "image_quality",
                format!("{} is outside (0, 1]", self.image_quality),
            ));
        }
        Ok(())
    }

    /// Target size for an image so its longer side fits `max_image_dimension`.
    ///
    /// Preserves aspect ratio, never upscales, and never returns a zero side
    /// for non-zero input.
    ///
    /// # Example
    ///
    /// ```
    /// use pose_safety::ProcessingParams;
    ///
    /// let p = ProcessingParams::default();
    /// assert_eq!(p.fit_within(4000, 3000), (1024, 768));
    /// assert_eq!(p.fit_within(640, 480), (640, 480));
    /// ```
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn fit_within(&self, width: u32, height: u32) -> (u32, u32) {
        let longest = width.max(height);
        if longest <= self.max_image_dimension || longest == 0 {
            return (width, height);
        }
        let scale = f64::from(self.max_image_dimension) / f64::from(longest);
        let scaled = |side: u32| {
            if side == 0 {
                0
            } else {
                ((f64::from(side) * scale).round() as u32).max(1)
            }
        };
        (scaled(width), scaled(height))
    }
}
