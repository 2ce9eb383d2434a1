//! Safety configuration: defaults, TOML files and environment overrides.
//!
//! # Layering
//!
//! 1. [`SafetyConfig::default`] - the source system's values
//! 2. a TOML file ([`SafetyConfig::from_file`]); sections it names replace the defaults
//! 3. `POSE_SAFETY_*` environment variables ([`SafetyConfig::apply_env`]), merged per key
//!
//! Nothing is validated until [`SafetyConfig::build`], which either returns a
//! ready [`SafetyEngine`] or the first [`ConfigError`]. Invalid configuration
//! prevents startup; it never surfaces per request.
//!
//! # Environment Variables
//!
//! | Variable | Value |
//! |---|---|
//! | `POSE_SAFETY_THRESHOLD_<CATEGORY>` | `min,max` degrees (adds or replaces a category) |
//! | `POSE_SAFETY_MAX_FILE_SIZE` | bytes |
//! | `POSE_SAFETY_ALLOWED_EXTENSIONS` | comma-separated, e.g. `.jpg,.png` |
//! | `POSE_SAFETY_MIN_CONFIDENCE` | `[0, 1]` |
//! | `POSE_SAFETY_TOLERANCE` | `8` / `8deg` (degrees) or `10%` (of range width) |
//! | `POSE_SAFETY_MAX_IMAGE_DIMENSION` | pixels |
//! | `POSE_SAFETY_IMAGE_QUALITY` | `(0, 1]` |
//! | `POSE_SAFETY_MESSAGE_<KEY>` | catalog text, `<KEY>` e.g. `NO_POSE_DETECTED` or `FALLBACK` |

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use pose_types::JointCategory;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::engine::SafetyEngine;
use crate::error::{ConfigError, ConfigResult};
use crate::evaluator::{EvaluationParams, ToleranceMargin};
use crate::gate::{DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_FILE_SIZE, ProcessingParams, UploadLimits};
use crate::joints::{JointDefinition, default_joints, validate_definitions};
use crate::messages::{DEFAULT_FALLBACK, MessageCatalog, MessageKey, default_messages};
use crate::table::{AngleBounds, ThresholdTable, default_bounds};

/// Prefix of recognised environment variables.
pub const ENV_PREFIX: &str = "POSE_SAFETY_";

/// Complete, unvalidated safety configuration.
///
/// # Example
///
/// ```
/// use pose_safety::{SafetyConfig, ToleranceMargin};
///
/// let engine = SafetyConfig::default()
///     .with_tolerance(ToleranceMargin::Degrees(8.0))
///     .with_threshold("wrist", 120.0, 200.0)
///     .build();
/// assert!(engine.is_err()); // 200° is outside [0, 180]
///
/// let engine = SafetyConfig::default().build().unwrap();
/// assert_eq!(engine.joints().len(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SafetyConfig {
    /// Category name to `{min, max}` degrees. Names are normalized like
    /// [`JointCategory`] when read from TOML.
    #[serde(deserialize_with = "deserialize_thresholds")]
    pub thresholds: BTreeMap<String, AngleBounds>,
    /// Which keypoint triples measure which joints.
    pub joints: Vec<JointDefinition>,
    /// Severity tolerance margin.
    pub tolerance: ToleranceMargin,
    /// Measurements below this confidence are flagged low-confidence.
    pub min_confidence: f64,
    /// Maximum accepted upload size in bytes.
    pub max_file_size: u64,
    /// Accepted upload extensions (case-insensitive).
    pub allowed_extensions: Vec<String>,
    /// Image processing knobs.
    pub processing: ProcessingParams,
    /// Catalog entries overriding the defaults.
    pub messages: BTreeMap<MessageKey, String>,
    /// Text for unmapped catalog keys.
    pub fallback_message: String,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        let evaluation = EvaluationParams::default();
        Self {
            thresholds: default_bounds(),
            joints: default_joints(),
            tolerance: evaluation.tolerance,
            min_confidence: evaluation.min_confidence,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
            processing: ProcessingParams::default(),
            messages: BTreeMap::new(),
            fallback_message: DEFAULT_FALLBACK.to_string(),
        }
    }
}

impl SafetyConfig {
    /// Parses a TOML document. Missing sections keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown fields.
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is malformed.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded safety configuration file");
        Self::from_toml_str(&content)
    }

    /// Defaults overlaid with the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] for malformed variables.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();
        config.apply_env(std::env::vars())?;
        Ok(config)
    }

    /// Applies `POSE_SAFETY_*` overrides from `(name, value)` pairs.
    ///
    /// Variables without the prefix are ignored; unrecognised prefixed
    /// variables are logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] for the first malformed value.
    pub fn apply_env<I, K, V>(&mut self, vars: I) -> ConfigResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let invalid = |reason: String| ConfigError::invalid_override(key, value, reason);

            if let Some(category) = name.strip_prefix("THRESHOLD_") {
                let bounds = parse_bounds(value).map_err(invalid)?;
                self.set_threshold(category, bounds);
            } else if let Some(message) = name.strip_prefix("MESSAGE_") {
                if message.eq_ignore_ascii_case("FALLBACK") {
                    self.fallback_message = value.to_string();
                } else {
                    let key = MessageKey::from_str(message).map_err(invalid)?;
                    self.messages.insert(key, value.to_string());
                }
            } else {
                match name {
                    "MAX_FILE_SIZE" => self.max_file_size = parse_number(value).map_err(invalid)?,
                    "ALLOWED_EXTENSIONS" => {
                        self.allowed_extensions = value
                            .split(',')
                            .map(str::trim)
                            .filter(|e| !e.is_empty())
                            .map(ToString::to_string)
                            .collect();
                    }
                    "MIN_CONFIDENCE" => self.min_confidence = parse_number(value).map_err(invalid)?,
                    "TOLERANCE" => self.tolerance = parse_tolerance(value).map_err(invalid)?,
                    "MAX_IMAGE_DIMENSION" => {
                        self.processing.max_image_dimension = parse_number(value).map_err(invalid)?;
                    }
                    "IMAGE_QUALITY" => {
                        self.processing.image_quality = parse_number(value).map_err(invalid)?;
                    }
                    _ => {
                        warn!(key, "Ignoring unrecognised configuration variable");
                        continue;
                    }
                }
            }
            debug!(key, value, "Applied configuration override");
        }
        Ok(())
    }

    /// Sets (or adds) the range for a category.
    #[must_use]
    pub fn with_threshold(mut self, category: impl AsRef<str>, min: f64, max: f64) -> Self {
        self.set_threshold(category, AngleBounds::new(min, max));
        self
    }

    /// Replaces every entry naming the same category, whatever its spelling.
    fn set_threshold(&mut self, category: impl AsRef<str>, bounds: AngleBounds) {
        let category = JointCategory::new(category);
        self.thresholds.retain(|name, _| JointCategory::new(name) != category);
        self.thresholds.insert(category.into(), bounds);
    }

    /// Adds a joint definition.
    #[must_use]
    pub fn with_joint(mut self, joint: JointDefinition) -> Self {
        self.joints.push(joint);
        self
    }

    /// Sets the tolerance margin.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: ToleranceMargin) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the low-confidence threshold.
    #[must_use]
    pub const fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Sets the maximum upload size.
    #[must_use]
    pub const fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Replaces the allowed extensions.
    #[must_use]
    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides one catalog entry.
    #[must_use]
    pub fn with_message(mut self, key: MessageKey, text: impl Into<String>) -> Self {
        self.messages.insert(key, text.into());
        self
    }

    /// Validates everything and builds the immutable engine.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found; the engine is never built
    /// from a partially valid configuration.
    pub fn build(&self) -> ConfigResult<SafetyEngine> {
        if self.thresholds.is_empty() {
            return Err(ConfigError::invalid_parameter(
                "thresholds",
                "at least one joint category is required",
            ));
        }
        if self.joints.is_empty() {
            return Err(ConfigError::invalid_parameter(
                "joints",
                "at least one joint definition is required",
            ));
        }

        let table = ThresholdTable::from_bounds(self.thresholds.iter().map(|(k, v)| (k, *v)))?;
        validate_definitions(&self.joints, &table)?;

        if !self.tolerance.is_valid() {
            return Err(ConfigError::invalid_parameter(
                "tolerance",
                format!("{:?} must be finite and non-negative", self.tolerance),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::invalid_parameter(
                "min_confidence",
                format!("{} is outside [0, 1]", self.min_confidence),
            ));
        }
        if self.fallback_message.trim().is_empty() {
            return Err(ConfigError::invalid_parameter(
                "fallback_message",
                "a non-empty fallback message is required",
            ));
        }

        let limits = UploadLimits::new(self.max_file_size, &self.allowed_extensions)?;
        self.processing.validate()?;

        let mut messages = default_messages(self.max_file_size);
        messages.extend(self.messages.iter().map(|(k, v)| (*k, v.clone())));
        let catalog = MessageCatalog::new(messages, self.fallback_message.clone());

        let params = EvaluationParams {
            tolerance: self.tolerance,
            min_confidence: self.min_confidence,
        };

        SafetyEngine::from_parts(table, &self.joints, params, limits, self.processing, catalog)
    }
}

fn deserialize_thresholds<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, AngleBounds>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, AngleBounds>::deserialize(deserializer)?;
    let mut thresholds = BTreeMap::new();
    for (name, bounds) in raw {
        let key = String::from(JointCategory::new(&name));
        if thresholds.insert(key.clone(), bounds).is_some() {
            return Err(serde::de::Error::custom(format!(
                "duplicate threshold category '{key}' (from '{name}')"
            )));
        }
    }
    Ok(thresholds)
}

fn parse_number<T>(raw: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| e.to_string())
}

fn parse_bounds(raw: &str) -> Result<AngleBounds, String> {
    let (min, max) = raw
        .split_once(',')
        .ok_or_else(|| "expected 'min,max'".to_string())?;
    Ok(AngleBounds::new(parse_number(min)?, parse_number(max)?))
}

fn parse_tolerance(raw: &str) -> Result<ToleranceMargin, String> {
    let s = raw.trim();
    if let Some(percent) = s.strip_suffix('%') {
        let percent: f64 = parse_number(percent)?;
        Ok(ToleranceMargin::Fraction(percent / 100.0))
    } else {
        let degrees = s.strip_suffix("deg").unwrap_or(s);
        Ok(ToleranceMargin::Degrees(parse_number(degrees)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn default_builds() {
        let engine = SafetyConfig::default().build().unwrap();
        assert_eq!(engine.table().len(), 4);
        assert_eq!(engine.joints().len(), 8);
        assert_eq!(engine.limits().max_file_size(), 10_485_760);
        assert_relative_eq!(engine.params().min_confidence, 0.5);
    }

    #[test]
    fn env_overrides_merge() {
        let mut config = SafetyConfig::default();
        config
            .apply_env(env(&[
                ("POSE_SAFETY_THRESHOLD_KNEE", "100, 165"),
                ("POSE_SAFETY_THRESHOLD_WRIST", "120,180"),
                ("POSE_SAFETY_MAX_FILE_SIZE", "2097152"),
                ("POSE_SAFETY_ALLOWED_EXTENSIONS", ".PNG, jpg ,"),
                ("POSE_SAFETY_MIN_CONFIDENCE", "0.65"),
                ("POSE_SAFETY_TOLERANCE", "15%"),
                ("POSE_SAFETY_IMAGE_QUALITY", "0.9"),
                ("POSE_SAFETY_MESSAGE_CAMERA_ERROR", "Camera unavailable."),
                ("PATH", "/usr/bin"),
            ]))
            .unwrap();

        assert_eq!(config.thresholds["knee"], AngleBounds::new(100.0, 165.0));
        assert_eq!(config.thresholds["elbow"], AngleBounds::new(80.0, 160.0));
        assert!(config.thresholds.contains_key("wrist"));
        assert_eq!(config.max_file_size, 2_097_152);
        assert_eq!(config.allowed_extensions, [".PNG", "jpg"]);
        assert_eq!(config.tolerance, ToleranceMargin::Fraction(0.15));

        let engine = config.build().unwrap();
        let knee = engine.table().range_for(&JointCategory::knee()).unwrap();
        assert_relative_eq!(knee.min(), 100.0);
        assert!(engine.validate_upload(100, "png").accepted);
        assert!(!engine.validate_upload(100, "gif").accepted);
        assert_eq!(
            engine.catalog().message(MessageKey::FileTooLarge),
            "File size exceeds maximum limit of 2MB."
        );
        assert_eq!(
            engine.catalog().message(MessageKey::CameraError),
            "Camera unavailable."
        );
    }

    #[test]
    fn tolerance_formats() {
        assert_eq!(parse_tolerance("8"), Ok(ToleranceMargin::Degrees(8.0)));
        assert_eq!(parse_tolerance(" 8deg "), Ok(ToleranceMargin::Degrees(8.0)));
        assert_eq!(parse_tolerance("10%"), Ok(ToleranceMargin::Fraction(0.1)));
        assert!(parse_tolerance("lots").is_err());
    }

    #[test]
    fn malformed_override_is_fatal() {
        let mut config = SafetyConfig::default();
        let err = config
            .apply_env(env(&[("POSE_SAFETY_THRESHOLD_KNEE", "90")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { key, .. } if key == "POSE_SAFETY_THRESHOLD_KNEE"));

        let err = config
            .apply_env(env(&[("POSE_SAFETY_MAX_FILE_SIZE", "10MB")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { .. }));

        let err = config
            .apply_env(env(&[("POSE_SAFETY_MESSAGE_NOT_A_KEY", "x")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { .. }));
    }

    #[test]
    fn unknown_prefixed_variable_is_ignored() {
        let mut config = SafetyConfig::default();
        config
            .apply_env(env(&[("POSE_SAFETY_SOMETHING_ELSE", "1")]))
            .unwrap();
        assert_eq!(config, SafetyConfig::default());
    }

    #[test]
    fn invalid_threshold_prevents_startup() {
        let err = SafetyConfig::default()
            .with_threshold("knee", 170.0, 90.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold(_)));
    }

    #[test]
    fn unknown_category_prevents_startup() {
        let config = SafetyConfig::default().with_joint(JointDefinition::new(
            "left_wrist",
            JointCategory::new("wrist"),
            "left_wrist",
            "left_elbow",
            "left_index",
        ));
        assert!(matches!(
            config.build().unwrap_err(),
            ConfigError::UnknownJointCategory { .. }
        ));

        let fixed = config.with_threshold("wrist", 120.0, 180.0);
        assert_eq!(fixed.build().unwrap().joints().len(), 9);
    }

    #[test]
    fn scalar_parameters_validated() {
        assert!(SafetyConfig::default().with_min_confidence(1.5).build().is_err());
        assert!(SafetyConfig::default().with_min_confidence(f64::NAN).build().is_err());
        assert!(
            SafetyConfig::default()
                .with_tolerance(ToleranceMargin::Degrees(-2.0))
                .build()
                .is_err()
        );
        assert!(SafetyConfig::default().with_max_file_size(0).build().is_err());
        assert!(
            SafetyConfig::default()
                .with_allowed_extensions(Vec::<String>::new())
                .build()
                .is_err()
        );

        let mut config = SafetyConfig::default();
        config.fallback_message = "  ".to_string();
        assert!(config.build().is_err());

        let mut config = SafetyConfig::default();
        config.processing.image_quality = 0.0;
        assert!(config.build().is_err());
    }

    #[test]
    fn empty_tables_rejected() {
        let mut config = SafetyConfig::default();
        config.thresholds.clear();
        assert!(matches!(
            config.build().unwrap_err(),
            ConfigError::InvalidParameter { name: "thresholds", .. }
        ));

        let mut config = SafetyConfig::default();
        config.joints.clear();
        assert!(matches!(
            config.build().unwrap_err(),
            ConfigError::InvalidParameter { name: "joints", .. }
        ));
    }

    #[test]
    fn toml_round_trip() {
        let config = SafetyConfig::default().with_tolerance(ToleranceMargin::Degrees(8.0));
        let text = toml::to_string(&config).unwrap();
        assert_eq!(SafetyConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn mixed_case_toml_key_takes_env_override() {
        let toml = r#"
            [thresholds]
            Knee = { min = 90.0, max = 170.0 }
            " Elbow " = { min = 80.0, max = 160.0 }
            HIP = { min = 60.0, max = 180.0 }
            shoulder = { min = 70.0, max = 180.0 }
        "#;
        let mut config = SafetyConfig::from_toml_str(toml).unwrap();
        assert!(config.thresholds.contains_key("knee"));
        assert!(config.thresholds.contains_key("elbow"));

        config
            .apply_env(env(&[("POSE_SAFETY_THRESHOLD_KNEE", "100,165")]))
            .unwrap();
        assert_eq!(config.thresholds.len(), 4);

        let engine = config.build().unwrap();
        let knee = engine.table().range_for(&JointCategory::knee()).unwrap();
        assert_relative_eq!(knee.min(), 100.0);
        assert_relative_eq!(knee.max(), 165.0);
    }

    #[test]
    fn builder_replaces_differently_spelled_key() {
        let mut config = SafetyConfig::default();
        config.thresholds.insert("KNEE".to_string(), AngleBounds::new(90.0, 170.0));
        let config = config.with_threshold(" Knee", 80.0, 160.0);
        assert_eq!(config.thresholds.len(), default_bounds().len());
        let knee = config.thresholds["knee"];
        assert_relative_eq!(knee.min, 80.0);
    }

    #[test]
    fn toml_keys_colliding_after_normalization_rejected() {
        let err = SafetyConfig::from_toml_str(
            "[thresholds]\nKnee = { min = 90.0, max = 170.0 }\nknee = { min = 80.0, max = 160.0 }\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn toml_unknown_field_rejected() {
        let err = SafetyConfig::from_toml_str("jwt_secret = \"abc\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file() {
        let err = SafetyConfig::from_file("/nonexistent/pose-safety.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
