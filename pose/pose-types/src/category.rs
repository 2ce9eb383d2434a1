//! Joint categories.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named class of joint used to select a threshold range.
///
/// Categories are open-ended: new ones are introduced by configuration
/// alone. Names are normalized to trimmed lowercase, so `"Knee"` and
/// `" knee "` refer to the same category. Ordering is by name, which the
/// aggregator relies on for deterministic output.
///
/// # Example
///
/// ```
/// use pose_types::JointCategory;
///
/// let knee = JointCategory::new(" Knee ");
/// assert_eq!(knee, JointCategory::knee());
/// assert_eq!(knee.as_str(), "knee");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct JointCategory(String);

impl JointCategory {
    /// Creates a category, normalizing the name.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    /// Elbow flexion, measured shoulder–elbow–wrist.
    #[must_use]
    pub fn elbow() -> Self {
        Self("elbow".to_string())
    }

    /// Knee flexion, measured hip–knee–ankle.
    #[must_use]
    pub fn knee() -> Self {
        Self("knee".to_string())
    }

    /// Hip flexion, measured shoulder–hip–knee.
    #[must_use]
    pub fn hip() -> Self {
        Self("hip".to_string())
    }

    /// Shoulder abduction/flexion, measured elbow–shoulder–hip.
    #[must_use]
    pub fn shoulder() -> Self {
        Self("shoulder".to_string())
    }

    /// Returns the normalized name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the normalized name is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for JointCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JointCategory {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for JointCategory {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<JointCategory> for String {
    fn from(category: JointCategory) -> Self {
        category.0
    }
}
