//! Request locale tag.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Language/region tag selecting which localized attribute rows apply.
///
/// The empty tag is the neutral locale used by values of unlocalized fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    /// Creates a locale from a tag, trimming surrounding whitespace.
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(tag.as_ref().trim().to_string())
    }

    /// Locale stored on values of unlocalized fields.
    pub fn neutral() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_neutral(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Locale {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_neutral() {
            write!(f, "<neutral>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
