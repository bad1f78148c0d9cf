//! Language tags used to scope synthesis voices, recognition, and command tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A BCP-47 style language tag such as `en-US` or `ta-IN`.
///
/// Tags are stored as given; comparisons that matter for voice selection go
/// through [`LanguageTag::matches_exactly`] and [`LanguageTag::primary`],
/// which are case-insensitive and treat `_` like `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageTag(String);

impl LanguageTag {
    /// Create a tag from any string-like value.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into().trim().to_string())
    }

    /// US English, the application default.
    pub fn english() -> Self {
        Self::new("en-US")
    }

    /// Tamil (India).
    pub fn tamil() -> Self {
        Self::new("ta-IN")
    }

    /// The tag as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The language-family subtag, lowercased (`"ta"` for `ta-IN`).
    pub fn primary(&self) -> String {
        self.0
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    /// Whether `other` names the same locale, ignoring case and separator style.
    pub fn matches_exactly(&self, other: &str) -> bool {
        normalize(&self.0) == normalize(other)
    }

    /// Whether `other` belongs to the same language family.
    pub fn same_family(&self, other: &str) -> bool {
        let primary = self.primary();
        !primary.is_empty() && Self::new(other).primary() == primary
    }
}

fn normalize(tag: &str) -> String {
    tag.trim().replace('_', "-").to_ascii_lowercase()
}

impl Default for LanguageTag {
    fn default() -> Self {
        Self::english()
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LanguageTag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for LanguageTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
