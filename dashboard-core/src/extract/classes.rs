//! Class-name matching.
//!
//! Dashboard markup encodes roles in compound class lists
//! (`"column setFocusRing"`), so matching is token-wise and substring-based.
//! The extraction script carries an identical `classMatches` helper.

use serde::{Deserialize, Serialize};

/// Whitespace-separated class tokens that must all be present.
///
/// Each pattern token must be a case-sensitive substring of at least one of
/// the element's class tokens; token order does not matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassPattern(String);

impl ClassPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split_whitespace()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens().next().is_none()
    }

    /// Match against a raw `class` attribute value.
    pub fn matches(&self, class_attr: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        self.tokens()
            .all(|want| class_attr.split_whitespace().any(|have| have.contains(want)))
    }
}
