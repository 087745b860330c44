//! The specification document being refined.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A YAML OpenAPI definition. Replaced wholesale on every generation step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecDocument(String);

impl SpecDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self(content.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// True for a document with no content besides whitespace
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for SpecDocument {
    fn from(content: String) -> Self {
        Self(content)
    }
}

impl From<&str> for SpecDocument {
    fn from(content: &str) -> Self {
        Self(content.to_string())
    }
}

impl AsRef<str> for SpecDocument {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpecDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
