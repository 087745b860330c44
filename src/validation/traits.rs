//! Core validation interfaces

use crate::document::SpecDocument;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Verdict on a single document. Produced fresh per check, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum ValidationOutcome {
    Valid,
    Invalid(String),
}

impl ValidationOutcome {
    /// Create an invalid outcome
    pub fn invalid(reason: impl Into<String>) -> Self {
        ValidationOutcome::Invalid(reason.into())
    }

    /// Check if the document passed
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    /// The failure reason, if the document did not pass
    pub fn reason(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Valid => None,
            ValidationOutcome::Invalid(reason) => Some(reason),
        }
    }
}

/// The validation step of the refinement loop.
///
/// Implementations classify every input as exactly `Valid` or `Invalid`.
/// A document the validator cannot parse is `Invalid`, not an error;
/// `Err` is reserved for the validator itself being unreachable or broken.
#[async_trait]
pub trait DocumentValidator: Send + Sync {
    async fn validate(&self, document: &SpecDocument) -> Result<ValidationOutcome>;

    /// Get a description of what this validator checks
    fn description(&self) -> &str {
        "validator"
    }
}
