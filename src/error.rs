//! Error types for the generation core.
//!
//! Every failure mode of a generation attempt maps onto one of the types
//! here. All of them are retryable from the orchestrator's point of view:
//! they are absorbed inside its attempt loop and never surface to the
//! calling cognitive function.

use thiserror::Error;

/// Transport or provider-side failure from the generation service.
///
/// Carries a human-readable message only, never a parsed payload. Callers
/// treat an adapter error identically to empty/invalid output when deciding
/// whether to retry.
#[derive(Debug, Clone, Error)]
#[error("provider request failed: {message}")]
pub struct AdapterError {
    pub message: String,
}

impl AdapterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure produced while turning raw provider text into a typed value.
///
/// Validation is all-or-nothing: a single violated field invalidates the
/// whole value, so no partial objects ever escape.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// The raw text is not well-formed JSON.
    #[error("response is not well-formed JSON: {message}")]
    ParseFailure { message: String },

    /// The text parsed, but a declared field constraint is violated
    /// (numeric range, enum membership, minimum list length, or a required
    /// field is absent).
    #[error("field `{field}` violates constraint: {reason}")]
    ConstraintFailure { field: String, reason: String },

    /// Structurally valid, but refused by a caller-supplied predicate.
    #[error("rejected by caller-supplied predicate")]
    Rejected,
}

impl ValidationError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseFailure {
            message: message.into(),
        }
    }

    pub fn constraint(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConstraintFailure {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
